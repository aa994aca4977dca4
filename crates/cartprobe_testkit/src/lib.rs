//! In-memory collaborators for exercising cartprobe.
//!
//! [`MemoryStore`] implements every port a simulation needs and can be told
//! to fail in the ways a real storefront does: faults and panics inside
//! discount application, runtime warnings, unloadable carts, uninitialized
//! sessions, and unsavable placeholder products.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod bus;
mod store;

pub use bus::{FilterFn, HookBus};
pub use store::{CouponRule, Discount, MemoryStore, StoreState};
