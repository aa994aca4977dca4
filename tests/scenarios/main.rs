//! End-to-end scenarios
//!
//! Full simulation runs against an in-memory storefront, checking the
//! outcome, the diagnostic trail and that the storefront is left untouched.

mod coupons;
mod hook_panics;
mod isolation;
