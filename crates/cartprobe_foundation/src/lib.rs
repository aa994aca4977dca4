//! Core types and collaborator ports for cartprobe.
//!
//! This crate provides:
//! - [`Value`] - Dynamic, identity-bearing values passed through hook points
//! - [`ProductId`], [`VariantId`], [`UserId`] - Typed identifiers
//! - [`Money`] - Amounts in minor currency units
//! - [`Error`] - Rich error types with context
//! - Port traits for the external system: [`HookRegistry`], [`CartEngine`],
//!   [`SessionStore`], [`UserContext`], [`ProductCatalog`], bundled by [`Storefront`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cart;
pub mod catalog;
pub mod error;
pub mod hook;
pub mod ids;
pub mod money;
pub mod ports;
pub mod value;

pub use cart::{
    ApplyOutcome, ApplyPath, CartItem, EngineFault, ExtensionInfo, FaultKind, RuntimeWarning,
};
pub use catalog::{PlaceholderSpec, ProductInfo, ProductKind, VariantInfo};
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use hook::{CORE_ORIGIN, HookKind, HookObserver, HookPoint, HookRegistry, observer_eq};
pub use ids::{ProductId, UserId, VariantId};
pub use money::Money;
pub use ports::{CartEngine, ProductCatalog, SessionStore, Storefront, UserContext};
pub use value::{Object, ObjectRef, Shape, Value};
