//! Cart lines, discount application results, and engine faults.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{ProductId, VariantId};
use crate::value::Value;

// =============================================================================
// Cart Item
// =============================================================================

/// One cart line as the engine stores it, minus engine-assigned keys.
#[derive(Clone, Debug, PartialEq)]
pub struct CartItem {
    /// The product (for variations, the parent product).
    pub product: ProductId,
    /// Quantity in the cart.
    pub quantity: u32,
    /// The selected variant, if the product is variable.
    pub variant: Option<VariantId>,
    /// Variant attribute selections, e.g. `attribute_size -> L`.
    pub attributes: BTreeMap<String, String>,
    /// Extension-defined per-line data.
    pub custom_data: BTreeMap<String, Value>,
}

impl CartItem {
    /// Creates a line for a simple product.
    #[must_use]
    pub fn new(product: ProductId, quantity: u32) -> Self {
        Self {
            product,
            quantity,
            variant: None,
            attributes: BTreeMap::new(),
            custom_data: BTreeMap::new(),
        }
    }

    /// Builder method to select a variant with its attributes.
    #[must_use]
    pub fn with_variant(mut self, variant: VariantId, attributes: BTreeMap<String, String>) -> Self {
        self.variant = Some(variant);
        self.attributes = attributes;
        self
    }

    /// Builder method to attach one custom data entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_data.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Discount Application
// =============================================================================

/// Result of a discount application that did not fault.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The code is now applied to the cart.
    Applied,
    /// The engine declined the code.
    Rejected {
        /// Primary reason reported by the engine.
        reason: String,
        /// Additional user-facing notices the engine queued.
        notices: Vec<String>,
    },
}

impl ApplyOutcome {
    /// Creates a rejection without extra notices.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
            notices: Vec::new(),
        }
    }

    /// Returns true if the code was applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Which execution path the engine should use when applying a code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ApplyPath<'a> {
    /// Normal application, every extension participates.
    Full,
    /// Application with the named extensions kept out of the call.
    Narrow {
        /// Extension names that must not be invoked.
        skipped: &'a [String],
    },
}

// =============================================================================
// Faults and Warnings
// =============================================================================

/// Category of a fault raised inside the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultKind {
    /// A runtime type error, typically a version mismatch in extension code.
    Type,
    /// Any other runtime error.
    Runtime,
    /// A runtime warning escalated to a fault.
    Warning,
    /// Code under test panicked.
    Panic,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type => write!(f, "type error"),
            Self::Runtime => write!(f, "runtime error"),
            Self::Warning => write!(f, "warning"),
            Self::Panic => write!(f, "panic"),
        }
    }
}

/// A fault raised by the engine or by an extension it called.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineFault {
    /// Fault category.
    pub kind: FaultKind,
    /// Message as reported by the failing code.
    pub message: String,
    /// Component the fault originated from (extension name or source path).
    pub origin: Option<String>,
}

impl EngineFault {
    /// Creates a fault with no known origin.
    #[must_use]
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            origin: None,
        }
    }

    /// Builder method to set the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

impl fmt::Display for EngineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(origin) = &self.origin {
            write!(f, " (in {origin})")?;
        }
        Ok(())
    }
}

/// A non-fatal runtime warning emitted while the engine was working.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeWarning {
    /// Warning text.
    pub message: String,
    /// Component that emitted it.
    pub origin: Option<String>,
}

impl RuntimeWarning {
    /// Creates a warning.
    #[must_use]
    pub fn new(message: impl Into<String>, origin: Option<String>) -> Self {
        Self {
            message: message.into(),
            origin,
        }
    }
}

/// An extension loaded into the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionInfo {
    /// Extension name.
    pub name: String,
    /// Version string, if known.
    pub version: Option<String>,
}
