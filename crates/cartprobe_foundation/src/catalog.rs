//! Product catalog descriptions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{ProductId, VariantId};
use crate::money::Money;

/// How a product is sold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProductKind {
    /// A single purchasable unit.
    Simple,
    /// A parent with selectable variants; only variants are purchasable.
    Variable {
        /// Variants in catalog order.
        variants: Vec<VariantInfo>,
    },
    /// A bundle listing of independent child products.
    Grouped {
        /// Child products in catalog order.
        children: Vec<ProductId>,
    },
}

/// One variant of a variable product.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantInfo {
    /// Variant identifier.
    pub id: VariantId,
    /// Attribute selections that identify this variant.
    pub attributes: BTreeMap<String, String>,
    /// Whether the variant can be bought.
    pub purchasable: bool,
    /// Whether the variant is in stock.
    pub in_stock: bool,
}

impl VariantInfo {
    /// Returns true if the variant can be put in a cart right now.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        self.purchasable && self.in_stock
    }
}

/// What the catalog knows about a product.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductInfo {
    /// Product identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Simple, variable, or grouped.
    pub kind: ProductKind,
    /// Whether the product itself can be bought.
    pub purchasable: bool,
    /// Whether the product itself is in stock.
    pub in_stock: bool,
    /// Unit price.
    pub price: Money,
}

impl ProductInfo {
    /// Creates a purchasable, in-stock simple product.
    #[must_use]
    pub fn simple(id: ProductId, name: impl Into<String>, price: Money) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ProductKind::Simple,
            purchasable: true,
            in_stock: true,
            price,
        }
    }

    /// Returns true if the product has sub-units that must be chosen from.
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        !matches!(self.kind, ProductKind::Simple)
    }

    /// Returns true if a simple product can be put in a cart right now.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        self.purchasable && self.in_stock
    }
}

/// Parameters for the placeholder product used when a cart would be empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderSpec {
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Money,
}

impl Default for PlaceholderSpec {
    fn default() -> Self {
        Self {
            name: "Debugger Test Product".to_string(),
            price: Money::from_major(100),
        }
    }
}
