//! Resolution of requested products to concrete cart lines.
//!
//! Simple products go in as they are. Variable and grouped products are
//! parents of purchasable sub-units, and one eligible unit is chosen from
//! them according to the [`SelectionPolicy`]. Both policies are
//! reproducible: the seeded policy builds a fresh generator from its seed on
//! every pick.

use cartprobe_foundation::{
    CartItem, ProductCatalog, ProductId, ProductInfo, ProductKind, VariantId, VariantInfo,
};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::config::SelectionPolicy;
use crate::simulation::ProductSelection;

/// Why a requested product could not be turned into a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The catalog does not know the product.
    #[error("Product ID {0} does not exist.")]
    NotFound(ProductId),

    /// The product cannot be bought right now.
    #[error("Product ID {0} is not purchasable or not in stock.")]
    Unavailable(ProductId),

    /// The explicitly requested variant is missing or cannot be bought.
    #[error("Variant ID {variant} of product ID {product} is not purchasable or not in stock.")]
    VariantUnavailable {
        /// Parent product.
        product: ProductId,
        /// Requested variant.
        variant: VariantId,
    },

    /// No sub-unit of a composite product can be bought.
    #[error("Product ID {0} has no purchasable, in-stock options.")]
    NoEligibleUnit(ProductId),
}

/// A cart line ready to be added, with a display name.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedLine {
    /// The line to add.
    pub item: CartItem,
    /// Name of the product that was actually chosen.
    pub name: String,
    /// Set when a sub-unit was chosen on the caller's behalf.
    pub picked: Option<String>,
}

/// Chooses concrete units for requested products.
#[derive(Copy, Clone, Debug, Default)]
pub struct UnitPicker {
    policy: SelectionPolicy,
}

impl UnitPicker {
    /// Creates a picker with the given policy.
    #[must_use]
    pub const fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    /// Returns the selection policy.
    #[must_use]
    pub const fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Resolves one selection against the catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectionError`] when the product is unknown or nothing
    /// eligible can be chosen.
    pub fn resolve(
        &self,
        selection: &ProductSelection,
        catalog: &dyn ProductCatalog,
    ) -> Result<ResolvedLine, SelectionError> {
        let product = catalog
            .product(selection.product)
            .ok_or(SelectionError::NotFound(selection.product))?;
        let quantity = selection.quantity.max(1);

        match &product.kind {
            ProductKind::Simple => {
                if !product.is_eligible() {
                    return Err(SelectionError::Unavailable(product.id));
                }
                Ok(ResolvedLine {
                    item: CartItem::new(product.id, quantity),
                    name: product.name.clone(),
                    picked: None,
                })
            }
            ProductKind::Variable { variants } => {
                self.resolve_variant(&product, variants, selection.variant, quantity)
            }
            ProductKind::Grouped { children } => {
                let eligible: Vec<ProductInfo> = children
                    .iter()
                    .filter_map(|id| catalog.product(*id))
                    .filter(|child| !child.is_composite() && child.is_eligible())
                    .collect();
                let child = self
                    .pick(&eligible)
                    .ok_or(SelectionError::NoEligibleUnit(product.id))?;
                Ok(ResolvedLine {
                    item: CartItem::new(child.id, quantity),
                    name: child.name.clone(),
                    picked: Some(format!(
                        "Grouped product \"{}\" (ID: {}): using child product \"{}\" (ID: {}).",
                        product.name, product.id, child.name, child.id
                    )),
                })
            }
        }
    }

    fn resolve_variant(
        &self,
        product: &ProductInfo,
        variants: &[VariantInfo],
        requested: Option<VariantId>,
        quantity: u32,
    ) -> Result<ResolvedLine, SelectionError> {
        if let Some(requested) = requested {
            let variant = variants
                .iter()
                .find(|v| v.id == requested && v.is_eligible())
                .ok_or(SelectionError::VariantUnavailable {
                    product: product.id,
                    variant: requested,
                })?;
            return Ok(ResolvedLine {
                item: CartItem::new(product.id, quantity)
                    .with_variant(variant.id, variant.attributes.clone()),
                name: product.name.clone(),
                picked: None,
            });
        }

        let eligible: Vec<&VariantInfo> = variants.iter().filter(|v| v.is_eligible()).collect();
        let variant = *self
            .pick(&eligible)
            .ok_or(SelectionError::NoEligibleUnit(product.id))?;
        Ok(ResolvedLine {
            item: CartItem::new(product.id, quantity)
                .with_variant(variant.id, variant.attributes.clone()),
            name: product.name.clone(),
            picked: Some(format!(
                "Variable product \"{}\" (ID: {}): using variant ID {}.",
                product.name, product.id, variant.id
            )),
        })
    }

    fn pick<'a, T>(&self, eligible: &'a [T]) -> Option<&'a T> {
        match self.policy {
            SelectionPolicy::FirstEligible => eligible.first(),
            SelectionPolicy::Seeded(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                eligible.choose(&mut rng)
            }
        }
    }
}
