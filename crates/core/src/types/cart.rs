//! Cart line records.

use serde::{Deserialize, Serialize};

use super::catalog::CatalogItem;
use super::id::ItemId;
use super::price::Money;

/// What a cart line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A crane. At most one per cart.
    Equipment,
    /// An optional add-on priced independently of the region.
    Accessory,
}

/// One line of a quote cart.
///
/// The unit price is whatever was last resolved for the vendor's region;
/// it is `None` when no price was known at the time the line was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub name: String,
    #[serde(default)]
    pub unit_price: Option<Money>,
    pub quantity: u32,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub reference_code: Option<String>,
}

impl CartItem {
    /// A cart line with quantity 1.
    #[must_use]
    pub fn new(id: impl Into<ItemId>, kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            unit_price: None,
            quantity: 1,
            model: None,
            image_url: None,
            reference_code: None,
        }
    }

    /// An equipment line built from a catalog record.
    #[must_use]
    pub fn from_catalog(item: &CatalogItem, unit_price: Option<Money>) -> Self {
        Self {
            id: item.id.into(),
            kind: ItemKind::Equipment,
            name: item.name.clone(),
            unit_price,
            quantity: 1,
            model: item.model.clone(),
            image_url: item.image_url.clone(),
            reference_code: item.reference_code.clone(),
        }
    }

    /// Set the unit price.
    #[must_use]
    pub fn with_price(mut self, price: Money) -> Self {
        self.unit_price = Some(price);
        self
    }

    /// Set the quantity.
    #[must_use]
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Whether this line is the given `(id, kind)` pair.
    #[must_use]
    pub fn is(&self, id: ItemId, kind: ItemKind) -> bool {
        self.id == id && self.kind == kind
    }

    /// Unit price times quantity; a missing price counts as zero.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.unwrap_or(Money::ZERO).times(self.quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::EquipmentId;

    #[test]
    fn test_line_total_missing_price_is_zero() {
        let item = CartItem::new(ItemId::new(1), ItemKind::Accessory, "Cesto").with_quantity(3);
        assert_eq!(item.line_total(), Money::ZERO);
    }

    #[test]
    fn test_line_total() {
        let item = CartItem::new(ItemId::new(1), ItemKind::Accessory, "Cesto")
            .with_price(Money::from_centavos(2_500))
            .with_quantity(4);
        assert_eq!(item.line_total(), Money::from_centavos(10_000));
    }

    #[test]
    fn test_from_catalog() {
        let mut catalog = CatalogItem::new(EquipmentId::new(9), "Guindaste GSE 8.0 4h2m");
        catalog.model = Some("GSE".into());
        let item = CartItem::from_catalog(&catalog, None);
        assert_eq!(item.kind, ItemKind::Equipment);
        assert_eq!(item.id, ItemId::new(9));
        assert_eq!(item.model.as_deref(), Some("GSE"));
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ItemKind::Equipment).unwrap();
        assert_eq!(json, "\"equipment\"");
    }
}
