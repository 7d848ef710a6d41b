//! # Unit Pricing Resolver
//!
//! Products are stocked in a single base unit ("piece") but sold and
//! purchased in three denominations: piece, pack, and dozen. This module
//! resolves a product + unit type into the prices and the base-unit
//! multiplier for that denomination.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  resolve(product, Pack)                                             │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  UnitPricing {                                                      │
//! │      buying_price:       product.pack_buying_price                  │
//! │      selling_price:      product.pack_selling_price                 │
//! │      base_units_per_unit: product.pack_size   (commonly 3)          │
//! │  }                                                                  │
//! │                                                                     │
//! │  Selling 2 packs therefore consumes 2 × pack_size base units        │
//! │  from the single stock pool.                                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pure lookup/computation; no side effects. The stock ledger itself is
//! unit-agnostic — all conversions to base units happen here, in callers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;

/// Base units in a dozen. Fixed, unlike the per-product pack size.
pub const DOZEN_SIZE: i64 = 12;

// =============================================================================
// Unit Type
// =============================================================================

/// The denomination a transaction line is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Piece,
    Pack,
    Dozen,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Piece => "piece",
            UnitType::Pack => "pack",
            UnitType::Dozen => "dozen",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = CoreError;

    /// Parses a unit type from its wire form.
    ///
    /// Serde deserialization of typed request bodies rejects unknown
    /// values the same way; this exists for string-typed call sites.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "piece" => Ok(UnitType::Piece),
            "pack" => Ok(UnitType::Pack),
            "dozen" => Ok(UnitType::Dozen),
            other => Err(CoreError::InvalidUnitType(other.to_string())),
        }
    }
}

// =============================================================================
// Unit Pricing
// =============================================================================

/// Resolved pricing for one product/unit-type combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPricing {
    /// Purchase cost per unit at this denomination.
    pub buying_price: Money,
    /// Selling price per unit at this denomination. Zero is allowed
    /// (promo/free items) but should be flagged for review by callers.
    pub selling_price: Money,
    /// Base units consumed per unit sold at this denomination.
    pub base_units_per_unit: i64,
}

impl UnitPricing {
    /// Base-unit count for `quantity` units at this denomination.
    #[inline]
    pub fn base_units(&self, quantity: i64) -> i64 {
        quantity * self.base_units_per_unit
    }
}

/// Base units consumed per unit at the given denomination for a product.
///
/// Needs no price configuration, so reversal paths (sale cancellation)
/// can convert quantities even when pricing has since been cleared.
#[inline]
pub fn base_units_per_unit(product: &Product, unit_type: UnitType) -> i64 {
    match unit_type {
        UnitType::Piece => 1,
        UnitType::Pack => product.pack_size,
        UnitType::Dozen => DOZEN_SIZE,
    }
}

/// Resolves buying/selling price and the stock-quantity multiplier for a
/// product at the requested unit type.
///
/// ## Errors
/// - [`CoreError::MissingPriceConfiguration`] when the buying price for
///   the requested unit is zero/unset. Zero is "not configured" for
///   buying prices only; a zero **selling** price resolves successfully.
pub fn resolve(product: &Product, unit_type: UnitType) -> CoreResult<UnitPricing> {
    let (buying, selling) = match unit_type {
        UnitType::Piece => (product.piece_buying_price, product.piece_selling_price),
        UnitType::Pack => (product.pack_buying_price, product.pack_selling_price),
        UnitType::Dozen => (product.dozen_buying_price, product.dozen_selling_price),
    };

    if buying <= 0 {
        return Err(CoreError::MissingPriceConfiguration {
            sku: product.sku.clone(),
            unit: unit_type.to_string(),
        });
    }

    Ok(UnitPricing {
        buying_price: Money::from_cents(buying),
        selling_price: Money::from_cents(selling),
        base_units_per_unit: base_units_per_unit(product, unit_type),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product() -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            name: "Soda 300ml".to_string(),
            sku: "SODA-300".to_string(),
            category_id: None,
            stock_unit: "piece".to_string(),
            quantity: 24,
            min_quantity: 6,
            pack_size: 3,
            piece_buying_price: 3_000,
            pack_buying_price: 8_500,
            dozen_buying_price: 33_000,
            piece_selling_price: 4_000,
            pack_selling_price: 11_000,
            dozen_selling_price: 42_000,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_resolve_piece() {
        let pricing = resolve(&product(), UnitType::Piece).unwrap();
        assert_eq!(pricing.buying_price.cents(), 3_000);
        assert_eq!(pricing.selling_price.cents(), 4_000);
        assert_eq!(pricing.base_units_per_unit, 1);
    }

    #[test]
    fn test_resolve_pack_uses_product_pack_size() {
        let mut p = product();
        p.pack_size = 6;
        let pricing = resolve(&p, UnitType::Pack).unwrap();
        assert_eq!(pricing.base_units_per_unit, 6);
        assert_eq!(pricing.base_units(2), 12);
    }

    #[test]
    fn test_resolve_dozen() {
        let pricing = resolve(&product(), UnitType::Dozen).unwrap();
        assert_eq!(pricing.base_units_per_unit, DOZEN_SIZE);
        assert_eq!(pricing.base_units(1), 12);
    }

    #[test]
    fn test_missing_buying_price_rejected() {
        let mut p = product();
        p.pack_buying_price = 0;
        let err = resolve(&p, UnitType::Pack).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MissingPriceConfiguration { .. }
        ));
    }

    #[test]
    fn test_zero_selling_price_allowed() {
        let mut p = product();
        p.piece_selling_price = 0;
        let pricing = resolve(&p, UnitType::Piece).unwrap();
        assert!(pricing.selling_price.is_zero());
    }

    #[test]
    fn test_unit_type_from_str() {
        assert_eq!(UnitType::from_str("piece").unwrap(), UnitType::Piece);
        assert_eq!(UnitType::from_str("Pack").unwrap(), UnitType::Pack);
        assert_eq!(UnitType::from_str(" dozen ").unwrap(), UnitType::Dozen);

        let err = UnitType::from_str("crate").unwrap_err();
        assert!(matches!(err, CoreError::InvalidUnitType(_)));
    }
}
