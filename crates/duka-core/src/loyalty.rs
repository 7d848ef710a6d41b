//! # Loyalty Accrual Engine (policy math)
//!
//! Pure computation half of the loyalty engine: how many points a sale
//! earns, and whether a redemption request is valid. The persistence half
//! (balances, transactions) lives in duka-db and always runs inside the
//! caller's database transaction.
//!
//! ## Model
//! - Earning: `points = floor(subtotal_units × tier_multiplier)`, where
//!   the multiplier comes from the customer's tier.
//! - Redemption: a fixed conversion rate (`points_per_unit`, 10 points =
//!   1 currency unit) and a minimum increment (100 points). Both are
//!   policy knobs, not constants baked into the engine.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::LoyaltyTier;

// =============================================================================
// Policy
// =============================================================================

/// Configurable loyalty policy.
///
/// Multipliers are in hundredths so fractional tiers stay in integer
/// math: 100 = 1.0×, 150 = 1.5×, 200 = 2.0×.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyPolicy {
    pub bronze_multiplier: i64,
    pub silver_multiplier: i64,
    pub gold_multiplier: i64,
    /// Points required per currency unit of discount.
    pub points_per_unit: i64,
    /// Redemptions must be a positive multiple of this.
    pub min_redeem_increment: i64,
}

impl Default for LoyaltyPolicy {
    fn default() -> Self {
        LoyaltyPolicy {
            bronze_multiplier: 100,
            silver_multiplier: 150,
            gold_multiplier: 200,
            points_per_unit: 10,
            min_redeem_increment: 100,
        }
    }
}

impl LoyaltyPolicy {
    /// Accrual multiplier (hundredths) for a tier.
    fn multiplier(&self, tier: LoyaltyTier) -> i64 {
        match tier {
            LoyaltyTier::Bronze => self.bronze_multiplier,
            LoyaltyTier::Silver => self.silver_multiplier,
            LoyaltyTier::Gold => self.gold_multiplier,
        }
    }

    /// Points earned on a sale subtotal for a customer tier.
    ///
    /// Floor semantics: partial points are never awarded. The subtotal is
    /// the items total — delivery fees are pass-through costs, not spend.
    pub fn earned_points(&self, subtotal: Money, tier: LoyaltyTier) -> i64 {
        if !subtotal.is_positive() {
            return 0;
        }
        // subtotal_cents / 100 = currency units; × multiplier / 100.
        // Single integer division keeps the floor exact.
        subtotal.cents() * self.multiplier(tier) / 10_000
    }

    /// Validates a redemption request against the policy and the
    /// customer's current balance.
    ///
    /// ## Errors
    /// - [`CoreError::InvalidRedeemAmount`] if `points <= 0` or not a
    ///   multiple of the minimum increment
    /// - [`CoreError::InsufficientPoints`] if the balance is short
    pub fn validate_redeem(&self, points: i64, balance: i64) -> CoreResult<()> {
        if points <= 0 || points % self.min_redeem_increment != 0 {
            return Err(CoreError::InvalidRedeemAmount {
                points,
                increment: self.min_redeem_increment,
            });
        }
        if points > balance {
            return Err(CoreError::InsufficientPoints {
                available: balance,
                requested: points,
            });
        }
        Ok(())
    }

    /// Converts points to a currency discount at the fixed rate.
    pub fn redeem_discount(&self, points: i64) -> Money {
        Money::from_cents(points * 100 / self.points_per_unit)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
