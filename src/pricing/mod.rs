//! Fee policy and settlement arithmetic.
//!
//! Everything in this module is pure: given a listed price per kilogram and
//! the deployment's fee policy, derive what the farmer earns, what the
//! platform keeps, and what the buyer pays. All arithmetic is done in
//! `rust_decimal::Decimal`; identical inputs always produce identical output.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// The deduction rule converting a listed price into a per-kg platform fee.
///
/// Exactly one policy is active per deployment, selected through
/// configuration. The two variants reflect the two fee schedules the
/// marketplace has operated under and are never mixed at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeePolicy {
    /// Fixed logistics fee per kilogram (e.g. ₹5/kg), independent of price.
    Flat { amount_per_kg: Decimal },
    /// Commission as a fraction of the listed price (e.g. 0.15).
    Percentage { rate: Decimal },
}

impl FeePolicy {
    /// Builds a flat-fee policy, rejecting negative amounts.
    pub fn flat(amount_per_kg: Decimal) -> Result<Self, ServiceError> {
        let policy = FeePolicy::Flat { amount_per_kg };
        policy.validate()?;
        Ok(policy)
    }

    /// Builds a percentage policy, rejecting rates outside [0, 1].
    pub fn percentage(rate: Decimal) -> Result<Self, ServiceError> {
        let policy = FeePolicy::Percentage { rate };
        policy.validate()?;
        Ok(policy)
    }

    /// Validates the policy parameters. Deserialized policies (from config
    /// files or the environment) must pass through here before use.
    pub fn validate(&self) -> Result<(), ServiceError> {
        match self {
            FeePolicy::Flat { amount_per_kg } => {
                if amount_per_kg.is_sign_negative() {
                    return Err(ServiceError::InvalidConfig(format!(
                        "flat fee must be non-negative, got {}",
                        amount_per_kg
                    )));
                }
            }
            FeePolicy::Percentage { rate } => {
                if rate.is_sign_negative() || *rate > Decimal::ONE {
                    return Err(ServiceError::InvalidConfig(format!(
                        "commission rate must be within [0, 1], got {}",
                        rate
                    )));
                }
            }
        }
        Ok(())
    }

    /// Per-kg deduction for a given listed price. Pure; no side effects.
    pub fn compute_deduction(&self, base_price_per_kg: Decimal) -> Decimal {
        match self {
            FeePolicy::Flat { amount_per_kg } => *amount_per_kg,
            FeePolicy::Percentage { rate } => base_price_per_kg * rate,
        }
    }
}

/// How the deduction composes with the listed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMode {
    /// Buyer pays the listed price; the fee comes out of the farmer's side.
    /// This is the historical behavior of the marketplace backend.
    #[default]
    DeductFromListed,
    /// Farmer keeps the listed price; the fee is added on top for the buyer.
    AddOnTop,
}

/// The split of one kilogram's price between farmer and platform.
///
/// Invariant: `buyer_price_per_kg == farmer_earnings_per_kg +
/// platform_margin_per_kg` and the margin is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub farmer_earnings_per_kg: Decimal,
    pub platform_margin_per_kg: Decimal,
    pub buyer_price_per_kg: Decimal,
}

/// Applies the fee policy to a listed price.
///
/// Farmer earnings are clamped at zero (a flat fee larger than the listed
/// price must never drive earnings negative). A negative platform margin
/// cannot arise from any validated policy; if it does, the configuration is
/// broken and the caller must stop settling orders under it.
pub fn settle(
    base_price_per_kg: Decimal,
    policy: &FeePolicy,
    mode: SettlementMode,
) -> Result<Settlement, ServiceError> {
    let deduction = policy.compute_deduction(base_price_per_kg);

    let (farmer_earnings_per_kg, buyer_price_per_kg) = match mode {
        SettlementMode::DeductFromListed => (
            (base_price_per_kg - deduction).max(Decimal::ZERO),
            base_price_per_kg,
        ),
        SettlementMode::AddOnTop => (base_price_per_kg, base_price_per_kg + deduction),
    };

    let platform_margin_per_kg = buyer_price_per_kg - farmer_earnings_per_kg;
    if platform_margin_per_kg.is_sign_negative() {
        return Err(ServiceError::ArithmeticInvariantViolation(format!(
            "negative platform margin {} for base price {}",
            platform_margin_per_kg, base_price_per_kg
        )));
    }

    Ok(Settlement {
        farmer_earnings_per_kg,
        platform_margin_per_kg,
        buyer_price_per_kg,
    })
}
