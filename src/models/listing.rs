use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Smallest lot a farmer may list. Sub-10kg lots are not worth the logistics
/// pickup and are rejected at creation.
pub const MIN_LISTING_QUANTITY_KG: Decimal = dec!(10);

/// Moderation lifecycle of a listing. `Pending` on creation; an admin
/// decision moves it to `Approved` or `Refused`, both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Refused,
}

impl ModerationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ModerationStatus::Pending)
    }
}

/// An admin's verdict on a pending listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationDecision {
    Approve,
    Refuse,
}

/// A farmer's offer of a quantity of produce at a listed price per kg.
///
/// Immutable after submission except for the moderation status transition
/// and the remaining-stock decrement applied by accepted orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub name: String,
    /// Listed price in currency units per kilogram.
    pub base_price_per_kg: Decimal,
    pub initial_quantity_kg: Decimal,
    pub remaining_quantity_kg: Decimal,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Validates and constructs a new listing in `Pending` status.
    ///
    /// Malformed input is rejected here, at the boundary, so the settlement
    /// calculator can assume a positive price and quantity.
    pub fn new(
        farmer_id: Uuid,
        farmer_name: impl Into<String>,
        name: impl Into<String>,
        base_price_per_kg: Decimal,
        quantity_kg: Decimal,
    ) -> Result<Self, ServiceError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Product name is required".to_string(),
            ));
        }
        if base_price_per_kg <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Price per kg must be positive, got {}",
                base_price_per_kg
            )));
        }
        if quantity_kg < MIN_LISTING_QUANTITY_KG {
            return Err(ServiceError::ValidationError(format!(
                "Minimum listing quantity is {}kg, got {}",
                MIN_LISTING_QUANTITY_KG, quantity_kg
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            farmer_id,
            farmer_name: farmer_name.into(),
            name,
            base_price_per_kg,
            initial_quantity_kg: quantity_kg,
            remaining_quantity_kg: quantity_kg,
            status: ModerationStatus::Pending,
            created_at: Utc::now(),
        })
    }

    /// Applies an admin decision. Only a pending listing may transition;
    /// approved and refused are terminal.
    pub fn apply_decision(&mut self, decision: ModerationDecision) -> Result<(), ServiceError> {
        if self.status.is_terminal() {
            return Err(ServiceError::Conflict(format!(
                "Listing {} has already been moderated",
                self.id
            )));
        }
        self.status = match decision {
            ModerationDecision::Approve => ModerationStatus::Approved,
            ModerationDecision::Refuse => ModerationStatus::Refused,
        };
        Ok(())
    }

    /// Only approved listings with stock remaining may be bought.
    pub fn is_purchasable(&self) -> bool {
        self.status == ModerationStatus::Approved && self.remaining_quantity_kg > Decimal::ZERO
    }
}
