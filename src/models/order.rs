use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::pricing::Settlement;

/// Payment instrument selected at checkout, with whatever credential that
/// instrument requires. Credentials are request-scoped; nothing is stored
/// beyond the method label on the order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Upi { upi_id: String },
    Gpay,
    Card { card_number: String },
    NetBanking { bank: String },
    Cash,
}

impl PaymentMethod {
    /// Checks that the required credential is present and well-formed.
    pub fn validate_credential(&self) -> Result<(), ServiceError> {
        match self {
            PaymentMethod::Upi { upi_id } => {
                if !upi_id.trim().contains('@') {
                    return Err(ServiceError::InvalidPaymentCredential(
                        "UPI id must contain '@'".to_string(),
                    ));
                }
            }
            PaymentMethod::Card { card_number } => {
                let digits: String = card_number
                    .chars()
                    .filter(|c| !c.is_whitespace() && *c != '-')
                    .collect();
                if digits.len() < 16 || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(ServiceError::InvalidPaymentCredential(
                        "Card number must be at least 16 digits".to_string(),
                    ));
                }
            }
            PaymentMethod::NetBanking { bank } => {
                if bank.trim().is_empty() {
                    return Err(ServiceError::InvalidPaymentCredential(
                        "A bank must be selected for net banking".to_string(),
                    ));
                }
            }
            // GPay and cash-on-delivery carry no credential here.
            PaymentMethod::Gpay | PaymentMethod::Cash => {}
        }
        Ok(())
    }

    /// Display label stored on the order record.
    pub fn label(&self) -> String {
        match self {
            PaymentMethod::Upi { .. } => "UPI".to_string(),
            PaymentMethod::Gpay => "GPay".to_string(),
            PaymentMethod::Card { .. } => "Card".to_string(),
            PaymentMethod::NetBanking { bank } => format!("NetBanking - {}", bank.trim()),
            PaymentMethod::Cash => "Cash".to_string(),
        }
    }
}

/// Fulfillment is driven by external logistics; the ledger only records the
/// current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Placed,
    Fulfilled,
    Cancelled,
}

/// An accepted purchase against one listing. Append-only; created together
/// with the stock decrement in a single ledger step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub listing_name: String,
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub buyer_id: Uuid,
    pub buyer_name: String,
    pub quantity_kg: Decimal,
    /// Per-kg split active when the order was settled.
    pub settlement: Settlement,
    /// `settlement.buyer_price_per_kg * quantity_kg`.
    pub total_paid: Decimal,
    pub payment_method: String,
    pub delivery_address: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Total platform margin collected on this order.
    pub fn platform_margin_total(&self) -> Decimal {
        self.settlement.platform_margin_per_kg * self.quantity_kg
    }
}
