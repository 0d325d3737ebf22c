use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::OrderLedger,
    models::{Listing, ModerationDecision, ModerationStatus},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateListingRequest {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    /// Listed price in currency units per kilogram.
    pub price_per_kg: Decimal,
    pub quantity_kg: Decimal,
}

/// Returned to the farmer on creation: what they will actually earn per kg
/// under the active fee policy, and the total deduction across the lot.
#[derive(Debug, Serialize)]
pub struct CreateListingResponse {
    pub id: Uuid,
    pub status: ModerationStatus,
    pub earnings_per_kg: Decimal,
    pub deduction_total: Decimal,
}

/// Farmer-facing view of a listing with its settlement split.
#[derive(Debug, Serialize)]
pub struct ListingView {
    pub id: Uuid,
    pub name: String,
    pub base_price_per_kg: Decimal,
    pub farmer_earnings_per_kg: Decimal,
    pub buyer_price_per_kg: Decimal,
    pub remaining_quantity_kg: Decimal,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
}

/// Buyer-facing marketplace entry. Only the buyer price is exposed.
#[derive(Debug, Serialize)]
pub struct MarketplaceListing {
    pub id: Uuid,
    pub name: String,
    pub price_per_kg: Decimal,
    pub available_quantity_kg: Decimal,
    pub farmer_name: String,
}

/// Admin moderation view: the full price deconstruction.
#[derive(Debug, Serialize)]
pub struct PendingListing {
    pub id: Uuid,
    pub name: String,
    pub farmer_name: String,
    pub base_price_per_kg: Decimal,
    pub farmer_earnings_per_kg: Decimal,
    pub buyer_price_per_kg: Decimal,
    pub quantity_kg: Decimal,
    pub submitted_at: DateTime<Utc>,
}

/// Listing creation, queries, and moderation on top of the ledger.
#[derive(Clone)]
pub struct ListingService {
    ledger: Arc<OrderLedger>,
    event_sender: EventSender,
}

impl ListingService {
    pub fn new(ledger: Arc<OrderLedger>, event_sender: EventSender) -> Self {
        Self {
            ledger,
            event_sender,
        }
    }

    /// Creates a listing in `Pending` status on behalf of a farmer.
    #[instrument(skip(self, request), fields(farmer_id = %farmer_id, name = %request.name))]
    pub async fn create_listing(
        &self,
        farmer_id: Uuid,
        farmer_name: &str,
        request: CreateListingRequest,
    ) -> Result<CreateListingResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let listing = Listing::new(
            farmer_id,
            farmer_name,
            request.name,
            request.price_per_kg,
            request.quantity_kg,
        )?;
        let settlement = self.ledger.settlement_for(listing.base_price_per_kg)?;
        let listing = self.ledger.submit_listing(listing);

        if let Err(e) = self
            .event_sender
            .send(Event::ListingSubmitted {
                listing_id: listing.id,
                farmer_id,
                name: listing.name.clone(),
            })
            .await
        {
            warn!(error = %e, "Failed to send listing submitted event");
        }

        Ok(CreateListingResponse {
            id: listing.id,
            status: listing.status,
            earnings_per_kg: settlement.farmer_earnings_per_kg,
            deduction_total: settlement.platform_margin_per_kg * listing.initial_quantity_kg,
        })
    }

    /// A farmer's own listings, most recent first.
    pub fn listings_for_farmer(&self, farmer_id: Uuid) -> Result<Vec<ListingView>, ServiceError> {
        self.ledger
            .listings_for_farmer(farmer_id)
            .into_iter()
            .map(|l| self.to_view(l))
            .collect()
    }

    /// Approved, in-stock listings for the buyer marketplace.
    pub fn marketplace(&self) -> Result<Vec<MarketplaceListing>, ServiceError> {
        self.ledger
            .purchasable_listings()
            .into_iter()
            .map(|l| {
                let settlement = self.ledger.settlement_for(l.base_price_per_kg)?;
                Ok(MarketplaceListing {
                    id: l.id,
                    name: l.name,
                    price_per_kg: settlement.buyer_price_per_kg,
                    available_quantity_kg: l.remaining_quantity_kg,
                    farmer_name: l.farmer_name,
                })
            })
            .collect()
    }

    /// Listings awaiting moderation, for the admin panel.
    pub fn pending_listings(&self) -> Result<Vec<PendingListing>, ServiceError> {
        self.ledger
            .pending_listings()
            .into_iter()
            .map(|l| {
                let settlement = self.ledger.settlement_for(l.base_price_per_kg)?;
                Ok(PendingListing {
                    id: l.id,
                    name: l.name,
                    farmer_name: l.farmer_name,
                    base_price_per_kg: l.base_price_per_kg,
                    farmer_earnings_per_kg: settlement.farmer_earnings_per_kg,
                    buyer_price_per_kg: settlement.buyer_price_per_kg,
                    quantity_kg: l.initial_quantity_kg,
                    submitted_at: l.created_at,
                })
            })
            .collect()
    }

    /// Applies an admin decision to a pending listing.
    #[instrument(skip(self), fields(listing_id = %listing_id, decision = ?decision))]
    pub async fn moderate(
        &self,
        listing_id: Uuid,
        decision: ModerationDecision,
    ) -> Result<Listing, ServiceError> {
        let listing = self.ledger.moderate(listing_id, decision)?;

        if let Err(e) = self
            .event_sender
            .send(Event::ListingModerated {
                listing_id,
                approved: listing.status == ModerationStatus::Approved,
            })
            .await
        {
            warn!(error = %e, "Failed to send listing moderated event");
        }
        Ok(listing)
    }

    fn to_view(&self, listing: Listing) -> Result<ListingView, ServiceError> {
        let settlement = self.ledger.settlement_for(listing.base_price_per_kg)?;
        Ok(ListingView {
            id: listing.id,
            name: listing.name,
            base_price_per_kg: listing.base_price_per_kg,
            farmer_earnings_per_kg: settlement.farmer_earnings_per_kg,
            buyer_price_per_kg: settlement.buyer_price_per_kg,
            remaining_quantity_kg: listing.remaining_quantity_kg,
            status: listing.status,
            created_at: listing.created_at,
        })
    }
}
