use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    ledger::{OrderLedger, PlaceOrder},
    models::{Order, PaymentMethod},
};

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub listing_id: Uuid,
    pub quantity_kg: Decimal,
    #[serde(flatten)]
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
}

/// Checkout on top of the ledger. All stock and settlement rules live in
/// `OrderLedger::place_order`; this layer adds identity and events.
#[derive(Clone)]
pub struct OrderService {
    ledger: Arc<OrderLedger>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(ledger: Arc<OrderLedger>, event_sender: EventSender) -> Self {
        Self {
            ledger,
            event_sender,
        }
    }

    /// Places an order for a buyer.
    #[instrument(skip(self, request), fields(buyer_id = %buyer_id, listing_id = %request.listing_id))]
    pub async fn place_order(
        &self,
        buyer_id: Uuid,
        buyer_name: &str,
        request: PlaceOrderRequest,
    ) -> Result<Order, ServiceError> {
        let order = self.ledger.place_order(PlaceOrder {
            listing_id: request.listing_id,
            buyer_id,
            buyer_name: buyer_name.to_string(),
            quantity_kg: request.quantity_kg,
            payment_method: request.payment_method,
            delivery_address: request.delivery_address,
        })?;

        if let Err(e) = self
            .event_sender
            .send(Event::OrderPlaced {
                order_id: order.id,
                listing_id: order.listing_id,
                quantity_kg: order.quantity_kg,
                total_paid: order.total_paid,
            })
            .await
        {
            warn!(error = %e, order_id = %order.id, "Failed to send order placed event");
        }

        info!(order_id = %order.id, total_paid = %order.total_paid, "Order accepted");
        Ok(order)
    }

    /// A buyer's order history, most recent first.
    pub fn orders_for_buyer(&self, buyer_id: Uuid) -> Vec<Order> {
        self.ledger.orders_for_buyer(buyer_id)
    }

    /// Orders received across a farmer's listings, most recent first.
    pub fn orders_for_farmer(&self, farmer_id: Uuid) -> Vec<Order> {
        self.ledger.orders_for_farmer(farmer_id)
    }
}
