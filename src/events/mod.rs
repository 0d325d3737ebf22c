use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Domain events emitted by the services. Consumers are best-effort; a full
/// channel or dropped receiver never fails the originating request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    UserRegistered {
        user_id: Uuid,
        role: String,
    },
    ListingSubmitted {
        listing_id: Uuid,
        farmer_id: Uuid,
        name: String,
    },
    ListingModerated {
        listing_id: Uuid,
        approved: bool,
    },
    OrderPlaced {
        order_id: Uuid,
        listing_id: Uuid,
        quantity_kg: Decimal,
        total_paid: Decimal,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel and logs each event. Runs for the lifetime of
/// the process; exits when every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::UserRegistered { user_id, role } => {
                info!(%user_id, role, "event: user registered");
            }
            Event::ListingSubmitted {
                listing_id, name, ..
            } => {
                info!(%listing_id, name, "event: listing submitted");
            }
            Event::ListingModerated {
                listing_id,
                approved,
            } => {
                info!(%listing_id, approved, "event: listing moderated");
            }
            Event::OrderPlaced {
                order_id,
                total_paid,
                ..
            } => {
                info!(%order_id, %total_paid, "event: order placed");
            }
        }
    }
    info!("Event channel closed; processor exiting");
}
