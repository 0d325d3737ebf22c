//! In-memory order ledger.
//!
//! The ledger owns all listings, accepted orders, and the admin activity
//! feed. `place_order` is the single write path for stock: the availability
//! check and the decrement happen under the listing's shard write lock, so
//! two concurrent orders against the same listing can never both succeed
//! when only one fits. Reads (marketplace pages, stats) take no listing lock
//! and may observe slightly stale stock, which is acceptable here.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{Listing, ModerationDecision, ModerationStatus, Order, OrderStatus, PaymentMethod};
use crate::pricing::{settle, FeePolicy, Settlement, SettlementMode};

/// Number of entries returned in the admin recent-activity feed.
pub const ACTIVITY_FEED_LIMIT: usize = 20;

/// Command to record a purchase against one listing.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrder {
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub buyer_name: String,
    pub quantity_kg: Decimal,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Order,
    Listing,
}

/// One line of the admin "recent activity" feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub detail: String,
    pub amount: String,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregates for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerStats {
    pub total_listings: usize,
    pub total_orders: usize,
    /// Sum of `total_paid` over all orders.
    pub total_revenue: Decimal,
    /// Sum of `quantity * platform_margin_per_kg` over all orders.
    pub total_platform_margin: Decimal,
    /// Farmers with at least one listing.
    pub active_farmers: usize,
    /// Buyers with at least one order.
    pub active_buyers: usize,
    pub recent_activity: Vec<ActivityEntry>,
}

/// The append-only record of listings and accepted orders, settled under one
/// fee policy.
pub struct OrderLedger {
    policy: FeePolicy,
    mode: SettlementMode,
    listings: DashMap<Uuid, Listing>,
    orders: RwLock<Vec<Order>>,
    activity: RwLock<Vec<ActivityEntry>>,
    /// Set if a settlement ever violates the margin invariant. Once set, the
    /// ledger refuses every further order rather than record inconsistent
    /// entries under a broken configuration.
    poisoned: AtomicBool,
}

impl OrderLedger {
    /// Creates a ledger under the given (validated) fee policy.
    pub fn new(policy: FeePolicy, mode: SettlementMode) -> Result<Self, ServiceError> {
        policy.validate()?;
        Ok(Self {
            policy,
            mode,
            listings: DashMap::new(),
            orders: RwLock::new(Vec::new()),
            activity: RwLock::new(Vec::new()),
            poisoned: AtomicBool::new(false),
        })
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.policy
    }

    pub fn settlement_mode(&self) -> SettlementMode {
        self.mode
    }

    /// Per-kg settlement for a listed price under the active policy.
    pub fn settlement_for(&self, base_price_per_kg: Decimal) -> Result<Settlement, ServiceError> {
        settle(base_price_per_kg, &self.policy, self.mode)
    }

    /// Records a newly created listing (pending moderation) and its feed entry.
    #[instrument(skip(self, listing), fields(listing_id = %listing.id, farmer_id = %listing.farmer_id))]
    pub fn submit_listing(&self, listing: Listing) -> Listing {
        self.push_activity(ActivityEntry {
            kind: ActivityKind::Listing,
            detail: format!(
                "Farmer {} listed {} for review",
                listing.farmer_name, listing.name
            ),
            amount: "New Listing".to_string(),
            occurred_at: listing.created_at,
        });
        info!(name = %listing.name, "Listing submitted for moderation");
        self.listings.insert(listing.id, listing.clone());
        listing
    }

    pub fn get_listing(&self, id: Uuid) -> Option<Listing> {
        self.listings.get(&id).map(|l| l.clone())
    }

    /// Listings owned by one farmer, most recent first.
    pub fn listings_for_farmer(&self, farmer_id: Uuid) -> Vec<Listing> {
        let mut out: Vec<Listing> = self
            .listings
            .iter()
            .filter(|l| l.farmer_id == farmer_id)
            .map(|l| l.clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// Approved listings with stock remaining, for the buyer marketplace.
    pub fn purchasable_listings(&self) -> Vec<Listing> {
        let mut out: Vec<Listing> = self
            .listings
            .iter()
            .filter(|l| l.is_purchasable())
            .map(|l| l.clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// Listings awaiting an admin decision, most recent first.
    pub fn pending_listings(&self) -> Vec<Listing> {
        let mut out: Vec<Listing> = self
            .listings
            .iter()
            .filter(|l| l.status == ModerationStatus::Pending)
            .map(|l| l.clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    /// Applies an admin decision to a pending listing.
    #[instrument(skip(self), fields(listing_id = %listing_id))]
    pub fn moderate(
        &self,
        listing_id: Uuid,
        decision: ModerationDecision,
    ) -> Result<Listing, ServiceError> {
        let mut entry = self
            .listings
            .get_mut(&listing_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Listing {} not found", listing_id)))?;
        entry.apply_decision(decision)?;
        let snapshot = entry.clone();
        drop(entry);

        if snapshot.status == ModerationStatus::Approved {
            self.push_activity(ActivityEntry {
                kind: ActivityKind::Listing,
                detail: format!(
                    "Listing {} by {} approved for sale",
                    snapshot.name, snapshot.farmer_name
                ),
                amount: "Approved".to_string(),
                occurred_at: Utc::now(),
            });
        }
        info!(status = ?snapshot.status, "Listing moderated");
        Ok(snapshot)
    }

    /// Places an order. Preconditions are checked in a fixed sequence and the
    /// first failure wins; a failed call leaves the listing untouched.
    ///
    /// The stock check, the decrement, and the settlement all happen while the
    /// listing's shard write lock is held, so concurrent orders against the
    /// same listing serialize here.
    #[instrument(skip(self, cmd), fields(listing_id = %cmd.listing_id, buyer_id = %cmd.buyer_id))]
    pub fn place_order(&self, cmd: PlaceOrder) -> Result<Order, ServiceError> {
        if self.poisoned.load(Ordering::Acquire) {
            return Err(ServiceError::ArithmeticInvariantViolation(
                "fee policy disabled after a settlement invariant violation".to_string(),
            ));
        }

        let mut entry = self.listings.get_mut(&cmd.listing_id).ok_or_else(|| {
            ServiceError::NotFound(format!("Listing {} not found", cmd.listing_id))
        })?;

        if entry.status != ModerationStatus::Approved {
            return Err(ServiceError::ListingNotApprovedForSale(format!(
                "Listing {} is {:?}",
                entry.id, entry.status
            )));
        }
        if cmd.quantity_kg <= Decimal::ZERO {
            return Err(ServiceError::InvalidQuantity(format!(
                "Order quantity must be positive, got {}",
                cmd.quantity_kg
            )));
        }
        if cmd.quantity_kg > entry.remaining_quantity_kg {
            return Err(ServiceError::InsufficientStock(format!(
                "Requested {}kg but only {}kg remaining",
                cmd.quantity_kg, entry.remaining_quantity_kg
            )));
        }
        if cmd.delivery_address.trim().is_empty() {
            return Err(ServiceError::MissingDeliveryAddress);
        }
        cmd.payment_method.validate_credential()?;

        let settlement = match settle(entry.base_price_per_kg, &self.policy, self.mode) {
            Ok(s) => s,
            Err(e) => {
                // Nothing has been mutated yet; poison the ledger so no later
                // order is recorded under the broken configuration.
                self.poisoned.store(true, Ordering::Release);
                warn!(error = %e, "Settlement invariant violated; ledger poisoned");
                return Err(e);
            }
        };

        // Past this point nothing can fail: decrement and append together
        // form the atomic step.
        entry.remaining_quantity_kg -= cmd.quantity_kg;

        let order = Order {
            id: Uuid::new_v4(),
            listing_id: entry.id,
            listing_name: entry.name.clone(),
            farmer_id: entry.farmer_id,
            farmer_name: entry.farmer_name.clone(),
            buyer_id: cmd.buyer_id,
            buyer_name: cmd.buyer_name.clone(),
            quantity_kg: cmd.quantity_kg,
            settlement,
            total_paid: settlement.buyer_price_per_kg * cmd.quantity_kg,
            payment_method: cmd.payment_method.label(),
            delivery_address: cmd.delivery_address.trim().to_string(),
            status: OrderStatus::Placed,
            created_at: Utc::now(),
        };
        drop(entry);

        self.push_activity(ActivityEntry {
            kind: ActivityKind::Order,
            detail: format!(
                "Buyer {} purchased {}kg of {}",
                order.buyer_name,
                order.quantity_kg.normalize(),
                order.listing_name
            ),
            amount: format!("+₹{} Logistics", order.platform_margin_total().normalize()),
            occurred_at: order.created_at,
        });
        self.write_orders().push(order.clone());

        info!(
            order_id = %order.id,
            total_paid = %order.total_paid,
            "Order placed"
        );
        Ok(order)
    }

    /// Orders placed by one buyer, most recent first.
    pub fn orders_for_buyer(&self, buyer_id: Uuid) -> Vec<Order> {
        self.read_orders()
            .iter()
            .rev()
            .filter(|o| o.buyer_id == buyer_id)
            .cloned()
            .collect()
    }

    /// Orders against any of one farmer's listings, most recent first.
    pub fn orders_for_farmer(&self, farmer_id: Uuid) -> Vec<Order> {
        self.read_orders()
            .iter()
            .rev()
            .filter(|o| o.farmer_id == farmer_id)
            .cloned()
            .collect()
    }

    /// Revenue and margin aggregates plus the reverse-chronological activity
    /// feed. Computed from snapshots; concurrent writers may land between the
    /// order and listing reads.
    pub fn compute_stats(&self) -> LedgerStats {
        let (total_orders, total_revenue, total_platform_margin, buyers) = {
            let orders = self.read_orders();
            let buyers: HashSet<Uuid> = orders.iter().map(|o| o.buyer_id).collect();
            let revenue = orders.iter().map(|o| o.total_paid).sum();
            let margin = orders.iter().map(|o| o.platform_margin_total()).sum();
            (orders.len(), revenue, margin, buyers.len())
        };

        let mut farmers = HashSet::new();
        let mut total_listings = 0usize;
        for l in self.listings.iter() {
            farmers.insert(l.farmer_id);
            total_listings += 1;
        }

        let recent_activity = {
            let feed = self
                .activity
                .read()
                .unwrap_or_else(|e| e.into_inner());
            feed.iter()
                .rev()
                .take(ACTIVITY_FEED_LIMIT)
                .cloned()
                .collect()
        };

        LedgerStats {
            total_listings,
            total_orders,
            total_revenue,
            total_platform_margin,
            active_farmers: farmers.len(),
            active_buyers: buyers,
            recent_activity,
        }
    }

    fn push_activity(&self, entry: ActivityEntry) {
        self.activity
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }

    // Lock poisoning only means a writer panicked mid-append; the collections
    // are append-only so the data is still usable.
    fn read_orders(&self) -> std::sync::RwLockReadGuard<'_, Vec<Order>> {
        self.orders.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_orders(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Order>> {
        self.orders.write().unwrap_or_else(|e| e.into_inner())
    }
}
