use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    ledger::ActivityEntry,
    models::{Listing, ModerationDecision, Role},
    services::listings::PendingListing,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products/pending", get(pending_listings))
        .route("/products/decision", post(decide))
        .route("/stats", get(stats))
}

#[derive(Debug, Deserialize)]
struct DecisionRequest {
    listing_id: Uuid,
    action: ModerationDecision,
}

/// Platform-wide aggregates for the admin dashboard.
#[derive(Debug, Serialize)]
struct AdminStatsResponse {
    total_farmers: usize,
    total_buyers: usize,
    total_listings: usize,
    total_orders: usize,
    total_revenue: Decimal,
    /// Logistics/commission margin collected across all orders.
    total_platform_margin: Decimal,
    recent_activity: Vec<ActivityEntry>,
}

async fn pending_listings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<PendingListing>>, ServiceError> {
    user.require_role(Role::Admin)?;
    Ok(Json(state.listings.pending_listings()?))
}

async fn decide(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<Listing>, ServiceError> {
    user.require_role(Role::Admin)?;
    let listing = state
        .listings
        .moderate(request.listing_id, request.action)
        .await?;
    Ok(Json(listing))
}

async fn stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<AdminStatsResponse>, ServiceError> {
    user.require_role(Role::Admin)?;
    let ledger_stats = state.ledger.compute_stats();
    Ok(Json(AdminStatsResponse {
        total_farmers: state.users.count_role(Role::Farmer),
        total_buyers: state.users.count_role(Role::Buyer),
        total_listings: ledger_stats.total_listings,
        total_orders: ledger_stats.total_orders,
        total_revenue: ledger_stats.total_revenue,
        total_platform_margin: ledger_stats.total_platform_margin,
        recent_activity: ledger_stats.recent_activity,
    }))
}
