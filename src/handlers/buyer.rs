use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    models::{Order, Role},
    services::listings::MarketplaceListing,
    services::orders::PlaceOrderRequest,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        // The marketplace is browsable without an account, as in the
        // original storefront.
        .route("/products", get(marketplace))
        .route("/orders", post(place_order).get(my_orders))
}

async fn marketplace(
    State(state): State<AppState>,
) -> Result<Json<Vec<MarketplaceListing>>, ServiceError> {
    Ok(Json(state.listings.marketplace()?))
}

async fn place_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_role(Role::Buyer)?;
    let order = state
        .orders
        .place_order(user.user_id, &user.name, request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "msg": "Order placed successfully",
            "id": order.id,
            "total": order.total_paid,
        })),
    ))
}

async fn my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Order>>, ServiceError> {
    user.require_role(Role::Buyer)?;
    Ok(Json(state.orders.orders_for_buyer(user.user_id)))
}
