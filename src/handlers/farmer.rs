use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    models::{Order, Role},
    services::listings::{CreateListingRequest, ListingView},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_listing).get(my_listings))
        .route("/orders", get(my_orders))
}

async fn create_listing(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateListingRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_role(Role::Farmer)?;
    let response = state
        .listings
        .create_listing(user.user_id, &user.name, request)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn my_listings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ListingView>>, ServiceError> {
    user.require_role(Role::Farmer)?;
    Ok(Json(state.listings.listings_for_farmer(user.user_id)?))
}

async fn my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Order>>, ServiceError> {
    user.require_role(Role::Farmer)?;
    Ok(Json(state.orders.orders_for_farmer(user.user_id)))
}
