use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::json;

use crate::{
    errors::ServiceError,
    services::users::{LoginRequest, LoginResponse, RegisterRequest},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.users.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "msg": "User created successfully",
            "id": user.id,
        })),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    let response = state.users.login(request).await?;
    Ok(Json(response))
}
