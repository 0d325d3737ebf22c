//! Agrimandi API Library
//!
//! Settlement backend for a small agricultural marketplace: farmers list
//! produce, an admin moderates listings, buyers place orders, and the
//! pricing engine splits every rupee between farmer earnings and the
//! platform's logistics margin.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod pricing;
pub mod services;

use std::sync::Arc;

use axum::{extract::FromRef, response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::auth::{AuthConfig, AuthService};
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::ledger::OrderLedger;
use crate::services::{listings::ListingService, orders::OrderService, users::UserService};

/// Shared application state for the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub ledger: Arc<OrderLedger>,
    pub auth: Arc<AuthService>,
    pub users: UserService,
    pub listings: ListingService,
    pub orders: OrderService,
    pub event_sender: EventSender,
}

impl AppState {
    /// Wires the ledger and services from a validated configuration.
    pub fn new(config: AppConfig, event_sender: EventSender) -> Result<Self, ServiceError> {
        let ledger = Arc::new(OrderLedger::new(
            config.fee_policy.clone(),
            config.settlement_mode,
        )?);
        let auth = Arc::new(AuthService::new(AuthConfig {
            jwt_secret: config.jwt_secret.clone(),
            token_ttl: std::time::Duration::from_secs(config.jwt_expiration),
        }));

        Ok(Self {
            users: UserService::new(auth.clone(), event_sender.clone()),
            listings: ListingService::new(ledger.clone(), event_sender.clone()),
            orders: OrderService::new(ledger.clone(), event_sender.clone()),
            config,
            ledger,
            auth,
            event_sender,
        })
    }
}

// Lets the AuthUser extractor pull the auth service out of the app state.
impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Builds the full API router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", handlers::auth::router())
        .nest("/api/farmer", handlers::farmer::router())
        .nest("/api/buyer", handlers::buyer::router())
        .nest("/api/admin", handlers::admin::router())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "agrimandi-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
