use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::pricing::{FeePolicy, SettlementMode};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// JWT secret key (minimum 64 characters)
    pub jwt_secret: String,

    /// JWT expiration time in seconds
    pub jwt_expiration: u64,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Active fee policy: `{ kind = "flat", amount_per_kg }` or
    /// `{ kind = "percentage", rate }`. One per deployment.
    pub fee_policy: FeePolicy,

    /// How the deduction composes with the listed price. Never mixed within
    /// one deployment.
    #[serde(default)]
    pub settlement_mode: SettlementMode,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Validates field constraints and the fee policy parameters.
    pub fn validate(&self) -> Result<(), AppConfigError> {
        if self.jwt_secret.len() < 64 {
            return Err(AppConfigError::Validation(
                "jwt_secret must be at least 64 characters".to_string(),
            ));
        }
        if self.port < 1024 {
            return Err(AppConfigError::Validation(format!(
                "port must be >= 1024, got {}",
                self.port
            )));
        }
        if self.jwt_expiration == 0 {
            return Err(AppConfigError::Validation(
                "jwt_expiration must be positive".to_string(),
            ));
        }
        self.fee_policy
            .validate()
            .map_err(|e| AppConfigError::Validation(e.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Loads configuration from `config/default.toml`, an environment-specific
/// overlay, and `APP__`-prefixed environment variables (highest precedence).
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let builder = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("jwt_expiration", 3600)?
        .set_default("environment", run_env.clone())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        // Historical default: flat ₹5/kg logistics fee deducted from the
        // farmer's side, buyer pays the listed price.
        .set_default("fee_policy.kind", "flat")?
        .set_default("fee_policy.amount_per_kg", "5")?
        .set_default("settlement_mode", "deduct_from_listed")?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"));

    let config = builder.build()?;

    // jwt_secret has no production default. Development falls back to a fixed
    // local-only secret so the server can start without extra setup.
    let config = if config.get_string("jwt_secret").is_err() {
        if run_env == "production" {
            return Err(AppConfigError::Validation(
                "jwt_secret is required in production. Set APP__JWT_SECRET with a secure random string (minimum 64 characters).".to_string(),
            ));
        }
        warn!("jwt_secret not configured; using the built-in development secret");
        Config::builder()
            .add_source(config)
            .set_override("jwt_secret", DEV_DEFAULT_JWT_SECRET)?
            .build()?
    } else {
        config
    };

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;

    info!(
        policy = ?app_config.fee_policy,
        mode = ?app_config.settlement_mode,
        "Configuration loaded"
    );
    Ok(app_config)
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the configured
/// level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("agrimandi_api={},tower_http=info", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            jwt_secret: DEV_DEFAULT_JWT_SECRET.to_string(),
            jwt_expiration: 3600,
            environment: "test".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            fee_policy: FeePolicy::Flat {
                amount_per_kg: dec!(5),
            },
            settlement_mode: SettlementMode::DeductFromListed,
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut cfg = base_config();
        cfg.jwt_secret = "too-short".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn invalid_fee_policy_is_rejected_at_config_time() {
        let mut cfg = base_config();
        cfg.fee_policy = FeePolicy::Percentage { rate: dec!(1.5) };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("commission rate"));
    }

    #[test]
    fn privileged_ports_are_rejected() {
        let mut cfg = base_config();
        cfg.port = 80;
        assert!(cfg.validate().is_err());
    }
}
