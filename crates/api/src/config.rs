use std::time::Duration;

use crate::auth::AuthConfig;
use crate::services::{EmailConfig, PaymentConfig};

/// Bounds applied to every unit of work against the store.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub timeout: Duration,
    /// Attempts after the first one for transient failures.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            max_retries: 3,
            initial_backoff: Duration::from_millis(25),
            max_backoff: Duration::from_millis(500),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: std::env::var("STORE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            max_retries: std::env::var("STORE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            ..defaults
        }
    }

    /// Exponential backoff before retry number `attempt` (1-based), capped at `max_backoff`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Everything the application state is built from.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub store: StoreConfig,
    pub email: Option<EmailConfig>,
    pub payment: Option<PaymentConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let email = EmailConfig::from_env();
        if email.is_none() {
            tracing::warn!("SCW_* variables not set, outgoing mail is disabled");
        }
        let payment = PaymentConfig::from_env();
        if payment.is_none() {
            tracing::warn!("STRIPE_SECRET_KEY not set, checkout is disabled");
        }

        Ok(Self {
            auth: AuthConfig::from_env()?,
            store: StoreConfig::from_env(),
            email,
            payment,
        })
    }
}
