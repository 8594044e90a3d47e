use std::time::Duration;

use tokio::time::{interval, Interval};
use tracing::{error, info};

use infra::Store;

const CLEANUP_INTERVAL_SECONDS: u64 = 3600;

/// Periodically deletes expired one-time tokens.
pub struct TokenCleanupService<S: Store> {
    store: S,
    interval: Interval,
}

impl<S: Store> TokenCleanupService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            interval: interval(Duration::from_secs(CLEANUP_INTERVAL_SECONDS)),
        }
    }

    pub async fn run(&mut self) {
        info!("Starting token cleanup service");

        loop {
            self.interval.tick().await;
            self.sweep().await;
        }
    }

    async fn sweep(&self) {
        match self.store.delete_expired_tokens().await {
            Ok(0) => {}
            Ok(deleted) => info!("Deleted {} expired tokens", deleted),
            Err(e) => error!("Error deleting expired tokens: {}", e),
        }
    }
}

pub fn spawn_token_cleanup<S: Store>(store: S) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut service = TokenCleanupService::new(store);
        service.run().await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use infra::models::{TokenPurpose, UserRole};
    use infra::repos::{CreateUser, CreateUserToken};
    use infra::MemoryStore;

    #[tokio::test]
    async fn sweep_removes_expired_tokens_only() {
        let store = MemoryStore::new();
        let user = store
            .create_user(CreateUser {
                name: "Asha".into(),
                email: "asha@example.com".into(),
                password_hash: "x".into(),
                role: UserRole::Player,
            })
            .await
            .unwrap();

        store
            .create_user_token(CreateUserToken {
                user_id: user.id,
                purpose: TokenPurpose::PasswordReset,
                token_hash: "expired".into(),
                expires_at: Utc::now() - ChronoDuration::minutes(1),
            })
            .await
            .unwrap();
        store
            .create_user_token(CreateUserToken {
                user_id: user.id,
                purpose: TokenPurpose::EmailVerification,
                token_hash: "live".into(),
                expires_at: Utc::now() + ChronoDuration::hours(1),
            })
            .await
            .unwrap();

        TokenCleanupService::new(store.clone()).sweep().await;

        assert_eq!(store.delete_expired_tokens().await.unwrap(), 0);
        assert_eq!(
            store
                .consume_user_token("live", TokenPurpose::EmailVerification)
                .await
                .unwrap(),
            Some(user.id)
        );
    }
}
