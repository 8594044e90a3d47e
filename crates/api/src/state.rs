use infra::{PgStore, Store};

use crate::auth::{AuthConfig, JwtService};
use crate::config::AppConfig;
use crate::services::{
    Catalog, ConnectionCoordinator, EmailService, PaymentService, ReservationCoordinator,
};

#[derive(Clone)]
pub struct AppState<S: Store = PgStore> {
    pub store: S,
    auth_config: AuthConfig,
    jwt_service: JwtService,
    email_service: Option<EmailService>,
    payment_service: Option<PaymentService>,
    reservations: ReservationCoordinator<S>,
    connections: ConnectionCoordinator<S>,
    catalog: Catalog<S>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, config: AppConfig) -> Self {
        let jwt_service = JwtService::new(&config.auth);

        Self {
            reservations: ReservationCoordinator::new(store.clone(), config.store.clone()),
            connections: ConnectionCoordinator::new(store.clone(), config.store.clone()),
            catalog: Catalog::new(store.clone(), config.store),
            store,
            auth_config: config.auth,
            jwt_service,
            email_service: config.email.map(EmailService::new),
            payment_service: config.payment.map(PaymentService::new),
        }
    }

    pub fn from_env(store: S) -> anyhow::Result<Self> {
        Ok(Self::new(store, AppConfig::from_env()?))
    }

    pub fn auth_config(&self) -> &AuthConfig {
        &self.auth_config
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    pub fn email_service(&self) -> Option<&EmailService> {
        self.email_service.as_ref()
    }

    pub fn payment_service(&self) -> Option<&PaymentService> {
        self.payment_service.as_ref()
    }

    pub fn reservations(&self) -> &ReservationCoordinator<S> {
        &self.reservations
    }

    pub fn connections(&self) -> &ConnectionCoordinator<S> {
        &self.connections
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }
}
