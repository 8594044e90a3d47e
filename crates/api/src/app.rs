use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{
        header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE},
        Method, StatusCode,
    },
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::warn;

use crate::error::AppError;
use crate::middleware::jwt::jwt_middleware;
use crate::routes::{auth, bookings, connections, payments, turfs};
use crate::state::AppState;
use infra::Store;

/// Build the Axum router with every route, generic over the store backing it.
pub fn build_router<S: Store>(state: AppState<S>) -> Router {
    // Rate limiting: 10 requests per minute per client IP on login and register
    let governor_conf = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_second(6) // 1 token every 6 seconds = ~10/min
        .burst_size(10)
        .finish();

    let rate_limited_routes = Router::new()
        .route("/auth/register", post(auth::register::<S>))
        .route("/auth/login", post(auth::login::<S>));
    let rate_limited_routes = match governor_conf {
        Some(conf) => rate_limited_routes.layer(GovernorLayer::new(Arc::new(conf))),
        None => {
            warn!("Invalid rate limit configuration, auth routes are not rate limited");
            rate_limited_routes
        }
    };

    Router::new()
        .route("/health", get(health::<S>))
        // Identity
        .route("/auth/verify/{token}", get(auth::verify_email::<S>))
        .route("/auth/forgot-password", post(auth::forgot_password::<S>))
        .route("/auth/reset-password/{token}", post(auth::reset_password::<S>))
        .route("/auth/me", get(auth::me::<S>).put(auth::update_profile::<S>))
        .merge(rate_limited_routes)
        // Catalog
        .route("/turfs", get(turfs::list_turfs::<S>).post(turfs::create_turf::<S>))
        .route("/turfs/mine", get(turfs::list_my_turfs::<S>))
        .route("/turfs/states", get(turfs::list_states::<S>))
        .route("/turfs/cities/{state}", get(turfs::list_cities::<S>))
        .route(
            "/turfs/{id}",
            get(turfs::get_turf::<S>)
                .put(turfs::update_turf::<S>)
                .delete(turfs::delete_turf::<S>),
        )
        .route("/turfs/{id}/slots", post(turfs::add_slot::<S>))
        .route("/turfs/{id}/rebuild-slots", post(turfs::rebuild_slots::<S>))
        .route("/turfs/{id}/slots/{label}", delete(turfs::remove_slot::<S>))
        .route("/turfs/{id}/availability", get(turfs::availability::<S>))
        // Ledger
        .route("/bookings", post(bookings::reserve::<S>))
        .route("/bookings/mine", get(bookings::list_mine::<S>))
        .route("/bookings/owner", get(bookings::list_for_owner::<S>))
        .route("/bookings/{id}/cancel", post(bookings::cancel::<S>))
        .route("/bookings/{id}/confirm", post(bookings::confirm::<S>))
        .route("/payments/checkout", post(payments::checkout::<S>))
        .route("/payments/confirm", post(payments::confirm_payment::<S>))
        // Group formation
        .route("/connections", post(connections::create::<S>))
        .route("/connections/open", get(connections::list_open::<S>))
        .route("/connections/mine", get(connections::list_mine::<S>))
        .route(
            "/connections/{id}",
            get(connections::get::<S>).delete(connections::delete::<S>),
        )
        .route("/connections/{id}/join", post(connections::join::<S>))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, jwt_middleware::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer({
            let allowed_origins = std::env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string());

            let origins: Vec<HeaderValue> = allowed_origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, AUTHORIZATION])
                .allow_credentials(true)
        })
}

/// Liveness + store probe.
async fn health<S: Store>(State(state): State<AppState<S>>) -> Result<&'static str, AppError> {
    state.store.ping().await?;
    Ok("ok")
}
