mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use api::services::PaymentConfig;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use common::{reserve_body, test_app_with, test_config, TestApp};
use infra::models::{BookingStatus, UserRole};
use infra::Store;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

/// Checkout sessions issued by the local processor, in creation order.
#[derive(Clone, Default)]
struct Processor {
    sessions: Arc<Mutex<Vec<(String, HashMap<String, String>)>>>,
}

impl Processor {
    fn form(&self, index: usize) -> HashMap<String, String> {
        self.sessions.lock().unwrap()[index].1.clone()
    }
}

async fn create_session(
    State(processor): State<Processor>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    let mut sessions = processor.sessions.lock().unwrap();
    let id = format!("cs_test_{}", sessions.len() + 1);
    sessions.push((id.clone(), form));
    Json(json!({
        "id": id,
        "url": format!("https://checkout.test/{id}"),
        "payment_status": "unpaid",
    }))
}

async fn retrieve_session(
    State(processor): State<Processor>,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let sessions = processor.sessions.lock().unwrap();
    let (_, form) = sessions
        .iter()
        .find(|(session_id, _)| *session_id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({
        "id": id,
        "url": null,
        "payment_status": "paid",
        "metadata": { "booking_id": form.get("metadata[booking_id]") },
    })))
}

async fn app_with_processor() -> (TestApp, Processor) {
    let processor = Processor::default();
    let router = Router::new()
        .route("/v1/checkout/sessions", post(create_session))
        .route("/v1/checkout/sessions/{id}", get(retrieve_session))
        .with_state(processor.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let mut config = test_config();
    config.payment = Some(PaymentConfig {
        secret_key: "sk_test".to_string(),
        currency: "inr".to_string(),
        frontend_base_url: "http://app.test".to_string(),
        api_base: format!("http://{addr}"),
    });
    (test_app_with(config), processor)
}

#[tokio::test]
async fn paying_the_first_of_two_checkouts_marks_the_booking_paid() {
    let (app, _) = app_with_processor().await;
    let (turf_id, _) = app.create_turf(&["6-7 AM"]).await;
    let (_, token) = app.create_user(UserRole::Player).await;

    let (_, booking) = app
        .post("/bookings", Some(&token), reserve_body(turf_id, "2026-07-01", "6-7 AM"))
        .await;
    let booking_id = Uuid::parse_str(booking["id"].as_str().unwrap()).unwrap();

    let (status, first) = app
        .post("/payments/checkout", Some(&token), json!({ "bookingId": booking_id }))
        .await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["sessionId"], "cs_test_1");
    assert_eq!(first["url"], "https://checkout.test/cs_test_1");

    let (status, second) = app
        .post("/payments/checkout", Some(&token), json!({ "bookingId": booking_id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["sessionId"], "cs_test_2");

    let (status, paid) = app
        .post("/payments/confirm", None, json!({ "sessionId": "cs_test_1" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{paid}");
    assert_eq!(paid["status"], "Paid");

    let stored = app.state.store.get_booking(booking_id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Paid);
    assert_eq!(stored.payment_session_id.as_deref(), Some("cs_test_1"));

    let (status, again) = app
        .post("/payments/confirm", None, json!({ "sessionId": "cs_test_2" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["status"], "Paid");
}

#[tokio::test]
async fn checkout_names_the_turf_and_describes_the_slot() {
    let (app, processor) = app_with_processor().await;
    let (turf_id, _) = app.create_turf(&["6-7 AM"]).await;
    let (_, token) = app.create_user(UserRole::Player).await;

    let (_, booking) = app
        .post("/bookings", Some(&token), reserve_body(turf_id, "2026-07-01", "6-7 AM"))
        .await;
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post("/payments/checkout", Some(&token), json!({ "bookingId": booking_id }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let form = processor.form(0);
    assert_eq!(form["line_items[0][price_data][product_data][name]"], "Green Field");
    assert_eq!(
        form["line_items[0][price_data][product_data][description]"],
        "Booking slot: 6-7 AM on 2026-07-01"
    );
    assert_eq!(form["line_items[0][price_data][unit_amount]"], "80000");
    assert_eq!(form["metadata[booking_id]"], booking_id);
}

#[tokio::test]
async fn cancelled_booking_cannot_be_checked_out() {
    let (app, processor) = app_with_processor().await;
    let (turf_id, _) = app.create_turf(&["6-7 AM"]).await;
    let (_, token) = app.create_user(UserRole::Player).await;

    let (_, booking) = app
        .post("/bookings", Some(&token), reserve_body(turf_id, "2026-07-01", "6-7 AM"))
        .await;
    let booking_id = booking["id"].as_str().unwrap().to_string();
    app.post(&format!("/bookings/{booking_id}/cancel"), Some(&token), json!({}))
        .await;

    let (status, _) = app
        .post("/payments/checkout", Some(&token), json!({ "bookingId": booking_id }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(processor.sessions.lock().unwrap().is_empty());
}
