mod common;

use axum::http::{Method, StatusCode};
use common::{reserve_body, test_app};
use infra::models::UserRole;
use serde_json::json;

#[tokio::test]
async fn owners_manage_their_turfs() {
    let app = test_app();
    let (turf_id, owner) = app.create_turf(&["6-7 AM"]).await;
    let (_, player) = app.create_user(UserRole::Player).await;
    let (_, other_owner) = app.create_user(UserRole::Owner).await;

    let (status, _) = app
        .post("/turfs", Some(&player), json!({ "name": "Mine", "price": 100 }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, detail) = app.get(&format!("/turfs/{turf_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "Green Field");
    assert_eq!(detail["owner"]["name"], "Test User");
    assert_eq!(detail["slots"][0]["time"], "6-7 AM");

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/turfs/{turf_id}"),
            Some(&other_owner),
            Some(json!({ "price": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .request(
            Method::PUT,
            &format!("/turfs/{turf_id}"),
            Some(&owner),
            Some(json!({ "price": 950 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], 950);

    let (status, mine) = app.get("/turfs/mine", Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, by_city) = app.get("/turfs?city=Pune", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_city.as_array().unwrap().len(), 1);
    let (_, elsewhere) = app.get("/turfs?city=Delhi", None).await;
    assert!(elsewhere.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn slots_added_removed_and_rebuilt() {
    let app = test_app();
    let (turf_id, owner) = app.create_turf(&["6-7 AM"]).await;
    let (_, player) = app.create_user(UserRole::Player).await;

    let (status, turf) = app
        .post(&format!("/turfs/{turf_id}/slots"), Some(&owner), json!({ "time": "7-8 AM" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(turf["slots"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .post(&format!("/turfs/{turf_id}/slots"), Some(&owner), json!({ "time": "7-8 AM" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post("/bookings", Some(&player), reserve_body(turf_id, "2026-07-01", "7-8 AM"))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, turf) = app
        .request(
            Method::DELETE,
            &format!("/turfs/{turf_id}/slots/7-8%20AM"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(turf["slots"].as_array().unwrap().len(), 1);

    let (_, mine) = app.get("/bookings/mine", Some(&player)).await;
    assert_eq!(mine[0]["status"], "Pending");

    // Re-adding a label that still has an active booking starts out booked.
    let (_, turf) = app
        .post(&format!("/turfs/{turf_id}/slots"), Some(&owner), json!({ "time": "7-8 AM" }))
        .await;
    let readded = turf["slots"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["time"] == "7-8 AM")
        .unwrap()
        .clone();
    assert_eq!(readded["booked"], true);

    let (status, rebuilt) = app
        .post(&format!("/turfs/{turf_id}/rebuild-slots"), Some(&owner), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rebuilt["slots"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn deleting_turf_keeps_bookings() {
    let app = test_app();
    let (turf_id, owner) = app.create_turf(&["6-7 AM"]).await;
    let (_, player) = app.create_user(UserRole::Player).await;

    let (_, booking) = app
        .post("/bookings", Some(&player), reserve_body(turf_id, "2026-07-01", "6-7 AM"))
        .await;
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .request(Method::DELETE, &format!("/turfs/{turf_id}"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, mine) = app.get("/bookings/mine", Some(&player)).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert!(mine[0]["turf_name"].is_null());

    let (status, cancelled) = app
        .post(&format!("/bookings/{booking_id}/cancel"), Some(&player), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "Cancelled");
}

#[tokio::test]
async fn health_reports_ok() {
    let app = test_app();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn a_slot_named_rebuild_is_an_ordinary_slot() {
    let app = test_app();
    let (turf_id, owner) = app.create_turf(&["6-7 AM"]).await;

    let (status, turf) = app
        .post(&format!("/turfs/{turf_id}/slots"), Some(&owner), json!({ "time": "rebuild" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{turf}");

    let (status, turf) = app
        .request(
            Method::DELETE,
            &format!("/turfs/{turf_id}/slots/rebuild"),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{turf}");
    assert_eq!(turf["slots"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .post(&format!("/turfs/{turf_id}/rebuild-slots"), Some(&owner), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn location_dropdowns_list_distinct_values() {
    let app = test_app();
    let (_, owner) = app.create_user(UserRole::Owner).await;

    for (name, city, state) in [
        ("North Arena", "Pune", "Maharashtra"),
        ("South Arena", "Pune", "Maharashtra"),
        ("Bay Turf", "Mumbai", "Maharashtra"),
        ("Lake Field", "Bengaluru", "Karnataka"),
    ] {
        let (status, _) = app
            .post(
                "/turfs",
                Some(&owner),
                json!({ "name": name, "price": 500, "city": city, "state": state }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    app.post("/turfs", Some(&owner), json!({ "name": "Nowhere", "price": 500 }))
        .await;

    let (status, states) = app.get("/turfs/states", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(states, json!(["Karnataka", "Maharashtra"]));

    let (status, cities) = app.get("/turfs/cities/maharashtra", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cities, json!(["Mumbai", "Pune"]));

    let (_, none) = app.get("/turfs/cities/Goa", None).await;
    assert_eq!(none, json!([]));
}
