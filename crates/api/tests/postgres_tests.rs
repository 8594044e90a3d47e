//! Runs against a real database only when `TEST_DATABASE_URL` is set.

use std::env;

use api::auth::Actor;
use api::config::StoreConfig;
use api::error::AppError;
use api::services::connections::NewConnection;
use api::services::reservations::{Contact, ReserveRequest};
use api::services::{ConnectionCoordinator, ReservationCoordinator};
use chrono::NaiveDate;
use infra::models::{BookingStatus, ConnectionStatus, TurfRow, UserRole};
use infra::repos::{CreateBooking, CreateTurf, CreateUser};
use infra::{PgStore, Store, StoreError, StoreTx};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn setup_store() -> Option<PgStore> {
    let database_url = env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(PgStore::new(pool))
}

#[tokio::test]
async fn partial_unique_index_guards_active_bookings() {
    let Some(store) = setup_store().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let owner = store
        .create_user(CreateUser {
            name: "Owner".into(),
            email: format!("owner_{}@example.com", Uuid::new_v4().simple()),
            password_hash: "x".into(),
            role: UserRole::Owner,
        })
        .await
        .unwrap();
    let turf = store
        .create_turf(CreateTurf {
            owner_id: owner.id,
            name: "Green Field".into(),
            price: 800,
            description: None,
            address: None,
            city: None,
            state: None,
            slots: vec!["6-7 AM".into()],
        })
        .await
        .unwrap();

    let booking = CreateBooking {
        turf_id: turf.id,
        user_id: owner.id,
        user_name: None,
        user_email: None,
        user_phone: None,
        date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
        slot: "6-7 AM".into(),
    };

    let mut tx = store.begin().await.unwrap();
    let first = tx.insert_booking(booking.clone()).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let second = tx.insert_booking(booking.clone()).await;
    assert!(matches!(second, Err(StoreError::UniqueViolation(_))));
    drop(tx);

    let mut tx = store.begin().await.unwrap();
    tx.update_booking_status(first.id, BookingStatus::Cancelled)
        .await
        .unwrap();
    tx.insert_booking(booking).await.unwrap();
    tx.commit().await.unwrap();

    store.delete_turf(turf.id).await.unwrap();
}

async fn create_actor(store: &PgStore, role: UserRole) -> Actor {
    let user = store
        .create_user(CreateUser {
            name: "Player".into(),
            email: format!("user_{}@example.com", Uuid::new_v4().simple()),
            password_hash: "x".into(),
            role,
        })
        .await
        .unwrap();
    Actor {
        user_id: user.id,
        role,
    }
}

async fn create_turf(store: &PgStore, owner: &Actor) -> TurfRow {
    store
        .create_turf(CreateTurf {
            owner_id: owner.user_id,
            name: "Green Field".into(),
            price: 800,
            description: None,
            address: None,
            city: Some("Pune".into()),
            state: Some("Maharashtra".into()),
            slots: vec!["6-7 AM".into()],
        })
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_admit_exactly_one() {
    let Some(store) = setup_store().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let owner = create_actor(&store, UserRole::Owner).await;
    let turf = create_turf(&store, &owner).await;
    let coordinator = ReservationCoordinator::new(store.clone(), StoreConfig::default());
    let date = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let player = create_actor(&store, UserRole::Player).await;
        let coordinator = coordinator.clone();
        let request = ReserveRequest {
            turf_id: turf.id,
            date,
            slot: "6-7 AM".into(),
            contact: Contact {
                name: "Asha".into(),
                email: "asha@example.com".into(),
                phone: "9999999999".into(),
            },
        };
        handles.push(tokio::spawn(async move {
            coordinator.reserve(&player, request).await
        }));
    }

    let mut created = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(booking) => created.push(booking),
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(created.len(), 1);
    assert_eq!(conflicts, 7);
    assert_eq!(created[0].status, BookingStatus::Pending);

    assert_eq!(store.booked_slots_on(turf.id, date).await.unwrap(), vec!["6-7 AM".to_string()]);
    let cached = store.get_turf(turf.id).await.unwrap().unwrap();
    assert!(cached.slot("6-7 AM").unwrap().booked);

    store.delete_turf(turf.id).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_fill_a_two_player_game_once() {
    let Some(store) = setup_store().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let coordinator = ConnectionCoordinator::new(store.clone(), StoreConfig::default());
    let creator = create_actor(&store, UserRole::Player).await;
    let connection = coordinator
        .create(
            &creator,
            NewConnection {
                turf: "Green Field".into(),
                date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
                max_players: 2,
                sport: "football".into(),
                contact_number: "9999999999".into(),
                email: "captain@example.com".into(),
                message: None,
            },
        )
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let joiner = create_actor(&store, UserRole::Player).await;
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(async move {
            coordinator.join(&joiner, connection.id).await
        }));
    }

    let mut joined = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => joined += 1,
            Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(joined, 1);

    let stored = store.get_connection(connection.id).await.unwrap().unwrap();
    assert_eq!(stored.players.len(), 2);
    assert_eq!(stored.status, ConnectionStatus::Full);

    coordinator.delete(&creator, connection.id).await.unwrap();
}
