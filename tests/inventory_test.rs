//! Inventory primitive tests: conditional reservation, compensation, and
//! restock behavior.

mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;
use vendora_api::errors::ServiceError;

#[tokio::test]
async fn reserve_decrements_until_stock_runs_out() {
    let app = TestApp::new().await;
    let machine = app.seed_machine("Atrium").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    app.seed_slot(machine.id, 1, cola.id, 10, dec!(25.00)).await;

    // The conditional guard admits exactly ten single-unit reservations.
    let mut succeeded = 0;
    for _ in 0..20 {
        if app
            .services
            .inventory
            .reserve(machine.id, 1, cola.id, 1)
            .await
            .is_ok()
        {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 10);
    assert_eq!(app.slot_quantity(machine.id, 1).await, 0);
}

#[tokio::test]
async fn reserve_rejects_more_than_available() {
    let app = TestApp::new().await;
    let machine = app.seed_machine("Atrium").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    app.seed_slot(machine.id, 1, cola.id, 3, dec!(25.00)).await;

    let err = app
        .services
        .inventory
        .reserve(machine.id, 1, cola.id, 4)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));
    assert_eq!(app.slot_quantity(machine.id, 1).await, 3);

    let err = app
        .services
        .inventory
        .reserve(machine.id, 1, cola.id, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn reserve_requires_the_slot_to_hold_the_product() {
    let app = TestApp::new().await;
    let machine = app.seed_machine("Atrium").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    app.seed_slot(machine.id, 1, cola.id, 3, dec!(25.00)).await;

    let err = app
        .services
        .inventory
        .reserve(machine.id, 1, Uuid::new_v4(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));
    assert_eq!(app.slot_quantity(machine.id, 1).await, 3);
}

#[tokio::test]
async fn restore_round_trips_a_reservation() {
    let app = TestApp::new().await;
    let machine = app.seed_machine("Atrium").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    app.seed_slot(machine.id, 1, cola.id, 5, dec!(25.00)).await;

    app.services
        .inventory
        .reserve(machine.id, 1, cola.id, 3)
        .await
        .unwrap();
    assert_eq!(app.slot_quantity(machine.id, 1).await, 2);

    let restored = app
        .services
        .inventory
        .restore(machine.id, 1, cola.id, 3)
        .await
        .unwrap();
    assert!(restored);
    assert_eq!(app.slot_quantity(machine.id, 1).await, 5);
}

#[tokio::test]
async fn restore_on_a_missing_slot_reports_instead_of_failing() {
    let app = TestApp::new().await;
    let machine = app.seed_machine("Atrium").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;

    let restored = app
        .services
        .inventory
        .restore(machine.id, 99, cola.id, 2)
        .await
        .unwrap();
    assert!(!restored);
}

#[tokio::test]
async fn is_in_stock_checks_product_and_quantity() {
    let app = TestApp::new().await;
    let machine = app.seed_machine("Atrium").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    app.seed_slot(machine.id, 1, cola.id, 2, dec!(25.00)).await;

    assert!(app
        .services
        .inventory
        .is_in_stock(machine.id, 1, cola.id, 2)
        .await
        .unwrap());
    assert!(!app
        .services
        .inventory
        .is_in_stock(machine.id, 1, cola.id, 3)
        .await
        .unwrap());
    assert!(!app
        .services
        .inventory
        .is_in_stock(machine.id, 1, Uuid::new_v4(), 1)
        .await
        .unwrap());
    assert!(!app
        .services
        .inventory
        .is_in_stock(machine.id, 99, cola.id, 1)
        .await
        .unwrap());
}

#[tokio::test]
async fn restock_caps_at_capacity_and_rejects_negatives() {
    let app = TestApp::new().await;
    let machine = app.seed_machine("Atrium").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    // seed_slot sets max_capacity to at least 10.
    app.seed_slot(machine.id, 1, cola.id, 2, dec!(25.00)).await;

    let slot = app
        .services
        .inventory
        .set_slot_quantity(machine.id, 1, 50)
        .await
        .unwrap();
    assert_eq!(slot.quantity, slot.max_capacity);

    let err = app
        .services
        .inventory
        .set_slot_quantity(machine.id, 1, -1)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let err = app
        .services
        .inventory
        .set_slot_quantity(machine.id, 99, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
