//! Cart manager integration tests: lazy creation, line merging, stock
//! checks, validation reporting, and checkout summaries.

mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;
use vendora_api::errors::ServiceError;
use vendora_api::services::carts::AddItemInput;

const USER: &str = "user-alice";

#[tokio::test]
async fn get_or_create_returns_the_same_active_cart() {
    let app = TestApp::new().await;

    let first = app.services.carts.get_or_create_cart(USER).await.unwrap();
    let second = app.services.carts.get_or_create_cart(USER).await.unwrap();

    assert_eq!(first.cart.id, second.cart.id);
    assert!(second.items.is_empty());
    assert_eq!(second.cart.total_items, 0);
}

#[tokio::test]
async fn add_item_merges_lines_and_recomputes_totals() {
    let app = TestApp::new().await;
    let machine = app.seed_machine("Atrium").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    app.seed_slot(machine.id, 1, cola.id, 5, dec!(25.00)).await;

    let cart = app
        .services
        .carts
        .add_item(
            USER,
            AddItemInput {
                product_id: cola.id,
                machine_id: machine.id,
                slot_number: 1,
                quantity: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(cart.total_items, 2);
    assert_eq!(cart.total_amount, dec!(50.00));

    // Same identity key merges into one line.
    let cart = app
        .services
        .carts
        .add_item(
            USER,
            AddItemInput {
                product_id: cola.id,
                machine_id: machine.id,
                slot_number: 1,
                quantity: 1,
            },
        )
        .await
        .unwrap();
    assert_eq!(cart.total_items, 3);
    assert_eq!(cart.total_amount, dec!(75.00));

    let with_items = app.services.carts.get_or_create_cart(USER).await.unwrap();
    assert_eq!(with_items.items.len(), 1);
    assert_eq!(with_items.items[0].quantity, 3);
    assert_eq!(with_items.items[0].total_price, dec!(75.00));
}

#[tokio::test]
async fn add_item_rejects_more_than_available_stock() {
    let app = TestApp::new().await;
    let machine = app.seed_machine("Atrium").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    app.seed_slot(machine.id, 1, cola.id, 5, dec!(25.00)).await;

    let err = app
        .services
        .carts
        .add_item(
            USER,
            AddItemInput {
                product_id: cola.id,
                machine_id: machine.id,
                slot_number: 1,
                quantity: 6,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // The merged quantity is what gets checked.
    app.services
        .carts
        .add_item(
            USER,
            AddItemInput {
                product_id: cola.id,
                machine_id: machine.id,
                slot_number: 1,
                quantity: 3,
            },
        )
        .await
        .unwrap();
    let err = app
        .services
        .carts
        .add_item(
            USER,
            AddItemInput {
                product_id: cola.id,
                machine_id: machine.id,
                slot_number: 1,
                quantity: 3,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));
}

#[tokio::test]
async fn add_item_validates_input_and_references() {
    let app = TestApp::new().await;
    let machine = app.seed_machine("Atrium").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    app.seed_slot(machine.id, 1, cola.id, 5, dec!(25.00)).await;

    let err = app
        .services
        .carts
        .add_item(
            USER,
            AddItemInput {
                product_id: cola.id,
                machine_id: machine.id,
                slot_number: 1,
                quantity: 0,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let err = app
        .services
        .carts
        .add_item(
            USER,
            AddItemInput {
                product_id: Uuid::new_v4(),
                machine_id: machine.id,
                slot_number: 1,
                quantity: 1,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = app
        .services
        .carts
        .add_item(
            USER,
            AddItemInput {
                product_id: cola.id,
                machine_id: Uuid::new_v4(),
                slot_number: 1,
                quantity: 1,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn update_quantity_zero_removes_the_line() {
    let app = TestApp::new().await;
    let machine = app.seed_machine("Atrium").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    app.seed_slot(machine.id, 1, cola.id, 5, dec!(25.00)).await;

    app.services
        .carts
        .add_item(
            USER,
            AddItemInput {
                product_id: cola.id,
                machine_id: machine.id,
                slot_number: 1,
                quantity: 2,
            },
        )
        .await
        .unwrap();

    let cart = app
        .services
        .carts
        .update_item_quantity(USER, cola.id, machine.id, 1, 0)
        .await
        .unwrap();
    assert_eq!(cart.total_items, 0);
    assert_eq!(cart.total_amount, dec!(0));

    let with_items = app.services.carts.get_or_create_cart(USER).await.unwrap();
    assert!(with_items.items.is_empty());
}

#[tokio::test]
async fn update_quantity_checks_stock_and_recomputes() {
    let app = TestApp::new().await;
    let machine = app.seed_machine("Atrium").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    app.seed_slot(machine.id, 1, cola.id, 5, dec!(25.00)).await;

    app.services
        .carts
        .add_item(
            USER,
            AddItemInput {
                product_id: cola.id,
                machine_id: machine.id,
                slot_number: 1,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    let cart = app
        .services
        .carts
        .update_item_quantity(USER, cola.id, machine.id, 1, 4)
        .await
        .unwrap();
    assert_eq!(cart.total_items, 4);
    assert_eq!(cart.total_amount, dec!(100.00));

    let err = app
        .services
        .carts
        .update_item_quantity(USER, cola.id, machine.id, 1, 9)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));
}

#[tokio::test]
async fn validate_flags_every_kind_of_mismatch() {
    let app = TestApp::new().await;
    let machine_a = app.seed_machine("Atrium").await;
    let machine_b = app.seed_machine("Lobby").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    let chips = app.seed_product("Chips", "SKU-CHIP").await;
    app.seed_slot(machine_a.id, 1, cola.id, 5, dec!(25.00)).await;
    app.seed_slot(machine_b.id, 2, chips.id, 5, dec!(10.00)).await;

    for (product, machine, slot) in [(cola.id, machine_a.id, 1), (chips.id, machine_b.id, 2)] {
        app.services
            .carts
            .add_item(
                USER,
                AddItemInput {
                    product_id: product,
                    machine_id: machine,
                    slot_number: slot,
                    quantity: 2,
                },
            )
            .await
            .unwrap();
    }

    // Nothing wrong yet.
    let report = app.services.carts.validate_cart(USER).await.unwrap();
    assert!(report.is_valid);
    assert!(report.issues.is_empty());

    // Price change on machine A, stock drained on machine B.
    app.set_slot_price(machine_a.id, 1, dec!(30.00)).await;
    app.set_slot_stock(machine_b.id, 2, 1).await;

    let report = app.services.carts.validate_cart(USER).await.unwrap();
    assert!(!report.is_valid);
    assert_eq!(report.issues.len(), 2);
    let reasons: Vec<&str> = report
        .issues
        .iter()
        .map(|issue| issue.reason.as_str())
        .collect();
    assert!(reasons.iter().any(|r| r.contains("price changed")));
    assert!(reasons.iter().any(|r| r.contains("insufficient stock (available 1)")));

    // Machine down flags the line as unavailable.
    app.set_machine_status(
        machine_a.id,
        vendora_api::entities::vending_machine::MachineStatus::Offline,
    )
    .await;
    let report = app.services.carts.validate_cart(USER).await.unwrap();
    assert!(report
        .issues
        .iter()
        .any(|issue| issue.reason == "machine unavailable"));
}

#[tokio::test]
async fn summarize_groups_lines_per_machine() {
    let app = TestApp::new().await;
    let machine_a = app.seed_machine("Atrium").await;
    let machine_b = app.seed_machine("Lobby").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    let chips = app.seed_product("Chips", "SKU-CHIP").await;
    app.seed_slot(machine_a.id, 1, cola.id, 5, dec!(25.00)).await;
    app.seed_slot(machine_b.id, 2, chips.id, 5, dec!(10.00)).await;

    app.services
        .carts
        .add_item(
            USER,
            AddItemInput {
                product_id: cola.id,
                machine_id: machine_a.id,
                slot_number: 1,
                quantity: 2,
            },
        )
        .await
        .unwrap();
    app.services
        .carts
        .add_item(
            USER,
            AddItemInput {
                product_id: chips.id,
                machine_id: machine_b.id,
                slot_number: 2,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    let summary = app.services.carts.summarize_cart(USER).await.unwrap();
    assert_eq!(summary.total_items, 3);
    assert_eq!(summary.subtotal, dec!(60.00));
    assert_eq!(summary.tax, dec!(10.80));
    assert_eq!(summary.final_amount, dec!(70.80));
    assert_eq!(summary.machines.len(), 2);

    let machine_a_group = summary
        .machines
        .iter()
        .find(|group| group.machine_id == machine_a.id)
        .expect("machine A group");
    assert_eq!(machine_a_group.subtotal, dec!(50.00));
}

#[tokio::test]
async fn summarize_empty_cart_is_zeroed() {
    let app = TestApp::new().await;
    app.services.carts.get_or_create_cart(USER).await.unwrap();

    let summary = app.services.carts.summarize_cart(USER).await.unwrap();
    assert_eq!(summary.total_items, 0);
    assert_eq!(summary.subtotal, dec!(0));
    assert_eq!(summary.tax, dec!(0));
    assert_eq!(summary.final_amount, dec!(0));
    assert!(summary.machines.is_empty());
}

#[tokio::test]
async fn clear_cart_empties_lines_but_keeps_the_cart_active() {
    let app = TestApp::new().await;
    let machine = app.seed_machine("Atrium").await;
    let cola = app.seed_product("Cola", "SKU-COLA").await;
    app.seed_slot(machine.id, 1, cola.id, 5, dec!(25.00)).await;

    app.services
        .carts
        .add_item(
            USER,
            AddItemInput {
                product_id: cola.id,
                machine_id: machine.id,
                slot_number: 1,
                quantity: 2,
            },
        )
        .await
        .unwrap();

    let before = app.services.carts.get_or_create_cart(USER).await.unwrap();
    let cleared = app.services.carts.clear_cart(USER).await.unwrap();
    assert_eq!(cleared.id, before.cart.id);
    assert_eq!(cleared.total_items, 0);
    assert_eq!(cleared.total_amount, dec!(0));

    let after = app.services.carts.get_or_create_cart(USER).await.unwrap();
    assert_eq!(after.cart.id, before.cart.id);
    assert!(after.items.is_empty());
}
