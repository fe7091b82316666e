#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    Schema, Set,
};
use tokio::sync::mpsc;
use uuid::Uuid;

use vendora_api::config::AppConfig;
use vendora_api::entities::{self, machine_slot, product, vending_machine};
use vendora_api::events::EventSender;
use vendora_api::AppServices;

/// Test harness: in-memory SQLite with the schema derived from the
/// entities, and the full service graph wired over it.
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    pub config: Arc<AppConfig>,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single connection so every query sees the same in-memory DB.
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.expect("sqlite connect");

        let backend = db.get_database_backend();
        let schema = Schema::new(backend);
        let statements = vec![
            schema.create_table_from_entity(entities::VendingMachine),
            schema.create_table_from_entity(entities::Product),
            schema.create_table_from_entity(entities::MachineSlot),
            schema.create_table_from_entity(entities::Cart),
            schema.create_table_from_entity(entities::CartItem),
            schema.create_table_from_entity(entities::Order),
            schema.create_table_from_entity(entities::OrderItem),
            schema.create_table_from_entity(entities::Payment),
        ];
        for statement in statements {
            db.execute(backend.build(&statement))
                .await
                .expect("create table");
        }

        let db = Arc::new(db);
        let config = Arc::new(AppConfig::new("sqlite::memory:", "test"));

        let (event_tx, mut event_rx) = mpsc::channel(256);
        tokio::spawn(async move { while event_rx.recv().await.is_some() {} });
        let event_sender = Arc::new(EventSender::new(event_tx));

        let services = AppServices::build(db.clone(), event_sender, config.clone());

        Self {
            db,
            services,
            config,
        }
    }

    pub async fn seed_machine(&self, name: &str) -> vending_machine::Model {
        let now = Utc::now();
        vending_machine::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            location: Set(format!("{} lobby", name)),
            status: Set(vending_machine::MachineStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed machine")
    }

    pub async fn seed_product(&self, name: &str, sku: &str) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(Some(format!("{} (330ml)", name))),
            sku: Set(sku.to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed product")
    }

    pub async fn seed_slot(
        &self,
        machine_id: Uuid,
        slot_number: i32,
        product_id: Uuid,
        quantity: i32,
        price: Decimal,
    ) -> machine_slot::Model {
        machine_slot::ActiveModel {
            id: Set(Uuid::new_v4()),
            machine_id: Set(machine_id),
            slot_number: Set(slot_number),
            product_id: Set(product_id),
            quantity: Set(quantity),
            max_capacity: Set(quantity.max(10)),
            price: Set(price),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("seed slot")
    }

    pub async fn slot_quantity(&self, machine_id: Uuid, slot_number: i32) -> i32 {
        self.services
            .inventory
            .get_slot(machine_id, slot_number)
            .await
            .expect("get slot")
            .expect("slot exists")
            .quantity
    }

    pub async fn set_machine_status(
        &self,
        machine_id: Uuid,
        status: vending_machine::MachineStatus,
    ) {
        let machine = entities::VendingMachine::find_by_id(machine_id)
            .one(&*self.db)
            .await
            .expect("find machine")
            .expect("machine exists");
        let mut active: vending_machine::ActiveModel = machine.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.expect("update machine");
    }

    pub async fn set_slot_price(&self, machine_id: Uuid, slot_number: i32, price: Decimal) {
        let slot = self
            .services
            .inventory
            .get_slot(machine_id, slot_number)
            .await
            .expect("get slot")
            .expect("slot exists");
        let mut active: machine_slot::ActiveModel = slot.into();
        active.price = Set(price);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.expect("update slot");
    }

    pub async fn set_slot_stock(&self, machine_id: Uuid, slot_number: i32, quantity: i32) {
        let slot = self
            .services
            .inventory
            .get_slot(machine_id, slot_number)
            .await
            .expect("get slot")
            .expect("slot exists");
        let mut active: machine_slot::ActiveModel = slot.into();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await.expect("update slot");
    }

    pub async fn delete_slot(&self, machine_id: Uuid, slot_number: i32) {
        let slot = self
            .services
            .inventory
            .get_slot(machine_id, slot_number)
            .await
            .expect("get slot")
            .expect("slot exists");
        entities::MachineSlot::delete_by_id(slot.id)
            .exec(&*self.db)
            .await
            .expect("delete slot");
    }
}
