//! Vendora API Library
//!
//! Order fulfillment core for a vending-machine commerce backend: slot
//! inventory, carts, the order lifecycle state machine, and the payment
//! transaction ledger.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod services;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::{CartService, InventoryService, OrderService, PaymentService};

/// The fully wired service graph.
#[derive(Clone)]
pub struct AppServices {
    pub inventory: InventoryService,
    pub carts: CartService,
    pub orders: OrderService,
    pub payments: PaymentService,
}

impl AppServices {
    pub fn build(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        let inventory = InventoryService::new(db.clone(), event_sender.clone());
        let carts = CartService::new(db.clone(), event_sender.clone(), config.clone());
        let orders = OrderService::new(db.clone(), event_sender.clone(), config.clone());
        let payments =
            PaymentService::new(db, event_sender, config, orders.clone());

        Self {
            inventory,
            carts,
            orders,
            payments,
        }
    }
}

/// Shared application state handed to the transport layer.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub event_sender: Arc<EventSender>,
    pub services: AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        let services = AppServices::build(db.clone(), event_sender.clone(), config.clone());
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}
