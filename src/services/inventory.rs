use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::machine_slot::{self, Entity as MachineSlot},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Atomically decrements a slot's quantity iff enough stock remains.
///
/// The quantity guard lives in the UPDATE's WHERE clause, so concurrent
/// reservations can never drive a slot negative. Returns `false` when the
/// slot is missing, holds a different product, or has insufficient stock.
pub(crate) async fn reserve_slot<C: ConnectionTrait>(
    conn: &C,
    machine_id: Uuid,
    slot_number: i32,
    product_id: Uuid,
    quantity: i32,
) -> Result<bool, ServiceError> {
    let result = MachineSlot::update_many()
        .col_expr(
            machine_slot::Column::Quantity,
            Expr::col(machine_slot::Column::Quantity).sub(quantity),
        )
        .col_expr(machine_slot::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(machine_slot::Column::MachineId.eq(machine_id))
        .filter(machine_slot::Column::SlotNumber.eq(slot_number))
        .filter(machine_slot::Column::ProductId.eq(product_id))
        .filter(machine_slot::Column::Quantity.gte(quantity))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Unconditionally increments a slot's quantity (compensation for a
/// released reservation). Returns `false` when the slot is gone or no
/// longer holds the product, so the caller can skip-and-record instead of
/// failing the whole restoration.
pub(crate) async fn restore_slot<C: ConnectionTrait>(
    conn: &C,
    machine_id: Uuid,
    slot_number: i32,
    product_id: Uuid,
    quantity: i32,
) -> Result<bool, ServiceError> {
    let result = MachineSlot::update_many()
        .col_expr(
            machine_slot::Column::Quantity,
            Expr::col(machine_slot::Column::Quantity).add(quantity),
        )
        .col_expr(machine_slot::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(machine_slot::Column::MachineId.eq(machine_id))
        .filter(machine_slot::Column::SlotNumber.eq(slot_number))
        .filter(machine_slot::Column::ProductId.eq(product_id))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Service for slot-level inventory operations.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Reserves stock from a single slot, failing with `InsufficientStock`
    /// when the conditional decrement finds too little quantity.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        machine_id: Uuid,
        slot_number: i32,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::InvalidInput(
                "Reservation quantity must be at least 1".to_string(),
            ));
        }

        let reserved =
            reserve_slot(&*self.db, machine_id, slot_number, product_id, quantity).await?;
        if !reserved {
            return Err(ServiceError::InsufficientStock(format!(
                "machine {} slot {}: cannot reserve {} units",
                machine_id, slot_number, quantity
            )));
        }

        self.event_sender
            .send_or_log(Event::InventoryReserved {
                machine_id,
                slot_number,
                product_id,
                quantity,
            })
            .await;

        Ok(())
    }

    /// Restores previously reserved stock. Returns whether a slot row was
    /// actually touched; a missing slot is reported, not fatal.
    #[instrument(skip(self))]
    pub async fn restore(
        &self,
        machine_id: Uuid,
        slot_number: i32,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<bool, ServiceError> {
        let restored =
            restore_slot(&*self.db, machine_id, slot_number, product_id, quantity).await?;

        if restored {
            // Capacity is not enforced on restore; an overfull slot is
            // surfaced for the operator instead.
            if let Some(slot) = self.get_slot(machine_id, slot_number).await? {
                if slot.quantity > slot.max_capacity {
                    warn!(
                        %machine_id, slot_number, quantity = slot.quantity,
                        max_capacity = slot.max_capacity,
                        "slot quantity exceeds capacity after restore"
                    );
                }
            }
            self.event_sender
                .send_or_log(Event::InventoryRestored {
                    machine_id,
                    slot_number,
                    product_id,
                    quantity,
                })
                .await;
        } else {
            warn!(
                %machine_id, slot_number, %product_id,
                "restore skipped: slot missing or product changed"
            );
        }

        Ok(restored)
    }

    pub async fn get_slot(
        &self,
        machine_id: Uuid,
        slot_number: i32,
    ) -> Result<Option<machine_slot::Model>, ServiceError> {
        let slot = MachineSlot::find()
            .filter(machine_slot::Column::MachineId.eq(machine_id))
            .filter(machine_slot::Column::SlotNumber.eq(slot_number))
            .one(&*self.db)
            .await?;
        Ok(slot)
    }

    /// Checks whether a slot currently holds at least `quantity` of the
    /// product.
    pub async fn is_in_stock(
        &self,
        machine_id: Uuid,
        slot_number: i32,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<bool, ServiceError> {
        match self.get_slot(machine_id, slot_number).await? {
            Some(slot) => Ok(slot.product_id == product_id && slot.quantity >= quantity),
            None => Ok(false),
        }
    }

    /// Operator restock: sets a slot's absolute quantity, clamped to its
    /// capacity.
    #[instrument(skip(self))]
    pub async fn set_slot_quantity(
        &self,
        machine_id: Uuid,
        slot_number: i32,
        quantity: i32,
    ) -> Result<machine_slot::Model, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::InvalidInput(
                "Slot quantity cannot be negative".to_string(),
            ));
        }

        let slot = self
            .get_slot(machine_id, slot_number)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Slot {} on machine {} not found",
                    slot_number, machine_id
                ))
            })?;

        let capped = quantity.min(slot.max_capacity);
        let mut active: machine_slot::ActiveModel = slot.into();
        active.quantity = Set(capped);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(%machine_id, slot_number, quantity = capped, "slot restocked");
        Ok(updated)
    }
}
