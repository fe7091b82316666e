use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::{
        cart::{self, CartStatus, Entity as Cart},
        cart_item::{self, Entity as CartItem},
        order::{self, Entity as Order, OrderPaymentStatus, OrderStatus},
        order_item::{self, Entity as OrderItem},
        payment,
        product::{self, Entity as Product},
        vending_machine::Entity as VendingMachine,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{carts, compute_tax, inventory},
};

/// Which order statuses a cancellation is allowed to leave from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CancelGuard {
    /// User-initiated: only pending/confirmed/processing.
    Cancellable,
    /// Payment-driven: any non-terminal status.
    AnyNonTerminal,
}

/// Order lifecycle engine.
///
/// Converts a validated cart snapshot into an immutable order, reserves
/// slot inventory inside the same transaction, and drives the order status
/// state machine. Cancellation (user- or payment-driven) runs through a
/// single conditional-transition primitive so inventory is restored exactly
/// once no matter how many callers race.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Creates an order from the user's active cart.
    ///
    /// Validation, the order insert, every slot reservation, and the cart
    /// clear run inside one transaction. Each reservation is a conditional
    /// "decrement iff quantity >= requested" update, so a concurrent order
    /// that drained a slot after validation aborts the whole transaction
    /// instead of overselling; nothing is left partially applied.
    #[instrument(skip(self, input))]
    pub async fn create_order(
        &self,
        user_id: &str,
        input: CreateOrderInput,
    ) -> Result<OrderWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .filter(cart::Column::Status.eq(CartStatus::Active))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No active cart for user {}", user_id))
            })?;

        let cart_items = cart
            .find_related(CartItem)
            .order_by_asc(cart_item::Column::AddedAt)
            .all(&txn)
            .await?;
        if cart_items.is_empty() {
            return Err(ServiceError::InvalidOperation("Cart is empty".to_string()));
        }

        // Aggregate every failing line into one error; no partial order.
        let issues = carts::validate_lines(&txn, &cart_items).await?;
        if !issues.is_empty() {
            return Err(ServiceError::ValidationFailed(
                issues.iter().map(|issue| issue.to_message()).collect(),
            ));
        }

        let subtotal: Decimal = cart_items.iter().map(|line| line.total_price).sum();
        let tax = compute_tax(subtotal, self.config.default_tax_rate);
        let total_amount = subtotal + tax;
        let total_items: i32 = cart_items.iter().map(|line| line.quantity).sum();

        // Single-machine-per-order: delivery is the first cart line's
        // machine, even if the cart spans several machines.
        let first_machine_id = cart_items[0].machine_id;
        let machine = VendingMachine::find_by_id(first_machine_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Machine {} not found", first_machine_id))
            })?;

        let product_ids: Vec<Uuid> = cart_items.iter().map(|line| line.product_id).collect();
        let products: HashMap<Uuid, product::Model> = Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_number = format!("VND-{}", &order_id.to_string()[..8].to_uppercase());

        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number),
            user_id: Set(user_id.to_string()),
            status: Set(OrderStatus::Pending),
            total_items: Set(total_items),
            subtotal: Set(subtotal),
            tax: Set(tax),
            total_amount: Set(total_amount),
            payment_id: Set(None),
            payment_method: Set(Some(input.payment_method.clone())),
            payment_gateway: Set(Some(input.payment_gateway.clone())),
            payment_status: Set(OrderPaymentStatus::Pending),
            paid_amount: Set(Decimal::ZERO),
            machine_id: Set(machine.id),
            machine_name: Set(machine.name.clone()),
            machine_location: Set(machine.location.clone()),
            estimated_dispense_time: Set(
                now + Duration::minutes(self.config.dispense_eta_minutes)
            ),
            actual_dispense_time: Set(None),
            order_date: Set(now),
            completed_date: Set(None),
            cancel_reason: Set(None),
            refund_reason: Set(None),
            notes: Set(input.notes.clone()),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        };
        let order = order.insert(&txn).await?;

        let mut order_items = Vec::with_capacity(cart_items.len());
        for line in &cart_items {
            let product = products.get(&line.product_id).ok_or_else(|| {
                ServiceError::ValidationFailed(vec![format!(
                    "product {} no longer exists",
                    line.product_id
                )])
            })?;

            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                product_name: Set(product.name.clone()),
                product_description: Set(product.description.clone()),
                machine_id: Set(line.machine_id),
                machine_name: Set(machine.name.clone()),
                slot_number: Set(line.slot_number),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                total_price: Set(line.total_price),
                dispensed: Set(false),
                dispensed_at: Set(None),
            };
            order_items.push(item.insert(&txn).await?);

            // Reservation: the conditional decrement re-checks stock at the
            // moment of the write. A failure here rolls everything back.
            let reserved = inventory::reserve_slot(
                &txn,
                line.machine_id,
                line.slot_number,
                line.product_id,
                line.quantity,
            )
            .await?;
            if !reserved {
                txn.rollback().await?;
                return Err(ServiceError::InsufficientStock(format!(
                    "machine {} slot {}: stock was consumed before reservation",
                    line.machine_id, line.slot_number
                )));
            }
        }

        // Clear the cart inside the same transaction; it stays active.
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        let mut cleared: cart::ActiveModel = cart.clone().into();
        cleared.total_items = Set(0);
        cleared.total_amount = Set(Decimal::ZERO);
        cleared.updated_at = Set(now);
        cleared.update(&txn).await?;

        txn.commit().await?;

        for line in &cart_items {
            self.event_sender
                .send_or_log(Event::InventoryReserved {
                    machine_id: line.machine_id,
                    slot_number: line.slot_number,
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .await;
        }
        self.event_sender.send_or_log(Event::CartCleared(cart.id)).await;
        self.event_sender.send_or_log(Event::OrderCreated(order_id)).await;

        info!(
            %order_id, user_id, %total_amount,
            items = order_items.len(), "order created"
        );
        Ok(OrderWithItems {
            order,
            items: order_items,
        })
    }

    pub async fn get_order(
        &self,
        order_id: Uuid,
        user_id: &str,
    ) -> Result<OrderWithItems, ServiceError> {
        let order = Order::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = order.find_related(OrderItem).all(&*self.db).await?;
        Ok(OrderWithItems { order, items })
    }

    /// Lists the user's orders, newest first.
    pub async fn list_orders(
        &self,
        user_id: &str,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Transitions an order's status.
    ///
    /// The only enforced rule is that terminal states cannot be left.
    /// Transitioning to `cancelled` restores inventory for undispensed
    /// items through the shared cancellation primitive.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        reason: Option<String>,
    ) -> Result<order::Model, ServiceError> {
        let current = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if current.status.is_terminal() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order is already {}",
                current.status.as_str()
            )));
        }
        let old_status = current.status;

        if new_status == OrderStatus::Cancelled {
            let reason = reason.unwrap_or_else(|| "Cancelled".to_string());
            let cancelled = self
                .cancel_with_restore(order_id, &reason, CancelGuard::AnyNonTerminal)
                .await?;
            if !cancelled {
                return Err(ServiceError::InvalidOperation(
                    "Order is no longer cancellable".to_string(),
                ));
            }
            return self.reload(order_id).await;
        }

        let now = Utc::now();
        let mut update = Order::update_many()
            .col_expr(order::Column::Status, Expr::value(new_status))
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(now)))
            .col_expr(
                order::Column::Version,
                Expr::col(order::Column::Version).add(1),
            )
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.is_in([
                OrderStatus::Pending,
                OrderStatus::Confirmed,
                OrderStatus::Processing,
                OrderStatus::Dispensing,
            ]));

        match new_status {
            OrderStatus::Completed => {
                update = update.col_expr(order::Column::CompletedDate, Expr::value(Some(now)));
            }
            OrderStatus::Failed => {
                if let Some(reason) = reason {
                    update = update.col_expr(order::Column::CancelReason, Expr::value(reason));
                }
            }
            OrderStatus::Refunded => {
                if let Some(reason) = reason {
                    update = update.col_expr(order::Column::RefundReason, Expr::value(reason));
                }
            }
            _ => {}
        }

        let result = update.exec(&*self.db).await?;
        if result.rows_affected == 0 {
            // Lost a race against another terminal transition.
            return Err(ServiceError::InvalidOperation(
                "Order has reached a terminal state".to_string(),
            ));
        }

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.as_str().to_string(),
                new_status: new_status.as_str().to_string(),
            })
            .await;

        info!(
            %order_id, old_status = old_status.as_str(),
            new_status = new_status.as_str(), "order status updated"
        );
        self.reload(order_id).await
    }

    /// User-initiated cancellation. Permitted only while the order is in a
    /// cancellable status and nothing has been dispensed.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        user_id: &str,
        reason: String,
    ) -> Result<order::Model, ServiceError> {
        let order = Order::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let dispensed_count = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .filter(order_item::Column::Dispensed.eq(true))
            .count(&*self.db)
            .await?;

        if !order.status.is_cancellable() || dispensed_count > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} can no longer be cancelled",
                order.order_number
            )));
        }

        let cancelled = self
            .cancel_with_restore(order_id, &reason, CancelGuard::Cancellable)
            .await?;
        if !cancelled {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} can no longer be cancelled",
                order.order_number
            )));
        }

        self.reload(order_id).await
    }

    /// Marks one order item as dispensed by the machine. Does not derive
    /// any order status change; completion is an explicit transition.
    #[instrument(skip(self))]
    pub async fn mark_item_dispensed(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        slot_number: i32,
    ) -> Result<order_item::Model, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let item = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .filter(order_item::Column::ProductId.eq(product_id))
            .filter(order_item::Column::SlotNumber.eq(slot_number))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Order {} has no item for product {} in slot {}",
                    order_id, product_id, slot_number
                ))
            })?;

        if item.dispensed {
            return Ok(item);
        }

        let now = Utc::now();
        let mut active: order_item::ActiveModel = item.into();
        active.dispensed = Set(true);
        active.dispensed_at = Set(Some(now));
        let updated = active.update(&*self.db).await?;

        if order.actual_dispense_time.is_none() {
            order::ActiveModel {
                id: Set(order_id),
                actual_dispense_time: Set(Some(now)),
                updated_at: Set(Some(now)),
                ..Default::default()
            }
            .update(&*self.db)
            .await?;
        }

        self.event_sender
            .send_or_log(Event::OrderItemDispensed {
                order_id,
                product_id,
                slot_number,
                dispensed_at: now,
            })
            .await;

        Ok(updated)
    }

    /// Aggregate order counts and revenue grouped by status.
    pub async fn get_order_stats(
        &self,
        user_id: Option<&str>,
        machine_id: Option<Uuid>,
    ) -> Result<OrderStats, ServiceError> {
        let mut query = Order::find()
            .select_only()
            .column(order::Column::Status)
            .column_as(Expr::col(order::Column::Id).count(), "count")
            .column_as(Expr::col(order::Column::TotalAmount).sum(), "revenue")
            .group_by(order::Column::Status);

        if let Some(user_id) = user_id {
            query = query.filter(order::Column::UserId.eq(user_id));
        }
        if let Some(machine_id) = machine_id {
            query = query.filter(order::Column::MachineId.eq(machine_id));
        }

        let rows: Vec<(OrderStatus, i64, Option<Decimal>)> =
            query.into_tuple().all(&*self.db).await?;

        let by_status: Vec<OrderStatusBucket> = rows
            .into_iter()
            .map(|(status, count, revenue)| OrderStatusBucket {
                status,
                count,
                revenue: revenue.unwrap_or(Decimal::ZERO),
            })
            .collect();

        Ok(OrderStats {
            total_orders: by_status.iter().map(|bucket| bucket.count).sum(),
            total_revenue: by_status.iter().map(|bucket| bucket.revenue).sum(),
            by_status,
        })
    }

    /// Conditionally transitions the order to `cancelled` and, when this
    /// call wins the transition, restores inventory for undispensed items.
    ///
    /// Returns `false` when the order was not in a status the guard allows
    /// leaving; webhook replays and user/webhook races therefore become
    /// no-ops instead of double restorations.
    pub(crate) async fn cancel_with_restore(
        &self,
        order_id: Uuid,
        reason: &str,
        guard: CancelGuard,
    ) -> Result<bool, ServiceError> {
        let from_statuses = match guard {
            CancelGuard::Cancellable => vec![
                OrderStatus::Pending,
                OrderStatus::Confirmed,
                OrderStatus::Processing,
            ],
            CancelGuard::AnyNonTerminal => vec![
                OrderStatus::Pending,
                OrderStatus::Confirmed,
                OrderStatus::Processing,
                OrderStatus::Dispensing,
            ],
        };

        let result = Order::update_many()
            .col_expr(order::Column::Status, Expr::value(OrderStatus::Cancelled))
            .col_expr(order::Column::CancelReason, Expr::value(reason.to_string()))
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .col_expr(
                order::Column::Version,
                Expr::col(order::Column::Version).add(1),
            )
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.is_in(from_statuses))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Ok(false);
        }

        self.restore_order_inventory(order_id).await?;

        self.event_sender.send_or_log(Event::OrderCancelled(order_id)).await;
        info!(%order_id, reason, "order cancelled");
        Ok(true)
    }

    /// Restores stock for every undispensed item, independently per item:
    /// a slot that vanished mid-flight is recorded and skipped, never
    /// blocking the remaining restorations.
    async fn restore_order_inventory(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .filter(order_item::Column::Dispensed.eq(false))
            .all(&*self.db)
            .await?;

        for item in items {
            match inventory::restore_slot(
                &*self.db,
                item.machine_id,
                item.slot_number,
                item.product_id,
                item.quantity,
            )
            .await
            {
                Ok(true) => {
                    self.event_sender
                        .send_or_log(Event::InventoryRestored {
                            machine_id: item.machine_id,
                            slot_number: item.slot_number,
                            product_id: item.product_id,
                            quantity: item.quantity,
                        })
                        .await;
                }
                Ok(false) => {
                    warn!(
                        %order_id, machine_id = %item.machine_id,
                        slot_number = item.slot_number,
                        "restoration skipped: machine or slot no longer exists"
                    );
                    self.event_sender
                        .send_or_log(Event::InventoryRestoreSkipped {
                            order_id,
                            machine_id: item.machine_id,
                            slot_number: item.slot_number,
                            product_id: item.product_id,
                        })
                        .await;
                }
                Err(e) => {
                    error!(
                        %order_id, machine_id = %item.machine_id,
                        slot_number = item.slot_number, error = %e,
                        "failed to restore slot inventory"
                    );
                    self.event_sender
                        .send_or_log(Event::InventoryRestoreSkipped {
                            order_id,
                            machine_id: item.machine_id,
                            slot_number: item.slot_number,
                            product_id: item.product_id,
                        })
                        .await;
                }
            }
        }

        Ok(())
    }

    /// Stamps the payment summary after a ledger row settles and advances a
    /// still-pending order to confirmed.
    pub(crate) async fn record_payment_success(
        &self,
        order_id: Uuid,
        paid: &payment::Model,
    ) -> Result<(), ServiceError> {
        let now = Utc::now();
        Order::update_many()
            .col_expr(order::Column::PaymentId, Expr::value(Some(paid.id)))
            .col_expr(
                order::Column::PaymentMethod,
                Expr::value(paid.payment_method.clone()),
            )
            .col_expr(
                order::Column::PaymentGateway,
                Expr::value(paid.payment_gateway.as_str().to_string()),
            )
            .col_expr(
                order::Column::PaymentStatus,
                Expr::value(OrderPaymentStatus::Completed),
            )
            .col_expr(order::Column::PaidAmount, Expr::value(paid.amount))
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(order::Column::Id.eq(order_id))
            .exec(&*self.db)
            .await?;

        let advanced = Order::update_many()
            .col_expr(order::Column::Status, Expr::value(OrderStatus::Confirmed))
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(now)))
            .col_expr(
                order::Column::Version,
                Expr::col(order::Column::Version).add(1),
            )
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .exec(&*self.db)
            .await?;

        if advanced.rows_affected == 1 {
            self.event_sender
                .send_or_log(Event::OrderStatusChanged {
                    order_id,
                    old_status: OrderStatus::Pending.as_str().to_string(),
                    new_status: OrderStatus::Confirmed.as_str().to_string(),
                })
                .await;
        }

        Ok(())
    }

    /// Marks the order's payment as failed and cancels it (restoring
    /// inventory) through the guarded cancellation primitive.
    pub(crate) async fn record_payment_failure(
        &self,
        order_id: Uuid,
        reason: &str,
    ) -> Result<(), ServiceError> {
        Order::update_many()
            .col_expr(
                order::Column::PaymentStatus,
                Expr::value(OrderPaymentStatus::Failed),
            )
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .filter(order::Column::Id.eq(order_id))
            .exec(&*self.db)
            .await?;

        let cancelled = self
            .cancel_with_restore(order_id, reason, CancelGuard::AnyNonTerminal)
            .await?;
        if !cancelled {
            warn!(%order_id, "payment failure on order already in a terminal state");
        }

        Ok(())
    }

    /// Records a refund on the order summary. A fully refunded payment
    /// flips the order's payment status to refunded.
    pub(crate) async fn record_refund(
        &self,
        order_id: Uuid,
        reason: &str,
        fully_refunded: bool,
    ) -> Result<(), ServiceError> {
        let mut update = Order::update_many()
            .col_expr(order::Column::RefundReason, Expr::value(reason.to_string()))
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .filter(order::Column::Id.eq(order_id));

        if fully_refunded {
            update = update.col_expr(
                order::Column::PaymentStatus,
                Expr::value(OrderPaymentStatus::Refunded),
            );
        }

        update.exec(&*self.db).await?;
        Ok(())
    }

    async fn reload(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }
}

/// Input for creating an order from the active cart
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    pub payment_method: String,
    pub payment_gateway: String,
    pub notes: Option<String>,
}

/// Order with its item snapshot
#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Aggregate order statistics
#[derive(Debug, Serialize)]
pub struct OrderStats {
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub by_status: Vec<OrderStatusBucket>,
}

#[derive(Debug, Serialize)]
pub struct OrderStatusBucket {
    pub status: OrderStatus,
    pub count: i64,
    pub revenue: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_number_is_derived_from_order_id() {
        let order_id = Uuid::new_v4();
        let order_number = format!("VND-{}", &order_id.to_string()[..8].to_uppercase());
        assert!(order_number.starts_with("VND-"));
        assert_eq!(order_number.len(), 12);
    }

    #[test]
    fn totals_for_two_units_at_twenty_five() {
        let subtotal = dec!(25.00) * Decimal::from(2);
        let tax = compute_tax(subtotal, 0.18);
        assert_eq!(subtotal, dec!(50.00));
        assert_eq!(tax, dec!(9.00));
        assert_eq!(subtotal + tax, dec!(59.00));
    }

    #[test]
    fn cancel_guard_statuses() {
        assert_eq!(CancelGuard::Cancellable, CancelGuard::Cancellable);
        assert_ne!(CancelGuard::Cancellable, CancelGuard::AnyNonTerminal);
    }

    #[test]
    fn create_order_input_deserialization() {
        let json = r#"{
            "payment_method": "upi",
            "payment_gateway": "razorpay"
        }"#;
        let input: CreateOrderInput = serde_json::from_str(json).expect("valid input");
        assert_eq!(input.payment_method, "upi");
        assert_eq!(input.payment_gateway, "razorpay");
        assert!(input.notes.is_none());
    }
}
