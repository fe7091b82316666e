use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::{
        cart::{self, CartStatus, Entity as Cart},
        cart_item::{self, Entity as CartItem},
        machine_slot::{self, Entity as MachineSlot},
        product::Entity as Product,
        vending_machine::Entity as VendingMachine,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::compute_tax,
};

/// Shopping cart service.
///
/// Each user has at most one active cart, created lazily on first access.
/// Every mutation re-checks the target slot's current availability,
/// recomputes the denormalized totals, and refreshes the abandonment TTL.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CartService {
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

    /// Returns the user's active cart, creating an empty one if none exists.
    /// An active cart found past its TTL is expired and replaced.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(&self, user_id: &str) -> Result<CartWithItems, ServiceError> {
        if let Some(existing) = self.find_active_cart(user_id).await? {
            if existing.expires_at > Utc::now() {
                let items = existing.find_related(CartItem).all(&*self.db).await?;
                return Ok(CartWithItems {
                    cart: existing,
                    items,
                });
            }

            let cart_id = existing.id;
            let mut expired: cart::ActiveModel = existing.into();
            expired.status = Set(CartStatus::Expired);
            expired.updated_at = Set(Utc::now());
            expired.update(&*self.db).await?;
            self.event_sender.send_or_log(Event::CartExpired(cart_id)).await;
        }

        let now = Utc::now();
        let cart_id = Uuid::new_v4();
        let cart = cart::ActiveModel {
            id: Set(cart_id),
            user_id: Set(user_id.to_string()),
            status: Set(CartStatus::Active),
            total_items: Set(0),
            total_amount: Set(Decimal::ZERO),
            expires_at: Set(now + Duration::hours(self.config.cart_ttl_hours)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let cart = cart.insert(&*self.db).await?;
        self.event_sender.send_or_log(Event::CartCreated(cart_id)).await;

        info!(%cart_id, user_id, "created cart");
        Ok(CartWithItems {
            cart,
            items: Vec::new(),
        })
    }

    /// Adds an item to the user's cart, merging into an existing line with
    /// the same (product, machine, slot) identity.
    ///
    /// The merged line quantity is checked against the slot's *current*
    /// stock; the unit price is always taken from the slot at add time.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: &str,
        input: AddItemInput,
    ) -> Result<cart::Model, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::InvalidInput(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let cart = self.get_or_create_cart(user_id).await?.cart;

        let txn = self.db.begin().await?;

        let product = Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;
        if !product.is_active {
            return Err(ServiceError::NotFound(format!(
                "Product {} is no longer sold",
                input.product_id
            )));
        }

        let machine = VendingMachine::find_by_id(input.machine_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Machine {} not found", input.machine_id))
            })?;
        if !machine.status.is_available() {
            return Err(ServiceError::InvalidOperation(format!(
                "Machine {} is not available",
                machine.name
            )));
        }

        let slot = MachineSlot::find()
            .filter(machine_slot::Column::MachineId.eq(input.machine_id))
            .filter(machine_slot::Column::SlotNumber.eq(input.slot_number))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Slot {} on machine {} not found",
                    input.slot_number, input.machine_id
                ))
            })?;
        if slot.product_id != input.product_id {
            return Err(ServiceError::NotFound(format!(
                "Slot {} on machine {} does not hold this product",
                input.slot_number, input.machine_id
            )));
        }

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .filter(cart_item::Column::MachineId.eq(input.machine_id))
            .filter(cart_item::Column::SlotNumber.eq(input.slot_number))
            .one(&txn)
            .await?;

        let requested = input.quantity + existing.as_ref().map_or(0, |line| line.quantity);
        if requested > slot.quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "Requested {} but only {} available in slot {}",
                requested, slot.quantity, slot.slot_number
            )));
        }

        let now = Utc::now();
        if let Some(line) = existing {
            let mut active: cart_item::ActiveModel = line.into();
            active.quantity = Set(requested);
            active.unit_price = Set(slot.price);
            active.total_price = Set(slot.price * Decimal::from(requested));
            active.updated_at = Set(now);
            active.update(&txn).await?;
        } else {
            let line = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(input.product_id),
                machine_id: Set(input.machine_id),
                slot_number: Set(input.slot_number),
                quantity: Set(input.quantity),
                unit_price: Set(slot.price),
                total_price: Set(slot.price * Decimal::from(input.quantity)),
                added_at: Set(now),
                updated_at: Set(now),
            };
            line.insert(&txn).await?;
        }

        let updated_cart = self.recalculate_cart_totals(&txn, cart.id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                product_id: input.product_id,
            })
            .await;

        info!(
            cart_id = %cart.id, product_id = %input.product_id,
            quantity = input.quantity, "added item to cart"
        );
        Ok(updated_cart)
    }

    /// Updates a line's quantity. Quantity 0 removes the line.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        user_id: &str,
        product_id: Uuid,
        machine_id: Uuid,
        slot_number: i32,
        quantity: i32,
    ) -> Result<cart::Model, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::InvalidInput(
                "Quantity cannot be negative".to_string(),
            ));
        }
        if quantity == 0 {
            return self
                .remove_item(user_id, product_id, machine_id, slot_number)
                .await;
        }

        let cart = self.require_active_cart(user_id).await?;
        let txn = self.db.begin().await?;

        let line = self
            .find_line(&txn, cart.id, product_id, machine_id, slot_number)
            .await?;

        let slot = MachineSlot::find()
            .filter(machine_slot::Column::MachineId.eq(machine_id))
            .filter(machine_slot::Column::SlotNumber.eq(slot_number))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Slot {} on machine {} not found",
                    slot_number, machine_id
                ))
            })?;
        if quantity > slot.quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "Requested {} but only {} available in slot {}",
                quantity, slot.quantity, slot_number
            )));
        }

        let unit_price = line.unit_price;
        let mut active: cart_item::ActiveModel = line.into();
        active.quantity = Set(quantity);
        active.total_price = Set(unit_price * Decimal::from(quantity));
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        let updated_cart = self.recalculate_cart_totals(&txn, cart.id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                cart_id: cart.id,
                product_id,
            })
            .await;

        Ok(updated_cart)
    }

    /// Removes a line from the cart.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: &str,
        product_id: Uuid,
        machine_id: Uuid,
        slot_number: i32,
    ) -> Result<cart::Model, ServiceError> {
        let cart = self.require_active_cart(user_id).await?;
        let txn = self.db.begin().await?;

        let line = self
            .find_line(&txn, cart.id, product_id, machine_id, slot_number)
            .await?;
        let line_id = line.id;
        CartItem::delete_by_id(line_id).exec(&txn).await?;

        let updated_cart = self.recalculate_cart_totals(&txn, cart.id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: cart.id,
                product_id,
            })
            .await;

        Ok(updated_cart)
    }

    /// Empties the cart and zeroes its totals. The cart stays active.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: &str) -> Result<cart::Model, ServiceError> {
        let cart = self.require_active_cart(user_id).await?;
        let txn = self.db.begin().await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        let updated_cart = self.recalculate_cart_totals(&txn, cart.id).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::CartCleared(cart.id)).await;

        info!(cart_id = %cart.id, "cleared cart");
        Ok(updated_cart)
    }

    /// Re-checks every line against current machine state. Returns a report
    /// flagging each mismatch; never auto-corrects the cart.
    #[instrument(skip(self))]
    pub async fn validate_cart(&self, user_id: &str) -> Result<CartValidationReport, ServiceError> {
        let cart = self.require_active_cart(user_id).await?;
        let items = cart.find_related(CartItem).all(&*self.db).await?;

        let issues = validate_lines(&*self.db, &items).await?;
        Ok(CartValidationReport {
            cart_id: cart.id,
            is_valid: issues.is_empty(),
            issues,
        })
    }

    /// Computes the checkout summary: subtotal, tax, final amount, and the
    /// lines grouped per machine. An empty cart short-circuits to zeroes.
    #[instrument(skip(self))]
    pub async fn summarize_cart(&self, user_id: &str) -> Result<CartSummary, ServiceError> {
        let cart = self.require_active_cart(user_id).await?;
        let items = cart.find_related(CartItem).all(&*self.db).await?;

        if items.is_empty() {
            return Ok(CartSummary {
                cart_id: cart.id,
                total_items: 0,
                subtotal: Decimal::ZERO,
                tax: Decimal::ZERO,
                final_amount: Decimal::ZERO,
                machines: Vec::new(),
            });
        }

        let subtotal: Decimal = items.iter().map(|line| line.total_price).sum();
        let tax = compute_tax(subtotal, self.config.default_tax_rate);
        let total_items: i32 = items.iter().map(|line| line.quantity).sum();

        let mut grouped: BTreeMap<Uuid, Vec<cart_item::Model>> = BTreeMap::new();
        for line in items {
            grouped.entry(line.machine_id).or_default().push(line);
        }
        let machines = grouped
            .into_iter()
            .map(|(machine_id, lines)| MachineGroup {
                machine_id,
                subtotal: lines.iter().map(|line| line.total_price).sum(),
                items: lines,
            })
            .collect();

        Ok(CartSummary {
            cart_id: cart.id,
            total_items,
            subtotal,
            tax,
            final_amount: subtotal + tax,
            machines,
        })
    }

    /// Sweeper entry point: expires active carts past their TTL.
    pub async fn expire_stale_carts(&self) -> Result<u64, ServiceError> {
        let result = Cart::update_many()
            .col_expr(cart::Column::Status, Expr::value(CartStatus::Expired))
            .col_expr(cart::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(cart::Column::Status.eq(CartStatus::Active))
            .filter(cart::Column::ExpiresAt.lt(Utc::now()))
            .exec(&*self.db)
            .await?;

        if result.rows_affected > 0 {
            info!(count = result.rows_affected, "expired abandoned carts");
        }
        Ok(result.rows_affected)
    }

    async fn find_active_cart(&self, user_id: &str) -> Result<Option<cart::Model>, ServiceError> {
        let cart = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .filter(cart::Column::Status.eq(CartStatus::Active))
            .one(&*self.db)
            .await?;
        Ok(cart)
    }

    async fn require_active_cart(&self, user_id: &str) -> Result<cart::Model, ServiceError> {
        self.find_active_cart(user_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("No active cart for user {}", user_id))
        })
    }

    async fn find_line(
        &self,
        conn: &impl ConnectionTrait,
        cart_id: Uuid,
        product_id: Uuid,
        machine_id: Uuid,
        slot_number: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .filter(cart_item::Column::MachineId.eq(machine_id))
            .filter(cart_item::Column::SlotNumber.eq(slot_number))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))
    }

    /// Recomputes the denormalized totals and refreshes the abandonment TTL.
    async fn recalculate_cart_totals(
        &self,
        conn: &impl ConnectionTrait,
        cart_id: Uuid,
    ) -> Result<cart::Model, ServiceError> {
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(conn)
            .await?;

        let total_items: i32 = items.iter().map(|line| line.quantity).sum();
        let total_amount: Decimal = items.iter().map(|line| line.total_price).sum();

        let mut cart: cart::ActiveModel = Cart::find_by_id(cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?
            .into();

        let now = Utc::now();
        cart.total_items = Set(total_items);
        cart.total_amount = Set(total_amount);
        cart.expires_at = Set(now + Duration::hours(self.config.cart_ttl_hours));
        cart.updated_at = Set(now);

        Ok(cart.update(conn).await?)
    }
}

/// Re-checks cart lines against current machine/slot state. Shared between
/// `validate_cart` and order creation so both flag mismatches identically.
pub(crate) async fn validate_lines<C: ConnectionTrait>(
    conn: &C,
    items: &[cart_item::Model],
) -> Result<Vec<CartLineIssue>, ServiceError> {
    let mut issues = Vec::new();

    for line in items {
        let machine = VendingMachine::find_by_id(line.machine_id).one(conn).await?;
        match machine {
            Some(ref m) if m.status.is_available() => {}
            _ => {
                issues.push(CartLineIssue::new(line, "machine unavailable".to_string()));
                continue;
            }
        }

        let slot = MachineSlot::find()
            .filter(machine_slot::Column::MachineId.eq(line.machine_id))
            .filter(machine_slot::Column::SlotNumber.eq(line.slot_number))
            .one(conn)
            .await?;
        let slot = match slot {
            Some(s) if s.product_id == line.product_id => s,
            _ => {
                issues.push(CartLineIssue::new(
                    line,
                    "slot no longer has this product".to_string(),
                ));
                continue;
            }
        };

        if slot.quantity < line.quantity {
            issues.push(CartLineIssue::new(
                line,
                format!("insufficient stock (available {})", slot.quantity),
            ));
            continue;
        }

        if slot.price != line.unit_price {
            issues.push(CartLineIssue::new(
                line,
                format!("price changed from {} to {}", line.unit_price, slot.price),
            ));
        }
    }

    Ok(issues)
}

/// Input for adding an item to the cart
#[derive(Debug, Clone, Deserialize)]
pub struct AddItemInput {
    pub product_id: Uuid,
    pub machine_id: Uuid,
    pub slot_number: i32,
    pub quantity: i32,
}

/// Cart with its lines
#[derive(Debug, Serialize)]
pub struct CartWithItems {
    pub cart: cart::Model,
    pub items: Vec<cart_item::Model>,
}

/// One flagged cart line with the reason it failed validation
#[derive(Debug, Clone, Serialize)]
pub struct CartLineIssue {
    pub product_id: Uuid,
    pub machine_id: Uuid,
    pub slot_number: i32,
    pub reason: String,
}

impl CartLineIssue {
    fn new(line: &cart_item::Model, reason: String) -> Self {
        Self {
            product_id: line.product_id,
            machine_id: line.machine_id,
            slot_number: line.slot_number,
            reason,
        }
    }

    pub fn to_message(&self) -> String {
        format!(
            "machine {} slot {}: {}",
            self.machine_id, self.slot_number, self.reason
        )
    }
}

/// Cart validation report
#[derive(Debug, Serialize)]
pub struct CartValidationReport {
    pub cart_id: Uuid,
    pub is_valid: bool,
    pub issues: Vec<CartLineIssue>,
}

/// Checkout summary with per-machine grouping
#[derive(Debug, Serialize)]
pub struct CartSummary {
    pub cart_id: Uuid,
    pub total_items: i32,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub final_amount: Decimal,
    pub machines: Vec<MachineGroup>,
}

#[derive(Debug, Serialize)]
pub struct MachineGroup {
    pub machine_id: Uuid,
    pub subtotal: Decimal,
    pub items: Vec<cart_item::Model>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn add_item_input_deserialization() {
        let json = r#"{
            "product_id": "550e8400-e29b-41d4-a716-446655440000",
            "machine_id": "550e8400-e29b-41d4-a716-446655440001",
            "slot_number": 3,
            "quantity": 2
        }"#;

        let input: AddItemInput = serde_json::from_str(json).expect("valid input");
        assert_eq!(input.slot_number, 3);
        assert_eq!(input.quantity, 2);
    }

    #[test]
    fn line_issue_message_names_machine_and_slot() {
        let issue = CartLineIssue {
            product_id: Uuid::new_v4(),
            machine_id: Uuid::nil(),
            slot_number: 7,
            reason: "insufficient stock (available 1)".to_string(),
        };
        let msg = issue.to_message();
        assert!(msg.contains("slot 7"));
        assert!(msg.contains("insufficient stock"));
    }

    #[test]
    fn line_total_matches_quantity_times_unit_price() {
        let unit_price = dec!(25.00);
        let quantity = 2;
        assert_eq!(unit_price * Decimal::from(quantity), dec!(50.00));
    }

    #[test]
    fn summary_totals_for_sample_cart() {
        let subtotal = dec!(50.00);
        let tax = compute_tax(subtotal, 0.18);
        assert_eq!(tax, dec!(9.00));
        assert_eq!(subtotal + tax, dec!(59.00));
    }
}
