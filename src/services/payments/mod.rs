pub mod gateways;

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::{
        order::{self, Entity as Order},
        payment::{self, Entity as Payment, PaymentGateway, PaymentStatus, TransactionType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::orders::OrderService,
};

pub use gateways::{adapter_for, ClientPayload, GatewayAdapter, RefundOutcome};

/// Payment transaction ledger.
///
/// Every payment and refund attempt is its own append-style row; rows are
/// transitioned, never rewritten into a different attempt. The webhook
/// entry point is the single settlement authority for asynchronous
/// gateways, and every state transition is a conditional update guarded on
/// the current status, which makes webhook replays no-ops.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
    orders: OrderService,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
        orders: OrderService,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
            orders,
        }
    }

    /// Creates a pending ledger row for an order and prepares the payment
    /// at the gateway.
    ///
    /// Cash settles synchronously: the row is marked successful and the
    /// order advanced exactly as a success webhook would do it.
    #[instrument(skip(self, input), fields(order_id = %input.order_id))]
    pub async fn initiate_payment(
        &self,
        user_id: &str,
        input: InitiatePaymentInput,
    ) -> Result<InitiatePaymentResponse, ServiceError> {
        let order = Order::find_by_id(input.order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order {} not found", input.order_id))
            })?;

        if input.amount != order.total_amount {
            return Err(ServiceError::AmountMismatch(format!(
                "expected {}, got {}",
                order.total_amount, input.amount
            )));
        }

        let already_paid = Payment::find()
            .filter(payment::Column::OrderId.eq(order.id))
            .filter(payment::Column::TransactionType.eq(TransactionType::Payment))
            .filter(payment::Column::Status.eq(PaymentStatus::Success))
            .one(&*self.db)
            .await?;
        if let Some(existing) = already_paid {
            return Err(ServiceError::AlreadyPaid(format!(
                "Order {} was already paid by payment {}",
                order.order_number, existing.id
            )));
        }

        let now = Utc::now();
        let payment_id = Uuid::new_v4();
        let metadata = serde_json::json!({
            "order_number": order.order_number,
            "machine_id": order.machine_id,
            "machine_name": order.machine_name,
            "total_items": order.total_items,
            "total_amount": order.total_amount,
        });

        let row = payment::ActiveModel {
            id: Set(payment_id),
            order_id: Set(order.id),
            user_id: Set(user_id.to_string()),
            amount: Set(input.amount),
            currency: Set(self.config.default_currency.clone()),
            payment_method: Set(input.payment_method.clone()),
            payment_gateway: Set(input.payment_gateway),
            transaction_type: Set(TransactionType::Payment),
            status: Set(PaymentStatus::Pending),
            gateway_transaction_id: Set(None),
            gateway_order_id: Set(None),
            gateway_payment_id: Set(None),
            gateway_signature: Set(None),
            error_code: Set(None),
            error_message: Set(None),
            gateway_response: Set(None),
            metadata: Set(Some(metadata)),
            parent_payment_id: Set(None),
            refund_reason: Set(None),
            initiated_at: Set(now),
            completed_at: Set(None),
            failed_at: Set(None),
            expires_at: Set(now + Duration::minutes(self.config.payment_expiry_minutes)),
            attempts: Set(1),
            max_attempts: Set(self.config.payment_max_attempts),
            refundable_amount: Set(Decimal::ZERO),
            refunded_amount: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let row = row.insert(&*self.db).await?;

        let adapter = adapter_for(input.payment_gateway);
        let payload = match adapter.create_payment(&row).await {
            Ok(payload) => payload,
            Err(e) => {
                payment::ActiveModel {
                    id: Set(payment_id),
                    status: Set(PaymentStatus::Failed),
                    failed_at: Set(Some(Utc::now())),
                    error_message: Set(Some(e.to_string())),
                    updated_at: Set(Some(Utc::now())),
                    ..Default::default()
                }
                .update(&*self.db)
                .await?;
                return Err(ServiceError::GatewayError(e.to_string()));
            }
        };

        // Persist whatever the adapter prepared on the gateway's side.
        payment::ActiveModel {
            id: Set(payment_id),
            gateway_order_id: Set(payload.gateway_order_id.clone()),
            gateway_payment_id: Set(payload.gateway_payment_id.clone()),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .update(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::PaymentInitiated {
                payment_id,
                order_id: order.id,
                amount: input.amount,
            })
            .await;

        let settled = if payload.settled {
            let transaction_id = payload
                .gateway_transaction_id
                .clone()
                .unwrap_or_else(|| format!("cash_{}", payment_id.simple()));
            self.apply_success(payment_id, GatewayFields {
                gateway_transaction_id: Some(transaction_id),
                gateway_payment_id: payload.gateway_payment_id.clone(),
                gateway_signature: None,
                raw_response: None,
            })
            .await?
        } else {
            self.reload(payment_id).await?
        };

        info!(
            %payment_id, order_id = %order.id,
            gateway = input.payment_gateway.as_str(), "payment initiated"
        );
        Ok(InitiatePaymentResponse {
            payment: settled,
            client: payload,
        })
    }

    /// The single authoritative state-transition entry point for
    /// asynchronous gateways.
    ///
    /// An unknown `payment_id` is surfaced as `NotFound` so the gateway
    /// retries. Replays of a terminal payment are no-ops: the conditional
    /// transition refuses to fire twice, and the order side effects only
    /// run on the call that wins the transition.
    #[instrument(skip(self, payload), fields(payment_id = %payload.payment_id))]
    pub async fn process_webhook(
        &self,
        payload: WebhookPayload,
    ) -> Result<payment::Model, ServiceError> {
        let row = Payment::find_by_id(payload.payment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Payment {} not found", payload.payment_id))
            })?;

        let fields = GatewayFields {
            gateway_transaction_id: Some(payload.gateway_transaction_id.clone()),
            gateway_payment_id: payload.gateway_payment_id.clone(),
            gateway_signature: payload.signature.clone(),
            raw_response: payload.raw_response.clone(),
        };

        match payload.status {
            WebhookStatus::Success => self.apply_success(row.id, fields).await,
            WebhookStatus::Failed => {
                self.apply_failure(row.id, fields, payload.error_code, payload.error_message)
                    .await
            }
            WebhookStatus::Pending => {
                // Informational callback: merge gateway fields only.
                let mut update = Payment::update_many()
                    .col_expr(payment::Column::UpdatedAt, Expr::value(Some(Utc::now())))
                    .filter(payment::Column::Id.eq(row.id));
                update = Self::merge_gateway_fields(update, &fields);
                update.exec(&*self.db).await?;
                self.reload(row.id).await
            }
        }
    }

    /// Creates a refund ledger row against a successful payment and applies
    /// the balance movement to the original row.
    #[instrument(skip(self, input), fields(payment_id = %input.payment_id))]
    pub async fn process_refund(
        &self,
        input: ProcessRefundInput,
    ) -> Result<payment::Model, ServiceError> {
        if input.amount <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Refund amount must be positive".to_string(),
            ));
        }

        let original = Payment::find_by_id(input.payment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Payment {} not found", input.payment_id))
            })?;

        if original.status != PaymentStatus::Success
            || original.transaction_type != TransactionType::Payment
            || original.refundable_amount <= Decimal::ZERO
        {
            return Err(ServiceError::NotRefundable(format!(
                "Payment {} is not refundable",
                original.id
            )));
        }
        if input.amount > original.refundable_amount {
            return Err(ServiceError::ExceedsRefundable(format!(
                "refund {} exceeds refundable {}",
                input.amount, original.refundable_amount
            )));
        }

        let transaction_type = if input.amount == original.amount {
            TransactionType::Refund
        } else {
            TransactionType::PartialRefund
        };

        let now = Utc::now();
        let refund_id = Uuid::new_v4();
        let refund_row = payment::ActiveModel {
            id: Set(refund_id),
            order_id: Set(original.order_id),
            user_id: Set(original.user_id.clone()),
            amount: Set(input.amount),
            currency: Set(original.currency.clone()),
            payment_method: Set(original.payment_method.clone()),
            payment_gateway: Set(original.payment_gateway),
            transaction_type: Set(transaction_type),
            status: Set(PaymentStatus::Processing),
            gateway_transaction_id: Set(None),
            gateway_order_id: Set(original.gateway_order_id.clone()),
            gateway_payment_id: Set(original.gateway_payment_id.clone()),
            gateway_signature: Set(None),
            error_code: Set(None),
            error_message: Set(None),
            gateway_response: Set(None),
            metadata: Set(original.metadata.clone()),
            parent_payment_id: Set(Some(original.id)),
            refund_reason: Set(Some(input.reason.clone())),
            initiated_at: Set(now),
            completed_at: Set(None),
            failed_at: Set(None),
            expires_at: Set(now + Duration::minutes(self.config.payment_expiry_minutes)),
            attempts: Set(1),
            max_attempts: Set(self.config.payment_max_attempts),
            refundable_amount: Set(Decimal::ZERO),
            refunded_amount: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        refund_row.insert(&*self.db).await?;

        let adapter = adapter_for(original.payment_gateway);
        let outcome = match adapter.create_refund(&original, input.amount).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let failed = self
                    .mark_refund_failed(refund_id, None, Some(e.to_string()))
                    .await?;
                self.event_sender
                    .send_or_log(Event::RefundFailed {
                        refund_id,
                        payment_id: original.id,
                    })
                    .await;
                return Ok(failed);
            }
        };

        if !outcome.success {
            let failed = self
                .mark_refund_failed(refund_id, outcome.error_code, outcome.error_message)
                .await?;
            self.event_sender
                .send_or_log(Event::RefundFailed {
                    refund_id,
                    payment_id: original.id,
                })
                .await;
            return Ok(failed);
        }

        // Move the balances on the original row; the refundable_amount
        // guard keeps a concurrent refund from over-drawing it.
        let applied = Payment::update_many()
            .col_expr(
                payment::Column::RefundableAmount,
                Expr::col(payment::Column::RefundableAmount).sub(input.amount),
            )
            .col_expr(
                payment::Column::RefundedAmount,
                Expr::col(payment::Column::RefundedAmount).add(input.amount),
            )
            .col_expr(payment::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .filter(payment::Column::Id.eq(original.id))
            .filter(payment::Column::Status.eq(PaymentStatus::Success))
            .filter(payment::Column::RefundableAmount.gte(input.amount))
            .exec(&*self.db)
            .await?;

        if applied.rows_affected == 0 {
            let failed = self
                .mark_refund_failed(
                    refund_id,
                    None,
                    Some("refundable amount exhausted by a concurrent refund".to_string()),
                )
                .await?;
            self.event_sender
                .send_or_log(Event::RefundFailed {
                    refund_id,
                    payment_id: original.id,
                })
                .await;
            return Ok(failed);
        }

        let now = Utc::now();
        Payment::update_many()
            .col_expr(payment::Column::Status, Expr::value(PaymentStatus::Success))
            .col_expr(payment::Column::CompletedAt, Expr::value(Some(now)))
            .col_expr(
                payment::Column::GatewayTransactionId,
                Expr::value(outcome.refund_id.clone()),
            )
            .col_expr(payment::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(payment::Column::Id.eq(refund_id))
            .exec(&*self.db)
            .await?;

        let updated_original = self.reload(original.id).await?;
        let fully_refunded = updated_original.refundable_amount == Decimal::ZERO;
        self.orders
            .record_refund(original.order_id, &input.reason, fully_refunded)
            .await?;

        self.event_sender
            .send_or_log(Event::RefundSucceeded {
                refund_id,
                payment_id: original.id,
                amount: input.amount,
            })
            .await;

        info!(
            %refund_id, payment_id = %original.id, amount = %input.amount,
            fully_refunded, "refund processed"
        );
        self.reload(refund_id).await
    }

    pub async fn get_payment(
        &self,
        payment_id: Uuid,
        user_id: &str,
    ) -> Result<payment::Model, ServiceError> {
        Payment::find_by_id(payment_id)
            .filter(payment::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", payment_id)))
    }

    /// All ledger rows for an order, newest first.
    pub async fn list_order_payments(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<payment::Model>, ServiceError> {
        let rows = Payment::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .order_by_desc(payment::Column::InitiatedAt)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Aggregate counts/amounts by status over `payment`-type rows.
    pub async fn get_payment_stats(
        &self,
        user_id: Option<&str>,
        machine_id: Option<Uuid>,
    ) -> Result<PaymentStats, ServiceError> {
        let mut query = Payment::find()
            .select_only()
            .column(payment::Column::Status)
            .column_as(Expr::col(payment::Column::Id).count(), "count")
            .column_as(Expr::col(payment::Column::Amount).sum(), "amount")
            .filter(payment::Column::TransactionType.eq(TransactionType::Payment))
            .group_by(payment::Column::Status);

        if let Some(user_id) = user_id {
            query = query.filter(payment::Column::UserId.eq(user_id));
        }
        if let Some(machine_id) = machine_id {
            let order_ids: Vec<Uuid> = Order::find()
                .select_only()
                .column(order::Column::Id)
                .filter(order::Column::MachineId.eq(machine_id))
                .into_tuple()
                .all(&*self.db)
                .await?;
            query = query.filter(payment::Column::OrderId.is_in(order_ids));
        }

        let rows: Vec<(PaymentStatus, i64, Option<Decimal>)> =
            query.into_tuple().all(&*self.db).await?;

        let by_status: Vec<PaymentStatusBucket> = rows
            .into_iter()
            .map(|(status, count, amount)| PaymentStatusBucket {
                status,
                count,
                amount: amount.unwrap_or(Decimal::ZERO),
            })
            .collect();

        Ok(PaymentStats {
            total_payments: by_status.iter().map(|bucket| bucket.count).sum(),
            by_status,
        })
    }

    /// Sweeper entry point: expires overdue pending/processing payment
    /// rows and drives the same cancellation path as a failure webhook.
    pub async fn expire_stale_payments(&self) -> Result<u64, ServiceError> {
        let stale = Payment::find()
            .filter(payment::Column::TransactionType.eq(TransactionType::Payment))
            .filter(
                payment::Column::Status
                    .is_in([PaymentStatus::Pending, PaymentStatus::Processing]),
            )
            .filter(payment::Column::ExpiresAt.lt(Utc::now()))
            .all(&*self.db)
            .await?;

        let mut expired = 0u64;
        for row in stale {
            let result = Payment::update_many()
                .col_expr(payment::Column::Status, Expr::value(PaymentStatus::Expired))
                .col_expr(payment::Column::UpdatedAt, Expr::value(Some(Utc::now())))
                .filter(payment::Column::Id.eq(row.id))
                .filter(
                    payment::Column::Status
                        .is_in([PaymentStatus::Pending, PaymentStatus::Processing]),
                )
                .exec(&*self.db)
                .await?;

            // A webhook may have settled the row since the select.
            if result.rows_affected == 0 {
                continue;
            }
            expired += 1;

            self.orders
                .record_payment_failure(row.order_id, "Payment expired")
                .await?;
            self.event_sender
                .send_or_log(Event::PaymentExpired {
                    payment_id: row.id,
                    order_id: row.order_id,
                })
                .await;
        }

        if expired > 0 {
            info!(count = expired, "expired stale payments");
        }
        Ok(expired)
    }

    /// Conditionally marks the payment successful; only the winning call
    /// runs the order side effects.
    async fn apply_success(
        &self,
        payment_id: Uuid,
        fields: GatewayFields,
    ) -> Result<payment::Model, ServiceError> {
        let row = self.reload(payment_id).await?;
        let now = Utc::now();

        let mut update = Payment::update_many()
            .col_expr(payment::Column::Status, Expr::value(PaymentStatus::Success))
            .col_expr(payment::Column::CompletedAt, Expr::value(Some(now)))
            .col_expr(payment::Column::RefundableAmount, Expr::value(row.amount))
            .col_expr(payment::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(payment::Column::Id.eq(payment_id))
            .filter(
                payment::Column::Status.is_in([PaymentStatus::Pending, PaymentStatus::Processing]),
            );
        update = Self::merge_gateway_fields(update, &fields);

        let result = update.exec(&*self.db).await?;
        if result.rows_affected == 0 {
            debug!(%payment_id, "success webhook replay ignored");
            return self.reload(payment_id).await;
        }

        let settled = self.reload(payment_id).await?;
        self.orders
            .record_payment_success(settled.order_id, &settled)
            .await?;

        self.event_sender
            .send_or_log(Event::PaymentSucceeded {
                payment_id,
                order_id: settled.order_id,
                amount: settled.amount,
            })
            .await;

        Ok(settled)
    }

    /// Conditionally marks the payment failed; the winning call cancels
    /// the order and restores its inventory.
    async fn apply_failure(
        &self,
        payment_id: Uuid,
        fields: GatewayFields,
        error_code: Option<String>,
        error_message: Option<String>,
    ) -> Result<payment::Model, ServiceError> {
        let now = Utc::now();
        let mut update = Payment::update_many()
            .col_expr(payment::Column::Status, Expr::value(PaymentStatus::Failed))
            .col_expr(payment::Column::FailedAt, Expr::value(Some(now)))
            .col_expr(payment::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(payment::Column::Id.eq(payment_id))
            .filter(
                payment::Column::Status.is_in([PaymentStatus::Pending, PaymentStatus::Processing]),
            );
        update = Self::merge_gateway_fields(update, &fields);
        if let Some(code) = &error_code {
            update = update.col_expr(payment::Column::ErrorCode, Expr::value(code.clone()));
        }
        if let Some(message) = &error_message {
            update = update.col_expr(payment::Column::ErrorMessage, Expr::value(message.clone()));
        }

        let result = update.exec(&*self.db).await?;
        if result.rows_affected == 0 {
            debug!(%payment_id, "failure webhook replay ignored");
            return self.reload(payment_id).await;
        }

        let failed = self.reload(payment_id).await?;
        self.orders
            .record_payment_failure(failed.order_id, "Payment failed")
            .await?;

        self.event_sender
            .send_or_log(Event::PaymentFailed {
                payment_id,
                order_id: failed.order_id,
            })
            .await;

        Ok(failed)
    }

    fn merge_gateway_fields(
        mut update: sea_orm::UpdateMany<Payment>,
        fields: &GatewayFields,
    ) -> sea_orm::UpdateMany<Payment> {
        if let Some(id) = &fields.gateway_transaction_id {
            update = update.col_expr(
                payment::Column::GatewayTransactionId,
                Expr::value(id.clone()),
            );
        }
        if let Some(id) = &fields.gateway_payment_id {
            update = update.col_expr(payment::Column::GatewayPaymentId, Expr::value(id.clone()));
        }
        if let Some(signature) = &fields.gateway_signature {
            update = update.col_expr(
                payment::Column::GatewaySignature,
                Expr::value(signature.clone()),
            );
        }
        if let Some(raw) = &fields.raw_response {
            update = update.col_expr(
                payment::Column::GatewayResponse,
                Expr::value(raw.clone()),
            );
        }
        update
    }

    async fn mark_refund_failed(
        &self,
        refund_id: Uuid,
        error_code: Option<String>,
        error_message: Option<String>,
    ) -> Result<payment::Model, ServiceError> {
        let now = Utc::now();
        payment::ActiveModel {
            id: Set(refund_id),
            status: Set(PaymentStatus::Failed),
            failed_at: Set(Some(now)),
            error_code: Set(error_code),
            error_message: Set(error_message.clone()),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .update(&*self.db)
        .await?;

        warn!(%refund_id, error = ?error_message, "refund attempt failed");
        self.reload(refund_id).await
    }

    async fn reload(&self, payment_id: Uuid) -> Result<payment::Model, ServiceError> {
        Payment::find_by_id(payment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", payment_id)))
    }
}

/// Gateway response fields merged into a ledger row as callbacks arrive.
#[derive(Debug, Clone, Default)]
struct GatewayFields {
    gateway_transaction_id: Option<String>,
    gateway_payment_id: Option<String>,
    gateway_signature: Option<String>,
    raw_response: Option<serde_json::Value>,
}

/// Input for initiating a payment
#[derive(Debug, Clone, Deserialize)]
pub struct InitiatePaymentInput {
    pub order_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
    pub payment_gateway: PaymentGateway,
}

/// Initiation result: the ledger row plus client-facing gateway data
#[derive(Debug, Serialize)]
pub struct InitiatePaymentResponse {
    pub payment: payment::Model,
    pub client: ClientPayload,
}

/// Inbound webhook payload (delivered by the HTTP layer)
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub payment_id: Uuid,
    pub gateway_transaction_id: String,
    pub gateway_payment_id: Option<String>,
    pub signature: Option<String>,
    pub status: WebhookStatus,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub raw_response: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    Success,
    Failed,
    Pending,
}

/// Input for processing a refund
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessRefundInput {
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub reason: String,
}

/// Aggregate payment statistics
#[derive(Debug, Serialize)]
pub struct PaymentStats {
    pub total_payments: i64,
    pub by_status: Vec<PaymentStatusBucket>,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusBucket {
    pub status: PaymentStatus,
    pub count: i64,
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn webhook_status_deserializes_from_snake_case() {
        let payload = r#"{
            "payment_id": "550e8400-e29b-41d4-a716-446655440000",
            "gateway_transaction_id": "txn_123",
            "status": "success"
        }"#;
        let parsed: WebhookPayload = serde_json::from_str(payload).expect("valid payload");
        assert_eq!(parsed.status, WebhookStatus::Success);
        assert_eq!(parsed.gateway_transaction_id, "txn_123");
        assert!(parsed.raw_response.is_none());
    }

    #[test]
    fn full_refund_selects_refund_type() {
        let original_amount = dec!(100.00);
        let refund = dec!(100.00);
        let transaction_type = if refund == original_amount {
            TransactionType::Refund
        } else {
            TransactionType::PartialRefund
        };
        assert_eq!(transaction_type, TransactionType::Refund);
    }

    #[test]
    fn partial_refund_selects_partial_type() {
        let original_amount = dec!(100.00);
        let refund = dec!(60.00);
        let transaction_type = if refund == original_amount {
            TransactionType::Refund
        } else {
            TransactionType::PartialRefund
        };
        assert_eq!(transaction_type, TransactionType::PartialRefund);
    }

    #[test]
    fn refund_balance_movement_preserves_invariant() {
        let amount = dec!(100.00);
        let mut refundable = amount;
        let mut refunded = Decimal::ZERO;

        let refund = dec!(60.00);
        refundable -= refund;
        refunded += refund;

        assert_eq!(refundable, dec!(40.00));
        assert_eq!(refunded, dec!(60.00));
        assert_eq!(refundable + refunded, amount);
    }
}
