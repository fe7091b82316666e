use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Handle used by services to publish domain events onto the async channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing channel failures to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging (rather than propagating) channel failures.
    /// Used on paths where event delivery must not fail the operation.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Failed to send event");
        }
    }
}

/// Domain events emitted by the fulfillment core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartCreated(Uuid),
    CartItemAdded {
        cart_id: Uuid,
        product_id: Uuid,
    },
    CartItemUpdated {
        cart_id: Uuid,
        product_id: Uuid,
    },
    CartItemRemoved {
        cart_id: Uuid,
        product_id: Uuid,
    },
    CartCleared(Uuid),
    CartExpired(Uuid),

    // Order events
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderCancelled(Uuid),
    OrderItemDispensed {
        order_id: Uuid,
        product_id: Uuid,
        slot_number: i32,
        dispensed_at: DateTime<Utc>,
    },

    // Inventory events
    InventoryReserved {
        machine_id: Uuid,
        slot_number: i32,
        product_id: Uuid,
        quantity: i32,
    },
    InventoryRestored {
        machine_id: Uuid,
        slot_number: i32,
        product_id: Uuid,
        quantity: i32,
    },
    InventoryRestoreSkipped {
        order_id: Uuid,
        machine_id: Uuid,
        slot_number: i32,
        product_id: Uuid,
    },

    // Payment events
    PaymentInitiated {
        payment_id: Uuid,
        order_id: Uuid,
        amount: Decimal,
    },
    PaymentSucceeded {
        payment_id: Uuid,
        order_id: Uuid,
        amount: Decimal,
    },
    PaymentFailed {
        payment_id: Uuid,
        order_id: Uuid,
    },
    PaymentExpired {
        payment_id: Uuid,
        order_id: Uuid,
    },
    RefundSucceeded {
        refund_id: Uuid,
        payment_id: Uuid,
        amount: Decimal,
    },
    RefundFailed {
        refund_id: Uuid,
        payment_id: Uuid,
    },
}

/// Consumes events from the channel and dispatches them.
///
/// Downstream consumers (notifications, analytics, machine telemetry) hang
/// off this loop; the core itself only records the events.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(%order_id, "order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "order status changed");
            }
            Event::PaymentSucceeded {
                payment_id,
                order_id,
                amount,
            } => {
                info!(%payment_id, %order_id, %amount, "payment succeeded");
            }
            Event::PaymentFailed {
                payment_id,
                order_id,
            } => {
                info!(%payment_id, %order_id, "payment failed");
            }
            Event::InventoryRestoreSkipped {
                order_id,
                machine_id,
                slot_number,
                product_id,
            } => {
                warn!(
                    %order_id, %machine_id, slot_number, %product_id,
                    "inventory restoration skipped: machine or slot missing"
                );
            }
            other => {
                debug!(event = ?other, "event received");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        let cart_id = Uuid::new_v4();
        sender.send(Event::CartCreated(cart_id)).await.unwrap();

        match rx.recv().await {
            Some(Event::CartCreated(id)) => assert_eq!(id, cart_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error out.
        sender.send_or_log(Event::CartCleared(Uuid::new_v4())).await;
    }

    #[test]
    fn events_serialize_round_trip() {
        let event = Event::InventoryReserved {
            machine_id: Uuid::new_v4(),
            slot_number: 4,
            product_id: Uuid::new_v4(),
            quantity: 2,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        match back {
            Event::InventoryReserved { slot_number, .. } => assert_eq!(slot_number, 4),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
