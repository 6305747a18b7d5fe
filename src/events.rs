use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the editing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    SessionOpened {
        session_id: Uuid,
        groups: usize,
        units: usize,
    },
    PurchaseApplied {
        session_id: Uuid,
        group_key: String,
        unit_id: i64,
        added_on_hand: Decimal,
        new_cost: Decimal,
    },
    FieldEdited {
        session_id: Uuid,
        unit_id: i64,
        code: String,
    },
    EditsMerged {
        session_id: Uuid,
        applied: usize,
        orphaned: usize,
        merged_at: DateTime<Utc>,
    },
    SubmissionCompleted {
        session_id: Uuid,
        group_key: String,
    },
    SubmissionFailed {
        session_id: Uuid,
        group_key: String,
        reason: String,
    },
    SessionClosed {
        session_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is gone.
    /// Event delivery must never fail a user-visible operation.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(err) = self.send(event).await {
            warn!(error = %err, "event dropped");
        }
    }
}

/// Consumes the event stream and logs it. Spawned once at startup.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::PurchaseApplied {
                session_id,
                group_key,
                unit_id,
                added_on_hand,
                new_cost,
            } => {
                info!(
                    %session_id,
                    %group_key,
                    unit_id,
                    %added_on_hand,
                    %new_cost,
                    "purchase applied"
                );
            }
            Event::SubmissionFailed {
                session_id,
                group_key,
                reason,
            } => {
                warn!(%session_id, %group_key, %reason, "submission failed");
            }
            other => {
                info!(event = ?other, "event");
            }
        }
    }
}
