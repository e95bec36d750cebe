use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemStatus {
    Pending,
    Processing,
    Sent,
    Failed,
}

impl QueueItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueItemStatus::Pending => "pending",
            QueueItemStatus::Processing => "processing",
            QueueItemStatus::Sent => "sent",
            QueueItemStatus::Failed => "failed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(QueueItemStatus::Pending),
            "processing" => Some(QueueItemStatus::Processing),
            "sent" => Some(QueueItemStatus::Sent),
            "failed" => Some(QueueItemStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueItemStatus::Sent | QueueItemStatus::Failed)
    }
}

/// One outbound message waiting in the dispatch queue. Created by the enqueue
/// side of the product; this engine only ever moves it between states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub broadcast_list_id: Option<Uuid>,
    pub phone: String,
    pub message_template: String,
    pub media_url: Option<String>,
    pub lead_data: HashMap<String, String>,
    pub status: QueueItemStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub error_message: Option<String>,
    pub assigned_instance_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl QueueItem {
    /// True when the attempt that was just consumed was the last one allowed.
    /// The engine-wide cap clamps whatever the row carries, so the per-item
    /// `attempts <= max_attempts` invariant survives config changes.
    pub fn exhausted(&self, configured_cap: u32) -> bool {
        self.attempts >= self.max_attempts.min(configured_cap)
    }
}
