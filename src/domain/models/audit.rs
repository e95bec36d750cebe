use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::queue::QueueItem;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    MessageSent,
    MessageFailed,
    /// The assigned gateway credential reported itself disconnected. Kept
    /// distinct from ordinary failures so operators can spot a dead instance.
    InstanceDisconnected,
    FollowupSent,
}

impl AuditEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventKind::MessageSent => "message_sent",
            AuditEventKind::MessageFailed => "message_failed",
            AuditEventKind::InstanceDisconnected => "instance_disconnected",
            AuditEventKind::FollowupSent => "followup_sent",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "message_sent" => Some(AuditEventKind::MessageSent),
            "message_failed" => Some(AuditEventKind::MessageFailed),
            "instance_disconnected" => Some(AuditEventKind::InstanceDisconnected),
            "followup_sent" => Some(AuditEventKind::FollowupSent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub queue_item_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    pub instance_id: Option<Uuid>,
    pub phone: String,
    pub event: AuditEventKind,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn for_item(item: &QueueItem, event: AuditEventKind, detail: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue_item_id: Some(item.id),
            conversation_id: None,
            instance_id: item.assigned_instance_id,
            phone: item.phone.clone(),
            event,
            detail,
            created_at: Utc::now(),
        }
    }

    pub fn followup_sent(conversation_id: Uuid, instance_id: Uuid, phone: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue_item_id: None,
            conversation_id: Some(conversation_id),
            instance_id: Some(instance_id),
            phone,
            event: AuditEventKind::FollowupSent,
            detail: None,
            created_at: Utc::now(),
        }
    }
}
