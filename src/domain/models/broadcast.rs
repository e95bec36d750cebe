use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastStatus {
    Draft,
    Scheduled,
    Sending,
    Completed,
    Paused,
}

impl BroadcastStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastStatus::Draft => "draft",
            BroadcastStatus::Scheduled => "scheduled",
            BroadcastStatus::Sending => "sending",
            BroadcastStatus::Completed => "completed",
            BroadcastStatus::Paused => "paused",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(BroadcastStatus::Draft),
            "scheduled" => Some(BroadcastStatus::Scheduled),
            "sending" => Some(BroadcastStatus::Sending),
            "completed" => Some(BroadcastStatus::Completed),
            "paused" => Some(BroadcastStatus::Paused),
            _ => None,
        }
    }
}

/// Aggregate view of one broadcast campaign. `sent_count`/`failed_count` grow
/// monotonically as queue items reach a terminal state; `completed` is reached
/// only once no item of the list remains pending or processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastList {
    pub id: Uuid,
    pub name: String,
    pub status: BroadcastStatus,
    pub sent_count: u64,
    pub failed_count: u64,
    pub validated_count: u64,
    pub valid_count: u64,
    pub invalid_count: u64,
    pub landline_count: u64,
}
