use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stage tag a conversation is parked in once every follow-up template has
/// been sent without a reply. Terminal for this engine; only a human or a
/// lead reply moves a conversation out of it.
pub const NURTURE_STAGE: &str = "nurture";

/// One step of the follow-up cadence. Ordered by `sequence_number` (1..N,
/// strictly increasing); `hours_after_trigger` is measured from the broadcast
/// send for the first step and from the previous follow-up afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowupTemplate {
    pub id: Uuid,
    pub sequence_number: u32,
    pub hours_after_trigger: i64,
    pub message_template: String,
    pub stage_tag: Option<String>,
    pub active: bool,
}

/// The slice of a conversation record the follow-up sweep cares about.
/// `last_lead_message_at == None` means the lead has never replied since the
/// broadcast; any reply permanently disqualifies the conversation here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub phone: String,
    pub stage_tag: String,
    pub followup_count: u32,
    pub last_followup_at: Option<DateTime<Utc>>,
    pub last_lead_message_at: Option<DateTime<Utc>>,
    pub trigger_timestamp: Option<DateTime<Utc>>,
    pub ai_paused: bool,
    pub lead_data: HashMap<String, String>,
}

impl Conversation {
    /// Reference point for the elapsed-time check: the broadcast trigger for
    /// the first follow-up, the previous follow-up for every later one.
    pub fn followup_reference(&self) -> Option<DateTime<Utc>> {
        if self.followup_count == 0 {
            self.trigger_timestamp
        } else {
            self.last_followup_at.or(self.trigger_timestamp)
        }
    }
}
