use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::models::{
    AuditLogEntry, BroadcastList, Conversation, FollowupTemplate, GatewayInstance, QueueItem,
    ValidationSummary,
};

#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Atomically claims up to `limit` due items (pending, attempts below the
    /// effective cap, which is the row's `max_attempts` clamped by
    /// `max_attempts`), oldest first: each claimed item moves to `processing`
    /// with `attempts` incremented before it is returned. Two overlapping
    /// invocations never receive the same item.
    async fn claim_due(&self, limit: usize, max_attempts: u32) -> anyhow::Result<Vec<QueueItem>>;

    async fn assign_instance(&self, item_id: Uuid, instance_id: Uuid) -> anyhow::Result<()>;

    async fn mark_sent(&self, item_id: Uuid) -> anyhow::Result<()>;

    async fn mark_failed(&self, item_id: Uuid, error: &str) -> anyhow::Result<()>;

    /// Returns a claimed item to `pending` keeping the consumed attempt, so a
    /// later invocation retries it.
    async fn release_for_retry(&self, item_id: Uuid, error: &str) -> anyhow::Result<()>;

    /// Returns a claimed item to `pending` and refunds the attempt. Used when
    /// the item was never actually tried (cancellation, rate-limit backoff).
    async fn release_unclaimed(&self, item_id: Uuid) -> anyhow::Result<()>;

    /// Items of a broadcast list still pending or processing.
    async fn count_open_for_list(&self, list_id: Uuid) -> anyhow::Result<u64>;

    async fn get(&self, item_id: Uuid) -> anyhow::Result<Option<QueueItem>>;
}

#[async_trait]
pub trait BroadcastListRepository: Send + Sync {
    async fn increment_sent(&self, list_id: Uuid) -> anyhow::Result<()>;

    async fn increment_failed(&self, list_id: Uuid) -> anyhow::Result<()>;

    async fn sending_list_ids(&self) -> anyhow::Result<Vec<Uuid>>;

    async fn mark_completed(&self, list_id: Uuid) -> anyhow::Result<()>;

    async fn record_validation_summary(
        &self,
        list_id: Uuid,
        summary: ValidationSummary,
    ) -> anyhow::Result<()>;

    async fn get(&self, list_id: Uuid) -> anyhow::Result<Option<BroadcastList>>;
}

#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Active instances in a stable order; the snapshot for one invocation.
    async fn list_active(&self) -> anyhow::Result<Vec<GatewayInstance>>;
}

#[async_trait]
pub trait FollowupTemplateRepository: Send + Sync {
    /// Active templates ordered by `sequence_number`.
    async fn list_active(&self) -> anyhow::Result<Vec<FollowupTemplate>>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Conversations eligible for a follow-up: broadcast-originated, never
    /// replied, AI not paused, not parked in nurture, fewer than
    /// `max_followups` sent. Staleness order (least recently touched first).
    async fn list_followup_candidates(
        &self,
        limit: usize,
        max_followups: u32,
    ) -> anyhow::Result<Vec<Conversation>>;

    async fn record_followup_sent(
        &self,
        conversation_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    async fn set_stage(&self, conversation_id: Uuid, stage_tag: &str) -> anyhow::Result<()>;

    async fn get(&self, conversation_id: Uuid) -> anyhow::Result<Option<Conversation>>;
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(&self, entry: AuditLogEntry) -> anyhow::Result<()>;
}
