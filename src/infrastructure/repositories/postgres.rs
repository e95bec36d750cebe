use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, types::Json};
use uuid::Uuid;

use crate::domain::{
    models::{
        AuditLogEntry, BroadcastList, BroadcastStatus, Conversation, FollowupTemplate,
        GatewayInstance, NURTURE_STAGE, QueueItem, QueueItemStatus, ValidationSummary,
    },
    repositories::{
        AuditLogRepository, BroadcastListRepository, ConversationRepository,
        FollowupTemplateRepository, InstanceRepository, QueueRepository,
    },
};

pub type PgPool = Pool<Postgres>;

const QUEUE_COLUMNS: &str = "id, schedule_id, broadcast_list_id, phone, message_template, \
     media_url, lead_data, status, attempts, max_attempts, error_message, \
     assigned_instance_id, created_at, processed_at";

#[derive(Clone)]
pub struct PostgresQueueRepository {
    pool: PgPool,
}

impl PostgresQueueRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl QueueRepository for PostgresQueueRepository {
    async fn claim_due(&self, limit: usize, max_attempts: u32) -> anyhow::Result<Vec<QueueItem>> {
        // SKIP LOCKED makes the claim safe under overlapping invocations:
        // each row moves pending -> processing exactly once.
        let records = sqlx::query_as::<_, QueueItemRecord>(
            r#"
            WITH due AS (
                SELECT id FROM dispatch_queue
                WHERE status = 'pending' AND attempts < LEAST(max_attempts, $2)
                ORDER BY created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE dispatch_queue q
            SET status = 'processing', attempts = q.attempts + 1
            FROM due
            WHERE q.id = due.id
            RETURNING q.id, q.schedule_id, q.broadcast_list_id, q.phone, q.message_template,
                      q.media_url, q.lead_data, q.status, q.attempts, q.max_attempts,
                      q.error_message, q.assigned_instance_id, q.created_at, q.processed_at
            "#,
        )
        .bind(limit as i64)
        .bind(max_attempts as i32)
        .fetch_all(&self.pool)
        .await?;
        let mut items: Vec<QueueItem> = records.into_iter().map(QueueItem::from).collect();
        // RETURNING does not preserve the CTE order
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    async fn assign_instance(&self, item_id: Uuid, instance_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE dispatch_queue SET assigned_instance_id = $2 WHERE id = $1")
            .bind(item_id)
            .bind(instance_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_sent(&self, item_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE dispatch_queue
            SET status = 'sent', processed_at = NOW(), error_message = NULL
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(item_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_failed(&self, item_id: Uuid, error: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE dispatch_queue
            SET status = 'failed', processed_at = NOW(), error_message = $2
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(item_id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn release_for_retry(&self, item_id: Uuid, error: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE dispatch_queue
            SET status = 'pending', error_message = $2
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(item_id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn release_unclaimed(&self, item_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE dispatch_queue
            SET status = 'pending',
                attempts = GREATEST(attempts - 1, 0),
                assigned_instance_id = NULL
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(item_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_open_for_list(&self, list_id: Uuid) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM dispatch_queue
            WHERE broadcast_list_id = $1 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(list_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn get(&self, item_id: Uuid) -> anyhow::Result<Option<QueueItem>> {
        let query = format!("SELECT {QUEUE_COLUMNS} FROM dispatch_queue WHERE id = $1");
        let record = sqlx::query_as::<_, QueueItemRecord>(&query)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record.map(QueueItem::from))
    }
}

#[derive(Clone)]
pub struct PostgresBroadcastListRepository {
    pool: PgPool,
}

impl PostgresBroadcastListRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl BroadcastListRepository for PostgresBroadcastListRepository {
    async fn increment_sent(&self, list_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE broadcast_lists SET sent_count = sent_count + 1 WHERE id = $1")
            .bind(list_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn increment_failed(&self, list_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE broadcast_lists SET failed_count = failed_count + 1 WHERE id = $1")
            .bind(list_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn sending_list_ids(&self) -> anyhow::Result<Vec<Uuid>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM broadcast_lists WHERE status = 'sending'")
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    async fn mark_completed(&self, list_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE broadcast_lists SET status = 'completed' WHERE id = $1 AND status = 'sending'",
        )
        .bind(list_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_validation_summary(
        &self,
        list_id: Uuid,
        summary: ValidationSummary,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE broadcast_lists
            SET validated_count = $2,
                valid_count = $3,
                invalid_count = $4,
                landline_count = $5
            WHERE id = $1
            "#,
        )
        .bind(list_id)
        .bind(summary.total as i64)
        .bind(summary.valid as i64)
        .bind(summary.invalid as i64)
        .bind(summary.landline as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, list_id: Uuid) -> anyhow::Result<Option<BroadcastList>> {
        let record = sqlx::query_as::<_, BroadcastListRecord>(
            r#"
            SELECT id, name, status, sent_count, failed_count,
                   validated_count, valid_count, invalid_count, landline_count
            FROM broadcast_lists WHERE id = $1
            "#,
        )
        .bind(list_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(BroadcastList::from))
    }
}

#[derive(Clone)]
pub struct PostgresInstanceRepository {
    pool: PgPool,
}

impl PostgresInstanceRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl InstanceRepository for PostgresInstanceRepository {
    async fn list_active(&self) -> anyhow::Result<Vec<GatewayInstance>> {
        // Stable order keeps round-robin assignment reproducible per snapshot
        let records = sqlx::query_as::<_, GatewayInstanceRecord>(
            r#"
            SELECT id, base_url, auth_token, display_name, active
            FROM gateway_instances
            WHERE active = TRUE
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(GatewayInstance::from).collect())
    }
}

#[derive(Clone)]
pub struct PostgresFollowupTemplateRepository {
    pool: PgPool,
}

impl PostgresFollowupTemplateRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl FollowupTemplateRepository for PostgresFollowupTemplateRepository {
    async fn list_active(&self) -> anyhow::Result<Vec<FollowupTemplate>> {
        let records = sqlx::query_as::<_, FollowupTemplateRecord>(
            r#"
            SELECT id, sequence_number, hours_after_trigger, message_template, stage_tag, active
            FROM followup_templates
            WHERE active = TRUE
            ORDER BY sequence_number ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(FollowupTemplate::from).collect())
    }
}

#[derive(Clone)]
pub struct PostgresConversationRepository {
    pool: PgPool,
}

impl PostgresConversationRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

const CONVERSATION_COLUMNS: &str = "id, phone, stage_tag, followup_count, last_followup_at, \
     last_lead_message_at, trigger_timestamp, ai_paused, lead_data";

#[async_trait]
impl ConversationRepository for PostgresConversationRepository {
    async fn list_followup_candidates(
        &self,
        limit: usize,
        max_followups: u32,
    ) -> anyhow::Result<Vec<Conversation>> {
        let query = format!(
            r#"
            SELECT {CONVERSATION_COLUMNS} FROM conversations
            WHERE trigger_timestamp IS NOT NULL
              AND last_lead_message_at IS NULL
              AND ai_paused = FALSE
              AND stage_tag <> $3
              AND followup_count < $2
            ORDER BY COALESCE(last_followup_at, trigger_timestamp) ASC
            LIMIT $1
            "#
        );
        let records = sqlx::query_as::<_, ConversationRecord>(&query)
            .bind(limit as i64)
            .bind(max_followups as i32)
            .bind(NURTURE_STAGE)
            .fetch_all(&self.pool)
            .await?;
        Ok(records.into_iter().map(Conversation::from).collect())
    }

    async fn record_followup_sent(
        &self,
        conversation_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE conversations
            SET followup_count = followup_count + 1, last_followup_at = $2
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .bind(sent_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_stage(&self, conversation_id: Uuid, stage_tag: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE conversations SET stage_tag = $2 WHERE id = $1")
            .bind(conversation_id)
            .bind(stage_tag)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, conversation_id: Uuid) -> anyhow::Result<Option<Conversation>> {
        let query = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1");
        let record = sqlx::query_as::<_, ConversationRecord>(&query)
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record.map(Conversation::from))
    }
}

#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn append(&self, entry: AuditLogEntry) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dispatch_audit_log (
                id, queue_item_id, conversation_id, instance_id, phone, event, detail, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.queue_item_id)
        .bind(entry.conversation_id)
        .bind(entry.instance_id)
        .bind(&entry.phone)
        .bind(entry.event.as_str())
        .bind(&entry.detail)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct QueueItemRecord {
    id: Uuid,
    schedule_id: Option<Uuid>,
    broadcast_list_id: Option<Uuid>,
    phone: String,
    message_template: String,
    media_url: Option<String>,
    lead_data: Json<HashMap<String, String>>,
    status: String,
    attempts: i32,
    max_attempts: i32,
    error_message: Option<String>,
    assigned_instance_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl From<QueueItemRecord> for QueueItem {
    fn from(record: QueueItemRecord) -> Self {
        QueueItem {
            id: record.id,
            schedule_id: record.schedule_id,
            broadcast_list_id: record.broadcast_list_id,
            phone: record.phone,
            message_template: record.message_template,
            media_url: record.media_url,
            lead_data: record.lead_data.0,
            status: QueueItemStatus::from_str(&record.status).unwrap_or(QueueItemStatus::Pending),
            attempts: record.attempts.max(0) as u32,
            max_attempts: record.max_attempts.max(0) as u32,
            error_message: record.error_message,
            assigned_instance_id: record.assigned_instance_id,
            created_at: record.created_at,
            processed_at: record.processed_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct BroadcastListRecord {
    id: Uuid,
    name: String,
    status: String,
    sent_count: i64,
    failed_count: i64,
    validated_count: i64,
    valid_count: i64,
    invalid_count: i64,
    landline_count: i64,
}

impl From<BroadcastListRecord> for BroadcastList {
    fn from(record: BroadcastListRecord) -> Self {
        BroadcastList {
            id: record.id,
            name: record.name,
            status: BroadcastStatus::from_str(&record.status).unwrap_or(BroadcastStatus::Draft),
            sent_count: record.sent_count.max(0) as u64,
            failed_count: record.failed_count.max(0) as u64,
            validated_count: record.validated_count.max(0) as u64,
            valid_count: record.valid_count.max(0) as u64,
            invalid_count: record.invalid_count.max(0) as u64,
            landline_count: record.landline_count.max(0) as u64,
        }
    }
}

#[derive(Debug, FromRow)]
struct GatewayInstanceRecord {
    id: Uuid,
    base_url: String,
    auth_token: String,
    display_name: String,
    active: bool,
}

impl From<GatewayInstanceRecord> for GatewayInstance {
    fn from(record: GatewayInstanceRecord) -> Self {
        GatewayInstance {
            id: record.id,
            base_url: record.base_url,
            auth_token: record.auth_token,
            display_name: record.display_name,
            active: record.active,
        }
    }
}

#[derive(Debug, FromRow)]
struct FollowupTemplateRecord {
    id: Uuid,
    sequence_number: i32,
    hours_after_trigger: i64,
    message_template: String,
    stage_tag: Option<String>,
    active: bool,
}

impl From<FollowupTemplateRecord> for FollowupTemplate {
    fn from(record: FollowupTemplateRecord) -> Self {
        FollowupTemplate {
            id: record.id,
            sequence_number: record.sequence_number.max(0) as u32,
            hours_after_trigger: record.hours_after_trigger,
            message_template: record.message_template,
            stage_tag: record.stage_tag,
            active: record.active,
        }
    }
}

#[derive(Debug, FromRow)]
struct ConversationRecord {
    id: Uuid,
    phone: String,
    stage_tag: String,
    followup_count: i32,
    last_followup_at: Option<DateTime<Utc>>,
    last_lead_message_at: Option<DateTime<Utc>>,
    trigger_timestamp: Option<DateTime<Utc>>,
    ai_paused: bool,
    lead_data: Json<HashMap<String, String>>,
}

impl From<ConversationRecord> for Conversation {
    fn from(record: ConversationRecord) -> Self {
        Conversation {
            id: record.id,
            phone: record.phone,
            stage_tag: record.stage_tag,
            followup_count: record.followup_count.max(0) as u32,
            last_followup_at: record.last_followup_at,
            last_lead_message_at: record.last_lead_message_at,
            trigger_timestamp: record.trigger_timestamp,
            ai_paused: record.ai_paused,
            lead_data: record.lead_data.0,
        }
    }
}
