use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
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

#[derive(Default)]
pub struct InMemoryQueueRepository {
    items: Arc<RwLock<HashMap<Uuid, QueueItem>>>,
}

impl InMemoryQueueRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, item: QueueItem) {
        let mut items = self.items.write().await;
        items.insert(item.id, item);
    }

    pub async fn snapshot(&self) -> Vec<QueueItem> {
        let items = self.items.read().await;
        items.values().cloned().collect()
    }
}

#[async_trait]
impl QueueRepository for InMemoryQueueRepository {
    async fn claim_due(&self, limit: usize, max_attempts: u32) -> anyhow::Result<Vec<QueueItem>> {
        let mut items = self.items.write().await;
        let mut due: Vec<Uuid> = items
            .values()
            .filter(|item| {
                item.status == QueueItemStatus::Pending
                    && item.attempts < item.max_attempts.min(max_attempts)
            })
            .map(|item| item.id)
            .collect();
        due.sort_by_key(|id| items[id].created_at);
        due.truncate(limit);

        let mut claimed = Vec::with_capacity(due.len());
        for id in due {
            if let Some(item) = items.get_mut(&id) {
                item.status = QueueItemStatus::Processing;
                item.attempts += 1;
                claimed.push(item.clone());
            }
        }
        Ok(claimed)
    }

    async fn assign_instance(&self, item_id: Uuid, instance_id: Uuid) -> anyhow::Result<()> {
        let mut items = self.items.write().await;
        if let Some(item) = items.get_mut(&item_id) {
            item.assigned_instance_id = Some(instance_id);
        }
        Ok(())
    }

    async fn mark_sent(&self, item_id: Uuid) -> anyhow::Result<()> {
        let mut items = self.items.write().await;
        if let Some(item) = items.get_mut(&item_id) {
            if item.status == QueueItemStatus::Processing {
                item.status = QueueItemStatus::Sent;
                item.processed_at = Some(Utc::now());
                item.error_message = None;
            }
        }
        Ok(())
    }

    async fn mark_failed(&self, item_id: Uuid, error: &str) -> anyhow::Result<()> {
        let mut items = self.items.write().await;
        if let Some(item) = items.get_mut(&item_id) {
            if item.status == QueueItemStatus::Processing {
                item.status = QueueItemStatus::Failed;
                item.processed_at = Some(Utc::now());
                item.error_message = Some(error.to_string());
            }
        }
        Ok(())
    }

    async fn release_for_retry(&self, item_id: Uuid, error: &str) -> anyhow::Result<()> {
        let mut items = self.items.write().await;
        if let Some(item) = items.get_mut(&item_id) {
            if item.status == QueueItemStatus::Processing {
                item.status = QueueItemStatus::Pending;
                item.error_message = Some(error.to_string());
            }
        }
        Ok(())
    }

    async fn release_unclaimed(&self, item_id: Uuid) -> anyhow::Result<()> {
        let mut items = self.items.write().await;
        if let Some(item) = items.get_mut(&item_id) {
            if item.status == QueueItemStatus::Processing {
                item.status = QueueItemStatus::Pending;
                item.attempts = item.attempts.saturating_sub(1);
                item.assigned_instance_id = None;
            }
        }
        Ok(())
    }

    async fn count_open_for_list(&self, list_id: Uuid) -> anyhow::Result<u64> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|item| {
                item.broadcast_list_id == Some(list_id) && !item.status.is_terminal()
            })
            .count() as u64)
    }

    async fn get(&self, item_id: Uuid) -> anyhow::Result<Option<QueueItem>> {
        let items = self.items.read().await;
        Ok(items.get(&item_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryBroadcastListRepository {
    lists: Arc<RwLock<HashMap<Uuid, BroadcastList>>>,
}

impl InMemoryBroadcastListRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, list: BroadcastList) {
        let mut lists = self.lists.write().await;
        lists.insert(list.id, list);
    }
}

#[async_trait]
impl BroadcastListRepository for InMemoryBroadcastListRepository {
    async fn increment_sent(&self, list_id: Uuid) -> anyhow::Result<()> {
        let mut lists = self.lists.write().await;
        if let Some(list) = lists.get_mut(&list_id) {
            list.sent_count += 1;
        }
        Ok(())
    }

    async fn increment_failed(&self, list_id: Uuid) -> anyhow::Result<()> {
        let mut lists = self.lists.write().await;
        if let Some(list) = lists.get_mut(&list_id) {
            list.failed_count += 1;
        }
        Ok(())
    }

    async fn sending_list_ids(&self) -> anyhow::Result<Vec<Uuid>> {
        let lists = self.lists.read().await;
        Ok(lists
            .values()
            .filter(|list| list.status == BroadcastStatus::Sending)
            .map(|list| list.id)
            .collect())
    }

    async fn mark_completed(&self, list_id: Uuid) -> anyhow::Result<()> {
        let mut lists = self.lists.write().await;
        if let Some(list) = lists.get_mut(&list_id) {
            if list.status == BroadcastStatus::Sending {
                list.status = BroadcastStatus::Completed;
            }
        }
        Ok(())
    }

    async fn record_validation_summary(
        &self,
        list_id: Uuid,
        summary: ValidationSummary,
    ) -> anyhow::Result<()> {
        let mut lists = self.lists.write().await;
        if let Some(list) = lists.get_mut(&list_id) {
            list.validated_count = summary.total;
            list.valid_count = summary.valid;
            list.invalid_count = summary.invalid;
            list.landline_count = summary.landline;
        }
        Ok(())
    }

    async fn get(&self, list_id: Uuid) -> anyhow::Result<Option<BroadcastList>> {
        let lists = self.lists.read().await;
        Ok(lists.get(&list_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryInstanceRepository {
    instances: Arc<RwLock<Vec<GatewayInstance>>>,
}

impl InMemoryInstanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, instance: GatewayInstance) {
        let mut instances = self.instances.write().await;
        instances.push(instance);
    }
}

#[async_trait]
impl InstanceRepository for InMemoryInstanceRepository {
    async fn list_active(&self) -> anyhow::Result<Vec<GatewayInstance>> {
        let instances = self.instances.read().await;
        // insertion order stands in for the stable ordering of the store
        Ok(instances.iter().filter(|i| i.active).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryFollowupTemplateRepository {
    templates: Arc<RwLock<Vec<FollowupTemplate>>>,
}

impl InMemoryFollowupTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, template: FollowupTemplate) {
        let mut templates = self.templates.write().await;
        templates.push(template);
    }
}

#[async_trait]
impl FollowupTemplateRepository for InMemoryFollowupTemplateRepository {
    async fn list_active(&self) -> anyhow::Result<Vec<FollowupTemplate>> {
        let templates = self.templates.read().await;
        let mut active: Vec<FollowupTemplate> =
            templates.iter().filter(|t| t.active).cloned().collect();
        active.sort_by_key(|t| t.sequence_number);
        Ok(active)
    }
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    conversations: Arc<RwLock<HashMap<Uuid, Conversation>>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, conversation: Conversation) {
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.id, conversation);
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn list_followup_candidates(
        &self,
        limit: usize,
        max_followups: u32,
    ) -> anyhow::Result<Vec<Conversation>> {
        let conversations = self.conversations.read().await;
        let mut candidates: Vec<Conversation> = conversations
            .values()
            .filter(|c| {
                c.trigger_timestamp.is_some()
                    && c.last_lead_message_at.is_none()
                    && !c.ai_paused
                    && c.stage_tag != NURTURE_STAGE
                    && c.followup_count < max_followups
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|c| c.last_followup_at.or(c.trigger_timestamp));
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn record_followup_sent(
        &self,
        conversation_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let mut conversations = self.conversations.write().await;
        if let Some(conversation) = conversations.get_mut(&conversation_id) {
            conversation.followup_count += 1;
            conversation.last_followup_at = Some(sent_at);
        }
        Ok(())
    }

    async fn set_stage(&self, conversation_id: Uuid, stage_tag: &str) -> anyhow::Result<()> {
        let mut conversations = self.conversations.write().await;
        if let Some(conversation) = conversations.get_mut(&conversation_id) {
            conversation.stage_tag = stage_tag.to_string();
        }
        Ok(())
    }

    async fn get(&self, conversation_id: Uuid) -> anyhow::Result<Option<Conversation>> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(&conversation_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryAuditLogRepository {
    entries: Arc<RwLock<Vec<AuditLogEntry>>>,
}

impl InMemoryAuditLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditLogEntry> {
        let entries = self.entries.read().await;
        entries.clone()
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append(&self, entry: AuditLogEntry) -> anyhow::Result<()> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }
}
