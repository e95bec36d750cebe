#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, FixedOffset, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use dispatch_engine::{
    application::{
        handlers::{
            dispatcher::Dispatcher,
            followup_scheduler::{FollowupScheduler, TemplateSelection},
            phone_validator::PhoneValidator,
        },
        services::{
            business_hours::BusinessHours,
            gateway::{GatewayClient, NumberCheck, SendReceipt},
            message_mutator::MessageMutator,
            pacing::Pacer,
        },
    },
    domain::{
        errors::SendError,
        models::{
            AuditLogEntry, BroadcastList, BroadcastStatus, Conversation, FollowupTemplate,
            GatewayInstance, QueueItem, QueueItemStatus,
        },
        repositories::AuditLogRepository,
    },
    infrastructure::repositories::in_memory::{
        InMemoryAuditLogRepository, InMemoryBroadcastListRepository,
        InMemoryConversationRepository, InMemoryFollowupTemplateRepository,
        InMemoryInstanceRepository, InMemoryQueueRepository,
    },
};

#[derive(Debug, Clone)]
pub struct SendCall {
    pub instance_id: Uuid,
    pub phone: String,
    pub message: String,
    pub media: bool,
}

/// Gateway double with per-phone scripted failures; every unscripted call
/// succeeds. Records calls so tests can assert on traffic.
#[derive(Default)]
pub struct ScriptedGateway {
    send_errors: Mutex<HashMap<String, VecDeque<SendError>>>,
    check_outcomes: Mutex<HashMap<String, Result<NumberCheck, SendError>>>,
    send_calls: Mutex<Vec<SendCall>>,
    check_calls: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues one error for the next send to `phone`; later sends succeed
    /// again unless more errors are queued.
    pub async fn script_send_error(&self, phone: &str, error: SendError) {
        let mut scripts = self.send_errors.lock().await;
        scripts.entry(phone.to_string()).or_default().push_back(error);
    }

    pub async fn script_check(&self, phone: &str, outcome: Result<NumberCheck, SendError>) {
        let mut scripts = self.check_outcomes.lock().await;
        scripts.insert(phone.to_string(), outcome);
    }

    pub async fn send_calls(&self) -> Vec<SendCall> {
        self.send_calls.lock().await.clone()
    }

    pub async fn check_calls(&self) -> Vec<String> {
        self.check_calls.lock().await.clone()
    }

    async fn next_send(&self, phone: &str) -> Result<SendReceipt, SendError> {
        let mut scripts = self.send_errors.lock().await;
        if let Some(queue) = scripts.get_mut(phone) {
            if let Some(error) = queue.pop_front() {
                return Err(error);
            }
        }
        Ok(SendReceipt {
            message_id: Some("gw-test-id".to_string()),
        })
    }
}

#[async_trait]
impl GatewayClient for ScriptedGateway {
    async fn send_text(
        &self,
        instance: &GatewayInstance,
        phone: &str,
        message: &str,
    ) -> Result<SendReceipt, SendError> {
        self.send_calls.lock().await.push(SendCall {
            instance_id: instance.id,
            phone: phone.to_string(),
            message: message.to_string(),
            media: false,
        });
        self.next_send(phone).await
    }

    async fn send_media(
        &self,
        instance: &GatewayInstance,
        phone: &str,
        _media_url: &str,
        caption: &str,
    ) -> Result<SendReceipt, SendError> {
        self.send_calls.lock().await.push(SendCall {
            instance_id: instance.id,
            phone: phone.to_string(),
            message: caption.to_string(),
            media: true,
        });
        self.next_send(phone).await
    }

    async fn check_number(
        &self,
        _instance: &GatewayInstance,
        phone: &str,
    ) -> Result<NumberCheck, SendError> {
        self.check_calls.lock().await.push(phone.to_string());
        let outcomes = self.check_outcomes.lock().await;
        match outcomes.get(phone) {
            Some(outcome) => outcome.clone(),
            None => Ok(NumberCheck {
                exists: true,
                formatted_number: Some(phone.to_string()),
            }),
        }
    }
}

/// Audit sink whose writes always fail, for driving the storage-error paths.
pub struct FailingAuditLog;

#[async_trait]
impl AuditLogRepository for FailingAuditLog {
    async fn append(&self, _entry: AuditLogEntry) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("audit store unavailable"))
    }
}

pub fn local_offset() -> FixedOffset {
    FixedOffset::west_opt(3 * 3600).unwrap()
}

pub fn always_open() -> BusinessHours {
    BusinessHours::always_open(local_offset())
}

pub fn always_closed() -> BusinessHours {
    BusinessHours {
        weekdays: Default::default(),
        ..BusinessHours::always_open(local_offset())
    }
}

pub fn instance(name: &str) -> GatewayInstance {
    GatewayInstance {
        id: Uuid::new_v4(),
        base_url: format!("http://{name}.gateway.local"),
        auth_token: "token".to_string(),
        display_name: name.to_string(),
        active: true,
    }
}

/// Pending item aged `age_secs` so tests control FIFO order.
pub fn queue_item(phone: &str, list_id: Option<Uuid>, age_secs: i64) -> QueueItem {
    QueueItem {
        id: Uuid::new_v4(),
        schedule_id: None,
        broadcast_list_id: list_id,
        phone: phone.to_string(),
        message_template: "Oi {nome}!".to_string(),
        media_url: None,
        lead_data: HashMap::from([("nome".to_string(), "João".to_string())]),
        status: QueueItemStatus::Pending,
        attempts: 0,
        max_attempts: 3,
        error_message: None,
        assigned_instance_id: None,
        created_at: Utc::now() - Duration::seconds(age_secs),
        processed_at: None,
    }
}

pub fn broadcast_list(status: BroadcastStatus) -> BroadcastList {
    BroadcastList {
        id: Uuid::new_v4(),
        name: "campanha".to_string(),
        status,
        sent_count: 0,
        failed_count: 0,
        validated_count: 0,
        valid_count: 0,
        invalid_count: 0,
        landline_count: 0,
    }
}

pub fn template(sequence: u32, hours: i64, stage_tag: Option<&str>) -> FollowupTemplate {
    FollowupTemplate {
        id: Uuid::new_v4(),
        sequence_number: sequence,
        hours_after_trigger: hours,
        message_template: format!("Follow-up {sequence}, {{nome}}?"),
        stage_tag: stage_tag.map(str::to_string),
        active: true,
    }
}

pub fn conversation(phone: &str, trigger_hours_ago: i64) -> Conversation {
    Conversation {
        id: Uuid::new_v4(),
        phone: phone.to_string(),
        stage_tag: "contacted".to_string(),
        followup_count: 0,
        last_followup_at: None,
        last_lead_message_at: None,
        trigger_timestamp: Some(Utc::now() - Duration::hours(trigger_hours_ago)),
        ai_paused: false,
        lead_data: HashMap::from([("nome".to_string(), "Maria".to_string())]),
    }
}

pub struct DispatchHarness {
    pub queue: Arc<InMemoryQueueRepository>,
    pub lists: Arc<InMemoryBroadcastListRepository>,
    pub instances: Arc<InMemoryInstanceRepository>,
    pub audit: Arc<InMemoryAuditLogRepository>,
    pub gateway: Arc<ScriptedGateway>,
    pub dispatcher: Dispatcher,
}

pub fn dispatch_harness(hours: BusinessHours) -> DispatchHarness {
    let queue = Arc::new(InMemoryQueueRepository::new());
    let lists = Arc::new(InMemoryBroadcastListRepository::new());
    let instances = Arc::new(InMemoryInstanceRepository::new());
    let audit = Arc::new(InMemoryAuditLogRepository::new());
    let gateway = ScriptedGateway::new();
    let dispatcher = Dispatcher::new(
        queue.clone(),
        lists.clone(),
        instances.clone(),
        audit.clone(),
        gateway.clone(),
        MessageMutator::new(),
        hours,
        Pacer::none(),
        50,
        3,
    );
    DispatchHarness {
        queue,
        lists,
        instances,
        audit,
        gateway,
        dispatcher,
    }
}

pub struct FollowupHarness {
    pub conversations: Arc<InMemoryConversationRepository>,
    pub templates: Arc<InMemoryFollowupTemplateRepository>,
    pub instances: Arc<InMemoryInstanceRepository>,
    pub audit: Arc<InMemoryAuditLogRepository>,
    pub gateway: Arc<ScriptedGateway>,
    pub scheduler: FollowupScheduler,
}

pub fn followup_harness(hours: BusinessHours, selection: TemplateSelection) -> FollowupHarness {
    let conversations = Arc::new(InMemoryConversationRepository::new());
    let templates = Arc::new(InMemoryFollowupTemplateRepository::new());
    let instances = Arc::new(InMemoryInstanceRepository::new());
    let audit = Arc::new(InMemoryAuditLogRepository::new());
    let gateway = ScriptedGateway::new();
    let scheduler = FollowupScheduler::new(
        conversations.clone(),
        templates.clone(),
        instances.clone(),
        audit.clone(),
        gateway.clone(),
        MessageMutator::new(),
        hours,
        Pacer::none(),
        selection,
        30,
        3,
    );
    FollowupHarness {
        conversations,
        templates,
        instances,
        audit,
        gateway,
        scheduler,
    }
}

pub struct ValidationHarness {
    pub lists: Arc<InMemoryBroadcastListRepository>,
    pub instances: Arc<InMemoryInstanceRepository>,
    pub gateway: Arc<ScriptedGateway>,
    pub validator: PhoneValidator,
}

pub fn validation_harness() -> ValidationHarness {
    let lists = Arc::new(InMemoryBroadcastListRepository::new());
    let instances = Arc::new(InMemoryInstanceRepository::new());
    let gateway = ScriptedGateway::new();
    let validator = PhoneValidator::new(
        lists.clone(),
        instances.clone(),
        gateway.clone(),
        Pacer::none(),
        10,
    );
    ValidationHarness {
        lists,
        instances,
        gateway,
        validator,
    }
}
