use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::{
    application::services::{
        business_hours::BusinessHours,
        gateway::GatewayClient,
        instance_pool::InstancePool,
        message_mutator::MessageMutator,
        pacing::Pacer,
    },
    domain::{
        errors::EngineError,
        models::{AuditLogEntry, Conversation, FollowupTemplate, NURTURE_STAGE},
        repositories::{
            AuditLogRepository, ConversationRepository, FollowupTemplateRepository,
            InstanceRepository,
        },
    },
};

/// How the next template for a conversation is chosen. Sequence keying is
/// authoritative; stage keying matches templates to the conversation's
/// current funnel stage instead of the global order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSelection {
    BySequence,
    ByStage,
}

impl TemplateSelection {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "sequence" => Some(TemplateSelection::BySequence),
            "stage" => Some(TemplateSelection::ByStage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FollowupSummary {
    pub processed: u64,
    pub sent: u64,
    pub skipped: u64,
}

/// Periodic sweep over broadcast-originated conversations that never got a
/// reply. Each eligible conversation advances one step through the follow-up
/// cadence; once the last template has gone out it is parked in nurture.
pub struct FollowupScheduler {
    conversation_repo: Arc<dyn ConversationRepository>,
    template_repo: Arc<dyn FollowupTemplateRepository>,
    instance_repo: Arc<dyn InstanceRepository>,
    audit_repo: Arc<dyn AuditLogRepository>,
    gateway: Arc<dyn GatewayClient>,
    mutator: MessageMutator,
    hours: BusinessHours,
    pacer: Pacer,
    selection: TemplateSelection,
    batch_size: usize,
    max_followups: u32,
}

impl FollowupScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conversation_repo: Arc<dyn ConversationRepository>,
        template_repo: Arc<dyn FollowupTemplateRepository>,
        instance_repo: Arc<dyn InstanceRepository>,
        audit_repo: Arc<dyn AuditLogRepository>,
        gateway: Arc<dyn GatewayClient>,
        mutator: MessageMutator,
        hours: BusinessHours,
        pacer: Pacer,
        selection: TemplateSelection,
        batch_size: usize,
        max_followups: u32,
    ) -> Self {
        Self {
            conversation_repo,
            template_repo,
            instance_repo,
            audit_repo,
            gateway,
            mutator,
            hours,
            pacer,
            selection,
            batch_size,
            max_followups,
        }
    }

    pub async fn run_once(&self, cancel: CancellationToken) -> anyhow::Result<FollowupSummary> {
        if !self.hours.is_open(Utc::now()) {
            tracing::info!("outside business hours, follow-up sweep skipped");
            return Ok(FollowupSummary::default());
        }

        let templates = self.template_repo.list_active().await?;
        if templates.is_empty() {
            return Err(EngineError::NoActiveTemplates.into());
        }
        let pool = InstancePool::new(self.instance_repo.list_active().await?)?;

        // The configured cap never exceeds what the cadence actually defines.
        let max_followups = self.max_followups.min(templates.len() as u32);
        let candidates = self
            .conversation_repo
            .list_followup_candidates(self.batch_size, max_followups)
            .await?;

        let mut summary = FollowupSummary {
            processed: candidates.len() as u64,
            ..FollowupSummary::default()
        };

        for (index, conversation) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                summary.skipped += (candidates.len() - index) as u64;
                break;
            }

            let Some(template) = self.next_template(&templates, conversation) else {
                summary.skipped += 1;
                continue;
            };

            let now = Utc::now();
            let due = conversation
                .followup_reference()
                .map(|reference| (now - reference).num_hours() >= template.hours_after_trigger)
                .unwrap_or(false);
            if !due {
                summary.skipped += 1;
                continue;
            }

            let instance = pool.select(index);
            let message = self
                .mutator
                .transform(&template.message_template, &conversation.lead_data);

            match self.gateway.send_text(instance, &conversation.phone, &message).await {
                Ok(_) => {
                    self.conversation_repo
                        .record_followup_sent(conversation.id, now)
                        .await?;
                    self.audit_repo
                        .append(AuditLogEntry::followup_sent(
                            conversation.id,
                            instance.id,
                            conversation.phone.clone(),
                        ))
                        .await?;
                    if conversation.followup_count + 1 >= max_followups {
                        self.conversation_repo
                            .set_stage(conversation.id, NURTURE_STAGE)
                            .await?;
                        tracing::info!(
                            conversation = %conversation.id,
                            "cadence exhausted, conversation parked in nurture"
                        );
                    }
                    tracing::info!(
                        conversation = %conversation.id,
                        sequence = template.sequence_number,
                        "follow-up sent"
                    );
                    summary.sent += 1;
                }
                Err(err) => {
                    // No attempts counter here: the conversation stays due
                    // and the next sweep picks it up again.
                    tracing::warn!(
                        conversation = %conversation.id,
                        error = %err,
                        "follow-up send failed"
                    );
                    summary.skipped += 1;
                }
            }

            self.pacer.pause().await;
        }

        Ok(summary)
    }

    fn next_template<'a>(
        &self,
        templates: &'a [FollowupTemplate],
        conversation: &Conversation,
    ) -> Option<&'a FollowupTemplate> {
        match self.selection {
            TemplateSelection::BySequence => templates
                .iter()
                .find(|t| t.sequence_number == conversation.followup_count + 1),
            TemplateSelection::ByStage => templates.iter().find(|t| {
                t.sequence_number > conversation.followup_count
                    && t.stage_tag.as_deref() == Some(conversation.stage_tag.as_str())
            }),
        }
    }
}
