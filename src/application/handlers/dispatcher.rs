use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    application::services::{
        business_hours::BusinessHours,
        gateway::{GatewayClient, SendReceipt},
        instance_pool::InstancePool,
        message_mutator::MessageMutator,
        pacing::Pacer,
    },
    domain::{
        errors::SendError,
        models::{AuditEventKind, AuditLogEntry, GatewayInstance, QueueItem},
        repositories::{
            AuditLogRepository, BroadcastListRepository, InstanceRepository, QueueRepository,
        },
    },
};

#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchSummary {
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl DispatchSummary {
    fn absorb(&mut self, other: DispatchSummary) {
        self.sent += other.sent;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// The core send loop. One `run_once` claims a bounded batch of due queue
/// items, spreads them round-robin over the active instances, and runs one
/// worker per instance so a single credential never has more than one send
/// in flight while different credentials proceed in parallel.
pub struct Dispatcher {
    queue_repo: Arc<dyn QueueRepository>,
    broadcast_repo: Arc<dyn BroadcastListRepository>,
    instance_repo: Arc<dyn InstanceRepository>,
    audit_repo: Arc<dyn AuditLogRepository>,
    gateway: Arc<dyn GatewayClient>,
    mutator: MessageMutator,
    hours: BusinessHours,
    pacer: Pacer,
    max_batch_size: usize,
    max_attempts: u32,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue_repo: Arc<dyn QueueRepository>,
        broadcast_repo: Arc<dyn BroadcastListRepository>,
        instance_repo: Arc<dyn InstanceRepository>,
        audit_repo: Arc<dyn AuditLogRepository>,
        gateway: Arc<dyn GatewayClient>,
        mutator: MessageMutator,
        hours: BusinessHours,
        pacer: Pacer,
        max_batch_size: usize,
        max_attempts: u32,
    ) -> Self {
        Self {
            queue_repo,
            broadcast_repo,
            instance_repo,
            audit_repo,
            gateway,
            mutator,
            hours,
            pacer,
            max_batch_size,
            max_attempts,
        }
    }

    pub async fn run_once(&self, cancel: CancellationToken) -> anyhow::Result<DispatchSummary> {
        if !self.hours.is_open(Utc::now()) {
            tracing::info!("outside business hours, dispatch skipped");
            return Ok(DispatchSummary::default());
        }

        // Pool preconditions come first: with no active instance nothing may
        // be claimed or mutated.
        let pool = InstancePool::new(self.instance_repo.list_active().await?)?;
        let items = self
            .queue_repo
            .claim_due(self.max_batch_size, self.max_attempts)
            .await?;
        if items.is_empty() {
            self.sweep_completed().await?;
            return Ok(DispatchSummary::default());
        }
        tracing::info!(
            claimed = items.len(),
            instances = pool.len(),
            "dispatching batch"
        );

        let mut groups: HashMap<Uuid, (GatewayInstance, Vec<QueueItem>)> = HashMap::new();
        for (index, mut item) in items.into_iter().enumerate() {
            let instance = pool.select(index);
            self.queue_repo.assign_instance(item.id, instance.id).await?;
            item.assigned_instance_id = Some(instance.id);
            groups
                .entry(instance.id)
                .or_insert_with(|| (instance.clone(), Vec::new()))
                .1
                .push(item);
        }

        let mut workers = JoinSet::new();
        for (instance, batch) in groups.into_values() {
            let worker = InstanceWorker {
                queue_repo: self.queue_repo.clone(),
                broadcast_repo: self.broadcast_repo.clone(),
                audit_repo: self.audit_repo.clone(),
                gateway: self.gateway.clone(),
                mutator: self.mutator,
                pacer: self.pacer,
                max_attempts: self.max_attempts,
                cancel: cancel.clone(),
            };
            workers.spawn(async move { worker.run(instance, batch).await });
        }

        let mut summary = DispatchSummary::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => summary.absorb(outcome),
                Err(err) => tracing::error!(error = %err, "instance worker panicked"),
            }
        }

        self.sweep_completed().await?;
        Ok(summary)
    }

    /// Every broadcast list still `sending` whose items have all reached a
    /// terminal state transitions to `completed`.
    async fn sweep_completed(&self) -> anyhow::Result<()> {
        for list_id in self.broadcast_repo.sending_list_ids().await? {
            if self.queue_repo.count_open_for_list(list_id).await? == 0 {
                self.broadcast_repo.mark_completed(list_id).await?;
                tracing::info!(list = %list_id, "broadcast completed");
            }
        }
        Ok(())
    }
}

/// Sends one instance's share of the batch serially, pacing after every send.
struct InstanceWorker {
    queue_repo: Arc<dyn QueueRepository>,
    broadcast_repo: Arc<dyn BroadcastListRepository>,
    audit_repo: Arc<dyn AuditLogRepository>,
    gateway: Arc<dyn GatewayClient>,
    mutator: MessageMutator,
    pacer: Pacer,
    max_attempts: u32,
    cancel: CancellationToken,
}

impl InstanceWorker {
    async fn run(self, instance: GatewayInstance, items: Vec<QueueItem>) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let mut queue = items.into_iter();
        while let Some(item) = queue.next() {
            // Cancellation is honored only between sends; a claimed item that
            // was never tried goes back to pending with its attempt refunded.
            if self.cancel.is_cancelled() {
                self.release(&item, &mut summary).await;
                continue;
            }

            let message = self.mutator.transform(&item.message_template, &item.lead_data);
            let result = match item.media_url.as_deref() {
                Some(url) => {
                    self.gateway
                        .send_media(&instance, &item.phone, url, &message)
                        .await
                }
                None => self.gateway.send_text(&instance, &item.phone, &message).await,
            };

            if matches!(result, Err(SendError::RateLimited)) {
                // Whole-batch backoff: release everything this instance still
                // holds instead of burning an attempt per item.
                self.release(&item, &mut summary).await;
                for rest in queue.by_ref() {
                    self.release(&rest, &mut summary).await;
                }
                tracing::warn!(
                    instance = %instance.display_name,
                    "gateway rate limited, remaining batch released"
                );
                break;
            }

            match self.settle(&instance, &item, result).await {
                Ok(outcome) => summary.absorb(outcome),
                Err(err) => {
                    // A storage failure on one item must not strand the rest
                    // of the claimed batch in processing, a state no later
                    // invocation ever re-selects.
                    tracing::error!(
                        item = %item.id,
                        error = %err,
                        "state update failed, releasing remaining batch"
                    );
                    self.release(&item, &mut summary).await;
                    for rest in queue.by_ref() {
                        self.release(&rest, &mut summary).await;
                    }
                    break;
                }
            }

            self.pacer.pause().await;
        }
        summary
    }

    /// Returns a claimed item to pending with the attempt refunded. The
    /// release is a guarded no-op for items already in a terminal state.
    async fn release(&self, item: &QueueItem, summary: &mut DispatchSummary) {
        if let Err(err) = self.queue_repo.release_unclaimed(item.id).await {
            tracing::error!(item = %item.id, error = %err, "claimed item could not be released");
        }
        summary.skipped += 1;
    }

    /// Records the outcome of one attempted send. Any error here means the
    /// stores are misbehaving and the caller releases the rest of the batch.
    async fn settle(
        &self,
        instance: &GatewayInstance,
        item: &QueueItem,
        result: Result<SendReceipt, SendError>,
    ) -> anyhow::Result<DispatchSummary> {
        let mut outcome = DispatchSummary::default();
        match result {
            Ok(receipt) => {
                self.queue_repo.mark_sent(item.id).await?;
                if let Some(list_id) = item.broadcast_list_id {
                    self.broadcast_repo.increment_sent(list_id).await?;
                }
                self.audit_repo
                    .append(AuditLogEntry::for_item(
                        item,
                        AuditEventKind::MessageSent,
                        receipt.message_id,
                    ))
                    .await?;
                tracing::info!(item = %item.id, instance = %instance.display_name, "message sent");
                outcome.sent += 1;
            }
            Err(SendError::Disconnected) => {
                // Terminal without burning retries against a dead credential.
                // The instance itself is left active; an operator decides
                // what to do with it.
                let reason = SendError::Disconnected.to_string();
                self.queue_repo.mark_failed(item.id, &reason).await?;
                if let Some(list_id) = item.broadcast_list_id {
                    self.broadcast_repo.increment_failed(list_id).await?;
                }
                self.audit_repo
                    .append(AuditLogEntry::for_item(
                        item,
                        AuditEventKind::InstanceDisconnected,
                        Some(reason),
                    ))
                    .await?;
                tracing::error!(
                    item = %item.id,
                    instance = %instance.display_name,
                    "instance disconnected, item failed without retry"
                );
                outcome.failed += 1;
            }
            Err(err) => {
                let reason = err.to_string();
                if item.exhausted(self.max_attempts) {
                    self.queue_repo.mark_failed(item.id, &reason).await?;
                    if let Some(list_id) = item.broadcast_list_id {
                        self.broadcast_repo.increment_failed(list_id).await?;
                    }
                    self.audit_repo
                        .append(AuditLogEntry::for_item(
                            item,
                            AuditEventKind::MessageFailed,
                            Some(reason.clone()),
                        ))
                        .await?;
                    outcome.failed += 1;
                } else {
                    self.queue_repo.release_for_retry(item.id, &reason).await?;
                    outcome.skipped += 1;
                }
                tracing::warn!(
                    item = %item.id,
                    attempts = item.attempts,
                    error = %reason,
                    "send failed"
                );
            }
        }
        Ok(outcome)
    }
}
