use std::sync::Arc;

use uuid::Uuid;

use crate::{
    application::services::{gateway::GatewayClient, instance_pool::InstancePool, pacing::Pacer},
    domain::{
        models::{PhoneValidationResult, ValidationSummary},
        repositories::{BroadcastListRepository, InstanceRepository},
        value_objects,
    },
};

/// Pre-send existence check for a broadcast list's raw numbers. Landlines are
/// ruled out by shape alone; everything else is asked of the gateway in
/// fixed-size batches with a pacing pause in between.
pub struct PhoneValidator {
    broadcast_repo: Arc<dyn BroadcastListRepository>,
    instance_repo: Arc<dyn InstanceRepository>,
    gateway: Arc<dyn GatewayClient>,
    pacer: Pacer,
    batch_size: usize,
}

impl PhoneValidator {
    pub fn new(
        broadcast_repo: Arc<dyn BroadcastListRepository>,
        instance_repo: Arc<dyn InstanceRepository>,
        gateway: Arc<dyn GatewayClient>,
        pacer: Pacer,
        batch_size: usize,
    ) -> Self {
        Self {
            broadcast_repo,
            instance_repo,
            gateway,
            pacer,
            batch_size,
        }
    }

    pub async fn run(
        &self,
        phones: Vec<String>,
        broadcast_list_id: Option<Uuid>,
    ) -> anyhow::Result<(Vec<PhoneValidationResult>, ValidationSummary)> {
        let pool = InstancePool::new(self.instance_repo.list_active().await?)?;

        let mut results = Vec::with_capacity(phones.len());
        for (batch_index, batch) in phones.chunks(self.batch_size.max(1)).enumerate() {
            if batch_index > 0 {
                self.pacer.pause().await;
            }
            for phone in batch {
                results.push(self.check_one(&pool, results.len(), phone).await);
            }
        }

        let summary = ValidationSummary::from_results(&results);
        if let Some(list_id) = broadcast_list_id {
            // Summary write-back is fire and forget: a storage hiccup must
            // not invalidate the results already computed.
            if let Err(err) = self
                .broadcast_repo
                .record_validation_summary(list_id, summary)
                .await
            {
                tracing::warn!(list = %list_id, error = %err, "validation summary not recorded");
            }
        }
        tracing::info!(
            total = summary.total,
            valid = summary.valid,
            landline = summary.landline,
            "phone validation finished"
        );
        Ok((results, summary))
    }

    async fn check_one(
        &self,
        pool: &InstancePool,
        index: usize,
        phone: &str,
    ) -> PhoneValidationResult {
        if value_objects::is_landline(phone) {
            return PhoneValidationResult::landline(phone.to_string());
        }
        let Some(canonical) = value_objects::to_canonical(phone) else {
            return PhoneValidationResult::invalid(
                phone.to_string(),
                "malformed phone number".to_string(),
            );
        };

        let instance = pool.select(index);
        match self.gateway.check_number(instance, &canonical).await {
            Ok(check) => PhoneValidationResult {
                phone: phone.to_string(),
                exists: check.exists,
                formatted_number: check.formatted_number,
                is_landline_heuristic: false,
                error: None,
            },
            // One bad lookup never aborts the batch.
            Err(err) => PhoneValidationResult::invalid(phone.to_string(), err.to_string()),
        }
    }
}
