use crate::domain::{errors::EngineError, models::GatewayInstance};

/// Immutable snapshot of the active gateway credentials for one invocation.
/// Assignment is plain round robin over the batch index, so for M items and
/// N instances every instance receives floor(M/N) or ceil(M/N) of them.
#[derive(Debug, Clone)]
pub struct InstancePool {
    instances: Vec<GatewayInstance>,
}

impl InstancePool {
    pub fn new(instances: Vec<GatewayInstance>) -> Result<Self, EngineError> {
        let instances: Vec<GatewayInstance> =
            instances.into_iter().filter(|i| i.active).collect();
        if instances.is_empty() {
            return Err(EngineError::NoActiveInstances);
        }
        Ok(Self { instances })
    }

    pub fn select(&self, batch_index: usize) -> &GatewayInstance {
        &self.instances[batch_index % self.instances.len()]
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
