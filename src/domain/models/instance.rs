use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One connected messaging-gateway credential. The set of active instances is
/// snapshotted at the start of an invocation and treated as immutable for its
/// duration, so round-robin assignment inside a batch stays reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayInstance {
    pub id: Uuid,
    pub base_url: String,
    pub auth_token: String,
    pub display_name: String,
    pub active: bool,
}
