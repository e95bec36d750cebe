pub mod audit;
pub mod broadcast;
pub mod followup;
pub mod instance;
pub mod phone;
pub mod queue;

pub use audit::{AuditEventKind, AuditLogEntry};
pub use broadcast::{BroadcastList, BroadcastStatus};
pub use followup::{Conversation, FollowupTemplate, NURTURE_STAGE};
pub use instance::GatewayInstance;
pub use phone::{PhoneValidationResult, ValidationSummary};
pub use queue::{QueueItem, QueueItemStatus};
