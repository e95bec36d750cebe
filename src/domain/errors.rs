use thiserror::Error;

/// What went wrong while talking to a gateway instance for one message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("gateway instance disconnected")]
    Disconnected,
    #[error("rate limited by gateway")]
    RateLimited,
    #[error("gateway request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("gateway rejected request: {0}")]
    Gateway(String),
}

impl SendError {
    /// Transient errors consume a retry attempt and requeue the item;
    /// `Disconnected` and `RateLimited` each take a distinguished path.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SendError::Timeout | SendError::Network(_) | SendError::Gateway(_)
        )
    }
}

/// Preconditions that abort a whole invocation before anything is claimed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("no active gateway instances")]
    NoActiveInstances,
    #[error("no active follow-up templates")]
    NoActiveTemplates,
}
