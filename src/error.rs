use thiserror::Error;

/// Errors surfaced by timer creation.
///
/// Lifecycle methods never error: calling a transition in a state where it
/// does not apply is silently ignored, and destroy is fire-and-forget.
#[derive(Debug, Error)]
pub enum TimerError {
    /// Timer creation was attempted outside the permitted execution
    /// context. Nothing is registered when this is returned.
    #[error("timer creation is not permitted in this execution context")]
    ContextDenied,

    /// The creation config was rejected before a timer was built.
    #[error("invalid timer configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The discovery channel failed to expose the shared endpoint.
    #[error("discovery channel failure: {0}")]
    Discovery(String),
}

impl TimerError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        TimerError::InvalidConfig {
            reason: reason.into(),
        }
    }
}
