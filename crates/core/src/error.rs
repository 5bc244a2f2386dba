/// Result alias that carries the custom [`MoireError`] type.
pub type Result<T> = std::result::Result<T, MoireError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum MoireError {
    /// An operation was invoked on a buffer that has no sink of the required
    /// kind attached. This is a configuration error and is never retried.
    #[error("{operation}() has been called but no {sink} sink is attached")]
    MissingSink {
        operation: &'static str,
        sink: &'static str,
    },
    /// A line request was issued while a previous one is still waiting for
    /// its submit signal.
    #[error("a line request is already pending on this input field")]
    RequestPending,
    /// The input field was torn down before the pending request resolved.
    #[error("input field closed before a line was submitted")]
    InputClosed,
    /// Shared state guarded by a mutex was poisoned by a panicking holder.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
    /// Configuration values that cannot drive the terminal or animation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Free-form message for the binary and adapters.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration files that fail to parse.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl MoireError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn missing_display(operation: &'static str) -> Self {
        Self::MissingSink {
            operation,
            sink: "display",
        }
    }

    pub(crate) fn missing_input(operation: &'static str) -> Self {
        Self::MissingSink {
            operation,
            sink: "input",
        }
    }

    /// True for errors caused by a buffer lacking a sink.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingSink { .. } | Self::InvalidConfig(_))
    }
}

impl From<&str> for MoireError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for MoireError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
