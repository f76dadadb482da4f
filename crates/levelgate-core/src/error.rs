use levelgate_types::ParseLevelError;

/// Failure reported by a validity gate while evaluating
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("validity gate failed: {message}")]
pub struct GateError {
    pub message: String,
}

impl GateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the override engine and its administrative API
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OverrideError {
    /// A custom gate failed; never downgraded to a neutral verdict
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("no such filter: '{0}'")]
    FilterNotFound(String),

    #[error("filter has no name")]
    UnnamedFilter,

    #[error(transparent)]
    InvalidLevel(#[from] ParseLevelError),
}
