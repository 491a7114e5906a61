use thiserror::Error;

#[derive(Debug, Error)]
pub enum QpCheckError {
    #[error("Invalid instance: {0}")]
    InvalidInstance(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Solver failure ({solver}): {reason}")]
    SolverFailure { solver: String, reason: String },

    #[error("Solver timed out ({solver}) after {millis}ms")]
    Timeout { solver: String, millis: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl QpCheckError {
    pub fn solver_failure(solver: impl Into<String>, reason: impl Into<String>) -> Self {
        QpCheckError::SolverFailure {
            solver: solver.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for QpCheckError {
    fn from(err: serde_json::Error) -> Self {
        QpCheckError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for QpCheckError {
    fn from(err: std::io::Error) -> Self {
        QpCheckError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QpCheckError>;
