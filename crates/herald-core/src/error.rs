use thiserror::Error;

#[derive(Debug, Error)]
/// Failure modes of an issue lookup.
pub enum LookupError {
    /// The tracker has no issue with this key. A normal outcome, not a fault.
    #[error("issue {key} not found")]
    NotFound { key: String },
    #[error("issue lookup transport error: {0:#}")]
    Transport(#[from] anyhow::Error),
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
