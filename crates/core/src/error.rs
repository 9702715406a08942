//! Failure taxonomy for the conversation engine.

use uuid::Uuid;

type Source = Box<dyn std::error::Error + Send + Sync>;

/// Every way an engine operation can fail.
///
/// `CompletionFailed` is the one recoverable variant: the triggering
/// operation changed no state, so retrying the same call is safe. Everything
/// else is fatal for that operation only; already-persisted turns are never
/// affected.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Bad parameters for a start or store operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// An operation referenced a topic that does not exist.
    #[error("topic '{0}' not found")]
    NotFound(Uuid),
    /// An operation was issued in a status that does not permit it.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The external completion call failed.
    #[error("completion call failed: {source}")]
    CompletionFailed {
        #[source]
        source: Source,
    },
    /// The transcript store could not be read or written.
    #[error("transcript storage failure: {source}")]
    Storage {
        #[source]
        source: Source,
    },
}

impl EngineError {
    pub(crate) fn completion(source: impl Into<Source>) -> Self {
        EngineError::CompletionFailed {
            source: source.into(),
        }
    }

    pub(crate) fn storage(source: impl Into<Source>) -> Self {
        EngineError::Storage {
            source: source.into(),
        }
    }
}
