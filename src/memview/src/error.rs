//! Fetch outcomes shared by the cache and the renderers.

/// Error type for memory fetches.
///
/// Cloneable because a single page result is shared by every consumer that
/// asked for that page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The source cannot supply this range (e.g. outside the capture)
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Memory fetch failed: {0}")]
    Unexpected(String),

    /// The owner of a private continuation aborted it, or the runtime
    /// dropped the work before it produced a value
    #[error("Memory fetch cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::DataUnavailable(reason.into())
    }

    pub fn unexpected(cause: impl std::fmt::Display) -> Self {
        Self::Unexpected(cause.to_string())
    }

    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, Self::DataUnavailable(_))
    }

    /// Whether a later request for the same range should fetch again
    pub fn is_retryable(&self) -> bool {
        !self.is_data_unavailable()
    }
}

/// Result type for memory fetches
pub type FetchResult<T> = Result<T, FetchError>;

/// Non-blocking view of a fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Pending,
    Ready(T),
    Unavailable(String),
    Failed(FetchError),
}

impl<T> FetchState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub(crate) fn from_result(result: Option<FetchResult<T>>) -> Self {
        match result {
            None => Self::Pending,
            Some(Ok(value)) => Self::Ready(value),
            Some(Err(FetchError::DataUnavailable(reason))) => Self::Unavailable(reason),
            Some(Err(err)) => Self::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(FetchError::unavailable("gone").is_data_unavailable());
        assert!(!FetchError::unavailable("gone").is_retryable());
        assert!(FetchError::unexpected("rpc reset").is_retryable());
        assert!(FetchError::Cancelled.is_retryable());
    }

    #[test]
    fn test_state_from_result() {
        assert!(FetchState::<u8>::from_result(None).is_pending());
        assert_eq!(FetchState::from_result(Some(Ok(7u8))), FetchState::Ready(7));
        assert_eq!(
            FetchState::<u8>::from_result(Some(Err(FetchError::unavailable("x")))),
            FetchState::Unavailable("x".to_string())
        );
        assert_eq!(
            FetchState::<u8>::from_result(Some(Err(FetchError::Cancelled))),
            FetchState::Failed(FetchError::Cancelled)
        );
    }
}
