/// Crate-wide result alias.
pub type SingalongResult<T> = Result<T, SingalongError>;

/// Errors surfaced by timeline loading, frame composition and streaming.
#[derive(thiserror::Error, Debug)]
pub enum SingalongError {
    /// Input or configuration rejected before any frame work starts.
    #[error("validation error: {0}")]
    Validation(String),

    /// Failure while composing a frame.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// The encoder sink rejected a frame or failed to finalize.
    #[error("sink error: {0}")]
    Sink(String),

    /// The stream was cancelled by the caller.
    #[error("stream cancelled")]
    Cancelled,

    /// A stream stopped before its last frame; the output is incomplete.
    #[error("stream aborted after {emitted} of {total} frames: {cause}")]
    Aborted {
        /// Frames delivered to the sink before the failure.
        emitted: u64,
        /// Frames the stream was asked to produce.
        total: u64,
        /// What stopped the stream.
        #[source]
        cause: Box<SingalongError>,
    },

    /// Wrapped I/O, decode and other foreign errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SingalongError {
    /// Build a [`SingalongError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SingalongError::Evaluation`].
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`SingalongError::Sink`].
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Frames emitted before an aborted stream stopped, if this is an abort.
    pub fn partial_frames(&self) -> Option<u64> {
        match self {
            Self::Aborted { emitted, .. } => Some(*emitted),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            SingalongError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            SingalongError::evaluation("x")
                .to_string()
                .contains("evaluation error:")
        );
        assert!(SingalongError::sink("x").to_string().contains("sink error:"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = SingalongError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn aborted_reports_partial_count_and_cause() {
        let err = SingalongError::Aborted {
            emitted: 7,
            total: 120,
            cause: Box::new(SingalongError::sink("pipe closed")),
        };
        assert_eq!(err.partial_frames(), Some(7));
        let msg = err.to_string();
        assert!(msg.contains("7 of 120"));
        assert!(msg.contains("pipe closed"));
        assert_eq!(SingalongError::Cancelled.partial_frames(), None);
    }
}
