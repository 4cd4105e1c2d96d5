//! Error types for stream buffer operations.
//!
//! Every fallible operation in this crate returns [`StreamError`]. The variants
//! mirror the failure classes a producer or consumer can observe:
//!
//! - **Argument Errors**: malformed track descriptors or codec parameters
//! - **Lock Errors**: the buffer mutex could not be acquired (poisoned)
//! - **Header Errors**: the header generator rejected its input
//! - **Allocation Errors**: header or sequence storage could not be reserved
//! - **Lifecycle Errors**: queries against state that was never initialized
//! - **Config / Sink Errors**: YAML configuration and consumer sink failures
//!
//! An empty buffer is never an error: `pop` and `peek` return `Ok(None)`.
//!
//! ```rust
//! use mkvqueue::StreamError;
//!
//! let error = StreamError::lock_failed("push");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::collections::TryReserveError;
use thiserror::Error;

use crate::types::ClusterType;

/// Result type alias for stream buffer operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for stream buffer operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Failed to lock stream buffer during {operation}")]
    LockFailed { operation: &'static str },

    #[error("Header generation failed: {reason}")]
    HeaderGenerationFailed {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Cluster type {cluster_type:?} is not supported by the header generator")]
    UnsupportedClusterType { cluster_type: ClusterType },

    #[error("Unknown cluster type value {value}")]
    UnknownClusterType { value: u8 },

    #[error("Failed to reserve {requested} bytes for {context}")]
    ResourceExhausted {
        context: &'static str,
        requested: usize,
        #[source]
        source: Option<TryReserveError>,
    },

    #[error("{what} is not initialized")]
    NotInitialized { what: &'static str },

    #[error("Config error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Frame sink failed: {reason}")]
    Sink {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StreamError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// The buffer itself never retries; this is guidance for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::LockFailed { .. } => true,
            StreamError::ResourceExhausted { .. } => true,
            StreamError::Sink { .. } => true,
            StreamError::InvalidArgument { .. } => false,
            StreamError::HeaderGenerationFailed { .. } => false,
            StreamError::UnsupportedClusterType { .. } => false,
            StreamError::UnknownClusterType { .. } => false,
            StreamError::NotInitialized { .. } => false,
            StreamError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StreamError::InvalidArgument { .. } => vec![
                "Check the track descriptor has a codec id and non-zero dimensions",
                "Verify audio frequency and channel count are set",
                "Validate codec parameters before building codec private data",
            ],
            StreamError::LockFailed { .. } => vec![
                "A producer or consumer panicked while holding the buffer lock",
                "Drain remaining frames and recreate the stream buffer",
            ],
            StreamError::HeaderGenerationFailed { .. } => vec![
                "Check track names and codec private data sizes",
                "Verify the header generator supports the track configuration",
            ],
            StreamError::UnsupportedClusterType { .. } | StreamError::UnknownClusterType { .. } => {
                vec![
                    "Use a cluster type supported by the header generator",
                    "Check the cluster type value read from the producer",
                ]
            }
            StreamError::ResourceExhausted { .. } => vec![
                "Drain pending frames to release header memory",
                "Reduce producer rate or payload sizes",
                "Retry the push once memory is available",
            ],
            StreamError::NotInitialized { .. } => vec![
                "Create the stream buffer successfully before querying it",
                "Check the header generator returned a non-empty header",
            ],
            StreamError::Config { .. } => vec![
                "Check the YAML document structure",
                "Verify codec private data is valid hex",
            ],
            StreamError::Sink { .. } => vec![
                "Check the downstream transport is still connected",
                "Run the pump again once the sink recovers; the failed frame is sent first",
            ],
        }
    }

    /// Helper constructor for invalid argument errors.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        StreamError::InvalidArgument { reason: reason.into() }
    }

    /// Helper constructor for lock failures.
    pub fn lock_failed(operation: &'static str) -> Self {
        StreamError::LockFailed { operation }
    }

    /// Helper constructor for header generation failures.
    pub fn header_generation_failed(reason: impl Into<String>) -> Self {
        StreamError::HeaderGenerationFailed { reason: reason.into(), source: None }
    }

    /// Helper constructor for allocation failures.
    pub fn resource_exhausted(
        context: &'static str,
        requested: usize,
        source: TryReserveError,
    ) -> Self {
        StreamError::ResourceExhausted { context, requested, source: Some(source) }
    }

    /// Helper constructor for sink failures with a source error.
    pub fn sink_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StreamError::Sink { reason: reason.into(), source: Some(source) }
    }
}

impl From<serde_yaml_ng::Error> for StreamError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        StreamError::Config { context: "YAML stream config".to_string(), details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_carry_their_context(
                reason in ".*",
                requested in 0usize..0x10000usize,
                value in 2u8..=u8::MAX
            ) {
                let invalid = StreamError::invalid_argument(reason.clone());
                prop_assert!(invalid.to_string().contains(&reason));

                let generation = StreamError::header_generation_failed(reason.clone());
                prop_assert!(generation.to_string().contains(&reason));

                let exhausted = StreamError::ResourceExhausted {
                    context: "frame header",
                    requested,
                    source: None,
                };
                prop_assert!(exhausted.to_string().contains(&requested.to_string()));

                let unknown = StreamError::UnknownClusterType { value };
                prop_assert!(unknown.to_string().contains(&value.to_string()));
            }

            #[test]
            fn sink_errors_preserve_source_chain(base_message in ".*") {
                let source: Box<dyn std::error::Error + Send + Sync> =
                    Box::new(std::io::Error::other(base_message.clone()));
                let error = StreamError::sink_failed_with_source("send_frame", source);

                let chained = std::error::Error::source(&error).map(|s| s.to_string());
                prop_assert_eq!(chained, Some(base_message));
            }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<StreamError>();

        let error = StreamError::lock_failed("pop");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(StreamError::lock_failed("push").is_retryable());
        assert!(!StreamError::invalid_argument("no video").is_retryable());
        assert!(
            !StreamError::UnsupportedClusterType { cluster_type: ClusterType::Cluster }
                .is_retryable()
        );
        assert!(!StreamError::NotInitialized { what: "top-level header" }.is_retryable());

        let mut probe: Vec<u8> = Vec::new();
        let reserve_err = probe.try_reserve(usize::MAX).unwrap_err();
        let exhausted = StreamError::resource_exhausted("frame header", usize::MAX, reserve_err);
        assert!(exhausted.is_retryable());
        assert!(std::error::Error::source(&exhausted).is_some());
    }

    #[test]
    fn recovery_suggestions_are_descriptive() {
        let errors = [
            StreamError::lock_failed("push"),
            StreamError::invalid_argument("x"),
            StreamError::header_generation_failed("x"),
            StreamError::NotInitialized { what: "top-level header" },
            StreamError::Config { context: "c".into(), details: "d".into() },
        ];

        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            for suggestion in suggestions {
                assert!(suggestion.len() > 5);
            }
        }
    }

    #[test]
    fn yaml_errors_convert_to_config() {
        let err = serde_yaml_ng::from_str::<u32>("not: [a number").unwrap_err();
        let converted: StreamError = err.into();
        assert!(matches!(converted, StreamError::Config { .. }));
    }
}
