//! Error types for the booking RPC services.

use thiserror::Error;

use crate::protocol::ServiceKind;

/// Main error type for transport, protocol and booking failures.
#[derive(Error, Debug)]
pub enum RpcError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The transport could not be established (peer unreachable, refused, bind failed).
    #[error("Connection failure for {address}: {source}")]
    ConnectionFailure {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Bytes on the wire did not decode to the expected message.
    #[error("Protocol violation: {kind}")]
    ProtocolViolation { kind: ProtocolErrorKind },

    /// A bounded wait expired.
    #[error("Timed out after {after_ms}ms while {operation}")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    /// One of the backend calls made while building a booking failed.
    #[error("Booking failed at {step} step: {source}")]
    BuildFailure {
        step: ServiceKind,
        #[source]
        source: Box<RpcError>,
    },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors on the encode side.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Protocol error kinds.
#[derive(Error, Debug)]
pub enum ProtocolErrorKind {
    #[error("Message too large: {size} bytes exceeds maximum of {max} bytes")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Invalid message format: {message}")]
    InvalidMessageFormat { message: String },

    #[error("Bad preamble: {message}")]
    BadPreamble { message: String },

    #[error("Unexpected variant: expected {expected}, got {actual}")]
    UnexpectedVariant {
        expected: ServiceKind,
        actual: ServiceKind,
    },

    #[error("Connection closed")]
    ConnectionClosed,
}

impl RpcError {
    /// Shorthand for a `ProtocolViolation` of the given kind.
    pub fn protocol(kind: ProtocolErrorKind) -> Self {
        RpcError::ProtocolViolation { kind }
    }

    /// Whether this error is (or wraps) a protocol violation.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            RpcError::ProtocolViolation { .. } => true,
            RpcError::BuildFailure { source, .. } => source.is_protocol_violation(),
            _ => false,
        }
    }

    /// The backend step a `BuildFailure` refers to.
    pub fn failed_step(&self) -> Option<ServiceKind> {
        match self {
            RpcError::BuildFailure { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Result type alias for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_failure_names_step() {
        let err = RpcError::BuildFailure {
            step: ServiceKind::Flight,
            source: Box::new(RpcError::Timeout {
                operation: "reading response",
                after_ms: 500,
            }),
        };

        assert_eq!(err.failed_step(), Some(ServiceKind::Flight));
        let msg = err.to_string();
        assert!(msg.contains("flight"), "message was: {}", msg);
        assert!(msg.contains("500ms"));
    }

    #[test]
    fn test_protocol_violation_seen_through_build_failure() {
        let err = RpcError::BuildFailure {
            step: ServiceKind::Hotel,
            source: Box::new(RpcError::protocol(ProtocolErrorKind::ConnectionClosed)),
        };
        assert!(err.is_protocol_violation());
        assert!(!RpcError::Config {
            message: "x".to_string()
        }
        .is_protocol_violation());
    }
}
