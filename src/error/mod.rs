//! Error types for the booking RPC services.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
