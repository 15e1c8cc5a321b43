//! Error types for the Prism RHI
//!
//! Recoverable errors only exist on initialization paths (instance creation,
//! device selection, surface creation) and on backend creation calls, which
//! the core turns into fatal assertions with the native error code in the
//! diagnostic.

use std::fmt;

/// Result type for RHI operations
pub type Result<T> = std::result::Result<T, Error>;

/// RHI errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error carrying the native error code (VkResult, HRESULT, ...)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, shader, etc.)
    InvalidResource(String),

    /// Initialization failed (instance, physical device, surface)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
