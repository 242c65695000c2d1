//! Error types for the weather tile services.

use thiserror::Error;

/// Result type alias using TileError.
pub type TileResult<T> = Result<T, TileError>;

/// Primary error type for tile addressing, sampling and rendering.
///
/// `Clone` so a single render outcome can be handed to every request that
/// was coalesced onto it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TileError {
    // === Request Errors ===
    #[error("Invalid tile address {z}/{x}/{y}: {reason}")]
    InvalidTileAddress {
        z: u32,
        x: u32,
        y: u32,
        reason: String,
    },

    #[error("Unknown weather layer: {0}")]
    UnknownLayer(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // === Upstream Errors ===
    #[error("Weather upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    // === Rendering Errors ===
    #[error("Rendering failed: {0}")]
    RenderFailure(String),

    // === Storage Errors ===
    #[error("Cache error: {0}")]
    Cache(String),
}

impl TileError {
    pub fn invalid_address(z: u32, x: u32, y: u32, reason: impl Into<String>) -> Self {
        TileError::InvalidTileAddress {
            z,
            x,
            y,
            reason: reason.into(),
        }
    }

    /// Whether the failure was caused by the request itself rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TileError::InvalidTileAddress { .. }
                | TileError::UnknownLayer(_)
                | TileError::InvalidParameter { .. }
        )
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TileError::InvalidTileAddress { .. } | TileError::InvalidParameter { .. } => 400,

            TileError::UnknownLayer(_) => 404,

            TileError::UpstreamUnavailable(_) => 502,

            TileError::RenderFailure(_) | TileError::Cache(_) => 500,
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for TileError {
    fn from(err: std::io::Error) -> Self {
        TileError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for TileError {
    fn from(err: serde_json::Error) -> Self {
        TileError::RenderFailure(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(TileError::invalid_address(1, 5, 0, "x out of range").http_status_code(), 400);
        assert_eq!(TileError::UnknownLayer("radar".into()).http_status_code(), 404);
        assert_eq!(TileError::UpstreamUnavailable("503".into()).http_status_code(), 502);
        assert_eq!(TileError::RenderFailure("boom".into()).http_status_code(), 500);
    }

    #[test]
    fn test_client_errors() {
        assert!(TileError::invalid_address(0, 1, 0, "x").is_client_error());
        assert!(TileError::UnknownLayer("radar".into()).is_client_error());
        assert!(!TileError::RenderFailure("boom".into()).is_client_error());
        assert!(!TileError::UpstreamUnavailable("timeout".into()).is_client_error());
    }

    #[test]
    fn test_display_includes_address() {
        let err = TileError::invalid_address(3, 9, 2, "x must be < 8");
        assert_eq!(err.to_string(), "Invalid tile address 3/9/2: x must be < 8");
    }
}
