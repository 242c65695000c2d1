//! Shared handler utilities: error responses and query parsing.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use tile_common::TileError;

/// A [`TileError`] rendered as a JSON error body with its mapped status.
#[derive(Debug)]
pub struct ApiError(pub TileError);

impl From<TileError> for ApiError {
    fn from(err: TileError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %self.0, status = status.as_u16(), "Request failed");
        } else {
            warn!(error = %self.0, status = status.as_u16(), "Rejected request");
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Parse a numeric path or query value, naming the parameter on failure.
pub fn parse_param<T: std::str::FromStr>(param: &str, raw: &str) -> Result<T, TileError> {
    raw.trim().parse().map_err(|_| TileError::InvalidParameter {
        param: param.to_string(),
        message: format!("cannot parse {:?}", raw),
    })
}
