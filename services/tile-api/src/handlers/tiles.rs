//! Slippy-map PNG tile endpoint.

use axum::{
    extract::{Extension, Path},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

use tile_common::{LayerKind, TileError};

use super::common::{parse_param, ApiResult};
use crate::state::AppState;

pub const TILE_CACHE_HEADER: HeaderName = HeaderName::from_static("x-tile-cache");

/// GET /api/weather/:layer/:z/:x/:y.png
#[instrument(skip(state))]
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((layer, z, x, y_png)): Path<(String, String, String, String)>,
) -> ApiResult<Response> {
    let layer: LayerKind = layer.parse()?;
    let z: u32 = parse_param("z", &z)?;
    let x: u32 = parse_param("x", &x)?;
    let y = y_png
        .strip_suffix(".png")
        .ok_or_else(|| TileError::InvalidParameter {
            param: "y".to_string(),
            message: "tile path must end in .png".to_string(),
        })?;
    let y: u32 = parse_param("y", y)?;

    let tile = state.pipeline.render_tile(layer, z, x, y).await?;
    let png = tile.png()?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CACHE_CONTROL,
                tile.cache_control(state.config.cache.ttl_secs),
            ),
            (TILE_CACHE_HEADER, tile.status.header_value().to_string()),
        ],
        png,
    )
        .into_response())
}
