//! The point-sampling capability the renderer depends on.

use async_trait::async_trait;
use std::sync::Arc;

use tile_common::TileResult;

use crate::WeatherSample;

/// Anything that can answer "what are the conditions at (lat, lon)?".
///
/// Implementations must bound their own latency; a failed or timed-out
/// query is reported as `TileError::UpstreamUnavailable`.
#[async_trait]
pub trait WeatherSampleSource: Send + Sync {
    /// Fetch current conditions at a point.
    async fn sample(&self, lat: f64, lon: f64) -> TileResult<WeatherSample>;

    /// Short identifier for logs and metrics.
    fn name(&self) -> &str;
}

/// Type-erased source shared between the renderer and request handlers.
pub type SharedSampleSource = Arc<dyn WeatherSampleSource>;

#[async_trait]
impl<S: WeatherSampleSource + ?Sized> WeatherSampleSource for Arc<S> {
    async fn sample(&self, lat: f64, lon: f64) -> TileResult<WeatherSample> {
        (**self).sample(lat, lon).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
