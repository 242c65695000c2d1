//! Deterministic [`WeatherSampleSource`] fakes.
//!
//! Real renders hit the network once per grid point; these stand-ins answer
//! instantly (or after a configured delay) with known values so color and
//! cache behavior can be asserted exactly.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tile_common::{TileError, TileResult};
use weather_source::{WeatherSample, WeatherSampleSource};

/// Returns the same conditions everywhere.
#[derive(Debug, Clone)]
pub struct ConstantSource {
    template: WeatherSample,
}

impl ConstantSource {
    pub fn new(template: WeatherSample) -> Self {
        Self { template }
    }

    /// Neutral conditions except for the given temperature.
    pub fn temperature(temp_c: f64) -> Self {
        let mut template = WeatherSample::neutral(0.0, 0.0);
        template.temp_c = temp_c;
        Self::new(template)
    }
}

#[async_trait]
impl WeatherSampleSource for ConstantSource {
    async fn sample(&self, lat: f64, lon: f64) -> TileResult<WeatherSample> {
        let mut sample = self.template.clone();
        sample.lat = lat;
        sample.lon = lon;
        Ok(sample)
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// Every sample fails as if the upstream were down.
#[derive(Debug, Clone, Default)]
pub struct FailingSource;

#[async_trait]
impl WeatherSampleSource for FailingSource {
    async fn sample(&self, _lat: f64, _lon: f64) -> TileResult<WeatherSample> {
        Err(TileError::UpstreamUnavailable("upstream offline".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Computes each sample from its coordinates.
pub struct FnSource<F> {
    f: F,
}

impl<F> FnSource<F>
where
    F: Fn(f64, f64) -> TileResult<WeatherSample> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> WeatherSampleSource for FnSource<F>
where
    F: Fn(f64, f64) -> TileResult<WeatherSample> + Send + Sync,
{
    async fn sample(&self, lat: f64, lon: f64) -> TileResult<WeatherSample> {
        (self.f)(lat, lon)
    }

    fn name(&self) -> &str {
        "fn"
    }
}

/// Wraps a source, counting calls and optionally delaying each one.
///
/// Can be switched into failing mode at runtime to simulate an outage that
/// starts after the cache has been warmed.
pub struct CountingSource<S> {
    inner: S,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    failing: AtomicBool,
}

impl<S: WeatherSampleSource> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self::with_delay(inner, Duration::ZERO)
    }

    pub fn with_delay(inner: S, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Total `sample` calls so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: WeatherSampleSource> WeatherSampleSource for CountingSource<S> {
    async fn sample(&self, lat: f64, lon: f64) -> TileResult<WeatherSample> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = if self.failing.load(Ordering::SeqCst) {
            Err(TileError::UpstreamUnavailable("simulated outage".to_string()))
        } else {
            self.inner.sample(lat, lon).await
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
