//! Weather sample sources.
//!
//! A [`WeatherSampleSource`] answers point queries: given a latitude and
//! longitude it returns the current conditions there. The tile renderer only
//! depends on the trait, so the live [`WeatherApiClient`] can be swapped for
//! a deterministic fake in tests. [`ForecastSource`] does the same for
//! multi-day forecasts.

pub mod cached;
pub mod forecast;
pub mod sample;
pub mod source;
pub mod weatherapi;

pub use cached::CachingSampleSource;
pub use forecast::{
    ForecastDay, ForecastSource, SharedForecastSource, DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS,
};
pub use sample::WeatherSample;
pub use source::{SharedSampleSource, WeatherSampleSource};
pub use weatherapi::{WeatherApiClient, WeatherApiConfig};
