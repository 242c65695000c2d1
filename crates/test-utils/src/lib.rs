//! Shared test utilities for the weather tile workspace.
//!
//! - [`sources`]: deterministic `WeatherSampleSource` fakes
//! - [`upstream`]: an in-process mock of the WeatherAPI HTTP endpoint
//! - [`fixtures`]: upstream payloads and tiles with known geometry
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod sources;
pub mod upstream;

pub use sources::{ConstantSource, CountingSource, FailingSource, FnSource};
pub use upstream::MockUpstream;

/// Assert two floats differ by at most `tol`.
///
/// ```ignore
/// test_utils::assert_close!(b.north, 55.776_573, 1e-5);
/// ```
#[macro_export]
macro_rules! assert_close {
    ($actual:expr, $expected:expr, $tol:expr) => {{
        let (actual, expected, tol): (f64, f64, f64) = ($actual as f64, $expected as f64, $tol as f64);
        assert!(
            (actual - expected).abs() <= tol,
            "{} = {} is not within {} of {}",
            stringify!($actual),
            actual,
            tol,
            expected
        );
    }};
}

/// [`assert_close!`] on both halves of a `(lat, lon)` pair.
#[macro_export]
macro_rules! assert_latlon_close {
    ($actual:expr, $expected:expr, $tol:expr) => {{
        let (lat, lon): (f64, f64) = $actual;
        let (want_lat, want_lon): (f64, f64) = $expected;
        $crate::assert_close!(lat, want_lat, $tol);
        $crate::assert_close!(lon, want_lon, $tol);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    #[should_panic(expected = "is not within")]
    fn test_assert_close_reports_distance() {
        assert_close!(1.1, 1.0, 0.001);
    }
}
