//! Geographic bounds of a tile or query region.

use serde::{Deserialize, Serialize};

use crate::TileError;

/// A geographic bounding box in WGS84 degrees.
///
/// For tile bounds `north > south` always holds. `east > west` is not
/// guaranteed for regions that cross the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Parse a query-string bounds parameter: "west,south,east,north"
    pub fn from_bbox_param(s: &str) -> Result<Self, BoundsParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BoundsParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| BoundsParseError::InvalidNumber(part.to_string()))?;
            if !value.is_finite() {
                return Err(BoundsParseError::InvalidNumber(part.to_string()));
            }
        }
        let [west, south, east, north] = values;

        if south >= north || west >= east {
            return Err(BoundsParseError::Empty(s.to_string()));
        }
        if south < -90.0 || north > 90.0 {
            return Err(BoundsParseError::OutOfRange(s.to_string()));
        }

        Ok(Self::new(north, south, east, west))
    }

    /// Longitude extent in degrees.
    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    /// Latitude extent in degrees.
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// Geographic center as (lat, lon).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.north + self.south) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Point at fractional position inside the box, measured from the
    /// north-west corner. `row_frac` runs north→south, `col_frac` west→east.
    pub fn interpolate(&self, row_frac: f64, col_frac: f64) -> (f64, f64) {
        (
            self.north + (self.south - self.north) * row_frac,
            self.west + (self.east - self.west) * col_frac,
        )
    }

    /// Check if a point is contained within these bounds.
    pub fn contains_point(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BoundsParseError {
    #[error("Invalid bounds format: {0}. Expected 'west,south,east,north'")]
    InvalidFormat(String),

    #[error("Invalid number in bounds: {0}")]
    InvalidNumber(String),

    #[error("Bounds enclose no area: {0}")]
    Empty(String),

    #[error("Latitude outside [-90, 90] in bounds: {0}")]
    OutOfRange(String),
}

impl From<BoundsParseError> for TileError {
    fn from(err: BoundsParseError) -> Self {
        TileError::InvalidParameter {
            param: "bounds".to_string(),
            message: err.to_string(),
        }
    }
}
