//! Weather layer kinds served as raster tiles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TileError;

/// One renderable weather layer.
///
/// Every layer is sampled on the same grid; they differ only in which
/// channel of a sample they read and how that value is colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Temperature,
    Wind,
    Precipitation,
    Pressure,
    Humidity,
    Clouds,
}

impl LayerKind {
    /// All layers, in the order they are advertised by the service.
    pub const ALL: [LayerKind; 6] = [
        LayerKind::Temperature,
        LayerKind::Wind,
        LayerKind::Precipitation,
        LayerKind::Pressure,
        LayerKind::Humidity,
        LayerKind::Clouds,
    ];

    /// Lowercase identifier used in URLs, cache keys and file names.
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Temperature => "temperature",
            LayerKind::Wind => "wind",
            LayerKind::Precipitation => "precipitation",
            LayerKind::Pressure => "pressure",
            LayerKind::Humidity => "humidity",
            LayerKind::Clouds => "clouds",
        }
    }

    /// Unit of the value the layer's color scale is defined over.
    pub fn unit(&self) -> &'static str {
        match self {
            LayerKind::Temperature => "°C",
            LayerKind::Wind => "m/s",
            LayerKind::Precipitation => "mm",
            LayerKind::Pressure => "mb",
            LayerKind::Humidity | LayerKind::Clouds => "%",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayerKind {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerKind::ALL
            .iter()
            .copied()
            .find(|layer| layer.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| TileError::UnknownLayer(s.to_string()))
    }
}
