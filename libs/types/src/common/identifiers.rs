//! # Series Identifiers
//!
//! A candle series is addressed by the pair (instrument, resolution). The same
//! key identifies the series across the data provider, the candle store, the
//! signal cache and the live history window.

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Candle resolution (bar duration)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum Resolution {
    #[cfg_attr(feature = "serialization", serde(rename = "1m"))]
    M1,
    #[cfg_attr(feature = "serialization", serde(rename = "5m"))]
    M5,
    #[cfg_attr(feature = "serialization", serde(rename = "15m"))]
    M15,
    #[cfg_attr(feature = "serialization", serde(rename = "30m"))]
    M30,
    #[cfg_attr(feature = "serialization", serde(rename = "1h"))]
    H1,
    #[cfg_attr(feature = "serialization", serde(rename = "4h"))]
    H4,
    #[cfg_attr(feature = "serialization", serde(rename = "1d"))]
    D1,
}

impl Resolution {
    /// All supported resolutions, finest first
    pub const ALL: [Resolution; 7] = [
        Resolution::M1,
        Resolution::M5,
        Resolution::M15,
        Resolution::M30,
        Resolution::H1,
        Resolution::H4,
        Resolution::D1,
    ];

    /// Bar duration in milliseconds
    pub fn as_millis(&self) -> i64 {
        const MINUTE: i64 = 60_000;
        match self {
            Resolution::M1 => MINUTE,
            Resolution::M5 => 5 * MINUTE,
            Resolution::M15 => 15 * MINUTE,
            Resolution::M30 => 30 * MINUTE,
            Resolution::H1 => 60 * MINUTE,
            Resolution::H4 => 240 * MINUTE,
            Resolution::D1 => 1_440 * MINUTE,
        }
    }

    /// Short label used in configuration files and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::M1 => "1m",
            Resolution::M5 => "5m",
            Resolution::M15 => "15m",
            Resolution::M30 => "30m",
            Resolution::H1 => "1h",
            Resolution::H4 => "4h",
            Resolution::D1 => "1d",
        }
    }

    /// Intraday resolutions below fifteen minutes
    pub fn is_scalping(&self) -> bool {
        matches!(self, Resolution::M1 | Resolution::M5)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown resolution '{0}' (expected one of 1m, 5m, 15m, 30m, 1h, 4h, 1d)")]
pub struct ParseResolutionError(pub String);

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resolution::ALL
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseResolutionError(s.to_string()))
    }
}

/// Identifies one candle series: (instrument, resolution)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct SeriesKey {
    pub instrument: String,
    pub resolution: Resolution,
}

impl SeriesKey {
    pub fn new(instrument: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            instrument: instrument.into(),
            resolution,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.instrument, self.resolution)
    }
}
