//! Progress values reported by the service

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// A completion percentage, or the "unknown" sentinel
///
/// On the wire this is a plain integer where anything above 100
/// (conventionally 101) means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Percentage {
    Known(u8),
    #[default]
    Unknown,
}

impl Percentage {
    pub const UNKNOWN_SENTINEL: u32 = 101;

    /// Build from a raw wire value; values above 100 are unknown
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match u8::try_from(raw) {
            Ok(value) if value <= 100 => Self::Known(value),
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn raw(self) -> u32 {
        match self {
            Self::Known(value) => u32::from(value),
            Self::Unknown => Self::UNKNOWN_SENTINEL,
        }
    }

    #[must_use]
    pub fn known(self) -> Option<u8> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown => None,
        }
    }

    #[must_use]
    pub fn is_known(self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(value) => write!(f, "{value}%"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.raw())
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::from_raw)
    }
}

/// One progress update for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub percentage: Percentage,
    pub subpercentage: Percentage,
    #[serde(with = "seconds")]
    pub elapsed: Duration,
    #[serde(with = "seconds")]
    pub remaining: Duration,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn new(percentage: Percentage, subpercentage: Percentage) -> Self {
        Self {
            percentage,
            subpercentage,
            elapsed: Duration::ZERO,
            remaining: Duration::ZERO,
        }
    }

    /// Whether the current item has a known completion fraction
    #[must_use]
    pub fn is_determinate(&self) -> bool {
        self.subpercentage.is_known()
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_from_raw() {
        assert_eq!(Percentage::from_raw(0), Percentage::Known(0));
        assert_eq!(Percentage::from_raw(100), Percentage::Known(100));
        assert_eq!(Percentage::from_raw(101), Percentage::Unknown);
        assert_eq!(Percentage::from_raw(u32::MAX), Percentage::Unknown);
        assert_eq!(Percentage::Unknown.raw(), 101);
    }

    #[test]
    fn test_percentage_display() {
        assert_eq!(Percentage::Known(42).to_string(), "42%");
        assert_eq!(Percentage::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_snapshot_wire_format() {
        let json = r#"{"percentage":50,"subpercentage":101,"elapsed":3,"remaining":0}"#;
        let snapshot: ProgressSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.percentage, Percentage::Known(50));
        assert!(!snapshot.is_determinate());
        assert_eq!(snapshot.elapsed, Duration::from_secs(3));
        assert_eq!(serde_json::to_string(&snapshot).unwrap(), json);
    }
}
