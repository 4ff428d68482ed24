//! Coordinate reference system identifiers.
//!
//! Only identity is tracked here: the index never reprojects, it refuses
//! to answer queries in a different CRS.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SpatialError;

/// Authority code for WGS84 geographic coordinates.
pub const WGS84: &str = "EPSG:4326";

/// A normalized `AUTHORITY:CODE` identifier, e.g. `EPSG:4326`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs(String);

impl Crs {
    /// WGS84 longitude/latitude, the default for undeclared inputs.
    #[must_use]
    pub fn wgs84() -> Self {
        Self(WGS84.to_string())
    }

    /// Parses and normalizes a CRS identifier.
    ///
    /// Accepts `EPSG:4326`, `epsg:4326`, bare `4326`, and the common WGS84
    /// aliases (`WGS84`, `WGS 84`, `CRS84`, `OGC:CRS84`).
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidCrs`] for empty or malformed
    /// identifiers.
    pub fn parse(value: &str) -> Result<Self, SpatialError> {
        let normalized = value.trim().to_ascii_uppercase();
        let invalid = || SpatialError::InvalidCrs {
            value: value.to_string(),
        };

        match normalized.as_str() {
            "" => Err(invalid()),
            "WGS84" | "WGS 84" | "CRS84" | "OGC:CRS84" | "4326" => Ok(Self::wgs84()),
            code if code.chars().all(|c| c.is_ascii_digit()) => Ok(Self(format!("EPSG:{code}"))),
            other => {
                let (authority, code) = other.split_once(':').ok_or_else(invalid)?;
                let authority = authority.trim();
                let code = code.trim();
                if authority.is_empty() || code.is_empty() {
                    return Err(invalid());
                }
                Ok(Self(format!("{authority}:{code}")))
            }
        }
    }

    /// Whether this is WGS84 longitude/latitude in degrees.
    #[must_use]
    pub fn is_wgs84(&self) -> bool {
        self.0 == WGS84
    }

    /// Returns the normalized identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl FromStr for Crs {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Crs {
    type Error = SpatialError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.0
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wgs84_aliases_normalize() {
        for alias in ["EPSG:4326", "epsg:4326", " 4326 ", "WGS84", "wgs 84", "OGC:CRS84"] {
            assert_eq!(Crs::parse(alias).unwrap(), Crs::wgs84(), "alias {alias:?}");
        }
    }

    #[test]
    fn other_codes_keep_identity() {
        let crs = Crs::parse("epsg:3435").unwrap();
        assert_eq!(crs.as_str(), "EPSG:3435");
        assert_ne!(crs, Crs::wgs84());
        assert!(!crs.is_wgs84());
        assert!(Crs::parse("CRS84").unwrap().is_wgs84());
        assert_eq!(Crs::parse("26916").unwrap().as_str(), "EPSG:26916");
    }

    #[test]
    fn rejects_malformed_identifiers() {
        assert!(Crs::parse("").is_err());
        assert!(Crs::parse("mercator").is_err());
        assert!(Crs::parse("EPSG:").is_err());
    }
}
