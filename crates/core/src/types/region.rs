//! Region codes used to pick a shipping rate.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a region code is blank.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("region cannot be empty")]
pub struct EmptyRegion;

/// A normalized administrative-division code (e.g. `SP`, `RJ`).
///
/// ```
/// use streetlab_core::RegionCode;
///
/// assert_eq!(RegionCode::parse(" sp\n").unwrap().as_str(), "SP");
/// assert!(RegionCode::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionCode(String);

impl RegionCode {
    /// Parse a region code, trimming and upper-casing it.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyRegion`] if the code is blank.
    pub fn parse(code: &str) -> Result<Self, EmptyRegion> {
        let code = code.trim();
        if code.is_empty() {
            return Err(EmptyRegion);
        }
        Ok(Self(code.to_uppercase()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RegionCode {
    type Error = EmptyRegion;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegionCode> for String {
    fn from(region: RegionCode) -> Self {
        region.0
    }
}
