//! Garment size codes.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a size code is blank.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("size cannot be empty")]
pub struct EmptySize;

/// A normalized size code such as `P`, `M` or `G`.
///
/// Codes are trimmed and upper-cased so that `" m"` and `"M"` address the
/// same stock entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Size(String);

impl Size {
    /// The sizes the shop stocks, in display order (small, medium, large).
    pub const STANDARD: [&'static str; 3] = ["P", "M", "G"];

    /// Parse a size code.
    ///
    /// # Errors
    ///
    /// Returns [`EmptySize`] if the code is blank.
    pub fn parse(code: &str) -> Result<Self, EmptySize> {
        let code = code.trim();
        if code.is_empty() {
            return Err(EmptySize);
        }
        Ok(Self(code.to_uppercase()))
    }

    /// The standard sizes as values.
    #[must_use]
    pub fn standard() -> Vec<Self> {
        Self::STANDARD
            .iter()
            .map(|code| Self((*code).to_owned()))
            .collect()
    }

    /// Position in the standard display order; unknown sizes sort last.
    #[must_use]
    pub fn display_rank(&self) -> usize {
        Self::STANDARD
            .iter()
            .position(|code| *code == self.0)
            .unwrap_or(Self::STANDARD.len())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Size {
    type Error = EmptySize;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Size> for String {
    fn from(size: Size) -> Self {
        size.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Size {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Size {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Size {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
