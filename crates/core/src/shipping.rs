//! Flat-rate shipping table.
//!
//! Shipping is a pure function of the destination region: one rate for the
//! home state, one per regional group, and a fallback for everything else.
//! No I/O happens here so checkout totals are reproducible.

use serde::{Deserialize, Serialize};

use crate::{Money, RegionCode};

const SOUTHEAST: &[&str] = &["RJ", "MG", "ES"];
const SOUTH_CENTER_WEST: &[&str] = &["PR", "SC", "RS", "MS", "MT", "GO", "DF"];
const NORTH_NORTHEAST: &[&str] = &[
    "AC", "AL", "AM", "AP", "BA", "CE", "MA", "PA", "PB", "PE", "PI", "RN", "RO", "RR", "SE", "TO",
];

/// A group of regions sharing one flat rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingZone {
    /// São Paulo, where orders ship from.
    Local,
    Southeast,
    SouthCenterWest,
    NorthNortheast,
    /// Any code not listed above.
    Other,
}

impl ShippingZone {
    /// Classify a region code.
    #[must_use]
    pub fn for_region(region: &RegionCode) -> Self {
        let code = region.as_str();
        if code == "SP" {
            Self::Local
        } else if SOUTHEAST.contains(&code) {
            Self::Southeast
        } else if SOUTH_CENTER_WEST.contains(&code) {
            Self::SouthCenterWest
        } else if NORTH_NORTHEAST.contains(&code) {
            Self::NorthNortheast
        } else {
            Self::Other
        }
    }

    /// Flat fee for the zone.
    #[must_use]
    pub const fn fee(self) -> Money {
        match self {
            Self::Local => Money::from_cents(15_00),
            Self::Southeast => Money::from_cents(29_00),
            Self::SouthCenterWest => Money::from_cents(35_00),
            Self::NorthNortheast => Money::from_cents(45_00),
            Self::Other => Money::from_cents(39_00),
        }
    }
}

/// Shipping fee for a region.
///
/// ```
/// use streetlab_core::{Money, RegionCode, shipping_fee};
///
/// let sp = RegionCode::parse("sp").unwrap();
/// assert_eq!(shipping_fee(&sp), Money::from_cents(1500));
/// ```
#[must_use]
pub fn shipping_fee(region: &RegionCode) -> Money {
    ShippingZone::for_region(region).fee()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fee(code: &str) -> Money {
        shipping_fee(&RegionCode::parse(code).unwrap())
    }

    #[test]
    fn test_local_rate() {
        assert_eq!(fee("SP"), Money::from_cents(1500));
    }

    #[test]
    fn test_group_rates() {
        assert_eq!(fee("RJ"), Money::from_cents(2900));
        assert_eq!(fee("PR"), Money::from_cents(3500));
        assert_eq!(fee("BA"), Money::from_cents(4500));
    }

    #[test]
    fn test_unknown_region_falls_back() {
        assert_eq!(fee("XX"), Money::from_cents(3900));
    }

    #[test]
    fn test_input_is_normalized() {
        assert_eq!(fee("  sp "), fee("SP"));
        assert_eq!(fee("mg"), Money::from_cents(2900));
    }

    #[test]
    fn test_every_listed_region_has_a_group_rate() {
        for code in SOUTHEAST
            .iter()
            .chain(SOUTH_CENTER_WEST)
            .chain(NORTH_NORTHEAST)
        {
            let zone = ShippingZone::for_region(&RegionCode::parse(code).unwrap());
            assert_ne!(zone, ShippingZone::Other, "{code}");
            assert_ne!(zone, ShippingZone::Local, "{code}");
        }
    }
}
