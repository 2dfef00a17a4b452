use std::fmt;

use nycdata_model::Borough;
use serde::{Serialize, Serializer};

const MAX_BLOCK: u32 = 99_999;
const MAX_LOT: u32 = 9_999;

/// Borough-Block-Lot parcel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bbl {
    pub borough: Borough,
    pub block: u32,
    pub lot: u32,
}

impl Bbl {
    #[must_use]
    pub const fn new(borough: Borough, block: u32, lot: u32) -> Option<Self> {
        if block == 0 || block > MAX_BLOCK || lot > MAX_LOT {
            return None;
        }
        Some(Self { borough, block, lot })
    }

    /// Parses the ten-digit form, tolerating a trailing `.000..` from numeric
    /// text columns such as PLUTO's.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let digits = match trimmed.split_once('.') {
            Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole,
            Some(_) => return None,
            None => trimmed,
        };
        if digits.len() != 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let borough = Borough::from_id(digits[..1].parse().ok()?)?;
        let block = digits[1..6].parse().ok()?;
        let lot = digits[6..].parse().ok()?;
        Self::new(borough, block, lot)
    }

    /// Builds a BBL from separate borough, block, and lot columns.
    #[must_use]
    pub fn from_parts(borough: &str, block: &str, lot: &str) -> Option<Self> {
        let borough = Borough::from_code(borough)?;
        let block = block.trim().parse().ok()?;
        let lot = lot.trim().parse().ok()?;
        Self::new(borough, block, lot)
    }
}

impl fmt::Display for Bbl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:05}{:04}", self.borough.id(), self.block, self.lot)
    }
}

impl Serialize for Bbl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
