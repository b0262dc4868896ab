//! Canonical pricing regions.
//!
//! Price tables in the backing store are keyed by one of five fixed codes.
//! Vendors carry a free-form region label instead; mapping a label onto a
//! [`PricingRegion`] is the job of the quoting crate's region normalizer.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string is not one of the canonical region codes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown pricing region code: {0}")]
pub struct RegionParseError(pub String);

/// A canonical pricing region.
///
/// Rio Grande do Sul is the only state with two price regimes, depending on
/// whether the customer holds a state tax registration (inscrição estadual).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PricingRegion {
    #[serde(rename = "norte-nordeste")]
    NorteNordeste,
    #[serde(rename = "sul-sudeste")]
    SulSudeste,
    #[serde(rename = "centro-oeste")]
    CentroOeste,
    #[serde(rename = "rs-com-ie")]
    RsComIe,
    #[serde(rename = "rs-sem-ie")]
    RsSemIe,
}

impl PricingRegion {
    /// Every region, in price-table order.
    pub const ALL: [Self; 5] = [
        Self::NorteNordeste,
        Self::SulSudeste,
        Self::CentroOeste,
        Self::RsComIe,
        Self::RsSemIe,
    ];

    /// Region used when a label cannot be mapped.
    pub const FALLBACK: Self = Self::SulSudeste;

    /// The code stored in the price table.
    #[must_use]
    pub const fn as_code(self) -> &'static str {
        match self {
            Self::NorteNordeste => "norte-nordeste",
            Self::SulSudeste => "sul-sudeste",
            Self::CentroOeste => "centro-oeste",
            Self::RsComIe => "rs-com-ie",
            Self::RsSemIe => "rs-sem-ie",
        }
    }

    /// Human-readable label for proposals.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NorteNordeste => "Norte/Nordeste",
            Self::SulSudeste => "Sul/Sudeste",
            Self::CentroOeste => "Centro-Oeste",
            Self::RsComIe => "RS com Inscrição Estadual",
            Self::RsSemIe => "RS sem Inscrição Estadual",
        }
    }

    /// Whether this region belongs to the state with two tax regimes.
    #[must_use]
    pub const fn is_dual_tax(self) -> bool {
        matches!(self, Self::RsComIe | Self::RsSemIe)
    }
}

impl fmt::Display for PricingRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for PricingRegion {
    type Err = RegionParseError;

    /// Parses an exact canonical code. Free-form labels go through the
    /// normalizer instead.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|region| region.as_code() == s)
            .ok_or_else(|| RegionParseError(s.to_owned()))
    }
}
