//! Region normalization.
//!
//! Vendor records store a free-form region label ("Rio Grande do Sul",
//! "Nordeste", "sul/sudeste", ...). Price tables only accept the five
//! canonical [`PricingRegion`] codes, so every lookup goes through
//! [`normalize_region`] first.

use guindaste_core::PricingRegion;

const RS_LABELS: &[&str] = &[
    "rio grande do sul",
    "rs",
    "rs-com-ie",
    "rs-sem-ie",
    "rs com ie",
    "rs sem ie",
    "rs com inscrição estadual",
    "rs sem inscrição estadual",
    "rs com inscricao estadual",
    "rs sem inscricao estadual",
];

const NORTE_NORDESTE_LABELS: &[&str] = &[
    "norte",
    "nordeste",
    "norte-nordeste",
    "norte/nordeste",
    "norte e nordeste",
    "norte nordeste",
];

const SUL_SUDESTE_LABELS: &[&str] = &[
    "sul",
    "sudeste",
    "sul-sudeste",
    "sul/sudeste",
    "sul e sudeste",
    "sul sudeste",
];

const CENTRO_OESTE_LABELS: &[&str] = &["centro-oeste", "centro oeste"];

/// Map a vendor's region label to a canonical pricing region.
///
/// Matching is case-insensitive and ignores surrounding and repeated
/// whitespace. The tax-registration flag only matters for Rio Grande do
/// Sul. Unrecognized labels fall back to [`PricingRegion::FALLBACK`]; this is
/// not an error.
///
/// ```
/// use guindaste_core::PricingRegion;
/// use guindaste_quoting::region::normalize_region;
///
/// assert_eq!(normalize_region("Rio Grande do Sul", false), PricingRegion::RsSemIe);
/// assert_eq!(normalize_region("  NORDESTE ", true), PricingRegion::NorteNordeste);
/// ```
#[must_use]
pub fn normalize_region(raw_label: &str, has_tax_registration: bool) -> PricingRegion {
    let label = canonical_label(raw_label);
    let label = label.as_str();

    if RS_LABELS.contains(&label) {
        if has_tax_registration {
            PricingRegion::RsComIe
        } else {
            PricingRegion::RsSemIe
        }
    } else if NORTE_NORDESTE_LABELS.contains(&label) {
        PricingRegion::NorteNordeste
    } else if SUL_SUDESTE_LABELS.contains(&label) {
        PricingRegion::SulSudeste
    } else if CENTRO_OESTE_LABELS.contains(&label) {
        PricingRegion::CentroOeste
    } else {
        PricingRegion::FALLBACK
    }
}

/// Map a two-letter Brazilian state code to its pricing region.
///
/// `RS` always yields [`PricingRegion::RsComIe`]; callers that need the
/// unregistered variant must go through [`normalize_region`]. Unknown codes
/// fall back like unknown labels do.
#[must_use]
pub fn region_for_state(uf: &str) -> PricingRegion {
    match uf.trim().to_ascii_uppercase().as_str() {
        "RS" => PricingRegion::RsComIe,
        "AC" | "AP" | "AM" | "PA" | "RO" | "RR" | "TO" | "AL" | "BA" | "CE" | "MA" | "PB"
        | "PE" | "PI" | "RN" | "SE" => PricingRegion::NorteNordeste,
        "PR" | "SC" | "SP" | "RJ" | "MG" | "ES" => PricingRegion::SulSudeste,
        "DF" | "GO" | "MT" | "MS" => PricingRegion::CentroOeste,
        _ => PricingRegion::FALLBACK,
    }
}

/// Whether a label names the state with two tax regimes.
#[must_use]
pub fn is_dual_tax_label(raw_label: &str) -> bool {
    normalize_region(raw_label, true).is_dual_tax()
}

fn canonical_label(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace(" / ", "/")
        .replace(" - ", "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rio_grande_do_sul_follows_registration_flag() {
        assert_eq!(normalize_region("Rio Grande do Sul", true), PricingRegion::RsComIe);
        assert_eq!(normalize_region("Rio Grande do Sul", false), PricingRegion::RsSemIe);
        assert_eq!(normalize_region("RS", false), PricingRegion::RsSemIe);
        assert_eq!(normalize_region("rs-com-ie", false), PricingRegion::RsSemIe);
        assert_eq!(
            normalize_region("RS sem Inscrição Estadual", true),
            PricingRegion::RsComIe
        );
    }

    #[test]
    fn test_northern_labels() {
        for label in ["Norte", "nordeste", "Norte-Nordeste", "NORTE/NORDESTE"] {
            assert_eq!(normalize_region(label, true), PricingRegion::NorteNordeste, "{label}");
        }
    }

    #[test]
    fn test_southern_labels() {
        for label in ["Sul", "Sudeste", "sul-sudeste", "Sul / Sudeste", "sul e sudeste"] {
            let expected = PricingRegion::SulSudeste;
            assert_eq!(normalize_region(label, false), expected, "{label}");
        }
    }

    #[test]
    fn test_centro_oeste_forms() {
        assert_eq!(normalize_region("Centro-Oeste", true), PricingRegion::CentroOeste);
        assert_eq!(normalize_region("centro   oeste", true), PricingRegion::CentroOeste);
    }

    #[test]
    fn test_unknown_falls_back_to_sul_sudeste() {
        assert_eq!(normalize_region("unknown-garbage", true), PricingRegion::SulSudeste);
        assert_eq!(normalize_region("", false), PricingRegion::SulSudeste);
    }

    #[test]
    fn test_flag_ignored_outside_rs() {
        assert_eq!(normalize_region("Norte", false), PricingRegion::NorteNordeste);
        assert_eq!(normalize_region("Norte", true), PricingRegion::NorteNordeste);
    }

    #[test]
    fn test_region_for_state() {
        assert_eq!(region_for_state("rs"), PricingRegion::RsComIe);
        assert_eq!(region_for_state("BA"), PricingRegion::NorteNordeste);
        assert_eq!(region_for_state("SP"), PricingRegion::SulSudeste);
        assert_eq!(region_for_state(" go "), PricingRegion::CentroOeste);
        assert_eq!(region_for_state("XX"), PricingRegion::SulSudeste);
    }

    #[test]
    fn test_is_dual_tax_label() {
        assert!(is_dual_tax_label("Rio Grande do Sul"));
        assert!(!is_dual_tax_label("Sul"));
    }
}
