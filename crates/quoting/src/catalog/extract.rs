//! Capacity and model parsing from descriptive crane names.
//!
//! Names look like `"Guindaste GSI 6.5 3h1m"`: an optional (sometimes
//! repeated) `Guindaste` prefix, a line code, the capacity in tonnes, then
//! free-form reach/extension text.

use std::sync::LazyLock;

use regex::Regex;

static PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:guindaste\s+)+").expect("Invalid regex"));

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("Invalid regex"));

/// Strip the prefix and keep the first two whitespace-separated tokens.
fn reduce(name: &str) -> Option<String> {
    let stripped = PREFIX_RE.replace(name.trim(), "");
    let reduced = stripped.split_whitespace().take(2).collect::<Vec<_>>().join(" ");
    (!reduced.is_empty()).then_some(reduced)
}

/// Extract the capacity from a crane name.
///
/// The first integer or decimal number in the reduced name is the capacity,
/// kept exactly as written (`"8.0"` stays `"8.0"`).
///
/// ```
/// use guindaste_quoting::catalog::extract_capacity;
///
/// assert_eq!(extract_capacity("Guindaste GSI 6.5 3h1m").as_deref(), Some("6.5"));
/// assert_eq!(extract_capacity("Guindaste Articulado").as_deref(), None);
/// ```
#[must_use]
pub fn extract_capacity(name: &str) -> Option<String> {
    let reduced = reduce(name)?;
    NUMBER_RE.find(&reduced).map(|m| m.as_str().to_string())
}

/// Extract the model key from a crane name: the reduced two-token name.
///
/// Returns `None` when the name has no capacity, so an item is either in
/// both indexes or in neither.
#[must_use]
pub fn extract_model(name: &str) -> Option<String> {
    let reduced = reduce(name)?;
    NUMBER_RE.is_match(&reduced).then_some(reduced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_examples() {
        assert_eq!(extract_capacity("Guindaste GSI 6.5 3h1m").as_deref(), Some("6.5"));
        assert_eq!(extract_capacity("Guindaste GSE 8.0 4h2m").as_deref(), Some("8.0"));
        assert_eq!(extract_capacity("Guindaste GSE 15 6h3m").as_deref(), Some("15"));
    }

    #[test]
    fn test_repeated_prefix_is_stripped() {
        assert_eq!(
            extract_capacity("Guindaste Guindaste GSI 10.8 5h").as_deref(),
            Some("10.8")
        );
        assert_eq!(
            extract_model("Guindaste  guindaste GSI 10.8 5h").as_deref(),
            Some("GSI 10.8")
        );
    }

    #[test]
    fn test_prefix_is_case_insensitive() {
        assert_eq!(extract_model("GUINDASTE GSE 8.0 4h2m").as_deref(), Some("GSE 8.0"));
        assert_eq!(extract_model("guindaste GSE 8.0").as_deref(), Some("GSE 8.0"));
    }

    #[test]
    fn test_number_only_searched_in_first_two_tokens() {
        assert_eq!(extract_capacity("Guindaste Articulado Hidráulico 12t"), None);
        assert_eq!(extract_model("Guindaste Articulado Hidráulico 12t"), None);
    }

    #[test]
    fn test_number_inside_token() {
        assert_eq!(extract_capacity("Guindaste GSI6.5 3h1m").as_deref(), Some("6.5"));
        assert_eq!(extract_model("Guindaste GSI6.5 3h1m").as_deref(), Some("GSI6.5 3h1m"));
    }

    #[test]
    fn test_empty_and_prefix_only() {
        assert_eq!(extract_capacity(""), None);
        assert_eq!(extract_capacity("   "), None);
        assert_eq!(extract_model("Guindaste"), None);
    }

    #[test]
    fn test_name_without_prefix() {
        assert_eq!(extract_capacity("GSI 6.5 3h1m").as_deref(), Some("6.5"));
        assert_eq!(extract_model("GSI 6.5 3h1m").as_deref(), Some("GSI 6.5"));
    }
}
