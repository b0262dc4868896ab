//! Region lookup commands.

use guindaste_quoting::region::{normalize_region, region_for_state};

/// Print the pricing region for a vendor region label.
#[allow(clippy::print_stdout)]
pub fn normalize(label: &str, has_tax_registration: bool) {
    let region = normalize_region(label, has_tax_registration);
    println!("{region}\t{}", region.label());
}

/// Print the pricing region for a state code.
#[allow(clippy::print_stdout)]
pub fn state(uf: &str) {
    let region = region_for_state(uf);
    println!("{region}\t{}", region.label());
}
