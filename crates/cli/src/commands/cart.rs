//! Cart commands.
//!
//! Operate on the cart saved under `GQ_CART_DIR`.

use guindaste_core::CartItem;
use guindaste_quoting::QuotingError;
use guindaste_quoting::cart::{
    CartManager, CartStorage, JsonFileStorage, PaymentContext, QuoteStep, RecalcOutcome,
};
use guindaste_quoting::config::QuotingConfig;
use guindaste_quoting::store::RestStore;

/// Print the saved cart.
///
/// # Errors
///
/// Returns an error if the saved cart cannot be read.
#[allow(clippy::print_stdout)]
pub fn show(config: &QuotingConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let storage = JsonFileStorage::new(&config.cart_dir);
    let items = storage.load().map_err(QuotingError::from)?.unwrap_or_default();

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    print_cart(&items);
    Ok(())
}

/// Reprice the saved cart for a vendor region and print the result.
///
/// # Errors
///
/// Returns an error if the store client cannot be built.
#[allow(clippy::print_stdout)]
pub async fn reprice(
    config: &QuotingConfig,
    vendor_region: String,
    has_tax_registration: bool,
    step: QuoteStep,
) -> Result<(), QuotingError> {
    let store = RestStore::new(&config.store)?;
    let cart = CartManager::new(store, JsonFileStorage::new(&config.cart_dir));
    cart.set_vendor_region(Some(vendor_region));
    cart.set_tax_registration(has_tax_registration);

    let payment = PaymentContext {
        customer_has_tax_registration: Some(has_tax_registration),
    };
    match cart.recalculate_prices(step, &payment).await {
        RecalcOutcome::Skipped(reason) => println!("Skipped: {reason:?}"),
        RecalcOutcome::Unchanged => println!("Prices already current"),
        RecalcOutcome::Updated { changed, region } => {
            println!("Repriced {changed} item(s) for {region}");
        }
    }
    print_cart(&cart.snapshot());
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_cart(items: &[CartItem]) {
    if items.is_empty() {
        println!("Cart is empty");
        return;
    }
    for item in items {
        let price = item
            .unit_price
            .map_or_else(|| "sem preço".to_string(), |p| p.to_string());
        println!(
            "{:?}\t{}\t{} x {}\t{}",
            item.kind,
            item.name,
            item.quantity,
            price,
            item.line_total()
        );
    }
    let total: guindaste_core::Money = items.iter().map(CartItem::line_total).sum();
    println!("Total\t{total}");
}
