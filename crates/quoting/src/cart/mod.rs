//! Cart consistency manager.
//!
//! Owns the quote cart and keeps equipment prices in line with the pricing
//! region of the vendor handling the quote. Repricing reads a snapshot of
//! the cart, looks every equipment price up again, and commits a full
//! replacement only when at least one price moved. Readers therefore see
//! either the old cart or the fully repriced one, and a pass that changes
//! nothing leaves the snapshot (and its `Arc` identity) untouched.
//!
//! Only one repricing pass runs at a time. A pass does not lock out
//! [`add`](CartManager::add) and friends: an item added while lookups are
//! in flight is lost when the pass commits the list it started from.

mod storage;

pub use storage::{CART_STORAGE_KEY, CartStorage, JsonFileStorage, MemoryStorage, StorageError};

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use guindaste_core::{CartItem, EquipmentId, ItemId, ItemKind, Money, PricingRegion};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::region::{is_dual_tax_label, normalize_region};
use crate::store::PriceLookup;

/// Steps of the quote flow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuoteStep {
    SelectEquipment,
    Accessories,
    ClientData,
    Payment,
    Review,
}

impl QuoteStep {
    /// Whether the customer has finished choosing items.
    #[must_use]
    pub fn is_past_item_selection(self) -> bool {
        self > Self::Accessories
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelectEquipment => "select-equipment",
            Self::Accessories => "accessories",
            Self::ClientData => "client-data",
            Self::Payment => "payment",
            Self::Review => "review",
        }
    }
}

impl std::fmt::Display for QuoteStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStep {
    type Err = String;

    /// Accepts the kebab-case name or the 1-based step number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "select-equipment" | "1" => Ok(Self::SelectEquipment),
            "accessories" | "2" => Ok(Self::Accessories),
            "client-data" | "3" => Ok(Self::ClientData),
            "payment" | "4" => Ok(Self::Payment),
            "review" | "5" => Ok(Self::Review),
            other => Err(format!("unknown quote step: {other}")),
        }
    }
}

/// Payment-step answers that affect pricing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentContext {
    /// The customer's answer to "has state tax registration?", if given.
    pub customer_has_tax_registration: Option<bool>,
}

/// Why a repricing pass did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyCart,
    NoVendorRegion,
    InFlight,
}

/// Outcome of [`CartManager::recalculate_prices`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecalcOutcome {
    Skipped(SkipReason),
    /// Every price matched; nothing was committed.
    Unchanged,
    /// The repriced cart was committed.
    Updated {
        changed: usize,
        region: PricingRegion,
    },
}

#[derive(Debug)]
struct CartState {
    items: Arc<Vec<CartItem>>,
    vendor_region: Option<String>,
    has_tax_registration: bool,
}

/// Releases the single-pass flag when a repricing pass ends.
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owner of the quote cart.
pub struct CartManager<P, S> {
    prices: P,
    storage: S,
    state: Mutex<CartState>,
    recalculating: AtomicBool,
}

impl<P, S> std::fmt::Debug for CartManager<P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("CartManager")
            .field("items", &state.items.len())
            .field("vendor_region", &state.vendor_region)
            .field("recalculating", &self.recalculating.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<P, S> CartManager<P, S> {
    fn lock(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current cart. The `Arc` changes only when the cart does.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<CartItem>> {
        Arc::clone(&self.lock().items)
    }

    /// Sum of line totals; a line without a price counts as zero.
    #[must_use]
    pub fn total(&self) -> Money {
        self.snapshot().iter().map(CartItem::line_total).sum()
    }

    #[must_use]
    pub fn equipment(&self) -> Vec<CartItem> {
        self.of_kind(ItemKind::Equipment)
    }

    #[must_use]
    pub fn accessories(&self) -> Vec<CartItem> {
        self.of_kind(ItemKind::Accessory)
    }

    fn of_kind(&self, kind: ItemKind) -> Vec<CartItem> {
        self.snapshot()
            .iter()
            .filter(|item| item.kind == kind)
            .cloned()
            .collect()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.snapshot()
            .iter()
            .fold(0u32, |sum, item| sum.saturating_add(item.quantity))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// The vendor's region label as stored on their record.
    #[must_use]
    pub fn vendor_region(&self) -> Option<String> {
        self.lock().vendor_region.clone()
    }

    pub fn set_vendor_region(&self, label: Option<String>) {
        self.lock().vendor_region = label;
    }

    #[must_use]
    pub fn tax_registration(&self) -> bool {
        self.lock().has_tax_registration
    }

    pub fn set_tax_registration(&self, has_registration: bool) {
        self.lock().has_tax_registration = has_registration;
    }
}

impl<P, S: CartStorage> CartManager<P, S> {
    /// Create a manager, restoring the cart saved in `storage`.
    ///
    /// An unreadable stored cart is logged and replaced by an empty one.
    #[must_use]
    pub fn new(prices: P, storage: S) -> Self {
        let items = match storage.load() {
            Ok(Some(items)) => items,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Stored cart unreadable, starting empty");
                Vec::new()
            }
        };
        debug!(items = items.len(), "Cart restored");

        Self {
            prices,
            storage,
            state: Mutex::new(CartState {
                items: Arc::new(items),
                has_tax_registration: true,
                vendor_region: None,
            }),
            recalculating: AtomicBool::new(false),
        }
    }

    /// Apply `change` to a copy of the cart, commit it, and persist.
    fn mutate<F>(&self, change: F)
    where
        F: FnOnce(&mut Vec<CartItem>),
    {
        let mut state = self.lock();
        let mut items = state.items.as_ref().clone();
        change(&mut items);
        self.commit(&mut state, items);
    }

    fn commit(&self, state: &mut CartState, items: Vec<CartItem>) {
        if let Err(e) = self.storage.save(&items) {
            warn!(error = %e, "Failed to persist cart");
        }
        state.items = Arc::new(items);
    }

    /// Add a line. Equipment replaces any equipment already in the cart.
    pub fn add(&self, item: CartItem) {
        debug!(id = %item.id, kind = ?item.kind, "Adding cart item");
        self.mutate(|items| {
            if item.kind == ItemKind::Equipment {
                items.retain(|existing| existing.kind != ItemKind::Equipment);
            }
            items.push(item);
        });
    }

    /// Remove every line matching `(id, kind)`.
    pub fn remove(&self, id: impl Into<ItemId>, kind: ItemKind) {
        let id = id.into();
        self.mutate(|items| items.retain(|item| !item.is(id, kind)));
    }

    /// Set a line's quantity; zero or less removes it.
    pub fn set_quantity(&self, id: impl Into<ItemId>, kind: ItemKind, quantity: i64) {
        let id = id.into();
        if quantity <= 0 {
            self.remove(id, kind);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        self.mutate(|items| {
            for item in items.iter_mut().filter(|item| item.is(id, kind)) {
                item.quantity = quantity;
            }
        });
    }

    pub fn clear(&self) {
        self.mutate(Vec::clear);
    }
}

impl<P: PriceLookup, S: CartStorage> CartManager<P, S> {
    /// Re-resolve every equipment price for the vendor's region.
    ///
    /// The tax-registration answer only counts once the customer is past
    /// item selection and the vendor sits in the dual-tax region; otherwise
    /// the registered price applies. A lookup that fails or finds no row
    /// keeps that item's current price.
    #[instrument(skip(self, payment))]
    pub async fn recalculate_prices(
        &self,
        step: QuoteStep,
        payment: &PaymentContext,
    ) -> RecalcOutcome {
        let Some(_pass) = PassGuard::acquire(&self.recalculating) else {
            debug!("Repricing already in flight");
            return RecalcOutcome::Skipped(SkipReason::InFlight);
        };

        let (items, label, stored_flag) = {
            let state = self.lock();
            (
                Arc::clone(&state.items),
                state.vendor_region.clone(),
                state.has_tax_registration,
            )
        };
        if items.is_empty() {
            return RecalcOutcome::Skipped(SkipReason::EmptyCart);
        }
        let Some(label) = label.filter(|l| !l.trim().is_empty()) else {
            return RecalcOutcome::Skipped(SkipReason::NoVendorRegion);
        };

        let has_registration = if step.is_past_item_selection() && is_dual_tax_label(&label) {
            payment.customer_has_tax_registration.unwrap_or(stored_flag)
        } else {
            true
        };
        let region = normalize_region(&label, has_registration);

        let mut repriced = items.as_ref().clone();
        let mut changed = 0;
        for item in repriced
            .iter_mut()
            .filter(|item| item.kind == ItemKind::Equipment)
        {
            match self.prices.price_for(EquipmentId::from(item.id), region).await {
                Ok(Some(price)) if item.unit_price != Some(price) => {
                    debug!(id = %item.id, old = ?item.unit_price, new = %price, "Price changed");
                    item.unit_price = Some(price);
                    changed += 1;
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    debug!(id = %item.id, %region, "No regional price, keeping current");
                }
                Err(e) => {
                    warn!(id = %item.id, %region, error = %e, "Price lookup failed, keeping current");
                }
            }
        }

        if changed == 0 {
            return RecalcOutcome::Unchanged;
        }

        let mut state = self.lock();
        self.commit(&mut state, repriced);
        info!(changed, %region, "Cart repriced");
        RecalcOutcome::Updated { changed, region }
    }
}
