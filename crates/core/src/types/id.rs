//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different tables of the backing store.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>` and `Into<i32>` implementations
///
/// # Example
///
/// ```rust
/// # use guindaste_core::define_id;
/// define_id!(VendorId);
/// define_id!(QuoteId);
///
/// let vendor_id = VendorId::new(1);
/// let quote_id = QuoteId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: VendorId = quote_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Row IDs in the backing store
define_id!(EquipmentId);
define_id!(AccessoryId);

define_id!(
    /// Identifier of a cart line.
    ///
    /// Equipment and accessories live in separate tables, so a cart line is
    /// only unique together with its [`ItemKind`](crate::ItemKind).
    ItemId
);

impl From<EquipmentId> for ItemId {
    fn from(id: EquipmentId) -> Self {
        Self(id.as_i32())
    }
}

impl From<AccessoryId> for ItemId {
    fn from(id: AccessoryId) -> Self {
        Self(id.as_i32())
    }
}

impl From<ItemId> for EquipmentId {
    fn from(id: ItemId) -> Self {
        Self(id.as_i32())
    }
}
