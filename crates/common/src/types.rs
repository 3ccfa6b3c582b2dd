use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Defines an integer-backed identifier newtype.
///
/// Row identifiers in the storefront schema are `BIGSERIAL` keys. Wrapping
/// them keeps a product id from being passed where an order id is expected.
macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw value.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw value.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }
    };
}

integer_id!(
    /// Identifier of an authenticated user account.
    UserId
);

integer_id!(
    /// Identifier of a customer (shipping/contact) profile.
    CustomerId
);

integer_id!(
    /// Identifier of a catalogue product.
    ProductId
);

integer_id!(
    /// Identifier of a product category.
    CategoryId
);

integer_id!(
    /// Identifier of an order header.
    OrderId
);

integer_id!(
    /// Identifier of a single order line.
    OrderItemId
);
