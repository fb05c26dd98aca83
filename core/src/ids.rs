//! Strongly-typed identifiers.
//!
//! All entities are keyed by database sequences, so every id wraps an `i64`.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[doc = concat!("Creates a new `", stringify!($name), "` from its raw value")]
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw value
            #[must_use]
            pub const fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a user
    UserId
);
define_id!(
    /// Unique identifier for a product
    ProductId
);
define_id!(
    /// Unique identifier for a category
    CategoryId
);
define_id!(
    /// Unique identifier for an order
    OrderId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&OrderId::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value(), 42);
    }

    #[test]
    fn ids_display_raw_value() {
        assert_eq!(ProductId::new(7).to_string(), "7");
    }
}
