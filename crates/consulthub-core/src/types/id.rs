//! Newtype wrappers around `i64` for all domain entity identifiers.
//!
//! Identifiers are assigned by the persistence collaborator and are always
//! positive. Using distinct types prevents accidentally passing a `UserId`
//! where a `SessionId` is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Macro to define a newtype ID wrapper around `i64`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw identifier.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Return the raw identifier.
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Identifiers issued by storage are strictly positive.
            pub const fn is_valid(self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a user (clients and advisors alike).
    UserId
);

define_id!(
    /// Unique identifier for a consultation session.
    SessionId
);

define_id!(
    /// Unique identifier for a persisted chat message.
    MessageId
);

define_id!(
    /// Unique identifier for a wallet transaction.
    TransactionId
);
