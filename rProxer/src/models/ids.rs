//! Type-safe ID wrappers.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Create a new ID.
            pub const fn new(id: u64) -> Self {
                $name(id)
            }

            /// Check if this ID is unset (zero).
            pub fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// Get the raw number.
            pub fn get(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                $name(n)
            }
        }

        impl From<u32> for $name {
            fn from(n: u32) -> Self {
                $name(n.into())
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                crate::api::de::number(deserializer).map($name)
            }
        }
    };
}

define_id!(UserId, "A user identifier.");
define_id!(EntryId, "An anime or manga entry identifier.");
define_id!(ConferenceId, "A messenger conference identifier.");
define_id!(MessageId, "A messenger message identifier.");
define_id!(NotificationId, "A notification identifier.");
define_id!(BookmarkId, "A bookmark (reminder) identifier.");
define_id!(CommentId, "An entry comment identifier.");
define_id!(TagId, "A tag identifier.");
define_id!(IndustryId, "A company identifier.");
