//! Opaque, totally ordered identifier types for the network data model.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! opaque_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing [`Uuid`].
            #[must_use]
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Return the inner [`Uuid`].
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

opaque_id!(ContactId, "Unique identifier for a [`crate::Contact`].");
opaque_id!(GroupId, "Unique identifier for a [`crate::Group`].");
opaque_id!(WireId, "Unique identifier for a [`crate::Wire`].");
opaque_id!(DriverId, "Unique identifier for a registered driver.");

impl ContactId {
    /// The synthetic contact a query reply (spec §6) is addressed to. Not a
    /// real contact in any group; never returned by [`ContactId::new`].
    #[must_use]
    pub fn system() -> Self {
        Self(Uuid::nil())
    }
}
