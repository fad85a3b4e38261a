use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

macro_rules! dense_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            /// Index into the owning collection.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Build an id from a collection index.
            #[must_use]
            #[allow(clippy::cast_possible_truncation)]
            pub const fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

dense_id!(
    /// Joint identifier, a dense index into its rig's joint table.
    JointId,
    "joint"
);

dense_id!(
    /// Chain identifier, a dense index into its rig's chain table.
    ChainId,
    "chain"
);

dense_id!(
    /// Puppet identifier, assigned in registration order by the engine.
    PuppetId,
    "puppet"
);

dense_id!(
    /// Light source identifier supplied by the session layer.
    LightId,
    "light"
);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
