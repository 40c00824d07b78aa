// SPDX-License-Identifier: Apache-2.0

//! An opaque identifier for a network path.
//!
//! The mapping from [`Id`] to a (local address, peer address) pair is owned by the I/O
//! layer; this core only ever compares and stores the ID.

/// Identifies a network path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// The path a connection is created on, before any migration.
    pub const HANDSHAKE: Self = Self(0);

    /// The path implied by a server's `preferred_address` transport parameter.
    pub const PREFERRED_ADDRESS: Self = Self(1);

    /// Sentinel used when no path is known.
    pub const UNKNOWN: Self = Self(0xFFFF_FFFF);

    /// Creates a migration path ID. Panics if `value` collides with a reserved ID.
    pub fn migration(value: u32) -> Self {
        debug_assert!(value >= 2 && value != Self::UNKNOWN.0);
        Self(value)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub fn is_handshake(self) -> bool {
        self == Self::HANDSHAKE
    }

    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }
}

impl From<u32> for Id {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Id> for u32 {
    fn from(id: Id) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ids_have_expected_values() {
        assert_eq!(Id::HANDSHAKE.as_u32(), 0);
        assert_eq!(Id::PREFERRED_ADDRESS.as_u32(), 1);
        assert_eq!(Id::UNKNOWN.as_u32(), 0xFFFF_FFFF);
    }

    #[test]
    fn migration_ids_are_distinct_from_handshake() {
        let path = Id::migration(2);
        assert!(!path.is_handshake());
        assert!(!path.is_unknown());
    }
}
