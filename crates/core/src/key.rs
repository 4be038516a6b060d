//! Capability keys authorizing deregistration
//!
//! A key is minted by the server when a name is registered and returned
//! only to the registrant. It combines a server-local monotonically
//! distinct seed with an uncorrelated random component; neither half
//! alone permits forgery, and a key is never reconstructable from the
//! name or location.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unguessable token bound to one registration
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityKey {
    seed: u64,
    token: u64,
}

impl CapabilityKey {
    /// Rebuild a key from its wire components
    pub fn from_parts(seed: u64, token: u64) -> Self {
        Self { seed, token }
    }

    /// Wire components of the key
    pub fn to_parts(&self) -> (u64, u64) {
        (self.seed, self.token)
    }

    /// Strict value comparison of both components; never a partial or
    /// substring match
    pub fn matches(&self, other: &CapabilityKey) -> bool {
        self.seed == other.seed && self.token == other.token
    }
}

// Keys are secrets: never echoed in logs or panics.
impl fmt::Debug for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapabilityKey(..)")
    }
}

/// Server-side key mint
#[derive(Debug)]
pub struct KeyMinter {
    next_seed: AtomicU64,
}

impl KeyMinter {
    pub fn new() -> Self {
        Self {
            next_seed: AtomicU64::new(1),
        }
    }

    pub fn mint(&self) -> CapabilityKey {
        let seed = self.next_seed.fetch_add(1, Ordering::Relaxed);
        let token: u64 = rand::random();
        CapabilityKey { seed, token }
    }
}

impl Default for KeyMinter {
    fn default() -> Self {
        Self::new()
    }
}
