//! Collision-resistant nonce generation for AES-GCM
//!
//! Every nonce is `prefix(12 random bytes) ‖ counter(4 bytes, big-endian)`.
//! Within one prefix the counter guarantees uniqueness for 2^32 nonces; once
//! the counter is exhausted the generator draws a fresh random prefix and
//! restarts at zero.

use std::fmt;

use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

/// Total nonce length carried in every envelope
pub const NONCE_LEN: usize = 16;

/// Length of the random part of a nonce
pub const NONCE_PREFIX_LEN: usize = 12;

/// A single 16-byte GCM initialization vector
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    fn from_parts(prefix: &[u8; NONCE_PREFIX_LEN], counter: u32) -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        bytes[..NONCE_PREFIX_LEN].copy_from_slice(prefix);
        bytes[NONCE_PREFIX_LEN..].copy_from_slice(&counter.to_be_bytes());
        Self(bytes)
    }

    /// Raw nonce bytes as written to the envelope
    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }

    /// The random prefix
    pub fn prefix(&self) -> &[u8] {
        &self.0[..NONCE_PREFIX_LEN]
    }

    /// The big-endian counter suffix
    pub fn counter(&self) -> u32 {
        let mut counter = [0u8; 4];
        counter.copy_from_slice(&self.0[NONCE_PREFIX_LEN..]);
        u32::from_be_bytes(counter)
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nonce").field("counter", &self.counter()).finish_non_exhaustive()
    }
}

struct NonceState {
    prefix: [u8; NONCE_PREFIX_LEN],
    counter: u32,
    /// Set once `counter` has been issued at `u32::MAX`
    exhausted: bool,
}

impl NonceState {
    fn seeded() -> Self {
        Self { prefix: random_prefix(), counter: 0, exhausted: false }
    }

    fn reseed(&mut self) {
        self.prefix = random_prefix();
        self.counter = 0;
        self.exhausted = false;
    }
}

fn random_prefix() -> [u8; NONCE_PREFIX_LEN] {
    let mut prefix = [0u8; NONCE_PREFIX_LEN];
    OsRng.fill_bytes(&mut prefix);
    prefix
}

/// Thread-safe source of non-repeating nonces
///
/// The "read counter, increment, possibly reseed" sequence runs under one
/// short mutex critical section, so concurrent callers never observe the same
/// `(prefix, counter)` pair.
pub struct NonceGenerator {
    state: Mutex<NonceState>,
}

impl NonceGenerator {
    /// Create a generator with a freshly drawn random prefix
    pub fn new() -> Self {
        Self { state: Mutex::new(NonceState::seeded()) }
    }

    /// Issue the next nonce
    pub fn next_nonce(&self) -> Nonce {
        let mut state = self.state.lock();

        if state.exhausted {
            state.reseed();
            debug!("Nonce counter exhausted, drew a fresh random prefix");
        }

        let nonce = Nonce::from_parts(&state.prefix, state.counter);
        match state.counter.checked_add(1) {
            Some(next) => state.counter = next,
            None => state.exhausted = true,
        }
        nonce
    }

    #[cfg(test)]
    fn starting_at(prefix: [u8; NONCE_PREFIX_LEN], counter: u32) -> Self {
        Self { state: Mutex::new(NonceState { prefix, counter, exhausted: false }) }
    }
}

impl Default for NonceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NonceGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonceGenerator").finish_non_exhaustive()
    }
}
