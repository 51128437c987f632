//! Time-bounded caching of resolved key material
//!
//! [`CachingKeyProvider`] decorates any [`KeyProvider`] and keeps two
//! independent entries, one for the current encryption key and one for the
//! decryption key set. Each entry is an immutable `(value, fetched_at)` record
//! behind an `Arc`; a refresh builds a new record and swaps it in under a
//! short write lock, so readers always see a complete pair.
//!
//! Two callers racing past an expired entry may both refetch. An entry is
//! stamped with the time its fetch started, and a refresh never replaces an
//! entry whose fetch started later, so a slow fetch cannot reinstate a key set
//! that a faster one already superseded. A fetch that overlaps
//! [`CachingKeyProvider::invalidate`] is returned to its caller but not stored.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::key_provider::KeyProvider;
use super::keys::{AesKey, KeySet};
use crate::clock::{Clock, SystemClock};
use crate::error::EncryptionResult;

struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }
}

type Slot<T> = RwLock<Option<Arc<CacheEntry<T>>>>;

/// Snapshot of what the cache currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCacheStats {
    pub encryption_key_cached: bool,
    pub decryption_keys_cached: bool,
    /// Number of cached decryption candidates, if that entry is fresh
    pub decryption_key_count: Option<usize>,
    pub ttl: Duration,
}

/// Key provider decorator with a per-entry TTL
pub struct CachingKeyProvider<P, C = SystemClock> {
    inner: P,
    ttl: Duration,
    clock: C,
    /// Bumped by `invalidate`; refreshes started under an older value are
    /// not stored
    generation: AtomicU64,
    encryption_key: Slot<AesKey>,
    decryption_keys: Slot<KeySet>,
}

impl<P: KeyProvider> CachingKeyProvider<P> {
    /// Cache `inner` for `ttl` using the system clock
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self::with_clock(inner, ttl, SystemClock)
    }
}

impl<P: KeyProvider, C: Clock> CachingKeyProvider<P, C> {
    /// Cache `inner` for `ttl`, reading time from `clock`
    pub fn with_clock(inner: P, ttl: Duration, clock: C) -> Self {
        Self {
            inner,
            ttl,
            clock,
            generation: AtomicU64::new(0),
            encryption_key: RwLock::new(None),
            decryption_keys: RwLock::new(None),
        }
    }

    /// Drop both entries so the next call of either operation refetches
    pub fn invalidate(&self, reason: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.encryption_key.write() = None;
        *self.decryption_keys.write() = None;
        warn!(security_event = true, reason, "Key cache invalidated");
    }

    /// Whether either entry is currently servable
    pub fn is_cached(&self) -> bool {
        let stats = self.stats();
        stats.encryption_key_cached || stats.decryption_keys_cached
    }

    pub fn stats(&self) -> KeyCacheStats {
        let now = self.clock.now();
        let encryption_key = self.fresh_entry(&self.encryption_key, now);
        let decryption_keys = self.fresh_entry(&self.decryption_keys, now);

        KeyCacheStats {
            encryption_key_cached: encryption_key.is_some(),
            decryption_keys_cached: decryption_keys.is_some(),
            decryption_key_count: decryption_keys.map(|entry| entry.value.len()),
            ttl: self.ttl,
        }
    }

    fn fresh_entry<T>(&self, slot: &Slot<T>, now: Instant) -> Option<Arc<CacheEntry<T>>> {
        slot.read().as_ref().filter(|entry| entry.is_fresh(now, self.ttl)).cloned()
    }

    fn get_or_refresh<T, F>(
        &self,
        slot: &Slot<T>,
        entry: &'static str,
        fetch: F,
    ) -> EncryptionResult<T>
    where
        T: Clone,
        F: FnOnce(&P) -> EncryptionResult<T>,
    {
        let started = self.clock.now();
        if let Some(cached) = self.fresh_entry(slot, started) {
            return Ok(cached.value.clone());
        }

        // Fetch outside the lock; the store call may block.
        let generation = self.generation.load(Ordering::SeqCst);
        let value = fetch(&self.inner)?;

        let mut current = slot.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(entry, "Cache invalidated during refresh, result not stored");
            return Ok(value);
        }
        if let Some(newer) = current.as_ref().filter(|cached| cached.fetched_at > started) {
            debug!(entry, "Discarded refresh that started before the cached entry");
            return Ok(newer.value.clone());
        }
        *current = Some(Arc::new(CacheEntry { value: value.clone(), fetched_at: started }));
        drop(current);

        debug!(entry, ttl_secs = self.ttl.as_secs(), "Refreshed cached key material");
        Ok(value)
    }
}

impl<P: KeyProvider, C: Clock> KeyProvider for CachingKeyProvider<P, C> {
    fn current_encryption_key(&self) -> EncryptionResult<AesKey> {
        self.get_or_refresh(&self.encryption_key, "encryption_key", |inner| {
            inner.current_encryption_key()
        })
    }

    fn decryption_keys(&self) -> EncryptionResult<KeySet> {
        self.get_or_refresh(&self.decryption_keys, "decryption_keys", |inner| {
            inner.decryption_keys()
        })
    }
}

impl<P: fmt::Debug, C> fmt::Debug for CachingKeyProvider<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingKeyProvider")
            .field("inner", &self.inner)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for security::cache.
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::thread;

    use super::*;
    use crate::clock::MockClock;
    use crate::error::EncryptionError;
    use crate::security::KeySize;

    /// Provider that counts calls and serves a swappable key set
    struct CountingProvider {
        keys: RwLock<KeySet>,
        encryption_calls: AtomicUsize,
        decryption_calls: AtomicUsize,
        fail: RwLock<bool>,
    }

    impl CountingProvider {
        fn new(keys: KeySet) -> Self {
            Self {
                keys: RwLock::new(keys),
                encryption_calls: AtomicUsize::new(0),
                decryption_calls: AtomicUsize::new(0),
                fail: RwLock::new(false),
            }
        }

        fn rotate(&self, keys: KeySet) {
            *self.keys.write() = keys;
        }
    }

    impl KeyProvider for CountingProvider {
        fn current_encryption_key(&self) -> EncryptionResult<AesKey> {
            self.encryption_calls.fetch_add(1, Ordering::SeqCst);
            if *self.fail.read() {
                return Err(EncryptionError::no_key("test", "store down"));
            }
            Ok(self.keys.read().current().clone())
        }

        fn decryption_keys(&self) -> EncryptionResult<KeySet> {
            self.decryption_calls.fetch_add(1, Ordering::SeqCst);
            if *self.fail.read() {
                return Err(EncryptionError::no_key("test", "store down"));
            }
            Ok(self.keys.read().clone())
        }
    }

    fn key_set(count: usize) -> KeySet {
        KeySet::from_keys((0..count).map(|_| AesKey::generate(KeySize::Aes128)).collect()).unwrap()
    }

    fn cached(
        keys: KeySet,
        ttl_secs: u64,
    ) -> (CachingKeyProvider<Arc<CountingProvider>, MockClock>, Arc<CountingProvider>, MockClock)
    {
        let inner = Arc::new(CountingProvider::new(keys));
        let clock = MockClock::new();
        let ttl = Duration::from_secs(ttl_secs);
        let provider = CachingKeyProvider::with_clock(Arc::clone(&inner), ttl, clock.clone());
        (provider, inner, clock)
    }

    /// Validates TTL-bounded fetch counts for the encryption key.
    ///
    /// Assertions:
    /// - Confirms two calls within the TTL fetch once.
    /// - Confirms a call after the TTL fetches exactly once more.
    #[test]
    fn test_encryption_key_fetched_once_per_ttl() {
        let (provider, inner, clock) = cached(key_set(1), 60);

        provider.current_encryption_key().unwrap();
        clock.advance_secs(59);
        provider.current_encryption_key().unwrap();
        assert_eq!(inner.encryption_calls.load(Ordering::SeqCst), 1);

        clock.advance_secs(1);
        provider.current_encryption_key().unwrap();
        assert_eq!(inner.encryption_calls.load(Ordering::SeqCst), 2);
    }

    /// Validates the two entries expire independently.
    ///
    /// Assertions:
    /// - Confirms fetching one entry never fetches the other.
    /// - Confirms each entry keeps its own `fetched_at`.
    #[test]
    fn test_entries_are_independent() {
        let (provider, inner, clock) = cached(key_set(2), 10);

        provider.current_encryption_key().unwrap();
        assert_eq!(inner.decryption_calls.load(Ordering::SeqCst), 0);

        clock.advance_secs(6);
        provider.decryption_keys().unwrap();
        clock.advance_secs(6);

        // encryption entry is 12s old, decryption entry 6s old
        provider.current_encryption_key().unwrap();
        provider.decryption_keys().unwrap();
        assert_eq!(inner.encryption_calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner.decryption_calls.load(Ordering::SeqCst), 1);
    }

    /// Validates rotation is observed only after expiry.
    #[test]
    fn test_rotation_visible_after_ttl() {
        let initial = key_set(1);
        let rotated = key_set(2);
        let (provider, inner, clock) = cached(initial.clone(), 30);

        assert_eq!(&provider.current_encryption_key().unwrap(), initial.current());
        inner.rotate(rotated.clone());
        assert_eq!(&provider.current_encryption_key().unwrap(), initial.current());

        clock.advance_secs(30);
        assert_eq!(&provider.current_encryption_key().unwrap(), rotated.current());
        assert_eq!(provider.decryption_keys().unwrap().len(), 2);
    }

    /// Validates failures are not cached.
    ///
    /// Assertions:
    /// - Confirms a failed fetch leaves the cache empty.
    /// - Confirms the next call fetches again.
    #[test]
    fn test_errors_are_not_cached() {
        let (provider, inner, _clock) = cached(key_set(1), 60);
        *inner.fail.write() = true;

        assert!(provider.decryption_keys().is_err());
        assert!(!provider.is_cached());

        *inner.fail.write() = false;
        assert_eq!(provider.decryption_keys().unwrap().len(), 1);
        assert_eq!(inner.decryption_calls.load(Ordering::SeqCst), 2);
    }

    /// Validates `invalidate` forces a refetch of both entries.
    #[test]
    fn test_invalidate_forces_refetch() {
        let (provider, inner, _clock) = cached(key_set(3), 3600);

        provider.current_encryption_key().unwrap();
        provider.decryption_keys().unwrap();
        assert!(provider.is_cached());

        provider.invalidate("suspected key compromise");
        assert!(!provider.is_cached());

        provider.current_encryption_key().unwrap();
        provider.decryption_keys().unwrap();
        assert_eq!(inner.encryption_calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner.decryption_calls.load(Ordering::SeqCst), 2);
    }

    /// Validates `stats` reports freshness and key counts without key bytes.
    #[test]
    fn test_stats() {
        let (provider, _inner, clock) = cached(key_set(3), 5);
        assert_eq!(
            provider.stats(),
            KeyCacheStats {
                encryption_key_cached: false,
                decryption_keys_cached: false,
                decryption_key_count: None,
                ttl: Duration::from_secs(5),
            }
        );

        provider.decryption_keys().unwrap();
        let stats = provider.stats();
        assert!(stats.decryption_keys_cached);
        assert!(!stats.encryption_key_cached);
        assert_eq!(stats.decryption_key_count, Some(3));

        clock.advance_secs(5);
        assert!(!provider.is_cached());
    }

    #[test]
    fn test_zero_ttl_never_serves_cached_values() {
        let (provider, inner, _clock) = cached(key_set(1), 0);
        provider.current_encryption_key().unwrap();
        provider.current_encryption_key().unwrap();
        assert_eq!(inner.encryption_calls.load(Ordering::SeqCst), 2);
    }

    /// Provider whose first `decryption_keys` call snapshots the key set and
    /// then blocks until released
    struct GatedProvider {
        keys: RwLock<KeySet>,
        entered: parking_lot::Mutex<Option<mpsc::Sender<()>>>,
        release: parking_lot::Mutex<Option<mpsc::Receiver<()>>>,
    }

    impl KeyProvider for GatedProvider {
        fn current_encryption_key(&self) -> EncryptionResult<AesKey> {
            Ok(self.keys.read().current().clone())
        }

        fn decryption_keys(&self) -> EncryptionResult<KeySet> {
            let snapshot = self.keys.read().clone();
            let release = self.release.lock().take();
            if let Some(release) = release {
                if let Some(entered) = self.entered.lock().take() {
                    entered.send(()).unwrap();
                }
                release.recv().unwrap();
            }
            Ok(snapshot)
        }
    }

    /// Starts a slow refresh on another thread and returns once its fetch has
    /// read the key set.
    fn start_slow_refresh(
        initial: KeySet,
        ttl_secs: u64,
    ) -> (
        Arc<CachingKeyProvider<Arc<GatedProvider>, MockClock>>,
        Arc<GatedProvider>,
        MockClock,
        mpsc::Sender<()>,
        thread::JoinHandle<KeySet>,
    ) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let inner = Arc::new(GatedProvider {
            keys: RwLock::new(initial),
            entered: parking_lot::Mutex::new(Some(entered_tx)),
            release: parking_lot::Mutex::new(Some(release_rx)),
        });
        let clock = MockClock::new();
        let ttl = Duration::from_secs(ttl_secs);
        let provider =
            Arc::new(CachingKeyProvider::with_clock(Arc::clone(&inner), ttl, clock.clone()));

        let slow = {
            let provider = Arc::clone(&provider);
            thread::spawn(move || provider.decryption_keys().unwrap())
        };
        entered_rx.recv().unwrap();
        (provider, inner, clock, release_tx, slow)
    }

    /// Validates a slow fetch that read the key set before a rotation cannot
    /// overwrite the rotated entry stored by a later fetch.
    ///
    /// Assertions:
    /// - Confirms the slow caller receives the rotated set.
    /// - Confirms the cache keeps serving the rotated set without refetching.
    #[test]
    fn test_stale_refresh_does_not_replace_newer_entry() {
        let retired = key_set(1);
        let rotated = key_set(2);
        let (provider, inner, clock, release, slow) = start_slow_refresh(retired.clone(), 30);

        clock.advance_secs(1);
        *inner.keys.write() = rotated.clone();
        assert_eq!(provider.decryption_keys().unwrap().current(), rotated.current());

        release.send(()).unwrap();
        let slow_result = slow.join().unwrap();
        assert_eq!(slow_result.current(), rotated.current());

        let cached = provider.decryption_keys().unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached.current(), rotated.current());
        assert_ne!(cached.current(), retired.current());
    }

    /// Validates a fetch overlapping `invalidate` is not stored.
    #[test]
    fn test_refresh_overlapping_invalidate_is_not_stored() {
        let (provider, _inner, _clock, release, slow) = start_slow_refresh(key_set(1), 30);

        provider.invalidate("key compromised");
        release.send(()).unwrap();
        slow.join().unwrap();

        assert!(!provider.stats().decryption_keys_cached);
    }
}
