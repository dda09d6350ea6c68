//! Per-node random number generators
//!
//! Every node that samples owns one generator, keyed by the node's path.
//! The registry is shared between nodes (and threads); a single entry is only
//! touched by its owning node.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SamplingConfig;

/// Seed and generator for one node
#[derive(Debug)]
pub struct RngState {
    seed: Option<i64>,
    generator: StdRng,
}

impl RngState {
    /// Seed the generator was last initialized from; `None` until seeded
    pub fn seed(&self) -> Option<i64> {
        self.seed
    }

    pub fn is_seeded(&self) -> bool {
        self.seed.is_some()
    }

    pub fn generator(&mut self) -> &mut StdRng {
        &mut self.generator
    }
}

/// Shared handle to one node's RNG state
pub type RngHandle = Arc<Mutex<RngState>>;

/// Lock an RNG handle, recovering the state if a previous holder panicked
pub fn lock_state(handle: &RngHandle) -> MutexGuard<'_, RngState> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Identity-keyed RNG registry
#[derive(Debug, Default)]
pub struct RngRegistry {
    entries: RwLock<HashMap<String, RngHandle>>,
    global_seed: Option<u64>,
}

impl RngRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose negative-seed nodes derive from `global_seed`
    pub fn with_global_seed(global_seed: Option<u64>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            global_seed,
        }
    }

    pub fn from_config(config: &SamplingConfig) -> Self {
        Self::with_global_seed(config.global_seed)
    }

    pub fn global_seed(&self) -> Option<u64> {
        self.global_seed
    }

    /// Existing entry for `identity`, or a new unseeded one
    pub fn get_or_create(&self, identity: &str) -> RngHandle {
        if let Some(handle) = self.read_entries().get(identity) {
            return Arc::clone(handle);
        }

        let mut entries = self.write_entries();
        let handle = entries.entry(identity.to_string()).or_insert_with(|| {
            debug!("Creating RNG state for {}", identity);
            Arc::new(Mutex::new(RngState {
                seed: None,
                generator: self.derive_generator(-1, identity),
            }))
        });
        Arc::clone(handle)
    }

    /// Make sure the generator for `identity` was seeded from `requested_seed`.
    ///
    /// A generator already seeded with the same value keeps its stream.
    /// Returns true if the generator was (re)initialized.
    pub fn ensure_seeded(&self, identity: &str, requested_seed: i64) -> bool {
        let handle = self.get_or_create(identity);
        let mut state = lock_state(&handle);
        if state.seed == Some(requested_seed) {
            return false;
        }

        debug!(
            "Seeding RNG for {} with {} (previous: {:?})",
            identity, requested_seed, state.seed
        );
        state.generator = self.derive_generator(requested_seed, identity);
        state.seed = Some(requested_seed);
        true
    }

    /// Drop the entry for `identity`. Returns false if there was none.
    pub fn release(&self, identity: &str) -> bool {
        let removed = self.write_entries().remove(identity).is_some();
        if removed {
            debug!("Released RNG state for {}", identity);
        } else {
            trace!("No RNG state to release for {}", identity);
        }
        removed
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.read_entries().contains_key(identity)
    }

    /// Seed last used for `identity`, if it has an entry and was seeded
    pub fn seed_of(&self, identity: &str) -> Option<i64> {
        let handle = self.read_entries().get(identity).cloned()?;
        let seed = lock_state(&handle).seed;
        seed
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    fn derive_generator(&self, requested_seed: i64, identity: &str) -> StdRng {
        let salt = identity_hash(identity);
        if requested_seed >= 0 {
            return StdRng::seed_from_u64(mix(requested_seed as u64, salt));
        }
        match self.global_seed {
            Some(global) => StdRng::seed_from_u64(mix(global, salt)),
            None => StdRng::from_os_rng(),
        }
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, RngHandle>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, RngHandle>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// FNV-1a over the identity bytes; stable across runs and platforms
fn identity_hash(identity: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    identity
        .bytes()
        .fold(OFFSET, |hash, byte| (hash ^ byte as u64).wrapping_mul(PRIME))
}

/// SplitMix64 finalizer
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

fn mix(seed: u64, salt: u64) -> u64 {
    splitmix64(seed ^ splitmix64(salt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::thread;

    fn draw(registry: &RngRegistry, identity: &str, count: usize) -> Vec<u64> {
        let handle = registry.get_or_create(identity);
        let mut state = lock_state(&handle);
        (0..count).map(|_| state.generator().random::<u64>()).collect()
    }

    #[test]
    fn test_get_or_create_starts_unseeded() {
        let registry = RngRegistry::new();
        let handle = registry.get_or_create("/Graph/A");
        assert!(!lock_state(&handle).is_seeded());
        assert!(registry.contains("/Graph/A"));
        assert_eq!(registry.len(), 1);

        let again = registry.get_or_create("/Graph/A");
        assert!(Arc::ptr_eq(&handle, &again));
    }

    #[test]
    fn test_same_seed_same_identity_is_deterministic() {
        let first = RngRegistry::new();
        let second = RngRegistry::new();
        first.ensure_seeded("/Graph/A", 5);
        second.ensure_seeded("/Graph/A", 5);
        assert_eq!(draw(&first, "/Graph/A", 8), draw(&second, "/Graph/A", 8));
    }

    #[test]
    fn test_identity_is_mixed_into_seed() {
        let registry = RngRegistry::new();
        registry.ensure_seeded("/Graph/A", 5);
        registry.ensure_seeded("/Graph/B", 5);
        assert_ne!(draw(&registry, "/Graph/A", 8), draw(&registry, "/Graph/B", 8));
    }

    #[test]
    fn test_unchanged_seed_keeps_stream() {
        let registry = RngRegistry::new();
        assert!(registry.ensure_seeded("/Graph/A", 3));
        let first = draw(&registry, "/Graph/A", 4);
        assert!(!registry.ensure_seeded("/Graph/A", 3));
        let second = draw(&registry, "/Graph/A", 4);
        assert_ne!(first, second);
    }

    #[test]
    fn test_changed_seed_reinitializes() {
        let registry = RngRegistry::new();
        registry.ensure_seeded("/Graph/A", 3);
        let first = draw(&registry, "/Graph/A", 4);
        assert!(registry.ensure_seeded("/Graph/A", 4));
        assert_eq!(registry.seed_of("/Graph/A"), Some(4));
        assert!(registry.ensure_seeded("/Graph/A", 3));
        assert_eq!(draw(&registry, "/Graph/A", 4), first);
    }

    #[test]
    fn test_negative_seed_uses_global_seed() {
        let first = RngRegistry::with_global_seed(Some(99));
        let second = RngRegistry::with_global_seed(Some(99));
        first.ensure_seeded("/Graph/A", -1);
        second.ensure_seeded("/Graph/A", -1);
        assert_eq!(draw(&first, "/Graph/A", 4), draw(&second, "/Graph/A", 4));
        assert_eq!(first.seed_of("/Graph/A"), Some(-1));
    }

    #[test]
    fn test_release_is_idempotent() {
        let registry = RngRegistry::new();
        registry.ensure_seeded("/Graph/A", 1);
        assert!(registry.release("/Graph/A"));
        assert!(!registry.release("/Graph/A"));
        assert!(!registry.release("/Graph/Never"));
        assert!(registry.is_empty());
        assert_eq!(registry.seed_of("/Graph/A"), None);
    }

    #[test]
    fn test_concurrent_identities() {
        let registry = Arc::new(RngRegistry::new());
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let identity = format!("/Graph/Node{}", i);
                    for seed in 0..50 {
                        registry.ensure_seeded(&identity, seed);
                        draw(&registry, &identity, 2);
                    }
                    registry.release(&identity)
                })
            })
            .collect();

        for worker in workers {
            assert!(worker.join().unwrap());
        }
        assert!(registry.is_empty());
    }
}
