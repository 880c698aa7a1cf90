use crate::session::LockedSession;

use core::fmt;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

use parking_lot::RwLock;

/// A generic, thread-safe map cache guarded by a single reader-writer lock.
///
/// Reads share the lock and run concurrently with each other. Writes, and
/// [`with_lock`](Self::with_lock) sessions, take it exclusively. The capacity
/// given at construction is remembered so that [`reset`](Self::reset) hands
/// back a map that is already sized for the expected workload.
pub struct SafeCache<K, V, H = ahash::RandomState> {
  map: RwLock<HashMap<K, V, H>>,
  capacity: usize,
  hasher: H,
}

impl<K, V> SafeCache<K, V, ahash::RandomState> {
  /// Creates an empty cache pre-sized for `capacity` entries.
  pub fn new(capacity: usize) -> Self {
    Self::with_hasher(capacity, ahash::RandomState::new())
  }
}

impl<K, V> Default for SafeCache<K, V, ahash::RandomState> {
  fn default() -> Self {
    Self::new(0)
  }
}

impl<K, V, H: Clone> SafeCache<K, V, H> {
  /// Creates an empty cache that hashes keys with `hasher`.
  pub fn with_hasher(capacity: usize, hasher: H) -> Self {
    Self {
      map: RwLock::new(HashMap::with_capacity_and_hasher(capacity, hasher.clone())),
      capacity,
      hasher,
    }
  }

  /// The capacity hint used whenever the backing map is rebuilt.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn len(&self) -> usize {
    self.map.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.map.read().is_empty()
  }

  /// Discards every entry and replaces the backing map with a fresh one of the
  /// remembered capacity.
  ///
  /// Values handed out earlier by [`get`](Self::get) are owned copies and stay
  /// valid.
  pub fn reset(&self) {
    let fresh = HashMap::with_capacity_and_hasher(self.capacity, self.hasher.clone());
    let stale = {
      let mut guard = self.map.write();
      std::mem::replace(&mut *guard, fresh)
    };
    tracing::trace!(capacity = self.capacity, dropped = stale.len(), "cache reset");
    // The old map is dropped here, after the write lock is released.
    drop(stale);
  }
}

impl<K, V, H> SafeCache<K, V, H>
where
  K: Eq + Hash,
  H: BuildHasher + Clone,
{
  /// Returns a copy of the value stored under `key`, if any.
  pub fn get<Q>(&self, key: &Q) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    V: Clone,
  {
    self.map.read().get(key).cloned()
  }

  /// Looks up `key` and applies `f` to the value while the read lock is held.
  ///
  /// Useful for values that are expensive to clone. `f` should be fast, since
  /// writers wait for it.
  pub fn get_with<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    F: FnOnce(&V) -> R,
  {
    let guard = self.map.read();
    guard.get(key).map(f)
  }

  pub fn contains_key<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.map.read().contains_key(key)
  }

  /// Inserts `value` under `key`, returning the value it replaced.
  pub fn insert(&self, key: K, value: V) -> Option<V> {
    self.map.write().insert(key, value)
  }

  /// Removes `key`, returning its value. Removing an absent key is a no-op.
  pub fn remove<Q>(&self, key: &Q) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.map.write().remove(key)
  }

  /// Visits every entry under the read lock.
  ///
  /// Iteration stops at the first error returned by `f`, and that error is
  /// returned. Entry order is unspecified.
  pub fn for_each<F, E>(&self, mut f: F) -> Result<(), E>
  where
    F: FnMut(&K, &V) -> Result<(), E>,
  {
    let guard = self.map.read();
    for (key, value) in guard.iter() {
      f(key, value)?;
    }
    Ok(())
  }

  /// Runs `f` with exclusive access to the live map.
  ///
  /// The write lock is taken once and held for the whole callback, so every
  /// operation performed through the [`LockedSession`] is observed by other
  /// threads as a single atomic step. The callback's result is returned as-is.
  /// Mutations made before an `Err` is returned are kept; nothing is rolled
  /// back.
  ///
  /// All other access to the cache blocks while `f` runs. Keep it short and
  /// never call back into this cache from inside it, which would deadlock.
  pub fn with_lock<F, R, E>(&self, f: F) -> Result<R, E>
  where
    F: FnOnce(&mut LockedSession<'_, K, V, H>) -> Result<R, E>,
  {
    let mut guard = self.map.write();
    let mut session = LockedSession::new(&mut *guard, self.capacity, &self.hasher);
    f(&mut session)
  }
}

impl<K, V, H> fmt::Debug for SafeCache<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SafeCache")
      .field("capacity", &self.capacity)
      .field("len", &self.map.read().len())
      .finish_non_exhaustive()
  }
}

/// A cache that can drop all of its contents on demand.
///
/// Hosts that need a process-wide reset keep their own list of
/// `Arc<dyn Resettable>` handles and reset each one.
pub trait Resettable: Send + Sync {
  fn reset(&self);
}

impl<K, V, H> Resettable for SafeCache<K, V, H>
where
  K: Send + Sync,
  V: Send + Sync,
  H: Clone + Send + Sync,
{
  fn reset(&self) {
    SafeCache::reset(self)
  }
}
