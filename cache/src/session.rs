use std::borrow::Borrow;
use std::collections::hash_map;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

/// Exclusive access to a [`SafeCache`](crate::SafeCache)'s live map.
///
/// Only handed out by reference to a [`with_lock`](crate::SafeCache::with_lock)
/// callback. The borrow ties it to the write guard, so it cannot outlive the
/// call that created it.
pub struct LockedSession<'a, K, V, H> {
  map: &'a mut HashMap<K, V, H>,
  capacity: usize,
  hasher: &'a H,
}

impl<'a, K, V, H> LockedSession<'a, K, V, H> {
  pub(crate) fn new(map: &'a mut HashMap<K, V, H>, capacity: usize, hasher: &'a H) -> Self {
    Self {
      map,
      capacity,
      hasher,
    }
  }

  pub fn len(&self) -> usize {
    self.map.len()
  }

  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }

  /// Iterates over the entries in unspecified order.
  pub fn iter(&self) -> hash_map::Iter<'_, K, V> {
    self.map.iter()
  }
}

impl<'a, K, V, H: Clone> LockedSession<'a, K, V, H> {
  /// Drops every entry. The map is rebuilt with the owning cache's capacity
  /// hint, and the result is what the cache holds once the session ends.
  pub fn reset(&mut self) {
    *self.map = HashMap::with_capacity_and_hasher(self.capacity, self.hasher.clone());
  }
}

impl<'a, K, V, H> LockedSession<'a, K, V, H>
where
  K: Eq + Hash,
  H: BuildHasher,
{
  pub fn get<Q>(&self, key: &Q) -> Option<&V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.map.get(key)
  }

  pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.map.get_mut(key)
  }

  pub fn contains_key<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.map.contains_key(key)
  }

  pub fn insert(&mut self, key: K, value: V) -> Option<V> {
    self.map.insert(key, value)
  }

  pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.map.remove(key)
  }
}
