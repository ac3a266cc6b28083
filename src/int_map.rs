//! Integer-keyed map.
//!
//! Keys are stored inline next to their value and compared with `==`, so a
//! lookup never leaves the slot array. The default [`MixState`] strategy runs
//! each key through a single folded multiply, which is enough to spread
//! sequential or pointer-aligned keys over both halves of the digest.

use core::fmt::Debug;
use core::hash::BuildHasher;

use crate::MixState;
use crate::TryReserveError;
use crate::hash_map::IntoIter;
use crate::hash_map::Iter;
use crate::hash_map::Keys;
use crate::hash_map::Values;
use crate::hash_table::Entry;
use crate::hash_table::HashTable;
use crate::hasher::hash_int;

mod sealed {
    pub trait Sealed {}
}

/// Primitive integers usable as [`IntMap`] keys.
///
/// Implemented for every primitive integer up to 64 bits plus `usize` and
/// `isize`. Signed values are sign-extended, which keeps the mapping to `u64`
/// injective for each type.
pub trait IntKey: Copy + Eq + sealed::Sealed {
    /// Widens the key to the 64-bit value fed to the hasher.
    fn to_u64(self) -> u64;
}

macro_rules! int_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl IntKey for $ty {
                #[inline(always)]
                fn to_u64(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

int_key!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// A map from native integers to values.
///
/// Offers the same operations as [`HashMap`](crate::HashMap), including the
/// rule that inserting never overwrites an existing value.
///
/// # Examples
///
/// ```rust
/// use swiss_hash::IntMap;
///
/// let mut map: IntMap<usize, &str> = IntMap::new();
/// map.insert(0x1000, "page");
/// map.insert(0x1000, "ignored");
///
/// assert_eq!(map.get(0x1000), Some(&"page"));
/// assert_eq!(map.get(0x2000), None);
/// ```
#[derive(Clone)]
pub struct IntMap<K, V, S = MixState> {
    table: HashTable<(K, V)>,
    hash_builder: S,
}

impl<K, V, S> Debug for IntMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.table.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl<K, V, S> IntMap<K, V, S>
where
    K: IntKey,
    S: BuildHasher,
{
    /// Creates an empty map with the given hasher builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates an empty map able to hold `capacity` entries without resizing.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of entries the map can hold before it needs to
    /// resize.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    #[inline(always)]
    fn hash(&self, key: K) -> u64 {
        hash_int(&self.hash_builder, key.to_u64())
    }

    /// Ensures the map can hold `size_hint` entries in total without
    /// resizing.
    pub fn reserve(&mut self, size_hint: usize) {
        self.table.reserve(size_hint, |&(k, _)| {
            hash_int(&self.hash_builder, k.to_u64())
        });
    }

    /// Fallible version of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, size_hint: usize) -> Result<(), TryReserveError> {
        self.table.try_reserve(size_hint, |&(k, _)| {
            hash_int(&self.hash_builder, k.to_u64())
        })
    }

    /// Inserts a key-value pair unless the key is already present, and
    /// returns the stored key. An existing value is never replaced; the
    /// supplied one is dropped instead.
    pub fn insert(&mut self, key: K, value: V) -> &K {
        let hash = self.hash(key);
        match self.table.entry(
            hash,
            |&(k, _)| k == key,
            |&(k, _)| hash_int(&self.hash_builder, k.to_u64()),
        ) {
            Entry::Occupied(entry) => &entry.into_mut().0,
            Entry::Vacant(entry) => &entry.insert((key, value)).0,
        }
    }

    /// Returns a reference to the value stored under `key`.
    pub fn get(&self, key: K) -> Option<&V> {
        self.table
            .find(self.hash(key), |&(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns the stored key and its value.
    pub fn get_key_value(&self, key: K) -> Option<(&K, &V)> {
        self.table
            .find(self.hash(key), |&(k, _)| k == key)
            .map(|(k, v)| (k, v))
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        let hash = self.hash(key);
        self.table
            .find_mut(hash, |&(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Returns an iterator over key-value pairs in physical slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.table.iter())
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.table.iter())
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.table.iter())
    }

    /// Returns the probe-length histogram of the underlying table.
    #[cfg(feature = "stats")]
    pub fn probe_histogram(&self) -> crate::hash_table::ProbeHistogram {
        self.table
            .probe_histogram(|&(k, _)| hash_int(&self.hash_builder, k.to_u64()))
    }

    /// Returns utilization statistics of the underlying table.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }
}

impl<K, V, S> IntMap<K, V, S>
where
    K: IntKey,
    S: BuildHasher + Default,
{
    /// Creates an empty map using the default hasher builder.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty map able to hold `capacity` entries without resizing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S> Default for IntMap<K, V, S>
where
    K: IntKey,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> IntoIterator for IntMap<K, V, S> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.table.into_iter())
    }
}

impl<'a, K, V, S> IntoIterator for &'a IntMap<K, V, S>
where
    K: IntKey,
    S: BuildHasher,
{
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> FromIterator<(K, V)> for IntMap<K, V, S>
where
    K: IntKey,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = IntMap::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S> Extend<(K, V)> for IntMap<K, V, S>
where
    K: IntKey,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.reserve(self.len().saturating_add(lower));
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}
