use core::fmt::Debug;
use core::hash::BuildHasher;
use core::iter::FusedIterator;

use crate::DefaultHashBuilder;
use crate::TryReserveError;
use crate::hash_table::Entry;
use crate::hash_table::HashTable;
use crate::hasher::hash_bytes;

/// A map from byte-buffer keys to values, backed by a [`HashTable`].
///
/// `HashMap<K, V, S>` compares keys byte-for-byte through `K: AsRef<[u8]>` and
/// hashes them with a configurable hasher builder `S`. Inserting never
/// overwrites: the first value stored under a key stays until the map is
/// dropped, and [`insert`](Self::insert) hands back the key that is actually
/// stored so callers can tell a new entry from an existing one.
///
/// With `K = &[u8]` (see [`BorrowedHashMap`]) the map stores references only.
///
/// # Performance Characteristics
///
/// - **Memory**: 1 byte per slot overhead, plus the size of `(K, V)`.
#[derive(Clone)]
pub struct HashMap<K, V, S = DefaultHashBuilder> {
    table: HashTable<(K, V)>,
    hash_builder: S,
}

/// A [`HashMap`] that borrows its keys.
pub type BorrowedHashMap<'k, V, S = DefaultHashBuilder> = HashMap<&'k [u8], V, S>;

impl<K, V, S> Debug for HashMap<K, V, S>
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

impl<K, V, S> HashMap<K, V, S>
where
    K: AsRef<[u8]>,
    S: BuildHasher,
{
    /// Creates an empty map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use swiss_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<&[u8], i32, _> = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// ```
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

    /// Ensures the map can hold `size_hint` entries in total without
    /// resizing. Does nothing if it already can.
    pub fn reserve(&mut self, size_hint: usize) {
        self.table
            .reserve(size_hint, |(k, _)| hash_bytes(&self.hash_builder, k.as_ref()));
    }

    /// Fallible version of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, size_hint: usize) -> Result<(), TryReserveError> {
        self.table
            .try_reserve(size_hint, |(k, _)| hash_bytes(&self.hash_builder, k.as_ref()))
    }

    /// Inserts a key-value pair unless the key is already present, and
    /// returns the stored key.
    ///
    /// On an existing key the stored value is left unchanged and both `key`
    /// and `value` are dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let mut map: HashMap<&str, i32> = HashMap::new();
    /// assert_eq!(*map.insert("x", 1), "x");
    /// map.insert("x", 2);
    ///
    /// assert_eq!(map.get("x"), Some(&1));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> &K {
        let hash = hash_bytes(&self.hash_builder, key.as_ref());
        match self.table.entry(
            hash,
            |(k, _)| k.as_ref() == key.as_ref(),
            |(k, _)| hash_bytes(&self.hash_builder, k.as_ref()),
        ) {
            Entry::Occupied(entry) => &entry.into_mut().0,
            Entry::Vacant(entry) => &entry.insert((key, value)).0,
        }
    }

    /// Returns a reference to the value stored under `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let mut map: HashMap<Vec<u8>, &str> = HashMap::new();
    /// map.insert(b"x".to_vec(), "value1");
    ///
    /// assert_eq!(map.get(b"x"), Some(&"value1"));
    /// assert_eq!(map.get(b"y"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and its value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        let key = key.as_ref();
        let hash = hash_bytes(&self.hash_builder, key);
        self.table
            .find(hash, |(k, _)| k.as_ref() == key)
            .map(|(k, v)| (k, v))
    }

    /// Returns a mutable reference to the value stored under `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let mut map: HashMap<&str, u32> = HashMap::new();
    /// map.insert("hits", 0);
    /// *map.get_mut("hits").unwrap() += 1;
    /// assert_eq!(map.get("hits"), Some(&1));
    /// ```
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        let key = key.as_ref();
        let hash = hash_bytes(&self.hash_builder, key);
        self.table
            .find_mut(hash, |(k, _)| k.as_ref() == key)
            .map(|(_, v)| v)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        self.get_key_value(key).is_some()
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
            .probe_histogram(|(k, _)| hash_bytes(&self.hash_builder, k.as_ref()))
    }

    /// Returns utilization statistics of the underlying table.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: AsRef<[u8]>,
    S: BuildHasher + Default,
{
    /// Creates an empty map using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashMap;
    ///
    /// let map: HashMap<String, i32> = HashMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty map able to hold `capacity` entries without resizing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    K: AsRef<[u8]>,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// An iterator over the entries of a map.
pub struct Iter<'a, K, V> {
    inner: crate::hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(inner: crate::hash_table::Iter<'a, (K, V)>) -> Self {
        Self { inner }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// An iterator over the keys of a map.
pub struct Keys<'a, K, V> {
    inner: crate::hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn new(inner: crate::hash_table::Iter<'a, (K, V)>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// An iterator over the values of a map.
pub struct Values<'a, K, V> {
    inner: crate::hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) fn new(inner: crate::hash_table::Iter<'a, (K, V)>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// A consuming iterator over the entries of a map.
pub struct IntoIter<K, V> {
    inner: crate::hash_table::IntoIter<(K, V)>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(inner: crate::hash_table::IntoIter<(K, V)>) -> Self {
        Self { inner }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V, S> IntoIterator for HashMap<K, V, S> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.table.into_iter())
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashMap<K, V, S>
where
    K: AsRef<[u8]>,
    S: BuildHasher,
{
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: AsRef<[u8]>,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HashMap::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S> Extend<(K, V)> for HashMap<K, V, S>
where
    K: AsRef<[u8]>,
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

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::cell::Cell;
    use core::hash::BuildHasher;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use rand::rngs::SmallRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::MixState;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            Self {
                k1: OsRng.try_next_u64().unwrap_or(0),
                k2: OsRng.try_next_u64().unwrap_or(0),
            }
        }
    }

    #[test]
    fn insert_and_search() {
        let value1 = 0xC0FFEEu32;
        let mut map: BorrowedHashMap<'_, &u32, SipHashBuilder> = HashMap::new();

        let key = b"x";
        let stored = *map.insert(&key[..], &value1);
        assert!(core::ptr::eq(stored, &key[..]));

        let found = map.get(b"x").copied();
        assert!(found.is_some_and(|v| core::ptr::eq(v, &value1)));
        assert_eq!(map.get(b"y"), None);
        assert!(map.contains_key("x"));
        assert!(!map.contains_key("y"));
    }

    #[test]
    fn insert_never_overwrites() {
        let first = String::from("k");
        let second = String::from("k");
        let mut map = HashMap::with_hasher(SipHashBuilder::default());

        map.insert(first.as_str(), 1);
        let stored = *map.insert(second.as_str(), 2);

        assert!(core::ptr::eq(stored, first.as_str()));
        assert_eq!(map.get("k"), Some(&1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn rejected_value_is_dropped() {
        let drops = Rc::new(Cell::new(0));

        struct Tracked(Rc<Cell<usize>>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let mut map: HashMap<&str, Tracked, MixState> = HashMap::new();
        map.insert("a", Tracked(drops.clone()));
        map.insert("a", Tracked(drops.clone()));
        assert_eq!(drops.get(), 1);

        drop(map);
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn test_get_mut_and_key_value() {
        let mut map: HashMap<String, Vec<u32>, SipHashBuilder> = HashMap::new();
        map.insert("list".to_string(), Vec::new());

        map.get_mut("list").unwrap().push(1);
        map.get_mut("list").unwrap().push(2);
        assert!(map.get_mut("none").is_none());

        let (k, v) = map.get_key_value("list").unwrap();
        assert_eq!(k, "list");
        assert_eq!(v, &[1, 2]);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn values_survive_resizes() {
        let keys: Vec<Vec<u8>> = (0..5000u32).map(|i| i.to_le_bytes().to_vec()).collect();
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        for (i, key) in keys.iter().enumerate() {
            map.insert(key.as_slice(), i);
            assert!(map.len() <= map.capacity());
        }

        assert_eq!(map.len(), keys.len());
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(map.get(key), Some(&i));
        }
    }

    #[test]
    fn iterators_visit_each_entry_once() {
        let mut map = HashMap::with_hasher(SipHashBuilder::default());
        for i in 0..100u32 {
            map.insert(i.to_string(), i);
        }

        let iter = map.iter();
        assert_eq!(iter.len(), 100);
        let mut pairs: Vec<(u32, u32)> = iter.map(|(k, &v)| (k.parse().unwrap(), v)).collect();
        pairs.sort();
        assert_eq!(pairs, (0..100).map(|i| (i, i)).collect::<Vec<_>>());

        let mut values: Vec<u32> = map.values().copied().collect();
        values.sort();
        assert_eq!(values, (0..100).collect::<Vec<_>>());
        assert_eq!(map.keys().count(), 100);

        let mut owned: Vec<(String, u32)> = map.into_iter().collect();
        owned.sort_by_key(|(_, v)| *v);
        assert_eq!(owned[42], ("42".to_string(), 42));
    }

    #[test]
    fn test_reserve() {
        let mut map: HashMap<&str, (), SipHashBuilder> = HashMap::new();
        map.insert("a", ());
        map.reserve(1000);
        assert!(map.capacity() >= 1000);
        assert_eq!(map.get("a"), Some(&()));

        let capacity = map.capacity();
        map.reserve(1);
        assert_eq!(map.capacity(), capacity);
        assert!(map.try_reserve(usize::MAX).is_err());
    }

    #[test]
    fn randomized_against_model() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut map: HashMap<Vec<u8>, u64, SipHashBuilder> = HashMap::new();
        let mut model = alloc::collections::BTreeMap::new();

        for _ in 0..5000 {
            let len = rng.random_range(0..6usize);
            let key: Vec<u8> = (0..len).map(|_| rng.random_range(b'a'..=b'c')).collect();
            let value = rng.random::<u64>();
            map.insert(key.clone(), value);
            model.entry(key).or_insert(value);
        }

        assert_eq!(map.len(), model.len());
        for (key, value) in &model {
            assert_eq!(map.get(key), Some(value));
        }
    }

    #[test]
    fn test_from_iter_and_debug() {
        let map: HashMap<&str, i32, MixState> = [("one", 1), ("one", 9)].into_iter().collect();
        assert_eq!(map.len(), 1);
        assert_eq!(alloc::format!("{map:?}"), r#"{"one": 1}"#);
    }

    #[test]
    fn test_clone() {
        let mut map: HashMap<String, i32, SipHashBuilder> = HashMap::new();
        map.insert("a".to_string(), 1);
        let mut cloned = map.clone();
        *cloned.get_mut("a").unwrap() = 2;
        cloned.insert("b".to_string(), 3);

        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.len(), 1);
        assert_eq!(cloned.get("a"), Some(&2));
        assert_eq!(cloned.len(), 2);
    }
}
