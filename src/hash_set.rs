use core::fmt::Debug;
use core::hash::BuildHasher;
use core::iter::FusedIterator;

use crate::DefaultHashBuilder;
use crate::TryReserveError;
use crate::hash_table::Entry;
use crate::hash_table::HashTable;
use crate::hasher::hash_bytes;

/// A set of byte-buffer keys backed by a [`HashTable`].
///
/// Keys are anything that can be viewed as `[u8]` and are compared
/// byte-for-byte. With `K = &[u8]` (see [`BorrowedHashSet`]) the set stores
/// only references, and the borrow checker holds the caller to keeping the
/// bytes alive for as long as the set exists. Owning key types such as
/// `Vec<u8>`, `Box<[u8]>` or `String` move the bytes into the set instead.
///
/// There is no removal: a set only grows until it is dropped.
///
/// # Performance Characteristics
///
/// - **Memory**: 1 byte per slot overhead, plus the size of `K`.
#[derive(Clone)]
pub struct HashSet<K, S = DefaultHashBuilder> {
    table: HashTable<K>,
    hash_builder: S,
}

/// A [`HashSet`] that borrows its keys.
pub type BorrowedHashSet<'k, S = DefaultHashBuilder> = HashSet<&'k [u8], S>;

impl<K, S> Debug for HashSet<K, S>
where
    K: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.table.iter()).finish()
    }
}

impl<K, S> HashSet<K, S>
where
    K: AsRef<[u8]>,
    S: BuildHasher,
{
    /// Creates an empty set with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashSet;
    /// use swiss_hash::MixState;
    ///
    /// let set: HashSet<&[u8], _> = HashSet::with_hasher(MixState::with_seed(7));
    /// assert!(set.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates an empty set able to hold `capacity` keys without resizing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashSet;
    /// use swiss_hash::MixState;
    ///
    /// let set: HashSet<Vec<u8>, _> = HashSet::with_capacity_and_hasher(100, MixState::default());
    /// assert!(set.capacity() >= 100);
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Returns the number of keys in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no keys.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of keys the set can hold before it needs to resize.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Ensures the set can hold `size_hint` keys in total without resizing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashSet;
    ///
    /// let mut set: HashSet<&[u8]> = HashSet::new();
    /// set.reserve(500);
    /// assert!(set.capacity() >= 500);
    /// ```
    pub fn reserve(&mut self, size_hint: usize) {
        self.table
            .reserve(size_hint, |k| hash_bytes(&self.hash_builder, k.as_ref()));
    }

    /// Fallible version of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, size_hint: usize) -> Result<(), TryReserveError> {
        self.table
            .try_reserve(size_hint, |k| hash_bytes(&self.hash_builder, k.as_ref()))
    }

    /// Adds a key to the set and returns a reference to the stored key.
    ///
    /// If an equal key is already present it is returned unchanged and `key`
    /// is dropped, so comparing addresses tells an insert from a hit.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashSet;
    ///
    /// let first = String::from("a");
    /// let again = String::from("a");
    ///
    /// let mut set: HashSet<&[u8]> = HashSet::new();
    /// let stored = *set.insert(first.as_bytes());
    /// assert!(core::ptr::eq(stored, first.as_bytes()));
    ///
    /// let stored = *set.insert(again.as_bytes());
    /// assert!(core::ptr::eq(stored, first.as_bytes()));
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K) -> &K {
        let hash = hash_bytes(&self.hash_builder, key.as_ref());
        match self.table.entry(
            hash,
            |k| k.as_ref() == key.as_ref(),
            |k| hash_bytes(&self.hash_builder, k.as_ref()),
        ) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(key),
        }
    }

    /// Returns the stored key equal to `key`, if any.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashSet;
    ///
    /// let mut set: HashSet<String> = HashSet::new();
    /// set.insert("hello".to_string());
    /// assert_eq!(set.get("hello").map(String::as_str), Some("hello"));
    /// assert_eq!(set.get(b"world"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        let key = key.as_ref();
        let hash = hash_bytes(&self.hash_builder, key);
        self.table.find(hash, |k| k.as_ref() == key)
    }

    /// Returns `true` if the set contains `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: AsRef<[u8]> + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Returns an iterator over the keys in physical slot order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_hash::HashSet;
    ///
    /// let set: HashSet<&str> = ["x", "y", "z"].into_iter().collect();
    /// let mut keys: Vec<&str> = set.iter().copied().collect();
    /// keys.sort();
    /// assert_eq!(keys, ["x", "y", "z"]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns the probe-length histogram of the underlying table.
    #[cfg(feature = "stats")]
    pub fn probe_histogram(&self) -> crate::hash_table::ProbeHistogram {
        self.table
            .probe_histogram(|k| hash_bytes(&self.hash_builder, k.as_ref()))
    }

    /// Returns utilization statistics of the underlying table.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }
}

impl<K, S> HashSet<K, S>
where
    K: AsRef<[u8]>,
    S: BuildHasher + Default,
{
    /// Creates an empty set using the default hasher builder.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty set able to hold `capacity` keys without resizing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, S> Default for HashSet<K, S>
where
    K: AsRef<[u8]>,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// An iterator over the keys of a [`HashSet`].
#[derive(Clone)]
pub struct Iter<'a, K> {
    inner: crate::hash_table::Iter<'a, K>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}

impl<K> FusedIterator for Iter<'_, K> {}

/// A consuming iterator over the keys of a [`HashSet`].
pub struct IntoIter<K> {
    inner: crate::hash_table::IntoIter<K>,
}

impl<K> Iterator for IntoIter<K> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K> ExactSizeIterator for IntoIter<K> {}

impl<K, S> IntoIterator for HashSet<K, S> {
    type IntoIter = IntoIter<K>;
    type Item = K;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K, S> IntoIterator for &'a HashSet<K, S>
where
    K: AsRef<[u8]>,
    S: BuildHasher,
{
    type IntoIter = Iter<'a, K>;
    type Item = &'a K;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, S> FromIterator<K> for HashSet<K, S>
where
    K: AsRef<[u8]>,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = HashSet::new();
        set.extend(iter);
        set
    }
}

impl<K, S> Extend<K> for HashSet<K, S>
where
    K: AsRef<[u8]>,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.reserve(self.len().saturating_add(lower));
        for key in iter {
            self.insert(key);
        }
    }
}
