use alloc::string::String;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ptr::NonNull;

use crate::control::BitMask;
use crate::control::Control;
use crate::control::DELETED;
use crate::control::EMPTY;
use crate::control::GROUP_WIDTH;
use crate::control::Group;
use crate::error::TryReserveError;
use crate::error::infallible;
use crate::hasher::h2;
use crate::probe::ProbeSeq;

/// Maximum number of occupied slots (live entries plus tombstones) for a
/// table with `slots` slots: 7/8 of the table. `slots` is always a multiple
/// of `GROUP_WIDTH`, so the division is exact.
#[inline(always)]
fn max_load(slots: usize) -> usize {
    slots / 8 * 7
}

/// Smallest power-of-two slot count, at least one group, that holds
/// `entries` entries under the load threshold.
fn slots_for(entries: usize) -> Result<usize, TryReserveError> {
    let adjusted = entries
        .checked_mul(8)
        .ok_or(TryReserveError::CapacityOverflow)?
        .div_ceil(7);
    adjusted
        .max(GROUP_WIDTH)
        .checked_next_power_of_two()
        .ok_or(TryReserveError::CapacityOverflow)
}

/// Control bytes and slots share one allocation: `slots` control bytes
/// aligned to a group, followed by the slot array.
#[derive(Debug)]
struct DataLayout {
    layout: Layout,
    slots_offset: usize,
}

impl DataLayout {
    fn new<T>(slots: usize) -> Result<Self, TryReserveError> {
        let ctrl_layout = Layout::from_size_align(slots, GROUP_WIDTH)
            .map_err(|_| TryReserveError::CapacityOverflow)?;
        let slots_layout =
            Layout::array::<T>(slots).map_err(|_| TryReserveError::CapacityOverflow)?;
        let (layout, slots_offset) = ctrl_layout
            .extend(slots_layout)
            .map_err(|_| TryReserveError::CapacityOverflow)?;

        Ok(DataLayout {
            layout: layout.pad_to_align(),
            slots_offset,
        })
    }

    /// Allocates the block with every control byte set to `EMPTY`.
    fn allocate(&self, slots: usize) -> Result<NonNull<u8>, TryReserveError> {
        debug_assert!(self.layout.size() >= slots && slots > 0);
        // SAFETY: The layout is non-zero sized since it holds at least one group
        // of control bytes, and the control bytes written are inside the block.
        unsafe {
            let raw_alloc = alloc::alloc::alloc(self.layout);
            let Some(alloc) = NonNull::new(raw_alloc) else {
                return Err(TryReserveError::AllocError {
                    layout: self.layout,
                });
            };
            core::ptr::write_bytes(raw_alloc, EMPTY, slots);
            Ok(alloc)
        }
    }
}

/// A raw SwissTable: open addressing over groups of 16 control bytes.
///
/// `HashTable<T>` stores values of type `T` and leaves hashing and equality
/// to the caller: every lookup takes the value's 64-bit digest and an
/// equality predicate, and every operation that may grow the table also takes
/// a closure that recomputes the digest of a stored value. The digest's low
/// seven bits are kept in the slot's control byte and filter candidates before
/// the predicate runs; the remaining bits choose the first group of a
/// triangular probe sequence.
///
/// There is no removal. Entries stay put until the table is resized, which
/// only happens while inserting or reserving and moves every entry.
///
/// ## Performance Characteristics
///
/// - **Memory**: 1 byte per slot overhead plus the size of `T`, at a load
///   factor of at most 7/8.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hasher;
/// #
/// # use siphasher::sip::SipHasher;
/// # use swiss_hash::hash_table::Entry;
/// # use swiss_hash::hash_table::HashTable;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     hasher.write_u64(id);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::with_capacity(100);
/// let hash = hash_id(123);
///
/// match table.entry(hash, |p: &Person| p.id == 123, |p: &Person| hash_id(p.id)) {
///     Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
///
/// assert_eq!(table.find(hash, |p| p.id == 123).unwrap().name, "Alice");
/// ```
pub struct HashTable<T> {
    layout: DataLayout,
    alloc: NonNull<u8>,

    bucket_mask: usize,
    populated: usize,
    tombstones: usize,

    _phantom: PhantomData<T>,
}

// SAFETY: The table owns its values exactly like a `Vec<T>` would.
unsafe impl<T: Send> Send for HashTable<T> {}
// SAFETY: Shared access only hands out shared references to values.
unsafe impl<T: Sync> Sync for HashTable<T> {}

impl<T> Debug for HashTable<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::ToString;

        let ctrl = (0..self.num_groups())
            .map(|group| {
                (0..GROUP_WIDTH)
                    .map(|offset| {
                        // SAFETY: `group * GROUP_WIDTH + offset` is below `slots()`.
                        let byte = unsafe { self.ctrl(group * GROUP_WIDTH + offset) };
                        match Control::from_byte(byte) {
                            Control::Empty => "..".to_string(),
                            Control::Tombstone => "xx".to_string(),
                            Control::Present(tag) => format!("{tag:02x}"),
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect::<Vec<String>>();

        f.debug_struct("HashTable")
            .field("ctrl", &ctrl)
            .field("populated", &self.populated)
            .field("tombstones", &self.tombstones)
            .field("slots", &self.slots())
            .finish()
    }
}

impl<T> Clone for HashTable<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        let mut new_table = infallible(Self::try_with_slots(self.slots()));

        // SAFETY: Both tables have the same slot count, so every index is in
        // bounds for both. Control bytes are published only after the matching
        // slot is written, so a panicking `clone` leaves `new_table` with only
        // initialized live slots for its `Drop` to visit.
        unsafe {
            if self.tombstones > 0 {
                for index in 0..self.slots() {
                    if self.ctrl(index) == DELETED {
                        new_table.set_ctrl(index, DELETED);
                    }
                }
                new_table.tombstones = self.tombstones;
            }

            for index in self.raw_iter() {
                let value = (*self.slot(index)).clone();
                new_table.slot(index).write(value);
                new_table.set_ctrl(index, self.ctrl(index));
                new_table.populated += 1;
            }
        }

        debug_assert_eq!(new_table.populated, self.populated);
        new_table
    }
}

impl<T> Drop for HashTable<T> {
    fn drop(&mut self) {
        // SAFETY: Only slots with a live control byte are dropped, and the
        // allocation is released exactly once.
        unsafe {
            if core::mem::needs_drop::<T>() && self.populated > 0 {
                for index in self.raw_iter() {
                    core::ptr::drop_in_place(self.slot(index));
                }
            }
            self.free_buckets();
        }
    }
}

impl<T> Default for HashTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HashTable<T> {
    /// Creates an empty table with the minimal capacity of one group.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new hash table that can hold at least `capacity` values
    /// without resizing.
    ///
    /// # Panics
    ///
    /// Panics if the required size overflows, and aborts through
    /// [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// allocator fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_hash::hash_table::HashTable;
    /// #
    /// // Create a table that can hold at least 100 items without resizing
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// assert!(table.slots().is_power_of_two());
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        infallible(Self::try_with_capacity(capacity))
    }

    /// Fallible version of [`with_capacity`](Self::with_capacity).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_hash::TryReserveError;
    /// # use swiss_hash::hash_table::HashTable;
    /// #
    /// assert!(HashTable::<u64>::try_with_capacity(10).is_ok());
    /// assert_eq!(
    ///     HashTable::<u64>::try_with_capacity(usize::MAX).unwrap_err(),
    ///     TryReserveError::CapacityOverflow
    /// );
    /// ```
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        Self::try_with_slots(slots_for(capacity)?)
    }

    fn try_with_slots(slots: usize) -> Result<Self, TryReserveError> {
        debug_assert!(slots.is_power_of_two() && slots >= GROUP_WIDTH);

        let layout = DataLayout::new::<T>(slots)?;
        let alloc = layout.allocate(slots)?;

        Ok(Self {
            layout,
            alloc,
            bucket_mask: slots - 1,
            populated: 0,
            tombstones: 0,
            _phantom: PhantomData,
        })
    }

    /// Releases the backing allocation without touching any slot.
    ///
    /// # Safety
    ///
    /// Must be called at most once, and the table must not be used afterwards
    /// other than being forgotten.
    unsafe fn free_buckets(&mut self) {
        // SAFETY: `alloc` was allocated with `layout` in `DataLayout::allocate`.
        unsafe { alloc::alloc::dealloc(self.alloc.as_ptr(), self.layout.layout) }
    }

    #[inline(always)]
    fn ctrl_ptr(&self) -> *mut u8 {
        self.alloc.as_ptr()
    }

    /// Read the control byte at `index`
    ///
    /// # Safety
    ///
    /// The caller must ensure `index < self.slots()`.
    #[inline(always)]
    unsafe fn ctrl(&self, index: usize) -> u8 {
        debug_assert!(index <= self.bucket_mask);
        // SAFETY: Caller ensures `index` is within the control bytes.
        unsafe { *self.ctrl_ptr().add(index) }
    }

    /// Write the control byte at `index`
    ///
    /// # Safety
    ///
    /// The caller must ensure `index < self.slots()`.
    #[inline(always)]
    unsafe fn set_ctrl(&mut self, index: usize, ctrl: u8) {
        debug_assert!(index <= self.bucket_mask);
        // SAFETY: Caller ensures `index` is within the control bytes.
        unsafe { *self.ctrl_ptr().add(index) = ctrl }
    }

    /// Pointer to the slot at `index`
    ///
    /// # Safety
    ///
    /// The caller must ensure `index < self.slots()`. The slot is only
    /// initialized if its control byte is live.
    #[inline(always)]
    unsafe fn slot(&self, index: usize) -> *mut T {
        debug_assert!(index <= self.bucket_mask);
        // SAFETY: Caller ensures `index` is within the slot array, which starts
        // at `slots_offset` inside the allocation.
        unsafe {
            self.alloc
                .as_ptr()
                .add(self.layout.slots_offset)
                .cast::<T>()
                .add(index)
        }
    }

    /// Load the control group with index `group`
    ///
    /// # Safety
    ///
    /// The caller must ensure `group < self.num_groups()`.
    #[inline(always)]
    unsafe fn group(&self, group: usize) -> Group {
        // SAFETY: The group lies inside the control bytes, which start at the
        // group-aligned beginning of the allocation.
        unsafe { Group::load(self.ctrl_ptr().add(group * GROUP_WIDTH)) }
    }

    #[inline(always)]
    fn num_groups(&self) -> usize {
        (self.bucket_mask + 1) / GROUP_WIDTH
    }

    #[inline(always)]
    fn group_mask(&self) -> usize {
        self.num_groups() - 1
    }

    #[inline(always)]
    fn growth_left(&self) -> usize {
        max_load(self.slots()) - self.populated - self.tombstones
    }

    fn raw_iter(&self) -> RawIter {
        RawIter::new(self.ctrl_ptr(), self.num_groups(), self.populated)
    }

    /// Returns the number of elements in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<i32> = HashTable::with_capacity(10);
    /// assert!(table.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of elements the table can hold before it needs to
    /// resize.
    ///
    /// This is 7/8 of [`slots`](Self::slots). Tombstones also count against
    /// it until the next resize.
    pub fn capacity(&self) -> usize {
        max_load(self.slots())
    }

    /// Returns the total number of slots, always a power of two and a whole
    /// number of groups.
    pub fn slots(&self) -> usize {
        self.bucket_mask + 1
    }

    /// Returns the number of vacated slots waiting to be cleared by the next
    /// resize.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Returns an iterator over all values in the table.
    ///
    /// The iterator yields `&V` references in physical slot order, which is
    /// unrelated to insertion order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hasher;
    /// #
    /// # use siphasher::sip::SipHasher;
    /// # use swiss_hash::hash_table::HashTable;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     hasher.write_u64(n);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// for n in [3u64, 1, 2] {
    ///     table
    ///         .entry(hash_u64(n), |&v: &u64| v == n, |&v: &u64| hash_u64(v))
    ///         .or_insert(n);
    /// }
    ///
    /// let mut values: Vec<u64> = table.iter().copied().collect();
    /// values.sort();
    /// assert_eq!(values, [1, 2, 3]);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            table: self,
            raw: self.raw_iter(),
        }
    }

    #[inline]
    fn find_index(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<usize> {
        let tag = h2(hash);
        for group in ProbeSeq::new(hash, self.group_mask()).take(self.num_groups()) {
            // SAFETY: The probe sequence yields masked group indices.
            let ctrl = unsafe { self.group(group) };
            let base = group * GROUP_WIDTH;

            for bit in ctrl.match_tag(tag) {
                let index = base + bit;
                // SAFETY: A matching tag marks an initialized slot.
                if eq(unsafe { &*self.slot(index) }) {
                    return Some(index);
                }
            }

            if ctrl.match_empty().any_bit_set() {
                return None;
            }
        }

        None
    }

    /// Searches for a matching value and, on a miss, also reports the first
    /// `EMPTY` or `DELETED` slot seen along the probe sequence.
    #[inline]
    fn find_or_find_insert_slot(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Result<usize, usize> {
        let tag = h2(hash);
        let mut insert_slot = None;

        for group in ProbeSeq::new(hash, self.group_mask()).take(self.num_groups()) {
            // SAFETY: The probe sequence yields masked group indices.
            let ctrl = unsafe { self.group(group) };
            let base = group * GROUP_WIDTH;

            for bit in ctrl.match_tag(tag) {
                let index = base + bit;
                // SAFETY: A matching tag marks an initialized slot.
                if eq(unsafe { &*self.slot(index) }) {
                    return Ok(index);
                }
            }

            if insert_slot.is_none() {
                insert_slot = ctrl
                    .match_empty_or_deleted()
                    .lowest_set_bit()
                    .map(|bit| base + bit);
            }

            if ctrl.match_empty().any_bit_set() {
                break;
            }
        }

        match insert_slot {
            Some(index) => Err(index),
            None => unreachable!("hash table has no free slot"),
        }
    }

    /// Finds the first `EMPTY` or `DELETED` slot on the probe sequence of
    /// `hash`.
    #[inline]
    fn find_insert_slot(&self, hash: u64) -> usize {
        for group in ProbeSeq::new(hash, self.group_mask()).take(self.num_groups()) {
            // SAFETY: The probe sequence yields masked group indices.
            let ctrl = unsafe { self.group(group) };
            if let Some(bit) = ctrl.match_empty_or_deleted().lowest_set_bit() {
                return group * GROUP_WIDTH + bit;
            }
        }

        unreachable!("hash table has no free slot")
    }

    /// Finds a value in the table by hash and equality predicate.
    ///
    /// Returns a reference to the value if found, or `None` once the probe
    /// sequence reaches a group containing an `EMPTY` slot.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hasher;
    /// #
    /// # use siphasher::sip::SipHasher;
    /// # use swiss_hash::hash_table::HashTable;
    /// #
    /// # fn hash_u64(n: u64) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     hasher.write_u64(n);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table
    ///     .entry(hash_u64(42), |&n: &u64| n == 42, |&n: &u64| hash_u64(n))
    ///     .or_insert(42);
    ///
    /// assert_eq!(table.find(hash_u64(42), |&n| n == 42), Some(&42));
    /// assert_eq!(table.find(hash_u64(99), |&n| n == 99), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<&T> {
        let index = self.find_index(hash, eq)?;
        // SAFETY: `find_index` only returns live slots.
        Some(unsafe { &*self.slot(index) })
    }

    /// Finds a value in the table and returns a mutable reference to it.
    ///
    /// The part of the value that determines its hash must not be changed.
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<&mut T> {
        let index = self.find_index(hash, eq)?;
        // SAFETY: `find_index` only returns live slots.
        Some(unsafe { &mut *self.slot(index) })
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// On a miss, the returned [`VacantEntry`] has already claimed the first
    /// free slot on the probe sequence, preferring an earlier tombstone over a
    /// later `EMPTY` slot. If claiming an `EMPTY` slot would exceed the load
    /// threshold, the table is resized first, using `hasher` to recompute the
    /// digest of every stored value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hasher;
    /// #
    /// # use siphasher::sip::SipHasher;
    /// # use swiss_hash::hash_table::Entry;
    /// # use swiss_hash::hash_table::HashTable;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     hasher.write(s.as_bytes());
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table: HashTable<String> = HashTable::new();
    /// let rehash = |s: &String| hash_str(s);
    ///
    /// match table.entry(hash_str("hello"), |s| s == "hello", rehash) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// assert!(matches!(
    ///     table.entry(hash_str("hello"), |s| s == "hello", rehash),
    ///     Entry::Occupied(_)
    /// ));
    /// ```
    #[inline]
    pub fn entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&T) -> bool,
        hasher: impl Fn(&T) -> u64,
    ) -> Entry<'_, T> {
        match self.find_or_find_insert_slot(hash, eq) {
            Ok(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            Err(mut index) => {
                // SAFETY: `index` came from the probe sequence.
                if unsafe { self.ctrl(index) } == EMPTY && self.growth_left() == 0 {
                    self.reserve(self.populated + 1, hasher);
                    index = self.find_insert_slot(hash);
                }

                Entry::Vacant(VacantEntry {
                    table: self,
                    index,
                    hash,
                })
            }
        }
    }

    /// Ensures the table can hold `size_hint` values in total without
    /// resizing.
    ///
    /// Unlike `Vec::reserve`, the hint is a total count, not an additional
    /// one. Does nothing if the table is already large enough; otherwise
    /// resizes to the smallest power-of-two slot count that fits the hint.
    /// The table never shrinks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.reserve(1000, |&v| v);
    /// assert!(table.capacity() >= 1000);
    ///
    /// let slots = table.slots();
    /// table.reserve(10, |&v| v);
    /// assert_eq!(table.slots(), slots);
    /// ```
    pub fn reserve(&mut self, size_hint: usize, hasher: impl Fn(&T) -> u64) {
        infallible(self.try_reserve(size_hint, hasher))
    }

    /// Fallible version of [`reserve`](Self::reserve).
    ///
    /// On error the table is left unchanged.
    pub fn try_reserve(
        &mut self,
        size_hint: usize,
        hasher: impl Fn(&T) -> u64,
    ) -> Result<(), TryReserveError> {
        if size_hint <= self.populated + self.growth_left() {
            return Ok(());
        }

        let slots = slots_for(size_hint)?;
        debug_assert!(slots >= self.slots());
        log::trace!("reserving room for {size_hint} entries in {slots} slots");
        self.resize(slots, hasher)
    }

    /// Moves every live value into a fresh allocation of `slots` slots,
    /// dropping all tombstones.
    #[cold]
    #[inline(never)]
    fn resize(&mut self, slots: usize, hasher: impl Fn(&T) -> u64) -> Result<(), TryReserveError> {
        let mut new_table = ResizeGuard(ManuallyDrop::new(Self::try_with_slots(slots)?));

        // SAFETY: Values are copied bitwise into free slots of the new table. The
        // old table keeps ownership until the swap below, so if `hasher` panics
        // the guard releases only the new allocation and `self` is untouched.
        unsafe {
            for index in self.raw_iter() {
                let value = self.slot(index);
                let hash = hasher(&*value);
                let target = new_table.0.find_insert_slot(hash);
                new_table.0.set_ctrl(target, h2(hash));
                core::ptr::copy_nonoverlapping(value, new_table.0.slot(target), 1);
            }
        }
        new_table.0.populated = self.populated;

        log::trace!(
            "resized hash table from {} to {} slots ({} entries, {} tombstones dropped)",
            self.slots(),
            slots,
            self.populated,
            self.tombstones
        );

        let mut old_table = core::mem::replace(self, new_table.into_inner());
        // SAFETY: Every live value now belongs to `self`; the old block is freed
        // without running any destructor.
        unsafe { old_table.free_buckets() };
        core::mem::forget(old_table);

        Ok(())
    }

    /// Turns the live slot holding the matching value into a tombstone.
    #[cfg(test)]
    pub(crate) fn make_tombstone(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<T> {
        let index = self.find_index(hash, eq)?;
        self.populated -= 1;
        self.tombstones += 1;
        // SAFETY: `index` is a live slot; after this it is marked vacant.
        unsafe {
            self.set_ctrl(index, DELETED);
            Some(self.slot(index).read())
        }
    }

    /// Computes a histogram of probe lengths for the current table state.
    ///
    /// Bin `n` counts the entries stored `n` steps along their probe sequence,
    /// so bin 0 holds every entry that landed in its home group.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self, hasher: impl Fn(&T) -> u64) -> ProbeHistogram {
        let mut counts = alloc::vec![0usize; 1];

        for index in self.raw_iter() {
            // SAFETY: `raw_iter` yields live slots only.
            let hash = hasher(unsafe { &*self.slot(index) });
            let home = index / GROUP_WIDTH;
            let distance = ProbeSeq::new(hash, self.group_mask())
                .take(self.num_groups())
                .position(|group| group == home);
            debug_assert!(distance.is_some(), "entry stored off its probe sequence");

            let distance = distance.unwrap_or(self.num_groups());
            if counts.len() <= distance {
                counts.resize(distance + 1, 0);
            }
            counts[distance] += 1;
        }

        ProbeHistogram {
            counts,
            populated: self.populated,
        }
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        DebugStats {
            populated: self.populated,
            tombstones: self.tombstones,
            capacity: self.capacity(),
            slots: self.slots(),
            load_factor: self.populated as f64 / self.slots() as f64,
            total_bytes: self.layout.layout.size(),
            wasted_bytes: (self.slots() - self.populated) * core::mem::size_of::<T>(),
        }
    }
}

/// Owns the table under construction during a resize. Dropping it frees the
/// allocation without dropping any slot, because the slots are bitwise copies
/// of values still owned by the old table.
struct ResizeGuard<T>(ManuallyDrop<HashTable<T>>);

impl<T> ResizeGuard<T> {
    fn into_inner(self) -> HashTable<T> {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: The guard is never dropped, so the table is taken exactly once.
        unsafe { ManuallyDrop::take(&mut this.0) }
    }
}

impl<T> Drop for ResizeGuard<T> {
    fn drop(&mut self) {
        // SAFETY: The table is not used after the guard is dropped.
        unsafe { self.0.free_buckets() }
    }
}

/// Probe-length distribution of a table.
///
/// Available with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    counts: Vec<usize>,
    populated: usize,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Entry counts indexed by probe length in groups.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// The longest probe length of any entry.
    pub fn max_probe_length(&self) -> usize {
        self.counts.iter().rposition(|&c| c > 0).unwrap_or(0)
    }

    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.counts.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("probe histogram ({} entries):", self.populated);

        let make_bar = |count: usize| -> String {
            if count == 0 {
                return String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉'][units % 8];
            if partial != ' ' {
                bar.push(partial);
            }
            bar
        };

        for (length, &count) in self.counts.iter().enumerate() {
            println!("{:>3} | {} ({})", length, make_bar(count), count);
        }
    }
}

/// Debug statistics for hash table analysis.
///
/// Available with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live entries
    pub populated: usize,
    /// Number of tombstones awaiting the next resize
    pub tombstones: usize,
    /// Maximum live entries before a resize
    pub capacity: usize,
    /// Total number of slots allocated
    pub slots: usize,
    /// Live entries divided by slots
    pub load_factor: f64,
    /// Total memory in bytes used by the table
    pub total_bytes: usize,
    /// Bytes of slot storage not holding a live entry
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} slots ({:.2}% load factor, capacity {})",
            self.populated,
            self.slots,
            self.load_factor * 100.0,
            self.capacity
        );
        println!("Tombstones: {}", self.tombstones);
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, T> {
    /// The table already holds a matching value.
    Occupied(OccupiedEntry<'a, T>),
    /// No matching value; a free slot has been reserved for one.
    Vacant(VacantEntry<'a, T>),
}

impl<'a, T> Entry<'a, T> {
    /// Inserts `default` if the entry is vacant and returns a mutable reference
    /// to the value in the entry. An occupied entry is left unchanged.
    pub fn or_insert(self, default: T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value in the entry.
    pub fn or_insert_with(self, default: impl FnOnce() -> T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify(self, f: impl FnOnce(&mut T)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }
}

impl<'a, T> Entry<'a, T>
where
    T: Default,
{
    /// Inserts `T::default()` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_default(self) -> &'a mut T {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in a [`HashTable`].
pub struct VacantEntry<'a, T> {
    table: &'a mut HashTable<T>,
    index: usize,
    hash: u64,
}

impl<'a, T> VacantEntry<'a, T> {
    /// Stores `value` in the reserved slot and returns a mutable reference to
    /// it.
    pub fn insert(self, value: T) -> &'a mut T {
        // SAFETY: `index` is a free slot found on the probe sequence of `hash`,
        // and the table has not been modified since the entry was created.
        unsafe {
            let ctrl = self.table.ctrl(self.index);
            debug_assert!(ctrl == EMPTY || ctrl == DELETED);
            if ctrl == DELETED {
                self.table.tombstones -= 1;
            }

            self.table.set_ctrl(self.index, h2(self.hash));
            self.table.populated += 1;
            debug_assert!(self.table.populated + self.table.tombstones <= self.table.capacity());

            let slot = self.table.slot(self.index);
            slot.write(value);
            &mut *slot
        }
    }
}

/// A view into an occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, T> {
    table: &'a mut HashTable<T>,
    index: usize,
}

impl<'a, T> OccupiedEntry<'a, T> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &T {
        // SAFETY: The entry points at a live slot.
        unsafe { &*self.table.slot(self.index) }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut T {
        // SAFETY: The entry points at a live slot.
        unsafe { &mut *self.table.slot(self.index) }
    }

    /// Converts the entry into a mutable reference with the table's lifetime.
    pub fn into_mut(self) -> &'a mut T {
        // SAFETY: The entry points at a live slot.
        unsafe { &mut *self.table.slot(self.index) }
    }
}

/// Walks the control bytes group by group, yielding the index of every live
/// slot until `items` have been produced.
#[derive(Clone)]
struct RawIter {
    ctrl: *const u8,
    next_group: usize,
    num_groups: usize,
    base: usize,
    current: BitMask,
    items: usize,
}

impl RawIter {
    fn new(ctrl: *const u8, num_groups: usize, items: usize) -> Self {
        RawIter {
            ctrl,
            next_group: 0,
            num_groups,
            base: 0,
            current: BitMask(0),
            items,
        }
    }
}

impl Iterator for RawIter {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.items == 0 {
            return None;
        }

        loop {
            if let Some(bit) = self.current.next() {
                self.items -= 1;
                return Some(self.base + bit);
            }

            if self.next_group >= self.num_groups {
                debug_assert!(false, "live entry count exceeds live control bytes");
                return None;
            }

            self.base = self.next_group * GROUP_WIDTH;
            // SAFETY: `next_group < num_groups`, so the group is in bounds.
            self.current = unsafe { Group::load(self.ctrl.add(self.base)) }.match_full();
            self.next_group += 1;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.items, Some(self.items))
    }
}

/// An iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`]. The table
/// cannot be modified while the iterator is alive, so every live value is
/// yielded exactly once.
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, T> {
    table: &'a HashTable<T>,
    raw: RawIter,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            table: self.table,
            raw: self.raw.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let index = self.raw.next()?;
        // SAFETY: `raw` yields live slots only.
        Some(unsafe { &*self.table.slot(index) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<T> {
    table: HashTable<T>,
    raw: RawIter,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.raw.next()?;
        // SAFETY: `raw` yields live slots only. The slot is marked empty before
        // its value is moved out so the table's `Drop` skips it.
        unsafe {
            self.table.set_ctrl(index, EMPTY);
            self.table.populated -= 1;
            Some(self.table.slot(index).read())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> FusedIterator for IntoIter<T> {}

impl<T> IntoIterator for HashTable<T> {
    type IntoIter = IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        let raw = self.raw_iter();
        IntoIter { table: self, raw }
    }
}

impl<'a, T> IntoIterator for &'a HashTable<T> {
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
