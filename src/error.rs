use core::alloc::Layout;
use core::fmt;

/// The error returned by the fallible allocation methods such as
/// [`HashTable::try_reserve`](crate::HashTable::try_reserve).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TryReserveError {
    /// The requested number of slots does not fit in `usize`, or the
    /// resulting allocation would exceed `isize::MAX` bytes.
    CapacityOverflow,

    /// The allocator refused the request.
    AllocError {
        /// The layout that could not be allocated.
        layout: Layout,
    },
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryReserveError::CapacityOverflow => {
                write!(f, "capacity overflow while sizing the hash table")
            }
            TryReserveError::AllocError { layout } => write!(
                f,
                "memory allocation of {} bytes (align {}) failed",
                layout.size(),
                layout.align()
            ),
        }
    }
}

impl core::error::Error for TryReserveError {}

/// Converts a fallible allocation result into the infallible behavior of the
/// non-`try_` methods: panic on arithmetic overflow, abort on allocator
/// failure.
#[inline]
pub(crate) fn infallible<T>(result: Result<T, TryReserveError>) -> T {
    match result {
        Ok(value) => value,
        Err(TryReserveError::CapacityOverflow) => panic!("capacity overflow"),
        Err(TryReserveError::AllocError { layout }) => alloc::alloc::handle_alloc_error(layout),
    }
}
