#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod control;
mod error;
mod hasher;
mod probe;

/// C-callable handles and functions for the set, map and integer map.
#[cfg(feature = "ffi")]
pub mod ffi;

/// A map from byte-buffer keys to values.
///
/// This module provides a `HashMap` that wraps the `HashTable`, hashes each
/// key's bytes with a configurable hasher builder and never overwrites a
/// stored value.
pub mod hash_map;

/// A set of byte-buffer keys.
///
/// This module provides a `HashSet` that wraps the `HashTable` and hands back
/// the stored key on every insert.
pub mod hash_set;

/// The raw SwissTable that backs every collection in this crate.
pub mod hash_table;

pub mod int_map;

pub use error::TryReserveError;
pub use hash_map::BorrowedHashMap;
pub use hash_map::HashMap;
pub use hash_set::BorrowedHashSet;
pub use hash_set::HashSet;
pub use hash_table::Entry;
pub use hash_table::HashTable;
pub use hasher::DefaultHashBuilder;
pub use hasher::MixHasher;
pub use hasher::MixState;
pub use int_map::IntKey;
pub use int_map::IntMap;
