//! Query engine
//!
//! Read-only traversal, filtering, sorting, time-range search and result
//! projection over a storage snapshot.

pub mod filter;
pub mod listing;
pub mod operations;
pub mod period;
pub mod sort;

pub use filter::{Field, FieldFormat, InfoFilter, Modification};
pub use listing::{EntryInfo, Listing};
pub use operations::{
    files_from_period, list_all, list_contains, list_ext, list_files_with, list_full,
};
pub use period::{Period, parse_period};
pub use sort::{SortKey, SortOrder, parse_sort, sort_entries};
