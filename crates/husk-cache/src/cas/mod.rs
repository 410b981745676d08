//! Content-addressable package store

pub mod index;
pub mod store;

pub use index::{entry_key, PackageVersions, StoreEntry, StoreIndex, INDEX_FORMAT_VERSION};
pub use store::{CasStore, EntryMeta, PruneReport, StoreStatus};
