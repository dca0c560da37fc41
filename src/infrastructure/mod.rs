//! Adapters implementing the domain ports.

pub mod clock;
pub(crate) mod constraints;
pub mod fs_blob;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
