//! Concrete key-value store implementations.
//!
//! This module contains the storage adapters that implement the `KvStore`
//! trait defined in the domain layer.

pub mod memory;

pub use memory::MemoryKvStore;
