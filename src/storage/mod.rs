//! Preference storage module
//!
//! This module contains the key-value store abstraction and the load/save
//! pair that moves the persisted timer preferences in and out of it.

pub mod kv;
pub mod persist;

// Re-export main types
pub use kv::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use persist::{load_persisted, save_persisted, STORAGE_KEY};
