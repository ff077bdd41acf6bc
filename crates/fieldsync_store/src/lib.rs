//! # FieldSync Store
//!
//! Durable local storage for the FieldSync engine.
//!
//! This crate provides:
//! - [`StorageBackend`] — an opaque keyed byte store trait
//! - [`InMemoryBackend`] — for tests and ephemeral use
//! - [`FileBackend`] — one file per key with atomic, fsynced writes
//! - [`LocalStore`] — a typed wrapper with the engine's well-known keys
//!
//! Backends are **opaque byte stores**: the engine owns all
//! interpretation of what lives under each key.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
mod store;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
pub use store::{LocalStore, StoreKey};
