//! Storage contracts and built-in key-value backends for persisted token records.
//!
//! The manager talks to storage through [`TokenRecordStore`], a typed façade keyed by
//! principal id. Backends only implement [`KeyValueStore`]: they hold opaque JSON values
//! and never inspect them, so any external store (browser storage, a keyring, a
//! database row) can sit behind the manager.

pub mod file;
pub mod memory;
pub mod record;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::TokenRecordStore;

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Boxed future returned by [`KeyValueStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistent key-value collaborator that owns cached records.
pub trait KeyValueStore
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>>;

	/// Stores `value` under `key`, replacing any previous value.
	fn put<'a>(&'a self, key: &'a str, value: Value) -> StoreFuture<'a, ()>;

	/// Removes the value stored under `key`. Clearing a missing key succeeds.
	fn clear<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;

	/// Lists every key currently stored.
	fn keys<'a>(&'a self) -> StoreFuture<'a, Vec<String>>;
}

/// Error type produced by [`KeyValueStore`] implementations and the record façade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// A persisted value could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
