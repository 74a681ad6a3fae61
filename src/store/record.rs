//! Typed façade that maps principal ids to persisted [`AccessTokenRecord`]s.

// self
use crate::{
	_prelude::*,
	auth::{AccessTokenRecord, PrincipalId},
	store::{KeyValueStore, StoreError},
};

/// Reads and writes token records through a [`KeyValueStore`], keyed by principal id.
///
/// No validation happens here: an expired record reads back like any other. Decoding
/// failures are surfaced as [`StoreError::Serialization`] instead of being treated as an
/// absent record.
#[derive(Clone)]
pub struct TokenRecordStore {
	backend: Arc<dyn KeyValueStore>,
}
impl TokenRecordStore {
	/// Wraps a key-value backend.
	pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
		Self { backend }
	}

	/// Underlying key-value backend.
	pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
		&self.backend
	}

	/// Loads the record stored for `principal`, if any.
	pub async fn get(&self, principal: &PrincipalId) -> Result<Option<AccessTokenRecord>, StoreError> {
		let Some(value) = self.backend.get(principal.as_str()).await? else {
			return Ok(None);
		};

		serde_json::from_value(value).map(Some).map_err(|e| StoreError::Serialization {
			message: format!("Failed to decode the record stored for {principal}: {e}"),
		})
	}

	/// Replaces the record stored for `principal` and hands it back.
	pub async fn put(
		&self,
		principal: &PrincipalId,
		record: AccessTokenRecord,
	) -> Result<AccessTokenRecord, StoreError> {
		let value = serde_json::to_value(&record).map_err(|e| StoreError::Serialization {
			message: format!("Failed to encode the record for {principal}: {e}"),
		})?;

		self.backend.put(principal.as_str(), value).await?;

		Ok(record)
	}

	/// Removes the record stored for `principal`. Idempotent.
	pub async fn clear(&self, principal: &PrincipalId) -> Result<(), StoreError> {
		self.backend.clear(principal.as_str()).await
	}

	/// Principals that currently have a stored value, sorted. Keys that are not valid
	/// principal ids are skipped.
	pub async fn principals(&self) -> Result<Vec<PrincipalId>, StoreError> {
		let mut principals = self
			.backend
			.keys()
			.await?
			.into_iter()
			.filter_map(|key| PrincipalId::new(key).ok())
			.collect::<Vec<_>>();

		principals.sort_unstable();

		Ok(principals)
	}
}
impl<S> From<Arc<S>> for TokenRecordStore
where
	S: 'static + KeyValueStore,
{
	fn from(backend: Arc<S>) -> Self {
		Self::new(backend)
	}
}
impl Debug for TokenRecordStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenRecordStore(..)")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	fn principal() -> PrincipalId {
		PrincipalId::new("app-client").expect("Principal fixture should be valid.")
	}

	#[tokio::test]
	async fn put_then_get_returns_equal_record() {
		let store = TokenRecordStore::from(Arc::new(MemoryStore::default()));
		let record = AccessTokenRecord::builder()
			.access_token("a1")
			.expires_in(3600)
			.refresh_token("r1")
			.build()
			.expect("Record fixture should build.");
		let stored =
			store.put(&principal(), record.clone()).await.expect("Put should succeed in memory.");

		assert_eq!(stored, record);
		assert_eq!(store.get(&principal()).await.expect("Get should succeed."), Some(record));

		store.clear(&principal()).await.expect("Clear should succeed.");
		store.clear(&principal()).await.expect("Second clear should be a no-op.");

		assert_eq!(store.get(&principal()).await.expect("Get after clear should succeed."), None);
	}

	#[tokio::test]
	async fn principals_lists_valid_keys_only() {
		let backend = Arc::new(MemoryStore::default());

		backend.insert_raw("app-client", serde_json::json!({}));
		backend.insert_raw("api-subject", serde_json::json!({}));
		backend.insert_raw("", serde_json::json!({}));

		let principals = TokenRecordStore::new(backend)
			.principals()
			.await
			.expect("Listing principals should succeed.");

		assert_eq!(
			principals.iter().map(PrincipalId::as_str).collect::<Vec<_>>(),
			["api-subject", "app-client"]
		);
	}

	#[tokio::test]
	async fn corrupt_values_are_not_masked() {
		let backend = Arc::new(MemoryStore::default());

		backend.insert_raw("app-client", serde_json::json!({ "accessToken": 42 }));

		let store = TokenRecordStore::new(backend);
		let err = store.get(&principal()).await.expect_err("Corrupt record should fail to decode.");

		assert!(matches!(err, StoreError::Serialization { .. }));
	}
}
