//! File-backed [`KeyValueStore`] that rewrites a JSON snapshot after each mutation.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	store::{KeyValueStore, StoreError, StoreFuture},
};

type Snapshot = HashMap<String, Value>;

/// Persists values to a single JSON object file, replaced atomically on every write.
///
/// Writes run synchronously on the calling task while the snapshot lock is held, so this
/// backend suits demos and low-contention tools rather than busy async services. A failed
/// write leaves the in-memory snapshot untouched.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &Snapshot) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl KeyValueStore for FileStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>> {
		Box::pin(async move { Ok(self.inner.read().get(key).cloned()) })
	}

	fn put<'a>(&'a self, key: &'a str, value: Value) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let mut next = guard.clone();

			next.insert(key.to_owned(), value);
			self.persist_locked(&next)?;
			*guard = next;

			Ok(())
		})
	}

	fn clear<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if !guard.contains_key(key) {
				return Ok(());
			}

			let mut next = guard.clone();

			next.remove(key);
			self.persist_locked(&next)?;
			*guard = next;

			Ok(())
		})
	}

	fn keys<'a>(&'a self) -> StoreFuture<'a, Vec<String>> {
		Box::pin(async move { Ok(self.inner.read().keys().cloned().collect()) })
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"oidc_token_manager_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn put_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");
		let value = serde_json::json!({ "accessToken": "a1", "expiresIn": 60 });

		rt.block_on(store.put("app-client", value.clone()))
			.expect("Failed to save fixture value to file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.get("app-client"))
			.expect("Failed to fetch fixture value from file store.")
			.expect("File store lost value after reopen.");

		assert_eq!(fetched, value);

		rt.block_on(reopened.clear("app-client")).expect("Clearing a stored key should succeed.");
		rt.block_on(reopened.clear("app-client")).expect("Clearing twice should be a no-op.");

		let reopened = FileStore::open(&path).expect("Failed to reopen cleared snapshot.");

		assert!(
			rt.block_on(reopened.get("app-client"))
				.expect("Reading a cleared key should succeed.")
				.is_none()
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn failed_writes_keep_the_previous_snapshot() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");
		let original = serde_json::json!({ "accessToken": "a1" });

		rt.block_on(store.put("app-client", original.clone()))
			.expect("Failed to save fixture value to file store.");

		// A directory at the snapshot path makes the final rename fail.
		fs::remove_file(&path).expect("Failed to remove snapshot before blocking it.");
		fs::create_dir(&path).expect("Failed to create directory over snapshot path.");

		let err = rt
			.block_on(store.put("app-client", serde_json::json!({ "accessToken": "a2" })))
			.expect_err("Renaming onto a directory should fail.");

		assert!(matches!(err, StoreError::Backend { .. }));
		assert_eq!(
			rt.block_on(store.get("app-client")).expect("Reading after a failed put should succeed."),
			Some(original.clone())
		);

		rt.block_on(store.put("api-subject", serde_json::json!({ "accessToken": "s1" })))
			.expect_err("New keys should not be stored when persisting fails.");
		rt.block_on(store.clear("app-client")).expect_err("Clearing should fail while blocked.");

		assert_eq!(
			rt.block_on(store.get("app-client")).expect("Reading after a failed clear should succeed."),
			Some(original)
		);
		assert_eq!(
			rt.block_on(store.keys()).expect("Listing keys should succeed."),
			vec!["app-client".to_owned()]
		);

		fs::remove_dir(&path).expect("Failed to remove blocking directory.");

		let _ = fs::remove_file(path.with_extension("tmp"));
	}

	#[test]
	fn corrupt_snapshot_is_a_serialization_error() {
		let path = temp_path();

		fs::write(&path, b"not json").expect("Failed to seed corrupt snapshot.");

		let err = FileStore::open(&path).expect_err("Corrupt snapshot should not load.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
