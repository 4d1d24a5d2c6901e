//! Simple file-backed [`SessionStore`] for desktop shells and long-lived CLI sessions.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, CredentialSecret, SessionSnapshot, UserProfile},
	store::{SessionStore, StoreError, StoreFuture, keys},
};

/// On-disk document wrapping the session keys with a save stamp.
#[derive(Debug, Serialize, Deserialize)]
struct SessionDocument {
	#[serde(with = "time::serde::rfc3339")]
	saved_at: OffsetDateTime,
	entries: HashMap<String, String>,
}

/// Persists session keys to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<String, String>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let entries = if path.exists() { Self::load_entries(&path)? } else { HashMap::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(entries)) })
	}

	fn load_entries(path: &Path) -> Result<HashMap<String, String>, StoreError> {
		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let document: SessionDocument =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(document.entries)
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let document =
			SessionDocument { saved_at: OffsetDateTime::now_utc(), entries: entries.clone() };
		let serialized =
			serde_json::to_vec_pretty(&document).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize session snapshot: {e}"),
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

	fn read_secret(&self, key: &str) -> Option<CredentialSecret> {
		self.inner.read().get(key).map(CredentialSecret::new)
	}
}
impl SessionStore for FileStore {
	fn access_token(&self) -> StoreFuture<'_, Option<CredentialSecret>> {
		Box::pin(async move { Ok(self.read_secret(keys::ACCESS_TOKEN)) })
	}

	fn refresh_token(&self) -> StoreFuture<'_, Option<CredentialSecret>> {
		Box::pin(async move { Ok(self.read_secret(keys::REFRESH_TOKEN)) })
	}

	fn install_pair(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.insert(keys::ACCESS_TOKEN.to_owned(), pair.access.reveal().to_owned());
			guard.insert(keys::REFRESH_TOKEN.to_owned(), pair.refresh.reveal().to_owned());
			guard.insert(keys::IS_AUTHENTICATED.to_owned(), "true".to_owned());
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn install_profile(&self, profile: UserProfile) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let raw = serde_json::to_string(&profile).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize profile: {e}"),
			})?;
			let mut guard = self.inner.write();

			guard.insert(keys::USER_PROFILE.to_owned(), raw);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn snapshot(&self) -> StoreFuture<'_, SessionSnapshot> {
		Box::pin(async move {
			let guard = self.inner.read();
			let pair = match (guard.get(keys::ACCESS_TOKEN), guard.get(keys::REFRESH_TOKEN)) {
				(Some(access), Some(refresh)) => Some(CredentialPair::new(access, refresh)),
				_ => None,
			};
			let authenticated =
				guard.get(keys::IS_AUTHENTICATED).map(String::as_str) == Some("true");
			let profile = guard
				.get(keys::USER_PROFILE)
				.map(|raw| {
					serde_json::from_str(raw).map(UserProfile::new).map_err(|e| {
						StoreError::Serialization {
							message: format!("Failed to parse profile: {e}"),
						}
					})
				})
				.transpose()?;

			Ok(SessionSnapshot { pair, authenticated, profile })
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			for key in keys::ALL {
				guard.remove(key);
			}

			self.persist_locked(&guard)?;

			Ok(())
		})
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
			"bearer_dispatch_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn install_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.install_pair(CredentialPair::new("A1", "R1")))
			.expect("Failed to install fixture pair into file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let snapshot = rt
			.block_on(reopened.snapshot())
			.expect("Failed to snapshot reopened file store session.");
		let pair = snapshot.pair.expect("File store lost credential pair after reopen.");

		assert_eq!(pair.access.reveal(), "A1");
		assert_eq!(pair.refresh.reveal(), "R1");
		assert!(snapshot.authenticated);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn clear_removes_every_key_from_disk() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.install_pair(CredentialPair::new("A1", "R1")))
			.expect("Failed to install fixture pair into file store.");
		rt.block_on(store.install_profile(UserProfile::new(serde_json::json!({ "id": 7 }))))
			.expect("Failed to install fixture profile into file store.");
		rt.block_on(store.clear()).expect("Failed to clear file store session.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let snapshot = rt
			.block_on(reopened.snapshot())
			.expect("Failed to snapshot reopened file store session.");

		assert!(snapshot.pair.is_none());
		assert!(!snapshot.authenticated);
		assert!(snapshot.profile.is_none());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
