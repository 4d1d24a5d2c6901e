//! Thread-safe in-memory [`SessionStore`] mirroring client-side key-value storage.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, CredentialSecret, SessionSnapshot, UserProfile},
	store::{SessionStore, StoreError, StoreFuture, keys},
};

type KeyMap = Arc<RwLock<HashMap<&'static str, String>>>;

/// In-process key-value store for tests, demos, and non-persisted sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(KeyMap);
impl MemoryStore {
	/// Returns `true` when the provided session key currently holds a value.
	pub fn contains(&self, key: &str) -> bool {
		self.0.read().contains_key(key)
	}

	/// Returns the session keys that currently hold values, in no particular order.
	pub fn present_keys(&self) -> Vec<&'static str> {
		self.0.read().keys().copied().collect()
	}

	fn read_secret(map: &KeyMap, key: &'static str) -> Option<CredentialSecret> {
		map.read().get(key).map(CredentialSecret::new)
	}

	fn snapshot_now(map: &KeyMap) -> Result<SessionSnapshot, StoreError> {
		let guard = map.read();
		let pair = match (guard.get(keys::ACCESS_TOKEN), guard.get(keys::REFRESH_TOKEN)) {
			(Some(access), Some(refresh)) => Some(CredentialPair::new(access, refresh)),
			_ => None,
		};
		let authenticated = guard.get(keys::IS_AUTHENTICATED).map(String::as_str) == Some("true");
		let profile = guard
			.get(keys::USER_PROFILE)
			.map(|raw| {
				serde_json::from_str(raw).map(UserProfile::new).map_err(|e| {
					StoreError::Serialization { message: format!("Failed to parse profile: {e}") }
				})
			})
			.transpose()?;

		Ok(SessionSnapshot { pair, authenticated, profile })
	}
}
impl SessionStore for MemoryStore {
	fn access_token(&self) -> StoreFuture<'_, Option<CredentialSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::read_secret(&map, keys::ACCESS_TOKEN)) })
	}

	fn refresh_token(&self) -> StoreFuture<'_, Option<CredentialSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::read_secret(&map, keys::REFRESH_TOKEN)) })
	}

	fn install_pair(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			let mut guard = map.write();

			guard.insert(keys::ACCESS_TOKEN, pair.access.reveal().to_owned());
			guard.insert(keys::REFRESH_TOKEN, pair.refresh.reveal().to_owned());
			guard.insert(keys::IS_AUTHENTICATED, "true".to_owned());

			Ok(())
		})
	}

	fn install_profile(&self, profile: UserProfile) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			let raw = serde_json::to_string(&profile).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize profile: {e}"),
			})?;

			map.write().insert(keys::USER_PROFILE, raw);

			Ok(())
		})
	}

	fn snapshot(&self) -> StoreFuture<'_, SessionSnapshot> {
		let map = self.0.clone();

		Box::pin(async move { Self::snapshot_now(&map) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			let mut guard = map.write();

			for key in keys::ALL {
				guard.remove(key);
			}

			Ok(())
		})
	}
}
