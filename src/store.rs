//! Storage contracts and built-in session store implementations.
//!
//! The store models the client-side persisted key-value state the dispatcher depends on:
//! access credential, refresh credential, authenticated flag, and the user-profile blob.
//! All keys are cleared together when a refresh exchange fails terminally.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, CredentialSecret, SessionSnapshot, UserProfile},
};

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persisted session keys used by the built-in stores.
pub mod keys {
	/// Access credential key.
	pub const ACCESS_TOKEN: &str = "access_token";
	/// Refresh credential key.
	pub const REFRESH_TOKEN: &str = "refresh_token";
	/// Authenticated flag key.
	pub const IS_AUTHENTICATED: &str = "is_authenticated";
	/// User-profile blob key.
	pub const USER_PROFILE: &str = "user_profile";
	/// Every session key, in clearing order.
	pub const ALL: [&str; 4] = [ACCESS_TOKEN, REFRESH_TOKEN, IS_AUTHENTICATED, USER_PROFILE];
}

/// Storage backend contract implemented by session stores.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Returns the current access credential, if a pair is installed.
	fn access_token(&self) -> StoreFuture<'_, Option<CredentialSecret>>;

	/// Returns the current refresh credential, if a pair is installed.
	fn refresh_token(&self) -> StoreFuture<'_, Option<CredentialSecret>>;

	/// Installs a credential pair and marks the session authenticated.
	fn install_pair(&self, pair: CredentialPair) -> StoreFuture<'_, ()>;

	/// Persists the user-profile blob next to the credential pair.
	fn install_profile(&self, profile: UserProfile) -> StoreFuture<'_, ()>;

	/// Returns a point-in-time view of the whole session.
	fn snapshot(&self) -> StoreFuture<'_, SessionSnapshot>;

	/// Removes every session key together.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
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

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn key_list_covers_every_session_key() {
		assert_eq!(keys::ALL.len(), 4);
		assert!(keys::ALL.contains(&keys::ACCESS_TOKEN));
		assert!(keys::ALL.contains(&keys::REFRESH_TOKEN));
		assert!(keys::ALL.contains(&keys::IS_AUTHENTICATED));
		assert!(keys::ALL.contains(&keys::USER_PROFILE));
	}

	#[test]
	fn store_error_can_be_serialized() {
		let payload = serde_json::to_string(&StoreError::Backend { message: "disk".into() })
			.expect("Store error should serialize to JSON.");
		let round_trip: StoreError =
			serde_json::from_str(&payload).expect("Serialized error should deserialize from JSON.");

		assert_eq!(round_trip, StoreError::Backend { message: "disk".into() });
	}
}
