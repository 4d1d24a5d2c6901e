//! Credential pair and profile models persisted by the session store.

// self
use crate::{_prelude::*, auth::secret::CredentialSecret};

/// Access/refresh credential pair replaced wholesale on every successful refresh.
///
/// No expiry instant is tracked locally; expiry is discovered reactively when a call is
/// rejected with an authentication failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Short-lived access credential carried as the bearer header value.
	pub access: CredentialSecret,
	/// Longer-lived refresh credential exchanged for a new pair.
	pub refresh: CredentialSecret,
}
impl CredentialPair {
	/// Creates a pair from raw credential strings.
	pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
		Self { access: CredentialSecret::new(access), refresh: CredentialSecret::new(refresh) }
	}
}

/// Opaque profile blob stored next to the credential pair and cleared with it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(pub JsonValue);
impl UserProfile {
	/// Wraps a profile payload.
	pub fn new(value: JsonValue) -> Self {
		Self(value)
	}
}

/// Point-in-time view of everything the session store holds.
#[derive(Clone, Debug, Default)]
pub struct SessionSnapshot {
	/// Credential pair, when a login or refresh has installed one.
	pub pair: Option<CredentialPair>,
	/// Authenticated flag persisted alongside the pair.
	pub authenticated: bool,
	/// Profile blob, when one has been stored.
	pub profile: Option<UserProfile>,
}
