//! Dispatcher-level error types shared across calls, refreshes, and stores.
//!
//! Failures are surfaced as discriminated variants instead of being collapsed into an empty
//! result, so callers can branch on the failure kind while the user-facing notifier remains a
//! side channel.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical dispatcher error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Session-store failure.
	#[error("{0}")]
	Storage(#[from] crate::store::StoreError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Server rejected the call for a non-authentication reason (4xx/5xx other than 401).
	#[error("Server rejected the call with status {status}: {message}.")]
	Rejected {
		/// HTTP status code returned by the server.
		status: u16,
		/// Server-supplied reason string, if any.
		message: String,
	},
	/// Replayed call failed authentication again; the refresh flow is not re-entered.
	#[error("Call failed authentication after a credential refresh.")]
	Unauthorized,
	/// Response body could not be decoded into the requested type.
	#[error("Response body could not be decoded.")]
	Decode(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// Credential refresh exchange failed; the session has been cleared.
	#[error("Credential refresh failed: {reason}.")]
	RefreshFailed {
		/// Transport- or server-supplied reason string.
		reason: String,
	},
	/// No refresh credential is available; a new login must establish a fresh pair.
	#[error("Session credentials are absent; sign in again.")]
	SessionExpired,
}
impl Error {
	/// Returns `true` when the error terminates the session until the next login.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::RefreshFailed { .. } | Self::SessionExpired)
	}
}

/// Configuration and validation failures raised by the dispatcher.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Base URL uses a scheme other than HTTP(S).
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL cannot serve as a base for relative paths.
	#[error("Base URL cannot be a base: {url}.")]
	CannotBeABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// Relative path could not be joined onto the base URL.
	#[error("Call path is invalid: {path}.")]
	InvalidPath {
		/// Offending relative path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Refresh path must be non-empty and start with `/`.
	#[error("Refresh path must start with `/`: {path}.")]
	InvalidRefreshPath {
		/// Offending refresh path.
		path: String,
	},
	/// Refresh timeout must be positive so a stalled exchange cannot block forever.
	#[error("Refresh timeout must be positive.")]
	NonPositiveRefreshTimeout,
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	BodySerialization(#[from] serde_json::Error),
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Request URL that failed.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The call exceeded its configured timeout.
	#[error("Call to {url} timed out.")]
	TimedOut {
		/// Request URL that failed.
		url: String,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}
}
