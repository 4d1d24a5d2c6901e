//! Dispatcher configuration and its validating builder.

// self
use crate::{_prelude::*, error::ConfigError};

const DEFAULT_REFRESH_PATH: &str = "/auth/refresh-token";
const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Validated configuration shared by every call a [`Dispatcher`](crate::dispatch::Dispatcher)
/// issues.
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
	/// Base URL every relative call path is joined onto.
	pub base_url: Url,
	/// Absolute URL of the credential refresh endpoint.
	pub refresh_url: Url,
	/// Static API key sent with refresh exchanges, when the backend requires one.
	pub api_key: Option<String>,
	/// Upper bound for the refresh exchange so a stalled call cannot block queued callers.
	pub refresh_timeout: Duration,
}
impl DispatcherConfig {
	/// Returns a builder seeded with the provided base URL.
	pub fn builder(base_url: Url) -> DispatcherConfigBuilder {
		DispatcherConfigBuilder::new(base_url)
	}

	/// Joins a relative call path onto the base URL.
	pub(crate) fn call_url(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(path)
			.map_err(|e| ConfigError::InvalidPath { path: path.to_owned(), source: e })
	}
}

/// Builder for [`DispatcherConfig`] values.
#[derive(Debug)]
pub struct DispatcherConfigBuilder {
	/// Base URL for every call.
	pub base_url: Url,
	/// Refresh endpoint path, joined onto the base URL at build time.
	pub refresh_path: String,
	/// Optional static API key for the refresh endpoint.
	pub api_key: Option<String>,
	/// Refresh exchange timeout.
	pub refresh_timeout: Duration,
}
impl DispatcherConfigBuilder {
	/// Creates a builder with the default refresh path and timeout.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			refresh_path: DEFAULT_REFRESH_PATH.to_owned(),
			api_key: None,
			refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
		}
	}

	/// Overrides the refresh endpoint path (must start with `/`).
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Sets the static API key attached to refresh exchanges.
	pub fn api_key(mut self, key: impl Into<String>) -> Self {
		self.api_key = Some(key.into());

		self
	}

	/// Overrides the refresh exchange timeout.
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<DispatcherConfig, ConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if self.base_url.cannot_be_a_base() {
			return Err(ConfigError::CannotBeABase { url: self.base_url.to_string() });
		}
		if !self.refresh_path.starts_with('/') {
			return Err(ConfigError::InvalidRefreshPath { path: self.refresh_path });
		}
		if self.refresh_timeout.is_zero() {
			return Err(ConfigError::NonPositiveRefreshTimeout);
		}

		let refresh_url = self.base_url.join(&self.refresh_path).map_err(|e| {
			ConfigError::InvalidPath { path: self.refresh_path.clone(), source: e }
		})?;

		Ok(DispatcherConfig {
			base_url: self.base_url,
			refresh_url,
			api_key: self.api_key,
			refresh_timeout: self.refresh_timeout,
		})
	}
}
