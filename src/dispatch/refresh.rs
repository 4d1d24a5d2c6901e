//! Single-flight credential refresh.
//!
//! A call that observes an authentication failure asks the dispatcher for a rotated credential
//! via [`Dispatcher::refreshed_credential`]. Callers queue on a per-dispatcher guard in arrival
//! order; at most one refresh exchange is in flight at any time. A caller that acquires the
//! guard after a sibling flight already rotated the pair resolves with the stored credential
//! without touching the network. A failing exchange clears every persisted session key, notifies
//! the user once, routes to the login entry point, and leaves the dispatcher with no recovery
//! path until a new login installs a fresh pair.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, CredentialSecret},
	dispatch::Dispatcher,
	error::ConfigError,
	ext::Severity,
	http::{Method, OutboundRequest, Transport},
	obs::{self, DispatchKind, DispatchOutcome, DispatchSpan},
};

/// User-facing message shown when the session terminates.
pub const SESSION_EXPIRED_NOTICE: &str = "Your session has expired. Please sign in again.";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
	refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
	access_token: String,
	refresh_token: String,
}

impl<T> Dispatcher<T>
where
	T: ?Sized + Transport,
{
	/// Returns a rotated access credential after the failed call's credential expired.
	///
	/// `observed` is the credential the failed call carried; it is compared against the stored
	/// value after the guard is acquired so N concurrent failures produce exactly one exchange.
	pub(crate) async fn refreshed_credential(&self, observed: &str) -> Result<CredentialSecret> {
		const KIND: DispatchKind = DispatchKind::Refresh;

		let span = DispatchSpan::new(KIND, "refreshed_credential");

		obs::record_dispatch_outcome(KIND, DispatchOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.refresh_metrics.record_attempt();

				let _singleflight = self.refresh_guard.lock().await;

				if let Some(current) = self.store.access_token().await.map_err(|err| {
					self.refresh_metrics.record_failure();
					Error::from(err)
				})? && current.reveal() != observed
				{
					// A sibling flight rotated the pair while this caller was queued.
					self.refresh_metrics.record_reuse();

					return Ok(current);
				}

				let refresh = self
					.store
					.refresh_token()
					.await
					.map_err(|err| {
						self.refresh_metrics.record_failure();
						Error::from(err)
					})?
					.ok_or_else(|| {
						// Never logged in, or a failed flight already tore the session down;
						// the teardown notified once, so fail quietly here.
						self.refresh_metrics.record_failure();

						Error::SessionExpired
					})?;

				match self.exchange(refresh.reveal()).await {
					Ok(pair) => {
						let access = pair.access.clone();

						self.store.install_pair(pair).await.map_err(|err| {
							self.refresh_metrics.record_failure();
							Error::from(err)
						})?;
						self.refresh_metrics.record_success();

						Ok(access)
					},
					Err(err) => {
						let _ = self.store.clear().await;

						self.refresh_metrics.record_failure();
						self.notifier.notify(Severity::Error, SESSION_EXPIRED_NOTICE);
						self.login_redirect.redirect_to_login();

						Err(err)
					},
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_dispatch_outcome(KIND, DispatchOutcome::Success),
			Err(_) => obs::record_dispatch_outcome(KIND, DispatchOutcome::Failure),
		}

		result
	}

	/// Exchanges the refresh credential for a new pair, bounded by the configured timeout.
	async fn exchange(&self, refresh_credential: &str) -> Result<CredentialPair> {
		let body = serde_json::to_vec(&RefreshRequest { refresh_token: refresh_credential })
			.map_err(ConfigError::BodySerialization)?;
		let request = OutboundRequest {
			method: Method::Post,
			url: self.config.refresh_url.clone(),
			credential: String::new(),
			api_key: self.config.api_key.clone(),
			body: Some(body),
			timeout: Some(self.config.refresh_timeout),
		};
		let response = self
			.transport
			.send(request)
			.await
			.map_err(|err| Error::RefreshFailed { reason: err.to_string() })?;

		if !response.is_success() {
			return Err(Error::RefreshFailed {
				reason: format!("exchange returned status {}", response.status),
			});
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&response.body);
		let payload: RefreshResponse = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|err| Error::RefreshFailed {
				reason: format!("exchange returned a malformed body: {err}"),
			})?;

		Ok(CredentialPair::new(payload.access_token, payload.refresh_token))
	}
}
