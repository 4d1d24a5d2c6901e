//! Credentialed request dispatcher: bearer injection, replay-once recovery, and call plumbing.
//!
//! Every call reads the access credential at call time, sends it as `Authorization: Bearer
//! <credential>` (the header is present even before a login, with an empty credential), and
//! recovers once from a single authentication failure by routing through the single-flight
//! refresh in [`refresh`]. Failures surface as discriminated [`Error`] variants; the
//! [`Notifier`] collaborator stays a side channel for user-facing messages.

pub mod refresh;

pub use refresh::RefreshMetrics;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, UserProfile},
	config::DispatcherConfig,
	error::ConfigError,
	ext::{
		LoginRedirect, NoopNotifier, NoopProgress, NoopRedirect, Notifier, ProgressGuard,
		ProgressHook, Severity,
	},
	http::{Method, OutboundRequest, Transport, TransportResponse},
	obs::{self, DispatchKind, DispatchOutcome, DispatchSpan},
	store::SessionStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// HTTP status treated as an authentication failure eligible for a credential refresh.
pub const AUTH_FAILURE_STATUS: u16 = 401;

/// Parameters for a single logical call.
#[derive(Clone, Debug)]
pub struct CallRequest {
	/// HTTP method for the call.
	pub method: Method,
	/// Path relative to the configured base URL.
	pub path: String,
	/// Optional JSON body.
	pub body: Option<JsonValue>,
	/// Suppresses the user-facing notification when the call fails.
	pub quiet: bool,
}
impl CallRequest {
	/// Creates a call for the provided method and relative path.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), body: None, quiet: false }
	}

	/// Attaches a JSON body.
	pub fn body(mut self, body: JsonValue) -> Self {
		self.body = Some(body);

		self
	}

	/// Suppresses the user-facing error notification for this call.
	pub fn quiet(mut self) -> Self {
		self.quiet = true;

		self
	}
}

#[cfg(feature = "reqwest")]
/// Dispatcher specialized for the crate's default reqwest transport.
pub type ReqwestDispatcher = Dispatcher<ReqwestTransport>;

/// Dispatches credentialed calls against a single base URL.
///
/// The dispatcher owns the transport, session store, configuration, and collaborator hooks so
/// the call path and the refresh transition can share them. The refresh guard is scoped to the
/// instance: the pending queue of callers suspended behind an in-flight refresh is the guard's
/// waiter list, drained in arrival order.
pub struct Dispatcher<T>
where
	T: ?Sized + Transport,
{
	/// Transport used for every outbound call.
	pub transport: Arc<T>,
	/// Session store holding the persisted credential state.
	pub store: Arc<dyn SessionStore>,
	/// Validated dispatcher configuration.
	pub config: DispatcherConfig,
	/// User-facing message sink.
	pub notifier: Arc<dyn Notifier>,
	/// Global progress-indicator hooks.
	pub progress: Arc<dyn ProgressHook>,
	/// Navigation hook invoked when the session terminates.
	pub login_redirect: Arc<dyn LoginRedirect>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	pub(crate) refresh_guard: Arc<AsyncMutex<()>>,
}
impl<T> Dispatcher<T>
where
	T: ?Sized + Transport,
{
	/// Creates a dispatcher that reuses the caller-provided transport.
	pub fn with_transport(
		store: Arc<dyn SessionStore>,
		config: DispatcherConfig,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			config,
			notifier: Arc::new(NoopNotifier),
			progress: Arc::new(NoopProgress),
			login_redirect: Arc::new(NoopRedirect),
			refresh_metrics: Default::default(),
			refresh_guard: Default::default(),
		}
	}

	/// Sets or replaces the user-facing notifier.
	pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
		self.notifier = notifier;

		self
	}

	/// Sets or replaces the progress-indicator hooks.
	pub fn with_progress(mut self, progress: Arc<dyn ProgressHook>) -> Self {
		self.progress = progress;

		self
	}

	/// Sets or replaces the login navigation hook.
	pub fn with_login_redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
		self.login_redirect = redirect;

		self
	}

	/// Installs a freshly issued credential pair, e.g. after a login exchange.
	pub async fn install_credentials(&self, pair: CredentialPair) -> Result<()> {
		Ok(self.store.install_pair(pair).await?)
	}

	/// Persists the user-profile blob next to the credential pair.
	pub async fn install_profile(&self, profile: UserProfile) -> Result<()> {
		Ok(self.store.install_profile(profile).await?)
	}

	/// Issues a GET against the provided relative path.
	pub async fn get<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.execute(CallRequest::new(Method::Get, path)).await
	}

	/// Issues a POST with a JSON body.
	pub async fn post<R, B>(&self, path: &str, body: &B) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.execute(CallRequest::new(Method::Post, path).body(Self::to_body(body)?)).await
	}

	/// Issues a PUT with a JSON body.
	pub async fn put<R, B>(&self, path: &str, body: &B) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.execute(CallRequest::new(Method::Put, path).body(Self::to_body(body)?)).await
	}

	/// Issues a PATCH with a JSON body.
	pub async fn patch<R, B>(&self, path: &str, body: &B) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.execute(CallRequest::new(Method::Patch, path).body(Self::to_body(body)?)).await
	}

	/// Issues a DELETE against the provided relative path.
	pub async fn delete<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.execute(CallRequest::new(Method::Delete, path)).await
	}

	/// Executes a prepared call, recovering once from an authentication failure.
	pub async fn execute<R>(&self, call: CallRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		const KIND: DispatchKind = DispatchKind::Call;

		let span = DispatchSpan::new(KIND, "execute");

		obs::record_dispatch_outcome(KIND, DispatchOutcome::Attempt);

		let _progress = ProgressGuard::start(self.progress.clone());
		let quiet = call.quiet;
		let result = span.instrument(self.call_with_replay(call)).await;

		match &result {
			Ok(_) => obs::record_dispatch_outcome(KIND, DispatchOutcome::Success),
			Err(err) => {
				obs::record_dispatch_outcome(KIND, DispatchOutcome::Failure);

				// Terminal refresh failures notify inside the state transition itself, so the
				// user sees one message per session teardown rather than one per queued call.
				if !quiet && !err.is_terminal() {
					self.notifier.notify(Severity::Error, &err.to_string());
				}
			},
		}

		result
	}

	async fn call_with_replay<R>(&self, call: CallRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let url = self.config.call_url(&call.path)?;
		let body = call
			.body
			.as_ref()
			.map(serde_json::to_vec)
			.transpose()
			.map_err(ConfigError::BodySerialization)?;
		let mut credential = self
			.store
			.access_token()
			.await?
			.map(|secret| secret.reveal().to_owned())
			.unwrap_or_default();
		// Retry marker for this logical call; a second authentication failure maps to
		// `Unauthorized` in `decode` instead of re-entering the refresh flow.
		let mut retried = false;

		loop {
			let request = OutboundRequest {
				method: call.method,
				url: url.clone(),
				credential: credential.clone(),
				api_key: None,
				body: body.clone(),
				timeout: None,
			};
			let response = self.transport.send(request).await?;

			if response.status == AUTH_FAILURE_STATUS && !retried {
				retried = true;
				credential = self.refreshed_credential(&credential).await?.reveal().to_owned();

				continue;
			}

			return Self::decode(response);
		}
	}

	fn to_body(body: &(impl ?Sized + Serialize)) -> Result<JsonValue> {
		Ok(serde_json::to_value(body).map_err(ConfigError::BodySerialization)?)
	}

	fn decode<R>(response: TransportResponse) -> Result<R>
	where
		R: DeserializeOwned,
	{
		if response.status == AUTH_FAILURE_STATUS {
			return Err(Error::Unauthorized);
		}
		if !response.is_success() {
			return Err(Error::Rejected {
				status: response.status,
				message: rejection_message(&response.body),
			});
		}

		// Empty bodies decode as JSON `null` so unit and optional targets keep working.
		let bytes: &[u8] = if response.body.is_empty() { b"null" } else { &response.body };
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut deserializer).map_err(Error::Decode)
	}
}
#[cfg(feature = "reqwest")]
impl Dispatcher<ReqwestTransport> {
	/// Creates a dispatcher with the crate's default reqwest transport.
	pub fn new(store: Arc<dyn SessionStore>, config: DispatcherConfig) -> Self {
		Self::with_transport(store, config, ReqwestTransport::default())
	}
}
impl<T> Clone for Dispatcher<T>
where
	T: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			notifier: self.notifier.clone(),
			progress: self.progress.clone(),
			login_redirect: self.login_redirect.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			refresh_guard: self.refresh_guard.clone(),
		}
	}
}
impl<T> Debug for Dispatcher<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher")
			.field("base_url", &self.config.base_url.as_str())
			.field("refresh_url", &self.config.refresh_url.as_str())
			.field("api_key_set", &self.config.api_key.is_some())
			.finish()
	}
}

const MAX_REJECTION_PREVIEW: usize = 256;

/// Extracts a human-readable reason from a rejection body, preferring the conventional
/// `message`/`error` JSON fields over the raw payload.
fn rejection_message(body: &[u8]) -> String {
	if let Ok(value) = serde_json::from_slice::<JsonValue>(body) {
		for field in ["message", "error"] {
			if let Some(reason) = value.get(field).and_then(JsonValue::as_str) {
				return reason.to_owned();
			}
		}
	}

	let preview = String::from_utf8_lossy(body);
	let preview = preview.trim();

	if preview.is_empty() {
		return "no response body".to_owned();
	}

	preview.chars().take(MAX_REJECTION_PREVIEW).collect()
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::VecDeque;
	// self
	use super::*;
	use crate::{
		error::TransportError,
		http::TransportFuture,
		store::{MemoryStore, keys},
	};

	/// Transport that replays a scripted response sequence and records every request.
	#[derive(Default)]
	pub(crate) struct ScriptedTransport {
		responses: Mutex<VecDeque<Result<TransportResponse, u16>>>,
		seen: Mutex<Vec<OutboundRequest>>,
	}
	impl ScriptedTransport {
		pub(crate) fn respond(&self, status: u16, body: &str) {
			self.responses
				.lock()
				.push_back(Ok(TransportResponse { status, body: body.as_bytes().to_vec() }));
		}

		pub(crate) fn fail_next(&self) {
			self.responses.lock().push_back(Err(0));
		}

		pub(crate) fn requests(&self) -> Vec<OutboundRequest> {
			self.seen.lock().clone()
		}
	}
	impl Transport for ScriptedTransport {
		fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
			self.seen.lock().push(request.clone());

			let next = self.responses.lock().pop_front();

			Box::pin(async move {
				match next {
					Some(Ok(response)) => Ok(response),
					Some(Err(_)) | None =>
						Err(TransportError::TimedOut { url: request.url.to_string() }),
				}
			})
		}
	}

	pub(crate) fn build_test_dispatcher() -> (Dispatcher<ScriptedTransport>, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let config = DispatcherConfig::builder(
			Url::parse("http://shop.local/api/").expect("Base URL fixture should parse."),
		)
		.api_key("storefront-key")
		.build()
		.expect("Test configuration should build successfully.");
		let dispatcher = Dispatcher::with_transport(
			store.clone() as Arc<dyn SessionStore>,
			config,
			ScriptedTransport::default(),
		);

		(dispatcher, store)
	}

	#[tokio::test]
	async fn bearer_header_defaults_to_empty_credential() {
		let (dispatcher, _store) = build_test_dispatcher();

		dispatcher.transport.respond(200, "[]");

		let products: Vec<JsonValue> = dispatcher
			.get("products")
			.await
			.expect("GET without a stored credential should succeed.");

		assert!(products.is_empty());

		let requests = dispatcher.transport.requests();

		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].bearer_header(), "Bearer ");
	}

	#[tokio::test]
	async fn rejections_surface_status_and_server_message() {
		let (dispatcher, _store) = build_test_dispatcher();

		dispatcher.transport.respond(422, "{\"message\":\"quantity must be positive\"}");

		let err = dispatcher
			.post::<JsonValue, _>("orders", &serde_json::json!({ "quantity": -1 }))
			.await
			.expect_err("Validation rejections should surface to the caller.");

		match err {
			Error::Rejected { status, message } => {
				assert_eq!(status, 422);
				assert_eq!(message, "quantity must be positive");
			},
			other => panic!("Expected a rejection error, got {other:?}."),
		}
	}

	#[tokio::test]
	async fn second_auth_failure_never_reenters_refresh() {
		let (dispatcher, store) = build_test_dispatcher();

		dispatcher
			.install_credentials(CredentialPair::new("A1", "R1"))
			.await
			.expect("Credential installation should succeed.");

		// Original call fails auth, the exchange rotates the pair, the replay fails auth again.
		dispatcher.transport.respond(401, "");
		dispatcher.transport.respond(200, "{\"accessToken\":\"A2\",\"refreshToken\":\"R2\"}");
		dispatcher.transport.respond(401, "");

		let err = dispatcher
			.get::<JsonValue>("cart")
			.await
			.expect_err("A second authentication failure should fail the call.");

		assert!(matches!(err, Error::Unauthorized));

		// Exactly three transport calls: original, exchange, replay. No second exchange.
		let requests = dispatcher.transport.requests();

		assert_eq!(requests.len(), 3);
		assert_eq!(requests[1].url.path(), "/auth/refresh-token");
		assert_eq!(requests[2].bearer_header(), "Bearer A2");
		assert_eq!(dispatcher.refresh_metrics.attempts(), 1);
		assert!(store.contains(keys::ACCESS_TOKEN));
	}

	#[tokio::test]
	async fn empty_bodies_decode_as_unit() {
		let (dispatcher, _store) = build_test_dispatcher();

		dispatcher.transport.respond(204, "");

		dispatcher
			.delete::<()>("cart/7")
			.await
			.expect("Empty response bodies should decode into the unit type.");
	}

	#[test]
	fn rejection_messages_prefer_structured_fields() {
		assert_eq!(rejection_message(b"{\"message\":\"out of stock\"}"), "out of stock");
		assert_eq!(rejection_message(b"{\"error\":\"bad request\"}"), "bad request");
		assert_eq!(rejection_message(b"plain text"), "plain text");
		assert_eq!(rejection_message(b""), "no response body");
	}
}
