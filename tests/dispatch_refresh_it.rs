#![cfg(feature = "reqwest")]

// std
use std::sync::{
	Arc, Mutex,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::prelude::*;
use url::Url;
// self
use bearer_dispatch::{
	auth::CredentialPair,
	config::DispatcherConfig,
	dispatch::{Dispatcher, ReqwestDispatcher, refresh::SESSION_EXPIRED_NOTICE},
	error::Error,
	ext::{LoginRedirect, Notifier, Severity},
	store::{MemoryStore, SessionStore, keys},
};

#[derive(Debug, Default)]
struct CountingNotifier(Mutex<Vec<String>>);
impl CountingNotifier {
	fn messages(&self) -> Vec<String> {
		self.0.lock().expect("Notifier probe lock should not be poisoned.").clone()
	}
}
impl Notifier for CountingNotifier {
	fn notify(&self, _severity: Severity, message: &str) {
		self.0
			.lock()
			.expect("Notifier probe lock should not be poisoned.")
			.push(message.to_owned());
	}
}

#[derive(Debug, Default)]
struct CountingRedirect(AtomicUsize);
impl CountingRedirect {
	fn hits(&self) -> usize {
		self.0.load(Ordering::Relaxed)
	}
}
impl LoginRedirect for CountingRedirect {
	fn redirect_to_login(&self) {
		self.0.fetch_add(1, Ordering::Relaxed);
	}
}

fn build_dispatcher(
	server: &MockServer,
) -> (ReqwestDispatcher, Arc<MemoryStore>, Arc<CountingNotifier>, Arc<CountingRedirect>) {
	let base_url =
		Url::parse(&server.url("/api/")).expect("Mock server base URL should parse successfully.");
	let config = DispatcherConfig::builder(base_url)
		.api_key("storefront-key")
		.build()
		.expect("Dispatcher configuration should build successfully.");
	let store = Arc::new(MemoryStore::default());
	let notifier = Arc::new(CountingNotifier::default());
	let redirect = Arc::new(CountingRedirect::default());
	let dispatcher = Dispatcher::new(store.clone() as Arc<dyn SessionStore>, config)
		.with_notifier(notifier.clone())
		.with_login_redirect(redirect.clone());

	(dispatcher, store, notifier, redirect)
}

async fn seed_pair(dispatcher: &ReqwestDispatcher, access: &str, refresh: &str) {
	dispatcher
		.install_credentials(CredentialPair::new(access, refresh))
		.await
		.expect("Credential installation should succeed.");
}

#[tokio::test]
async fn expired_credential_is_rotated_and_replayed() {
	let server = MockServer::start_async().await;
	let (dispatcher, store, _notifier, _redirect) = build_dispatcher(&server);

	seed_pair(&dispatcher, "A1", "R1").await;

	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/cart").header("authorization", "Bearer A1");
			then.status(401);
		})
		.await;
	let exchange = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh-token")
				.header("x-api-key", "storefront-key")
				.json_body(serde_json::json!({ "refreshToken": "R1" }));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"accessToken\":\"A2\",\"refreshToken\":\"R2\"}");
		})
		.await;
	let replayed = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/cart").header("authorization", "Bearer A2");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"items\":[]}");
		})
		.await;
	let cart: serde_json::Value = dispatcher
		.get("cart")
		.await
		.expect("The replayed call should succeed with the rotated credential.");

	stale.assert_async().await;
	exchange.assert_async().await;
	replayed.assert_async().await;

	assert_eq!(cart, serde_json::json!({ "items": [] }));

	let snapshot =
		store.snapshot().await.expect("Session snapshot should succeed after rotation.");
	let pair = snapshot.pair.expect("Rotated pair should be persisted.");

	assert_eq!(pair.access.reveal(), "A2");
	assert_eq!(pair.refresh.reveal(), "R2");
}

#[tokio::test]
async fn concurrent_auth_failures_share_a_single_exchange() {
	let server = MockServer::start_async().await;
	let (dispatcher, _store, _notifier, _redirect) = build_dispatcher(&server);

	seed_pair(&dispatcher, "A1", "R1").await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/cart").header("authorization", "Bearer A1");
			then.status(401);
		})
		.await;

	let exchange = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"accessToken\":\"A2\",\"refreshToken\":\"R2\"}");
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/cart").header("authorization", "Bearer A2");
			then.status(200).header("content-type", "application/json").body("{\"ok\":true}");
		})
		.await;

	let (a, b, c, d) = tokio::join!(
		dispatcher.get::<serde_json::Value>("cart"),
		dispatcher.get::<serde_json::Value>("cart"),
		dispatcher.get::<serde_json::Value>("cart"),
		dispatcher.get::<serde_json::Value>("cart"),
	);

	for result in [a, b, c, d] {
		let value = result.expect("Every queued call should replay successfully.");

		assert_eq!(value, serde_json::json!({ "ok": true }));
	}

	exchange.assert_calls_async(1).await;

	assert_eq!(dispatcher.refresh_metrics.successes(), 1);
	assert_eq!(
		dispatcher.refresh_metrics.attempts(),
		dispatcher.refresh_metrics.successes() + dispatcher.refresh_metrics.reuses(),
	);
}

#[tokio::test]
async fn failed_exchange_rejects_queued_calls_and_clears_session() {
	let server = MockServer::start_async().await;
	let (dispatcher, store, notifier, redirect) = build_dispatcher(&server);

	seed_pair(&dispatcher, "A1", "R1").await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/orders");
			then.status(401);
		})
		.await;

	let exchange = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh-token");
			then.status(403)
				.header("content-type", "application/json")
				.body("{\"error\":\"refresh token revoked\"}");
		})
		.await;

	let (a, b, c) = tokio::join!(
		dispatcher.get::<serde_json::Value>("orders"),
		dispatcher.get::<serde_json::Value>("orders"),
		dispatcher.get::<serde_json::Value>("orders"),
	);

	for result in [a, b, c] {
		let err = result.expect_err("Every queued call should fail after the exchange fails.");

		assert!(err.is_terminal(), "Expected a terminal session error, got {err:?}.");
	}

	exchange.assert_calls_async(1).await;

	// Every persisted session key is gone, the user saw one message, and the shell navigated
	// to the login entry point once.
	for key in keys::ALL {
		assert!(!store.contains(key), "Session key `{key}` should be cleared.");
	}

	assert_eq!(notifier.messages(), vec![SESSION_EXPIRED_NOTICE.to_owned()]);
	assert_eq!(redirect.hits(), 1);

	// The session stays terminal until a new login: further calls fail without any exchange.
	let err = dispatcher
		.get::<serde_json::Value>("orders")
		.await
		.expect_err("Calls after session teardown should fail.");

	assert!(matches!(err, Error::SessionExpired));

	exchange.assert_calls_async(1).await;
}

#[tokio::test]
async fn call_before_login_fails_without_session_teardown_notice() {
	let server = MockServer::start_async().await;
	let (dispatcher, _store, notifier, redirect) = build_dispatcher(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/profile").header("authorization", "Bearer ");
			then.status(401);
		})
		.await;

	let err = dispatcher
		.get::<serde_json::Value>("profile")
		.await
		.expect_err("A credentialless call to a protected endpoint should fail.");

	assert!(matches!(err, Error::SessionExpired));
	assert!(notifier.messages().is_empty());
	assert_eq!(redirect.hits(), 0);
}
