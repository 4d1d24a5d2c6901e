//! Demonstrates replay-once recovery: the first call carries an expired credential, the
//! dispatcher rotates the pair through the refresh endpoint, and the original call is replayed
//! transparently.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use bearer_dispatch::{
	auth::CredentialPair,
	config::DispatcherConfig,
	dispatch::Dispatcher,
	store::{MemoryStore, SessionStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/products").header("authorization", "Bearer expired-access");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh-token").header("x-api-key", "storefront-key");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"accessToken\":\"fresh-access\",\"refreshToken\":\"fresh-refresh\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/products").header("authorization", "Bearer fresh-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"id\":1,\"name\":\"kettle\"}]");
		})
		.await;

	let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::default());
	let config = DispatcherConfig::builder(Url::parse(&server.url("/api/"))?)
		.api_key("storefront-key")
		.build()?;
	let dispatcher = Dispatcher::new(store, config);

	dispatcher.install_credentials(CredentialPair::new("expired-access", "valid-refresh")).await?;

	let products: serde_json::Value = dispatcher.get("products").await?;

	println!("Products fetched after a transparent credential rotation: {products}.");
	println!("Refresh exchanges performed: {}.", dispatcher.refresh_metrics.successes());

	Ok(())
}
