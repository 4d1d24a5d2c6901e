//! Credentialed HTTP request dispatcher: bearer injection, single-flight credential refresh, and
//! replay-once recovery in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ext;
pub mod http;
pub mod obs;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience fixtures for integration tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		config::DispatcherConfig,
		dispatch::Dispatcher,
		ext::{LoginRedirect, Notifier, Severity},
		http::ReqwestTransport,
		store::{MemoryStore, SessionStore},
	};

	/// Dispatcher type alias used by reqwest-backed integration tests.
	pub type ReqwestTestDispatcher = Dispatcher<ReqwestTransport>;

	/// Notifier probe that records every message it receives.
	#[derive(Debug, Default)]
	pub struct RecordingNotifier(Mutex<Vec<(Severity, String)>>);
	impl RecordingNotifier {
		/// Returns the recorded messages in arrival order.
		pub fn messages(&self) -> Vec<(Severity, String)> {
			self.0.lock().clone()
		}
	}
	impl Notifier for RecordingNotifier {
		fn notify(&self, severity: Severity, message: &str) {
			self.0.lock().push((severity, message.to_owned()));
		}
	}

	/// Login-redirect probe that counts invocations.
	#[derive(Debug, Default)]
	pub struct RecordingRedirect(AtomicUsize);
	impl RecordingRedirect {
		/// Returns how many times the dispatcher requested a login redirect.
		pub fn hits(&self) -> usize {
			self.0.load(Ordering::Relaxed)
		}
	}
	impl LoginRedirect for RecordingRedirect {
		fn redirect_to_login(&self) {
			self.0.fetch_add(1, Ordering::Relaxed);
		}
	}

	/// Constructs a [`Dispatcher`] backed by an in-memory session store, recording probes, and
	/// the reqwest transport used across integration tests.
	pub fn build_reqwest_test_dispatcher(
		config: DispatcherConfig,
	) -> (ReqwestTestDispatcher, Arc<MemoryStore>, Arc<RecordingNotifier>, Arc<RecordingRedirect>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn SessionStore> = store_backend.clone();
		let notifier = Arc::new(RecordingNotifier::default());
		let redirect = Arc::new(RecordingRedirect::default());
		let dispatcher = Dispatcher::new(store, config)
			.with_notifier(notifier.clone())
			.with_login_redirect(redirect.clone());

		(dispatcher, store_backend, notifier, redirect)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as JsonValue;
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
