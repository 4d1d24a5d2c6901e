//! Transport primitives for credentialed API calls.
//!
//! [`Transport`] is the crate's only dependency on an HTTP stack. The dispatcher hands a fully
//! prepared [`OutboundRequest`] (method, absolute URL, bearer value, optional API-key header,
//! pre-serialized JSON body, optional timeout) to the transport and consumes the status code and
//! raw body bytes of the [`TransportResponse`]. Implementations must be `Send + Sync + 'static`
//! so a single transport can be shared by every call the dispatcher has in flight.

#[cfg(feature = "reqwest")]
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
// self
use crate::{_prelude::*, error::TransportError};

/// Header carrying the static API key on refresh exchanges.
pub const API_KEY_HEADER: &str = "x-api-key";

/// HTTP methods the dispatcher issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP PATCH.
	Patch,
	/// HTTP DELETE.
	Delete,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fully prepared request handed to a [`Transport`].
#[derive(Clone)]
pub struct OutboundRequest {
	/// HTTP method for the call.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Access credential carried as `Authorization: Bearer <credential>`.
	///
	/// The header is always sent; an empty credential still yields `Bearer ` so the server sees
	/// a consistent header shape before any login has happened.
	pub credential: String,
	/// Static API key attached under [`API_KEY_HEADER`], when present.
	pub api_key: Option<String>,
	/// Pre-serialized JSON body bytes, when the call carries one.
	pub body: Option<Vec<u8>>,
	/// Per-request timeout; used by the refresh exchange so a stalled call cannot block forever.
	pub timeout: Option<Duration>,
}
impl OutboundRequest {
	/// Returns the full bearer header value for this request.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.credential)
	}
}
impl Debug for OutboundRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OutboundRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("credential", &"<redacted>")
			.field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.field("timeout", &self.timeout)
			.finish()
	}
}

/// Status code and raw body bytes consumed by the dispatcher.
#[derive(Clone, Debug)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing dispatcher calls.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Executes the prepared request and resolves with the raw response.
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	const fn method_of(method: Method) -> reqwest::Method {
		match method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		}
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let url_view = request.url.to_string();
			let mut builder = client
				.request(Self::method_of(request.method), request.url.clone())
				.header(AUTHORIZATION, request.bearer_header());

			if let Some(api_key) = &request.api_key {
				builder = builder.header(API_KEY_HEADER, api_key);
			}
			if let Some(body) = request.body {
				builder = builder.header(CONTENT_TYPE, "application/json").body(body);
			}
			if let Some(timeout) = request.timeout {
				builder = builder.timeout(timeout);
			}

			let response = builder.send().await.map_err(|e| {
				if e.is_timeout() {
					TransportError::TimedOut { url: url_view.clone() }
				} else {
					TransportError::network(url_view.clone(), e)
				}
			})?;
			let status = response.status().as_u16();
			let body = response
				.bytes()
				.await
				.map_err(|e| TransportError::network(url_view, e))?
				.to_vec();

			Ok(TransportResponse { status, body })
		})
	}
}
