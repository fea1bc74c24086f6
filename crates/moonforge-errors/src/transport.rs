// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery of events to the collector.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moonforge_common_http::{retry, RetryConfig};
use moonforge_errors_core::{BatchResponse, Envelope, ErrorEvent, QueuedBatchItem, SingleResponse};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::batch::BatchSender;
use crate::error::{TrackerError, TransportError};

/// Header carrying the game id on every request.
pub const GAME_ID_HEADER: &str = "X-Game-Id";

/// Sends events to the collector.
#[async_trait]
pub trait Transport: Send + Sync {
	async fn send_one(&self, event: &ErrorEvent) -> Result<SingleResponse, TransportError>;

	async fn send_batch(&self, items: &[QueuedBatchItem]) -> Result<BatchResponse, TransportError>;

	/// Cheap local reachability check. Not a guarantee that a send succeeds.
	fn has_connectivity(&self) -> bool;
}

/// Local reachability probe, typically updated by the host from platform
/// network callbacks.
pub trait ConnectivityProbe: Send + Sync {
	fn is_online(&self) -> bool;
}

/// Probe backed by a flag the host sets. Starts online.
#[derive(Debug)]
pub struct ConnectivityFlag(AtomicBool);

impl ConnectivityFlag {
	pub fn new(online: bool) -> Self {
		Self(AtomicBool::new(online))
	}

	pub fn set_online(&self, online: bool) {
		self.0.store(online, Ordering::SeqCst);
	}
}

impl Default for ConnectivityFlag {
	fn default() -> Self {
		Self::new(true)
	}
}

impl ConnectivityProbe for ConnectivityFlag {
	fn is_online(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}

/// JSON-over-HTTP transport with retries.
pub struct HttpTransport {
	client: Client,
	endpoint: Url,
	game_id: String,
	retry: RetryConfig,
	probe: Arc<dyn ConnectivityProbe>,
}

impl HttpTransport {
	pub fn new(
		endpoint: Url,
		game_id: impl Into<String>,
		timeout: Duration,
		retry: RetryConfig,
		probe: Arc<dyn ConnectivityProbe>,
	) -> Result<Self, TrackerError> {
		let client = moonforge_common_http::builder()
			.timeout(timeout)
			.build()
			.map_err(TrackerError::HttpClient)?;
		Ok(Self {
			client,
			endpoint,
			game_id: game_id.into(),
			retry,
			probe,
		})
	}

	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	async fn post<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T, TransportError> {
		retry(&self.retry, move || async move {
			let response = self
				.client
				.post(self.endpoint.clone())
				.header(reqwest::header::CONTENT_TYPE, "application/json")
				.header(GAME_ID_HEADER, &self.game_id)
				.body(body.to_vec())
				.send()
				.await
				.map_err(TransportError::from_reqwest)?;
			decode_response(response).await
		})
		.await
	}
}

#[async_trait]
impl Transport for HttpTransport {
	#[instrument(skip(self, event), fields(kind = %event.kind))]
	async fn send_one(&self, event: &ErrorEvent) -> Result<SingleResponse, TransportError> {
		let body = serde_json::to_vec(&Envelope::single(&self.game_id, event))?;
		let response: SingleResponse = self.post(&body).await?;
		if !response.is_ok() {
			return Err(TransportError::Rejected(
				response
					.message
					.unwrap_or_else(|| "collector reported an error".to_string()),
			));
		}
		debug!(error_id = ?response.error_id, "error delivered");
		Ok(response)
	}

	#[instrument(skip(self, items), fields(count = items.len()))]
	async fn send_batch(&self, items: &[QueuedBatchItem]) -> Result<BatchResponse, TransportError> {
		let body = serde_json::to_vec(&Envelope::batch(&self.game_id, items))?;
		let response: BatchResponse = self.post(&body).await?;
		if !response.is_ok() {
			return Err(TransportError::Rejected(
				response
					.message
					.unwrap_or_else(|| "collector reported an error".to_string()),
			));
		}
		Ok(response)
	}

	fn has_connectivity(&self) -> bool {
		self.probe.is_online()
	}
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
	let status = response.status();

	if status == StatusCode::TOO_MANY_REQUESTS {
		let retry_after = parse_retry_after(&response);
		warn!(retry_after = ?retry_after, "collector rate limited request");
		return Err(TransportError::RateLimited { retry_after });
	}

	if !status.is_success() {
		let message = response.text().await.unwrap_or_default();
		return Err(if status.is_server_error() {
			TransportError::Server {
				status: status.as_u16(),
				message,
			}
		} else {
			TransportError::Client {
				status: status.as_u16(),
				message,
			}
		});
	}

	let bytes = response.bytes().await.map_err(TransportError::from_reqwest)?;
	serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn parse_retry_after(response: &Response) -> Option<Duration> {
	response
		.headers()
		.get(RETRY_AFTER)?
		.to_str()
		.ok()?
		.trim()
		.parse::<u64>()
		.ok()
		.map(Duration::from_secs)
}

/// Adapts a [`Transport`] for use by the batch queue.
pub struct TransportBatchSender(pub Arc<dyn Transport>);

#[async_trait]
impl BatchSender for TransportBatchSender {
	async fn send_batch(&self, items: &[QueuedBatchItem]) -> Result<BatchResponse, TransportError> {
		self.0.send_batch(items).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use moonforge_errors_core::{ErrorCategory, ErrorKind, Severity};
	use wiremock::matchers::{body_partial_json, header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	const GAME_ID: &str = "6f1c2a9e-4c1b-4d7e-9a51-2f2b8c1d0e3a";

	fn transport(server: &MockServer, max_retries: u32) -> HttpTransport {
		let endpoint = Url::parse(&format!("{}/ingest", server.uri())).unwrap();
		HttpTransport::new(
			endpoint,
			GAME_ID,
			Duration::from_secs(5),
			RetryConfig {
				max_retries,
				base_delay: Duration::from_millis(1),
				max_delay: Duration::from_millis(5),
				..Default::default()
			},
			Arc::new(ConnectivityFlag::default()),
		)
		.unwrap()
	}

	fn event() -> ErrorEvent {
		ErrorEvent::new(
			ErrorKind::Exception,
			ErrorCategory::Unhandled,
			Severity::Error,
			"IndexOutOfRangeException: Index was outside the bounds of the array.",
		)
	}

	#[tokio::test]
	async fn sends_single_envelope_with_game_header() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/ingest"))
			.and(header(GAME_ID_HEADER, GAME_ID))
			.and(body_partial_json(serde_json::json!({
				"type": "error",
				"payload": { "gameId": GAME_ID, "kind": "exception" }
			})))
			.respond_with(
				ResponseTemplate::new(200)
					.set_body_json(serde_json::json!({"status": "ok", "errorId": "err_1"})),
			)
			.expect(1)
			.mount(&server)
			.await;

		let response = transport(&server, 3).send_one(&event()).await.unwrap();
		assert_eq!(response.error_id.as_deref(), Some("err_1"));
	}

	#[tokio::test]
	async fn retries_server_errors_up_to_ceiling() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(503))
			.expect(3)
			.mount(&server)
			.await;

		let err = transport(&server, 2).send_one(&event()).await.unwrap_err();
		assert!(matches!(err, TransportError::Server { status: 503, .. }));
	}

	#[tokio::test]
	async fn does_not_retry_client_errors() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(404))
			.expect(1)
			.mount(&server)
			.await;

		let err = transport(&server, 3).send_one(&event()).await.unwrap_err();
		assert!(matches!(err, TransportError::Client { status: 404, .. }));
	}

	#[tokio::test]
	async fn surfaces_retry_after_on_429() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "120"))
			.expect(1)
			.mount(&server)
			.await;

		let err = transport(&server, 0).send_one(&event()).await.unwrap_err();
		assert_eq!(err.retry_after(), Some(Duration::from_secs(120)));
	}

	#[tokio::test]
	async fn recovers_after_transient_failure() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(502))
			.up_to_n_times(1)
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
			.expect(1)
			.mount(&server)
			.await;

		assert!(transport(&server, 3).send_one(&event()).await.is_ok());
	}

	#[tokio::test]
	async fn error_status_in_body_is_terminal() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(
				ResponseTemplate::new(200)
					.set_body_json(serde_json::json!({"status": "error", "message": "unknown game"})),
			)
			.expect(1)
			.mount(&server)
			.await;

		let err = transport(&server, 3).send_one(&event()).await.unwrap_err();
		assert!(matches!(err, TransportError::Rejected(ref m) if m == "unknown game"));
	}

	#[tokio::test]
	async fn sends_batch_envelope() {
		let server = MockServer::start().await;
		let items = vec![QueuedBatchItem::new(event()), QueuedBatchItem::new(event())];
		Mock::given(method("POST"))
			.and(body_partial_json(serde_json::json!({
				"type": "error_batch",
				"game": GAME_ID
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"status": "ok",
				"total": 2,
				"accepted": 2,
				"sampledOut": 0,
				"results": [
					{"clientErrorId": items[0].client_error_id.to_string(), "status": "accepted"},
					{"clientErrorId": items[1].client_error_id.to_string(), "status": "accepted"}
				]
			})))
			.expect(1)
			.mount(&server)
			.await;

		let response = transport(&server, 0).send_batch(&items).await.unwrap();
		assert_eq!(response.accepted, 2);
		assert_eq!(response.results.len(), 2);
	}

	#[tokio::test]
	async fn connection_failure_is_retryable() {
		let endpoint = Url::parse("http://127.0.0.1:1/ingest").unwrap();
		let transport = HttpTransport::new(
			endpoint,
			GAME_ID,
			Duration::from_secs(2),
			RetryConfig {
				max_retries: 1,
				base_delay: Duration::from_millis(1),
				..Default::default()
			},
			Arc::new(ConnectivityFlag::default()),
		)
		.unwrap();

		let err = transport.send_one(&event()).await.unwrap_err();
		assert!(matches!(
			err,
			TransportError::Connection(_) | TransportError::Timeout
		));
	}

	#[test]
	fn connectivity_follows_flag() {
		let flag = Arc::new(ConnectivityFlag::default());
		assert!(flag.is_online());
		flag.set_online(false);
		assert!(!flag.is_online());
	}
}
