// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the error tracking SDK.

use std::path::PathBuf;
use std::time::Duration;

use moonforge_common_http::RetryableError;
use thiserror::Error;

/// Result type alias for tracker setup operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors raised while constructing the tracker. Capture paths never return
/// errors to the host.
#[derive(Debug, Error)]
pub enum TrackerError {
	/// Configuration is missing or invalid.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The HTTP client could not be built.
	#[error("failed to build HTTP client: {0}")]
	HttpClient(#[source] reqwest::Error),

	/// The offline store directory could not be prepared.
	#[error("failed to open offline store at {path}: {source}")]
	OfflineStore {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// A native crash source was installed outside a tokio runtime.
	#[error("no tokio runtime available to process native crashes")]
	NoRuntime,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config file {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("game id is required")]
	MissingGameId,

	#[error("game id must be a UUID, got {0:?}")]
	InvalidGameId(String),

	#[error("invalid collector endpoint {url:?}: {reason}")]
	InvalidEndpoint { url: String, reason: String },

	#[error("invalid value for {field}: {reason}")]
	InvalidValue { field: &'static str, reason: String },

	#[error("invalid environment variable {var}={value:?}")]
	InvalidEnv { var: String, value: String },

	#[error("invalid scrub pattern {pattern:?}: {source}")]
	InvalidScrubPattern {
		pattern: String,
		#[source]
		source: regex::Error,
	},
}

/// Errors from a delivery attempt.
#[derive(Debug, Error)]
pub enum TransportError {
	/// The request never produced a response.
	#[error("connection failed: {0}")]
	Connection(String),

	/// The request exceeded the configured timeout.
	#[error("request timed out")]
	Timeout,

	/// The collector answered 5xx.
	#[error("server error (status {status}): {message}")]
	Server { status: u16, message: String },

	/// The collector answered 4xx other than 429.
	#[error("client error (status {status}): {message}")]
	Client { status: u16, message: String },

	/// The collector answered 429.
	#[error("rate limited, retry after {retry_after:?}")]
	RateLimited { retry_after: Option<Duration> },

	/// The collector accepted the request but reported failure in the body.
	#[error("rejected by collector: {0}")]
	Rejected(String),

	/// The response body could not be decoded.
	#[error("invalid response body: {0}")]
	Decode(String),

	/// The payload could not be serialized.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl TransportError {
	/// Classify a reqwest failure that happened before a status was received.
	pub fn from_reqwest(err: reqwest::Error) -> Self {
		if err.is_timeout() {
			TransportError::Timeout
		} else if err.is_decode() {
			TransportError::Decode(err.to_string())
		} else {
			TransportError::Connection(err.to_string())
		}
	}

	/// Server-provided throttle window, if this was a 429 carrying one.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			TransportError::RateLimited { retry_after } => *retry_after,
			_ => None,
		}
	}
}

impl RetryableError for TransportError {
	fn is_retryable(&self) -> bool {
		matches!(
			self,
			TransportError::Connection(_)
				| TransportError::Timeout
				| TransportError::Server { .. }
				| TransportError::RateLimited { .. }
		)
	}
}
