// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire envelopes, collector responses and the persisted offline record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::ErrorEvent;

/// Client-generated id correlating a batch item with its per-item result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientErrorId(pub Uuid);

impl ClientErrorId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for ClientErrorId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for ClientErrorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for ClientErrorId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// An event waiting in the batch queue. The game id travels on the batch
/// envelope instead of on each item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedBatchItem {
	pub client_error_id: ClientErrorId,
	#[serde(flatten)]
	pub event: ErrorEvent,
}

impl QueuedBatchItem {
	pub fn new(event: ErrorEvent) -> Self {
		Self {
			client_error_id: ClientErrorId::new(),
			event,
		}
	}
}

/// Single-event payload: the event fields plus the game id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SinglePayload<'a> {
	#[serde(flatten)]
	pub event: &'a ErrorEvent,
	pub game_id: &'a str,
}

/// Outbound request body.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Envelope<'a> {
	#[serde(rename = "error")]
	Error { payload: SinglePayload<'a> },
	#[serde(rename = "error_batch")]
	ErrorBatch {
		game: &'a str,
		errors: &'a [QueuedBatchItem],
	},
}

impl<'a> Envelope<'a> {
	pub fn single(game_id: &'a str, event: &'a ErrorEvent) -> Self {
		Self::Error {
			payload: SinglePayload { event, game_id },
		}
	}

	pub fn batch(game_id: &'a str, errors: &'a [QueuedBatchItem]) -> Self {
		Self::ErrorBatch {
			game: game_id,
			errors,
		}
	}
}

/// Collector response to a single event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleResponse {
	pub status: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl SingleResponse {
	pub fn is_ok(&self) -> bool {
		self.status == "ok"
	}
}

/// Collector response to a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
	pub status: String,
	#[serde(default)]
	pub total: u32,
	#[serde(default)]
	pub accepted: u32,
	#[serde(default)]
	pub sampled_out: u32,
	#[serde(default)]
	pub results: Vec<BatchItemResult>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl BatchResponse {
	pub fn is_ok(&self) -> bool {
		self.status == "ok"
	}
}

/// Per-item outcome inside a batch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
	pub client_error_id: String,
	pub status: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

/// An event persisted to the offline store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
	#[serde(with = "chrono::serde::ts_milliseconds")]
	pub stored_at: DateTime<Utc>,
	pub event: ErrorEvent,
}
