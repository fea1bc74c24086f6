// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use moonforge_errors::{ErrorEvent, TrackerConfig, Transport, TransportError};
use moonforge_errors_core::{BatchResponse, QueuedBatchItem, SingleResponse};

pub const GAME_ID: &str = "6f1c2a9e-4c1b-4d7e-9a51-2f2b8c1d0e3a";

pub const SEGV_RECORD: &str = r#"{
	"signal": 11,
	"signalName": "SIGSEGV",
	"signalDescription": "Segmentation fault",
	"faultAddress": "0x0",
	"threadId": 4821,
	"siCode": 1,
	"frames": [
		{"frame": 0, "address": "0x7a1b2c", "module": "libil2cpp.so", "symbol": "Enemy_Tick", "offset": "16"},
		{"frame": 1, "address": "0x7a0000", "module": "libc.so", "symbol": "???"}
	]
}"#;

/// How the mock answers the next sends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Failure {
	Server,
	Client,
	RateLimited(Duration),
}

impl Failure {
	fn error(self) -> TransportError {
		match self {
			Self::Server => TransportError::Server {
				status: 503,
				message: "unavailable".to_string(),
			},
			Self::Client => TransportError::Client {
				status: 400,
				message: "bad request".to_string(),
			},
			Self::RateLimited(retry_after) => TransportError::RateLimited {
				retry_after: Some(retry_after),
			},
		}
	}
}

#[derive(Default)]
pub struct MockTransport {
	singles: Mutex<Vec<ErrorEvent>>,
	batches: Mutex<Vec<Vec<QueuedBatchItem>>>,
	attempts: Mutex<usize>,
	failure: Mutex<Option<Failure>>,
}

impl MockTransport {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn failing(failure: Failure) -> Self {
		let transport = Self::default();
		transport.fail_with(Some(failure));
		transport
	}

	pub fn fail_with(&self, failure: Option<Failure>) {
		*self.failure.lock().unwrap() = failure;
	}

	/// Every call, successful or not.
	pub fn attempts(&self) -> usize {
		*self.attempts.lock().unwrap()
	}

	pub fn singles(&self) -> Vec<ErrorEvent> {
		self.singles.lock().unwrap().clone()
	}

	pub fn batches(&self) -> Vec<Vec<QueuedBatchItem>> {
		self.batches.lock().unwrap().clone()
	}

	/// Every delivered event, singles first.
	pub fn delivered(&self) -> Vec<ErrorEvent> {
		let mut events = self.singles();
		for batch in self.batches() {
			events.extend(batch.into_iter().map(|item| item.event));
		}
		events
	}

	fn check(&self) -> Result<(), TransportError> {
		*self.attempts.lock().unwrap() += 1;
		match *self.failure.lock().unwrap() {
			Some(failure) => Err(failure.error()),
			None => Ok(()),
		}
	}
}

#[async_trait]
impl Transport for MockTransport {
	async fn send_one(&self, event: &ErrorEvent) -> Result<SingleResponse, TransportError> {
		self.check()?;
		self.singles.lock().unwrap().push(event.clone());
		Ok(SingleResponse {
			status: "ok".to_string(),
			error_id: Some(format!("err_{}", self.singles.lock().unwrap().len())),
			message: None,
		})
	}

	async fn send_batch(&self, items: &[QueuedBatchItem]) -> Result<BatchResponse, TransportError> {
		self.check()?;
		self.batches.lock().unwrap().push(items.to_vec());
		Ok(BatchResponse {
			status: "ok".to_string(),
			total: items.len() as u32,
			accepted: items.len() as u32,
			sampled_out: 0,
			results: Vec::new(),
			message: None,
		})
	}

	fn has_connectivity(&self) -> bool {
		true
	}
}

/// Config with sampling off and the offline store in `dir`.
pub fn config(dir: &Path) -> TrackerConfig {
	let mut config = TrackerConfig::new(GAME_ID);
	config.sampling.enabled = false;
	config.offline.directory = dir.to_path_buf();
	config.batch.max_batch_size = 3;
	config.batch.max_wait = Duration::from_secs(10);
	config
}
