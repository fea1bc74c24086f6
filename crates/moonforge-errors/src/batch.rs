// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batch queue for outgoing error events.
//!
//! Events accumulate until either `max_batch_size` items are queued (checked on
//! enqueue) or `max_wait` has elapsed since the last flush (checked on
//! [`BatchQueue::update`]). Only one batch is in flight at a time; producers can
//! keep enqueueing while it is. A failed batch is handed back to the caller in
//! [`FlushOutcome::Failed`] and is not requeued.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use moonforge_errors_core::{BatchResponse, ErrorEvent, QueuedBatchItem};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::TransportError;

/// Configuration for the event batch queue.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
	/// When false, events are sent one at a time.
	pub enabled: bool,
	/// Maximum number of events per batch; reaching it triggers a flush.
	pub max_batch_size: usize,
	/// Maximum time events wait before a tick flushes them.
	pub max_wait: Duration,
	/// Maximum number of events to queue before dropping oldest.
	pub max_queue_size: usize,
}

impl Default for BatchConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			max_batch_size: 10,
			max_wait: Duration::from_secs(10),
			max_queue_size: 1000,
		}
	}
}

/// Handler for sending batched events to the collector.
#[async_trait]
pub trait BatchSender: Send + Sync {
	async fn send_batch(&self, items: &[QueuedBatchItem]) -> Result<BatchResponse, TransportError>;
}

/// Observable queue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
	Idle,
	Accumulating,
	Sending,
}

/// Result of a flush attempt.
#[derive(Debug)]
pub enum FlushOutcome {
	/// Nothing was queued.
	Empty,
	/// Another flush is already sending; nothing was taken.
	InFlight,
	/// The batch was delivered.
	Sent {
		count: usize,
		response: BatchResponse,
	},
	/// The batch could not be delivered. The caller owns `items`.
	Failed {
		items: Vec<QueuedBatchItem>,
		error: TransportError,
	},
}

impl FlushOutcome {
	pub fn is_failed(&self) -> bool {
		matches!(self, FlushOutcome::Failed { .. })
	}
}

struct QueueState {
	items: VecDeque<QueuedBatchItem>,
	last_flush: Instant,
}

pub struct BatchQueue {
	config: BatchConfig,
	sender: Arc<dyn BatchSender>,
	state: Mutex<QueueState>,
	sending: AtomicBool,
}

/// Clears the in-flight flag when the flush future completes or is dropped.
struct SendingGuard<'a>(&'a AtomicBool);

impl Drop for SendingGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

impl BatchQueue {
	pub fn new(config: BatchConfig, sender: Arc<dyn BatchSender>) -> Self {
		Self {
			config,
			sender,
			state: Mutex::new(QueueState {
				items: VecDeque::new(),
				last_flush: Instant::now(),
			}),
			sending: AtomicBool::new(false),
		}
	}

	pub fn config(&self) -> &BatchConfig {
		&self.config
	}

	/// Queue an event. Returns the flush outcome if the size trigger fired.
	pub async fn enqueue(&self, event: ErrorEvent) -> Option<FlushOutcome> {
		let len = {
			let mut state = self.lock();
			while state.items.len() >= self.config.max_queue_size {
				if let Some(dropped) = state.items.pop_front() {
					warn!(
						client_error_id = %dropped.client_error_id,
						message = %dropped.event.message,
						"dropped queued error due to queue overflow"
					);
				}
			}
			state.items.push_back(QueuedBatchItem::new(event));
			state.items.len()
		};

		if len >= self.config.max_batch_size {
			debug!(queued = len, "batch size reached");
			Some(self.flush().await)
		} else {
			None
		}
	}

	/// Periodic tick. Flushes if events have waited `max_wait` since the last
	/// flush.
	pub async fn update(&self) -> Option<FlushOutcome> {
		let due = {
			let state = self.lock();
			!state.items.is_empty()
				&& Instant::now().saturating_duration_since(state.last_flush) >= self.config.max_wait
		};

		if due {
			debug!("batch wait time elapsed");
			Some(self.flush().await)
		} else {
			None
		}
	}

	/// Send up to `max_batch_size` of the oldest queued events.
	pub async fn flush(&self) -> FlushOutcome {
		if self
			.sending
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_err()
		{
			debug!("flush suppressed, batch already in flight");
			return FlushOutcome::InFlight;
		}
		let _guard = SendingGuard(&self.sending);

		let items: Vec<QueuedBatchItem> = {
			let mut state = self.lock();
			state.last_flush = Instant::now();
			let take = state.items.len().min(self.config.max_batch_size);
			state.items.drain(..take).collect()
		};

		if items.is_empty() {
			return FlushOutcome::Empty;
		}

		debug!(count = items.len(), "flushing error batch");
		match self.sender.send_batch(&items).await {
			Ok(response) => {
				debug!(
					count = items.len(),
					accepted = response.accepted,
					sampled_out = response.sampled_out,
					"error batch delivered"
				);
				FlushOutcome::Sent {
					count: items.len(),
					response,
				}
			}
			Err(error) => {
				warn!(count = items.len(), error = %error, "error batch failed");
				FlushOutcome::Failed { items, error }
			}
		}
	}

	/// Remove and return everything still queued. Items already handed to an
	/// in-flight send are not included.
	pub fn drain_pending(&self) -> Vec<QueuedBatchItem> {
		self.lock().items.drain(..).collect()
	}

	pub fn len(&self) -> usize {
		self.lock().items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn is_sending(&self) -> bool {
		self.sending.load(Ordering::SeqCst)
	}

	pub fn state(&self) -> BatchState {
		if self.is_sending() {
			BatchState::Sending
		} else if self.is_empty() {
			BatchState::Idle
		} else {
			BatchState::Accumulating
		}
	}

	fn lock(&self) -> MutexGuard<'_, QueueState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
