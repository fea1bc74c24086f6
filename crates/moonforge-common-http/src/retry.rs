// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Retry with exponential backoff and jitter.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Fraction of the backoff delay added as random jitter (at most).
const DEFAULT_JITTER_RATIO: f64 = 0.3;

/// Errors that know whether repeating the operation could succeed.
pub trait RetryableError {
	/// Returns true if the failed operation may succeed when attempted again.
	fn is_retryable(&self) -> bool;
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() || self.is_request() {
			return true;
		}
		match self.status() {
			Some(status) => status.is_server_error() || status.as_u16() == 429,
			None => false,
		}
	}
}

/// Retry policy for outbound requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Retries after the first attempt; total attempts are `max_retries + 1`.
	pub max_retries: u32,
	/// Delay before the first retry; doubled for each following retry.
	pub base_delay: Duration,
	/// Upper bound for a single delay, before jitter.
	pub max_delay: Duration,
	/// Maximum jitter as a fraction of the delay.
	pub jitter_ratio: f64,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: 3,
			base_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(30),
			jitter_ratio: DEFAULT_JITTER_RATIO,
		}
	}
}

impl RetryConfig {
	/// Backoff before retry number `attempt` (1-based), without jitter.
	pub fn base_backoff(&self, attempt: u32) -> Duration {
		let exponent = attempt.saturating_sub(1).min(31);
		let delay = self.base_delay.saturating_mul(1u32 << exponent);
		delay.min(self.max_delay)
	}

	/// Backoff before retry number `attempt` (1-based) with random jitter.
	pub fn backoff(&self, attempt: u32) -> Duration {
		let delay = self.base_backoff(attempt);
		let ratio = self.jitter_ratio.clamp(0.0, 1.0);
		delay + delay.mul_f64(ratio * fastrand::f64())
	}
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent. The last error is returned on failure.
pub async fn retry<F, Fut, T, E>(config: &RetryConfig, mut op: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + Display,
{
	let mut attempt: u32 = 0;
	loop {
		attempt += 1;
		match op().await {
			Ok(value) => {
				if attempt > 1 {
					debug!(attempt, "request succeeded after retry");
				}
				return Ok(value);
			}
			Err(err) if err.is_retryable() && attempt <= config.max_retries => {
				let delay = config.backoff(attempt);
				warn!(
					attempt,
					max_retries = config.max_retries,
					delay_ms = delay.as_millis() as u64,
					error = %err,
					"transient failure, retrying"
				);
				tokio::time::sleep(delay).await;
			}
			Err(err) => return Err(err),
		}
	}
}
