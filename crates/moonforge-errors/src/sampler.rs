// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Adaptive sampling keyed by error fingerprint.
//!
//! Every event is fingerprinted and counted within a rolling window. The more
//! often a fingerprint has been seen in the current window, the lower its
//! sample rate, down to a floor. Fatal events and crashes are always sent.

use std::collections::HashMap;
use std::time::Duration;

use moonforge_errors_core::{compute_fingerprint, ErrorEvent, ErrorKind};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Above `min_count` occurrences in the window, cap the rate at `rate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateThreshold {
	pub min_count: u64,
	pub rate: f64,
}

impl RateThreshold {
	pub const fn new(min_count: u64, rate: f64) -> Self {
		Self { min_count, rate }
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
	pub enabled: bool,
	pub exception_rate: f64,
	pub network_rate: f64,
	pub custom_rate: f64,
	pub thresholds: Vec<RateThreshold>,
	pub min_rate: f64,
	pub window: Duration,
}

impl Default for SamplingConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			exception_rate: 1.0,
			network_rate: 1.0,
			custom_rate: 1.0,
			thresholds: vec![
				RateThreshold::new(10, 0.5),
				RateThreshold::new(50, 0.2),
				RateThreshold::new(100, 0.1),
				RateThreshold::new(500, 0.05),
			],
			min_rate: 0.01,
			window: Duration::from_secs(60 * 60),
		}
	}
}

/// Outcome of classifying one event.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingDecision {
	pub fingerprint: String,
	pub should_send: bool,
	pub sample_rate: f64,
	pub occurrence_count: u64,
}

#[derive(Debug, Clone, Copy)]
struct FingerprintCounter {
	count: u64,
	window_start: Instant,
}

pub struct Sampler {
	config: SamplingConfig,
	counters: HashMap<String, FingerprintCounter>,
	rng: fastrand::Rng,
}

impl Sampler {
	pub fn new(config: SamplingConfig) -> Self {
		Self {
			config,
			counters: HashMap::new(),
			rng: fastrand::Rng::new(),
		}
	}

	/// Sampler with a deterministic random source.
	pub fn with_seed(config: SamplingConfig, seed: u64) -> Self {
		Self {
			config,
			counters: HashMap::new(),
			rng: fastrand::Rng::with_seed(seed),
		}
	}

	pub fn config(&self) -> &SamplingConfig {
		&self.config
	}

	pub fn classify(&mut self, event: &ErrorEvent) -> SamplingDecision {
		self.classify_at(event, Instant::now())
	}

	pub fn classify_at(&mut self, event: &ErrorEvent, now: Instant) -> SamplingDecision {
		let fingerprint = compute_fingerprint(event);
		let occurrence_count = self.record(&fingerprint, now);

		if !self.config.enabled || event.is_fatal() {
			return SamplingDecision {
				fingerprint,
				should_send: true,
				sample_rate: 1.0,
				occurrence_count,
			};
		}

		let sample_rate = self.effective_rate(event.kind, occurrence_count);
		let should_send = self.rng.f64() < sample_rate;

		SamplingDecision {
			fingerprint,
			should_send,
			sample_rate,
			occurrence_count,
		}
	}

	/// Rate for an event of `kind` that has been seen `count` times in the
	/// current window.
	pub fn effective_rate(&self, kind: ErrorKind, count: u64) -> f64 {
		let base = self.base_rate(kind);
		let damped = self
			.config
			.thresholds
			.iter()
			.filter(|t| count >= t.min_count)
			.map(|t| t.rate)
			.fold(base, f64::min);
		damped.max(self.config.min_rate)
	}

	pub fn base_rate(&self, kind: ErrorKind) -> f64 {
		match kind {
			ErrorKind::Crash => 1.0,
			ErrorKind::Exception => self.config.exception_rate,
			ErrorKind::Network => self.config.network_rate,
			ErrorKind::Custom => self.config.custom_rate,
		}
	}

	/// Drop counters whose window has elapsed. Returns how many were removed.
	pub fn cleanup(&mut self, now: Instant) -> usize {
		let window = self.config.window;
		let before = self.counters.len();
		self.counters
			.retain(|_, counter| now.saturating_duration_since(counter.window_start) < window);
		before - self.counters.len()
	}

	pub fn counter_count(&self) -> usize {
		self.counters.len()
	}

	fn record(&mut self, fingerprint: &str, now: Instant) -> u64 {
		let window = self.config.window;
		let counter = self
			.counters
			.entry(fingerprint.to_string())
			.or_insert(FingerprintCounter {
				count: 0,
				window_start: now,
			});
		if now.saturating_duration_since(counter.window_start) >= window {
			counter.count = 0;
			counter.window_start = now;
		}
		counter.count += 1;
		counter.count
	}
}
