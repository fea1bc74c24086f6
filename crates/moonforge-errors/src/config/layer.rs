// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layers. Every field is optional so that defaults,
//! a TOML file and the environment can be stacked; later layers win.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::BatchConfig;
use crate::offline::OfflineConfig;
use crate::sampler::{RateThreshold, SamplingConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfigLayer {
	pub game_id: Option<String>,
	pub endpoint: Option<String>,
	pub release: Option<String>,
	pub environment: Option<String>,
	pub debug: Option<bool>,
	pub max_breadcrumbs: Option<usize>,
	pub shutdown_timeout_ms: Option<u64>,
	pub capture: Option<CaptureConfigLayer>,
	pub batch: Option<BatchConfigLayer>,
	pub offline: Option<OfflineConfigLayer>,
	pub sampling: Option<SamplingConfigLayer>,
	pub network: Option<NetworkConfigLayer>,
	pub scrub: Option<ScrubConfigLayer>,
}

impl TrackerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.game_id.is_some() {
			self.game_id = other.game_id;
		}
		if other.endpoint.is_some() {
			self.endpoint = other.endpoint;
		}
		if other.release.is_some() {
			self.release = other.release;
		}
		if other.environment.is_some() {
			self.environment = other.environment;
		}
		if other.debug.is_some() {
			self.debug = other.debug;
		}
		if other.max_breadcrumbs.is_some() {
			self.max_breadcrumbs = other.max_breadcrumbs;
		}
		if other.shutdown_timeout_ms.is_some() {
			self.shutdown_timeout_ms = other.shutdown_timeout_ms;
		}
		merge_section(&mut self.capture, other.capture, CaptureConfigLayer::merge);
		merge_section(&mut self.batch, other.batch, BatchConfigLayer::merge);
		merge_section(&mut self.offline, other.offline, OfflineConfigLayer::merge);
		merge_section(&mut self.sampling, other.sampling, SamplingConfigLayer::merge);
		merge_section(&mut self.network, other.network, NetworkConfigLayer::merge);
		merge_section(&mut self.scrub, other.scrub, ScrubConfigLayer::merge);
	}
}

fn merge_section<T: Default>(target: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
	if let Some(other) = other {
		merge(target.get_or_insert_with(T::default), other);
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfigLayer {
	pub exceptions: Option<bool>,
	pub log_errors: Option<bool>,
	pub native_crashes: Option<bool>,
	pub min_severity: Option<String>,
	pub in_app_native_modules: Option<Vec<String>>,
}

impl CaptureConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.exceptions.is_some() {
			self.exceptions = other.exceptions;
		}
		if other.log_errors.is_some() {
			self.log_errors = other.log_errors;
		}
		if other.native_crashes.is_some() {
			self.native_crashes = other.native_crashes;
		}
		if other.min_severity.is_some() {
			self.min_severity = other.min_severity;
		}
		if other.in_app_native_modules.is_some() {
			self.in_app_native_modules = other.in_app_native_modules;
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BatchConfigLayer {
	pub enabled: Option<bool>,
	pub max_batch_size: Option<usize>,
	pub max_wait_ms: Option<u64>,
	pub max_queue_size: Option<usize>,
}

impl BatchConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.max_batch_size.is_some() {
			self.max_batch_size = other.max_batch_size;
		}
		if other.max_wait_ms.is_some() {
			self.max_wait_ms = other.max_wait_ms;
		}
		if other.max_queue_size.is_some() {
			self.max_queue_size = other.max_queue_size;
		}
	}

	pub fn finalize(self) -> BatchConfig {
		let defaults = BatchConfig::default();
		BatchConfig {
			enabled: self.enabled.unwrap_or(defaults.enabled),
			max_batch_size: self.max_batch_size.unwrap_or(defaults.max_batch_size),
			max_wait: self
				.max_wait_ms
				.map(Duration::from_millis)
				.unwrap_or(defaults.max_wait),
			max_queue_size: self.max_queue_size.unwrap_or(defaults.max_queue_size),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OfflineConfigLayer {
	pub enabled: Option<bool>,
	pub max_stored: Option<usize>,
	pub directory: Option<PathBuf>,
	pub max_age_days: Option<u32>,
}

impl OfflineConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.max_stored.is_some() {
			self.max_stored = other.max_stored;
		}
		if other.directory.is_some() {
			self.directory = other.directory;
		}
		if other.max_age_days.is_some() {
			self.max_age_days = other.max_age_days;
		}
	}

	pub fn finalize(self) -> OfflineConfig {
		let defaults = OfflineConfig::default();
		OfflineConfig {
			enabled: self.enabled.unwrap_or(defaults.enabled),
			max_stored: self.max_stored.unwrap_or(defaults.max_stored),
			directory: self.directory.unwrap_or(defaults.directory),
			max_age_days: self.max_age_days.unwrap_or(defaults.max_age_days),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SamplingConfigLayer {
	pub enabled: Option<bool>,
	pub exception_rate: Option<f64>,
	pub network_rate: Option<f64>,
	pub custom_rate: Option<f64>,
	pub thresholds: Option<Vec<RateThreshold>>,
	pub min_rate: Option<f64>,
	pub window_secs: Option<u64>,
}

impl SamplingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.exception_rate.is_some() {
			self.exception_rate = other.exception_rate;
		}
		if other.network_rate.is_some() {
			self.network_rate = other.network_rate;
		}
		if other.custom_rate.is_some() {
			self.custom_rate = other.custom_rate;
		}
		if other.thresholds.is_some() {
			self.thresholds = other.thresholds;
		}
		if other.min_rate.is_some() {
			self.min_rate = other.min_rate;
		}
		if other.window_secs.is_some() {
			self.window_secs = other.window_secs;
		}
	}

	pub fn finalize(self) -> SamplingConfig {
		let defaults = SamplingConfig::default();
		SamplingConfig {
			enabled: self.enabled.unwrap_or(defaults.enabled),
			exception_rate: self.exception_rate.unwrap_or(defaults.exception_rate),
			network_rate: self.network_rate.unwrap_or(defaults.network_rate),
			custom_rate: self.custom_rate.unwrap_or(defaults.custom_rate),
			thresholds: self.thresholds.unwrap_or(defaults.thresholds),
			min_rate: self.min_rate.unwrap_or(defaults.min_rate),
			window: self
				.window_secs
				.map(Duration::from_secs)
				.unwrap_or(defaults.window),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfigLayer {
	pub timeout_ms: Option<u64>,
	pub max_retries: Option<u32>,
	pub retry_base_delay_ms: Option<u64>,
	pub retry_max_delay_ms: Option<u64>,
}

impl NetworkConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.timeout_ms.is_some() {
			self.timeout_ms = other.timeout_ms;
		}
		if other.max_retries.is_some() {
			self.max_retries = other.max_retries;
		}
		if other.retry_base_delay_ms.is_some() {
			self.retry_base_delay_ms = other.retry_base_delay_ms;
		}
		if other.retry_max_delay_ms.is_some() {
			self.retry_max_delay_ms = other.retry_max_delay_ms;
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScrubConfigLayer {
	pub enabled: Option<bool>,
	pub patterns: Option<Vec<String>>,
}

impl ScrubConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.patterns.is_some() {
			self.patterns = other.patterns;
		}
	}
}
