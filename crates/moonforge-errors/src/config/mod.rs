// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracker configuration.
//!
//! Configuration is assembled from layered sources with increasing precedence:
//! built-in defaults, an optional TOML file, then `MOONFORGE_*` environment
//! variables. The merged layer is finalized into a validated [`TrackerConfig`].
//!
//! ```toml
//! game_id = "6f1c2a9e-4c1b-4d7e-9a51-2f2b8c1d0e3a"
//! release = "2.3.1"
//!
//! [batch]
//! max_batch_size = 20
//! max_wait_ms = 10000
//!
//! [sampling]
//! exception_rate = 0.8
//! thresholds = [{ min_count = 10, rate = 0.5 }, { min_count = 50, rate = 0.2 }]
//! ```

mod layer;
mod sources;

use std::path::Path;
use std::time::Duration;

use moonforge_common_http::RetryConfig;
use moonforge_errors_core::native::default_in_app_modules;
use moonforge_errors_core::Severity;
use tracing::debug;
use url::Url;
use uuid::Uuid;

pub use layer::{
	BatchConfigLayer, CaptureConfigLayer, NetworkConfigLayer, OfflineConfigLayer,
	SamplingConfigLayer, ScrubConfigLayer, TrackerConfigLayer,
};
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use crate::batch::BatchConfig;
use crate::error::ConfigError;
use crate::offline::OfflineConfig;
use crate::sampler::SamplingConfig;
use crate::scrub::Scrubber;

/// Default collector endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://errors.moonforge.dev/api/v1/ingest";

/// Fully resolved tracker configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
	pub game_id: String,
	pub endpoint: String,
	pub release: Option<String>,
	pub environment: Option<String>,
	pub debug: bool,
	pub max_breadcrumbs: usize,
	pub shutdown_timeout: Duration,
	pub capture: CaptureConfig,
	pub batch: BatchConfig,
	pub offline: OfflineConfig,
	pub sampling: SamplingConfig,
	pub network: NetworkConfig,
	pub scrub: ScrubConfig,
}

impl TrackerConfig {
	/// Defaults for everything except the game id.
	pub fn new(game_id: impl Into<String>) -> Self {
		Self {
			game_id: game_id.into(),
			endpoint: DEFAULT_ENDPOINT.to_string(),
			release: None,
			environment: None,
			debug: false,
			max_breadcrumbs: 100,
			shutdown_timeout: Duration::from_secs(2),
			capture: CaptureConfig::default(),
			batch: BatchConfig::default(),
			offline: OfflineConfig::default(),
			sampling: SamplingConfig::default(),
			network: NetworkConfig::default(),
			scrub: ScrubConfig::default(),
		}
	}

	/// Check invariants that serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.game_id.trim().is_empty() {
			return Err(ConfigError::MissingGameId);
		}
		Uuid::parse_str(&self.game_id)
			.map_err(|_| ConfigError::InvalidGameId(self.game_id.clone()))?;

		let url = Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
			url: self.endpoint.clone(),
			reason: e.to_string(),
		})?;
		if !matches!(url.scheme(), "http" | "https") {
			return Err(ConfigError::InvalidEndpoint {
				url: self.endpoint.clone(),
				reason: format!("unsupported scheme {}", url.scheme()),
			});
		}

		check_rate("sampling.exception_rate", self.sampling.exception_rate)?;
		check_rate("sampling.network_rate", self.sampling.network_rate)?;
		check_rate("sampling.custom_rate", self.sampling.custom_rate)?;
		check_rate("sampling.min_rate", self.sampling.min_rate)?;
		for threshold in &self.sampling.thresholds {
			check_rate("sampling.thresholds", threshold.rate)?;
		}
		if self.sampling.window.is_zero() {
			return Err(ConfigError::InvalidValue {
				field: "sampling.window_secs",
				reason: "must be greater than zero".to_string(),
			});
		}

		if self.batch.max_batch_size == 0 {
			return Err(ConfigError::InvalidValue {
				field: "batch.max_batch_size",
				reason: "must be at least 1".to_string(),
			});
		}
		if self.batch.max_queue_size < self.batch.max_batch_size {
			return Err(ConfigError::InvalidValue {
				field: "batch.max_queue_size",
				reason: "must not be smaller than max_batch_size".to_string(),
			});
		}

		if self.network.timeout.is_zero() {
			return Err(ConfigError::InvalidValue {
				field: "network.timeout_ms",
				reason: "must be greater than zero".to_string(),
			});
		}

		Scrubber::new(&self.scrub.patterns)?;
		Ok(())
	}
}

fn check_rate(field: &'static str, rate: f64) -> Result<(), ConfigError> {
	if (0.0..=1.0).contains(&rate) {
		Ok(())
	} else {
		Err(ConfigError::InvalidValue {
			field,
			reason: format!("rate {rate} is outside [0, 1]"),
		})
	}
}

/// Which capture sources feed the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
	pub exceptions: bool,
	pub log_errors: bool,
	pub native_crashes: bool,
	pub min_severity: Severity,
	pub in_app_native_modules: Vec<String>,
}

impl Default for CaptureConfig {
	fn default() -> Self {
		Self {
			exceptions: true,
			log_errors: true,
			native_crashes: true,
			min_severity: Severity::Info,
			in_app_native_modules: default_in_app_modules(),
		}
	}
}

/// Request timeout and retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
	pub timeout: Duration,
	pub max_retries: u32,
	pub retry_base_delay: Duration,
	pub retry_max_delay: Duration,
}

impl Default for NetworkConfig {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(10),
			max_retries: 3,
			retry_base_delay: Duration::from_secs(1),
			retry_max_delay: Duration::from_secs(30),
		}
	}
}

impl NetworkConfig {
	pub fn retry_config(&self) -> RetryConfig {
		RetryConfig {
			max_retries: self.max_retries,
			base_delay: self.retry_base_delay,
			max_delay: self.retry_max_delay,
			..RetryConfig::default()
		}
	}
}

/// Redaction of sensitive text before events leave the process.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrubConfig {
	pub enabled: bool,
	pub patterns: Vec<String>,
}

impl Default for ScrubConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			patterns: crate::scrub::default_patterns(),
		}
	}
}

/// Load configuration from defaults and the process environment.
pub fn load_config() -> Result<TrackerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> =
		vec![Box::new(DefaultsSource), Box::new(EnvSource::process())];
	load_from_sources(sources)
}

/// Load configuration with a TOML file between the defaults and the
/// environment.
pub fn load_config_with_file(path: impl AsRef<Path>) -> Result<TrackerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(path.as_ref())),
		Box::new(EnvSource::process()),
	];
	load_from_sources(sources)
}

/// Merge the given sources in precedence order and finalize.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<TrackerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = TrackerConfigLayer::default();
	for source in &sources {
		debug!(source = source.name(), "applying config source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize a merged layer into a validated configuration.
pub fn finalize(layer: TrackerConfigLayer) -> Result<TrackerConfig, ConfigError> {
	let game_id = layer.game_id.ok_or(ConfigError::MissingGameId)?;
	let mut config = TrackerConfig::new(game_id);

	if let Some(endpoint) = layer.endpoint {
		config.endpoint = endpoint;
	}
	config.release = layer.release;
	config.environment = layer.environment;
	config.debug = layer.debug.unwrap_or(false);
	if let Some(max) = layer.max_breadcrumbs {
		config.max_breadcrumbs = max;
	}
	if let Some(ms) = layer.shutdown_timeout_ms {
		config.shutdown_timeout = Duration::from_millis(ms);
	}

	if let Some(capture) = layer.capture {
		if let Some(v) = capture.exceptions {
			config.capture.exceptions = v;
		}
		if let Some(v) = capture.log_errors {
			config.capture.log_errors = v;
		}
		if let Some(v) = capture.native_crashes {
			config.capture.native_crashes = v;
		}
		if let Some(v) = capture.min_severity {
			config.capture.min_severity =
				v.to_ascii_lowercase()
					.parse()
					.map_err(|_| ConfigError::InvalidValue {
						field: "capture.min_severity",
						reason: format!("unknown severity {v:?}"),
					})?;
		}
		if let Some(v) = capture.in_app_native_modules {
			config.capture.in_app_native_modules = v;
		}
	}

	config.batch = layer.batch.unwrap_or_default().finalize();
	config.offline = layer.offline.unwrap_or_default().finalize();
	config.sampling = layer.sampling.unwrap_or_default().finalize();

	if let Some(network) = layer.network {
		if let Some(ms) = network.timeout_ms {
			config.network.timeout = Duration::from_millis(ms);
		}
		if let Some(n) = network.max_retries {
			config.network.max_retries = n;
		}
		if let Some(ms) = network.retry_base_delay_ms {
			config.network.retry_base_delay = Duration::from_millis(ms);
		}
		if let Some(ms) = network.retry_max_delay_ms {
			config.network.retry_max_delay = Duration::from_millis(ms);
		}
	}

	if let Some(scrub) = layer.scrub {
		if let Some(enabled) = scrub.enabled {
			config.scrub.enabled = enabled;
		}
		if let Some(patterns) = scrub.patterns {
			config.scrub.patterns = patterns;
		}
	}

	config.validate()?;
	Ok(config)
}
