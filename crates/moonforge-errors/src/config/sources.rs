// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files and environment
//! variables.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use super::layer::{
	BatchConfigLayer, CaptureConfigLayer, NetworkConfigLayer, OfflineConfigLayer,
	SamplingConfigLayer, ScrubConfigLayer, TrackerConfigLayer,
};
use crate::error::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<TrackerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<TrackerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(TrackerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<TrackerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(TrackerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: TrackerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: MOONFORGE_<FIELD> for top-level settings and
/// MOONFORGE_<SECTION>_<FIELD> for sections.
pub struct EnvSource {
	vars: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Read from the process environment.
	pub fn process() -> Self {
		Self { vars: None }
	}

	/// Read from a fixed map instead of the process environment.
	pub fn from_map(vars: HashMap<String, String>) -> Self {
		Self { vars: Some(vars) }
	}

	fn var(&self, name: &str) -> Option<String> {
		let value = match &self.vars {
			Some(vars) => vars.get(name).cloned(),
			None => std::env::var(name).ok(),
		};
		value.filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn parsed<T: FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidEnv {
				var: name.to_string(),
				value: v,
			}),
			None => Ok(None),
		}
	}

	fn list(&self, name: &str) -> Option<Vec<String>> {
		self.var(name).map(|v| {
			v.split(',')
				.map(str::trim)
				.filter(|s| !s.is_empty())
				.map(str::to_string)
				.collect()
		})
	}

	fn capture(&self) -> Result<CaptureConfigLayer, ConfigError> {
		Ok(CaptureConfigLayer {
			exceptions: self.bool("MOONFORGE_CAPTURE_EXCEPTIONS"),
			log_errors: self.bool("MOONFORGE_CAPTURE_LOG_ERRORS"),
			native_crashes: self.bool("MOONFORGE_CAPTURE_NATIVE_CRASHES"),
			min_severity: self.var("MOONFORGE_CAPTURE_MIN_SEVERITY"),
			in_app_native_modules: self.list("MOONFORGE_CAPTURE_IN_APP_NATIVE_MODULES"),
		})
	}

	fn batch(&self) -> Result<BatchConfigLayer, ConfigError> {
		Ok(BatchConfigLayer {
			enabled: self.bool("MOONFORGE_BATCH_ENABLED"),
			max_batch_size: self.parsed("MOONFORGE_BATCH_MAX_BATCH_SIZE")?,
			max_wait_ms: self.parsed("MOONFORGE_BATCH_MAX_WAIT_MS")?,
			max_queue_size: self.parsed("MOONFORGE_BATCH_MAX_QUEUE_SIZE")?,
		})
	}

	fn offline(&self) -> Result<OfflineConfigLayer, ConfigError> {
		Ok(OfflineConfigLayer {
			enabled: self.bool("MOONFORGE_OFFLINE_ENABLED"),
			max_stored: self.parsed("MOONFORGE_OFFLINE_MAX_STORED")?,
			directory: self.var("MOONFORGE_OFFLINE_DIRECTORY").map(PathBuf::from),
			max_age_days: self.parsed("MOONFORGE_OFFLINE_MAX_AGE_DAYS")?,
		})
	}

	fn sampling(&self) -> Result<SamplingConfigLayer, ConfigError> {
		Ok(SamplingConfigLayer {
			enabled: self.bool("MOONFORGE_SAMPLING_ENABLED"),
			exception_rate: self.parsed("MOONFORGE_SAMPLING_EXCEPTION_RATE")?,
			network_rate: self.parsed("MOONFORGE_SAMPLING_NETWORK_RATE")?,
			custom_rate: self.parsed("MOONFORGE_SAMPLING_CUSTOM_RATE")?,
			thresholds: None,
			min_rate: self.parsed("MOONFORGE_SAMPLING_MIN_RATE")?,
			window_secs: self.parsed("MOONFORGE_SAMPLING_WINDOW_SECS")?,
		})
	}

	fn network(&self) -> Result<NetworkConfigLayer, ConfigError> {
		Ok(NetworkConfigLayer {
			timeout_ms: self.parsed("MOONFORGE_NETWORK_TIMEOUT_MS")?,
			max_retries: self.parsed("MOONFORGE_NETWORK_MAX_RETRIES")?,
			retry_base_delay_ms: self.parsed("MOONFORGE_NETWORK_RETRY_BASE_DELAY_MS")?,
			retry_max_delay_ms: self.parsed("MOONFORGE_NETWORK_RETRY_MAX_DELAY_MS")?,
		})
	}

	fn scrub(&self) -> Result<ScrubConfigLayer, ConfigError> {
		Ok(ScrubConfigLayer {
			enabled: self.bool("MOONFORGE_SCRUB_ENABLED"),
			patterns: None,
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<TrackerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(TrackerConfigLayer {
			game_id: self.var("MOONFORGE_GAME_ID"),
			endpoint: self.var("MOONFORGE_ENDPOINT"),
			release: self.var("MOONFORGE_RELEASE"),
			environment: self.var("MOONFORGE_ENVIRONMENT"),
			debug: self.bool("MOONFORGE_DEBUG"),
			max_breadcrumbs: self.parsed("MOONFORGE_MAX_BREADCRUMBS")?,
			shutdown_timeout_ms: self.parsed("MOONFORGE_SHUTDOWN_TIMEOUT_MS")?,
			capture: Some(self.capture()?),
			batch: Some(self.batch()?),
			offline: Some(self.offline()?),
			sampling: Some(self.sampling()?),
			network: Some(self.network()?),
			scrub: Some(self.scrub()?),
		})
	}
}
