// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error events and stacktraces.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::breadcrumb::Breadcrumb;
use crate::error::{CoreError, Result};

/// Current time truncated to millisecond precision, the resolution used on
/// the wire and on disk.
pub fn now_millis() -> DateTime<Utc> {
	Utc::now().trunc_subsecs(3)
}

/// What produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	Crash,
	Exception,
	Network,
	Custom,
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Crash => write!(f, "crash"),
			Self::Exception => write!(f, "exception"),
			Self::Network => write!(f, "network"),
			Self::Custom => write!(f, "custom"),
		}
	}
}

impl FromStr for ErrorKind {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"crash" => Ok(Self::Crash),
			"exception" => Ok(Self::Exception),
			"network" => Ok(Self::Network),
			"custom" => Ok(Self::Custom),
			_ => Err(CoreError::InvalidKind(s.to_string())),
		}
	}
}

/// Where the error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
	Native,
	Managed,
	Handled,
	Unhandled,
}

impl fmt::Display for ErrorCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Native => write!(f, "native"),
			Self::Managed => write!(f, "managed"),
			Self::Handled => write!(f, "handled"),
			Self::Unhandled => write!(f, "unhandled"),
		}
	}
}

impl FromStr for ErrorCategory {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"native" => Ok(Self::Native),
			"managed" => Ok(Self::Managed),
			"handled" => Ok(Self::Handled),
			"unhandled" => Ok(Self::Unhandled),
			_ => Err(CoreError::InvalidCategory(s.to_string())),
		}
	}
}

/// Severity of an error or breadcrumb. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	Info,
	Warning,
	Error,
	Fatal,
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Info => write!(f, "info"),
			Self::Warning => write!(f, "warning"),
			Self::Error => write!(f, "error"),
			Self::Fatal => write!(f, "fatal"),
		}
	}
}

impl FromStr for Severity {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"info" => Ok(Self::Info),
			"warning" => Ok(Self::Warning),
			"error" => Ok(Self::Error),
			"fatal" => Ok(Self::Fatal),
			_ => Err(CoreError::InvalidSeverity(s.to_string())),
		}
	}
}

/// A single stack frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub module: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub function: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub filename: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub lineno: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub colno: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub instruction_addr: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub symbol_addr: Option<String>,
	#[serde(default)]
	pub in_app: bool,
}

/// Ordered frames, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stacktrace {
	pub frames: Vec<Frame>,
}

impl Stacktrace {
	/// The first frame that belongs to game code.
	pub fn first_in_app(&self) -> Option<&Frame> {
		self.frames.iter().find(|f| f.in_app)
	}

	pub fn is_empty(&self) -> bool {
		self.frames.is_empty()
	}
}

/// SDK identification attached to each event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkInfo {
	pub name: String,
	pub version: String,
}

/// The unit flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
	pub kind: ErrorKind,
	pub category: ErrorCategory,
	pub severity: Severity,
	#[serde(default)]
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stacktrace: Option<Stacktrace>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub raw_stack_trace: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exception_class: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub device: Option<serde_json::Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub network: Option<serde_json::Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub game_state: Option<serde_json::Value>,
	#[serde(default)]
	pub breadcrumbs: Vec<Breadcrumb>,
	#[serde(default)]
	pub tags: HashMap<String, String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub release: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub environment: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platform: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sdk: Option<SdkInfo>,
	#[serde(with = "chrono::serde::ts_milliseconds")]
	pub timestamp: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fingerprint: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sample_rate: Option<f64>,
}

impl Default for ErrorEvent {
	fn default() -> Self {
		Self {
			kind: ErrorKind::Custom,
			category: ErrorCategory::Handled,
			severity: Severity::Error,
			message: String::new(),
			stacktrace: None,
			raw_stack_trace: None,
			exception_class: None,
			device: None,
			network: None,
			game_state: None,
			breadcrumbs: Vec::new(),
			tags: HashMap::new(),
			user_id: None,
			session_id: None,
			release: None,
			environment: None,
			platform: None,
			sdk: None,
			timestamp: now_millis(),
			fingerprint: None,
			sample_rate: None,
		}
	}
}

impl ErrorEvent {
	pub fn new(
		kind: ErrorKind,
		category: ErrorCategory,
		severity: Severity,
		message: impl Into<String>,
	) -> Self {
		Self {
			kind,
			category,
			severity,
			message: message.into(),
			..Default::default()
		}
	}

	/// Crash-kind and fatal events are never sampled out.
	pub fn is_fatal(&self) -> bool {
		self.kind == ErrorKind::Crash || self.severity == Severity::Fatal
	}

	/// Records the sampling outcome. Can only happen once per event.
	pub fn assign_sampling(&mut self, fingerprint: String, sample_rate: f64) -> Result<()> {
		if let Some(existing) = &self.fingerprint {
			return Err(CoreError::AlreadySampled(existing.clone()));
		}
		self.fingerprint = Some(fingerprint);
		self.sample_rate = Some(sample_rate);
		Ok(())
	}

	pub fn is_sampled(&self) -> bool {
		self.fingerprint.is_some() && self.sample_rate.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn kind_roundtrip(kind in prop_oneof![
			Just(ErrorKind::Crash),
			Just(ErrorKind::Exception),
			Just(ErrorKind::Network),
			Just(ErrorKind::Custom),
		]) {
			let parsed: ErrorKind = kind.to_string().parse().unwrap();
			prop_assert_eq!(kind, parsed);
		}

		#[test]
		fn severity_roundtrip(severity in prop_oneof![
			Just(Severity::Info),
			Just(Severity::Warning),
			Just(Severity::Error),
			Just(Severity::Fatal),
		]) {
			let parsed: Severity = severity.to_string().parse().unwrap();
			prop_assert_eq!(severity, parsed);
		}
	}

	#[test]
	fn severity_ordering() {
		assert!(Severity::Info < Severity::Warning);
		assert!(Severity::Warning < Severity::Error);
		assert!(Severity::Error < Severity::Fatal);
	}

	#[test]
	fn category_rejects_unknown() {
		assert!(matches!(
			"kernel".parse::<ErrorCategory>(),
			Err(CoreError::InvalidCategory(_))
		));
	}

	#[test]
	fn assign_sampling_only_once() {
		let mut event = ErrorEvent::default();
		assert!(!event.is_sampled());
		event.assign_sampling("abc".to_string(), 0.5).unwrap();
		assert!(event.is_sampled());

		let err = event.assign_sampling("def".to_string(), 1.0).unwrap_err();
		assert!(matches!(err, CoreError::AlreadySampled(_)));
		assert_eq!(event.fingerprint.as_deref(), Some("abc"));
		assert_eq!(event.sample_rate, Some(0.5));
	}

	#[test]
	fn fatal_detection() {
		let crash = ErrorEvent::new(ErrorKind::Crash, ErrorCategory::Native, Severity::Error, "x");
		let fatal = ErrorEvent::new(ErrorKind::Custom, ErrorCategory::Handled, Severity::Fatal, "x");
		let plain = ErrorEvent::new(ErrorKind::Exception, ErrorCategory::Managed, Severity::Error, "x");
		assert!(crash.is_fatal());
		assert!(fatal.is_fatal());
		assert!(!plain.is_fatal());
	}

	#[test]
	fn event_serializes_camel_case_with_millis() {
		let mut event = ErrorEvent::new(
			ErrorKind::Exception,
			ErrorCategory::Unhandled,
			Severity::Error,
			"boom",
		);
		event.exception_class = Some("NullReferenceException".to_string());
		let json = serde_json::to_value(&event).unwrap();

		assert_eq!(json["kind"], "exception");
		assert_eq!(json["category"], "unhandled");
		assert_eq!(json["exceptionClass"], "NullReferenceException");
		assert!(json["timestamp"].is_i64());
		assert!(json.get("fingerprint").is_none());

		let parsed: ErrorEvent = serde_json::from_value(json).unwrap();
		assert_eq!(parsed, event);
	}
}
