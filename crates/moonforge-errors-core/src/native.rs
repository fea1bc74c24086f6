// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Native crash records produced by the platform signal handlers.
//!
//! The handler serializes a fixed JSON document from inside the signal
//! context:
//!
//! ```json
//! {"signal":11,"signalName":"SIGSEGV","signalDescription":"Segmentation fault",
//!  "faultAddress":"0x0","threadId":4821,"siCode":1,
//!  "frames":[{"frame":0,"address":"0x7a1b2c","module":"libgame.so","symbol":"Tick","offset":"16"}]}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::event::{ErrorCategory, ErrorEvent, ErrorKind, Frame, Severity, Stacktrace};

/// Placeholder the handler writes when `dladdr` cannot resolve a name.
const UNRESOLVED: &str = "???";

/// Modules treated as game code when no explicit list is configured.
pub const DEFAULT_IN_APP_MODULES: &[&str] = &["libil2cpp.so", "libmain.so", "GameAssembly"];

/// A crash record as emitted by the native handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCrashRecord {
	pub signal: i32,
	pub signal_name: String,
	#[serde(default)]
	pub signal_description: String,
	#[serde(default)]
	pub fault_address: Option<String>,
	#[serde(default)]
	pub thread_id: Option<u64>,
	#[serde(default)]
	pub si_code: Option<i32>,
	#[serde(default)]
	pub frames: Vec<NativeFrame>,
}

/// One unwound native frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeFrame {
	#[serde(default)]
	pub frame: u32,
	pub address: String,
	#[serde(default)]
	pub module: Option<String>,
	#[serde(default)]
	pub symbol: Option<String>,
	#[serde(default)]
	pub offset: Option<String>,
}

impl NativeCrashRecord {
	/// Parse the handler's JSON document.
	pub fn parse(json: &str) -> Result<Self> {
		let record: Self = serde_json::from_str(json)
			.map_err(|e| CoreError::InvalidCrashRecord(e.to_string()))?;
		if record.signal_name.trim().is_empty() {
			return Err(CoreError::InvalidCrashRecord("missing signal name".to_string()));
		}
		Ok(record)
	}

	/// Human-readable summary used as the event message.
	pub fn message(&self) -> String {
		let description = if self.signal_description.is_empty() {
			"Native crash"
		} else {
			self.signal_description.as_str()
		};
		match &self.fault_address {
			Some(addr) => format!("{}: {} at {}", self.signal_name, description, addr),
			None => format!("{}: {}", self.signal_name, description),
		}
	}

	/// Convert into a fatal crash event. `in_app_modules` lists the shared
	/// objects that contain game code.
	pub fn into_event(self, in_app_modules: &[String]) -> ErrorEvent {
		let mut event = ErrorEvent::new(
			ErrorKind::Crash,
			ErrorCategory::Native,
			Severity::Fatal,
			self.message(),
		);
		event.exception_class = Some(self.signal_name.clone());

		let frames: Vec<Frame> = self
			.frames
			.iter()
			.map(|f| f.to_frame(in_app_modules))
			.collect();
		if !frames.is_empty() {
			event.stacktrace = Some(Stacktrace { frames });
		}

		event.tags.insert("signal".to_string(), self.signal.to_string());
		if let Some(code) = self.si_code {
			event.tags.insert("si_code".to_string(), code.to_string());
		}
		if let Some(thread) = self.thread_id {
			event.tags.insert("thread_id".to_string(), thread.to_string());
		}
		event
	}
}

impl NativeFrame {
	fn to_frame(&self, in_app_modules: &[String]) -> Frame {
		let module = resolved(&self.module);
		let function = resolved(&self.symbol);
		let in_app = module
			.as_deref()
			.map(|m| in_app_modules.iter().any(|known| m.starts_with(known.as_str())))
			.unwrap_or(false);

		Frame {
			module,
			function,
			filename: None,
			lineno: None,
			colno: None,
			instruction_addr: Some(self.address.clone()),
			symbol_addr: self.offset.clone(),
			in_app,
		}
	}
}

fn resolved(value: &Option<String>) -> Option<String> {
	value
		.as_deref()
		.filter(|v| !v.is_empty() && *v != UNRESOLVED)
		.map(str::to_string)
}

/// The default in-app module list as owned strings.
pub fn default_in_app_modules() -> Vec<String> {
	DEFAULT_IN_APP_MODULES.iter().map(|m| m.to_string()).collect()
}
