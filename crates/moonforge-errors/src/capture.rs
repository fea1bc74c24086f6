// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Inbound capture surface: the structured record capture sources hand to
//! the tracker, the context provider the tracker pulls from, and the native
//! crash source seam.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use moonforge_errors_core::{ContextSnapshot, ErrorCategory, ErrorKind, Frame, Severity};

/// Where a capture came from. Drives the capture toggles and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureSource {
	/// Uncaught managed exception.
	Exception,
	/// Error-level log message from the engine log stream.
	LogError,
	/// Native signal handler output.
	NativeCrash,
	/// Explicit API call from game code.
	Manual,
	/// Failed network request reported by the game.
	Network,
}

impl fmt::Display for CaptureSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Exception => write!(f, "exception"),
			Self::LogError => write!(f, "log_error"),
			Self::NativeCrash => write!(f, "native_crash"),
			Self::Manual => write!(f, "manual"),
			Self::Network => write!(f, "network"),
		}
	}
}

/// A raw capture before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRecord {
	pub source: CaptureSource,
	pub kind: ErrorKind,
	pub category: ErrorCategory,
	pub severity: Severity,
	pub message: String,
	pub exception_class: Option<String>,
	/// Raw stack trace text, parsed into frames when `frames` is empty.
	pub stack_trace: Option<String>,
	pub frames: Vec<Frame>,
	/// Call-specific tags; these override global tags with the same key.
	pub tags: HashMap<String, String>,
}

impl CaptureRecord {
	pub fn new(
		source: CaptureSource,
		kind: ErrorKind,
		category: ErrorCategory,
		severity: Severity,
		message: impl Into<String>,
	) -> Self {
		Self {
			source,
			kind,
			category,
			severity,
			message: message.into(),
			exception_class: None,
			stack_trace: None,
			frames: Vec::new(),
			tags: HashMap::new(),
		}
	}

	/// An uncaught managed exception.
	pub fn exception(
		exception_class: impl Into<String>,
		message: impl Into<String>,
		stack_trace: impl Into<String>,
	) -> Self {
		Self::new(
			CaptureSource::Exception,
			ErrorKind::Exception,
			ErrorCategory::Unhandled,
			Severity::Error,
			message,
		)
		.with_exception_class(exception_class)
		.with_stack_trace(stack_trace)
	}

	pub fn with_exception_class(mut self, class: impl Into<String>) -> Self {
		self.exception_class = Some(class.into());
		self
	}

	pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
		let stack_trace = stack_trace.into();
		self.stack_trace = (!stack_trace.trim().is_empty()).then_some(stack_trace);
		self
	}

	pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
		self.frames = frames;
		self
	}

	pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.tags.insert(key.into(), value.into());
		self
	}

	pub fn with_severity(mut self, severity: Severity) -> Self {
		self.severity = severity;
		self
	}
}

/// Supplies device, network and game-state snapshots at capture time.
pub trait ContextProvider: Send + Sync {
	fn snapshot(&self) -> ContextSnapshot;
}

/// Provider that attaches no context.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyContext;

impl ContextProvider for EmptyContext {
	fn snapshot(&self) -> ContextSnapshot {
		ContextSnapshot::default()
	}
}

/// Provider returning a fixed snapshot, replaced by the host as state changes.
#[derive(Debug, Default)]
pub struct StaticContext {
	snapshot: Mutex<ContextSnapshot>,
}

impl StaticContext {
	pub fn new(snapshot: ContextSnapshot) -> Self {
		Self {
			snapshot: Mutex::new(snapshot),
		}
	}

	pub fn set(&self, snapshot: ContextSnapshot) {
		*self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
	}
}

impl ContextProvider for StaticContext {
	fn snapshot(&self) -> ContextSnapshot {
		self.snapshot
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}
}

/// Callback receiving the JSON crash record produced by a native handler.
pub type CrashCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Platform bridge that reports native crashes, typically on the next launch
/// after the handler wrote its record.
pub trait NativeCrashSource: Send + Sync {
	fn on_crash(&self, callback: CrashCallback);
}

/// Source for platforms without a native handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNativeCrashSource;

impl NativeCrashSource for NoopNativeCrashSource {
	fn on_crash(&self, _callback: CrashCallback) {}
}

/// Source fed by the host, for example with records read from disk at launch.
#[derive(Default)]
pub struct ManualNativeCrashSource {
	callback: Mutex<Option<CrashCallback>>,
}

impl ManualNativeCrashSource {
	pub fn new() -> Self {
		Self::default()
	}

	/// Deliver a crash record. Returns false if no callback is registered.
	pub fn report(&self, record_json: impl Into<String>) -> bool {
		let callback = self
			.callback
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone();
		match callback {
			Some(callback) => {
				callback(record_json.into());
				true
			}
			None => false,
		}
	}
}

impl NativeCrashSource for ManualNativeCrashSource {
	fn on_crash(&self, callback: CrashCallback) {
		*self.callback.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
	}
}
