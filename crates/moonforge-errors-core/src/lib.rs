// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for MoonForge error tracking.
//!
//! This crate holds the data model shared by the telemetry pipeline: error
//! events, stack frames, breadcrumbs, context snapshots, native crash records
//! and the collector wire format. It performs no I/O.
//!
//! # Overview
//!
//! - Grouping fingerprints that ignore numeric and address noise
//! - Parsing of managed stack trace text into frames
//! - Conversion of native signal-handler output into crash events
//! - Single and batch envelopes for the collector API

pub mod breadcrumb;
pub mod context;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod native;
pub mod stack;
pub mod wire;

pub use breadcrumb::{Breadcrumb, BreadcrumbKind};
pub use context::{ContextSnapshot, DeviceContext, NetworkContext};
pub use error::{CoreError, Result};
pub use event::{
	now_millis, ErrorCategory, ErrorEvent, ErrorKind, Frame, SdkInfo, Severity, Stacktrace,
};
pub use fingerprint::compute_fingerprint;
pub use native::{NativeCrashRecord, NativeFrame};
pub use stack::parse_stack_trace;
pub use wire::{
	BatchItemResult, BatchResponse, ClientErrorId, Envelope, QueuedBatchItem, SingleResponse,
	StoredRecord,
};
