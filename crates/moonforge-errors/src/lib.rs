// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error and crash telemetry SDK for MoonForge games.
//!
//! Captures managed exceptions, error logs, native crashes, network failures
//! and manual reports, enriches them with breadcrumbs and device context, and
//! delivers them to the MoonForge collector.
//!
//! # Overview
//!
//! - Adaptive sampling per fingerprint; fatal errors are always kept
//! - Batching with size and time triggers
//! - Durable offline store replayed when connectivity returns
//! - Retries with exponential backoff and `Retry-After` handling
//! - Redaction of e-mail addresses and credentials before sending
//!
//! # Example
//!
//! ```ignore
//! use moonforge_errors::{load_config, ErrorTracker};
//!
//! let tracker = ErrorTracker::builder(load_config()?).build()?;
//! tracker.start().await;
//! tracker
//!     .capture_exception("NullReferenceException", "Object reference not set", trace)
//!     .await;
//! tracker.shutdown().await;
//! ```

pub mod batch;
pub mod breadcrumbs;
pub mod capture;
pub mod config;
pub mod error;
pub mod offline;
pub mod sampler;
pub mod scrub;
pub mod tracker;
pub mod transport;

pub use batch::{BatchConfig, BatchQueue, BatchSender, BatchState, FlushOutcome};
pub use breadcrumbs::BreadcrumbRing;
pub use capture::{
	CaptureRecord, CaptureSource, ContextProvider, CrashCallback, EmptyContext,
	ManualNativeCrashSource, NativeCrashSource, NoopNativeCrashSource, StaticContext,
};
pub use config::{
	load_config, load_config_with_file, load_from_sources, CaptureConfig, NetworkConfig,
	ScrubConfig, TrackerConfig, DEFAULT_ENDPOINT,
};
pub use error::{ConfigError, Result, TrackerError, TransportError};
pub use offline::{OfflineConfig, OfflineStore};
pub use sampler::{RateThreshold, Sampler, SamplingConfig, SamplingDecision};
pub use scrub::Scrubber;
pub use tracker::{CaptureOutcome, ErrorTracker, ErrorTrackerBuilder};
pub use transport::{
	ConnectivityFlag, ConnectivityProbe, HttpTransport, Transport, TransportBatchSender,
	GAME_ID_HEADER,
};

pub use moonforge_errors_core::{
	Breadcrumb, BreadcrumbKind, ContextSnapshot, DeviceContext, ErrorCategory, ErrorEvent,
	ErrorKind, Frame, NetworkContext, Severity, Stacktrace,
};
