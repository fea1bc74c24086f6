// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The error tracker: single funnel for every capture source.
//!
//! Each capture is enriched (context, breadcrumbs, user, tags), scrubbed,
//! fingerprinted and sampled, then routed: to the offline store when there is
//! no connectivity, to the batch queue when batching is enabled, otherwise
//! straight to the transport. Failed deliveries fall back to the offline
//! store, which is replayed at start and whenever connectivity returns.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use moonforge_common_http::{SDK_NAME, SDK_VERSION};
use moonforge_errors_core::{
	parse_stack_trace, Breadcrumb, ErrorCategory, ErrorEvent, ErrorKind, NativeCrashRecord, SdkInfo,
	Severity, Stacktrace,
};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::batch::{BatchQueue, FlushOutcome};
use crate::capture::{
	CaptureRecord, CaptureSource, ContextProvider, CrashCallback, EmptyContext, NativeCrashSource,
};
use crate::config::TrackerConfig;
use crate::error::{ConfigError, Result, TrackerError, TransportError};
use crate::offline::OfflineStore;
use crate::sampler::Sampler;
use crate::scrub::Scrubber;
use crate::transport::{
	ConnectivityFlag, ConnectivityProbe, HttpTransport, Transport, TransportBatchSender,
};

/// Sampler counters are purged at most this often.
const SAMPLER_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Records stored while online are retried at most this often.
const OFFLINE_REPLAY_INTERVAL: Duration = Duration::from_secs(60);

/// What happened to a single capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
	/// Dropped before sampling: tracker closed, source disabled, severity
	/// below the minimum, or an unreadable native crash record.
	Ignored,
	/// Rejected by the sampler.
	SampledOut,
	/// Added to the batch queue.
	Queued,
	/// Delivered directly.
	Sent,
	/// Written to the offline store.
	StoredOffline,
	/// Could not be delivered or stored.
	Lost,
}

/// Builder for constructing an [`ErrorTracker`].
pub struct ErrorTrackerBuilder {
	config: TrackerConfig,
	transport: Option<Arc<dyn Transport>>,
	connectivity: Option<Arc<ConnectivityFlag>>,
	context: Option<Arc<dyn ContextProvider>>,
	sampler_seed: Option<u64>,
	platform: Option<String>,
}

impl ErrorTrackerBuilder {
	pub fn new(config: TrackerConfig) -> Self {
		Self {
			config,
			transport: None,
			connectivity: None,
			context: None,
			sampler_seed: None,
			platform: None,
		}
	}

	/// Use a custom transport instead of HTTP.
	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Share a connectivity flag with the host's network monitor.
	pub fn connectivity(mut self, flag: Arc<ConnectivityFlag>) -> Self {
		self.connectivity = Some(flag);
		self
	}

	/// Source of device, network and game-state snapshots.
	pub fn context_provider(mut self, provider: Arc<dyn ContextProvider>) -> Self {
		self.context = Some(provider);
		self
	}

	/// Seed the sampler's random source for reproducible decisions.
	pub fn sampler_seed(mut self, seed: u64) -> Self {
		self.sampler_seed = Some(seed);
		self
	}

	/// Platform name reported with each event. Defaults to the target OS.
	///
	/// Example: `android`, `ios`, `windows`
	pub fn platform(mut self, platform: impl Into<String>) -> Self {
		self.platform = Some(platform.into());
		self
	}

	/// Builds the tracker. Stored events are not replayed until
	/// [`ErrorTracker::start`].
	pub fn build(self) -> Result<ErrorTracker> {
		let config = self.config;
		config.validate()?;

		let connectivity = self
			.connectivity
			.unwrap_or_else(|| Arc::new(ConnectivityFlag::default()));

		let transport: Arc<dyn Transport> = match self.transport {
			Some(transport) => transport,
			None => {
				let endpoint =
					Url::parse(&config.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
						url: config.endpoint.clone(),
						reason: e.to_string(),
					})?;
				Arc::new(HttpTransport::new(
					endpoint,
					config.game_id.clone(),
					config.network.timeout,
					config.network.retry_config(),
					connectivity.clone(),
				)?)
			}
		};

		let offline = if config.offline.enabled {
			let dir = config.offline.directory.clone();
			let store = OfflineStore::open(&dir, config.offline.max_stored)
				.map_err(|source| TrackerError::OfflineStore { path: dir, source })?;
			Some(store)
		} else {
			None
		};

		let batch = config.batch.enabled.then(|| {
			BatchQueue::new(
				config.batch.clone(),
				Arc::new(TransportBatchSender(transport.clone())),
			)
		});

		let scrubber = if config.scrub.enabled {
			Some(Scrubber::new(&config.scrub.patterns)?)
		} else {
			None
		};

		let sampler = match self.sampler_seed {
			Some(seed) => Sampler::with_seed(config.sampling.clone(), seed),
			None => Sampler::new(config.sampling.clone()),
		};

		let platform = self
			.platform
			.unwrap_or_else(|| std::env::consts::OS.to_string());

		info!(
			endpoint = %config.endpoint,
			batching = config.batch.enabled,
			offline = config.offline.enabled,
			sampling = config.sampling.enabled,
			"error tracker initialized"
		);

		let online = connectivity.is_online();
		let inner = Arc::new(TrackerInner {
			breadcrumbs: crate::breadcrumbs::BreadcrumbRing::new(config.max_breadcrumbs),
			transport,
			connectivity,
			context: self.context.unwrap_or_else(|| Arc::new(EmptyContext)),
			sampler: Mutex::new(sampler),
			batch,
			offline,
			scrubber,
			platform,
			tags: RwLock::new(HashMap::new()),
			user: RwLock::new(UserState::default()),
			closed: AtomicBool::new(false),
			was_online: AtomicBool::new(online),
			replaying: AtomicBool::new(false),
			throttled_until: Mutex::new(None),
			last_sampler_cleanup: Mutex::new(Instant::now()),
			last_replay: Mutex::new(Instant::now()),
			config,
		});

		Ok(ErrorTracker { inner })
	}

	/// Builds the tracker and runs [`ErrorTracker::start`].
	pub async fn build_async(self) -> Result<ErrorTracker> {
		let tracker = self.build()?;
		tracker.start().await;
		Ok(tracker)
	}
}

#[derive(Debug, Default, Clone)]
struct UserState {
	user_id: Option<String>,
	session_id: Option<String>,
}

struct TrackerInner {
	config: TrackerConfig,
	transport: Arc<dyn Transport>,
	connectivity: Arc<ConnectivityFlag>,
	context: Arc<dyn ContextProvider>,
	sampler: Mutex<Sampler>,
	breadcrumbs: crate::breadcrumbs::BreadcrumbRing,
	batch: Option<BatchQueue>,
	offline: Option<OfflineStore>,
	scrubber: Option<Scrubber>,
	platform: String,
	tags: RwLock<HashMap<String, String>>,
	user: RwLock<UserState>,
	closed: AtomicBool,
	was_online: AtomicBool,
	replaying: AtomicBool,
	throttled_until: Mutex<Option<Instant>>,
	last_sampler_cleanup: Mutex<Instant>,
	last_replay: Mutex<Instant>,
}

/// Clears the replay flag when a replay finishes.
struct ReplayGuard<'a>(&'a AtomicBool);

impl Drop for ReplayGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

impl TrackerInner {
	fn is_online(&self) -> bool {
		self.connectivity.is_online() && self.transport.has_connectivity()
	}

	fn is_throttled(&self) -> bool {
		let mut until = lock(&self.throttled_until);
		match *until {
			Some(deadline) if Instant::now() < deadline => true,
			Some(_) => {
				*until = None;
				debug!("collector throttle window elapsed");
				false
			}
			None => false,
		}
	}

	fn note_failure(&self, error: &TransportError) {
		if let Some(retry_after) = error.retry_after() {
			warn!(
				retry_after_secs = retry_after.as_secs(),
				"collector asked to back off, storing errors offline until then"
			);
			*lock(&self.throttled_until) = Some(Instant::now() + retry_after);
		}
	}

	fn accepts(&self, record: &CaptureRecord) -> bool {
		let capture = &self.config.capture;
		let enabled = match record.source {
			CaptureSource::Exception => capture.exceptions,
			CaptureSource::LogError => capture.log_errors,
			CaptureSource::NativeCrash => capture.native_crashes,
			CaptureSource::Manual | CaptureSource::Network => true,
		};
		enabled && record.severity >= capture.min_severity
	}

	async fn capture(&self, record: CaptureRecord) -> CaptureOutcome {
		if self.closed.load(Ordering::SeqCst) {
			debug!("tracker closed, ignoring capture");
			return CaptureOutcome::Ignored;
		}
		if !self.accepts(&record) {
			debug!(source = %record.source, severity = %record.severity, "capture filtered");
			return CaptureOutcome::Ignored;
		}

		let direct = record.source == CaptureSource::NativeCrash;
		let mut event = self.build_event(record).await;

		let decision = lock(&self.sampler).classify(&event);
		if !decision.should_send {
			debug!(
				fingerprint = %decision.fingerprint,
				occurrences = decision.occurrence_count,
				sample_rate = decision.sample_rate,
				"error sampled out"
			);
			return CaptureOutcome::SampledOut;
		}
		if let Err(e) = event.assign_sampling(decision.fingerprint, decision.sample_rate) {
			warn!(error = %e, "event was already sampled");
		}

		let outcome = self.route(event, direct).await;
		if self.config.debug {
			info!(outcome = ?outcome, occurrences = decision.occurrence_count, "error captured");
		} else {
			debug!(outcome = ?outcome, occurrences = decision.occurrence_count, "error captured");
		}
		outcome
	}

	async fn build_event(&self, record: CaptureRecord) -> ErrorEvent {
		let mut event = ErrorEvent::new(record.kind, record.category, record.severity, record.message);
		event.exception_class = record.exception_class;

		event.stacktrace = if record.frames.is_empty() {
			record
				.stack_trace
				.as_deref()
				.map(parse_stack_trace)
				.filter(|trace| !trace.is_empty())
		} else {
			Some(Stacktrace {
				frames: record.frames,
			})
		};
		event.raw_stack_trace = record.stack_trace;

		let snapshot = self.context.snapshot();
		event.device = snapshot.device;
		event.network = snapshot.network;
		event.game_state = snapshot.game_state;

		event.breadcrumbs = self.breadcrumbs.snapshot();

		{
			let user = self.user.read().await;
			event.user_id = user.user_id.clone();
			event.session_id = user.session_id.clone();
		}

		let mut tags = self.tags.read().await.clone();
		tags.extend(record.tags);
		event.tags = tags;

		event.release = self.config.release.clone();
		event.environment = self.config.environment.clone();
		event.platform = Some(self.platform.clone());
		event.sdk = Some(SdkInfo {
			name: SDK_NAME.to_string(),
			version: SDK_VERSION.to_string(),
		});

		if let Some(scrubber) = &self.scrubber {
			scrubber.scrub_event(&mut event);
		}
		event
	}

	/// Deliver, queue or store an already-sampled event.
	async fn route(&self, event: ErrorEvent, direct: bool) -> CaptureOutcome {
		if !self.is_online() {
			debug!("offline, storing error");
			return self.store_offline(event);
		}
		if self.is_throttled() {
			debug!("throttled by collector, storing error");
			return self.store_offline(event);
		}

		match &self.batch {
			Some(batch) if !direct => {
				if let Some(outcome) = batch.enqueue(event).await {
					self.handle_flush(outcome);
				}
				CaptureOutcome::Queued
			}
			_ => self.send_direct(event).await,
		}
	}

	async fn send_direct(&self, event: ErrorEvent) -> CaptureOutcome {
		match self.transport.send_one(&event).await {
			Ok(_) => CaptureOutcome::Sent,
			Err(e) => {
				warn!(error = %e, kind = %event.kind, "failed to send error, falling back to offline store");
				self.note_failure(&e);
				self.store_offline(event)
			}
		}
	}

	fn handle_flush(&self, outcome: FlushOutcome) -> usize {
		match outcome {
			FlushOutcome::Sent { count, .. } => count,
			FlushOutcome::Failed { items, error } => {
				self.note_failure(&error);
				let total = items.len();
				let stored = items
					.into_iter()
					.filter(|item| self.store_offline(item.event.clone()) == CaptureOutcome::StoredOffline)
					.count();
				warn!(total, stored, error = %error, "batch failed, persisted items offline");
				0
			}
			FlushOutcome::Empty | FlushOutcome::InFlight => 0,
		}
	}

	fn store_offline(&self, event: ErrorEvent) -> CaptureOutcome {
		match &self.offline {
			Some(store) if store.store(&event) => CaptureOutcome::StoredOffline,
			Some(_) => CaptureOutcome::Lost,
			None => {
				debug!("offline storage disabled, dropping error");
				CaptureOutcome::Lost
			}
		}
	}

	/// Whether stored records should be retried now. `force` skips the
	/// interval check.
	fn replay_due(&self, force: bool) -> bool {
		let Some(store) = &self.offline else {
			return false;
		};
		let now = Instant::now();
		let mut last = lock(&self.last_replay);
		if !force && now.saturating_duration_since(*last) < OFFLINE_REPLAY_INTERVAL {
			return false;
		}
		if store.count() == 0 {
			return false;
		}
		*last = now;
		true
	}

	/// Re-route every stored event. Returns how many were drained.
	async fn replay_offline(&self) -> usize {
		let Some(store) = &self.offline else {
			return 0;
		};
		if !self.is_online() {
			debug!(stored = store.count(), "offline, keeping stored errors");
			return 0;
		}
		if self.replaying.swap(true, Ordering::SeqCst) {
			return 0;
		}
		let _guard = ReplayGuard(&self.replaying);

		let events = store.drain();
		let count = events.len();
		if count > 0 {
			info!(count, "replaying stored errors");
		}
		for event in events {
			let direct = event.category == ErrorCategory::Native;
			self.route(event, direct).await;
		}
		count
	}

	/// Flush the batch queue until it is empty, a flush fails, or another
	/// flush is in flight. Returns the number of events delivered.
	async fn flush_all(&self) -> usize {
		let Some(batch) = &self.batch else {
			return 0;
		};
		let mut sent = 0;
		loop {
			match batch.flush().await {
				FlushOutcome::Sent { count, .. } => sent += count,
				outcome @ FlushOutcome::Failed { .. } => {
					self.handle_flush(outcome);
					break;
				}
				FlushOutcome::Empty | FlushOutcome::InFlight => break,
			}
		}
		sent
	}

	fn persist_pending(&self) -> usize {
		let Some(batch) = &self.batch else {
			return 0;
		};
		let pending = batch.drain_pending();
		let count = pending.len();
		let mut stored = 0;
		for item in pending {
			if self.store_offline(item.event) == CaptureOutcome::StoredOffline {
				stored += 1;
			}
		}
		if count > 0 {
			info!(count, stored, "persisted unsent errors at shutdown");
		}
		stored
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Client for capturing errors and crashes in a game.
///
/// # Example
///
/// ```ignore
/// use moonforge_errors::{ErrorTracker, TrackerConfig};
///
/// let tracker = ErrorTracker::builder(TrackerConfig::new(GAME_ID))
///     .platform("android")
///     .build()?;
/// tracker.start().await;
///
/// tracker.set_user_id(Some("player-42".into())).await;
/// tracker.add_breadcrumb(Breadcrumb::new(BreadcrumbKind::Navigation, "Loaded Level3"));
///
/// tracker
///     .capture_exception("NullReferenceException", "Object reference not set", trace)
///     .await;
///
/// // Each frame
/// tracker.update().await;
///
/// tracker.shutdown().await;
/// ```
#[derive(Clone)]
pub struct ErrorTracker {
	inner: Arc<TrackerInner>,
}

impl ErrorTracker {
	pub fn builder(config: TrackerConfig) -> ErrorTrackerBuilder {
		ErrorTrackerBuilder::new(config)
	}

	pub fn config(&self) -> &TrackerConfig {
		&self.inner.config
	}

	/// Remove expired offline records and replay the rest. Returns how many
	/// stored events were re-routed.
	pub async fn start(&self) -> usize {
		if let Some(store) = &self.inner.offline {
			store.cleanup(self.inner.config.offline.max_age_days);
		}
		self.inner.replay_offline().await
	}

	/// Route a structured capture through the pipeline.
	pub async fn capture(&self, record: CaptureRecord) -> CaptureOutcome {
		self.inner.capture(record).await
	}

	pub async fn capture_exception(
		&self,
		exception_class: impl Into<String>,
		message: impl Into<String>,
		stack_trace: impl Into<String>,
	) -> CaptureOutcome {
		self.capture(CaptureRecord::exception(exception_class, message, stack_trace))
			.await
	}

	pub async fn capture_message(
		&self,
		message: impl Into<String>,
		severity: Severity,
	) -> CaptureOutcome {
		self.capture(CaptureRecord::new(
			CaptureSource::Manual,
			ErrorKind::Custom,
			ErrorCategory::Handled,
			severity,
			message,
		))
		.await
	}

	/// An error-level message from the engine log stream.
	pub async fn capture_log_error(
		&self,
		message: impl Into<String>,
		stack_trace: impl Into<String>,
	) -> CaptureOutcome {
		self.capture(
			CaptureRecord::new(
				CaptureSource::LogError,
				ErrorKind::Exception,
				ErrorCategory::Handled,
				Severity::Error,
				message,
			)
			.with_stack_trace(stack_trace),
		)
		.await
	}

	/// A failed HTTP request made by the game.
	pub async fn capture_network_error(
		&self,
		url: &str,
		method: &str,
		status: Option<u16>,
		message: impl Into<String>,
	) -> CaptureOutcome {
		let message = message.into();
		let summary = match status {
			Some(status) => format!("HTTP {status} {method} {url}: {message}"),
			None => format!("{method} {url}: {message}"),
		};
		let mut record = CaptureRecord::new(
			CaptureSource::Network,
			ErrorKind::Network,
			ErrorCategory::Handled,
			Severity::Warning,
			summary,
		)
		.with_tag("http.method", method)
		.with_tag("http.url", url);
		if let Some(status) = status {
			record = record.with_tag("http.status", status.to_string());
		}
		self.capture(record).await
	}

	/// A JSON record produced by the native signal handler. Always sent
	/// directly, bypassing the batch queue.
	pub async fn capture_native_crash(&self, record_json: &str) -> CaptureOutcome {
		let record = match NativeCrashRecord::parse(record_json) {
			Ok(record) => record,
			Err(e) => {
				warn!(error = %e, "discarding unreadable native crash record");
				return CaptureOutcome::Ignored;
			}
		};

		let event = record.into_event(&self.inner.config.capture.in_app_native_modules);
		let capture = CaptureRecord {
			source: CaptureSource::NativeCrash,
			kind: event.kind,
			category: event.category,
			severity: event.severity,
			message: event.message,
			exception_class: event.exception_class,
			stack_trace: None,
			frames: event.stacktrace.map(|s| s.frames).unwrap_or_default(),
			tags: event.tags,
		};
		self.capture(capture).await
	}

	/// Register with a native crash bridge. Records it reports are captured on
	/// the current tokio runtime.
	pub fn install_native_crash_source(&self, source: &dyn NativeCrashSource) -> Result<()> {
		let handle = tokio::runtime::Handle::try_current().map_err(|_| TrackerError::NoRuntime)?;
		let tracker = self.clone();
		let callback: CrashCallback = Arc::new(move |json: String| {
			let tracker = tracker.clone();
			handle.spawn(async move {
				tracker.capture_native_crash(&json).await;
			});
		});
		source.on_crash(callback);
		debug!("native crash source installed");
		Ok(())
	}

	pub fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
		self.inner.breadcrumbs.add(breadcrumb);
	}

	pub fn clear_breadcrumbs(&self) {
		self.inner.breadcrumbs.clear();
	}

	/// Change breadcrumb capacity, dropping the oldest entries if it shrank.
	pub fn set_max_breadcrumbs(&self, max_breadcrumbs: usize) {
		self.inner.breadcrumbs.configure(max_breadcrumbs);
	}

	pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
		self.inner.breadcrumbs.snapshot()
	}

	pub async fn set_user_id(&self, user_id: Option<String>) {
		self.inner.user.write().await.user_id = user_id;
	}

	pub async fn set_session_id(&self, session_id: Option<String>) {
		self.inner.user.write().await.session_id = session_id;
	}

	pub async fn set_tag(&self, key: impl Into<String>, value: impl Into<String>) {
		self.inner.tags.write().await.insert(key.into(), value.into());
	}

	pub async fn remove_tag(&self, key: &str) {
		self.inner.tags.write().await.remove(key);
	}

	/// Report a connectivity change from the host.
	pub fn set_online(&self, online: bool) {
		self.inner.connectivity.set_online(online);
	}

	pub fn is_online(&self) -> bool {
		self.inner.is_online()
	}

	/// Periodic tick: replays stored errors when connectivity returns (and
	/// retries them periodically while online), drives the batch time
	/// trigger and purges stale sampler counters.
	pub async fn update(&self) {
		let inner = &self.inner;
		if inner.closed.load(Ordering::SeqCst) {
			return;
		}

		let online = inner.is_online();
		let was_online = inner.was_online.swap(online, Ordering::SeqCst);
		let restored = online && !was_online;
		if restored {
			info!("connectivity restored");
		}

		if online && !inner.is_throttled() {
			if inner.replay_due(restored) {
				inner.replay_offline().await;
			}
			if let Some(batch) = &inner.batch {
				if let Some(outcome) = batch.update().await {
					inner.handle_flush(outcome);
				}
			}
		}

		let now = Instant::now();
		let due = {
			let mut last = lock(&inner.last_sampler_cleanup);
			if now.saturating_duration_since(*last) >= SAMPLER_CLEANUP_INTERVAL {
				*last = now;
				true
			} else {
				false
			}
		};
		if due {
			let removed = lock(&inner.sampler).cleanup(now);
			if removed > 0 {
				debug!(removed, "purged stale sampling counters");
			}
		}
	}

	/// Calls [`update`](Self::update) every `period` until shutdown.
	pub async fn run_ticker(&self, period: Duration) {
		let mut interval = tokio::time::interval(period);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		loop {
			interval.tick().await;
			if self.is_closed() {
				break;
			}
			self.update().await;
		}
	}

	/// Send everything in the batch queue. Returns the number of events
	/// delivered.
	pub async fn flush(&self) -> usize {
		self.inner.flush_all().await
	}

	/// Stop accepting captures, flush the batch queue within the configured
	/// shutdown timeout and persist whatever is still queued.
	pub async fn shutdown(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		info!("shutting down error tracker");

		if self.inner.batch.is_none() {
			return;
		}

		let timeout = self.inner.config.shutdown_timeout;
		let inner = self.inner.clone();
		let flush = tokio::spawn(async move { inner.flush_all().await });
		match tokio::time::timeout(timeout, flush).await {
			Ok(Ok(sent)) => debug!(sent, "final batch flush complete"),
			Ok(Err(e)) => warn!(error = %e, "final batch flush task failed"),
			Err(_) => warn!(
				timeout_ms = timeout.as_millis() as u64,
				"final batch flush did not complete in time"
			),
		}

		self.inner.persist_pending();
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}

	/// Number of events waiting in the batch queue.
	pub fn queued(&self) -> usize {
		self.inner.batch.as_ref().map(BatchQueue::len).unwrap_or(0)
	}

	/// Number of events in the offline store.
	pub fn stored(&self) -> usize {
		self.inner.offline.as_ref().map(OfflineStore::count).unwrap_or(0)
	}
}
