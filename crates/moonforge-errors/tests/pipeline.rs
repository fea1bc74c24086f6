// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end pipeline behaviour: routing between the batch queue, direct
//! sends and the offline store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{config, Failure, MockTransport, GAME_ID, SEGV_RECORD};
use moonforge_errors::{
	Breadcrumb, BreadcrumbKind, CaptureOutcome, ErrorCategory, ErrorEvent, ErrorKind, ErrorTracker,
	ManualNativeCrashSource, OfflineStore, Severity, TrackerConfig,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TRACE: &str = "EnemyAI.Think () (at Assets/Scripts/EnemyAI.cs:77)";

fn tracker(config: TrackerConfig, transport: &Arc<MockTransport>) -> ErrorTracker {
	ErrorTracker::builder(config)
		.transport(transport.clone())
		.sampler_seed(7)
		.build()
		.unwrap()
}

#[tokio::test]
async fn offline_capture_bypasses_batch_queue() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let tracker = tracker(config(dir.path()), &transport);

	tracker.set_online(false);
	let outcome = tracker
		.capture_exception("NullReferenceException", "Object reference not set", TRACE)
		.await;

	assert_eq!(outcome, CaptureOutcome::StoredOffline);
	assert_eq!(tracker.queued(), 0);
	assert_eq!(tracker.stored(), 1);
	assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn batches_on_size_trigger() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let tracker = tracker(config(dir.path()), &transport);

	for i in 0..3 {
		let outcome = tracker
			.capture_exception("InvalidOperationException", format!("failure {i}"), TRACE)
			.await;
		assert_eq!(outcome, CaptureOutcome::Queued);
	}

	let batches = transport.batches();
	assert_eq!(batches.len(), 1);
	assert_eq!(batches[0].len(), 3);
	assert_eq!(tracker.queued(), 0);
}

#[tokio::test(start_paused = true)]
async fn update_flushes_after_max_wait() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let tracker = tracker(config(dir.path()), &transport);

	tracker.capture_message("shader compile failed", Severity::Error).await;
	tracker.update().await;
	assert!(transport.batches().is_empty());

	tokio::time::advance(Duration::from_secs(11)).await;
	tracker.update().await;
	assert_eq!(transport.batches().len(), 1);
	assert_eq!(tracker.queued(), 0);
}

#[tokio::test]
async fn native_crash_bypasses_batching() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let tracker = tracker(config(dir.path()), &transport);

	let outcome = tracker.capture_native_crash(SEGV_RECORD).await;
	assert_eq!(outcome, CaptureOutcome::Sent);
	assert!(transport.batches().is_empty());

	let singles = transport.singles();
	assert_eq!(singles.len(), 1);
	let crash = &singles[0];
	assert_eq!(crash.kind, ErrorKind::Crash);
	assert_eq!(crash.category, ErrorCategory::Native);
	assert_eq!(crash.severity, Severity::Fatal);
	assert_eq!(crash.message, "SIGSEGV: Segmentation fault at 0x0");
	assert_eq!(crash.exception_class.as_deref(), Some("SIGSEGV"));
	assert_eq!(crash.tags["signal"], "11");

	let frames = &crash.stacktrace.as_ref().unwrap().frames;
	assert_eq!(frames.len(), 2);
	assert!(frames[0].in_app);
	assert!(!frames[1].in_app);
	assert_eq!(frames[1].function, None);
}

#[tokio::test]
async fn installed_native_source_feeds_tracker() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let tracker = tracker(config(dir.path()), &transport);

	let source = ManualNativeCrashSource::new();
	tracker.install_native_crash_source(&source).unwrap();
	assert!(source.report(SEGV_RECORD));

	for _ in 0..100 {
		if !transport.singles().is_empty() {
			break;
		}
		tokio::task::yield_now().await;
	}
	assert_eq!(transport.singles().len(), 1);
}

#[tokio::test]
async fn failed_direct_send_is_stored_offline() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::failing(Failure::Server));
	let mut config = config(dir.path());
	config.batch.enabled = false;
	let tracker = tracker(config, &transport);

	let outcome = tracker.capture_message("save corrupted", Severity::Error).await;
	assert_eq!(outcome, CaptureOutcome::StoredOffline);
	assert_eq!(tracker.stored(), 1);
}

#[tokio::test]
async fn client_rejection_is_still_stored_offline() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::failing(Failure::Client));
	let mut config = config(dir.path());
	config.batch.enabled = false;
	let tracker = tracker(config, &transport);

	let outcome = tracker.capture_message("bad payload", Severity::Error).await;
	assert_eq!(outcome, CaptureOutcome::StoredOffline);
}

#[tokio::test]
async fn failed_size_flush_persists_items() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::failing(Failure::Server));
	let tracker = tracker(config(dir.path()), &transport);

	for i in 0..3 {
		tracker.capture_message(format!("asset {i} missing"), Severity::Error).await;
	}

	assert_eq!(transport.attempts(), 1);
	assert_eq!(tracker.queued(), 0);
	assert_eq!(tracker.stored(), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_after_throttles_until_elapsed() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::failing(Failure::RateLimited(
		Duration::from_secs(60),
	)));
	let mut config = config(dir.path());
	config.batch.enabled = false;
	let tracker = tracker(config, &transport);

	assert_eq!(
		tracker.capture_message("first", Severity::Error).await,
		CaptureOutcome::StoredOffline
	);
	transport.fail_with(None);

	assert_eq!(
		tracker.capture_message("second", Severity::Error).await,
		CaptureOutcome::StoredOffline
	);
	assert_eq!(transport.attempts(), 1);

	tokio::time::advance(Duration::from_secs(61)).await;
	assert_eq!(
		tracker.capture_message("third", Severity::Error).await,
		CaptureOutcome::Sent
	);
	assert_eq!(tracker.stored(), 2);

	tracker.update().await;
	assert_eq!(tracker.stored(), 0);
	let messages: Vec<_> = transport.singles().into_iter().map(|e| e.message).collect();
	assert_eq!(messages, vec!["third", "first", "second"]);
}

#[tokio::test(start_paused = true)]
async fn update_retries_records_stored_while_online() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::failing(Failure::Server));
	let mut config = config(dir.path());
	config.batch.enabled = false;
	let tracker = tracker(config, &transport);

	assert_eq!(
		tracker.capture_message("collector hiccup", Severity::Error).await,
		CaptureOutcome::StoredOffline
	);
	transport.fail_with(None);

	tracker.update().await;
	assert_eq!(tracker.stored(), 1);

	tokio::time::advance(Duration::from_secs(61)).await;
	tracker.update().await;
	assert_eq!(tracker.stored(), 0);

	let singles = transport.singles();
	assert_eq!(singles.len(), 1);
	assert_eq!(singles[0].message, "collector hiccup");
}

#[tokio::test(start_paused = true)]
async fn update_retries_failed_batches() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::failing(Failure::Server));
	let tracker = tracker(config(dir.path()), &transport);

	for i in 0..3 {
		tracker.capture_message(format!("texture {i} missing"), Severity::Error).await;
	}
	assert_eq!(tracker.stored(), 3);
	transport.fail_with(None);

	tokio::time::advance(Duration::from_secs(61)).await;
	tracker.update().await;

	assert_eq!(tracker.stored(), 0);
	assert_eq!(transport.batches().len(), 1);
	assert_eq!(transport.batches()[0].len(), 3);
}

#[tokio::test]
async fn start_replays_stored_events_without_resampling() {
	let dir = tempfile::tempdir().unwrap();
	{
		let store = OfflineStore::open(dir.path(), 100).unwrap();
		let mut event = ErrorEvent::new(
			ErrorKind::Exception,
			ErrorCategory::Unhandled,
			Severity::Error,
			"stored before restart",
		);
		event.assign_sampling("abc123".to_string(), 0.5).unwrap();
		assert!(store.store(&event));
	}

	let transport = Arc::new(MockTransport::new());
	let mut config = config(dir.path());
	config.batch.enabled = false;
	let tracker = tracker(config, &transport);

	assert_eq!(tracker.start().await, 1);
	assert_eq!(tracker.stored(), 0);

	let singles = transport.singles();
	assert_eq!(singles.len(), 1);
	assert_eq!(singles[0].message, "stored before restart");
	assert_eq!(singles[0].fingerprint.as_deref(), Some("abc123"));
	assert_eq!(singles[0].sample_rate, Some(0.5));
}

#[tokio::test]
async fn start_keeps_records_while_offline() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let tracker = tracker(config(dir.path()), &transport);

	tracker.set_online(false);
	tracker.capture_message("while offline", Severity::Error).await;

	assert_eq!(tracker.start().await, 0);
	assert_eq!(tracker.stored(), 1);
}

#[tokio::test]
async fn update_replays_when_connectivity_returns() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let mut config = config(dir.path());
	config.batch.enabled = false;
	let tracker = tracker(config, &transport);

	tracker.set_online(false);
	tracker.update().await;
	tracker.capture_message("lost signal 1", Severity::Error).await;
	tracker.capture_message("lost signal 2", Severity::Error).await;
	assert_eq!(tracker.stored(), 2);

	tracker.set_online(true);
	tracker.update().await;

	assert_eq!(tracker.stored(), 0);
	let messages: Vec<_> = transport.singles().into_iter().map(|e| e.message).collect();
	assert_eq!(messages, vec!["lost signal 1", "lost signal 2"]);
}

#[tokio::test]
async fn shutdown_flushes_queue() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let tracker = tracker(config(dir.path()), &transport);

	tracker.capture_message("one", Severity::Error).await;
	tracker.capture_message("two", Severity::Error).await;
	assert_eq!(tracker.queued(), 2);

	tracker.shutdown().await;
	assert!(tracker.is_closed());
	assert_eq!(transport.delivered().len(), 2);
	assert_eq!(tracker.stored(), 0);
}

#[tokio::test]
async fn shutdown_persists_unsent_items() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let mut config = config(dir.path());
	config.batch.max_batch_size = 10;
	let tracker = tracker(config, &transport);

	for i in 0..4 {
		tracker.capture_message(format!("pending {i}"), Severity::Error).await;
	}
	transport.fail_with(Some(Failure::Server));

	tracker.shutdown().await;
	assert_eq!(tracker.queued(), 0);
	assert_eq!(tracker.stored(), 4);

	let store = OfflineStore::open(dir.path(), 100).unwrap();
	let messages: Vec<_> = store.drain().into_iter().map(|e| e.message).collect();
	assert_eq!(messages, vec!["pending 0", "pending 1", "pending 2", "pending 3"]);
}

#[tokio::test]
async fn sampled_out_errors_are_not_sent_but_fatal_ones_are() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let mut config = config(dir.path());
	config.batch.enabled = false;
	config.sampling.enabled = true;
	config.sampling.custom_rate = 0.0;
	config.sampling.min_rate = 0.0;
	let tracker = tracker(config, &transport);

	assert_eq!(
		tracker.capture_message("noisy warning", Severity::Error).await,
		CaptureOutcome::SampledOut
	);
	assert_eq!(
		tracker.capture_message("out of memory", Severity::Fatal).await,
		CaptureOutcome::Sent
	);

	let singles = transport.singles();
	assert_eq!(singles.len(), 1);
	assert_eq!(singles[0].sample_rate, Some(1.0));
}

#[tokio::test]
async fn breadcrumbs_are_bounded_and_attached() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let mut config = config(dir.path());
	config.batch.enabled = false;
	config.max_breadcrumbs = 3;
	let tracker = tracker(config, &transport);

	for i in 0..5 {
		tracker.add_breadcrumb(Breadcrumb::new(BreadcrumbKind::User, format!("tap {i}")));
	}
	tracker.capture_message("menu froze", Severity::Error).await;
	tracker.clear_breadcrumbs();
	tracker.capture_message("menu froze again", Severity::Error).await;

	let singles = transport.singles();
	let crumbs: Vec<_> = singles[0].breadcrumbs.iter().map(|b| b.message.as_str()).collect();
	assert_eq!(crumbs, vec!["tap 2", "tap 3", "tap 4"]);
	assert!(singles[1].breadcrumbs.is_empty());
}

#[tokio::test]
async fn breadcrumb_capacity_can_shrink_at_runtime() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let mut config = config(dir.path());
	config.batch.enabled = false;
	let tracker = tracker(config, &transport);

	for i in 0..4 {
		tracker.add_breadcrumb(Breadcrumb::new(BreadcrumbKind::Navigation, format!("scene {i}")));
	}
	tracker.set_max_breadcrumbs(2);
	tracker.add_breadcrumb(Breadcrumb::new(BreadcrumbKind::Navigation, "scene 4"));

	let crumbs: Vec<_> = tracker.breadcrumbs().into_iter().map(|b| b.message).collect();
	assert_eq!(crumbs, vec!["scene 3", "scene 4"]);
}

#[tokio::test]
async fn parsed_frames_are_scrubbed() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let mut config = config(dir.path());
	config.batch.enabled = false;
	config.scrub.patterns.push(r"player-[a-z]+".to_string());
	let tracker = tracker(config, &transport);

	tracker
		.capture_exception(
			"IOException",
			"Sharing violation",
			"SaveSystem.Write () (at /Users/player-alice/Game/Assets/SaveSystem.cs:12)",
		)
		.await;

	let singles = transport.singles();
	let event = &singles[0];
	assert!(!event.raw_stack_trace.as_deref().unwrap().contains("player-alice"));
	let frame = &event.stacktrace.as_ref().unwrap().frames[0];
	assert_eq!(
		frame.filename.as_deref(),
		Some("/Users/[REDACTED]/Game/Assets/SaveSystem.cs")
	);
	assert_eq!(frame.function.as_deref(), Some("Write"));
}

#[tokio::test]
async fn tags_can_be_removed() {
	let dir = tempfile::tempdir().unwrap();
	let transport = Arc::new(MockTransport::new());
	let mut config = config(dir.path());
	config.batch.enabled = false;
	let tracker = tracker(config, &transport);

	tracker.set_tag("region", "eu").await;
	tracker.capture_message("first", Severity::Error).await;
	tracker.remove_tag("region").await;
	tracker.capture_message("second", Severity::Error).await;

	let singles = transport.singles();
	assert_eq!(singles[0].tags.get("region").map(String::as_str), Some("eu"));
	assert!(!singles[1].tags.contains_key("region"));
}

#[tokio::test]
async fn delivers_over_http() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/ingest"))
		.and(header("X-Game-Id", GAME_ID))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_json(serde_json::json!({"status": "ok", "errorId": "err_42"})),
		)
		.expect(1)
		.mount(&server)
		.await;

	let dir = tempfile::tempdir().unwrap();
	let mut config = config(dir.path());
	config.endpoint = format!("{}/ingest", server.uri());
	config.batch.enabled = false;

	let tracker = ErrorTracker::builder(config).build().unwrap();
	let outcome = tracker
		.capture_exception("IndexOutOfRangeException", "Index was outside the bounds", TRACE)
		.await;
	assert_eq!(outcome, CaptureOutcome::Sent);
}
