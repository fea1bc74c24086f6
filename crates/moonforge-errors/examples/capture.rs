// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: capture errors with the moonforge-errors SDK.
//!
//! Run with:
//!   MOONFORGE_GAME_ID=<uuid> RUST_LOG=moonforge_errors=debug \
//!     cargo run --example capture -p moonforge-errors

use std::sync::Arc;

use moonforge_errors::{
	load_config, Breadcrumb, BreadcrumbKind, ContextSnapshot, DeviceContext, ErrorTracker,
	Severity, StaticContext,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const SAMPLE_TRACE: &str = "NullReferenceException: Object reference not set to an instance of an object
PlayerController.Jump (System.Single force) (at Assets/Scripts/PlayerController.cs:42)
UnityEngine.Events.InvokableCall.Invoke () (at /Users/builder/unity/Runtime/UnityEvent.cs:178)";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "moonforge_errors=info".into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	let config = load_config()?;
	println!("Initializing error tracker...");
	println!("  Endpoint: {}", config.endpoint);
	println!("  Game ID: {}", config.game_id);

	let device = DeviceContext {
		model: Some("Example Device".to_string()),
		..Default::default()
	};
	let context = Arc::new(StaticContext::new(
		ContextSnapshot::default()
			.with_device(&device)
			.with_game_state(serde_json::json!({"scene": "Tutorial", "level": 1})),
	));

	let tracker = ErrorTracker::builder(config)
		.context_provider(context)
		.build_async()
		.await?;

	tracker.set_user_id(Some("player_example_123".to_string())).await;
	tracker.set_session_id(Some("session_example".to_string())).await;
	tracker.set_tag("example", "true").await;

	tracker.add_breadcrumb(Breadcrumb::new(BreadcrumbKind::Navigation, "Loaded Tutorial"));
	tracker.add_breadcrumb(
		Breadcrumb::new(BreadcrumbKind::User, "Pressed jump").with_category("input"),
	);

	println!("\nCapturing test errors...");
	let outcome = tracker
		.capture_exception(
			"NullReferenceException",
			"Object reference not set to an instance of an object",
			SAMPLE_TRACE,
		)
		.await;
	println!("  Exception: {outcome:?}");

	let outcome = tracker
		.capture_message("Example message from moonforge-errors", Severity::Warning)
		.await;
	println!("  Message: {outcome:?}");

	let sent = tracker.flush().await;
	println!("  Flushed: {sent}");

	tracker.shutdown().await;
	println!("\nTracker shutdown complete.");

	Ok(())
}
