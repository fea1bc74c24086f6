// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Context snapshots attached to error events (device, network, game state).
//!
//! The pipeline treats snapshots as opaque JSON. The typed structs here are a
//! convenience for collectors that want a stable shape.

use serde::{Deserialize, Serialize};

/// Device context at capture time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceContext {
	pub manufacturer: Option<String>,
	pub model: Option<String>,
	pub os_name: Option<String>,
	pub os_version: Option<String>,
	pub api_level: Option<u32>,
	pub cpu_architecture: Option<String>,
	pub memory_used_mb: Option<f32>,
	pub memory_available_mb: Option<f32>,
	/// "nominal", "fair", "serious", "critical"
	pub thermal_state: Option<String>,
	/// Percentage in 0..=100
	pub cpu_usage: Option<f32>,
	pub is_rooted: Option<bool>,
}

/// Network context at capture time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkContext {
	/// "wifi", "cellular", "none"
	pub reachability: Option<String>,
	pub carrier: Option<String>,
}

/// Point-in-time snapshot of everything a context provider knows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSnapshot {
	pub device: Option<serde_json::Value>,
	pub network: Option<serde_json::Value>,
	pub game_state: Option<serde_json::Value>,
}

impl ContextSnapshot {
	pub fn with_device(mut self, device: &DeviceContext) -> Self {
		self.device = serde_json::to_value(device).ok();
		self
	}

	pub fn with_network(mut self, network: &NetworkContext) -> Self {
		self.network = serde_json::to_value(network).ok();
		self
	}

	pub fn with_game_state(mut self, game_state: serde_json::Value) -> Self {
		self.game_state = Some(game_state);
		self
	}
}
