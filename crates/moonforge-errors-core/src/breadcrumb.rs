// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Breadcrumb types (events leading up to an error).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::event::{now_millis, Severity};

/// A breadcrumb representing an action that happened before an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
	pub kind: BreadcrumbKind,
	pub severity: Severity,
	pub message: String,
	/// Free-form grouping such as "scene", "http", "input".
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<serde_json::Map<String, serde_json::Value>>,
	#[serde(with = "chrono::serde::ts_milliseconds")]
	pub timestamp: DateTime<Utc>,
}

impl Default for Breadcrumb {
	fn default() -> Self {
		Self {
			kind: BreadcrumbKind::Debug,
			severity: Severity::Info,
			message: String::new(),
			category: None,
			data: None,
			timestamp: now_millis(),
		}
	}
}

impl Breadcrumb {
	pub fn new(kind: BreadcrumbKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
			..Default::default()
		}
	}

	pub fn with_severity(mut self, severity: Severity) -> Self {
		self.severity = severity;
		self
	}

	pub fn with_category(mut self, category: impl Into<String>) -> Self {
		self.category = Some(category.into());
		self
	}

	pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
		self.data
			.get_or_insert_with(serde_json::Map::new)
			.insert(key.into(), value);
		self
	}
}

/// What kind of action a breadcrumb records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreadcrumbKind {
	Navigation,
	Network,
	User,
	Debug,
	Error,
}

impl fmt::Display for BreadcrumbKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Navigation => write!(f, "navigation"),
			Self::Network => write!(f, "network"),
			Self::User => write!(f, "user"),
			Self::Debug => write!(f, "debug"),
			Self::Error => write!(f, "error"),
		}
	}
}

impl FromStr for BreadcrumbKind {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"navigation" => Ok(Self::Navigation),
			"network" => Ok(Self::Network),
			"user" => Ok(Self::User),
			"debug" => Ok(Self::Debug),
			"error" => Ok(Self::Error),
			_ => Err(CoreError::InvalidBreadcrumbKind(s.to_string())),
		}
	}
}
