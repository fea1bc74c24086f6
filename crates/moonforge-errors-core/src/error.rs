// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for error tracking core types.

use thiserror::Error;

/// Errors raised by the core data model.
#[derive(Debug, Error)]
pub enum CoreError {
	#[error("invalid error kind: {0}")]
	InvalidKind(String),

	#[error("invalid error category: {0}")]
	InvalidCategory(String),

	#[error("invalid severity: {0}")]
	InvalidSeverity(String),

	#[error("invalid breadcrumb kind: {0}")]
	InvalidBreadcrumbKind(String),

	#[error("event already carries fingerprint {0}")]
	AlreadySampled(String),

	#[error("invalid native crash record: {0}")]
	InvalidCrashRecord(String),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
