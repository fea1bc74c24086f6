// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fingerprinting algorithm for grouping similar error events.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use sha2::{Digest, Sha256};

use crate::event::{ErrorEvent, Frame};

/// Maximum number of characters of the normalized message fed to the hash.
pub const MAX_MESSAGE_CHARS: usize = 200;

const HEX_PLACEHOLDER: &str = "<hex>";
const NUM_PLACEHOLDER: &str = "<num>";

static HEX_LITERAL: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"0[xX][0-9a-fA-F]+").unwrap());
static HEX_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[0-9a-fA-F]{8,}\b").unwrap());
static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

/// Compute the grouping fingerprint for an event.
///
/// The fingerprint is a SHA256 hash of:
/// 1. Exception class, if present
/// 2. The normalized message (addresses and numbers replaced, truncated)
/// 3. The first in-app frame as `module:function:line`, if any
pub fn compute_fingerprint(event: &ErrorEvent) -> String {
	let mut hasher = Sha256::new();

	if let Some(class) = &event.exception_class {
		hasher.update(class.as_bytes());
	}
	hasher.update(b"|");

	hasher.update(normalize_message(&event.message).as_bytes());
	hasher.update(b"|");

	if let Some(frame) = event.stacktrace.as_ref().and_then(|st| st.first_in_app()) {
		hasher.update(frame_key(frame).as_bytes());
	}

	hex::encode(hasher.finalize())
}

/// Replace hex-looking substrings and digit runs with placeholders, then
/// truncate to [`MAX_MESSAGE_CHARS`].
pub fn normalize_message(message: &str) -> String {
	let without_literals = HEX_LITERAL.replace_all(message, HEX_PLACEHOLDER);
	// A bare run only counts as hex when it mixes digits in; all-digit runs are
	// numbers and words like "feedback" stay intact.
	let without_runs = HEX_RUN.replace_all(&without_literals, |caps: &Captures| {
		let run = &caps[0];
		let has_digit = run.bytes().any(|b| b.is_ascii_digit());
		let all_digits = run.bytes().all(|b| b.is_ascii_digit());
		if has_digit && !all_digits {
			HEX_PLACEHOLDER.to_string()
		} else {
			run.to_string()
		}
	});
	let normalized = DIGIT_RUN.replace_all(&without_runs, NUM_PLACEHOLDER);
	truncate_chars(&normalized, MAX_MESSAGE_CHARS)
}

/// `module:function:line` for the frame, with missing parts left empty.
pub fn frame_key(frame: &Frame) -> String {
	format!(
		"{}:{}:{}",
		frame.module.as_deref().unwrap_or(""),
		frame.function.as_deref().unwrap_or(""),
		frame.lineno.map(|l| l.to_string()).unwrap_or_default()
	)
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
	s.chars().take(max_chars).collect()
}
