// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Parsing of platform-normalized managed stack trace text into frames.
//!
//! Two line shapes are understood:
//!
//! ```text
//! PlayerController.Jump (System.Single force) (at Assets/Scripts/PlayerController.cs:42)
//!   at Game.Inventory.Add (System.String id) [0x00012] in /proj/Assets/Scripts/Inventory.cs:88
//! ```
//!
//! Anything else that looks like a call (`Namespace.Type:Method(args)`) becomes
//! a frame without location info. Blank lines and message lines are skipped.

use crate::event::{Frame, Stacktrace};

/// Parse raw stack trace text into a stacktrace.
pub fn parse_stack_trace(raw: &str) -> Stacktrace {
	let frames = raw.lines().filter_map(parse_frame_line).collect();
	Stacktrace { frames }
}

/// Parse a single stack trace line into a frame.
fn parse_frame_line(line: &str) -> Option<Frame> {
	let line = line.trim();
	let line = line.strip_prefix("at ").unwrap_or(line);
	if line.is_empty() || line.starts_with("---") {
		return None;
	}

	let call_end = line.find('(')?;
	let call = line[..call_end].trim();
	if call.is_empty() || call.contains(' ') {
		return None;
	}

	let (module, function) = split_call(call);
	let rest = &line[call_end..];
	let (filename, lineno) = parse_location(rest);
	let instruction_addr = parse_il_offset(rest);

	let in_app = is_in_app_frame(module.as_deref().unwrap_or(""), filename.as_deref());

	Some(Frame {
		module,
		function: Some(function),
		filename,
		lineno,
		colno: None,
		instruction_addr,
		symbol_addr: None,
		in_app,
	})
}

/// Split `Namespace.Type.Method` or `Namespace.Type:Method` into module and
/// function.
fn split_call(call: &str) -> (Option<String>, String) {
	match call.rfind(|c: char| c == ':' || c == '.') {
		Some(idx) if idx > 0 && idx + 1 < call.len() => {
			(Some(call[..idx].to_string()), call[idx + 1..].to_string())
		}
		_ => (None, call.to_string()),
	}
}

/// Extract `file:line` from `(at file:line)` or `in file:line`.
fn parse_location(rest: &str) -> (Option<String>, Option<u32>) {
	let location = if let Some(idx) = rest.find("(at ") {
		rest[idx + 4..].trim_end().trim_end_matches(')')
	} else if let Some(idx) = rest.rfind(" in ") {
		rest[idx + 4..].trim()
	} else {
		return (None, None);
	};

	match location.rsplit_once(':') {
		Some((file, line)) => match line.trim().parse::<u32>() {
			Ok(lineno) => (Some(file.to_string()), Some(lineno)),
			Err(_) => (Some(location.to_string()), None),
		},
		None => (Some(location.to_string()), None),
	}
}

/// Extract the IL offset from `[0x00012]`.
fn parse_il_offset(rest: &str) -> Option<String> {
	let start = rest.find("[0x")?;
	let end = rest[start..].find(']')?;
	Some(rest[start + 1..start + end].to_string())
}

/// Determine if a frame belongs to game code rather than the engine or runtime.
fn is_in_app_frame(module: &str, filename: Option<&str>) -> bool {
	const SYSTEM_PREFIXES: &[&str] = &[
		"UnityEngine",
		"UnityEditor",
		"Unity.",
		"System",
		"Mono.",
		"Microsoft.",
		"TMPro.",
		"MoonForge.",
	];

	if SYSTEM_PREFIXES.iter().any(|prefix| module.starts_with(prefix)) {
		return false;
	}

	match filename {
		Some(file) => {
			let file = file.replace('\\', "/");
			file.contains("Assets/") && !file.contains("/Plugins/") && !file.contains("/Packages/")
		}
		None => !module.is_empty(),
	}
}
