// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable queue for events that could not be delivered.
//!
//! Each event is one JSON file named `<stored_at_millis>-<sequence>.json`, both
//! zero-padded so lexical order is creation order. Writes go through a
//! temporary file and a rename. Failures are logged and never propagate to
//! the capture path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use moonforge_errors_core::{now_millis, ErrorEvent, StoredRecord};
use tracing::{debug, warn};

const RECORD_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";
const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct OfflineConfig {
	pub enabled: bool,
	/// Maximum number of stored records; the oldest is evicted beyond this.
	pub max_stored: usize,
	pub directory: PathBuf,
	/// Records older than this are removed at startup.
	pub max_age_days: u32,
}

impl Default for OfflineConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			max_stored: 100,
			directory: std::env::temp_dir().join("moonforge-errors"),
			max_age_days: 7,
		}
	}
}

#[derive(Debug)]
pub struct OfflineStore {
	dir: PathBuf,
	max_stored: usize,
	sequence: Mutex<u64>,
}

impl OfflineStore {
	/// Open (creating if needed) the store directory. Leftover temporary files
	/// from an interrupted write are removed.
	pub fn open(dir: impl Into<PathBuf>, max_stored: usize) -> io::Result<Self> {
		let dir = dir.into();
		fs::create_dir_all(&dir)?;

		for entry in fs::read_dir(&dir)? {
			let path = entry?.path();
			if has_extension(&path, TEMP_EXTENSION) {
				debug!(path = %path.display(), "removing partial offline record");
				if let Err(e) = fs::remove_file(&path) {
					warn!(path = %path.display(), error = %e, "failed to remove partial offline record");
				}
			}
		}

		Ok(Self {
			dir,
			max_stored,
			sequence: Mutex::new(0),
		})
	}

	pub fn directory(&self) -> &Path {
		&self.dir
	}

	/// Persist an event. Returns false if nothing was written.
	pub fn store(&self, event: &ErrorEvent) -> bool {
		if self.max_stored == 0 {
			return false;
		}

		let mut sequence = self.lock();
		let mut records = self.records();
		while records.len() >= self.max_stored {
			let oldest = records.remove(0);
			debug!(path = %oldest.display(), "offline store full, evicting oldest record");
			if let Err(e) = fs::remove_file(&oldest) {
				warn!(path = %oldest.display(), error = %e, "failed to evict offline record");
				return false;
			}
		}

		let record = StoredRecord {
			stored_at: now_millis(),
			event: event.clone(),
		};
		let name = format!(
			"{:013}-{:010}",
			record.stored_at.timestamp_millis().max(0),
			*sequence
		);
		*sequence += 1;

		match self.write_record(&name, &record) {
			Ok(()) => {
				debug!(record = %name, "stored error offline");
				true
			}
			Err(e) => {
				warn!(record = %name, error = %e, "failed to store error offline");
				false
			}
		}
	}

	/// Remove and return every stored event, oldest first. Records that fail
	/// to parse are deleted and skipped.
	pub fn drain(&self) -> Vec<ErrorEvent> {
		let _sequence = self.lock();
		let mut events = Vec::new();

		for path in self.records() {
			match read_record(&path) {
				Ok(record) => events.push(record.event),
				Err(e) => warn!(path = %path.display(), error = %e, "discarding corrupt offline record"),
			}
			if let Err(e) = fs::remove_file(&path) {
				warn!(path = %path.display(), error = %e, "failed to remove drained offline record");
			}
		}

		if !events.is_empty() {
			debug!(count = events.len(), "drained offline store");
		}
		events
	}

	/// Remove records stored more than `max_age_days` ago. Returns how many
	/// were removed.
	pub fn cleanup(&self, max_age_days: u32) -> usize {
		let _sequence = self.lock();
		let cutoff = Utc::now().timestamp_millis() - i64::from(max_age_days) * MILLIS_PER_DAY;
		let mut removed = 0;

		for path in self.records() {
			let Some(stored_at) = stored_millis(&path) else {
				continue;
			};
			if stored_at < cutoff {
				match fs::remove_file(&path) {
					Ok(()) => removed += 1,
					Err(e) => {
						warn!(path = %path.display(), error = %e, "failed to remove expired offline record")
					}
				}
			}
		}

		if removed > 0 {
			debug!(removed, max_age_days, "expired offline records removed");
		}
		removed
	}

	pub fn count(&self) -> usize {
		let _sequence = self.lock();
		self.records().len()
	}

	fn write_record(&self, name: &str, record: &StoredRecord) -> io::Result<()> {
		let json = serde_json::to_vec(record)?;
		let temp = self.dir.join(format!("{name}.{TEMP_EXTENSION}"));
		let path = self.dir.join(format!("{name}.{RECORD_EXTENSION}"));
		fs::write(&temp, json)?;
		fs::rename(&temp, &path).inspect_err(|_| {
			let _ = fs::remove_file(&temp);
		})
	}

	/// Record files sorted oldest first.
	fn records(&self) -> Vec<PathBuf> {
		let entries = match fs::read_dir(&self.dir) {
			Ok(entries) => entries,
			Err(e) => {
				warn!(path = %self.dir.display(), error = %e, "failed to list offline store");
				return Vec::new();
			}
		};

		let mut records: Vec<PathBuf> = entries
			.filter_map(|entry| entry.ok().map(|e| e.path()))
			.filter(|path| path.is_file() && has_extension(path, RECORD_EXTENSION))
			.collect();
		records.sort();
		records
	}

	fn lock(&self) -> MutexGuard<'_, u64> {
		self.sequence.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

fn has_extension(path: &Path, extension: &str) -> bool {
	path.extension().and_then(|e| e.to_str()) == Some(extension)
}

fn read_record(path: &Path) -> io::Result<StoredRecord> {
	let bytes = fs::read(path)?;
	serde_json::from_slice(&bytes).map_err(io::Error::from)
}

fn stored_millis(path: &Path) -> Option<i64> {
	let stem = path.file_stem()?.to_str()?;
	let (millis, _) = stem.split_once('-')?;
	millis.parse().ok()
}
