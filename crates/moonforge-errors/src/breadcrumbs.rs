// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded breadcrumb history.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use moonforge_errors_core::Breadcrumb;

/// Fixed-capacity ring of breadcrumbs. The oldest entry is evicted first.
#[derive(Debug)]
pub struct BreadcrumbRing {
	inner: Mutex<Ring>,
}

#[derive(Debug)]
struct Ring {
	items: VecDeque<Breadcrumb>,
	capacity: usize,
}

impl Ring {
	fn enforce_capacity(&mut self) {
		while self.items.len() > self.capacity {
			self.items.pop_front();
		}
	}
}

impl BreadcrumbRing {
	pub fn new(capacity: usize) -> Self {
		Self {
			inner: Mutex::new(Ring {
				items: VecDeque::with_capacity(capacity.min(256)),
				capacity,
			}),
		}
	}

	pub fn add(&self, breadcrumb: Breadcrumb) {
		let mut ring = self.lock();
		if ring.capacity == 0 {
			return;
		}
		ring.items.push_back(breadcrumb);
		ring.enforce_capacity();
	}

	/// Copy of the current breadcrumbs, oldest first.
	pub fn snapshot(&self) -> Vec<Breadcrumb> {
		self.lock().items.iter().cloned().collect()
	}

	/// Change the capacity, trimming the oldest entries if it shrank.
	pub fn configure(&self, capacity: usize) {
		let mut ring = self.lock();
		ring.capacity = capacity;
		ring.enforce_capacity();
	}

	pub fn clear(&self) {
		self.lock().items.clear();
	}

	pub fn len(&self) -> usize {
		self.lock().items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn capacity(&self) -> usize {
		self.lock().capacity
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Ring> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
