// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded, thread-safe cache of decrypted HMAC secrets.
//!
//! Re-deriving a PBKDF2 key on every verified request is the dominant cost of
//! verification, so opened secrets are memoized by `(ciphertext, salt)`. When
//! the cache is full the oldest inserted entry is evicted. There is no TTL:
//! entries are a pure function of their key and the master secret.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use sigil_common_secret::SecretBytes;

use crate::envelope::SALT_SIZE;

/// Default number of decrypted secrets kept in memory.
pub const DEFAULT_CAPACITY: usize = 100;

type CacheKey = (Vec<u8>, [u8; SALT_SIZE]);

/// FIFO-evicting map from `(ciphertext, salt)` to the decrypted secret.
///
/// A capacity of zero disables caching entirely.
pub struct DecryptCache {
	inner: Mutex<CacheInner>,
	capacity: usize,
}

struct CacheInner {
	entries: HashMap<CacheKey, SecretBytes>,
	/// Insertion order, oldest first.
	order: VecDeque<CacheKey>,
}

impl DecryptCache {
	pub fn new(capacity: usize) -> Self {
		Self {
			inner: Mutex::new(CacheInner {
				entries: HashMap::with_capacity(capacity),
				order: VecDeque::with_capacity(capacity),
			}),
			capacity,
		}
	}

	pub fn with_default_capacity() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn len(&self) -> usize {
		self.inner.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn get(&self, ciphertext: &[u8], salt: &[u8; SALT_SIZE]) -> Option<SecretBytes> {
		if self.capacity == 0 {
			return None;
		}
		let key = (ciphertext.to_vec(), *salt);
		self.inner.lock().entries.get(&key).cloned()
	}

	/// Insert an opened secret, evicting the oldest entries to stay within capacity.
	pub fn insert(&self, ciphertext: &[u8], salt: &[u8; SALT_SIZE], secret: SecretBytes) {
		if self.capacity == 0 {
			return;
		}

		let key = (ciphertext.to_vec(), *salt);
		let mut inner = self.inner.lock();
		if inner.entries.contains_key(&key) {
			inner.entries.insert(key, secret);
			return;
		}

		while inner.entries.len() >= self.capacity {
			match inner.order.pop_front() {
				Some(oldest) => {
					inner.entries.remove(&oldest);
				}
				None => break,
			}
		}

		inner.order.push_back(key.clone());
		inner.entries.insert(key, secret);
	}

	pub fn clear(&self) {
		let mut inner = self.inner.lock();
		inner.entries.clear();
		inner.order.clear();
	}
}

impl std::fmt::Debug for DecryptCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DecryptCache")
			.field("capacity", &self.capacity)
			.field("len", &self.len())
			.finish()
	}
}
