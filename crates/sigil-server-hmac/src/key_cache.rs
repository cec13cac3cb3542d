// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Record lookup cache.
//!
//! Sits in front of the [`crate::KeyStore`] on the lookup path. Entries are
//! whole key records (ciphertext and salt, never plaintext) and expire after a
//! fixed TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::{KeyId, KeyRecord};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
const MAX_ENTRIES: usize = 10_000;

#[async_trait]
pub trait KeyCache: Send + Sync {
	async fn get(&self, id: &KeyId) -> Option<KeyRecord>;
	async fn set(&self, record: &KeyRecord);
	async fn invalidate(&self, id: &KeyId);
}

#[derive(Debug, Clone)]
struct CacheEntry {
	record: KeyRecord,
	expires_at: Instant,
}

/// Process-local TTL cache.
#[derive(Debug)]
pub struct InMemoryKeyCache {
	entries: RwLock<HashMap<KeyId, CacheEntry>>,
	ttl: Duration,
	max_entries: usize,
}

impl Default for InMemoryKeyCache {
	fn default() -> Self {
		Self::new(DEFAULT_TTL)
	}
}

impl InMemoryKeyCache {
	pub fn new(ttl: Duration) -> Self {
		Self {
			entries: RwLock::new(HashMap::new()),
			ttl,
			max_entries: MAX_ENTRIES,
		}
	}

	pub fn with_max_entries(ttl: Duration, max_entries: usize) -> Self {
		Self {
			entries: RwLock::new(HashMap::new()),
			ttl,
			max_entries,
		}
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	fn evict(entries: &mut HashMap<KeyId, CacheEntry>, now: Instant, max_entries: usize) {
		entries.retain(|_, entry| entry.expires_at > now);
		if entries.len() < max_entries {
			return;
		}
		if let Some(oldest) = entries
			.iter()
			.min_by_key(|(_, entry)| entry.expires_at)
			.map(|(id, _)| *id)
		{
			entries.remove(&oldest);
		}
	}
}

#[async_trait]
impl KeyCache for InMemoryKeyCache {
	async fn get(&self, id: &KeyId) -> Option<KeyRecord> {
		let now = Instant::now();
		{
			let entries = self.entries.read();
			match entries.get(id) {
				Some(entry) if entry.expires_at > now => return Some(entry.record.clone()),
				Some(_) => {}
				None => return None,
			}
		}
		self.entries.write().remove(id);
		None
	}

	async fn set(&self, record: &KeyRecord) {
		if self.max_entries == 0 {
			return;
		}
		let now = Instant::now();
		let mut entries = self.entries.write();
		if entries.len() >= self.max_entries && !entries.contains_key(&record.id) {
			Self::evict(&mut entries, now, self.max_entries);
		}
		entries.insert(
			record.id,
			CacheEntry {
				record: record.clone(),
				expires_at: now + self.ttl,
			},
		);
	}

	async fn invalidate(&self, id: &KeyId) {
		self.entries.write().remove(id);
	}
}
