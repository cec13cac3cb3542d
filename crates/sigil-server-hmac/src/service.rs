// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HMAC key service providing the key lifecycle operations.
//!
//! This service combines:
//! - Per-user quota enforcement
//! - Envelope encryption of generated secrets
//! - Record lookup through an optional cache
//! - Request signature verification
//!
//! # Security
//!
//! The service does not authenticate callers. The API layer must make sure a
//! caller may act for `owner` before calling `create_for_user`, `list_for_owner`
//! or `revoke`.

use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use sigil_common_secret::{SecretBytes, SecretString};
use tracing::{debug, info, instrument, warn};

use crate::config::HmacConfig;
use crate::digest::DigestAlgorithm;
use crate::envelope::EnvelopeManager;
use crate::error::{HmacError, HmacResult};
use crate::expiry::ExpiryDuration;
use crate::key_cache::KeyCache;
use crate::signature;
use crate::store::KeyStore;
use crate::types::{IssuedKey, KeyId, KeyRecord, NewKeyRecord, UserId};

type OwnerLock = Arc<tokio::sync::Mutex<()>>;
type OwnerLocks = parking_lot::Mutex<HashMap<UserId, OwnerLock>>;

/// A reference to one owner's creation lock.
///
/// Dropping the last lease removes the owner's map entry, including when the
/// future holding it is cancelled while waiting for the lock.
struct OwnerLease<'a> {
	locks: &'a OwnerLocks,
	owner: UserId,
	lock: OwnerLock,
}

impl<'a> OwnerLease<'a> {
	fn acquire(locks: &'a OwnerLocks, owner: UserId) -> Self {
		let lock = locks.lock().entry(owner).or_default().clone();
		Self { locks, owner, lock }
	}

	fn lock(&self) -> &tokio::sync::Mutex<()> {
		&self.lock
	}
}

impl Drop for OwnerLease<'_> {
	fn drop(&mut self) {
		let mut locks = self.locks.lock();
		// The map and this lease are the only holders.
		let idle = locks
			.get(&self.owner)
			.is_some_and(|held| Arc::ptr_eq(held, &self.lock) && Arc::strong_count(held) == 2);
		if idle {
			locks.remove(&self.owner);
		}
	}
}

pub struct HmacKeyService<S: KeyStore> {
	store: Arc<S>,
	cache: Option<Arc<dyn KeyCache>>,
	envelope: EnvelopeManager,
	config: HmacConfig,
	owner_locks: OwnerLocks,
}

impl<S: KeyStore> HmacKeyService<S> {
	pub fn new(config: HmacConfig, store: Arc<S>) -> Self {
		let envelope = EnvelopeManager::new(
			config.master_secret().clone(),
			config.decrypt_cache_capacity(),
		);
		Self {
			store,
			cache: None,
			envelope,
			config,
			owner_locks: parking_lot::Mutex::new(HashMap::new()),
		}
	}

	/// Route lookups through `cache` before hitting the store.
	pub fn with_key_cache(mut self, cache: Arc<dyn KeyCache>) -> Self {
		self.cache = Some(cache);
		self
	}

	pub fn config(&self) -> &HmacConfig {
		&self.config
	}

	pub fn envelope(&self) -> &EnvelopeManager {
		&self.envelope
	}

	/// Issue a new key for `owner` using the configured expiry.
	pub async fn create_for_user(&self, owner: UserId) -> HmacResult<IssuedKey> {
		self.create_for_user_with_expiry(owner, self.config.expires_in().copied())
			.await
	}

	/// Issue a new key for `owner`.
	///
	/// The expiry is fixed to an absolute timestamp here and never re-parsed.
	/// The quota count and the insert run under a per-owner lock, so concurrent
	/// requests for one owner cannot overshoot `max_keys_per_user`.
	#[instrument(skip(self), fields(owner_id = %owner))]
	pub async fn create_for_user_with_expiry(
		&self,
		owner: UserId,
		expires_in: Option<ExpiryDuration>,
	) -> HmacResult<IssuedKey> {
		let expires_at = expires_in
			.map(|expiry| expiry.expires_at(Utc::now()))
			.transpose()?;

		let lease = OwnerLease::acquire(&self.owner_locks, owner);
		let _guard = lease.lock().lock().await;
		self.create_locked(owner, expires_at).await
	}

	async fn create_locked(
		&self,
		owner: UserId,
		expires_at: Option<chrono::DateTime<Utc>>,
	) -> HmacResult<IssuedKey> {
		let max = self.config.max_keys_per_user();
		let count = self.store.count_for_owner(&owner).await?;
		if count >= u64::from(max) {
			warn!(owner_id = %owner, count, max, "HMAC key quota exceeded");
			return Err(HmacError::QuotaExceeded { max });
		}

		let sealed = self.envelope.create()?;
		let record = self
			.store
			.insert(NewKeyRecord {
				owner,
				encrypted_secret: sealed.encrypted_secret,
				salt: sealed.salt,
				expires_at,
			})
			.await?;

		info!(hmac_key_id = %record.id, owner_id = %owner, "Issued HMAC key");

		Ok(IssuedKey {
			id: record.id,
			secret: SecretString::new(BASE64.encode(sealed.plaintext.expose())),
			expires_at: record.expires_at,
		})
	}

	/// Fetch a key record, consulting the key cache first when one is set.
	///
	/// Expiry is not checked here; see [`Self::verify_signature`].
	#[instrument(skip(self), fields(hmac_key_id = %key_id))]
	pub async fn lookup(&self, key_id: &KeyId) -> HmacResult<KeyRecord> {
		if let Some(cache) = &self.cache {
			if let Some(record) = cache.get(key_id).await {
				debug!(hmac_key_id = %key_id, "HMAC key cache hit");
				return Ok(record);
			}
		}

		let record = self
			.store
			.get(key_id)
			.await?
			.ok_or(HmacError::NotFound(*key_id))?;

		if let Some(cache) = &self.cache {
			cache.set(&record).await;
		}
		Ok(record)
	}

	/// Decrypt the secret held by `record`.
	pub fn open_secret(&self, record: &KeyRecord) -> HmacResult<SecretBytes> {
		self.envelope.open(&record.encrypted_secret, &record.salt)
	}

	/// Check a request signature made with the key `key_id`.
	///
	/// Returns the key record on success. Expired keys fail with `KeyExpired`
	/// before any decryption happens.
	#[instrument(skip(self, message, signature), fields(hmac_key_id = %key_id, digest = %digest))]
	pub async fn verify_signature(
		&self,
		key_id: &KeyId,
		digest: DigestAlgorithm,
		message: &str,
		signature: &str,
	) -> HmacResult<KeyRecord> {
		let record = self.lookup(key_id).await?;
		if record.is_expired_at(Utc::now()) {
			debug!(hmac_key_id = %key_id, "HMAC key expired");
			return Err(HmacError::KeyExpired(*key_id));
		}

		let secret = self.open_secret(&record)?;
		if signature::verify_with(digest, message, secret.expose(), signature)? {
			Ok(record)
		} else {
			debug!(hmac_key_id = %key_id, "HMAC signature mismatch");
			Err(HmacError::SignatureMismatch)
		}
	}

	#[instrument(skip(self), fields(owner_id = %owner))]
	pub async fn list_for_owner(&self, owner: &UserId) -> HmacResult<Vec<KeyRecord>> {
		self.store.list_for_owner(owner).await
	}

	/// Delete a key. Its quota slot is freed immediately.
	#[instrument(skip(self), fields(hmac_key_id = %key_id))]
	pub async fn revoke(&self, key_id: &KeyId) -> HmacResult<()> {
		let deleted = self.store.delete(key_id).await?;
		if let Some(cache) = &self.cache {
			cache.invalidate(key_id).await;
		}
		if !deleted {
			return Err(HmacError::NotFound(*key_id));
		}
		info!(hmac_key_id = %key_id, "Revoked HMAC key");
		Ok(())
	}

	/// Remove all expired keys from the store.
	#[instrument(skip(self))]
	pub async fn purge_expired(&self) -> HmacResult<u64> {
		let purged = self.store.delete_expired(Utc::now()).await?;
		info!(purged, "Purged expired HMAC keys");
		Ok(purged)
	}
}
