// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage abstraction for HMAC key records.
//!
//! The service only talks to [`KeyStore`]. [`SqliteKeyStore`] adapts the
//! database repository, translating between raw byte fields and the base64
//! text columns the table stores.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, SubsecRound, Utc};
use sigil_server_db::{HmacKeyRepository, HmacKeyRow, SqlitePool};

use crate::envelope::SALT_SIZE;
use crate::error::{HmacError, HmacResult};
use crate::types::{KeyId, KeyRecord, NewKeyRecord, UserId};

impl TryFrom<HmacKeyRow> for KeyRecord {
	type Error = HmacError;

	fn try_from(row: HmacKeyRow) -> Result<Self, Self::Error> {
		let encrypted_secret = BASE64
			.decode(&row.secret)
			.map_err(|e| HmacError::InvalidEncoding(format!("secret: {e}")))?;
		let salt_bytes = BASE64
			.decode(&row.salt)
			.map_err(|e| HmacError::InvalidEncoding(format!("salt: {e}")))?;
		let salt: [u8; SALT_SIZE] =
			salt_bytes
				.as_slice()
				.try_into()
				.map_err(|_| HmacError::InvalidKeyMaterial {
					what: "salt",
					expected: SALT_SIZE,
					actual: salt_bytes.len(),
				})?;

		Ok(KeyRecord {
			id: KeyId::new(row.id),
			owner: UserId::new(row.owner_id),
			encrypted_secret,
			salt,
			expires_at: row.expires_at,
			created_at: row.created_at,
		})
	}
}

impl From<&KeyRecord> for HmacKeyRow {
	fn from(record: &KeyRecord) -> Self {
		HmacKeyRow {
			id: record.id.into_inner(),
			owner_id: record.owner.into_inner(),
			secret: BASE64.encode(&record.encrypted_secret),
			salt: BASE64.encode(record.salt),
			expires_at: record.expires_at,
			created_at: record.created_at,
		}
	}
}

fn key_count(count: i64) -> HmacResult<u64> {
	u64::try_from(count).map_err(|_| HmacError::Internal(format!("negative key count: {count}")))
}

/// Persistence for HMAC key records.
#[async_trait]
pub trait KeyStore: Send + Sync {
	/// Number of stored records for `owner`, expired ones included.
	async fn count_for_owner(&self, owner: &UserId) -> HmacResult<u64>;

	/// Persist a new record, assigning its ID and creation time.
	async fn insert(&self, record: NewKeyRecord) -> HmacResult<KeyRecord>;

	async fn get(&self, id: &KeyId) -> HmacResult<Option<KeyRecord>>;

	/// All records for `owner`, newest first.
	async fn list_for_owner(&self, owner: &UserId) -> HmacResult<Vec<KeyRecord>>;

	/// Returns whether a record was removed.
	async fn delete(&self, id: &KeyId) -> HmacResult<bool>;

	/// Remove every record with `expires_at <= now`, returning the count.
	async fn delete_expired(&self, now: DateTime<Utc>) -> HmacResult<u64>;
}

/// SQLite implementation of [`KeyStore`].
#[derive(Clone)]
pub struct SqliteKeyStore {
	repo: HmacKeyRepository,
}

impl SqliteKeyStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			repo: HmacKeyRepository::new(pool),
		}
	}
}

#[async_trait]
impl KeyStore for SqliteKeyStore {
	#[tracing::instrument(skip(self), fields(owner_id = %owner))]
	async fn count_for_owner(&self, owner: &UserId) -> HmacResult<u64> {
		let count = self.repo.count_keys_for_owner(owner.as_uuid()).await?;
		key_count(count)
	}

	#[tracing::instrument(skip(self, record), fields(owner_id = %record.owner))]
	async fn insert(&self, record: NewKeyRecord) -> HmacResult<KeyRecord> {
		// Timestamps are stored with microsecond precision.
		let record = KeyRecord {
			id: KeyId::generate(),
			owner: record.owner,
			encrypted_secret: record.encrypted_secret,
			salt: record.salt,
			expires_at: record.expires_at.map(|t| t.trunc_subsecs(6)),
			created_at: Utc::now().trunc_subsecs(6),
		};
		self.repo.insert_key(&HmacKeyRow::from(&record)).await?;
		Ok(record)
	}

	#[tracing::instrument(skip(self), fields(hmac_key_id = %id))]
	async fn get(&self, id: &KeyId) -> HmacResult<Option<KeyRecord>> {
		self.repo
			.get_key(id.as_uuid())
			.await?
			.map(KeyRecord::try_from)
			.transpose()
	}

	#[tracing::instrument(skip(self), fields(owner_id = %owner))]
	async fn list_for_owner(&self, owner: &UserId) -> HmacResult<Vec<KeyRecord>> {
		self.repo
			.list_keys_for_owner(owner.as_uuid())
			.await?
			.into_iter()
			.map(KeyRecord::try_from)
			.collect()
	}

	#[tracing::instrument(skip(self), fields(hmac_key_id = %id))]
	async fn delete(&self, id: &KeyId) -> HmacResult<bool> {
		Ok(self.repo.delete_key(id.as_uuid()).await?)
	}

	#[tracing::instrument(skip(self))]
	async fn delete_expired(&self, now: DateTime<Utc>) -> HmacResult<u64> {
		Ok(self.repo.delete_expired_keys(now).await?)
	}
}
