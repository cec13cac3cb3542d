// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HMAC key repository for database operations.
//!
//! Rows hold the encrypted secret and its salt as standard base64 text. The
//! repository never sees plaintext secrets and does not interpret the bytes.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::DbError;

/// A stored HMAC key row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HmacKeyRow {
	pub id: Uuid,
	pub owner_id: Uuid,
	/// Base64 ciphertext of the HMAC secret.
	pub secret: String,
	/// Base64 salt the record key is derived from.
	pub salt: String,
	pub expires_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait HmacKeyStore: Send + Sync {
	async fn insert_key(&self, row: &HmacKeyRow) -> Result<(), DbError>;
	async fn get_key(&self, id: &Uuid) -> Result<Option<HmacKeyRow>, DbError>;
	async fn count_keys_for_owner(&self, owner_id: &Uuid) -> Result<i64, DbError>;
	async fn list_keys_for_owner(&self, owner_id: &Uuid) -> Result<Vec<HmacKeyRow>, DbError>;
	async fn delete_key(&self, id: &Uuid) -> Result<bool, DbError>;
	async fn delete_expired_keys(&self, now: DateTime<Utc>) -> Result<u64, DbError>;
}

/// Repository for HMAC key database operations.
#[derive(Clone)]
pub struct HmacKeyRepository {
	pool: SqlitePool,
}

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Only four-digit years keep the fixed-width text form.
fn check_timestamp(field: &str, ts: &DateTime<Utc>) -> Result<(), DbError> {
	if (0..=9999).contains(&ts.year()) {
		Ok(())
	} else {
		Err(DbError::Internal(format!("{field} out of range: {ts}")))
	}
}

impl HmacKeyRepository {
	/// Create a new HMAC key repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert a new key row.
	///
	/// # Database Constraints
	/// - `id` must be unique
	/// - `salt` must be unique; a salt is never shared between records
	/// - timestamps must fall in years 0000 to 9999
	#[tracing::instrument(skip(self, row), fields(hmac_key_id = %row.id, owner_id = %row.owner_id))]
	pub async fn insert_key(&self, row: &HmacKeyRow) -> Result<(), DbError> {
		check_timestamp("created_at", &row.created_at)?;
		if let Some(expires_at) = &row.expires_at {
			check_timestamp("expires_at", expires_at)?;
		}

		sqlx::query(
			r#"
			INSERT INTO hmac_keys (id, owner_id, secret, salt, expires_at, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(row.id.to_string())
		.bind(row.owner_id.to_string())
		.bind(&row.secret)
		.bind(&row.salt)
		.bind(row.expires_at.as_ref().map(format_timestamp))
		.bind(format_timestamp(&row.created_at))
		.execute(&self.pool)
		.await?;

		tracing::debug!(hmac_key_id = %row.id, owner_id = %row.owner_id, "HMAC key inserted");
		Ok(())
	}

	/// Get a key by its ID.
	///
	/// # Returns
	/// `None` if no key exists with this ID. Expired keys are returned; callers
	/// check `expires_at`.
	#[tracing::instrument(skip(self), fields(hmac_key_id = %id))]
	pub async fn get_key(&self, id: &Uuid) -> Result<Option<HmacKeyRow>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, owner_id, secret, salt, expires_at, created_at
			FROM hmac_keys
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| parse_hmac_key_row(&r)).transpose()
	}

	/// Count all stored keys for an owner, expired ones included.
	#[tracing::instrument(skip(self), fields(owner_id = %owner_id))]
	pub async fn count_keys_for_owner(&self, owner_id: &Uuid) -> Result<i64, DbError> {
		let row = sqlx::query(
			r#"
			SELECT COUNT(*) as count
			FROM hmac_keys
			WHERE owner_id = ?
			"#,
		)
		.bind(owner_id.to_string())
		.fetch_one(&self.pool)
		.await?;

		Ok(row.get("count"))
	}

	/// List an owner's keys, newest first.
	#[tracing::instrument(skip(self), fields(owner_id = %owner_id))]
	pub async fn list_keys_for_owner(&self, owner_id: &Uuid) -> Result<Vec<HmacKeyRow>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, owner_id, secret, salt, expires_at, created_at
			FROM hmac_keys
			WHERE owner_id = ?
			ORDER BY created_at DESC
			"#,
		)
		.bind(owner_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let mut keys = Vec::with_capacity(rows.len());
		for row in rows {
			keys.push(parse_hmac_key_row(&row)?);
		}
		tracing::debug!(owner_id = %owner_id, count = keys.len(), "listed HMAC keys for owner");
		Ok(keys)
	}

	/// Delete a key.
	///
	/// # Returns
	/// `true` if a row was deleted, `false` if the key did not exist.
	#[tracing::instrument(skip(self), fields(hmac_key_id = %id))]
	pub async fn delete_key(&self, id: &Uuid) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM hmac_keys WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::info!(hmac_key_id = %id, "HMAC key deleted");
		}
		Ok(deleted)
	}

	/// Delete every key whose expiry is at or before `now`.
	///
	/// # Returns
	/// The number of deleted rows.
	#[tracing::instrument(skip(self))]
	pub async fn delete_expired_keys(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
		let result = sqlx::query(
			r#"
			DELETE FROM hmac_keys
			WHERE expires_at IS NOT NULL AND expires_at <= ?
			"#,
		)
		.bind(format_timestamp(&now))
		.execute(&self.pool)
		.await?;

		let deleted = result.rows_affected();
		if deleted > 0 {
			tracing::info!(deleted, "purged expired HMAC keys");
		}
		Ok(deleted)
	}
}

#[async_trait]
impl HmacKeyStore for HmacKeyRepository {
	async fn insert_key(&self, row: &HmacKeyRow) -> Result<(), DbError> {
		HmacKeyRepository::insert_key(self, row).await
	}

	async fn get_key(&self, id: &Uuid) -> Result<Option<HmacKeyRow>, DbError> {
		HmacKeyRepository::get_key(self, id).await
	}

	async fn count_keys_for_owner(&self, owner_id: &Uuid) -> Result<i64, DbError> {
		HmacKeyRepository::count_keys_for_owner(self, owner_id).await
	}

	async fn list_keys_for_owner(&self, owner_id: &Uuid) -> Result<Vec<HmacKeyRow>, DbError> {
		HmacKeyRepository::list_keys_for_owner(self, owner_id).await
	}

	async fn delete_key(&self, id: &Uuid) -> Result<bool, DbError> {
		HmacKeyRepository::delete_key(self, id).await
	}

	async fn delete_expired_keys(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
		HmacKeyRepository::delete_expired_keys(self, now).await
	}
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {field}: {e}")))
}

fn parse_hmac_key_row(row: &sqlx::sqlite::SqliteRow) -> Result<HmacKeyRow, DbError> {
	let id_str: String = row.get("id");
	let owner_id_str: String = row.get("owner_id");
	let secret: String = row.get("secret");
	let salt: String = row.get("salt");
	let expires_at_str: Option<String> = row.get("expires_at");
	let created_at_str: String = row.get("created_at");

	let id = Uuid::parse_str(&id_str)
		.map_err(|e| DbError::Internal(format!("Invalid hmac_key id UUID: {e}")))?;
	let owner_id = Uuid::parse_str(&owner_id_str)
		.map_err(|e| DbError::Internal(format!("Invalid owner_id UUID: {e}")))?;

	let expires_at = expires_at_str
		.map(|s| parse_timestamp("expires_at", &s))
		.transpose()?;
	let created_at = parse_timestamp("created_at", &created_at_str)?;

	Ok(HmacKeyRow {
		id,
		owner_id,
		secret,
		salt,
		expires_at,
		created_at,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use chrono::Duration;
	use proptest::prelude::*;

	async fn make_repo() -> HmacKeyRepository {
		HmacKeyRepository::new(create_test_pool().await)
	}

	fn row(owner_id: Uuid, salt: &str, expires_at: Option<DateTime<Utc>>) -> HmacKeyRow {
		HmacKeyRow {
			id: Uuid::new_v4(),
			owner_id,
			secret: "Y2lwaGVydGV4dA==".to_string(),
			salt: salt.to_string(),
			expires_at,
			created_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn test_insert_and_get_key() {
		let repo = make_repo().await;
		let owner = Uuid::new_v4();
		let expires = Utc::now() + Duration::hours(4);
		let key = row(owner, "c2FsdDE=", Some(expires));

		repo.insert_key(&key).await.unwrap();

		let fetched = repo.get_key(&key.id).await.unwrap().unwrap();
		assert_eq!(fetched.id, key.id);
		assert_eq!(fetched.owner_id, owner);
		assert_eq!(fetched.secret, key.secret);
		assert_eq!(fetched.salt, "c2FsdDE=");
		assert_eq!(
			fetched.expires_at.unwrap().timestamp_micros(),
			expires.timestamp_micros()
		);
	}

	#[tokio::test]
	async fn test_get_key_not_found() {
		let repo = make_repo().await;
		assert!(repo.get_key(&Uuid::new_v4()).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_key_without_expiry() {
		let repo = make_repo().await;
		let key = row(Uuid::new_v4(), "c2FsdDI=", None);
		repo.insert_key(&key).await.unwrap();
		let fetched = repo.get_key(&key.id).await.unwrap().unwrap();
		assert!(fetched.expires_at.is_none());
	}

	#[tokio::test]
	async fn test_count_and_list_for_owner() {
		let repo = make_repo().await;
		let owner = Uuid::new_v4();
		let other = Uuid::new_v4();

		for i in 0..3 {
			repo.insert_key(&row(owner, &format!("owner-salt-{i}"), None))
				.await
				.unwrap();
		}
		repo.insert_key(&row(other, "other-salt", None)).await.unwrap();

		assert_eq!(repo.count_keys_for_owner(&owner).await.unwrap(), 3);
		assert_eq!(repo.count_keys_for_owner(&other).await.unwrap(), 1);
		assert_eq!(repo.count_keys_for_owner(&Uuid::new_v4()).await.unwrap(), 0);

		let keys = repo.list_keys_for_owner(&owner).await.unwrap();
		assert_eq!(keys.len(), 3);
		assert!(keys.iter().all(|k| k.owner_id == owner));
		assert!(keys.windows(2).all(|w| w[0].created_at >= w[1].created_at));
	}

	#[tokio::test]
	async fn test_duplicate_salt_rejected() {
		let repo = make_repo().await;
		let owner = Uuid::new_v4();
		repo.insert_key(&row(owner, "same-salt", None)).await.unwrap();
		let result = repo.insert_key(&row(owner, "same-salt", None)).await;
		assert!(matches!(result, Err(DbError::Sqlx(_))));
	}

	#[tokio::test]
	async fn test_delete_key() {
		let repo = make_repo().await;
		let key = row(Uuid::new_v4(), "c2FsdDM=", None);
		repo.insert_key(&key).await.unwrap();

		assert!(repo.delete_key(&key.id).await.unwrap());
		assert!(!repo.delete_key(&key.id).await.unwrap());
		assert!(repo.get_key(&key.id).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_delete_expired_keys() {
		let repo = make_repo().await;
		let owner = Uuid::new_v4();
		let now = Utc::now();

		let expired = row(owner, "expired", Some(now - Duration::minutes(1)));
		let live = row(owner, "live", Some(now + Duration::minutes(1)));
		let forever = row(owner, "forever", None);
		for key in [&expired, &live, &forever] {
			repo.insert_key(key).await.unwrap();
		}

		assert_eq!(repo.delete_expired_keys(now).await.unwrap(), 1);
		assert!(repo.get_key(&expired.id).await.unwrap().is_none());
		assert!(repo.get_key(&live.id).await.unwrap().is_some());
		assert!(repo.get_key(&forever.id).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn test_insert_rejects_expiry_past_year_9999() {
		let repo = make_repo().await;
		let far = DateTime::<Utc>::from_timestamp(253_402_300_800, 0).unwrap();
		let key = row(Uuid::new_v4(), "c2FsdC1mYXI=", Some(far));

		let err = repo.insert_key(&key).await.unwrap_err();
		assert!(matches!(err, DbError::Internal(msg) if msg.starts_with("expires_at out of range")));
		assert!(repo.get_key(&key.id).await.unwrap().is_none());
	}

	proptest! {
		#[test]
		fn timestamps_format_with_fixed_width(secs in 0i64..4_000_000_000, micros in 0u32..1_000_000) {
			let ts = DateTime::<Utc>::from_timestamp(secs, micros * 1000).unwrap();
			let formatted = format_timestamp(&ts);
			prop_assert_eq!(formatted.len(), 27);
			prop_assert!(formatted.ends_with('Z'));
		}

		#[test]
		fn timestamp_text_order_matches_time_order(a in 0i64..4_000_000_000, b in 0i64..4_000_000_000) {
			let ta = DateTime::<Utc>::from_timestamp(a, 0).unwrap();
			let tb = DateTime::<Utc>::from_timestamp(b, 0).unwrap();
			prop_assert_eq!(format_timestamp(&ta).cmp(&format_timestamp(&tb)), ta.cmp(&tb));
		}
	}
}
