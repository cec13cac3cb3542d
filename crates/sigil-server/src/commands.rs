// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Admin subcommand implementations.
//!
//! Each command returns the text to print so the binary stays a thin shell.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use sigil_server_hmac::{
	signature, DigestAlgorithm, ExpiryDuration, HmacError, HmacKeyService, HmacResult, KeyId,
	KeyStore, UserId,
};

pub async fn issue<S: KeyStore>(
	service: &HmacKeyService<S>,
	user: UserId,
	expires_in: Option<ExpiryDuration>,
) -> HmacResult<String> {
	let issued = match expires_in {
		Some(expiry) => {
			service
				.create_for_user_with_expiry(user, Some(expiry))
				.await?
		}
		None => service.create_for_user(user).await?,
	};

	let expires = issued
		.expires_at
		.map(|t| t.to_rfc3339())
		.unwrap_or_else(|| "never".to_string());
	Ok(format!(
		"key_id:     {}\nsecret:     {}\nexpires_at: {}\n\nStore the secret now; it cannot be shown again.",
		issued.id,
		issued.secret.expose(),
		expires
	))
}

pub async fn list<S: KeyStore>(service: &HmacKeyService<S>, user: UserId) -> HmacResult<String> {
	let records = service.list_for_owner(&user).await?;
	if records.is_empty() {
		return Ok(format!("no keys for user {user}"));
	}

	let now = Utc::now();
	let lines: Vec<String> = records
		.iter()
		.map(|record| {
			let status = if record.is_expired_at(now) {
				"expired"
			} else {
				"active"
			};
			let expires = record
				.expires_at
				.map(|t| t.to_rfc3339())
				.unwrap_or_else(|| "never".to_string());
			format!(
				"{}  {}  created {}  expires {}",
				record.id,
				status,
				record.created_at.to_rfc3339(),
				expires
			)
		})
		.collect();
	Ok(lines.join("\n"))
}

pub async fn revoke<S: KeyStore>(service: &HmacKeyService<S>, key: KeyId) -> HmacResult<String> {
	service.revoke(&key).await?;
	Ok(format!("revoked {key}"))
}

pub async fn purge_expired<S: KeyStore>(service: &HmacKeyService<S>) -> HmacResult<String> {
	let purged = service.purge_expired().await?;
	Ok(format!("purged {purged} expired key(s)"))
}

pub async fn verify<S: KeyStore>(
	service: &HmacKeyService<S>,
	key: KeyId,
	digest: DigestAlgorithm,
	message: &str,
	signature: &str,
) -> HmacResult<String> {
	let record = service
		.verify_signature(&key, digest, message, signature)
		.await?;
	Ok(format!("valid signature from key {} (owner {})", record.id, record.owner))
}

/// Sign `message` with a base64 secret as handed out by `issue`.
pub fn sign(digest: DigestAlgorithm, secret_b64: &str, message: &str) -> HmacResult<String> {
	let secret = BASE64
		.decode(secret_b64.trim())
		.map_err(|e| HmacError::InvalidEncoding(format!("secret: {e}")))?;
	signature::sign_with(digest, message, &secret)
}

pub fn hash(digest: DigestAlgorithm, content: &str) -> String {
	signature::hash_with(digest, content.as_bytes())
}
