// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Envelope encryption for HMAC secrets.
//!
//! Each secret is sealed as follows:
//!
//! 1. Draw a 24-byte random salt.
//! 2. Derive the record key: `PBKDF2-HMAC-SHA256(master, salt, 1000)`.
//! 3. Draw 32 random secret bytes.
//! 4. Encrypt them under the record key, using the trailing 16 bytes of the
//!    salt as IV.
//!
//! Only the ciphertext and the salt are stored. Opening a record re-derives the
//! key from the salt, so the salt must never be reused across records.

use rand::{rngs::OsRng, RngCore};
use sigil_common_secret::SecretBytes;
use tracing::{instrument, trace};
use zeroize::Zeroizing;

use crate::cache::DecryptCache;
use crate::cipher::{self, IV_SIZE, KEY_SIZE};
use crate::error::HmacResult;
use crate::kdf::{derive_key, MasterSecret};

/// Size of the per-record salt in bytes.
pub const SALT_SIZE: usize = 24;

/// Size of a generated HMAC secret in bytes.
pub const SECRET_SIZE: usize = 32;

/// Output of [`EnvelopeManager::create`].
///
/// The caller persists `encrypted_secret` and `salt`, hands `plaintext` to the
/// key owner exactly once and drops `derived_key`.
pub struct SealedSecret {
	pub plaintext: SecretBytes,
	pub encrypted_secret: Vec<u8>,
	pub derived_key: Zeroizing<[u8; KEY_SIZE]>,
	pub salt: [u8; SALT_SIZE],
}

impl std::fmt::Debug for SealedSecret {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SealedSecret")
			.field("plaintext", &self.plaintext)
			.field("encrypted_len", &self.encrypted_secret.len())
			.field("derived_key", &"[REDACTED]")
			.finish()
	}
}

/// The IV is the trailing 16 bytes of the salt.
pub fn iv_from_salt(salt: &[u8; SALT_SIZE]) -> &[u8] {
	&salt[SALT_SIZE - IV_SIZE..]
}

/// Seals new HMAC secrets and opens stored ones.
#[derive(Debug)]
pub struct EnvelopeManager {
	master: MasterSecret,
	cache: DecryptCache,
}

impl EnvelopeManager {
	pub fn new(master: MasterSecret, cache_capacity: usize) -> Self {
		Self {
			master,
			cache: DecryptCache::new(cache_capacity),
		}
	}

	/// Generate and seal a fresh secret.
	#[instrument(skip(self))]
	pub fn create(&self) -> HmacResult<SealedSecret> {
		let mut salt = [0u8; SALT_SIZE];
		OsRng.fill_bytes(&mut salt);
		let derived_key = derive_key(&self.master, &salt);

		let mut plaintext = Zeroizing::new(vec![0u8; SECRET_SIZE]);
		OsRng.fill_bytes(plaintext.as_mut_slice());

		let encrypted_secret = cipher::encrypt(&plaintext, derived_key.as_slice(), iv_from_salt(&salt))?;
		trace!(encrypted_len = encrypted_secret.len(), "sealed new HMAC secret");

		Ok(SealedSecret {
			plaintext: SecretBytes::new(plaintext.to_vec()),
			encrypted_secret,
			derived_key,
			salt,
		})
	}

	/// Decrypt a stored secret.
	///
	/// Idempotent. Results are served from the bounded decrypt cache when present.
	#[instrument(skip_all)]
	pub fn open(&self, encrypted_secret: &[u8], salt: &[u8; SALT_SIZE]) -> HmacResult<SecretBytes> {
		if let Some(secret) = self.cache.get(encrypted_secret, salt) {
			trace!("decrypt cache hit");
			return Ok(secret);
		}

		let key = derive_key(&self.master, salt);
		let plaintext = SecretBytes::new(cipher::decrypt(
			encrypted_secret,
			key.as_slice(),
			iv_from_salt(salt),
		)?);

		self.cache.insert(encrypted_secret, salt, plaintext.clone());
		Ok(plaintext)
	}

	pub fn cache(&self) -> &DecryptCache {
		&self.cache
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cipher::TAG_SIZE;
	use crate::error::HmacError;
	use proptest::prelude::*;
	use sigil_common_secret::SecretString;

	fn manager(master: &str, capacity: usize) -> EnvelopeManager {
		let master = MasterSecret::new(SecretString::new(master.to_string())).unwrap();
		EnvelopeManager::new(master, capacity)
	}

	#[test]
	fn create_produces_expected_sizes() {
		let sealed = manager("master", 10).create().unwrap();
		assert_eq!(sealed.plaintext.expose().len(), SECRET_SIZE);
		assert_eq!(sealed.encrypted_secret.len(), SECRET_SIZE + TAG_SIZE);
		assert_eq!(sealed.salt.len(), SALT_SIZE);
	}

	#[test]
	fn create_then_open_roundtrips() {
		let envelope = manager("master", 10);
		let sealed = envelope.create().unwrap();
		let opened = envelope.open(&sealed.encrypted_secret, &sealed.salt).unwrap();
		assert_eq!(opened, sealed.plaintext);
	}

	#[test]
	fn derived_key_matches_rederivation() {
		let master = MasterSecret::new(SecretString::new("master".to_string())).unwrap();
		let envelope = EnvelopeManager::new(master.clone(), 0);
		let sealed = envelope.create().unwrap();
		assert_eq!(
			sealed.derived_key.as_slice(),
			derive_key(&master, &sealed.salt).as_slice()
		);
	}

	#[test]
	fn open_works_without_cache() {
		let envelope = manager("master", 0);
		let sealed = envelope.create().unwrap();
		for _ in 0..3 {
			let opened = envelope.open(&sealed.encrypted_secret, &sealed.salt).unwrap();
			assert_eq!(opened, sealed.plaintext);
		}
		assert!(envelope.cache().is_empty());
	}

	#[test]
	fn open_populates_cache() {
		let envelope = manager("master", 10);
		let sealed = envelope.create().unwrap();
		envelope.open(&sealed.encrypted_secret, &sealed.salt).unwrap();
		envelope.open(&sealed.encrypted_secret, &sealed.salt).unwrap();
		assert_eq!(envelope.cache().len(), 1);
	}

	#[test]
	fn different_master_secret_cannot_open() {
		let sealed = manager("master-a", 0).create().unwrap();
		let result = manager("master-b", 0).open(&sealed.encrypted_secret, &sealed.salt);
		assert!(matches!(result, Err(HmacError::Decryption(_))));
	}

	#[test]
	fn mismatched_salt_cannot_open() {
		let envelope = manager("master", 0);
		let a = envelope.create().unwrap();
		let b = envelope.create().unwrap();
		assert!(envelope.open(&a.encrypted_secret, &b.salt).is_err());
	}

	#[test]
	fn salts_and_secrets_are_unique() {
		let envelope = manager("master", 0);
		let a = envelope.create().unwrap();
		let b = envelope.create().unwrap();
		assert_ne!(a.salt, b.salt);
		assert_ne!(a.plaintext, b.plaintext);
	}

	#[test]
	fn iv_is_salt_suffix() {
		let salt: [u8; SALT_SIZE] = std::array::from_fn(|i| i as u8);
		assert_eq!(iv_from_salt(&salt), &salt[8..]);
	}

	#[test]
	fn sealed_secret_debug_hides_key_material() {
		let sealed = manager("master", 0).create().unwrap();
		let debug = format!("{sealed:?}");
		assert!(debug.contains("[REDACTED]"));
		assert!(debug.contains("encrypted_len: 48"));
	}

	#[test]
	fn cache_stays_bounded_across_many_records() {
		let envelope = manager("master", 5);
		for _ in 0..12 {
			let sealed = envelope.create().unwrap();
			envelope.open(&sealed.encrypted_secret, &sealed.salt).unwrap();
		}
		assert_eq!(envelope.cache().len(), 5);
	}

	proptest! {
		#![proptest_config(ProptestConfig::with_cases(32))]

		#[test]
		fn prop_roundtrip_under_any_master(master in "[ -~]{1,64}") {
			let envelope = manager(&master, 0);
			let sealed = envelope.create().unwrap();
			let opened = envelope.open(&sealed.encrypted_secret, &sealed.salt).unwrap();
			prop_assert_eq!(opened.expose(), sealed.plaintext.expose());
		}
	}
}
