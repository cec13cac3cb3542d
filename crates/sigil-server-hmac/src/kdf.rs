// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Password-based derivation of per-record encryption keys.
//!
//! Every stored secret is encrypted under `PBKDF2-HMAC-SHA256(master, salt)`.
//! Derivation is deterministic, so the key is never stored: decryption
//! re-derives it from the record's salt and the process-wide master secret.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use sigil_common_secret::SecretString;
use zeroize::Zeroizing;

use crate::cipher::KEY_SIZE;
use crate::error::{HmacError, HmacResult};

/// PBKDF2 iteration count used for every derived key.
pub const PBKDF2_ITERATIONS: u32 = 1000;

/// The process-wide master secret all record keys are derived from.
///
/// Guaranteed non-empty. Constructed once at startup and shared read-only.
#[derive(Clone, Debug)]
pub struct MasterSecret(SecretString);

impl MasterSecret {
	/// Wrap a configured master secret, rejecting an empty value.
	pub fn new(secret: SecretString) -> HmacResult<Self> {
		if secret.expose().is_empty() {
			return Err(HmacError::InvalidConfig(
				"master secret must not be empty".to_string(),
			));
		}
		Ok(Self(secret))
	}

	fn as_bytes(&self) -> &[u8] {
		self.0.expose().as_bytes()
	}
}

/// Derive a 32-byte key from the master secret and a salt.
pub fn derive_key(master: &MasterSecret, salt: &[u8]) -> Zeroizing<[u8; KEY_SIZE]> {
	derive_key_with_iterations(master, salt, PBKDF2_ITERATIONS)
}

/// Derive a 32-byte key with an explicit iteration count.
pub fn derive_key_with_iterations(
	master: &MasterSecret,
	salt: &[u8],
	iterations: u32,
) -> Zeroizing<[u8; KEY_SIZE]> {
	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	pbkdf2_hmac::<Sha256>(master.as_bytes(), salt, iterations, key.as_mut_slice());
	key
}
