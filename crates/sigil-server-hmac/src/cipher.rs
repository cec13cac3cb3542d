// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Symmetric encryption for stored HMAC secrets.
//!
//! Uses AES-256-GCM with a 128-bit IV. The IV is taken from the record salt, so
//! every record is encrypted under its own derived key and IV pair. GCM
//! authenticates the ciphertext: a flipped bit, a wrong master secret or a
//! mismatched salt all fail with [`HmacError::Decryption`] instead of returning
//! garbage.

use aes_gcm::{
	aead::{consts::U16, Aead, KeyInit},
	aes::Aes256,
	AesGcm, Key, Nonce,
};

use crate::error::{HmacError, HmacResult};

/// Size of encryption keys in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of the initialization vector in bytes.
pub const IV_SIZE: usize = 16;

/// Size of the GCM authentication tag appended to every ciphertext.
pub const TAG_SIZE: usize = 16;

/// AES-256-GCM parameterized for a 16-byte IV.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

fn check_key_material(key: &[u8], iv: &[u8]) -> HmacResult<()> {
	if key.len() != KEY_SIZE {
		return Err(HmacError::InvalidKeyMaterial {
			what: "key",
			expected: KEY_SIZE,
			actual: key.len(),
		});
	}
	if iv.len() != IV_SIZE {
		return Err(HmacError::InvalidKeyMaterial {
			what: "iv",
			expected: IV_SIZE,
			actual: iv.len(),
		});
	}
	Ok(())
}

/// Encrypt `plaintext` under a 32-byte key and 16-byte IV.
///
/// The output is `plaintext.len() + TAG_SIZE` bytes long.
pub fn encrypt(plaintext: &[u8], key: &[u8], iv: &[u8]) -> HmacResult<Vec<u8>> {
	check_key_material(key, iv)?;

	let cipher = Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key));
	cipher
		.encrypt(Nonce::<U16>::from_slice(iv), plaintext)
		.map_err(|e| HmacError::Internal(format!("secret encryption failed: {e}")))
}

/// Decrypt a ciphertext produced by [`encrypt`] with the same key and IV.
pub fn decrypt(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> HmacResult<Vec<u8>> {
	check_key_material(key, iv)?;

	let cipher = Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key));
	cipher
		.decrypt(Nonce::<U16>::from_slice(iv), ciphertext)
		.map_err(|e| HmacError::Decryption(format!("secret decryption failed: {e}")))
}
