// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for HMAC key management and signature verification.

use sigil_server_db::DbError;
use thiserror::Error;

use crate::types::KeyId;

/// Result type alias for HMAC operations.
pub type HmacResult<T> = Result<T, HmacError>;

/// Errors that can occur while issuing, storing or verifying HMAC keys.
#[derive(Debug, Error)]
pub enum HmacError {
	// =========================================================================
	// Client-facing validation errors
	// =========================================================================
	#[error("Maximum API secrets limit reached for user (max {max})")]
	QuotaExceeded { max: u32 },

	#[error("Unsupported HMAC function {0}")]
	UnsupportedDigest(String),

	#[error("invalid encoding: {0}")]
	InvalidEncoding(String),

	// =========================================================================
	// Configuration errors
	// =========================================================================
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	// =========================================================================
	// Cryptographic errors
	// =========================================================================
	#[error("invalid key material: {what} must be {expected} bytes, got {actual}")]
	InvalidKeyMaterial {
		what: &'static str,
		expected: usize,
		actual: usize,
	},

	#[error("decryption failed: {0}")]
	Decryption(String),

	// =========================================================================
	// Key access errors
	// =========================================================================
	#[error("HMAC key not found: {0}")]
	NotFound(KeyId),

	#[error("HMAC key has expired: {0}")]
	KeyExpired(KeyId),

	#[error("signature mismatch")]
	SignatureMismatch,

	// =========================================================================
	// Infrastructure errors
	// =========================================================================
	#[error("database error: {0}")]
	Database(#[from] DbError),

	#[error("internal error: {0}")]
	Internal(String),
}

impl HmacError {
	/// Returns true if this error should be logged at error level.
	pub fn is_internal(&self) -> bool {
		matches!(
			self,
			HmacError::InvalidConfig(_)
				| HmacError::InvalidKeyMaterial { .. }
				| HmacError::Decryption(_)
				| HmacError::Database(_)
				| HmacError::Internal(_)
		)
	}

	/// Returns the HTTP status code the request layer should answer with.
	pub fn status_code(&self) -> u16 {
		match self {
			HmacError::QuotaExceeded { .. }
			| HmacError::UnsupportedDigest(_)
			| HmacError::InvalidEncoding(_) => 400,

			HmacError::KeyExpired(_) | HmacError::SignatureMismatch => 401,

			HmacError::NotFound(_) => 404,

			HmacError::InvalidConfig(_)
			| HmacError::InvalidKeyMaterial { .. }
			| HmacError::Decryption(_)
			| HmacError::Database(_)
			| HmacError::Internal(_) => 500,
		}
	}
}
