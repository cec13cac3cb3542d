// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for HMAC key management.
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs for keys and their owners
//! - **Key records**: The persisted shape of an issued key (never holds plaintext)
//! - **Issued keys**: The one-time response handed back to a key owner

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sigil_common_secret::SecretString;
use std::fmt;
use uuid::Uuid;

use crate::envelope::SALT_SIZE;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl std::str::FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(KeyId, "Unique identifier for an issued HMAC key.");
define_id_type!(UserId, "Unique identifier for the user owning HMAC keys.");

// =============================================================================
// Key records
// =============================================================================

/// A persisted HMAC key.
///
/// `encrypted_secret` and `salt` always travel together: the salt is the only
/// input besides the master secret needed to re-derive the encryption key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
	pub id: KeyId,
	pub owner: UserId,
	pub encrypted_secret: Vec<u8>,
	pub salt: [u8; SALT_SIZE],
	pub expires_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
}

impl KeyRecord {
	/// Whether the key is past its expiry at `now`. Keys without expiry never expire.
	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		self.expires_at.is_some_and(|expires_at| expires_at <= now)
	}
}

/// A key record that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewKeyRecord {
	pub owner: UserId,
	pub encrypted_secret: Vec<u8>,
	pub salt: [u8; SALT_SIZE],
	pub expires_at: Option<DateTime<Utc>>,
}

/// The result of issuing a key: the only time the plaintext secret leaves the server.
#[derive(Debug)]
pub struct IssuedKey {
	pub id: KeyId,
	/// Standard base64 encoding of the 32 raw secret bytes.
	pub secret: SecretString,
	pub expires_at: Option<DateTime<Utc>>,
}
