// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Immutable settings shared by every HMAC component.
//!
//! Built once at startup from the resolved server configuration and handed to
//! [`crate::HmacKeyService`]. Nothing in this crate reads the environment.

use sigil_common_secret::SecretString;

use crate::cache::DEFAULT_CAPACITY;
use crate::error::{HmacError, HmacResult};
use crate::expiry::ExpiryDuration;
use crate::kdf::MasterSecret;

/// Default maximum number of stored keys per user.
pub const DEFAULT_MAX_KEYS_PER_USER: u32 = 10;

#[derive(Clone)]
pub struct HmacConfig {
	master_secret: MasterSecret,
	max_keys_per_user: u32,
	expires_in: Option<ExpiryDuration>,
	decrypt_cache_capacity: usize,
}

impl HmacConfig {
	/// Create a configuration with default quota, no expiry and the default
	/// decrypt cache size.
	pub fn new(master_secret: SecretString) -> HmacResult<Self> {
		Ok(Self {
			master_secret: MasterSecret::new(master_secret)?,
			max_keys_per_user: DEFAULT_MAX_KEYS_PER_USER,
			expires_in: None,
			decrypt_cache_capacity: DEFAULT_CAPACITY,
		})
	}

	pub fn with_max_keys_per_user(mut self, max: u32) -> HmacResult<Self> {
		if max == 0 {
			return Err(HmacError::InvalidConfig(
				"max keys per user must be at least 1".to_string(),
			));
		}
		self.max_keys_per_user = max;
		Ok(self)
	}

	pub fn with_expires_in(mut self, expires_in: Option<ExpiryDuration>) -> Self {
		self.expires_in = expires_in;
		self
	}

	pub fn with_decrypt_cache_capacity(mut self, capacity: usize) -> Self {
		self.decrypt_cache_capacity = capacity;
		self
	}

	pub fn master_secret(&self) -> &MasterSecret {
		&self.master_secret
	}

	pub fn max_keys_per_user(&self) -> u32 {
		self.max_keys_per_user
	}

	pub fn expires_in(&self) -> Option<&ExpiryDuration> {
		self.expires_in.as_ref()
	}

	pub fn decrypt_cache_capacity(&self) -> usize {
		self.decrypt_cache_capacity
	}
}

impl std::fmt::Debug for HmacConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HmacConfig")
			.field("master_secret", &"[REDACTED]")
			.field("max_keys_per_user", &self.max_keys_per_user)
			.field("expires_in", &self.expires_in.map(|e| e.to_string()))
			.field("decrypt_cache_capacity", &self.decrypt_cache_capacity)
			.finish()
	}
}
