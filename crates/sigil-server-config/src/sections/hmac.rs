// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HMAC key configuration section.
//!
//! The master secret never comes from TOML; it is supplied separately from
//! `SIGIL_SERVER_MASTER_SECRET` or `SIGIL_SERVER_MASTER_SECRET_FILE`.

use std::time::Duration;

use serde::Deserialize;
use sigil_common_secret::SecretString;
use sigil_server_hmac::{
	cache::DEFAULT_CAPACITY, key_cache::DEFAULT_TTL, ExpiryDuration, HmacConfig, HmacError,
	DEFAULT_MAX_KEYS_PER_USER,
};

use crate::error::ConfigError;

/// HMAC key configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct HmacKeysConfig {
	/// Settings handed to the key service.
	pub core: HmacConfig,
	pub key_cache_enabled: bool,
	pub key_cache_ttl: Duration,
}

/// HMAC key configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct HmacKeysConfigLayer {
	#[serde(default)]
	pub max_keys_per_user: Option<u32>,
	#[serde(default)]
	pub expires_in: Option<String>,
	#[serde(default)]
	pub decrypt_cache_capacity: Option<usize>,
	#[serde(default)]
	pub key_cache_enabled: Option<bool>,
	#[serde(default)]
	pub key_cache_ttl_secs: Option<u64>,
}

impl HmacKeysConfigLayer {
	pub fn merge(&mut self, other: HmacKeysConfigLayer) {
		if other.max_keys_per_user.is_some() {
			self.max_keys_per_user = other.max_keys_per_user;
		}
		if other.expires_in.is_some() {
			self.expires_in = other.expires_in;
		}
		if other.decrypt_cache_capacity.is_some() {
			self.decrypt_cache_capacity = other.decrypt_cache_capacity;
		}
		if other.key_cache_enabled.is_some() {
			self.key_cache_enabled = other.key_cache_enabled;
		}
		if other.key_cache_ttl_secs.is_some() {
			self.key_cache_ttl_secs = other.key_cache_ttl_secs;
		}
	}

	/// Resolve the section, validating the master secret, quota and expiry.
	pub fn finalize(
		self,
		master_secret: Option<SecretString>,
	) -> Result<HmacKeysConfig, ConfigError> {
		let master_secret = master_secret.ok_or_else(|| {
			ConfigError::Validation(
				"SIGIL_SERVER_MASTER_SECRET or SIGIL_SERVER_MASTER_SECRET_FILE must be set"
					.to_string(),
			)
		})?;

		let expires_in = self
			.expires_in
			.as_deref()
			.map(ExpiryDuration::parse)
			.transpose()
			.map_err(|e| invalid("hmac.expires_in", e))?;

		let core = HmacConfig::new(master_secret)
			.map_err(|e| ConfigError::Validation(e.to_string()))?
			.with_max_keys_per_user(
				self.max_keys_per_user
					.unwrap_or(DEFAULT_MAX_KEYS_PER_USER),
			)
			.map_err(|e| invalid("hmac.max_keys_per_user", e))?
			.with_expires_in(expires_in)
			.with_decrypt_cache_capacity(self.decrypt_cache_capacity.unwrap_or(DEFAULT_CAPACITY));

		Ok(HmacKeysConfig {
			core,
			key_cache_enabled: self.key_cache_enabled.unwrap_or(false),
			key_cache_ttl: self
				.key_cache_ttl_secs
				.map(Duration::from_secs)
				.unwrap_or(DEFAULT_TTL),
		})
	}
}

fn invalid(key: &str, err: HmacError) -> ConfigError {
	let message = match err {
		HmacError::InvalidConfig(message) => message,
		other => other.to_string(),
	};
	ConfigError::InvalidValue {
		key: key.to_string(),
		message,
	}
}
