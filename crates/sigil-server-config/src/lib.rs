// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the Sigil server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`SIGIL_SERVER_*`)
//! - `*_FILE` loading for the master secret
//!
//! # Usage
//!
//! ```ignore
//! use sigil_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Database at {}", config.database.url);
//! ```

pub mod env;
pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use env::{load_secret_env, SecretEnvError};
pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use sigil_common_secret::SecretString;
use tracing::{debug, info};

/// Environment variable holding the master secret (or `_FILE` pointing at it).
pub const MASTER_SECRET_ENV: &str = "SIGIL_SERVER_MASTER_SECRET";

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub hmac: HmacKeysConfig,
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`SIGIL_SERVER_*`)
/// 2. Config file (`/etc/sigil/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(DefaultsSource), Box::new(EnvSource)];
	load_from_sources(sources)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	let master_secret =
		load_secret_env(MASTER_SECRET_ENV).map_err(|e| ConfigError::Secret(e.to_string()))?;
	finalize(merged, master_secret)
}

/// Finalize a merged layer into resolved config.
pub fn finalize(
	layer: ServerConfigLayer,
	master_secret: Option<SecretString>,
) -> Result<ServerConfig, ConfigError> {
	let hmac = layer.hmac.unwrap_or_default().finalize(master_secret)?;
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		database = %database.url,
		max_keys_per_user = hmac.core.max_keys_per_user(),
		expires_in = ?hmac.core.expires_in().map(|e| e.to_string()),
		decrypt_cache_capacity = hmac.core.decrypt_cache_capacity(),
		key_cache_enabled = hmac.key_cache_enabled,
		log_format = %logging.format,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		hmac,
		database,
		logging,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn master() -> Option<SecretString> {
		Some(SecretString::new("master".to_string()))
	}

	#[test]
	fn test_finalize_defaults() {
		let config = finalize(ServerConfigLayer::default(), master()).unwrap();
		assert_eq!(config.database.url, "sqlite:./sigil.db");
		assert_eq!(config.logging.level, "info");
		assert_eq!(config.logging.format, LogFormat::Pretty);
		assert_eq!(config.hmac.core.max_keys_per_user(), 10);
	}

	#[test]
	fn test_finalize_requires_master_secret() {
		let result = finalize(ServerConfigLayer::default(), None);
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_debug_never_prints_master_secret() {
		let config = finalize(
			ServerConfigLayer::default(),
			Some(SecretString::new("hunter2-master".to_string())),
		)
		.unwrap();
		assert!(!format!("{config:?}").contains("hunter2-master"));
	}

	#[test]
	fn test_later_layer_wins() {
		let mut merged = ServerConfigLayer::default();
		merged.merge(
			toml::from_str(
				r#"
[hmac]
max_keys_per_user = 2
"#,
			)
			.unwrap(),
		);
		merged.merge(ServerConfigLayer {
			hmac: Some(HmacKeysConfigLayer {
				max_keys_per_user: Some(7),
				..Default::default()
			}),
			..Default::default()
		});
		let config = finalize(merged, master()).unwrap();
		assert_eq!(config.hmac.core.max_keys_per_user(), 7);
	}

	proptest! {
		#[test]
		fn prop_any_positive_quota_is_accepted(max in 1u32..=u32::MAX) {
			let layer = ServerConfigLayer {
				hmac: Some(HmacKeysConfigLayer {
					max_keys_per_user: Some(max),
					..Default::default()
				}),
				..Default::default()
			};
			let config = finalize(layer, master()).unwrap();
			prop_assert_eq!(config.hmac.core.max_keys_per_user(), max);
		}

		#[test]
		fn prop_malformed_expiry_fails_at_load(expiry in "[0-9]*[a-gi-lnt-z]") {
			let layer = ServerConfigLayer {
				hmac: Some(HmacKeysConfigLayer {
					expires_in: Some(expiry),
					..Default::default()
				}),
				..Default::default()
			};
			let is_invalid_value = matches!(
				finalize(layer, master()),
				Err(ConfigError::InvalidValue { .. })
			);
			prop_assert!(is_invalid_value);
		}
	}
}
