// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{DatabaseConfigLayer, HmacKeysConfigLayer, LogFormat, LoggingConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/sigil/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: SIGIL_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			hmac: Some(load_hmac_from_env()?),
			database: Some(load_database_from_env()?),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_hmac_from_env() -> Result<HmacKeysConfigLayer, ConfigError> {
	Ok(HmacKeysConfigLayer {
		max_keys_per_user: env_parse("SIGIL_SERVER_HMAC_MAX_KEYS_PER_USER", "u32")?,
		expires_in: env_var("SIGIL_SERVER_HMAC_EXPIRES_IN"),
		decrypt_cache_capacity: env_parse("SIGIL_SERVER_HMAC_DECRYPT_CACHE_CAPACITY", "usize")?,
		key_cache_enabled: env_bool("SIGIL_SERVER_HMAC_KEY_CACHE"),
		key_cache_ttl_secs: env_parse("SIGIL_SERVER_HMAC_KEY_CACHE_TTL_SECS", "u64")?,
	})
}

fn load_database_from_env() -> Result<DatabaseConfigLayer, ConfigError> {
	Ok(DatabaseConfigLayer {
		url: env_var("SIGIL_SERVER_DATABASE_URL"),
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("SIGIL_SERVER_LOG_FORMAT") {
		Some(v) => Some(LogFormat::from_str(&v).map_err(|message| ConfigError::InvalidValue {
			key: "SIGIL_SERVER_LOG_FORMAT".to_string(),
			message,
		})?),
		None => None,
	};
	Ok(LoggingConfigLayer {
		level: env_var("SIGIL_SERVER_LOG_LEVEL"),
		format,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_order() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn test_missing_toml_file_is_empty_layer() {
		let layer = TomlSource::new("/nonexistent/sigil/server.toml")
			.load()
			.unwrap();
		assert!(layer.hmac.is_none());
		assert!(layer.database.is_none());
	}

	#[test]
	fn test_toml_file_is_parsed() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			r#"
[hmac]
max_keys_per_user = 5
expires_in = "4h"

[database]
url = "sqlite:/tmp/sigil-test.db"

[logging]
format = "json"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(layer.hmac.as_ref().unwrap().max_keys_per_user, Some(5));
		assert_eq!(
			layer.database.unwrap().url.as_deref(),
			Some("sqlite:/tmp/sigil-test.db")
		);
		assert_eq!(layer.logging.unwrap().format, Some(LogFormat::Json));
	}

	#[test]
	fn test_invalid_toml_is_an_error() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[hmac\nmax_keys_per_user = ").unwrap();
		let result = TomlSource::new(file.path()).load();
		assert!(matches!(result, Err(ConfigError::TomlParse { .. })));
	}

	#[test]
	fn test_env_parse_rejects_garbage() {
		std::env::set_var("SIGIL_TEST_SOURCES_U32", "ten");
		let result: Result<Option<u32>, _> = env_parse("SIGIL_TEST_SOURCES_U32", "u32");
		assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
		std::env::remove_var("SIGIL_TEST_SOURCES_U32");
	}

	#[test]
	fn test_env_bool_accepts_true_and_one() {
		std::env::set_var("SIGIL_TEST_SOURCES_BOOL_A", "TRUE");
		std::env::set_var("SIGIL_TEST_SOURCES_BOOL_B", "1");
		std::env::set_var("SIGIL_TEST_SOURCES_BOOL_C", "yes");
		assert_eq!(env_bool("SIGIL_TEST_SOURCES_BOOL_A"), Some(true));
		assert_eq!(env_bool("SIGIL_TEST_SOURCES_BOOL_B"), Some(true));
		assert_eq!(env_bool("SIGIL_TEST_SOURCES_BOOL_C"), Some(false));
		assert_eq!(env_bool("SIGIL_TEST_SOURCES_BOOL_UNSET"), None);
	}
}
