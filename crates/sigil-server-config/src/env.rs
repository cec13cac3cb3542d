// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loading secrets from the environment.
//!
//! Supports the `*_FILE` convention used by Docker and Kubernetes secrets:
//! `SIGIL_SERVER_MASTER_SECRET_FILE=/run/secrets/master` takes precedence over
//! `SIGIL_SERVER_MASTER_SECRET`.

use std::path::PathBuf;
use std::{env, fs};

use sigil_common_secret::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Load a secret using the `VAR` / `VAR_FILE` convention.
///
/// # Precedence
///
/// 1. If `{var}_FILE` is set, read the secret from that file path
/// 2. Otherwise, if `{var}` is set, use its value directly
/// 3. Otherwise, return `Ok(None)`
///
/// A single trailing newline is stripped from file contents.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|e| SecretEnvError::Io {
			path: path.clone(),
			source: e,
		})?;

		let secret = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(secret)));
	}

	if let Ok(value) = env::var(var) {
		return Ok(Some(SecretString::new(value)));
	}

	Ok(None)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	// Each test uses its own variable names; the process environment is shared.

	#[test]
	fn missing_returns_none() {
		assert!(load_secret_env("SIGIL_TEST_ENV_MISSING")
			.unwrap()
			.is_none());
	}

	#[test]
	fn reads_direct_value() {
		env::set_var("SIGIL_TEST_ENV_DIRECT", "direct-value");
		let secret = load_secret_env("SIGIL_TEST_ENV_DIRECT").unwrap().unwrap();
		assert_eq!(secret.expose(), "direct-value");
		env::remove_var("SIGIL_TEST_ENV_DIRECT");
	}

	#[test]
	fn file_takes_precedence_and_strips_one_newline() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "from-file\n\n").unwrap();

		env::set_var("SIGIL_TEST_ENV_BOTH", "from-env");
		env::set_var("SIGIL_TEST_ENV_BOTH_FILE", file.path());
		let secret = load_secret_env("SIGIL_TEST_ENV_BOTH").unwrap().unwrap();
		assert_eq!(secret.expose(), "from-file\n");
		env::remove_var("SIGIL_TEST_ENV_BOTH");
		env::remove_var("SIGIL_TEST_ENV_BOTH_FILE");
	}

	#[test]
	fn empty_file_path_is_an_error() {
		env::set_var("SIGIL_TEST_ENV_EMPTY_FILE", "");
		let result = load_secret_env("SIGIL_TEST_ENV_EMPTY");
		assert!(matches!(result, Err(SecretEnvError::EmptyPath { .. })));
		env::remove_var("SIGIL_TEST_ENV_EMPTY_FILE");
	}

	#[test]
	fn unreadable_file_is_an_error() {
		env::set_var("SIGIL_TEST_ENV_NOFILE_FILE", "/nonexistent/sigil/secret");
		let result = load_secret_env("SIGIL_TEST_ENV_NOFILE");
		assert!(matches!(result, Err(SecretEnvError::Io { .. })));
		env::remove_var("SIGIL_TEST_ENV_NOFILE_FILE");
	}
}
