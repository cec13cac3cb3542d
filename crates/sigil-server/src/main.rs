// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sigil server binary: administers HMAC API keys and checks signatures.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sigil_server_config::{LogFormat, LoggingConfig, ServerConfig};
use sigil_server_hmac::{
	DigestAlgorithm, ExpiryDuration, HmacKeyService, InMemoryKeyCache, KeyId, SqliteKeyStore,
	UserId,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod version;

/// Sigil server - HMAC API key management.
#[derive(Parser, Debug)]
#[command(name = "sigil-server", about = "HMAC API key management", version)]
struct Args {
	/// TOML config file (defaults to /etc/sigil/server.toml)
	#[arg(long, short, env = "SIGIL_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Issue a new HMAC key for a user and print its secret once
	Issue {
		#[arg(long)]
		user: UserId,
		/// Override the configured expiry, e.g. 4h, 5m, 3600s
		#[arg(long)]
		expires_in: Option<ExpiryDuration>,
	},
	/// List a user's keys
	List {
		#[arg(long)]
		user: UserId,
	},
	/// Delete a key
	Revoke {
		#[arg(long)]
		key: KeyId,
	},
	/// Delete every expired key
	PurgeExpired,
	/// Sign a message with a base64 secret
	Sign {
		#[arg(long, default_value = "HMAC-SHA256")]
		digest: DigestAlgorithm,
		#[arg(long, env = "SIGIL_SIGNING_SECRET", hide_env_values = true)]
		secret: String,
		message: String,
	},
	/// Check a signature against a stored key
	Verify {
		#[arg(long)]
		key: KeyId,
		#[arg(long, default_value = "HMAC-SHA256")]
		digest: DigestAlgorithm,
		#[arg(long)]
		signature: String,
		message: String,
	},
	/// Base64 digest of some content
	Hash {
		#[arg(long, default_value = "HMAC-SHA256")]
		digest: DigestAlgorithm,
		content: String,
	},
	/// Show version and build information
	Version,
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);

	match logging.format {
		LogFormat::Json => registry
			.with(
				tracing_subscriber::fmt::layer()
					.json()
					.with_writer(std::io::stderr),
			)
			.init(),
		LogFormat::Pretty => registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init(),
	}
}

async fn build_service(config: &ServerConfig) -> anyhow::Result<HmacKeyService<SqliteKeyStore>> {
	let pool = sigil_server_db::create_pool(&config.database.url)
		.await
		.with_context(|| format!("opening database {}", config.database.url))?;
	sigil_server_db::run_migrations(&pool)
		.await
		.context("running migrations")?;

	let store = Arc::new(SqliteKeyStore::new(pool));
	let mut service = HmacKeyService::new(config.hmac.core.clone(), store);
	if config.hmac.key_cache_enabled {
		service = service.with_key_cache(Arc::new(InMemoryKeyCache::new(config.hmac.key_cache_ttl)));
	}
	Ok(service)
}

async fn run_with_service(config_path: Option<PathBuf>, command: Command) -> anyhow::Result<String> {
	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match config_path {
		Some(path) => sigil_server_config::load_config_with_file(path),
		None => sigil_server_config::load_config(),
	}
	.context("loading configuration")?;

	init_tracing(&config.logging);

	tracing::info!(
		database = %config.database.url,
		command = ?command,
		"starting sigil-server"
	);

	let service = build_service(&config).await?;

	let output = match command {
		Command::Issue { user, expires_in } => commands::issue(&service, user, expires_in).await?,
		Command::List { user } => commands::list(&service, user).await?,
		Command::Revoke { key } => commands::revoke(&service, key).await?,
		Command::PurgeExpired => commands::purge_expired(&service).await?,
		Command::Verify {
			key,
			digest,
			signature,
			message,
		} => commands::verify(&service, key, digest, &message, &signature).await?,
		other => anyhow::bail!("{other:?} does not use the key store"),
	};
	Ok(output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	// Version, sign and hash need neither configuration nor the database
	let output = match args.command {
		Command::Version => version::format_version_info(),
		Command::Sign {
			digest,
			secret,
			message,
		} => commands::sign(digest, &secret, &message)?,
		Command::Hash { digest, content } => commands::hash(digest, &content),
		command => run_with_service(args.config, command).await?,
	};
	println!("{output}");

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn cli_definition_is_valid() {
		Args::command().debug_assert();
	}

	#[test]
	fn parses_issue_with_expiry() {
		let user = UserId::generate();
		let user_arg = user.to_string();
		let args = Args::try_parse_from([
			"sigil-server",
			"issue",
			"--user",
			user_arg.as_str(),
			"--expires-in",
			"4h",
		])
		.unwrap();
		match args.command {
			Command::Issue { user: parsed, expires_in } => {
				assert_eq!(parsed, user);
				assert_eq!(expires_in.unwrap().to_string(), "4h");
			}
			other => panic!("unexpected command {other:?}"),
		}
	}

	#[test]
	fn rejects_bad_expiry_and_digest() {
		let user = UserId::generate().to_string();
		let bad_expiry = [
			"sigil-server",
			"issue",
			"--user",
			user.as_str(),
			"--expires-in",
			"0h",
		];
		assert!(Args::try_parse_from(bad_expiry).is_err());
		assert!(Args::try_parse_from(["sigil-server", "hash", "--digest", "HMAC-SHA1", "x"]).is_err());
	}

	#[test]
	fn digest_defaults_to_sha256() {
		let args = Args::try_parse_from(["sigil-server", "hash", "hello"]).unwrap();
		assert!(matches!(
			args.command,
			Command::Hash {
				digest: DigestAlgorithm::HmacSha256,
				..
			}
		));
	}
}
