// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[(
	"001_create_hmac_keys",
	include_str!("../migrations/001_create_hmac_keys.sql"),
)];

/// Run all database migrations.
///
/// Every statement uses `IF NOT EXISTS`, so running this against an already
/// migrated database is a no-op.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, sql) in MIGRATIONS {
		for stmt in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
			sqlx::query(stmt).execute(pool).await?;
		}
		tracing::debug!(migration = %name, "migration applied");
	}
	Ok(())
}
