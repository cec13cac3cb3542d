// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # sigil-server-db
//!
//! SQLite persistence for HMAC key records via sqlx.
//!
//! Follows the repository pattern: [`HmacKeyStore`] defines the interface and
//! [`HmacKeyRepository`] implements it over a `SqlitePool`. Rows carry the
//! ciphertext and salt as base64 text; no plaintext secret reaches this crate.
//!
//! ## Return Type Conventions
//!
//! | Operation | Return type |
//! |-----------|-------------|
//! | Get by ID | `Result<Option<T>>` |
//! | List | `Result<Vec<T>>` |
//! | Insert | `Result<()>` |
//! | Delete | `Result<bool>` (true if deleted) or `Result<u64>` for bulk |
//! | Count | `Result<i64>` |

mod error;
pub mod hmac_key;
pub mod migrations;
pub mod pool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{DbError, Result};
pub use hmac_key::{HmacKeyRepository, HmacKeyRow, HmacKeyStore};
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use sqlx::sqlite::SqlitePool;
