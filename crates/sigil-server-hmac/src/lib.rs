// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HMAC API Key System
//!
//! This crate issues per-user HMAC keys and verifies request signatures made
//! with them:
//!
//! - **Key Issuance**: Random 32-byte secrets, capped per user, optionally expiring
//! - **Envelope Encryption**: Secrets are stored encrypted under a key derived
//!   from the master secret and a per-record salt
//! - **Signatures**: HMAC-SHA256/384/512 signing and constant-time verification
//! - **Content Hashing**: Base64 SHA-2 digests of request bodies
//!
//! # Security Design
//!
//! - Plaintext secrets and the master secret are wrapped in [`sigil_common_secret::Secret`]
//! - Derived keys are zeroized on drop and never persisted
//! - Records are sealed with AES-256-GCM; the trailing 16 bytes of the 24-byte
//!   salt double as the nonce
//! - The plaintext secret is returned exactly once, when the key is issued

pub mod cache;
pub mod cipher;
pub mod config;
pub mod digest;
pub mod envelope;
pub mod error;
pub mod expiry;
pub mod kdf;
pub mod key_cache;
pub mod service;
pub mod signature;
pub mod store;
pub mod types;

pub use cache::DecryptCache;
pub use config::{HmacConfig, DEFAULT_MAX_KEYS_PER_USER};
pub use digest::DigestAlgorithm;
pub use envelope::{EnvelopeManager, SealedSecret, SALT_SIZE, SECRET_SIZE};
pub use error::{HmacError, HmacResult};
pub use expiry::{ExpiryDuration, ExpiryUnit, EXPIRES_IN_CONFIG_ERR, MAX_EXPIRY_YEAR};
pub use kdf::{MasterSecret, PBKDF2_ITERATIONS};
pub use key_cache::{InMemoryKeyCache, KeyCache};
pub use service::HmacKeyService;
pub use signature::{hash, sign, verify};
pub use store::{KeyStore, SqliteKeyStore};
pub use types::{IssuedKey, KeyId, KeyRecord, NewKeyRecord, UserId};
