// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wrapper type for key material that must never reach a log line.
//!
//! Sigil handles three kinds of sensitive values: the process-wide master
//! secret, the raw 32-byte HMAC secrets decrypted during verification, and the
//! base64 form of a freshly issued secret that is handed to its owner once.
//! All of them are carried in [`Secret<T>`], which:
//!
//! - Redacts `Debug`, `Display` and `Serialize` output
//! - Zeroizes the inner value on drop
//! - Requires an explicit `.expose()` call to read the value
//!
//! # Example
//!
//! ```
//! use sigil_common_secret::{Secret, SecretBytes};
//!
//! let hmac_secret: SecretBytes = Secret::new(vec![7u8; 32]);
//!
//! assert_eq!(format!("{hmac_secret:?}"), "Secret(\"[REDACTED]\")");
//! assert_eq!(format!("{hmac_secret}"), "[REDACTED]");
//! assert_eq!(hmac_secret.expose().len(), 32);
//! ```
//!
//! `tracing::Value` is sealed, so structured logging goes through the redacted
//! `Display` (`%secret`) and `Debug` (`?secret`) implementations.

use std::fmt;
use zeroize::Zeroize;

/// The redaction placeholder used in all output.
pub const REDACTED: &str = "[REDACTED]";

/// A wrapper for sensitive values that prevents accidental exposure.
///
/// There is deliberately no `Deref` impl; call [`Secret::expose`] at the point
/// where the value is actually consumed.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// Secret text, e.g. the master secret or a base64-encoded HMAC secret.
pub type SecretString = Secret<String>;

/// Secret raw bytes, e.g. a decrypted HMAC secret.
pub type SecretBytes = Secret<Vec<u8>>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Explicitly access the inner value.
	pub fn expose(&self) -> &T {
		&self.inner
	}

	/// Consume the wrapper and return a copy of the inner value.
	///
	/// The wrapped memory is still zeroized when `self` drops.
	pub fn into_inner(self) -> T
	where
		T: Clone,
	{
		self.inner.clone()
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Secret::new(value)
	}
}

impl From<Vec<u8>> for SecretBytes {
	fn from(value: Vec<u8>) -> Self {
		Secret::new(value)
	}
}

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			let inner = T::deserialize(deserializer)?;
			Ok(Secret::new(inner))
		}
	}
}
