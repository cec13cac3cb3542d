// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Supported digest algorithms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HmacError;

/// The digest used for both content hashing and HMAC signing.
///
/// Names are matched exactly and case-sensitively; there are no aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
	#[serde(rename = "HMAC-SHA256")]
	HmacSha256,
	#[serde(rename = "HMAC-SHA384")]
	HmacSha384,
	#[serde(rename = "HMAC-SHA512")]
	HmacSha512,
}

impl DigestAlgorithm {
	pub const ALL: [DigestAlgorithm; 3] = [
		DigestAlgorithm::HmacSha512,
		DigestAlgorithm::HmacSha384,
		DigestAlgorithm::HmacSha256,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			DigestAlgorithm::HmacSha256 => "HMAC-SHA256",
			DigestAlgorithm::HmacSha384 => "HMAC-SHA384",
			DigestAlgorithm::HmacSha512 => "HMAC-SHA512",
		}
	}

	/// Digest output length in bytes.
	pub fn output_len(&self) -> usize {
		match self {
			DigestAlgorithm::HmacSha256 => 32,
			DigestAlgorithm::HmacSha384 => 48,
			DigestAlgorithm::HmacSha512 => 64,
		}
	}
}

impl FromStr for DigestAlgorithm {
	type Err = HmacError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"HMAC-SHA256" => Ok(DigestAlgorithm::HmacSha256),
			"HMAC-SHA384" => Ok(DigestAlgorithm::HmacSha384),
			"HMAC-SHA512" => Ok(DigestAlgorithm::HmacSha512),
			other => Err(HmacError::UnsupportedDigest(other.to_string())),
		}
	}
}

impl fmt::Display for DigestAlgorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn names_roundtrip() {
		for digest in DigestAlgorithm::ALL {
			assert_eq!(digest.as_str().parse::<DigestAlgorithm>().unwrap(), digest);
		}
	}

	#[test]
	fn rejects_unknown_and_miscased_names() {
		for name in ["HMAC-SHA1", "hmac-sha256", "SHA256", "HMAC-SHA-256", "", "HMAC-MD5"] {
			let err = name.parse::<DigestAlgorithm>().unwrap_err();
			assert!(matches!(err, HmacError::UnsupportedDigest(ref n) if n == name));
		}
	}

	#[test]
	fn serde_uses_wire_names() {
		let json = serde_json::to_string(&DigestAlgorithm::HmacSha384).unwrap();
		assert_eq!(json, "\"HMAC-SHA384\"");
		let parsed: DigestAlgorithm = serde_json::from_str("\"HMAC-SHA512\"").unwrap();
		assert_eq!(parsed, DigestAlgorithm::HmacSha512);
	}
}
