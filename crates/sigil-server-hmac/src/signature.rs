// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Content hashing and HMAC request signatures.
//!
//! All outputs are standard base64. Signatures are checked by recomputing the
//! HMAC and comparing in constant time.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::digest::DigestAlgorithm;
use crate::error::{HmacError, HmacResult};

fn new_mac<M: Mac + hmac::digest::KeyInit>(secret: &[u8]) -> HmacResult<M> {
	<M as Mac>::new_from_slice(secret)
		.map_err(|e| HmacError::Internal(format!("HMAC key rejected: {e}")))
}

fn mac_bytes<M: Mac + hmac::digest::KeyInit>(secret: &[u8], message: &[u8]) -> HmacResult<Vec<u8>> {
	let mut mac = new_mac::<M>(secret)?;
	mac.update(message);
	Ok(mac.finalize().into_bytes().to_vec())
}

fn mac_verify<M: Mac + hmac::digest::KeyInit>(
	secret: &[u8],
	message: &[u8],
	expected: &[u8],
) -> HmacResult<bool> {
	let mut mac = new_mac::<M>(secret)?;
	mac.update(message);
	Ok(mac.verify_slice(expected).is_ok())
}

/// Hash `content` with the named digest and base64-encode the result.
pub fn hash(digest: &str, content: &[u8]) -> HmacResult<String> {
	Ok(hash_with(digest.parse()?, content))
}

pub fn hash_with(digest: DigestAlgorithm, content: &[u8]) -> String {
	match digest {
		DigestAlgorithm::HmacSha256 => BASE64.encode(Sha256::digest(content)),
		DigestAlgorithm::HmacSha384 => BASE64.encode(Sha384::digest(content)),
		DigestAlgorithm::HmacSha512 => BASE64.encode(Sha512::digest(content)),
	}
}

/// Sign `message` (as UTF-8) with `secret` and base64-encode the HMAC.
pub fn sign(digest: &str, message: &str, secret: &[u8]) -> HmacResult<String> {
	sign_with(digest.parse()?, message, secret)
}

pub fn sign_with(digest: DigestAlgorithm, message: &str, secret: &[u8]) -> HmacResult<String> {
	let bytes = match digest {
		DigestAlgorithm::HmacSha256 => mac_bytes::<Hmac<Sha256>>(secret, message.as_bytes())?,
		DigestAlgorithm::HmacSha384 => mac_bytes::<Hmac<Sha384>>(secret, message.as_bytes())?,
		DigestAlgorithm::HmacSha512 => mac_bytes::<Hmac<Sha512>>(secret, message.as_bytes())?,
	};
	Ok(BASE64.encode(bytes))
}

/// Check a base64 signature against `message` in constant time.
///
/// A signature that is not valid base64 is reported as a mismatch.
pub fn verify(digest: &str, message: &str, secret: &[u8], signature: &str) -> HmacResult<bool> {
	verify_with(digest.parse()?, message, secret, signature)
}

pub fn verify_with(
	digest: DigestAlgorithm,
	message: &str,
	secret: &[u8],
	signature: &str,
) -> HmacResult<bool> {
	let expected = match BASE64.decode(signature.as_bytes()) {
		Ok(bytes) => bytes,
		Err(_) => return Ok(false),
	};

	match digest {
		DigestAlgorithm::HmacSha256 => {
			mac_verify::<Hmac<Sha256>>(secret, message.as_bytes(), &expected)
		}
		DigestAlgorithm::HmacSha384 => {
			mac_verify::<Hmac<Sha384>>(secret, message.as_bytes(), &expected)
		}
		DigestAlgorithm::HmacSha512 => {
			mac_verify::<Hmac<Sha512>>(secret, message.as_bytes(), &expected)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn fixed_secret() -> Vec<u8> {
		(0u8..32).collect()
	}

	#[test]
	fn sign_golden_values() {
		let secret = fixed_secret();
		assert_eq!(
			sign("HMAC-SHA256", "hello", &secret).unwrap(),
			"U8QCcqcMFcpO4K9N8fFV/WxB4AziMH2Jh+zUuzan6ZA="
		);
		assert_eq!(
			sign("HMAC-SHA384", "hello", &secret).unwrap(),
			"JseWtGoMwvQNHTW18WdxHCSy2CC/7mPhEJDeBCsMtvhHjVVtqDfwLX4z8vo4vSBj"
		);
		assert_eq!(
			sign("HMAC-SHA512", "hello", &secret).unwrap(),
			"ERnNohm0Ynr/7Jmt5iffViR6nML2SoPsdneLIdk5gkVhF+bPNfZlgQO2e1YFS60pcuEq7WzREjn86aMKxXN7zg=="
		);
	}

	#[test]
	fn hash_golden_values() {
		assert_eq!(
			hash("HMAC-SHA256", b"hello").unwrap(),
			"LPJNul+wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ="
		);
		assert_eq!(
			hash("HMAC-SHA384", b"hello").unwrap(),
			"WeF0h3dEjGnea4ANejO7+5/xtGPkQ1TDVTvNucZm+pASWjx5+QOXvfX2oT3oKGhP"
		);
		assert_eq!(
			hash("HMAC-SHA512", b"").unwrap(),
			"z4PhNX7vuL3xVChQ1m2AB9Yg5AULVxXcg/SpIdNs6c5H0NE8XYXysP+DGNKHfuwvY7kxvUdBeoGlODJ6+SfaPg=="
		);
	}

	#[test]
	fn unsupported_digest_is_rejected_everywhere() {
		let secret = fixed_secret();
		assert!(matches!(
			sign("HMAC-SHA1", "hello", &secret),
			Err(HmacError::UnsupportedDigest(_))
		));
		assert!(matches!(
			hash("HMAC-SHA1", b"hello"),
			Err(HmacError::UnsupportedDigest(_))
		));
		assert!(matches!(
			verify("HMAC-SHA1", "hello", &secret, "AAAA"),
			Err(HmacError::UnsupportedDigest(_))
		));
	}

	#[test]
	fn verify_accepts_own_signature() {
		let secret = fixed_secret();
		for digest in DigestAlgorithm::ALL {
			let sig = sign_with(digest, "GET\n/api/v1/things\n", &secret).unwrap();
			assert!(verify_with(digest, "GET\n/api/v1/things\n", &secret, &sig).unwrap());
		}
	}

	#[test]
	fn verify_rejects_wrong_digest() {
		let secret = fixed_secret();
		let sig = sign("HMAC-SHA256", "hello", &secret).unwrap();
		assert!(!verify("HMAC-SHA512", "hello", &secret, &sig).unwrap());
	}

	#[test]
	fn verify_rejects_invalid_base64() {
		assert!(!verify("HMAC-SHA256", "hello", &fixed_secret(), "not base64!").unwrap());
	}

	#[test]
	fn verify_rejects_truncated_signature() {
		let secret = fixed_secret();
		let sig = sign("HMAC-SHA256", "hello", &secret).unwrap();
		let raw = BASE64.decode(&sig).unwrap();
		let truncated = BASE64.encode(&raw[..16]);
		assert!(!verify("HMAC-SHA256", "hello", &secret, &truncated).unwrap());
	}

	#[test]
	fn signature_lengths_match_digest() {
		let secret = fixed_secret();
		for digest in DigestAlgorithm::ALL {
			let sig = sign_with(digest, "m", &secret).unwrap();
			assert_eq!(BASE64.decode(sig).unwrap().len(), digest.output_len());
		}
	}

	proptest! {
		#[test]
		fn prop_any_bit_flip_fails_verification(
			message in ".{0,200}",
			secret in proptest::collection::vec(any::<u8>(), 32),
			digest_idx in 0usize..3,
			flip in any::<prop::sample::Index>(),
			bit in 0u8..8,
		) {
			let digest = DigestAlgorithm::ALL[digest_idx];
			let sig = sign_with(digest, &message, &secret).unwrap();
			let mut raw = BASE64.decode(&sig).unwrap();
			let idx = flip.index(raw.len());
			raw[idx] ^= 1 << bit;
			let tampered = BASE64.encode(&raw);
			prop_assert!(!verify_with(digest, &message, &secret, &tampered).unwrap());
		}

		#[test]
		fn prop_wrong_secret_fails(
			message in ".{0,100}",
			secret1 in proptest::collection::vec(any::<u8>(), 32),
			secret2 in proptest::collection::vec(any::<u8>(), 32),
		) {
			prop_assume!(secret1 != secret2);
			let sig = sign("HMAC-SHA256", &message, &secret1).unwrap();
			prop_assert!(!verify("HMAC-SHA256", &message, &secret2, &sig).unwrap());
		}

		#[test]
		fn prop_signing_is_deterministic(message in ".{0,100}", secret in proptest::collection::vec(any::<u8>(), 1..64)) {
			for digest in DigestAlgorithm::ALL {
				prop_assert_eq!(
					sign_with(digest, &message, &secret).unwrap(),
					sign_with(digest, &message, &secret).unwrap()
				);
			}
		}
	}
}
