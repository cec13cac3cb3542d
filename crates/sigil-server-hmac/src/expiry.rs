// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key expiry durations.
//!
//! Expiry is configured as a compact string: one or more ASCII digits followed
//! by a single unit, `h` (hours), `m` (minutes) or `s` (seconds). `4h`, `5m`
//! and `3600s` are valid; `0h`, `4x`, `4` and `` are not. The duration is
//! turned into an absolute timestamp once, when a key is created.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::error::{HmacError, HmacResult};

/// Message returned for every malformed expiry string.
pub const EXPIRES_IN_CONFIG_ERR: &str =
	"expires_in config must be string. Example: 4h, 5m, 3600s etc";

/// Latest year an expiry timestamp may fall in; stored timestamps are
/// four-digit RFC 3339.
pub const MAX_EXPIRY_YEAR: i32 = 9999;

/// Unit of an [`ExpiryDuration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryUnit {
	Hours,
	Minutes,
	Seconds,
}

impl ExpiryUnit {
	fn from_char(c: char) -> Option<Self> {
		match c {
			'h' => Some(Self::Hours),
			'm' => Some(Self::Minutes),
			's' => Some(Self::Seconds),
			_ => None,
		}
	}

	fn as_char(self) -> char {
		match self {
			Self::Hours => 'h',
			Self::Minutes => 'm',
			Self::Seconds => 's',
		}
	}

	fn seconds(self) -> i64 {
		match self {
			Self::Hours => 3600,
			Self::Minutes => 60,
			Self::Seconds => 1,
		}
	}
}

/// A validated, non-zero key lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryDuration {
	value: u64,
	unit: ExpiryUnit,
	duration: Duration,
}

impl ExpiryDuration {
	/// Parse an expiry string such as `4h`.
	pub fn parse(expires_in: &str) -> HmacResult<Self> {
		expires_in.parse()
	}

	pub fn value(&self) -> u64 {
		self.value
	}

	pub fn unit(&self) -> ExpiryUnit {
		self.unit
	}

	pub fn as_duration(&self) -> Duration {
		self.duration
	}

	/// Absolute expiry for a key created at `now`.
	///
	/// Fails when the result lies past [`MAX_EXPIRY_YEAR`].
	pub fn expires_at(&self, now: DateTime<Utc>) -> HmacResult<DateTime<Utc>> {
		now.checked_add_signed(self.duration)
			.filter(|at| at.year() <= MAX_EXPIRY_YEAR)
			.ok_or_else(invalid)
	}
}

fn invalid() -> HmacError {
	HmacError::InvalidConfig(EXPIRES_IN_CONFIG_ERR.to_string())
}

impl FromStr for ExpiryDuration {
	type Err = HmacError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let unit_char = s.chars().last().ok_or_else(invalid)?;
		let unit = ExpiryUnit::from_char(unit_char).ok_or_else(invalid)?;
		let digits = &s[..s.len() - unit_char.len_utf8()];

		if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
			return Err(invalid());
		}

		let value: u64 = digits.parse().map_err(|_| invalid())?;
		if value == 0 {
			return Err(invalid());
		}

		let seconds = i64::try_from(value)
			.ok()
			.and_then(|v| v.checked_mul(unit.seconds()))
			.ok_or_else(invalid)?;
		let duration = Duration::try_seconds(seconds).ok_or_else(invalid)?;

		Ok(Self {
			value,
			unit,
			duration,
		})
	}
}

impl fmt::Display for ExpiryDuration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{}", self.value, self.unit.as_char())
	}
}
