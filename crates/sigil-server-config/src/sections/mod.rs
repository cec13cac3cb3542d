// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod database;
mod hmac;
mod logging;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use hmac::{HmacKeysConfig, HmacKeysConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
