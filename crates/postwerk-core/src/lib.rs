// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Postwerk — Core types, configuration, capture identity and error
// definitions shared across all crates.

pub mod config;
pub mod error;
pub mod identity;
pub mod types;

pub use config::AppConfig;
pub use error::PostwerkError;
pub use identity::derive_code;
pub use types::*;
