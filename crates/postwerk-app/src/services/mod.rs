// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — bridges the command-line front end to the postwerk backend
// crates.

pub mod capture;
pub mod store;

pub use capture::CaptureService;
pub use store::{CaptureStore, StoredCapture};
