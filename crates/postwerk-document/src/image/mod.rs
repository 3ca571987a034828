// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decoding, geometry and JPEG output for captures and canvases.

pub mod processor;
pub mod proof;

pub use processor::ImageProcessor;
pub use proof::email_proof;
