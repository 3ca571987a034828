// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture identity — content-addressed postcard codes.

use sha2::{Digest, Sha256};

use crate::error::PostwerkError;
use crate::types::{CODE_LEN, Code};

/// Derive the postcard code for a capture.
///
/// The code is the first 4 bytes of the SHA-256 digest of `data`, rendered as
/// 8 lowercase hex characters. Re-uploading the same bytes therefore yields the
/// same code and overwrites the same files, which is the intended dedup.
pub fn derive_code(data: &[u8]) -> Result<Code, PostwerkError> {
    if data.is_empty() {
        return Err(PostwerkError::EmptyCapture);
    }
    let digest = Sha256::digest(data);
    let hex = hex::encode(&digest[..CODE_LEN / 2]);
    Ok(Code::from_digest_hex(hex))
}
