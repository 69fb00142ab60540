// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Master password key hash.
//
// The account stores `hashPass`, derived in two PBKDF2-HMAC-SHA256 rounds:
//
//   key  = base64(PBKDF2(master, salt = email,  100_000 iterations, 32 bytes))
//   hash = base64(PBKDF2(key,    salt = master, 3 iterations,       32 bytes))
//
// The server derives the same value, so the parameters are fixed.

use std::num::NonZeroU32;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use locker_core::error::{LockerError, Result};
use ring::pbkdf2;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

const KEY_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => unreachable!(),
};
const HASH_ITERATIONS: NonZeroU32 = match NonZeroU32::new(3) {
    Some(n) => n,
    None => unreachable!(),
};
const KEY_LEN: usize = 32;

/// First round: the base64 master key.
fn derive_master_key(master_password: &str, email: &str) -> Zeroizing<String> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        KEY_ITERATIONS,
        email.as_bytes(),
        master_password.as_bytes(),
        &mut key[..],
    );
    Zeroizing::new(STANDARD.encode(&key[..]))
}

/// Compute the stored key hash for `master_password` and `email`.
#[instrument(skip_all)]
pub fn make_key_hash(master_password: &str, email: &str) -> String {
    let key = derive_master_key(master_password, email);
    let mut hash = [0u8; KEY_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        HASH_ITERATIONS,
        master_password.as_bytes(),
        key.as_bytes(),
        &mut hash,
    );
    STANDARD.encode(hash)
}

/// Check `master_password` against a stored base64 key hash.
///
/// The final comparison is constant time. A stored hash that is not valid
/// base64 is an error rather than a mismatch.
#[instrument(skip_all)]
pub fn verify_master_password(master_password: &str, email: &str, stored_hash: &str) -> Result<bool> {
    let expected = STANDARD
        .decode(stored_hash.trim())
        .map_err(|e| LockerError::Vault(format!("stored key hash is not base64: {e}")))?;
    if expected.len() != KEY_LEN {
        return Err(LockerError::Vault(format!(
            "stored key hash has {} bytes, expected {KEY_LEN}",
            expected.len()
        )));
    }

    let key = derive_master_key(master_password, email);
    let verified = pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        HASH_ITERATIONS,
        master_password.as_bytes(),
        key.as_bytes(),
        &expected,
    )
    .is_ok();
    debug!(verified, "master password checked");
    Ok(verified)
}
