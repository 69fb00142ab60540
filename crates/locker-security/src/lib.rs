// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// locker-security: everything that touches secrets on the native side.
//
// The vault itself is encrypted and decrypted by the app; we only see its
// decrypted JSON.  What lives here is reading that payload, checking a
// master password against the stored key hash, and the small sealed cache
// of last-used credentials that lets a known site fill without unlocking.

pub mod digest;
pub mod last_used;
pub mod master_key;
pub mod sealing;
pub mod vault;

pub use digest::{hash_bytes, site_digest};
pub use last_used::LastUsedCache;
pub use master_key::{make_key_hash, verify_master_password};
pub use sealing::CacheSealer;
pub use vault::{VaultAuth, VaultPayload};
