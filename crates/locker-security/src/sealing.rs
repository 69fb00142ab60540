// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// AES-256-GCM sealing for last-used cache entries.
//
// The key is derived with HKDF-SHA256 from a per-account secret, so cache
// entries written for one account cannot be opened after another signs in.
// Sealed layout: nonce (12 bytes) || ciphertext || tag (16 bytes).

use locker_core::error::{LockerError, Result};
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::hkdf;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, instrument};

const HKDF_SALT: &[u8] = b"locker-autofill/last-used";
const HKDF_INFO: &[u8] = b"aes-256-gcm v1";
const TAG_LEN: usize = 16;

/// Seals and opens byte buffers under one derived key.
pub struct CacheSealer {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl CacheSealer {
    /// Derive the sealing key from `secret`.
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.is_empty() {
            return Err(LockerError::Encryption("sealing secret is empty".into()));
        }
        let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, HKDF_SALT).extract(secret);
        let info = [HKDF_INFO];
        let okm = prk
            .expand(&info, &AES_256_GCM)
            .map_err(|_| LockerError::Encryption("key expansion failed".into()))?;
        let key = UnboundKey::from(okm);
        Ok(Self {
            key: LessSafeKey::new(key),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt `plaintext`, binding it to `aad`.
    #[instrument(skip_all, fields(plaintext_len = plaintext.len()))]
    pub fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| LockerError::Encryption("nonce generation failed".into()))?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::from(aad), &mut in_out)
            .map_err(|_| LockerError::Encryption("seal failed".into()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        debug!(sealed_len = sealed.len(), "sealed");
        Ok(sealed)
    }

    /// Decrypt a buffer produced by [`encrypt`](Self::encrypt) with the same
    /// `aad`.
    #[instrument(skip_all, fields(sealed_len = sealed.len()))]
    pub fn decrypt(&self, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(LockerError::Decryption("sealed entry too short".into()));
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| LockerError::Decryption("bad nonce".into()))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext_len = self
            .key
            .open_in_place(nonce, Aad::from(aad), &mut in_out)
            .map_err(|_| LockerError::Decryption("authentication failed".into()))?
            .len();
        in_out.truncate(plaintext_len);
        Ok(in_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let sealer = CacheSealer::new(b"account secret").expect("sealer");
        let sealed = sealer.encrypt(b"hello", b"site").expect("encrypt");
        assert_eq!(sealed.len(), NONCE_LEN + 5 + TAG_LEN);
        assert_eq!(sealer.decrypt(&sealed, b"site").expect("decrypt"), b"hello");
    }

    #[test]
    fn nonces_differ() {
        let sealer = CacheSealer::new(b"account secret").expect("sealer");
        let a = sealer.encrypt(b"same", b"").expect("encrypt");
        let b = sealer.encrypt(b"same", b"").expect("encrypt");
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_aad_fails() {
        let sealer = CacheSealer::new(b"account secret").expect("sealer");
        let sealed = sealer.encrypt(b"hello", b"site-a").expect("encrypt");
        assert!(matches!(
            sealer.decrypt(&sealed, b"site-b"),
            Err(LockerError::Decryption(_))
        ));
    }

    #[test]
    fn other_secret_fails() {
        let sealed = CacheSealer::new(b"first")
            .expect("sealer")
            .encrypt(b"hello", b"")
            .expect("encrypt");
        let other = CacheSealer::new(b"second").expect("sealer");
        assert!(other.decrypt(&sealed, b"").is_err());
    }

    #[test]
    fn tampered_or_short_input_fails() {
        let sealer = CacheSealer::new(b"account secret").expect("sealer");
        let mut sealed = sealer.encrypt(b"hello", b"").expect("encrypt");
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(sealer.decrypt(&sealed, b"").is_err());
        assert!(sealer.decrypt(&[0u8; 8], b"").is_err());
    }

    #[test]
    fn empty_secret_rejected() {
        assert!(matches!(
            CacheSealer::new(b""),
            Err(LockerError::Encryption(_))
        ));
    }
}
