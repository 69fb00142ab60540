// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SHA-256 digests. Site keys are stored hashed so the cache file does not
// list the sites a user logs into.

use locker_core::types::SiteIdentity;
use sha2::{Digest, Sha256};

/// SHA-256 of `data` as lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Digest of the site's normalised cache key, or `None` for an unidentified
/// site.
pub fn site_digest(site: &SiteIdentity) -> Option<String> {
    site.cache_key().map(|key| hash_bytes(key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn hash_empty_input() {
        assert_eq!(hash_bytes(b""), EMPTY_SHA256);
    }

    #[test]
    fn web_digest_uses_normalised_host() {
        let expected = "a379a6f6eeafb9a55e378c118034e2751e682fab9f2d30ab13d2125586ce1947";
        let site = SiteIdentity::for_web("https", "www.Example.com", None);
        assert_eq!(site_digest(&site).as_deref(), Some(expected));
    }

    #[test]
    fn app_digest() {
        let expected = "a28eed49ce38e66fa4bb10db0f8f2b9e99136558e744ad38c1dc067a6eb310cb";
        let site = SiteIdentity::for_package("com.example.app");
        assert_eq!(site_digest(&site).as_deref(), Some(expected));
    }

    #[test]
    fn unidentified_site_has_no_digest() {
        assert!(site_digest(&SiteIdentity::default()).is_none());
    }
}
