// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decrypted vault payload as handed over by the app.
//
//   { "passwords": [{ id, username, password, name, uri }],
//     "authen": { email, hashPass, avatar },
//     "faceIdEnabled": bool }

use locker_core::error::{LockerError, Result};
use locker_core::types::{ANDROID_APP_SCHEME, CredentialRecord, SiteIdentity};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::master_key::verify_master_password;

/// Signed-in account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VaultAuth {
    pub email: String,
    pub hash_pass: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VaultPayload {
    pub passwords: Vec<CredentialRecord>,
    pub authen: Option<VaultAuth>,
    pub face_id_enabled: bool,
}

impl VaultPayload {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LockerError::Vault(format!("payload: {e}")))
    }

    /// A user is signed in and the payload carries their key hash.
    pub fn is_signed_in(&self) -> bool {
        self.authen
            .as_ref()
            .is_some_and(|auth| !auth.email.trim().is_empty() && !auth.hash_pass.trim().is_empty())
    }

    /// Per-account secret for sealing native-side caches.
    pub fn account_secret(&self) -> Option<&str> {
        self.authen
            .as_ref()
            .map(|auth| auth.hash_pass.as_str())
            .filter(|secret| !secret.trim().is_empty())
    }

    /// Check a typed master password against the signed-in account.
    pub fn verify_master_password(&self, master_password: &str) -> Result<bool> {
        let auth = self
            .authen
            .as_ref()
            .ok_or_else(|| LockerError::Vault("no signed-in account".into()))?;
        verify_master_password(master_password, &auth.email, &auth.hash_pass)
    }

    /// Stored logins that belong to `site`, in vault order.
    #[instrument(skip_all)]
    pub fn candidates_for(&self, site: &SiteIdentity) -> Vec<CredentialRecord> {
        let Some(site_key) = site.cache_key() else {
            return Vec::new();
        };
        let matches: Vec<CredentialRecord> = self
            .passwords
            .iter()
            .filter(|record| record_matches(&record.uri, &site_key))
            .cloned()
            .collect();
        debug!(candidates = matches.len(), "vault matched");
        matches
    }
}

/// Whether a stored URI belongs to the site with normalised key `site_key`.
///
/// App records must match exactly. Web records match the same host or any
/// parent domain of it: a login saved for `example.com` is offered on
/// `accounts.example.com`, not the other way round.
fn record_matches(uri: &str, site_key: &str) -> bool {
    let app_prefix = format!("{ANDROID_APP_SCHEME}://");
    let uri = uri.trim().to_ascii_lowercase();
    if uri.starts_with(&app_prefix) || site_key.starts_with(&app_prefix) {
        return uri == site_key;
    }

    let Some(host) = host_of(&uri) else {
        return false;
    };
    site_key == host
        || site_key
            .strip_suffix(host)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Host part of a lowercase URI or bare domain, without a leading `www.`.
fn host_of(uri: &str) -> Option<&str> {
    let rest = uri.split_once("://").map_or(uri, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = host_port.split(':').next().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);
    (!host.is_empty()).then_some(host)
}
