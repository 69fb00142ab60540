// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The production `AutofillHost`: vault and screens come from the platform
// bridge, the last-used cache is a sealed SQLite file in the app's data
// directory.
//
// The cache is sealed under the signed-in account's key hash, so it is
// (re)opened lazily whenever the account behind the vault changes.

use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use locker_autofill::host::{CredentialCache, CredentialSource, InteractiveSelector, SaveDelegate};
use locker_bridge::PlatformBridge;
use locker_core::error::{LockerError, Result};
use locker_core::types::{CredentialRecord, SaveCandidate, SiteIdentity};
use locker_security::{LastUsedCache, VaultPayload, hash_bytes};
use tracing::{debug, info, instrument, warn};

/// File name of the last-used cache inside the data directory.
pub const CACHE_FILE: &str = "last_used.db";

struct AccountCache {
    /// Digest of the secret the cache was opened with.
    account: String,
    cache: LastUsedCache,
}

pub struct LockerHost {
    bridge: Box<dyn PlatformBridge>,
    /// `None` keeps the cache in memory.
    cache_dir: Option<PathBuf>,
    cache: Mutex<Option<AccountCache>>,
}

impl LockerHost {
    pub fn new(bridge: Box<dyn PlatformBridge>, cache_dir: Option<PathBuf>) -> Self {
        Self {
            bridge,
            cache_dir,
            cache: Mutex::new(None),
        }
    }

    /// Host on the current platform's bridge, caching under its data
    /// directory when it has one.
    pub fn for_platform() -> Self {
        let bridge = locker_bridge::platform_bridge();
        let cache_dir = match bridge.data_dir() {
            Ok(dir) => Some(PathBuf::from(dir)),
            Err(e) => {
                warn!(error = %e, "no data directory, last-used cache kept in memory");
                None
            }
        };
        info!(platform = bridge.platform_name(), "autofill host created");
        Self::new(bridge, cache_dir)
    }

    pub fn platform_name(&self) -> &str {
        self.bridge.platform_name()
    }

    /// The vault as currently published by the app.
    pub fn vault(&self) -> Result<VaultPayload> {
        let json = self
            .bridge
            .load_vault_payload()?
            .ok_or_else(|| LockerError::Vault("no account signed in".into()))?;
        VaultPayload::from_json(&json)
    }

    pub fn verify_master_password(&self, master_password: &str) -> Result<bool> {
        self.vault()?.verify_master_password(master_password)
    }

    /// Drop every remembered credential and delete the cache file.
    #[instrument(skip_all)]
    pub fn clear_last_used(&self) -> Result<()> {
        let mut guard = self.lock();
        if let Some(open) = guard.take() {
            open.cache.clear()?;
        }
        if let Some(dir) = &self.cache_dir {
            for suffix in ["", "-wal", "-shm"] {
                match std::fs::remove_file(dir.join(format!("{CACHE_FILE}{suffix}"))) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        info!("last-used cache cleared");
        Ok(())
    }

    /// Run `f` against the cache of the account that owns `vault`.
    fn with_cache<T>(
        &self,
        vault: &VaultPayload,
        f: impl FnOnce(&LastUsedCache) -> Result<T>,
    ) -> Result<T> {
        let secret = vault
            .account_secret()
            .ok_or_else(|| LockerError::Vault("signed-in account has no key hash".into()))?;
        let account = hash_bytes(secret.as_bytes());

        let mut guard = self.lock();
        if guard.as_ref().is_none_or(|open| open.account != account) {
            let cache = match &self.cache_dir {
                Some(dir) => LastUsedCache::open(dir.join(CACHE_FILE), secret.as_bytes())?,
                None => LastUsedCache::open_in_memory(secret.as_bytes())?,
            };
            debug!("last-used cache opened for signed-in account");
            *guard = Some(AccountCache { account, cache });
        }
        match guard.as_ref() {
            Some(open) => f(&open.cache),
            None => Err(LockerError::Database("last-used cache is not open".into())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<AccountCache>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialCache for LockerHost {
    /// The remembered credential, refreshed from the vault.
    ///
    /// A credential edited since it was cached fills with its current
    /// values; one deleted from the vault is a miss.
    #[instrument(skip_all)]
    fn lookup_credential(&self, site: &SiteIdentity) -> Result<Option<CredentialRecord>> {
        let vault = self.vault()?;
        let cached = match self.with_cache(&vault, |cache| cache.get(site)) {
            Ok(cached) => cached,
            Err(LockerError::Decryption(_)) => {
                debug!("cached entry was sealed for another account");
                None
            }
            Err(e) => return Err(e),
        };
        let Some(cached) = cached else {
            return Ok(None);
        };

        match vault.passwords.into_iter().find(|record| record.id == cached.id) {
            Some(mut current) => {
                current.last_used_at = cached.last_used_at;
                Ok(Some(current))
            }
            None => {
                debug!("cached credential is no longer in the vault");
                Ok(None)
            }
        }
    }

    fn cache_last_used(&self, site: &SiteIdentity, record: &CredentialRecord) -> Result<()> {
        let vault = self.vault()?;
        self.with_cache(&vault, |cache| cache.put(site, record))
    }

    fn forget_last_used(&self, site: &SiteIdentity) -> Result<()> {
        let vault = self.vault()?;
        self.with_cache(&vault, |cache| cache.forget(site))
    }
}

impl CredentialSource for LockerHost {
    fn vault_available(&self) -> bool {
        match self.vault() {
            Ok(vault) => vault.is_signed_in(),
            Err(e) => {
                debug!(error = %e, "vault unavailable");
                false
            }
        }
    }

    fn candidates(&self, site: &SiteIdentity) -> Result<Vec<CredentialRecord>> {
        Ok(self.vault()?.candidates_for(site))
    }
}

impl InteractiveSelector for LockerHost {
    fn present_authentication(&self, site: &SiteIdentity) -> Result<Option<CredentialRecord>> {
        let uri = site
            .canonical_uri()
            .ok_or_else(|| LockerError::Bridge("site has no URI to authenticate for".into()))?;
        self.bridge.present_authentication(&uri)
    }

    fn present_selector(&self, candidates: &[CredentialRecord]) -> Result<Option<CredentialRecord>> {
        self.bridge.present_selector(candidates)
    }
}

impl SaveDelegate for LockerHost {
    fn start_save_confirmation(&self, candidate: &SaveCandidate) -> Result<()> {
        self.bridge.start_save_flow(candidate)
    }
}
