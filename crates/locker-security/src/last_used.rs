// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Last-used credential cache: one sealed record per site, in SQLite.
//
// Schema:
//   last_used(
//     site_digest TEXT PRIMARY KEY,   -- SHA-256 hex of the normalised site key
//     sealed      BLOB NOT NULL,      -- AES-256-GCM sealed CredentialRecord JSON
//     updated_at  TEXT NOT NULL       -- RFC 3339
//   )
//
// The site digest doubles as the AEAD associated data, so a sealed row
// copied under another site's digest fails to open.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use locker_core::error::{LockerError, Result};
use locker_core::types::{CredentialRecord, SiteIdentity};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, instrument, warn};
use zeroize::Zeroizing;

use crate::digest::site_digest;
use crate::sealing::CacheSealer;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS last_used (
    site_digest TEXT PRIMARY KEY,
    sealed      BLOB NOT NULL,
    updated_at  TEXT NOT NULL
);";

fn db_err(e: rusqlite::Error) -> LockerError {
    LockerError::Database(e.to_string())
}

pub struct LastUsedCache {
    conn: Mutex<Connection>,
    sealer: CacheSealer,
}

impl LastUsedCache {
    /// Open (or create) the cache at `path`, sealing entries under `secret`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, secret: &[u8]) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        let cache = Self::with_connection(conn, secret)?;
        debug!("last-used cache opened");
        Ok(cache)
    }

    pub fn open_in_memory(secret: &[u8]) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn, secret)
    }

    fn with_connection(conn: Connection, secret: &[u8]) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
            sealer: CacheSealer::new(secret)?,
        })
    }

    /// The cached credential for `site`.
    ///
    /// An entry that no longer opens (written under another account) is
    /// reported as a decryption error; callers treat that as a miss.
    #[instrument(skip_all)]
    pub fn get(&self, site: &SiteIdentity) -> Result<Option<CredentialRecord>> {
        let Some(digest) = site_digest(site) else {
            return Ok(None);
        };
        let sealed: Option<Vec<u8>> = self
            .lock()
            .query_row(
                "SELECT sealed FROM last_used WHERE site_digest = ?1",
                params![digest],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        let Some(sealed) = sealed else {
            debug!("cache miss");
            return Ok(None);
        };

        let plaintext = Zeroizing::new(self.sealer.decrypt(&sealed, digest.as_bytes())?);
        let record = serde_json::from_slice(&plaintext)?;
        debug!("cache hit");
        Ok(Some(record))
    }

    /// Insert or replace the entry for `site`.
    #[instrument(skip_all)]
    pub fn put(&self, site: &SiteIdentity, record: &CredentialRecord) -> Result<()> {
        let Some(digest) = site_digest(site) else {
            warn!("not caching credential for unidentified site");
            return Ok(());
        };
        let plaintext = Zeroizing::new(serde_json::to_vec(record)?);
        let sealed = self.sealer.encrypt(&plaintext, digest.as_bytes())?;

        self.lock()
            .execute(
                "INSERT INTO last_used (site_digest, sealed, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(site_digest) DO UPDATE SET
                     sealed = excluded.sealed,
                     updated_at = excluded.updated_at",
                params![digest, sealed, Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;
        debug!("cache entry stored");
        Ok(())
    }

    /// Remove the entry for `site`. Removing a missing entry is not an error.
    #[instrument(skip_all)]
    pub fn forget(&self, site: &SiteIdentity) -> Result<()> {
        let Some(digest) = site_digest(site) else {
            return Ok(());
        };
        let removed = self
            .lock()
            .execute("DELETE FROM last_used WHERE site_digest = ?1", params![digest])
            .map_err(db_err)?;
        debug!(removed, "cache entry forgotten");
        Ok(())
    }

    /// Drop every entry, e.g. on sign-out.
    pub fn clear(&self) -> Result<()> {
        self.lock()
            .execute("DELETE FROM last_used", [])
            .map_err(db_err)?;
        Ok(())
    }

    pub fn count(&self) -> Result<u64> {
        self.lock()
            .query_row("SELECT COUNT(*) FROM last_used", [], |row| row.get(0))
            .map_err(db_err)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"hash-pass-of-signed-in-account";

    fn record(id: &str, password: &str) -> CredentialRecord {
        CredentialRecord {
            id: id.into(),
            username: "a@b.com".into(),
            password: password.into(),
            display_name: "Example".into(),
            uri: "https://example.com".into(),
            last_used_at: Some(Utc::now()),
        }
    }

    fn site() -> SiteIdentity {
        SiteIdentity::for_web("https", "example.com", None)
    }

    #[test]
    fn put_and_get() {
        let cache = LastUsedCache::open_in_memory(SECRET).expect("open");
        assert!(cache.get(&site()).expect("get").is_none());

        let stored = record("1", "p");
        cache.put(&site(), &stored).expect("put");
        assert_eq!(cache.get(&site()).expect("get"), Some(stored));
    }

    #[test]
    fn lookups_use_normalised_key() {
        let cache = LastUsedCache::open_in_memory(SECRET).expect("open");
        cache.put(&site(), &record("1", "p")).expect("put");

        let www = SiteIdentity::for_web("http", "WWW.example.com", Some("com.android.chrome"));
        assert!(cache.get(&www).expect("get").is_some());

        let sub = SiteIdentity::for_web("https", "login.example.com", None);
        assert!(cache.get(&sub).expect("get").is_none());
    }

    #[test]
    fn upsert_is_idempotent() {
        let cache = LastUsedCache::open_in_memory(SECRET).expect("open");
        cache.put(&site(), &record("1", "old")).expect("put");
        cache.put(&site(), &record("1", "old")).expect("put");
        cache.put(&site(), &record("2", "new")).expect("put");

        assert_eq!(cache.count().expect("count"), 1);
        let current = cache.get(&site()).expect("get").expect("entry");
        assert_eq!(current.id, "2");
        assert_eq!(current.password, "new");
    }

    #[test]
    fn forget_and_clear() {
        let cache = LastUsedCache::open_in_memory(SECRET).expect("open");
        let app = SiteIdentity::for_package("com.example.app");
        cache.put(&site(), &record("1", "p")).expect("put");
        cache.put(&app, &record("2", "q")).expect("put");

        cache.forget(&site()).expect("forget");
        cache.forget(&site()).expect("forget twice");
        assert!(cache.get(&site()).expect("get").is_none());
        assert_eq!(cache.count().expect("count"), 1);

        cache.clear().expect("clear");
        assert_eq!(cache.count().expect("count"), 0);
    }

    #[test]
    fn unidentified_site_is_ignored() {
        let cache = LastUsedCache::open_in_memory(SECRET).expect("open");
        cache.put(&SiteIdentity::default(), &record("1", "p")).expect("put");
        assert_eq!(cache.count().expect("count"), 0);
        assert!(cache.get(&SiteIdentity::default()).expect("get").is_none());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("last_used.db");

        {
            let cache = LastUsedCache::open(&path, SECRET).expect("open");
            cache.put(&site(), &record("1", "p")).expect("put");
        }

        let cache = LastUsedCache::open(&path, SECRET).expect("reopen");
        assert_eq!(cache.get(&site()).expect("get").map(|r| r.id), Some("1".into()));
    }

    #[test]
    fn other_account_cannot_read_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("last_used.db");
        LastUsedCache::open(&path, SECRET)
            .expect("open")
            .put(&site(), &record("1", "p"))
            .expect("put");

        let other = LastUsedCache::open(&path, b"someone else").expect("open");
        assert!(matches!(
            other.get(&site()),
            Err(LockerError::Decryption(_))
        ));
    }

    #[test]
    fn plaintext_not_stored() {
        let cache = LastUsedCache::open_in_memory(SECRET).expect("open");
        cache.put(&site(), &record("1", "hunter2")).expect("put");
        let sealed: Vec<u8> = cache
            .lock()
            .query_row("SELECT sealed FROM last_used", [], |row| row.get(0))
            .expect("row");
        let needle = b"hunter2";
        assert!(!sealed.windows(needle.len()).any(|w| w == needle));
    }
}
