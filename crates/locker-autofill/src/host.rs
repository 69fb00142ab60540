// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborators the session controller depends on.
//
// The credential store, the unlock screen and the save screen all live in
// the embedding app.  The controller only sees these traits; `locker-ffi`
// wires them to the real store and the platform bridge, tests wire them to
// in-memory fakes.

use locker_core::error::Result;
use locker_core::types::{CredentialRecord, SaveCandidate, SiteIdentity};

/// Last-used credential per site.
pub trait CredentialCache {
    /// The credential last filled on `site`, if any.
    fn lookup_credential(&self, site: &SiteIdentity) -> Result<Option<CredentialRecord>>;

    /// Remember `record` as the last one used on `site`. Idempotent.
    fn cache_last_used(&self, site: &SiteIdentity, record: &CredentialRecord) -> Result<()>;

    fn forget_last_used(&self, site: &SiteIdentity) -> Result<()>;
}

/// Read access to the unlocked vault.
pub trait CredentialSource {
    /// False when no user is signed in or the vault cannot be read.
    fn vault_available(&self) -> bool;

    /// Stored logins that belong to `site`.
    fn candidates(&self, site: &SiteIdentity) -> Result<Vec<CredentialRecord>>;
}

/// Interactive screens. Each may be dismissed, which yields `Ok(None)`.
pub trait InteractiveSelector {
    /// Master password or biometric verification. Returns the credential the
    /// user picked on the unlock screen.
    fn present_authentication(&self, site: &SiteIdentity) -> Result<Option<CredentialRecord>>;

    /// Pick one of several matching credentials.
    fn present_selector(&self, candidates: &[CredentialRecord]) -> Result<Option<CredentialRecord>>;
}

pub trait SaveDelegate {
    /// Open the save confirmation screen for a submitted login.
    fn start_save_confirmation(&self, candidate: &SaveCandidate) -> Result<()>;
}

/// Everything a [`FillSessionController`](crate::FillSessionController) needs.
pub trait AutofillHost: CredentialCache + CredentialSource + InteractiveSelector + SaveDelegate {}

impl<T> AutofillHost for T where T: CredentialCache + CredentialSource + InteractiveSelector + SaveDelegate {}
