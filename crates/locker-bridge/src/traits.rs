// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic capability traits.

use locker_core::error::Result;
use locker_core::types::{CredentialRecord, SaveCandidate};

/// Every native capability the autofill engine uses.
///
/// Targets without a native side return `LockerError::PlatformUnavailable`
/// from the stub implementation.
pub trait PlatformBridge: NativeVault + NativeAuthPrompt + NativeSaveFlow + NativeStorage + Send + Sync {
    /// Human-readable platform name, for logs.
    fn platform_name(&self) -> &str;
}

/// The vault as the app last decrypted it.
pub trait NativeVault {
    /// Decrypted vault JSON, or `None` when nobody is signed in.
    fn load_vault_payload(&self) -> Result<Option<String>>;
}

/// Unlock and credential picker screens.
///
/// Both are activities on Android, so a real implementation may only be
/// able to launch the screen and report that the result arrives later.
pub trait NativeAuthPrompt {
    /// Ask for the master password or biometrics for `site_uri`.
    /// `Ok(None)` if the user dismissed the prompt.
    fn present_authentication(&self, site_uri: &str) -> Result<Option<CredentialRecord>>;

    /// Let the user pick one of `candidates`. `Ok(None)` if dismissed.
    fn present_selector(&self, candidates: &[CredentialRecord]) -> Result<Option<CredentialRecord>>;
}

/// Save confirmation screen.
pub trait NativeSaveFlow {
    /// Open the save screen prefilled with `candidate`.
    fn start_save_flow(&self, candidate: &SaveCandidate) -> Result<()>;
}

/// App-private storage.
pub trait NativeStorage {
    /// Directory for native-side databases.
    fn data_dir(&self) -> Result<String>;
}
