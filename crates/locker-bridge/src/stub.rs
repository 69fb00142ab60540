// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where the Android app is not present.

use locker_core::error::{LockerError, Result};
use locker_core::types::{CredentialRecord, SaveCandidate};

use crate::traits::*;

/// Bridge returned on non-Android targets. Every call fails with
/// `PlatformUnavailable`.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl NativeVault for StubBridge {
    fn load_vault_payload(&self) -> Result<Option<String>> {
        tracing::warn!("NativeVault::load_vault_payload called on stub bridge");
        Err(LockerError::PlatformUnavailable)
    }
}

impl NativeAuthPrompt for StubBridge {
    fn present_authentication(&self, _site_uri: &str) -> Result<Option<CredentialRecord>> {
        tracing::warn!("NativeAuthPrompt::present_authentication called on stub bridge");
        Err(LockerError::PlatformUnavailable)
    }

    fn present_selector(&self, _candidates: &[CredentialRecord]) -> Result<Option<CredentialRecord>> {
        tracing::warn!("NativeAuthPrompt::present_selector called on stub bridge");
        Err(LockerError::PlatformUnavailable)
    }
}

impl NativeSaveFlow for StubBridge {
    fn start_save_flow(&self, _candidate: &SaveCandidate) -> Result<()> {
        tracing::warn!("NativeSaveFlow::start_save_flow called on stub bridge");
        Err(LockerError::PlatformUnavailable)
    }
}

impl NativeStorage for StubBridge {
    fn data_dir(&self) -> Result<String> {
        Err(LockerError::PlatformUnavailable)
    }
}
