// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory platform bridge for host and service tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use locker_bridge::traits::*;
use locker_core::error::Result;
use locker_core::types::{CredentialRecord, SaveCandidate};

/// Two logins for example.com and one for an app, signed in as
/// `user@example.com` / "correct horse battery staple".
pub const VAULT: &str = r#"{
    "passwords": [
        {"id":"1","username":"alice","password":"p1","name":"Example","uri":"https://example.com"},
        {"id":"2","username":"bob","password":"p2","name":"Example (work)","uri":"https://www.example.com/login"},
        {"id":"3","username":"carol","password":"p3","name":"App","uri":"androidapp://com.example.app"}
    ],
    "authen": {"email":"user@example.com","hashPass":"AE/ZmXnVdmOsGa5lAMFqyy4EVjJTlInPjfkAr52yIkI=","avatar":null},
    "faceIdEnabled": false
}"#;

/// Same logins, different account.
pub const OTHER_ACCOUNT_VAULT: &str = r#"{
    "passwords": [
        {"id":"1","username":"alice","password":"p1","name":"Example","uri":"https://example.com"}
    ],
    "authen": {"email":"a@b.com","hashPass":"mlZzhvcN+EhxxTan1dgmMvfcYzKB/X14QjOrsLqIzWI="}
}"#;

pub fn record(id: &str, password: &str) -> CredentialRecord {
    CredentialRecord {
        id: id.into(),
        username: "alice".into(),
        password: password.into(),
        display_name: "Example".into(),
        uri: "https://example.com".into(),
        last_used_at: None,
    }
}

#[derive(Default)]
struct FakeState {
    payload: Mutex<Option<String>>,
    unlock_pick: Mutex<Option<CredentialRecord>>,
    selector_pick: Mutex<Option<CredentialRecord>>,
    auth_requests: Mutex<Vec<String>>,
    selector_offers: Mutex<Vec<usize>>,
    saved: Mutex<Vec<SaveCandidate>>,
    unlock_panics: AtomicBool,
    vault_read_panics: AtomicBool,
}

/// Cloning shares state, so a test keeps a handle after boxing the bridge.
#[derive(Clone, Default)]
pub struct FakeBridge {
    state: Arc<FakeState>,
}

impl FakeBridge {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn with_payload(json: &str) -> Self {
        let bridge = Self::default();
        bridge.publish(Some(json));
        bridge
    }

    pub fn publish(&self, json: Option<&str>) {
        *self.state.payload.lock().expect("lock") = json.map(str::to_owned);
    }

    pub fn pick_on_unlock(&self, record: Option<CredentialRecord>) {
        *self.state.unlock_pick.lock().expect("lock") = record;
    }

    pub fn pick_in_selector(&self, record: Option<CredentialRecord>) {
        *self.state.selector_pick.lock().expect("lock") = record;
    }

    /// Make the unlock screen panic, standing in for a broken native call.
    pub fn panic_on_unlock(&self) {
        self.state.unlock_panics.store(true, Ordering::SeqCst);
    }

    pub fn panic_on_vault_read(&self) {
        self.state.vault_read_panics.store(true, Ordering::SeqCst);
    }

    pub fn auth_requests(&self) -> Vec<String> {
        self.state.auth_requests.lock().expect("lock").clone()
    }

    pub fn selector_offers(&self) -> Vec<usize> {
        self.state.selector_offers.lock().expect("lock").clone()
    }

    pub fn saved(&self) -> Vec<SaveCandidate> {
        self.state.saved.lock().expect("lock").clone()
    }
}

impl PlatformBridge for FakeBridge {
    fn platform_name(&self) -> &str {
        "Test"
    }
}

impl NativeVault for FakeBridge {
    fn load_vault_payload(&self) -> Result<Option<String>> {
        if self.state.vault_read_panics.load(Ordering::SeqCst) {
            panic!("vault read failed");
        }
        Ok(self.state.payload.lock().expect("lock").clone())
    }
}

impl NativeAuthPrompt for FakeBridge {
    fn present_authentication(&self, site_uri: &str) -> Result<Option<CredentialRecord>> {
        self.state
            .auth_requests
            .lock()
            .expect("lock")
            .push(site_uri.to_owned());
        if self.state.unlock_panics.load(Ordering::SeqCst) {
            panic!("unlock screen failed");
        }
        Ok(self.state.unlock_pick.lock().expect("lock").clone())
    }

    fn present_selector(&self, candidates: &[CredentialRecord]) -> Result<Option<CredentialRecord>> {
        self.state
            .selector_offers
            .lock()
            .expect("lock")
            .push(candidates.len());
        Ok(self.state.selector_pick.lock().expect("lock").clone())
    }
}

impl NativeSaveFlow for FakeBridge {
    fn start_save_flow(&self, candidate: &SaveCandidate) -> Result<()> {
        self.state.saved.lock().expect("lock").push(candidate.clone());
        Ok(())
    }
}

impl NativeStorage for FakeBridge {
    fn data_dir(&self) -> Result<String> {
        Ok(std::env::temp_dir().display().to_string())
    }
}
