// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Authentication hand-off slot.
//
// When a fill request needs the interactive step, the fields and site it
// resolved must survive until the OS relaunches us with the user's choice.
// The slot holds at most one such context.  Every publication replaces the
// previous one and returns a fresh token; only the holder of the latest
// token can claim the context back.

use std::sync::{Mutex, MutexGuard};

use locker_core::types::{AuthenticationHandle, FieldModel, RequestId, SiteIdentity};
use tracing::{debug, warn};

/// What the resume path needs to finish a suspended fill.
#[derive(Debug, Clone, PartialEq)]
pub struct HandoffContext {
    pub request_id: RequestId,
    pub site: SiteIdentity,
    pub fields: Vec<FieldModel>,
}

/// Single-slot, last-write-wins channel between a fill request and its
/// resume.
#[derive(Debug, Default)]
pub struct HandoffSlot {
    inner: Mutex<Option<(AuthenticationHandle, HandoffContext)>>,
}

impl HandoffSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `context` and return the token that claims it.
    pub fn publish(&self, context: HandoffContext) -> AuthenticationHandle {
        let token = AuthenticationHandle::new();
        let mut slot = self.lock();
        if let Some((previous, _)) = slot.as_ref() {
            debug!(%previous, "replacing pending hand-off");
        }
        *slot = Some((token, context));
        debug!(%token, "hand-off published");
        token
    }

    /// Take the context published under `token`.
    ///
    /// Returns `None` for a stale or unknown token, leaving any newer
    /// context in place.
    pub fn claim(&self, token: AuthenticationHandle) -> Option<HandoffContext> {
        let mut slot = self.lock();
        let current = slot.as_ref().map(|(current, _)| *current);
        match current {
            Some(current) if current == token => slot.take().map(|(_, context)| context),
            Some(_) => {
                warn!(%token, "stale hand-off token");
                None
            }
            None => {
                debug!(%token, "no pending hand-off");
                None
            }
        }
    }

    /// Site of the context published under `token`, without claiming it.
    pub fn site_for(&self, token: AuthenticationHandle) -> Option<SiteIdentity> {
        self.lock()
            .as_ref()
            .filter(|(current, _)| *current == token)
            .map(|(_, context)| context.site.clone())
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    pub fn clear(&self) {
        self.lock().take();
    }

    // A panic while holding the lock cannot leave the Option half-written.
    fn lock(&self) -> MutexGuard<'_, Option<(AuthenticationHandle, HandoffContext)>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(domain: &str) -> HandoffContext {
        HandoffContext {
            request_id: RequestId::new(),
            site: SiteIdentity::for_web("https", domain, None),
            fields: vec![FieldModel::new("p")],
        }
    }

    #[test]
    fn publish_then_claim() {
        let slot = HandoffSlot::new();
        let token = slot.publish(context("example.com"));
        assert!(slot.is_pending());

        let claimed = slot.claim(token).expect("context");
        assert_eq!(claimed.site.domain.as_deref(), Some("example.com"));
        assert!(!slot.is_pending());
        assert!(slot.claim(token).is_none());
    }

    #[test]
    fn stale_token_leaves_newer_context() {
        let slot = HandoffSlot::new();
        let first = slot.publish(context("first.com"));
        let second = slot.publish(context("second.com"));
        assert_ne!(first, second);

        assert!(slot.claim(first).is_none());
        assert!(slot.site_for(first).is_none());
        assert_eq!(
            slot.site_for(second).and_then(|s| s.domain).as_deref(),
            Some("second.com")
        );
        let claimed = slot.claim(second).expect("context");
        assert_eq!(claimed.site.domain.as_deref(), Some("second.com"));
    }

    #[test]
    fn clear_drops_pending_context() {
        let slot = HandoffSlot::new();
        let token = slot.publish(context("example.com"));
        slot.clear();
        assert!(slot.claim(token).is_none());
    }

    #[test]
    fn survives_poisoned_lock() {
        let slot = std::sync::Arc::new(HandoffSlot::new());
        let token = slot.publish(context("example.com"));

        let poisoner = std::sync::Arc::clone(&slot);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock().expect("lock");
            panic!("poison the slot");
        })
        .join();

        assert!(slot.claim(token).is_some());
    }
}
