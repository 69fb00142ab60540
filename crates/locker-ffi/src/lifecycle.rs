// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Boundary helpers for the JNI exports: one-time setup that may be retried
// after a failure, and panic containment for export bodies.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use locker_core::error::Result;
use tracing::warn;

/// Runs a setup step until it succeeds once.
///
/// Unlike `std::sync::Once`, a failed attempt does not count: the next call
/// runs the step again. Attempts are serialised.
pub struct InitLatch {
    done: Mutex<bool>,
}

impl InitLatch {
    pub const fn new() -> Self {
        Self {
            done: Mutex::new(false),
        }
    }

    pub fn run(&self, setup: impl FnOnce() -> Result<()>) -> Result<()> {
        let mut done = self.done.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *done {
            return Ok(());
        }
        setup()?;
        *done = true;
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        *self.done.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InitLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Run an export body, returning `fallback()` if it panics.
pub fn guarded<T>(export: &'static str, fallback: impl FnOnce() -> T, body: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|_| {
        warn!(export, "native call panicked");
        fallback()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use locker_core::error::LockerError;

    #[test]
    fn failed_setup_is_retried() {
        let latch = InitLatch::new();
        let mut attempts = 0;

        let first = latch.run(|| {
            attempts += 1;
            Err(LockerError::Bridge("GetJavaVM".into()))
        });
        assert!(first.is_err());
        assert!(!latch.is_done());

        latch
            .run(|| {
                attempts += 1;
                Ok(())
            })
            .expect("second attempt");
        assert!(latch.is_done());

        latch
            .run(|| {
                attempts += 1;
                Ok(())
            })
            .expect("already done");
        assert_eq!(attempts, 2);
    }

    #[test]
    fn panicking_setup_leaves_latch_open() {
        let latch = InitLatch::new();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            latch.run(|| panic!("context lookup failed"))
        }));
        assert!(outcome.is_err());
        assert!(!latch.is_done());
        latch.run(|| Ok(())).expect("retry after poison");
        assert!(latch.is_done());
    }

    #[test]
    fn guarded_body_returns_fallback_on_panic() {
        assert!(!guarded("verify", || false, || panic!("no context")));
        assert_eq!(guarded("fill", String::new, || "reply".to_owned()), "reply");
    }
}
