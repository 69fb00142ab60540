// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native library loaded by the Locker autofill service.
//
// `host` composes the vault, the sealed last-used cache and the platform
// bridge into the collaborators the session controller expects. `service`
// owns the process-wide controller and speaks JSON. `exports` hands that
// JSON surface to the Java service class over JNI, with `lifecycle`
// keeping setup retries and panics on this side of the boundary.

pub mod host;
pub mod lifecycle;
pub mod logging;
pub mod service;

#[cfg(target_os = "android")]
mod exports;

#[cfg(test)]
mod test_support;

pub use host::LockerHost;
pub use service::{AutofillService, FillReply, ResumeReply, SaveReply};
