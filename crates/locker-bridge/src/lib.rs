// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native platform bridge.
//
// The autofill engine needs four things only the app can provide: the
// decrypted vault, the unlock and picker screens, the save screen, and the
// app's private storage directory.  On Android these go through JNI; every
// other target gets a stub so the workspace builds and tests on desktop CI.

pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(target_os = "android"))]
pub mod stub;

pub use traits::PlatformBridge;

/// The bridge for the target operating system.
pub fn platform_bridge() -> Box<dyn traits::PlatformBridge> {
    #[cfg(target_os = "android")]
    {
        Box::new(android::AndroidBridge::new())
    }
    #[cfg(not(target_os = "android"))]
    {
        Box::new(stub::StubBridge)
    }
}
