// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Autofill service configuration.

use serde::{Deserialize, Serialize};

use crate::error::{LockerError, Result};
use crate::types::SiteIdentity;

/// Packages that never receive autofill responses regardless of config.
pub const SYSTEM_DENIED_PACKAGES: &[&str] = &[
    "com.android.settings",
    "com.android.settings.intelligence",
];

/// Persistent autofill service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutofillConfig {
    /// Package name of the password manager itself.
    pub self_package: String,
    /// Additional packages excluded from autofill.
    pub extra_denied_packages: Vec<String>,
    /// URI schemes of browser-internal pages (settings, flags, about pages).
    pub denied_web_schemes: Vec<String>,
    /// Label shown on the locked "unlock with Locker" dataset.
    pub service_title: String,
    /// Fill directly from the last-used credential for a site when one exists.
    pub use_last_used_cache: bool,
    /// Decorate datasets with inline keyboard suggestions when the IME supports them.
    pub inline_suggestions: bool,
    /// Declare save-info on fill responses so the OS offers to save new logins.
    pub declare_save_info: bool,
}

impl Default for AutofillConfig {
    fn default() -> Self {
        Self {
            self_package: "com.cystack.locker".into(),
            extra_denied_packages: Vec::new(),
            denied_web_schemes: vec![
                "chrome".into(),
                "about".into(),
                "edge".into(),
                "brave".into(),
            ],
            service_title: "Locker".into(),
            use_last_used_cache: true,
            inline_suggestions: true,
            declare_save_info: true,
        }
    }
}

impl AutofillConfig {
    /// Parse a configuration document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.self_package.trim().is_empty() {
            return Err(LockerError::Config("selfPackage must not be empty".into()));
        }
        Ok(config)
    }

    /// Whether `site` must never receive an autofill response.
    ///
    /// Package names and web domains are matched by membership; the canonical
    /// URI is matched by scheme prefix so `chrome://settings` style pages are
    /// caught even when the browser reports them as a web domain.
    pub fn is_denied(&self, site: &SiteIdentity) -> bool {
        let denied = |name: &str| {
            name == self.self_package
                || SYSTEM_DENIED_PACKAGES.contains(&name)
                || self.extra_denied_packages.iter().any(|p| p == name)
        };

        if site.package_name.as_deref().is_some_and(denied) {
            return true;
        }
        if site.domain.as_deref().is_some_and(denied) {
            return true;
        }

        match site.canonical_uri() {
            Some(uri) => self
                .denied_web_schemes
                .iter()
                .any(|scheme| uri.starts_with(&format!("{scheme}://")) || uri.starts_with(&format!("{scheme}:"))),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_package_is_denied() {
        let config = AutofillConfig::default();
        let site = SiteIdentity::for_package("com.cystack.locker");
        assert!(config.is_denied(&site));
    }

    #[test]
    fn system_settings_are_denied() {
        let config = AutofillConfig::default();
        assert!(config.is_denied(&SiteIdentity::for_package("com.android.settings")));
        assert!(config.is_denied(&SiteIdentity::for_package(
            "com.android.settings.intelligence"
        )));
    }

    #[test]
    fn browser_internal_pages_are_denied() {
        let config = AutofillConfig::default();
        let site = SiteIdentity::for_web("chrome", "settings", Some("com.android.chrome"));
        assert!(config.is_denied(&site));
    }

    #[test]
    fn ordinary_sites_are_allowed() {
        let config = AutofillConfig::default();
        let site = SiteIdentity::for_web("https", "example.com", Some("com.android.chrome"));
        assert!(!config.is_denied(&site));
        assert!(!config.is_denied(&SiteIdentity::for_package("com.example.app")));
    }

    #[test]
    fn extra_packages_from_json() {
        let config = AutofillConfig::from_json(
            r#"{"extraDeniedPackages": ["com.bank.secure"], "inlineSuggestions": false}"#,
        )
        .expect("parse config");
        assert!(!config.inline_suggestions);
        assert!(config.use_last_used_cache);
        assert!(config.is_denied(&SiteIdentity::for_package("com.bank.secure")));
    }

    #[test]
    fn empty_self_package_rejected() {
        let result = AutofillConfig::from_json(r#"{"selfPackage": "  "}"#);
        assert!(matches!(result, Err(LockerError::Config(_))));
    }
}
