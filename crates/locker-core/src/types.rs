// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Locker autofill engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LockerError, Result};

/// Scheme used for native app identities.
pub const ANDROID_APP_SCHEME: &str = "androidapp";

/// Unique identifier for a single fill or save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque token attached to a locked dataset. The OS hands it back when the
/// user picks that dataset, which is how the interactive step finds its
/// parked fields again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthenticationHandle(pub Uuid);

impl AuthenticationHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuthenticationHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuthenticationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AuthenticationHandle {
    type Err = LockerError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| LockerError::Parse(format!("authentication handle: {e}")))
    }
}

/// OS-assigned reference to a view. Only ever compared, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AutofillId(pub String);

impl std::fmt::Display for AutofillId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Semantic role of a field, assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldRole {
    /// Not yet classified.
    #[default]
    None,
    Email,
    Username,
    Password,
    /// Classified, but no rule matched.
    Unknown,
}

impl FieldRole {
    /// Email and username fields both receive the credential's username.
    pub fn is_identifier(&self) -> bool {
        matches!(self, Self::Email | Self::Username)
    }

    /// Whether a value can be assigned to a field with this role.
    pub fn is_fillable(&self) -> bool {
        matches!(self, Self::Email | Self::Username | Self::Password)
    }
}

/// `View.AUTOFILL_TYPE_*`: whether the platform considers a view fillable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutofillType {
    #[default]
    None,
    Text,
    Toggle,
    List,
    Date,
}

impl AutofillType {
    /// Map the raw platform constant. Unknown values are treated as `None`.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Self::Text,
            2 => Self::Toggle,
            3 => Self::List,
            4 => Self::Date,
            _ => Self::None,
        }
    }
}

/// `android.text.InputType` bitset of an editable view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputTypeFlags(pub u32);

impl InputTypeFlags {
    pub const MASK_CLASS: u32 = 0x0000_000f;
    pub const MASK_VARIATION: u32 = 0x0000_0ff0;

    pub const CLASS_TEXT: u32 = 0x1;
    pub const CLASS_NUMBER: u32 = 0x2;

    pub const TEXT_FLAG_MULTI_LINE: u32 = 0x0002_0000;

    pub const TEXT_VARIATION_EMAIL_ADDRESS: u32 = 0x20;
    pub const TEXT_VARIATION_PASSWORD: u32 = 0x80;
    pub const TEXT_VARIATION_VISIBLE_PASSWORD: u32 = 0x90;
    pub const TEXT_VARIATION_WEB_EMAIL_ADDRESS: u32 = 0xd0;
    pub const TEXT_VARIATION_WEB_PASSWORD: u32 = 0xe0;

    pub const NUMBER_VARIATION_PASSWORD: u32 = 0x10;

    pub fn class(&self) -> u32 {
        self.0 & Self::MASK_CLASS
    }

    pub fn variation(&self) -> u32 {
        self.0 & Self::MASK_VARIATION
    }

    pub fn is_multi_line(&self) -> bool {
        self.0 & Self::TEXT_FLAG_MULTI_LINE != 0
    }

    /// Whether the keyboard type describes a secret entry field.
    ///
    /// This differs from the raw-bit legacy test (`flags & VARIATION != 0`
    /// for each password variation). Variations are compared under the class
    /// and variation masks instead, because the raw values overlap:
    /// `WEB_EMAIL_ADDRESS` (0xd0) contains the `PASSWORD` bit and
    /// `TEXT_VARIATION_URI` (0x10) equals `NUMBER_VARIATION_PASSWORD`. The
    /// raw test flags those e-mail and URL inputs as passwords; this one
    /// does not.
    pub fn is_password_variation(&self) -> bool {
        let variation = self.variation();
        match self.class() {
            Self::CLASS_TEXT => match variation {
                Self::TEXT_VARIATION_PASSWORD => !self.is_multi_line(),
                Self::TEXT_VARIATION_WEB_PASSWORD | Self::TEXT_VARIATION_VISIBLE_PASSWORD => true,
                _ => false,
            },
            Self::CLASS_NUMBER => variation == Self::NUMBER_VARIATION_PASSWORD,
            _ => false,
        }
    }
}

/// One candidate input extracted from the view structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldModel {
    pub id: AutofillId,
    pub role: FieldRole,
    /// `View.getAutofillHints()` in declaration order.
    pub explicit_hints: Vec<String>,
    /// `ViewNode.getHint()`.
    pub view_hint: Option<String>,
    /// `ViewNode.getIdEntry()`: the resource id name.
    pub resource_id_hint: Option<String>,
    /// Resource id of the hint text, when the app declares one.
    pub hint_id_hint: Option<String>,
    /// Current text of the view. Doubles as the submitted value on save.
    pub visible_text: Option<String>,
    pub class_name: Option<String>,
    pub html_tag: Option<String>,
    pub input_type: InputTypeFlags,
    pub autofill_type: AutofillType,
}

impl FieldModel {
    /// A bare text field with the given handle and no signals.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: AutofillId(id.into()),
            role: FieldRole::None,
            explicit_hints: Vec::new(),
            view_hint: None,
            resource_id_hint: None,
            hint_id_hint: None,
            visible_text: None,
            class_name: None,
            html_tag: None,
            input_type: InputTypeFlags::default(),
            autofill_type: AutofillType::Text,
        }
    }

    /// Native edit widgets and HTML inputs. Static labels are excluded so
    /// their text is never mistaken for a field's purpose.
    pub fn is_edit_text(&self) -> bool {
        let native = self
            .class_name
            .as_deref()
            .is_some_and(|c| c.contains("EditText") || c.contains("AutoCompleteTextView"));
        let html = self
            .html_tag
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("input"));
        native || html
    }
}

/// Where a fill request came from: a web page inside a browser or a native app.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteIdentity {
    pub domain: Option<String>,
    pub scheme: Option<String>,
    pub package_name: Option<String>,
}

impl SiteIdentity {
    pub fn for_package(package: impl Into<String>) -> Self {
        Self {
            domain: None,
            scheme: None,
            package_name: Some(package.into()),
        }
    }

    pub fn for_web(
        scheme: impl Into<String>,
        domain: impl Into<String>,
        package: Option<&str>,
    ) -> Self {
        Self {
            domain: Some(domain.into()),
            scheme: Some(scheme.into()),
            package_name: package.map(str::to_owned),
        }
    }

    /// Whether neither a web domain nor a package was found.
    pub fn is_empty(&self) -> bool {
        self.domain.is_none() && self.package_name.is_none()
    }

    /// `scheme://domain` for web content, `androidapp://package` otherwise.
    pub fn canonical_uri(&self) -> Option<String> {
        if let Some(domain) = self.domain.as_deref() {
            let scheme = self.scheme.as_deref().unwrap_or("http");
            return Some(format!("{scheme}://{domain}"));
        }
        self.package_name
            .as_deref()
            .map(|package| format!("{ANDROID_APP_SCHEME}://{package}"))
    }

    /// Web domain if present, package otherwise.
    pub fn label(&self) -> Option<&str> {
        self.domain.as_deref().or(self.package_name.as_deref())
    }

    /// Normalised key for the last-used cache.
    ///
    /// Web identities ignore the scheme and a single leading `www.`; any other
    /// subdomain is a different site. App identities keep the `androidapp://`
    /// form so they never collide with a host name.
    pub fn cache_key(&self) -> Option<String> {
        if let Some(domain) = self.domain.as_deref() {
            let host = domain.trim().to_ascii_lowercase();
            let host = host.strip_prefix("www.").unwrap_or(&host).to_owned();
            return (!host.is_empty()).then_some(host);
        }
        self.package_name
            .as_deref()
            .map(|package| format!("{ANDROID_APP_SCHEME}://{}", package.trim().to_ascii_lowercase()))
    }
}

/// A stored login, owned by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "name")]
    pub display_name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// Name shown on the dataset chip: the display name, else the username.
    pub fn presentation_label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }
}

/// Identifier/password pair submitted by the user, handed to the save flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCandidate {
    pub site: SiteIdentity,
    pub username: Option<String>,
    pub password: Option<String>,
}
