// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fill response construction.
//
// These types are what the Java service turns into `Dataset`, `SaveInfo`
// and `FillResponse` objects.  A dataset is either locked (every value is a
// placeholder and the dataset carries an authentication handle) or
// populated (real values, no handle).

use locker_core::config::AutofillConfig;
use locker_core::error::{LockerError, Result};
use locker_core::types::{AuthenticationHandle, AutofillId, CredentialRecord, FieldModel, FieldRole};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Inline suggestion UI version the service renders.
pub const INLINE_UI_VERSION_1: &str = "androidx.autofill.inline.ui.version:v1";

/// `SaveInfo.SAVE_DATA_TYPE_*` bits.
pub const SAVE_DATA_TYPE_PASSWORD: u32 = 0x01;
pub const SAVE_DATA_TYPE_USERNAME: u32 = 0x08;
pub const SAVE_DATA_TYPE_EMAIL_ADDRESS: u32 = 0x10;

/// One field's value inside a dataset. `None` is the locked placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetEntry {
    pub id: AutofillId,
    pub role: FieldRole,
    pub value: Option<String>,
}

/// Dropdown chip text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub title: String,
    pub subtitle: Option<String>,
}

/// Keyboard suggestion chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlinePresentation {
    pub title: String,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub entries: Vec<DatasetEntry>,
    pub presentation: Presentation,
    /// Present only on locked datasets.
    pub authentication: Option<AuthenticationHandle>,
    pub inline_presentation: Option<InlinePresentation>,
}

impl Dataset {
    pub fn is_locked(&self) -> bool {
        self.authentication.is_some()
    }

    /// Value assigned to `id`, if the dataset carries one.
    pub fn value_for(&self, id: &AutofillId) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| &entry.id == id)
            .and_then(|entry| entry.value.as_deref())
    }
}

/// Fields whose submission should make the OS offer a save prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveInfo {
    pub data_types: u32,
    pub required_ids: Vec<AutofillId>,
    pub optional_ids: Vec<AutofillId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillResponse {
    pub datasets: Vec<Dataset>,
    pub save_info: Option<SaveInfo>,
}

/// `InlinePresentationSpec` as reported by the IME.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InlineSpec {
    pub ui_versions: Vec<String>,
}

/// `InlineSuggestionsRequest` attached to a fill request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InlineCapability {
    pub max_suggestion_count: u32,
    pub specs: Vec<InlineSpec>,
}

impl InlineCapability {
    /// The keyboard can show our suggestion: it asked for at least one, and
    /// the last spec it offered renders UI v1.
    pub fn supports_inline(&self) -> bool {
        self.max_suggestion_count > 0
            && self
                .specs
                .last()
                .is_some_and(|spec| spec.ui_versions.iter().any(|v| v == INLINE_UI_VERSION_1))
    }
}

/// Builds datasets and responses with the service's presentation settings.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    service_title: String,
    inline_suggestions: bool,
    declare_save_info: bool,
}

impl ResponseBuilder {
    pub fn new(config: &AutofillConfig) -> Self {
        Self {
            service_title: config.service_title.clone(),
            inline_suggestions: config.inline_suggestions,
            declare_save_info: config.declare_save_info,
        }
    }

    /// Build one dataset over `fillable`.
    ///
    /// With a credential the dataset is populated and carries no handle.
    /// Without one it is locked and `authentication` is mandatory. Fields
    /// without a fillable role are left out; every other field appears.
    pub fn build_dataset(
        &self,
        fillable: &[FieldModel],
        credential: Option<&CredentialRecord>,
        authentication: Option<AuthenticationHandle>,
        inline: Option<&InlineCapability>,
    ) -> Result<Dataset> {
        let entries: Vec<DatasetEntry> = fillable
            .iter()
            .filter(|field| field.role.is_fillable())
            .map(|field| DatasetEntry {
                id: field.id.clone(),
                role: field.role,
                value: credential.map(|record| value_for_role(field.role, record)),
            })
            .collect();
        if entries.is_empty() {
            return Err(LockerError::EmptyDataset);
        }

        let (presentation, authentication) = match credential {
            Some(record) => (
                Presentation {
                    title: record.presentation_label().to_owned(),
                    subtitle: (!record.username.is_empty()).then(|| record.username.clone()),
                },
                None,
            ),
            None => {
                let handle = authentication.ok_or(LockerError::MissingAuthentication)?;
                (
                    Presentation {
                        title: self.service_title.clone(),
                        subtitle: None,
                    },
                    Some(handle),
                )
            }
        };

        let inline_presentation = inline
            .filter(|capability| self.inline_suggestions && capability.supports_inline())
            .map(|_| InlinePresentation {
                title: presentation.title.clone(),
                pinned: false,
            });

        debug!(
            entries = entries.len(),
            locked = authentication.is_some(),
            inline = inline_presentation.is_some(),
            "dataset built"
        );

        Ok(Dataset {
            entries,
            presentation,
            authentication,
            inline_presentation,
        })
    }

    /// Placeholder dataset that triggers the interactive flow when picked.
    pub fn locked_dataset(
        &self,
        fillable: &[FieldModel],
        handle: AuthenticationHandle,
        inline: Option<&InlineCapability>,
    ) -> Result<Dataset> {
        self.build_dataset(fillable, None, Some(handle), inline)
    }

    pub fn populated_dataset(
        &self,
        fillable: &[FieldModel],
        credential: &CredentialRecord,
        inline: Option<&InlineCapability>,
    ) -> Result<Dataset> {
        self.build_dataset(fillable, Some(credential), None, inline)
    }

    /// Wrap a dataset into a response, declaring save-info when configured.
    pub fn fill_response(&self, dataset: Dataset, fillable: &[FieldModel]) -> FillResponse {
        let save_info = if self.declare_save_info {
            self.save_info(fillable)
        } else {
            None
        };
        FillResponse {
            datasets: vec![dataset],
            save_info,
        }
    }

    /// Save-info for a form with at least one password field.
    pub fn save_info(&self, fillable: &[FieldModel]) -> Option<SaveInfo> {
        let mut data_types = 0;
        let mut required_ids = Vec::new();
        let mut optional_ids = Vec::new();

        for field in fillable {
            match field.role {
                FieldRole::Password => {
                    data_types |= SAVE_DATA_TYPE_PASSWORD;
                    required_ids.push(field.id.clone());
                }
                FieldRole::Username => {
                    data_types |= SAVE_DATA_TYPE_USERNAME;
                    optional_ids.push(field.id.clone());
                }
                FieldRole::Email => {
                    data_types |= SAVE_DATA_TYPE_EMAIL_ADDRESS;
                    optional_ids.push(field.id.clone());
                }
                FieldRole::None | FieldRole::Unknown => {}
            }
        }

        (!required_ids.is_empty()).then_some(SaveInfo {
            data_types,
            required_ids,
            optional_ids,
        })
    }
}

/// Identifier fields all receive the username; the credential does not
/// distinguish e-mail logins from user names.
fn value_for_role(role: FieldRole, record: &CredentialRecord) -> String {
    match role {
        FieldRole::Password => record.password.clone(),
        _ => record.username.clone(),
    }
}
