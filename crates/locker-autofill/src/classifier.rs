// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Login field classification.
//
// Each field is run through an ordered table of pure rules; the first rule
// that yields a role wins.  Two list-level passes follow: single-password
// promotion (fill path) and login-pair extraction (save path).

use locker_core::types::{AutofillType, FieldModel, FieldRole};
use tracing::{debug, instrument};

/// Substrings that mark a secret entry field.
pub const PASSWORD_TERMS: &[&str] = &["password", "passwd", "pswd", "pwd", "mật khẩu"];

/// Substrings that mark a user name field. `login` + `id` is checked separately.
pub const USERNAME_TERMS: &[&str] = &["username", "user name", "user_name", "tên đăng nhập"];

pub const EMAIL_TERMS: &[&str] = &["email", "e-mail"];

/// Layout words. Text containing one of these describes a container or a
/// caption, never a data field.
pub const REJECT_TERMS: &[&str] = &["label", "container"];

/// Search boxes and decorative inputs. Suppress input-type inference only.
pub const IGNORE_TERMS: &[&str] = &[
    "search",
    "find",
    "container",
    "label",
    "recipient",
    "edit",
    "tìm kiếm",
];

/// One entry in the classification table.
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&FieldModel) -> Option<FieldRole>,
}

/// Classification precedence. Order is significant.
pub const RULES: &[Rule] = &[
    Rule {
        name: "explicit-hints",
        apply: explicit_hints,
    },
    Rule {
        name: "view-hint",
        apply: view_hint,
    },
    Rule {
        name: "resource-id",
        apply: resource_id,
    },
    Rule {
        name: "hint-id",
        apply: hint_id,
    },
    Rule {
        name: "visible-text",
        apply: visible_text,
    },
    Rule {
        name: "input-type",
        apply: input_type,
    },
];

fn explicit_hints(field: &FieldModel) -> Option<FieldRole> {
    field.explicit_hints.iter().find_map(|hint| infer_role(hint))
}

fn view_hint(field: &FieldModel) -> Option<FieldRole> {
    field.view_hint.as_deref().and_then(infer_role)
}

fn resource_id(field: &FieldModel) -> Option<FieldRole> {
    field.resource_id_hint.as_deref().and_then(infer_role)
}

fn hint_id(field: &FieldModel) -> Option<FieldRole> {
    field.hint_id_hint.as_deref().and_then(infer_role)
}

/// Only consulted for edit widgets; a static caption reading "Password" is
/// not itself a password field.
fn visible_text(field: &FieldModel) -> Option<FieldRole> {
    if !field.is_edit_text() {
        return None;
    }
    field.visible_text.as_deref().and_then(infer_role)
}

fn input_type(field: &FieldModel) -> Option<FieldRole> {
    let ignored = [field.view_hint.as_deref(), field.resource_id_hint.as_deref()]
        .into_iter()
        .flatten()
        .any(|text| contains_any(&text.to_lowercase(), IGNORE_TERMS));
    if ignored {
        return None;
    }
    field
        .input_type
        .is_password_variation()
        .then_some(FieldRole::Password)
}

/// Map free text to a role through the term tables.
///
/// Term sets are tried password, username, email.
pub fn infer_role(text: &str) -> Option<FieldRole> {
    let text = text.to_lowercase();
    if contains_any(&text, REJECT_TERMS) {
        return None;
    }
    if contains_any(&text, PASSWORD_TERMS) {
        Some(FieldRole::Password)
    } else if contains_any(&text, USERNAME_TERMS) || (text.contains("login") && text.contains("id")) {
        Some(FieldRole::Username)
    } else if contains_any(&text, EMAIL_TERMS) {
        Some(FieldRole::Email)
    } else {
        None
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Role for a single field, from the first matching rule.
pub fn classify_field(field: &FieldModel) -> FieldRole {
    RULES
        .iter()
        .find_map(|rule| {
            let role = (rule.apply)(field)?;
            debug!(rule = rule.name, ?role, "field matched");
            Some(role)
        })
        .unwrap_or(FieldRole::Unknown)
}

/// Result of classifying one request's candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Fields with an Email, Username or Password role, in document order.
    pub fillable: Vec<FieldModel>,
    /// Fields no rule matched, in document order.
    pub unknown: Vec<FieldModel>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.fillable.is_empty()
    }

    /// The fillable set, or `None` when nothing can be filled.
    pub fn into_fillable(self) -> Option<Vec<FieldModel>> {
        (!self.fillable.is_empty()).then_some(self.fillable)
    }

    /// First identifier and the nearest password after it.
    ///
    /// A password that only appears before the identifier does not count.
    pub fn login_pair(&self) -> Option<(&FieldModel, &FieldModel)> {
        let start = self.fillable.iter().position(|f| f.role.is_identifier())?;
        let identifier = &self.fillable[start];
        let password = self.fillable[start + 1..]
            .iter()
            .find(|f| f.role == FieldRole::Password)?;
        Some((identifier, password))
    }

    pub fn has_password(&self) -> bool {
        self.fillable.iter().any(|f| f.role == FieldRole::Password)
    }
}

/// Stateless classifier.
pub struct FieldClassifier;

impl FieldClassifier {
    /// Assign roles to `fields` and split them into fillable and unknown.
    ///
    /// Roles already present on the input are ignored, so classifying the
    /// same sequence twice gives the same answer.
    #[instrument(skip_all, fields(candidates = fields.len()))]
    pub fn classify(fields: &[FieldModel]) -> Classification {
        let mut positioned: Vec<(usize, FieldModel)> = Vec::new();
        let mut unknown: Vec<(usize, FieldModel)> = Vec::new();

        for (index, field) in fields.iter().enumerate() {
            if field.autofill_type == AutofillType::None {
                continue;
            }
            let mut field = field.clone();
            field.role = classify_field(&field);
            if field.role.is_fillable() {
                positioned.push((index, field));
            } else {
                unknown.push((index, field));
            }
        }

        let promote = positioned.len() == 1
            && positioned[0].1.role == FieldRole::Password
            && unknown.len() == 1;
        if promote {
            if let Some((index, mut field)) = unknown.pop() {
                debug!(field = %field.id, "promoting lone unknown field to username");
                field.role = FieldRole::Username;
                positioned.push((index, field));
                positioned.sort_by_key(|(index, _)| *index);
            }
        }

        let classification = Classification {
            fillable: positioned.into_iter().map(|(_, f)| f).collect(),
            unknown: unknown.into_iter().map(|(_, f)| f).collect(),
        };
        debug!(
            fillable = classification.fillable.len(),
            unknown = classification.unknown.len(),
            "fields classified"
        );
        classification
    }
}
