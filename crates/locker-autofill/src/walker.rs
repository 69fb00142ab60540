// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structure walker: a pure fold over the view snapshot.
//
// Produces the ordered list of candidate fields plus the identity of the site
// that asked for autofill.  Traversal is depth-first pre-order across every
// window, on an explicit stack.

use locker_core::types::{AutofillId, AutofillType, FieldModel, FieldRole, InputTypeFlags, SiteIdentity};
use tracing::{debug, instrument};

use crate::snapshot::{ViewNode, ViewSnapshot};

/// Output of a walk: candidates in traversal order and the resolved site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkResult {
    pub fields: Vec<FieldModel>,
    pub site: SiteIdentity,
}

/// Stateless walker over a [`ViewSnapshot`].
pub struct StructureWalker;

/// Accumulator threaded through the fold.
#[derive(Default)]
struct WalkState {
    fields: Vec<FieldModel>,
    /// First web domain seen, with its scheme. Never replaced once set.
    web: Option<(String, Option<String>)>,
    /// First resource package seen, used when the window title has none.
    resource_package: Option<String>,
}

impl StructureWalker {
    /// Walk every window of `snapshot` and collect candidate fields.
    #[instrument(skip_all, fields(windows = snapshot.windows.len()))]
    pub fn walk(snapshot: &ViewSnapshot) -> WalkResult {
        let title_package = snapshot
            .windows
            .first()
            .and_then(|w| w.title.as_deref())
            .and_then(package_from_title);

        let state = snapshot
            .windows
            .iter()
            .filter_map(|window| window.root.as_ref())
            .fold(WalkState::default(), walk_tree);

        let package_name = title_package.or(state.resource_package);
        let site = match state.web {
            Some((domain, scheme)) => SiteIdentity {
                domain: Some(domain),
                scheme,
                package_name,
            },
            None => SiteIdentity {
                domain: None,
                scheme: None,
                package_name,
            },
        };

        debug!(
            candidates = state.fields.len(),
            site = site.label().unwrap_or("<unknown>"),
            "structure walked"
        );

        WalkResult {
            fields: state.fields,
            site,
        }
    }
}

/// Pre-order traversal of one window's tree.
fn walk_tree(mut state: WalkState, root: &ViewNode) -> WalkState {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        visit(&mut state, node);
        stack.extend(node.children.iter().rev());
    }
    state
}

fn visit(state: &mut WalkState, node: &ViewNode) {
    if state.web.is_none() {
        if let Some(domain) = non_blank(node.web_domain.as_deref()) {
            state.web = Some((domain, non_blank(node.web_scheme.as_deref())));
        }
    }

    if state.resource_package.is_none() {
        state.resource_package = non_blank(node.id_package.as_deref()).filter(|p| p.contains('.'));
    }

    if is_candidate(node) {
        if let Some(field) = admit(node) {
            state.fields.push(field);
        }
    }
}

/// Editable widgets, HTML inputs, and anything the app tagged with hints.
fn is_candidate(node: &ViewNode) -> bool {
    let editable = node
        .class_name
        .as_deref()
        .is_some_and(|c| c.contains("EditText") || c.contains("AutoCompleteTextView"));
    let input_tag = node
        .html_tag
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("input"));
    let hinted = node.autofill_hints.as_ref().is_some_and(|h| !h.is_empty());

    editable || input_tag || hinted
}

/// Turn a candidate node into a field, unless the platform says it cannot be
/// filled or it has no handle to fill it through.
fn admit(node: &ViewNode) -> Option<FieldModel> {
    let autofill_type = AutofillType::from_raw(node.autofill_type);
    if autofill_type == AutofillType::None {
        debug!("skipping candidate with autofill type NONE");
        return None;
    }
    let Some(id) = non_blank(node.autofill_id.as_deref()) else {
        debug!("skipping candidate without autofill id");
        return None;
    };

    Some(FieldModel {
        id: AutofillId(id),
        role: FieldRole::None,
        explicit_hints: node
            .autofill_hints
            .iter()
            .flatten()
            .filter_map(|h| non_blank(Some(h)))
            .collect(),
        view_hint: non_blank(node.hint.as_deref()),
        resource_id_hint: non_blank(node.id_entry.as_deref()),
        hint_id_hint: non_blank(node.hint_id_entry.as_deref()),
        visible_text: non_blank(node.text.as_deref()),
        class_name: non_blank(node.class_name.as_deref()),
        html_tag: non_blank(node.html_tag.as_deref()),
        input_type: InputTypeFlags(node.input_type),
        autofill_type,
    })
}

/// `com.example.app/com.example.app.LoginActivity` → `com.example.app`.
fn package_from_title(title: &str) -> Option<String> {
    let title = title.trim();
    let (package, _) = title.split_once('/')?;
    package.contains('.').then(|| package.to_owned())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
