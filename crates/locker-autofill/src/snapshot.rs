// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Serializable mirror of `android.app.assist.AssistStructure`.
//
// The Java service flattens the structure into JSON before crossing JNI.
// Decoding is forgiving: a field with an unexpected shape falls back to its
// default, and a child that is not a node at all is dropped.  One odd view
// must never cost us the rest of the tree.
//
// View trees can be arbitrarily deep, so the document is parsed without a
// nesting limit on a growable stack, and nodes are assembled and dropped
// without recursion.

use std::ops::{Deref, DerefMut};

use locker_core::error::{LockerError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Scalar and hint fields nested deeper than this are treated as malformed.
const MAX_FIELD_DEPTH: usize = 2;
/// Same, for the members of a request envelope around the snapshot.
const MAX_ENVELOPE_DEPTH: usize = 8;

/// Everything the OS captured for one fill or save request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub windows: Vec<WindowNode>,
}

/// `AssistStructure.WindowNode`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowNode {
    /// Window title, `<package>/<activity>` for app windows.
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    /// Attached by [`ViewSnapshot::from_value`].
    #[serde(skip_deserializing)]
    pub root: Option<ViewNode>,
}

/// `AssistStructure.ViewNode`, reduced to the properties the walker reads.
///
/// The derived `Deserialize` reads a single node; children are attached by
/// the tree decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewNode {
    #[serde(deserialize_with = "lenient")]
    pub autofill_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub class_name: Option<String>,
    /// `HtmlInfo.getTag()` for views backed by web content.
    #[serde(deserialize_with = "lenient")]
    pub html_tag: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub hint: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub id_entry: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub id_package: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub hint_id_entry: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub text: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub input_type: u32,
    #[serde(deserialize_with = "lenient")]
    pub autofill_type: i32,
    #[serde(deserialize_with = "lenient")]
    pub autofill_hints: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient")]
    pub web_domain: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub web_scheme: Option<String>,
    #[serde(skip_deserializing)]
    pub children: ViewChildren,
}

/// Child views in traversal order.
///
/// Dropping releases the subtree with an explicit work list, so a deep
/// chain of views cannot exhaust the stack.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ViewChildren(Vec<ViewNode>);

impl Deref for ViewChildren {
    type Target = Vec<ViewNode>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ViewChildren {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<ViewNode>> for ViewChildren {
    fn from(nodes: Vec<ViewNode>) -> Self {
        Self(nodes)
    }
}

impl Drop for ViewChildren {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.0);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children.0);
        }
    }
}

impl ViewSnapshot {
    /// Decode the JSON produced by the Java side.
    ///
    /// Only a document that is not JSON at all, or whose top level is not an
    /// object, is an error.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(parse_document(json)?)
    }

    /// Build a snapshot from an already parsed document.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            release(value);
            return Err(LockerError::Parse("snapshot must be a JSON object".into()));
        };
        let windows = take_array(&mut map, "windows", "window node")
            .into_iter()
            .filter_map(decode_window)
            .collect();
        release(Value::Object(map));
        Ok(Self { windows })
    }
}

impl<'de> Deserialize<'de> for ViewSnapshot {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Parse a JSON document of any nesting depth.
pub fn parse_document(json: &str) -> Result<Value> {
    let mut parser = serde_json::Deserializer::from_str(json);
    parser.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut parser))
        .map_err(|e| LockerError::Parse(e.to_string()))?;
    parser
        .end()
        .map_err(|e| LockerError::Parse(e.to_string()))?;
    Ok(value)
}

/// Split a request document into its snapshot and the remaining envelope.
///
/// The snapshot member is decoded as a view tree; every other member nested
/// deeper than any request field legitimately is replaced by `null` so the
/// envelope can go through serde as an ordinary shallow object.
pub(crate) fn split_snapshot(json: &str) -> Result<(ViewSnapshot, Map<String, Value>)> {
    let value = parse_document(json)?;
    let Value::Object(mut map) = value else {
        release(value);
        return Err(LockerError::Parse("request must be a JSON object".into()));
    };
    let snapshot = match map.remove("snapshot") {
        Some(snapshot) => ViewSnapshot::from_value(snapshot)?,
        None => ViewSnapshot::default(),
    };
    for value in map.values_mut() {
        if nests_deeper_than(value, MAX_ENVELOPE_DEPTH) {
            release(std::mem::take(value));
        }
    }
    Ok((snapshot, map))
}

fn decode_window(value: Value) -> Option<WindowNode> {
    let Value::Object(mut map) = value else {
        warn!(what = "window node", "skipping malformed entry");
        release(value);
        return None;
    };
    let root = map.remove("root");
    let Some(mut window) = decode_shallow::<WindowNode>(map, "window node") else {
        root.into_iter().for_each(release);
        return None;
    };
    window.root = match root {
        Some(Value::Object(root)) => decode_tree(root),
        Some(other) => {
            release(other);
            None
        }
        None => None,
    };
    Some(window)
}

/// Decode a view subtree without recursion.
///
/// Nodes are decoded in pre-order into a flat list with parent indices, then
/// folded back into a tree from the last node to the first.  Every node comes
/// after its parent, so a node's children are complete by the time it is
/// attached.
fn decode_tree(root: Map<String, Value>) -> Option<ViewNode> {
    let mut nodes: Vec<Option<ViewNode>> = Vec::new();
    let mut parents: Vec<Option<usize>> = Vec::new();
    let mut stack: Vec<(Map<String, Value>, Option<usize>)> = vec![(root, None)];

    while let Some((mut map, parent)) = stack.pop() {
        let children = take_array(&mut map, "children", "view node");
        let Some(node) = decode_shallow::<ViewNode>(map, "view node") else {
            // The subtree of a node that cannot be decoded is lost with it.
            children.into_iter().for_each(release);
            continue;
        };
        let index = nodes.len();
        nodes.push(Some(node));
        parents.push(parent);

        for child in children.into_iter().rev() {
            match child {
                Value::Object(child) => stack.push((child, Some(index))),
                other => {
                    warn!(what = "view node", "skipping malformed entry");
                    release(other);
                }
            }
        }
    }

    let mut root = None;
    for index in (0..nodes.len()).rev() {
        let Some(mut node) = nodes[index].take() else {
            continue;
        };
        // Children were attached last-to-first.
        node.children.reverse();
        match parents[index].and_then(|parent| nodes[parent].as_mut()) {
            Some(parent) => parent.children.push(node),
            None => root = Some(node),
        }
    }
    root
}

/// Decode one node's own fields, with its children already removed.
fn decode_shallow<T: DeserializeOwned>(mut map: Map<String, Value>, what: &'static str) -> Option<T> {
    for value in map.values_mut() {
        if nests_deeper_than(value, MAX_FIELD_DEPTH) {
            release(std::mem::take(value));
        }
    }
    match serde_json::from_value(Value::Object(map)) {
        Ok(node) => Some(node),
        Err(e) => {
            warn!(what, error = %e, "skipping undecodable entry");
            None
        }
    }
}

/// Remove `key` from `map`, keeping it only when it is an array.
fn take_array(map: &mut Map<String, Value>, key: &str, what: &'static str) -> Vec<Value> {
    match map.remove(key) {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            warn!(what, "expected an array, ignoring");
            release(other);
            Vec::new()
        }
    }
}

fn nests_deeper_than(value: &Value, limit: usize) -> bool {
    let mut stack = vec![(value, 0usize)];
    while let Some((value, depth)) = stack.pop() {
        let nested: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => map.values().collect(),
            _ => continue,
        };
        if depth >= limit {
            return true;
        }
        stack.extend(nested.into_iter().map(|inner| (inner, depth + 1)));
    }
    false
}

/// Drop a JSON value without recursing into it.
fn release(value: Value) {
    let mut pending = vec![value];
    while let Some(value) = pending.pop() {
        match value {
            Value::Array(items) => pending.extend(items),
            Value::Object(map) => pending.extend(map.into_iter().map(|(_, inner)| inner)),
            _ => {}
        }
    }
}

/// Decode `T`, or fall back to its default when the value has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}
