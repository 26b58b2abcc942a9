//! Parser for `uiautomator dump` window hierarchies.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::element::Bounds;
use super::node::UiNode;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<node\b((?:[^>/]|/[^>])*)(/?)>|</node\s*>").expect("valid tag regex")
});

static ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([\w:-]+)="([^"]*)""#).expect("valid attribute regex"));

static BOUNDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(-?\d+),(-?\d+)\]\[(-?\d+),(-?\d+)\]").expect("valid bounds regex")
});

/// Parse a hierarchy dump into a node tree.
///
/// Returns `None` when the document contains no nodes. When the dump holds
/// several top-level windows they are wrapped in an invisible root.
pub fn parse_hierarchy(xml: &str) -> Option<UiNode> {
    let mut stack: Vec<UiNode> = Vec::new();
    let mut roots: Vec<UiNode> = Vec::new();

    for caps in TAG_RE.captures_iter(xml) {
        match caps.get(1) {
            Some(attrs) => {
                let node = node_from_attrs(attrs.as_str());
                let self_closing = caps.get(2).map(|m| m.as_str() == "/").unwrap_or(false);
                if self_closing {
                    attach(&mut stack, &mut roots, node);
                } else {
                    stack.push(node);
                }
            }
            None => {
                // Unbalanced closing tags are ignored.
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut roots, node);
                }
            }
        }
    }

    // Truncated dumps: close whatever is still open.
    while let Some(node) = stack.pop() {
        attach(&mut stack, &mut roots, node);
    }

    match roots.len() {
        0 => None,
        1 => roots.pop(),
        _ => Some(UiNode {
            class_name: "hierarchy".to_string(),
            children: roots,
            ..Default::default()
        }),
    }
}

fn attach(stack: &mut [UiNode], roots: &mut Vec<UiNode>, node: UiNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn node_from_attrs(raw: &str) -> UiNode {
    let attrs: HashMap<&str, String> = ATTR_RE
        .captures_iter(raw)
        .filter_map(|c| Some((c.get(1)?.as_str(), unescape(c.get(2)?.as_str()))))
        .collect();

    let flag = |name: &str| attrs.get(name).map(|v| v == "true").unwrap_or(false);
    let text = |name: &str| attrs.get(name).cloned().unwrap_or_default();

    let class_name = text("class");
    let editable = flag("editable") || class_name.ends_with("EditText");

    UiNode {
        resource_id: text("resource-id"),
        text: text("text"),
        content_description: text("content-desc"),
        bounds: attrs
            .get("bounds")
            .and_then(|b| parse_bounds(b))
            .unwrap_or_default(),
        clickable: flag("clickable"),
        editable,
        scrollable: flag("scrollable"),
        // Older dumps have no visibility attribute; everything dumped is on screen.
        visible_to_user: attrs
            .get("visible-to-user")
            .map(|v| v == "true")
            .unwrap_or(true),
        class_name,
        children: Vec::new(),
    }
}

/// Parse `[left,top][right,bottom]`.
pub fn parse_bounds(value: &str) -> Option<Bounds> {
    let caps = BOUNDS_RE.captures(value)?;
    let n = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i32>().ok());
    Some(Bounds::new(n(1)?, n(2)?, n(3)?, n(4)?))
}

fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#10;", "\n")
        .replace("&#13;", "\r")
        .replace("&amp;", "&")
}
