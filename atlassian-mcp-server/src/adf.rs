//! Atlassian Document Format (ADF) helpers
//!
//! Jira Cloud returns descriptions and comment bodies as ADF trees. Tools
//! flatten them into plain text with [`extract_text`] and wrap outgoing text
//! with [`paragraph_document`].

use serde_json::{json, Value};

/// Node kinds that affect text extraction. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Text,
    Block,
    List,
    HardBreak,
    Other,
}

impl NodeKind {
    fn of(node: &Value) -> Self {
        match node.get("type").and_then(Value::as_str) {
            Some("text") => NodeKind::Text,
            Some("paragraph" | "listItem" | "tableCell" | "tableHeader") => NodeKind::Block,
            Some("bulletList" | "orderedList") => NodeKind::List,
            Some("hardBreak") => NodeKind::HardBreak,
            _ => NodeKind::Other,
        }
    }
}

/// Extract plain text from an ADF value.
///
/// Absent or null input yields an empty string, a plain string is returned
/// unchanged, and anything that is not an object yields an empty string.
/// Only the outermost result is trimmed.
pub fn extract_text(adf: &Value) -> String {
    match adf {
        Value::String(text) => text.clone(),
        Value::Object(_) => {
            let mut out = String::new();
            visit(adf, &mut out);
            out.trim().to_string()
        }
        _ => String::new(),
    }
}

/// Same as [`extract_text`] for an optional field
pub fn extract_optional(adf: Option<&Value>) -> String {
    adf.map(extract_text).unwrap_or_default()
}

fn visit_children(node: &Value, out: &mut String) {
    if let Some(children) = node.get("content").and_then(Value::as_array) {
        for child in children {
            visit(child, out);
        }
    }
}

fn visit(node: &Value, out: &mut String) {
    match NodeKind::of(node) {
        NodeKind::Text => {
            out.push_str(node.get("text").and_then(Value::as_str).unwrap_or_default());
        }
        NodeKind::Block => {
            visit_children(node, out);
            out.push('\n');
        }
        NodeKind::List => visit_children(node, out),
        NodeKind::HardBreak => out.push('\n'),
        NodeKind::Other => visit_children(node, out),
    }
}

/// Wrap plain text into a single-paragraph ADF document
pub fn paragraph_document(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{
            "type": "paragraph",
            "content": [{"type": "text", "text": text}]
        }]
    })
}
