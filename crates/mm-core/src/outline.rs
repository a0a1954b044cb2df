//! Outline tree → DSL.
//!
//! Turns a nested `{ id, label, children }` outline into `Node` statements
//! for every entry and a parent → child `Connection` for every edge. No
//! layout is done here: coordinates are only written when the outline
//! carries them.

use crate::emitter::quote;
use crate::id::{random_id, DEFAULT_ID_LENGTH};
use crate::parser::format_num;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub children: Vec<Outline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum OutlineError {
    #[error("invalid outline: {0}")]
    Json(#[from] serde_json::Error),
}

impl Outline {
    pub fn from_json(json: &str) -> Result<Self, OutlineError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Node appearance for generated statements. `width` and `height` apply
/// when the entry has no size of its own.
#[derive(Debug, Clone)]
pub struct OutlineStyle {
    pub background_color: String,
    pub border_color: String,
    pub text_color: String,
    pub width: f64,
    pub height: f64,
}

impl Default for OutlineStyle {
    fn default() -> Self {
        Self {
            background_color: "#3bc9db".to_string(),
            border_color: "#000000".to_string(),
            text_color: "#000000".to_string(),
            width: 240.0,
            height: 100.0,
        }
    }
}

pub fn outline_to_dsl(outline: &Outline) -> String {
    outline_to_dsl_with(outline, &OutlineStyle::default())
}

/// Nodes first (pre-order), then connections; each block newline-joined.
pub fn outline_to_dsl_with(outline: &Outline, style: &OutlineStyle) -> String {
    let mut nodes = Vec::new();
    let mut connections = Vec::new();
    collect(outline, style, &mut nodes, &mut connections);
    log::debug!(
        "outline produced {} nodes and {} connections",
        nodes.len(),
        connections.len()
    );

    let mut out = nodes.join("\n");
    if !connections.is_empty() {
        out.push('\n');
        out.push_str(&connections.join("\n"));
    }
    out
}

fn collect(
    entry: &Outline,
    style: &OutlineStyle,
    nodes: &mut Vec<String>,
    connections: &mut Vec<String>,
) {
    nodes.push(node_statement(entry, style));
    for child in &entry.children {
        collect(child, style, nodes, connections);
        connections.push(format!(
            "Connection {} {{ source: {}, target: {}, relation: {} }};",
            quote(&random_id(DEFAULT_ID_LENGTH)),
            quote(&entry.id),
            quote(&child.id),
            quote(&entry.label),
        ));
    }
}

fn node_statement(entry: &Outline, style: &OutlineStyle) -> String {
    let mut props = vec![
        format!("label: {}", quote(&entry.label)),
        format!("width: {}", format_num(entry.width.unwrap_or(style.width))),
        format!("height: {}", format_num(entry.height.unwrap_or(style.height))),
    ];
    if let Some(x) = entry.x {
        props.push(format!("x: {}", format_num(x)));
    }
    if let Some(y) = entry.y {
        props.push(format!("y: {}", format_num(y)));
    }
    props.push(format!("backgroundColor: {}", quote(&style.background_color)));
    props.push(format!("borderColor: {}", quote(&style.border_color)));
    props.push(format!("textColor: {}", quote(&style.text_color)));
    format!("Node {} {{ {} }};", quote(&entry.id), props.join(", "))
}
