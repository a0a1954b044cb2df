//! DSL → scene compiler.
//!
//! Pipeline: [`strip_comments`] → [`parse_records`] → [`compile`]. Every stage
//! is infallible at the document level: bad statements, unknown references and
//! unroutable connections are dropped with a diagnostic and the rest of the
//! document still compiles.

use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::model::{
    Arrow, ArrowGeometry, ArrowStyle, Endpoints, Label, Point, Roundness, SceneElement, Shape,
    ShapeKind, ShapeStyle, Size, TextElement, TextPosition, DEFAULT_FONT_SIZE,
};
use crate::parser::{parse_records, PropertyValue, Record, StatementKind};
use crate::route::{route_with, NodeBox, RoutingMode};
use crate::strip::strip_comments;
use serde::Serialize;
use std::collections::HashMap;

// ─── Configuration ───────────────────────────────────────────────────────

/// Defaults applied when a statement leaves a property out.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Shape width when `width` is absent or not numeric.
    pub default_width: f64,
    /// Shape kind when `type` is absent or unknown.
    pub default_shape: ShapeKind,
    /// Label font size for shapes and arrows.
    pub default_font_size: f64,
    pub default_stroke_style: String,
    /// Used for both ends of an arrow.
    pub default_arrowhead: String,
    /// Mode for connections without explicit geometry or a `routing` key.
    pub routing: RoutingMode,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            default_width: 300.0,
            default_shape: ShapeKind::Ellipse,
            default_font_size: DEFAULT_FONT_SIZE,
            default_stroke_style: "dotted".to_string(),
            default_arrowhead: "dot".to_string(),
            routing: RoutingMode::Radial,
        }
    }
}

// ─── Entry points ────────────────────────────────────────────────────────

/// Compile DSL source with default settings.
pub fn compile_document(source: &str) -> Vec<SceneElement> {
    let mut diags = Diagnostics::new();
    compile_source(source, &CompileConfig::default(), &mut diags)
}

/// Elements plus everything that was skipped or defaulted on the way.
#[derive(Debug, Clone, Serialize)]
pub struct CompileReport {
    pub elements: Vec<SceneElement>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileReport {
    /// True when nothing was dropped. Informational notes don't count.
    pub fn is_clean(&self) -> bool {
        self.diagnostics
            .iter()
            .all(|d| d.severity != Severity::Warning)
    }
}

pub fn compile_report(source: &str, config: &CompileConfig) -> CompileReport {
    let mut diags = Diagnostics::new();
    let elements = compile_source(source, config, &mut diags);
    CompileReport {
        elements,
        diagnostics: diags.into_vec(),
    }
}

/// Strip, parse and compile `source`.
pub fn compile_source(
    source: &str,
    config: &CompileConfig,
    diags: &mut Diagnostics,
) -> Vec<SceneElement> {
    let stripped = strip_comments(source);
    let records = parse_records(&stripped, diags);
    compile(&records, config, diags)
}

/// Map parsed records to scene elements, in document order.
///
/// Node geometry is indexed before any connection is resolved, so a
/// connection may refer to a node declared after it. When identifiers
/// repeat, the last node declaration is the one connections see.
pub fn compile(
    records: &[Record],
    config: &CompileConfig,
    diags: &mut Diagnostics,
) -> Vec<SceneElement> {
    let nodes: HashMap<&str, &Record> = records
        .iter()
        .filter(|r| r.kind == StatementKind::Node)
        .map(|r| (r.ident.as_str(), r))
        .collect();

    let mut elements = Vec::with_capacity(records.len());
    for record in records {
        let element = match record.kind {
            StatementKind::Node => Some(SceneElement::Shape(map_node(record, config, diags))),
            StatementKind::Text => Some(SceneElement::Text(map_text(record))),
            StatementKind::Connection => {
                map_connection(record, &nodes, config, diags).map(SceneElement::Arrow)
            }
        };
        elements.extend(element);
    }
    log::debug!(
        "compiled {} of {} records into scene elements",
        elements.len(),
        records.len()
    );
    elements
}

// ─── Nodes ───────────────────────────────────────────────────────────────

fn map_node(record: &Record, config: &CompileConfig, diags: &mut Diagnostics) -> Shape {
    let kind = match record.text("type") {
        None => config.default_shape,
        Some(name) => name.parse::<ShapeKind>().unwrap_or_else(|_| {
            diags.info(
                &record.ident,
                format!("unknown shape type `{name}`, using {}", config.default_shape),
            );
            config.default_shape
        }),
    };

    let geometry = node_box(record, config);
    Shape {
        id: record.ident.clone(),
        kind,
        position: Point::new(geometry.x, geometry.y),
        size: Size {
            width: geometry.width,
            height: geometry.height,
        },
        style: ShapeStyle {
            background_color: record.text("backgroundColor"),
            stroke_color: record.text("borderColor"),
            stroke_style: record.text("borderStyle"),
            fill_style: record.text("backgroundStyle"),
            stroke_width: record.number("borderWidth"),
            roundness: Roundness {
                kind: record.get("roundness").and_then(PropertyValue::as_integer),
            },
        },
        label: Label {
            text: record.text("label").unwrap_or_default(),
            font_size: record.number("fontSize").unwrap_or(config.default_font_size),
            text_color: record.text("textColor"),
        },
        bound_elements: Vec::new(),
        persistent_id: Some(record.ident.clone()),
    }
}

/// Bounding box of a node record with defaults applied; missing
/// coordinates are `NaN`.
fn node_box(record: &Record, config: &CompileConfig) -> NodeBox {
    NodeBox::new(
        record.number("x").unwrap_or(f64::NAN),
        record.number("y").unwrap_or(f64::NAN),
        record
            .number("width")
            .filter(|w| !w.is_nan())
            .unwrap_or(config.default_width),
        record.number("height").unwrap_or(f64::NAN),
    )
}

// ─── Text ────────────────────────────────────────────────────────────────

fn map_text(record: &Record) -> TextElement {
    TextElement {
        id: record.ident.clone(),
        position: TextPosition {
            x: record.get("x").cloned(),
            y: record.get("y").cloned(),
        },
        content: record.text("text").unwrap_or_default(),
        font_size: record.number("fontSize"),
        color: record.text("color"),
        container_id: None,
        persistent_id: Some(record.ident.clone()),
    }
}

// ─── Connections ─────────────────────────────────────────────────────────

fn map_connection(
    record: &Record,
    nodes: &HashMap<&str, &Record>,
    config: &CompileConfig,
    diags: &mut Diagnostics,
) -> Option<Arrow> {
    let source = resolve_endpoint(record, "source", nodes, diags)?;
    let target = resolve_endpoint(record, "target", nodes, diags)?;

    let geometry = match explicit_geometry(record) {
        Some(geometry) => geometry,
        None => {
            let mode = match record.text("routing") {
                None => config.routing,
                Some(name) => match name.parse::<RoutingMode>() {
                    Ok(mode) => mode,
                    Err(err) => {
                        diags.warn(&record.ident, format!("connection dropped: {err}"));
                        return None;
                    }
                },
            };
            route_with(&node_box(source, config), &node_box(target, config), mode).into()
        }
    };

    Some(Arrow {
        id: record.ident.clone(),
        endpoints: Endpoints {
            start_ref: Some(source.ident.clone()),
            end_ref: Some(target.ident.clone()),
        },
        geometry,
        style: ArrowStyle {
            stroke_color: record.text("arrowColor"),
            stroke_style: record
                .text("arrowStyle")
                .unwrap_or_else(|| config.default_stroke_style.clone()),
            start_arrowhead: record
                .text("startArrowhead")
                .unwrap_or_else(|| config.default_arrowhead.clone()),
            end_arrowhead: record
                .text("endArrowhead")
                .unwrap_or_else(|| config.default_arrowhead.clone()),
        },
        label: Label {
            text: record.text("relation").unwrap_or_default(),
            font_size: record.number("fontSize").unwrap_or(config.default_font_size),
            text_color: None,
        },
        bound_elements: Vec::new(),
        persistent_id: Some(record.ident.clone()),
    })
}

fn resolve_endpoint<'r>(
    record: &Record,
    key: &str,
    nodes: &HashMap<&str, &'r Record>,
    diags: &mut Diagnostics,
) -> Option<&'r Record> {
    let Some(ident) = record.text(key) else {
        diags.warn(&record.ident, format!("connection has no {key}"));
        return None;
    };
    let found = nodes.get(ident.as_str()).copied();
    if found.is_none() {
        diags.warn(&record.ident, format!("{key} node `{ident}` not found"));
    }
    found
}

/// Geometry written out in the statement: non-empty `points` plus
/// `absoluteStart`. Points are re-based so the first one is the origin.
fn explicit_geometry(record: &Record) -> Option<ArrowGeometry> {
    let Some(PropertyValue::Points(points)) = record.get("points") else {
        return None;
    };
    let Some(&PropertyValue::Position { x, y }) = record.get("absoluteStart") else {
        return None;
    };
    let [fx, fy] = *points.first()?;
    Some(ArrowGeometry {
        anchor: Point::new(x + fx, y + fy),
        points: points.iter().map(|[px, py]| [px - fx, py - fy]).collect(),
        far_anchor: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn only_shape(elements: &[SceneElement]) -> &Shape {
        assert_eq!(elements.len(), 1);
        elements[0].as_shape().expect("shape")
    }

    #[test]
    fn node_defaults() {
        let elements = compile_document(r#"Node "n" {}"#);
        let shape = only_shape(&elements);
        assert_eq!(shape.kind, ShapeKind::Ellipse);
        assert_eq!(shape.size.width, 300.0);
        assert!(shape.size.height.is_nan());
        assert!(shape.position.x.is_nan());
        assert_eq!(shape.label.text, "");
        assert_eq!(shape.label.font_size, 20.0);
        assert_eq!(shape.style.roundness, Roundness { kind: None });
        assert_eq!(shape.persistent_id.as_deref(), Some("n"));
    }

    #[test]
    fn node_properties_map_to_style() {
        let elements = compile_document(
            r##"Node "n" {
                type: "rectangle", x: 10, y: "20", width: 200, height: 100,
                roundness: 3, backgroundColor: "#ffaaaa", borderColor: "#111",
                borderStyle: "dashed", backgroundStyle: "solid", borderWidth: 2,
                label: "Root", fontSize: 24, textColor: "#222"
            };"##,
        );
        let shape = only_shape(&elements);
        assert_eq!(shape.kind, ShapeKind::Rectangle);
        assert_eq!(shape.position, Point::new(10.0, 20.0));
        assert_eq!(shape.style.roundness.kind, Some(3));
        assert_eq!(shape.style.background_color.as_deref(), Some("#ffaaaa"));
        assert_eq!(shape.style.stroke_color.as_deref(), Some("#111"));
        assert_eq!(shape.style.stroke_style.as_deref(), Some("dashed"));
        assert_eq!(shape.style.fill_style.as_deref(), Some("solid"));
        assert_eq!(shape.style.stroke_width, Some(2.0));
        assert_eq!(shape.label.text, "Root");
        assert_eq!(shape.label.font_size, 24.0);
        assert_eq!(shape.label.text_color.as_deref(), Some("#222"));
    }

    #[test]
    fn unknown_shape_type_falls_back_with_note() {
        let report = compile_report(r#"Node "n" { type: "hexagon" }"#, &CompileConfig::default());
        assert_eq!(only_shape(&report.elements).kind, ShapeKind::Ellipse);
        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.is_clean());
    }

    #[test]
    fn text_keeps_raw_position() {
        let elements = compile_document(r##"Text "t" { text: "Hi", x: "100", y: 200, color: "#999" }"##);
        let text = elements[0].as_text().expect("text");
        assert_eq!(text.content, "Hi");
        assert_eq!(text.position.x, Some(PropertyValue::Str("100".into())));
        assert_eq!(text.position.y, Some(PropertyValue::Number(200.0)));
        assert_eq!(text.font_size, None);
        assert_eq!(text.color.as_deref(), Some("#999"));
    }

    #[test]
    fn connection_routes_radially_by_default() {
        let elements = compile_document(
            r#"Node "a" { x: 0, y: 0, width: 100, height: 50 };
               Node "b" { x: 0, y: 200, width: 100, height: 50 };
               Connection "c" { source: "a", target: "b" };"#,
        );
        assert_eq!(elements.len(), 3);
        let arrow = elements[2].as_arrow().expect("arrow");
        assert_eq!(arrow.geometry.anchor, Point::new(50.0, 50.0));
        assert_eq!(arrow.geometry.points.to_vec(), vec![[0.0, 0.0], [0.0, 150.0]]);
        assert_eq!(arrow.endpoints.start_ref.as_deref(), Some("a"));
        assert_eq!(arrow.endpoints.end_ref.as_deref(), Some("b"));
        assert_eq!(arrow.style.stroke_style, "dotted");
        assert_eq!(arrow.style.start_arrowhead, "dot");
        assert_eq!(arrow.style.end_arrowhead, "dot");
        assert_eq!(arrow.label, Label::default());
    }

    #[test]
    fn forward_references_resolve() {
        let elements = compile_document(
            r#"Connection "c" { source: "a", target: "b", routing: "vertical" };
               Node "a" { x: 0, y: 0, width: 100, height: 50 };
               Node "b" { x: 0, y: 200, width: 100, height: 50 };"#,
        );
        let arrow = elements[0].as_arrow().expect("arrow");
        assert_eq!(arrow.geometry.far_anchor, None);
        assert_eq!(arrow.geometry.points[1], [0.0, 150.0]);
    }

    #[test]
    fn last_node_declaration_wins() {
        let elements = compile_document(
            r#"Node "a" { x: 0, y: 0, width: 100, height: 50 };
               Node "a" { x: 0, y: 100, width: 100, height: 50 };
               Node "b" { x: 0, y: 200, width: 100, height: 50 };
               Connection "c" { source: "a", target: "b", routing: "vertical" };"#,
        );
        assert_eq!(elements.len(), 4);
        let arrow = elements[3].as_arrow().expect("arrow");
        assert_eq!(arrow.geometry.anchor, Point::new(50.0, 150.0));
    }

    #[test]
    fn explicit_geometry_is_rebased() {
        let elements = compile_document(
            r#"Node "a" {}; Node "b" {};
               Connection "c" { source: "a", target: "b",
                 points: [[10,10],[20,40]], absoluteStart: {"x": 5, "y": 5} };"#,
        );
        let arrow = elements[2].as_arrow().expect("arrow");
        assert_eq!(arrow.geometry.anchor, Point::new(15.0, 15.0));
        assert_eq!(arrow.geometry.points.to_vec(), vec![[0.0, 0.0], [10.0, 30.0]]);
        // Radial routing would have set a far anchor.
        assert_eq!(arrow.geometry.far_anchor, None);
    }

    #[test]
    fn partial_explicit_geometry_is_routed() {
        let elements = compile_document(
            r#"Node "a" { x: 0, y: 0, width: 100, height: 50 };
               Node "b" { x: 0, y: 200, width: 100, height: 50 };
               Connection "c" { source: "a", target: "b", points: [[0,0],[1,1]] };"#,
        );
        let arrow = elements[2].as_arrow().expect("arrow");
        assert_eq!(arrow.geometry.points[1], [0.0, 150.0]);
    }

    #[test]
    fn missing_target_drops_connection() {
        let report = compile_report(
            r#"Node "a" {}; Connection "c" { source: "a", target: "missing" };"#,
            &CompileConfig::default(),
        );
        assert_eq!(report.elements.len(), 1);
        assert!(!report.is_clean());
        assert_eq!(report.diagnostics[0].subject, "c");
    }

    #[test]
    fn unsupported_routing_drops_connection() {
        let report = compile_report(
            r#"Node "a" {}; Node "b" {};
               Connection "c" { source: "a", target: "b", routing: "zigzag" };"#,
            &CompileConfig::default(),
        );
        assert_eq!(report.elements.len(), 2);
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn configured_routing_applies() {
        let config = CompileConfig {
            routing: RoutingMode::Horizontal,
            ..CompileConfig::default()
        };
        let mut diags = Diagnostics::new();
        let elements = compile_source(
            r#"Node "a" { x: 0, y: 0, width: 100, height: 50 };
               Node "b" { x: 300, y: 0, width: 100, height: 50 };
               Connection "c" { source: "a", target: "b" };"#,
            &config,
            &mut diags,
        );
        let arrow = elements[2].as_arrow().expect("arrow");
        assert_eq!(arrow.geometry.anchor, Point::new(100.0, 25.0));
        assert!(diags.is_empty());
    }

    #[test]
    fn empty_and_comment_only_documents() {
        assert!(compile_document("").is_empty());
        assert!(compile_document("// nothing here\n").is_empty());
    }
}
