//! Scene → DSL emitter.
//!
//! Produces one statement per emittable element, in input order:
//!
//! ```text
//! Node "root" {
//!   label: "Ideas",
//!   type: "ellipse",
//!   ...
//! };
//! ```
//!
//! Statements are separated by a blank line. Text owned by a container and
//! arrows whose endpoints cannot be resolved are left out.

use crate::diagnostics::Diagnostics;
use crate::id::{PersistentIds, DEFAULT_ID_LENGTH};
use crate::model::{bound_text, find_element, Arrow, SceneElement, Shape, TextElement};
use crate::parser::{format_num, PropertyValue};
use crate::route::round_to;
use std::fmt::Write;

/// Settings for [`emit_document_with`].
#[derive(Debug, Clone)]
pub struct EmitConfig {
    /// Length of generated persistent ids.
    pub id_length: usize,
    /// Decimal places kept for arrow points.
    pub point_precision: i32,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            id_length: DEFAULT_ID_LENGTH,
            point_precision: 2,
        }
    }
}

/// Emitted text plus the persistent ids used for it.
#[derive(Debug, Clone)]
pub struct Emitted {
    pub text: String,
    pub ids: PersistentIds,
}

/// Serialize `elements` with default settings.
pub fn emit_document(elements: &[SceneElement]) -> String {
    let mut diags = Diagnostics::new();
    emit_document_with(elements, &EmitConfig::default(), &mut diags).text
}

pub fn emit_document_with(
    elements: &[SceneElement],
    config: &EmitConfig,
    diags: &mut Diagnostics,
) -> Emitted {
    let ids = PersistentIds::assign(elements, config.id_length);
    let emitter = Emitter {
        elements,
        ids: &ids,
        config,
    };

    let mut statements = Vec::with_capacity(elements.len());
    for element in elements {
        let statement = match element {
            SceneElement::Shape(shape) => Some(emitter.node(element, shape, diags)),
            SceneElement::Text(text) if text.container_id.is_some() => None,
            SceneElement::Text(text) => Some(emitter.text(text)),
            SceneElement::Arrow(arrow) => emitter.connection(element, arrow, diags),
        };
        statements.extend(statement);
    }
    log::debug!(
        "emitted {} statements for {} elements",
        statements.len(),
        elements.len()
    );

    Emitted {
        text: statements.join("\n"),
        ids,
    }
}

// ─── Statement builder ───────────────────────────────────────────────────

/// One `Kind "id" { ... };` statement under construction.
struct Statement {
    out: String,
}

impl Statement {
    fn new(keyword: &str, ident: &str) -> Self {
        let mut out = String::new();
        let _ = writeln!(out, "{keyword} {} {{", quote(ident));
        Self { out }
    }

    fn raw(&mut self, key: &str, value: &str) -> &mut Self {
        let _ = writeln!(self.out, "  {key}: {value},");
        self
    }

    fn string(&mut self, key: &str, value: &str) -> &mut Self {
        self.raw(key, &quote(value))
    }

    fn number(&mut self, key: &str, value: f64) -> &mut Self {
        self.raw(key, &format_num(value))
    }

    fn opt_string(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => self.string(key, v),
            None => self,
        }
    }

    fn opt_number(&mut self, key: &str, value: Option<f64>) -> &mut Self {
        match value {
            Some(v) => self.number(key, v),
            None => self,
        }
    }

    fn finish(&mut self) -> String {
        self.out.push_str("};\n");
        std::mem::take(&mut self.out)
    }
}

/// Double-quote `s`, escaping backslashes and embedded quotes.
pub(crate) fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Literal form of a pass-through property value.
fn literal(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Number(n) => format_num(*n),
        PropertyValue::Str(s) => quote(s),
        PropertyValue::Raw(s) => s.clone(),
        PropertyValue::Points(points) => points_literal(points.iter().copied()),
        PropertyValue::Position { x, y } => position_literal(*x, *y),
    }
}

fn points_literal(points: impl Iterator<Item = [f64; 2]>) -> String {
    let inner: Vec<String> = points
        .map(|[x, y]| format!("[{},{}]", format_num(x), format_num(y)))
        .collect();
    format!("[{}]", inner.join(","))
}

/// Keys are quoted: a bare `, y:` would start a new assignment.
fn position_literal(x: f64, y: f64) -> String {
    format!("{{\"x\": {}, \"y\": {}}}", format_num(x), format_num(y))
}

// ─── Emitter ─────────────────────────────────────────────────────────────

struct Emitter<'a> {
    elements: &'a [SceneElement],
    ids: &'a PersistentIds,
    config: &'a EmitConfig,
}

impl Emitter<'_> {
    fn pid<'e>(&'e self, element: &'e SceneElement) -> &'e str {
        self.ids.get(element.id()).unwrap_or(element.id())
    }

    fn node(&self, element: &SceneElement, shape: &Shape, diags: &mut Diagnostics) -> String {
        let (label, font_size, text_color) = match bound_text(self.elements, element) {
            Some(text) => (
                text.content.as_str(),
                text.font_size.unwrap_or(shape.label.font_size),
                text.color.as_deref().or(shape.label.text_color.as_deref()),
            ),
            None => {
                diags.info(&shape.id, "no bound label text, using inline label");
                (
                    shape.label.text.as_str(),
                    shape.label.font_size,
                    shape.label.text_color.as_deref(),
                )
            }
        };

        let style = &shape.style;
        Statement::new("Node", self.pid(element))
            .string("label", label)
            .string("type", shape.kind.as_str())
            .number("height", shape.size.height)
            .number("width", shape.size.width)
            .number("x", shape.position.x)
            .number("y", shape.position.y)
            .opt_number("roundness", style.roundness.kind.map(|r| r as f64))
            .opt_string("backgroundColor", style.background_color.as_deref())
            .opt_string("borderColor", style.stroke_color.as_deref())
            .opt_string("borderStyle", style.stroke_style.as_deref())
            .opt_string("backgroundStyle", style.fill_style.as_deref())
            .opt_number("borderWidth", style.stroke_width)
            .opt_string("textColor", text_color)
            .number("fontSize", font_size)
            .finish()
    }

    fn text(&self, text: &TextElement) -> String {
        let pid = self.ids.get(&text.id).unwrap_or(&text.id);
        let mut statement = Statement::new("Text", pid);
        statement.string("type", "text").string("text", &text.content);
        if let Some(x) = &text.position.x {
            statement.raw("x", &literal(x));
        }
        if let Some(y) = &text.position.y {
            statement.raw("y", &literal(y));
        }
        statement
            .opt_number("fontSize", text.font_size)
            .opt_string("color", text.color.as_deref())
            .finish()
    }

    fn connection(
        &self,
        element: &SceneElement,
        arrow: &Arrow,
        diags: &mut Diagnostics,
    ) -> Option<String> {
        let source = self.endpoint(arrow, arrow.endpoints.start_ref.as_deref(), "start", diags)?;
        let target = self.endpoint(arrow, arrow.endpoints.end_ref.as_deref(), "end", diags)?;

        let (relation, font_size) = match bound_text(self.elements, element) {
            Some(text) => (
                text.content.as_str(),
                text.font_size.unwrap_or(arrow.label.font_size),
            ),
            None => (arrow.label.text.as_str(), arrow.label.font_size),
        };

        let precision = self.config.point_precision;
        let points = arrow
            .geometry
            .points
            .iter()
            .map(|[x, y]| [round_to(*x, precision), round_to(*y, precision)]);
        let anchor = arrow.geometry.anchor;

        Some(
            Statement::new("Connection", self.pid(element))
                .string("source", source)
                .string("target", target)
                .string("relation", relation)
                .opt_string("arrowColor", arrow.style.stroke_color.as_deref())
                .string("arrowStyle", &arrow.style.stroke_style)
                .string("startArrowhead", &arrow.style.start_arrowhead)
                .string("endArrowhead", &arrow.style.end_arrowhead)
                .number("fontSize", font_size)
                .raw("points", &points_literal(points))
                .raw("absoluteStart", &position_literal(anchor.x, anchor.y))
                .finish(),
        )
    }

    /// Persistent id of an arrow endpoint, or a warning explaining why
    /// the arrow is skipped.
    fn endpoint(
        &self,
        arrow: &Arrow,
        binding: Option<&str>,
        end: &str,
        diags: &mut Diagnostics,
    ) -> Option<&str> {
        let Some(element_id) = binding else {
            diags.warn(&arrow.id, format!("arrow skipped: no {end} binding"));
            return None;
        };
        let Some(element) = find_element(self.elements, element_id) else {
            diags.warn(
                &arrow.id,
                format!("arrow skipped: {end} element `{element_id}` not found"),
            );
            return None;
        };
        Some(self.pid(element))
    }
}
