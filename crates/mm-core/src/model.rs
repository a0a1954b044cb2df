//! Renderer-facing scene elements.
//!
//! The compiler produces a flat, ordered `Vec<SceneElement>` and the emitter
//! consumes one. Field names (camelCase on the wire) are the contract with the
//! canvas editor, so renames here are breaking changes.
//!
//! Geometry that could not be read from the DSL is `NaN`. It serializes to
//! JSON `null` and reads back as `NaN`.

use crate::parser::PropertyValue;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Default label font size for shapes and arrows.
pub const DEFAULT_FONT_SIZE: f64 = 20.0;

/// Arrow point list; almost always `[(0,0), far]`.
pub type PointList = SmallVec<[[f64; 2]; 4]>;

// ─── Geometry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(deserialize_with = "nullable_f64::deserialize")]
    pub x: f64,
    #[serde(deserialize_with = "nullable_f64::deserialize")]
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    #[serde(deserialize_with = "nullable_f64::deserialize")]
    pub width: f64,
    #[serde(deserialize_with = "nullable_f64::deserialize")]
    pub height: f64,
}

/// `null` reads as `NaN`, mirroring how `NaN` is written.
mod nullable_f64 {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

mod nullable_points {
    use super::PointList;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PointList, D::Error> {
        let raw = Vec::<[Option<f64>; 2]>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|[x, y]| [x.unwrap_or(f64::NAN), y.unwrap_or(f64::NAN)])
            .collect())
    }
}

// ─── Shapes ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Diamond,
    Ellipse,
}

impl ShapeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Diamond => "diamond",
            ShapeKind::Ellipse => "ellipse",
        }
    }
}

impl FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rectangle" => Ok(ShapeKind::Rectangle),
            "diamond" => Ok(ShapeKind::Diamond),
            "ellipse" => Ok(ShapeKind::Ellipse),
            other => Err(format!("unknown shape type `{other}`")),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Corner rounding. Always present on a shape; `kind` is `None` when the
/// DSL value was missing or not an integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roundness {
    #[serde(rename = "type")]
    pub kind: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShapeStyle {
    pub background_color: Option<String>,
    pub stroke_color: Option<String>,
    pub stroke_style: Option<String>,
    pub fill_style: Option<String>,
    pub stroke_width: Option<f64>,
    pub roundness: Roundness,
}

/// Label carried inline by shapes and arrows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

impl Default for Label {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: DEFAULT_FONT_SIZE,
            text_color: None,
        }
    }
}

/// What kind of element is bound to a shape or arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundKind {
    Text,
    Arrow,
}

/// A reference from a container to an element drawn on or attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundElement {
    #[serde(rename = "type")]
    pub kind: BoundKind,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: String,
    pub kind: ShapeKind,
    pub position: Point,
    pub size: Size,
    #[serde(default)]
    pub style: ShapeStyle,
    #[serde(default)]
    pub label: Label,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bound_elements: Vec<BoundElement>,
    #[serde(default)]
    pub persistent_id: Option<String>,
}

// ─── Arrows ──────────────────────────────────────────────────────────────

/// Element ids of the arrow's bound start and end shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Endpoints {
    pub start_ref: Option<String>,
    pub end_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowGeometry {
    /// Absolute start of the path.
    pub anchor: Point,
    /// Offsets from `anchor`; the first entry is always `[0, 0]`.
    #[serde(deserialize_with = "nullable_points::deserialize")]
    pub points: PointList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub far_anchor: Option<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowStyle {
    #[serde(default)]
    pub stroke_color: Option<String>,
    pub stroke_style: String,
    pub start_arrowhead: String,
    pub end_arrowhead: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrow {
    pub id: String,
    #[serde(default)]
    pub endpoints: Endpoints,
    pub geometry: ArrowGeometry,
    pub style: ArrowStyle,
    #[serde(default)]
    pub label: Label,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bound_elements: Vec<BoundElement>,
    #[serde(default)]
    pub persistent_id: Option<String>,
}

// ─── Text ────────────────────────────────────────────────────────────────

/// Text position as written in the DSL. Values are not coerced to numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextPosition {
    pub x: Option<PropertyValue>,
    pub y: Option<PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub id: String,
    #[serde(default)]
    pub position: TextPosition,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
    /// Owning shape or arrow; owned text is not emitted on its own.
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub persistent_id: Option<String>,
}

// ─── Scene element ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "element", rename_all = "lowercase")]
pub enum SceneElement {
    Shape(Shape),
    Arrow(Arrow),
    Text(TextElement),
}

impl SceneElement {
    pub fn id(&self) -> &str {
        match self {
            SceneElement::Shape(s) => &s.id,
            SceneElement::Arrow(a) => &a.id,
            SceneElement::Text(t) => &t.id,
        }
    }

    pub fn persistent_id(&self) -> Option<&str> {
        match self {
            SceneElement::Shape(s) => s.persistent_id.as_deref(),
            SceneElement::Arrow(a) => a.persistent_id.as_deref(),
            SceneElement::Text(t) => t.persistent_id.as_deref(),
        }
    }

    pub fn set_persistent_id(&mut self, id: String) {
        let slot = match self {
            SceneElement::Shape(s) => &mut s.persistent_id,
            SceneElement::Arrow(a) => &mut a.persistent_id,
            SceneElement::Text(t) => &mut t.persistent_id,
        };
        *slot = Some(id);
    }

    /// Elements bound to this one (empty for text).
    pub fn bound_elements(&self) -> &[BoundElement] {
        match self {
            SceneElement::Shape(s) => &s.bound_elements,
            SceneElement::Arrow(a) => &a.bound_elements,
            SceneElement::Text(_) => &[],
        }
    }

    pub fn as_shape(&self) -> Option<&Shape> {
        match self {
            SceneElement::Shape(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_arrow(&self) -> Option<&Arrow> {
        match self {
            SceneElement::Arrow(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextElement> {
        match self {
            SceneElement::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// First element with the given element id.
pub fn find_element<'a>(elements: &'a [SceneElement], id: &str) -> Option<&'a SceneElement> {
    elements.iter().find(|e| e.id() == id)
}

/// The first bound text of `element` that resolves to a text element.
pub fn bound_text<'a>(
    elements: &'a [SceneElement],
    element: &SceneElement,
) -> Option<&'a TextElement> {
    let bound = element
        .bound_elements()
        .iter()
        .find(|b| b.kind == BoundKind::Text)?;
    find_element(elements, &bound.id).and_then(SceneElement::as_text)
}
