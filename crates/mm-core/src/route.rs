//! Connector geometry between two rectangles.
//!
//! Given the bounding boxes of a source and a target node, compute where an
//! arrow starts (the anchor) and its path as offsets from that anchor.
//!
//! - **vertical**: bottom-center to top-center (or the reverse when the
//!   target is not strictly below).
//! - **horizontal**: right-middle to left-middle (or the reverse).
//! - **radial**: along the center line, cut at the inscribed circle of each
//!   box. Offsets are rounded to three decimals.
//!
//! All arithmetic is plain `f64`, so missing geometry (`NaN`) propagates
//! instead of failing.

use crate::model::{ArrowGeometry, Point, PointList};
use serde::{Deserialize, Serialize};
use smallvec::smallvec;
use std::fmt;
use std::str::FromStr;

/// Bounding box of a node, as consumed by the router.
///
/// Deserializing never fails on a field. A numeric string is parsed, and
/// anything else that is not a number (absent, `null`, text) reads as `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct NodeBox {
    #[serde(default = "nan", deserialize_with = "lenient_f64::deserialize")]
    pub x: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64::deserialize")]
    pub y: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64::deserialize")]
    pub width: f64,
    #[serde(default = "nan", deserialize_with = "lenient_f64::deserialize")]
    pub height: f64,
}

fn nan() -> f64 {
    f64::NAN
}

mod lenient_f64 {
    use serde::de::IgnoredAny;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Field {
        Number(f64),
        Text(String),
        Other(IgnoredAny),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(match Field::deserialize(deserializer)? {
            Field::Number(v) => v,
            Field::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
            Field::Other(_) => f64::NAN,
        })
    }
}

impl NodeBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Radius of the inscribed circle.
    fn radius(&self) -> f64 {
        js_min(self.width, self.height) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingMode {
    Vertical,
    Horizontal,
    #[default]
    Radial,
}

impl RoutingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutingMode::Vertical => "vertical",
            RoutingMode::Horizontal => "horizontal",
            RoutingMode::Radial => "radial",
        }
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingMode {
    type Err = UnsupportedMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vertical" => Ok(RoutingMode::Vertical),
            "horizontal" => Ok(RoutingMode::Horizontal),
            "radial" => Ok(RoutingMode::Radial),
            other => Err(UnsupportedMode(other.to_string())),
        }
    }
}

/// A routing mode name that is not vertical, horizontal or radial.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported routing mode `{0}`")]
pub struct UnsupportedMode(pub String);

impl UnsupportedMode {
    /// Numeric value the scripting bridge reports for this failure.
    pub const fn sentinel() -> i32 {
        -1
    }
}

/// A computed connector path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub anchor: Point,
    /// `[(0,0), far - anchor]`.
    pub points: PointList,
    /// Radial mode only: where the path ends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub far_anchor: Option<Point>,
}

impl From<Route> for ArrowGeometry {
    fn from(route: Route) -> Self {
        ArrowGeometry {
            anchor: route.anchor,
            points: route.points,
            far_anchor: route.far_anchor,
        }
    }
}

/// Route by mode name.
pub fn route(a: &NodeBox, b: &NodeBox, mode: &str) -> Result<Route, UnsupportedMode> {
    Ok(route_with(a, b, mode.parse()?))
}

pub fn route_with(a: &NodeBox, b: &NodeBox, mode: RoutingMode) -> Route {
    match mode {
        RoutingMode::Vertical => vertical(a, b),
        RoutingMode::Horizontal => horizontal(a, b),
        RoutingMode::Radial => radial(a, b),
    }
}

fn vertical(a: &NodeBox, b: &NodeBox) -> Route {
    let (anchor, far) = if a.y < b.y {
        (
            Point::new(a.x + a.width / 2.0, a.y + a.height),
            Point::new(b.x + b.width / 2.0, b.y),
        )
    } else {
        (
            Point::new(a.x + a.width / 2.0, a.y),
            Point::new(b.x + b.width / 2.0, b.y + b.height),
        )
    };
    straight(anchor, far)
}

fn horizontal(a: &NodeBox, b: &NodeBox) -> Route {
    let (anchor, far) = if a.x < b.x {
        (
            Point::new(a.x + a.width, a.y + a.height / 2.0),
            Point::new(b.x, b.y + b.height / 2.0),
        )
    } else {
        (
            Point::new(a.x, a.y + a.height / 2.0),
            Point::new(b.x + b.width, b.y + b.height / 2.0),
        )
    };
    straight(anchor, far)
}

fn straight(anchor: Point, far: Point) -> Route {
    Route {
        anchor,
        points: smallvec![[0.0, 0.0], [far.x - anchor.x, far.y - anchor.y]],
        far_anchor: None,
    }
}

fn radial(a: &NodeBox, b: &NodeBox) -> Route {
    let ca = a.center();
    let cb = b.center();
    let (dx, dy) = (cb.x - ca.x, cb.y - ca.y);
    let len = dx.hypot(dy);
    // Coincident centers: arbitrary but fixed direction.
    let (ux, uy) = if len == 0.0 { (1.0, 0.0) } else { (dx / len, dy / len) };

    let (ra, rb) = (a.radius(), b.radius());
    let anchor = Point::new(ca.x + ux * ra, ca.y + uy * ra);
    let far = Point::new(cb.x - ux * rb, cb.y - uy * rb);

    Route {
        anchor,
        points: smallvec![
            [0.0, 0.0],
            [round_to(far.x - anchor.x, 3), round_to(far.y - anchor.y, 3)]
        ],
        far_anchor: Some(far),
    }
}

/// `min` that propagates `NaN` like the scripting host does.
fn js_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
}

/// Round half toward +∞, as `Math.round` does.
pub fn js_round(v: f64) -> f64 {
    let floor = v.floor();
    if v - floor >= 0.5 { floor + 1.0 } else { floor }
}

/// Round to `digits` decimals with [`js_round`].
pub fn round_to(v: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    js_round(v * scale) / scale
}
