//! WASM bridge for the mind map DSL: exposes the core pipeline to the
//! canvas editor.
//!
//! Compiled via `wasm-pack build --target web`. Every export returns a
//! string (plain text or JSON) and never throws: input that is not a string
//! yields an empty result, and malformed JSON is logged to the console.

use mm_core::compile::CompileConfig;
use mm_core::diagnostics::Diagnostics;
use mm_core::model::SceneElement;
use mm_core::outline::Outline;
use mm_core::route::{NodeBox, UnsupportedMode};
use wasm_bindgen::prelude::*;

// ─── Setup ───────────────────────────────────────────────────────────────

/// Install the console logger and panic hook. `level` is a `log` level
/// name (`"warn"`, `"debug"`, ...); unknown names mean `warn`.
#[wasm_bindgen]
pub fn init(level: &str) {
    console_error_panic_hook_setup();
    let filter = level.parse().unwrap_or(log::LevelFilter::Warn);
    #[cfg(target_arch = "wasm32")]
    console_log::install(filter);
    log::set_max_level(filter);
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("mind map WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

/// `log` backend writing to the browser console.
#[cfg(target_arch = "wasm32")]
mod console_log {
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use wasm_bindgen::JsValue;

    struct ConsoleLogger;

    static LOGGER: ConsoleLogger = ConsoleLogger;

    impl Log for ConsoleLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if !self.enabled(record.metadata()) {
                return;
            }
            let msg = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
            match record.level() {
                Level::Error => web_sys::console::error_1(&msg),
                Level::Warn => web_sys::console::warn_1(&msg),
                Level::Info => web_sys::console::info_1(&msg),
                Level::Debug | Level::Trace => web_sys::console::debug_1(&msg),
            }
        }

        fn flush(&self) {}
    }

    pub fn install(filter: LevelFilter) {
        // A second call keeps the first logger; only the level changes.
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(filter);
    }
}

// ─── Exports ─────────────────────────────────────────────────────────────

/// Remove `//` comments from DSL source.
#[wasm_bindgen]
pub fn strip_comments(source: JsValue) -> String {
    strip_text(source.as_string().as_deref())
}

/// Compile DSL source to a JSON array of scene elements.
#[wasm_bindgen]
pub fn compile(source: JsValue) -> String {
    compile_json(source.as_string().as_deref())
}

/// Compile and report. Returns JSON
/// `{"ok":bool,"elements":[...],"diagnostics":[...]}`; `ok` is false when
/// anything was dropped.
#[wasm_bindgen]
pub fn validate(source: JsValue) -> String {
    validate_json(source.as_string().as_deref())
}

/// Serialize a JSON array of scene elements back to DSL text.
#[wasm_bindgen]
pub fn serialize(elements_json: &str) -> String {
    serialize_json(elements_json)
}

/// Route between two `{x, y, width, height}` boxes. Returns the route as
/// JSON, or `-1` when `mode` is not a routing mode.
#[wasm_bindgen]
pub fn route(a_json: &str, b_json: &str, mode: &str) -> String {
    route_json(a_json, b_json, mode)
}

/// Flatten a JSON outline tree into DSL text.
#[wasm_bindgen]
pub fn outline_to_dsl(outline_json: &str) -> String {
    outline_json_to_dsl(outline_json)
}

// ─── Implementations (native-testable) ───────────────────────────────────

fn strip_text(source: Option<&str>) -> String {
    source.map(mm_core::strip_comments).unwrap_or_default()
}

fn compile_json(source: Option<&str>) -> String {
    let Some(source) = source else {
        return "[]".to_string();
    };
    let elements = mm_core::compile_document(source);
    to_json(&elements).unwrap_or_else(|| "[]".to_string())
}

fn validate_json(source: Option<&str>) -> String {
    let (ok, report) = match source {
        Some(source) => {
            let report = mm_core::compile_report(source, &CompileConfig::default());
            (report.is_clean(), report)
        }
        None => {
            let mut diags = Diagnostics::new();
            diags.warn("", "source is not a string");
            let report = mm_core::CompileReport {
                elements: Vec::new(),
                diagnostics: diags.into_vec(),
            };
            (false, report)
        }
    };
    let value = serde_json::json!({
        "ok": ok,
        "elements": report.elements,
        "diagnostics": report.diagnostics,
    });
    value.to_string()
}

fn serialize_json(elements_json: &str) -> String {
    match serde_json::from_str::<Vec<SceneElement>>(elements_json) {
        Ok(elements) => mm_core::emit_document(&elements),
        Err(e) => {
            log::warn!("serialize: invalid scene JSON: {e}");
            String::new()
        }
    }
}

fn route_json(a_json: &str, b_json: &str, mode: &str) -> String {
    let boxes = serde_json::from_str::<NodeBox>(a_json)
        .and_then(|a| Ok((a, serde_json::from_str::<NodeBox>(b_json)?)));
    let (a, b) = match boxes {
        Ok(boxes) => boxes,
        Err(e) => {
            log::warn!("route: invalid box JSON: {e}");
            return "null".to_string();
        }
    };
    match mm_core::route(&a, &b, mode) {
        Ok(route) => to_json(&route).unwrap_or_else(|| "null".to_string()),
        Err(e) => {
            log::warn!("route: {e}");
            UnsupportedMode::sentinel().to_string()
        }
    }
}

fn outline_json_to_dsl(outline_json: &str) -> String {
    match Outline::from_json(outline_json) {
        Ok(outline) => mm_core::outline_to_dsl(&outline),
        Err(e) => {
            log::warn!("outline_to_dsl: {e}");
            String::new()
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Option<String> {
    serde_json::to_string(value)
        .map_err(|e| log::error!("serialization error: {e}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STACKED: &str = r#"
Node "a" { x: 0, y: 0, width: 100, height: 50 }; // top
Node "b" { x: 0, y: 200, width: 100, height: 50 };
Connection "c" { source: "a", target: "b" };
"#;

    #[test]
    fn non_string_input_yields_empty_results() {
        assert_eq!(strip_text(None), "");
        assert_eq!(compile_json(None), "[]");
        let v: serde_json::Value = serde_json::from_str(&validate_json(None)).unwrap();
        assert_eq!(v["ok"], false);
        assert_eq!(v["elements"], serde_json::json!([]));
    }

    #[test]
    fn strip_passes_through() {
        assert_eq!(strip_text(Some("a // b")), "a \n");
    }

    #[test]
    fn compile_returns_scene_json() {
        let v: serde_json::Value = serde_json::from_str(&compile_json(Some(STACKED))).unwrap();
        let elements = v.as_array().expect("array");
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[2]["element"], "arrow");
        assert_eq!(elements[2]["geometry"]["anchor"]["y"], 50.0);
    }

    #[test]
    fn validate_reports_dropped_connections() {
        let v: serde_json::Value = serde_json::from_str(&validate_json(Some(
            r#"Node "a" {}; Connection "c" { source: "a", target: "nope" };"#,
        )))
        .unwrap();
        assert_eq!(v["ok"], false);
        assert_eq!(v["elements"].as_array().map(Vec::len), Some(1));
        assert_eq!(v["diagnostics"][0]["severity"], "warning");
        assert_eq!(v["diagnostics"][0]["subject"], "c");
    }

    #[test]
    fn serialize_roundtrips_compile_output() {
        let json = compile_json(Some(STACKED));
        let dsl = serialize_json(&json);
        assert!(dsl.starts_with("Node \"a\" {"));
        assert!(dsl.contains("points: [[0,0],[0,150]],"));
        assert!(dsl.contains(r#"absoluteStart: {"x": 50, "y": 50},"#));
    }

    #[test]
    fn serialize_keeps_nan_geometry_as_nan() {
        let json = compile_json(Some(
            r#"Node "n" {}; Node "m" {}; Connection "c" { source: "n", target: "m" };"#,
        ));
        let dsl = serialize_json(&json);
        assert!(dsl.contains("  x: NaN,"));
        assert!(dsl.contains("  width: 300,"));
        assert!(dsl.contains("Connection \"c\" {"));
        assert!(dsl.contains("points: [[0,0],[NaN,NaN]],"));
    }

    #[test]
    fn serialize_rejects_invalid_json() {
        assert_eq!(serialize_json("not json"), "");
        assert_eq!(serialize_json("[]"), "");
    }

    #[test]
    fn route_modes() {
        let a = r#"{"x":0,"y":0,"width":100,"height":50}"#;
        let b = r#"{"x":0,"y":200,"width":100,"height":50}"#;
        let v: serde_json::Value = serde_json::from_str(&route_json(a, b, "radial")).unwrap();
        assert_eq!(v["points"], serde_json::json!([[0.0, 0.0], [0.0, 150.0]]));
        assert_eq!(v["farAnchor"]["y"], 200.0);

        let v: serde_json::Value = serde_json::from_str(&route_json(a, b, "vertical")).unwrap();
        assert!(v.get("farAnchor").is_none());

        assert_eq!(route_json(a, b, "sideways"), "-1");
        assert_eq!(route_json("{", b, "radial"), "null");
    }

    #[test]
    fn route_with_incomplete_boxes_yields_nan_geometry() {
        let b = r#"{"x":0,"y":200,"width":100,"height":50}"#;
        let v: serde_json::Value =
            serde_json::from_str(&route_json(r#"{"x":0,"y":0,"width":100}"#, b, "radial")).unwrap();
        assert_eq!(v["points"][0], serde_json::json!([0.0, 0.0]));
        assert!(v["anchor"]["x"].is_null());

        let v: serde_json::Value = serde_json::from_str(&route_json(
            r#"{"x":"abc","y":0,"width":100,"height":50}"#,
            b,
            "vertical",
        ))
        .unwrap();
        assert!(v["anchor"]["x"].is_null());
        assert_eq!(v["anchor"]["y"], 50.0);
    }

    #[test]
    fn outline_bridge() {
        let dsl = outline_json_to_dsl(r#"{"id":"r","label":"Root","children":[{"id":"k","label":"Kid"}]}"#);
        assert!(dsl.starts_with("Node \"r\" {"));
        assert!(dsl.contains("relation: \"Root\""));
        assert_eq!(outline_json_to_dsl("[]"), "");
    }
}
