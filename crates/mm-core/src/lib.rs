pub mod compile;
pub mod diagnostics;
pub mod emitter;
pub mod id;
pub mod model;
pub mod outline;
pub mod parser;
pub mod route;
pub mod strip;

pub use compile::{CompileConfig, CompileReport, compile, compile_document, compile_report};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use emitter::{EmitConfig, Emitted, emit_document, emit_document_with};
pub use id::PersistentIds;
pub use model::*;
pub use outline::{Outline, OutlineError, outline_to_dsl};
pub use parser::{PropertyValue, Record, Skip, StatementKind, parse_records};
pub use route::{NodeBox, Route, RoutingMode, UnsupportedMode, route, route_with};
pub use strip::strip_comments;
