//! Record parser for the mind map DSL.
//!
//! Splits comment-free source into `;`-delimited statements and decodes each
//! one into a [`Record`]: a kind keyword, a quoted identifier, and a map of
//! decoded properties. Parsing never aborts a document: a malformed statement
//! becomes a [`Skip`], and a malformed value degrades to [`PropertyValue::Raw`].
//!
//! ```text
//! Node "root" { label: "Ideas", x: 0, y: 0, width: 240, height: 100 };
//! Connection "c1" { source: "root", target: "leaf", points: [[0,0],[0,150]] };
//! ```

use crate::diagnostics::Diagnostics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use winnow::ascii::{digit0, digit1, float, multispace0};
use winnow::combinator::{alt, delimited, opt};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_while};

// ─── Records ─────────────────────────────────────────────────────────────

/// The statement keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Node,
    Connection,
    Text,
}

impl StatementKind {
    pub fn keyword(self) -> &'static str {
        match self {
            StatementKind::Node => "Node",
            StatementKind::Connection => "Connection",
            StatementKind::Text => "Text",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Property keys are case-sensitive; order is not preserved.
pub type PropertyMap = HashMap<String, PropertyValue>;

/// One successfully parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub kind: StatementKind,
    pub ident: String,
    pub props: PropertyMap,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.props.get(key)
    }

    /// Property as text, if it has a textual or numeric form.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(PropertyValue::to_text)
    }

    /// Property as a float, `parseFloat`-style (leading numeric prefix).
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PropertyValue::as_number)
    }
}

/// Why a statement was skipped. The whole statement is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Skip {
    #[error("statement does not start with Node, Connection or Text")]
    UnknownKind,
    #[error("{0} statement has no quoted identifier")]
    MissingIdentifier(StatementKind),
    #[error("{kind} \"{ident}\" has no {{ }} property block")]
    MissingPropertyBlock { kind: StatementKind, ident: String },
}

// ─── Decoded values ──────────────────────────────────────────────────────

/// A decoded property value.
///
/// Serializes untagged, so a value passed through to the scene keeps its
/// natural JSON shape (number, string, array, object).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// A bare numeric token.
    Number(f64),
    /// A double-quoted string, quotes removed.
    Str(String),
    /// A `[[x, y], ...]` list (only for `points`).
    Points(Vec<[f64; 2]>),
    /// An `{x, y}` record (only for `absoluteStart`).
    Position { x: f64, y: f64 },
    /// The trimmed source text, when nothing more specific applied.
    Raw(String),
}

impl PropertyValue {
    /// Numeric view with `parseFloat` semantics: strings contribute their
    /// leading numeric prefix, structured values have none.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::Str(s) | PropertyValue::Raw(s) => parse_float_prefix(s),
            PropertyValue::Points(_) | PropertyValue::Position { .. } => None,
        }
    }

    /// Integer view with `parseInt` semantics.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            PropertyValue::Number(_) => None,
            PropertyValue::Str(s) | PropertyValue::Raw(s) => parse_int_prefix(s),
            PropertyValue::Points(_) | PropertyValue::Position { .. } => None,
        }
    }

    /// Textual view. Numbers render in their shortest form.
    pub fn to_text(&self) -> Option<String> {
        match self {
            PropertyValue::Number(n) => Some(format_num(*n)),
            PropertyValue::Str(s) | PropertyValue::Raw(s) => Some(s.clone()),
            PropertyValue::Points(_) | PropertyValue::Position { .. } => None,
        }
    }
}

/// Format a number without a trailing `.0` for integral values.
pub fn format_num(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ─── Document-level splitting ────────────────────────────────────────────

/// Parse every statement of a comment-free document, skipping bad ones.
///
/// Whitespace-only segments (e.g. after the final `;`) are ignored silently;
/// every other failure is reported to `diags`.
pub fn parse_records(source: &str, diags: &mut Diagnostics) -> Vec<Record> {
    let mut records = Vec::new();
    for statement in split_statements(source) {
        if statement.trim().is_empty() {
            continue;
        }
        match parse_statement(statement) {
            Ok(record) => {
                log::trace!("parsed {} \"{}\"", record.kind, record.ident);
                records.push(record);
            }
            Err(skip) => diags.warn(&statement_subject(statement), skip.to_string()),
        }
    }
    records
}

/// Split on `;` outside double-quoted strings.
pub fn split_statements(source: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in source.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            ';' if !in_string => {
                out.push(&source[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&source[start..]);
    out
}

/// A short label for a statement that failed before its identifier was known.
fn statement_subject(statement: &str) -> String {
    statement
        .trim()
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(40)
        .collect()
}

// ─── Statement parser ────────────────────────────────────────────────────

/// Parse one statement (without its terminating `;`).
///
/// Kind, identifier and property block are all-or-nothing; individual
/// property assignments degrade per field.
pub fn parse_statement(text: &str) -> Result<Record, Skip> {
    let mut rest = text;

    let kind = parse_kind(&mut rest).map_err(|_| Skip::UnknownKind)?;

    let ident = parse_ident(&mut rest)
        .ok()
        .filter(|id| !id.is_empty())
        .map(unescape)
        .ok_or(Skip::MissingIdentifier(kind))?;

    let Some(block) = property_block(text) else {
        return Err(Skip::MissingPropertyBlock { kind, ident });
    };

    Ok(Record {
        kind,
        ident,
        props: parse_properties(block),
    })
}

fn parse_kind(input: &mut &str) -> ModalResult<StatementKind> {
    let _: &str = multispace0.parse_next(input)?;
    let kind = alt((
        "Node".value(StatementKind::Node),
        "Connection".value(StatementKind::Connection),
        "Text".value(StatementKind::Text),
    ))
    .parse_next(input)?;
    // Word boundary: `Nodes` is not `Node`.
    if input.starts_with(is_ident_char) {
        return Err(winnow::error::ErrMode::Backtrack(ContextError::new()));
    }
    Ok(kind)
}

fn parse_ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let _: &str = multispace0.parse_next(input)?;
    parse_quoted_string.parse_next(input)
}

fn parse_quoted_string<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    delimited('"', take_till(0.., '"'), '"').parse_next(input)
}

fn parse_identifier<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., is_ident_char).parse_next(input)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Content between the first `{` and the last `}`.
fn property_block(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let close = text.rfind('}')?;
    (close > open).then(|| &text[open + 1..close])
}

// ─── Property assignments ────────────────────────────────────────────────

fn parse_properties(block: &str) -> PropertyMap {
    let mut props = PropertyMap::new();
    for assignment in split_assignments(block) {
        let Some((key, value)) = assignment.split_once(':') else {
            if !assignment.trim().is_empty() {
                log::debug!("dropping assignment without a colon: {}", assignment.trim());
            }
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = value.strip_suffix(',').unwrap_or(value).trim();
        props.insert(key.to_string(), decode_value(key, value));
    }
    props
}

/// Split a property block on commas that begin a new `key:` assignment,
/// so commas inside `[[0,0],[1,1]]` or `"a, b"` stay with their value.
pub fn split_assignments(block: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in block.char_indices() {
        if c == ',' && starts_assignment(&block[i + 1..]) {
            out.push(&block[start..i]);
            start = i + 1;
        }
    }
    out.push(&block[start..]);
    out
}

fn starts_assignment(rest: &str) -> bool {
    let mut input = rest;
    assignment_head(&mut input).is_ok()
}

/// `\s* ident \s* :`
fn assignment_head(input: &mut &str) -> ModalResult<()> {
    skip_ws(input);
    let _ = parse_identifier.parse_next(input)?;
    skip_ws(input);
    let _ = ':'.parse_next(input)?;
    Ok(())
}

/// Decode one trimmed value for `key`.
///
/// `points` and `absoluteStart` try their structured grammar and keep the raw
/// text on failure. Other keys lose one pair of surrounding double quotes;
/// bare numeric tokens become numbers.
pub fn decode_value(key: &str, raw: &str) -> PropertyValue {
    let structured = match key {
        "points" => parse_complete(raw, parse_points).map(PropertyValue::Points),
        "absoluteStart" => {
            parse_complete(raw, parse_position).map(|[x, y]| PropertyValue::Position { x, y })
        }
        _ => return decode_scalar(raw),
    };
    structured.unwrap_or_else(|| {
        log::debug!("{key}: structured value `{raw}` kept as raw text");
        PropertyValue::Raw(raw.to_string())
    })
}

fn decode_scalar(raw: &str) -> PropertyValue {
    if let Some(inner) = unquote(raw) {
        return PropertyValue::Str(unescape(inner));
    }
    if looks_numeric(raw) {
        if let Ok(n) = raw.parse::<f64>() {
            return PropertyValue::Number(n);
        }
    }
    PropertyValue::Raw(raw.to_string())
}

/// Strip one matching pair of surrounding double quotes.
pub fn unquote(s: &str) -> Option<&str> {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

/// Undo the `\\` and `\"` escapes of a quoted value. Any other backslash
/// is kept as written.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('\\', Some(&next @ ('\\' | '"'))) => {
                out.push(next);
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

fn looks_numeric(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
}

// ─── Structured literals ─────────────────────────────────────────────────

fn parse_complete<T>(raw: &str, mut parser: impl FnMut(&mut &str) -> ModalResult<T>) -> Option<T> {
    let mut input = raw;
    let value = parser(&mut input).ok()?;
    input.trim().is_empty().then_some(value)
}

fn skip_ws(input: &mut &str) {
    let _: Result<&str, winnow::error::ErrMode<ContextError>> = multispace0.parse_next(input);
}

fn parse_number(input: &mut &str) -> ModalResult<f64> {
    skip_ws(input);
    let n: f64 = float.parse_next(input)?;
    skip_ws(input);
    Ok(n)
}

fn parse_pair(input: &mut &str) -> ModalResult<[f64; 2]> {
    skip_ws(input);
    let _ = '['.parse_next(input)?;
    let x = parse_number(input)?;
    let _ = ','.parse_next(input)?;
    let y = parse_number(input)?;
    let _ = ']'.parse_next(input)?;
    skip_ws(input);
    Ok([x, y])
}

/// `[[x, y], [x, y], ...]`, possibly empty.
fn parse_points(input: &mut &str) -> ModalResult<Vec<[f64; 2]>> {
    let mut points = Vec::new();
    skip_ws(input);
    let _ = '['.parse_next(input)?;
    skip_ws(input);
    if input.starts_with(']') {
        let _ = ']'.parse_next(input)?;
        return Ok(points);
    }
    loop {
        points.push(parse_pair(input)?);
        if input.starts_with(',') {
            let _ = ','.parse_next(input)?;
            continue;
        }
        break;
    }
    let _ = ']'.parse_next(input)?;
    Ok(points)
}

/// `{x: n, y: n}` with bare or double-quoted keys, in either order.
fn parse_position(input: &mut &str) -> ModalResult<[f64; 2]> {
    let mut x = None;
    let mut y = None;
    skip_ws(input);
    let _ = '{'.parse_next(input)?;
    loop {
        skip_ws(input);
        let key = alt((parse_quoted_string, parse_identifier)).parse_next(input)?;
        skip_ws(input);
        let _ = ':'.parse_next(input)?;
        let value = parse_number(input)?;
        match key {
            "x" => x = Some(value),
            "y" => y = Some(value),
            _ => return Err(winnow::error::ErrMode::Backtrack(ContextError::new())),
        }
        if input.starts_with(',') {
            let _ = ','.parse_next(input)?;
            continue;
        }
        break;
    }
    let _ = '}'.parse_next(input)?;
    match (x, y) {
        (Some(x), Some(y)) => Ok([x, y]),
        _ => Err(winnow::error::ErrMode::Backtrack(ContextError::new())),
    }
}

// ─── Numeric prefixes ────────────────────────────────────────────────────

/// Leading float of `s`, ignoring leading whitespace (`"12px"` → 12,
/// `"2em"` → 2).
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let mut input = s.trim_start();
    float_prefix(&mut input).ok()
}

/// `[+-] (digits [. digits] | . digits) [e [+-] digits]`; a dangling
/// exponent marker is left unconsumed.
fn float_prefix(input: &mut &str) -> ModalResult<f64> {
    let text = (
        opt(one_of(['+', '-'])),
        alt(((digit1, opt(('.', digit0))).void(), ('.', digit1).void())),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(input)?;
    text.parse::<f64>()
        .map_err(|_| winnow::error::ErrMode::Backtrack(ContextError::new()))
}

/// Leading integer of `s`, ignoring leading whitespace (`"3.7"` → 3).
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Record {
        parse_statement(text).expect("statement should parse")
    }

    #[test]
    fn parse_node_with_properties() {
        let rec = parse(
            r##"
      Node "node1" {
        x: 10,
        y: 20.5,
        label: "Hello",
        backgroundColor: "#ff0000",
        type: "rectangle"
      }"##,
        );
        assert_eq!(rec.kind, StatementKind::Node);
        assert_eq!(rec.ident, "node1");
        assert_eq!(rec.get("x"), Some(&PropertyValue::Number(10.0)));
        assert_eq!(rec.get("y"), Some(&PropertyValue::Number(20.5)));
        assert_eq!(rec.get("label"), Some(&PropertyValue::Str("Hello".into())));
        assert_eq!(
            rec.get("backgroundColor"),
            Some(&PropertyValue::Str("#ff0000".into()))
        );
        assert_eq!(rec.props.len(), 5);
    }

    #[test]
    fn empty_block_is_valid() {
        let rec = parse(r#"Node "x" {}"#);
        assert!(rec.props.is_empty());
    }

    #[test]
    fn spaced_identifier() {
        assert_eq!(parse(r#"Node     "abc" { x:1 }"#).ident, "abc");
    }

    #[test]
    fn identifier_may_follow_keyword_directly() {
        let rec = parse(r#"Node"test"{height:100}"#);
        assert_eq!(rec.ident, "test");
        assert_eq!(rec.number("height"), Some(100.0));
    }

    #[test]
    fn unknown_kind_is_skipped() {
        assert_eq!(parse_statement(r#"SomethingElse "a" { x: 1 }"#), Err(Skip::UnknownKind));
        assert_eq!(parse_statement(r#"Nodes "a" { x: 1 }"#), Err(Skip::UnknownKind));
        assert_eq!(parse_statement("JustGarbageHere"), Err(Skip::UnknownKind));
    }

    #[test]
    fn missing_identifier_is_skipped() {
        assert_eq!(
            parse_statement("Node { x:1 }"),
            Err(Skip::MissingIdentifier(StatementKind::Node))
        );
        assert_eq!(
            parse_statement("Node test { x:1 }"),
            Err(Skip::MissingIdentifier(StatementKind::Node))
        );
        assert_eq!(
            parse_statement(r#"Node "" { x:1 }"#),
            Err(Skip::MissingIdentifier(StatementKind::Node))
        );
    }

    #[test]
    fn missing_block_is_skipped() {
        assert_eq!(
            parse_statement(r#"Node "noPropsBlock""#),
            Err(Skip::MissingPropertyBlock {
                kind: StatementKind::Node,
                ident: "noPropsBlock".into()
            })
        );
    }

    #[test]
    fn commas_inside_values_do_not_split() {
        let rec = parse(r#"Connection "c" { points: [[0,0],[1,1]], label: "x, y, z", source: "a" }"#);
        assert_eq!(
            rec.get("points"),
            Some(&PropertyValue::Points(vec![[0.0, 0.0], [1.0, 1.0]]))
        );
        assert_eq!(rec.get("label"), Some(&PropertyValue::Str("x, y, z".into())));
        assert_eq!(rec.text("source").as_deref(), Some("a"));
    }

    #[test]
    fn trailing_comma_and_padding_are_tolerated() {
        let rec = parse("Node \"t\" { height: 10   , width:   20, \n}");
        assert_eq!(rec.number("height"), Some(10.0));
        assert_eq!(rec.number("width"), Some(20.0));
    }

    #[test]
    fn assignment_without_colon_is_dropped() {
        let rec = parse("Node \"p\" {\n height: 10,\n width 20,\n x: 1\n}");
        assert_eq!(rec.get("width"), None);
        assert_eq!(rec.number("x"), Some(1.0));
    }

    #[test]
    fn bad_structured_values_fall_back_to_raw() {
        let rec = parse(r#"Node "n" { points: notValidJson, absoluteStart: {x: 1} }"#);
        assert_eq!(rec.get("points"), Some(&PropertyValue::Raw("notValidJson".into())));
        assert_eq!(rec.get("absoluteStart"), Some(&PropertyValue::Raw("{x: 1}".into())));
    }

    #[test]
    fn absolute_start_accepts_bare_and_quoted_keys() {
        assert_eq!(
            decode_value("absoluteStart", "{x: 5, y: -2.5}"),
            PropertyValue::Position { x: 5.0, y: -2.5 }
        );
        assert_eq!(
            decode_value("absoluteStart", r#"{"y": 1, "x": 2}"#),
            PropertyValue::Position { x: 2.0, y: 1.0 }
        );
    }

    #[test]
    fn connection_statement_keeps_explicit_geometry() {
        let rec = parse(
            r#"Connection "c" { source: "a", target: "b",
                 points: [[0,0],[0,150]], absoluteStart: {"x": 50, "y": 50} }"#,
        );
        assert_eq!(
            rec.get("absoluteStart"),
            Some(&PropertyValue::Position { x: 50.0, y: 50.0 })
        );
        assert_eq!(
            rec.get("points"),
            Some(&PropertyValue::Points(vec![[0.0, 0.0], [0.0, 150.0]]))
        );
        assert_eq!(rec.get("y"), None);
        assert_eq!(rec.props.len(), 4);
    }

    #[test]
    fn points_accept_whitespace_and_empty_list() {
        assert_eq!(
            decode_value("points", "[ [0, 0] ,\n [12.5, -3] ]"),
            PropertyValue::Points(vec![[0.0, 0.0], [12.5, -3.0]])
        );
        assert_eq!(decode_value("points", "[]"), PropertyValue::Points(vec![]));
    }

    #[test]
    fn unquote_fallback_keeps_raw_text() {
        assert_eq!(decode_value("color", "#999999"), PropertyValue::Raw("#999999".into()));
        assert_eq!(decode_value("label", "\""), PropertyValue::Raw("\"".into()));
        assert_eq!(decode_value("label", "\"\""), PropertyValue::Str(String::new()));
        assert_eq!(
            decode_value("label", r#""say \"hi\"""#),
            PropertyValue::Str(r#"say "hi""#.into())
        );
    }

    #[test]
    fn backslash_escapes_are_undone() {
        assert_eq!(decode_value("label", r#""C:\\""#), PropertyValue::Str(r"C:\".into()));
        assert_eq!(decode_value("label", r#""a\\\"b""#), PropertyValue::Str(r#"a\"b"#.into()));
        assert_eq!(decode_value("label", r#""tab\t""#), PropertyValue::Str(r"tab\t".into()));
        assert_eq!(parse(r#"Node "x\\y" {}"#).ident, r"x\y");
    }

    #[test]
    fn numeric_prefixes() {
        assert_eq!(parse_float_prefix("12px"), Some(12.0));
        assert_eq!(parse_float_prefix("  -3.5e1"), Some(-35.0));
        assert_eq!(parse_float_prefix("2em"), Some(2.0));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("bad"), None);
        assert_eq!(parse_int_prefix("3.7"), Some(3));
        assert_eq!(parse_int_prefix("-4x"), Some(-4));
        assert_eq!(parse_int_prefix("bad"), None);
        assert_eq!(PropertyValue::Str("5".into()).as_integer(), Some(5));
    }

    #[test]
    fn split_respects_quoted_semicolons() {
        let parts = split_statements(r#"Node "a" { label: "x; y" }; Node "b" {}"#);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("x; y"));
    }

    #[test]
    fn parse_records_skips_and_continues() {
        let mut diags = Diagnostics::new();
        let records = parse_records(
            r#"Node { x:1 }; Node "ok" { x: 2 }; Invalid "x" { bad };"#,
            &mut diags,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ident, "ok");
        assert_eq!(diags.warnings().count(), 2);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let rec = parse(r#"Node "k" { Width: 5, width: 6 }"#);
        assert_eq!(rec.number("Width"), Some(5.0));
        assert_eq!(rec.number("width"), Some(6.0));
    }
}
