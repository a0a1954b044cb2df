//! Comment stripper: removes `//` line comments from DSL source.
//!
//! A single left-to-right scan driven by [`LexMode`]. Comment markers inside
//! single-quoted, double-quoted, template (backtick) strings and regular
//! expression literals are left untouched.

/// The lexical mode the scanner is currently in. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    Code,
    SingleQuote,
    DoubleQuote,
    Template,
    Regex,
}

impl LexMode {
    /// Inside any string or regex literal (backslash escapes apply).
    fn is_literal(self) -> bool {
        self != LexMode::Code
    }

    /// Inside a quoted or template string (not a regex).
    fn is_string(self) -> bool {
        matches!(
            self,
            LexMode::SingleQuote | LexMode::DoubleQuote | LexMode::Template
        )
    }
}

/// Strip `//` line comments from `source`.
///
/// A comment runs up to and including its terminating newline and is replaced
/// by exactly one `\n`. Everything else is copied verbatim, so input without
/// comments comes back unchanged.
#[must_use]
pub fn strip_comments(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut mode = LexMode::Code;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        // Escapes: the backslash and the escaped char are copied as a pair.
        if mode.is_literal() && c == '\\' {
            out.push(c);
            if let Some(n) = next {
                out.push(n);
            }
            i += 2;
            continue;
        }

        match (mode, c) {
            (LexMode::Code, '\'') | (LexMode::SingleQuote, '\'') => {
                mode = toggle(mode, LexMode::SingleQuote);
                out.push(c);
            }
            (LexMode::Code, '"') | (LexMode::DoubleQuote, '"') => {
                mode = toggle(mode, LexMode::DoubleQuote);
                out.push(c);
            }
            (LexMode::Code, '`') | (LexMode::Template, '`') => {
                mode = toggle(mode, LexMode::Template);
                out.push(c);
            }
            // Division-vs-regex heuristic: a lone slash opens or closes a regex.
            // Character classes are not special-cased.
            (m, '/') if !m.is_string() && opens_regex(next) => {
                mode = toggle(mode, LexMode::Regex);
                out.push(c);
            }
            (LexMode::Code, '/') if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                // `i` now sits on the newline (or past the end); both are consumed.
                out.push('\n');
            }
            _ => out.push(c),
        }
        i += 1;
    }

    out
}

fn toggle(current: LexMode, target: LexMode) -> LexMode {
    if current == target {
        LexMode::Code
    } else {
        target
    }
}

fn opens_regex(next: Option<char>) -> bool {
    matches!(next, Some(n) if n != '/' && n != '*')
}
