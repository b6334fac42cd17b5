use std::collections::HashSet;
use std::fmt;

use unicode_width::UnicodeWidthChar;

use crate::span::Span;

pub const E_COMMENT_UNCLOSED: &str = "E_COMMENT_UNCLOSED";
pub const E_RAW_UNCLOSED: &str = "E_RAW_UNCLOSED";
pub const E_CODE_UNCLOSED: &str = "E_CODE_UNCLOSED";
pub const E_SHELL_UNCLOSED: &str = "E_SHELL_UNCLOSED";
pub const E_SHELL_SYNTAX: &str = "E_SHELL_SYNTAX";
pub const E_FOOTNOTE_REDEFINED: &str = "E_FOOTNOTE_REDEFINED";
pub const E_FOOTNOTE_NESTED: &str = "E_FOOTNOTE_NESTED";
pub const E_FOOTNOTE_UNDEFINED: &str = "E_FOOTNOTE_UNDEFINED";
pub const E_CMD_SYNTAX: &str = "E_CMD_SYNTAX";
pub const E_CMD_UNKNOWN: &str = "E_CMD_UNKNOWN";
pub const E_CMD_UNCLOSED: &str = "E_CMD_UNCLOSED";
pub const E_CMD_UNMATCHED: &str = "E_CMD_UNMATCHED";
pub const E_CMD_ARGUMENT: &str = "E_CMD_ARGUMENT";
pub const E_EMPH_NESTING: &str = "E_EMPH_NESTING";
pub const E_EMPH_UNCLOSED: &str = "E_EMPH_UNCLOSED";
pub const E_MARKER_UNCLOSED: &str = "E_MARKER_UNCLOSED";
pub const E_MATH_IN_EMPH: &str = "E_MATH_IN_EMPH";
pub const E_SECTION_DEPTH: &str = "E_SECTION_DEPTH";
pub const E_TITLE_DEPTH: &str = "E_TITLE_DEPTH";
pub const E_LIST_SYNTAX: &str = "E_LIST_SYNTAX";
pub const E_LIST_KIND: &str = "E_LIST_KIND";
pub const E_LIST_INDENT: &str = "E_LIST_INDENT";
pub const E_TABLE_SYNTAX: &str = "E_TABLE_SYNTAX";
pub const E_TABLE_HEADER: &str = "E_TABLE_HEADER";
pub const E_TABLE_DELIMITER: &str = "E_TABLE_DELIMITER";
pub const E_DIRECTIVE_UNKNOWN: &str = "E_DIRECTIVE_UNKNOWN";
pub const E_UNSUPPORTED: &str = "E_UNSUPPORTED";

pub const W_EMPH_MARKER: &str = "W_EMPH_MARKER";
pub const W_MARKER_LENGTH: &str = "W_MARKER_LENGTH";
pub const W_TABLE_COLUMNS: &str = "W_TABLE_COLUMNS";
pub const W_TABLE_ALIGN: &str = "W_TABLE_ALIGN";
pub const W_FOOTNOTE_UNUSED: &str = "W_FOOTNOTE_UNUSED";
pub const W_EMPTY_INPUT: &str = "W_EMPTY_INPUT";
pub const W_SGR_MALFORMED: &str = "W_SGR_MALFORMED";

pub const N_NOTE: &str = "N_NOTE";

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Severity::Error => "\x1b[1;31m",
            Severity::Warning => "\x1b[1;35m",
            Severity::Note => "\x1b[1;36m",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a diagnostic points. Lines and columns are 1-based; the column
/// counts bytes into `text`.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Position {
    pub file: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub length: Option<usize>,
    pub text: Option<String>,
}

impl Position {
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    /// Whole-line position from a 0-based line index.
    pub fn line(file: impl Into<String>, line: usize, text: &str) -> Self {
        Self {
            file: file.into(),
            line: Some(line + 1),
            column: Some(1),
            length: Some(text.len()),
            text: Some(text.to_string()),
        }
    }

    /// Position of `span` inside `text`, which is line `line` (0-based).
    pub fn span(file: impl Into<String>, line: usize, span: Span, text: &str) -> Self {
        Self {
            file: file.into(),
            line: Some(line + 1),
            column: Some(span.start + 1),
            length: Some(span.len()),
            text: Some(text.to_string()),
        }
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, thiserror::Error)]
#[error("{severity}: {message}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub position: Option<Position>,
    pub note: Option<Box<Diagnostic>>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        code: &'static str,
        message: impl Into<String>,
        position: Option<Position>,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            position,
            note: None,
        }
    }

    pub fn error(code: &'static str, message: impl Into<String>, position: Position) -> Self {
        Self::new(Severity::Error, code, message, Some(position))
    }

    pub fn warning(code: &'static str, message: impl Into<String>, position: Position) -> Self {
        Self::new(Severity::Warning, code, message, Some(position))
    }

    pub fn note(message: impl Into<String>, position: Position) -> Self {
        Self::new(Severity::Note, N_NOTE, message, Some(position))
    }

    pub fn with_note(mut self, note: Diagnostic) -> Self {
        self.note = Some(Box::new(note));
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn line(&self) -> Option<usize> {
        self.position.as_ref().and_then(|position| position.line)
    }
}

/// Side channel for non-fatal diagnostics.
pub trait Reporter {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl Reporter for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Collects diagnostics, dropping exact repeats while keeping first-seen order.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    seen: HashSet<Diagnostic>,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl Reporter for DiagnosticCollector {
    fn report(&mut self, diagnostic: Diagnostic) {
        if self.seen.insert(diagnostic.clone()) {
            self.diagnostics.push(diagnostic);
        }
    }
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug)]
pub struct LogReporter {
    formatter: DiagnosticFormatter,
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl LogReporter {
    pub fn new() -> Self {
        Self {
            formatter: DiagnosticFormatter::plain(),
        }
    }
}

impl Reporter for LogReporter {
    fn report(&mut self, diagnostic: Diagnostic) {
        let text = self.formatter.format(&diagnostic);
        match diagnostic.severity {
            Severity::Error => log::error!("{}", text),
            Severity::Warning => log::warn!("{}", text),
            Severity::Note => log::info!("{}", text),
        }
    }
}

/// Renders diagnostics as `file:line:col: kind: message` followed by the
/// offending source line and a caret underline.
#[derive(Clone, Copy, Debug)]
pub struct DiagnosticFormatter {
    pub color: bool,
    pub tab_width: usize,
}

impl Default for DiagnosticFormatter {
    fn default() -> Self {
        Self {
            color: true,
            tab_width: 8,
        }
    }
}

impl DiagnosticFormatter {
    pub fn plain() -> Self {
        Self {
            color: false,
            ..Self::default()
        }
    }

    /// Formats the diagnostic and its attached note, if any.
    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut out = self.format_single(diagnostic);
        if let Some(note) = &diagnostic.note {
            out.push('\n');
            out.push_str(&self.format(note));
        }
        out
    }

    fn paint(&self, code: &'static str) -> &'static str {
        if self.color { code } else { "" }
    }

    fn format_single(&self, diagnostic: &Diagnostic) -> String {
        let bold = self.paint(BOLD);
        let reset = self.paint(RESET);
        let color = self.paint(diagnostic.severity.color());

        let mut out = String::new();
        if let Some(position) = &diagnostic.position {
            out.push_str(bold);
            out.push_str(&position.file);
            if let Some(line) = position.line {
                out.push_str(&format!(":{}", line));
                if let (Some(column), Some(text)) = (position.column, &position.text) {
                    let prefix = clamp_prefix(text, column.saturating_sub(1));
                    out.push_str(&format!(":{}", prefix.chars().count() + 1));
                } else if let Some(column) = position.column {
                    out.push_str(&format!(":{}", column));
                }
            }
            out.push(':');
            out.push_str(reset);
            out.push(' ');
        }
        out.push_str(color);
        out.push_str(diagnostic.severity.label());
        out.push_str(": ");
        out.push_str(reset);
        out.push_str(&diagnostic.message);

        let Some(position) = &diagnostic.position else {
            return out;
        };
        let Some(text) = &position.text else {
            return out;
        };

        let Some(column) = position.column else {
            out.push_str("\n    ");
            out.push_str(&self.expand(text, &mut 0));
            return out;
        };

        let prefix = clamp_prefix(text, column.saturating_sub(1));
        let rest = &text[prefix.len()..];
        let span = clamp_prefix(rest, position.length.unwrap_or(1));
        let tail = &rest[span.len()..];

        let mut width = 0;
        let shown_prefix = self.expand(prefix, &mut width);
        let indent = width;
        let shown_span = self.expand(span, &mut width);
        let underline = (width - indent).max(1);
        let shown_tail = self.expand(tail, &mut width);

        out.push_str("\n    ");
        out.push_str(&shown_prefix);
        out.push_str(color);
        out.push_str(&shown_span);
        out.push_str(reset);
        out.push_str(&shown_tail);

        out.push_str("\n    ");
        out.push_str(&" ".repeat(indent));
        out.push_str(color);
        out.push('^');
        out.push_str(&"~".repeat(underline - 1));
        out.push_str(reset);
        out
    }

    /// Expands tabs relative to the running display column `width`.
    fn expand(&self, text: &str, width: &mut usize) -> String {
        let tab_width = self.tab_width.max(1);
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            if ch == '\t' {
                let fill = tab_width - *width % tab_width;
                out.push_str(&" ".repeat(fill));
                *width += fill;
            } else {
                out.push(ch);
                *width += ch.width().unwrap_or(0);
            }
        }
        out
    }
}

/// Longest prefix of `text` of at most `len` bytes that ends on a char boundary.
fn clamp_prefix(text: &str, len: usize) -> &str {
    let mut end = len.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
