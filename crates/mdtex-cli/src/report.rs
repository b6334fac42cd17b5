use std::collections::HashSet;

use anyhow::Result;
use mdtex_core::{Diagnostic, DiagnosticFormatter, Reporter};
use serde::Serialize;

use crate::cli::DiagnosticsStyle;

/// Writes diagnostics to standard error, each distinct one once. Pretty
/// diagnostics are printed as they arrive; JSON ones are collected into a
/// single array written by [`StderrReporter::finish`].
pub struct StderrReporter {
    style: DiagnosticsStyle,
    formatter: DiagnosticFormatter,
    seen: HashSet<Diagnostic>,
    pending: Vec<Diagnostic>,
}

impl StderrReporter {
    pub fn new(style: DiagnosticsStyle, formatter: DiagnosticFormatter) -> Self {
        Self {
            style,
            formatter,
            seen: HashSet::new(),
            pending: Vec::new(),
        }
    }

    /// Emits the fatal diagnostic, if any, after everything reported so far.
    pub fn finish(mut self, fatal: Option<&Diagnostic>) -> Result<()> {
        if let Some(fatal) = fatal {
            self.report(fatal.clone());
        }
        if self.style == DiagnosticsStyle::Json {
            eprintln!("{}", diagnostics_to_json(&self.pending)?);
        }
        Ok(())
    }
}

impl Reporter for StderrReporter {
    fn report(&mut self, diagnostic: Diagnostic) {
        if !self.seen.insert(diagnostic.clone()) {
            return;
        }
        match self.style {
            DiagnosticsStyle::Pretty => eprintln!("{}", self.formatter.format(&diagnostic)),
            DiagnosticsStyle::Json => self.pending.push(diagnostic),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonDiagnostic<'a> {
    code: &'a str,
    severity: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<Box<JsonDiagnostic<'a>>>,
}

impl<'a> From<&'a Diagnostic> for JsonDiagnostic<'a> {
    fn from(diagnostic: &'a Diagnostic) -> Self {
        let position = diagnostic.position.as_ref();
        Self {
            code: diagnostic.code,
            severity: diagnostic.severity.label(),
            message: &diagnostic.message,
            file: position.map(|p| p.file.as_str()),
            line: position.and_then(|p| p.line),
            column: position.and_then(|p| p.column),
            length: position.and_then(|p| p.length),
            note: diagnostic
                .note
                .as_deref()
                .map(|note| Box::new(JsonDiagnostic::from(note))),
        }
    }
}

fn diagnostics_to_json(diagnostics: &[Diagnostic]) -> Result<String> {
    let mirrored: Vec<JsonDiagnostic<'_>> = diagnostics.iter().map(JsonDiagnostic::from).collect();
    Ok(serde_json::to_string_pretty(&mirrored)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdtex_core::{E_EMPH_UNCLOSED, Position, Span, W_EMPTY_INPUT};
    use pretty_assertions::assert_eq;

    #[test]
    fn json_mirrors_positions_and_notes() -> Result<()> {
        let diagnostic = Diagnostic::error(
            E_EMPH_UNCLOSED,
            "unclosed emphasis marker",
            Position::span("a.md", 0, Span::at(2, 1), "x *y"),
        )
        .with_note(Diagnostic::note("opened here", Position::line("a.md", 0, "x *y")));
        let value: serde_json::Value = serde_json::from_str(&diagnostics_to_json(&[diagnostic])?)?;
        assert_eq!(
            value,
            serde_json::json!([{
                "code": "E_EMPH_UNCLOSED",
                "severity": "error",
                "message": "unclosed emphasis marker",
                "file": "a.md",
                "line": 1,
                "column": 3,
                "length": 1,
                "note": {
                    "code": "N_NOTE",
                    "severity": "note",
                    "message": "opened here",
                    "file": "a.md",
                    "line": 1,
                    "column": 1,
                    "length": 4
                }
            }])
        );
        Ok(())
    }

    #[test]
    fn repeated_diagnostics_are_kept_once() {
        let mut reporter = StderrReporter::new(DiagnosticsStyle::Json, DiagnosticFormatter::plain());
        let warning = Diagnostic::warning(W_EMPTY_INPUT, "empty input file", Position::file("a.md"));
        reporter.report(warning.clone());
        reporter.report(warning);
        assert_eq!(reporter.pending.len(), 1);
    }
}
