//! First pass over the raw lines: comments, quote depth, verbatim regions
//! and footnote definitions.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostic::{
    Diagnostic, E_CODE_UNCLOSED, E_COMMENT_UNCLOSED, E_FOOTNOTE_REDEFINED, E_RAW_UNCLOSED,
    E_SHELL_UNCLOSED, Position, Reporter,
};
use crate::footnote::{Footnote, FootnoteTable};
use crate::inline::{InlineParser, TextContext};
use crate::source::SourceFile;
use crate::span::Span;

pub(crate) const LINE_COMMENT: &str = "#%";
pub(crate) const COMMENT_BEGIN: &str = "#{";
pub(crate) const COMMENT_END: &str = "#}";
pub(crate) const RAW_PREFIX: &str = "#&";
pub(crate) const SHELL_PREFIX: &str = "#_";

/// A code fence: ```` ``` ```` or `` #` ``, optionally followed by a name that
/// may be wrapped in brackets.
pub(crate) static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<fence>#`+|```)(?:\[(?P<bracketed>.+)\]|(?P<name>.+))?$").unwrap()
});

static FOOTNOTE_DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#\[\^(?P<label>[\w-]+)\]: ?(?P<text>.*)").unwrap());

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Segment {
    Text(String),
    /// Entering (`true`) or leaving one level of `>` quoting.
    Quote(bool),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SegmentedLine {
    /// 0-based source line.
    pub line: usize,
    pub segment: Segment,
}

#[derive(Debug)]
pub struct Segmented {
    pub lines: Vec<SegmentedLine>,
    pub footnotes: FootnoteTable,
}

pub fn segment(source: &SourceFile, reporter: &mut dyn Reporter) -> Result<Segmented, Diagnostic> {
    Segmenter {
        file: source.name(),
        lines: Vec::new(),
        footnotes: FootnoteTable::default(),
    }
    .run(source, reporter)
}

struct Segmenter<'a> {
    file: &'a str,
    lines: Vec<SegmentedLine>,
    footnotes: FootnoteTable,
}

impl Segmenter<'_> {
    fn push(&mut self, line: usize, text: impl Into<String>) {
        self.lines.push(SegmentedLine {
            line,
            segment: Segment::Text(text.into()),
        });
    }

    fn toggle_quotes(&mut self, line: usize, open: bool, count: usize) {
        for _ in 0..count {
            self.lines.push(SegmentedLine {
                line,
                segment: Segment::Quote(open),
            });
        }
    }

    fn run(mut self, source: &SourceFile, reporter: &mut dyn Reporter) -> Result<Segmented, Diagnostic> {
        let mut quoting = 0;
        let mut last_line = 0;
        let mut lines = source.lines();

        while let Some((line_no, raw)) = lines.next() {
            last_line = line_no;
            let line = raw.trim_end_matches([' ', '\t', '\r', '\n']);
            if line.starts_with(LINE_COMMENT) {
                continue;
            }

            let depth = line.len() - line.trim_start_matches('>').len();
            if depth > quoting {
                self.toggle_quotes(line_no, true, depth - quoting);
            } else if depth < quoting {
                self.toggle_quotes(line_no, false, quoting - depth);
            }
            quoting = depth;
            let line = &line[depth..];

            if line.starts_with(COMMENT_BEGIN) {
                let mut opened = 1;
                for (_, inner) in lines.by_ref() {
                    if inner.starts_with(COMMENT_BEGIN) {
                        opened += 1;
                    } else if inner.starts_with(COMMENT_END) {
                        opened -= 1;
                        if opened == 0 {
                            break;
                        }
                    }
                }
                if opened > 0 {
                    return Err(Diagnostic::error(
                        E_COMMENT_UNCLOSED,
                        "unclosed comment block",
                        Position::line(self.file, line_no, line),
                    ));
                }
                continue;
            }

            let region = if line.starts_with(RAW_PREFIX) {
                Some((Terminator::Exact(line.to_string()), E_RAW_UNCLOSED, "unclosed raw block"))
            } else if let Some(caps) = CODE_FENCE.captures(line) {
                let fence = caps.name("fence").map_or("```", |m| m.as_str());
                Some((Terminator::Exact(fence.to_string()), E_CODE_UNCLOSED, "unclosed code block"))
            } else if line.starts_with(SHELL_PREFIX) {
                Some((Terminator::Prefix(SHELL_PREFIX), E_SHELL_UNCLOSED, "unclosed shell block"))
            } else {
                None
            };

            if let Some((terminator, code, message)) = region {
                self.push(line_no, line);
                let mut closed = false;
                for (inner_no, inner) in lines.by_ref() {
                    let inner = inner.trim_end();
                    self.push(inner_no, inner);
                    last_line = inner_no;
                    if terminator.matches(inner) {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(Diagnostic::error(
                        code,
                        message,
                        Position::line(self.file, line_no, line),
                    ));
                }
                continue;
            }

            if let Some(caps) = FOOTNOTE_DEFINITION.captures(line) {
                self.define_footnote(line_no, line, &caps, reporter)?;
                continue;
            }

            self.push(line_no, line);
        }

        self.toggle_quotes(last_line, false, quoting);
        log::debug!(
            "segmented {} lines, {} footnotes",
            self.lines.len(),
            self.footnotes.len()
        );
        Ok(Segmented {
            lines: self.lines,
            footnotes: self.footnotes,
        })
    }

    fn define_footnote(
        &mut self,
        line_no: usize,
        line: &str,
        caps: &regex::Captures<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), Diagnostic> {
        let label = caps.name("label").map_or("", |m| m.as_str());
        if let Some(previous) = self.footnotes.get(label) {
            return Err(Diagnostic::error(
                E_FOOTNOTE_REDEFINED,
                "redefinition of footnote text",
                Position::line(self.file, line_no, line),
            )
            .with_note(Diagnostic::note(
                "previously defined here",
                Position::span(
                    self.file,
                    previous.line,
                    Span::at(0, label.len() + 4),
                    &previous.source,
                ),
            )));
        }

        let offset = caps.name("text").map_or(line.len(), |m| m.start());
        let text = InlineParser::new(self.file, None).parse(
            line_no,
            line,
            offset,
            TextContext::Footnote,
            reporter,
        )?;
        // The label is known to be free, so the insert cannot fail.
        let _ = self
            .footnotes
            .insert(Footnote::new(label, line_no, line, text));
        Ok(())
    }
}

enum Terminator {
    Exact(String),
    Prefix(&'static str),
}

impl Terminator {
    fn matches(&self, line: &str) -> bool {
        match self {
            Terminator::Exact(expected) => line == expected,
            Terminator::Prefix(prefix) => line.starts_with(prefix),
        }
    }
}
