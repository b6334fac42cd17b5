use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{
    Alignment, Author, Block, BlockKind, ColumnSpec, Document, ListEvent, ListKind, ShellBlock,
    ShellItem, ShellPrompt, ShellStyle, Table, TableLine, TableRow, Title,
};
use crate::csi::{SGR_SEQUENCE, StyleAttributes, decode_sgr};
use crate::diagnostic::{
    Diagnostic, E_CODE_UNCLOSED, E_DIRECTIVE_UNKNOWN, E_LIST_INDENT, E_LIST_KIND, E_LIST_SYNTAX,
    E_RAW_UNCLOSED, E_SECTION_DEPTH, E_SHELL_SYNTAX, E_SHELL_UNCLOSED, E_TABLE_DELIMITER,
    E_TABLE_HEADER, E_TABLE_SYNTAX, E_TITLE_DEPTH, Position, Reporter, W_EMPTY_INPUT,
    W_SGR_MALFORMED, W_TABLE_ALIGN, W_TABLE_COLUMNS,
};
use crate::footnote::FootnoteTable;
use crate::inline::{InlineParser, TextContext};
use crate::segment::{CODE_FENCE, RAW_PREFIX, SHELL_PREFIX, Segment, SegmentedLine, Segmented, segment};
use crate::source::SourceFile;
use crate::span::Span;

/// Deepest section level; `#` is level 0.
pub const MAX_SECTION_LEVEL: usize = 2;
/// Largest number of colons on a title line.
pub const MAX_TITLE_DEPTH: usize = 10;

static SECTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?P<hashes>#+) (?P<text>.+)").unwrap());

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(?P<item>[-+])|(?P<enum>[1-9]\d*\.|\(?[1-9]\d*\))) (?P<text>.+)").unwrap()
});

static TABLE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<thin>-{3,}\s*$)|(?P<thick>=\+{3,}\s*$)|(?P<pipe>\|))").unwrap()
});

static DELIMITER_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:(?P<pipe>\|+)|(?P<sep>[-=:]-+[-=:]))\s*").unwrap());

static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#(?P<colons>:+) ?").unwrap());

static AUTHOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#@ ?").unwrap());

static SHELL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<prompt>[$#>-]) ?(?P<text>.*)").unwrap());

/// Parses a whole document. Non-fatal diagnostics go to `reporter`; the
/// first fatal one is returned as the error.
pub fn parse(source: &SourceFile, reporter: &mut dyn Reporter) -> Result<Document, Diagnostic> {
    let Segmented { lines, footnotes } = segment(source, reporter)?;
    let parsed = BlockParser {
        file: source.name(),
        lines: &lines,
        cursor: 0,
        footnotes: &footnotes,
        reporter: &mut *reporter,
    }
    .run()?;

    let document = Document {
        file: source.name().to_string(),
        title: parsed.title,
        author: parsed.author,
        blocks: parsed.blocks,
        footnotes,
    };
    if document.is_empty() {
        reporter.report(Diagnostic::warning(
            W_EMPTY_INPUT,
            "empty input file",
            Position::file(source.name()),
        ));
    }
    log::debug!(
        "parsed {} blocks from {}",
        document.blocks.len(),
        document.file
    );
    Ok(document)
}

struct Parsed {
    blocks: Vec<Block>,
    title: Option<Title>,
    author: Option<Author>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RowKind {
    ThinRule,
    ThickRule,
    Row,
}

struct BlockParser<'a, 'r> {
    file: &'a str,
    lines: &'a [SegmentedLine],
    cursor: usize,
    footnotes: &'a FootnoteTable,
    reporter: &'r mut dyn Reporter,
}

impl<'a> BlockParser<'a, '_> {
    fn inline(&self) -> InlineParser<'a> {
        InlineParser::new(self.file, Some(self.footnotes))
    }

    fn whole_line(&self, line_no: usize, line: &str) -> Position {
        Position::line(self.file, line_no, line)
    }

    fn at(&self, line_no: usize, start: usize, len: usize, line: &str) -> Position {
        Position::span(self.file, line_no, Span::at(start, len), line)
    }

    fn next_line(&mut self) -> Option<&'a SegmentedLine> {
        let line = self.lines.get(self.cursor)?;
        self.cursor += 1;
        Some(line)
    }

    fn peek_text(&self) -> Option<&'a str> {
        match &self.lines.get(self.cursor)?.segment {
            Segment::Text(text) => Some(text),
            Segment::Quote(_) => None,
        }
    }

    /// Takes the following lines up to the next blank line, which is
    /// consumed, or quote change or verbatim region, which are not.
    fn take_run(&mut self) -> Vec<(usize, &'a str)> {
        let mut run = Vec::new();
        while let Some(entry) = self.lines.get(self.cursor) {
            let Segment::Text(text) = &entry.segment else {
                break;
            };
            if opens_region(text) {
                break;
            }
            self.cursor += 1;
            if text.trim().is_empty() {
                break;
            }
            run.push((entry.line, text.as_str()));
        }
        run
    }

    /// Takes lines verbatim until `is_end` matches; the closing line is
    /// consumed but not returned.
    fn take_until(&mut self, is_end: impl Fn(&str) -> bool) -> Option<Vec<String>> {
        let mut taken = Vec::new();
        while let Some(entry) = self.next_line() {
            if let Segment::Text(text) = &entry.segment {
                if is_end(text) {
                    return Some(taken);
                }
                taken.push(text.clone());
            }
        }
        None
    }

    fn run(mut self) -> Result<Parsed, Diagnostic> {
        let mut blocks = Vec::new();
        let mut title_lines = Vec::new();
        let mut author_lines = Vec::new();

        while let Some(entry) = self.next_line() {
            let line_no = entry.line;
            let line = match &entry.segment {
                Segment::Quote(open) => {
                    blocks.push(Block::new(line_no, BlockKind::Quote { open: *open }));
                    continue;
                }
                Segment::Text(text) => text.as_str(),
            };

            let kind = if line == "\u{c}" || line == "\u{c}\u{c}" {
                BlockKind::Control { depth: line.len() }
            // Verbatim regions before anything that could read their opener.
            } else if line.starts_with(RAW_PREFIX) {
                let Some(lines) = self.take_until(|text| text == line) else {
                    return Err(Diagnostic::error(
                        E_RAW_UNCLOSED,
                        "unclosed raw block",
                        self.whole_line(line_no, line),
                    ));
                };
                BlockKind::Raw { lines }
            } else if let Some(caps) = CODE_FENCE.captures(line) {
                let fence = caps.name("fence").map_or("```", |m| m.as_str());
                let name = caps
                    .name("bracketed")
                    .or_else(|| caps.name("name"))
                    .map(|m| m.as_str().to_string());
                let Some(lines) = self.take_until(|text| text == fence) else {
                    return Err(Diagnostic::error(
                        E_CODE_UNCLOSED,
                        "unclosed code block",
                        self.whole_line(line_no, line),
                    ));
                };
                BlockKind::Code { name, lines }
            } else if line.starts_with(SHELL_PREFIX) {
                BlockKind::Shell(self.shell(line_no, line)?)
            } else if let Some(caps) = SECTION.captures(line) {
                self.section(line_no, line, &caps)?
            } else if LIST_ITEM.is_match(line) {
                let mut run = vec![(line_no, line)];
                run.extend(self.take_run());
                BlockKind::List(self.list(&run)?)
            } else if self.starts_table(line) {
                let mut run = vec![(line_no, line)];
                run.extend(self.take_run());
                BlockKind::Table(self.table(&run)?)
            } else if TITLE.is_match(line) {
                title_lines.push((line_no, line));
                continue;
            } else if AUTHOR.is_match(line) {
                author_lines.push((line_no, line));
                continue;
            } else if line.starts_with('#') {
                return Err(Diagnostic::error(
                    E_DIRECTIVE_UNKNOWN,
                    "unknown directive",
                    self.whole_line(line_no, line),
                ));
            } else {
                BlockKind::Paragraph(self.inline().parse(
                    line_no,
                    line,
                    0,
                    TextContext::Paragraph,
                    &mut *self.reporter,
                )?)
            };
            blocks.push(Block::new(line_no, kind));
        }

        let title = if title_lines.is_empty() {
            None
        } else {
            Some(self.title(&title_lines)?)
        };
        let author = if author_lines.is_empty() {
            None
        } else {
            let mut lines = Vec::new();
            for &(line_no, line) in &author_lines {
                let offset = AUTHOR.find(line).map_or(0, |m| m.end());
                lines.push(self.inline().parse(
                    line_no,
                    line,
                    offset,
                    TextContext::Author,
                    &mut *self.reporter,
                )?);
            }
            Some(Author { lines })
        };

        Ok(Parsed {
            blocks,
            title,
            author,
        })
    }

    fn section(
        &mut self,
        line_no: usize,
        line: &str,
        caps: &regex::Captures<'_>,
    ) -> Result<BlockKind, Diagnostic> {
        let hashes = caps.name("hashes").map_or(1, |m| m.len());
        let level = hashes - 1;
        if level > MAX_SECTION_LEVEL {
            return Err(Diagnostic::error(
                E_SECTION_DEPTH,
                "too low level section",
                self.at(line_no, 0, hashes, line),
            ));
        }
        let offset = caps.name("text").map_or(line.len(), |m| m.start());
        let text = self.inline().parse(
            line_no,
            line,
            offset,
            TextContext::Heading,
            &mut *self.reporter,
        )?;
        Ok(BlockKind::Section { level, text })
    }

    fn title(&mut self, lines: &[(usize, &str)]) -> Result<Title, Diagnostic> {
        let mut parsed = Vec::new();
        for &(line_no, line) in lines {
            let Some(caps) = TITLE.captures(line) else {
                continue;
            };
            let depth = caps.name("colons").map_or(1, |m| m.len());
            if depth > MAX_TITLE_DEPTH {
                return Err(Diagnostic::error(
                    E_TITLE_DEPTH,
                    format!("title size must be at most {} colons", MAX_TITLE_DEPTH),
                    self.at(line_no, 1, depth, line),
                ));
            }
            let offset = caps.get(0).map_or(0, |m| m.end());
            let text = self.inline().parse(
                line_no,
                line,
                offset,
                TextContext::Title,
                &mut *self.reporter,
            )?;
            parsed.push((depth, text));
        }
        Ok(Title { lines: parsed })
    }

    fn list(&mut self, run: &[(usize, &str)]) -> Result<Vec<ListEvent>, Diagnostic> {
        let mut events = Vec::new();
        let mut opened: Vec<(usize, ListKind)> = Vec::new();

        for &(line_no, line) in run {
            let Some(caps) = LIST_ITEM.captures(line) else {
                let start = line.len() - line.trim_start().len();
                return Err(Diagnostic::error(
                    E_LIST_SYNTAX,
                    "ill-formed itemization/enumeration",
                    self.at(line_no, start, line.len() - start, line),
                ));
            };
            let (kind, indent) = match (caps.name("item"), caps.name("enum")) {
                (Some(item), _) => (ListKind::Item, item.start()),
                (None, Some(number)) => (ListKind::Enum, number.start()),
                (None, None) => (ListKind::Item, 0),
            };
            let Some(text) = caps.name("text") else {
                continue;
            };

            match opened.last() {
                Some(&(top, _)) if top > indent => {
                    while let Some(&(top, top_kind)) = opened.last() {
                        if top <= indent {
                            break;
                        }
                        opened.pop();
                        events.push(ListEvent::Close(top_kind));
                    }
                    if opened.last().is_none_or(|&(top, _)| top < indent) {
                        return Err(Diagnostic::error(
                            E_LIST_INDENT,
                            "ill-formed indentation",
                            self.at(line_no, indent, text.start() - (indent + 1), line),
                        ));
                    }
                }
                Some(&(top, _)) if top == indent => {}
                _ => {
                    opened.push((indent, kind));
                    events.push(ListEvent::Open(kind));
                }
            }

            if opened.last().is_some_and(|&(_, top_kind)| top_kind != kind) {
                return Err(Diagnostic::error(
                    E_LIST_KIND,
                    "ill-formed itemization/enumeration (mismatch types)",
                    self.at(line_no, indent, text.end() - indent, line),
                ));
            }

            events.push(ListEvent::Item(self.inline().parse(
                line_no,
                line,
                text.start(),
                TextContext::ListItem,
                &mut *self.reporter,
            )?));
        }

        while let Some((_, kind)) = opened.pop() {
            events.push(ListEvent::Close(kind));
        }
        Ok(events)
    }

    /// A table starts with a rule or a `|`, or with any line holding an
    /// unescaped `|` when a delimiter row follows it.
    fn starts_table(&self, line: &str) -> bool {
        if TABLE_LINE.is_match(line) {
            return true;
        }
        has_separator(line)
            && self
                .peek_text()
                .and_then(|next| parse_delimiter(next).ok())
                .is_some_and(|columns| columns.iter().any(|c| matches!(c, ColumnSpec::Column(_))))
    }

    fn row(&mut self, line_no: usize, line: &str) -> Result<TableRow, Diagnostic> {
        let text = self.inline().with_separators().parse(
            line_no,
            line,
            0,
            TextContext::TableCell,
            &mut *self.reporter,
        )?;
        Ok(TableRow {
            line: line_no,
            text,
        })
    }

    fn check_columns(
        &mut self,
        row: &TableRow,
        line: &str,
        expected: usize,
        delimiter: (usize, &str),
    ) {
        let got = row.text.cells().len();
        if got == expected {
            return;
        }
        let warning = Diagnostic::warning(
            W_TABLE_COLUMNS,
            "the number of columns mismatch",
            self.whole_line(row.line, line),
        )
        .with_note(Diagnostic::note(
            format!("expected {}, but got {}", expected, got),
            self.whole_line(delimiter.0, delimiter.1),
        ));
        self.reporter.report(warning);
    }

    fn table(&mut self, run: &[(usize, &str)]) -> Result<Table, Diagnostic> {
        let mut lines = run.iter().copied();
        let mut head_rules = 0;

        let (header, header_line) = loop {
            let Some((line_no, line)) = lines.next() else {
                let (last_no, last) = run.last().copied().unwrap_or((0, ""));
                return Err(Diagnostic::error(
                    E_TABLE_HEADER,
                    "delimiter row not found",
                    self.whole_line(last_no, last),
                ));
            };
            match row_kind(line) {
                Some(RowKind::ThinRule) => head_rules += 1,
                Some(RowKind::ThickRule) => head_rules += 2,
                Some(RowKind::Row) => break (self.row(line_no, line)?, line),
                None => {
                    return Err(Diagnostic::error(
                        E_TABLE_SYNTAX,
                        "ill-formed table",
                        self.whole_line(line_no, line),
                    ));
                }
            }
        };

        let Some((delimiter_no, delimiter_line)) = lines.next() else {
            return Err(Diagnostic::error(
                E_TABLE_DELIMITER,
                "unexpected EOF while looking for delimiter row",
                self.whole_line(header.line, header_line),
            ));
        };
        let columns = match parse_delimiter(delimiter_line) {
            Ok(columns) => columns,
            Err(0) => {
                return Err(Diagnostic::error(
                    E_TABLE_DELIMITER,
                    "delimiter row must appear after the head row",
                    self.whole_line(delimiter_no, delimiter_line),
                ));
            }
            Err(offset) => {
                return Err(Diagnostic::error(
                    E_TABLE_DELIMITER,
                    "ill-formed delimiter row",
                    self.at(
                        delimiter_no,
                        offset,
                        delimiter_line.len() - offset,
                        delimiter_line,
                    ),
                ));
            }
        };
        let column_count = columns
            .iter()
            .filter(|spec| matches!(spec, ColumnSpec::Column(_)))
            .count();
        if column_count == 0 {
            let warning = Diagnostic::warning(
                W_TABLE_ALIGN,
                "no alignment specified",
                self.whole_line(delimiter_no, delimiter_line),
            )
            .with_note(Diagnostic::note(
                "you may use :--, :-:, --:, or ---",
                Position::file(self.file),
            ));
            self.reporter.report(warning);
        }
        let delimiter = (delimiter_no, delimiter_line);
        self.check_columns(&header, header_line, column_count, delimiter);

        let mut body = vec![TableLine::Rule];
        for (line_no, line) in lines {
            match row_kind(line) {
                Some(RowKind::ThinRule) => body.push(TableLine::Rule),
                Some(RowKind::ThickRule) => {
                    body.push(TableLine::Rule);
                    body.push(TableLine::Rule);
                }
                Some(RowKind::Row) => {
                    let row = self.row(line_no, line)?;
                    self.check_columns(&row, line, column_count, delimiter);
                    body.push(TableLine::Row(row));
                }
                None => {
                    return Err(Diagnostic::error(
                        E_TABLE_SYNTAX,
                        "ill-formed table",
                        self.whole_line(line_no, line),
                    ));
                }
            }
        }

        Ok(Table {
            head_rules,
            header,
            columns,
            body,
        })
    }

    fn shell(&mut self, line_no: usize, opener: &str) -> Result<ShellBlock, Diagnostic> {
        let style = match opener.split(':').skip(1).collect::<Vec<_>>().as_slice() {
            [] => None,
            [foreground, background] => Some(ShellStyle {
                foreground: foreground.to_string(),
                background: background.to_string(),
            }),
            _ => {
                return Err(Diagnostic::error(
                    E_SHELL_SYNTAX,
                    "shell block style must be `#_:foreground:background`",
                    self.whole_line(line_no, opener),
                ));
            }
        };

        let start = self.cursor;
        let Some(lines) = self.take_until(|text| text.starts_with(SHELL_PREFIX)) else {
            return Err(Diagnostic::error(
                E_SHELL_UNCLOSED,
                "unclosed shell block",
                self.whole_line(line_no, opener),
            ));
        };

        let mut items = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            let transcript_no = self.lines.get(start + index).map_or(line_no, |l| l.line);
            let Some(caps) = SHELL_LINE.captures(line) else {
                return Err(Diagnostic::error(
                    E_SHELL_SYNTAX,
                    "ill-formed shell block",
                    self.whole_line(transcript_no, line),
                ));
            };
            let prompt = match caps.name("prompt").map_or("-", |m| m.as_str()) {
                "$" => ShellPrompt::User,
                "#" => ShellPrompt::Root,
                ">" => ShellPrompt::Continuation,
                _ => ShellPrompt::Output,
            };
            items.push(ShellItem::Prompt(prompt));
            let Some(text) = caps.name("text") else {
                continue;
            };
            if prompt != ShellPrompt::Output {
                items.push(ShellItem::Text(text.as_str().to_string()));
                continue;
            }
            self.styled_output(transcript_no, line, text.start(), &mut items);
        }

        Ok(ShellBlock { style, items })
    }

    /// Splits an output line at SGR sequences. Undecodable sequences degrade
    /// to a full reset.
    fn styled_output(&mut self, line_no: usize, line: &str, offset: usize, items: &mut Vec<ShellItem>) {
        let text = &line[offset..];
        let mut pos = 0;
        for caps in SGR_SEQUENCE.captures_iter(text) {
            let Some(sequence) = caps.get(0) else {
                continue;
            };
            items.push(ShellItem::Text(text[pos..sequence.start()].to_string()));
            let params = caps.name("params").map_or("", |m| m.as_str());
            let attrs = match decode_sgr(params) {
                Ok(attrs) => attrs,
                Err(err) => {
                    let warning = Diagnostic::warning(
                        W_SGR_MALFORMED,
                        format!("malformed escape sequence: {}", err),
                        self.at(line_no, offset + sequence.start(), sequence.len(), line),
                    );
                    self.reporter.report(warning);
                    StyleAttributes::reset()
                }
            };
            items.push(ShellItem::Style(attrs));
            pos = sequence.end();
        }
        if pos < text.len() {
            items.push(ShellItem::Text(text[pos..].to_string()));
        }
    }
}

fn opens_region(line: &str) -> bool {
    line.starts_with(RAW_PREFIX) || line.starts_with(SHELL_PREFIX) || CODE_FENCE.is_match(line)
}

fn row_kind(line: &str) -> Option<RowKind> {
    if let Some(caps) = TABLE_LINE.captures(line) {
        if caps.name("thin").is_some() {
            return Some(RowKind::ThinRule);
        }
        if caps.name("thick").is_some() {
            return Some(RowKind::ThickRule);
        }
        return Some(RowKind::Row);
    }
    has_separator(line).then_some(RowKind::Row)
}

/// True if `line` holds a `|` that is not backslash-escaped.
fn has_separator(line: &str) -> bool {
    let mut escaped = false;
    for ch in line.chars() {
        match ch {
            '\\' if !escaped => escaped = true,
            '|' if !escaped => return true,
            _ => escaped = false,
        }
    }
    false
}

/// Parses a delimiter row such as `|:--|-:-|--:|`. On failure returns the
/// byte offset where parsing stopped.
fn parse_delimiter(line: &str) -> Result<Vec<ColumnSpec>, usize> {
    let mut columns = Vec::new();
    let mut offset = 0;
    while let Some(caps) = DELIMITER_CELL.captures(&line[offset..]) {
        let Some(found) = caps.get(0) else {
            break;
        };
        if let Some(sep) = caps.name("sep") {
            let sep = sep.as_str().as_bytes();
            let (first, last) = (sep[0], sep[sep.len() - 1]);
            let alignment = if first == last {
                Alignment::Center
            } else if first == b':' {
                Alignment::Left
            } else {
                Alignment::Right
            };
            columns.push(ColumnSpec::Column(alignment));
        } else {
            columns.push(ColumnSpec::Rule);
        }
        offset += found.end();
    }
    if offset != line.len() || columns.is_empty() {
        return Err(offset);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::inline::InlineToken;

    fn parse_str(text: &str) -> Result<(Document, Vec<Diagnostic>), Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let document = parse(&SourceFile::new("p.md", text), &mut diagnostics)?;
        Ok((document, diagnostics))
    }

    fn blocks(text: &str) -> Vec<BlockKind> {
        parse_str(text)
            .expect("parse")
            .0
            .blocks
            .into_iter()
            .map(|block| block.kind)
            .collect()
    }

    #[test]
    fn section_levels_count_hashes() {
        let kinds = blocks("# A\n### Intro\n");
        assert!(matches!(kinds[0], BlockKind::Section { level: 0, .. }));
        assert!(matches!(kinds[1], BlockKind::Section { level: 2, .. }));

        let error = parse_str("#### Deep\n").expect_err("too deep");
        assert_eq!(error.code, E_SECTION_DEPTH);
        assert_eq!(error.message, "too low level section");
        assert_eq!(error.position.and_then(|p| p.length), Some(4));
    }

    #[test]
    fn nested_lists_open_and_close() {
        let kinds = blocks("- a\n  1. b\n  2. c\n- d\n\nafter\n");
        let BlockKind::List(events) = &kinds[0] else {
            panic!("expected list, got {:?}", kinds[0]);
        };
        let shape: Vec<&str> = events
            .iter()
            .map(|event| match event {
                ListEvent::Open(ListKind::Item) => "ul",
                ListEvent::Open(ListKind::Enum) => "ol",
                ListEvent::Close(ListKind::Item) => "/ul",
                ListEvent::Close(ListKind::Enum) => "/ol",
                ListEvent::Item(_) => "li",
            })
            .collect();
        assert_eq!(shape, vec!["ul", "li", "ol", "li", "li", "/ol", "li", "/ul"]);
        assert!(matches!(kinds[1], BlockKind::Paragraph(_)));
    }

    #[test]
    fn list_errors() {
        assert_eq!(parse_str("- a\n1. b\n").expect_err("kinds").code, E_LIST_KIND);
        assert_eq!(
            parse_str("- a\n    - b\n  - c\n").expect_err("indent").code,
            E_LIST_INDENT
        );
        assert_eq!(parse_str("- a\nplain\n").expect_err("syntax").code, E_LIST_SYNTAX);
    }

    #[test]
    fn table_without_outer_pipes() {
        let kinds = blocks("A|B\n:--|--:\n1|2\n");
        let BlockKind::Table(table) = &kinds[0] else {
            panic!("expected table, got {:?}", kinds[0]);
        };
        assert_eq!(table.alignments(), vec![Alignment::Left, Alignment::Right]);
        assert_eq!(table.header.text.cells().len(), 2);
        assert_eq!(table.body.len(), 2);
        assert!(matches!(table.body[0], TableLine::Rule));
    }

    #[test]
    fn table_rules_and_column_warning() {
        let (document, diagnostics) =
            parse_str("=+++\n|a|b|\n|:-:|---|--:|\n|1|2|3|\n---\n").expect("parse");
        let BlockKind::Table(table) = &document.blocks[0].kind else {
            panic!("expected table");
        };
        assert_eq!(table.head_rules, 2);
        assert_eq!(
            table.columns,
            vec![
                ColumnSpec::Rule,
                ColumnSpec::Column(Alignment::Center),
                ColumnSpec::Rule,
                ColumnSpec::Column(Alignment::Center),
                ColumnSpec::Rule,
                ColumnSpec::Column(Alignment::Right),
                ColumnSpec::Rule,
            ]
        );
        assert_eq!(table.body.len(), 3);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, W_TABLE_COLUMNS);
        assert_eq!(
            diagnostics[0].note.as_ref().map(|note| note.message.as_str()),
            Some("expected 3, but got 2")
        );
    }

    #[test]
    fn table_errors() {
        assert_eq!(parse_str("---\n\n").expect_err("no head").code, E_TABLE_HEADER);
        assert_eq!(parse_str("|a|\n").expect_err("eof").code, E_TABLE_DELIMITER);
        let error = parse_str("|a|\n|:-:| x\n").expect_err("leftover");
        assert_eq!(error.message, "ill-formed delimiter row");
        assert_eq!(error.position.and_then(|p| p.column), Some(7));
        assert_eq!(
            parse_str("|a|\nnot a row\n").expect_err("missing").message,
            "delimiter row must appear after the head row"
        );
    }

    #[test]
    fn delimiter_without_columns_warns() {
        let (_, diagnostics) = parse_str("|a|\n|\n").expect("parse");
        assert_eq!(diagnostics[0].code, W_TABLE_ALIGN);
    }

    #[test]
    fn code_raw_and_shell_blocks() {
        let kinds = blocks("```[main.rs]\nfn main() {}\n```\n#&\n\\relax\n#&\n");
        assert_eq!(
            kinds[0],
            BlockKind::Code {
                name: Some("main.rs".to_string()),
                lines: vec!["fn main() {}".to_string()],
            }
        );
        assert_eq!(
            kinds[1],
            BlockKind::Raw {
                lines: vec!["\\relax".to_string()]
            }
        );
    }

    #[test]
    fn regions_end_lists_and_tables() {
        let kinds = blocks("- a\n```\n- not an item\n```\nA|B\n---|---\n#&\n|raw|\n#&\n");
        assert!(matches!(kinds[0], BlockKind::List(_)));
        assert_eq!(
            kinds[1],
            BlockKind::Code {
                name: None,
                lines: vec!["- not an item".to_string()],
            }
        );
        assert!(matches!(kinds[2], BlockKind::Table(_)));
        assert_eq!(
            kinds[3],
            BlockKind::Raw {
                lines: vec!["|raw|".to_string()]
            }
        );
    }

    #[test]
    fn shell_output_is_split_at_escape_sequences() {
        let kinds = blocks("#_:white:black\n$ ls\n- \u{1b}[1;31merr\u{1b}[0m ok\n#_\n");
        let BlockKind::Shell(shell) = &kinds[0] else {
            panic!("expected shell block");
        };
        assert_eq!(
            shell.style,
            Some(ShellStyle {
                foreground: "white".to_string(),
                background: "black".to_string(),
            })
        );
        assert_eq!(shell.items.len(), 8);
        assert_eq!(shell.items[1], ShellItem::Text("ls".to_string()));
        assert_eq!(shell.items[3], ShellItem::Text(String::new()));
        assert_eq!(shell.items[5], ShellItem::Text("err".to_string()));
        assert_eq!(shell.items[7], ShellItem::Text(" ok".to_string()));
    }

    #[test]
    fn malformed_escape_degrades_to_reset() {
        let (document, diagnostics) = parse_str("#_\n- \u{1b}[38;5mx\n#_\n").expect("parse");
        let BlockKind::Shell(shell) = &document.blocks[0].kind else {
            panic!("expected shell block");
        };
        assert_eq!(shell.items[2], ShellItem::Style(StyleAttributes::reset()));
        assert_eq!(diagnostics[0].code, W_SGR_MALFORMED);
        assert_eq!(diagnostics[0].position.as_ref().and_then(|p| p.column), Some(3));
    }

    #[test]
    fn title_and_author_are_kept_apart() {
        let (document, _) = parse_str("#: Main\n#:: Sub\n#@ Me\nbody\n").expect("parse");
        let title = document.title.expect("title");
        assert_eq!(title.lines.len(), 2);
        assert_eq!(title.lines[1].0, 2);
        assert_eq!(
            title.lines[0].1.tokens,
            vec![InlineToken::Normal("Main".to_string())]
        );
        assert_eq!(document.author.expect("author").lines.len(), 1);
        assert_eq!(document.blocks.len(), 1);

        let error = parse_str("#::::::::::: too small\n").expect_err("depth");
        assert_eq!(error.code, E_TITLE_DEPTH);
    }

    #[test]
    fn unknown_directive_and_controls() {
        assert_eq!(parse_str("#? what\n").expect_err("directive").code, E_DIRECTIVE_UNKNOWN);
        assert_eq!(
            blocks("\u{c}\n\u{c}\u{c}\n"),
            vec![
                BlockKind::Control { depth: 1 },
                BlockKind::Control { depth: 2 }
            ]
        );
    }

    #[test]
    fn blank_documents_warn() {
        let (_, diagnostics) = parse_str("\n  \n").expect("parse");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, W_EMPTY_INPUT);

        let (_, diagnostics) = parse_str("#: Only a title\n").expect("parse");
        assert!(diagnostics.is_empty());
    }
}
