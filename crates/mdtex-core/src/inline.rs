//! Tokenizer for the text of a single line.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::diagnostic::{
    Diagnostic, E_CMD_ARGUMENT, E_CMD_SYNTAX, E_CMD_UNCLOSED, E_CMD_UNKNOWN, E_CMD_UNMATCHED,
    E_EMPH_NESTING, E_EMPH_UNCLOSED, E_FOOTNOTE_NESTED, E_FOOTNOTE_UNDEFINED, E_MARKER_UNCLOSED,
    E_MATH_IN_EMPH, Position, Reporter, W_EMPH_MARKER, W_MARKER_LENGTH,
};
use crate::footnote::FootnoteTable;
use crate::span::Span;

const INLINE_BODY: &str = concat!(
    r"\\(?P<escaped>.)",
    r"|(?P<need_escape>[#%{}^~<>])",
    r#"|(?P<quote>["'])"#,
    r"|\[\^(?P<footnote>[\w-]+)\]",
    r"|(?P<bold>\*+)",
    r"|(?P<italic>_+)",
    r"|(?P<verbatim>`+)",
    r"|(?P<command>@\[)",
    r"|(?P<close>@)",
    r"|(?P<raw>&+)",
    r"|(?P<math>\$+)",
    r"|(?P<pages>\b[Pp]p?\. ?(?P<pp_first>\d+)(?P<pp_dash>-*)(?P<pp_last>\d*))",
    r"|(?P<figure>\b[Ff]ig\. ?(?P<fig_no>\d+))",
    r"|\b(?P<abbrev>e\.g\.|cf\.|i\.e\.) ",
    r"|(?P<ellipsis>\.\.\.)",
    r"|(?P<comma>\s*,\s*)",
);

static INLINE: Lazy<Regex> = Lazy::new(|| Regex::new(INLINE_BODY).unwrap());

static INLINE_WITH_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?P<separator>\|)|{}", INLINE_BODY)).unwrap());

static COMMAND_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(?P<name>[^\]]+)\]").unwrap());

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9A-Fa-f]{3}){1,2}$").unwrap());

static NAMED_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").unwrap());

/// The block an inline text sits in. Decides line terminators and how
/// footnote references are wrapped.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TextContext {
    Paragraph,
    Heading,
    TableCell,
    ListItem,
    Footnote,
    Title,
    Author,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Marker {
    Open,
    Close,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Emphasis {
    Bold,
    Italic,
}

impl Emphasis {
    fn index(self) -> usize {
        match self {
            Emphasis::Bold => 0,
            Emphasis::Italic => 1,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CommandColor {
    Rgb(u8, u8, u8),
    Named(String),
}

/// A recognised `@[name]` command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Monospace,
    SmallCaps,
    Align,
    Color(CommandColor),
    TeX,
    LaTeX,
    LaTeXe,
    Url(String),
}

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "tt" => return Some(Command::Monospace),
            "sc" => return Some(Command::SmallCaps),
            "align" => return Some(Command::Align),
            "TeX" => return Some(Command::TeX),
            "LaTeX" => return Some(Command::LaTeX),
            "LaTeXe" => return Some(Command::LaTeXe),
            _ => {}
        }
        if let Some(color) = name.strip_prefix("color:") {
            return parse_color(color).map(Command::Color);
        }
        if let Some(target) = name.strip_prefix("url:") {
            if !target.is_empty() {
                return Some(Command::Url(target.to_string()));
            }
        }
        None
    }

    /// The logo commands only stand alone: `@[TeX]@`.
    pub fn takes_argument(&self) -> bool {
        !matches!(self, Command::TeX | Command::LaTeX | Command::LaTeXe)
    }
}

fn parse_color(spec: &str) -> Option<CommandColor> {
    if HEX_COLOR.is_match(spec) {
        let digits = &spec[1..];
        let channel = |idx: usize| -> Option<u8> {
            if digits.len() == 3 {
                let nibble = u8::from_str_radix(&digits[idx..idx + 1], 16).ok()?;
                Some(nibble * 17)
            } else {
                u8::from_str_radix(&digits[idx * 2..idx * 2 + 2], 16).ok()
            }
        };
        return Some(CommandColor::Rgb(channel(0)?, channel(1)?, channel(2)?));
    }
    NAMED_COLOR
        .is_match(spec)
        .then(|| CommandColor::Named(spec.to_string()))
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PageRange {
    Single,
    OpenEnded,
    To(String),
}

/// Typographic shorthands recognised inside running text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SpecialText {
    /// `p. 3`, `pp. 3-5`, `pp. 3-`; `initial` keeps the case of the `p`.
    Pages {
        initial: char,
        first: String,
        range: PageRange,
    },
    /// `Fig. 2`; `prefix` is `Fig` or `fig`.
    Figure { prefix: String, number: String },
    Abbreviation(String),
    Ellipsis,
    /// A comma with its surrounding whitespace; `spaced` when a word follows.
    Comma { spaced: bool },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InlineToken {
    Normal(String),
    Escaped(char),
    NeedEscape(char),
    Separator,
    Quote { double: bool, open: bool },
    FootnoteRef(String),
    Bold(Marker),
    Italic(Marker),
    Verbatim(String),
    Command(Command),
    CommandClose,
    RawMarkup(String),
    Math(String),
    Special(SpecialText),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InlineText {
    pub context: TextContext,
    pub tokens: Vec<InlineToken>,
}

impl InlineText {
    /// True when the text holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        is_blank_tokens(&self.tokens)
    }

    pub fn separator_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|token| matches!(token, InlineToken::Separator))
            .count()
    }

    /// Splits a table row into its cells. Pipes at the very start or end of
    /// the row are borders rather than cell boundaries.
    pub fn cells(&self) -> Vec<&[InlineToken]> {
        let mut cells: Vec<&[InlineToken]> = self
            .tokens
            .split(|token| matches!(token, InlineToken::Separator))
            .collect();
        if cells.len() > 1 && is_blank_tokens(cells[0]) {
            cells.remove(0);
        }
        if cells.len() > 1 && cells.last().is_some_and(|cell| is_blank_tokens(cell)) {
            cells.pop();
        }
        cells
    }
}

fn is_blank_tokens(tokens: &[InlineToken]) -> bool {
    tokens.iter().all(|token| match token {
        InlineToken::Normal(text) => text.trim().is_empty(),
        _ => false,
    })
}

/// Parses line text into [`InlineText`].
///
/// Without a footnote table any footnote reference is rejected, which is how
/// footnote bodies are kept free of nested references.
#[derive(Clone, Copy, Debug)]
pub struct InlineParser<'a> {
    file: &'a str,
    footnotes: Option<&'a FootnoteTable>,
    separators: bool,
}

impl<'a> InlineParser<'a> {
    pub fn new(file: &'a str, footnotes: Option<&'a FootnoteTable>) -> Self {
        Self {
            file,
            footnotes,
            separators: false,
        }
    }

    /// Treat `|` as a cell separator.
    pub fn with_separators(mut self) -> Self {
        self.separators = true;
        self
    }

    /// Tokenizes `line[offset..]`. `line_no` is 0-based and only used for
    /// diagnostics, which always point into the full `line`.
    pub fn parse(
        &self,
        line_no: usize,
        line: &str,
        offset: usize,
        context: TextContext,
        reporter: &mut dyn Reporter,
    ) -> Result<InlineText, Diagnostic> {
        let scan = Scan {
            parser: self,
            line_no,
            line,
            reporter,
            tokens: Vec::new(),
            emphasis: Vec::new(),
            markers: [0; 2],
            quoted: [false; 2],
            commands: Vec::new(),
        };
        let tokens = scan.run(offset)?;
        Ok(InlineText { context, tokens })
    }
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum RunKind {
    Verbatim,
    Raw,
    Math,
}

struct OpenCommand {
    command: Command,
    at: usize,
    name_len: usize,
}

struct Scan<'p, 'l, 'r> {
    parser: &'p InlineParser<'p>,
    line_no: usize,
    line: &'l str,
    reporter: &'r mut dyn Reporter,
    tokens: Vec<InlineToken>,
    emphasis: Vec<(Emphasis, usize)>,
    markers: [usize; 2],
    quoted: [bool; 2],
    commands: Vec<OpenCommand>,
}

impl Scan<'_, '_, '_> {
    fn position(&self, start: usize, len: usize) -> Position {
        Position::span(
            self.parser.file,
            self.line_no,
            Span::at(start, len),
            self.line,
        )
    }

    fn run(mut self, mut offset: usize) -> Result<Vec<InlineToken>, Diagnostic> {
        let regex: &Regex = if self.parser.separators {
            &INLINE_WITH_SEPARATOR
        } else {
            &INLINE
        };
        let line = self.line;

        while let Some(caps) = regex.captures_at(line, offset) {
            let Some(found) = caps.get(0) else {
                break;
            };
            let (start, end) = (found.start(), found.end());
            if offset < start {
                self.tokens
                    .push(InlineToken::Normal(line[offset..start].to_string()));
            }
            offset = self.token(&caps, start, end)?;
        }

        if let Some(&(kind, at)) = self.emphasis.last() {
            return Err(Diagnostic::error(
                E_EMPH_UNCLOSED,
                "unclosed emphasis marker",
                self.position(at, self.markers[kind.index()]),
            ));
        }
        if let Some(open) = self.commands.last() {
            return Err(Diagnostic::error(
                E_CMD_UNCLOSED,
                "unclosed @ command",
                self.position(open.at, open.name_len + 3),
            ));
        }

        self.tokens
            .push(InlineToken::Normal(line[offset..].to_string()));
        Ok(self.tokens)
    }

    /// Handles one match and returns the offset to resume scanning from.
    fn token(&mut self, caps: &Captures<'_>, start: usize, end: usize) -> Result<usize, Diagnostic> {
        let line = self.line;
        if caps.name("separator").is_some() {
            self.tokens.push(InlineToken::Separator);
        } else if let Some(ch) = caps.name("escaped") {
            if let Some(ch) = ch.as_str().chars().next() {
                self.tokens.push(InlineToken::Escaped(ch));
            }
        } else if let Some(ch) = caps.name("need_escape") {
            if let Some(ch) = ch.as_str().chars().next() {
                self.tokens.push(InlineToken::NeedEscape(ch));
            }
        } else if let Some(quote) = caps.name("quote") {
            let double = quote.as_str() == "\"";
            let slot = &mut self.quoted[usize::from(double)];
            self.tokens.push(InlineToken::Quote {
                double,
                open: !*slot,
            });
            *slot = !*slot;
        } else if let Some(label) = caps.name("footnote") {
            self.footnote(label.as_str(), start, end)?;
        } else if caps.name("bold").is_some() {
            self.emphasize(Emphasis::Bold, start, end)?;
        } else if caps.name("italic").is_some() {
            self.emphasize(Emphasis::Italic, start, end)?;
        } else if caps.name("verbatim").is_some() {
            return self.delimited(RunKind::Verbatim, start, end);
        } else if caps.name("raw").is_some() {
            return self.delimited(RunKind::Raw, start, end);
        } else if caps.name("math").is_some() {
            return self.delimited(RunKind::Math, start, end);
        } else if caps.name("command").is_some() {
            return self.open_command(start);
        } else if caps.name("close").is_some() {
            self.close_command(start, end)?;
        } else if caps.name("pages").is_some() {
            let range = match (caps.name("pp_last"), caps.name("pp_dash")) {
                (Some(last), _) if !last.as_str().is_empty() => {
                    PageRange::To(last.as_str().to_string())
                }
                (_, Some(dash)) if !dash.as_str().is_empty() => PageRange::OpenEnded,
                _ => PageRange::Single,
            };
            self.tokens.push(InlineToken::Special(SpecialText::Pages {
                initial: line[start..].chars().next().unwrap_or('p'),
                first: caps
                    .name("pp_first")
                    .map_or_else(String::new, |m| m.as_str().to_string()),
                range,
            }));
        } else if caps.name("figure").is_some() {
            self.tokens.push(InlineToken::Special(SpecialText::Figure {
                prefix: line[start..start + 3].to_string(),
                number: caps
                    .name("fig_no")
                    .map_or_else(String::new, |m| m.as_str().to_string()),
            }));
        } else if let Some(abbrev) = caps.name("abbrev") {
            self.tokens.push(InlineToken::Special(SpecialText::Abbreviation(
                abbrev.as_str().to_string(),
            )));
        } else if caps.name("ellipsis").is_some() {
            self.tokens.push(InlineToken::Special(SpecialText::Ellipsis));
        } else if caps.name("comma").is_some() {
            let spaced = line[end..]
                .chars()
                .next()
                .is_some_and(|ch| ch.is_alphanumeric() || ch == '_');
            self.tokens
                .push(InlineToken::Special(SpecialText::Comma { spaced }));
        }
        Ok(end)
    }

    fn footnote(&mut self, label: &str, start: usize, end: usize) -> Result<(), Diagnostic> {
        let Some(footnotes) = self.parser.footnotes else {
            return Err(Diagnostic::error(
                E_FOOTNOTE_NESTED,
                "nested footnote",
                self.position(start, end - start),
            ));
        };
        if !footnotes.contains(label) {
            return Err(Diagnostic::error(
                E_FOOTNOTE_UNDEFINED,
                "undefined footnote label",
                self.position(start + 2, label.len()),
            ));
        }
        self.tokens
            .push(InlineToken::FootnoteRef(label.to_string()));
        Ok(())
    }

    fn emphasis_token(kind: Emphasis, marker: Marker) -> InlineToken {
        match kind {
            Emphasis::Bold => InlineToken::Bold(marker),
            Emphasis::Italic => InlineToken::Italic(marker),
        }
    }

    fn emphasize(&mut self, kind: Emphasis, start: usize, end: usize) -> Result<(), Diagnostic> {
        let len = end - start;
        let opened = self.markers[kind.index()];

        if opened > 0 && opened <= len {
            if let Some(&(top, _)) = self.emphasis.last() {
                if top != kind {
                    let first = self
                        .emphasis
                        .iter()
                        .find(|(open, _)| *open == kind)
                        .map_or(start, |&(_, at)| at);
                    return Err(Diagnostic::error(
                        E_EMPH_NESTING,
                        "ill-formed nesting",
                        self.position(first, end - first),
                    ));
                }
            }

            self.tokens.push(Self::emphasis_token(kind, Marker::Close));
            let previous = self.emphasis.pop().map_or(start, |(_, at)| at);
            if opened < len {
                let tail = start + opened;
                let warning = Diagnostic::warning(
                    W_EMPH_MARKER,
                    "weird emphasis marker",
                    self.position(tail, len - opened),
                )
                .with_note(Diagnostic::note(
                    "previous emphasis here",
                    self.position(previous, tail - previous),
                ));
                self.reporter.report(warning);
                self.emphasis.push((kind, tail));
                self.tokens.push(Self::emphasis_token(kind, Marker::Open));
                self.markers[kind.index()] = len - opened;
            } else {
                self.markers[kind.index()] = 0;
            }
        } else if len < opened {
            self.tokens
                .push(InlineToken::Normal(self.line[start..end].to_string()));
        } else {
            self.emphasis.push((kind, start));
            self.tokens.push(Self::emphasis_token(kind, Marker::Open));
            self.markers[kind.index()] = len;
        }
        Ok(())
    }

    /// Verbatim, raw and math runs: everything up to the next run of the
    /// same marker is taken literally.
    fn delimited(&mut self, kind: RunKind, start: usize, end: usize) -> Result<usize, Diagnostic> {
        let line = self.line;
        let marker = &line[start..end];
        let len = marker.len();
        let marker_char = marker.chars().next().unwrap_or('`');

        if kind == RunKind::Math {
            if let Some(&(emphasis, at)) = self.emphasis.last() {
                return Err(Diagnostic::error(
                    E_MATH_IN_EMPH,
                    "$ is not allowed in marked context",
                    self.position(start, len),
                )
                .with_note(Diagnostic::note(
                    "previous marker opened here",
                    self.position(at, self.markers[emphasis.index()]),
                )));
            }
        }

        let Some(found) = line[end..].find(marker) else {
            return Err(Diagnostic::error(
                E_MARKER_UNCLOSED,
                format!("unclosed {}", marker),
                self.position(start, len),
            ));
        };
        let close = end + found;
        let after = close + len;

        let excess = line[after..]
            .bytes()
            .take_while(|byte| char::from(*byte) == marker_char)
            .count();
        if excess > 0 {
            let warning = Diagnostic::warning(
                W_MARKER_LENGTH,
                "weird marker",
                self.position(after, excess),
            )
            .with_note(Diagnostic::note(
                "previous marker here",
                self.position(start, after - start),
            ));
            self.reporter.report(warning);
        }

        let mut body = &line[end..close];
        if body.starts_with(' ') && body.trim_start_matches(' ').starts_with(marker_char) {
            body = &body[1..];
        }
        if body.ends_with(' ') && body.trim_end_matches(' ').ends_with(marker_char) {
            body = &body[..body.len() - 1];
        }
        let body = body.to_string();

        self.tokens.push(match kind {
            RunKind::Verbatim => InlineToken::Verbatim(body),
            RunKind::Raw => InlineToken::RawMarkup(body),
            RunKind::Math => InlineToken::Math(body),
        });
        Ok(after)
    }

    fn open_command(&mut self, at: usize) -> Result<usize, Diagnostic> {
        let line = self.line;
        let Some(caps) = COMMAND_NAME.captures(&line[at + 1..]) else {
            return Err(Diagnostic::error(
                E_CMD_SYNTAX,
                "\"[\" function-name \"]\" is expected",
                self.position(at, 2),
            ));
        };
        let name = caps.name("name").map_or("", |m| m.as_str());
        let Some(command) = Command::from_name(name) else {
            return Err(Diagnostic::error(
                E_CMD_UNKNOWN,
                format!("unknown @ command '{}'", name),
                self.position(at + 2, name.len()),
            ));
        };
        let mut offset = at + name.len() + 3;

        if command == Command::Align {
            self.tokens.push(InlineToken::Command(command));
            let mut body = String::new();
            let mut chars = line[offset..].chars();
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some('@') => {
                            body.push('@');
                            offset += 2;
                        }
                        Some(ch) => {
                            body.push('\\');
                            body.push(ch);
                            offset += 1 + ch.len_utf8();
                        }
                        None => break,
                    },
                    Some('@') | None => break,
                    Some(ch) => {
                        body.push(ch);
                        offset += ch.len_utf8();
                    }
                }
            }
            self.tokens.push(InlineToken::RawMarkup(body));
            if !line[offset..].starts_with('@') {
                return Err(Diagnostic::error(
                    E_CMD_UNCLOSED,
                    "unclosed @[align]",
                    self.position(at, 8),
                ));
            }
            self.tokens.push(InlineToken::CommandClose);
            return Ok(offset + 1);
        }

        self.commands.push(OpenCommand {
            command: command.clone(),
            at,
            name_len: name.len(),
        });
        self.tokens.push(InlineToken::Command(command));
        Ok(offset)
    }

    fn close_command(&mut self, start: usize, end: usize) -> Result<(), Diagnostic> {
        let Some(open) = self.commands.pop() else {
            return Err(Diagnostic::error(
                E_CMD_UNMATCHED,
                "invalid @ command",
                self.position(start, 1),
            ));
        };
        if !open.command.takes_argument() {
            let body_start = open.at + open.name_len + 3;
            if body_start != start {
                let name = &self.line[open.at + 2..open.at + 2 + open.name_len];
                return Err(Diagnostic::error(
                    E_CMD_ARGUMENT,
                    format!("@ command '{}' takes no argument", name),
                    self.position(body_start, end - body_start - 1),
                ));
            }
        }
        self.tokens.push(InlineToken::CommandClose);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::diagnostic::{Diagnostic, Severity};

    fn tokens(line: &str) -> Vec<InlineToken> {
        let table = FootnoteTable::default();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        InlineParser::new("t.md", Some(&table))
            .parse(0, line, 0, TextContext::Paragraph, &mut diagnostics)
            .expect("parse")
            .tokens
    }

    fn error(line: &str) -> Diagnostic {
        let table = FootnoteTable::default();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        InlineParser::new("t.md", Some(&table))
            .parse(0, line, 0, TextContext::Paragraph, &mut diagnostics)
            .expect_err("parse should fail")
    }

    fn normal(text: &str) -> InlineToken {
        InlineToken::Normal(text.to_string())
    }

    #[test]
    fn emphasis_pairs_are_tokenized() {
        assert_eq!(
            tokens("*bold* and _em_"),
            vec![
                InlineToken::Bold(Marker::Open),
                normal("bold"),
                InlineToken::Bold(Marker::Close),
                normal(" and "),
                InlineToken::Italic(Marker::Open),
                normal("em"),
                InlineToken::Italic(Marker::Close),
                normal(""),
            ]
        );
    }

    #[test]
    fn shorter_run_inside_longer_emphasis_is_text() {
        assert_eq!(
            tokens("**a * b**"),
            vec![
                InlineToken::Bold(Marker::Open),
                normal("a "),
                normal("*"),
                normal(" b"),
                InlineToken::Bold(Marker::Close),
                normal(""),
            ]
        );
    }

    #[test]
    fn longer_closing_run_reopens_with_warning() {
        let table = FootnoteTable::default();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let text = InlineParser::new("t.md", Some(&table))
            .parse(0, "*a** b*", 0, TextContext::Paragraph, &mut diagnostics)
            .expect("recovers");

        assert_eq!(
            text.tokens,
            vec![
                InlineToken::Bold(Marker::Open),
                normal("a"),
                InlineToken::Bold(Marker::Close),
                InlineToken::Bold(Marker::Open),
                normal(" b"),
                InlineToken::Bold(Marker::Close),
                normal(""),
            ]
        );
        assert_eq!(diagnostics.len(), 1);
        let warning = &diagnostics[0];
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.message, "weird emphasis marker");
        let position = warning.position.as_ref().expect("position");
        assert_eq!((position.column, position.length), (Some(4), Some(1)));
        let note = warning.note.as_ref().expect("note");
        assert_eq!(note.severity, Severity::Note);
        assert_eq!(note.message, "previous emphasis here");
    }

    #[test]
    fn crossing_emphasis_is_fatal() {
        let diagnostic = error("*a _b* c_");
        assert_eq!(diagnostic.code, E_EMPH_NESTING);
        let position = diagnostic.position.expect("position");
        assert_eq!((position.column, position.length), (Some(1), Some(6)));
    }

    #[rstest]
    #[case("*open", E_EMPH_UNCLOSED, 1)]
    #[case("`code", E_MARKER_UNCLOSED, 1)]
    #[case("x $$a$", E_MARKER_UNCLOSED, 3)]
    #[case("@[tt]x", E_CMD_UNCLOSED, 1)]
    #[case("a @ b", E_CMD_UNMATCHED, 3)]
    #[case("@[bogus]x@", E_CMD_UNKNOWN, 3)]
    #[case("@[align]x", E_CMD_UNCLOSED, 1)]
    #[case("@x", E_CMD_UNMATCHED, 1)]
    #[case("_a $x$_", E_MATH_IN_EMPH, 4)]
    fn unterminated_constructs_point_at_their_opener(
        #[case] line: &str,
        #[case] code: &str,
        #[case] column: usize,
    ) {
        let diagnostic = error(line);
        assert_eq!(diagnostic.code, code);
        assert_eq!(diagnostic.position.and_then(|p| p.column), Some(column));
    }

    #[test]
    fn verbatim_keeps_markup_and_trims_padding() {
        assert_eq!(
            tokens("see `` `x*y` `` now"),
            vec![
                normal("see "),
                InlineToken::Verbatim("`x*y`".to_string()),
                normal(" now"),
            ]
        );
        assert_eq!(
            tokens("&\\alpha& $x<y$"),
            vec![
                InlineToken::RawMarkup("\\alpha".to_string()),
                normal(" "),
                InlineToken::Math("x<y".to_string()),
                normal(""),
            ]
        );
    }

    #[test]
    fn mismatched_closing_run_warns_but_closes() {
        let table = FootnoteTable::default();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let result = InlineParser::new("t.md", Some(&table)).parse(
            0,
            "`a``",
            0,
            TextContext::Paragraph,
            &mut diagnostics,
        );
        assert!(result.is_err(), "the stray backtick opens a new run");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, W_MARKER_LENGTH);
    }

    #[test]
    fn quotes_alternate_per_kind() {
        assert_eq!(
            tokens(r#"'a' "b""#),
            vec![
                InlineToken::Quote {
                    double: false,
                    open: true
                },
                normal("a"),
                InlineToken::Quote {
                    double: false,
                    open: false
                },
                normal(" "),
                InlineToken::Quote {
                    double: true,
                    open: true
                },
                normal("b"),
                InlineToken::Quote {
                    double: true,
                    open: false
                },
                normal(""),
            ]
        );
    }

    #[test]
    fn commands_are_validated_and_closed() {
        assert_eq!(
            tokens("@[color:#f80]hot@ @[LaTeX]@"),
            vec![
                InlineToken::Command(Command::Color(CommandColor::Rgb(255, 136, 0))),
                normal("hot"),
                InlineToken::CommandClose,
                normal(" "),
                InlineToken::Command(Command::LaTeX),
                InlineToken::CommandClose,
                normal(""),
            ]
        );
        assert_eq!(error("@[TeX]x@").code, E_CMD_ARGUMENT);
    }

    #[test]
    fn align_body_is_raw_with_escaped_at() {
        assert_eq!(
            tokens(r"@[align]a \@ b \\ c@!"),
            vec![
                InlineToken::Command(Command::Align),
                InlineToken::RawMarkup(r"a @ b \\ c".to_string()),
                InlineToken::CommandClose,
                normal("!"),
            ]
        );
    }

    #[test]
    fn separators_only_when_requested() {
        let table = FootnoteTable::default();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let row = InlineParser::new("t.md", Some(&table))
            .with_separators()
            .parse(0, r"|a\|b|c|", 0, TextContext::TableCell, &mut diagnostics)
            .expect("row");
        assert_eq!(row.separator_count(), 3);
        assert_eq!(row.cells().len(), 2);
        assert_eq!(tokens("a|b"), vec![normal("a|b")]);
    }

    #[test]
    fn special_text_patterns() {
        assert_eq!(
            tokens("pp. 3-5, e.g. Fig. 2..."),
            vec![
                InlineToken::Special(SpecialText::Pages {
                    initial: 'p',
                    first: "3".to_string(),
                    range: PageRange::To("5".to_string()),
                }),
                InlineToken::Special(SpecialText::Comma { spaced: true }),
                InlineToken::Special(SpecialText::Abbreviation("e.g.".to_string())),
                InlineToken::Special(SpecialText::Figure {
                    prefix: "Fig".to_string(),
                    number: "2".to_string(),
                }),
                InlineToken::Special(SpecialText::Ellipsis),
                normal(""),
            ]
        );
    }

    #[test]
    fn footnote_references_need_a_table() {
        let mut table = FootnoteTable::default();
        table.insert_for_test("n1");
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let text = InlineParser::new("t.md", Some(&table))
            .parse(0, "x[^n1]", 0, TextContext::Paragraph, &mut diagnostics)
            .expect("resolved");
        assert_eq!(text.tokens[1], InlineToken::FootnoteRef("n1".to_string()));

        let undefined = InlineParser::new("t.md", Some(&table))
            .parse(0, "x[^n2]", 0, TextContext::Paragraph, &mut diagnostics)
            .expect_err("undefined");
        assert_eq!(undefined.code, E_FOOTNOTE_UNDEFINED);
        let position = undefined.position.expect("position");
        assert_eq!((position.column, position.length), (Some(4), Some(2)));

        let nested = InlineParser::new("t.md", None)
            .parse(0, "x[^n1]", 0, TextContext::Footnote, &mut diagnostics)
            .expect_err("nested");
        assert_eq!(nested.code, E_FOOTNOTE_NESTED);
    }
}
