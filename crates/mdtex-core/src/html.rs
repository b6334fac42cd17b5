//! HTML backend.

use crate::ast::{
    Alignment, Author, Block, BlockKind, ListEvent, ListKind, ShellBlock, ShellItem, ShellPrompt,
    Table, TableLine, TableRow, Title,
};
use crate::csi::StyleState;
use crate::escape::{escape_html, escape_url_attr, html_escaped, html_math};
use crate::footnote::FootnoteTable;
use crate::inline::{
    Command, CommandColor, InlineText, InlineToken, Marker, PageRange, SpecialText, TextContext,
};

const TABLE_CLASS: &str = "table table-striped table-condensed";

/// Attributes of the tooltip anchor a footnote turns into.
const FOOTNOTE_ATTRS: &str = concat!(
    r#"class="glyphicon glyphicon-question-sign" aria-hidden="true" "#,
    r#"data-html="true" data-toggle="tooltip" title="""#,
);

struct HtmlWriter {
    out: String,
    indent: usize,
}

impl HtmlWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn finish(self) -> String {
        self.out
    }
}

pub(crate) struct HtmlRenderer<'d> {
    footnotes: &'d FootnoteTable,
}

impl<'d> HtmlRenderer<'d> {
    pub(crate) fn new(footnotes: &'d FootnoteTable) -> Self {
        Self { footnotes }
    }

    /// Renders the blocks, wrapping each run of non-blank paragraphs in one
    /// `<p>` element.
    pub(crate) fn body(&self, blocks: &[Block]) -> String {
        let mut writer = HtmlWriter::new();
        let mut in_paragraph = false;
        for block in blocks {
            let text = match &block.kind {
                BlockKind::Paragraph(text) if !text.is_blank() => Some(text),
                _ => None,
            };
            match (in_paragraph, text.is_some()) {
                (true, false) => writer.raw("</p>\n"),
                (false, true) => writer.raw("<p>"),
                _ => {}
            }
            in_paragraph = text.is_some();
            self.block(&mut writer, block);
        }
        if in_paragraph {
            writer.raw("</p>\n");
        }
        writer.finish()
    }

    /// `<title>` holds raw text, so markup is flattened before escaping.
    pub(crate) fn title(&self, title: &Title) -> String {
        let text: Vec<String> = title
            .lines
            .iter()
            .map(|(_, text)| self.plain(text).trim().to_string())
            .collect();
        format!("<title>{}</title>", escape_html(&text.join(" ")))
    }

    pub(crate) fn author(&self, author: &Author) -> String {
        let names: Vec<String> = author
            .lines
            .iter()
            .map(|text| self.plain(text).trim().to_string())
            .collect();
        format!(
            r#"<meta name="author" content="{}">"#,
            escape_html(&names.join(", "))
        )
    }

    /// Unescaped text of `text` with every marker dropped. Footnote
    /// references still count as used.
    fn plain(&self, text: &InlineText) -> String {
        let mut out = String::new();
        let mut previous: Option<&InlineToken> = None;
        for token in &text.tokens {
            match token {
                InlineToken::Normal(text) | InlineToken::Verbatim(text) => out.push_str(text),
                InlineToken::RawMarkup(text) => out.push_str(text),
                InlineToken::Escaped(ch) | InlineToken::NeedEscape(ch) => out.push(*ch),
                InlineToken::Quote { double, open } => out.push(match (double, open) {
                    (false, true) => '\u{2018}',
                    (false, false) => '\u{2019}',
                    (true, true) => '\u{201c}',
                    (true, false) => '\u{201d}',
                }),
                InlineToken::FootnoteRef(label) => {
                    if let Some(footnote) = self.footnotes.get(label) {
                        footnote.mark_used();
                    }
                }
                InlineToken::Command(Command::TeX) => out.push_str("TeX"),
                InlineToken::Command(Command::LaTeX) => out.push_str("LaTeX"),
                InlineToken::Command(Command::LaTeXe) => out.push_str("LaTeX2e"),
                InlineToken::CommandClose => {
                    if let Some(InlineToken::Command(Command::Url(target))) = previous {
                        out.push_str(target);
                    }
                }
                InlineToken::Math(math) => {
                    out.push('$');
                    out.push_str(math);
                    out.push('$');
                }
                InlineToken::Special(special) => out.push_str(&special_text(special)),
                InlineToken::Separator
                | InlineToken::Bold(_)
                | InlineToken::Italic(_)
                | InlineToken::Command(_) => {}
            }
            previous = Some(token);
        }
        out
    }

    fn block(&self, writer: &mut HtmlWriter, block: &Block) {
        match &block.kind {
            BlockKind::Control { .. } => writer.raw("\n"),
            BlockKind::Section { level, text } => {
                let tag = format!("h{}", level + 1);
                writer.line(&format!("<{}>{}</{}>", tag, self.inline(text).trim(), tag));
            }
            BlockKind::List(events) => self.list(writer, events),
            BlockKind::Table(table) => self.table(writer, table),
            BlockKind::Code { name, lines } => {
                let code = escape_html(&lines.join("\n"));
                match name {
                    Some(name) => writer.line(&format!(
                        r#"<pre class="sourcecode" filename="{}"><div style="margin:1.2em 0 0 0">{}</div></pre>"#,
                        escape_html(name),
                        code
                    )),
                    None => writer.line(&format!("<pre>{}</pre>", code)),
                }
            }
            BlockKind::Shell(shell) => writer.line(&shell_transcript(shell)),
            BlockKind::Raw { lines } => {
                for line in lines {
                    writer.raw(line);
                    writer.raw("\n");
                }
            }
            BlockKind::Quote { open: true } => writer.line("<blockquote>"),
            BlockKind::Quote { open: false } => writer.line("</blockquote>"),
            BlockKind::Paragraph(text) => {
                writer.raw(&self.inline(text));
                writer.raw("\n");
            }
        }
    }

    fn list(&self, writer: &mut HtmlWriter, events: &[ListEvent]) {
        for event in events {
            match event {
                ListEvent::Open(kind) => {
                    writer.line(&format!("<{}>", list_tag(*kind)));
                    writer.indent += 1;
                }
                ListEvent::Close(kind) => {
                    writer.indent = writer.indent.saturating_sub(1);
                    writer.line(&format!("</{}>", list_tag(*kind)));
                }
                ListEvent::Item(text) => {
                    writer.line(&format!("<li>{}</li>", self.inline(text).trim()));
                }
            }
        }
    }

    fn table(&self, writer: &mut HtmlWriter, table: &Table) {
        let alignments = table.alignments();
        writer.line(&format!(r#"<table class="{}">"#, TABLE_CLASS));
        writer.indent += 1;
        writer.line("<thead>");
        writer.indent += 1;
        self.row(writer, &table.header, "th", &alignments);
        writer.indent -= 1;
        writer.line("</thead>");
        writer.line("<tbody>");
        writer.indent += 1;
        for line in &table.body {
            if let TableLine::Row(row) = line {
                self.row(writer, row, "td", &alignments);
            }
        }
        writer.indent -= 1;
        writer.line("</tbody>");
        writer.indent -= 1;
        writer.line("</table>");
    }

    fn row(&self, writer: &mut HtmlWriter, row: &TableRow, tag: &str, alignments: &[Alignment]) {
        let mut cells = String::new();
        for (idx, cell) in row.text.cells().into_iter().enumerate() {
            match alignments.get(idx) {
                Some(alignment) => cells.push_str(&format!(
                    r#"<{} style="text-align:{}">"#,
                    tag,
                    alignment_name(*alignment)
                )),
                None => cells.push_str(&format!("<{}>", tag)),
            }
            cells.push_str(&self.tokens(cell, row.text.context));
            cells.push_str(&format!("</{}>", tag));
        }
        writer.line("<tr>");
        writer.indent += 1;
        writer.line(&cells);
        writer.indent -= 1;
        writer.line("</tr>");
    }

    pub(crate) fn inline(&self, text: &InlineText) -> String {
        self.tokens(&text.tokens, text.context)
    }

    fn tokens(&self, tokens: &[InlineToken], context: TextContext) -> String {
        let mut out = String::new();
        let mut commands: Vec<&Command> = Vec::new();
        let mut previous: Option<&InlineToken> = None;

        for token in tokens {
            match token {
                InlineToken::Normal(text) => out.push_str(&escape_html(text)),
                InlineToken::Escaped(ch) => out.push_str(&html_escaped(*ch)),
                InlineToken::NeedEscape(ch) => {
                    out.push_str(&escape_html(ch.encode_utf8(&mut [0; 4])));
                }
                InlineToken::Separator => {}
                InlineToken::Quote { double, open } => out.push_str(match (double, open) {
                    (false, true) => "&lsquo;",
                    (false, false) => "&rsquo;",
                    (true, true) => "&ldquo;",
                    (true, false) => "&rdquo;",
                }),
                InlineToken::FootnoteRef(label) => out.push_str(&self.footnote(label, context)),
                InlineToken::Bold(Marker::Open) => out.push_str("<strong>"),
                InlineToken::Bold(Marker::Close) => out.push_str("</strong>"),
                InlineToken::Italic(Marker::Open) => out.push_str("<em>"),
                InlineToken::Italic(Marker::Close) => out.push_str("</em>"),
                InlineToken::Verbatim(text) => {
                    out.push_str(&format!("<code>{}</code>", escape_html(text)));
                }
                InlineToken::Command(command) => {
                    out.push_str(&open_command(command));
                    commands.push(command);
                }
                InlineToken::CommandClose => {
                    if let Some(command) = commands.pop() {
                        let empty = matches!(previous, Some(InlineToken::Command(_)));
                        out.push_str(&close_command(command, empty));
                    }
                }
                InlineToken::RawMarkup(text) => out.push_str(text),
                InlineToken::Math(text) => {
                    out.push_str(&format!(" ${}$ ", html_math(text)));
                }
                InlineToken::Special(special) => out.push_str(&special_text(special)),
            }
            previous = Some(token);
        }
        out
    }

    fn footnote(&self, label: &str, context: TextContext) -> String {
        let Some(footnote) = self.footnotes.get(label) else {
            return String::new();
        };
        footnote.mark_used();
        match context {
            TextContext::Title | TextContext::Author => String::new(),
            _ => format!(
                r#"<span {} data-original-title="{}"></span>"#,
                FOOTNOTE_ATTRS,
                escape_html(self.inline(&footnote.text).trim())
            ),
        }
    }
}

fn list_tag(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Item => "ul",
        ListKind::Enum => "ol",
    }
}

fn alignment_name(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
    }
}

fn color_css(color: &CommandColor) -> String {
    match color {
        CommandColor::Rgb(r, g, b) => format!("#{:02x}{:02x}{:02x}", r, g, b),
        CommandColor::Named(name) => name.clone(),
    }
}

fn open_command(command: &Command) -> String {
    match command {
        Command::Monospace => r#"<span class="tt">"#.to_string(),
        Command::SmallCaps => r#"<span style="font-variant:small-caps;">"#.to_string(),
        Command::Align => r"\[".to_string(),
        Command::Color(color) => format!(r#"<span style="color:{};">"#, color_css(color)),
        Command::TeX => r#"<span class="tex">T<sub>e</sub>X</span>"#.to_string(),
        Command::LaTeX => r#"<span class="tex">L<sup>a</sup>T<sub>e</sub>X</span>"#.to_string(),
        Command::LaTeXe => concat!(
            r#"<span class="tex">L<sup>a</sup>T<sub>e</sub>X</span>"#,
            r#" 2<sub style="font-size:1em">&epsilon;</sub>"#,
        )
        .to_string(),
        Command::Url(target) => format!(r#"<a href="{}">"#, escape_url_attr(target)),
    }
}

fn close_command(command: &Command, empty: bool) -> String {
    match command {
        Command::Align => r"\]".to_string(),
        Command::Url(target) if empty => format!("{}</a>", escape_html(target)),
        Command::Url(_) => "</a>".to_string(),
        Command::TeX | Command::LaTeX | Command::LaTeXe => String::new(),
        Command::Monospace | Command::SmallCaps | Command::Color(_) => "</span>".to_string(),
    }
}

fn special_text(special: &SpecialText) -> String {
    match special {
        SpecialText::Pages {
            initial,
            first,
            range,
        } => match range {
            PageRange::To(last) => format!("{}p. {}--{}", initial, first, last),
            PageRange::OpenEnded => format!("{}p. {}---", initial, first),
            PageRange::Single => format!("{}. {}", initial, first),
        },
        SpecialText::Figure { prefix, number } => format!("{}. {}", prefix, number),
        SpecialText::Abbreviation(abbrev) => format!("{} ", abbrev),
        SpecialText::Ellipsis => "...".to_string(),
        SpecialText::Comma { spaced: true } => ", ".to_string(),
        SpecialText::Comma { spaced: false } => ",".to_string(),
    }
}

fn prompt_open(prompt: ShellPrompt) -> &'static str {
    match prompt {
        ShellPrompt::User => r#"<span class="cmd-in">"#,
        ShellPrompt::Root => r#"<span class="cmd-in cmd-root">"#,
        ShellPrompt::Continuation => "\n<span class=\"cmd-cont\"></span>",
        ShellPrompt::Output => r#"<span class="cmd-out"><span>"#,
    }
}

fn prompt_close(open: Option<ShellPrompt>) -> &'static str {
    match open {
        Some(ShellPrompt::Output) => "\n</span></span>",
        Some(ShellPrompt::User | ShellPrompt::Root) => "</span>\n",
        Some(ShellPrompt::Continuation) | None => "",
    }
}

/// Replays a transcript into one `<pre>`. Output lines keep an inner span
/// that is closed and reopened at every style change.
fn shell_transcript(shell: &ShellBlock) -> String {
    let mut out = match &shell.style {
        Some(style) => format!(
            r#"<pre style="color:{}; background-color:{}">"#,
            escape_html(&style.foreground),
            escape_html(&style.background)
        ),
        None => "<pre>".to_string(),
    };
    // The prompt whose span is still open; continuations never open one.
    let mut open: Option<ShellPrompt> = None;
    let mut state = StyleState::default();

    for item in &shell.items {
        match item {
            ShellItem::Prompt(prompt) => {
                let keeps_command = *prompt == ShellPrompt::Continuation
                    && matches!(open, Some(ShellPrompt::User | ShellPrompt::Root));
                if !keeps_command {
                    out.push_str(prompt_close(open.take()));
                }
                if *prompt != ShellPrompt::Continuation {
                    open = Some(*prompt);
                }
                state = StyleState::default();
                out.push_str(prompt_open(*prompt));
            }
            ShellItem::Text(text) => out.push_str(&escape_html(text)),
            ShellItem::Style(attrs) => {
                out.push_str("</span>");
                state.apply(attrs);
                if state.is_plain() {
                    out.push_str("<span>");
                } else {
                    out.push_str(&format!(r#"<span style="{}">"#, style_css(&state)));
                }
            }
        }
    }

    out.push_str(match open {
        Some(ShellPrompt::Output) => "</span></span>",
        Some(_) => "</span>",
        None => "",
    });
    out.push_str("</pre>");
    out
}

fn style_css(state: &StyleState) -> String {
    let mut props = Vec::new();
    if state.bold {
        props.push("font-weight:bold;".to_string());
    }
    if state.italic {
        props.push("font-style:italic;".to_string());
    }
    if state.underline {
        props.push("text-decoration:underline;".to_string());
    }
    if let Some(color) = state.foreground {
        props.push(format!("color:{};", color.to_hex()));
    }
    if let Some(color) = state.background {
        props.push(format!("background-color:{};", color.to_hex()));
    }
    props.join(" ")
}
