//! LaTeX backend.

use crate::ast::{
    Alignment, Author, Block, BlockKind, ColumnSpec, ListEvent, ListKind, Table, TableLine,
    TableRow, Title,
};
use crate::diagnostic::{Diagnostic, E_UNSUPPORTED, Position};
use crate::escape::{escape_latex, escape_latex_url, latex_escaped, verbatim_latex};
use crate::footnote::FootnoteTable;
use crate::inline::{
    Command, CommandColor, InlineText, InlineToken, Marker, PageRange, SpecialText, TextContext,
};

const SECTIONS: [&str; 3] = [r"\section", r"\subsection", r"\subsubsection"];

/// Font sizes for title depths 1 to 10.
const TITLE_SIZES: [&str; 10] = [
    r"\Huge",
    r"\huge",
    r"\LARGE",
    r"\Large",
    r"\large",
    r"\normalsize",
    r"\small",
    r"\footnotesize",
    r"\scriptsize",
    r"\tiny",
];

pub(crate) struct LatexRenderer<'d> {
    file: &'d str,
    footnotes: &'d FootnoteTable,
}

impl<'d> LatexRenderer<'d> {
    pub(crate) fn new(file: &'d str, footnotes: &'d FootnoteTable) -> Self {
        Self { file, footnotes }
    }

    pub(crate) fn body(&self, blocks: &[Block]) -> Result<String, Diagnostic> {
        let mut out = String::new();
        for block in blocks {
            self.block(&mut out, block)?;
        }
        Ok(out)
    }

    pub(crate) fn title(&self, title: &Title) -> String {
        let mut out = String::from("\\title{\n");
        for (idx, (depth, text)) in title.lines.iter().enumerate() {
            let size = TITLE_SIZES[(*depth).clamp(1, TITLE_SIZES.len()) - 1];
            out.push_str("  {");
            out.push_str(size);
            out.push(' ');
            out.push_str(&self.inline(text));
            out.push('}');
            if idx + 1 < title.lines.len() {
                out.push_str(r"\\");
            }
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }

    pub(crate) fn author(&self, author: &Author) -> String {
        let mut out = String::from("\\author{\n");
        for (idx, text) in author.lines.iter().enumerate() {
            out.push_str("  ");
            out.push_str(&self.inline(text));
            if idx + 1 < author.lines.len() {
                out.push_str(r"\\");
            }
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }

    fn block(&self, out: &mut String, block: &Block) -> Result<(), Diagnostic> {
        match &block.kind {
            BlockKind::Control { depth } => {
                out.push_str(if *depth > 1 { "\\clearpage\n" } else { "\\newpage\n" });
            }
            BlockKind::Section { level, text } => {
                let command = SECTIONS[(*level).min(SECTIONS.len() - 1)];
                out.push_str(&format!("{}{{{}}}\n", command, self.inline(text)));
            }
            BlockKind::List(events) => self.list(out, events),
            BlockKind::Table(table) => self.table(out, table),
            BlockKind::Code { name, lines } => {
                out.push_str("\\begin{lstlisting}");
                if let Some(name) = name {
                    out.push_str(&format!("[title={{{}}}]", escape_latex(name, false)));
                }
                out.push('\n');
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("\\end{lstlisting}\n");
            }
            BlockKind::Shell(_) => {
                return Err(Diagnostic::error(
                    E_UNSUPPORTED,
                    "shell blocks are not supported by the LaTeX backend",
                    Position {
                        line: Some(block.line + 1),
                        ..Position::file(self.file)
                    },
                ));
            }
            BlockKind::Raw { lines } => {
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
            }
            BlockKind::Quote { open: true } => out.push_str("\\begin{quote}\n"),
            BlockKind::Quote { open: false } => out.push_str("\\end{quote}\n"),
            BlockKind::Paragraph(text) => {
                out.push_str(&self.inline(text));
                out.push('\n');
            }
        }
        Ok(())
    }

    fn list(&self, out: &mut String, events: &[ListEvent]) {
        let mut depth = 0usize;
        for event in events {
            match event {
                ListEvent::Open(kind) => {
                    out.push_str(&"  ".repeat(depth));
                    out.push_str(&format!("\\begin{{{}}}\n", environment(*kind)));
                    depth += 1;
                }
                ListEvent::Close(kind) => {
                    depth = depth.saturating_sub(1);
                    out.push_str(&"  ".repeat(depth));
                    out.push_str(&format!("\\end{{{}}}\n", environment(*kind)));
                }
                ListEvent::Item(text) => {
                    out.push_str(&"  ".repeat(depth.saturating_sub(1)));
                    out.push_str("\\item ");
                    out.push_str(&self.inline(text));
                    out.push('\n');
                }
            }
        }
    }

    fn table(&self, out: &mut String, table: &Table) {
        let spec: String = table
            .columns
            .iter()
            .map(|column| match column {
                ColumnSpec::Rule => '|',
                ColumnSpec::Column(Alignment::Left) => 'l',
                ColumnSpec::Column(Alignment::Center) => 'c',
                ColumnSpec::Column(Alignment::Right) => 'r',
            })
            .collect();
        out.push_str("\\begin{table}[h]\n");
        out.push_str("  \\centering\n");
        out.push_str(&format!("  \\begin{{tabular}}{{{}}}\n", spec));
        for _ in 0..table.head_rules {
            out.push_str("    \\hline\n");
        }
        self.row(out, &table.header);
        for line in &table.body {
            match line {
                TableLine::Rule => out.push_str("    \\hline\n"),
                TableLine::Row(row) => self.row(out, row),
            }
        }
        out.push_str("  \\end{tabular}\n");
        out.push_str("\\end{table}\n");
    }

    fn row(&self, out: &mut String, row: &TableRow) {
        let cells: Vec<String> = row
            .text
            .cells()
            .into_iter()
            .map(|cell| self.tokens(cell, row.text.context))
            .collect();
        out.push_str("    ");
        out.push_str(&cells.join(" & "));
        out.push_str("\\\\\n");
    }

    /// Inline text without any block terminator.
    pub(crate) fn inline(&self, text: &InlineText) -> String {
        self.tokens(&text.tokens, text.context)
    }

    fn tokens(&self, tokens: &[InlineToken], context: TextContext) -> String {
        let mut out = String::new();
        let mut commands: Vec<&Command> = Vec::new();
        let mut previous: Option<&InlineToken> = None;

        for token in tokens {
            let monospace = commands.contains(&&Command::Monospace);
            match token {
                InlineToken::Normal(text) => out.push_str(&escape_latex(text, monospace)),
                InlineToken::Escaped(ch) => out.push_str(&latex_escaped(*ch, monospace)),
                InlineToken::NeedEscape(ch) => {
                    out.push_str(&escape_latex(ch.encode_utf8(&mut [0; 4]), monospace));
                }
                InlineToken::Separator => {}
                InlineToken::Quote { double, open } => out.push_str(match (double, open) {
                    (false, true) => "{`}",
                    (false, false) => "{'}",
                    (true, true) => "{``}",
                    (true, false) => "{''}",
                }),
                InlineToken::FootnoteRef(label) => out.push_str(&self.footnote(label, context)),
                InlineToken::Bold(Marker::Open) => out.push_str("\\textbf{"),
                InlineToken::Italic(Marker::Open) => out.push_str("\\textit{"),
                InlineToken::Bold(Marker::Close) | InlineToken::Italic(Marker::Close) => {
                    out.push('}');
                }
                InlineToken::Verbatim(text) => {
                    out.push_str(&format!("\\texttt{{{}}}", verbatim_latex(text)));
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
                InlineToken::Math(text) => out.push_str(&format!("${}$", text)),
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
        let text = self.inline(&footnote.text);
        match context {
            TextContext::Heading => format!("\\protect\\footnote{{{}}}", text),
            TextContext::TableCell => format!("\\tablefootnote{{{}}}", text),
            TextContext::ListItem => format!("\\begin{{footnote}}{}\\end{{footnote}}", text),
            TextContext::Author => format!("\\thanks{{{}}}", text),
            TextContext::Paragraph | TextContext::Title | TextContext::Footnote => {
                format!("\\footnote{{{}}}", text)
            }
        }
    }
}

fn environment(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Item => "itemize",
        ListKind::Enum => "enumerate",
    }
}

fn open_command(command: &Command) -> String {
    match command {
        Command::Monospace => "\\texttt{".to_string(),
        Command::SmallCaps => "\\textsc{".to_string(),
        Command::Align => "\\[".to_string(),
        Command::Color(CommandColor::Rgb(r, g, b)) => format!(
            "{{\\color[rgb]{{{:.2}, {:.2}, {:.2}}}",
            f64::from(*r) / 255.0,
            f64::from(*g) / 255.0,
            f64::from(*b) / 255.0
        ),
        Command::Color(CommandColor::Named(name)) => format!("{{\\color{{{}}}", name),
        Command::TeX => "\\TeX{".to_string(),
        Command::LaTeX => "\\LaTeX{".to_string(),
        Command::LaTeXe => "\\LaTeXe{".to_string(),
        Command::Url(target) => format!("\\href{{{}}}{{", escape_latex_url(target)),
    }
}

/// `empty` is set when nothing was written between the command and its
/// close; a link then shows its own target.
fn close_command(command: &Command, empty: bool) -> String {
    match command {
        Command::Align => "\\]".to_string(),
        Command::Url(target) if empty => format!("{}}}", escape_latex(target, false)),
        _ => "}".to_string(),
    }
}

fn special_text(special: &SpecialText) -> String {
    match special {
        SpecialText::Pages {
            initial,
            first,
            range,
        } => match range {
            PageRange::To(last) => format!("{}p.~{}--{}", initial, first, last),
            PageRange::OpenEnded => format!("{}p.~{}---", initial, first),
            PageRange::Single => format!("{}.~{}", initial, first),
        },
        SpecialText::Figure { prefix, number } => format!("{}.~{}", prefix, number),
        SpecialText::Abbreviation(abbrev) => format!("{}\\ ", abbrev),
        SpecialText::Ellipsis => "{\\ldots}".to_string(),
        SpecialText::Comma { spaced: true } => ", ".to_string(),
        SpecialText::Comma { spaced: false } => ",".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::diagnostic::Diagnostic;
    use crate::parser::parse;
    use crate::source::SourceFile;

    fn body(text: &str) -> Result<String, Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let document = parse(&SourceFile::new("l.md", text), &mut diagnostics)?;
        LatexRenderer::new(&document.file, &document.footnotes).body(&document.blocks)
    }

    #[test]
    fn paragraph_markup() {
        assert_eq!(
            body("*bold* and _em_ with `a--b`\n").expect("render"),
            "\\textbf{bold} and \\textit{em} with \\texttt{a-{-}b}\n"
        );
    }

    #[test]
    fn commands_and_special_text() {
        assert_eq!(
            body("@[tt]x\\_y@ @[color:#f00]r@ @[LaTeX]@ see pp. 3-5, Fig. 2\n").expect("render"),
            concat!(
                "\\texttt{x\\_y} {\\color[rgb]{1.00, 0.00, 0.00}r} \\LaTeX{} ",
                "see pp.~3--5, Fig.~2\n"
            )
        );
        assert_eq!(
            body("@[url:https://x.org/a#b]@\n").expect("render"),
            "\\href{https://x.org/a\\#b}{https://x.org/a\\#b}\n"
        );
    }

    #[test]
    fn footnotes_depend_on_context() {
        let rendered = body("# Head[^a]\n- item[^a]\n\ntext[^a]\n#[^a]: note\n").expect("render");
        assert_eq!(
            rendered,
            concat!(
                "\\section{Head\\protect\\footnote{note}}\n",
                "\\begin{itemize}\n",
                "\\item item\\begin{footnote}note\\end{footnote}\n",
                "\\end{itemize}\n",
                "text\\footnote{note}\n",
            )
        );
    }

    #[test]
    fn tables_join_cells() {
        assert_eq!(
            body("A|B\n:--|--:\n1|2\n").expect("render"),
            concat!(
                "\\begin{table}[h]\n",
                "  \\centering\n",
                "  \\begin{tabular}{l|r}\n",
                "    A & B\\\\\n",
                "    \\hline\n",
                "    1 & 2\\\\\n",
                "  \\end{tabular}\n",
                "\\end{table}\n",
            )
        );
    }

    #[test]
    fn shell_blocks_are_unsupported() {
        let error = body("#_\n$ ls\n#_\n").expect_err("unsupported");
        assert_eq!(error.code, E_UNSUPPORTED);
        assert_eq!(error.line(), Some(1));
    }

    #[test]
    fn quotes_breaks_and_code() {
        assert_eq!(
            body(">\"q\"\n\u{c}\n```[a.c]\nint x;\n```\n").expect("render"),
            concat!(
                "\\begin{quote}\n",
                "{``}q{''}\n",
                "\\end{quote}\n",
                "\\newpage\n",
                "\\begin{lstlisting}[title={a.c}]\n",
                "int x;\n",
                "\\end{lstlisting}\n",
            )
        );
    }
}
