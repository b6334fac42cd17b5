use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use ammonia::Builder;

use crate::ast::Document;
use crate::diagnostic::{Diagnostic, Position, Reporter, W_FOOTNOTE_UNUSED};
use crate::html::HtmlRenderer;
use crate::latex::LatexRenderer;
use crate::span::Span;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Backend {
    #[default]
    Latex,
    Html,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Latex => "latex",
            Backend::Html => "html",
        }
    }

    /// File extension of the generated document, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Backend::Latex => "tex",
            Backend::Html => "html",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown output format `{0}` (expected `latex` or `html`)")]
pub struct UnknownBackend(pub String);

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "latex" | "tex" => Ok(Backend::Latex),
            "html" | "htm" => Ok(Backend::Html),
            _ => Err(UnknownBackend(name.to_string())),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RenderOptions {
    pub backend: Backend,
    /// Inserted verbatim before the title (LaTeX) or inside `<head>` (HTML).
    pub preamble: String,
    /// Emit the body only, without document scaffolding.
    pub fragment: bool,
    /// Pass the HTML body through [`sanitize_html`].
    pub sanitize: bool,
}

impl RenderOptions {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }
}

/// Renders a parsed document. Footnote usage is recomputed on every call,
/// so rendering the same document twice gives the same text and the same
/// unused-footnote warnings.
pub fn render(
    document: &Document,
    options: &RenderOptions,
    reporter: &mut dyn Reporter,
) -> Result<String, Diagnostic> {
    document.footnotes.reset_usage();
    log::debug!(
        "rendering {} as {}{}",
        document.file,
        options.backend,
        if options.fragment { " fragment" } else { "" }
    );
    let output = match options.backend {
        Backend::Latex => render_latex(document, options)?,
        Backend::Html => render_html(document, options),
    };
    report_unused_footnotes(document, reporter);
    Ok(output)
}

fn render_latex(document: &Document, options: &RenderOptions) -> Result<String, Diagnostic> {
    let renderer = LatexRenderer::new(&document.file, &document.footnotes);
    if options.fragment {
        return renderer.body(&document.blocks);
    }

    let mut out = options.preamble.clone();
    if let Some(title) = &document.title {
        out.push_str(&renderer.title(title));
    }
    if let Some(author) = &document.author {
        out.push_str(&renderer.author(author));
    }
    out.push_str("\\begin{document}\n");
    if document.title.is_some() {
        out.push_str("\\maketitle\n");
    }
    out.push_str(&renderer.body(&document.blocks)?);
    out.push_str("\\end{document}\n");
    Ok(out)
}

fn render_html(document: &Document, options: &RenderOptions) -> String {
    let renderer = HtmlRenderer::new(&document.footnotes);
    let body = renderer.body(&document.blocks);
    let body = if options.sanitize {
        sanitize_html(&body)
    } else {
        body
    };
    if options.fragment {
        return body;
    }

    let mut out = String::from("<!DOCTYPE html>\n<html>\n  <head>\n");
    out.push_str(&options.preamble);
    if let Some(title) = &document.title {
        out.push_str(&format!("    {}\n", renderer.title(title)));
    }
    if let Some(author) = &document.author {
        out.push_str(&format!("    {}\n", renderer.author(author)));
    }
    out.push_str("  </head>\n  <body>\n");
    out.push_str("    <div id=\"main-div\" class=\"float-container\">\n");
    out.push_str("      <main class=\"container\">\n");
    out.push_str(&body);
    out.push_str("      </main>\n    </div>\n  </body>\n</html>\n");
    out
}

/// One warning per footnote that was never referenced, in source-line order.
fn report_unused_footnotes(document: &Document, reporter: &mut dyn Reporter) {
    for footnote in document.footnotes.unused() {
        reporter.report(Diagnostic::warning(
            W_FOOTNOTE_UNUSED,
            "defined but unused footnote",
            Position::span(
                document.file.as_str(),
                footnote.line,
                Span::at(0, footnote.label.len() + 4),
                &footnote.source,
            ),
        ));
    }
}

/// Cleans rendered HTML against an allow-list covering the markup this
/// backend produces. Raw markup written with `&...&` or `#&` is the main
/// thing this removes.
pub fn sanitize_html(html: &str) -> String {
    let tags: HashSet<&'static str> = [
        "a",
        "blockquote",
        "br",
        "code",
        "div",
        "em",
        "h1",
        "h2",
        "h3",
        "li",
        "ol",
        "p",
        "pre",
        "span",
        "strong",
        "sub",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
    ]
    .iter()
    .copied()
    .collect();

    let mut generic_attributes: HashSet<&'static str> = HashSet::new();
    generic_attributes.insert("class");
    generic_attributes.insert("style");

    let mut tag_attributes = HashMap::new();
    tag_attributes.insert("a", ["href"].iter().copied().collect());
    tag_attributes.insert("pre", ["filename"].iter().copied().collect());
    tag_attributes.insert("span", ["title"].iter().copied().collect());

    let mut generic_attribute_prefixes = HashSet::new();
    generic_attribute_prefixes.insert("data-");
    generic_attribute_prefixes.insert("aria-");

    Builder::new()
        .tags(tags)
        .generic_attributes(generic_attributes)
        .tag_attributes(tag_attributes)
        .generic_attribute_prefixes(generic_attribute_prefixes)
        .clean(html)
        .to_string()
}
