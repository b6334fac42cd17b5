use crate::csi::StyleAttributes;
use crate::footnote::FootnoteTable;
use crate::inline::InlineText;

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub file: String,
    pub title: Option<Title>,
    pub author: Option<Author>,
    pub blocks: Vec<Block>,
    pub footnotes: FootnoteTable,
}

impl Document {
    /// True when nothing but blank lines and quote markers was parsed.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.blocks.iter().all(Block::is_blank)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    /// 0-based line the block starts on.
    pub line: usize,
    pub kind: BlockKind,
}

impl Block {
    pub fn new(line: usize, kind: BlockKind) -> Self {
        Self { line, kind }
    }

    pub fn is_blank(&self) -> bool {
        match &self.kind {
            BlockKind::Paragraph(text) => text.is_blank(),
            BlockKind::Quote { .. } => true,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BlockKind {
    /// Page break; `depth` 1 is `\f`, 2 is `\f\f`.
    Control { depth: usize },
    /// `level` 0 is a top-level section.
    Section { level: usize, text: InlineText },
    List(Vec<ListEvent>),
    Table(Table),
    Code { name: Option<String>, lines: Vec<String> },
    Shell(ShellBlock),
    Raw { lines: Vec<String> },
    Quote { open: bool },
    Paragraph(InlineText),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListKind {
    Item,
    Enum,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ListEvent {
    Open(ListKind),
    Item(InlineText),
    Close(ListKind),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// One entry of a delimiter row: a vertical rule or an aligned column.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnSpec {
    Rule,
    Column(Alignment),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub line: usize,
    pub text: InlineText,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TableLine {
    Rule,
    Row(TableRow),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    /// Horizontal rules above the header.
    pub head_rules: usize,
    pub header: TableRow,
    pub columns: Vec<ColumnSpec>,
    /// Rows after the delimiter; always starts with the rule under the header.
    pub body: Vec<TableLine>,
}

impl Table {
    pub fn alignments(&self) -> Vec<Alignment> {
        self.columns
            .iter()
            .filter_map(|spec| match spec {
                ColumnSpec::Column(alignment) => Some(*alignment),
                ColumnSpec::Rule => None,
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShellPrompt {
    /// `$`
    User,
    /// `#`
    Root,
    /// `>`
    Continuation,
    /// `-`
    Output,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ShellItem {
    Prompt(ShellPrompt),
    Text(String),
    Style(StyleAttributes),
}

/// Foreground and background given on the `#_:fg:bg` opener.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShellStyle {
    pub foreground: String,
    pub background: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShellBlock {
    pub style: Option<ShellStyle>,
    pub items: Vec<ShellItem>,
}

/// `#:` lines; `depth` is the number of colons.
#[derive(Clone, Debug, PartialEq)]
pub struct Title {
    pub lines: Vec<(usize, InlineText)>,
}

/// `#@` lines.
#[derive(Clone, Debug, PartialEq)]
pub struct Author {
    pub lines: Vec<InlineText>,
}
