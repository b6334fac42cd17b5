mod ast;
mod csi;
mod diagnostic;
mod emit;
mod escape;
mod footnote;
mod html;
mod inline;
mod latex;
mod parser;
mod segment;
mod source;
mod span;

pub use ast::{
    Alignment, Author, Block, BlockKind, ColumnSpec, Document, ListEvent, ListKind, ShellBlock,
    ShellItem, ShellPrompt, ShellStyle, Table, TableLine, TableRow, Title,
};
pub use csi::{BasicColor, Channel, Color, SgrError, StyleAttributes, StyleState, decode_sgr};
pub use diagnostic::{
    Diagnostic, DiagnosticCollector, DiagnosticFormatter, E_CMD_ARGUMENT, E_CMD_SYNTAX,
    E_CMD_UNCLOSED, E_CMD_UNKNOWN, E_CMD_UNMATCHED, E_CODE_UNCLOSED, E_COMMENT_UNCLOSED,
    E_DIRECTIVE_UNKNOWN, E_EMPH_NESTING, E_EMPH_UNCLOSED, E_FOOTNOTE_NESTED,
    E_FOOTNOTE_REDEFINED, E_FOOTNOTE_UNDEFINED, E_LIST_INDENT, E_LIST_KIND, E_LIST_SYNTAX,
    E_MARKER_UNCLOSED, E_MATH_IN_EMPH, E_RAW_UNCLOSED, E_SECTION_DEPTH, E_SHELL_SYNTAX,
    E_SHELL_UNCLOSED, E_TABLE_DELIMITER, E_TABLE_HEADER, E_TABLE_SYNTAX, E_TITLE_DEPTH,
    E_UNSUPPORTED, LogReporter, N_NOTE, Position, Reporter, Severity, W_EMPH_MARKER,
    W_EMPTY_INPUT, W_FOOTNOTE_UNUSED, W_MARKER_LENGTH, W_SGR_MALFORMED, W_TABLE_ALIGN,
    W_TABLE_COLUMNS,
};
pub use emit::{Backend, RenderOptions, UnknownBackend, render, sanitize_html};
pub use footnote::{Footnote, FootnoteTable};
pub use inline::{
    Command, CommandColor, Emphasis, InlineParser, InlineText, InlineToken, Marker, PageRange,
    SpecialText, TextContext,
};
pub use parser::{MAX_SECTION_LEVEL, MAX_TITLE_DEPTH, parse};
pub use segment::{Segment, Segmented, SegmentedLine, segment};
pub use source::SourceFile;
pub use span::Span;
