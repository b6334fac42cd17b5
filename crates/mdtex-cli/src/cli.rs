use clap::{Parser, ValueEnum};
use mdtex_core::Backend;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mdtex")]
#[command(author, version)]
#[command(about = "Translate lightweight markup documents to LaTeX or HTML")]
#[command(after_help = "\
EXAMPLES:

    # notes.md -> notes.tex
    mdtex notes.md

    # Pick the backend from the output name
    mdtex notes.md site/notes.html

    # Body only, from stdin to stdout
    cat notes.md | mdtex --to html --as-part

CONFIGURATION:

mdtex looks for configuration in this order:
  1. Explicit --config path
  2. mdtex.toml or .mdtex.toml in the input's directory and its parents
  3. Built-in defaults

Example mdtex.toml:

    format = \"html\"
    tab-width = 4

    [html]
    preamble = \"head.html\"")]
pub struct Cli {
    /// Input document; `-` or nothing reads standard input
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Output file; `-` writes standard output
    #[arg(
        value_name = "OUTPUT",
        long_help = "Output file. `-` writes standard output. When omitted the input name is \
        reused with a .tex or .html extension, or standard output is used when reading \
        standard input."
    )]
    pub output: Option<PathBuf>,

    /// Output format: latex or html
    #[arg(
        long = "to",
        value_name = "FORMAT",
        long_help = "Output format, `latex` or `html`. Without it the format follows the \
        OUTPUT extension (.html and .htm select HTML), then the configuration file, then LaTeX."
    )]
    pub to: Option<Backend>,

    /// Render the body only, without document scaffolding
    #[arg(long)]
    pub as_part: bool,

    /// File inserted before the body instead of the built-in preamble
    #[arg(long, value_name = "FILE")]
    pub preamble: Option<PathBuf>,

    /// Clean HTML output against an allow-list
    #[arg(long)]
    pub sanitize: bool,

    /// How diagnostics are written to standard error
    #[arg(long, value_enum, value_name = "STYLE", default_value_t = DiagnosticsStyle::Pretty)]
    pub diagnostics: DiagnosticsStyle,

    /// Disable colored diagnostics
    #[arg(long)]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum DiagnosticsStyle {
    Pretty,
    Json,
}
