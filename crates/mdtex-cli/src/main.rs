use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use mdtex_core::{Backend, DiagnosticFormatter, RenderOptions, SourceFile, parse, render};

mod cli;
mod config;
mod preamble;
mod report;

use cli::Cli;
use config::Config;
use report::StderrReporter;

const STDIO: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Stdout,
    File(PathBuf),
}

fn read_all(path: Option<&Path>) -> Result<(String, String)> {
    match path {
        Some(p) => {
            let text = fs::read_to_string(p)
                .with_context(|| format!("failed to read {}", p.display()))?;
            Ok((p.display().to_string(), text))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read standard input")?;
            Ok(("<stdin>".to_string(), buf))
        }
    }
}

fn start_dir_for(input: Option<&Path>) -> Result<PathBuf> {
    match input {
        Some(p) => Ok(p.parent().unwrap_or(Path::new(".")).to_path_buf()),
        None => std::env::current_dir().context("failed to get current directory"),
    }
}

fn is_stdio(path: &Path) -> bool {
    path == Path::new(STDIO)
}

/// `--to` wins, then the output extension, then the configuration.
fn choose_backend(cli: &Cli, config: &Config) -> Result<Backend> {
    if let Some(backend) = cli.to {
        return Ok(backend);
    }
    let by_extension = cli
        .output
        .as_deref()
        .and_then(|path| path.extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));
    if by_extension.is_some() {
        return Ok(Backend::Html);
    }
    Ok(config.backend()?.unwrap_or_default())
}

fn choose_target(input: Option<&Path>, output: Option<&Path>, backend: Backend) -> Result<Target> {
    match (input, output) {
        (_, Some(path)) if is_stdio(path) => Ok(Target::Stdout),
        (_, Some(path)) => Ok(Target::File(path.to_path_buf())),
        (None, None) => Ok(Target::Stdout),
        (Some(input), None) => {
            let derived = input.with_extension(backend.extension());
            if derived == input {
                bail!(
                    "refusing to overwrite input {}; give an OUTPUT path",
                    input.display()
                );
            }
            Ok(Target::File(derived))
        }
    }
}

fn write_output(target: &Target, text: &str) -> Result<()> {
    match target {
        Target::Stdout => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|()| stdout.flush())
                .context("failed to write standard output")
        }
        Target::File(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let input = cli.input.as_deref().filter(|path| !is_stdio(path));
    let start_dir = start_dir_for(input)?;
    let (config, config_path) = config::load(cli.config.as_deref(), &start_dir)?;
    if let Some(path) = &config_path {
        log::debug!("Using config: {}", path.display());
    }

    let backend = choose_backend(&cli, &config)?;
    let target = choose_target(input, cli.output.as_deref(), backend)?;
    log::debug!("Translating to {} into {:?}", backend, target);

    let options = RenderOptions {
        backend,
        preamble: preamble::resolve(
            backend,
            &[cli.preamble.as_deref(), config.preamble(backend)],
        )?,
        fragment: cli.as_part,
        sanitize: cli.sanitize || config.sanitize,
    };

    let formatter = DiagnosticFormatter {
        color: config.color && !cli.no_color && io::stderr().is_terminal(),
        tab_width: config.tab_width,
    };
    let mut reporter = StderrReporter::new(cli.diagnostics, formatter);

    let (name, text) = read_all(input)?;
    let source = SourceFile::new(name, text);
    let translated = parse(&source, &mut reporter)
        .and_then(|document| render(&document, &options, &mut reporter));

    match translated {
        Ok(output) => {
            reporter.finish(None)?;
            write_output(&target, &output)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(fatal) => {
            reporter.finish(Some(&fatal))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
