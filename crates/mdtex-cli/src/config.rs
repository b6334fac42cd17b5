use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mdtex_core::Backend;
use serde::Deserialize;

const CANDIDATE_NAMES: &[&str] = &["mdtex.toml", ".mdtex.toml"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Backend used when neither `--to` nor the output name decides.
    pub format: Option<String>,
    /// Tab stop used to line up diagnostic underlines.
    pub tab_width: usize,
    pub color: bool,
    pub sanitize: bool,
    pub latex: BackendConfig,
    pub html: BackendConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: None,
            tab_width: 8,
            color: true,
            sanitize: false,
            latex: BackendConfig::default(),
            html: BackendConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Relative paths are resolved against the configuration file.
    pub preamble: Option<PathBuf>,
}

impl Config {
    pub fn backend(&self) -> Result<Option<Backend>> {
        self.format
            .as_deref()
            .map(str::parse::<Backend>)
            .transpose()
            .context("invalid `format` in configuration")
    }

    pub fn preamble(&self, backend: Backend) -> Option<&Path> {
        match backend {
            Backend::Latex => self.latex.preamble.as_deref(),
            Backend::Html => self.html.preamble.as_deref(),
        }
    }

    /// Makes preamble paths independent of the working directory.
    fn anchor(mut self, config_path: &Path) -> Self {
        let base = config_path.parent().unwrap_or(Path::new("."));
        for section in [&mut self.latex, &mut self.html] {
            if let Some(path) = section.preamble.take() {
                section.preamble = Some(base.join(path));
            }
        }
        self
    }
}

fn parse_config_str(s: &str, path: &Path) -> Result<Config> {
    toml::from_str::<Config>(s).with_context(|| format!("invalid config {}", path.display()))
}

fn read_config(path: &Path) -> Result<Config> {
    log::debug!("Reading config from: {}", path.display());
    let s = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = parse_config_str(&s, path)?.anchor(path);
    log::info!("Loaded config from: {}", path.display());
    Ok(config)
}

fn find_in_tree(start_dir: &Path) -> Option<PathBuf> {
    for dir in start_dir.ancestors() {
        for name in CANDIDATE_NAMES {
            let p = dir.join(name);
            if p.is_file() {
                return Some(p);
            }
        }
    }
    None
}

/// Load configuration with precedence:
/// 1) explicit path (error if unreadable/invalid)
/// 2) walk up from start_dir: mdtex.toml, .mdtex.toml
/// 3) default config
pub fn load(explicit: Option<&Path>, start_dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let cfg = read_config(path)?;
        return Ok((cfg, Some(path.to_path_buf())));
    }

    if let Some(p) = find_in_tree(start_dir) {
        let cfg = read_config(&p)?;
        return Ok((cfg, Some(p)));
    }

    log::debug!("No config file found, using defaults");
    Ok((Config::default(), None))
}
