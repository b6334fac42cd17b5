use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use mdtex_core::Backend;

const LATEX_PREAMBLE: &str = include_str!("../assets/preamble.tex");
const HTML_HEAD: &str = include_str!("../assets/head.html");

pub fn builtin(backend: Backend) -> &'static str {
    match backend {
        Backend::Latex => LATEX_PREAMBLE,
        Backend::Html => HTML_HEAD,
    }
}

/// The first of `candidates` that is set is read from disk; otherwise the
/// built-in preamble for `backend` is used.
pub fn resolve(backend: Backend, candidates: &[Option<&Path>]) -> Result<String> {
    match candidates.iter().flatten().next() {
        Some(path) => {
            log::debug!("Reading preamble from: {}", path.display());
            fs::read_to_string(path)
                .with_context(|| format!("failed to read preamble {}", path.display()))
        }
        None => Ok(builtin(backend).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn builtin_preambles_match_their_backend() {
        assert!(builtin(Backend::Latex).starts_with("\\documentclass"));
        assert!(builtin(Backend::Html).contains("<meta charset=\"utf-8\">"));
    }

    #[test]
    fn first_given_path_wins() -> Result<()> {
        let file = NamedTempFile::new()?;
        fs::write(file.path(), "%custom\n")?;
        let preamble = resolve(Backend::Latex, &[None, Some(file.path())])?;
        assert_eq!(preamble, "%custom\n");
        assert_eq!(resolve(Backend::Html, &[None, None])?, HTML_HEAD);
        Ok(())
    }

    #[test]
    fn unreadable_preamble_is_an_error() {
        let missing = Path::new("/nonexistent/mdtex/preamble.tex");
        let error = resolve(Backend::Latex, &[Some(missing)]).expect_err("missing file");
        assert!(format!("{:#}", error).contains("failed to read preamble"));
    }
}
