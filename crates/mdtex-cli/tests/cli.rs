//! Integration tests for the mdtex command line.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mdtex_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mdtex"));
    cmd.current_dir(dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn workspace() -> TempDir {
    TempDir::new().expect("tempdir")
}

mod help {
    use super::*;

    #[test]
    fn shows_usage() {
        mdtex_cmd(&workspace())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage:"))
            .stdout(predicate::str::contains("--as-part"));
    }

    #[test]
    fn bad_flag_is_a_usage_error() {
        mdtex_cmd(&workspace())
            .arg("--frobnicate")
            .assert()
            .code(2);
    }

    #[test]
    fn bad_format_is_a_usage_error() {
        mdtex_cmd(&workspace())
            .args(["--to", "pdf"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unknown output format"));
    }
}

mod translate {
    use super::*;

    #[test]
    fn stdin_to_stdout_fragment() {
        mdtex_cmd(&workspace())
            .args(["--as-part", "-"])
            .write_stdin("*bold* and _em_\n")
            .assert()
            .success()
            .stdout("\\textbf{bold} and \\textit{em}\n")
            .stderr("");
    }

    #[test]
    fn html_fragment_from_stdin() {
        mdtex_cmd(&workspace())
            .args(["--to", "html", "--as-part"])
            .write_stdin("# Hi\n")
            .assert()
            .success()
            .stdout("<h1>Hi</h1>\n");
    }

    #[test]
    fn output_name_is_derived_from_input() {
        let dir = workspace();
        fs::write(dir.path().join("notes.md"), "text\n").expect("write input");

        mdtex_cmd(&dir).arg("notes.md").assert().success().stdout("");

        let tex = fs::read_to_string(dir.path().join("notes.tex")).expect("tex output");
        assert!(tex.starts_with("\\documentclass"));
        assert!(tex.contains("\\begin{document}\ntext\n\\end{document}\n"));
    }

    #[test]
    fn output_extension_selects_html() {
        let dir = workspace();
        fs::write(dir.path().join("page.md"), "#: Title\nbody\n").expect("write input");

        mdtex_cmd(&dir)
            .args(["page.md", "site.html"])
            .assert()
            .success();

        let html = fs::read_to_string(dir.path().join("site.html")).expect("html output");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Title</title>"));
        assert!(html.contains("<p>body\n</p>"));
    }

    #[test]
    fn custom_preamble_replaces_builtin() {
        let dir = workspace();
        fs::write(dir.path().join("pre.tex"), "%mine\n").expect("write preamble");

        mdtex_cmd(&dir)
            .args(["--preamble", "pre.tex", "-", "-"])
            .write_stdin("x\n")
            .assert()
            .success()
            .stdout("%mine\n\\begin{document}\nx\n\\end{document}\n");
    }

    #[test]
    fn sanitize_strips_raw_html() {
        mdtex_cmd(&workspace())
            .args(["--to", "html", "--as-part", "--sanitize"])
            .write_stdin("#&\n<script>alert(1)</script>\n#&\nok\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("script").not())
            .stdout(predicate::str::contains("ok"));
    }
}

mod diagnostics {
    use super::*;

    #[test]
    fn fatal_error_exits_one_without_output() {
        let dir = workspace();
        fs::write(dir.path().join("bad.md"), "ok\n```\nnever closed\n").expect("write input");

        mdtex_cmd(&dir)
            .arg("bad.md")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("bad.md:2:1: error: unclosed code block"));

        assert!(!dir.path().join("bad.tex").exists());
    }

    #[test]
    fn warnings_do_not_fail() {
        mdtex_cmd(&workspace())
            .args(["--as-part", "--no-color"])
            .write_stdin("text\n#[^n]: never used\n")
            .assert()
            .success()
            .stdout("text\n")
            .stderr(predicate::str::contains("warning: defined but unused footnote"));
    }

    #[test]
    fn json_diagnostics_are_an_array() {
        let output = mdtex_cmd(&workspace())
            .args(["--diagnostics", "json", "--as-part"])
            .write_stdin("*a** b*\n")
            .output()
            .expect("run");
        assert!(output.status.success());

        let value: serde_json::Value =
            serde_json::from_slice(&output.stderr).expect("stderr is JSON");
        let diagnostics = value.as_array().expect("array");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0]["code"], "W_EMPH_MARKER");
        assert_eq!(diagnostics[0]["note"]["severity"], "note");
    }

    #[test]
    fn json_is_empty_array_when_clean() {
        mdtex_cmd(&workspace())
            .args(["--diagnostics", "json", "--as-part"])
            .write_stdin("fine\n")
            .assert()
            .success()
            .stderr("[]\n");
    }
}

mod configuration {
    use super::*;

    #[test]
    fn discovered_config_sets_format() {
        let dir = workspace();
        fs::write(dir.path().join("mdtex.toml"), "format = \"html\"\n").expect("write config");
        fs::write(dir.path().join("a.md"), "hello\n").expect("write input");

        mdtex_cmd(&dir).arg("a.md").assert().success();
        assert!(dir.path().join("a.html").exists());
    }

    #[test]
    fn flags_override_config() {
        let dir = workspace();
        fs::write(dir.path().join(".mdtex.toml"), "format = \"html\"\n").expect("write config");

        mdtex_cmd(&dir)
            .args(["--to", "latex", "--as-part"])
            .write_stdin("*x*\n")
            .assert()
            .success()
            .stdout("\\textbf{x}\n");
    }

    #[test]
    fn invalid_config_is_reported() {
        let dir = workspace();
        fs::write(dir.path().join("custom.toml"), "no-such-key = 1\n").expect("write config");

        mdtex_cmd(&dir)
            .args(["--config", "custom.toml", "--as-part"])
            .write_stdin("x\n")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("invalid config"));
    }
}
