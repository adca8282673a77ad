use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let config = dir.path().join("config.json");
        fs::write(&config, r#"{"version": 1, "config": {"raster_scale": 1.0}}"#)
            .expect("config should be written");
        Self { dir, config }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn cli(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("pdf-editor-cli");
        cmd.arg("--config").arg(&self.config);
        cmd
    }

    fn new_document(&self, name: &str, pages: u32) -> PathBuf {
        let output = self.path(name);
        self.cli()
            .args(["new", "--pages", &pages.to_string(), "--output"])
            .arg(&output)
            .assert()
            .success();
        output
    }

    fn info(&self, file: &Path) -> Value {
        let output = self.cli().arg("info").arg(file).assert().success().get_output().stdout.clone();
        serde_json::from_slice(&output).expect("stdout should contain valid json")
    }
}

#[test]
fn info_emits_stable_json_contract() {
    let workspace = Workspace::new();
    let file = workspace.path("report.pdf");
    workspace
        .cli()
        .args(["new", "--pages", "2", "--title", "Quarterly", "--output"])
        .arg(&file)
        .assert()
        .success();
    workspace
        .cli()
        .arg("add-text")
        .arg(&file)
        .args(["--page", "1", "--x", "72", "--y", "72", "--text", "Hello", "--output"])
        .arg(&file)
        .assert()
        .success();
    workspace
        .cli()
        .arg("rotate")
        .arg(&file)
        .args(["--page", "2", "--angle", "90", "--output"])
        .arg(&file)
        .assert()
        .success();

    let output = workspace.cli().arg("info").arg(&file).assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output).expect("stdout should be utf-8");
    let normalized = stdout.replace(&file.display().to_string(), "<FILE>");

    insta::assert_snapshot!("cli_info_edited_document", normalized.trim_end());
}

#[test]
fn rotate_rejects_partial_turns() {
    let workspace = Workspace::new();
    let file = workspace.new_document("one.pdf", 1);

    workspace
        .cli()
        .arg("rotate")
        .arg(&file)
        .args(["--page", "1", "--angle", "45", "--output"])
        .arg(workspace.path("rotated.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("multiple of 90"));
    assert!(!workspace.path("rotated.pdf").exists());
}

#[test]
fn new_rejects_empty_documents() {
    let workspace = Workspace::new();
    workspace
        .cli()
        .args(["new", "--pages", "0", "--output"])
        .arg(workspace.path("empty.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one page"));
}

#[test]
fn merge_inserts_pages() {
    let workspace = Workspace::new();
    let base = workspace.new_document("base.pdf", 2);
    let extra = workspace.new_document("extra.pdf", 3);
    let merged = workspace.path("merged.pdf");

    workspace
        .cli()
        .arg("merge")
        .arg(&base)
        .arg(&extra)
        .args(["--at", "2", "--output"])
        .arg(&merged)
        .assert()
        .success();

    let info = workspace.info(&merged);
    assert_eq!(info["page_count"], 5);
    let numbers: Vec<u64> =
        info["pages"].as_array().expect("pages").iter().filter_map(|page| page["number"].as_u64()).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
}

#[test]
fn split_writes_one_file_per_range() {
    let workspace = Workspace::new();
    let file = workspace.new_document("book.pdf", 4);
    let out_dir = workspace.path("parts");

    workspace
        .cli()
        .arg("split")
        .arg(&file)
        .args(["--ranges", "1-3,4", "--out-dir"])
        .arg(&out_dir)
        .assert()
        .success();

    assert_eq!(workspace.info(&out_dir.join("book-1-3.pdf"))["page_count"], 3);
    assert_eq!(workspace.info(&out_dir.join("book-4-4.pdf"))["page_count"], 1);
}

#[test]
fn extract_keeps_requested_pages() {
    let workspace = Workspace::new();
    let file = workspace.new_document("source.pdf", 4);
    let output = workspace.path("picked.pdf");

    workspace.cli().arg("extract").arg(&file).args(["--pages", "1,3-4", "--output"]).arg(&output).assert().success();
    assert_eq!(workspace.info(&output)["page_count"], 3);

    workspace
        .cli()
        .arg("extract")
        .arg(&file)
        .args(["--pages", "9", "--output"])
        .arg(workspace.path("missing.pdf"))
        .assert()
        .failure();
}

#[test]
fn watermark_marks_selected_pages() {
    let workspace = Workspace::new();
    let file = workspace.new_document("draft.pdf", 3);
    let output = workspace.path("stamped.pdf");

    workspace
        .cli()
        .arg("watermark")
        .arg(&file)
        .args(["--text", "DRAFT", "--pages", "odd", "--position", "bottom-right", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("stamped.pdf"));

    let info = workspace.info(&output);
    let runs: Vec<u64> =
        info["pages"].as_array().expect("pages").iter().filter_map(|page| page["text_runs"].as_u64()).collect();
    assert_eq!(runs, vec![1, 0, 1]);
}

#[test]
fn export_page_renders_at_configured_scale() {
    let workspace = Workspace::new();
    let file = workspace.new_document("render.pdf", 1);
    let output = workspace.path("page.png");

    workspace.cli().arg("export-page").arg(&file).args(["--page", "1", "--output"]).arg(&output).assert().success();

    let image = image::open(&output).expect("export should be a readable image");
    assert_eq!((image.width(), image.height()), (612, 792));
}

#[test]
fn info_fails_for_missing_file() {
    let workspace = Workspace::new();
    workspace
        .cli()
        .arg("info")
        .arg(workspace.path("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_pdf() {
    let workspace = Workspace::new();
    let file = workspace.path("invalid.pdf");
    fs::write(&file, b"not a pdf").expect("fixture should be written");

    workspace
        .cli()
        .arg("info")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open PDF"));
}

#[test]
fn bad_config_is_reported() {
    let workspace = Workspace::new();
    let config = workspace.path("broken.json");
    fs::write(&config, "{").expect("config should be written");

    cargo_bin_cmd!("pdf-editor-cli")
        .arg("--config")
        .arg(&config)
        .arg("version")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config"));
}

#[test]
fn version_prints_package_version() {
    Workspace::new()
        .cli()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
