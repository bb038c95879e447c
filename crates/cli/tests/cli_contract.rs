use assert_cmd::cargo::cargo_bin_cmd;
use pdf_engine::fixtures;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self { dir: tempfile::tempdir().expect("temp dir should be created") }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).expect("fixture should be written");
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn config_dir(&self) -> PathBuf {
        self.dir.path().join("config")
    }
}

fn utf8(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

fn run_json(workspace: &Workspace, args: &[&str]) -> Value {
    let output = cargo_bin_cmd!("exhibit-cli")
        .arg("--config-dir")
        .arg(workspace.config_dir())
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    serde_json::from_slice(&output).expect("stdout should contain valid json")
}

fn place(workspace: &Workspace, file: &Path, output: &Path, x: &str, y: &str) -> Value {
    run_json(
        workspace,
        &[
            "place",
            utf8(file),
            "--x",
            x,
            "--y",
            y,
            "--display-width",
            "612",
            "--display-height",
            "792",
            "--top",
            "Exhibit",
            "--bottom",
            "12",
            "--output",
            utf8(output),
        ],
    )
}

#[test]
fn info_reports_pages_and_stickers() {
    let ws = Workspace::new();
    let file = ws.write("scan.pdf", &fixtures::scanned_pdf(2));

    let value = run_json(&ws, &["info", utf8(&file)]);

    assert_eq!(value["page_count"], 2);
    assert_eq!(value["page_sizes_pt"][1]["width"], 612.0);
    assert_eq!(value["page_sizes_pt"][1]["height"], 792.0);
    assert_eq!(value["sticker_count"], 0);
}

#[test]
fn place_prints_rect_and_persists_sticker() {
    let ws = Workspace::new();
    let file = ws.write("scan.pdf", &fixtures::scanned_pdf(1));
    let output = ws.path("stamped.pdf");

    let placed = place(&ws, &file, &output, "100", "200");

    assert_eq!(placed["rect_pdf"], serde_json::json!([100.0, 200.0, 200.0, 300.0]));
    assert_eq!(placed["page"], 1);
    assert!(placed["embedded_object_id"].as_str().is_some_and(|id| id.ends_with(" R")));

    let listed = run_json(&ws, &["list", utf8(&output)]);
    let records = listed.as_array().expect("list prints an array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["top_text"], "Exhibit");
    assert_eq!(records[0]["bottom_text"], "12");

    let original = run_json(&ws, &["info", utf8(&file)]);
    assert_eq!(original["sticker_count"], 0, "source file is untouched");
}

#[test]
fn display_size_defaults_to_base_dpi() {
    let ws = Workspace::new();
    let file = ws.write("plain.pdf", &fixtures::sample_pdf(&[Default::default()]));
    let output = ws.path("out.pdf");

    // 300 dpi by default: 300 px is 72 pt.
    let placed = run_json(
        &ws,
        &[
            "place",
            utf8(&file),
            "--x",
            "300",
            "--y",
            "600",
            "--output",
            utf8(&output),
        ],
    );

    let rect = placed["rect_pdf"].as_array().expect("rect is an array");
    let x0 = rect[0].as_f64().expect("number");
    let y0 = rect[1].as_f64().expect("number");
    assert!((x0 - 72.0).abs() < 0.01, "x0 = {x0}");
    assert!((y0 - 144.0).abs() < 0.01, "y0 = {y0}");
    assert_eq!(placed["top_text"], "Exhibit");
    assert_eq!(placed["bottom_text"], "Bottom Text");
}

#[test]
fn delete_removes_only_stickers() {
    let ws = Workspace::new();
    let file = ws.write("scan.pdf", &fixtures::scanned_pdf(1));
    let stamped = ws.path("stamped.pdf");
    place(&ws, &file, &stamped, "10", "10");
    place(&ws, &stamped, &stamped, "300", "300");

    let report = run_json(&ws, &["delete", utf8(&stamped)]);

    assert_eq!(report["removed"], 2);
    assert_eq!(report["stale"], serde_json::json!([]));
    assert_eq!(report["failed"], serde_json::json!([]));
    let listed = run_json(&ws, &["list", utf8(&stamped)]);
    assert_eq!(listed, serde_json::json!([]));
}

#[test]
fn render_writes_png_at_requested_dpi() {
    let ws = Workspace::new();
    let file = ws.write("scan.pdf", &fixtures::scanned_pdf(2));
    let output = ws.path("renders/page2.png");

    cargo_bin_cmd!("exhibit-cli")
        .arg("--config-dir")
        .arg(ws.config_dir())
        .arg("render")
        .arg(&file)
        .args(["--page", "2", "--dpi", "72", "--zoom", "0.5"])
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("page2.png"));

    let image = image::open(&output).expect("render should be a readable image");
    assert_eq!((image.width(), image.height()), (306, 396));
}

#[test]
fn sticker_writes_square_png() {
    let ws = Workspace::new();
    let output = ws.path("sticker.png");

    cargo_bin_cmd!("exhibit-cli")
        .arg("--config-dir")
        .arg(ws.config_dir())
        .args(["sticker", "--top", "Exhibit", "--bottom", "A"])
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let image = image::open(&output).expect("sticker should be a readable image");
    assert_eq!((image.width(), image.height()), (100, 100));
}

#[test]
fn info_fails_for_missing_file() {
    let ws = Workspace::new();

    cargo_bin_cmd!("exhibit-cli")
        .arg("info")
        .arg(ws.path("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_pdf() {
    let ws = Workspace::new();
    let file = ws.write("invalid.pdf", b"this is not a pdf");

    cargo_bin_cmd!("exhibit-cli")
        .arg("info")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open PDF"));
}

#[test]
fn info_fails_for_encrypted_marker_pdf() {
    let ws = Workspace::new();
    let file = ws.write(
        "encrypted.pdf",
        b"%PDF-1.7\n1 0 obj\n<< /Filter /Standard >>\nendobj\ntrailer\n<< /Encrypt 1 0 R >>\n",
    );

    cargo_bin_cmd!("exhibit-cli")
        .arg("info")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("encrypted PDFs are not supported"));
}

#[test]
fn place_rejects_out_of_range_page() {
    let ws = Workspace::new();
    let file = ws.write("scan.pdf", &fixtures::scanned_pdf(1));

    cargo_bin_cmd!("exhibit-cli")
        .arg("--config-dir")
        .arg(ws.config_dir())
        .arg("place")
        .arg(&file)
        .args(["--page", "3", "--x", "1", "--y", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("page 3 out of range"));
}

#[test]
fn place_rejects_half_a_display_size() {
    let ws = Workspace::new();
    let file = ws.write("scan.pdf", &fixtures::scanned_pdf(1));

    cargo_bin_cmd!("exhibit-cli")
        .arg("--config-dir")
        .arg(ws.config_dir())
        .arg("place")
        .arg(&file)
        .args(["--x", "1", "--y", "1", "--display-width", "600"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be given together"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("exhibit-cli")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
