//! CLI integration tests for batch processing
//!
//! Runs the `stickerbot` binary against a directory of generated images and
//! checks output naming, processing order and failure handling.

#![cfg(feature = "cli")]

mod common;

use common::{encode_png, subject_on_backdrop};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn stickerbot() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_stickerbot"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_png(dir: &Path, name: &str) {
    let bytes = encode_png(&subject_on_backdrop(48, 32, 12, 8, 36, 24));
    fs::write(dir.join(name), bytes).unwrap();
}

/// File names in the order the CLI reported finished stickers
fn reported_order(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .filter_map(|line| {
            let (_, rest) = line.split_once("Sticker for ")?;
            let end = rest.find(".png")? + ".png".len();
            Path::new(rest.get(..end)?)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .collect()
}

#[test]
fn test_cli_batch_alphanumerical_order() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let names = [
        "z_last.png",
        "a_first.png",
        "m_middle.png",
        "img10.png",
        "img2.png",
        "img1.png",
    ];
    for name in names {
        write_png(input.path(), name);
    }

    let result = stickerbot()
        .arg(input.path())
        .arg("-o")
        .arg(output.path())
        .output()
        .unwrap();
    assert!(
        result.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    assert_eq!(
        reported_order(&result),
        vec![
            "a_first.png",
            "img1.png",
            "img10.png",
            "img2.png",
            "m_middle.png",
            "z_last.png",
        ]
    );
    for name in names {
        let stem = name.trim_end_matches(".png");
        let sticker = output.path().join(format!("{stem}_sticker.webp"));
        let bytes = fs::read(&sticker).unwrap();
        assert_eq!(&bytes[..4], b"RIFF", "{}", sticker.display());
        assert_eq!(&bytes[8..12], b"WEBP");
    }
}

#[test]
fn test_cli_pattern_and_unsupported_files() {
    let input = TempDir::new().unwrap();
    write_png(input.path(), "frog_1.png");
    write_png(input.path(), "frog_2.png");
    write_png(input.path(), "owl.png");
    fs::write(input.path().join("notes.txt"), "not an image").unwrap();

    let result = stickerbot()
        .arg(input.path())
        .args(["--pattern", "frog_*", "--format", "png"])
        .output()
        .unwrap();
    assert!(result.status.success());

    assert_eq!(reported_order(&result), vec!["frog_1.png", "frog_2.png"]);
    assert!(input.path().join("frog_1_sticker.png").exists());
    assert!(input.path().join("frog_2_sticker.png").exists());
    assert!(!input.path().join("owl_sticker.png").exists());
}

#[test]
fn test_cli_partial_failure_still_succeeds() {
    let input = TempDir::new().unwrap();
    write_png(input.path(), "good.png");
    fs::write(input.path().join("broken.png"), b"\x89PNG\r\n\x1a\n garbage").unwrap();

    let result = stickerbot().arg(input.path()).output().unwrap();
    assert!(result.status.success());
    assert!(input.path().join("good_sticker.webp").exists());
    assert!(!input.path().join("broken_sticker.webp").exists());
    assert!(String::from_utf8_lossy(&result.stderr).contains("broken.png"));
}

#[test]
fn test_cli_fails_when_nothing_is_produced() {
    let input = TempDir::new().unwrap();
    let broken = input.path().join("broken.png");
    fs::write(&broken, b"nope").unwrap();

    let result = stickerbot().arg(&broken).output().unwrap();
    assert!(!result.status.success());
}

#[test]
fn test_cli_single_image_to_stdout() {
    let input = TempDir::new().unwrap();
    write_png(input.path(), "frog.png");

    let result = stickerbot()
        .arg(input.path().join("frog.png"))
        .args(["-o", "-"])
        .output()
        .unwrap();
    assert!(result.status.success());
    assert_eq!(&result.stdout[..4], b"RIFF");
    let decoded = image::load_from_memory(&result.stdout).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (48, 32));
}

#[test]
fn test_cli_print_config_emits_json() {
    let result = stickerbot()
        .args(["--print-config", "--strategy", "global", "--max-bytes", "307200"])
        .output()
        .unwrap();
    assert!(result.status.success());

    let json: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(json["strategy"]["type"], "global-match");
    assert_eq!(json["limits"]["max_bytes"], 307_200);
    assert_eq!(json["limits"]["max_dimension"], 512);
}

#[test]
fn test_cli_rejects_conflicting_flags() {
    let result = stickerbot()
        .args(["--print-config", "--strategy", "purple", "--tolerance", "10"])
        .output()
        .unwrap();
    assert!(!result.status.success());
}
