use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const PAGE: &str = r#"
version = 1
title = "Trace fixture"

[viewport]
width = 800
height = 600

[[inputs]]
uniform = "amp"
value = 0.5

[[blocks]]
kind = "shader"
id = "still"
height = 200
main = "uniform float amp; void mainImage(out vec4 c, in vec2 p) { c = vec4(amp); }"

[[blocks]]
kind = "shader"
id = "spin"
height = 200
animated = true
main = "void mainImage(out vec4 c, in vec2 p) { c = vec4(iTime); }"

[[blocks]]
kind = "text"
height = 2000

[[blocks]]
kind = "shader"
id = "far"
height = 200
main = "void mainImage(out vec4 c, in vec2 p) { c = vec4(1.0); }"
"#;

fn write_page(root: &Path, contents: &str) -> PathBuf {
    let path = root.join("page.toml");
    fs::write(&path, contents).unwrap();
    path
}

fn pageshade(args: &[&str], page: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pageshade"))
        .env("RUST_LOG", "warn")
        .env_remove("PAGESHADE_PAGE")
        .args(args)
        .arg(page)
        .output()
        .expect("failed to run pageshade")
}

fn json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn trace_paints_single_frame_when_nothing_animates() {
    let root = TempDir::new().unwrap();
    let page = write_page(root.path(), PAGE);

    let output = pageshade(&["trace", "--frames", "5", "--json"], &page);
    let trace = json(&output);

    let frames = trace["frames"].as_array().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["drawn"], 2);
    assert_eq!(frames[0]["culled"], 1);
    assert_eq!(frames[0]["animating"], false);
    assert!(trace["diagnostics"].as_array().unwrap().is_empty());

    let draws = frames[0]["calls"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|call| call["op"] == "draw_triangles")
        .count();
    assert_eq!(draws, 2);
}

#[test]
fn trace_applies_page_inputs() {
    let root = TempDir::new().unwrap();
    let page = write_page(root.path(), PAGE);

    let trace = json(&pageshade(&["trace", "--json"], &page));
    let amp_written = trace["frames"][0]["calls"]
        .as_array()
        .unwrap()
        .iter()
        .any(|call| {
            call["op"] == "uniform1f" && call["args"]["name"] == "amp" && call["args"]["value"] == 0.5
        });
    assert!(amp_written);
}

#[test]
fn trace_with_play_keeps_animating() {
    let root = TempDir::new().unwrap();
    let page = write_page(root.path(), PAGE);

    let output = pageshade(
        &["trace", "--frames", "3", "--step", "500ms", "--play", "spin", "--json"],
        &page,
    );
    let trace = json(&output);

    let frames = trace["frames"].as_array().unwrap();
    assert_eq!(frames.len(), 3);
    for (index, frame) in frames.iter().enumerate() {
        assert_eq!(frame["animating"], true);
        assert_eq!(frame["drawn"], 2);
        assert_eq!(frame["time_ms"], 500.0 * index as f64);
    }
    let last_time = frames[2]["calls"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|call| call["op"] == "uniform1f" && call["args"]["name"] == "iTime")
        .last()
        .map(|call| call["args"]["value"].as_f64().unwrap());
    assert_eq!(last_time, Some(1.0));
}

#[test]
fn trace_rejects_playing_static_visualization() {
    let root = TempDir::new().unwrap();
    let page = write_page(root.path(), PAGE);

    let output = pageshade(&["trace", "--play", "still"], &page);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not animated"));

    let output = pageshade(&["trace", "--play", "nowhere"], &page);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no visualization"));
}

#[test]
fn broken_shader_is_reported_and_skipped() {
    let root = TempDir::new().unwrap();
    let page = write_page(
        root.path(),
        &PAGE.replace(
            "void mainImage(out vec4 c, in vec2 p) { c = vec4(1.0); }",
            "void main() {}",
        ),
    );

    let output = pageshade(&["trace", "--json"], &page);
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    assert!(
        stderr.contains("error[far]: Shader program did not link successfully"),
        "stderr: {stderr}"
    );
    let trace = json(&output);
    assert_eq!(trace["diagnostics"][0]["id"], "far");
    assert_eq!(trace["frames"][0]["drawn"], 2);
    assert_eq!(trace["frames"][0]["culled"], 0);
}

#[test]
fn layout_reports_viewport_relative_rectangles() {
    let root = TempDir::new().unwrap();
    let page = write_page(root.path(), PAGE);

    let entries = json(&pageshade(&["layout", "--scroll", "100", "--json"], &page));
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 4);

    assert_eq!(entries[0]["kind"], "shader");
    assert_eq!(entries[0]["id"], "still");
    assert_eq!(entries[0]["rect"]["left"], 40.0);
    assert_eq!(entries[0]["rect"]["top"], -76.0);
    assert_eq!(entries[0]["rect"]["width"], 720.0);

    assert_eq!(entries[1]["id"], "spin");
    assert_eq!(entries[1]["rect"]["top"], 140.0);
    assert_eq!(entries[2]["kind"], "text");
}

#[test]
fn invalid_page_fails() {
    let root = TempDir::new().unwrap();
    let page = write_page(root.path(), &PAGE.replace("version = 1", "version = 2"));

    let output = pageshade(&["layout"], &page);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported page version 2"));
}
