//! Drives the real process backends against small shell scripts standing in
//! for cork and meshlabserver.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use assert_fs::prelude::*;
use meshdiff::config::{ConverterKind, EngineKind, ToolConfig};
use meshdiff::outcome::codes;
use meshdiff::{run_difference, ErrorClass, RawArguments};

// Writing an executable while another thread spawns a child can fail with
// ETXTBSY, so these tests run one at a time.
static SERIAL: Mutex<()> = Mutex::new(());

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Configuration whose engine copies its first operand and whose converter
/// copies its input.
fn config(tools: &Path) -> ToolConfig {
    let mut config = ToolConfig::default();
    config.engine = EngineKind::Cork;
    config.converter = ConverterKind::MeshLab;
    config.tools.cork = script(tools, "cork", r#"cp "$2" "$4""#);
    config.tools.meshlab = script(tools, "meshlabserver", r#"cp "$2" "$4""#);
    config
}

fn inputs(dir: &assert_fs::TempDir) -> RawArguments {
    let pc = dir.child("cloud.txt");
    pc.write_str("# x;y;z\n0;0;0\n4;0;0.5\n4;4;1\n0;4;0.5\n2;2;2\n")
        .unwrap();
    let solid = dir.child("part.stl");
    solid.write_str("solid part\nendsolid part\n").unwrap();
    RawArguments::new(
        pc.path().to_string_lossy(),
        solid.path().to_string_lossy(),
        dir.child("result.stl").path().to_string_lossy(),
        "0.25",
    )
}

#[test]
fn cork_and_meshlab_scripts_produce_output() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let tools = assert_fs::TempDir::new().unwrap();
    let work = assert_fs::TempDir::new().unwrap();
    let raw = inputs(&work)
        .with_z("-10", "10")
        .with_xy("-1", "5", "-1", "5");

    let outcome = run_difference(&config(tools.path()), &raw);
    assert!(outcome.ok, "{:?}", outcome);
    work.child("result.stl")
        .assert(predicates::str::starts_with("OFF\n"));
    for name in ["pc.off", "stl.off", "cube.off", "int.off", "out.off"] {
        work.child(name).assert(predicates::path::missing());
    }
}

#[test]
fn engine_exit_status_is_ignored() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let tools = assert_fs::TempDir::new().unwrap();
    let work = assert_fs::TempDir::new().unwrap();
    let mut cfg = config(tools.path());
    cfg.tools.cork = script(tools.path(), "cork", r#"cp "$2" "$4"; exit 3"#);

    let outcome = run_difference(&cfg, &inputs(&work));
    assert!(outcome.ok, "{:?}", outcome);
}

#[test]
fn engine_without_output_reports_difference_failure() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let tools = assert_fs::TempDir::new().unwrap();
    let work = assert_fs::TempDir::new().unwrap();
    let mut cfg = config(tools.path());
    cfg.tools.cork = script(tools.path(), "cork", "exit 0");

    let outcome = run_difference(&cfg, &inputs(&work));
    assert_eq!(outcome.code, Some(codes::DIFFERENCE_FAILED));
    assert_eq!(outcome.class, Some(ErrorClass::ExternalProcess));
    work.child("pc.off").assert(predicates::path::missing());

    cfg.keep_intermediates = true;
    let outcome = run_difference(&cfg, &inputs(&work));
    assert_eq!(outcome.code, Some(codes::DIFFERENCE_FAILED));
    work.child("pc.off").assert(predicates::path::exists());
    work.child("stl.off").assert(predicates::path::exists());
}

#[test]
fn missing_cork_is_a_missing_capability() {
    let tools = assert_fs::TempDir::new().unwrap();
    let work = assert_fs::TempDir::new().unwrap();
    let mut cfg = ToolConfig::default();
    cfg.tools.cork = tools.path().join("no-cork");
    work.child("pc.off").write_str("stale").unwrap();

    let outcome = run_difference(&cfg, &inputs(&work));
    assert_eq!(outcome.code, Some(codes::CORK_MISSING));
    assert_eq!(outcome.class, Some(ErrorClass::MissingCapability));
    work.child("pc.off").assert("stale");
}

#[test]
fn unlaunchable_converter_reports_launch_failure() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let tools = assert_fs::TempDir::new().unwrap();
    let work = assert_fs::TempDir::new().unwrap();
    let mut cfg = config(tools.path());
    cfg.tools.meshlab = tools.path().join("missing-meshlab");

    let outcome = run_difference(&cfg, &inputs(&work));
    assert_eq!(outcome.code, Some(codes::SOLID_CONVERTER_FAILED));
}

#[test]
fn openscad_script_is_run_and_removed() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let tools = assert_fs::TempDir::new().unwrap();
    let work = assert_fs::TempDir::new().unwrap();
    let mut cfg = config(tools.path());
    cfg.engine = EngineKind::OpenScad;
    // `openscad -o <out> <script>`: echo the script into the output
    cfg.tools.openscad = script(tools.path(), "openscad", r#"cat "$3" > "$2""#);
    let raw = inputs(&work)
        .with_z("-10", "10")
        .with_xy("-1", "5", "-1", "5");

    let outcome = run_difference(&cfg, &raw);
    assert!(outcome.ok, "{:?}", outcome);
    let int_off = work.child("int.off").path().display().to_string();
    let cube_off = work.child("cube.off").path().display().to_string();
    work.child("result.stl").assert(format!(
        "intersection(){{import(\"{}\");import(\"{}\");}}",
        int_off, cube_off
    ));
    work.child("open.scad").assert(predicates::path::missing());
}

#[test]
fn openscad_failure_removes_script() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let tools = assert_fs::TempDir::new().unwrap();
    let work = assert_fs::TempDir::new().unwrap();
    let mut cfg = config(tools.path());
    cfg.engine = EngineKind::OpenScad;
    cfg.tools.openscad = script(tools.path(), "openscad", "exit 1");

    let outcome = run_difference(&cfg, &inputs(&work));
    assert_eq!(outcome.code, Some(codes::DIFFERENCE_FAILED));
    work.child("open.scad").assert(predicates::path::missing());
}

#[test]
fn non_executable_engine_is_a_launch_failure() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let tools = assert_fs::TempDir::new().unwrap();
    let work = assert_fs::TempDir::new().unwrap();
    let mut cfg = config(tools.path());
    cfg.tools.cork = script(tools.path(), "cork", r#"cp "$2" "$4""#);
    fs::set_permissions(&cfg.tools.cork, fs::Permissions::from_mode(0o644)).unwrap();

    let outcome = run_difference(&cfg, &inputs(&work));
    assert_eq!(outcome.code, Some(codes::ENGINE_LAUNCH_FAILED));
    assert_eq!(outcome.class, Some(ErrorClass::ExternalProcess));
    work.child("pc.off").assert(predicates::path::missing());
}
