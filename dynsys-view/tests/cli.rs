use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

// Runs inside `dir` with HOME pointed there too, so no stray config files are picked up.
fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dynsys-view"))
        .args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env_remove("DYNSYS_VIEW_CONFIG")
        .env_remove("DYNSYS_VIEW_SCALE_MODE")
        .env_remove("DYNSYS_VIEW_MAPPING")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute dynsys-view binary")
}

fn write_diagonal(dir: &Path) -> String {
    let path = dir.join("diagonal.csv");
    fs::write(&path, "x,y,z\n0,0,0\n1,1,1\n2,2,2\n").unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_inspect_json_report() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_diagonal(temp_dir.path());

    let output = run_in(temp_dir.path(), &["inspect", &file, "--json"]);
    assert!(
        output.status.success(),
        "inspect failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["points"], 3);
    assert_eq!(report["bounds"][0][0], 0.0);
    assert_eq!(report["bounds"][2][1], 2.0);
    for axis in 0..3 {
        assert_eq!(report["ticks"][axis]["step"], 0.5);
        assert_eq!(report["ticks"][axis]["ticks"].as_array().unwrap().len(), 5);
    }
    assert_eq!(report["primitives"]["axes"], 3);
    assert_eq!(report["primitives"]["trajectory"], 2);
    assert_eq!(report["primitives"]["labels"], 18);
}

#[test]
fn test_inspect_text_report_with_camera_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_diagonal(temp_dir.path());

    let output = run_in(
        temp_dir.path(),
        &["inspect", &file, "--azimuth", "-135", "--polar", "80"],
    );
    assert!(
        output.status.success(),
        "inspect failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("azimuth 225.0 deg"), "{stdout}");
    assert!(stdout.contains("front faces:"), "{stdout}");
}

#[test]
fn test_inspect_rejects_bad_rows() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("short.csv");
    fs::write(&path, "0,1\n2\n").unwrap();

    let output = run_in(temp_dir.path(), &["inspect", path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Rejected trajectory"), "{stderr}");
}

#[test]
fn test_config_generate_then_load() {
    let temp_dir = TempDir::new().unwrap();

    let output = run_in(temp_dir.path(), &["config", "generate"]);
    assert!(output.status.success());
    let generated = temp_dir.path().join(".dynsys-view.yaml");
    assert!(generated.exists());

    // the generated file is picked up from the working directory
    let output = run_in(temp_dir.path(), &["config", "show"]);
    assert!(output.status.success());
    let shown = String::from_utf8_lossy(&output.stdout);
    assert!(shown.contains("max_ticks: 15"), "{shown}");
}

#[test]
fn test_explicit_config_overrides_scale_mode() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_diagonal(temp_dir.path());
    let config = temp_dir.path().join("viewer.json");
    fs::write(&config, r#"{ "normalizer": { "scale_mode": "anisotropic" } }"#).unwrap();

    let output = run_in(
        temp_dir.path(),
        &["--config", config.to_str().unwrap(), "config", "show"],
    );
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("scale_mode: anisotropic"));
    assert!(run_in(temp_dir.path(), &["inspect", &file]).status.success());
}
