use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn settings_file(xml: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp settings");
    tmp.write_all(xml.as_bytes()).expect("write settings");
    tmp
}

#[test]
fn summary_reports_light_and_probes() {
    let mut cmd = Command::cargo_bin("shadow-map-demo").expect("binary exists");
    cmd.arg("--summary-only")
        .args(["--probe", "5,0,4"])
        .args(["--probe", "3.13,0,-1.13"])
        .args(["--probe", "-9,0,-9"]);
    cmd.assert()
        .success()
        .stdout(contains(
            "Light at (2.50, 4.80, 4.30) looking at (2.50, 0.00, 3.50) (perspective, fov 120.0)",
        ))
        .stdout(contains("Camera at (6.00, 5.00, 7.00)"))
        .stdout(contains("Shadow map 2048x2048"))
        .stdout(contains("Frustum corners:"))
        .stdout(contains("probe (5.00, 0.00, 4.00) shadow=1.000"))
        .stdout(contains("probe (3.13, 0.00, -1.13) shadow=0.000"))
        .stdout(contains("probe (-9.00, 0.00, -9.00) shadow=1.000"));
}

#[test]
fn settings_file_overrides_defaults() {
    let settings = settings_file(
        r#"<settings>
  <camera><x>-2</x></camera>
  <light>
    <projection>orthographic</projection>
    <width>2</width>
  </light>
</settings>
"#,
    );
    let mut cmd = Command::cargo_bin("shadow-map-demo").expect("binary exists");
    cmd.arg("--settings")
        .arg(settings.path())
        .arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("orthographic, 2.00 x 1.00"))
        .stdout(contains("Camera at (-2.00, 5.00, 7.00)"));
}

#[test]
fn malformed_settings_file_fails() {
    let settings = settings_file("<settings><light><fov>wide</fov></light></settings>");
    let mut cmd = Command::cargo_bin("shadow-map-demo").expect("binary exists");
    cmd.arg("--settings")
        .arg(settings.path())
        .arg("--summary-only");
    cmd.assert()
        .failure()
        .stderr(contains("invalid settings file"));
}

#[test]
fn unknown_argument_is_rejected() {
    let mut cmd = Command::cargo_bin("shadow-map-demo").expect("binary exists");
    cmd.arg("--summary-only").arg("--frobnicate");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --frobnicate"));
}
