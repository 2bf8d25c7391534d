use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn bridge_cli() -> Command {
    let mut cmd = Command::cargo_bin("bridge_cli").unwrap();
    cmd.env_remove("BRIDGEFORM_API_URL").arg("--offline");
    cmd
}

const FORM: &str = r#"{
  "structure_type": "Highway",
  "location": {
    "mode": "custom",
    "state_id": null,
    "district_id": null,
    "resolved": {
      "record": {
        "wind_speed_mps": 47.0,
        "seismic_zone": "IV",
        "seismic_factor": 0.24,
        "min_temp_c": 4.0,
        "max_temp_c": 45.0,
        "state_name": "Custom",
        "district_name": "Custom"
      },
      "source": "custom",
      "warning": null
    }
  },
  "geometry": {
    "span": 30,
    "carriageway_width": "7.5",
    "footpath": "Single-sided",
    "skew_angle": null,
    "layout": { "spacing_m": 2.5, "overhang_m": 2.5, "girder_count": 4 }
  },
  "materials": { "girder_steel": "E350", "cross_bracing_steel": "E250", "deck_concrete": "M30" }
}"#;

#[test]
fn span_in_range() {
    bridge_cli()
        .args(["span", "45"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Span = 45"));
}

#[test]
fn span_out_of_range() {
    bridge_cli()
        .args(["span", "45.1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Outside the software range. (Valid range: 20-45 m)"));
}

#[test]
fn negative_skew_accepted() {
    bridge_cli().args(["skew", "-15"]).assert().success();
    bridge_cli()
        .args(["skew", "-15.5"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("IRC 24 (2010)"));
}

#[test]
fn width_json() {
    bridge_cli()
        .args(["--json", "width", "24"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"is_valid\": false"));
}

#[test]
fn geometry_infers_overhang() {
    bridge_cli()
        .args(["geometry", "--width", "7.5", "--spacing", "2.5", "--girders", "4", "--changed", "spacing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inferred: Deck Overhang Width"))
        .stdout(predicate::str::contains("Deck overhang:     2.500"));
}

#[test]
fn geometry_mismatch() {
    bridge_cli()
        .args(["geometry", "--width", "7.5", "--spacing", "2.5", "--overhang", "2.5", "--girders", "3"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Expected: 4.00, Got: 3"));
}

#[test]
fn geometry_unknown_field() {
    bridge_cli()
        .args(["geometry", "--width", "7.5", "--changed", "camber"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("UNKNOWN_OPTION"));
}

#[test]
fn locations_of_state() {
    bridge_cli()
        .args(["locations", "--state", "uttar-pradesh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Lucknow"))
        .stdout(predicate::str::contains("Kanpur"));
}

#[test]
fn location_offline_uses_table() {
    bridge_cli()
        .args(["location", "himachal-pradesh", "shimla"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Zone IV"))
        .stdout(predicate::str::contains("static table"));
}

#[test]
fn location_unknown() {
    bridge_cli()
        .args(["location", "goa", "margao"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Location not found: margao, goa"));
}

#[test]
fn custom_rows() {
    bridge_cli()
        .args(["custom", "47,IV,0.24,5,38", ",,,,", "39,Zone III,0.16,10,40"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 row(s) accepted, row 1 active"));
}

#[test]
fn custom_rows_rejected() {
    bridge_cli()
        .args(["custom", "47,IV,0.24,40,10"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Max must be > Min"));
}

#[test]
fn materials_builtin() {
    bridge_cli()
        .arg("materials")
        .assert()
        .success()
        .stdout(predicate::str::contains("E250 (250 MPa)"))
        .stdout(predicate::str::contains("built-in catalog"));
}

#[test]
fn submit_dry_run() {
    let file = assert_fs::NamedTempFile::new("form.json").unwrap();
    file.write_str(FORM).unwrap();

    bridge_cli()
        .args(["submit", "--dry-run", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"overall_width\": 12.5"))
        .stdout(predicate::str::contains("\"girder_steel\": \"E350\""));
}

#[test]
fn submit_rejects_invalid_form() {
    let file = assert_fs::NamedTempFile::new("form.json").unwrap();
    file.write_str(&FORM.replace("\"span\": 30", "\"span\": 50")).unwrap();

    bridge_cli()
        .args(["submit", "--dry-run", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Outside the software range"));
}
