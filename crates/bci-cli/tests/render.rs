use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::{error::Error, fs};
use tempfile::tempdir;

fn matrix_json(channels: usize, timesteps: usize) -> String {
    let rows: Vec<Vec<f64>> = (0..channels)
        .map(|c| (0..timesteps).map(|t| ((c + t) as f64).sin()).collect())
        .collect();
    serde_json::to_string(&rows).expect("matrix json")
}

#[test]
fn renders_full_layout_to_png() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("trial.json");
    let out = dir.path().join("trial.png");
    fs::write(&input, matrix_json(22, 64))?;

    let mut cmd = cargo_bin_cmd!("bci");
    cmd.args([
        "render",
        "--input",
        input.to_str().expect("utf8 path"),
        "--out",
        out.to_str().expect("utf8 path"),
        "--width",
        "320",
        "--height",
        "200",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let summary: Value = serde_json::from_slice(&output)?;
    assert_eq!(summary["channels"].as_array().map(Vec::len), Some(22));
    assert_eq!(summary["channels"][0], "Fz");
    assert_eq!(summary["timesteps"], 64);
    assert_eq!(&fs::read(&out)?[1..4], b"PNG");
    Ok(())
}

#[test]
fn renders_selected_channels_from_trial_response() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("response.json");
    let out = dir.path().join("motor.png");
    let response = format!(
        r#"{{"trial_index": 3, "total_trials": 10, "true_label_name": "Foot", "eeg_data": {}}}"#,
        matrix_json(22, 32)
    );
    fs::write(&input, response)?;

    let mut cmd = cargo_bin_cmd!("bci");
    cmd.args([
        "render",
        "--input",
        input.to_str().expect("utf8 path"),
        "--out",
        out.to_str().expect("utf8 path"),
        "--channels",
        "C3,Cz,C4",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let summary: Value = serde_json::from_slice(&output)?;
    assert_eq!(summary["channels"], serde_json::json!(["C3", "Cz", "C4"]));
    assert!(out.exists());
    Ok(())
}

#[test]
fn ragged_matrix_is_rejected() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("ragged.json");
    let out = dir.path().join("ragged.png");
    fs::write(&input, "[[0.0, 1.0, 2.0], [0.0, 1.0]]")?;

    let mut cmd = cargo_bin_cmd!("bci");
    cmd.args([
        "render",
        "--input",
        input.to_str().expect("utf8 path"),
        "--out",
        out.to_str().expect("utf8 path"),
    ]);
    let output = cmd.assert().failure().get_output().stderr.clone();
    let stderr = String::from_utf8(output)?;
    assert!(stderr.contains("channel 1 has 2 samples, expected 3"));
    assert!(!out.exists());
    Ok(())
}

#[test]
fn unknown_channel_is_rejected() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("trial.json");
    let out = dir.path().join("trial.png");
    fs::write(&input, matrix_json(22, 8))?;

    let mut cmd = cargo_bin_cmd!("bci");
    cmd.args([
        "render",
        "--input",
        input.to_str().expect("utf8 path"),
        "--out",
        out.to_str().expect("utf8 path"),
        "--channels",
        "C3,T7",
    ]);
    let output = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8(output)?.contains("unknown channel 'T7'"));
    Ok(())
}
