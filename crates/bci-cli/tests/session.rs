use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::{json, Value};
use std::error::Error;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use tempfile::tempdir;

fn read_request(stream: &TcpStream) -> Option<(String, Value)> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let path = request_line.split_whitespace().nth(1)?.to_string();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;
    Some((path, serde_json::from_slice(&body).unwrap_or(Value::Null)))
}

fn reply(path: &str, body: &Value) -> Value {
    match path {
        "/api/init" => json!({
            "subjects": [1, 2, 3, 4, 5, 6, 7, 8, 9],
            "model_types": [
                {"id": "original", "name": "Original (Keras)"},
                {"id": "quantized", "name": "Quantized (TFLite)"},
                {"id": "int8", "name": "Integer8 (TFLite)"},
            ],
        }),
        "/api/load_model" => json!({
            "message": format!("Model selected: {}", body["model_type"].as_str().unwrap_or("?")),
            "data_load_time": 0.5,
        }),
        "/api/get_trial" => {
            let index = match body["mode"].as_str() {
                Some("random") => 2,
                _ => body["index"].as_u64().unwrap_or(0).min(9),
            };
            json!({
                "trial_index": index,
                "total_trials": 10,
                "true_label": 0,
                "true_label_name": "Left hand",
                "eeg_data": vec![vec![0.0, 0.5, 1.0, 0.5]; 22],
            })
        }
        "/api/predict" => json!({
            "predicted_label": "Left hand",
            "confidence": 0.8734,
            "inference_time_ms": 2.25,
            "correct": true,
        }),
        "/api/predict_all" => json!({
            "accuracy": 76.0,
            "avg_time_ms": 2.0,
            "results": [
                {"id": 0, "true": "Left hand", "pred": "Left hand", "correct": true, "time_ms": 2.0},
                {"id": 1, "true": "Foot", "pred": "Tongue", "correct": false, "time_ms": 2.0},
            ],
        }),
        _ => json!({"error": "not found"}),
    }
}

fn spawn_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub backend");
    let addr = listener.local_addr().expect("stub address");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let Some((path, body)) = read_request(&stream) else {
                continue;
            };
            let payload = reply(&path, &body).to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
                payload.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}")
}

#[test]
fn models_hides_quantized_under_loso() -> Result<(), Box<dyn Error>> {
    let backend = spawn_backend();
    let mut cmd = cargo_bin_cmd!("bci");
    cmd.args(["--backend", &backend, "models", "--loso"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let models: Value = serde_json::from_slice(&output)?;
    assert_eq!(models["strategy"], "independent");
    assert_eq!(models["subjects"], json!([1]));
    let ids: Vec<&str> = models["models"]
        .as_array()
        .expect("models array")
        .iter()
        .filter_map(|m| m["id"].as_str())
        .collect();
    assert_eq!(ids, ["original", "int8"]);
    Ok(())
}

#[test]
fn session_reports_displayed_values() -> Result<(), Box<dyn Error>> {
    let backend = spawn_backend();
    let dir = tempdir()?;
    let chart = dir.path().join("trial.png");
    let csv = dir.path().join("batch.csv");

    let mut cmd = cargo_bin_cmd!("bci");
    cmd.args([
        "--backend",
        &backend,
        "session",
        "--subject",
        "4",
        "--model",
        "int8",
        "--trial",
        "index",
        "--index",
        "5",
        "--predict",
        "--batch",
        "--plot",
        chart.to_str().expect("utf8 path"),
        "--batch-csv",
        csv.to_str().expect("utf8 path"),
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let snapshot: Value = serde_json::from_slice(&output)?;

    assert_eq!(snapshot["state"]["subject_id"], 4);
    assert_eq!(snapshot["state"]["current_trial_index"], 5);
    assert_eq!(snapshot["trial"]["index_input"], "5");
    assert_eq!(snapshot["model"]["status"], "Ready");
    assert_eq!(snapshot["model"]["model_name"], "int8");
    assert_eq!(snapshot["prediction"]["confidence"], "87.3%");
    assert_eq!(snapshot["prediction"]["verdict"], "correct");
    assert_eq!(snapshot["batch"]["accuracy"], "76.00%");
    assert_eq!(snapshot["batch"]["rows"].as_array().map(Vec::len), Some(2));

    assert!(chart.exists());
    let rows = fs::read_to_string(&csv)?;
    assert_eq!(rows.lines().count(), 3);
    Ok(())
}

#[test]
fn loso_session_rejects_other_subjects() -> Result<(), Box<dyn Error>> {
    let backend = spawn_backend();
    let mut cmd = cargo_bin_cmd!("bci");
    cmd.args(["--backend", &backend, "session", "--loso", "--subject", "3"]);
    let output = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8(output)?.contains("subject is locked to 1"));
    Ok(())
}

#[test]
fn unreachable_backend_fails_with_connectivity_message() -> Result<(), Box<dyn Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let mut cmd = cargo_bin_cmd!("bci");
    cmd.args(["--backend", &format!("http://{addr}"), "session"]);
    let output = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8(output)?.contains("Failed to connect to server"));
    Ok(())
}
