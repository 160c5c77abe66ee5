use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn fixture_path(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(rel)
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_studentdashd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn studentdashd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn read_response(reader: &mut BufReader<ChildStdout>) -> serde_json::Value {
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let value = read_response(reader);
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let fixture = fixture_path("fixtures/students_example.csv");
    let out_dir = std::env::temp_dir().join(format!("studentdashd-router-smoke-{}", std::process::id()));

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], true);
    assert_eq!(
        health["result"]["datasetPath"],
        "notebook/student_dataset_cleaned.csv"
    );

    let selected = request(
        &mut stdin,
        &mut reader,
        "2",
        "dataset.select",
        json!({ "path": fixture.to_string_lossy() }),
    );
    assert_eq!(selected["ok"], true);

    for (id, method, params) in [
        ("3", "dashboard.render", json!({})),
        ("4", "dashboard.page", json!({ "grade": "C" })),
        ("5", "dashboard.exportAtRisk", json!({ "grade": "D" })),
        (
            "6",
            "dashboard.exportBundle",
            json!({ "outPath": out_dir.join("bundle.zip").to_string_lossy() }),
        ),
    ] {
        let resp = request(&mut stdin, &mut reader, id, method, params);
        assert_eq!(resp["ok"], true, "{} failed: {}", method, resp);
    }

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn unknown_method_and_bad_json_are_reported() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{}", json!({ "id": "x", "method": "nope", "params": {} })).expect("write");
    stdin.flush().expect("flush");
    let resp = read_response(&mut reader);
    assert_eq!(resp["id"], "x");
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "not_implemented");

    writeln!(stdin, "this is not json").expect("write");
    stdin.flush().expect("flush");
    let resp = read_response(&mut reader);
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "bad_json");

    // blank lines are skipped, the next request still gets its own answer
    writeln!(stdin).expect("write");
    let health = request(&mut stdin, &mut reader, "h", "health", json!({}));
    assert_eq!(health["ok"], true);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn bad_param_types_are_rejected() {
    let fixture = fixture_path("fixtures/students_example.csv");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "dashboard.render",
        json!({ "datasetPath": fixture.to_string_lossy(), "grade": 7 }),
    );
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "bad_params");

    let resp = request(&mut stdin, &mut reader, "2", "dataset.select", json!({}));
    assert_eq!(resp["error"]["code"], "bad_params");

    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "dashboard.exportBundle",
        json!({ "datasetPath": fixture.to_string_lossy() }),
    );
    assert_eq!(resp["error"]["code"], "bad_params");

    drop(stdin);
    let _ = child.wait();
}
