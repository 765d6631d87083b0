#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "epucklink-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn epucklink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_epucklink"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("epucklink should run")
}

fn encode_into(capture: &Path, tag: &str, data: &str) {
    let output = epucklink(&[
        "encode",
        "--tag",
        tag,
        "--data",
        data,
        "--output",
        capture.to_str().expect("utf-8 path"),
    ]);
    assert!(
        output.status.success(),
        "encode failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect()
}

#[test]
fn encode_writes_wire_format_to_stdout() {
    let output = epucklink(&["encode", "--tag", "Message", "--data", "hello"]);
    assert!(output.status.success());
    assert_eq!(output.stdout, b"START    5||Message||hello");
}

#[test]
fn encode_rejects_delimiter_in_tag() {
    let output = epucklink(&["encode", "--tag", "Mess|age", "--data", "x"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn replay_decodes_encoded_capture() {
    let dir = unique_temp_dir("replay");
    let capture = dir.join("capture.bin");

    std::fs::write(&capture, b"noise before the first frame STAR").expect("seed capture");
    encode_into(&capture, "Message", "Walls:500:700:end");
    encode_into(&capture, "Message", "New position:120:340:1.57:end");
    encode_into(&capture, "Message", "PointClosest:7:-3:end");
    encode_into(&capture, "Message", "send the map");
    encode_into(&capture, "Telemetry", "ignored");
    encode_into(&capture, "Message", "just chatting");

    let output = epucklink(&[
        "--format",
        "json",
        "replay",
        capture.to_str().expect("utf-8 path"),
    ]);
    assert!(
        output.status.success(),
        "replay failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let events = json_lines(&output);
    let kinds: Vec<&str> = events
        .iter()
        .map(|event| event["event"].as_str().expect("event name"))
        .collect();
    assert_eq!(
        kinds,
        [
            "wall_rectangle",
            "robot_pose",
            "point",
            "map_save_request",
            "decode_error",
            "raw_text"
        ]
    );
    assert_eq!(events[0]["width"], 500);
    assert_eq!(events[1]["heading"], 1.57);
    assert_eq!(events[2]["kind"], "closest");
    assert_eq!(events[2]["y"], -3);
    assert_eq!(events[4]["reason"], "unrecognized_tag");
    assert_eq!(events[5]["text"], "just chatting");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn replay_saves_snapshots_as_png() {
    let dir = unique_temp_dir("images");
    let capture = dir.join("capture.bin");
    let bitmap = dir.join("bitmap.bin");
    let images = dir.join("images");

    std::fs::write(&bitmap, [0xFFu8, 0x00].repeat(9600)).expect("write bitmap");
    let output = epucklink(&[
        "encode",
        "--tag",
        "Image:10:20:0",
        "--file",
        bitmap.to_str().expect("utf-8 path"),
        "--output",
        capture.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success());

    let output = epucklink(&[
        "--format",
        "json",
        "replay",
        capture.to_str().expect("utf-8 path"),
        "--save-images",
        images.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success());

    let events = json_lines(&output);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event"], "image_placed");
    assert_eq!(events[0]["id"], 0);
    assert_eq!(events[0]["x"], 10);
    assert!(events[0].get("raster").is_none());
    assert!(events[0]["image_path"]
        .as_str()
        .expect("image path")
        .ends_with("Image0_x_10_y_20.png"));
    assert!(images.join("Image0_x_10_y_20.png").exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn replay_honors_count() {
    let dir = unique_temp_dir("count");
    let capture = dir.join("capture.bin");
    for text in ["one", "two", "three"] {
        encode_into(&capture, "Message", text);
    }

    let output = epucklink(&[
        "--format",
        "json",
        "replay",
        capture.to_str().expect("utf-8 path"),
        "--count",
        "2",
    ]);
    assert!(output.status.success());
    assert_eq!(json_lines(&output).len(), 2);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn replay_missing_file_fails() {
    let output = epucklink(&["replay", "/nonexistent/epucklink/capture.bin"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn listen_missing_port_reports_transport_error() {
    let output = epucklink(&["listen", "/dev/epucklink-no-such-port"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("open failed"));
}

#[test]
fn version_prints_package_version() {
    let output = epucklink(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("epucklink {}", env!("CARGO_PKG_VERSION"))
    );
}
