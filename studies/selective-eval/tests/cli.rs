use std::fs;
use std::process::Command;

use image::{ Rgb, RgbImage };
use tempfile::tempdir;

fn selective_eval() -> Command {
    Command::new(env!("CARGO_BIN_EXE_selective-eval"))
}

#[test]
fn eval_writes_json_report() {
    let dir = tempdir().unwrap();
    let predictions = dir.path().join("predictions.csv");
    let results = dir.path().join("results.json");
    fs::write(
        &predictions,
        "target,cat,dog\n0,0.9,0.1\n1,0.8,0.2\n1,0.3,0.7\n0,0.4,0.6\n"
    ).unwrap();

    let output = selective_eval()
        .args([
            "eval",
            "--predictions",
            predictions.to_str().unwrap(),
            "--topk",
            "1,2",
            "--verification-rates",
            "0,0.5,1",
            "--batch-size",
            "3",
            "--results-file",
            results.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Acc@1 50.000"));

    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(&results).unwrap()
    ).unwrap();
    assert_eq!(report["samples"], 4);
    assert_eq!(report["top_k"][1]["accuracy"], 100.0);
    assert_eq!(report["verification"][0]["final_accuracy"], 0.5);
    assert!(report["verification"][0]["average_final_accuracy"].is_null());
    assert_eq!(report["verification"][2]["final_accuracy"], 1.0);
}

#[test]
fn eval_fails_on_missing_file() {
    let dir = tempdir().unwrap();
    let status = selective_eval()
        .args(["eval", "--predictions", dir.path().join("nope.csv").to_str().unwrap()])
        .output()
        .unwrap()
        .status;
    assert!(!status.success());
}

#[test]
fn inspect_lists_samples_with_image_sizes() {
    let dir = tempdir().unwrap();
    let images = dir.path().join("images");
    fs::create_dir_all(images.join("cats")).unwrap();
    RgbImage::from_pixel(4, 3, Rgb([255, 0, 0])).save(images.join("cats/a.png")).unwrap();
    fs::write(images.join("notes.txt"), "not an image").unwrap();

    let samples = dir.path().join("samples.csv");
    fs::write(&samples, "filename,label\ncats/a.png,cat\nnotes.txt,dog\n").unwrap();
    let class_map = dir.path().join("classes.txt");
    fs::write(&class_map, "cat\ndog\n").unwrap();

    let output = selective_eval()
        .args([
            "inspect",
            "--images-dir",
            images.to_str().unwrap(),
            "--samples",
            samples.to_str().unwrap(),
            "--class-map",
            class_map.to_str().unwrap(),
            "--form",
            "basename",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("0\ta.png\t0\t"));
    assert!(lines[0].ends_with("\t4x3"));
    assert!(lines[1].starts_with("1\tnotes.txt\t1\t12\t-"));
}

#[test]
fn inspect_rejects_unknown_labels() {
    let dir = tempdir().unwrap();
    let samples = dir.path().join("samples.csv");
    fs::write(&samples, "filename,label\na.png,cat\nb.png,horse\n").unwrap();
    let class_map = dir.path().join("classes.json");
    fs::write(&class_map, r#"{"cat": 0}"#).unwrap();

    let output = selective_eval()
        .args([
            "inspect",
            "--images-dir",
            dir.path().to_str().unwrap(),
            "--samples",
            samples.to_str().unwrap(),
            "--class-map",
            class_map.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("horse"));
}
