use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn bandshade() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_bandshade"));
    command.env("RUST_LOG", "warn");
    command
}

#[test]
fn presets_lists_every_builtin() {
    let output = bandshade()
        .arg("presets")
        .output()
        .expect("failed to run bandshade presets");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let names: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        names,
        ["solid", "uniform-color", "gradient", "bounce", "bounce-masked", "wave-bands"]
    );
}

#[test]
fn render_writes_a_png_of_the_requested_size() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("stills/color.png");

    let status = bandshade()
        .args(["render", "--preset", "uniform-color", "--size", "5x3", "--color", "00ff00"])
        .arg("--out")
        .arg(&out)
        .status()
        .expect("failed to run bandshade render");
    assert!(status.success());

    let image = image::open(&out).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (5, 3));
    assert!(image.pixels().all(|pixel| pixel.0 == [0, 255, 0, 255]));
}

#[test]
fn render_reads_shader_files() {
    let dir = TempDir::new().unwrap();
    let shader = dir.path().join("half.sksl");
    fs::write(
        &shader,
        "uniform float level;\nhalf4 main(float2 p) { return half4(level, level, level, 1.0); }\n",
    )
    .unwrap();
    let out = dir.path().join("half.png");

    let status = bandshade()
        .arg("render")
        .arg("--shader")
        .arg(&shader)
        .args(["--size", "2x2", "--uniform", "level=1"])
        .arg("--out")
        .arg(&out)
        .status()
        .expect("failed to run bandshade render");
    assert!(status.success());

    let image = image::open(&out).unwrap().to_rgba8();
    assert!(image.pixels().all(|pixel| pixel.0 == [255, 255, 255, 255]));
}

#[test]
fn compile_errors_fail_with_a_location() {
    let dir = TempDir::new().unwrap();
    let shader = dir.path().join("broken.sksl");
    fs::write(&shader, "half4 main(float2 p) {\n    return half4(1.0)\n}\n").unwrap();

    let output = bandshade()
        .arg("render")
        .arg("--shader")
        .arg(&shader)
        .arg("--out")
        .arg(dir.path().join("never.png"))
        .output()
        .expect("failed to run bandshade render");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to compile"), "stderr: {stderr}");
    assert!(stderr.contains("3:"), "stderr: {stderr}");
    assert!(!dir.path().join("never.png").exists());
}

#[test]
fn unknown_uniforms_are_rejected() {
    let dir = TempDir::new().unwrap();
    let output = bandshade()
        .args(["render", "--preset", "solid", "--uniform", "iSpeed=2"])
        .arg("--out")
        .arg(dir.path().join("solid.png"))
        .output()
        .expect("failed to run bandshade render");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("iSpeed"));
}

#[test]
fn animate_writes_numbered_frames() {
    let dir = TempDir::new().unwrap();
    let frames = dir.path().join("frames");

    let status = bandshade()
        .args(["animate", "--preset", "bounce", "--size", "4x4", "--fps", "60", "--frames", "3"])
        .arg("--out-dir")
        .arg(&frames)
        .status()
        .expect("failed to run bandshade animate");
    assert!(status.success());

    for index in 0..3 {
        assert!(frames.join(format!("frame-{index:05}.png")).exists());
    }
    assert!(!frames.join("frame-00003.png").exists());
}

#[test]
fn inspect_prints_the_uniform_contract() {
    let output = bandshade()
        .args(["inspect", "--preset", "wave-bands"])
        .output()
        .expect("failed to run bandshade inspect");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["program"], "wave-bands");
    let uniforms = report["uniforms"].as_array().unwrap();
    let names: Vec<&str> = uniforms
        .iter()
        .map(|uniform| uniform["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["iResolution", "iTime", "iColor"]);
    assert_eq!(uniforms[2]["type"], "color");
    assert_eq!(uniforms[2]["color_managed"], true);
    assert_eq!(report["defaults"]["iColor"], serde_json::json!([1.0, 1.0, 0.0, 1.0]));
}

#[test]
fn scene_renders_every_surface() {
    let dir = TempDir::new().unwrap();
    let scene = dir.path().join("scene.toml");
    fs::write(
        &scene,
        r##"
version = 1

[defaults]
size = "6x4"
fps = 60

[[surfaces]]
name = "backdrop"
preset = "wave-bands"
output = "out/backdrop.png"

[surfaces.uniforms]
iColor = "#336699"

[[surfaces]]
name = "masked"
preset = "bounce-masked"
mode = "animate"
frames = 2
output = "out/masked"

[surfaces.chain]
uniform = "composable"
preset = "uniform-color"

[surfaces.chain.uniforms]
iColor = [1.0, 1.0, 1.0, 0.5]
"##,
    )
    .unwrap();

    let status = bandshade()
        .arg("scene")
        .arg(&scene)
        .status()
        .expect("failed to run bandshade scene");
    assert!(status.success());

    let still = image::open(dir.path().join("out/backdrop.png")).unwrap().to_rgba8();
    assert_eq!(still.dimensions(), (6, 4));
    for index in 0..2 {
        let frame = image::open(dir.path().join(format!("out/masked/frame-{index:05}.png")))
            .unwrap()
            .to_rgba8();
        assert!(frame.pixels().all(|pixel| pixel.0[3] == 128));
    }
}

#[test]
fn scene_rejects_invalid_configs() {
    let dir = TempDir::new().unwrap();
    let scene = dir.path().join("scene.toml");
    fs::write(
        &scene,
        "version = 1\n[[surfaces]]\nname = \"x\"\npreset = \"solid\"\noutput = \"x.png\"\n",
    )
    .unwrap();

    let output = bandshade()
        .arg("scene")
        .arg(&scene)
        .output()
        .expect("failed to run bandshade scene");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("needs a size"));
}
