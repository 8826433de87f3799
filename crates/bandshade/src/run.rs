use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use renderer::export::frame_path;
use renderer::{run, write_png, Preset, RenderPolicy, RunReport, ShaderBinding};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::cli::{AnimateArgs, ProgramArgs, RenderArgs, SurfaceArgs};
use crate::program::{ChainSpec, LoadedProgram, SurfaceSpec};

const DEFAULT_ANIMATION: Duration = Duration::from_secs(1);

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries command output such as `inspect` JSON.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn render(args: RenderArgs) -> Result<()> {
    let binding = surface_spec(&args.surface).build()?;
    let report = render_still(binding, args.time, args.out.clone())?;
    tracing::info!(
        path = %args.out.display(),
        time = report.last_time,
        "rendered still"
    );
    Ok(())
}

pub fn animate(args: AnimateArgs) -> Result<()> {
    let binding = surface_spec(&args.surface).build()?;
    let policy = match args.frames {
        Some(frames) => RenderPolicy::Animate {
            fps: args.fps,
            frames,
        },
        None => RenderPolicy::animate_for(args.fps, args.duration.unwrap_or(DEFAULT_ANIMATION))?,
    };
    let report = render_animation(binding, &policy, args.out_dir.clone())?;
    tracing::info!(
        frames = report.frames,
        last_time = report.last_time,
        wall_ms = report.wall_time.as_millis() as u64,
        out_dir = ?args.out_dir,
        "animation complete"
    );
    Ok(())
}

pub fn inspect(args: ProgramArgs) -> Result<()> {
    let loaded = LoadedProgram::load(&args.source())?;
    let defaults: serde_json::Map<String, serde_json::Value> = loaded
        .preset
        .map(Preset::defaults)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, value)| {
            let value = match value {
                shaderprog::UniformValue::Scalar(value) => json!(value),
                shaderprog::UniformValue::Vector2(value) => json!(value),
                shaderprog::UniformValue::Color(color) => json!(color.to_array()),
                shaderprog::UniformValue::Shader(_) => return None,
            };
            Some((name.to_string(), value))
        })
        .collect();
    let report = json!({
        "program": loaded.label,
        "id": loaded.program.id().get(),
        "uniforms": loaded.program.uniforms(),
        "defaults": defaults,
    });
    let text = serde_json::to_string_pretty(&report).context("failed to encode uniform contract")?;
    println!("{text}");
    Ok(())
}

pub fn list_presets() {
    for preset in Preset::ALL {
        println!("{preset}");
    }
}

pub(crate) fn render_still(binding: ShaderBinding, time: f32, out: PathBuf) -> Result<RunReport> {
    run(binding, &RenderPolicy::Still { time }, move |_, _, pixels| {
        write_png(pixels, &out).with_context(|| format!("failed to export {}", out.display()))
    })
}

pub(crate) fn render_animation(
    binding: ShaderBinding,
    policy: &RenderPolicy,
    out_dir: Option<PathBuf>,
) -> Result<RunReport> {
    let mut previous = Instant::now();
    run(binding, policy, move |sample, frame, pixels| {
        let now = Instant::now();
        tracing::info!(
            frame = sample.frame_index,
            time = sample.seconds,
            size = %format!("{}x{}", frame.surface_width, frame.surface_height),
            interval_ms = now.duration_since(previous).as_secs_f64() * 1000.0,
            "frame"
        );
        previous = now;
        if let Some(dir) = &out_dir {
            let path = frame_path(dir, sample.frame_index);
            write_png(pixels, &path)
                .with_context(|| format!("failed to export {}", path.display()))?;
        }
        Ok(())
    })
}

fn surface_spec(args: &SurfaceArgs) -> SurfaceSpec {
    SurfaceSpec {
        source: args.program.source(),
        size: args.size,
        color: args.color,
        uniforms: args.uniforms.clone(),
        chain: args.chain.map(|preset| ChainSpec {
            uniform: args.chain_uniform.clone(),
            source: sceneconfig::ProgramSource::Preset(preset.name().to_string()),
            uniforms: Vec::new(),
            sync: args.chain_sync,
        }),
    }
}
