use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use renderer::Preset;
use sceneconfig::{parse_hex_color, ProgramSource, Size, UniformSetting};

#[derive(Parser, Debug)]
#[command(
    name = "bandshade",
    author,
    version,
    about = "Render procedural shader programs to PNG stills and frame sequences"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a single still frame to a PNG file.
    Render(RenderArgs),
    /// Drive a program from the refresh clock for a fixed number of frames.
    Animate(AnimateArgs),
    /// Print a program's uniform contract as JSON.
    Inspect(ProgramArgs),
    /// Render every surface described by a scene file.
    Scene(SceneArgs),
    /// List the built-in preset names.
    Presets,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ProgramArgs {
    /// Built-in program to render (see `bandshade presets`).
    #[arg(long, value_name = "NAME", value_parser = parse_preset)]
    pub preset: Option<Preset>,

    /// Path to a shader source file.
    #[arg(long, value_name = "FILE")]
    pub shader: Option<PathBuf>,
}

impl ProgramArgs {
    pub fn source(&self) -> ProgramSource {
        match (&self.preset, &self.shader) {
            (_, Some(path)) => ProgramSource::File(path.clone()),
            (Some(preset), None) => ProgramSource::Preset(preset.name().to_string()),
            // clap's argument group guarantees one of the two.
            (None, None) => ProgramSource::Preset(Preset::Solid.name().to_string()),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SurfaceArgs {
    #[command(flatten)]
    pub program: ProgramArgs,

    /// Surface size in pixels.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, default_value = "640x360")]
    pub size: Size,

    /// Value for the program's `iColor` uniform (`RRGGBB` or `RRGGBBAA`).
    #[arg(long, value_name = "RRGGBB[AA]", value_parser = parse_color)]
    pub color: Option<[f32; 4]>,

    /// Extra uniform assignment; repeatable (`iDuration=2`, `offset=0.5,0.5`, `tint=#ff8800`).
    #[arg(long = "uniform", value_name = "NAME=VALUE", value_parser = parse_uniform_assignment)]
    pub uniforms: Vec<(String, UniformSetting)>,

    /// Preset to bind to one of the program's `uniform shader` slots.
    #[arg(long, value_name = "NAME", value_parser = parse_preset)]
    pub chain: Option<Preset>,

    /// Shader uniform receiving `--chain`.
    #[arg(long, value_name = "UNIFORM", default_value = "composable")]
    pub chain_uniform: String,

    /// Keep the chained program's time and resolution in step with the surface.
    #[arg(long)]
    pub chain_sync: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub surface: SurfaceArgs,

    /// Timestamp to evaluate, in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0, value_parser = parse_seconds)]
    pub time: f32,

    /// Output PNG path.
    #[arg(long, value_name = "FILE.png")]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct AnimateArgs {
    #[command(flatten)]
    pub surface: SurfaceArgs,

    /// Refresh rate of the frame clock.
    #[arg(long, value_name = "FPS", default_value_t = 30.0, value_parser = parse_fps)]
    pub fps: f32,

    /// Number of frames to render.
    #[arg(long, value_name = "N", conflicts_with = "duration")]
    pub frames: Option<u64>,

    /// Length of the animation (`5s`, `1m 30s`); defaults to one second.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Directory receiving numbered PNG frames; frames are discarded when omitted.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SceneArgs {
    /// Scene configuration (TOML).
    #[arg(value_name = "FILE.toml")]
    pub file: PathBuf,

    /// Override the frame count of every animated surface.
    #[arg(long, value_name = "N")]
    pub frames: Option<u64>,

    /// Render only the named surface.
    #[arg(long, value_name = "NAME")]
    pub surface: Option<String>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_preset(value: &str) -> Result<Preset, String> {
    value.trim().to_ascii_lowercase().parse()
}

pub fn parse_size(value: &str) -> Result<Size, String> {
    sceneconfig::parse_size(value)
}

pub fn parse_color(value: &str) -> Result<[f32; 4], String> {
    parse_hex_color(value)
}

pub fn parse_seconds(value: &str) -> Result<f32, String> {
    let seconds: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid time '{value}'; expected seconds"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("time must be a non-negative number of seconds, got {value}"));
    }
    Ok(seconds)
}

pub fn parse_fps(value: &str) -> Result<f32, String> {
    let fps: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid fps '{value}'"))?;
    if !fps.is_finite() || fps <= 0.0 {
        return Err("fps must be greater than zero".into());
    }
    Ok(fps)
}

pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if let Ok(seconds) = trimmed.parse::<f64>() {
        if seconds.is_finite() && seconds > 0.0 {
            return Ok(Duration::from_secs_f64(seconds));
        }
        return Err("duration must be greater than zero".into());
    }
    let duration = humantime::parse_duration(trimmed)
        .map_err(|err| format!("invalid duration '{trimmed}': {err}"))?;
    if duration.is_zero() {
        return Err("duration must be greater than zero".into());
    }
    Ok(duration)
}

/// Parses `NAME=VALUE`, where VALUE is a number, `x,y`, `r,g,b,a` or a hex color.
pub fn parse_uniform_assignment(value: &str) -> Result<(String, UniformSetting), String> {
    let (name, raw) = value
        .split_once('=')
        .ok_or_else(|| format!("invalid uniform '{value}'; expected NAME=VALUE"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid uniform '{value}'; name must not be empty"));
    }
    let raw = raw.trim();
    if raw.starts_with('#') {
        return parse_hex_color(raw).map(|rgba| (name.to_string(), UniformSetting::Color(rgba)));
    }

    let parts = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|_| format!("invalid number '{}' in uniform '{name}'", part.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let setting = match parts.as_slice() {
        [value] => UniformSetting::Scalar(*value),
        [x, y] => UniformSetting::Vector2([*x, *y]),
        [r, g, b, a] => UniformSetting::Color([*r, *g, *b, *a]),
        other => {
            return Err(format!(
                "uniform '{name}' needs 1, 2 or 4 components, found {}",
                other.len()
            ))
        }
    };
    Ok((name.to_string(), setting))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uniform_assignments() {
        assert_eq!(
            parse_uniform_assignment("iDuration=2.5").unwrap(),
            ("iDuration".to_string(), UniformSetting::Scalar(2.5))
        );
        assert_eq!(
            parse_uniform_assignment("offset = 0.5, 0.25").unwrap(),
            ("offset".to_string(), UniformSetting::Vector2([0.5, 0.25]))
        );
        assert_eq!(
            parse_uniform_assignment("tint=#ff000080").unwrap(),
            (
                "tint".to_string(),
                UniformSetting::Color([1.0, 0.0, 0.0, 128.0 / 255.0])
            )
        );
        assert!(parse_uniform_assignment("tint").is_err());
        assert!(parse_uniform_assignment("=1").is_err());
        assert!(parse_uniform_assignment("v=1,2,3").is_err());
        assert!(parse_uniform_assignment("v=abc").is_err());
    }

    #[test]
    fn parses_durations_in_seconds_or_humantime() {
        assert_eq!(parse_duration("1.5").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1m 30s").unwrap(), Duration::from_secs(90));
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(parse_fps("0").is_err());
        assert!(parse_fps("-3").is_err());
        assert_eq!(parse_fps("60").unwrap(), 60.0);
        assert!(parse_seconds("-1").is_err());
        assert_eq!(parse_seconds("0.25").unwrap(), 0.25);
    }

    #[test]
    fn preset_names_are_case_insensitive() {
        assert_eq!(parse_preset("Wave-Bands").unwrap(), Preset::WaveBands);
        assert!(parse_preset("plasma").is_err());
    }

    #[test]
    fn render_requires_exactly_one_program_source() {
        let cli = Cli::try_parse_from([
            "bandshade", "render", "--preset", "gradient", "--size", "4x2", "--out", "a.png",
        ])
        .unwrap();
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(
            args.surface.program.source(),
            ProgramSource::Preset("gradient".into())
        );
        assert_eq!(args.surface.size, Size { width: 4, height: 2 });

        assert!(Cli::try_parse_from(["bandshade", "render", "--out", "a.png"]).is_err());
        assert!(Cli::try_parse_from([
            "bandshade", "render", "--preset", "solid", "--shader", "x.sksl", "--out", "a.png",
        ])
        .is_err());
    }

    #[test]
    fn oversized_surfaces_are_rejected_before_rendering() {
        let err = Cli::try_parse_from([
            "bandshade", "render", "--preset", "solid", "--size", "65535x65535", "--out", "a.png",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn animate_rejects_frames_with_duration() {
        assert!(Cli::try_parse_from([
            "bandshade", "animate", "--preset", "bounce", "--frames", "3", "--duration", "1s",
        ])
        .is_err());
    }
}
