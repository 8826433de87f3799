use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceMode {
    #[default]
    Still,
    Animate,
}

/// Width and height in pixels, written `"WxH"` in scene files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl Serialize for Size {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_size(&raw).map_err(de::Error::custom)
    }
}

/// Largest accepted width or height.
pub const MAX_DIMENSION: u32 = 16_384;
/// Largest accepted `width * height`.
pub const MAX_PIXELS: u64 = 8192 * 8192;

/// Parses `"640x360"` (also accepting `X` or `*`) into a non-empty size no
/// larger than [`MAX_DIMENSION`] per side and [`MAX_PIXELS`] in total.
pub fn parse_size(raw: &str) -> Result<Size, String> {
    let trimmed = raw.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '*'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|err| format!("invalid size '{trimmed}': {err}"))
    };
    let size = Size {
        width: parse(width)?,
        height: parse(height)?,
    };
    if size.width == 0 || size.height == 0 {
        return Err(format!("size '{trimmed}' must be at least 1x1"));
    }
    if size.width > MAX_DIMENSION || size.height > MAX_DIMENSION {
        return Err(format!(
            "size '{trimmed}' exceeds {MAX_DIMENSION} pixels on a side"
        ));
    }
    if u64::from(size.width) * u64::from(size.height) > MAX_PIXELS {
        return Err(format!("size '{trimmed}' exceeds {MAX_PIXELS} pixels"));
    }
    Ok(size)
}

/// Parses `#RRGGBB` or `#RRGGBBAA` (leading `#` optional) into RGBA in `[0, 1]`.
pub fn parse_hex_color(raw: &str) -> Result<[f32; 4], String> {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(format!(
            "invalid color '{trimmed}'; expected #RRGGBB or #RRGGBBAA"
        ));
    }
    let channel = |index: usize| {
        hex.get(index * 2..index * 2 + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .map(|value| f32::from(value) / 255.0)
    };
    let mut rgba = [1.0; 4];
    for (index, slot) in rgba.iter_mut().enumerate().take(hex.len() / 2) {
        *slot = channel(index).ok_or_else(|| format!("invalid color '{trimmed}'"))?;
    }
    Ok(rgba)
}

/// A uniform value as written in a scene file.
///
/// Numbers become scalars, two-element arrays vector2 values, and
/// four-element arrays or hex strings colors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformSetting {
    Scalar(f32),
    Vector2([f32; 2]),
    Color([f32; 4]),
}

impl<'de> Deserialize<'de> for UniformSetting {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Num(f64),
            List(Vec<f64>),
            Str(String),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Num(value) => Ok(UniformSetting::Scalar(value as f32)),
            Helper::List(values) => match values.as_slice() {
                [x, y] => Ok(UniformSetting::Vector2([*x as f32, *y as f32])),
                [r, g, b, a] => Ok(UniformSetting::Color([
                    *r as f32, *g as f32, *b as f32, *a as f32,
                ])),
                other => Err(de::Error::custom(format!(
                    "uniform arrays need 2 (vector) or 4 (color) elements, found {}",
                    other.len()
                ))),
            },
            Helper::Str(raw) => parse_hex_color(&raw)
                .map(UniformSetting::Color)
                .map_err(de::Error::custom),
        }
    }
}

impl Serialize for UniformSetting {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            UniformSetting::Scalar(value) => serializer.serialize_f32(*value),
            UniformSetting::Vector2(values) => values.serialize(serializer),
            UniformSetting::Color(values) => values.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneConfig {
    pub version: u32,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub surfaces: Vec<Surface>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Defaults {
    pub size: Option<Size>,
    pub fps: Option<f32>,
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Surface {
    pub name: String,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub shader: Option<PathBuf>,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub mode: SurfaceMode,
    /// Timestamp for still frames.
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<Duration>,
    #[serde(default)]
    pub fps: Option<f32>,
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<Duration>,
    #[serde(default)]
    pub frames: Option<u64>,
    /// PNG path for stills, directory of numbered frames for animations.
    pub output: PathBuf,
    #[serde(default)]
    pub uniforms: BTreeMap<String, UniformSetting>,
    #[serde(default)]
    pub chain: Option<Chain>,
}

/// A second program bound to one of the surface's `uniform shader` slots.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chain {
    pub uniform: String,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub shader: Option<PathBuf>,
    /// Also push the surface's time and resolution into the chained program.
    #[serde(default = "default_sync")]
    pub sync: bool,
    #[serde(default)]
    pub uniforms: BTreeMap<String, UniformSetting>,
}

/// Where a program's source comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramSource {
    Preset(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChain {
    pub uniform: String,
    pub source: ProgramSource,
    pub sync: bool,
    pub uniforms: BTreeMap<String, UniformSetting>,
}

/// A surface with defaults applied and frame count settled.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSurface {
    pub name: String,
    pub source: ProgramSource,
    pub size: Size,
    pub mode: SurfaceMode,
    /// Still timestamp in seconds.
    pub time: f32,
    pub fps: f32,
    /// Frames to render; always 1 for stills.
    pub frames: u64,
    pub output: PathBuf,
    pub uniforms: BTreeMap<String, UniformSetting>,
    pub chain: Option<ResolvedChain>,
}

const DEFAULT_FPS: f32 = 30.0;

fn default_sync() -> bool {
    true
}

fn default_duration() -> Duration {
    Duration::from_secs(1)
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be a finite, non-negative number"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl SceneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SceneConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates a scene file. Relative shader and output paths
    /// are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&input)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        let join = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        for surface in &mut self.surfaces {
            join(&mut surface.output);
            if let Some(shader) = surface.shader.as_mut() {
                join(shader);
            }
            if let Some(shader) = surface.chain.as_mut().and_then(|chain| chain.shader.as_mut()) {
                join(shader);
            }
        }
    }

    pub fn surface(&self, name: &str) -> Option<&Surface> {
        self.surfaces.iter().find(|surface| surface.name == name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.surfaces.is_empty() {
            return Err(ConfigError::Invalid(
                "config must define at least one surface".into(),
            ));
        }

        if let Some(fps) = self.defaults.fps {
            validate_fps(fps, "defaults.fps")?;
        }
        if self.defaults.duration.is_some_and(|duration| duration.is_zero()) {
            return Err(ConfigError::Invalid(
                "defaults.duration must be greater than zero".into(),
            ));
        }

        for (index, surface) in self.surfaces.iter().enumerate() {
            let name = surface.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "surface #{} has an empty name",
                    index + 1
                )));
            }
            if self.surfaces[..index].iter().any(|other| other.name == surface.name) {
                return Err(ConfigError::Invalid(format!(
                    "surface '{name}' is defined more than once"
                )));
            }

            program_source(&surface.preset, &surface.shader)
                .map_err(|message| ConfigError::Invalid(format!("surface '{name}' {message}")))?;

            if surface.size.or(self.defaults.size).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "surface '{name}' needs a size (or defaults.size)"
                )));
            }

            if let Some(fps) = surface.fps {
                validate_fps(fps, &format!("surface '{name}' fps"))?;
            }
            if surface.duration.is_some_and(|duration| duration.is_zero()) {
                return Err(ConfigError::Invalid(format!(
                    "surface '{name}' duration must be greater than zero"
                )));
            }
            if surface.frames == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "surface '{name}' frames must be greater than zero"
                )));
            }
            if surface.mode == SurfaceMode::Still
                && (surface.frames.is_some() || surface.duration.is_some())
            {
                return Err(ConfigError::Invalid(format!(
                    "surface '{name}' is a still; frames and duration need mode = \"animate\""
                )));
            }

            if surface.output.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "surface '{name}' output path may not be empty"
                )));
            }

            validate_uniform_names(&surface.uniforms, name)?;

            if let Some(chain) = &surface.chain {
                if chain.uniform.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "surface '{name}' chain needs the name of a shader uniform"
                    )));
                }
                program_source(&chain.preset, &chain.shader).map_err(|message| {
                    ConfigError::Invalid(format!("surface '{name}' chain {message}"))
                })?;
                validate_uniform_names(&chain.uniforms, name)?;
            }
        }

        Ok(())
    }

    /// Every surface with defaults applied, in file order.
    pub fn resolved_surfaces(&self) -> Result<Vec<ResolvedSurface>, ConfigError> {
        self.surfaces
            .iter()
            .map(|surface| surface.resolve(&self.defaults))
            .collect()
    }
}

impl Surface {
    pub fn resolve(&self, defaults: &Defaults) -> Result<ResolvedSurface, ConfigError> {
        let invalid = |message: &str| ConfigError::Invalid(format!("surface '{}' {message}", self.name));
        let source = program_source(&self.preset, &self.shader).map_err(|message| invalid(&message))?;
        let size = self
            .size
            .or(defaults.size)
            .ok_or_else(|| invalid("needs a size (or defaults.size)"))?;
        let fps = self.fps.or(defaults.fps).unwrap_or(DEFAULT_FPS);
        let frames = match self.mode {
            SurfaceMode::Still => 1,
            SurfaceMode::Animate => self.frames.unwrap_or_else(|| {
                let duration = self
                    .duration
                    .or(defaults.duration)
                    .unwrap_or_else(default_duration);
                (duration.as_secs_f64() * f64::from(fps)).ceil().max(1.0) as u64
            }),
        };
        let chain = match &self.chain {
            Some(chain) => Some(ResolvedChain {
                uniform: chain.uniform.clone(),
                source: program_source(&chain.preset, &chain.shader)
                    .map_err(|message| invalid(&format!("chain {message}")))?,
                sync: chain.sync,
                uniforms: chain.uniforms.clone(),
            }),
            None => None,
        };

        Ok(ResolvedSurface {
            name: self.name.clone(),
            source,
            size,
            mode: self.mode,
            time: self.time.map_or(0.0, |time| time.as_secs_f32()),
            fps,
            frames,
            output: self.output.clone(),
            uniforms: self.uniforms.clone(),
            chain,
        })
    }
}

fn program_source(preset: &Option<String>, shader: &Option<PathBuf>) -> Result<ProgramSource, String> {
    match (preset, shader) {
        (Some(preset), None) if !preset.trim().is_empty() => Ok(ProgramSource::Preset(preset.clone())),
        (None, Some(shader)) if !shader.as_os_str().is_empty() => Ok(ProgramSource::File(shader.clone())),
        (Some(_), Some(_)) => Err("sets both preset and shader; choose one".into()),
        _ => Err("needs a non-empty preset or shader".into()),
    }
}

fn validate_fps(fps: f32, what: &str) -> Result<(), ConfigError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(ConfigError::Invalid(format!("{what} must be > 0")));
    }
    Ok(())
}

fn validate_uniform_names(
    uniforms: &BTreeMap<String, UniformSetting>,
    surface: &str,
) -> Result<(), ConfigError> {
    if uniforms.keys().any(|name| name.trim().is_empty()) {
        return Err(ConfigError::Invalid(format!(
            "surface '{surface}' has a uniform with an empty name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1

[defaults]
size = "64x32"
fps = 24

[[surfaces]]
name = "banner"
preset = "wave-bands"
time = "1s 500ms"
output = "out/banner.png"

[surfaces.uniforms]
iColor = "#FFFF00"

[[surfaces]]
name = "masked"
preset = "bounce-masked"
size = "16x16"
mode = "animate"
duration = "2s"
output = "out/masked"

[surfaces.uniforms]
iDuration = 4.0
offset = [0.5, 0.25]

[surfaces.chain]
uniform = "composable"
preset = "uniform-color"

[surfaces.chain.uniforms]
iColor = [0.0, 0.0, 0.0, 0.5]
"##;

    #[test]
    fn parses_sample_config() {
        let config = SceneConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.surfaces.len(), 2);
        let banner = config.surface("banner").unwrap();
        assert_eq!(banner.time, Some(Duration::from_millis(1500)));
        assert_eq!(
            banner.uniforms.get("iColor"),
            Some(&UniformSetting::Color([1.0, 1.0, 0.0, 1.0]))
        );
        let masked = config.surface("masked").unwrap();
        assert_eq!(
            masked.uniforms.get("offset"),
            Some(&UniformSetting::Vector2([0.5, 0.25]))
        );
        assert_eq!(masked.uniforms.get("iDuration"), Some(&UniformSetting::Scalar(4.0)));
    }

    #[test]
    fn resolves_surfaces_with_defaults() {
        let config = SceneConfig::from_toml_str(SAMPLE).unwrap();
        let surfaces = config.resolved_surfaces().unwrap();

        let banner = &surfaces[0];
        assert_eq!(banner.source, ProgramSource::Preset("wave-bands".into()));
        assert_eq!(banner.size, Size { width: 64, height: 32 });
        assert_eq!(banner.frames, 1);
        assert_eq!(banner.time, 1.5);

        let masked = &surfaces[1];
        assert_eq!(masked.mode, SurfaceMode::Animate);
        assert_eq!(masked.fps, 24.0);
        assert_eq!(masked.frames, 48);
        let chain = masked.chain.as_ref().unwrap();
        assert_eq!(chain.uniform, "composable");
        assert_eq!(chain.source, ProgramSource::Preset("uniform-color".into()));
        assert!(chain.sync);
    }

    #[test]
    fn rejects_surface_with_both_sources() {
        let config = r#"
version = 1

[[surfaces]]
name = "both"
preset = "solid"
shader = "solid.sksl"
size = "4x4"
output = "both.png"
"#;
        let err = SceneConfig::from_toml_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("choose one")));
    }

    #[test]
    fn rejects_missing_size_and_duplicate_names() {
        let missing_size = r#"
version = 1

[[surfaces]]
name = "a"
preset = "solid"
output = "a.png"
"#;
        assert!(matches!(
            SceneConfig::from_toml_str(missing_size),
            Err(ConfigError::Invalid(_))
        ));

        let duplicate = r#"
version = 1

[defaults]
size = "4x4"

[[surfaces]]
name = "a"
preset = "solid"
output = "a.png"

[[surfaces]]
name = "a"
preset = "gradient"
output = "b.png"
"#;
        let err = SceneConfig::from_toml_str(duplicate).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_animation_settings_on_stills() {
        let config = r#"
version = 1

[[surfaces]]
name = "still"
preset = "solid"
size = "4x4"
frames = 3
output = "still.png"
"#;
        assert!(matches!(
            SceneConfig::from_toml_str(config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_bad_uniform_arrays_and_sizes() {
        let bad_array = r#"
version = 1

[[surfaces]]
name = "a"
preset = "solid"
size = "4x4"
output = "a.png"

[surfaces.uniforms]
tint = [1.0, 0.0, 0.0]
"#;
        assert!(matches!(
            SceneConfig::from_toml_str(bad_array),
            Err(ConfigError::Parse(_))
        ));

        let bad_size = r#"
version = 1

[[surfaces]]
name = "a"
preset = "solid"
size = "0x4"
output = "a.png"
"#;
        assert!(matches!(
            SceneConfig::from_toml_str(bad_size),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = SceneConfig::from_toml_str("version = 2\n").unwrap_err();
        assert!(err.to_string().contains("version 2"));
    }

    #[test]
    fn load_resolves_paths_relative_to_the_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scene.toml");
        std::fs::write(
            &path,
            "version = 1\n\n[[surfaces]]\nname = \"a\"\nshader = \"shaders/a.sksl\"\nsize = \"2x2\"\noutput = \"a.png\"\n",
        )
        .unwrap();
        let config = SceneConfig::load(&path).unwrap();
        let surface = &config.surfaces[0];
        assert_eq!(surface.output, dir.path().join("a.png"));
        assert_eq!(surface.shader.as_deref(), Some(dir.path().join("shaders/a.sksl").as_path()));
    }

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("320X200"), Ok(Size { width: 320, height: 200 }));
        assert!(parse_size("320").is_err());
    }

    #[test]
    fn rejects_oversized_surfaces() {
        assert!(parse_size("65535x65535").unwrap_err().contains("exceeds"));
        assert!(parse_size("16385x1").is_err());
        assert!(parse_size("16384x8192").is_err());
        assert_eq!(parse_size("16384x4096"), Ok(Size { width: 16_384, height: 4096 }));
        let err = SceneConfig::from_toml_str(
            "version = 1\n[[surfaces]]\nname = \"huge\"\npreset = \"solid\"\nsize = \"65535x65535\"\noutput = \"x.png\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn parses_colors() {
        assert_eq!(parse_hex_color("#ff00ff"), Ok([1.0, 0.0, 1.0, 1.0]));
        assert_eq!(parse_hex_color("00000000"), Ok([0.0; 4]));
        assert!(parse_hex_color("#fff").is_err());
    }
}
