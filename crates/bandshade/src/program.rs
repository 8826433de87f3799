use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use renderer::{Preset, ShaderBinding};
use sceneconfig::{ProgramSource, Size, UniformSetting};
use shaderprog::{ShaderInstance, ShaderProgram, UniformStore, UniformValue};

const COLOR_UNIFORM: &str = "iColor";

/// A compiled program and the preset it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedProgram {
    pub program: Arc<ShaderProgram>,
    pub preset: Option<Preset>,
    pub label: String,
}

impl LoadedProgram {
    pub fn load(source: &ProgramSource) -> Result<Self> {
        match source {
            ProgramSource::Preset(name) => {
                let preset: Preset = name.parse().map_err(anyhow::Error::msg)?;
                let program = preset
                    .compile()
                    .with_context(|| format!("failed to compile preset '{preset}'"))?;
                Ok(Self {
                    program,
                    preset: Some(preset),
                    label: preset.name().to_string(),
                })
            }
            ProgramSource::File(path) => load_file(path),
        }
    }

    /// Seeds `store` with the preset's defaults, then `color` when the
    /// program has an `iColor` uniform, then `settings`.
    fn configure<'a>(
        &self,
        store: &mut UniformStore,
        color: Option<[f32; 4]>,
        settings: impl IntoIterator<Item = (&'a str, UniformSetting)>,
    ) -> Result<()> {
        if let Some(preset) = self.preset {
            preset
                .apply_defaults(store)
                .with_context(|| format!("failed to apply defaults of preset '{preset}'"))?;
        }
        if let Some([r, g, b, a]) = color {
            if store.is_declared(COLOR_UNIFORM) {
                store
                    .set(COLOR_UNIFORM, UniformValue::color(r, g, b, a))
                    .with_context(|| format!("cannot set {COLOR_UNIFORM} on {}", self.label))?;
            } else {
                tracing::warn!(program = %self.label, "program has no {COLOR_UNIFORM} uniform; ignoring color");
            }
        }
        for (name, setting) in settings {
            store
                .set(name, uniform_value(setting))
                .with_context(|| format!("cannot set uniform '{name}' on {}", self.label))?;
        }
        Ok(())
    }
}

fn load_file(path: &Path) -> Result<LoadedProgram> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read shader {}", path.display()))?;
    let program = shaderprog::compile(&source)
        .with_context(|| format!("failed to compile {}", path.display()))?;
    tracing::debug!(path = %path.display(), uniforms = program.uniforms().len(), "loaded shader file");
    Ok(LoadedProgram {
        program,
        preset: None,
        label: path.display().to_string(),
    })
}

pub fn uniform_value(setting: UniformSetting) -> UniformValue {
    match setting {
        UniformSetting::Scalar(value) => UniformValue::Scalar(value),
        UniformSetting::Vector2(value) => UniformValue::Vector2(value),
        UniformSetting::Color([r, g, b, a]) => UniformValue::color(r, g, b, a),
    }
}

/// Program bound to a uniform shader slot of the surface program.
#[derive(Debug, Clone)]
pub struct ChainSpec {
    pub uniform: String,
    pub source: ProgramSource,
    pub uniforms: Vec<(String, UniformSetting)>,
    pub sync: bool,
}

/// Everything needed to build a [`ShaderBinding`], whichever front end described it.
#[derive(Debug, Clone)]
pub struct SurfaceSpec {
    pub source: ProgramSource,
    pub size: Size,
    /// Base color, applied only if the program declares `iColor`.
    pub color: Option<[f32; 4]>,
    pub uniforms: Vec<(String, UniformSetting)>,
    pub chain: Option<ChainSpec>,
}

impl SurfaceSpec {
    pub fn build(&self) -> Result<ShaderBinding> {
        let loaded = LoadedProgram::load(&self.source)?;
        let mut binding = ShaderBinding::from_program(
            Arc::clone(&loaded.program),
            self.size.width,
            self.size.height,
        );
        loaded.configure(
            binding.uniforms_mut(),
            self.color,
            self.uniforms.iter().map(|(name, setting)| (name.as_str(), *setting)),
        )?;

        if let Some(chain) = &self.chain {
            let child = LoadedProgram::load(&chain.source)?;
            let mut instance = ShaderInstance::new(Arc::clone(&child.program));
            child.configure(
                instance.uniforms_mut(),
                None,
                chain.uniforms.iter().map(|(name, setting)| (name.as_str(), *setting)),
            )?;
            binding.set_chain_sync(chain.sync);
            binding
                .set_uniform(&chain.uniform, UniformValue::Shader(Some(instance)))
                .with_context(|| {
                    format!(
                        "cannot chain {} into '{}' of {}",
                        child.label, chain.uniform, loaded.label
                    )
                })?;
            tracing::debug!(
                program = %loaded.label,
                child = %child.label,
                uniform = %chain.uniform,
                sync = chain.sync,
                "chained shader"
            );
        }
        Ok(binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shaderprog::Rgba;

    fn surface_of(preset: &str) -> SurfaceSpec {
        SurfaceSpec {
            source: ProgramSource::Preset(preset.into()),
            size: Size { width: 2, height: 2 },
            color: None,
            uniforms: Vec::new(),
            chain: None,
        }
    }

    #[test]
    fn presets_start_from_their_defaults() {
        let mut binding = surface_of("uniform-color").build().unwrap();
        assert_eq!(binding.on_frame(0.0).get(1, 1), Some(Rgba::MAGENTA));
    }

    #[test]
    fn settings_override_defaults() {
        let mut surface = surface_of("uniform-color");
        surface
            .uniforms
            .push(("iColor".into(), UniformSetting::Color([0.0, 1.0, 0.0, 1.0])));
        let mut binding = surface.build().unwrap();
        assert_eq!(
            binding.on_frame(0.0).get(0, 0),
            Some(Rgba::new(0.0, 1.0, 0.0, 1.0))
        );
    }

    #[test]
    fn color_is_skipped_for_programs_without_a_base_color() {
        let mut surface = surface_of("gradient");
        surface.color = Some([0.0, 0.0, 1.0, 1.0]);
        assert!(surface.build().is_ok());

        let mut surface = surface_of("wave-bands");
        surface.color = Some([1.0, 1.0, 1.0, 1.0]);
        let mut binding = surface.build().unwrap();
        // A white base leaves no complement for the bands to add.
        assert_eq!(binding.on_frame(0.0).get(0, 0), Some(Rgba::new(1.0, 1.0, 1.0, 1.0)));
    }

    #[test]
    fn unknown_uniforms_are_reported_with_context() {
        let mut surface = surface_of("solid");
        surface
            .uniforms
            .push(("iColor".into(), UniformSetting::Scalar(1.0)));
        let err = surface.build().unwrap_err();
        assert!(format!("{err:#}").contains("iColor"));
    }

    #[test]
    fn chained_alpha_reaches_the_surface() {
        let mut surface = surface_of("bounce-masked");
        surface.chain = Some(ChainSpec {
            uniform: "composable".into(),
            source: ProgramSource::Preset("uniform-color".into()),
            uniforms: vec![("iColor".into(), UniformSetting::Color([1.0, 1.0, 1.0, 0.5]))],
            sync: false,
        });
        let mut binding = surface.build().unwrap();
        let pixels = binding.on_frame(0.0);
        assert!(pixels.pixels().iter().all(|pixel| pixel.a == 0.5));
    }

    #[test]
    fn unknown_presets_fail_to_load() {
        let err = LoadedProgram::load(&ProgramSource::Preset("plasma".into())).unwrap_err();
        assert!(err.to_string().contains("unknown preset"));
    }
}
