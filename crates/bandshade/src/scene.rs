use anyhow::{bail, Context, Result};
use renderer::RenderPolicy;
use sceneconfig::{ResolvedSurface, SceneConfig, SurfaceMode};

use crate::cli::SceneArgs;
use crate::program::{ChainSpec, SurfaceSpec};
use crate::run::{render_animation, render_still};

pub fn run_scene(args: SceneArgs) -> Result<()> {
    let config = SceneConfig::load(&args.file)
        .with_context(|| format!("failed to load scene {}", args.file.display()))?;
    let mut surfaces = config.resolved_surfaces()?;
    if let Some(name) = &args.surface {
        surfaces.retain(|surface| &surface.name == name);
        if surfaces.is_empty() {
            bail!("scene {} has no surface named '{name}'", args.file.display());
        }
    }
    tracing::info!(
        scene = %args.file.display(),
        surfaces = surfaces.len(),
        "rendering scene"
    );

    for surface in surfaces {
        let name = surface.name.clone();
        render_surface(surface, args.frames)
            .with_context(|| format!("surface '{name}' failed"))?;
    }
    Ok(())
}

fn render_surface(surface: ResolvedSurface, frames_override: Option<u64>) -> Result<()> {
    let binding = surface_spec(&surface).build()?;
    match surface.mode {
        SurfaceMode::Still => {
            render_still(binding, surface.time, surface.output.clone())?;
            tracing::info!(
                surface = %surface.name,
                path = %surface.output.display(),
                "rendered still"
            );
        }
        SurfaceMode::Animate => {
            let policy = RenderPolicy::Animate {
                fps: surface.fps,
                frames: frames_override.unwrap_or(surface.frames),
            };
            let report = render_animation(binding, &policy, Some(surface.output.clone()))?;
            tracing::info!(
                surface = %surface.name,
                dir = %surface.output.display(),
                frames = report.frames,
                wall_ms = report.wall_time.as_millis() as u64,
                "rendered animation"
            );
        }
    }
    Ok(())
}

fn surface_spec(surface: &ResolvedSurface) -> SurfaceSpec {
    SurfaceSpec {
        source: surface.source.clone(),
        size: surface.size,
        color: None,
        uniforms: surface
            .uniforms
            .iter()
            .map(|(name, setting)| (name.clone(), *setting))
            .collect(),
        chain: surface.chain.as_ref().map(|chain| ChainSpec {
            uniform: chain.uniform.clone(),
            source: chain.source.clone(),
            uniforms: chain
                .uniforms
                .iter()
                .map(|(name, setting)| (name.clone(), *setting))
                .collect(),
            sync: chain.sync,
        }),
    }
}
