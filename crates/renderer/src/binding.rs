use std::sync::Arc;

use rayon::prelude::*;
use shaderprog::{
    compile, Rgba, ShaderError, ShaderProgram, UniformStore, UniformType, UniformValue,
};
use tracing::{debug, trace, warn};

use crate::types::{PixelBuffer, RenderFrame, SurfaceSize};

/// Names of the uniforms a binding drives on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceUniforms {
    /// Scalar receiving elapsed seconds.
    pub time: String,
    /// Vector2 receiving the surface size in pixels.
    pub resolution: String,
}

impl Default for SurfaceUniforms {
    fn default() -> Self {
        Self {
            time: "iTime".into(),
            resolution: "iResolution".into(),
        }
    }
}

/// A program painted onto one rectangular surface.
///
/// The binding owns the program's uniform store and keeps the time and
/// resolution uniforms current: resolution before the first frame and after
/// every resize, time at the start of every frame.
#[derive(Debug)]
pub struct ShaderBinding {
    program: Arc<ShaderProgram>,
    uniforms: UniformStore,
    names: SurfaceUniforms,
    drives_time: bool,
    drives_resolution: bool,
    size: SurfaceSize,
    last_time: f32,
    chain_sync: bool,
}

impl ShaderBinding {
    /// Compiles `source` and binds it to a `width` x `height` surface.
    pub fn new(source: &str, width: u32, height: u32) -> Result<Self, ShaderError> {
        let program = compile(source)?;
        Ok(Self::from_program(program, width, height))
    }

    pub fn from_program(program: Arc<ShaderProgram>, width: u32, height: u32) -> Self {
        Self::with_uniform_names(program, width, height, SurfaceUniforms::default())
    }

    pub fn with_uniform_names(
        program: Arc<ShaderProgram>,
        width: u32,
        height: u32,
        names: SurfaceUniforms,
    ) -> Self {
        let uniforms = UniformStore::new(&program);
        let drives_time = drives(&program, &names.time, UniformType::Scalar);
        let drives_resolution = drives(&program, &names.resolution, UniformType::Vector2);
        let mut binding = Self {
            program,
            uniforms,
            names,
            drives_time,
            drives_resolution,
            size: SurfaceSize::new(width, height),
            last_time: 0.0,
            chain_sync: false,
        };
        binding.push_resolution();
        debug!(
            program = %binding.program.id(),
            size = %binding.size,
            drives_time,
            drives_resolution,
            "shader binding created"
        );
        binding
    }

    pub fn program(&self) -> &Arc<ShaderProgram> {
        &self.program
    }

    pub fn uniforms(&self) -> &UniformStore {
        &self.uniforms
    }

    /// Store access for uniforms the binding does not drive itself.
    pub fn uniforms_mut(&mut self) -> &mut UniformStore {
        &mut self.uniforms
    }

    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), ShaderError> {
        self.uniforms.set(name, value)?;
        // A freshly attached chain needs the current size before its first frame.
        if self.chain_sync {
            self.sync_children();
        }
        Ok(())
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Largest time value pushed so far.
    pub fn last_time(&self) -> f32 {
        self.last_time
    }

    /// When enabled, time and resolution are also pushed into chained
    /// shaders that declare the same uniforms.
    pub fn set_chain_sync(&mut self, enabled: bool) {
        self.chain_sync = enabled;
        if enabled {
            self.sync_children();
        }
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.size = SurfaceSize::new(width, height);
        self.push_resolution();
        trace!(size = %self.size, "surface resized");
    }

    /// Advances the time uniform to `elapsed` seconds and paints the surface.
    ///
    /// Time never moves backwards: an `elapsed` below the last value pushed
    /// is raised to it.
    pub fn on_frame(&mut self, elapsed: f32) -> PixelBuffer {
        self.render_frame(elapsed).1
    }

    /// Same as [`ShaderBinding::on_frame`], also returning the frame record.
    pub fn render_frame(&mut self, elapsed: f32) -> (RenderFrame, PixelBuffer) {
        let time = elapsed.max(self.last_time);
        self.last_time = time;
        if self.drives_time {
            let value = UniformValue::Scalar(time);
            if let Err(err) = self.uniforms.set(&self.names.time, value) {
                warn!(error = %err, "failed to update time uniform");
            }
        }
        // Children may have been attached through `uniforms_mut` since the last frame.
        if self.chain_sync {
            self.sync_children();
        }

        let pixels = self.paint();
        let frame = RenderFrame {
            timestamp: time,
            surface_width: self.size.width,
            surface_height: self.size.height,
        };
        trace!(time, size = %self.size, "frame rendered");
        (frame, pixels)
    }

    fn paint(&self) -> PixelBuffer {
        if self.size.is_empty() {
            return PixelBuffer::from_pixels(self.size, Vec::new());
        }
        let width = self.size.width as usize;
        let resolution = self.size.as_resolution();
        let program = &self.program;
        let uniforms = &self.uniforms;

        let mut pixels = vec![Rgba::TRANSPARENT; self.size.pixel_count()];
        pixels
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, pixel) in row.iter_mut().enumerate() {
                    *pixel = program.evaluate([x as f32, y as f32], resolution, uniforms);
                }
            });
        PixelBuffer::from_pixels(self.size, pixels)
    }

    fn push_resolution(&mut self) {
        if self.drives_resolution {
            let [width, height] = self.size.as_resolution();
            if let Err(err) = self.uniforms.set_vector2(&self.names.resolution, width, height) {
                warn!(error = %err, "failed to update resolution uniform");
            }
        }
        if self.chain_sync {
            self.sync_children();
        }
    }

    fn sync_children(&mut self) {
        let resolution = self.size.as_resolution();
        self.uniforms.propagate_to_children(
            &self.names.resolution,
            &UniformValue::Vector2(resolution),
        );
        self.uniforms
            .propagate_to_children(&self.names.time, &UniformValue::Scalar(self.last_time));
    }
}

/// True when the program declares `name` with the type the binding writes.
fn drives(program: &ShaderProgram, name: &str, expected: UniformType) -> bool {
    match program.uniform(name) {
        Some(decl) if decl.ty == expected => true,
        Some(decl) => {
            warn!(
                uniform = name,
                declared = %decl.ty,
                expected = %expected,
                "uniform has an unexpected type and will not be driven"
            );
            false
        }
        None => false,
    }
}
