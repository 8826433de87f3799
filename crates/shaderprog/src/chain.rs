use std::sync::Arc;

use crate::error::ShaderError;
use crate::program::{ProgramId, ShaderProgram};
use crate::types::Rgba;
use crate::uniforms::{UniformStore, UniformValue};

/// A program paired with its own uniform values, ready to be sampled from
/// another program through a `uniform shader` declaration.
#[derive(Debug, Clone)]
pub struct ShaderInstance {
    program: Arc<ShaderProgram>,
    uniforms: UniformStore,
}

impl ShaderInstance {
    /// Wraps a program with a fresh store holding default values.
    pub fn new(program: Arc<ShaderProgram>) -> Self {
        let uniforms = UniformStore::new(&program);
        Self { program, uniforms }
    }

    /// Pairs a program with an existing store, rejecting a store built for
    /// a different program.
    pub fn with_uniforms(program: Arc<ShaderProgram>, uniforms: UniformStore) -> Result<Self, ShaderError> {
        if uniforms.program_id() != program.id() {
            return Err(ShaderError::StoreMismatch {
                expected: program.id(),
                actual: uniforms.program_id(),
            });
        }
        Ok(Self { program, uniforms })
    }

    pub fn program(&self) -> &Arc<ShaderProgram> {
        &self.program
    }

    pub fn uniforms(&self) -> &UniformStore {
        &self.uniforms
    }

    pub fn uniforms_mut(&mut self) -> &mut UniformStore {
        &mut self.uniforms
    }

    /// Convenience for `uniforms_mut().set(..)`.
    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<(), ShaderError> {
        self.uniforms.set(name, value)
    }

    /// Samples the instance as `uniform.eval(coord)` would.
    pub fn evaluate(&self, coord: [f32; 2], resolution: [f32; 2]) -> Rgba {
        self.program.evaluate(coord, resolution, &self.uniforms)
    }

    /// True when this instance is, or transitively samples, program `id`.
    pub(crate) fn references(&self, id: ProgramId) -> bool {
        self.program.id() == id
            || self
                .uniforms
                .children()
                .any(|(_, child)| child.references(id))
    }

    /// Sets `name` to `value` on this instance and every chained instance
    /// that declares it with the same type. Returns how many stores took
    /// the value.
    pub fn propagate(&mut self, name: &str, value: &UniformValue) -> usize {
        let mut applied = 0;
        if accepts(&self.uniforms, name, value) && self.uniforms.set(name, value.clone()).is_ok() {
            applied += 1;
        }
        for child in self.uniforms.children_mut() {
            applied += child.propagate(name, value);
        }
        applied
    }
}

impl PartialEq for ShaderInstance {
    fn eq(&self, other: &Self) -> bool {
        self.program.id() == other.program.id() && self.uniforms == other.uniforms
    }
}

/// True when `store` declares `name` with the tag carried by `value`.
pub(crate) fn accepts(store: &UniformStore, name: &str, value: &UniformValue) -> bool {
    store
        .declarations()
        .iter()
        .any(|decl| decl.name == name && decl.ty == value.uniform_type())
}
