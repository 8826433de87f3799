use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::check::check;
use crate::error::CompileError;
use crate::eval::Interpreter;
use crate::ir;
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::types::{Rgba, UniformType};
use crate::uniforms::UniformStore;

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a compiled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProgramId(u64);

impl ProgramId {
    fn next() -> Self {
        ProgramId(NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One `uniform` declaration of a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniformDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: UniformType,
    /// Declared with `layout(color)`.
    pub color_managed: bool,
}

/// Compiled, immutable shader program.
///
/// Programs are shared behind `Arc` so that a shader-reference uniform can
/// point at the same program a surface binding renders.
pub struct ShaderProgram {
    id: ProgramId,
    uniforms: Arc<[UniformDecl]>,
    module: ir::Module,
}

impl ShaderProgram {
    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Declared uniforms in source order.
    pub fn uniforms(&self) -> &[UniformDecl] {
        &self.uniforms
    }

    pub(crate) fn declarations(&self) -> Arc<[UniformDecl]> {
        Arc::clone(&self.uniforms)
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformDecl> {
        self.uniforms.iter().find(|decl| decl.name == name)
    }

    /// Evaluates the entry point for one coordinate.
    ///
    /// The result depends only on the arguments. `resolution` is the size of
    /// the surface being painted and is forwarded unchanged to chained
    /// shaders; the program itself reads sizes through its own uniforms.
    /// A store bound to another program contributes nothing: every uniform
    /// then reads as its default.
    pub fn evaluate(&self, coord: [f32; 2], resolution: [f32; 2], uniforms: &UniformStore) -> Rgba {
        Interpreter::new(&self.module, self.id, uniforms, resolution).run(coord)
    }
}

impl fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("id", &self.id)
            .field("uniforms", &self.uniforms)
            .field("functions", &self.module.functions.len())
            .finish()
    }
}

/// Compiles shader source text into an evaluable program.
pub fn compile(source: &str) -> Result<Arc<ShaderProgram>, CompileError> {
    let tokens = tokenize(source)?;
    let module = parse(tokens)?;
    let checked = check(module)?;
    let program = ShaderProgram {
        id: ProgramId::next(),
        uniforms: checked.uniforms.into(),
        module: checked.module,
    };
    tracing::debug!(
        program = %program.id,
        uniforms = program.uniforms.len(),
        functions = program.module.functions.len(),
        entry = %program.module.functions[program.module.entry].name,
        "compiled shader program"
    );
    Ok(Arc::new(program))
}
