use crate::program::ProgramId;
use crate::types::UniformType;

/// Position of a token in shader source, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub(crate) fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Shader source failed to lex, parse, or type-check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{line}:{column}: {message}")]
pub struct CompileError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl CompileError {
    pub(crate) fn at(pos: Pos, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: pos.line,
            column: pos.column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShaderError {
    #[error("shader failed to compile: {0}")]
    Compile(#[from] CompileError),
    #[error("uniform '{name}' is not declared by the program")]
    UnknownUniform { name: String },
    #[error("uniform '{name}' is declared as {expected} but was given a {actual} value")]
    UniformTypeMismatch {
        name: String,
        expected: UniformType,
        actual: UniformType,
    },
    #[error("shader reference would make program {program_id} reference itself")]
    CyclicShaderReference { program_id: ProgramId },
    #[error("uniform store belongs to program {actual}, not {expected}")]
    StoreMismatch {
        expected: ProgramId,
        actual: ProgramId,
    },
}

pub(crate) type CompileResult<T> = Result<T, CompileError>;
