//! Compiler and CPU evaluator for a small per-pixel shading language.
//!
//! Source text is compiled once with [`compile`] into an immutable
//! [`ShaderProgram`]. Callers keep the program's runtime inputs in a
//! [`UniformStore`], which only accepts values for names the program
//! declares and only with the declared type. A program can sample another
//! program through a `uniform shader` declaration holding a
//! [`ShaderInstance`].
//!
//! ```
//! use shaderprog::{compile, UniformStore};
//!
//! let program = compile(
//!     "uniform float2 iResolution;\n\
//!      half4 main(float2 coord) { return half4(0.0, coord / iResolution, 1.0); }",
//! )?;
//! let mut uniforms = UniformStore::new(&program);
//! uniforms.set_vector2("iResolution", 4.0, 4.0)?;
//! let color = program.evaluate([2.0, 1.0], [4.0, 4.0], &uniforms);
//! assert_eq!((color.g, color.b), (0.5, 0.25));
//! # Ok::<(), shaderprog::ShaderError>(())
//! ```

mod ast;
mod builtins;
mod chain;
mod check;
mod error;
mod eval;
mod ir;
mod lexer;
mod parser;
mod program;
mod types;
mod uniforms;
mod value;

pub use builtins::step;
pub use chain::ShaderInstance;
pub use error::{CompileError, ShaderError};
pub use eval::{EVALUATION_BUDGET, LOOP_LIMIT};
pub use program::{compile, ProgramId, ShaderProgram, UniformDecl};
pub use types::{Rgba, Type, UniformType};
pub use uniforms::{UniformStore, UniformValue};
