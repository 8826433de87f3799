use std::sync::Arc;

use crate::chain::ShaderInstance;
use crate::error::ShaderError;
use crate::program::{ProgramId, ShaderProgram, UniformDecl};
use crate::types::{Rgba, UniformType};

/// Tagged uniform value; the tag must match the declared [`UniformType`].
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Scalar(f32),
    Vector2([f32; 2]),
    Color(Rgba),
    Shader(Option<ShaderInstance>),
}

impl UniformValue {
    /// Builds a color value with every channel clamped into `[0, 1]`.
    pub fn color(r: f32, g: f32, b: f32, a: f32) -> Self {
        UniformValue::Color(Rgba::new(r, g, b, a).clamped())
    }

    pub fn uniform_type(&self) -> UniformType {
        match self {
            UniformValue::Scalar(_) => UniformType::Scalar,
            UniformValue::Vector2(_) => UniformType::Vector2,
            UniformValue::Color(_) => UniformType::Color,
            UniformValue::Shader(_) => UniformType::Shader,
        }
    }

    /// Zero value for a declared type: 0.0, (0, 0), transparent black, or no shader.
    pub fn default_for(ty: UniformType) -> Self {
        match ty {
            UniformType::Scalar => UniformValue::Scalar(0.0),
            UniformType::Vector2 => UniformValue::Vector2([0.0, 0.0]),
            UniformType::Color => UniformValue::Color(Rgba::TRANSPARENT),
            UniformType::Shader => UniformValue::Shader(None),
        }
    }
}

/// Named uniform values bound to one program's declarations.
///
/// Every declared name always has a value (its default until set) and no
/// other name can be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformStore {
    program: ProgramId,
    declarations: Arc<[UniformDecl]>,
    values: Vec<UniformValue>,
}

impl UniformStore {
    pub fn new(program: &ShaderProgram) -> Self {
        let declarations = program.declarations();
        let values = declarations
            .iter()
            .map(|decl| UniformValue::default_for(decl.ty))
            .collect();
        Self {
            program: program.id(),
            declarations,
            values,
        }
    }

    /// Program whose declarations this store validates against.
    pub fn program_id(&self) -> ProgramId {
        self.program
    }

    pub fn declarations(&self) -> &[UniformDecl] {
        &self.declarations
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.declarations.iter().position(|decl| decl.name == name)
    }

    fn require(&self, name: &str) -> Result<usize, ShaderError> {
        self.index_of(name).ok_or_else(|| ShaderError::UnknownUniform {
            name: name.to_string(),
        })
    }

    /// Assigns a value, rejecting undeclared names, mismatched tags, and
    /// shader references that would make the program reference itself.
    /// The store is untouched when an error is returned.
    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<(), ShaderError> {
        let index = self.require(name)?;
        let expected = self.declarations[index].ty;
        let actual = value.uniform_type();
        if expected != actual {
            return Err(ShaderError::UniformTypeMismatch {
                name: name.to_string(),
                expected,
                actual,
            });
        }
        if let UniformValue::Shader(Some(instance)) = &value {
            if instance.references(self.program) {
                return Err(ShaderError::CyclicShaderReference {
                    program_id: self.program,
                });
            }
        }
        self.values[index] = value;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&UniformValue, ShaderError> {
        let index = self.require(name)?;
        Ok(&self.values[index])
    }

    pub fn set_scalar(&mut self, name: &str, value: f32) -> Result<(), ShaderError> {
        self.set(name, UniformValue::Scalar(value))
    }

    pub fn set_vector2(&mut self, name: &str, x: f32, y: f32) -> Result<(), ShaderError> {
        self.set(name, UniformValue::Vector2([x, y]))
    }

    pub fn set_color(&mut self, name: &str, r: f32, g: f32, b: f32, a: f32) -> Result<(), ShaderError> {
        self.set(name, UniformValue::color(r, g, b, a))
    }

    pub fn set_shader_reference(&mut self, name: &str, child: ShaderInstance) -> Result<(), ShaderError> {
        self.set(name, UniformValue::Shader(Some(child)))
    }

    /// Chained shader bound to `name`, if any.
    pub fn child(&self, name: &str) -> Result<Option<&ShaderInstance>, ShaderError> {
        match self.get(name)? {
            UniformValue::Shader(child) => Ok(child.as_ref()),
            other => Err(ShaderError::UniformTypeMismatch {
                name: name.to_string(),
                expected: other.uniform_type(),
                actual: UniformType::Shader,
            }),
        }
    }

    /// Mutable access to a chained shader so its own uniforms can be kept
    /// in step with the parent.
    pub fn child_mut(&mut self, name: &str) -> Result<Option<&mut ShaderInstance>, ShaderError> {
        let index = self.require(name)?;
        match &mut self.values[index] {
            UniformValue::Shader(child) => Ok(child.as_mut()),
            other => Err(ShaderError::UniformTypeMismatch {
                name: name.to_string(),
                expected: other.uniform_type(),
                actual: UniformType::Shader,
            }),
        }
    }

    /// Chained shaders currently bound, with their uniform names.
    pub fn children(&self) -> impl Iterator<Item = (&str, &ShaderInstance)> {
        self.declarations
            .iter()
            .zip(&self.values)
            .filter_map(|(decl, value)| match value {
                UniformValue::Shader(Some(child)) => Some((decl.name.as_str(), child)),
                _ => None,
            })
    }

    /// Pushes `value` into every chained instance (at any depth) that
    /// declares `name` with a matching type. This store itself is left
    /// alone. Returns how many stores took the value.
    pub fn propagate_to_children(&mut self, name: &str, value: &UniformValue) -> usize {
        self.children_mut()
            .map(|child| child.propagate(name, value))
            .sum()
    }

    pub(crate) fn children_mut(&mut self) -> impl Iterator<Item = &mut ShaderInstance> {
        self.values.iter_mut().filter_map(|value| match value {
            UniformValue::Shader(Some(child)) => Some(child),
            _ => None,
        })
    }

    /// Value at a declaration index, provided the store belongs to `owner`.
    pub(crate) fn value_for(&self, owner: ProgramId, index: usize) -> Option<&UniformValue> {
        if owner == self.program {
            self.values.get(index)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::compile;

    const SOURCE: &str = "uniform float2 iResolution;\nuniform float iTime;\nlayout(color) uniform half4 iColor;\nuniform shader composable;\nhalf4 main(float2 p) { return iColor; }";

    fn store() -> UniformStore {
        let program = compile(SOURCE).expect("compile");
        UniformStore::new(&program)
    }

    #[test]
    fn unset_uniforms_read_as_type_defaults() {
        let store = store();
        assert_eq!(store.get("iTime"), Ok(&UniformValue::Scalar(0.0)));
        assert_eq!(store.get("iResolution"), Ok(&UniformValue::Vector2([0.0, 0.0])));
        assert_eq!(store.get("iColor"), Ok(&UniformValue::Color(Rgba::TRANSPARENT)));
        assert_eq!(store.get("composable"), Ok(&UniformValue::Shader(None)));
    }

    #[test]
    fn rejects_mismatched_tag_and_keeps_previous_value() {
        let mut store = store();
        store.set_vector2("iResolution", 640.0, 480.0).expect("set");
        let err = store
            .set("iResolution", UniformValue::color(1.0, 1.0, 0.0, 1.0))
            .unwrap_err();
        assert_eq!(
            err,
            ShaderError::UniformTypeMismatch {
                name: "iResolution".into(),
                expected: UniformType::Vector2,
                actual: UniformType::Color,
            }
        );
        assert_eq!(store.get("iResolution"), Ok(&UniformValue::Vector2([640.0, 480.0])));
    }

    #[test]
    fn rejects_unknown_names_on_set_and_get() {
        let mut store = store();
        let before = store.clone();
        assert_eq!(
            store.set_scalar("nonexistent", 1.0),
            Err(ShaderError::UnknownUniform {
                name: "nonexistent".into()
            })
        );
        assert!(matches!(
            store.get("nonexistent"),
            Err(ShaderError::UnknownUniform { .. })
        ));
        assert_eq!(store, before);
    }

    #[test]
    fn color_values_are_clamped() {
        let mut store = store();
        store.set_color("iColor", 1.5, -0.5, 0.25, 1.0).expect("set");
        assert_eq!(
            store.get("iColor"),
            Ok(&UniformValue::Color(Rgba::new(1.0, 0.0, 0.25, 1.0)))
        );
    }

    #[test]
    fn child_access_requires_shader_uniform() {
        let store = store();
        assert_eq!(store.child("composable"), Ok(None));
        assert!(matches!(
            store.child("iTime"),
            Err(ShaderError::UniformTypeMismatch { .. })
        ));
    }
}
