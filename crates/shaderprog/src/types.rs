use std::fmt;

use serde::Serialize;

/// Static type of a shader expression.
///
/// Floating point values of width 1 through 4 share one variant so the
/// checker and evaluator can treat `float` as a one-lane vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Bool,
    Float(u8),
    Shader,
}

impl Type {
    pub const SCALAR: Type = Type::Float(1);
    pub const VEC2: Type = Type::Float(2);
    pub const VEC4: Type = Type::Float(4);

    /// Number of float lanes, or `None` for non-numeric types.
    pub fn width(self) -> Option<u8> {
        match self {
            Type::Float(width) => Some(width),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Float(_))
    }

    /// Maps a type keyword (`float`, `half3`, `vec4`, ...) to its type.
    pub fn from_keyword(word: &str) -> Option<Type> {
        let ty = match word {
            "void" => Type::Void,
            "bool" => Type::Bool,
            "shader" => Type::Shader,
            "float" | "half" => Type::Float(1),
            "float2" | "half2" | "vec2" => Type::Float(2),
            "float3" | "half3" | "vec3" => Type::Float(3),
            "float4" | "half4" | "vec4" => Type::Float(4),
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Bool => f.write_str("bool"),
            Type::Shader => f.write_str("shader"),
            Type::Float(1) => f.write_str("float"),
            Type::Float(width) => write!(f, "float{width}"),
        }
    }
}

/// Kinds of value a uniform may be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UniformType {
    Scalar,
    Vector2,
    Color,
    Shader,
}

impl UniformType {
    /// Expression type seen by shader code reading the uniform.
    pub fn value_type(self) -> Type {
        match self {
            UniformType::Scalar => Type::SCALAR,
            UniformType::Vector2 => Type::VEC2,
            UniformType::Color => Type::VEC4,
            UniformType::Shader => Type::Shader,
        }
    }

    pub(crate) fn from_type(ty: Type) -> Option<UniformType> {
        match ty {
            Type::Float(1) => Some(UniformType::Scalar),
            Type::Float(2) => Some(UniformType::Vector2),
            Type::Float(4) => Some(UniformType::Color),
            Type::Shader => Some(UniformType::Shader),
            _ => None,
        }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniformType::Scalar => f.write_str("scalar"),
            UniformType::Vector2 => f.write_str("vector2"),
            UniformType::Color => f.write_str("color"),
            UniformType::Shader => f.write_str("shader"),
        }
    }
}

/// Straight (non-premultiplied) RGBA color produced by a shader.
///
/// Channels are not clamped; presentation code is expected to clamp.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);
    pub const YELLOW: Rgba = Rgba::new(1.0, 1.0, 0.0, 1.0);
    pub const MAGENTA: Rgba = Rgba::new(1.0, 0.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_array(lanes: [f32; 4]) -> Self {
        Self::new(lanes[0], lanes[1], lanes[2], lanes[3])
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Returns a copy with every channel clamped into `[0, 1]`.
    pub fn clamped(self) -> Self {
        let clamp = |value: f32| {
            if value.is_nan() {
                0.0
            } else {
                value.clamp(0.0, 1.0)
            }
        };
        Self::new(clamp(self.r), clamp(self.g), clamp(self.b), clamp(self.a))
    }

    /// Quantizes the clamped color to 8 bits per channel.
    pub fn to_rgba8(self) -> [u8; 4] {
        let clamped = self.clamped();
        clamped
            .to_array()
            .map(|channel| (channel * 255.0 + 0.5).floor() as u8)
    }
}
