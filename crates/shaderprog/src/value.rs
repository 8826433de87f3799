use crate::ast::BinaryOp;
use crate::types::{Rgba, Type};

/// Runtime value held in interpreter slots.
///
/// Float values always keep unused lanes at zero so derived equality is
/// meaningful.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Value {
    Bool(bool),
    Float { width: u8, lanes: [f32; 4] },
}

impl Value {
    pub(crate) const ZERO: Value = Value::Float {
        width: 1,
        lanes: [0.0; 4],
    };

    pub(crate) fn scalar(value: f32) -> Self {
        Value::Float {
            width: 1,
            lanes: [value, 0.0, 0.0, 0.0],
        }
    }

    pub(crate) fn vec2(x: f32, y: f32) -> Self {
        Value::Float {
            width: 2,
            lanes: [x, y, 0.0, 0.0],
        }
    }

    pub(crate) fn vec4(lanes: [f32; 4]) -> Self {
        Value::Float { width: 4, lanes }
    }

    /// Builds a float value of `width` lanes from a per-lane function.
    pub(crate) fn from_fn(width: usize, mut lane: impl FnMut(usize) -> f32) -> Self {
        let mut lanes = [0.0; 4];
        for (index, slot) in lanes.iter_mut().enumerate().take(width) {
            *slot = lane(index);
        }
        Value::Float {
            width: width as u8,
            lanes,
        }
    }

    pub(crate) fn zero(ty: Type) -> Self {
        match ty {
            Type::Bool => Value::Bool(false),
            Type::Float(width) => Value::from_fn(width as usize, |_| 0.0),
            Type::Void | Type::Shader => Value::ZERO,
        }
    }

    pub(crate) fn width(&self) -> usize {
        match self {
            Value::Bool(_) => 1,
            Value::Float { width, .. } => *width as usize,
        }
    }

    /// Reads lane `index`, broadcasting scalars across every lane.
    pub(crate) fn lane(&self, index: usize) -> f32 {
        match self {
            Value::Bool(flag) => f32::from(u8::from(*flag)),
            Value::Float { width: 1, lanes } => lanes[0],
            Value::Float { lanes, .. } => lanes[index.min(3)],
        }
    }

    pub(crate) fn as_bool(&self) -> bool {
        match self {
            Value::Bool(flag) => *flag,
            Value::Float { lanes, .. } => lanes[0] != 0.0,
        }
    }

    pub(crate) fn to_rgba(self) -> Rgba {
        match self {
            Value::Float { width: 4, lanes } => Rgba::from_array(lanes),
            other => Rgba::from_array(std::array::from_fn(|index| {
                if index < other.width() {
                    other.lane(index)
                } else {
                    0.0
                }
            })),
        }
    }

    /// Applies a non-logical binary operator with scalar broadcast.
    pub(crate) fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        let width = lhs.width().max(rhs.width());
        match op {
            BinaryOp::Add => Value::from_fn(width, |i| lhs.lane(i) + rhs.lane(i)),
            BinaryOp::Sub => Value::from_fn(width, |i| lhs.lane(i) - rhs.lane(i)),
            BinaryOp::Mul => Value::from_fn(width, |i| lhs.lane(i) * rhs.lane(i)),
            BinaryOp::Div => Value::from_fn(width, |i| lhs.lane(i) / rhs.lane(i)),
            BinaryOp::Lt => Value::Bool(lhs.lane(0) < rhs.lane(0)),
            BinaryOp::Le => Value::Bool(lhs.lane(0) <= rhs.lane(0)),
            BinaryOp::Gt => Value::Bool(lhs.lane(0) > rhs.lane(0)),
            BinaryOp::Ge => Value::Bool(lhs.lane(0) >= rhs.lane(0)),
            BinaryOp::Eq => Value::Bool(lhs == rhs),
            BinaryOp::NotEq => Value::Bool(lhs != rhs),
            BinaryOp::And => Value::Bool(lhs.as_bool() && rhs.as_bool()),
            BinaryOp::Or => Value::Bool(lhs.as_bool() || rhs.as_bool()),
        }
    }
}
