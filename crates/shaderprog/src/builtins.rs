//! Built-in functions available to shader code.
//!
//! Signatures follow the usual shading-language "genType" rules: most
//! functions are component-wise, and several accept a scalar where a vector
//! would otherwise be required (`mod(v, 2.0)`, `step(0.5, v)`, `mix(a, b, t)`).

use crate::types::Type;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Abs,
    Sign,
    Floor,
    Ceil,
    Fract,
    Sqrt,
    Exp,
    Log,
    Pow,
    Mod,
    Min,
    Max,
    Clamp,
    Mix,
    Step,
    Smoothstep,
    Length,
    Distance,
    Dot,
    Normalize,
}

/// Argument shapes accepted by the generic signature check.
enum Shape {
    /// Every argument has the same type.
    Same,
    /// Leading arguments share a type; the trailing ones may also be scalars.
    ScalarTail(usize),
    /// Leading arguments may be scalars; the last one fixes the type.
    ScalarHead(usize),
}

impl Builtin {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        let builtin = match name {
            "sin" => Builtin::Sin,
            "cos" => Builtin::Cos,
            "tan" => Builtin::Tan,
            "asin" => Builtin::Asin,
            "acos" => Builtin::Acos,
            "atan" => Builtin::Atan,
            "abs" => Builtin::Abs,
            "sign" => Builtin::Sign,
            "floor" => Builtin::Floor,
            "ceil" => Builtin::Ceil,
            "fract" => Builtin::Fract,
            "sqrt" => Builtin::Sqrt,
            "exp" => Builtin::Exp,
            "log" => Builtin::Log,
            "pow" => Builtin::Pow,
            "mod" => Builtin::Mod,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "clamp" => Builtin::Clamp,
            "mix" => Builtin::Mix,
            "step" => Builtin::Step,
            "smoothstep" => Builtin::Smoothstep,
            "length" => Builtin::Length,
            "distance" => Builtin::Distance,
            "dot" => Builtin::Dot,
            "normalize" => Builtin::Normalize,
            _ => return None,
        };
        Some(builtin)
    }

    /// Validates argument types and returns the result type.
    pub(crate) fn result_type(self, name: &str, args: &[Type]) -> Result<Type, String> {
        let (arity, shape) = match self {
            Builtin::Atan if args.len() == 2 => (2, Shape::Same),
            Builtin::Sin
            | Builtin::Cos
            | Builtin::Tan
            | Builtin::Asin
            | Builtin::Acos
            | Builtin::Atan
            | Builtin::Abs
            | Builtin::Sign
            | Builtin::Floor
            | Builtin::Ceil
            | Builtin::Fract
            | Builtin::Sqrt
            | Builtin::Exp
            | Builtin::Log
            | Builtin::Normalize
            | Builtin::Length => (1, Shape::Same),
            Builtin::Pow | Builtin::Distance | Builtin::Dot => (2, Shape::Same),
            Builtin::Mod | Builtin::Min | Builtin::Max => (2, Shape::ScalarTail(1)),
            Builtin::Clamp => (3, Shape::ScalarTail(2)),
            Builtin::Mix => (3, Shape::ScalarTail(1)),
            Builtin::Step => (2, Shape::ScalarHead(1)),
            Builtin::Smoothstep => (3, Shape::ScalarHead(2)),
        };

        if args.len() != arity {
            return Err(format!(
                "'{name}' expects {arity} argument{}, found {}",
                if arity == 1 { "" } else { "s" },
                args.len()
            ));
        }
        if let Some(bad) = args.iter().find(|ty| !ty.is_numeric()) {
            return Err(format!("'{name}' expects float arguments, found {bad}"));
        }

        let generic = match shape {
            Shape::Same | Shape::ScalarTail(_) => args[0],
            Shape::ScalarHead(_) => args[arity - 1],
        };
        let matches = args.iter().enumerate().all(|(index, ty)| {
            let flexible = match shape {
                Shape::Same => false,
                Shape::ScalarTail(count) => index >= arity - count,
                Shape::ScalarHead(count) => index < count,
            };
            *ty == generic || (flexible && *ty == Type::SCALAR)
        });
        if !matches {
            let listed: Vec<String> = args.iter().map(ToString::to_string).collect();
            return Err(format!(
                "no overload of '{name}' accepts ({})",
                listed.join(", ")
            ));
        }

        Ok(match self {
            Builtin::Length | Builtin::Distance | Builtin::Dot => Type::SCALAR,
            _ => generic,
        })
    }

    pub(crate) fn apply(self, args: &[Value]) -> Value {
        let width = args.iter().map(Value::width).max().unwrap_or(1);
        let arg = |slot: usize, lane: usize| args.get(slot).map_or(0.0, |v| v.lane(lane));

        match self {
            Builtin::Length => Value::scalar(length(&args[0])),
            Builtin::Distance => {
                let delta = Value::from_fn(width, |i| arg(0, i) - arg(1, i));
                Value::scalar(length(&delta))
            }
            Builtin::Dot => Value::scalar((0..width).map(|i| arg(0, i) * arg(1, i)).sum()),
            Builtin::Normalize => {
                let len = length(&args[0]);
                Value::from_fn(width, |i| arg(0, i) / len)
            }
            Builtin::Atan if args.len() == 2 => Value::from_fn(width, |i| arg(0, i).atan2(arg(1, i))),
            _ => Value::from_fn(width, |i| {
                let x = arg(0, i);
                match self {
                    Builtin::Sin => x.sin(),
                    Builtin::Cos => x.cos(),
                    Builtin::Tan => x.tan(),
                    Builtin::Asin => x.asin(),
                    Builtin::Acos => x.acos(),
                    Builtin::Atan => x.atan(),
                    Builtin::Abs => x.abs(),
                    Builtin::Sign => {
                        if x > 0.0 {
                            1.0
                        } else if x < 0.0 {
                            -1.0
                        } else {
                            0.0
                        }
                    }
                    Builtin::Floor => x.floor(),
                    Builtin::Ceil => x.ceil(),
                    Builtin::Fract => x - x.floor(),
                    Builtin::Sqrt => x.sqrt(),
                    Builtin::Exp => x.exp(),
                    Builtin::Log => x.ln(),
                    Builtin::Pow => x.powf(arg(1, i)),
                    Builtin::Mod => {
                        let y = arg(1, i);
                        x - y * (x / y).floor()
                    }
                    Builtin::Min => x.min(arg(1, i)),
                    Builtin::Max => x.max(arg(1, i)),
                    Builtin::Clamp => x.max(arg(1, i)).min(arg(2, i)),
                    Builtin::Mix => {
                        let t = arg(2, i);
                        x * (1.0 - t) + arg(1, i) * t
                    }
                    Builtin::Step => step(x, arg(1, i)),
                    Builtin::Smoothstep => {
                        let (edge0, edge1, value) = (x, arg(1, i), arg(2, i));
                        let t = ((value - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
                        t * t * (3.0 - 2.0 * t)
                    }
                    Builtin::Length | Builtin::Distance | Builtin::Dot | Builtin::Normalize => {
                        0.0
                    }
                }
            }),
        }
    }
}

/// `0.0` when `x < edge`, otherwise `1.0`.
pub fn step(edge: f32, x: f32) -> f32 {
    if x < edge {
        0.0
    } else {
        1.0
    }
}

fn length(value: &Value) -> f32 {
    (0..value.width())
        .map(|lane| value.lane(lane) * value.lane(lane))
        .sum::<f32>()
        .sqrt()
}
