//! Resolved, typed program representation executed by [`crate::eval`].
//!
//! Names are gone by this point: locals are frame slots, uniforms are
//! declaration indices, and calls refer to functions by index.

use crate::ast::{BinaryOp, UnaryOp};
use crate::builtins::Builtin;
use crate::types::Type;
use crate::value::Value;

pub(crate) type Slot = usize;

#[derive(Debug, Clone)]
pub(crate) struct Module {
    pub functions: Vec<Function>,
    pub entry: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Function {
    pub name: String,
    pub ret: Type,
    /// Parameters occupy the first slots of the frame.
    pub slot_count: usize,
    pub body: Vec<Stmt>,
}

/// Lane selection for swizzles such as `.xy` or `.bgr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Swizzle {
    pub len: u8,
    pub lanes: [u8; 4],
}

impl Swizzle {
    pub(crate) fn iter(self) -> impl Iterator<Item = usize> {
        self.lanes
            .into_iter()
            .take(self.len as usize)
            .map(usize::from)
    }

    pub(crate) fn apply(self, value: Value) -> Value {
        Value::from_fn(self.len as usize, |index| {
            value.lane(usize::from(self.lanes[index]))
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Place {
    pub slot: Slot,
    pub swizzle: Option<Swizzle>,
}

#[derive(Debug, Clone)]
pub(crate) enum Stmt {
    Init { slot: Slot, value: Expr },
    Expr(Expr),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    Loop {
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
    Return(Option<Expr>),
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Const(Value),
    Local(Slot),
    Uniform { index: usize, ty: Type },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Select(Box<Expr>, Box<Expr>, Box<Expr>),
    Construct { width: u8, args: Vec<Expr> },
    Swizzle(Box<Expr>, Swizzle),
    Builtin(Builtin, Vec<Expr>),
    Call(usize, Vec<Expr>),
    /// `uniform.eval(coord)` on a shader-reference uniform.
    Sample { uniform: usize, coord: Box<Expr> },
    Assign {
        place: Place,
        op: Option<BinaryOp>,
        value: Box<Expr>,
    },
    Step {
        place: Place,
        delta: f32,
        prefix: bool,
    },
}
