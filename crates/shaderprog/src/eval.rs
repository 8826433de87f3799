//! Tree-walking interpreter over [`crate::ir`].
//!
//! One [`Interpreter`] evaluates one coordinate. Locals live on a flat value
//! stack; each call frame addresses its slots relative to a base offset.

use crate::ast::UnaryOp;
use crate::ir::{self, Place};
use crate::program::ProgramId;
use crate::types::Rgba;
use crate::uniforms::{UniformStore, UniformValue};
use crate::value::Value;

/// Iterations a single loop may run each time it is entered.
pub const LOOP_LIMIT: usize = 65_536;

/// Loop iterations shared by all loops of one evaluation. Once spent,
/// every loop exits on entry.
pub const EVALUATION_BUDGET: usize = 1 << 20;

enum Flow {
    Next,
    Break,
    Continue,
    Return(Value),
}

pub(crate) struct Interpreter<'a> {
    module: &'a ir::Module,
    program: ProgramId,
    uniforms: &'a UniformStore,
    resolution: [f32; 2],
    stack: Vec<Value>,
    budget: usize,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(
        module: &'a ir::Module,
        program: ProgramId,
        uniforms: &'a UniformStore,
        resolution: [f32; 2],
    ) -> Self {
        Self {
            module,
            program,
            uniforms,
            resolution,
            stack: Vec::with_capacity(32),
            budget: EVALUATION_BUDGET,
        }
    }

    pub(crate) fn run(mut self, coord: [f32; 2]) -> Rgba {
        let entry = self.module.entry;
        self.call(entry, vec![Value::vec2(coord[0], coord[1])])
            .to_rgba()
    }

    fn call(&mut self, index: usize, args: Vec<Value>) -> Value {
        let module = self.module;
        let function = &module.functions[index];
        let base = self.stack.len();
        self.stack.extend(args);
        self.stack.resize(base + function.slot_count, Value::ZERO);
        let flow = self.block(&function.body, base);
        self.stack.truncate(base);
        match flow {
            Flow::Return(value) => value,
            _ => Value::zero(function.ret),
        }
    }

    fn block(&mut self, stmts: &'a [ir::Stmt], base: usize) -> Flow {
        for stmt in stmts {
            match self.stmt(stmt, base) {
                Flow::Next => {}
                flow => return flow,
            }
        }
        Flow::Next
    }

    fn stmt(&mut self, stmt: &'a ir::Stmt, base: usize) -> Flow {
        match stmt {
            ir::Stmt::Init { slot, value } => {
                let value = self.expr(value, base);
                self.stack[base + slot] = value;
                Flow::Next
            }
            ir::Stmt::Expr(expr) => {
                self.expr(expr, base);
                Flow::Next
            }
            ir::Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if self.expr(cond, base).as_bool() {
                    self.block(then, base)
                } else {
                    self.block(otherwise, base)
                }
            }
            ir::Stmt::Loop { cond, step, body } => {
                for _ in 0..LOOP_LIMIT {
                    if self.budget == 0 {
                        break;
                    }
                    self.budget -= 1;
                    if let Some(cond) = cond {
                        if !self.expr(cond, base).as_bool() {
                            break;
                        }
                    }
                    match self.block(body, base) {
                        Flow::Break => break,
                        Flow::Return(value) => return Flow::Return(value),
                        Flow::Next | Flow::Continue => {}
                    }
                    if let Some(step) = step {
                        self.expr(step, base);
                    }
                }
                Flow::Next
            }
            ir::Stmt::Block(stmts) => self.block(stmts, base),
            ir::Stmt::Return(value) => {
                let value = value
                    .as_ref()
                    .map_or(Value::ZERO, |value| self.expr(value, base));
                Flow::Return(value)
            }
            ir::Stmt::Break => Flow::Break,
            ir::Stmt::Continue => Flow::Continue,
        }
    }

    fn expr(&mut self, expr: &'a ir::Expr, base: usize) -> Value {
        match expr {
            ir::Expr::Const(value) => *value,
            ir::Expr::Local(slot) => self.stack[base + slot],
            ir::Expr::Uniform { index, ty } => match self.uniforms.value_for(self.program, *index) {
                Some(UniformValue::Scalar(value)) => Value::scalar(*value),
                Some(UniformValue::Vector2([x, y])) => Value::vec2(*x, *y),
                Some(UniformValue::Color(color)) => Value::vec4(color.to_array()),
                _ => Value::zero(*ty),
            },
            ir::Expr::Unary(op, operand) => {
                let value = self.expr(operand, base);
                match op {
                    UnaryOp::Neg => Value::from_fn(value.width(), |i| -value.lane(i)),
                    UnaryOp::Not => Value::Bool(!value.as_bool()),
                }
            }
            ir::Expr::Binary(op, lhs, rhs) => {
                let lhs = self.expr(lhs, base);
                let rhs = self.expr(rhs, base);
                Value::binary(*op, lhs, rhs)
            }
            ir::Expr::And(lhs, rhs) => {
                Value::Bool(self.expr(lhs, base).as_bool() && self.expr(rhs, base).as_bool())
            }
            ir::Expr::Or(lhs, rhs) => {
                Value::Bool(self.expr(lhs, base).as_bool() || self.expr(rhs, base).as_bool())
            }
            ir::Expr::Select(cond, then, otherwise) => {
                if self.expr(cond, base).as_bool() {
                    self.expr(then, base)
                } else {
                    self.expr(otherwise, base)
                }
            }
            ir::Expr::Construct { width, args } => self.construct(usize::from(*width), args, base),
            ir::Expr::Swizzle(inner, swizzle) => swizzle.apply(self.expr(inner, base)),
            ir::Expr::Builtin(builtin, args) => {
                let mut values = [Value::ZERO; 3];
                for (value, arg) in values.iter_mut().zip(args) {
                    *value = self.expr(arg, base);
                }
                builtin.apply(&values[..args.len().min(3)])
            }
            ir::Expr::Call(index, args) => {
                let values: Vec<Value> = args.iter().map(|arg| self.expr(arg, base)).collect();
                self.call(*index, values)
            }
            ir::Expr::Sample { uniform, coord } => {
                let coord = self.expr(coord, base);
                match self.uniforms.value_for(self.program, *uniform) {
                    Some(UniformValue::Shader(Some(child))) => {
                        let color = child.evaluate([coord.lane(0), coord.lane(1)], self.resolution);
                        Value::vec4(color.to_array())
                    }
                    _ => Value::vec4([0.0; 4]),
                }
            }
            ir::Expr::Assign { place, op, value } => {
                let value = self.expr(value, base);
                let updated = match op {
                    None => value,
                    Some(op) => Value::binary(*op, self.read(*place, base), value),
                };
                self.write(*place, base, updated);
                updated
            }
            ir::Expr::Step {
                place,
                delta,
                prefix,
            } => {
                let old = self.read(*place, base);
                let new = Value::from_fn(old.width(), |i| old.lane(i) + delta);
                self.write(*place, base, new);
                if *prefix {
                    new
                } else {
                    old
                }
            }
        }
    }

    fn construct(&mut self, width: usize, args: &'a [ir::Expr], base: usize) -> Value {
        let mut lanes = [0.0; 4];
        let mut filled = 0;
        for arg in args {
            let value = self.expr(arg, base);
            if args.len() == 1 && value.width() == 1 {
                return Value::from_fn(width, |_| value.lane(0));
            }
            for lane in 0..value.width() {
                if filled < width {
                    lanes[filled] = value.lane(lane);
                    filled += 1;
                }
            }
        }
        Value::from_fn(width, |i| lanes[i])
    }

    fn read(&self, place: Place, base: usize) -> Value {
        let value = self.stack[base + place.slot];
        match place.swizzle {
            Some(swizzle) => swizzle.apply(value),
            None => value,
        }
    }

    fn write(&mut self, place: Place, base: usize, value: Value) {
        let slot = &mut self.stack[base + place.slot];
        match (place.swizzle, slot) {
            (None, slot) => *slot = value,
            (Some(swizzle), Value::Float { lanes, .. }) => {
                for (index, lane) in swizzle.iter().enumerate() {
                    lanes[lane] = value.lane(index);
                }
            }
            (Some(_), Value::Bool(_)) => {}
        }
    }
}
