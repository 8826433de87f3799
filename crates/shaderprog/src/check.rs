//! Semantic analysis: name resolution, type checking, and lowering to IR.
//!
//! Rules enforced here:
//!
//! 1. Uniforms use one of the declarable types and have unique names;
//!    `layout(color)` only qualifies color uniforms.
//! 2. Functions are defined before use, so recursion cannot be expressed.
//! 3. Every expression has a static type; assignments, returns, and
//!    conditions must agree with it.
//! 4. Shader uniforms are only reachable through `.eval(float2)`.
//! 5. The entry point is `half4 main(float2 coord)` (any float4 spelling).
//! 6. `for` loops nest at most [`MAX_LOOP_NESTING`] deep.

use std::collections::HashMap;

use crate::ast::{self, BinaryOp, ExprKind, UnaryOp};
use crate::builtins::Builtin;
use crate::error::{CompileError, CompileResult, Pos};
use crate::ir::{self, Place, Swizzle};
use crate::program::UniformDecl;
use crate::types::{Type, UniformType};
use crate::value::Value;

pub(crate) const MAX_LOOP_NESTING: usize = 8;

#[derive(Debug)]
pub(crate) struct Checked {
    pub uniforms: Vec<UniformDecl>,
    pub module: ir::Module,
}

pub(crate) fn check(module: ast::Module) -> CompileResult<Checked> {
    let uniforms = check_uniforms(&module.uniforms)?;
    let mut checker = Checker {
        uniforms: &uniforms,
        signatures: Vec::new(),
    };

    let mut functions = Vec::with_capacity(module.functions.len());
    for def in &module.functions {
        functions.push(checker.function(def)?);
    }

    let entry = module
        .functions
        .iter()
        .position(|def| def.name == "main")
        .ok_or_else(|| {
            CompileError::at(Pos::new(1, 1), "program has no 'main' entry point")
        })?;
    let main = &module.functions[entry];
    let entry_ok = main.ret == Type::VEC4
        && main.params.len() == 1
        && main.params[0].ty == Type::VEC2;
    if !entry_ok {
        return Err(CompileError::at(
            main.pos,
            "entry point must be declared as 'half4 main(float2 coord)'",
        ));
    }

    Ok(Checked {
        uniforms,
        module: ir::Module { functions, entry },
    })
}

fn check_uniforms(defs: &[ast::UniformDef]) -> CompileResult<Vec<UniformDecl>> {
    let mut decls: Vec<UniformDecl> = Vec::with_capacity(defs.len());
    for def in defs {
        if decls.iter().any(|existing| existing.name == def.name) {
            return Err(CompileError::at(
                def.pos,
                format!("uniform '{}' is declared more than once", def.name),
            ));
        }
        let ty = UniformType::from_type(def.ty).ok_or_else(|| {
            CompileError::at(
                def.pos,
                format!(
                    "uniform '{}' has unsupported type {}; expected float, float2, half4, or shader",
                    def.name, def.ty
                ),
            )
        })?;
        if def.layout_color && ty != UniformType::Color {
            return Err(CompileError::at(
                def.pos,
                format!("layout(color) requires a half4 uniform, '{}' is {}", def.name, def.ty),
            ));
        }
        decls.push(UniformDecl {
            name: def.name.clone(),
            ty,
            color_managed: def.layout_color,
        });
    }
    Ok(decls)
}

struct Signature {
    name: String,
    params: Vec<Type>,
    ret: Type,
}

struct Checker<'a> {
    uniforms: &'a [UniformDecl],
    signatures: Vec<Signature>,
}

#[derive(Clone, Copy)]
struct Local {
    slot: ir::Slot,
    ty: Type,
    is_const: bool,
}

/// Per-function scope state.
struct Frame<'f> {
    name: &'f str,
    ret: Type,
    scopes: Vec<HashMap<String, Local>>,
    slot_count: usize,
    loop_depth: usize,
}

impl<'f> Frame<'f> {
    fn lookup(&self, name: &str) -> Option<Local> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn declare(&mut self, name: &str, ty: Type, is_const: bool, pos: Pos) -> CompileResult<ir::Slot> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| CompileError::at(pos, "declaration outside of any scope"))?;
        if scope.contains_key(name) {
            return Err(CompileError::at(
                pos,
                format!("'{name}' is already declared in this scope"),
            ));
        }
        let slot = self.slot_count;
        self.slot_count += 1;
        scope.insert(name.to_string(), Local { slot, ty, is_const });
        Ok(slot)
    }
}

impl<'a> Checker<'a> {
    fn uniform(&self, name: &str) -> Option<(usize, &UniformDecl)> {
        self.uniforms
            .iter()
            .enumerate()
            .find(|(_, decl)| decl.name == name)
    }

    fn function(&mut self, def: &ast::FunctionDef) -> CompileResult<ir::Function> {
        if Builtin::from_name(&def.name).is_some() {
            return Err(CompileError::at(
                def.pos,
                format!("'{}' is a built-in function and cannot be redefined", def.name),
            ));
        }
        if self.signatures.iter().any(|sig| sig.name == def.name) {
            return Err(CompileError::at(
                def.pos,
                format!("function '{}' is defined more than once", def.name),
            ));
        }
        if def.ret == Type::Shader {
            return Err(CompileError::at(def.pos, "functions cannot return a shader"));
        }

        let mut frame = Frame {
            name: &def.name,
            ret: def.ret,
            scopes: vec![HashMap::new()],
            slot_count: 0,
            loop_depth: 0,
        };
        for param in &def.params {
            if !matches!(param.ty, Type::Bool | Type::Float(_)) {
                return Err(CompileError::at(
                    param.pos,
                    format!("parameter '{}' cannot have type {}", param.name, param.ty),
                ));
            }
            frame.declare(&param.name, param.ty, false, param.pos)?;
        }

        let body = self.statements(&def.body, &mut frame)?;
        self.signatures.push(Signature {
            name: def.name.clone(),
            params: def.params.iter().map(|param| param.ty).collect(),
            ret: def.ret,
        });

        Ok(ir::Function {
            name: def.name.clone(),
            ret: def.ret,
            slot_count: frame.slot_count,
            body,
        })
    }

    fn statements(&mut self, stmts: &[ast::Stmt], frame: &mut Frame<'_>) -> CompileResult<Vec<ir::Stmt>> {
        let mut lowered = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            self.statement(stmt, frame, &mut lowered)?;
        }
        Ok(lowered)
    }

    /// Lowers a nested statement inside its own scope.
    fn scoped(&mut self, stmt: &ast::Stmt, frame: &mut Frame<'_>) -> CompileResult<Vec<ir::Stmt>> {
        frame.scopes.push(HashMap::new());
        let mut lowered = Vec::new();
        let result = self.statement(stmt, frame, &mut lowered);
        frame.scopes.pop();
        result.map(|_| lowered)
    }

    fn statement(
        &mut self,
        stmt: &ast::Stmt,
        frame: &mut Frame<'_>,
        out: &mut Vec<ir::Stmt>,
    ) -> CompileResult<()> {
        match stmt {
            ast::Stmt::Empty => {}
            ast::Stmt::Decl { ty, is_const, vars } => {
                if !matches!(ty, Type::Bool | Type::Float(_)) {
                    let pos = vars.first().map(|var| var.pos).unwrap_or_default();
                    return Err(CompileError::at(
                        pos,
                        format!("local variables cannot have type {ty}"),
                    ));
                }
                for var in vars {
                    let value = match &var.init {
                        Some(init) => {
                            let (value, value_ty) = self.expr(init, frame)?;
                            expect_type(*ty, value_ty, init.pos, "initializer")?;
                            value
                        }
                        None if *is_const => {
                            return Err(CompileError::at(
                                var.pos,
                                format!("constant '{}' must be initialized", var.name),
                            ))
                        }
                        None => ir::Expr::Const(Value::zero(*ty)),
                    };
                    let slot = frame.declare(&var.name, *ty, *is_const, var.pos)?;
                    out.push(ir::Stmt::Init { slot, value });
                }
            }
            ast::Stmt::Expr(expr) => {
                let (lowered, _) = self.expr(expr, frame)?;
                out.push(ir::Stmt::Expr(lowered));
            }
            ast::Stmt::Block(stmts) => {
                frame.scopes.push(HashMap::new());
                let result = self.statements(stmts, frame);
                frame.scopes.pop();
                out.push(ir::Stmt::Block(result?));
            }
            ast::Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.condition(cond, frame)?;
                let then = self.scoped(then, frame)?;
                let otherwise = match otherwise {
                    Some(stmt) => self.scoped(stmt, frame)?,
                    None => Vec::new(),
                };
                out.push(ir::Stmt::If {
                    cond,
                    then,
                    otherwise,
                });
            }
            ast::Stmt::For {
                init,
                cond,
                step,
                body,
                pos,
            } => {
                frame.scopes.push(HashMap::new());
                let result =
                    self.for_loop(*pos, init.as_deref(), cond.as_ref(), step.as_ref(), body, frame);
                frame.scopes.pop();
                out.push(ir::Stmt::Block(result?));
            }
            ast::Stmt::Return { value, pos } => {
                let lowered = match (value, frame.ret) {
                    (None, Type::Void) => None,
                    (None, ret) => {
                        return Err(CompileError::at(
                            *pos,
                            format!("'{}' must return a value of type {ret}", frame.name),
                        ))
                    }
                    (Some(expr), Type::Void) => {
                        return Err(CompileError::at(
                            expr.pos,
                            format!("'{}' returns void and cannot return a value", frame.name),
                        ))
                    }
                    (Some(expr), ret) => {
                        let (lowered, ty) = self.expr(expr, frame)?;
                        expect_type(ret, ty, expr.pos, "return value")?;
                        Some(lowered)
                    }
                };
                out.push(ir::Stmt::Return(lowered));
            }
            ast::Stmt::Break(pos) | ast::Stmt::Continue(pos) => {
                if frame.loop_depth == 0 {
                    return Err(CompileError::at(*pos, "'break' and 'continue' must appear inside a loop"));
                }
                out.push(if matches!(stmt, ast::Stmt::Break(_)) {
                    ir::Stmt::Break
                } else {
                    ir::Stmt::Continue
                });
            }
        }
        Ok(())
    }

    fn for_loop(
        &mut self,
        pos: Pos,
        init: Option<&ast::Stmt>,
        cond: Option<&ast::Expr>,
        step: Option<&ast::Expr>,
        body: &ast::Stmt,
        frame: &mut Frame<'_>,
    ) -> CompileResult<Vec<ir::Stmt>> {
        if frame.loop_depth >= MAX_LOOP_NESTING {
            return Err(CompileError::at(
                pos,
                format!("loops may be nested at most {MAX_LOOP_NESTING} deep"),
            ));
        }
        let mut lowered = Vec::new();
        if let Some(init) = init {
            self.statement(init, frame, &mut lowered)?;
        }
        let cond = cond.map(|cond| self.condition(cond, frame)).transpose()?;
        let step = match step {
            Some(step) => Some(self.expr(step, frame)?.0),
            None => None,
        };
        frame.loop_depth += 1;
        let body = self.scoped(body, frame);
        frame.loop_depth -= 1;
        lowered.push(ir::Stmt::Loop {
            cond,
            step,
            body: body?,
        });
        Ok(lowered)
    }

    fn condition(&mut self, expr: &ast::Expr, frame: &mut Frame<'_>) -> CompileResult<ir::Expr> {
        let (lowered, ty) = self.expr(expr, frame)?;
        expect_type(Type::Bool, ty, expr.pos, "condition")?;
        Ok(lowered)
    }

    fn expr(&mut self, expr: &ast::Expr, frame: &mut Frame<'_>) -> CompileResult<(ir::Expr, Type)> {
        let pos = expr.pos;
        match &expr.kind {
            ExprKind::Number(value) => Ok((ir::Expr::Const(Value::scalar(*value)), Type::SCALAR)),
            ExprKind::Bool(flag) => Ok((ir::Expr::Const(Value::Bool(*flag)), Type::Bool)),
            ExprKind::Ident(name) => self.ident(name, pos, frame),
            ExprKind::Unary(op, operand) => {
                let (operand, ty) = self.expr(operand, frame)?;
                let ok = match op {
                    UnaryOp::Neg => ty.is_numeric(),
                    UnaryOp::Not => ty == Type::Bool,
                };
                if !ok {
                    return Err(CompileError::at(pos, format!("invalid operand type {ty} for unary operator")));
                }
                Ok((ir::Expr::Unary(*op, Box::new(operand)), ty))
            }
            ExprKind::Binary(op, lhs, rhs) => {
                let (lhs, lhs_ty) = self.expr(lhs, frame)?;
                let (rhs, rhs_ty) = self.expr(rhs, frame)?;
                let ty = binary_type(*op, lhs_ty, rhs_ty)
                    .map_err(|message| CompileError::at(pos, message))?;
                let lowered = match op {
                    BinaryOp::And => ir::Expr::And(Box::new(lhs), Box::new(rhs)),
                    BinaryOp::Or => ir::Expr::Or(Box::new(lhs), Box::new(rhs)),
                    _ => ir::Expr::Binary(*op, Box::new(lhs), Box::new(rhs)),
                };
                Ok((lowered, ty))
            }
            ExprKind::Ternary(cond, then, otherwise) => {
                let cond = self.condition(cond, frame)?;
                let (then, then_ty) = self.expr(then, frame)?;
                let (otherwise, otherwise_ty) = self.expr(otherwise, frame)?;
                if then_ty != otherwise_ty {
                    return Err(CompileError::at(
                        pos,
                        format!("ternary branches have different types: {then_ty} and {otherwise_ty}"),
                    ));
                }
                Ok((
                    ir::Expr::Select(Box::new(cond), Box::new(then), Box::new(otherwise)),
                    then_ty,
                ))
            }
            ExprKind::Assign { op, target, value } => {
                let (place, place_ty) = self.place(target, frame)?;
                let (value, value_ty) = self.expr(value, frame)?;
                match op {
                    None => expect_type(place_ty, value_ty, pos, "assignment")?,
                    Some(op) => {
                        let result = binary_type(*op, place_ty, value_ty)
                            .map_err(|message| CompileError::at(pos, message))?;
                        expect_type(place_ty, result, pos, "compound assignment")?;
                    }
                }
                Ok((
                    ir::Expr::Assign {
                        place,
                        op: *op,
                        value: Box::new(value),
                    },
                    place_ty,
                ))
            }
            ExprKind::Step {
                target,
                delta,
                prefix,
            } => {
                let (place, ty) = self.place(target, frame)?;
                if !ty.is_numeric() {
                    return Err(CompileError::at(pos, format!("cannot increment a value of type {ty}")));
                }
                Ok((
                    ir::Expr::Step {
                        place,
                        delta: *delta,
                        prefix: *prefix,
                    },
                    ty,
                ))
            }
            ExprKind::Call { name, args } => self.call(name, args, pos, frame),
            ExprKind::Field { base, name } => {
                let (base, base_ty) = self.expr(base, frame)?;
                let width = base_ty.width().ok_or_else(|| {
                    CompileError::at(pos, format!("type {base_ty} has no field '{name}'"))
                })?;
                let swizzle = parse_swizzle(name, width, pos)?;
                Ok((
                    ir::Expr::Swizzle(Box::new(base), swizzle),
                    Type::Float(swizzle.len),
                ))
            }
            ExprKind::Method {
                receiver,
                method,
                args,
            } => self.sample(receiver, method, args, pos, frame),
        }
    }

    fn ident(&self, name: &str, pos: Pos, frame: &Frame<'_>) -> CompileResult<(ir::Expr, Type)> {
        if let Some(local) = frame.lookup(name) {
            return Ok((ir::Expr::Local(local.slot), local.ty));
        }
        if let Some((index, decl)) = self.uniform(name) {
            if decl.ty == UniformType::Shader {
                return Err(CompileError::at(
                    pos,
                    format!("shader uniform '{name}' can only be used as '{name}.eval(coord)'"),
                ));
            }
            let ty = decl.ty.value_type();
            return Ok((ir::Expr::Uniform { index, ty }, ty));
        }
        Err(CompileError::at(pos, format!("unknown identifier '{name}'")))
    }

    /// Resolves an assignable location: a local or a swizzle of one.
    fn place(&self, target: &ast::Expr, frame: &Frame<'_>) -> CompileResult<(Place, Type)> {
        let (name, field) = match &target.kind {
            ExprKind::Ident(name) => (name, None),
            ExprKind::Field { base, name: field } => match &base.kind {
                ExprKind::Ident(name) => (name, Some(field)),
                _ => {
                    return Err(CompileError::at(
                        target.pos,
                        "only variables and their swizzles can be assigned",
                    ))
                }
            },
            _ => {
                return Err(CompileError::at(
                    target.pos,
                    "only variables and their swizzles can be assigned",
                ))
            }
        };

        let Some(local) = frame.lookup(name) else {
            let message = if self.uniform(name).is_some() {
                format!("cannot assign to uniform '{name}'")
            } else {
                format!("unknown identifier '{name}'")
            };
            return Err(CompileError::at(target.pos, message));
        };
        if local.is_const {
            return Err(CompileError::at(
                target.pos,
                format!("cannot assign to constant '{name}'"),
            ));
        }

        match field {
            None => Ok((
                Place {
                    slot: local.slot,
                    swizzle: None,
                },
                local.ty,
            )),
            Some(field) => {
                let width = local.ty.width().ok_or_else(|| {
                    CompileError::at(target.pos, format!("type {} has no field '{field}'", local.ty))
                })?;
                let swizzle = parse_swizzle(field, width, target.pos)?;
                let lanes: Vec<usize> = swizzle.iter().collect();
                if (1..lanes.len()).any(|i| lanes[..i].contains(&lanes[i])) {
                    return Err(CompileError::at(
                        target.pos,
                        format!("swizzle '{field}' repeats a component and cannot be assigned"),
                    ));
                }
                Ok((
                    Place {
                        slot: local.slot,
                        swizzle: Some(swizzle),
                    },
                    Type::Float(swizzle.len),
                ))
            }
        }
    }

    fn call(
        &mut self,
        name: &str,
        args: &[ast::Expr],
        pos: Pos,
        frame: &mut Frame<'_>,
    ) -> CompileResult<(ir::Expr, Type)> {
        let mut lowered = Vec::with_capacity(args.len());
        let mut types = Vec::with_capacity(args.len());
        for arg in args {
            let (expr, ty) = self.expr(arg, frame)?;
            lowered.push(expr);
            types.push(ty);
        }

        if let Some(ty) = Type::from_keyword(name) {
            let width = constructor_width(name, ty, &types).map_err(|message| CompileError::at(pos, message))?;
            return Ok((
                ir::Expr::Construct {
                    width,
                    args: lowered,
                },
                Type::Float(width),
            ));
        }

        if let Some(builtin) = Builtin::from_name(name) {
            let ty = builtin
                .result_type(name, &types)
                .map_err(|message| CompileError::at(pos, message))?;
            return Ok((ir::Expr::Builtin(builtin, lowered), ty));
        }

        let Some(index) = self.signatures.iter().position(|sig| sig.name == name) else {
            let message = if name == frame.name {
                format!("'{name}' cannot call itself; recursion is not supported")
            } else {
                format!("unknown function '{name}'")
            };
            return Err(CompileError::at(pos, message));
        };
        let signature = &self.signatures[index];
        if signature.params != types {
            let expected: Vec<String> = signature.params.iter().map(ToString::to_string).collect();
            let found: Vec<String> = types.iter().map(ToString::to_string).collect();
            return Err(CompileError::at(
                pos,
                format!(
                    "'{name}' expects ({}), found ({})",
                    expected.join(", "),
                    found.join(", ")
                ),
            ));
        }
        Ok((ir::Expr::Call(index, lowered), signature.ret))
    }

    fn sample(
        &mut self,
        receiver: &ast::Expr,
        method: &str,
        args: &[ast::Expr],
        pos: Pos,
        frame: &mut Frame<'_>,
    ) -> CompileResult<(ir::Expr, Type)> {
        let shader = match &receiver.kind {
            ExprKind::Ident(name) if frame.lookup(name).is_none() => self
                .uniform(name)
                .filter(|(_, decl)| decl.ty == UniformType::Shader)
                .map(|(index, _)| index),
            _ => None,
        };
        let Some(uniform) = shader else {
            return Err(CompileError::at(
                pos,
                format!("method '{method}' can only be called on a shader uniform"),
            ));
        };
        if method != "eval" {
            return Err(CompileError::at(
                pos,
                format!("shader uniforms only support 'eval', found '{method}'"),
            ));
        }
        let [coord] = args else {
            return Err(CompileError::at(pos, "'eval' expects exactly one float2 coordinate"));
        };
        let (coord, ty) = self.expr(coord, frame)?;
        expect_type(Type::VEC2, ty, pos, "eval coordinate")?;
        Ok((
            ir::Expr::Sample {
                uniform,
                coord: Box::new(coord),
            },
            Type::VEC4,
        ))
    }
}

fn expect_type(expected: Type, found: Type, pos: Pos, what: &str) -> CompileResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(CompileError::at(
            pos,
            format!("{what} has type {found}, expected {expected}"),
        ))
    }
}

fn binary_type(op: BinaryOp, lhs: Type, rhs: Type) -> Result<Type, String> {
    if op.is_arithmetic() {
        return match (lhs, rhs) {
            (Type::Float(a), Type::Float(b)) if a == b || a == 1 || b == 1 => Ok(Type::Float(a.max(b))),
            _ => Err(format!("cannot apply arithmetic to {lhs} and {rhs}")),
        };
    }
    match op {
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            if lhs == Type::SCALAR && rhs == Type::SCALAR {
                Ok(Type::Bool)
            } else {
                Err(format!("comparison requires float operands, found {lhs} and {rhs}"))
            }
        }
        BinaryOp::Eq | BinaryOp::NotEq => {
            if lhs == rhs && matches!(lhs, Type::Bool | Type::Float(_)) {
                Ok(Type::Bool)
            } else {
                Err(format!("cannot compare {lhs} with {rhs}"))
            }
        }
        _ => {
            if lhs == Type::Bool && rhs == Type::Bool {
                Ok(Type::Bool)
            } else {
                Err(format!("logical operators require bool operands, found {lhs} and {rhs}"))
            }
        }
    }
}

fn constructor_width(name: &str, ty: Type, args: &[Type]) -> Result<u8, String> {
    let Type::Float(width) = ty else {
        return Err(format!("'{name}' cannot be constructed"));
    };
    if args.is_empty() {
        return Err(format!("'{name}' constructor needs at least one argument"));
    }
    if let Some(bad) = args.iter().find(|arg| !arg.is_numeric()) {
        return Err(format!("'{name}' constructor expects float arguments, found {bad}"));
    }
    if args.len() == 1 && args[0] == Type::SCALAR {
        return Ok(width);
    }

    let total: usize = args.iter().filter_map(|arg| arg.width()).map(usize::from).sum();
    let last = args
        .last()
        .and_then(|arg| arg.width())
        .map(usize::from)
        .unwrap_or(0);
    let wanted = usize::from(width);
    if total < wanted {
        return Err(format!(
            "'{name}' constructor needs {wanted} components, found {total}"
        ));
    }
    if total - last >= wanted {
        return Err(format!("too many arguments to '{name}' constructor"));
    }
    Ok(width)
}

fn parse_swizzle(name: &str, width: u8, pos: Pos) -> CompileResult<Swizzle> {
    const SETS: [&str; 3] = ["xyzw", "rgba", "stpq"];
    let len = name.len();
    if !(1..=4).contains(&len) {
        return Err(CompileError::at(pos, format!("invalid swizzle '{name}'")));
    }
    let set = SETS
        .iter()
        .find(|set| name.chars().all(|ch| set.contains(ch)))
        .ok_or_else(|| CompileError::at(pos, format!("invalid swizzle '{name}'")))?;

    let mut lanes = [0u8; 4];
    for (slot, ch) in lanes.iter_mut().zip(name.chars()) {
        let lane = set.find(ch).unwrap_or_default() as u8;
        if lane >= width {
            return Err(CompileError::at(
                pos,
                format!("swizzle '{name}' reads past the end of a {}-component value", width),
            ));
        }
        *slot = lane;
    }
    Ok(Swizzle {
        len: len as u8,
        lanes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn check_source(source: &str) -> CompileResult<Checked> {
        check(parse(tokenize(source)?)?)
    }

    const MAIN: &str = "half4 main(float2 p) { return half4(0.0); }";

    fn nested_loops(depth: usize) -> String {
        let mut source = String::from("half4 main(float2 p) {\n");
        for _ in 0..depth {
            source.push_str("for (;;) {\n");
        }
        source.push_str("break;\n");
        for _ in 0..depth {
            source.push_str("}\n");
        }
        source.push_str("return half4(0.0);\n}\n");
        source
    }

    #[test]
    fn limits_loop_nesting_at_the_offending_for() {
        check_source(&nested_loops(MAX_LOOP_NESTING)).expect("check");
        let err = check_source(&nested_loops(MAX_LOOP_NESTING + 1)).unwrap_err();
        assert!(err.message.contains("nested"), "{err}");
        assert_eq!((err.line as usize, err.column), (MAX_LOOP_NESTING + 2, 1));
    }

    #[test]
    fn collects_uniforms_in_source_order() {
        let checked = check_source(&format!(
            "uniform float2 iResolution;\nuniform float iTime;\nlayout(color) uniform half4 iColor;\nuniform shader child;\n{MAIN}"
        ))
        .expect("check");
        let names: Vec<&str> = checked.uniforms.iter().map(|decl| decl.name.as_str()).collect();
        assert_eq!(names, ["iResolution", "iTime", "iColor", "child"]);
        assert!(checked.uniforms[2].color_managed);
        assert_eq!(checked.uniforms[3].ty, UniformType::Shader);
    }

    #[test]
    fn rejects_unsupported_uniform_type() {
        let err = check_source(&format!("uniform float3 tint;\n{MAIN}")).unwrap_err();
        assert_eq!((err.line, err.column), (1, 16));
        assert!(err.message.contains("float3"));
    }

    #[test]
    fn rejects_layout_color_on_scalar() {
        let err = check_source(&format!("layout(color) uniform float level;\n{MAIN}")).unwrap_err();
        assert!(err.message.contains("layout(color)"));
    }

    #[test]
    fn requires_main_entry_point() {
        let err = check_source("float helper() { return 1.0; }").unwrap_err();
        assert!(err.message.contains("main"));
    }

    #[test]
    fn rejects_wrong_main_signature() {
        let err = check_source("half4 main(float x) { return half4(x); }").unwrap_err();
        assert_eq!((err.line, err.column), (1, 7));
    }

    #[test]
    fn reports_type_mismatch_in_initializer() {
        let err = check_source("half4 main(float2 p) {\n    float x = p;\n    return half4(x);\n}")
            .unwrap_err();
        assert_eq!((err.line, err.column), (2, 15));
        assert!(err.message.contains("float2"));
    }

    #[test]
    fn rejects_assignment_to_uniform_and_constant() {
        let err = check_source("uniform float iTime;\nhalf4 main(float2 p) { iTime = 1.0; return half4(0.0); }")
            .unwrap_err();
        assert!(err.message.contains("cannot assign to uniform"));

        let err = check_source("half4 main(float2 p) { const float k = 1.0; k += 1.0; return half4(k); }")
            .unwrap_err();
        assert!(err.message.contains("constant"));
    }

    #[test]
    fn rejects_recursion() {
        let err = check_source(&format!("float f(float x) {{ return f(x); }}\n{MAIN}")).unwrap_err();
        assert!(err.message.contains("recursion"));
    }

    #[test]
    fn shader_uniforms_require_eval() {
        let err = check_source("uniform shader child;\nhalf4 main(float2 p) { return child; }").unwrap_err();
        assert!(err.message.contains("child.eval"));
    }

    #[test]
    fn eval_is_only_valid_on_shader_uniforms() {
        let err = check_source("uniform float2 iResolution;\nhalf4 main(float2 p) { return iResolution.eval(p); }")
            .unwrap_err();
        assert!(err.message.contains("shader uniform"));
    }

    #[test]
    fn swizzle_assignment_rejects_repeats() {
        let err = check_source("half4 main(float2 p) { float2 uv = p; uv.xx = p; return half4(uv, 0.0, 1.0); }")
            .unwrap_err();
        assert!(err.message.contains("repeats"));
    }

    #[test]
    fn constructor_component_counts_are_checked() {
        assert!(check_source("half4 main(float2 p) { return half4(p, 1.0); }").is_err());
        assert!(check_source("half4 main(float2 p) { return half4(p, p, 1.0); }").is_err());
        assert!(check_source("half4 main(float2 p) { return half4(p, 0.0, 1.0); }").is_ok());
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let err = check_source("half4 main(float2 p) { break; return half4(0.0); }").unwrap_err();
        assert!(err.message.contains("inside a loop"));
    }
}
