//! Recursive-descent parser from tokens to [`crate::ast`].

use crate::ast::{BinaryOp, Expr, ExprKind, FunctionDef, Module, Param, Stmt, UnaryOp, UniformDef, VarDecl};
use crate::error::{CompileError, CompileResult, Pos};
use crate::lexer::{Punct, Token, TokenKind};
use crate::types::Type;

pub(crate) fn parse(tokens: Vec<Token>) -> CompileResult<Module> {
    Parser { tokens, cursor: 0 }.module()
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.cursor.min(last)]
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.cursor + offset).min(last)].kind
    }

    fn pos(&self) -> Pos {
        self.peek().pos
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
        token
    }

    fn at_punct(&self, punct: Punct) -> bool {
        matches!(self.peek().kind, TokenKind::Punct(p) if p == punct)
    }

    fn at_word(&self, word: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(ident) if ident == word)
    }

    fn eat_punct(&mut self, punct: Punct) -> bool {
        if self.at_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: Punct) -> CompileResult<Pos> {
        if self.at_punct(punct) {
            Ok(self.advance().pos)
        } else {
            Err(self.unexpected(&format!("'{}'", punct.as_str())))
        }
    }

    fn expect_ident(&mut self, what: &str) -> CompileResult<(String, Pos)> {
        match &self.peek().kind {
            TokenKind::Ident(name) if !is_reserved(name) => {
                let name = name.clone();
                let pos = self.advance().pos;
                Ok((name, pos))
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        let token = self.peek();
        let found = match &token.kind {
            TokenKind::Ident(name) => format!("'{name}'"),
            TokenKind::Number(value) => format!("number {value}"),
            TokenKind::Punct(punct) => format!("'{}'", punct.as_str()),
            TokenKind::Eof => "end of input".to_string(),
        };
        CompileError::at(token.pos, format!("expected {expected}, found {found}"))
    }

    /// Parses a type keyword if one is next.
    fn type_keyword(&self) -> Option<Type> {
        match &self.peek().kind {
            TokenKind::Ident(word) => Type::from_keyword(word),
            _ => None,
        }
    }

    fn expect_type(&mut self) -> CompileResult<Type> {
        match self.type_keyword() {
            Some(ty) => {
                self.advance();
                Ok(ty)
            }
            None => Err(self.unexpected("a type")),
        }
    }

    fn module(mut self) -> CompileResult<Module> {
        let mut uniforms = Vec::new();
        let mut functions = Vec::new();

        while !matches!(self.peek().kind, TokenKind::Eof) {
            if self.at_word("layout") || self.at_word("uniform") {
                uniforms.push(self.uniform()?);
            } else if self.type_keyword().is_some() {
                functions.push(self.function()?);
            } else {
                return Err(self.unexpected("a uniform declaration or function definition"));
            }
        }

        Ok(Module {
            uniforms,
            functions,
        })
    }

    fn uniform(&mut self) -> CompileResult<UniformDef> {
        let mut layout_color = false;
        if self.eat_word("layout") {
            self.expect_punct(Punct::LParen)?;
            let (qualifier, pos) = self.expect_ident("a layout qualifier")?;
            if qualifier != "color" {
                return Err(CompileError::at(
                    pos,
                    format!("unsupported layout qualifier '{qualifier}'"),
                ));
            }
            self.expect_punct(Punct::RParen)?;
            layout_color = true;
        }

        if !self.eat_word("uniform") {
            return Err(self.unexpected("'uniform'"));
        }
        let ty = self.expect_type()?;
        let (name, pos) = self.expect_ident("a uniform name")?;
        self.expect_punct(Punct::Semicolon)?;
        Ok(UniformDef {
            name,
            ty,
            layout_color,
            pos,
        })
    }

    fn function(&mut self) -> CompileResult<FunctionDef> {
        let ret = self.expect_type()?;
        let (name, pos) = self.expect_ident("a function name")?;
        self.expect_punct(Punct::LParen)?;

        let mut params = Vec::new();
        if !self.at_punct(Punct::RParen) {
            loop {
                params.push(self.param()?);
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen)?;

        let body = self.block()?;
        Ok(FunctionDef {
            name,
            ret,
            params,
            body,
            pos,
        })
    }

    fn param(&mut self) -> CompileResult<Param> {
        if self.at_word("out") || self.at_word("inout") {
            return Err(CompileError::at(
                self.pos(),
                "out and inout parameters are not supported",
            ));
        }
        self.eat_word("in");
        let ty = self.expect_type()?;
        let (name, pos) = self.expect_ident("a parameter name")?;
        Ok(Param { name, ty, pos })
    }

    fn block(&mut self) -> CompileResult<Vec<Stmt>> {
        self.expect_punct(Punct::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at_punct(Punct::RBrace) {
            if matches!(self.peek().kind, TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            stmts.push(self.statement()?);
        }
        self.advance();
        Ok(stmts)
    }

    fn starts_declaration(&self) -> bool {
        if self.at_word("const") {
            return true;
        }
        self.type_keyword().is_some() && matches!(self.peek_at(1), TokenKind::Ident(_))
    }

    fn statement(&mut self) -> CompileResult<Stmt> {
        let pos = self.pos();
        if self.at_punct(Punct::LBrace) {
            return Ok(Stmt::Block(self.block()?));
        }
        if self.eat_punct(Punct::Semicolon) {
            return Ok(Stmt::Empty);
        }
        if self.eat_word("if") {
            self.expect_punct(Punct::LParen)?;
            let cond = self.expression()?;
            self.expect_punct(Punct::RParen)?;
            let then = Box::new(self.statement()?);
            let otherwise = if self.eat_word("else") {
                Some(Box::new(self.statement()?))
            } else {
                None
            };
            return Ok(Stmt::If {
                cond,
                then,
                otherwise,
            });
        }
        if self.eat_word("for") {
            return self.for_statement(pos);
        }
        if self.eat_word("return") {
            let value = if self.at_punct(Punct::Semicolon) {
                None
            } else {
                Some(self.expression()?)
            };
            self.expect_punct(Punct::Semicolon)?;
            return Ok(Stmt::Return { value, pos });
        }
        if self.eat_word("break") {
            self.expect_punct(Punct::Semicolon)?;
            return Ok(Stmt::Break(pos));
        }
        if self.eat_word("continue") {
            self.expect_punct(Punct::Semicolon)?;
            return Ok(Stmt::Continue(pos));
        }
        if self.at_word("while") || self.at_word("do") {
            return Err(CompileError::at(
                pos,
                "only bounded 'for' loops are supported",
            ));
        }
        if self.starts_declaration() {
            let decl = self.declaration()?;
            self.expect_punct(Punct::Semicolon)?;
            return Ok(decl);
        }

        let expr = self.expression()?;
        self.expect_punct(Punct::Semicolon)?;
        Ok(Stmt::Expr(expr))
    }

    fn for_statement(&mut self, pos: Pos) -> CompileResult<Stmt> {
        self.expect_punct(Punct::LParen)?;
        let init = if self.eat_punct(Punct::Semicolon) {
            None
        } else if self.starts_declaration() {
            let decl = self.declaration()?;
            self.expect_punct(Punct::Semicolon)?;
            Some(Box::new(decl))
        } else {
            let expr = self.expression()?;
            self.expect_punct(Punct::Semicolon)?;
            Some(Box::new(Stmt::Expr(expr)))
        };

        let cond = if self.at_punct(Punct::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(Punct::Semicolon)?;

        let step = if self.at_punct(Punct::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(Punct::RParen)?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            cond,
            step,
            body,
            pos,
        })
    }

    fn declaration(&mut self) -> CompileResult<Stmt> {
        let is_const = self.eat_word("const");
        let ty = self.expect_type()?;
        let mut vars = Vec::new();
        loop {
            let (name, pos) = self.expect_ident("a variable name")?;
            let init = if self.eat_punct(Punct::Assign) {
                Some(self.ternary()?)
            } else {
                None
            };
            vars.push(VarDecl { name, init, pos });
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        Ok(Stmt::Decl { ty, is_const, vars })
    }

    pub(crate) fn expression(&mut self) -> CompileResult<Expr> {
        let target = self.ternary()?;
        let op = match self.peek().kind {
            TokenKind::Punct(Punct::Assign) => None,
            TokenKind::Punct(Punct::PlusAssign) => Some(BinaryOp::Add),
            TokenKind::Punct(Punct::MinusAssign) => Some(BinaryOp::Sub),
            TokenKind::Punct(Punct::StarAssign) => Some(BinaryOp::Mul),
            TokenKind::Punct(Punct::SlashAssign) => Some(BinaryOp::Div),
            _ => return Ok(target),
        };
        let pos = self.advance().pos;
        let value = self.expression()?;
        Ok(Expr {
            kind: ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            pos,
        })
    }

    fn ternary(&mut self) -> CompileResult<Expr> {
        let cond = self.binary(0)?;
        if !self.at_punct(Punct::Question) {
            return Ok(cond);
        }
        let pos = self.advance().pos;
        let then = self.expression()?;
        self.expect_punct(Punct::Colon)?;
        let otherwise = self.ternary()?;
        Ok(Expr {
            kind: ExprKind::Ternary(Box::new(cond), Box::new(then), Box::new(otherwise)),
            pos,
        })
    }

    /// Precedence climbing over the binary operator table.
    fn binary(&mut self, min_level: u8) -> CompileResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let Some((op, level)) = self.binary_op() else {
                break;
            };
            if level < min_level {
                break;
            }
            let pos = self.advance().pos;
            let rhs = self.binary(level + 1)?;
            lhs = Expr {
                kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
                pos,
            };
        }
        Ok(lhs)
    }

    fn binary_op(&self) -> Option<(BinaryOp, u8)> {
        let TokenKind::Punct(punct) = self.peek().kind else {
            return None;
        };
        let entry = match punct {
            Punct::OrOr => (BinaryOp::Or, 0),
            Punct::AndAnd => (BinaryOp::And, 1),
            Punct::Eq => (BinaryOp::Eq, 2),
            Punct::NotEq => (BinaryOp::NotEq, 2),
            Punct::Lt => (BinaryOp::Lt, 3),
            Punct::Le => (BinaryOp::Le, 3),
            Punct::Gt => (BinaryOp::Gt, 3),
            Punct::Ge => (BinaryOp::Ge, 3),
            Punct::Plus => (BinaryOp::Add, 4),
            Punct::Minus => (BinaryOp::Sub, 4),
            Punct::Star => (BinaryOp::Mul, 5),
            Punct::Slash => (BinaryOp::Div, 5),
            _ => return None,
        };
        Some(entry)
    }

    fn unary(&mut self) -> CompileResult<Expr> {
        let pos = self.pos();
        if self.eat_punct(Punct::Minus) {
            let operand = self.unary()?;
            return Ok(Expr {
                kind: ExprKind::Unary(UnaryOp::Neg, Box::new(operand)),
                pos,
            });
        }
        if self.eat_punct(Punct::Bang) {
            let operand = self.unary()?;
            return Ok(Expr {
                kind: ExprKind::Unary(UnaryOp::Not, Box::new(operand)),
                pos,
            });
        }
        if self.eat_punct(Punct::Plus) {
            return self.unary();
        }
        for (punct, delta) in [(Punct::PlusPlus, 1.0), (Punct::MinusMinus, -1.0)] {
            if self.eat_punct(punct) {
                let target = self.unary()?;
                return Ok(Expr {
                    kind: ExprKind::Step {
                        target: Box::new(target),
                        delta,
                        prefix: true,
                    },
                    pos,
                });
            }
        }
        self.postfix()
    }

    fn postfix(&mut self) -> CompileResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            let pos = self.pos();
            if self.eat_punct(Punct::Dot) {
                let (name, _) = self.expect_ident("a field or method name")?;
                if self.at_punct(Punct::LParen) {
                    let args = self.arguments()?;
                    expr = Expr {
                        kind: ExprKind::Method {
                            receiver: Box::new(expr),
                            method: name,
                            args,
                        },
                        pos,
                    };
                } else {
                    expr = Expr {
                        kind: ExprKind::Field {
                            base: Box::new(expr),
                            name,
                        },
                        pos,
                    };
                }
            } else if self.at_punct(Punct::PlusPlus) || self.at_punct(Punct::MinusMinus) {
                let delta = if self.at_punct(Punct::PlusPlus) {
                    1.0
                } else {
                    -1.0
                };
                self.advance();
                expr = Expr {
                    kind: ExprKind::Step {
                        target: Box::new(expr),
                        delta,
                        prefix: false,
                    },
                    pos,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn arguments(&mut self) -> CompileResult<Vec<Expr>> {
        self.expect_punct(Punct::LParen)?;
        let mut args = Vec::new();
        if !self.at_punct(Punct::RParen) {
            loop {
                args.push(self.expression()?);
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen)?;
        Ok(args)
    }

    fn primary(&mut self) -> CompileResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Number(value),
                    pos: token.pos,
                })
            }
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let inner = self.expression()?;
                self.expect_punct(Punct::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(ref word) if word == "true" || word == "false" => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Bool(word == "true"),
                    pos: token.pos,
                })
            }
            TokenKind::Ident(ref word)
                if matches!(self.peek_at(1), TokenKind::Punct(Punct::LParen))
                    && (Type::from_keyword(word).is_some() || !is_reserved(word)) =>
            {
                let name = word.clone();
                self.advance();
                let args = self.arguments()?;
                Ok(Expr {
                    kind: ExprKind::Call { name, args },
                    pos: token.pos,
                })
            }
            TokenKind::Ident(ref word) if !is_reserved(word) => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Ident(word.clone()),
                    pos: token.pos,
                })
            }
            _ => Err(self.unexpected("an expression")),
        }
    }
}

fn is_reserved(word: &str) -> bool {
    Type::from_keyword(word).is_some()
        || matches!(
            word,
            "uniform"
                | "layout"
                | "const"
                | "in"
                | "out"
                | "inout"
                | "if"
                | "else"
                | "for"
                | "while"
                | "do"
                | "return"
                | "break"
                | "continue"
                | "true"
                | "false"
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_source(source: &str) -> CompileResult<Module> {
        parse(tokenize(source)?)
    }

    #[test]
    fn parses_uniforms_with_layout_qualifier() {
        let module = parse_source(
            "uniform float2 iResolution;\nlayout(color) uniform half4 iColor;\nhalf4 main(float2 p) { return iColor; }",
        )
        .expect("parse");
        assert_eq!(module.uniforms.len(), 2);
        assert!(!module.uniforms[0].layout_color);
        assert!(module.uniforms[1].layout_color);
        assert_eq!(module.uniforms[1].ty, Type::VEC4);
        assert_eq!(module.functions[0].name, "main");
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let module = parse_source("float f() { return 1.0 + 2.0 * 3.0; }").expect("parse");
        let Stmt::Return {
            value: Some(expr), ..
        } = &module.functions[0].body[0]
        else {
            panic!("expected return statement");
        };
        let ExprKind::Binary(BinaryOp::Add, _, rhs) = &expr.kind else {
            panic!("expected addition at the root");
        };
        assert!(matches!(rhs.kind, ExprKind::Binary(BinaryOp::Mul, _, _)));
    }

    #[test]
    fn distinguishes_constructor_calls_from_declarations() {
        let module =
            parse_source("half4 main(float2 p) { float2 uv = p; float2(1.0, 2.0); return half4(uv, 0.0, 1.0); }")
                .expect("parse");
        let body = &module.functions[0].body;
        assert!(matches!(body[0], Stmt::Decl { .. }));
        assert!(matches!(body[1], Stmt::Expr(_)));
    }

    #[test]
    fn parses_for_loops_with_compound_step() {
        let module = parse_source(
            "float f() { float s = 0.0; for (float i = 1.0; i <= 8.0; i += 1.0) { s += i; } return s; }",
        )
        .expect("parse");
        assert!(matches!(module.functions[0].body[1], Stmt::For { .. }));
    }

    #[test]
    fn rejects_while_loops() {
        let err = parse_source("float f() { while (true) {} return 0.0; }").unwrap_err();
        assert!(err.message.contains("for"));
        assert_eq!((err.line, err.column), (1, 13));
    }

    #[test]
    fn reports_missing_semicolon_position() {
        let err = parse_source("uniform float iTime\nhalf4 main(float2 p) { return half4(0.0); }")
            .unwrap_err();
        assert_eq!((err.line, err.column), (2, 1));
        assert!(err.message.contains("';'"));
    }

    #[test]
    fn rejects_out_parameters() {
        let err = parse_source("void mainImage(out vec4 c, in vec2 p) {}").unwrap_err();
        assert!(err.message.contains("out"));
    }
}
