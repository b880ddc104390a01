//! # Expression Parser
//!
//! Parses expressions with operator-precedence climbing, a postfix chain for
//! calls, field access, indexing, method calls, and the `?` error-propagation
//! operator, and the primary forms (literals, identifiers, `new`, array and
//! tuple literals, parenthesized expressions).

use crate::ast::nodes::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::compiler::error::CompileError;
use crate::compiler::lexer::TokenKind;
use crate::compiler::parser::common::Parser;

/// A static utility struct dedicated to parsing expressions.
pub struct ExpressionParser;

impl ExpressionParser {
    /// The entry point for parsing any expression.
    pub fn parse_expression(parser: &mut Parser) -> Result<Expr, CompileError> {
        Self::parse_binary(parser, 0)
    }

    /// Precedence-climbing loop. Left-associativity falls out of re-entering
    /// with `precedence + 1` on the right-hand side.
    fn parse_binary(parser: &mut Parser, min_precedence: u8) -> Result<Expr, CompileError> {
        let mut left = Self::parse_unary(parser)?;

        while let Some(op) = Self::binary_op(parser.kind()) {
            let precedence = Self::precedence(op);
            if precedence < min_precedence {
                break;
            }
            parser.advance();
            let right = Self::parse_binary(parser, precedence + 1)?;
            let (line, column) = (left.line, left.column);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                line,
                column,
            );
        }

        Ok(left)
    }

    /// Maps the current token to a binary operator, if it is one.
    fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
        match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::Percent => Some(BinaryOp::Mod),
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::Ne => Some(BinaryOp::Ne),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Ge => Some(BinaryOp::Ge),
            TokenKind::AndAnd => Some(BinaryOp::And),
            TokenKind::OrOr => Some(BinaryOp::Or),
            _ => None,
        }
    }

    /// Precedence levels, lowest binds loosest: `||` < `&&` < equality <
    /// ordering < additive < multiplicative.
    fn precedence(op: BinaryOp) -> u8 {
        match op {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne => 3,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
        }
    }

    /// Unary operators: `+ - !` plus address-of `&` and dereference `*`.
    fn parse_unary(parser: &mut Parser) -> Result<Expr, CompileError> {
        let token = parser.peek().clone();
        match token.kind {
            TokenKind::Minus => {
                parser.advance();
                let operand = Self::parse_unary(parser)?;
                Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                    token.line,
                    token.column,
                ))
            }
            TokenKind::Plus => {
                parser.advance();
                let operand = Self::parse_unary(parser)?;
                Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Pos,
                        operand: Box::new(operand),
                    },
                    token.line,
                    token.column,
                ))
            }
            TokenKind::Not => {
                parser.advance();
                let operand = Self::parse_unary(parser)?;
                Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                    token.line,
                    token.column,
                ))
            }
            TokenKind::Amp => {
                parser.advance();
                let operand = Self::parse_unary(parser)?;
                Ok(Expr::new(
                    ExprKind::AddressOf(Box::new(operand)),
                    token.line,
                    token.column,
                ))
            }
            TokenKind::Star => {
                parser.advance();
                let operand = Self::parse_unary(parser)?;
                Ok(Expr::new(
                    ExprKind::Dereference(Box::new(operand)),
                    token.line,
                    token.column,
                ))
            }
            _ => Self::parse_postfix(parser),
        }
    }

    /// Postfix chain: `.field`, `.method(args)`, `[index]`, and `?`, applied
    /// left to right on top of a primary expression.
    pub fn parse_postfix(parser: &mut Parser) -> Result<Expr, CompileError> {
        let mut node = Self::parse_primary(parser)?;

        loop {
            match parser.kind() {
                TokenKind::Dot => {
                    parser.advance();
                    let name_tok = parser.expect(TokenKind::Identifier)?;
                    let name = name_tok.text().to_string();
                    if parser.check(TokenKind::LParen) {
                        let args = Self::parse_arguments(parser)?;
                        node = Expr::new(
                            ExprKind::MethodCall {
                                receiver: Box::new(node),
                                method: name,
                                args,
                            },
                            name_tok.line,
                            name_tok.column,
                        );
                    } else if let ExprKind::Identifier(base) = &node.kind {
                        if parser.enum_names.contains(base) {
                            node = Expr::new(
                                ExprKind::EnumAccess {
                                    enum_name: base.clone(),
                                    variant: name,
                                },
                                node.line,
                                node.column,
                            );
                        } else {
                            node = Expr::new(
                                ExprKind::FieldAccess {
                                    receiver: Box::new(node),
                                    field: name,
                                },
                                name_tok.line,
                                name_tok.column,
                            );
                        }
                    } else {
                        node = Expr::new(
                            ExprKind::FieldAccess {
                                receiver: Box::new(node),
                                field: name,
                            },
                            name_tok.line,
                            name_tok.column,
                        );
                    }
                }
                TokenKind::LBracket => {
                    let bracket = parser.advance();
                    let index = Self::parse_expression(parser)?;
                    parser.expect(TokenKind::RBracket)?;
                    node = Expr::new(
                        ExprKind::Index {
                            receiver: Box::new(node),
                            index: Box::new(index),
                        },
                        bracket.line,
                        bracket.column,
                    );
                }
                TokenKind::Question => {
                    let question = parser.advance();
                    node = Expr::new(
                        ExprKind::Try(Box::new(node)),
                        question.line,
                        question.column,
                    );
                }
                _ => break,
            }
        }

        Ok(node)
    }

    /// Parses a parenthesized, comma-separated argument list.
    fn parse_arguments(parser: &mut Parser) -> Result<Vec<Expr>, CompileError> {
        parser.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !parser.check(TokenKind::RParen) {
            args.push(Self::parse_expression(parser)?);
            while parser.check(TokenKind::Comma) {
                parser.advance();
                args.push(Self::parse_expression(parser)?);
            }
        }
        parser.expect(TokenKind::RParen)?;
        Ok(args)
    }

    /// Primary expressions: literals, identifiers (and calls), `self`,
    /// `null`, `new`, array literals, and parenthesized/tuple expressions.
    fn parse_primary(parser: &mut Parser) -> Result<Expr, CompileError> {
        let token = parser.peek().clone();
        match token.kind {
            TokenKind::Integer => {
                parser.advance();
                Ok(Expr::new(
                    ExprKind::IntLiteral(token.int_value.unwrap_or(0)),
                    token.line,
                    token.column,
                ))
            }
            TokenKind::Decimal => {
                parser.advance();
                Ok(Expr::new(
                    ExprKind::DecLiteral(token.dec_value.unwrap_or(0.0)),
                    token.line,
                    token.column,
                ))
            }
            TokenKind::Str => {
                parser.advance();
                Ok(Expr::new(
                    ExprKind::StrLiteral(token.text().to_string()),
                    token.line,
                    token.column,
                ))
            }
            TokenKind::InterpStr => {
                parser.advance();
                Ok(Expr::new(
                    ExprKind::InterpString(token.parts.clone()),
                    token.line,
                    token.column,
                ))
            }
            TokenKind::True => {
                parser.advance();
                Ok(Expr::new(
                    ExprKind::BoolLiteral(true),
                    token.line,
                    token.column,
                ))
            }
            TokenKind::False => {
                parser.advance();
                Ok(Expr::new(
                    ExprKind::BoolLiteral(false),
                    token.line,
                    token.column,
                ))
            }
            TokenKind::Null => {
                parser.advance();
                Ok(Expr::new(ExprKind::NullLiteral, token.line, token.column))
            }
            TokenKind::SelfKw => {
                parser.advance();
                Ok(Expr::new(ExprKind::SelfExpr, token.line, token.column))
            }
            TokenKind::New => Self::parse_new(parser),
            TokenKind::LBracket => {
                parser.advance();
                let mut elements = Vec::new();
                parser.skip_newlines();
                if !parser.check(TokenKind::RBracket) {
                    elements.push(Self::parse_expression(parser)?);
                    while parser.check(TokenKind::Comma) {
                        parser.advance();
                        parser.skip_newlines();
                        elements.push(Self::parse_expression(parser)?);
                    }
                }
                parser.skip_newlines();
                parser.expect(TokenKind::RBracket)?;
                Ok(Expr::new(
                    ExprKind::ArrayLiteral(elements),
                    token.line,
                    token.column,
                ))
            }
            TokenKind::LParen => {
                parser.advance();
                let first = Self::parse_expression(parser)?;
                if parser.check(TokenKind::Comma) {
                    // A following comma turns the parenthesis into a tuple literal.
                    let mut elements = vec![first];
                    while parser.check(TokenKind::Comma) {
                        parser.advance();
                        elements.push(Self::parse_expression(parser)?);
                    }
                    parser.expect(TokenKind::RParen)?;
                    Ok(Expr::new(
                        ExprKind::TupleLiteral(elements),
                        token.line,
                        token.column,
                    ))
                } else {
                    parser.expect(TokenKind::RParen)?;
                    Ok(first)
                }
            }
            TokenKind::Identifier => {
                parser.advance();
                let name = token.text().to_string();
                if parser.check(TokenKind::LParen) {
                    let args = Self::parse_arguments(parser)?;
                    Ok(Expr::new(
                        ExprKind::Call { name, args },
                        token.line,
                        token.column,
                    ))
                } else {
                    Ok(Expr::new(
                        ExprKind::Identifier(name),
                        token.line,
                        token.column,
                    ))
                }
            }
            other => Err(CompileError::parse(
                format!("Expected expression, found {:?}", other),
                token.line,
                token.column,
            )),
        }
    }

    /// Parses `new Name[<T, ...>] [{ field: value, ... }]`.
    fn parse_new(parser: &mut Parser) -> Result<Expr, CompileError> {
        let new_tok = parser.expect(TokenKind::New)?;
        let name = parser.expect(TokenKind::Identifier)?.text().to_string();

        let mut type_args = Vec::new();
        if parser.check(TokenKind::Lt) {
            parser.advance();
            type_args.push(parser.parse_type()?);
            while parser.check(TokenKind::Comma) {
                parser.advance();
                type_args.push(parser.parse_type()?);
            }
            parser.expect(TokenKind::Gt)?;
        }

        let mut initializers = Vec::new();
        if parser.check(TokenKind::LBrace) {
            parser.advance();
            parser.skip_newlines();
            while !parser.check(TokenKind::RBrace) {
                let field = parser.expect(TokenKind::Identifier)?.text().to_string();
                parser.expect(TokenKind::Colon)?;
                let value = Self::parse_expression(parser)?;
                initializers.push((field, value));
                parser.skip_newlines();
                if parser.check(TokenKind::Comma) {
                    parser.advance();
                    parser.skip_newlines();
                }
            }
            parser.expect(TokenKind::RBrace)?;
        }

        Ok(Expr::new(
            ExprKind::New {
                struct_name: name,
                type_args,
                initializers,
            },
            new_tok.line,
            new_tok.column,
        ))
    }
}
