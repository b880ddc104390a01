//! # Statement Parser
//!
//! Parses high-level constructs: declarations (`var`, `let [mut]`, tuple
//! unpacking), assignments, control flow (`if`/`elif`/`else`, `while`,
//! `for .. in start..end`), `return`, `defer`, and expression statements.
//!
//! A terminating semicolon is required for every statement except
//! block-terminated constructs.

use crate::ast::nodes::{Block, Expr, ExprKind, Stmt, StmtKind};
use crate::ast::types::Type;
use crate::compiler::error::CompileError;
use crate::compiler::lexer::TokenKind;
use crate::compiler::parser::common::Parser;
use crate::compiler::parser::declaration_parser::DeclarationParser;
use crate::compiler::parser::expression_parser::ExpressionParser;

/// A static utility struct dedicated to parsing statements.
pub struct StatementParser;

impl StatementParser {
    /// Parses the next statement, or `None` for an empty statement.
    pub fn parse_statement(parser: &mut Parser) -> Result<Option<Stmt>, CompileError> {
        // Empty statement
        if parser.check(TokenKind::Semicolon) {
            parser.advance();
            return Ok(None);
        }

        let stmt = match parser.kind() {
            TokenKind::Var => Self::parse_var_decl(parser)?,
            TokenKind::Let => Self::parse_let_decl(parser)?,
            TokenKind::Function => DeclarationParser::parse_function_keyword(parser)?,
            TokenKind::Struct => DeclarationParser::parse_struct(parser)?,
            TokenKind::Enum => DeclarationParser::parse_enum(parser)?,
            TokenKind::Interface => DeclarationParser::parse_interface(parser)?,
            TokenKind::Return => Self::parse_return(parser)?,
            TokenKind::Defer => Self::parse_defer(parser)?,
            TokenKind::If => Self::parse_if(parser)?,
            TokenKind::While => Self::parse_while(parser)?,
            TokenKind::For => Self::parse_for(parser)?,
            TokenKind::Identifier if parser.looks_like_function_def() => {
                DeclarationParser::parse_function_shorthand(parser)?
            }
            TokenKind::Identifier => Self::parse_assignment_or_call(parser)?,
            other => {
                return Err(parser.error_here(format!("Unexpected token {:?}", other)));
            }
        };

        if !stmt.is_block_terminated() {
            if !parser.check(TokenKind::Semicolon) {
                return Err(parser.error_here(format!(
                    "Expected ';' after statement starting at line {}",
                    stmt.line
                )));
            }
            parser.expect(TokenKind::Semicolon)?;
        }

        Ok(Some(stmt))
    }

    /// Parses a braced block.
    pub fn parse_block(parser: &mut Parser) -> Result<Block, CompileError> {
        let open = parser.expect(TokenKind::LBrace)?;
        parser.skip_newlines();

        let mut block = Block {
            statements: Vec::new(),
            line: open.line,
            column: open.column,
        };
        while !parser.check(TokenKind::RBrace) && !parser.is_at_end() {
            if let Some(stmt) = Self::parse_statement(parser)? {
                block.statements.push(stmt);
            }
            parser.skip_newlines();
        }
        parser.expect(TokenKind::RBrace)?;
        Ok(block)
    }

    /// Parses `var` declarations: a single binding with an optional type and
    /// initializer, or a tuple-unpacking list of bindings.
    fn parse_var_decl(parser: &mut Parser) -> Result<Stmt, CompileError> {
        let var_tok = parser.expect(TokenKind::Var)?;

        let mut names = Vec::new();
        let mut types: Vec<Option<Type>> = Vec::new();
        loop {
            let ty = if parser.at_type_then_name() {
                Some(parser.parse_type()?)
            } else {
                None
            };
            let name = parser.expect(TokenKind::Identifier)?.text().to_string();
            names.push(name);
            types.push(ty);
            if parser.check(TokenKind::Comma) {
                parser.advance();
            } else {
                break;
            }
        }

        if names.len() > 1 {
            parser.expect(TokenKind::Assign)?;
            let value = ExpressionParser::parse_expression(parser)?;
            return Ok(Stmt::new(
                StmtKind::TupleUnpack {
                    names,
                    types,
                    value,
                    mutable: true,
                },
                var_tok.line,
                var_tok.column,
            ));
        }

        let value = if parser.check(TokenKind::Assign) {
            parser.advance();
            Some(ExpressionParser::parse_expression(parser)?)
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::VarDecl {
                name: names.pop().unwrap(),
                ty: types.pop().unwrap(),
                value,
                mutable: true,
            },
            var_tok.line,
            var_tok.column,
        ))
    }

    /// Parses `let [mut] name [: type] [= value];` — immutable by default.
    fn parse_let_decl(parser: &mut Parser) -> Result<Stmt, CompileError> {
        let let_tok = parser.expect(TokenKind::Let)?;
        let mutable = if parser.check(TokenKind::Mut) {
            parser.advance();
            true
        } else {
            false
        };

        let name = parser.expect(TokenKind::Identifier)?.text().to_string();

        let ty = if parser.check(TokenKind::Colon) {
            parser.advance();
            Some(parser.parse_type()?)
        } else {
            None
        };

        let value = if parser.check(TokenKind::Assign) {
            parser.advance();
            Some(ExpressionParser::parse_expression(parser)?)
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::VarDecl {
                name,
                ty,
                value,
                mutable,
            },
            let_tok.line,
            let_tok.column,
        ))
    }

    /// Parses a statement starting with an identifier: an expression
    /// statement (call or method call, optionally with `?`) or an assignment
    /// to an identifier, field, or index target.
    fn parse_assignment_or_call(parser: &mut Parser) -> Result<Stmt, CompileError> {
        let lhs = ExpressionParser::parse_postfix(parser)?;

        let is_call_like = matches!(
            lhs.kind,
            ExprKind::Call { .. } | ExprKind::MethodCall { .. }
        ) || matches!(
            &lhs.kind,
            ExprKind::Try(inner) if matches!(
                inner.kind,
                ExprKind::Call { .. } | ExprKind::MethodCall { .. }
            )
        );
        if is_call_like && !parser.check(TokenKind::Assign) {
            let (line, column) = (lhs.line, lhs.column);
            return Ok(Stmt::new(StmtKind::Expr(lhs), line, column));
        }

        match lhs.kind {
            ExprKind::Identifier(_) | ExprKind::FieldAccess { .. } | ExprKind::Index { .. } => {}
            _ => {
                return Err(CompileError::parse(
                    "Invalid assignment target",
                    lhs.line,
                    lhs.column,
                ));
            }
        }

        parser.expect(TokenKind::Assign)?;
        let value = ExpressionParser::parse_expression(parser)?;
        let (line, column) = (lhs.line, lhs.column);
        Ok(Stmt::new(
            StmtKind::Assignment { target: lhs, value },
            line,
            column,
        ))
    }

    /// Parses `return [expr];`.
    fn parse_return(parser: &mut Parser) -> Result<Stmt, CompileError> {
        let ret_tok = parser.expect(TokenKind::Return)?;
        let value = if matches!(
            parser.kind(),
            TokenKind::Semicolon | TokenKind::Newline | TokenKind::RBrace
        ) {
            None
        } else {
            Some(ExpressionParser::parse_expression(parser)?)
        };
        Ok(Stmt::new(StmtKind::Return(value), ret_tok.line, ret_tok.column))
    }

    /// Parses `defer { block }` or `defer stmt;`. A single-statement body is
    /// wrapped into a block; the inner statement consumes its own semicolon.
    fn parse_defer(parser: &mut Parser) -> Result<Stmt, CompileError> {
        let defer_tok = parser.expect(TokenKind::Defer)?;
        let body = if parser.check(TokenKind::LBrace) {
            Self::parse_block(parser)?
        } else {
            let inner = Self::parse_statement(parser)?
                .ok_or_else(|| parser.error_here("Expected statement after 'defer'"))?;
            Block {
                line: inner.line,
                column: inner.column,
                statements: vec![inner],
            }
        };
        Ok(Stmt::new(StmtKind::Defer(body), defer_tok.line, defer_tok.column))
    }

    /// Parses `if`/`elif`/`else`. `elif` chains become nested `If` statements
    /// hanging off the `else` slot.
    fn parse_if(parser: &mut Parser) -> Result<Stmt, CompileError> {
        let if_tok = parser.expect(TokenKind::If)?;
        parser.expect(TokenKind::LParen)?;
        let condition = ExpressionParser::parse_expression(parser)?;
        parser.expect(TokenKind::RParen)?;
        let then_block = Self::parse_block(parser)?;

        parser.skip_newlines();
        let else_block = if parser.check(TokenKind::Elif) {
            // Re-enter as if the elif were a fresh `if`.
            let elif_tok = parser.peek().clone();
            parser.advance();
            parser.expect(TokenKind::LParen)?;
            let elif_cond = ExpressionParser::parse_expression(parser)?;
            parser.expect(TokenKind::RParen)?;
            let elif_then = Self::parse_block(parser)?;
            let nested = Self::continue_elif_chain(parser, elif_cond, elif_then, elif_tok.line, elif_tok.column)?;
            Some(Box::new(nested))
        } else if parser.check(TokenKind::Else) {
            parser.advance();
            let block = Self::parse_block(parser)?;
            let (line, column) = (block.line, block.column);
            Some(Box::new(Stmt::new(StmtKind::Block(block), line, column)))
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::If {
                condition,
                then_block,
                else_block,
            },
            if_tok.line,
            if_tok.column,
        ))
    }

    /// Folds the remainder of an elif chain into nested `If` statements.
    fn continue_elif_chain(
        parser: &mut Parser,
        condition: Expr,
        then_block: Block,
        line: usize,
        column: usize,
    ) -> Result<Stmt, CompileError> {
        parser.skip_newlines();
        let else_block = if parser.check(TokenKind::Elif) {
            let elif_tok = parser.peek().clone();
            parser.advance();
            parser.expect(TokenKind::LParen)?;
            let elif_cond = ExpressionParser::parse_expression(parser)?;
            parser.expect(TokenKind::RParen)?;
            let elif_then = Self::parse_block(parser)?;
            Some(Box::new(Self::continue_elif_chain(
                parser, elif_cond, elif_then, elif_tok.line, elif_tok.column,
            )?))
        } else if parser.check(TokenKind::Else) {
            parser.advance();
            let block = Self::parse_block(parser)?;
            let (bline, bcolumn) = (block.line, block.column);
            Some(Box::new(Stmt::new(StmtKind::Block(block), bline, bcolumn)))
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::If {
                condition,
                then_block,
                else_block,
            },
            line,
            column,
        ))
    }

    /// Parses `while (cond) { body }`.
    fn parse_while(parser: &mut Parser) -> Result<Stmt, CompileError> {
        let while_tok = parser.expect(TokenKind::While)?;
        parser.expect(TokenKind::LParen)?;
        let condition = ExpressionParser::parse_expression(parser)?;
        parser.expect(TokenKind::RParen)?;
        let body = Self::parse_block(parser)?;
        Ok(Stmt::new(
            StmtKind::While { condition, body },
            while_tok.line,
            while_tok.column,
        ))
    }

    /// Parses `for name in start..end { body }`.
    fn parse_for(parser: &mut Parser) -> Result<Stmt, CompileError> {
        let for_tok = parser.expect(TokenKind::For)?;
        let var = parser.expect(TokenKind::Identifier)?.text().to_string();
        parser.expect(TokenKind::In)?;
        let start = ExpressionParser::parse_expression(parser)?;
        if !parser.check(TokenKind::Range) {
            return Err(parser.error_here("Expected '..' in for loop range"));
        }
        parser.advance();
        let end = ExpressionParser::parse_expression(parser)?;
        let body = Self::parse_block(parser)?;
        Ok(Stmt::new(
            StmtKind::For {
                var,
                start,
                end,
                body,
            },
            for_tok.line,
            for_tok.column,
        ))
    }
}
