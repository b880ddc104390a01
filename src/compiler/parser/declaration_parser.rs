//! # Declaration Parser
//!
//! Parses top-level declarations: function definitions (both the `Function`
//! keyword form and the identifier shorthand), structs with fields and
//! methods, enums, and interfaces.

use crate::ast::nodes::{
    EnumDef, FieldDecl, FunctionDef, InterfaceDef, MethodDef, MethodSig, Param, Stmt, StmtKind,
    StructDef,
};
use crate::compiler::error::CompileError;
use crate::compiler::lexer::TokenKind;
use crate::compiler::parser::common::Parser;
use crate::compiler::parser::expression_parser::ExpressionParser;
use crate::compiler::parser::statement_parser::StatementParser;

/// A static utility struct dedicated to parsing declarations.
pub struct DeclarationParser;

impl DeclarationParser {
    /// Parses `Function name(params) [-> type] { ... }`.
    pub fn parse_function_keyword(parser: &mut Parser) -> Result<Stmt, CompileError> {
        let fn_tok = parser.expect(TokenKind::Function)?;
        let name = parser.expect(TokenKind::Identifier)?.text().to_string();
        let def = Self::parse_function_tail(parser, name, fn_tok.line, fn_tok.column)?;
        Ok(Stmt::new(
            StmtKind::FunctionDef(def),
            fn_tok.line,
            fn_tok.column,
        ))
    }

    /// Parses the shorthand form `name(params) [-> type] { ... }`. The caller
    /// has already confirmed via lookahead that this is a definition.
    pub fn parse_function_shorthand(parser: &mut Parser) -> Result<Stmt, CompileError> {
        let name_tok = parser.expect(TokenKind::Identifier)?;
        let name = name_tok.text().to_string();
        let def = Self::parse_function_tail(parser, name, name_tok.line, name_tok.column)?;
        Ok(Stmt::new(
            StmtKind::FunctionDef(def),
            name_tok.line,
            name_tok.column,
        ))
    }

    /// Shared tail: parameter list, optional return arrow, body.
    fn parse_function_tail(
        parser: &mut Parser,
        name: String,
        line: usize,
        column: usize,
    ) -> Result<FunctionDef, CompileError> {
        let params = Self::parse_params(parser)?;
        let return_type = if parser.check(TokenKind::Arrow) {
            parser.advance();
            Some(parser.parse_type()?)
        } else {
            None
        };
        let body = StatementParser::parse_block(parser)?;
        Ok(FunctionDef {
            name,
            params,
            return_type,
            body,
            line,
            column,
        })
    }

    /// Parses `(name[: type][= default], ...)`. Defaults are constant-foldable
    /// expressions consumed literally; substitution happens at call sites.
    fn parse_params(parser: &mut Parser) -> Result<Vec<Param>, CompileError> {
        parser.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !parser.check(TokenKind::RParen) {
            params.push(Self::parse_param(parser)?);
            while parser.check(TokenKind::Comma) {
                parser.advance();
                params.push(Self::parse_param(parser)?);
            }
        }
        parser.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_param(parser: &mut Parser) -> Result<Param, CompileError> {
        let name = parser.expect(TokenKind::Identifier)?.text().to_string();
        let ty = if parser.check(TokenKind::Colon) {
            parser.advance();
            Some(parser.parse_type()?)
        } else {
            None
        };
        let default = if parser.check(TokenKind::Assign) {
            parser.advance();
            Some(ExpressionParser::parse_expression(parser)?)
        } else {
            None
        };
        Ok(Param { name, ty, default })
    }

    /// Parses `struct Name [<T, K>] { fields and methods }`.
    ///
    /// Fields are `var <type> <name>;`; anything else inside the body must be
    /// a method shorthand.
    pub fn parse_struct(parser: &mut Parser) -> Result<Stmt, CompileError> {
        let struct_tok = parser.expect(TokenKind::Struct)?;
        let name = parser.expect(TokenKind::Identifier)?.text().to_string();

        let mut type_params = Vec::new();
        if parser.check(TokenKind::Lt) {
            parser.advance();
            type_params.push(parser.expect(TokenKind::Identifier)?.text().to_string());
            while parser.check(TokenKind::Comma) {
                parser.advance();
                type_params.push(parser.expect(TokenKind::Identifier)?.text().to_string());
            }
            parser.expect(TokenKind::Gt)?;
        }

        parser.expect(TokenKind::LBrace)?;
        parser.skip_newlines();

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !parser.check(TokenKind::RBrace) && !parser.is_at_end() {
            match parser.kind() {
                TokenKind::Var => {
                    parser.advance();
                    let ty = parser.parse_type()?;
                    let name_tok = parser.expect(TokenKind::Identifier)?;
                    parser.expect(TokenKind::Semicolon)?;
                    fields.push(FieldDecl {
                        name: name_tok.text().to_string(),
                        ty,
                        line: name_tok.line,
                        column: name_tok.column,
                    });
                }
                TokenKind::Identifier => {
                    let name_tok = parser.expect(TokenKind::Identifier)?;
                    let method_name = name_tok.text().to_string();
                    let def = Self::parse_function_tail(
                        parser,
                        method_name,
                        name_tok.line,
                        name_tok.column,
                    )?;
                    methods.push(MethodDef {
                        name: def.name,
                        params: def.params,
                        return_type: def.return_type,
                        body: def.body,
                        line: def.line,
                        column: def.column,
                    });
                }
                other => {
                    return Err(parser.error_here(format!(
                        "Expected field or method declaration in struct, found {:?}",
                        other
                    )));
                }
            }
            parser.skip_newlines();
        }
        parser.expect(TokenKind::RBrace)?;

        Ok(Stmt::new(
            StmtKind::StructDef(StructDef {
                name,
                type_params,
                fields,
                methods,
                line: struct_tok.line,
                column: struct_tok.column,
            }),
            struct_tok.line,
            struct_tok.column,
        ))
    }

    /// Parses `enum Name { A [= N], B, ... }`, registering the enum name with
    /// the parser so later `Name.Variant` chains classify as enum access.
    pub fn parse_enum(parser: &mut Parser) -> Result<Stmt, CompileError> {
        let enum_tok = parser.expect(TokenKind::Enum)?;
        let name = parser.expect(TokenKind::Identifier)?.text().to_string();
        parser.expect(TokenKind::LBrace)?;
        parser.skip_newlines();

        let mut variants: Vec<(String, Option<i64>)> = Vec::new();
        while !parser.check(TokenKind::RBrace) && !parser.is_at_end() {
            let variant = parser.expect(TokenKind::Identifier)?.text().to_string();
            let value = if parser.check(TokenKind::Assign) {
                parser.advance();
                let negative = if parser.check(TokenKind::Minus) {
                    parser.advance();
                    true
                } else {
                    false
                };
                let tok = parser.expect(TokenKind::Integer)?;
                let raw = tok.int_value.unwrap_or(0);
                Some(if negative { -raw } else { raw })
            } else {
                None
            };
            variants.push((variant, value));
            parser.skip_newlines();
            if parser.check(TokenKind::Comma) {
                parser.advance();
                parser.skip_newlines();
            }
        }
        parser.expect(TokenKind::RBrace)?;

        parser.enum_names.insert(name.clone());
        Ok(Stmt::new(
            StmtKind::EnumDef(EnumDef {
                name,
                variants,
                line: enum_tok.line,
                column: enum_tok.column,
            }),
            enum_tok.line,
            enum_tok.column,
        ))
    }

    /// Parses `interface Name { name(params) [-> type]; ... }`.
    pub fn parse_interface(parser: &mut Parser) -> Result<Stmt, CompileError> {
        let iface_tok = parser.expect(TokenKind::Interface)?;
        let name = parser.expect(TokenKind::Identifier)?.text().to_string();
        parser.expect(TokenKind::LBrace)?;
        parser.skip_newlines();

        let mut methods = Vec::new();
        while !parser.check(TokenKind::RBrace) && !parser.is_at_end() {
            let name_tok = parser.expect(TokenKind::Identifier)?;
            let params = Self::parse_params(parser)?;
            let return_type = if parser.check(TokenKind::Arrow) {
                parser.advance();
                Some(parser.parse_type()?)
            } else {
                None
            };
            parser.expect(TokenKind::Semicolon)?;
            methods.push(MethodSig {
                name: name_tok.text().to_string(),
                params,
                return_type,
                line: name_tok.line,
                column: name_tok.column,
            });
            parser.skip_newlines();
        }
        parser.expect(TokenKind::RBrace)?;

        Ok(Stmt::new(
            StmtKind::InterfaceDef(InterfaceDef {
                name,
                methods,
                line: iface_tok.line,
                column: iface_tok.column,
            }),
            iface_tok.line,
            iface_tok.column,
        ))
    }
}
