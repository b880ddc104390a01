//! # Parser Cursor
//!
//! The shared token cursor used by the statement, expression, and
//! declaration parsers. It provides lookahead, expectation checking, and the
//! top-level program loop.

use crate::ast::nodes::Program;
use crate::ast::types::Type;
use crate::compiler::error::CompileError;
use crate::compiler::lexer::{Token, TokenKind};
use crate::compiler::parser::statement_parser::StatementParser;
use std::collections::HashSet;

/// The concrete parser state: a materialized token list plus a position.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    /// Enum names declared so far; lets the postfix parser classify
    /// `E.Variant` as enum access (declaration-before-use makes this sound).
    pub enum_names: HashSet<String>,
}

impl Parser {
    /// Creates the parser over a token list. The lexer guarantees a trailing
    /// `EOF` token; an empty list gets one synthesized so lookahead is total.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            tokens.push(Token {
                kind: TokenKind::Eof,
                value: None,
                int_value: None,
                dec_value: None,
                parts: Vec::new(),
                line: 0,
                column: 0,
            });
        }
        Self {
            tokens,
            position: 0,
            enum_names: HashSet::new(),
        }
    }

    /// The current token. Clamped to `EOF` at the end of input.
    pub fn peek(&self) -> &Token {
        let idx = self.position.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// Lookahead at `offset` tokens past the current one.
    pub fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.position + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// The kind of the current token.
    pub fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    /// Consumes and returns the current token.
    pub fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    /// True if the current token has the given kind.
    pub fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    /// Consumes a token of the expected kind or fails with a parse error.
    pub fn expect(&mut self, kind: TokenKind) -> Result<Token, CompileError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(CompileError::parse(
                format!("Expected {:?}, got {:?}", kind, token.kind),
                token.line,
                token.column,
            ))
        }
    }

    /// Skips any run of newline tokens.
    pub fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    /// True once the cursor reached `EOF`.
    pub fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    /// Builds a parse error at the current token.
    pub fn error_here(&self, message: impl Into<String>) -> CompileError {
        let token = self.peek();
        CompileError::parse(message, token.line, token.column)
    }

    /// Parses the entire program.
    pub fn parse_program(&mut self) -> Result<Program, CompileError> {
        let mut program = Program {
            statements: Vec::new(),
            line: 1,
            column: 1,
        };
        self.skip_newlines();
        while !self.is_at_end() {
            if let Some(stmt) = StatementParser::parse_statement(self)? {
                program.statements.push(stmt);
            }
            self.skip_newlines();
        }
        Ok(program)
    }

    /// Parses a type annotation: primitives, named types, pointers `*T`,
    /// typed arrays `T[]`, tuples `(T1, T2)`, and generic instantiations
    /// `Name<T, ...>` (recognized here, rejected later by the resolver).
    pub fn parse_type(&mut self) -> Result<Type, CompileError> {
        if self.check(TokenKind::Star) {
            self.advance();
            let inner = self.parse_type()?;
            return Ok(self.with_array_suffix(Type::Pointer(Box::new(inner)))?);
        }

        if self.check(TokenKind::LParen) {
            self.advance();
            let mut elems = vec![self.parse_type()?];
            while self.check(TokenKind::Comma) {
                self.advance();
                elems.push(self.parse_type()?);
            }
            self.expect(TokenKind::RParen)?;
            return Ok(self.with_array_suffix(Type::Tuple(elems))?);
        }

        let base = match self.kind() {
            TokenKind::IntType => {
                self.advance();
                Type::Int
            }
            TokenKind::DecType => {
                self.advance();
                Type::Dec
            }
            TokenKind::StringType => {
                self.advance();
                Type::Str
            }
            TokenKind::BoolType => {
                self.advance();
                Type::Bool
            }
            TokenKind::Identifier => {
                let name = self.advance().text().to_string();
                if self.check(TokenKind::Lt) {
                    self.advance();
                    let mut args = vec![self.parse_type()?];
                    while self.check(TokenKind::Comma) {
                        self.advance();
                        args.push(self.parse_type()?);
                    }
                    self.expect(TokenKind::Gt)?;
                    Type::Generic { base: name, args }
                } else {
                    Type::from_name(&name)
                }
            }
            _ => return Err(self.error_here("Expected type annotation")),
        };

        self.with_array_suffix(base)
    }

    /// Applies any trailing `[]` suffixes to a parsed base type.
    fn with_array_suffix(&mut self, mut ty: Type) -> Result<Type, CompileError> {
        while self.check(TokenKind::LBracket) && self.peek_at(1).kind == TokenKind::RBracket {
            self.advance();
            self.advance();
            ty = Type::ArrayOf(Box::new(ty));
        }
        Ok(ty)
    }

    /// True when the upcoming tokens start a type annotation followed by an
    /// identifier, as in `var int x` or `var Point p`.
    pub fn at_type_then_name(&self) -> bool {
        match self.kind() {
            TokenKind::IntType
            | TokenKind::DecType
            | TokenKind::StringType
            | TokenKind::BoolType
            | TokenKind::Star => true,
            TokenKind::Identifier => {
                // `Point p`, `List<int> l`, `Point[] ps`
                matches!(self.peek_at(1).kind, TokenKind::Identifier | TokenKind::Lt)
                    || (self.peek_at(1).kind == TokenKind::LBracket
                        && self.peek_at(2).kind == TokenKind::RBracket)
            }
            _ => false,
        }
    }

    /// Decides whether an identifier at the cursor begins a shorthand
    /// function definition: `name ( ... ) ->` or `name ( ... ) {`. Scans past
    /// the balanced parameter list without consuming anything.
    pub fn looks_like_function_def(&self) -> bool {
        if !self.check(TokenKind::Identifier) || self.peek_at(1).kind != TokenKind::LParen {
            return false;
        }
        let mut offset = 2;
        let mut depth = 1usize;
        loop {
            match self.peek_at(offset).kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            offset += 1;
        }
        matches!(
            self.peek_at(offset + 1).kind,
            TokenKind::Arrow | TokenKind::LBrace
        )
    }
}
