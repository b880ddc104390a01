//! # Compiler Error Definitions
//!
//! This module centralizes all custom error types that can occur during the
//! compilation of VYL programs, from include preprocessing through code
//! generation and toolchain invocation.
//!
//! It leverages the `thiserror` crate to simplify error reporting and provide
//! clear, descriptive messages to the user.

use std::process::ExitStatus;
use thiserror::Error;

/// The primary error enumeration for the VYL compiler.
///
/// Every phase reports the first error it encounters and aborts; location
/// information is carried wherever the phase has it.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Wrapper for standard I/O errors (e.g., file reading/writing).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error raised when the compiler cannot find the requested source file.
    #[error("No .vyl source file found at the given path")]
    NoSourceFile,

    /// Malformed input caught by the lexer (bad character, unterminated string).
    #[error("Lex error at line {line}, column {column}: {message}")]
    Lex {
        message: String,
        line: usize,
        column: usize,
    },

    /// Syntax errors caught by the parser (unexpected token, missing terminator).
    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    /// Semantic errors caught by the resolver (duplicate declaration,
    /// undeclared reference, missing Main, invalid `self`/`return` context,
    /// mutation of an immutable binding).
    #[error("Resolve error at line {line}, column {column}: {message}")]
    Resolve {
        message: String,
        line: usize,
        column: usize,
    },

    /// Type rule violations caught by the type checker.
    #[error("Type error at line {line}, column {column}: {message}")]
    Type {
        message: String,
        line: usize,
        column: usize,
    },

    /// Invariant violations inside the code generator. These indicate input
    /// that the earlier passes should have rejected.
    #[error("Codegen error: {message}")]
    Codegen { message: String },

    /// Include preprocessing failures (missing file, cyclic include).
    #[error("Include error: {message}")]
    Include { message: String },

    /// Error raised if the compiled artifact is missing after the toolchain ran.
    #[error("Binary not found after compilation")]
    BinaryNotFound,

    /// Error raised when the external assembler/linker could not be spawned.
    #[error("Toolchain invocation failed: {0}")]
    ExecutionError(#[source] std::io::Error),

    /// Error raised when the external assembler/linker exited with failure.
    #[error("Toolchain exited with status: {0}")]
    ExecutionFailed(ExitStatus),
}

impl CompileError {
    /// Constructs a `Lex` error with positional information.
    pub fn lex(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Lex {
            message: message.into(),
            line,
            column,
        }
    }

    /// Constructs a `Parse` error with positional information.
    pub fn parse(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Parse {
            message: message.into(),
            line,
            column,
        }
    }

    /// Constructs a `Resolve` error with positional information.
    pub fn resolve(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Resolve {
            message: message.into(),
            line,
            column,
        }
    }

    /// Constructs a `Type` error with positional information.
    pub fn type_error(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Type {
            message: message.into(),
            line,
            column,
        }
    }

    /// Constructs a `Codegen` invariant-violation error.
    pub fn codegen(message: impl Into<String>) -> Self {
        Self::Codegen {
            message: message.into(),
        }
    }

    /// Constructs an `Include` preprocessing error.
    pub fn include(message: impl Into<String>) -> Self {
        Self::Include {
            message: message.into(),
        }
    }
}
