//! # Builtin Call Generator
//!
//! Lowers calls to the fixed runtime builtins. Most builtins share one
//! shape: evaluate arguments right to left onto the stack, pop them into
//! the ABI registers, and call a runtime helper; those are driven by a
//! name-to-symbol table. The irregular ones (type-dispatched `Print`,
//! argv access, inline length reads, `Exists`, `CreateFolder`) have
//! dedicated emitters.

use crate::ast::nodes::Expr;
use crate::codegen::common::{ABI_ARG_REGISTERS, CodeGen};
use crate::codegen::expression_generator::ExpressionGenerator;
use crate::compiler::error::CompileError;

/// name -> (runtime symbol, argument count) for the table-driven builtins.
const RUNTIME_BUILTINS: &[(&str, &str, usize)] = &[
    ("Input", "vyl_input", 0),
    ("Clock", "vyl_clock", 0),
    ("Now", "vyl_now", 0),
    ("Sleep", "vyl_sleep", 1),
    ("RandInt", "rand", 0),
    ("Open", "fopen", 2),
    ("Close", "fclose", 1),
    ("Read", "vyl_read_all", 1),
    ("Write", "vyl_write_all", 2),
    ("ReadFilesize", "vyl_readfilesize", 1),
    ("Remove", "remove", 1),
    ("MkdirP", "vyl_mkdir_p", 1),
    ("RemoveAll", "vyl_remove_all", 1),
    ("CopyFile", "vyl_copy_file", 2),
    ("Unzip", "vyl_unzip", 2),
    ("OpenDir", "opendir", 1),
    ("ReadDir", "vyl_readdir", 1),
    ("CloseDir", "closedir", 1),
    ("SHA256", "vyl_sha256", 1),
    ("Sys", "system", 1),
    ("GetEnv", "vyl_getenv", 1),
    ("Exit", "exit", 1),
    ("TcpConnect", "vyl_tcp_connect", 2),
    ("TcpSend", "vyl_tcp_send", 2),
    ("TcpRecv", "vyl_tcp_recv", 2),
    ("TcpClose", "vyl_tcp_close", 1),
    ("TcpResolve", "vyl_tcp_resolve", 1),
    ("TlsConnect", "vyl_tls_connect", 2),
    ("TlsSend", "vyl_tls_send", 2),
    ("TlsRecv", "vyl_tls_recv", 2),
    ("TlsClose", "vyl_tls_close", 1),
    ("HttpGet", "vyl_http_get", 3),
    ("HttpDownload", "vyl_http_download", 4),
    ("Alloc", "vyl_alloc", 1),
    ("Free", "vyl_free", 1),
    ("Malloc", "malloc", 1),
    ("Memcpy", "memcpy", 3),
    ("Memset", "memset", 3),
    ("Array", "vyl_array", 1),
    ("StrConcat", "vyl_strconcat", 2),
    ("StrLen", "strlen", 1),
    ("StrFind", "vyl_strfind", 2),
    ("Substring", "vyl_substring", 3),
    ("Sqrt", "vyl_sqrt", 1),
];

/// A static utility struct for lowering builtin calls.
pub struct BuiltinGenerator;

impl BuiltinGenerator {
    /// Lowers a builtin call, or returns `None` when `name` is not a
    /// builtin so the caller falls back to user-function dispatch.
    pub fn generate(
        ctx: &mut CodeGen,
        name: &str,
        args: &[Expr],
    ) -> Result<Option<String>, CompileError> {
        match name {
            "Print" => Self::generate_print(ctx, args).map(Some),
            "Exists" => Self::generate_exists(ctx, args).map(Some),
            "CreateFolder" => Self::generate_create_folder(ctx, args).map(Some),
            "Argc" => Ok(Some("movq argc_store(%rip), %rax\n".to_string())),
            "GetArg" => Self::generate_get_arg(ctx, args).map(Some),
            "GC" => Ok(Some("call vyl_collect\n".to_string())),
            "Len" | "Length" => Self::generate_len(ctx, args).map(Some),
            _ => {
                for (builtin, symbol, argc) in RUNTIME_BUILTINS {
                    if *builtin == name {
                        return Self::generate_runtime_call(ctx, symbol, *argc, args).map(Some);
                    }
                }
                Ok(None)
            }
        }
    }

    /// The shared shape: arguments right to left onto the stack, popped
    /// into the ABI registers, then a call into the runtime.
    fn generate_runtime_call(
        ctx: &mut CodeGen,
        symbol: &str,
        argc: usize,
        args: &[Expr],
    ) -> Result<String, CompileError> {
        if args.len() != argc {
            return Err(ctx.invariant(format!(
                "Builtin '{}' expects {} arguments, got {}",
                symbol,
                argc,
                args.len()
            )));
        }
        let mut asm = String::new();
        for arg in args.iter().rev() {
            asm.push_str(&ExpressionGenerator::generate_expression(ctx, arg)?);
            asm.push_str("pushq %rax\n");
        }
        for reg in ABI_ARG_REGISTERS.iter().take(args.len()) {
            asm.push_str(&format!("popq {}\n", reg));
        }
        asm.push_str(&format!("call {}\n", symbol));
        Ok(asm)
    }

    /// `Print` dispatches on the argument's inferred type: strings go to
    /// `print_string`, everything else (integers, booleans, decimals, enum
    /// values, pointers) to `print_int`.
    fn generate_print(ctx: &mut CodeGen, args: &[Expr]) -> Result<String, CompileError> {
        let [arg] = args else {
            return Err(ctx.invariant("Print expects exactly one argument"));
        };
        let stringy = ctx.is_string(arg);
        let mut asm = ExpressionGenerator::generate_expression(ctx, arg)?;
        asm.push_str("movq %rax, %rdi\n");
        asm.push_str(if stringy {
            "call print_string\n"
        } else {
            "call print_int\n"
        });
        Ok(asm)
    }

    /// `Exists(path)`: `access(path, F_OK) == 0`.
    fn generate_exists(ctx: &mut CodeGen, args: &[Expr]) -> Result<String, CompileError> {
        let [path] = args else {
            return Err(ctx.invariant("Exists expects (path)"));
        };
        let mut asm = ExpressionGenerator::generate_expression(ctx, path)?;
        asm.push_str("movq %rax, %rdi\n");
        asm.push_str("movq $0, %rsi\n");
        asm.push_str("call access\n");
        asm.push_str("cmpq $0, %rax\n");
        asm.push_str("sete %al\n");
        asm.push_str("movzbq %al, %rax\n");
        Ok(asm)
    }

    /// `CreateFolder(path)`: `mkdir(path, 0755)`.
    fn generate_create_folder(ctx: &mut CodeGen, args: &[Expr]) -> Result<String, CompileError> {
        let [path] = args else {
            return Err(ctx.invariant("CreateFolder expects (path)"));
        };
        let mut asm = ExpressionGenerator::generate_expression(ctx, path)?;
        asm.push_str("movq %rax, %rdi\n");
        asm.push_str("movq $493, %rsi\n");
        asm.push_str("call mkdir\n");
        Ok(asm)
    }

    /// `GetArg(i)`: indexes the stored `argv`.
    fn generate_get_arg(ctx: &mut CodeGen, args: &[Expr]) -> Result<String, CompileError> {
        let [index] = args else {
            return Err(ctx.invariant("GetArg expects (index)"));
        };
        let mut asm = ExpressionGenerator::generate_expression(ctx, index)?;
        asm.push_str("movq argv_store(%rip), %rbx\n");
        asm.push_str("movq %rax, %rcx\n");
        asm.push_str("movq (%rbx,%rcx,8), %rax\n");
        Ok(asm)
    }

    /// `Len`/`Length` reads the length header word at offset -8. For
    /// strings it falls back to `strlen`.
    fn generate_len(ctx: &mut CodeGen, args: &[Expr]) -> Result<String, CompileError> {
        let [value] = args else {
            return Err(ctx.invariant("Len expects one argument"));
        };
        let mut asm = ExpressionGenerator::generate_expression(ctx, value)?;
        if ctx.is_string(value) {
            asm.push_str("movq %rax, %rdi\n");
            asm.push_str("call strlen\n");
        } else {
            asm.push_str("movq -8(%rax), %rax\n");
        }
        Ok(asm)
    }
}
