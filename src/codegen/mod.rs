//! # Code Generation
//!
//! Translates a well-typed program into a single x86-64 AT&T assembly text:
//! global data, user functions and methods, the synthesized `main` entry,
//! the fixed runtime library, and the pooled string literals.
//!
//! Key components:
//! - **Common context**: symbol tables, labels, string pool, layouts.
//! - **Generators**: specialized emitters for expressions, statements,
//!   functions/calls, and builtins.
//! - **Runtime**: the fixed assembly blocks the generated code links against.

pub mod builtin_generator;
pub mod common;
pub mod expression_generator;
pub mod function_generator;
pub mod runtime;
pub mod statement_generator;

use crate::ast::nodes::*;
use crate::codegen::common::{CodeGen, Storage, Symbol};
use crate::codegen::expression_generator::ExpressionGenerator;
use crate::codegen::function_generator::{
    FunctionGenerator, collect_local_decls,
};
use crate::codegen::statement_generator::StatementGenerator;
use crate::compiler::error::CompileError;

/// Generates the complete assembly text for a checked program.
pub fn generate_assembly(program: &Program) -> Result<String, CompileError> {
    let mut ctx = CodeGen::new();
    let mut out = String::new();

    // Registration: signatures, layouts, and enum tables first, so bodies
    // can reference declarations in any order.
    for stmt in &program.statements {
        match &stmt.kind {
            StmtKind::FunctionDef(def) => ctx.register_function(def),
            StmtKind::StructDef(def) => ctx.register_struct(def),
            StmtKind::EnumDef(def) => ctx.register_enum(def),
            _ => {}
        }
    }

    out.push_str(".section .text\n");

    // Globals: one data word each. Integer-family literals initialize in
    // place; anything else is stored by the synthesized `main` before user
    // `Main` runs.
    let mut deferred_inits: Vec<(String, &Expr)> = Vec::new();
    for stmt in &program.statements {
        let StmtKind::VarDecl {
            name, ty, value, mutable,
        } = &stmt.kind
        else {
            continue;
        };
        let initial = match value.as_ref().map(|v| &v.kind) {
            Some(ExprKind::IntLiteral(n)) => Some(*n),
            Some(ExprKind::DecLiteral(d)) => Some(*d as i64),
            Some(ExprKind::BoolLiteral(b)) => Some(i64::from(*b)),
            Some(_) => {
                deferred_inits.push((name.clone(), value.as_ref().unwrap()));
                None
            }
            None => None,
        };
        out.push_str(".section .data\n");
        out.push_str(&format!("{}: .quad {}\n", name, initial.unwrap_or(0)));
        out.push_str(".section .text\n");

        let ty = ty
            .clone()
            .or_else(|| value.as_ref().map(|v| ctx.expr_type(v)))
            .unwrap_or(crate::ast::types::Type::Int);
        ctx.globals.insert(
            name.clone(),
            Symbol {
                name: name.clone(),
                ty,
                storage: Storage::Global(name.clone()),
                mutable: *mutable,
            },
        );
    }

    // User functions and methods.
    for stmt in &program.statements {
        match &stmt.kind {
            StmtKind::FunctionDef(def) => {
                out.push_str(&FunctionGenerator::generate_function(&mut ctx, def)?);
            }
            StmtKind::StructDef(def) => {
                // Generic definitions never instantiate, so nothing is
                // emitted for them.
                if !def.type_params.is_empty() {
                    continue;
                }
                for method in &def.methods {
                    out.push_str(&FunctionGenerator::generate_method(&mut ctx, def, method)?);
                }
            }
            _ => {}
        }
    }

    out.push_str(&generate_main_stub(&mut ctx, program, &deferred_inits)?);

    out.push_str(runtime::memory());
    out.push_str(runtime::io());
    out.push_str(runtime::files());
    out.push_str(runtime::strings());
    out.push_str(runtime::misc());
    out.push_str(runtime::net());
    out.push_str(runtime::tls());
    out.push_str(runtime::http());
    out.push_str(runtime::data());

    if !ctx.string_pool.is_empty() {
        out.push_str(".section .data\n");
        for (label, content) in &ctx.string_pool {
            out.push_str(&format!(
                "{}: .asciz \"{}\"\n",
                label,
                CodeGen::escape_string(content)
            ));
        }
    }

    Ok(out)
}

/// The synthesized `main`: stores `argc`/`argv`, records the conservative
/// stack root, seeds the pseudo-random generator with the wall clock, runs
/// non-constant global initializers and any top-level statements, calls
/// user `Main`, and exits via syscall with its return value.
fn generate_main_stub(
    ctx: &mut CodeGen,
    program: &Program,
    deferred_inits: &[(String, &Expr)],
) -> Result<String, CompileError> {
    ctx.current_function = Some("main".to_string());
    ctx.current_struct = None;
    ctx.locals.clear();
    ctx.defers.clear();
    ctx.return_label = ctx.next_label("ret");

    // Top-level statements (anything other than declarations) run here;
    // loop variables and the like get slots in main's own frame.
    let top_level: Vec<&Stmt> = program
        .statements
        .iter()
        .filter(|stmt| {
            !matches!(
                stmt.kind,
                StmtKind::VarDecl { .. }
                    | StmtKind::FunctionDef(_)
                    | StmtKind::StructDef(_)
                    | StmtKind::EnumDef(_)
                    | StmtKind::InterfaceDef(_)
            )
        })
        .collect();

    let pseudo_block = Block {
        statements: top_level.iter().map(|s| (*s).clone()).collect(),
        line: program.line,
        column: program.column,
    };
    let locals = collect_local_decls(&pseudo_block);
    let mut stack_bytes = 8 * locals.len() as i64;
    if stack_bytes % 16 != 0 {
        stack_bytes += 8;
    }

    let mut asm = String::new();
    asm.push_str(".globl main\n");
    asm.push_str("main:\n");
    asm.push_str("pushq %rbp\n");
    asm.push_str("movq %rsp, %rbp\n");
    if stack_bytes > 0 {
        asm.push_str(&format!("subq ${}, %rsp\n", stack_bytes));
    }
    asm.push_str("movq %rdi, argc_store(%rip)\n");
    asm.push_str("movq %rsi, argv_store(%rip)\n");
    asm.push_str("movq %rbp, stack_base(%rip)\n");
    asm.push_str("movq $0, %rdi\n");
    asm.push_str("call time\n");
    asm.push_str("movq %rax, %rdi\n");
    asm.push_str("call srand\n");

    let mut next_offset = -8i64;
    for (name, ty) in locals {
        ctx.locals.insert(
            name.clone(),
            Symbol {
                name,
                ty,
                storage: Storage::Stack(next_offset),
                mutable: true,
            },
        );
        next_offset -= 8;
    }

    for (name, value) in deferred_inits {
        asm.push_str(&ExpressionGenerator::generate_expression(ctx, value)?);
        asm.push_str(&format!("movq %rax, {}(%rip)\n", name));
    }

    for stmt in top_level {
        asm.push_str(&StatementGenerator::generate_statement(ctx, stmt)?);
    }

    asm.push_str("call Main\n");
    asm.push_str(&format!("{}:\n", ctx.return_label));
    asm.push_str("movq %rax, %rdi\n");
    asm.push_str("movq $60, %rax\n");
    asm.push_str("syscall\n");

    ctx.current_function = None;
    ctx.locals.clear();
    Ok(asm)
}

#[cfg(test)]
mod tests {
    use crate::compile;

    fn assembly(source: &str) -> String {
        compile(source).expect("compilation should succeed")
    }

    /// The text of a single generated function, delimited by its label and
    /// the next `.globl`.
    fn function_text<'a>(asm: &'a str, label: &str) -> &'a str {
        let start = asm
            .find(&format!("{}:\n", label))
            .unwrap_or_else(|| panic!("no label {} in assembly", label));
        let rest = &asm[start..];
        match rest[1..].find(".globl ") {
            Some(end) => &rest[..end + 1],
            None => rest,
        }
    }

    #[test]
    fn emits_required_public_labels() {
        let asm = assembly("Main() { Print(1); }");
        for label in [
            ".globl main",
            ".globl Main",
            ".globl print_int",
            ".globl print_string",
            ".globl vyl_alloc",
            ".globl vyl_collect",
            ".globl vyl_bounds_fail",
        ] {
            assert!(asm.contains(label), "missing {}", label);
        }
    }

    #[test]
    fn main_stub_records_roots_and_exits_via_syscall() {
        let asm = assembly("Main() { Print(1); }");
        let main = function_text(&asm, "main");
        assert!(main.contains("movq %rdi, argc_store(%rip)"));
        assert!(main.contains("movq %rsi, argv_store(%rip)"));
        assert!(main.contains("movq %rbp, stack_base(%rip)"));
        assert!(main.contains("call srand"));
        assert!(main.contains("call Main"));
        assert!(main.contains("movq $60, %rax"));
        assert!(main.contains("syscall"));
    }

    #[test]
    fn counter_while_loop_is_register_resident() {
        let asm = assembly("Main() { var int i = 0; while (i < 5) { i = i + 1; } Print(i); }");
        let main_fn = function_text(&asm, "Main");
        assert!(main_fn.contains("movq $5, %r11"));
        assert!(main_fn.contains("cmpq %r11, %r10"));
        assert!(main_fn.contains("incq %r10"));
        // Counter is stored back to its home slot at loop exit.
        assert!(main_fn.contains("movq %r10, "));
        assert!(main_fn.contains("call print_int"));
    }

    #[test]
    fn non_matching_while_falls_back_to_generic_lowering() {
        let asm = assembly(
            "Main() { var int i = 0; while (i < 5) { i = i + 1; Print(i); } }",
        );
        let main_fn = function_text(&asm, "Main");
        assert!(!main_fn.contains("%r10"));
        assert!(main_fn.contains(".Lwhile_"));
    }

    #[test]
    fn string_plus_integer_coerces_and_concatenates() {
        let asm = assembly("Main() { Print(\"hello \" + 42); }");
        assert!(asm.contains(".asciz \"hello \""));
        let main_fn = function_text(&asm, "Main");
        assert!(main_fn.contains("call vyl_int_to_str"));
        assert!(main_fn.contains("call strcpy"));
        assert!(main_fn.contains("call strcat"));
        assert!(main_fn.contains("call print_string"));
    }

    #[test]
    fn string_equality_uses_strcmp() {
        let asm = assembly(
            "Main() { var string a = \"x\"; if (a == \"x\") { Print(1); } }",
        );
        assert!(function_text(&asm, "Main").contains("call strcmp"));
    }

    #[test]
    fn struct_new_and_field_access_use_word_offsets() {
        let asm = assembly(
            "struct P { var int x; var int y; }\nMain() { var P p = new P{x: 7, y: 9}; Print(p.y); }",
        );
        let main_fn = function_text(&asm, "Main");
        assert!(main_fn.contains("movq $16, %rdi"));
        assert!(main_fn.contains("call vyl_alloc"));
        assert!(main_fn.contains("movq %rax, 0(%rbx)"));
        assert!(main_fn.contains("movq %rax, 8(%rbx)"));
        assert!(main_fn.contains("movq 8(%rax), %rax"));
    }

    #[test]
    fn methods_mangle_and_home_self_in_r13() {
        let asm = assembly(
            "struct C { var int total; add(n: int) -> int { return self.total + n; } }\nMain() { var C c = new C{total: 1}; Print(c.add(2)); }",
        );
        assert!(asm.contains(".globl C_add"));
        let method = function_text(&asm, "C_add");
        assert!(method.contains("movq %rdi, %r13"));
        assert!(method.contains("movq %r13, %rax"));
        assert!(function_text(&asm, "Main").contains("call C_add"));
    }

    #[test]
    fn defer_replays_before_every_return() {
        let asm = assembly(
            "Function risky(n: int) -> int { defer { Print(\"bye\"); } if (n < 0) { return n; } return n * 2; }\nMain() { var int r = risky(-3); Print(r); }",
        );
        let risky = function_text(&asm, "risky");
        // Two explicit returns plus the implicit tail return replay the
        // deferred print, each preserving %rax.
        assert_eq!(risky.matches("call print_string").count(), 3);
        assert!(risky.contains("popq %rax\njmp .Lret_"));
    }

    #[test]
    fn try_checks_sign_and_routes_through_the_return_label() {
        let asm = assembly(
            "risky() -> int { return -1; }\nMain() { var int r = risky()?; Print(r); }",
        );
        let main_fn = function_text(&asm, "Main");
        assert!(main_fn.contains("cmpq $0, %rax"));
        assert!(main_fn.contains("jge .Ltry_ok"));
        assert!(main_fn.contains("jmp .Lret_"));
    }

    #[test]
    fn tuple_literal_and_unpack_use_word_offsets() {
        let asm = assembly("Main() { var x, y = (1, 2); Print(x + y); }");
        let main_fn = function_text(&asm, "Main");
        assert!(main_fn.contains("movq $16, %rdi"));
        assert!(main_fn.contains("movq 0(%rbx), %rax"));
        assert!(main_fn.contains("movq 8(%rbx), %rax"));
    }

    #[test]
    fn array_literal_header_bounds_check_and_len() {
        let asm = assembly(
            "Main() { var int[] a = [10, 20, 30]; Print(a[1]); Print(Len(a)); }",
        );
        let main_fn = function_text(&asm, "Main");
        assert!(main_fn.contains("movq $32, %rdi"));
        assert!(main_fn.contains("movq $3, (%rax)"));
        assert!(main_fn.contains("je vyl_bounds_fail"));
        assert!(main_fn.contains("jl vyl_bounds_fail"));
        assert!(main_fn.contains("cmpq -8(%rax), %rbx"));
        assert!(main_fn.contains("jge vyl_bounds_fail"));
        assert!(main_fn.contains("movq -8(%rax), %rax"));
    }

    #[test]
    fn enum_access_lowers_to_a_constant() {
        let asm = assembly(
            "enum Status { OK, NotFound = 404 }\nMain() { Print(Status.NotFound); }",
        );
        assert!(function_text(&asm, "Main").contains("movq $404, %rax"));
    }

    #[test]
    fn logical_operators_short_circuit() {
        let asm = assembly(
            "Main() { var bool b = true && false; var bool c = false || true; Print(1); }",
        );
        let main_fn = function_text(&asm, "Main");
        assert!(main_fn.contains(".Land_false_"));
        assert!(main_fn.contains(".Lor_true_"));
    }

    #[test]
    fn division_uses_cqto_idivq() {
        let asm = assembly("Main() { var int x = 7 / 2; Print(x); }");
        let main_fn = function_text(&asm, "Main");
        assert!(main_fn.contains("cqto"));
        assert!(main_fn.contains("idivq %rbx"));
    }

    #[test]
    fn default_arguments_fill_at_the_call_site() {
        let asm = assembly(
            "f(a: int, b: int = 41) -> int { return a + b; }\nMain() { Print(f(1)); }",
        );
        // The omitted argument materializes as the default literal.
        assert!(function_text(&asm, "Main").contains("movq $41, %rax"));
    }

    #[test]
    fn leading_parameters_live_in_callee_saved_homes() {
        let asm = assembly(
            "f(a: int, b: int, c: int) -> int { return a + b + c; }\nMain() { Print(f(1, 2, 3)); }",
        );
        let f = function_text(&asm, "f");
        assert!(f.contains("movq %rdi, %r14"));
        assert!(f.contains("movq %rsi, %r15"));
        assert!(f.contains("movq %rdx, "));
    }

    #[test]
    fn address_taken_parameter_is_demoted_to_the_stack() {
        let asm = assembly(
            "f(a: int) -> int { var *int p = &a; return *p; }\nMain() { Print(f(5)); }",
        );
        let f = function_text(&asm, "f");
        assert!(!f.contains("movq %rdi, %r14"));
        assert!(f.contains("movq %rdi, -"));
    }

    #[test]
    fn struct_local_gets_prologue_backing() {
        let asm = assembly(
            "struct P { var int x; }\nMain() { var P p; p.x = 3; Print(p.x); }",
        );
        let main_fn = function_text(&asm, "Main");
        let alloc_at = main_fn.find("call vyl_alloc").unwrap();
        let body_at = main_fn.find("movq %rax, 0(%rbx)").unwrap();
        assert!(alloc_at < body_at);
    }

    #[test]
    fn gc_builtin_calls_the_collector() {
        let asm = assembly("Main() { GC(); Print(1); }");
        assert!(function_text(&asm, "Main").contains("call vyl_collect"));
    }

    #[test]
    fn interpolated_string_reparses_and_concatenates() {
        let asm = assembly(
            "Main() { var int n = 2; Print(\"got {n + 1} items\"); }",
        );
        let main_fn = function_text(&asm, "Main");
        assert!(asm.contains(".asciz \"got \""));
        assert!(asm.contains(".asciz \" items\""));
        assert!(main_fn.contains("call vyl_int_to_str"));
        assert!(main_fn.contains("call strcat"));
    }

    #[test]
    fn globals_emit_data_words_and_deferred_initializers() {
        let asm = assembly(
            "var int counter = 7;\nvar string name = \"vyl\";\nMain() { Print(counter); Print(name); }",
        );
        assert!(asm.contains("counter: .quad 7"));
        assert!(asm.contains("name: .quad 0"));
        // The string initializer runs in the synthesized main.
        assert!(function_text(&asm, "main").contains("movq %rax, name(%rip)"));
    }

    #[test]
    fn for_loop_is_end_inclusive() {
        let asm = assembly("Main() { var int s = 0; for i in 1..3 { s = s + i; } Print(s); }");
        let main_fn = function_text(&asm, "Main");
        assert!(main_fn.contains(".Lfor_"));
        assert!(main_fn.contains("jg .Lendfor_"));
        assert!(main_fn.contains("incq "));
    }

    #[test]
    fn output_is_deterministic() {
        let source = "struct P { var int x; }\nenum E { A, B }\nf(n: int = 2) -> int { return n; }\nMain() { var P p = new P{x: 1}; Print(f()); Print(\"s\" + 1); }";
        assert_eq!(assembly(source), assembly(source));
    }

    #[test]
    fn string_pool_is_emitted_once_in_order() {
        let asm = assembly("Main() { Print(\"one\"); Print(\"two\"); }");
        let one = asm.find(".str_0: .asciz \"one\"").unwrap();
        let two = asm.find(".str_1: .asciz \"two\"").unwrap();
        assert!(one < two);
    }
}
