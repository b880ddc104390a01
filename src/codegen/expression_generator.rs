//! # Expression Code Generator
//!
//! Translates expressions into x86-64 AT&T assembly. Evaluation is
//! stack-based with `%rax` as the primary register: the left operand is
//! evaluated into `%rax` and pushed, the right operand is evaluated and
//! moved to `%rbx`, the left is popped back, and the operation is applied.
//!
//! String-typed `+` lowers to an allocate/strcpy/strcat sequence with
//! integer operands coerced through `vyl_int_to_str`; string equality
//! dispatches to `strcmp`. Logical `&&`/`||` emit explicit short-circuit
//! branches. Array indexing emits null, negativity, and length checks that
//! branch to `vyl_bounds_fail`.

use crate::ast::nodes::*;
use crate::ast::types::Type;
use crate::codegen::builtin_generator::BuiltinGenerator;
use crate::codegen::common::{CodeGen, Storage};
use crate::codegen::function_generator::FunctionGenerator;
use crate::compiler::error::CompileError;
use crate::compiler::lexer::{StringPart, TokenKind, tokenize};
use crate::compiler::parser::common::Parser;
use crate::compiler::parser::expression_parser::ExpressionParser;

/// A static utility struct for generating assembly from expressions.
pub struct ExpressionGenerator;

impl ExpressionGenerator {
    /// The primary dispatcher. The expression's value ends up in `%rax`.
    pub fn generate_expression(ctx: &mut CodeGen, expr: &Expr) -> Result<String, CompileError> {
        match &expr.kind {
            ExprKind::IntLiteral(value) => Ok(format!("movq ${}, %rax\n", value)),
            // The decimal type is a stub: values truncate to integers.
            ExprKind::DecLiteral(value) => Ok(format!("movq ${}, %rax\n", *value as i64)),
            ExprKind::BoolLiteral(value) => {
                Ok(format!("movq ${}, %rax\n", if *value { 1 } else { 0 }))
            }
            ExprKind::NullLiteral => Ok("movq $0, %rax\n".to_string()),
            ExprKind::StrLiteral(content) => {
                let label = ctx.add_string(content);
                Ok(format!("leaq {}(%rip), %rax\n", label))
            }
            ExprKind::InterpString(parts) => Self::generate_interp_string(ctx, parts),
            ExprKind::Identifier(name) => Self::generate_identifier(ctx, name),
            ExprKind::SelfExpr => Ok("movq %r13, %rax\n".to_string()),
            ExprKind::AddressOf(operand) => Self::generate_address_of(ctx, operand),
            ExprKind::Dereference(operand) => {
                let mut asm = Self::generate_expression(ctx, operand)?;
                asm.push_str("movq (%rax), %rax\n");
                Ok(asm)
            }
            ExprKind::Unary { op, operand } => {
                let mut asm = Self::generate_expression(ctx, operand)?;
                match op {
                    UnaryOp::Neg => asm.push_str("negq %rax\n"),
                    UnaryOp::Pos => {}
                    UnaryOp::Not => {
                        asm.push_str("cmpq $0, %rax\n");
                        asm.push_str("sete %al\n");
                        asm.push_str("movzbq %al, %rax\n");
                    }
                }
                Ok(asm)
            }
            ExprKind::Binary { left, op, right } => {
                Self::generate_binary(ctx, left, *op, right)
            }
            ExprKind::FieldAccess { receiver, field } => {
                let offset = Self::field_offset(ctx, receiver, field, expr)?;
                let mut asm = Self::generate_expression(ctx, receiver)?;
                asm.push_str(&format!("movq {}(%rax), %rax\n", offset));
                Ok(asm)
            }
            ExprKind::EnumAccess { enum_name, variant } => {
                let value = ctx
                    .enums
                    .get(enum_name)
                    .and_then(|table| table.get(variant))
                    .copied()
                    .ok_or_else(|| {
                        ctx.invariant(format!("Unknown enum variant '{}.{}'", enum_name, variant))
                    })?;
                Ok(format!("movq ${}, %rax\n", value))
            }
            ExprKind::Index { receiver, index } => {
                let mut asm = Self::generate_expression(ctx, receiver)?;
                asm.push_str("pushq %rax\n");
                asm.push_str(&Self::generate_expression(ctx, index)?);
                asm.push_str("movq %rax, %rbx\n");
                asm.push_str("popq %rax\n");
                asm.push_str(Self::bounds_check());
                asm.push_str("movq (%rax,%rbx,8), %rax\n");
                Ok(asm)
            }
            ExprKind::New {
                struct_name,
                initializers,
                ..
            } => Self::generate_new(ctx, struct_name, initializers),
            ExprKind::ArrayLiteral(elements) => Self::generate_array_literal(ctx, elements),
            ExprKind::TupleLiteral(elements) => Self::generate_tuple_literal(ctx, elements),
            ExprKind::Try(operand) => {
                let mut asm = Self::generate_expression(ctx, operand)?;
                let ok_label = ctx.next_label("try_ok");
                asm.push_str("cmpq $0, %rax\n");
                asm.push_str(&format!("jge {}\n", ok_label));
                asm.push_str(&FunctionGenerator::emit_pending_defers(ctx)?);
                asm.push_str(&format!("jmp {}\n", ctx.return_label));
                asm.push_str(&format!("{}:\n", ok_label));
                Ok(asm)
            }
            ExprKind::Call { name, args } => {
                if let Some(asm) = BuiltinGenerator::generate(ctx, name, args)? {
                    Ok(asm)
                } else {
                    FunctionGenerator::generate_call(ctx, name, args)
                }
            }
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => FunctionGenerator::generate_method_call(ctx, receiver, method, args),
        }
    }

    /// The null/negative/length check emitted before every array access,
    /// with the element pointer in `%rax` and the index in `%rbx`.
    fn bounds_check() -> &'static str {
        concat!(
            "cmpq $0, %rax\n",
            "je vyl_bounds_fail\n",
            "cmpq $0, %rbx\n",
            "jl vyl_bounds_fail\n",
            "cmpq -8(%rax), %rbx\n",
            "jge vyl_bounds_fail\n",
        )
    }

    fn generate_identifier(ctx: &mut CodeGen, name: &str) -> Result<String, CompileError> {
        if name == "argc" {
            return Ok("movq argc_store(%rip), %rax\n".to_string());
        }
        if name == "argv" {
            return Ok("movq argv_store(%rip), %rax\n".to_string());
        }
        let symbol = ctx
            .symbol(name)
            .ok_or_else(|| ctx.invariant(format!("Undefined variable '{}'", name)))?;
        match &symbol.storage {
            Storage::Register(reg) => Ok(format!("movq {}, %rax\n", reg)),
            _ => Ok(format!("movq {}, %rax\n", symbol.location())),
        }
    }

    /// Address-of is defined for identifiers with memory storage, fields,
    /// and indexed elements. Parameters whose address is taken are demoted
    /// to stack homes by the frame builder, so a register case here is an
    /// upstream invariant violation.
    fn generate_address_of(ctx: &mut CodeGen, operand: &Expr) -> Result<String, CompileError> {
        match &operand.kind {
            ExprKind::Identifier(name) => {
                let symbol = ctx
                    .symbol(name)
                    .ok_or_else(|| ctx.invariant(format!("Undefined variable '{}'", name)))?;
                match &symbol.storage {
                    Storage::Stack(offset) => Ok(format!("leaq {}(%rbp), %rax\n", offset)),
                    Storage::Global(label) => Ok(format!("leaq {}(%rip), %rax\n", label)),
                    Storage::Register(_) => Err(ctx.invariant(format!(
                        "Cannot take the address of register-resident '{}'",
                        name
                    ))),
                }
            }
            ExprKind::FieldAccess { receiver, field } => {
                let offset = Self::field_offset(ctx, receiver, field, operand)?;
                let mut asm = Self::generate_expression(ctx, receiver)?;
                asm.push_str(&format!("leaq {}(%rax), %rax\n", offset));
                Ok(asm)
            }
            ExprKind::Index { receiver, index } => {
                let mut asm = Self::generate_expression(ctx, receiver)?;
                asm.push_str("pushq %rax\n");
                asm.push_str(&Self::generate_expression(ctx, index)?);
                asm.push_str("movq %rax, %rbx\n");
                asm.push_str("popq %rax\n");
                asm.push_str(Self::bounds_check());
                asm.push_str("leaq (%rax,%rbx,8), %rax\n");
                Ok(asm)
            }
            _ => Err(ctx.invariant("Cannot take the address of a temporary")),
        }
    }

    /// Resolves a field's offset from the receiver's static struct type.
    pub fn field_offset(
        ctx: &CodeGen,
        receiver: &Expr,
        field: &str,
        at: &Expr,
    ) -> Result<i64, CompileError> {
        let receiver_t = ctx.expr_type(receiver);
        let Type::Named(struct_name) = receiver_t else {
            return Err(ctx.invariant(format!(
                "Field access on non-struct value at line {}",
                at.line
            )));
        };
        let layout = ctx
            .structs
            .get(&struct_name)
            .ok_or_else(|| ctx.invariant(format!("Unknown struct '{}'", struct_name)))?;
        layout
            .fields
            .get(field)
            .map(|(offset, _)| *offset)
            .ok_or_else(|| {
                ctx.invariant(format!(
                    "Unknown field '{}' on struct '{}'",
                    field, struct_name
                ))
            })
    }

    fn generate_binary(
        ctx: &mut CodeGen,
        left: &Expr,
        op: BinaryOp,
        right: &Expr,
    ) -> Result<String, CompileError> {
        let stringy = ctx.is_string(left) || ctx.is_string(right);

        if op == BinaryOp::Add && stringy {
            return Self::generate_concat(ctx, left, right);
        }

        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) && stringy {
            let mut asm = Self::generate_expression(ctx, left)?;
            asm.push_str("pushq %rax\n");
            asm.push_str(&Self::generate_expression(ctx, right)?);
            asm.push_str("movq %rax, %rsi\n");
            asm.push_str("popq %rdi\n");
            asm.push_str("call strcmp\n");
            asm.push_str("cmpq $0, %rax\n");
            asm.push_str(if op == BinaryOp::Eq {
                "sete %al\n"
            } else {
                "setne %al\n"
            });
            asm.push_str("movzbq %al, %rax\n");
            return Ok(asm);
        }

        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            return Self::generate_short_circuit(ctx, left, op, right);
        }

        let mut asm = Self::generate_expression(ctx, left)?;
        asm.push_str("pushq %rax\n");
        asm.push_str(&Self::generate_expression(ctx, right)?);
        asm.push_str("movq %rax, %rbx\n");
        asm.push_str("popq %rax\n");

        match op {
            BinaryOp::Add => asm.push_str("addq %rbx, %rax\n"),
            BinaryOp::Sub => asm.push_str("subq %rbx, %rax\n"),
            BinaryOp::Mul => asm.push_str("imulq %rbx, %rax\n"),
            BinaryOp::Div => {
                asm.push_str("cqto\n");
                asm.push_str("idivq %rbx\n");
            }
            BinaryOp::Mod => {
                asm.push_str("cqto\n");
                asm.push_str("idivq %rbx\n");
                asm.push_str("movq %rdx, %rax\n");
            }
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le
            | BinaryOp::Ge => {
                asm.push_str("cmpq %rbx, %rax\n");
                let set = match op {
                    BinaryOp::Eq => "sete",
                    BinaryOp::Ne => "setne",
                    BinaryOp::Lt => "setl",
                    BinaryOp::Gt => "setg",
                    BinaryOp::Le => "setle",
                    _ => "setge",
                };
                asm.push_str(&format!("{} %al\n", set));
                asm.push_str("movzbq %al, %rax\n");
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled by short-circuit path"),
        }
        Ok(asm)
    }

    /// Short-circuit lowering for `&&` and `||`.
    fn generate_short_circuit(
        ctx: &mut CodeGen,
        left: &Expr,
        op: BinaryOp,
        right: &Expr,
    ) -> Result<String, CompileError> {
        let mut asm = String::new();
        match op {
            BinaryOp::And => {
                let false_label = ctx.next_label("and_false");
                let end_label = ctx.next_label("and_end");
                asm.push_str(&Self::generate_expression(ctx, left)?);
                asm.push_str("cmpq $0, %rax\n");
                asm.push_str(&format!("je {}\n", false_label));
                asm.push_str(&Self::generate_expression(ctx, right)?);
                asm.push_str("cmpq $0, %rax\n");
                asm.push_str(&format!("je {}\n", false_label));
                asm.push_str("movq $1, %rax\n");
                asm.push_str(&format!("jmp {}\n", end_label));
                asm.push_str(&format!("{}:\n", false_label));
                asm.push_str("movq $0, %rax\n");
                asm.push_str(&format!("{}:\n", end_label));
            }
            BinaryOp::Or => {
                let true_label = ctx.next_label("or_true");
                let end_label = ctx.next_label("or_end");
                asm.push_str(&Self::generate_expression(ctx, left)?);
                asm.push_str("cmpq $0, %rax\n");
                asm.push_str(&format!("jne {}\n", true_label));
                asm.push_str(&Self::generate_expression(ctx, right)?);
                asm.push_str("cmpq $0, %rax\n");
                asm.push_str(&format!("jne {}\n", true_label));
                asm.push_str("movq $0, %rax\n");
                asm.push_str(&format!("jmp {}\n", end_label));
                asm.push_str(&format!("{}:\n", true_label));
                asm.push_str("movq $1, %rax\n");
                asm.push_str(&format!("{}:\n", end_label));
            }
            _ => unreachable!(),
        }
        Ok(asm)
    }

    /// String concatenation with integer coercion: evaluates both operands
    /// as strings (numbers go through `vyl_int_to_str`), then allocates
    /// `strlen(left) + strlen(right) + 1` bytes and fills them with
    /// `strcpy` + `strcat`.
    fn generate_concat(
        ctx: &mut CodeGen,
        left: &Expr,
        right: &Expr,
    ) -> Result<String, CompileError> {
        let mut asm = Self::generate_expression(ctx, left)?;
        asm.push_str(&Self::coerce_to_string(ctx, left));
        asm.push_str("pushq %rax\n");
        asm.push_str(&Self::generate_expression(ctx, right)?);
        asm.push_str(&Self::coerce_to_string(ctx, right));
        asm.push_str(Self::concat_tos());
        Ok(asm)
    }

    /// Concatenates the string on top of the stack (left) with `%rax`
    /// (right); leaves the new string in `%rax` with the stack popped.
    fn concat_tos() -> &'static str {
        concat!(
            "pushq %rax\n",
            "movq 8(%rsp), %rdi\n",
            "call strlen\n",
            "movq %rax, %r12\n",
            "movq (%rsp), %rdi\n",
            "call strlen\n",
            "leaq 1(%r12,%rax), %rdi\n",
            "call vyl_alloc\n",
            "movq %rax, %r12\n",
            "movq %r12, %rdi\n",
            "movq 8(%rsp), %rsi\n",
            "call strcpy\n",
            "movq %r12, %rdi\n",
            "movq (%rsp), %rsi\n",
            "call strcat\n",
            "movq %r12, %rax\n",
            "addq $16, %rsp\n",
        )
    }

    /// Routes a non-string operand through `vyl_int_to_str` (24-byte buffer
    /// plus `sprintf "%ld"`). String operands pass unchanged.
    fn coerce_to_string(ctx: &CodeGen, operand: &Expr) -> String {
        if ctx.is_string(operand) {
            String::new()
        } else {
            "movq %rax, %rdi\ncall vyl_int_to_str\n".to_string()
        }
    }

    /// `new S{...}`: allocate the struct cell and store each initializer at
    /// its field offset.
    fn generate_new(
        ctx: &mut CodeGen,
        struct_name: &str,
        initializers: &[(String, Expr)],
    ) -> Result<String, CompileError> {
        let layout = ctx
            .structs
            .get(struct_name)
            .ok_or_else(|| ctx.invariant(format!("Unknown struct '{}'", struct_name)))?;
        let size = layout.size;
        let offsets: Vec<(i64, &Expr)> = initializers
            .iter()
            .map(|(field, value)| {
                layout
                    .fields
                    .get(field)
                    .map(|(offset, _)| (*offset, value))
                    .ok_or_else(|| {
                        ctx.invariant(format!(
                            "Unknown field '{}' on struct '{}'",
                            field, struct_name
                        ))
                    })
            })
            .collect::<Result<_, _>>()?;

        let mut asm = format!("movq ${}, %rdi\n", size);
        asm.push_str("call vyl_alloc\n");
        asm.push_str("pushq %rax\n");
        for (offset, value) in offsets {
            asm.push_str(&Self::generate_expression(ctx, value)?);
            asm.push_str("movq (%rsp), %rbx\n");
            asm.push_str(&format!("movq %rax, {}(%rbx)\n", offset));
        }
        asm.push_str("popq %rax\n");
        Ok(asm)
    }

    /// `[a, b, c]`: a header word holding the length immediately precedes
    /// the element region; the value points at element zero.
    fn generate_array_literal(
        ctx: &mut CodeGen,
        elements: &[Expr],
    ) -> Result<String, CompileError> {
        let count = elements.len() as i64;
        let mut asm = format!("movq ${}, %rdi\n", 8 * (count + 1));
        asm.push_str("call vyl_alloc\n");
        asm.push_str(&format!("movq ${}, (%rax)\n", count));
        asm.push_str("addq $8, %rax\n");
        asm.push_str("pushq %rax\n");
        for (i, element) in elements.iter().enumerate() {
            asm.push_str(&Self::generate_expression(ctx, element)?);
            asm.push_str("movq (%rsp), %rbx\n");
            asm.push_str(&format!("movq %rax, {}(%rbx)\n", 8 * i as i64));
        }
        asm.push_str("popq %rax\n");
        Ok(asm)
    }

    /// `(a, b)`: a contiguous payload of element words; the value points at
    /// element zero.
    fn generate_tuple_literal(
        ctx: &mut CodeGen,
        elements: &[Expr],
    ) -> Result<String, CompileError> {
        let count = elements.len().max(1) as i64;
        let mut asm = format!("movq ${}, %rdi\n", 8 * count);
        asm.push_str("call vyl_alloc\n");
        asm.push_str("pushq %rax\n");
        for (i, element) in elements.iter().enumerate() {
            asm.push_str(&Self::generate_expression(ctx, element)?);
            asm.push_str("movq (%rsp), %rbx\n");
            asm.push_str(&format!("movq %rax, {}(%rbx)\n", 8 * i as i64));
        }
        asm.push_str("popq %rax\n");
        Ok(asm)
    }

    /// Interpolated strings are re-lexed and re-parsed segment-wise, then
    /// folded left with the concat sequence. Non-string segments are coerced
    /// through `vyl_int_to_str`.
    fn generate_interp_string(
        ctx: &mut CodeGen,
        parts: &[StringPart],
    ) -> Result<String, CompileError> {
        if parts.is_empty() {
            let label = ctx.add_string("");
            return Ok(format!("leaq {}(%rip), %rax\n", label));
        }

        let mut asm = Self::generate_interp_part(ctx, &parts[0])?;
        for part in &parts[1..] {
            asm.push_str("pushq %rax\n");
            asm.push_str(&Self::generate_interp_part(ctx, part)?);
            asm.push_str(Self::concat_tos());
        }
        Ok(asm)
    }

    /// One interpolation segment as a string pointer in `%rax`.
    fn generate_interp_part(ctx: &mut CodeGen, part: &StringPart) -> Result<String, CompileError> {
        if !part.is_expr {
            let label = ctx.add_string(&part.text);
            return Ok(format!("leaq {}(%rip), %rax\n", label));
        }

        let expr = Self::reparse_embedded(&part.text)
            .map_err(|e| CompileError::codegen(format!("Bad interpolation '{}': {}", part.text, e)))?;
        let mut asm = Self::generate_expression(ctx, &expr)?;
        asm.push_str(&Self::coerce_to_string(ctx, &expr));
        Ok(asm)
    }

    /// Re-lexes and re-parses an embedded expression's source text.
    fn reparse_embedded(text: &str) -> Result<Expr, CompileError> {
        let tokens = tokenize(text)?
            .into_iter()
            .filter(|t| t.kind != TokenKind::Newline)
            .collect::<Vec<_>>();
        let mut parser = Parser::new(tokens);
        ExpressionParser::parse_expression(&mut parser)
    }
}
