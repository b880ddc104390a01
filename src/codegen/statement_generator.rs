//! # Statement Code Generator
//!
//! Translates statements into assembly: declarations and assignments,
//! control flow with label allocation, tuple unpacking, defer registration,
//! and the register-resident counter-loop optimization for simple `while`
//! loops.

use crate::ast::nodes::*;
use crate::codegen::common::CodeGen;
use crate::codegen::expression_generator::ExpressionGenerator;
use crate::codegen::function_generator::FunctionGenerator;
use crate::compiler::error::CompileError;

/// A static utility struct for generating assembly from statements.
pub struct StatementGenerator;

/// The recognized counter-loop shape:
/// `while (id <op> N) { id = id (+|-) M; }` with op in `< <= > >=`.
struct CounterLoop {
    var: String,
    exit_jump: &'static str,
    limit: i64,
    step_add: bool,
    step: i64,
}

impl StatementGenerator {
    /// The primary dispatcher for statement emission.
    pub fn generate_statement(ctx: &mut CodeGen, stmt: &Stmt) -> Result<String, CompileError> {
        match &stmt.kind {
            StmtKind::VarDecl { name, value, .. } => {
                let Some(value) = value else {
                    // Slot exists; struct-typed locals were given backing
                    // storage in the prologue.
                    return Ok(String::new());
                };
                let mut asm = ExpressionGenerator::generate_expression(ctx, value)?;
                asm.push_str(&Self::store_into(ctx, name)?);
                Ok(asm)
            }
            StmtKind::TupleUnpack { names, value, .. } => {
                let mut asm = ExpressionGenerator::generate_expression(ctx, value)?;
                asm.push_str("pushq %rax\n");
                for (i, name) in names.iter().enumerate() {
                    asm.push_str("movq (%rsp), %rbx\n");
                    asm.push_str(&format!("movq {}(%rbx), %rax\n", 8 * i as i64));
                    asm.push_str(&Self::store_into(ctx, name)?);
                }
                asm.push_str("addq $8, %rsp\n");
                Ok(asm)
            }
            StmtKind::Assignment { target, value } => Self::generate_assignment(ctx, target, value),
            StmtKind::Expr(expr) => ExpressionGenerator::generate_expression(ctx, expr),
            StmtKind::Return(value) => {
                let mut asm = match value {
                    Some(value) => ExpressionGenerator::generate_expression(ctx, value)?,
                    None => "movq $0, %rax\n".to_string(),
                };
                asm.push_str(&FunctionGenerator::emit_pending_defers(ctx)?);
                asm.push_str(&format!("jmp {}\n", ctx.return_label));
                Ok(asm)
            }
            StmtKind::Defer(body) => {
                // Registered in source order during emission; replayed in
                // reverse on every return path.
                ctx.defers.push(body.clone());
                Ok(String::new())
            }
            StmtKind::Block(body) => Self::generate_block(ctx, body),
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => Self::generate_if(ctx, condition, then_block, else_block.as_deref()),
            StmtKind::While { condition, body } => Self::generate_while(ctx, condition, body),
            StmtKind::For {
                var, start, end, body,
            } => Self::generate_for(ctx, var, start, end, body),
            StmtKind::FunctionDef(def) => Err(ctx.invariant(format!(
                "Nested function '{}' reached code generation",
                def.name
            ))),
            StmtKind::StructDef(_) | StmtKind::EnumDef(_) | StmtKind::InterfaceDef(_) => {
                Ok(String::new())
            }
        }
    }

    /// Emits the statements of a block in order.
    pub fn generate_block(ctx: &mut CodeGen, block: &Block) -> Result<String, CompileError> {
        let mut asm = String::new();
        for stmt in &block.statements {
            asm.push_str(&Self::generate_statement(ctx, stmt)?);
        }
        Ok(asm)
    }

    /// Stores `%rax` into a named symbol's home.
    fn store_into(ctx: &CodeGen, name: &str) -> Result<String, CompileError> {
        let symbol = ctx
            .symbol(name)
            .ok_or_else(|| ctx.invariant(format!("Undefined variable '{}'", name)))?;
        Ok(format!("movq %rax, {}\n", symbol.location()))
    }

    fn generate_assignment(
        ctx: &mut CodeGen,
        target: &Expr,
        value: &Expr,
    ) -> Result<String, CompileError> {
        match &target.kind {
            ExprKind::Identifier(name) => {
                let mut asm = ExpressionGenerator::generate_expression(ctx, value)?;
                asm.push_str(&Self::store_into(ctx, name)?);
                Ok(asm)
            }
            ExprKind::FieldAccess { receiver, field } => {
                let offset = ExpressionGenerator::field_offset(ctx, receiver, field, target)?;
                let mut asm = ExpressionGenerator::generate_expression(ctx, receiver)?;
                asm.push_str("pushq %rax\n");
                asm.push_str(&ExpressionGenerator::generate_expression(ctx, value)?);
                asm.push_str("popq %rbx\n");
                asm.push_str(&format!("movq %rax, {}(%rbx)\n", offset));
                Ok(asm)
            }
            ExprKind::Index { receiver, index } => {
                let mut asm = ExpressionGenerator::generate_expression(ctx, receiver)?;
                asm.push_str("pushq %rax\n");
                asm.push_str(&ExpressionGenerator::generate_expression(ctx, index)?);
                asm.push_str("pushq %rax\n");
                asm.push_str(&ExpressionGenerator::generate_expression(ctx, value)?);
                asm.push_str("popq %rbx\n");
                asm.push_str("popq %rcx\n");
                asm.push_str("cmpq $0, %rcx\n");
                asm.push_str("je vyl_bounds_fail\n");
                asm.push_str("cmpq $0, %rbx\n");
                asm.push_str("jl vyl_bounds_fail\n");
                asm.push_str("cmpq -8(%rcx), %rbx\n");
                asm.push_str("jge vyl_bounds_fail\n");
                asm.push_str("movq %rax, (%rcx,%rbx,8)\n");
                Ok(asm)
            }
            _ => Err(ctx.invariant("Invalid assignment target reached code generation")),
        }
    }

    fn generate_if(
        ctx: &mut CodeGen,
        condition: &Expr,
        then_block: &Block,
        else_block: Option<&Stmt>,
    ) -> Result<String, CompileError> {
        let else_label = ctx.next_label("else");
        let end_label = ctx.next_label("endif");

        let mut asm = ExpressionGenerator::generate_expression(ctx, condition)?;
        asm.push_str("cmpq $0, %rax\n");
        asm.push_str(&format!("je {}\n", else_label));
        asm.push_str(&Self::generate_block(ctx, then_block)?);
        asm.push_str(&format!("jmp {}\n", end_label));
        asm.push_str(&format!("{}:\n", else_label));
        if let Some(else_stmt) = else_block {
            asm.push_str(&Self::generate_statement(ctx, else_stmt)?);
        }
        asm.push_str(&format!("{}:\n", end_label));
        Ok(asm)
    }

    fn generate_while(
        ctx: &mut CodeGen,
        condition: &Expr,
        body: &Block,
    ) -> Result<String, CompileError> {
        if let Some(counter) = Self::match_counter_loop(ctx, condition, body) {
            return Self::generate_counter_loop(ctx, counter);
        }

        let start_label = ctx.next_label("while");
        let end_label = ctx.next_label("endwhile");

        let mut asm = format!("{}:\n", start_label);
        asm.push_str(&ExpressionGenerator::generate_expression(ctx, condition)?);
        asm.push_str("cmpq $0, %rax\n");
        asm.push_str(&format!("je {}\n", end_label));
        asm.push_str(&Self::generate_block(ctx, body)?);
        asm.push_str(&format!("jmp {}\n", start_label));
        asm.push_str(&format!("{}:\n", end_label));
        Ok(asm)
    }

    /// Matches `while (id <op> N) { id = id (+|-) M; }` against the
    /// register-resident pattern. Any deviation falls back to the generic
    /// while lowering.
    fn match_counter_loop(
        ctx: &CodeGen,
        condition: &Expr,
        body: &Block,
    ) -> Option<CounterLoop> {
        let ExprKind::Binary { left, op, right } = &condition.kind else {
            return None;
        };
        let ExprKind::Identifier(var) = &left.kind else {
            return None;
        };
        let ExprKind::IntLiteral(limit) = right.kind else {
            return None;
        };
        let exit_jump = match op {
            BinaryOp::Lt => "jge",
            BinaryOp::Le => "jg",
            BinaryOp::Gt => "jle",
            BinaryOp::Ge => "jl",
            _ => return None,
        };

        if body.statements.len() != 1 {
            return None;
        }
        let StmtKind::Assignment { target, value } = &body.statements[0].kind else {
            return None;
        };
        let ExprKind::Identifier(assigned) = &target.kind else {
            return None;
        };
        let ExprKind::Binary {
            left: step_left,
            op: step_op,
            right: step_right,
        } = &value.kind
        else {
            return None;
        };
        let ExprKind::Identifier(stepped) = &step_left.kind else {
            return None;
        };
        let ExprKind::IntLiteral(step) = step_right.kind else {
            return None;
        };
        let step_add = match step_op {
            BinaryOp::Add => true,
            BinaryOp::Sub => false,
            _ => return None,
        };

        if assigned != var || stepped != var || ctx.symbol(var).is_none() {
            return None;
        }

        Some(CounterLoop {
            var: var.clone(),
            exit_jump,
            limit,
            step_add,
            step,
        })
    }

    /// The optimized loop: counter and limit live in registers for the whole
    /// loop; the counter is stored back to its home slot at exit.
    fn generate_counter_loop(
        ctx: &mut CodeGen,
        counter: CounterLoop,
    ) -> Result<String, CompileError> {
        let start_label = ctx.next_label("cwhile");
        let end_label = ctx.next_label("endcwhile");
        let location = ctx
            .symbol(&counter.var)
            .map(|s| s.location())
            .ok_or_else(|| ctx.invariant(format!("Undefined variable '{}'", counter.var)))?;

        let mut asm = format!("movq {}, %r10\n", location);
        asm.push_str(&format!("movq ${}, %r11\n", counter.limit));
        asm.push_str(&format!("{}:\n", start_label));
        asm.push_str("cmpq %r11, %r10\n");
        asm.push_str(&format!("{} {}\n", counter.exit_jump, end_label));
        let step = match (counter.step_add, counter.step) {
            (true, 1) => "incq %r10\n".to_string(),
            (false, 1) => "decq %r10\n".to_string(),
            (true, n) => format!("addq ${}, %r10\n", n),
            (false, n) => format!("subq ${}, %r10\n", n),
        };
        asm.push_str(&step);
        asm.push_str(&format!("jmp {}\n", start_label));
        asm.push_str(&format!("{}:\n", end_label));
        asm.push_str(&format!("movq %r10, {}\n", location));
        Ok(asm)
    }

    /// `for` loads the loop variable, compares against the end expression,
    /// and increments by one per iteration, inclusive of the end value.
    fn generate_for(
        ctx: &mut CodeGen,
        var: &str,
        start: &Expr,
        end: &Expr,
        body: &Block,
    ) -> Result<String, CompileError> {
        let start_label = ctx.next_label("for");
        let end_label = ctx.next_label("endfor");
        let location = ctx
            .symbol(var)
            .map(|s| s.location())
            .ok_or_else(|| ctx.invariant(format!("Undefined loop variable '{}'", var)))?;

        let mut asm = ExpressionGenerator::generate_expression(ctx, start)?;
        asm.push_str(&format!("movq %rax, {}\n", location));
        asm.push_str(&format!("{}:\n", start_label));
        asm.push_str(&format!("movq {}, %rax\n", location));
        asm.push_str("pushq %rax\n");
        asm.push_str(&ExpressionGenerator::generate_expression(ctx, end)?);
        asm.push_str("movq %rax, %rbx\n");
        asm.push_str("popq %rax\n");
        asm.push_str("cmpq %rbx, %rax\n");
        asm.push_str(&format!("jg {}\n", end_label));
        asm.push_str(&Self::generate_block(ctx, body)?);
        asm.push_str(&format!("incq {}\n", location));
        asm.push_str(&format!("jmp {}\n", start_label));
        asm.push_str(&format!("{}:\n", end_label));
        Ok(asm)
    }
}
