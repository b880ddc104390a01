//! # Function Code Generator
//!
//! Emits System V AMD64 function bodies: prologue/epilogue with a
//! 16-byte-aligned frame, callee-saved register homes for leading
//! parameters (`%r14`/`%r15`, plus `%r13` for `self` in methods), stack
//! slots for locals (struct-typed locals are allocator-initialized in the
//! prologue), call lowering with default-argument substitution, method
//! mangling, and the per-function defer stack replayed on every return path.

use crate::ast::nodes::*;
use crate::ast::types::Type;
use crate::codegen::common::{ABI_ARG_REGISTERS, CodeGen, FunctionSig, Storage, Symbol};
use crate::codegen::expression_generator::ExpressionGenerator;
use crate::codegen::statement_generator::StatementGenerator;
use crate::compiler::error::CompileError;
use std::collections::HashSet;

/// Callee-saved registers pushed by every generated function, in push order.
const SAVED_REGISTERS: [&str; 5] = ["%rbx", "%r12", "%r13", "%r14", "%r15"];

/// Bytes occupied by the pushed callee-saved registers below `%rbp`.
const SAVED_BYTES: i64 = 8 * SAVED_REGISTERS.len() as i64;

/// A static utility struct for generating functions, methods, and calls.
pub struct FunctionGenerator;

impl FunctionGenerator {
    /// Emits a top-level function under its own name.
    pub fn generate_function(ctx: &mut CodeGen, def: &FunctionDef) -> Result<String, CompileError> {
        Self::generate_callable(ctx, &def.name, &def.params, &def.body, None)
    }

    /// Emits a method under the mangled `Struct_Method` label, with `self`
    /// as the implicit first parameter homed in `%r13`.
    pub fn generate_method(
        ctx: &mut CodeGen,
        owner: &StructDef,
        def: &MethodDef,
    ) -> Result<String, CompileError> {
        let label = format!("{}_{}", owner.name, def.name);
        Self::generate_callable(ctx, &label, &def.params, &def.body, Some(&owner.name))
    }

    fn generate_callable(
        ctx: &mut CodeGen,
        label: &str,
        params: &[Param],
        body: &Block,
        owner: Option<&str>,
    ) -> Result<String, CompileError> {
        ctx.current_function = Some(label.to_string());
        ctx.current_struct = owner.map(str::to_string);
        ctx.locals.clear();
        ctx.defers.clear();
        ctx.return_label = ctx.next_label("ret");

        let mut address_taken = HashSet::new();
        collect_address_taken(body, &mut address_taken);

        // Leading parameters live in callee-saved homes unless their address
        // is taken; everything else gets a stack slot.
        let mut register_homes: Vec<(usize, &'static str)> = Vec::new();
        let mut slotted_params: Vec<usize> = Vec::new();
        let mut next_home = 0usize;
        for (i, param) in params.iter().enumerate() {
            let home = ["%r14", "%r15"].get(next_home).copied();
            match home {
                Some(reg) if !address_taken.contains(&param.name) => {
                    register_homes.push((i, reg));
                    next_home += 1;
                }
                _ => slotted_params.push(i),
            }
        }

        let locals = collect_local_decls(body);
        let slot_count = slotted_params.len() + locals.len();
        let mut stack_bytes = 8 * slot_count as i64;
        if (SAVED_BYTES + stack_bytes) % 16 != 0 {
            stack_bytes += 8;
        }

        let mut asm = format!(".globl {}\n{}:\n", label, label);
        asm.push_str("pushq %rbp\n");
        asm.push_str("movq %rsp, %rbp\n");
        for reg in SAVED_REGISTERS {
            asm.push_str(&format!("pushq {}\n", reg));
        }
        if stack_bytes > 0 {
            asm.push_str(&format!("subq ${}, %rsp\n", stack_bytes));
        }

        // Incoming argument registers, shifted by one for the method receiver.
        let abi_slot = |param_index: usize| -> usize {
            if owner.is_some() {
                param_index + 1
            } else {
                param_index
            }
        };

        let mut next_offset = -(SAVED_BYTES + 8);

        if owner.is_some() {
            asm.push_str("movq %rdi, %r13\n");
        }
        for &(i, reg) in &register_homes {
            let slot = abi_slot(i);
            if slot < ABI_ARG_REGISTERS.len() {
                asm.push_str(&format!("movq {}, {}\n", ABI_ARG_REGISTERS[slot], reg));
            } else {
                let incoming = 16 + 8 * (slot - ABI_ARG_REGISTERS.len()) as i64;
                asm.push_str(&format!("movq {}(%rbp), %rax\n", incoming));
                asm.push_str(&format!("movq %rax, {}\n", reg));
            }
            let param = &params[i];
            ctx.locals.insert(
                param.name.clone(),
                Symbol {
                    name: param.name.clone(),
                    ty: param.ty.clone().unwrap_or(Type::Int),
                    storage: Storage::Register(reg),
                    mutable: true,
                },
            );
        }
        for i in &slotted_params {
            let slot = abi_slot(*i);
            let offset = next_offset;
            next_offset -= 8;
            if slot < ABI_ARG_REGISTERS.len() {
                asm.push_str(&format!(
                    "movq {}, {}(%rbp)\n",
                    ABI_ARG_REGISTERS[slot], offset
                ));
            } else {
                let incoming = 16 + 8 * (slot - ABI_ARG_REGISTERS.len()) as i64;
                asm.push_str(&format!("movq {}(%rbp), %rax\n", incoming));
                asm.push_str(&format!("movq %rax, {}(%rbp)\n", offset));
            }
            let param = &params[*i];
            ctx.locals.insert(
                param.name.clone(),
                Symbol {
                    name: param.name.clone(),
                    ty: param.ty.clone().unwrap_or(Type::Int),
                    storage: Storage::Stack(offset),
                    mutable: true,
                },
            );
        }

        // Local slots, then allocator backing for struct-typed locals so
        // field accesses always have storage.
        let mut struct_inits: Vec<(i64, i64)> = Vec::new();
        for (name, ty) in &locals {
            let offset = next_offset;
            next_offset -= 8;
            if let Type::Named(struct_name) = ty {
                if let Some(layout) = ctx.structs.get(struct_name) {
                    struct_inits.push((layout.size, offset));
                }
            }
            ctx.locals.insert(
                name.clone(),
                Symbol {
                    name: name.clone(),
                    ty: ty.clone(),
                    storage: Storage::Stack(offset),
                    mutable: true,
                },
            );
        }
        for (size, offset) in struct_inits {
            asm.push_str(&format!("movq ${}, %rdi\n", size));
            asm.push_str("call vyl_alloc\n");
            asm.push_str(&format!("movq %rax, {}(%rbp)\n", offset));
        }

        asm.push_str(&StatementGenerator::generate_block(ctx, body)?);

        // Implicit tail return: zero result, replay defers, fall into the
        // single return label.
        asm.push_str("movq $0, %rax\n");
        asm.push_str(&Self::emit_pending_defers(ctx)?);
        asm.push_str(&format!("{}:\n", ctx.return_label));
        asm.push_str(&format!("leaq -{}(%rbp), %rsp\n", SAVED_BYTES));
        for reg in SAVED_REGISTERS.iter().rev() {
            asm.push_str(&format!("popq {}\n", reg));
        }
        asm.push_str("leave\n");
        asm.push_str("ret\n");

        ctx.current_function = None;
        ctx.current_struct = None;
        ctx.locals.clear();
        ctx.defers.clear();
        Ok(asm)
    }

    /// Replays the pending deferred blocks in LIFO order with `%rax`
    /// preserved around each one. Used by every return path.
    pub fn emit_pending_defers(ctx: &mut CodeGen) -> Result<String, CompileError> {
        let blocks = ctx.defers.clone();
        let mut asm = String::new();
        for block in blocks.iter().rev() {
            asm.push_str("pushq %rax\n");
            for stmt in &block.statements {
                asm.push_str(&StatementGenerator::generate_statement(ctx, stmt)?);
            }
            asm.push_str("popq %rax\n");
        }
        Ok(asm)
    }

    /// Lowers a user-function call: missing trailing arguments are filled
    /// from the callee's declared defaults, arguments are evaluated right to
    /// left onto the stack, then popped into the ABI registers left to
    /// right; the remainder stays on the stack.
    pub fn generate_call(
        ctx: &mut CodeGen,
        name: &str,
        args: &[Expr],
    ) -> Result<String, CompileError> {
        let sig = ctx
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| ctx.invariant(format!("Unknown function '{}'", name)))?;
        let final_args = Self::with_defaults(ctx, name, &sig, args)?;
        Self::emit_call(ctx, name, &final_args, None)
    }

    /// Lowers a method call: the receiver is the implicit first argument and
    /// dispatch goes to the mangled `Struct_Method` label, chosen by the
    /// receiver's static type.
    pub fn generate_method_call(
        ctx: &mut CodeGen,
        receiver: &Expr,
        method: &str,
        args: &[Expr],
    ) -> Result<String, CompileError> {
        let Type::Named(struct_name) = ctx.expr_type(receiver) else {
            return Err(ctx.invariant(format!(
                "Method call '{}' on non-struct receiver",
                method
            )));
        };
        let sig = ctx
            .methods
            .get(&struct_name)
            .and_then(|methods| methods.get(method))
            .cloned()
            .ok_or_else(|| {
                ctx.invariant(format!(
                    "Unknown method '{}' on struct '{}'",
                    method, struct_name
                ))
            })?;
        let final_args = Self::with_defaults(ctx, method, &sig, args)?;
        let label = format!("{}_{}", struct_name, method);
        Self::emit_call(ctx, &label, &final_args, Some(receiver))
    }

    /// Fills omitted trailing arguments from declared defaults.
    fn with_defaults(
        ctx: &CodeGen,
        name: &str,
        sig: &FunctionSig,
        args: &[Expr],
    ) -> Result<Vec<Expr>, CompileError> {
        let mut final_args: Vec<Expr> = args.to_vec();
        for param in sig.params.iter().skip(args.len()) {
            let default = param.default.clone().ok_or_else(|| {
                ctx.invariant(format!(
                    "Missing argument for parameter '{}' of '{}'",
                    param.name, name
                ))
            })?;
            final_args.push(default);
        }
        Ok(final_args)
    }

    /// Shared call emission. `receiver` becomes the first (register)
    /// argument when present.
    fn emit_call(
        ctx: &mut CodeGen,
        label: &str,
        args: &[Expr],
        receiver: Option<&Expr>,
    ) -> Result<String, CompileError> {
        let mut asm = String::new();
        // Right-to-left evaluation onto the stack; the receiver, as the
        // leftmost argument, is evaluated and pushed last.
        for arg in args.iter().rev() {
            asm.push_str(&ExpressionGenerator::generate_expression(ctx, arg)?);
            asm.push_str("pushq %rax\n");
        }
        let mut total = args.len();
        if let Some(receiver) = receiver {
            asm.push_str(&ExpressionGenerator::generate_expression(ctx, receiver)?);
            asm.push_str("pushq %rax\n");
            total += 1;
        }
        for reg in ABI_ARG_REGISTERS.iter().take(total) {
            asm.push_str(&format!("popq {}\n", reg));
        }
        asm.push_str(&format!("call {}\n", label));
        if total > ABI_ARG_REGISTERS.len() {
            let spilled = total - ABI_ARG_REGISTERS.len();
            asm.push_str(&format!("addq ${}, %rsp\n", 8 * spilled as i64));
        }
        Ok(asm)
    }
}

/// Collects every local declaration in a body (including nested blocks,
/// branches, loop bodies, deferred blocks, tuple-unpack names, and `for`
/// loop variables), in source order. Each gets one 8-byte stack slot.
pub fn collect_local_decls(block: &Block) -> Vec<(String, Type)> {
    let mut decls = Vec::new();
    let mut seen = HashSet::new();
    collect_from_block(block, &mut decls, &mut seen);
    decls
}

fn collect_from_block(block: &Block, decls: &mut Vec<(String, Type)>, seen: &mut HashSet<String>) {
    for stmt in &block.statements {
        collect_from_stmt(stmt, decls, seen);
    }
}

fn collect_from_stmt(stmt: &Stmt, decls: &mut Vec<(String, Type)>, seen: &mut HashSet<String>) {
    match &stmt.kind {
        StmtKind::VarDecl { name, ty, value, .. } => {
            if seen.insert(name.clone()) {
                let inferred = ty.clone().unwrap_or_else(|| {
                    value
                        .as_ref()
                        .map(shallow_literal_type)
                        .unwrap_or(Type::Int)
                });
                decls.push((name.clone(), inferred));
            }
        }
        StmtKind::TupleUnpack { names, types, .. } => {
            for (i, name) in names.iter().enumerate() {
                if seen.insert(name.clone()) {
                    let ty = types.get(i).cloned().flatten().unwrap_or(Type::Int);
                    decls.push((name.clone(), ty));
                }
            }
        }
        StmtKind::Block(body) | StmtKind::Defer(body) => collect_from_block(body, decls, seen),
        StmtKind::If {
            then_block,
            else_block,
            ..
        } => {
            collect_from_block(then_block, decls, seen);
            if let Some(else_stmt) = else_block {
                collect_from_stmt(else_stmt, decls, seen);
            }
        }
        StmtKind::While { body, .. } => collect_from_block(body, decls, seen),
        StmtKind::For { var, body, .. } => {
            if seen.insert(var.clone()) {
                decls.push((var.clone(), Type::Int));
            }
            collect_from_block(body, decls, seen);
        }
        _ => {}
    }
}

/// Shallow literal inference for untyped declarations; the type checker has
/// already validated deeper cases, and slot sizing does not depend on it.
fn shallow_literal_type(expr: &Expr) -> Type {
    match &expr.kind {
        ExprKind::DecLiteral(_) => Type::Dec,
        ExprKind::StrLiteral(_) | ExprKind::InterpString(_) => Type::Str,
        ExprKind::BoolLiteral(_) => Type::Bool,
        ExprKind::NullLiteral => Type::Pointer(Box::new(Type::Void)),
        ExprKind::TupleLiteral(elements) => Type::Tuple(vec![Type::Int; elements.len()]),
        ExprKind::New { struct_name, .. } => Type::Named(struct_name.clone()),
        ExprKind::ArrayLiteral(_) => Type::ArrayOf(Box::new(Type::Int)),
        _ => Type::Int,
    }
}

/// Collects identifiers whose address is taken anywhere in the body, so the
/// frame builder can keep those parameters in memory.
pub fn collect_address_taken(block: &Block, names: &mut HashSet<String>) {
    for stmt in &block.statements {
        address_taken_in_stmt(stmt, names);
    }
}

fn address_taken_in_stmt(stmt: &Stmt, names: &mut HashSet<String>) {
    match &stmt.kind {
        StmtKind::VarDecl { value, .. } => {
            if let Some(value) = value {
                address_taken_in_expr(value, names);
            }
        }
        StmtKind::TupleUnpack { value, .. } => address_taken_in_expr(value, names),
        StmtKind::Assignment { target, value } => {
            address_taken_in_expr(target, names);
            address_taken_in_expr(value, names);
        }
        StmtKind::Expr(expr) => address_taken_in_expr(expr, names),
        StmtKind::Return(Some(value)) => address_taken_in_expr(value, names),
        StmtKind::Return(None) => {}
        StmtKind::Block(body) | StmtKind::Defer(body) => collect_address_taken(body, names),
        StmtKind::If {
            condition,
            then_block,
            else_block,
        } => {
            address_taken_in_expr(condition, names);
            collect_address_taken(then_block, names);
            if let Some(else_stmt) = else_block {
                address_taken_in_stmt(else_stmt, names);
            }
        }
        StmtKind::While { condition, body } => {
            address_taken_in_expr(condition, names);
            collect_address_taken(body, names);
        }
        StmtKind::For {
            start, end, body, ..
        } => {
            address_taken_in_expr(start, names);
            address_taken_in_expr(end, names);
            collect_address_taken(body, names);
        }
        StmtKind::FunctionDef(_)
        | StmtKind::StructDef(_)
        | StmtKind::EnumDef(_)
        | StmtKind::InterfaceDef(_) => {}
    }
}

fn address_taken_in_expr(expr: &Expr, names: &mut HashSet<String>) {
    match &expr.kind {
        ExprKind::AddressOf(operand) => {
            if let ExprKind::Identifier(name) = &operand.kind {
                names.insert(name.clone());
            }
            address_taken_in_expr(operand, names);
        }
        ExprKind::Unary { operand, .. }
        | ExprKind::Dereference(operand)
        | ExprKind::Try(operand) => address_taken_in_expr(operand, names),
        ExprKind::Binary { left, right, .. } => {
            address_taken_in_expr(left, names);
            address_taken_in_expr(right, names);
        }
        ExprKind::FieldAccess { receiver, .. } => address_taken_in_expr(receiver, names),
        ExprKind::Index { receiver, index } => {
            address_taken_in_expr(receiver, names);
            address_taken_in_expr(index, names);
        }
        ExprKind::Call { args, .. } => {
            for arg in args {
                address_taken_in_expr(arg, names);
            }
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            address_taken_in_expr(receiver, names);
            for arg in args {
                address_taken_in_expr(arg, names);
            }
        }
        ExprKind::New { initializers, .. } => {
            for (_, value) in initializers {
                address_taken_in_expr(value, names);
            }
        }
        ExprKind::ArrayLiteral(elements) | ExprKind::TupleLiteral(elements) => {
            for element in elements {
                address_taken_in_expr(element, names);
            }
        }
        _ => {}
    }
}
