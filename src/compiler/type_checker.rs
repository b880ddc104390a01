//! # Type Checker
//!
//! The second semantic pass. Threads computed types through the AST and
//! validates operator compatibility, assignment compatibility (including
//! numeric widening and null-to-pointer), builtin signatures, call arity
//! with default arguments, enum/struct lookup, indexing, and tuple-unpack
//! arity. Fails with the first mismatch, carrying (line, column).

use crate::ast::nodes::*;
use crate::ast::types::Type;
use crate::compiler::error::CompileError;
use std::collections::HashMap;

/// Scoped name environment: name -> (type, mutable).
type Env = HashMap<String, (Type, bool)>;

/// One builtin signature: name, parameter slots (`None` = any), return type
/// name (`None` = void). The table is authoritative: calls not present here
/// and not in the user function map fail.
pub const BUILTINS: &[(&str, &[Option<&str>], Option<&str>)] = &[
    ("Print", &[None], None),
    ("Input", &[], Some("string")),
    ("Clock", &[], Some("int")),
    ("Now", &[], Some("int")),
    ("Sleep", &[Some("int")], Some("int")),
    ("Exit", &[Some("int")], None),
    ("RandInt", &[], Some("int")),
    ("Argc", &[], Some("int")),
    ("GetArg", &[Some("int")], Some("string")),
    ("Exists", &[Some("string")], Some("bool")),
    ("CreateFolder", &[Some("string")], Some("int")),
    ("Open", &[Some("string"), Some("string")], Some("int")),
    ("Close", &[Some("int")], Some("int")),
    ("Read", &[Some("int")], Some("string")),
    ("Write", &[Some("int"), Some("string")], Some("int")),
    ("ReadFilesize", &[Some("string")], Some("int")),
    ("Remove", &[Some("string")], Some("int")),
    ("MkdirP", &[Some("string")], Some("int")),
    ("RemoveAll", &[Some("string")], Some("int")),
    ("CopyFile", &[Some("string"), Some("string")], Some("int")),
    ("Unzip", &[Some("string"), Some("string")], Some("int")),
    ("OpenDir", &[Some("string")], Some("int")),
    ("ReadDir", &[Some("int")], Some("string")),
    ("CloseDir", &[Some("int")], Some("int")),
    ("SHA256", &[Some("string")], Some("string")),
    ("Sys", &[Some("string")], Some("int")),
    ("GetEnv", &[Some("string")], Some("string")),
    ("TcpConnect", &[Some("string"), Some("int")], Some("int")),
    ("TcpSend", &[Some("int"), Some("string")], Some("int")),
    ("TcpRecv", &[Some("int"), Some("int")], Some("string")),
    ("TcpClose", &[Some("int")], Some("int")),
    ("TcpResolve", &[Some("string")], Some("string")),
    ("TlsConnect", &[Some("string"), Some("int")], Some("int")),
    ("TlsSend", &[Some("int"), Some("string")], Some("int")),
    ("TlsRecv", &[Some("int"), Some("int")], Some("string")),
    ("TlsClose", &[Some("int")], Some("int")),
    (
        "HttpGet",
        &[Some("string"), Some("string"), Some("int")],
        Some("string"),
    ),
    (
        "HttpDownload",
        &[Some("string"), Some("string"), Some("int"), Some("string")],
        Some("int"),
    ),
    ("Alloc", &[Some("int")], Some("int")),
    ("Free", &[Some("int")], Some("int")),
    ("Malloc", &[Some("int")], Some("int")),
    ("Memcpy", &[Some("int"), Some("int"), Some("int")], Some("int")),
    ("Memset", &[Some("int"), Some("int"), Some("int")], Some("int")),
    ("Array", &[Some("int")], Some("array")),
    ("Length", &[Some("array")], Some("int")),
    ("Len", &[None], Some("int")),
    ("GC", &[], None),
    ("StrConcat", &[Some("string"), Some("string")], Some("string")),
    ("StrLen", &[Some("string")], Some("int")),
    ("StrFind", &[Some("string"), Some("string")], Some("int")),
    ("Substring", &[Some("string"), Some("int"), Some("int")], Some("string")),
    ("Sqrt", &[Some("int")], Some("int")),
];

/// True when `name` is a runtime builtin accepted without a declaration.
pub fn is_builtin(name: &str) -> bool {
    builtin_signature(name).is_some()
}

/// Looks up a builtin signature by name.
pub fn builtin_signature(name: &str) -> Option<&'static (&'static str, &'static [Option<&'static str>], Option<&'static str>)> {
    BUILTINS.iter().find(|(n, _, _)| *n == name)
}

/// The central structure for the type-checking pass.
pub struct TypeChecker<'a> {
    globals: Env,
    functions: HashMap<String, &'a FunctionDef>,
    structs: HashMap<String, &'a StructDef>,
    enums: HashMap<String, &'a EnumDef>,
}

/// Type-checks the program, failing with the first rule violation.
pub fn type_check(program: &Program) -> Result<(), CompileError> {
    TypeChecker::new(program).check_program(program)
}

impl<'a> TypeChecker<'a> {
    fn new(program: &'a Program) -> Self {
        let mut functions = HashMap::new();
        let mut structs = HashMap::new();
        let mut enums = HashMap::new();
        for stmt in &program.statements {
            match &stmt.kind {
                StmtKind::FunctionDef(def) => {
                    functions.insert(def.name.clone(), def);
                }
                StmtKind::StructDef(def) => {
                    structs.insert(def.name.clone(), def);
                }
                StmtKind::EnumDef(def) => {
                    enums.insert(def.name.clone(), def);
                }
                _ => {}
            }
        }
        Self {
            globals: HashMap::new(),
            functions,
            structs,
            enums,
        }
    }

    fn check_program(&mut self, program: &'a Program) -> Result<(), CompileError> {
        // Globals first so function bodies can reference them.
        for stmt in &program.statements {
            if let StmtKind::VarDecl {
                name, ty, value, mutable,
            } = &stmt.kind
            {
                let value_type = match value {
                    Some(value) => {
                        Some(self.type_of(value, &HashMap::new(), None)?)
                    }
                    None => None,
                };
                let declared = ty.clone().or(value_type.clone()).unwrap_or(Type::Int);
                if let (Some(declared), Some(actual)) = (ty.as_ref(), value_type.as_ref()) {
                    self.ensure_assignable(declared, actual, stmt.line, stmt.column)?;
                }
                self.globals.insert(name.clone(), (declared, *mutable));
            }
        }

        for stmt in &program.statements {
            match &stmt.kind {
                StmtKind::FunctionDef(def) => {
                    let mut locals = self.param_env(&def.params, None);
                    self.check_defaults(&def.params)?;
                    for inner in &def.body.statements {
                        self.check_statement(
                            inner,
                            &mut locals,
                            def.return_type.as_ref(),
                            None,
                        )?;
                    }
                }
                StmtKind::StructDef(def) => {
                    // Generic struct bodies mention unsubstituted type
                    // parameters; their usages are rejected at resolution.
                    if !def.type_params.is_empty() {
                        continue;
                    }
                    for method in &def.methods {
                        let mut locals = self.param_env(&method.params, Some(def));
                        self.check_defaults(&method.params)?;
                        for inner in &method.body.statements {
                            self.check_statement(
                                inner,
                                &mut locals,
                                method.return_type.as_ref(),
                                Some(def),
                            )?;
                        }
                    }
                }
                StmtKind::VarDecl { .. }
                | StmtKind::EnumDef(_)
                | StmtKind::InterfaceDef(_) => {}
                _ => {
                    let mut locals = HashMap::new();
                    self.check_statement(stmt, &mut locals, None, None)?;
                }
            }
        }

        Ok(())
    }

    /// Builds the starting environment for a function or method body.
    fn param_env(&self, params: &[Param], owner: Option<&StructDef>) -> Env {
        let mut env = HashMap::new();
        if let Some(owner) = owner {
            env.insert("self".to_string(), (Type::Named(owner.name.clone()), false));
        }
        for param in params {
            env.insert(
                param.name.clone(),
                (param.ty.clone().unwrap_or(Type::Int), true),
            );
        }
        env
    }

    /// Default expressions must be typable in isolation and match the
    /// declared parameter type.
    fn check_defaults(&self, params: &[Param]) -> Result<(), CompileError> {
        for param in params {
            if let Some(default) = &param.default {
                let actual = self.type_of(default, &HashMap::new(), None)?;
                if let Some(expected) = &param.ty {
                    self.ensure_assignable(expected, &actual, default.line, default.column)?;
                }
            }
        }
        Ok(())
    }

    fn check_statement(
        &self,
        stmt: &Stmt,
        locals: &mut Env,
        func_ret: Option<&Type>,
        current_struct: Option<&StructDef>,
    ) -> Result<(), CompileError> {
        match &stmt.kind {
            StmtKind::VarDecl {
                name, ty, value, mutable,
            } => {
                let value_type = match value {
                    Some(value) => Some(self.type_of(value, locals, current_struct)?),
                    None => None,
                };
                if let (Some(declared), Some(actual)) = (ty.as_ref(), value_type.as_ref()) {
                    self.ensure_assignable(declared, actual, stmt.line, stmt.column)?;
                }
                let declared = ty.clone().or(value_type).unwrap_or(Type::Int);
                locals.insert(name.clone(), (declared, *mutable));
            }
            StmtKind::TupleUnpack {
                names, types, value, mutable,
            } => {
                let value_type = self.type_of(value, locals, current_struct)?;
                let Type::Tuple(elem_types) = value_type else {
                    return Err(CompileError::type_error(
                        format!("Cannot unpack non-tuple type '{}'", value_type),
                        stmt.line,
                        stmt.column,
                    ));
                };
                if elem_types.len() != names.len() {
                    return Err(CompileError::type_error(
                        format!(
                            "Tuple unpacking: expected {} values, got {} names",
                            elem_types.len(),
                            names.len()
                        ),
                        stmt.line,
                        stmt.column,
                    ));
                }
                for (i, name) in names.iter().enumerate() {
                    let declared = match types.get(i).cloned().flatten() {
                        Some(declared) => {
                            self.ensure_assignable(
                                &declared,
                                &elem_types[i],
                                stmt.line,
                                stmt.column,
                            )?;
                            declared
                        }
                        None => elem_types[i].clone(),
                    };
                    locals.insert(name.clone(), (declared, *mutable));
                }
            }
            StmtKind::Assignment { target, value } => {
                let target_type = self.type_of(target, locals, current_struct)?;
                let value_type = self.type_of(value, locals, current_struct)?;
                self.ensure_assignable(&target_type, &value_type, stmt.line, stmt.column)?;
            }
            StmtKind::Expr(expr) => {
                self.type_of(expr, locals, current_struct)?;
            }
            StmtKind::Return(value) => {
                let actual = match value {
                    Some(value) => self.type_of(value, locals, current_struct)?,
                    None => Type::Void,
                };
                if let Some(expected) = func_ret {
                    self.ensure_assignable(expected, &actual, stmt.line, stmt.column)?;
                }
            }
            StmtKind::Defer(body) => {
                let mut scope = locals.clone();
                for inner in &body.statements {
                    self.check_statement(inner, &mut scope, func_ret, current_struct)?;
                }
            }
            StmtKind::Block(body) => {
                let mut scope = locals.clone();
                for inner in &body.statements {
                    self.check_statement(inner, &mut scope, func_ret, current_struct)?;
                }
            }
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let cond = self.type_of(condition, locals, current_struct)?;
                self.require_bool(&cond, condition.line, condition.column)?;
                let mut then_scope = locals.clone();
                for inner in &then_block.statements {
                    self.check_statement(inner, &mut then_scope, func_ret, current_struct)?;
                }
                if let Some(else_stmt) = else_block {
                    let mut else_scope = locals.clone();
                    self.check_statement(else_stmt, &mut else_scope, func_ret, current_struct)?;
                }
            }
            StmtKind::While { condition, body } => {
                let cond = self.type_of(condition, locals, current_struct)?;
                self.require_bool(&cond, condition.line, condition.column)?;
                let mut scope = locals.clone();
                for inner in &body.statements {
                    self.check_statement(inner, &mut scope, func_ret, current_struct)?;
                }
            }
            StmtKind::For {
                var, start, end, body,
            } => {
                let start_t = self.type_of(start, locals, current_struct)?;
                let end_t = self.type_of(end, locals, current_struct)?;
                self.require_numeric(&start_t, start.line, start.column)?;
                self.require_numeric(&end_t, end.line, end.column)?;
                let mut scope = locals.clone();
                scope.insert(var.clone(), (Type::Int, true));
                for inner in &body.statements {
                    self.check_statement(inner, &mut scope, func_ret, current_struct)?;
                }
            }
            StmtKind::FunctionDef(_)
            | StmtKind::StructDef(_)
            | StmtKind::EnumDef(_)
            | StmtKind::InterfaceDef(_) => {}
        }
        Ok(())
    }

    /// Computes the type of an expression, validating as it goes.
    fn type_of(
        &self,
        expr: &Expr,
        locals: &Env,
        current_struct: Option<&StructDef>,
    ) -> Result<Type, CompileError> {
        match &expr.kind {
            ExprKind::IntLiteral(_) => Ok(Type::Int),
            ExprKind::DecLiteral(_) => Ok(Type::Dec),
            ExprKind::StrLiteral(_) => Ok(Type::Str),
            ExprKind::BoolLiteral(_) => Ok(Type::Bool),
            ExprKind::NullLiteral => Ok(Type::Pointer(Box::new(Type::Void))),
            // Interpolated strings are re-parsed at codegen; their type is string.
            ExprKind::InterpString(_) => Ok(Type::Str),
            ExprKind::SelfExpr => match current_struct {
                Some(def) => Ok(Type::Named(def.name.clone())),
                None => Err(CompileError::type_error(
                    "'self' used outside of method",
                    expr.line,
                    expr.column,
                )),
            },
            ExprKind::Identifier(name) => {
                if let Some((ty, _)) = locals.get(name).or_else(|| self.globals.get(name)) {
                    return Ok(ty.clone());
                }
                if name == "argc" || name == "argv" {
                    return Ok(Type::Int);
                }
                if self.enums.contains_key(name) {
                    return Ok(Type::Named(name.clone()));
                }
                Err(CompileError::type_error(
                    format!("Undefined identifier '{}'", name),
                    expr.line,
                    expr.column,
                ))
            }
            ExprKind::AddressOf(operand) => {
                let inner = self.type_of(operand, locals, current_struct)?;
                Ok(Type::Pointer(Box::new(inner)))
            }
            ExprKind::Dereference(operand) => {
                let inner = self.type_of(operand, locals, current_struct)?;
                match inner {
                    Type::Pointer(pointee) => Ok(*pointee),
                    other => Err(CompileError::type_error(
                        format!("Cannot dereference non-pointer type '{}'", other),
                        expr.line,
                        expr.column,
                    )),
                }
            }
            ExprKind::Unary { op, operand } => {
                let operand_t = self.type_of(operand, locals, current_struct)?;
                match op {
                    UnaryOp::Neg | UnaryOp::Pos => {
                        self.require_numeric(&operand_t, expr.line, expr.column)?;
                        Ok(operand_t)
                    }
                    UnaryOp::Not => {
                        self.require_bool(&operand_t, expr.line, expr.column)?;
                        Ok(Type::Bool)
                    }
                }
            }
            ExprKind::Binary { left, op, right } => {
                let left_t = self.type_of(left, locals, current_struct)?;
                let right_t = self.type_of(right, locals, current_struct)?;
                match op {
                    BinaryOp::Add => {
                        // `+` with a string on either side concatenates; the
                        // numeric operand is coerced to text at codegen time.
                        if left_t == Type::Str || right_t == Type::Str {
                            return Ok(Type::Str);
                        }
                        self.require_numeric(&left_t, left.line, left.column)?;
                        self.require_numeric(&right_t, right.line, right.column)?;
                        Ok(self.widen(&left_t, &right_t))
                    }
                    BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                        self.require_numeric(&left_t, left.line, left.column)?;
                        self.require_numeric(&right_t, right.line, right.column)?;
                        Ok(self.widen(&left_t, &right_t))
                    }
                    BinaryOp::Eq | BinaryOp::Ne => {
                        if !left_t.is_comparable_with(&right_t) {
                            return Err(CompileError::type_error(
                                format!("Type mismatch: {} vs {}", left_t, right_t),
                                expr.line,
                                expr.column,
                            ));
                        }
                        Ok(Type::Bool)
                    }
                    BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                        self.require_numeric(&left_t, left.line, left.column)?;
                        self.require_numeric(&right_t, right.line, right.column)?;
                        Ok(Type::Bool)
                    }
                    BinaryOp::And | BinaryOp::Or => {
                        self.require_bool(&left_t, left.line, left.column)?;
                        self.require_bool(&right_t, right.line, right.column)?;
                        Ok(Type::Bool)
                    }
                }
            }
            ExprKind::FieldAccess { receiver, field } => {
                let receiver_t = self.type_of(receiver, locals, current_struct)?;
                let Type::Named(struct_name) = &receiver_t else {
                    return Err(CompileError::type_error(
                        format!("Field access on non-struct type '{}'", receiver_t),
                        expr.line,
                        expr.column,
                    ));
                };
                let Some(def) = self.structs.get(struct_name.as_str()) else {
                    return Err(CompileError::type_error(
                        format!("Unknown struct type '{}'", struct_name),
                        expr.line,
                        expr.column,
                    ));
                };
                for decl in &def.fields {
                    if decl.name == *field {
                        return Ok(decl.ty.clone());
                    }
                }
                Err(CompileError::type_error(
                    format!("Unknown field '{}' on struct '{}'", field, struct_name),
                    expr.line,
                    expr.column,
                ))
            }
            ExprKind::EnumAccess { enum_name, .. } => Ok(Type::Named(enum_name.clone())),
            ExprKind::Index { receiver, index } => {
                let receiver_t = self.type_of(receiver, locals, current_struct)?;
                if !receiver_t.is_indexable() {
                    return Err(CompileError::type_error(
                        format!("Indexing requires array, got '{}'", receiver_t),
                        expr.line,
                        expr.column,
                    ));
                }
                let index_t = self.type_of(index, locals, current_struct)?;
                self.require_numeric(&index_t, index.line, index.column)?;
                Ok(receiver_t.element_type())
            }
            ExprKind::New {
                struct_name,
                initializers,
                ..
            } => {
                let Some(def) = self.structs.get(struct_name.as_str()) else {
                    return Err(CompileError::type_error(
                        format!("Unknown struct type '{}'", struct_name),
                        expr.line,
                        expr.column,
                    ));
                };
                for (field, value) in initializers {
                    let Some(decl) = def.fields.iter().find(|f| &f.name == field) else {
                        return Err(CompileError::type_error(
                            format!("Unknown field '{}' on struct '{}'", field, struct_name),
                            value.line,
                            value.column,
                        ));
                    };
                    let actual = self.type_of(value, locals, current_struct)?;
                    self.ensure_assignable(&decl.ty, &actual, value.line, value.column)?;
                }
                Ok(Type::Named(struct_name.clone()))
            }
            ExprKind::ArrayLiteral(elements) => {
                let mut element_t = Type::Int;
                for (i, element) in elements.iter().enumerate() {
                    let actual = self.type_of(element, locals, current_struct)?;
                    if i == 0 {
                        element_t = actual;
                    } else {
                        self.ensure_assignable(&element_t, &actual, element.line, element.column)?;
                    }
                }
                Ok(Type::ArrayOf(Box::new(element_t)))
            }
            ExprKind::TupleLiteral(elements) => {
                let mut types = Vec::with_capacity(elements.len());
                for element in elements {
                    types.push(self.type_of(element, locals, current_struct)?);
                }
                Ok(Type::Tuple(types))
            }
            ExprKind::Try(operand) => self.type_of(operand, locals, current_struct),
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => {
                let receiver_t = self.type_of(receiver, locals, current_struct)?;
                let Type::Named(struct_name) = &receiver_t else {
                    return Err(CompileError::type_error(
                        format!("Method call on non-struct type '{}'", receiver_t),
                        expr.line,
                        expr.column,
                    ));
                };
                let Some(def) = self.structs.get(struct_name.as_str()) else {
                    return Err(CompileError::type_error(
                        format!("Method call on non-struct type '{}'", receiver_t),
                        expr.line,
                        expr.column,
                    ));
                };
                let Some(method_def) = def.methods.iter().find(|m| &m.name == method) else {
                    return Err(CompileError::type_error(
                        format!("Unknown method '{}' on struct '{}'", method, struct_name),
                        expr.line,
                        expr.column,
                    ));
                };
                self.check_call_args(
                    method,
                    &method_def.params,
                    args,
                    locals,
                    current_struct,
                    expr,
                )?;
                Ok(method_def
                    .return_type
                    .clone()
                    .unwrap_or(Type::Int))
            }
            ExprKind::Call { name, args } => {
                if let Some((_, param_slots, ret)) = builtin_signature(name) {
                    if args.len() != param_slots.len() {
                        return Err(CompileError::type_error(
                            format!(
                                "Function '{}' expects {} args, got {}",
                                name,
                                param_slots.len(),
                                args.len()
                            ),
                            expr.line,
                            expr.column,
                        ));
                    }
                    for (slot, arg) in param_slots.iter().zip(args) {
                        let actual = self.type_of(arg, locals, current_struct)?;
                        if let Some(expected) = slot {
                            let expected_t = Type::from_name(expected);
                            // The untyped `array` slot accepts any array.
                            if expected_t == Type::Array && actual.is_indexable() {
                                continue;
                            }
                            self.ensure_assignable(&expected_t, &actual, arg.line, arg.column)?;
                        }
                    }
                    return Ok(ret.map(Type::from_name).unwrap_or(Type::Void));
                }

                let Some(def) = self.functions.get(name.as_str()) else {
                    return Err(CompileError::type_error(
                        format!("Unknown function '{}'", name),
                        expr.line,
                        expr.column,
                    ));
                };
                self.check_call_args(name, &def.params, args, locals, current_struct, expr)?;
                Ok(def.return_type.clone().unwrap_or(Type::Int))
            }
        }
    }

    /// Validates call arity considering trailing defaults, then each supplied
    /// argument against its parameter type.
    fn check_call_args(
        &self,
        name: &str,
        params: &[Param],
        args: &[Expr],
        locals: &Env,
        current_struct: Option<&StructDef>,
        call: &Expr,
    ) -> Result<(), CompileError> {
        let required = params.iter().filter(|p| p.default.is_none()).count();
        if args.len() < required || args.len() > params.len() {
            return Err(CompileError::type_error(
                format!(
                    "Function '{}' expects {} to {} args, got {}",
                    name,
                    required,
                    params.len(),
                    args.len()
                ),
                call.line,
                call.column,
            ));
        }
        for (param, arg) in params.iter().zip(args) {
            let actual = self.type_of(arg, locals, current_struct)?;
            let expected = param.ty.clone().unwrap_or(Type::Int);
            self.ensure_assignable(&expected, &actual, arg.line, arg.column)?;
        }
        Ok(())
    }

    /// Result type of a numeric operator: `dec` if either side is `dec`.
    fn widen(&self, left: &Type, right: &Type) -> Type {
        if *left == Type::Dec || *right == Type::Dec {
            Type::Dec
        } else {
            Type::Int
        }
    }

    fn ensure_assignable(
        &self,
        expected: &Type,
        actual: &Type,
        line: usize,
        column: usize,
    ) -> Result<(), CompileError> {
        if expected.is_assignable_from(actual) {
            Ok(())
        } else {
            Err(CompileError::type_error(
                format!("Type mismatch: expected {}, got {}", expected, actual),
                line,
                column,
            ))
        }
    }

    fn require_numeric(&self, ty: &Type, line: usize, column: usize) -> Result<(), CompileError> {
        if ty.is_numeric() {
            Ok(())
        } else {
            Err(CompileError::type_error(
                format!("Numeric type required, got {}", ty),
                line,
                column,
            ))
        }
    }

    fn require_bool(&self, ty: &Type, line: usize, column: usize) -> Result<(), CompileError> {
        if *ty == Type::Bool {
            Ok(())
        } else {
            Err(CompileError::type_error(
                format!("Boolean type required, got {}", ty),
                line,
                column,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::tokenize;
    use crate::compiler::parser::parse;

    fn check_source(source: &str) -> Result<(), CompileError> {
        type_check(&parse(tokenize(source).unwrap()).unwrap())
    }

    #[test]
    fn arithmetic_and_comparison_rules() {
        check_source("Main() { var int x = 1 + 2 * 3; var bool b = x < 10; }\n").unwrap();
        assert!(check_source("Main() { var int x = 1 + true; }\n").is_err());
        assert!(check_source("Main() { var bool b = \"a\" < \"b\"; }\n").is_err());
    }

    #[test]
    fn string_plus_anything_is_string() {
        check_source("Main() { var string s = \"hello \" + 42; }\n").unwrap();
        check_source("Main() { var string s = 42 + \" items\"; }\n").unwrap();
        assert!(check_source("Main() { var int n = \"a\" + 1; }\n").is_err());
    }

    #[test]
    fn division_widens_to_dec() {
        check_source("Main() { var dec d = 1 / 2.0; }\n").unwrap();
        assert!(check_source("Main() { var int i = 1.5 * 2; }\n").is_err());
    }

    #[test]
    fn int_widens_to_dec_but_not_back() {
        check_source("Main() { var dec d = 3; }\n").unwrap();
        assert!(check_source("Main() { var int i = 3.5; }\n").is_err());
    }

    #[test]
    fn equality_requires_identical_types() {
        check_source("Main() { var bool b = 1 == 2; }\n").unwrap();
        assert!(check_source("Main() { var bool b = 1 == \"1\"; }\n").is_err());
    }

    #[test]
    fn null_compares_with_pointers() {
        check_source(
            "Main() { var int x = 1; var *int p = &x; var bool b = p == null; }\n",
        )
        .unwrap();
    }

    #[test]
    fn null_assigns_to_pointer_only() {
        check_source("Main() { var *int p = null; }\n").unwrap();
        assert!(check_source("Main() { var int i = null; }\n").is_err());
    }

    #[test]
    fn logical_operators_require_bool() {
        check_source("Main() { var bool b = true && false || true; }\n").unwrap();
        assert!(check_source("Main() { var bool b = 1 && true; }\n").is_err());
    }

    #[test]
    fn not_requires_bool_negate_requires_numeric() {
        check_source("Main() { var bool b = !false; var int n = -3; }\n").unwrap();
        assert!(check_source("Main() { var bool b = !3; }\n").is_err());
        assert!(check_source("Main() { var int n = -true; }\n").is_err());
    }

    #[test]
    fn condition_must_be_bool() {
        assert!(check_source("Main() { if (1) { } }\n").is_err());
        assert!(check_source("Main() { while (\"x\") { } }\n").is_err());
        check_source("Main() { if (1 < 2) { } }\n").unwrap();
    }

    #[test]
    fn dereference_requires_pointer() {
        check_source("Main() { var int x = 1; var *int p = &x; var int y = *p; }\n").unwrap();
        assert!(check_source("Main() { var int x = 1; var int y = *x; }\n").is_err());
    }

    #[test]
    fn index_requires_array_and_numeric_index() {
        check_source("Main() { var int[] a = [1, 2]; var int x = a[0]; }\n").unwrap();
        assert!(check_source("Main() { var int n = 3; var int x = n[0]; }\n").is_err());
        assert!(
            check_source("Main() { var int[] a = [1]; var int x = a[\"0\"]; }\n").is_err()
        );
    }

    #[test]
    fn typed_array_yields_element_type() {
        check_source(
            "Main() { var string[] names = [\"a\", \"b\"]; var string n = names[1]; }\n",
        )
        .unwrap();
        assert!(
            check_source(
                "Main() { var string[] names = [\"a\"]; var int n = names[0]; }\n"
            )
            .is_err()
        );
    }

    #[test]
    fn array_literal_elements_must_agree() {
        assert!(check_source("Main() { var a = [1, \"two\"]; }\n").is_err());
    }

    #[test]
    fn struct_field_types_are_enforced() {
        let src = "struct P { var int x; }\nMain() { var P p = new P{x: 7}; var int v = p.x; }\n";
        check_source(src).unwrap();
        assert!(
            check_source("struct P { var int x; }\nMain() { var P p = new P{x: \"no\"}; }\n")
                .is_err()
        );
        assert!(
            check_source("struct P { var int x; }\nMain() { var P p = new P{y: 1}; }\n")
                .is_err()
        );
    }

    #[test]
    fn unknown_field_access_is_rejected() {
        assert!(
            check_source("struct P { var int x; }\nMain() { var P p = new P{}; Print(p.z); }\n")
                .is_err()
        );
    }

    #[test]
    fn method_call_checks_arity_and_types() {
        let src = "struct C { var int total; add(n: int) -> int { return self.total + n; } }\nMain() { var C c = new C{}; var int t = c.add(4); }\n";
        check_source(src).unwrap();
        assert!(check_source(
            "struct C { var int total; add(n: int) -> int { return n; } }\nMain() { var C c = new C{}; c.add(\"x\"); }\n"
        )
        .is_err());
        assert!(check_source(
            "struct C { var int total; add(n: int) -> int { return n; } }\nMain() { var C c = new C{}; c.add(1, 2); }\n"
        )
        .is_err());
    }

    #[test]
    fn default_arguments_widen_the_accepted_arity() {
        let src = "f(a: int, b: int = 2, c: int = 3) -> int { return a + b + c; }\nMain() { var int x = f(1); var int y = f(1, 2); var int z = f(1, 2, 3); }\n";
        check_source(src).unwrap();
        assert!(check_source(
            "f(a: int, b: int = 2) -> int { return a; }\nMain() { f(); }\n"
        )
        .is_err());
        assert!(check_source(
            "f(a: int, b: int = 2) -> int { return a; }\nMain() { f(1, 2, 3); }\n"
        )
        .is_err());
    }

    #[test]
    fn builtin_signatures_are_enforced() {
        check_source("Main() { var string body = HttpGet(\"h\", \"/\", 80); }\n").unwrap();
        assert!(check_source("Main() { TcpConnect(80, \"host\"); }\n").is_err());
        assert!(check_source("Main() { Sleep(); }\n").is_err());
        assert!(check_source("Main() { var int n = StrLen(42); }\n").is_err());
    }

    #[test]
    fn len_accepts_any_argument() {
        check_source("Main() { var int[] a = [1]; Print(Len(a)); }\n").unwrap();
        check_source("Main() { Print(Len(\"abc\")); }\n").unwrap();
    }

    #[test]
    fn tuple_unpack_arity_must_match() {
        check_source("Main() { var x, y = (1, 2); Print(x + y); }\n").unwrap();
        assert!(check_source("Main() { var x, y, z = (1, 2); }\n").is_err());
        assert!(check_source("Main() { var x, y = 5; }\n").is_err());
    }

    #[test]
    fn tuple_unpack_checks_declared_types() {
        check_source("Main() { var int a, string b = (1, \"s\"); }\n").unwrap();
        assert!(check_source("Main() { var string a, int b = (1, \"s\"); }\n").is_err());
    }

    #[test]
    fn try_preserves_operand_type() {
        check_source(
            "risky() -> int { return -1; }\nMain() { var int r = risky()?; Print(r); }\n",
        )
        .unwrap();
    }

    #[test]
    fn return_type_is_checked() {
        assert!(check_source("f() -> int { return \"no\"; }\nMain() {}\n").is_err());
        check_source("f() -> dec { return 1; }\nMain() {}\n").unwrap();
    }

    #[test]
    fn enum_equality_works_on_same_enum() {
        check_source(
            "enum Status { OK, Err }\nMain() { var Status s = Status.OK; if (s == Status.Err) { } }\n",
        )
        .unwrap();
    }
}
