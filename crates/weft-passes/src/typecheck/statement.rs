//! Statement checking.

use std::collections::{HashMap, HashSet};

use weft_ast::{
    AttributeKind, BinaryOp, Block, CallTarget, Callee, CaseSelector, Expression, ExpressionKind,
    Handle, LocalKind, Resolved, Scalar, ShaderStage, Span, Statement, StatementKind, SwitchCase,
    Type, TypeExpr, Warning,
};

use super::{Check, Checker, FunctionContext, fail};

impl Checker<'_> {
    /// Checks a block in a new scope.
    pub(super) fn block(&mut self, block: &Block) -> Check<()> {
        self.scopes.push(HashMap::new());
        self.statements(block)?;
        self.scopes.pop();
        Ok(())
    }

    /// Checks statements in the current scope. Code after a `return`,
    /// `break`, `continue` or `discard` gets one warning per block.
    pub(super) fn statements(&mut self, block: &Block) -> Check<()> {
        let mut terminated = false;
        let mut warned = false;
        for statement in block {
            if terminated && !warned {
                self.warnings.push(Warning::new("code is unreachable", statement.span));
                warned = true;
            }
            self.statement(statement)?;
            terminated |= statement.is_terminator();
        }
        Ok(())
    }

    fn context(&mut self) -> &mut FunctionContext {
        self.function
            .as_mut()
            .expect("statements are checked inside a function")
    }

    fn declared(&mut self, ty: Option<&TypeExpr>) -> Check<Option<Handle<Type>>> {
        ty.map(|ty| self.resolve_type(ty)).transpose()
    }

    fn statement(&mut self, statement: &Statement) -> Check<()> {
        let span = statement.span;
        match &statement.kind {
            StatementKind::Let { local, ty, value } => {
                let declared = self.declared(ty.as_ref())?;
                let ty = match declared {
                    Some(ty) => {
                        self.convert(*value, ty)?;
                        ty
                    }
                    None => {
                        self.concretize(*value)?;
                        self.value(*value)?
                    }
                };
                let bindable = self.is_constructible(ty)
                    || matches!(self.module.types[ty], Type::Pointer { .. })
                    || self.module.types[ty].is_handle();
                if !bindable {
                    return fail(
                        format!("'{}' cannot be bound with 'let'", self.module.type_name(ty)),
                        span,
                    );
                }
                self.module.locals[*local].ty = Some(ty);
                self.declare(*local)
            }
            StatementKind::Const { local, ty, value } => {
                let declared = self.declared(ty.as_ref())?;
                let mut ty = self.value(*value)?;
                if let Some(declared) = declared {
                    self.convert(*value, declared)?;
                    ty = declared;
                }
                let Some(constant) = self.module.expressions[*value].constant_value().cloned() else {
                    return fail(
                        "const initializer must be a const-expression",
                        self.span(*value),
                    );
                };
                self.module.locals[*local].ty = Some(ty);
                self.local_consts.insert(*local, constant);
                self.declare(*local)
            }
            StatementKind::Var {
                local,
                ty,
                initializer,
            } => {
                let declared = self.declared(ty.as_ref())?;
                let store = match (declared, *initializer) {
                    (Some(ty), Some(init)) => {
                        self.convert(init, ty)?;
                        ty
                    }
                    (Some(ty), None) => ty,
                    (None, Some(init)) => {
                        self.concretize(init)?;
                        self.value(init)?
                    }
                    (None, None) => {
                        let name = &self.module.locals[*local].name.name;
                        return fail(format!("variable '{name}' needs a type or an initializer"), span);
                    }
                };
                if !self.is_constructible(store) {
                    return fail(
                        format!(
                            "'{}' cannot be stored in a function-scope variable",
                            self.module.type_name(store)
                        ),
                        span,
                    );
                }
                self.module.locals[*local].ty = Some(store);
                self.declare(*local)
            }
            StatementKind::Assign { target, op, value } => self.assignment(*target, *op, *value, span),
            StatementKind::Phony(value) => {
                self.value(*value)?;
                self.concretize(*value)
            }
            StatementKind::Increment(target) | StatementKind::Decrement(target) => {
                let store = self.writable(*target, span)?;
                match self.module.types[store] {
                    Type::Scalar(s) if s.is_integer() => Ok(()),
                    _ => fail(
                        format!(
                            "increment and decrement need an integer, found '{}'",
                            self.module.type_name(store)
                        ),
                        span,
                    ),
                }
            }
            StatementKind::Call(call) => self.call_statement(*call, span),
            StatementKind::If {
                condition,
                accept,
                reject,
            } => {
                self.condition(*condition)?;
                self.block(accept)?;
                self.block(reject)
            }
            StatementKind::Switch { selector, cases } => self.switch(*selector, cases, span),
            StatementKind::Loop {
                body,
                continuing,
                break_if,
            } => {
                // The continuing block and break-if see the body's declarations.
                self.scopes.push(HashMap::new());
                self.context().loops += 1;
                self.statements(body)?;
                let outer = std::mem::replace(&mut self.context().in_continuing, true);
                self.scopes.push(HashMap::new());
                self.statements(continuing)?;
                if let Some(condition) = *break_if {
                    self.condition(condition)?;
                }
                self.scopes.pop();
                self.context().in_continuing = outer;
                self.context().loops -= 1;
                self.scopes.pop();
                Ok(())
            }
            StatementKind::For {
                init,
                condition,
                update,
                body,
            } => {
                self.scopes.push(HashMap::new());
                if let Some(init) = init {
                    self.statement(init)?;
                }
                if let Some(condition) = *condition {
                    self.condition(condition)?;
                }
                if let Some(update) = update {
                    self.statement(update)?;
                }
                self.context().loops += 1;
                self.block(body)?;
                self.context().loops -= 1;
                self.scopes.pop();
                Ok(())
            }
            StatementKind::While { condition, body } => {
                self.condition(*condition)?;
                self.context().loops += 1;
                self.block(body)?;
                self.context().loops -= 1;
                Ok(())
            }
            StatementKind::Block(body) => self.block(body),
            StatementKind::Break => {
                let context = self.context();
                if context.loops == 0 && context.switches == 0 {
                    return fail("'break' must be inside a loop or switch", span);
                }
                if context.in_continuing {
                    return fail("use 'break if' to leave a loop from its continuing block", span);
                }
                Ok(())
            }
            StatementKind::Continue => {
                let context = self.context();
                if context.loops == 0 {
                    return fail("'continue' must be inside a loop", span);
                }
                if context.in_continuing {
                    return fail("'continue' cannot be used in a continuing block", span);
                }
                Ok(())
            }
            StatementKind::Return(value) => {
                let context = self.context().clone();
                if context.in_continuing {
                    return fail("'return' cannot be used in a continuing block", span);
                }
                match (*value, context.result) {
                    (Some(value), Some(result)) => self.convert(value, result),
                    (None, None) => Ok(()),
                    (Some(_), None) => fail(
                        format!("function '{}' does not return a value", context.name),
                        span,
                    ),
                    (None, Some(result)) => fail(
                        format!(
                            "function '{}' must return a value of type '{}'",
                            context.name,
                            self.module.type_name(result)
                        ),
                        span,
                    ),
                }
            }
            StatementKind::Discard => match self.context().stage {
                Some(stage) if stage != ShaderStage::Fragment => {
                    fail("'discard' can only be used in fragment shaders", span)
                }
                _ => Ok(()),
            },
        }
    }

    fn condition(&mut self, condition: Handle<Expression>) -> Check<()> {
        let ty = self.value(condition)?;
        if self.module.types[ty] != Type::Scalar(Scalar::BOOL) {
            return fail(
                format!("condition must be 'bool', found '{}'", self.module.type_name(ty)),
                self.span(condition),
            );
        }
        Ok(())
    }

    /// The store type behind an assignable reference.
    fn writable(&mut self, target: Handle<Expression>, span: Span) -> Check<Handle<Type>> {
        let ty = self.expression(target)?;
        match self.module.types[ty] {
            Type::Reference { base, access, .. } if access.can_write() => {
                if matches!(self.module.types[base], Type::Atomic(_)) {
                    return fail("atomics can only be written with atomicStore", span);
                }
                Ok(base)
            }
            Type::Reference { .. } => fail("cannot assign to a read-only reference", span),
            _ => match self.root_local(target) {
                Some(name) => fail(format!("cannot assign to '{name}', which is immutable"), span),
                None => fail(
                    format!("cannot assign to a value of type '{}'", self.module.type_name(ty)),
                    span,
                ),
            },
        }
    }

    /// The name of the immutable local or constant an expression is rooted at.
    fn root_local(&self, mut e: Handle<Expression>) -> Option<String> {
        loop {
            match &self.module.expressions[e].kind {
                ExpressionKind::Index { base, .. } | ExpressionKind::Member { base, .. } => e = *base,
                ExpressionKind::Identifier { name, resolved } => {
                    return match resolved {
                        Some(Resolved::Local(local)) => {
                            (self.module.locals[*local].kind != LocalKind::Var).then(|| name.name.clone())
                        }
                        Some(Resolved::Constant(_)) => Some(name.name.clone()),
                        _ => None,
                    };
                }
                _ => return None,
            }
        }
    }

    fn assignment(
        &mut self,
        target: Handle<Expression>,
        op: Option<BinaryOp>,
        value: Handle<Expression>,
        span: Span,
    ) -> Check<()> {
        let store = self.writable(target, span)?;
        let Some(op) = op else {
            return self.convert(value, store);
        };
        let result = self.binary_operands(op, target, value, span)?;
        if result != store {
            return fail(
                format!(
                    "'{}=' produces '{}', which cannot be stored in '{}'",
                    op.symbol(),
                    self.module.type_name(result),
                    self.module.type_name(store)
                ),
                span,
            );
        }
        Ok(())
    }

    fn call_statement(&mut self, call: Handle<Expression>, span: Span) -> Check<()> {
        let result = self.call(call)?;
        if let Some(ty) = result {
            self.module.expressions[call].ty = Some(ty);
        }
        let ExpressionKind::Call { target, callee, .. } = &self.module.expressions[call].kind else {
            unreachable!("call statements hold call expressions")
        };
        let must_use = match callee {
            Some(Callee::Builtin(builtin)) => result.is_some() && builtin.must_use(),
            Some(Callee::Function(f)) => self.module.functions[*f]
                .attributes
                .iter()
                .any(|a| matches!(a.kind, AttributeKind::MustUse)),
            Some(Callee::Constructor(_)) => true,
            None => false,
        };
        if must_use {
            let name = match target {
                CallTarget::Named(ident) => ident.name.clone(),
                CallTarget::Type(_) => "constructor".to_string(),
            };
            return fail(format!("the result of '{name}' must be used"), span);
        }
        Ok(())
    }

    fn switch(&mut self, selector: Handle<Expression>, cases: &[SwitchCase], span: Span) -> Check<()> {
        let selector_ty = self.value(selector)?;
        if !matches!(self.module.types[selector_ty], Type::Scalar(s) if s.is_integer()) {
            return fail(
                format!(
                    "switch selector must be an integer, found '{}'",
                    self.module.type_name(selector_ty)
                ),
                self.span(selector),
            );
        }

        // All case values and the selector share one concrete type.
        let mut common = (!self.is_abstract(selector_ty)).then_some(selector_ty);
        for case in cases {
            for value in case.selectors.iter().filter_map(|s| match *s {
                CaseSelector::Expression(e) => Some(e),
                CaseSelector::Default => None,
            }) {
                let ty = self.value(value)?;
                if common.is_none() && !self.is_abstract(ty) {
                    common = Some(ty);
                }
            }
        }
        let common = common.unwrap_or_else(|| self.module.scalar_type(Scalar::I32));
        self.convert(selector, common)?;

        let mut seen = HashSet::new();
        let mut defaults = 0;
        for case in cases {
            for selector in &case.selectors {
                let value = match *selector {
                    CaseSelector::Default => {
                        defaults += 1;
                        continue;
                    }
                    CaseSelector::Expression(value) => value,
                };
                self.convert(value, common)?;
                let Some(constant) = self.module.expressions[value]
                    .constant_value()
                    .and_then(|v| v.as_i64())
                else {
                    return fail("case selectors must be const-expressions", self.span(value));
                };
                if !seen.insert(constant) {
                    return fail(format!("duplicate case value {constant}"), self.span(value));
                }
            }
        }
        if defaults != 1 {
            return fail("switch must have exactly one default clause", span);
        }

        self.context().switches += 1;
        for case in cases {
            self.block(&case.body)?;
        }
        self.context().switches -= 1;
        Ok(())
    }
}

/// Whether every path through `block` ends in a `return` or `discard`.
pub(super) fn returns(block: &[Statement]) -> bool {
    block.iter().any(statement_returns)
}

fn statement_returns(statement: &Statement) -> bool {
    match &statement.kind {
        StatementKind::Return(_) | StatementKind::Discard => true,
        StatementKind::If { accept, reject, .. } => returns(accept) && returns(reject),
        StatementKind::Block(body) => returns(body),
        StatementKind::Switch { cases, .. } => cases.iter().all(|c| returns(&c.body)),
        StatementKind::Loop { body, break_if, .. } => break_if.is_none() && !breaks(body),
        _ => false,
    }
}

/// Whether `block` contains a `break` that leaves the enclosing loop.
fn breaks(block: &[Statement]) -> bool {
    block.iter().any(|statement| match &statement.kind {
        StatementKind::Break => true,
        StatementKind::If { accept, reject, .. } => breaks(accept) || breaks(reject),
        StatementKind::Block(body) => breaks(body),
        // Breaks inside nested loops and switches leave those instead.
        _ => false,
    })
}
