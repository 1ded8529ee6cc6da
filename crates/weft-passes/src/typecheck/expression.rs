//! Expression typing and constant folding.

use weft_ast::{
    AccessMode, AddressSpace, ArraySize, BinaryOp, BuiltinFunction, CallTarget, Callee,
    ConstantValue, Error, Expression, ExpressionKind, Function, Handle, Ident, Literal, LocalKind,
    MemberAccess, Resolved, Scalar, Span, Type, UnaryOp, VectorSize,
};

use super::types::{matrix_shape, predeclared};
use super::{Abort, Check, Checker, Global, const_error, fail};

impl Checker<'_> {
    /// Checks `h` and returns its type, which is a reference for
    /// expressions naming memory. Checking a node twice is a no-op.
    pub(super) fn expression(&mut self, h: Handle<Expression>) -> Check<Handle<Type>> {
        if let Some(ty) = self.module.expressions[h].ty {
            return Ok(ty);
        }
        let span = self.span(h);
        let ty = match self.module.expressions[h].kind.clone() {
            ExpressionKind::Literal(literal) => {
                if matches!(literal, Literal::F16(_)) {
                    self.use_f16(span)?;
                }
                self.module.expressions[h].cache_constant(literal.value());
                self.module.scalar_type(literal.scalar())
            }
            ExpressionKind::Identifier { name, .. } => self.identifier(h, &name)?,
            ExpressionKind::Unary { op, operand } => self.unary(h, op, operand)?,
            ExpressionKind::Binary { op, left, right } => {
                let ty = self.binary_operands(op, left, right, span)?;
                self.fold_binary(h, op, left, right)?;
                ty
            }
            ExpressionKind::Call { target, .. } => match self.call(h)? {
                Some(ty) => ty,
                None => {
                    let name = match target {
                        CallTarget::Named(ident) => ident.name,
                        CallTarget::Type(_) => "constructor".to_string(),
                    };
                    return fail(format!("'{name}' does not return a value"), span);
                }
            },
            ExpressionKind::Index { base, index } => self.index(h, base, index)?,
            ExpressionKind::Member { base, member, .. } => self.member(h, base, &member)?,
            ExpressionKind::BoundsCheck { .. } => {
                unreachable!("bounds checks are inserted after type checking")
            }
        };
        self.module.expressions[h].ty = Some(ty);
        Ok(ty)
    }

    /// Checks `h` and returns the type of its loaded value.
    pub(super) fn value(&mut self, h: Handle<Expression>) -> Check<Handle<Type>> {
        let ty = self.expression(h)?;
        Ok(self.module.load_type(ty))
    }

    fn constant(&self, h: Handle<Expression>) -> Option<&ConstantValue> {
        self.module.expressions[h].constant_value()
    }

    fn set_constant(&mut self, h: Handle<Expression>, value: ConstantValue) {
        self.module.expressions[h].cache_constant(value);
    }

    /// Gives an abstract node the concrete type `target`, converting its
    /// cached value.
    fn retype(&mut self, h: Handle<Expression>, target: Handle<Type>) -> Check<()> {
        let span = self.span(h);
        let scalar = self
            .leaf_scalar(target)
            .expect("abstract values convert to scalars, vectors or arrays");
        let node = &mut self.module.expressions[h];
        node.ty = Some(target);
        if let Some(value) = node.constant_value() {
            match value.convert(scalar) {
                Ok(converted) => node.replace_constant(converted),
                Err(error) => return fail(error.to_string(), span),
            }
        }
        Ok(())
    }

    /// Requires the value of `h` to have type `target`, converting abstract
    /// values.
    pub(super) fn convert(&mut self, h: Handle<Expression>, target: Handle<Type>) -> Check<()> {
        let ty = self.value(h)?;
        if ty == target {
            return Ok(());
        }
        if self.converts(ty, target) {
            return self.retype(h, target);
        }
        fail(
            format!(
                "expected '{}', found '{}'",
                self.module.type_name(target),
                self.module.type_name(ty)
            ),
            self.span(h),
        )
    }

    /// Converts an abstract value to its default concrete type.
    pub(super) fn concretize(&mut self, h: Handle<Expression>) -> Check<()> {
        let ty = self.value(h)?;
        match self.leaf_scalar(ty) {
            Some(s) if s.is_abstract() => {
                let target = self.with_scalar(ty, s.concretize());
                self.retype(h, target)
            }
            _ => Ok(()),
        }
    }

    fn resolve(&mut self, h: Handle<Expression>, to: Resolved) {
        if let ExpressionKind::Identifier { resolved, .. } = &mut self.module.expressions[h].kind {
            *resolved = Some(to);
        }
    }

    pub(super) fn set_callee(&mut self, h: Handle<Expression>, to: Callee) {
        if let ExpressionKind::Call { callee, .. } = &mut self.module.expressions[h].kind {
            *callee = Some(to);
        }
    }

    fn identifier(&mut self, h: Handle<Expression>, name: &Ident) -> Check<Handle<Type>> {
        let local = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name.name).copied());
        if let Some(local) = local {
            let ty = self.module.locals[local]
                .ty
                .expect("locals are typed before they come into scope");
            let kind = self.module.locals[local].kind;
            self.resolve(h, Resolved::Local(local));
            return Ok(match kind {
                LocalKind::Var => self.module.insert_type(Type::Reference {
                    space: AddressSpace::Function,
                    base: ty,
                    access: AccessMode::ReadWrite,
                }),
                LocalKind::Const => {
                    let value = self.local_consts[&local].clone();
                    self.set_constant(h, value);
                    ty
                }
                LocalKind::Let | LocalKind::Parameter => ty,
            });
        }

        match self.globals.get(&name.name).copied() {
            Some(Global::Constant(c)) => {
                let constant = &self.module.constants[c];
                let ty = constant
                    .resolved_ty
                    .expect("checked constants are typed");
                // Overrides have no value until pipeline creation.
                let value = if constant.is_override {
                    None
                } else {
                    constant
                        .initializer
                        .and_then(|init| self.module.expressions[init].constant_value())
                        .cloned()
                };
                if let Some(value) = value {
                    self.set_constant(h, value);
                }
                self.resolve(h, Resolved::Constant(c));
                Ok(ty)
            }
            Some(Global::Variable(v)) => {
                let variable = &self.module.global_variables[v];
                let store = variable.resolved_ty.expect("checked variables are typed");
                let ty = if variable.space == AddressSpace::Handle {
                    store
                } else {
                    let view = Type::Reference {
                        space: variable.space,
                        base: store,
                        access: variable.access,
                    };
                    self.module.insert_type(view)
                };
                self.resolve(h, Resolved::Global(v));
                Ok(ty)
            }
            Some(Global::Function(_)) => fail(
                format!("function '{}' cannot be used as a value", name.name),
                name.span,
            ),
            Some(Global::Type(_)) => fail(
                format!("type '{}' cannot be used as a value", name.name),
                name.span,
            ),
            None if self.failed.contains(&name.name) => Err(Abort(None)),
            None => fail(format!("unresolved identifier '{}'", name.name), name.span),
        }
    }

    fn unary(&mut self, h: Handle<Expression>, op: UnaryOp, operand: Handle<Expression>) -> Check<Handle<Type>> {
        let span = self.span(h);
        match op {
            UnaryOp::AddressOf => {
                let ty = self.expression(operand)?;
                if self.is_vector_component(operand) {
                    return fail("cannot take the address of a vector component", span);
                }
                match self.module.types[ty] {
                    Type::Reference {
                        space,
                        base,
                        access,
                    } => Ok(self.module.insert_type(Type::Pointer {
                        space,
                        base,
                        access,
                    })),
                    _ => fail(
                        format!("cannot take the address of a value of type '{}'", self.module.type_name(ty)),
                        span,
                    ),
                }
            }
            UnaryOp::Deref => {
                let ty = self.value(operand)?;
                match self.module.types[ty] {
                    Type::Pointer {
                        space,
                        base,
                        access,
                    } => Ok(self.module.insert_type(Type::Reference {
                        space,
                        base,
                        access,
                    })),
                    _ => fail(
                        format!("cannot dereference a value of type '{}'", self.module.type_name(ty)),
                        span,
                    ),
                }
            }
            UnaryOp::Negate | UnaryOp::LogicalNot | UnaryOp::BitwiseNot => {
                let ty = self.value(operand)?;
                let valid = match self.module.types[ty] {
                    Type::Scalar(s) | Type::Vector { scalar: s, .. } => match op {
                        UnaryOp::Negate => s.is_numeric() && s.is_signed(),
                        UnaryOp::LogicalNot => s == Scalar::BOOL,
                        _ => s.is_integer(),
                    },
                    _ => false,
                };
                if !valid {
                    return fail(
                        format!(
                            "cannot apply '{}' to a value of type '{}'",
                            op.symbol(),
                            self.module.type_name(ty)
                        ),
                        span,
                    );
                }
                if let Some(value) = self.constant(operand) {
                    match value.unary(op) {
                        Ok(folded) => self.set_constant(h, folded),
                        Err(error) => const_error(error, span)?,
                    }
                }
                Ok(ty)
            }
        }
    }

    fn is_vector_component(&self, h: Handle<Expression>) -> bool {
        match &self.module.expressions[h].kind {
            ExpressionKind::Member { access, .. } => {
                matches!(access, Some(MemberAccess::Swizzle(_)))
            }
            ExpressionKind::Index { base, .. } => self.module.expressions[*base]
                .ty
                .map(|t| self.module.load_type(t))
                .is_some_and(|t| matches!(self.module.types[t], Type::Vector { .. })),
            _ => false,
        }
    }

    /// Unifies the leaf scalars of two operands by converting whichever is
    /// abstract.
    fn unify(
        &mut self,
        left: Handle<Expression>,
        right: Handle<Expression>,
    ) -> Check<(Handle<Type>, Handle<Type>)> {
        let (lt, rt) = (self.value(left)?, self.value(right)?);
        let (Some(ls), Some(rs)) = (self.leaf_scalar(lt), self.leaf_scalar(rt)) else {
            return Ok((lt, rt));
        };
        if ls == rs {
            Ok((lt, rt))
        } else if ls.automatically_converts_to(rs) {
            let target = self.with_scalar(lt, rs);
            self.retype(left, target)?;
            Ok((target, rt))
        } else if rs.automatically_converts_to(ls) {
            let target = self.with_scalar(rt, ls);
            self.retype(right, target)?;
            Ok((lt, target))
        } else {
            Ok((lt, rt))
        }
    }

    fn both_constant(&self, left: Handle<Expression>, right: Handle<Expression>) -> bool {
        self.constant(left).is_some() && self.constant(right).is_some()
    }

    /// Types `left op right`, converting operands as needed. Also used for
    /// compound assignment, where `left` is the target reference.
    pub(super) fn binary_operands(
        &mut self,
        op: BinaryOp,
        left: Handle<Expression>,
        right: Handle<Expression>,
        span: Span,
    ) -> Check<Handle<Type>> {
        self.value(left)?;
        self.value(right)?;

        if op.is_shift() {
            let lt = self.value(left)?;
            let integer = matches!(
                self.module.types[lt],
                Type::Scalar(s) | Type::Vector { scalar: s, .. } if s.is_integer()
            );
            if !integer {
                return self.operator_mismatch(op, left, right, span);
            }
            let amount = self.with_scalar(lt, Scalar::U32);
            self.convert(right, amount)?;
            if !self.both_constant(left, right) {
                self.concretize(left)?;
            }
            return self.value(left);
        }

        let (mut lt, mut rt) = self.unify(left, right)?;
        if !self.both_constant(left, right) {
            self.concretize(left)?;
            self.concretize(right)?;
            lt = self.value(left)?;
            rt = self.value(right)?;
        }

        let bool_ty = self.module.scalar_type(Scalar::BOOL);
        if op.is_logical() {
            if lt == bool_ty && rt == bool_ty {
                return Ok(bool_ty);
            }
            return self.operator_mismatch(op, left, right, span);
        }

        let result = match (self.module.types[lt].clone(), self.module.types[rt].clone()) {
            (Type::Scalar(s), _) | (Type::Vector { scalar: s, .. }, _) if lt == rt => {
                if op.is_comparison() {
                    let ordered = !matches!(op, BinaryOp::Equal | BinaryOp::NotEqual);
                    (!ordered || s.is_numeric()).then(|| self.with_scalar(lt, Scalar::BOOL))
                } else if op.is_bitwise() {
                    (s.is_integer() || s == Scalar::BOOL).then_some(lt)
                } else {
                    s.is_numeric().then_some(lt)
                }
            }
            (Type::Vector { size, scalar: a }, Type::Scalar(b))
            | (Type::Scalar(b), Type::Vector { size, scalar: a })
                if a == b && op.is_arithmetic() && a.is_numeric() =>
            {
                Some(self.module.insert_type(Type::Vector { size, scalar: a }))
            }
            (Type::Matrix { .. }, Type::Matrix { .. })
                if lt == rt && matches!(op, BinaryOp::Add | BinaryOp::Subtract) =>
            {
                Some(lt)
            }
            (Type::Matrix { scalar, .. }, Type::Scalar(b)) if op == BinaryOp::Multiply && scalar == b => {
                Some(lt)
            }
            (Type::Scalar(b), Type::Matrix { scalar, .. }) if op == BinaryOp::Multiply && scalar == b => {
                Some(rt)
            }
            (
                Type::Matrix {
                    columns,
                    rows,
                    scalar,
                },
                Type::Vector { size, scalar: b },
            ) if op == BinaryOp::Multiply && size == columns && scalar == b => {
                Some(self.module.insert_type(Type::Vector { size: rows, scalar }))
            }
            (
                Type::Vector { size, scalar: b },
                Type::Matrix {
                    columns,
                    rows,
                    scalar,
                },
            ) if op == BinaryOp::Multiply && size == rows && scalar == b => {
                Some(self.module.insert_type(Type::Vector {
                    size: columns,
                    scalar,
                }))
            }
            (
                Type::Matrix {
                    columns: c1,
                    rows: r1,
                    scalar: a,
                },
                Type::Matrix {
                    columns: c2,
                    rows: r2,
                    scalar: b,
                },
            ) if op == BinaryOp::Multiply && a == b && c1 == r2 => {
                Some(self.module.insert_type(Type::Matrix {
                    columns: c2,
                    rows: r1,
                    scalar: a,
                }))
            }
            _ => None,
        };
        match result {
            Some(ty) => Ok(ty),
            None => self.operator_mismatch(op, left, right, span),
        }
    }

    fn operator_mismatch<T>(
        &mut self,
        op: BinaryOp,
        left: Handle<Expression>,
        right: Handle<Expression>,
        span: Span,
    ) -> Check<T> {
        let lt = self.value(left)?;
        let rt = self.value(right)?;
        fail(
            format!(
                "cannot apply '{}' to '{}' and '{}'",
                op.symbol(),
                self.module.type_name(lt),
                self.module.type_name(rt)
            ),
            span,
        )
    }

    fn fold_binary(
        &mut self,
        h: Handle<Expression>,
        op: BinaryOp,
        left: Handle<Expression>,
        right: Handle<Expression>,
    ) -> Check<()> {
        let (Some(l), Some(r)) = (self.constant(left), self.constant(right)) else {
            return Ok(());
        };
        match ConstantValue::binary(op, l, r) {
            Ok(value) => {
                self.set_constant(h, value);
                Ok(())
            }
            Err(error) => const_error(error, self.span(h)),
        }
    }

    /// Checks a call. `None` is the result type of functions and builtins
    /// that return nothing.
    pub(super) fn call(&mut self, h: Handle<Expression>) -> Check<Option<Handle<Type>>> {
        let ExpressionKind::Call {
            target, arguments, ..
        } = self.module.expressions[h].kind.clone()
        else {
            unreachable!("call() is only used on call expressions")
        };
        let ident = match target {
            CallTarget::Type(ty) => {
                let ty = self.resolve_type(&ty)?;
                return self.construct(h, ty, &arguments).map(Some);
            }
            CallTarget::Named(ident) => ident,
        };

        if self.scopes.iter().any(|s| s.contains_key(&ident.name)) {
            return fail(format!("'{}' is not a function", ident.name), ident.span);
        }
        match self.globals.get(&ident.name).copied() {
            Some(Global::Function(f)) => return self.user_call(h, f, &ident, &arguments),
            Some(Global::Type(ty)) => return self.construct(h, ty, &arguments).map(Some),
            Some(_) => return fail(format!("'{}' is not a function", ident.name), ident.span),
            None if self.failed.contains(&ident.name) => return Err(Abort(None)),
            None => {}
        }

        if let Some(ty) = predeclared(&ident.name) {
            if ty.scalar() == Some(Scalar::F16) {
                self.use_f16(ident.span)?;
            }
            let ty = self.module.insert_type(ty);
            return self.construct(h, ty, &arguments).map(Some);
        }
        let generic = match ident.name.as_str() {
            "vec2" | "vec3" | "vec4" | "array" => true,
            name => matrix_shape(name).is_some(),
        };
        if generic {
            return self.construct_inferred(h, &ident.name, &arguments).map(Some);
        }
        match BuiltinFunction::from_name(&ident.name) {
            Some(builtin) => self.builtin(h, builtin, &arguments),
            None => fail(format!("unresolved function '{}'", ident.name), ident.span),
        }
    }

    fn user_call(
        &mut self,
        h: Handle<Expression>,
        f: Handle<Function>,
        ident: &Ident,
        arguments: &[Handle<Expression>],
    ) -> Check<Option<Handle<Type>>> {
        let function = &self.module.functions[f];
        if function.stage().is_some() {
            return fail(format!("entry point '{}' cannot be called", ident.name), ident.span);
        }
        let parameters: Vec<Handle<Type>> = function
            .parameters
            .iter()
            .map(|p| {
                self.module.locals[p.local]
                    .ty
                    .expect("parameters of checked functions are typed")
            })
            .collect();
        let result = function.result_type();
        if parameters.len() != arguments.len() {
            return fail(
                format!(
                    "function '{}' expects {} argument(s), found {}",
                    ident.name,
                    parameters.len(),
                    arguments.len()
                ),
                self.span(h),
            );
        }
        for (&argument, &parameter) in arguments.iter().zip(&parameters) {
            self.convert(argument, parameter)?;
        }
        self.set_callee(h, Callee::Function(f));
        Ok(result)
    }

    /// Splits a possibly-reference type into its memory view and store type.
    fn view(&self, ty: Handle<Type>) -> (Option<(AddressSpace, AccessMode)>, Handle<Type>) {
        match self.module.types[ty] {
            Type::Reference {
                space,
                base,
                access,
            } => (Some((space, access)), base),
            _ => (None, ty),
        }
    }

    fn rewrap(&mut self, view: Option<(AddressSpace, AccessMode)>, ty: Handle<Type>) -> Handle<Type> {
        match view {
            Some((space, access)) => self.module.insert_type(Type::Reference {
                space,
                base: ty,
                access,
            }),
            None => ty,
        }
    }

    fn index(
        &mut self,
        h: Handle<Expression>,
        base: Handle<Expression>,
        index: Handle<Expression>,
    ) -> Check<Handle<Type>> {
        let mut base_ty = self.expression(base)?;
        let index_ty = self.value(index)?;
        if !matches!(self.module.types[index_ty], Type::Scalar(s) if s.is_integer()) {
            return fail(
                format!("index must be an integer, found '{}'", self.module.type_name(index_ty)),
                self.span(index),
            );
        }
        self.concretize(index)?;
        let constant_index = self.constant(index).and_then(|v| v.as_i64());
        if constant_index.is_none() && self.is_abstract(base_ty) {
            self.concretize(base)?;
            base_ty = self.expression(base)?;
        }

        let (view, inner) = self.view(base_ty);
        let (element, count) = match self.module.types[inner] {
            Type::Array { base, size } => (
                base,
                match size {
                    ArraySize::Constant(n) => Some(n),
                    ArraySize::Runtime => None,
                },
            ),
            Type::Vector { size, scalar } => (self.module.scalar_type(scalar), Some(size.count())),
            Type::Matrix {
                columns,
                rows,
                scalar,
            } => (
                self.module.insert_type(Type::Vector { size: rows, scalar }),
                Some(columns.count()),
            ),
            _ => {
                return fail(
                    format!("cannot index into a value of type '{}'", self.module.type_name(inner)),
                    self.span(h),
                );
            }
        };
        if let (Some(i), Some(n)) = (constant_index, count) {
            if i < 0 || i >= i64::from(n) {
                return fail(
                    format!("index {i} is out of bounds for '{}'", self.module.type_name(inner)),
                    self.span(index),
                );
            }
        }

        let folded = match (self.constant(base), constant_index) {
            (Some(value), Some(i)) => usize::try_from(i)
                .ok()
                .and_then(|i| value.index(i))
                .cloned(),
            _ => None,
        };
        if let Some(value) = folded {
            self.set_constant(h, value);
        }
        Ok(self.rewrap(view, element))
    }

    fn member(&mut self, h: Handle<Expression>, base: Handle<Expression>, member: &Ident) -> Check<Handle<Type>> {
        let base_ty = self.expression(base)?;
        let (view, inner) = self.view(base_ty);
        let (access, ty) = match self.module.types[inner] {
            Type::Struct(s) => {
                let structure = &self.module.structs[s];
                let Some(index) = structure.member_index(&member.name) else {
                    return fail(
                        format!("struct '{}' has no member '{}'", structure.name.name, member.name),
                        member.span,
                    );
                };
                let ty = structure.members[index]
                    .resolved_ty
                    .expect("members of checked structs are typed");
                (MemberAccess::Field(index as u32), self.rewrap(view, ty))
            }
            Type::Vector { size, scalar } => {
                let components = swizzle(&member.name, size).ok_or_else(|| {
                    Abort(Some(Error::type_error(
                        format!(
                            "invalid swizzle '{}' for '{}'",
                            member.name,
                            self.module.type_name(inner)
                        ),
                        member.span,
                    )))
                })?;
                let ty = match VectorSize::from_u32(components.len() as u32) {
                    Some(size) => self.module.insert_type(Type::Vector { size, scalar }),
                    None => {
                        let ty = self.module.scalar_type(scalar);
                        self.rewrap(view, ty)
                    }
                };
                if let Some(ConstantValue::Vector(values)) = self.constant(base) {
                    let picked: Vec<_> = components
                        .iter()
                        .map(|&c| values[usize::from(c)].clone())
                        .collect();
                    let value = match <[ConstantValue; 1]>::try_from(picked) {
                        Ok([single]) => single,
                        Err(many) => ConstantValue::Vector(many),
                    };
                    self.set_constant(h, value);
                }
                (MemberAccess::Swizzle(components), ty)
            }
            _ => {
                return fail(
                    format!(
                        "'{}' has no member '{}'",
                        self.module.type_name(inner),
                        member.name
                    ),
                    member.span,
                );
            }
        };
        if let ExpressionKind::Member { access: slot, .. } = &mut self.module.expressions[h].kind {
            *slot = Some(access);
        }
        Ok(ty)
    }
}

/// Component indices of a swizzle, from one consistent letter set.
fn swizzle(name: &str, size: VectorSize) -> Option<Vec<u8>> {
    if name.is_empty() || name.len() > 4 {
        return None;
    }
    ["xyzw", "rgba"].iter().find_map(|set| {
        name.chars()
            .map(|c| set.find(c).map(|i| i as u8))
            .collect::<Option<Vec<u8>>>()
            .filter(|indices| indices.iter().all(|&i| u32::from(i) < size.count()))
    })
}
