//! Type checking and constant evaluation.
//!
//! Resolves every identifier, assigns a type to every expression node and
//! caches the value of every const-expression on its node. Abstract values
//! are converted to concrete types where they meet one; an abstract node is
//! always constant.

mod builtin;
mod construct;
mod expression;
mod statement;
mod types;

use std::collections::{HashMap, HashSet};

use weft_ast::{
    AccessMode, AddressSpace, Attribute, AttributeKind, ConstError, Declaration, Error,
    ExpressionKind, Handle, Local, Resolved, ShaderModule, ShaderStage, Span, Type, Warning,
    layout,
};

/// Stops checking the current declaration. `None` means the failure was
/// already reported, or stems from a declaration that failed earlier.
#[derive(Debug)]
pub(crate) struct Abort(Option<Error>);

impl From<Error> for Abort {
    fn from(error: Error) -> Self {
        Self(Some(error))
    }
}

type Check<T> = Result<T, Abort>;

fn fail<T>(message: impl Into<String>, span: Span) -> Check<T> {
    Err(Abort(Some(Error::type_error(message, span))))
}

/// Maps a constant-evaluation failure to a type error. An unsupported
/// operation only means the expression is not constant.
fn const_error(error: ConstError, span: Span) -> Check<()> {
    match error {
        ConstError::Unsupported => Ok(()),
        other => fail(other.to_string(), span),
    }
}

/// What a module-scope name refers to once its declaration is checked.
#[derive(Clone, Copy, Debug)]
enum Global {
    Constant(Handle<weft_ast::Constant>),
    Variable(Handle<weft_ast::GlobalVariable>),
    Function(Handle<weft_ast::Function>),
    /// Structs and aliases.
    Type(Handle<Type>),
}

/// State of the function body being checked.
#[derive(Clone, Debug)]
struct FunctionContext {
    name: String,
    result: Option<Handle<Type>>,
    stage: Option<ShaderStage>,
    loops: u32,
    switches: u32,
    in_continuing: bool,
}

pub(crate) struct Checker<'m> {
    module: &'m mut ShaderModule,
    globals: HashMap<String, Global>,
    failed: HashSet<String>,
    scopes: Vec<HashMap<String, Handle<Local>>>,
    local_consts: HashMap<Handle<Local>, weft_ast::ConstantValue>,
    function: Option<FunctionContext>,
    warnings: Vec<Warning>,
    f16_enabled: bool,
    f16_used: bool,
}

/// Type checks a reordered module in place.
///
/// Errors accumulate across declarations, up to the configured maximum. The
/// first error inside a declaration ends checking of that declaration, and
/// later uses of its name fail silently.
pub fn type_check(module: &mut ShaderModule, warnings: &mut Vec<Warning>) -> Result<(), Vec<Error>> {
    let max_errors = module.configuration().max_errors;
    let mut errors = Vec::new();
    let mut checker = Checker::new(module);

    if let Err(Abort(Some(error))) = checker.enables() {
        errors.push(error);
    }

    let declarations = checker.module.declarations.clone();
    for declaration in declarations {
        if errors.len() >= max_errors {
            break;
        }
        let name = checker.module.declaration_name(declaration).name.clone();
        match checker.declaration(declaration) {
            Ok(global) => {
                checker.globals.insert(name, global);
            }
            Err(Abort(error)) => {
                errors.extend(error);
                checker.failed.insert(name);
            }
        }
        checker.scopes.clear();
        checker.function = None;
    }
    errors.truncate(max_errors);

    if checker.f16_enabled && !checker.f16_used {
        let span = checker
            .module
            .enables
            .iter()
            .find(|e| e.name == "f16")
            .map_or(Span::UNDEFINED, |e| e.span);
        checker
            .warnings
            .push(Warning::new("extension 'f16' is enabled but never used", span));
    }
    warnings.append(&mut checker.warnings);

    log::debug!(
        "type check: {} types, {} error(s)",
        checker.module.types.len(),
        errors.len()
    );
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

impl<'m> Checker<'m> {
    fn new(module: &'m mut ShaderModule) -> Self {
        Self {
            module,
            globals: HashMap::new(),
            failed: HashSet::new(),
            scopes: Vec::new(),
            local_consts: HashMap::new(),
            function: None,
            warnings: Vec::new(),
            f16_enabled: false,
            f16_used: false,
        }
    }

    fn enables(&mut self) -> Check<()> {
        for enable in self.module.enables.clone() {
            match enable.name.as_str() {
                "f16" if self.module.configuration().features.shader_f16 => {
                    self.f16_enabled = true;
                }
                "f16" => {
                    return fail("extension 'f16' is not supported by this device", enable.span);
                }
                other => return fail(format!("unknown extension '{other}'"), enable.span),
            }
        }
        Ok(())
    }

    fn declaration(&mut self, declaration: Declaration) -> Check<Global> {
        match declaration {
            Declaration::Constant(h) => self.constant_declaration(h).map(|()| Global::Constant(h)),
            Declaration::Variable(h) => self.global_variable(h).map(|()| Global::Variable(h)),
            Declaration::Struct(h) => self.structure(h).map(Global::Type),
            Declaration::Alias(h) => {
                let ty = self.module.aliases[h].ty.clone();
                let resolved = self.resolve_type(&ty)?;
                self.module.aliases[h].resolved_ty = Some(resolved);
                Ok(Global::Type(resolved))
            }
            Declaration::Function(h) => self.function(h).map(|()| Global::Function(h)),
        }
    }

    fn constant_declaration(&mut self, h: Handle<weft_ast::Constant>) -> Check<()> {
        let constant = self.module.constants[h].clone();
        self.attributes(&constant.attributes)?;
        let declared = match &constant.ty {
            Some(ty) => Some(self.resolve_type(ty)?),
            None => None,
        };

        let ty = if constant.is_override {
            let ty = match (declared, constant.initializer) {
                (Some(ty), _) => ty,
                (None, Some(init)) => {
                    self.value(init)?;
                    self.concretize(init)?;
                    self.value(init)?
                }
                (None, None) => {
                    return fail(
                        format!("override '{}' needs a type or an initializer", constant.name.name),
                        constant.name.span,
                    );
                }
            };
            match self.module.types[ty] {
                Type::Scalar(s) if !s.is_abstract() => {}
                _ => {
                    return fail(
                        format!(
                            "override '{}' must have a scalar type, not '{}'",
                            constant.name.name,
                            self.module.type_name(ty)
                        ),
                        constant.name.span,
                    );
                }
            }
            if let Some(init) = constant.initializer {
                self.convert(init, ty)?;
                if !self.is_override_expression(init) {
                    return fail(
                        "override initializer must be an override-expression",
                        self.span(init),
                    );
                }
            }
            ty
        } else {
            let init = constant
                .initializer
                .expect("the parser requires const initializers");
            let mut ty = self.value(init)?;
            if let Some(declared) = declared {
                self.convert(init, declared)?;
                ty = declared;
            }
            if !self.module.expressions[init].is_constant() {
                return fail("const initializer must be a const-expression", self.span(init));
            }
            ty
        };
        self.module.constants[h].resolved_ty = Some(ty);
        Ok(())
    }

    fn global_variable(&mut self, h: Handle<weft_ast::GlobalVariable>) -> Check<()> {
        let variable = self.module.global_variables[h].clone();
        self.attributes(&variable.attributes)?;

        let declared = match &variable.ty {
            Some(ty) => Some(self.resolve_type(ty)?),
            None => None,
        };
        let store = match (declared, variable.initializer) {
            (Some(ty), Some(init)) => {
                self.convert(init, ty)?;
                ty
            }
            (Some(ty), None) => ty,
            (None, Some(init)) => {
                self.value(init)?;
                self.concretize(init)?;
                self.value(init)?
            }
            (None, None) => {
                return fail(
                    format!("variable '{}' needs a type or an initializer", variable.name.name),
                    variable.name.span,
                );
            }
        };

        let is_handle = self.module.types[store].is_handle();
        let space = match &variable.address_space {
            None if is_handle => AddressSpace::Handle,
            None => {
                return fail(
                    format!("module-scope variable '{}' needs an address space", variable.name.name),
                    variable.name.span,
                );
            }
            Some(ident) => match AddressSpace::from_name(&ident.name) {
                Some(AddressSpace::Function) => {
                    return fail("module-scope variables cannot be in the function address space", ident.span);
                }
                Some(space) => space,
                None => return fail(format!("unknown address space '{}'", ident.name), ident.span),
            },
        };
        if is_handle && space != AddressSpace::Handle {
            return fail(
                format!(
                    "'{}' cannot be stored in the {} address space",
                    self.module.type_name(store),
                    space.name()
                ),
                variable.span,
            );
        }

        let access = match &variable.access_mode {
            Some(ident) if space != AddressSpace::Storage => {
                return fail("only storage variables may specify an access mode", ident.span);
            }
            Some(ident) => match AccessMode::from_name(&ident.name) {
                Some(AccessMode::Write) => {
                    return fail("storage variables cannot be write-only", ident.span);
                }
                Some(mode) => mode,
                None => return fail(format!("unknown access mode '{}'", ident.name), ident.span),
            },
            None => space.default_access(),
        };

        if let Some(init) = variable.initializer {
            if space != AddressSpace::Private {
                return fail(
                    format!("variables in the {} address space cannot have an initializer", space.name()),
                    self.span(init),
                );
            }
            if !self.is_override_expression(init) {
                return fail(
                    "module-scope initializers must be const- or override-expressions",
                    self.span(init),
                );
            }
        }

        match space {
            AddressSpace::Uniform | AddressSpace::Storage => {
                if layout::type_layout(self.module, store).is_none() {
                    return fail(
                        format!(
                            "'{}' is not host-shareable and cannot be used in the {} address space",
                            self.module.type_name(store),
                            space.name()
                        ),
                        variable.span,
                    );
                }
                if space == AddressSpace::Uniform && self.contains_atomic(store) {
                    return fail("uniform buffers cannot contain atomics", variable.span);
                }
                if space == AddressSpace::Uniform && self.is_runtime_sized(store) {
                    return fail(
                        "runtime-sized arrays can only be used in storage buffers",
                        variable.span,
                    );
                }
                if self.contains_atomic(store) && access != AccessMode::ReadWrite {
                    return fail("atomics in storage buffers require read_write access", variable.span);
                }
            }
            _ => {
                if self.is_runtime_sized(store) {
                    return fail(
                        "runtime-sized arrays can only be used in storage buffers",
                        variable.span,
                    );
                }
                if space == AddressSpace::Private && self.contains_atomic(store) {
                    return fail("atomics can only be used in workgroup or storage variables", variable.span);
                }
            }
        }

        let variable = &mut self.module.global_variables[h];
        variable.resolved_ty = Some(store);
        variable.space = space;
        variable.access = access;
        Ok(())
    }

    fn structure(&mut self, h: Handle<weft_ast::Struct>) -> Check<Handle<Type>> {
        let members = self.module.structs[h].members.clone();
        let mut names = HashSet::new();
        let mut layouts = Some(Vec::with_capacity(members.len()));
        for (i, member) in members.iter().enumerate() {
            if !names.insert(member.name.name.as_str()) {
                return fail(format!("duplicate member '{}'", member.name.name), member.name.span);
            }
            self.attributes(&member.attributes)?;
            let ty = self.resolve_type(&member.ty)?;
            if self.module.types[ty].is_memory_view() || self.module.types[ty].is_handle() {
                return fail(
                    format!("'{}' cannot be a struct member", self.module.type_name(ty)),
                    member.ty.span,
                );
            }
            if self.is_runtime_sized(ty) && i + 1 != members.len() {
                return fail(
                    "only the last member of a struct may be a runtime-sized array",
                    member.ty.span,
                );
            }
            self.module.structs[h].members[i].resolved_ty = Some(ty);

            let explicit = |kind: fn(&AttributeKind) -> Option<Handle<weft_ast::Expression>>| {
                member
                    .attributes
                    .iter()
                    .find_map(|a| kind(&a.kind))
                    .and_then(|e| self.module.expressions[e].constant_value())
                    .and_then(|v| v.as_u32())
            };
            let align = explicit(|k| match k {
                AttributeKind::Align(e) => Some(*e),
                _ => None,
            });
            let size = explicit(|k| match k {
                AttributeKind::Size(e) => Some(*e),
                _ => None,
            });
            layouts = match (layouts, layout::type_layout(self.module, ty)) {
                (Some(mut list), Some(natural)) => {
                    list.push((natural, align, size));
                    Some(list)
                }
                _ => None,
            };
        }
        if let Some(list) = layouts {
            let Some(computed) = layout::struct_layout(&list) else {
                let name = &self.module.structs[h].name;
                return fail(
                    format!("struct '{}' is larger than 2^32 bytes", name.name),
                    name.span,
                );
            };
            self.module.structs[h].layout = Some(computed);
        }
        Ok(self.module.insert_type(Type::Struct(h)))
    }

    fn function(&mut self, h: Handle<weft_ast::Function>) -> Check<()> {
        let function = self.module.functions[h].clone();
        self.attributes(&function.attributes)?;

        self.scopes.push(HashMap::new());
        for param in &function.parameters {
            self.attributes(&param.attributes)?;
            let ty = self.resolve_type(&param.ty)?;
            if self.is_runtime_sized(ty) {
                return fail("runtime-sized arrays cannot be passed by value", param.ty.span);
            }
            if let Type::Pointer { space, .. } = self.module.types[ty] {
                if !matches!(
                    space,
                    AddressSpace::Function | AddressSpace::Private | AddressSpace::Workgroup
                ) {
                    return fail(
                        format!("pointer parameters cannot point into the {} address space", space.name()),
                        param.ty.span,
                    );
                }
            }
            self.module.locals[param.local].ty = Some(ty);
            self.declare(param.local)?;
        }
        let result = match &function.result {
            Some(result) => {
                self.attributes(&result.attributes)?;
                let ty = self.resolve_type(&result.ty)?;
                if self.module.types[ty].is_memory_view() || self.is_runtime_sized(ty) {
                    return fail(
                        format!("functions cannot return '{}'", self.module.type_name(ty)),
                        result.ty.span,
                    );
                }
                if let Some(r) = self.module.functions[h].result.as_mut() {
                    r.resolved = Some(ty);
                }
                Some(ty)
            }
            None => None,
        };

        self.function = Some(FunctionContext {
            name: function.name.name.clone(),
            result,
            stage: function.stage(),
            loops: 0,
            switches: 0,
            in_continuing: false,
        });
        let mut body = std::mem::take(&mut self.module.functions[h].body);
        let checked = self.statements(&body);
        self.module.functions[h].body = body;
        checked?;

        if result.is_some() && !statement::returns(&self.module.functions[h].body) {
            return fail(
                format!("function '{}' must return a value on every path", function.name.name),
                function.name.span,
            );
        }
        Ok(())
    }

    /// Checks attribute arguments: integer const-expressions, except that
    /// `@workgroup_size` also accepts override-expressions.
    fn attributes(&mut self, attributes: &[Attribute]) -> Check<()> {
        for attribute in attributes {
            let name = attribute.kind.name();
            let overridable = matches!(attribute.kind, AttributeKind::WorkgroupSize(_));
            for e in attribute.kind.expressions() {
                let ty = self.value(e)?;
                if !matches!(self.module.types[ty], Type::Scalar(s) if s.is_integer()) {
                    return fail(
                        format!("@{name} requires an integer, found '{}'", self.module.type_name(ty)),
                        self.span(e),
                    );
                }
                self.concretize(e)?;
                let constant = self.module.expressions[e].is_constant();
                if overridable {
                    if !constant && !self.is_override_expression(e) {
                        return fail(
                            "@workgroup_size arguments must be const- or override-expressions",
                            self.span(e),
                        );
                    }
                } else if !constant {
                    return fail(format!("@{name} requires a const-expression"), self.span(e));
                }
            }
        }
        Ok(())
    }

    fn span(&self, e: Handle<weft_ast::Expression>) -> Span {
        self.module.expressions[e].span
    }

    fn declare(&mut self, local: Handle<Local>) -> Check<()> {
        let ident = self.module.locals[local].name.clone();
        let scope = self
            .scopes
            .last_mut()
            .expect("locals are declared inside a function scope");
        if scope.insert(ident.name.clone(), local).is_some() {
            return fail(format!("redeclaration of '{}'", ident.name), ident.span);
        }
        Ok(())
    }

    /// Whether `e` only depends on literals, consts and overrides.
    fn is_override_expression(&self, e: Handle<weft_ast::Expression>) -> bool {
        let node = &self.module.expressions[e];
        if node.is_constant() {
            return true;
        }
        let leaf_ok = match &node.kind {
            ExpressionKind::Identifier { resolved, .. } => {
                matches!(resolved, Some(Resolved::Constant(_)))
            }
            ExpressionKind::Call { callee, .. } => {
                !matches!(callee, Some(weft_ast::Callee::Function(_)))
            }
            ExpressionKind::Unary {
                op: weft_ast::UnaryOp::AddressOf | weft_ast::UnaryOp::Deref,
                ..
            } => false,
            _ => true,
        };
        leaf_ok
            && node
                .kind
                .children()
                .into_iter()
                .all(|c| self.is_override_expression(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ast::{Configuration, ConstantValue, ErrorKind, Scalar};

    pub(super) fn check(source: &str) -> Result<(ShaderModule, Vec<Warning>), Vec<Error>> {
        check_with(source, Configuration::default())
    }

    pub(super) fn check_with(
        source: &str,
        configuration: Configuration,
    ) -> Result<(ShaderModule, Vec<Warning>), Vec<Error>> {
        let mut module = weft_parser::parse(source, configuration).map_err(|e| vec![e])?;
        crate::reorder::reorder_globals(&mut module)?;
        let mut warnings = Vec::new();
        type_check(&mut module, &mut warnings)?;
        Ok((module, warnings))
    }

    pub(super) fn first_error(source: &str) -> String {
        match check(source) {
            Ok(_) => panic!("expected an error for:\n{source}"),
            Err(errors) => errors[0].message.clone(),
        }
    }

    fn constant(module: &ShaderModule, name: &str) -> ConstantValue {
        let (_, c) = module
            .constants
            .iter()
            .find(|(_, c)| c.name.name == name)
            .expect("constant exists");
        module.expressions[c.initializer.unwrap()]
            .constant_value()
            .cloned()
            .expect("constant has a value")
    }

    #[test]
    fn consts_are_evaluated() {
        let (module, _) = check(
            "const a = 2;
             const b: u32 = a * 4;
             const c = vec2(1.0, 2.0) * 2.0;
             const d = array(1, 2, 3)[1];",
        )
        .unwrap();
        assert_eq!(constant(&module, "a"), ConstantValue::AbstractInt(2));
        assert_eq!(constant(&module, "b"), ConstantValue::U32(8));
        assert_eq!(
            constant(&module, "c"),
            ConstantValue::Vector(vec![
                ConstantValue::AbstractFloat(2.0),
                ConstantValue::AbstractFloat(4.0)
            ])
        );
        assert_eq!(constant(&module, "d"), ConstantValue::AbstractInt(2));
    }

    #[test]
    fn float_to_int_binding_is_a_type_error() {
        let errors = check("fn f() { let a: i32 = 1.5; }").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::Type);
    }

    #[test]
    fn overflow_in_const_expression() {
        assert_eq!(
            first_error("const a: i32 = 2147483647 + 1;"),
            "value 2147483648 does not fit in i32"
        );
        assert_eq!(
            first_error("const a = 2147483647i + 1i;"),
            "integer overflow in constant expression"
        );
    }

    #[test]
    fn errors_accumulate_across_declarations() {
        let errors = check(
            "const a: u32 = -1;
             fn f() { let x: bool = 1; let y: bool = 2; }
             fn g() -> i32 { return true; }",
        )
        .unwrap_err();
        // One per declaration: the second `let` in `f` is never reached.
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn failed_declarations_poison_silently() {
        let errors = check("const a: u32 = -1; const b = a + 1u; fn f() -> u32 { return b; }")
            .unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn max_errors_caps_diagnostics() {
        let config = Configuration::default().with_max_errors(2);
        let errors = check_with(
            "const a: u32 = -1; const b: u32 = -2; const c: u32 = -3;",
            config,
        )
        .unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn globals_get_spaces_and_access() {
        let (module, _) = check(
            "@group(0) @binding(0) var<storage> a: array<f32>;
             @group(0) @binding(1) var<storage, read_write> b: array<f32>;
             @group(0) @binding(2) var<uniform> u: vec4<f32>;
             @group(0) @binding(3) var s: sampler;
             var<workgroup> w: array<u32, 4>;",
        )
        .unwrap();
        let spaces: Vec<_> = module
            .global_variables
            .iter()
            .map(|(_, v)| (v.space, v.access))
            .collect();
        assert_eq!(
            spaces,
            [
                (AddressSpace::Storage, AccessMode::Read),
                (AddressSpace::Storage, AccessMode::ReadWrite),
                (AddressSpace::Uniform, AccessMode::Read),
                (AddressSpace::Handle, AccessMode::Read),
                (AddressSpace::Workgroup, AccessMode::ReadWrite),
            ]
        );
    }

    #[test]
    fn address_space_rules() {
        assert_eq!(
            first_error("var x: i32;"),
            "module-scope variable 'x' needs an address space"
        );
        assert_eq!(
            first_error("var<uniform> x: array<f32>;"),
            "runtime-sized arrays can only be used in storage buffers"
        );
        assert_eq!(
            first_error("var<private, read> x: i32;"),
            "only storage variables may specify an access mode"
        );
        assert_eq!(
            first_error("var<storage> x: bool;"),
            "'bool' is not host-shareable and cannot be used in the storage address space"
        );
    }

    #[test]
    fn struct_layout_is_computed() {
        let (module, _) = check("struct S { a: f32, b: vec3<f32>, @align(32) c: u32 }").unwrap();
        let (_, s) = module.structs.iter().next().unwrap();
        let layout = s.layout.as_ref().unwrap();
        assert_eq!(layout.offsets, vec![0, 16, 32]);
        assert_eq!(layout.size, 64);
        assert_eq!(layout.align, 32);
    }

    #[test]
    fn oversized_types_are_type_errors() {
        assert_eq!(
            first_error("var<storage, read_write> big: array<vec4f, 1000000000>;"),
            "array type is larger than 2^32 bytes"
        );
        assert_eq!(
            first_error("struct S { a: array<vec4f, 300000000>, b: array<vec4f, 300000000> }"),
            "array type is larger than 2^32 bytes"
        );
        assert_eq!(
            first_error(
                "struct S { @size(2147483647) a: f32, @size(2147483647) b: f32, c: f32 }"
            ),
            "struct 'S' is larger than 2^32 bytes"
        );
        assert_eq!(
            first_error(
                "struct S { @size(2147483644) a: f32, @size(2147483644) b: f32, @size(16) c: f32 }"
            ),
            "struct 'S' is larger than 2^32 bytes"
        );
        assert_eq!(
            first_error(
                "struct S { @size(2147483647) a: f32, @size(2147483647) b: f32, @align(1073741824) c: f32 }"
            ),
            "struct 'S' is larger than 2^32 bytes"
        );
    }

    #[test]
    fn runtime_array_must_be_last_member() {
        assert_eq!(
            first_error("struct S { a: array<f32>, b: u32 }"),
            "only the last member of a struct may be a runtime-sized array"
        );
    }

    #[test]
    fn enables() {
        assert_eq!(
            first_error("enable f16;"),
            "extension 'f16' is not supported by this device"
        );
        assert_eq!(first_error("enable foo;"), "unknown extension 'foo'");
        let config = Configuration::default().with_f16(true);
        let (_, warnings) = check_with("enable f16; const a = 1;", config.clone()).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "extension 'f16' is enabled but never used");
        let (module, warnings) = check_with("enable f16; const a: f16 = 1.5h;", config).unwrap();
        assert!(warnings.is_empty());
        let f16 = module.types.find(&Type::Scalar(Scalar::F16));
        assert!(f16.is_some());
    }

    #[test]
    fn f16_requires_enable() {
        let config = Configuration::default().with_f16(true);
        let errors = check_with("const a = 1.5h;", config).unwrap_err();
        assert_eq!(errors[0].message, "f16 requires 'enable f16;'");
    }

    #[test]
    fn override_rules() {
        let (module, _) = check("override a = 1; override b: f32; @id(3) override c: u32 = 2u * 3u;").unwrap();
        let tys: Vec<_> = module
            .constants
            .iter()
            .map(|(_, c)| module.type_name(c.resolved_ty.unwrap()))
            .collect();
        assert_eq!(tys, ["i32", "f32", "u32"]);
        assert_eq!(first_error("override v: vec2<f32>;"), "override 'v' must have a scalar type, not 'vec2<f32>'");
        assert_eq!(
            first_error("var<private> p: i32; override o = p;"),
            "override initializer must be an override-expression"
        );
    }

    #[test]
    fn attribute_arguments_must_be_integer_consts() {
        assert_eq!(
            first_error("@group(1.5) @binding(0) var<uniform> u: f32;"),
            "@group requires an integer, found 'abstract-float'"
        );
        assert_eq!(
            first_error("override g = 0; @group(g) @binding(0) var<uniform> u: f32;"),
            "@group requires a const-expression"
        );
        check("override n = 64u; @compute @workgroup_size(n) fn main() {}").unwrap();
    }

    #[test]
    fn missing_return() {
        assert_eq!(first_error("fn f() -> i32 { }"), "function 'f' must return a value on every path");
        check("fn f(c: bool) -> i32 { if c { return 1; } else { return 2; } }").unwrap();
        check("fn f() -> i32 { loop { return 1; } }").unwrap();
        assert_eq!(
            first_error("fn f(c: bool) -> i32 { if c { return 1; } }"),
            "function 'f' must return a value on every path"
        );
    }
}
