//! WGSL emission for the reachable part of a prepared module.
//!
//! Names come from the declarations the identifiers resolve to, so the
//! mangled names are what gets printed. Constants are printed as values.
//! Overrides are specialized: a supplied or constant default value is
//! substituted through [`evaluate`], an override-dependent default is
//! inlined as its initializer.

use std::collections::HashSet;
use std::fmt::Write as _;

use weft_ast::{
    AddressSpace, Attribute, AttributeKind, BoundsLimit, CaseSelector, Callee, Constant,
    ConstantMap, ConstantValue, Declaration, Expression, ExpressionKind, Handle, MemberAccess,
    Resolved, ShaderModule, Statement, StatementKind, Struct, Type,
};
use weft_passes::{PrepareResult, WorkgroupDimension, evaluate};

use crate::{Backend, BackendError, BackendOutput, Diagnostic, DiagnosticLevel, OutputFile};

const INDENT: &str = "    ";

/// Emits backend-legal WGSL.
#[derive(Debug)]
pub struct WgslBackend;

impl Backend for WgslBackend {
    fn name(&self) -> &str {
        "WGSL"
    }

    fn targets(&self) -> &[&str] {
        &["wgsl"]
    }

    fn generate(
        &self,
        prepared: &PrepareResult<'_>,
        constants: &ConstantMap,
    ) -> Result<BackendOutput, BackendError> {
        let mut diagnostics = Vec::new();
        let values = override_values(prepared, constants, &mut diagnostics)?;
        check_workgroup_sizes(prepared, &values)?;
        let writer = Writer {
            module: prepared.module(),
            values,
        };
        let text = writer.module(prepared)?;
        Ok(BackendOutput {
            files: vec![OutputFile {
                name: "module.wgsl".into(),
                text,
            }],
            diagnostics,
        })
    }
}

/// Values of the reachable overrides, keyed by source name and converted
/// to each override's type. Overrides whose default depends on other
/// overrides are left out; they are inlined.
fn override_values(
    prepared: &PrepareResult<'_>,
    constants: &ConstantMap,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<ConstantMap, BackendError> {
    let module = prepared.module();
    let mut values = ConstantMap::new();
    let mut used = HashSet::new();
    for c in prepared.call_graph.overrides() {
        let constant = &module.constants[c];
        let name = &constant.name.name;
        let id = constant.override_id.map(|id| id.to_string());
        let supplied = constants
            .get_key_value(name.as_str())
            .or_else(|| id.as_deref().and_then(|id| constants.get_key_value(id)));

        if let Some((key, value)) = supplied {
            used.insert(key.as_str());
            let invalid = |reason: String| BackendError::InvalidOverride {
                name: name.clone(),
                value: value.to_string(),
                reason,
            };
            if value.components().is_some() {
                return Err(invalid("overrides are scalars".to_string()));
            }
            let converted = value
                .convert(override_scalar(module, constant))
                .map_err(|error| invalid(error.to_string()))?;
            values.insert(name.clone(), converted);
            continue;
        }
        let Some(init) = constant.initializer else {
            return Err(BackendError::MissingOverride { name: name.clone() });
        };
        match module.expressions[init].constant_value() {
            Some(default) => {
                diagnostics.push(Diagnostic {
                    level: DiagnosticLevel::Info,
                    message: format!("override '{name}' uses its default value {default}"),
                });
                values.insert(name.clone(), default.clone());
            }
            None => diagnostics.push(Diagnostic {
                level: DiagnosticLevel::Info,
                message: format!("override '{name}' is computed from its initializer"),
            }),
        }
    }

    let mut unused: Vec<_> = constants
        .keys()
        .filter(|key| !used.contains(key.as_str()))
        .collect();
    unused.sort();
    for key in unused {
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Warning,
            message: format!("no prepared entry point uses an override named '{key}'"),
        });
    }
    Ok(values)
}

/// Workgroup sizes naming an override directly are checked against the
/// device limits once the override's value is known. Sizes computed from
/// override expressions are left to the downstream compiler.
fn check_workgroup_sizes(prepared: &PrepareResult<'_>, values: &ConstantMap) -> Result<(), BackendError> {
    let module = prepared.module();
    let limits = &module.configuration().limits;
    for (name, info) in &prepared.entry_points {
        let Some(size) = &info.workgroup_size else {
            continue;
        };
        let invalid = |message: String| BackendError::InvalidWorkgroupSize {
            entry_point: name.clone(),
            message,
        };
        let mut invocations = Some(1u64);
        for (i, (dimension, limit)) in size.iter().zip(limits.max_workgroup_size()).enumerate() {
            let value = match *dimension {
                WorkgroupDimension::Constant(n) => Some(n),
                WorkgroupDimension::Override(e) => override_name(module, e)
                    .and_then(|name| values.get(name))
                    .and_then(ConstantValue::as_u32),
            };
            let Some(value) = value else {
                invocations = None;
                continue;
            };
            let axis = ["x", "y", "z"][i];
            if value == 0 {
                return Err(invalid(format!("workgroup size {axis} dimension is 0")));
            }
            if value > limit {
                return Err(invalid(format!(
                    "workgroup size {axis} dimension {value} exceeds the limit of {limit}"
                )));
            }
            invocations = invocations.map(|n| n * u64::from(value));
        }
        if let Some(n) = invocations {
            if n > u64::from(limits.max_compute_invocations_per_workgroup) {
                return Err(invalid(format!(
                    "workgroup size of {n} invocations exceeds the limit of {}",
                    limits.max_compute_invocations_per_workgroup
                )));
            }
        }
    }
    Ok(())
}

fn override_name(module: &ShaderModule, e: Handle<Expression>) -> Option<&str> {
    match module.expressions[e].kind {
        ExpressionKind::Identifier {
            resolved: Some(Resolved::Constant(c)),
            ..
        } if module.constants[c].is_override => Some(module.constants[c].name.name.as_str()),
        _ => None,
    }
}

fn override_scalar(module: &ShaderModule, constant: &Constant) -> weft_ast::Scalar {
    let ty = constant.resolved_ty.expect("checked overrides are typed");
    match module.types[ty] {
        Type::Scalar(s) => s,
        ref other => unreachable!("override '{}' has type {other:?}", constant.name.name),
    }
}

/// Whether every scalar inside `ty` is concrete, so that its WGSL spelling
/// is valid source.
fn is_concrete(module: &ShaderModule, ty: Handle<Type>) -> bool {
    match module.types[ty] {
        Type::Scalar(s) | Type::Vector { scalar: s, .. } | Type::Matrix { scalar: s, .. } => {
            !s.is_abstract()
        }
        Type::Array { base, .. } => is_concrete(module, base),
        _ => true,
    }
}

struct Writer<'a> {
    module: &'a ShaderModule,
    values: ConstantMap,
}

impl Writer<'_> {
    fn module(&self, prepared: &PrepareResult<'_>) -> Result<String, BackendError> {
        let module = self.module;
        let graph = &prepared.call_graph;
        let mut sections = Vec::new();

        if !module.enables.is_empty() {
            let mut out = String::new();
            for enable in &module.enables {
                let _ = writeln!(out, "enable {};", enable.name);
            }
            sections.push(out);
        }
        for s in graph.structs(module) {
            sections.push(self.structure(s)?);
        }
        let globals = graph.globals();
        for &declaration in &module.declarations {
            if let Declaration::Variable(v) = declaration {
                if globals.contains(&v) {
                    sections.push(self.global(v)?);
                }
            }
        }
        for f in graph.functions() {
            sections.push(self.function(f)?);
        }
        log::debug!(
            "wgsl: emitted {} declaration(s) for {} entry point(s)",
            sections.len(),
            graph.len()
        );
        Ok(sections.join("\n"))
    }

    fn structure(&self, s: Handle<Struct>) -> Result<String, BackendError> {
        let structure = &self.module.structs[s];
        let mut out = String::new();
        let _ = writeln!(out, "struct {} {{", structure.name.name);
        for member in &structure.members {
            let ty = member.resolved_ty.expect("checked struct members are typed");
            let _ = writeln!(
                out,
                "{INDENT}{}{}: {},",
                self.attributes(&member.attributes)?,
                member.name.name,
                self.module.type_name(ty)
            );
        }
        out.push_str("}\n");
        Ok(out)
    }

    fn global(&self, v: Handle<weft_ast::GlobalVariable>) -> Result<String, BackendError> {
        let variable = &self.module.global_variables[v];
        let binding = variable
            .binding
            .map(|b| format!("@group({}) @binding({}) ", b.group, b.binding))
            .unwrap_or_default();
        let space = match variable.space {
            AddressSpace::Handle => String::new(),
            AddressSpace::Storage => format!("<storage, {}>", variable.access.name()),
            space => format!("<{}>", space.name()),
        };
        let ty = variable.resolved_ty.expect("checked variables are typed");
        let init = match variable.initializer {
            Some(init) => format!(" = {}", self.expression(init)?),
            None => String::new(),
        };
        Ok(format!(
            "{binding}var{space} {}: {}{init};\n",
            variable.name.name,
            self.module.type_name(ty)
        ))
    }

    fn function(&self, f: Handle<weft_ast::Function>) -> Result<String, BackendError> {
        let function = &self.module.functions[f];
        let mut parameters = Vec::with_capacity(function.parameters.len());
        for parameter in &function.parameters {
            let local = &self.module.locals[parameter.local];
            let ty = local.ty.expect("checked parameters are typed");
            parameters.push(format!(
                "{}{}: {}",
                self.attributes(&parameter.attributes)?,
                local.name.name,
                self.module.type_name(ty)
            ));
        }
        let result = match &function.result {
            Some(result) => format!(
                " -> {}{}",
                self.attributes(&result.attributes)?,
                self.module
                    .type_name(result.resolved.expect("checked results are typed"))
            ),
            None => String::new(),
        };

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}fn {}({}){result} {{",
            self.attributes(&function.attributes)?,
            function.name.name,
            parameters.join(", ")
        );
        self.block(&mut out, &function.body, 1)?;
        out.push_str("}\n");
        Ok(out)
    }

    /// Attributes as a prefix, each followed by a space.
    fn attributes(&self, attributes: &[Attribute]) -> Result<String, BackendError> {
        let mut out = String::new();
        for attribute in attributes {
            let kind = &attribute.kind;
            let args = match kind {
                AttributeKind::Builtin(b) => b.name().to_string(),
                AttributeKind::Interpolate(ty, Some(sampling)) => {
                    format!("{}, {}", ty.name(), sampling.name())
                }
                AttributeKind::Interpolate(ty, None) => ty.name().to_string(),
                _ => kind
                    .expressions()
                    .into_iter()
                    .map(|e| self.attribute_argument(e))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", "),
            };
            if args.is_empty() {
                let _ = write!(out, "@{} ", kind.name());
            } else {
                let _ = write!(out, "@{}({args}) ", kind.name());
            }
        }
        Ok(out)
    }

    /// Constant integer arguments print without a suffix.
    fn attribute_argument(&self, e: Handle<Expression>) -> Result<String, BackendError> {
        if self.override_of(e).is_none() {
            if let Some(v) = self.module.expressions[e]
                .constant_value()
                .and_then(ConstantValue::as_i64)
            {
                return Ok(v.to_string());
            }
        }
        self.expression(e)
    }

    fn block(&self, out: &mut String, block: &[Statement], level: usize) -> Result<(), BackendError> {
        for statement in block {
            self.statement(out, statement, level)?;
        }
        Ok(())
    }

    fn statement(&self, out: &mut String, statement: &Statement, level: usize) -> Result<(), BackendError> {
        let pad = INDENT.repeat(level);
        match &statement.kind {
            // Uses of function-scope constants print their values.
            StatementKind::Const { .. } => {}
            StatementKind::If {
                condition,
                accept,
                reject,
            } => {
                let _ = writeln!(out, "{pad}if {} {{", self.expression(*condition)?);
                self.block(out, accept, level + 1)?;
                if !reject.is_empty() {
                    let _ = writeln!(out, "{pad}}} else {{");
                    self.block(out, reject, level + 1)?;
                }
                let _ = writeln!(out, "{pad}}}");
            }
            StatementKind::Switch { selector, cases } => {
                let _ = writeln!(out, "{pad}switch {} {{", self.expression(*selector)?);
                for case in cases {
                    let mut selectors = Vec::with_capacity(case.selectors.len());
                    for selector in &case.selectors {
                        selectors.push(match selector {
                            CaseSelector::Expression(e) => self.expression(*e)?,
                            CaseSelector::Default => "default".to_string(),
                        });
                    }
                    let label = match selectors.as_slice() {
                        [only] if only == "default" => "default".to_string(),
                        _ => format!("case {}", selectors.join(", ")),
                    };
                    let _ = writeln!(out, "{pad}{INDENT}{label} {{");
                    self.block(out, &case.body, level + 2)?;
                    let _ = writeln!(out, "{pad}{INDENT}}}");
                }
                let _ = writeln!(out, "{pad}}}");
            }
            StatementKind::Loop {
                body,
                continuing,
                break_if,
            } => {
                let _ = writeln!(out, "{pad}loop {{");
                self.block(out, body, level + 1)?;
                if !continuing.is_empty() || break_if.is_some() {
                    let _ = writeln!(out, "{pad}{INDENT}continuing {{");
                    self.block(out, continuing, level + 2)?;
                    if let Some(condition) = break_if {
                        let _ = writeln!(
                            out,
                            "{pad}{INDENT}{INDENT}break if {};",
                            self.expression(*condition)?
                        );
                    }
                    let _ = writeln!(out, "{pad}{INDENT}}}");
                }
                let _ = writeln!(out, "{pad}}}");
            }
            StatementKind::For {
                init,
                condition,
                update,
                body,
            } => {
                let init = match init {
                    Some(init) => self.simple_statement(init)?,
                    None => String::new(),
                };
                let condition = match condition {
                    Some(condition) => self.expression(*condition)?,
                    None => String::new(),
                };
                let update = match update {
                    Some(update) => self.simple_statement(update)?,
                    None => String::new(),
                };
                let _ = writeln!(out, "{pad}for ({init}; {condition}; {update}) {{");
                self.block(out, body, level + 1)?;
                let _ = writeln!(out, "{pad}}}");
            }
            StatementKind::While { condition, body } => {
                let _ = writeln!(out, "{pad}while {} {{", self.expression(*condition)?);
                self.block(out, body, level + 1)?;
                let _ = writeln!(out, "{pad}}}");
            }
            StatementKind::Block(body) => {
                let _ = writeln!(out, "{pad}{{");
                self.block(out, body, level + 1)?;
                let _ = writeln!(out, "{pad}}}");
            }
            _ => {
                let _ = writeln!(out, "{pad}{};", self.simple_statement(statement)?);
            }
        }
        Ok(())
    }

    /// A statement without its semicolon, as it appears in a `for` header.
    fn simple_statement(&self, statement: &Statement) -> Result<String, BackendError> {
        let local = |h| &self.module.locals[h];
        let typed = |h| {
            let local = local(h);
            let ty = local.ty.expect("checked locals are typed");
            format!("{}: {}", local.name.name, self.module.type_name(ty))
        };
        Ok(match &statement.kind {
            StatementKind::Let { local, value, .. } => {
                format!("let {} = {}", typed(*local), self.expression(*value)?)
            }
            StatementKind::Var {
                local, initializer, ..
            } => match initializer {
                Some(init) => format!("var {} = {}", typed(*local), self.expression(*init)?),
                None => format!("var {}", typed(*local)),
            },
            StatementKind::Assign { target, op, value } => format!(
                "{} {}= {}",
                self.expression(*target)?,
                op.map(|op| op.symbol()).unwrap_or_default(),
                self.expression(*value)?
            ),
            StatementKind::Phony(e) => format!("_ = {}", self.expression(*e)?),
            StatementKind::Increment(e) => format!("{}++", self.expression(*e)?),
            StatementKind::Decrement(e) => format!("{}--", self.expression(*e)?),
            StatementKind::Call(e) => self.expression(*e)?,
            StatementKind::Break => "break".to_string(),
            StatementKind::Continue => "continue".to_string(),
            StatementKind::Return(Some(value)) => format!("return {}", self.expression(*value)?),
            StatementKind::Return(None) => "return".to_string(),
            StatementKind::Discard => "discard".to_string(),
            other => unreachable!("{other:?} cannot appear in a for header"),
        })
    }

    fn override_of(&self, e: Handle<Expression>) -> Option<Handle<Constant>> {
        match self.module.expressions[e].kind {
            ExpressionKind::Identifier {
                resolved: Some(Resolved::Constant(c)),
                ..
            } if self.module.constants[c].is_override => Some(c),
            _ => None,
        }
    }

    fn expression(&self, h: Handle<Expression>) -> Result<String, BackendError> {
        let module = self.module;
        let node = &module.expressions[h];
        if let Some(c) = self.override_of(h) {
            return self.override_value(h, c);
        }
        if let Some(value) = node.constant_value() {
            return Ok(self.value(node.ty, value));
        }
        Ok(match &node.kind {
            ExpressionKind::Literal(literal) => self.value(node.ty, &literal.value()),
            ExpressionKind::Identifier { name, resolved } => {
                match resolved.expect("checked identifiers are resolved") {
                    Resolved::Local(l) => module.locals[l].name.name.clone(),
                    Resolved::Global(g) => module.global_variables[g].name.name.clone(),
                    Resolved::Constant(_) => {
                        unreachable!("constant '{}' has no cached value", name.name)
                    }
                }
            }
            ExpressionKind::Unary { op, operand } => {
                format!("{}({})", op.symbol(), self.expression(*operand)?)
            }
            ExpressionKind::Binary { op, left, right } => format!(
                "({} {} {})",
                self.expression(*left)?,
                op.symbol(),
                self.expression(*right)?
            ),
            ExpressionKind::Call {
                arguments, callee, ..
            } => {
                let name = match callee.expect("checked calls are resolved") {
                    Callee::Function(f) => module.functions[f].name.name.clone(),
                    Callee::Builtin(b) => b.name().to_string(),
                    Callee::Constructor(ty) => module.type_name(ty),
                };
                let arguments = arguments
                    .iter()
                    .map(|&a| self.expression(a))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("{name}({})", arguments.join(", "))
            }
            ExpressionKind::Index { base, index } => {
                format!("{}[{}]", self.postfix_base(*base)?, self.expression(*index)?)
            }
            ExpressionKind::Member {
                base,
                access,
                ..
            } => {
                let text = self.postfix_base(*base)?;
                match access.as_ref().expect("checked member accesses are resolved") {
                    MemberAccess::Field(i) => {
                        let s = self.struct_of(*base);
                        format!("{text}.{}", module.structs[s].members[*i as usize].name.name)
                    }
                    MemberAccess::Swizzle(components) => {
                        let swizzle: String = components
                            .iter()
                            .map(|&c| char::from(b"xyzw"[usize::from(c)]))
                            .collect();
                        format!("{text}.{swizzle}")
                    }
                }
            }
            ExpressionKind::BoundsCheck { index, limit } => {
                let index = self.expression(*index)?;
                match limit {
                    BoundsLimit::Static(n) => {
                        format!("min(u32({index}), {}u)", n.saturating_sub(1))
                    }
                    BoundsLimit::RuntimeArray { array } => format!(
                        "min(u32({index}), arrayLength(&{}) - 1u)",
                        self.postfix_base(*array)?
                    ),
                }
            }
        })
    }

    /// An expression in a position followed by `.member` or `[index]`.
    fn postfix_base(&self, h: Handle<Expression>) -> Result<String, BackendError> {
        let text = self.expression(h)?;
        let node = &self.module.expressions[h];
        if matches!(node.kind, ExpressionKind::Unary { .. }) && !node.is_constant() {
            return Ok(format!("({text})"));
        }
        Ok(text)
    }

    fn struct_of(&self, base: Handle<Expression>) -> Handle<Struct> {
        let module = self.module;
        let ty = module.expressions[base]
            .ty
            .map(|ty| module.load_type(ty))
            .expect("checked member bases are typed");
        let ty = match module.types[ty] {
            Type::Pointer { base, .. } => base,
            _ => ty,
        };
        match module.types[ty] {
            Type::Struct(s) => s,
            ref other => unreachable!("field access on {other:?}"),
        }
    }

    fn override_value(&self, h: Handle<Expression>, c: Handle<Constant>) -> Result<String, BackendError> {
        let module = self.module;
        let constant = &module.constants[c];
        let name = &constant.name.name;
        let Some(requested) = self.values.get(name) else {
            let init = constant
                .initializer
                .expect("overrides without a value or default were rejected");
            return self.expression(init);
        };
        let value = evaluate(module, h, &self.values);
        if value != requested {
            return Err(BackendError::Respecialized {
                name: name.clone(),
                cached: value.to_string(),
                requested: requested.to_string(),
            });
        }
        Ok(self.value(module.expressions[h].ty, value))
    }

    fn value(&self, ty: Option<Handle<Type>>, value: &ConstantValue) -> String {
        match *value {
            ConstantValue::Bool(b) => b.to_string(),
            ConstantValue::AbstractInt(i64::MIN) => "(-9223372036854775807 - 1)".to_string(),
            ConstantValue::AbstractInt(v) => v.to_string(),
            ConstantValue::I32(i32::MIN) => "(-2147483647i - 1i)".to_string(),
            ConstantValue::I32(v) => format!("{v}i"),
            ConstantValue::U32(v) => format!("{v}u"),
            ConstantValue::AbstractFloat(v) => format!("{v:?}"),
            ConstantValue::F32(v) => format!("{v:?}f"),
            ConstantValue::F16(v) => format!("{v:?}h"),
            ConstantValue::Vector(ref components) | ConstantValue::Array(ref components) => {
                self.composite(ty, value, components)
            }
        }
    }

    /// A composite value as a constructor: typed when the type is
    /// spellable, inferred otherwise.
    fn composite(
        &self,
        ty: Option<Handle<Type>>,
        value: &ConstantValue,
        components: &[ConstantValue],
    ) -> String {
        let module = self.module;
        let ty = ty
            .map(|ty| module.load_type(ty))
            .filter(|&ty| is_concrete(module, ty));
        let (constructor, element) = match ty.map(|ty| (ty, &module.types[ty])) {
            Some((ty, Type::Array { base, .. })) => (module.type_name(ty), Some(*base)),
            Some((ty, Type::Vector { .. } | Type::Matrix { .. })) => (module.type_name(ty), None),
            _ if matches!(value, ConstantValue::Vector(_)) => {
                (format!("vec{}", components.len()), None)
            }
            _ => ("array".to_string(), None),
        };
        let components: Vec<_> = components.iter().map(|c| self.value(element, c)).collect();
        format!("{constructor}({})", components.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use weft_ast::Configuration;
    use weft_passes::{prepare_entry_point, static_check};

    fn validate(text: &str) {
        let module = naga::front::wgsl::parse_str(text)
            .unwrap_or_else(|e| panic!("generated WGSL does not parse: {e}\n{text}"));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("generated WGSL does not validate: {e:?}\n{text}"));
    }

    fn emit(source: &str, entry_point: &str, constants: &ConstantMap) -> Result<BackendOutput, BackendError> {
        let mut module = static_check(source, None, Configuration::default())
            .unwrap_or_else(|failed| panic!("{:#?}", failed.errors))
            .ast;
        let prepared = prepare_entry_point(&mut module, entry_point, None).unwrap();
        WgslBackend.generate(&prepared, constants)
    }

    fn text(source: &str, entry_point: &str) -> String {
        let output = emit(source, entry_point, &ConstantMap::new()).unwrap();
        let text = output.files[0].text.clone();
        validate(&text);
        text
    }

    #[test]
    fn emits_mangled_uniform_example() {
        let text = text(
            "@group(0) @binding(0) var<uniform> x: f32;
             @compute @workgroup_size(1) fn main() { let y = x + 1.0; }",
            "main",
        );
        assert_eq!(
            text,
            "@group(0) @binding(0) var<uniform> global0: f32;\n\
             \n\
             @compute @workgroup_size(1) fn function1() {\n\
             \x20   let local2: f32 = (global0 + 1.0f);\n\
             }\n"
        );
    }

    #[test]
    fn only_reachable_declarations_are_emitted() {
        let text = text(
            "struct Unused { a: f32 }
             @group(0) @binding(0) var<storage, read_write> out: array<f32>;
             @group(0) @binding(1) var<storage, read_write> other: array<u32>;
             fn helper(v: f32) -> f32 { return v * 2.0; }
             fn unused() -> f32 { return 1.0; }
             @compute @workgroup_size(1) fn main() { out[0] = helper(3.0); }
             @compute @workgroup_size(1) fn second() { other[0] = 1u; }",
            "main",
        );
        assert!(!text.contains("struct"), "{text}");
        assert!(!text.contains("array<u32>"), "{text}");
        assert_eq!(text.matches("fn ").count(), 2, "{text}");
        assert!(text.contains("fn function1(local2: f32) -> f32"), "{text}");
    }

    #[test]
    fn constants_are_substituted() {
        let text = text(
            "const scale = 2.0;
             const offsets = array<i32, 3>(1, 2, 3);
             @group(0) @binding(0) var<storage, read_write> out: array<f32>;
             @compute @workgroup_size(1) fn main() {
                 const local_scale = scale * 2.0;
                 out[0] = local_scale + f32(offsets[1]);
             }",
            "main",
        );
        assert!(!text.contains("const"), "{text}");
        assert!(text.contains(" = 6.0f;"), "{text}");
        assert!(!text.contains("scale"), "{text}");
    }

    #[test]
    fn bounds_checks_print_as_min() {
        let text = text(
            "@group(0) @binding(0) var<storage, read_write> data: array<f32>;
             var<private> table: array<f32, 8>;
             @compute @workgroup_size(1)
             fn main(@builtin(local_invocation_index) i: u32) {
                 data[i] = table[i] + table[7];
             }",
            "main",
        );
        assert!(text.contains("arrayLength(&global0) - 1u)"), "{text}");
        assert!(text.contains("[min(u32(local"), "{text}");
        assert!(text.contains("7u)]"), "{text}");
        assert!(text.contains("global1[7"), "{text}");
    }

    #[test]
    fn entry_point_inputs_become_one_struct() {
        let text = text(
            "struct Out { @builtin(position) position: vec4f, @location(0) color: vec4f }
             @vertex fn vs(@builtin(vertex_index) index: u32, @location(0) p: vec2f) -> Out {
                 var out: Out;
                 out.position = vec4f(p, f32(index), 1.0);
                 out.color = vec4f(1.0);
                 return out;
             }",
            "vs",
        );
        assert!(text.contains("@builtin(vertex_index) field"), "{text}");
        assert!(text.contains("@location(0) field"), "{text}");
        assert!(text.contains("@vertex fn function"), "{text}");
    }

    #[test]
    fn overrides_are_specialized() {
        let source = "
            override width: u32 = 64;
            @id(3) override scale: f32;
            override doubled = width * 2u;
            @group(0) @binding(0) var<storage, read_write> out: array<f32>;
            @compute @workgroup_size(width)
            fn main(@builtin(local_invocation_index) i: u32) {
                out[i] = scale * f32(doubled);
            }";
        let mut constants = ConstantMap::new();
        constants.insert("3".into(), ConstantValue::AbstractFloat(0.5));
        constants.insert("height".into(), ConstantValue::AbstractInt(1));
        let output = emit(source, "main", &constants).unwrap();
        let text = &output.files[0].text;
        validate(text);
        assert!(text.contains("@workgroup_size(64u)"), "{text}");
        assert!(text.contains("(0.5f * f32((64u * 2u)))"), "{text}");
        assert!(!text.contains("override"), "{text}");

        let messages: Vec<_> = output.diagnostics.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            messages,
            [
                "[Info] override 'width' uses its default value 64u",
                "[Info] override 'doubled' is computed from its initializer",
                "[Warning] no prepared entry point uses an override named 'height'",
            ]
        );
    }

    #[test]
    fn missing_override_value_fails() {
        let source = "
            override count: u32;
            @group(0) @binding(0) var<storage, read_write> out: array<f32>;
            @compute @workgroup_size(1) fn main() { out[0] = f32(count); }";
        assert_eq!(
            emit(source, "main", &ConstantMap::new()).unwrap_err(),
            BackendError::MissingOverride {
                name: "count".into()
            }
        );

        let mut constants = ConstantMap::new();
        constants.insert("count".into(), ConstantValue::AbstractInt(-1));
        assert!(matches!(
            emit(source, "main", &constants),
            Err(BackendError::InvalidOverride { ref name, .. }) if name == "count"
        ));

        constants.insert(
            "count".into(),
            ConstantValue::Vector(vec![ConstantValue::U32(1), ConstantValue::U32(2)]),
        );
        assert!(matches!(
            emit(source, "main", &constants),
            Err(BackendError::InvalidOverride { ref reason, .. }) if reason == "overrides are scalars"
        ));
    }

    #[test]
    fn override_workgroup_sizes_meet_limits() {
        let source = "
            override width: u32 = 64;
            @group(0) @binding(0) var<storage, read_write> out: array<f32>;
            @compute @workgroup_size(width, 2)
            fn main(@builtin(local_invocation_index) i: u32) { out[i] = 1.0; }";
        let mut constants = ConstantMap::new();
        constants.insert("width".into(), ConstantValue::AbstractInt(128));
        assert!(emit(source, "main", &constants).is_ok());

        constants.insert("width".into(), ConstantValue::AbstractInt(512));
        assert_eq!(
            emit(source, "main", &constants).unwrap_err(),
            BackendError::InvalidWorkgroupSize {
                entry_point: "main".into(),
                message: "workgroup size x dimension 512 exceeds the limit of 256".into(),
            }
        );

        constants.insert("width".into(), ConstantValue::AbstractInt(200));
        assert_eq!(
            emit(source, "main", &constants).unwrap_err(),
            BackendError::InvalidWorkgroupSize {
                entry_point: "main".into(),
                message: "workgroup size of 400 invocations exceeds the limit of 256".into(),
            }
        );
    }

    #[test]
    fn a_prepared_module_stays_specialized() {
        let source = "
            override scale: f32;
            @group(0) @binding(0) var<storage, read_write> out: array<f32>;
            @compute @workgroup_size(1) fn main() { out[0] = scale; }";
        let mut module = static_check(source, None, Configuration::default()).unwrap().ast;
        let prepared = prepare_entry_point(&mut module, "main", None).unwrap();

        let mut constants = ConstantMap::new();
        constants.insert("scale".into(), ConstantValue::F32(1.5));
        assert!(WgslBackend.generate(&prepared, &constants).is_ok());
        assert!(WgslBackend.generate(&prepared, &constants).is_ok());

        constants.insert("scale".into(), ConstantValue::F32(2.5));
        assert!(matches!(
            WgslBackend.generate(&prepared, &constants),
            Err(BackendError::Respecialized { .. })
        ));
    }

    #[test]
    fn control_flow_round_trips_through_naga() {
        text(
            "@group(0) @binding(0) var<storage, read_write> out: array<i32, 4>;
             fn classify(v: i32) -> i32 {
                 var r = -1;
                 switch v {
                     case 0, 1: { r = 10; }
                     default: {}
                 }
                 return r;
             }
             @compute @workgroup_size(4, 1, 1)
             fn main(@builtin(local_invocation_index) i: u32) {
                 var total = 0;
                 for (var k = 0; k < 4; k++) {
                     if k == 2 { continue; } else { total += classify(k); }
                 }
                 var n = 0;
                 loop {
                     n++;
                     continuing { break if n >= 3; }
                 }
                 while total > 100 { total -= 1; }
                 {
                     let p = &out[i];
                     *p = total + n;
                 }
             }",
            "main",
        );
    }

    #[test]
    fn negative_integers_stay_valid() {
        assert_eq!(
            Writer {
                module: &ShaderModule::new("", Configuration::default()),
                values: ConstantMap::new(),
            }
            .value(None, &ConstantValue::I32(i32::MIN)),
            "(-2147483647i - 1i)"
        );
    }
}
