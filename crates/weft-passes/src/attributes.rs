//! Attribute validation, the last static-check pass.
//!
//! Checks where each attribute may appear and what its arguments may be,
//! then records resource bindings and override ids on their declarations.

use std::collections::{HashMap, HashSet};

use weft_ast::{
    Attribute, AttributeKind, BuiltinValue, ConstantMap, Declaration, Error, Expression, Handle,
    InterpolationType, Scalar, ShaderModule, ShaderStage, Span, Type, VectorSize, find_attribute,
    layout,
};

use crate::evaluate::evaluate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

impl Direction {
    fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

/// Where a builtin may appear and the type it must have.
fn builtin_usage(builtin: BuiltinValue) -> (&'static [(ShaderStage, Direction)], Type) {
    use BuiltinValue as B;
    use Direction::{Input, Output};
    use ShaderStage::{Compute, Fragment, Vertex};

    let vec3u = Type::Vector {
        size: VectorSize::Tri,
        scalar: Scalar::U32,
    };
    match builtin {
        B::Position => (
            &[(Vertex, Output), (Fragment, Input)],
            Type::Vector {
                size: VectorSize::Quad,
                scalar: Scalar::F32,
            },
        ),
        B::VertexIndex | B::InstanceIndex => (&[(Vertex, Input)], Type::Scalar(Scalar::U32)),
        B::FrontFacing => (&[(Fragment, Input)], Type::Scalar(Scalar::BOOL)),
        B::FragDepth => (&[(Fragment, Output)], Type::Scalar(Scalar::F32)),
        B::SampleIndex => (&[(Fragment, Input)], Type::Scalar(Scalar::U32)),
        B::SampleMask => (
            &[(Fragment, Input), (Fragment, Output)],
            Type::Scalar(Scalar::U32),
        ),
        B::LocalInvocationIndex => (&[(Compute, Input)], Type::Scalar(Scalar::U32)),
        B::LocalInvocationId | B::GlobalInvocationId | B::WorkgroupId | B::NumWorkgroups => {
            (&[(Compute, Input)], vec3u)
        }
    }
}

/// Locations and builtins already used on one side of an entry point.
#[derive(Default)]
struct Interface {
    locations: HashSet<i64>,
    builtins: HashSet<BuiltinValue>,
}

struct Validator<'m> {
    module: &'m mut ShaderModule,
    errors: Vec<Error>,
    override_ids: HashMap<u32, String>,
}

/// Validates every attribute in a type-checked module.
///
/// Errors accumulate across the whole module, up to the configured maximum.
/// On success every resource variable has its `binding` set and every
/// override with `@id` has its `override_id` set.
pub fn validate_attributes(module: &mut ShaderModule) -> Result<(), Vec<Error>> {
    let max_errors = module.configuration().max_errors;
    let declarations = module.declarations.clone();
    let mut validator = Validator {
        module,
        errors: Vec::new(),
        override_ids: HashMap::new(),
    };
    for declaration in declarations {
        if validator.errors.len() >= max_errors {
            break;
        }
        match declaration {
            Declaration::Constant(h) => validator.constant(h),
            Declaration::Variable(h) => validator.variable(h),
            Declaration::Struct(h) => validator.structure(h),
            Declaration::Alias(_) => {}
            Declaration::Function(h) => validator.function(h),
        }
    }
    let mut errors = validator.errors;
    errors.truncate(max_errors);
    log::debug!("validate attributes: {} error(s)", errors.len());
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

impl Validator<'_> {
    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.errors.push(Error::attribute(message, span));
    }

    /// Reports duplicates and attributes outside `allowed`.
    fn allowed(&mut self, attributes: &[Attribute], allowed: &[&str], context: &str) {
        let mut seen = HashSet::new();
        for attribute in attributes {
            let name = attribute.kind.name();
            if !seen.insert(name) {
                self.error(format!("duplicate attribute @{name}"), attribute.span);
            } else if !allowed.contains(&name) {
                self.error(format!("@{name} is not valid on {context}"), attribute.span);
            }
        }
    }

    /// The value of a const-expression argument; `None` for
    /// override-expressions.
    fn value(&self, e: Handle<Expression>) -> Option<i64> {
        if !self.module.expressions[e].is_constant() {
            return None;
        }
        evaluate(self.module, e, &ConstantMap::new()).as_i64()
    }

    fn constant(&mut self, h: Handle<weft_ast::Constant>) {
        let constant = self.module.constants[h].clone();
        if !constant.is_override {
            self.allowed(&constant.attributes, &[], "a const declaration");
            return;
        }
        self.allowed(&constant.attributes, &["id"], "an override declaration");
        let Some((e, span)) = constant.attributes.iter().find_map(|a| match a.kind {
            AttributeKind::Id(e) => Some((e, a.span)),
            _ => None,
        }) else {
            return;
        };
        let Some(id) = self.value(e).and_then(|v| u16::try_from(v).ok()) else {
            self.error("@id must be between 0 and 65535", span);
            return;
        };
        let id = u32::from(id);
        match self.override_ids.get(&id) {
            Some(other) => {
                let message = format!("@id({id}) is used by both '{other}' and '{}'", constant.name.name);
                self.error(message, span);
            }
            None => {
                self.override_ids.insert(id, constant.name.name.clone());
                self.module.constants[h].override_id = Some(id);
            }
        }
    }

    fn variable(&mut self, h: Handle<weft_ast::GlobalVariable>) {
        let variable = self.module.global_variables[h].clone();
        if !variable.is_resource() {
            let context = format!("a {} variable", variable.space.name());
            self.allowed(&variable.attributes, &[], &context);
            return;
        }
        self.allowed(&variable.attributes, &["group", "binding"], "a resource variable");

        let group = find_attribute(&variable.attributes, |k| match k {
            AttributeKind::Group(e) => Some(*e),
            _ => None,
        });
        let binding = find_attribute(&variable.attributes, |k| match k {
            AttributeKind::Binding(e) => Some(*e),
            _ => None,
        });
        let (Some(group), Some(binding)) = (group, binding) else {
            self.error(
                format!("resource variable '{}' needs both @group and @binding", variable.name.name),
                variable.span,
            );
            return;
        };

        let limits = self.module.configuration().limits.clone();
        let checked = |validator: &mut Self, e: Handle<Expression>, what: &str, limit: u32, unit: &str| {
            let span = validator.module.expressions[e].span;
            match validator.value(e).map(u32::try_from) {
                Some(Ok(value)) if value < limit => Some(value),
                Some(Ok(value)) => {
                    validator.error(format!("@{what}({value}) exceeds the limit of {limit} {unit}"), span);
                    None
                }
                _ => {
                    validator.error(format!("@{what} must be non-negative"), span);
                    None
                }
            }
        };
        let group = checked(self, group, "group", limits.max_bind_groups, "bind groups");
        let binding = checked(
            self,
            binding,
            "binding",
            limits.max_bindings_per_bind_group,
            "bindings per group",
        );
        if let (Some(group), Some(binding)) = (group, binding) {
            self.module.global_variables[h].binding = Some(weft_ast::ResourceBinding { group, binding });
        }
    }

    fn structure(&mut self, h: Handle<weft_ast::Struct>) {
        let members = self.module.structs[h].members.clone();
        for member in &members {
            self.allowed(
                &member.attributes,
                &["align", "size", "location", "builtin", "interpolate", "invariant"],
                "a struct member",
            );
            let ty = member.resolved_ty.expect("checked struct members are typed");
            let natural = layout::type_layout(self.module, ty);
            let runtime_sized = matches!(
                self.module.types[ty],
                Type::Array {
                    size: weft_ast::ArraySize::Runtime,
                    ..
                }
            );
            for attribute in &member.attributes {
                match attribute.kind {
                    AttributeKind::Align(e) => {
                        let Some(align) = self.value(e).filter(|&v| v > 0 && (v as u64).is_power_of_two()) else {
                            self.error("@align must be a positive power of two", attribute.span);
                            continue;
                        };
                        if let Some(natural) = natural {
                            if align % i64::from(natural.align) != 0 {
                                let message = format!(
                                    "@align({align}) must be a multiple of the alignment {} of '{}'",
                                    natural.align,
                                    self.module.type_name(ty)
                                );
                                self.error(message, attribute.span);
                            }
                        }
                    }
                    AttributeKind::Size(e) => {
                        if runtime_sized {
                            self.error("@size cannot be applied to a runtime-sized array", attribute.span);
                            continue;
                        }
                        let size = self.value(e).unwrap_or(-1);
                        if let Some(natural) = natural {
                            if size < i64::from(natural.size) {
                                let message = format!(
                                    "@size({size}) is smaller than the size {} of '{}'",
                                    natural.size,
                                    self.module.type_name(ty)
                                );
                                self.error(message, attribute.span);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn function(&mut self, h: Handle<weft_ast::Function>) {
        let function = self.module.functions[h].clone();
        let name = &function.name.name;
        self.allowed(
            &function.attributes,
            &["compute", "vertex", "fragment", "workgroup_size", "must_use"],
            "a function",
        );

        let stages: Vec<&Attribute> = function
            .attributes
            .iter()
            .filter(|a| {
                matches!(
                    a.kind,
                    AttributeKind::Compute | AttributeKind::Vertex | AttributeKind::Fragment
                )
            })
            .collect();
        if stages.len() > 1 {
            self.error(format!("function '{name}' has more than one stage attribute"), stages[1].span);
            return;
        }
        let stage = function.stage();

        for attribute in &function.attributes {
            match &attribute.kind {
                AttributeKind::WorkgroupSize(dimensions) => {
                    if stage == Some(ShaderStage::Compute) {
                        self.workgroup_size(dimensions, attribute.span);
                    } else {
                        self.error("@workgroup_size is only valid on compute entry points", attribute.span);
                    }
                }
                AttributeKind::MustUse if stage.is_some() => {
                    self.error("@must_use is not valid on entry points", attribute.span);
                }
                AttributeKind::MustUse if function.result.is_none() => {
                    self.error("@must_use requires a function that returns a value", attribute.span);
                }
                _ => {}
            }
        }

        let Some(stage) = stage else {
            for parameter in &function.parameters {
                self.allowed(&parameter.attributes, &[], "a parameter of a non-entry-point function");
            }
            if let Some(result) = &function.result {
                self.allowed(&result.attributes, &[], "the result of a non-entry-point function");
            }
            return;
        };

        if stage == ShaderStage::Compute && function.workgroup_size().is_none() {
            self.error(
                format!("compute entry point '{name}' needs @workgroup_size"),
                function.name.span,
            );
        }

        let io = ["location", "builtin", "interpolate", "invariant"];
        let mut inputs = Interface::default();
        for parameter in &function.parameters {
            self.allowed(&parameter.attributes, &io, "an entry point parameter");
            let local = &self.module.locals[parameter.local];
            let what = local.name.name.clone();
            let ty = local.ty.expect("checked parameters are typed");
            self.io(&parameter.attributes, ty, stage, Direction::Input, &what, parameter.span, &mut inputs, true);
        }

        let mut outputs = Interface::default();
        match (&function.result, stage) {
            (Some(result), ShaderStage::Compute) => {
                self.error("compute entry points cannot return a value", result.ty.span);
            }
            (Some(result), _) => {
                self.allowed(&result.attributes, &io, "an entry point result");
                let ty = result.resolved.expect("checked results are typed");
                self.io(&result.attributes, ty, stage, Direction::Output, "result", result.ty.span, &mut outputs, true);
            }
            (None, _) => {}
        }
        if stage == ShaderStage::Vertex && !outputs.builtins.contains(&BuiltinValue::Position) {
            self.error(
                format!("vertex entry point '{name}' must output @builtin(position)"),
                function.name.span,
            );
        }
    }

    fn workgroup_size(&mut self, dimensions: &[Handle<Expression>], span: Span) {
        let limits = self.module.configuration().limits.clone();
        let maxima = limits.max_workgroup_size();
        let mut invocations = Some(1u64);
        for (i, (&e, &limit)) in dimensions.iter().zip(&maxima).enumerate() {
            let Some(value) = self.value(e) else {
                // Override-dependent; checked once the value is known.
                invocations = None;
                continue;
            };
            if value < 1 {
                self.error("workgroup size dimensions must be at least 1", self.module.expressions[e].span);
                return;
            }
            if value > i64::from(limit) {
                let axis = ["x", "y", "z"][i];
                let message = format!("workgroup size {axis} dimension {value} exceeds the limit of {limit}");
                self.error(message, self.module.expressions[e].span);
                return;
            }
            invocations = invocations.map(|n| n * value as u64);
        }
        if let Some(n) = invocations {
            if n > u64::from(limits.max_compute_invocations_per_workgroup) {
                let message = format!(
                    "workgroup size of {n} invocations exceeds the limit of {}",
                    limits.max_compute_invocations_per_workgroup
                );
                self.error(message, span);
            }
        }
    }

    /// Checks one entry point input or output. Structs without IO
    /// attributes of their own are checked member by member.
    #[allow(clippy::too_many_arguments)]
    fn io(
        &mut self,
        attributes: &[Attribute],
        ty: Handle<Type>,
        stage: ShaderStage,
        direction: Direction,
        what: &str,
        span: Span,
        seen: &mut Interface,
        top_level: bool,
    ) {
        let location = attributes.iter().find_map(|a| match a.kind {
            AttributeKind::Location(e) => Some((e, a.span)),
            _ => None,
        });
        let builtin = attributes.iter().find_map(|a| match a.kind {
            AttributeKind::Builtin(b) => Some((b, a.span)),
            _ => None,
        });
        let interpolate = find_attribute(attributes, |k| match k {
            AttributeKind::Interpolate(ty, _) => Some(*ty),
            _ => None,
        });

        match (location, builtin) {
            (Some(_), Some((_, span))) => {
                self.error(format!("'{what}' cannot have both @location and @builtin"), span);
            }
            (None, None) => {
                let structure = match self.module.types[ty] {
                    Type::Struct(s) if top_level => Some(s),
                    _ => None,
                };
                if let Some(s) = structure {
                    let members = self.module.structs[s].members.clone();
                    for member in &members {
                        let member_ty = member.resolved_ty.expect("checked struct members are typed");
                        let what = format!("{what}.{}", member.name.name);
                        self.io(&member.attributes, member_ty, stage, direction, &what, member.span, seen, false);
                    }
                } else {
                    self.error(format!("'{what}' needs @location or @builtin"), span);
                }
            }
            (Some((e, span)), None) => self.location(e, span, ty, stage, direction, interpolate, seen),
            (None, Some((builtin, span))) => self.builtin(builtin, span, ty, stage, direction, seen),
        }

        if location.is_none() {
            if let Some(attribute) = attributes.iter().find(|a| matches!(a.kind, AttributeKind::Interpolate(..))) {
                self.error("@interpolate requires @location", attribute.span);
            }
        }
        if !matches!(builtin, Some((BuiltinValue::Position, _))) {
            if let Some(attribute) = attributes.iter().find(|a| matches!(a.kind, AttributeKind::Invariant)) {
                self.error("@invariant requires @builtin(position)", attribute.span);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn location(
        &mut self,
        e: Handle<Expression>,
        span: Span,
        ty: Handle<Type>,
        stage: ShaderStage,
        direction: Direction,
        interpolate: Option<InterpolationType>,
        seen: &mut Interface,
    ) {
        if stage == ShaderStage::Compute {
            self.error("compute entry points cannot use @location", span);
            return;
        }
        let Some(location) = self.value(e).filter(|&v| v >= 0) else {
            self.error("@location must be non-negative", span);
            return;
        };
        let scalar = match self.module.types[ty] {
            Type::Scalar(s) | Type::Vector { scalar: s, .. } if s.is_numeric() => s,
            _ => {
                let message = format!(
                    "@location requires a numeric scalar or vector, found '{}'",
                    self.module.type_name(ty)
                );
                self.error(message, span);
                return;
            }
        };
        if !seen.locations.insert(location) {
            self.error(format!("@location({location}) is used more than once"), span);
        }
        let interpolated = matches!(
            (stage, direction),
            (ShaderStage::Vertex, Direction::Output) | (ShaderStage::Fragment, Direction::Input)
        );
        if interpolated && scalar.is_integer() && interpolate != Some(InterpolationType::Flat) {
            self.error("integer @location values must use @interpolate(flat)", span);
        }
    }

    fn builtin(
        &mut self,
        builtin: BuiltinValue,
        span: Span,
        ty: Handle<Type>,
        stage: ShaderStage,
        direction: Direction,
        seen: &mut Interface,
    ) {
        let (usage, expected) = builtin_usage(builtin);
        if !usage.contains(&(stage, direction)) {
            let message = format!(
                "@builtin({}) cannot be used as a {} {}",
                builtin.name(),
                stage.name(),
                direction.name()
            );
            self.error(message, span);
            return;
        }
        if self.module.types[ty] != expected {
            let expected = self.module.insert_type(expected);
            let message = format!(
                "@builtin({}) must have type '{}', found '{}'",
                builtin.name(),
                self.module.type_name(expected),
                self.module.type_name(ty)
            );
            self.error(message, span);
        }
        if !seen.builtins.insert(builtin) {
            self.error(format!("@builtin({}) is used more than once", builtin.name()), span);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ast::{Configuration, ErrorKind, Limits};

    fn validate_with(source: &str, configuration: Configuration) -> Result<ShaderModule, Vec<Error>> {
        let mut module = weft_parser::parse(source, configuration).map_err(|e| vec![e])?;
        crate::reorder::reorder_globals(&mut module)?;
        crate::typecheck::type_check(&mut module, &mut Vec::new())?;
        validate_attributes(&mut module)?;
        Ok(module)
    }

    fn validate(source: &str) -> Result<ShaderModule, Vec<Error>> {
        validate_with(source, Configuration::default())
    }

    fn messages(source: &str) -> Vec<String> {
        let errors = validate(source).unwrap_err();
        assert!(errors.iter().all(|e| e.kind == ErrorKind::Attribute));
        errors.into_iter().map(|e| e.message).collect()
    }

    #[test]
    fn bindings_are_recorded() {
        let module = validate(
            "@group(1) @binding(2) var<storage> data: array<f32>;
             @compute @workgroup_size(64) fn main() { _ = data[0]; }",
        )
        .unwrap();
        let (_, variable) = module.global_variables.iter().next().unwrap();
        assert_eq!(
            variable.binding,
            Some(weft_ast::ResourceBinding { group: 1, binding: 2 })
        );
    }

    #[test]
    fn resources_need_group_and_binding() {
        assert_eq!(
            messages("@binding(0) var<uniform> u: f32;"),
            ["resource variable 'u' needs both @group and @binding"]
        );
        assert_eq!(
            messages("@group(0) @binding(0) var<private> p: f32;"),
            ["@group is not valid on a private variable", "@binding is not valid on a private variable"]
        );
        assert_eq!(
            messages("@group(4) @binding(0) var<uniform> u: f32;"),
            ["@group(4) exceeds the limit of 4 bind groups"]
        );
    }

    #[test]
    fn override_ids_are_unique() {
        let module = validate("@id(7) override a: u32; override b = 1;").unwrap();
        let ids: Vec<_> = module.constants.iter().map(|(_, c)| c.override_id).collect();
        assert_eq!(ids, [Some(7), None]);
        assert_eq!(
            messages("@id(1) override a: u32; @id(1) override b: u32;"),
            ["@id(1) is used by both 'a' and 'b'"]
        );
        assert_eq!(messages("@id(70000) override a: u32;"), ["@id must be between 0 and 65535"]);
    }

    #[test]
    fn workgroup_size_rules() {
        assert_eq!(
            messages("@compute fn main() {}"),
            ["compute entry point 'main' needs @workgroup_size"]
        );
        assert_eq!(
            messages("@fragment @workgroup_size(1) fn main() {}"),
            ["@workgroup_size is only valid on compute entry points"]
        );
        assert_eq!(
            messages("@compute @workgroup_size(512) fn main() {}"),
            ["workgroup size x dimension 512 exceeds the limit of 256"]
        );
        assert_eq!(
            messages("@compute @workgroup_size(16, 16, 2) fn main() {}"),
            ["workgroup size of 512 invocations exceeds the limit of 256"]
        );
        let limits = Limits {
            max_compute_invocations_per_workgroup: 1024,
            ..Limits::default()
        };
        validate_with(
            "@compute @workgroup_size(16, 16, 2) fn main() {}",
            Configuration::default().with_limits(limits),
        )
        .unwrap();
        // Override-sized workgroups are checked once values are known.
        validate("override n: u32; @compute @workgroup_size(n, 4) fn main() {}").unwrap();
    }

    #[test]
    fn builtin_direction_and_type() {
        validate(
            "@compute @workgroup_size(1)
             fn main(@builtin(global_invocation_id) id: vec3<u32>, @builtin(local_invocation_index) i: u32) {}",
        )
        .unwrap();
        assert_eq!(
            messages("@compute @workgroup_size(1) fn main(@builtin(global_invocation_id) id: vec3<i32>) {}"),
            ["@builtin(global_invocation_id) must have type 'vec3<u32>', found 'vec3<i32>'"]
        );
        assert_eq!(
            messages("@fragment fn main(@builtin(frag_depth) d: f32) {}"),
            ["@builtin(frag_depth) cannot be used as a fragment input"]
        );
    }

    #[test]
    fn vertex_and_fragment_interfaces() {
        validate(
            "struct Out { @builtin(position) pos: vec4f, @location(0) @interpolate(flat) id: u32 }
             @vertex fn vs(@location(0) p: vec3f) -> Out { return Out(vec4f(p, 1.0), 0u); }
             @fragment fn fs(@location(0) @interpolate(flat) id: u32) -> @location(0) vec4f { return vec4f(); }",
        )
        .unwrap();
        assert_eq!(
            messages("@vertex fn vs() -> @location(0) vec4f { return vec4f(); }"),
            ["vertex entry point 'vs' must output @builtin(position)"]
        );
        assert_eq!(
            messages("@fragment fn fs(@location(0) a: f32, @location(0) b: f32) {}"),
            ["@location(0) is used more than once"]
        );
        assert_eq!(
            messages("@fragment fn fs(@location(1) id: u32) {}"),
            ["integer @location values must use @interpolate(flat)"]
        );
        assert_eq!(messages("@fragment fn fs(x: f32) {}"), ["'x' needs @location or @builtin"]);
    }

    #[test]
    fn non_entry_points_take_no_io_attributes() {
        assert_eq!(
            messages("fn f(@location(0) x: f32) {}"),
            ["@location is not valid on a parameter of a non-entry-point function"]
        );
        assert_eq!(
            messages("@must_use fn f() {}"),
            ["@must_use requires a function that returns a value"]
        );
    }

    #[test]
    fn member_layout_attributes() {
        assert_eq!(
            messages("struct S { @align(3) a: f32 }"),
            ["@align must be a positive power of two"]
        );
        assert_eq!(
            messages("struct S { @size(8) a: vec4f }"),
            ["@size(8) is smaller than the size 16 of 'vec4<f32>'"]
        );
        assert_eq!(
            messages("struct S { @align(4) a: vec4f }"),
            ["@align(4) must be a multiple of the alignment 16 of 'vec4<f32>'"]
        );
        validate("struct S { @align(32) @size(64) a: vec4f }").unwrap();
    }

    #[test]
    fn errors_accumulate() {
        let errors = validate(
            "@binding(0) var<uniform> u: f32;
             @compute fn main() {}",
        )
        .unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
