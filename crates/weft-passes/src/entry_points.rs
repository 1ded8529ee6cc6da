//! Entry point interface rewriting.
//!
//! All inputs of an entry point are gathered into one synthesized struct
//! parameter. The body begins by rebuilding the original parameters from
//! its fields.

use indexmap::IndexMap;
use weft_ast::{
    Attribute, AttributeKind, CallTarget, Callee, ConstantMap, Declaration, Expression,
    ExpressionKind, Handle, Ident, Local, LocalKind, MemberAccess, Parameter, Resolved,
    ShaderModule, Statement, StatementKind, Struct, StructMember, Type, TypeExpr,
};

use crate::call_graph::CallGraph;
use crate::evaluate::evaluate;
use crate::mangle::Namer;
use crate::reflection::{EntryPointInformation, InterfaceVariable, IoBinding};

/// How an original parameter is rebuilt from the input struct.
enum Source {
    Field(u32),
    /// A struct parameter built from consecutive fields.
    Struct(Handle<Type>, Vec<u32>),
}

pub fn rewrite_entry_points(
    module: &mut ShaderModule,
    graph: &CallGraph,
    entry_points: &mut IndexMap<String, EntryPointInformation>,
    namer: &mut Namer,
) {
    for (name, calls) in graph.entry_points() {
        let info = entry_points
            .get_mut(name)
            .expect("every call graph entry is reflected");
        let f = calls.function;

        info.outputs.clear();
        if let Some(result) = &module.functions[f].result {
            let ty = result.resolved.expect("checked results are typed");
            let attributes = result.attributes.clone();
            interface(module, namer, &attributes, ty, "result", &mut info.outputs);
        }

        info.inputs.clear();
        let parameters = std::mem::take(&mut module.functions[f].parameters);
        if parameters.is_empty() {
            continue;
        }
        let span = module.functions[f].span;

        let mut members = Vec::new();
        let mut sources = Vec::new();
        for parameter in &parameters {
            let local = &module.locals[parameter.local];
            let ty = local.ty.expect("checked parameters are typed");
            let param_name = namer.original(&local.name.name).to_string();
            if let Some(binding) = io_binding(module, &parameter.attributes) {
                sources.push(Source::Field(members.len() as u32));
                info.inputs.push(InterfaceVariable {
                    name: param_name,
                    binding,
                    ty: module.type_name(ty),
                });
                members.push(input_member(module, namer, &parameter.attributes, ty, parameter.span));
                continue;
            }
            let Type::Struct(s) = module.types[ty] else {
                unreachable!("entry point parameter '{param_name}' has no IO attributes");
            };
            let mut fields = Vec::new();
            for member in module.structs[s].members.clone() {
                let member_ty = member.resolved_ty.expect("checked struct members are typed");
                let binding = io_binding(module, &member.attributes)
                    .expect("validated IO struct members carry IO attributes");
                fields.push(members.len() as u32);
                info.inputs.push(InterfaceVariable {
                    name: format!("{param_name}.{}", namer.original(&member.name.name)),
                    binding,
                    ty: module.type_name(member_ty),
                });
                members.push(input_member(module, namer, &member.attributes, member_ty, member.span));
            }
            sources.push(Source::Struct(ty, fields));
        }

        let struct_name = namer.fresh("type");
        let member_types: Vec<_> = members.iter().map(|m: &StructMember| m.resolved_ty).collect();
        let s = module.structs.append(Struct {
            name: Ident::synthesized(struct_name.clone()),
            members,
            span,
            layout: None,
        });
        let struct_ty = module.insert_type(Type::Struct(s));
        let position = module
            .declarations
            .iter()
            .position(|&d| d == Declaration::Function(f))
            .expect("entry points are declared");
        module.declarations.insert(position, Declaration::Struct(s));

        let input_name = namer.fresh("local");
        let input = module.locals.append(Local {
            name: Ident::synthesized(input_name.clone()),
            kind: LocalKind::Parameter,
            ty: Some(struct_ty),
        });

        let field = |module: &mut ShaderModule, i: u32| {
            let mut base = Expression::new(
                ExpressionKind::Identifier {
                    name: Ident::synthesized(input_name.clone()),
                    resolved: Some(Resolved::Local(input)),
                },
                span,
            );
            base.ty = Some(struct_ty);
            let base = module.expressions.append(base);
            let member_name = module.structs[s].members[i as usize].name.name.clone();
            let mut access = Expression::new(
                ExpressionKind::Member {
                    base,
                    member: Ident::synthesized(member_name),
                    access: Some(MemberAccess::Field(i)),
                },
                span,
            );
            access.ty = member_types[i as usize];
            module.expressions.append(access)
        };

        let mut prologue = Vec::with_capacity(parameters.len());
        for (parameter, source) in parameters.iter().zip(sources) {
            let value = match source {
                Source::Field(i) => field(module, i),
                Source::Struct(ty, fields) => {
                    let arguments = fields.into_iter().map(|i| field(module, i)).collect();
                    let mut construct = Expression::new(
                        ExpressionKind::Call {
                            target: CallTarget::Type(TypeExpr::named(module.type_name(ty), span)),
                            arguments,
                            callee: Some(Callee::Constructor(ty)),
                        },
                        span,
                    );
                    construct.ty = Some(ty);
                    module.expressions.append(construct)
                }
            };
            module.locals[parameter.local].kind = LocalKind::Let;
            prologue.push(Statement::new(
                StatementKind::Let {
                    local: parameter.local,
                    ty: None,
                    value,
                },
                parameter.span,
            ));
        }

        let function = &mut module.functions[f];
        function.parameters = vec![Parameter {
            local: input,
            ty: TypeExpr::named(struct_name, span),
            attributes: Vec::new(),
            span,
        }];
        prologue.append(&mut function.body);
        function.body = prologue;
        log::debug!(
            "rewrite entry points: '{name}' takes {} input(s) through one struct",
            info.inputs.len()
        );
    }
}

fn io_binding(module: &ShaderModule, attributes: &[Attribute]) -> Option<IoBinding> {
    attributes.iter().find_map(|a| match a.kind {
        AttributeKind::Builtin(b) => Some(IoBinding::Builtin(b)),
        AttributeKind::Location(e) => {
            let location = evaluate(module, e, &ConstantMap::new())
                .as_u32()
                .expect("validated locations are non-negative");
            Some(IoBinding::Location(location))
        }
        _ => None,
    })
}

fn input_member(
    module: &ShaderModule,
    namer: &mut Namer,
    attributes: &[Attribute],
    ty: Handle<Type>,
    span: weft_ast::Span,
) -> StructMember {
    StructMember {
        name: Ident::synthesized(namer.fresh("field")),
        ty: TypeExpr::named(module.type_name(ty), span),
        attributes: attributes.iter().filter(|a| a.kind.is_io()).cloned().collect(),
        span,
        resolved_ty: Some(ty),
    }
}

/// Records the interface of one result, member by member for structs.
fn interface(
    module: &ShaderModule,
    namer: &Namer,
    attributes: &[Attribute],
    ty: Handle<Type>,
    name: &str,
    out: &mut Vec<InterfaceVariable>,
) {
    if let Some(binding) = io_binding(module, attributes) {
        out.push(InterfaceVariable {
            name: name.to_string(),
            binding,
            ty: module.type_name(ty),
        });
        return;
    }
    if let Type::Struct(s) = module.types[ty] {
        for member in &module.structs[s].members {
            let member_ty = member.resolved_ty.expect("checked struct members are typed");
            let member_name = namer.original(&member.name.name);
            interface(module, namer, &member.attributes, member_ty, member_name, out);
        }
    }
}
