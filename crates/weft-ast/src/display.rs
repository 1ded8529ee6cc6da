//! Type formatting and a text dump of the AST for debugging.

use std::fmt::Write as _;

use crate::ShaderModule;
use crate::arena::Handle;
use crate::decl::{Attribute, AttributeKind, Declaration, Function, TypeExpr, TypeExprKind};
use crate::expr::{
    BoundsLimit, CallTarget, Callee, Expression, ExpressionKind, Literal, MemberAccess, Resolved,
};
use crate::stmt::{CaseSelector, Statement, StatementKind};
use crate::types::{AccessMode, AddressSpace, ArraySize, Type};

/// Formats a resolved type the way WGSL spells it. Struct types use the
/// struct's current name; references print as `ref<space, T, access>`.
pub fn format_type(module: &ShaderModule, ty: Handle<Type>) -> String {
    match module.types[ty] {
        Type::Scalar(s) => s.name().to_string(),
        Type::Vector { size, scalar } => format!("vec{}<{}>", size.count(), scalar.name()),
        Type::Matrix {
            columns,
            rows,
            scalar,
        } => format!("mat{}x{}<{}>", columns.count(), rows.count(), scalar.name()),
        Type::Atomic(s) => format!("atomic<{}>", s.name()),
        Type::Array { base, size } => match size {
            ArraySize::Constant(n) => format!("array<{}, {n}>", format_type(module, base)),
            ArraySize::Runtime => format!("array<{}>", format_type(module, base)),
        },
        Type::Struct(h) => module.structs[h].name.name.clone(),
        Type::Pointer {
            space,
            base,
            access,
        } => format_view("ptr", module, space, base, access),
        Type::Reference {
            space,
            base,
            access,
        } => format_view("ref", module, space, base, access),
        Type::Sampler { comparison: false } => "sampler".to_string(),
        Type::Sampler { comparison: true } => "sampler_comparison".to_string(),
        Type::Texture { dimension, sample } => {
            format!("{}<{}>", dimension.type_name(), sample.name())
        }
    }
}

fn format_view(
    keyword: &str,
    module: &ShaderModule,
    space: AddressSpace,
    base: Handle<Type>,
    access: AccessMode,
) -> String {
    let base = format_type(module, base);
    if space.has_access_mode() {
        format!("{keyword}<{}, {base}, {}>", space.name(), access.name())
    } else {
        format!("{keyword}<{}, {base}>", space.name())
    }
}

fn format_type_expr(module: &ShaderModule, ty: &TypeExpr) -> String {
    match &ty.kind {
        TypeExprKind::Named(ident) => ident.name.clone(),
        TypeExprKind::Vector { size, element } => {
            format!("vec{}<{}>", size.count(), format_type_expr(module, element))
        }
        TypeExprKind::Matrix {
            columns,
            rows,
            element,
        } => format!(
            "mat{}x{}<{}>",
            columns.count(),
            rows.count(),
            format_type_expr(module, element)
        ),
        TypeExprKind::Array { element, count } => match count {
            Some(count) => format!(
                "array<{}, {}>",
                format_type_expr(module, element),
                format_expr(module, *count)
            ),
            None => format!("array<{}>", format_type_expr(module, element)),
        },
        TypeExprKind::Atomic(element) => format!("atomic<{}>", format_type_expr(module, element)),
        TypeExprKind::Pointer {
            space,
            element,
            access,
        } => match access {
            Some(access) => format!(
                "ptr<{}, {}, {}>",
                space.name,
                format_type_expr(module, element),
                access.name
            ),
            None => format!("ptr<{}, {}>", space.name, format_type_expr(module, element)),
        },
        TypeExprKind::Texture { dimension, sample } => format!(
            "{}<{}>",
            dimension.type_name(),
            format_type_expr(module, sample)
        ),
    }
}

fn format_literal(literal: Literal) -> String {
    match literal {
        Literal::Bool(b) => b.to_string(),
        Literal::AbstractInt(v) => v.to_string(),
        Literal::AbstractFloat(v) => format!("{v:?}"),
        Literal::I32(v) => format!("{v}i"),
        Literal::U32(v) => format!("{v}u"),
        Literal::F32(v) => format!("{v:?}f"),
        Literal::F16(v) => format!("{v:?}h"),
    }
}

/// Source-like rendering of an expression tree. Resolved identifiers show
/// their binding, cached constants are appended in braces.
pub fn format_expression(module: &ShaderModule, handle: Handle<Expression>) -> String {
    format_expr(module, handle)
}

fn format_expr(module: &ShaderModule, handle: Handle<Expression>) -> String {
    let expr = &module.expressions[handle];
    let text = match &expr.kind {
        ExpressionKind::Literal(literal) => format_literal(*literal),
        ExpressionKind::Identifier { name, resolved } => match resolved {
            Some(Resolved::Local(h)) => {
                format!("{}@local{}", module.locals[*h].name.name, h.index())
            }
            Some(Resolved::Global(h)) => {
                format!("{}@global{}", module.global_variables[*h].name.name, h.index())
            }
            Some(Resolved::Constant(h)) => {
                format!("{}@const{}", module.constants[*h].name.name, h.index())
            }
            None => name.name.clone(),
        },
        ExpressionKind::Unary { op, operand } => {
            format!("{}({})", op.symbol(), format_expr(module, *operand))
        }
        ExpressionKind::Binary { op, left, right } => format!(
            "({} {} {})",
            format_expr(module, *left),
            op.symbol(),
            format_expr(module, *right)
        ),
        ExpressionKind::Call {
            target,
            arguments,
            callee,
        } => {
            let name = match (callee, target) {
                (Some(Callee::Function(h)), _) => module.functions[*h].name.name.clone(),
                (Some(Callee::Builtin(b)), _) => b.name().to_string(),
                (Some(Callee::Constructor(ty)), _) => format_type(module, *ty),
                (None, CallTarget::Named(ident)) => ident.name.clone(),
                (None, CallTarget::Type(ty)) => format_type_expr(module, ty),
            };
            let args: Vec<_> = arguments.iter().map(|a| format_expr(module, *a)).collect();
            format!("{name}({})", args.join(", "))
        }
        ExpressionKind::Index { base, index } => {
            format!("{}[{}]", format_expr(module, *base), format_expr(module, *index))
        }
        ExpressionKind::Member {
            base,
            member,
            access,
        } => match access {
            Some(MemberAccess::Field(i)) => {
                format!("{}.{}#{i}", format_expr(module, *base), member.name)
            }
            _ => format!("{}.{}", format_expr(module, *base), member.name),
        },
        ExpressionKind::BoundsCheck { index, limit } => match limit {
            BoundsLimit::Static(n) => format!("BoundsCheck({}, {n})", format_expr(module, *index)),
            BoundsLimit::RuntimeArray { array } => format!(
                "BoundsCheck({}, arrayLength({}))",
                format_expr(module, *index),
                format_expr(module, *array)
            ),
        },
    };
    match expr.constant_value() {
        Some(value) if !matches!(expr.kind, ExpressionKind::Literal(_)) => {
            format!("{text} {{= {value}}}")
        }
        _ => text,
    }
}

fn format_attributes(module: &ShaderModule, attributes: &[Attribute]) -> String {
    let mut out = String::new();
    for attribute in attributes {
        let args: Vec<String> = match &attribute.kind {
            AttributeKind::Builtin(b) => vec![b.name().to_string()],
            AttributeKind::Interpolate(ty, sampling) => {
                let mut args = vec![ty.name().to_string()];
                args.extend(sampling.map(|s| s.name().to_string()));
                args
            }
            kind => kind
                .expressions()
                .into_iter()
                .map(|e| format_expr(module, e))
                .collect(),
        };
        if args.is_empty() {
            let _ = write!(out, "@{} ", attribute.kind.name());
        } else {
            let _ = write!(out, "@{}({}) ", attribute.kind.name(), args.join(", "));
        }
    }
    out
}

fn type_suffix(module: &ShaderModule, ty: Option<Handle<Type>>) -> String {
    match ty {
        Some(ty) => format!(": {}", format_type(module, ty)),
        None => String::new(),
    }
}

fn write_block(out: &mut String, module: &ShaderModule, block: &[Statement], indent: usize) {
    for statement in block {
        write_statement(out, module, statement, indent);
    }
}

fn write_statement(out: &mut String, module: &ShaderModule, statement: &Statement, indent: usize) {
    let pad = " ".repeat(indent);
    let expr = |h| format_expr(module, h);
    match &statement.kind {
        StatementKind::Let { local, value, .. } => {
            let l = &module.locals[*local];
            let ty = type_suffix(module, l.ty);
            let _ = writeln!(out, "{pad}let {}{ty} = {}", l.name.name, expr(*value));
        }
        StatementKind::Var {
            local, initializer, ..
        } => {
            let l = &module.locals[*local];
            let init = initializer.map(|i| format!(" = {}", expr(i))).unwrap_or_default();
            let _ = writeln!(out, "{pad}var {}{}{init}", l.name.name, type_suffix(module, l.ty));
        }
        StatementKind::Const { local, value, .. } => {
            let l = &module.locals[*local];
            let ty = type_suffix(module, l.ty);
            let _ = writeln!(out, "{pad}const {}{ty} = {}", l.name.name, expr(*value));
        }
        StatementKind::Assign { target, op, value } => {
            let op = op.map(|op| op.symbol()).unwrap_or_default();
            let _ = writeln!(out, "{pad}{} {op}= {}", expr(*target), expr(*value));
        }
        StatementKind::Phony(e) => {
            let _ = writeln!(out, "{pad}_ = {}", expr(*e));
        }
        StatementKind::Increment(e) => {
            let _ = writeln!(out, "{pad}{}++", expr(*e));
        }
        StatementKind::Decrement(e) => {
            let _ = writeln!(out, "{pad}{}--", expr(*e));
        }
        StatementKind::Call(e) => {
            let _ = writeln!(out, "{pad}{}", expr(*e));
        }
        StatementKind::If {
            condition,
            accept,
            reject,
        } => {
            let _ = writeln!(out, "{pad}if {} {{", expr(*condition));
            write_block(out, module, accept, indent + 4);
            if !reject.is_empty() {
                let _ = writeln!(out, "{pad}}} else {{");
                write_block(out, module, reject, indent + 4);
            }
            let _ = writeln!(out, "{pad}}}");
        }
        StatementKind::Switch { selector, cases } => {
            let _ = writeln!(out, "{pad}switch {} {{", expr(*selector));
            for case in cases {
                let selectors: Vec<_> = case
                    .selectors
                    .iter()
                    .map(|s| match s {
                        CaseSelector::Expression(e) => expr(*e),
                        CaseSelector::Default => "default".to_string(),
                    })
                    .collect();
                let _ = writeln!(out, "{pad}    case {} {{", selectors.join(", "));
                write_block(out, module, &case.body, indent + 8);
                let _ = writeln!(out, "{pad}    }}");
            }
            let _ = writeln!(out, "{pad}}}");
        }
        StatementKind::Loop {
            body,
            continuing,
            break_if,
        } => {
            let _ = writeln!(out, "{pad}loop {{");
            write_block(out, module, body, indent + 4);
            if !continuing.is_empty() || break_if.is_some() {
                let _ = writeln!(out, "{pad}    continuing {{");
                write_block(out, module, continuing, indent + 8);
                if let Some(b) = break_if {
                    let _ = writeln!(out, "{pad}        break if {}", expr(*b));
                }
                let _ = writeln!(out, "{pad}    }}");
            }
            let _ = writeln!(out, "{pad}}}");
        }
        StatementKind::For {
            init,
            condition,
            update,
            body,
        } => {
            let _ = writeln!(out, "{pad}for {{");
            if let Some(init) = init {
                let _ = writeln!(out, "{pad}    init:");
                write_statement(out, module, init, indent + 8);
            }
            if let Some(condition) = condition {
                let _ = writeln!(out, "{pad}    condition: {}", expr(*condition));
            }
            if let Some(update) = update {
                let _ = writeln!(out, "{pad}    update:");
                write_statement(out, module, update, indent + 8);
            }
            write_block(out, module, body, indent + 4);
            let _ = writeln!(out, "{pad}}}");
        }
        StatementKind::While { condition, body } => {
            let _ = writeln!(out, "{pad}while {} {{", expr(*condition));
            write_block(out, module, body, indent + 4);
            let _ = writeln!(out, "{pad}}}");
        }
        StatementKind::Block(body) => {
            let _ = writeln!(out, "{pad}{{");
            write_block(out, module, body, indent + 4);
            let _ = writeln!(out, "{pad}}}");
        }
        StatementKind::Break => {
            let _ = writeln!(out, "{pad}break");
        }
        StatementKind::Continue => {
            let _ = writeln!(out, "{pad}continue");
        }
        StatementKind::Return(value) => match value {
            Some(v) => {
                let _ = writeln!(out, "{pad}return {}", expr(*v));
            }
            None => {
                let _ = writeln!(out, "{pad}return");
            }
        },
        StatementKind::Discard => {
            let _ = writeln!(out, "{pad}discard");
        }
    }
}

fn write_function(out: &mut String, module: &ShaderModule, handle: Handle<Function>) {
    let function = &module.functions[handle];
    let params: Vec<_> = function
        .parameters
        .iter()
        .map(|p| {
            let local = &module.locals[p.local];
            format!(
                "{}{}{}",
                format_attributes(module, &p.attributes),
                local.name.name,
                type_suffix(module, local.ty)
            )
        })
        .collect();
    let result = match &function.result {
        Some(r) => format!(
            " -> {}{}",
            format_attributes(module, &r.attributes),
            r.resolved
                .map(|t| format_type(module, t))
                .unwrap_or_else(|| format_type_expr(module, &r.ty))
        ),
        None => String::new(),
    };
    let _ = writeln!(
        out,
        "  [function{}] {}fn {}({}){result} {{",
        handle.index(),
        format_attributes(module, &function.attributes),
        function.name.name,
        params.join(", ")
    );
    write_block(out, module, &function.body, 4);
    let _ = writeln!(out, "  }}");
}

/// The dump of a single function, as [`dump_module`] prints it.
pub fn dump_function(module: &ShaderModule, handle: Handle<Function>) -> String {
    let mut out = String::new();
    write_function(&mut out, module, handle);
    out
}

/// Produces a human-readable text dump of a [`ShaderModule`].
pub fn dump_module(module: &ShaderModule) -> String {
    let mut out = String::new();

    if !module.enables.is_empty() {
        let names: Vec<_> = module.enables.iter().map(|e| e.name.as_str()).collect();
        let _ = writeln!(out, "Enables: {}", names.join(", "));
    }

    out.push_str("Declarations:\n");
    for &declaration in &module.declarations {
        match declaration {
            Declaration::Constant(h) => {
                let c = &module.constants[h];
                let keyword = if c.is_override { "override" } else { "const" };
                let init = c
                    .initializer
                    .map(|i| format!(" = {}", format_expr(module, i)))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "  [const{}] {}{keyword} {}{}{init}",
                    h.index(),
                    format_attributes(module, &c.attributes),
                    c.name.name,
                    type_suffix(module, c.resolved_ty)
                );
            }
            Declaration::Variable(h) => {
                let v = &module.global_variables[h];
                let init = v
                    .initializer
                    .map(|i| format!(" = {}", format_expr(module, i)))
                    .unwrap_or_default();
                let ty = match (v.resolved_ty, &v.ty) {
                    (Some(t), _) => format!(": {}", format_type(module, t)),
                    (None, Some(t)) => format!(": {}", format_type_expr(module, t)),
                    (None, None) => String::new(),
                };
                let _ = writeln!(
                    out,
                    "  [global{}] {}var<{}, {}> {}{ty}{init}",
                    h.index(),
                    format_attributes(module, &v.attributes),
                    v.space.name(),
                    v.access.name(),
                    v.name.name
                );
            }
            Declaration::Struct(h) => {
                let s = &module.structs[h];
                let _ = writeln!(out, "  [struct{}] struct {} {{", h.index(), s.name.name);
                for member in &s.members {
                    let ty = member
                        .resolved_ty
                        .map(|t| format_type(module, t))
                        .unwrap_or_else(|| format_type_expr(module, &member.ty));
                    let _ = writeln!(
                        out,
                        "    {}{}: {ty}",
                        format_attributes(module, &member.attributes),
                        member.name.name
                    );
                }
                if let Some(layout) = &s.layout {
                    let _ = writeln!(out, "    // size {}, align {}", layout.size, layout.align);
                }
                let _ = writeln!(out, "  }}");
            }
            Declaration::Alias(h) => {
                let a = &module.aliases[h];
                let ty = a
                    .resolved_ty
                    .map(|t| format_type(module, t))
                    .unwrap_or_else(|| format_type_expr(module, &a.ty));
                let _ = writeln!(out, "  [alias{}] alias {} = {ty}", h.index(), a.name.name);
            }
            Declaration::Function(h) => write_function(&mut out, module, h),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Configuration;
    use crate::decl::{Constant, Ident};
    use crate::span::Span;
    use crate::types::{Scalar, VectorSize};

    #[test]
    fn formats_nested_types() {
        let mut module = ShaderModule::new("", Configuration::default());
        let v = module.insert_type(Type::Vector {
            size: VectorSize::Quad,
            scalar: Scalar::F32,
        });
        let arr = module.insert_type(Type::Array {
            base: v,
            size: ArraySize::Runtime,
        });
        let ptr = module.insert_type(Type::Pointer {
            space: AddressSpace::Storage,
            base: arr,
            access: AccessMode::ReadWrite,
        });
        assert_eq!(format_type(&module, arr), "array<vec4<f32>>");
        assert_eq!(format_type(&module, ptr), "ptr<storage, array<vec4<f32>>, read_write>");
    }

    #[test]
    fn dump_lists_declarations() {
        let mut module = ShaderModule::new("const n = 4;", Configuration::default());
        let init = module.expressions.append(Expression::new(
            ExpressionKind::Literal(Literal::AbstractInt(4)),
            Span::new(10, 11),
        ));
        let c = module.constants.append(Constant {
            name: Ident::new("n", Span::new(6, 7)),
            is_override: false,
            ty: None,
            initializer: Some(init),
            attributes: Vec::new(),
            span: Span::new(0, 12),
            resolved_ty: None,
            override_id: None,
        });
        module.declarations.push(Declaration::Constant(c));
        let dump = dump_module(&module);
        assert!(dump.starts_with("Declarations:\n"));
        assert!(dump.contains("[const0] const n = 4"), "{dump}");
    }
}
