//! Bounds-check insertion.

use weft_ast::{
    ArraySize, BoundsCheckMode, BoundsLimit, Expression, ExpressionKind, Scalar, ShaderModule,
    Type,
};

use crate::call_graph::{CallGraph, body_expressions};

/// Wraps each dynamic index of reachable code in a `BoundsCheck` node and
/// returns how many were inserted. Constant indices into fixed-size types
/// are in range by construction and are left alone.
pub fn insert_bounds_checks(module: &mut ShaderModule, graph: &CallGraph) -> usize {
    if module.configuration().bounds_check == BoundsCheckMode::Robustness {
        log::debug!("insert bounds checks: skipped, robust buffer access");
        return 0;
    }
    let u32_ty = module.scalar_type(Scalar::U32);
    let mut inserted = 0;
    for f in graph.functions() {
        for e in body_expressions(module, &module.functions[f].body) {
            let ExpressionKind::Index { base, index } = module.expressions[e].kind else {
                continue;
            };
            let base_ty = module.expressions[base]
                .ty
                .map(|ty| module.load_type(ty))
                .expect("checked index bases are typed");
            let static_limit = match module.types[base_ty] {
                Type::Array {
                    size: ArraySize::Constant(n),
                    ..
                } => Some(n),
                Type::Vector { size, .. } => Some(size.count()),
                Type::Matrix { columns, .. } => Some(columns.count()),
                Type::Array {
                    size: ArraySize::Runtime,
                    ..
                } => None,
                ref other => unreachable!("indexing into {other:?}"),
            };
            let limit = match static_limit {
                Some(_) if module.expressions[index].is_constant() => continue,
                Some(n) => BoundsLimit::Static(n),
                None => BoundsLimit::RuntimeArray {
                    array: module.clone_expression(base),
                },
            };
            let span = module.expressions[index].span;
            let mut check = Expression::new(ExpressionKind::BoundsCheck { index, limit }, span);
            check.ty = Some(u32_ty);
            let check = module.expressions.append(check);
            module.expressions[e].kind = ExpressionKind::Index { base, index: check };
            inserted += 1;
        }
    }
    log::debug!("insert bounds checks: {inserted} inserted");
    inserted
}
