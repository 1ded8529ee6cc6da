//! Late constant evaluation for override-dependent expressions.

use weft_ast::{ConstantMap, ConstantValue, Expression, ExpressionKind, Handle, ShaderModule};

/// The value of `expression`, looking its name up in `constants` the first
/// time.
///
/// A value cached by the type checker or by an earlier call is returned as
/// is. Otherwise the expression must be an identifier whose value the caller
/// has put into `constants`; the value is cached on the node.
///
/// # Panics
///
/// When the expression is neither cached nor an identifier, or when the
/// identifier has no value in `constants`.
pub fn evaluate<'m>(
    module: &'m ShaderModule,
    expression: Handle<Expression>,
    constants: &ConstantMap,
) -> &'m ConstantValue {
    let node = &module.expressions[expression];
    if let Some(value) = node.constant_value() {
        return value;
    }
    let ExpressionKind::Identifier { name, .. } = &node.kind else {
        panic!(
            "expression at {:?} has no constant value and is not an identifier",
            node.span
        );
    };
    let value = constants
        .get(&name.name)
        .unwrap_or_else(|| panic!("no value supplied for '{}'", name.name));
    node.cache_constant(value.clone())
}
