use weft_ast::{Span, TextureDimension, TypeExpr, TypeExprKind, VectorSize};

use super::{PResult, Parser};
use crate::SyntaxError;
use crate::lexer::TokenKind;

/// Names that take a template list, so that `name<` starts a type rather
/// than a comparison.
pub(super) fn is_type_generator(name: &str) -> bool {
    matches!(name, "vec2" | "vec3" | "vec4" | "array" | "atomic" | "ptr")
        || matrix_shape(name).is_some()
        || TextureDimension::from_type_name(name).is_some()
}

/// `matCxR` as `(columns, rows)`.
fn matrix_shape(name: &str) -> Option<(VectorSize, VectorSize)> {
    let shape = name.strip_prefix("mat")?.as_bytes();
    let [c, b'x', r] = *shape else {
        return None;
    };
    let digit = |b: u8| VectorSize::from_u32(u32::from(b.checked_sub(b'0')?));
    Some((digit(c)?, digit(r)?))
}

impl Parser<'_> {
    pub(super) fn type_expr(&mut self) -> PResult<TypeExpr> {
        let name = self.expect_ident("a type")?;
        let start = name.span;
        if !is_type_generator(&name.name) {
            return Ok(TypeExpr {
                span: start,
                kind: TypeExprKind::Named(name),
            });
        }
        if !self.at(&TokenKind::Less) {
            return Err(SyntaxError::new(
                format!("'{}' requires a template list", name.name),
                start,
            ));
        }
        self.advance();
        self.template_depth += 1;
        let kind = self.type_generator(&name.name, start)?;
        self.template_depth -= 1;
        self.close_template()?;
        Ok(TypeExpr {
            kind,
            span: start.until(self.previous_span()),
        })
    }

    /// The template arguments of a type generator, after the opening `<`.
    fn type_generator(&mut self, name: &str, start: Span) -> PResult<TypeExprKind> {
        if let Some(size) = name
            .strip_prefix("vec")
            .and_then(|n| n.parse().ok())
            .and_then(VectorSize::from_u32)
        {
            let element = Box::new(self.type_expr()?);
            return Ok(TypeExprKind::Vector { size, element });
        }
        if let Some((columns, rows)) = matrix_shape(name) {
            let element = Box::new(self.type_expr()?);
            return Ok(TypeExprKind::Matrix {
                columns,
                rows,
                element,
            });
        }
        if let Some(dimension) = TextureDimension::from_type_name(name) {
            let sample = Box::new(self.type_expr()?);
            return Ok(TypeExprKind::Texture { dimension, sample });
        }
        match name {
            "array" => {
                let element = Box::new(self.type_expr()?);
                let count = if self.eat(&TokenKind::Comma) && !self.at(&TokenKind::Greater) {
                    Some(self.expression()?)
                } else {
                    None
                };
                Ok(TypeExprKind::Array { element, count })
            }
            "atomic" => Ok(TypeExprKind::Atomic(Box::new(self.type_expr()?))),
            "ptr" => {
                let space = self.expect_ident("an address space")?;
                self.expect(&TokenKind::Comma, "',' after the address space")?;
                let element = Box::new(self.type_expr()?);
                let access = if self.eat(&TokenKind::Comma) {
                    Some(self.expect_ident("an access mode")?)
                } else {
                    None
                };
                Ok(TypeExprKind::Pointer {
                    space,
                    element,
                    access,
                })
            }
            _ => Err(SyntaxError::new(format!("unknown type generator '{name}'"), start)),
        }
    }
}

#[cfg(test)]
mod tests {
    use weft_ast::{Configuration, Declaration};

    use super::*;

    fn alias_type(source: &str) -> TypeExprKind {
        let module = crate::parse(source, Configuration::default()).unwrap();
        let Declaration::Alias(alias) = module.declarations[0] else {
            panic!("expected an alias");
        };
        module.aliases[alias].ty.kind.clone()
    }

    #[test]
    fn generator_names() {
        assert!(is_type_generator("vec3"));
        assert!(is_type_generator("mat4x2"));
        assert!(is_type_generator("texture_2d_array"));
        assert!(!is_type_generator("vec3f"));
        assert!(!is_type_generator("mat5x2"));
        assert!(!is_type_generator("matrix"));
    }

    #[test]
    fn nested_templates_split_shift() {
        let TypeExprKind::Array { element, count } = alias_type("alias A = array<vec4<f32>>;")
        else {
            panic!("expected an array");
        };
        assert!(count.is_none());
        assert!(matches!(element.kind, TypeExprKind::Vector { size: VectorSize::Quad, .. }));
    }

    #[test]
    fn matrix_shape_is_columns_by_rows() {
        let TypeExprKind::Matrix { columns, rows, .. } = alias_type("alias M = mat2x3<f32>;")
        else {
            panic!("expected a matrix");
        };
        assert_eq!((columns, rows), (VectorSize::Bi, VectorSize::Tri));
    }

    #[test]
    fn pointer_with_access() {
        let TypeExprKind::Pointer { space, access, .. } =
            alias_type("alias P = ptr<storage, array<u32, 4>, read_write>;")
        else {
            panic!("expected a pointer");
        };
        assert_eq!(space.name, "storage");
        assert_eq!(access.unwrap().name, "read_write");
    }

    #[test]
    fn generator_without_template_is_an_error() {
        let err = crate::parse("alias V = vec3;", Configuration::default()).unwrap_err();
        assert!(err.message.contains("requires a template list"));
    }
}
