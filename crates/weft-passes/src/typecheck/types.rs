//! Resolving written types, plus structural queries on resolved ones.

use weft_ast::{
    AccessMode, AddressSpace, ArraySize, Handle, Scalar, ScalarKind, Span, TextureDimension,
    Type, TypeExpr, TypeExprKind, VectorSize, layout,
};

use super::{Abort, Check, Checker, Global, fail};

/// Types spelled by a single predeclared name, such as `f32` or `vec3f`.
pub(super) fn predeclared(name: &str) -> Option<Type> {
    let scalar = |suffix: &str| match suffix {
        "i" => Some(Scalar::I32),
        "u" => Some(Scalar::U32),
        "f" => Some(Scalar::F32),
        "h" => Some(Scalar::F16),
        _ => None,
    };
    Some(match name {
        "bool" => Type::Scalar(Scalar::BOOL),
        "i32" => Type::Scalar(Scalar::I32),
        "u32" => Type::Scalar(Scalar::U32),
        "f32" => Type::Scalar(Scalar::F32),
        "f16" => Type::Scalar(Scalar::F16),
        "sampler" => Type::Sampler { comparison: false },
        "sampler_comparison" => Type::Sampler { comparison: true },
        _ => {
            if let Some(rest) = name.strip_prefix("vec") {
                let (n, suffix) = rest.split_at_checked(1)?;
                return Some(Type::Vector {
                    size: VectorSize::from_u32(n.parse().ok()?)?,
                    scalar: scalar(suffix)?,
                });
            }
            let (columns, rows) = matrix_shape(name.get(..6)?)?;
            let scalar = scalar(&name[6..])?;
            if !scalar.is_float() {
                return None;
            }
            Type::Matrix {
                columns,
                rows,
                scalar,
            }
        }
    })
}

/// Columns and rows of a `matCxR` name.
pub(super) fn matrix_shape(name: &str) -> Option<(VectorSize, VectorSize)> {
    let rest = name.strip_prefix("mat")?;
    let bytes = rest.as_bytes();
    if bytes.len() != 3 || bytes[1] != b'x' {
        return None;
    }
    let digit = |b: u8| VectorSize::from_u32(u32::from(b.checked_sub(b'0')?));
    Some((digit(bytes[0])?, digit(bytes[2])?))
}

impl Checker<'_> {
    pub(super) fn resolve_type(&mut self, ty: &TypeExpr) -> Check<Handle<Type>> {
        let resolved = match &ty.kind {
            TypeExprKind::Named(ident) => {
                if let Some(global) = self.globals.get(&ident.name) {
                    return match *global {
                        Global::Type(ty) => Ok(ty),
                        _ => fail(format!("'{}' is not a type", ident.name), ident.span),
                    };
                }
                if self.failed.contains(&ident.name) {
                    return Err(Abort(None));
                }
                match predeclared(&ident.name) {
                    Some(ty) => ty,
                    None => return fail(format!("unresolved type '{}'", ident.name), ident.span),
                }
            }
            TypeExprKind::Vector { size, element } => {
                let scalar = self.element_scalar(element)?;
                Type::Vector {
                    size: *size,
                    scalar,
                }
            }
            TypeExprKind::Matrix {
                columns,
                rows,
                element,
            } => {
                let scalar = self.element_scalar(element)?;
                if !scalar.is_float() {
                    return fail("matrix elements must be floating point", element.span);
                }
                Type::Matrix {
                    columns: *columns,
                    rows: *rows,
                    scalar,
                }
            }
            TypeExprKind::Array { element, count } => {
                let base = self.resolve_type(element)?;
                if self.module.types[base].is_memory_view()
                    || self.module.types[base].is_handle()
                    || self.is_runtime_sized(base)
                {
                    return fail(
                        format!("'{}' cannot be an array element", self.module.type_name(base)),
                        element.span,
                    );
                }
                let size = match *count {
                    None => ArraySize::Runtime,
                    Some(count) => {
                        let count_ty = self.value(count)?;
                        if !matches!(self.module.types[count_ty], Type::Scalar(s) if s.is_integer())
                        {
                            return fail("array count must be an integer", self.span(count));
                        }
                        self.concretize(count)?;
                        let value = self.module.expressions[count]
                            .constant_value()
                            .and_then(|v| v.as_i64());
                        match value {
                            Some(n) if n > 0 => match u32::try_from(n) {
                                Ok(n) => ArraySize::Constant(n),
                                Err(_) => return fail("array count is too large", self.span(count)),
                            },
                            Some(_) => return fail("array count must be positive", self.span(count)),
                            None => {
                                return fail(
                                    "array count must be a const-expression",
                                    self.span(count),
                                );
                            }
                        }
                    }
                };
                if let ArraySize::Constant(n) = size {
                    let too_large = layout::array_stride(self.module, base)
                        .is_some_and(|stride| stride.checked_mul(n).is_none());
                    if too_large {
                        return fail("array type is larger than 2^32 bytes", ty.span);
                    }
                }
                Type::Array { base, size }
            }
            TypeExprKind::Atomic(element) => {
                let scalar = self.element_scalar(element)?;
                if !matches!(scalar.kind, ScalarKind::Sint | ScalarKind::Uint) {
                    return fail("atomics must hold i32 or u32", element.span);
                }
                Type::Atomic(scalar)
            }
            TypeExprKind::Pointer {
                space,
                element,
                access,
            } => {
                let space_value = match AddressSpace::from_name(&space.name) {
                    Some(s) => s,
                    None => return fail(format!("unknown address space '{}'", space.name), space.span),
                };
                let access = match access {
                    None => space_value.default_access(),
                    Some(_) if !space_value.has_access_mode() => {
                        return fail(
                            format!("pointers into {} cannot specify an access mode", space_value.name()),
                            ty.span,
                        );
                    }
                    Some(ident) => match AccessMode::from_name(&ident.name) {
                        Some(mode) => mode,
                        None => {
                            return fail(format!("unknown access mode '{}'", ident.name), ident.span);
                        }
                    },
                };
                let base = self.resolve_type(element)?;
                if self.module.types[base].is_memory_view() {
                    return fail("pointers cannot point to pointers", element.span);
                }
                Type::Pointer {
                    space: space_value,
                    base,
                    access,
                }
            }
            TypeExprKind::Texture { dimension, sample } => {
                let scalar = self.element_scalar(sample)?;
                if !matches!(scalar, Scalar::F32 | Scalar::I32 | Scalar::U32) {
                    return fail("textures sample f32, i32 or u32", sample.span);
                }
                Type::Texture {
                    dimension: *dimension,
                    sample: scalar,
                }
            }
        };
        if resolved.scalar() == Some(Scalar::F16) {
            self.use_f16(ty.span)?;
        }
        Ok(self.module.insert_type(resolved))
    }

    fn element_scalar(&mut self, element: &TypeExpr) -> Check<Scalar> {
        let ty = self.resolve_type(element)?;
        match self.module.types[ty] {
            Type::Scalar(s) => Ok(s),
            _ => fail(
                format!("expected a scalar type, found '{}'", self.module.type_name(ty)),
                element.span,
            ),
        }
    }

    pub(super) fn use_f16(&mut self, span: Span) -> Check<()> {
        if !self.f16_enabled {
            return fail("f16 requires 'enable f16;'", span);
        }
        self.f16_used = true;
        Ok(())
    }

    /// The scalar at the leaves of `ty`, looking through arrays.
    pub(super) fn leaf_scalar(&self, ty: Handle<Type>) -> Option<Scalar> {
        match self.module.types[ty] {
            Type::Array { base, .. } => self.leaf_scalar(base),
            ref other => other.scalar(),
        }
    }

    /// `ty` with its leaf scalar replaced.
    pub(super) fn with_scalar(&mut self, ty: Handle<Type>, scalar: Scalar) -> Handle<Type> {
        let replaced = match self.module.types[ty] {
            Type::Scalar(_) => Type::Scalar(scalar),
            Type::Vector { size, .. } => Type::Vector { size, scalar },
            Type::Matrix { columns, rows, .. } => Type::Matrix {
                columns,
                rows,
                scalar,
            },
            Type::Array { base, size } => Type::Array {
                base: self.with_scalar(base, scalar),
                size,
            },
            _ => return ty,
        };
        self.module.insert_type(replaced)
    }

    /// Whether a value of type `from` converts to `to` without an explicit
    /// conversion.
    pub(super) fn converts(&self, from: Handle<Type>, to: Handle<Type>) -> bool {
        if from == to {
            return true;
        }
        match (&self.module.types[from], &self.module.types[to]) {
            (Type::Scalar(a), Type::Scalar(b)) => a.automatically_converts_to(*b),
            (
                Type::Vector { size: n, scalar: a },
                Type::Vector { size: m, scalar: b },
            ) => n == m && a.automatically_converts_to(*b),
            (
                Type::Array { base: a, size: n },
                Type::Array { base: b, size: m },
            ) => n == m && self.converts(*a, *b),
            _ => false,
        }
    }

    pub(super) fn is_abstract(&self, ty: Handle<Type>) -> bool {
        self.leaf_scalar(ty).is_some_and(|s| s.is_abstract())
    }

    pub(super) fn is_runtime_sized(&self, ty: Handle<Type>) -> bool {
        match self.module.types[ty] {
            Type::Array {
                size: ArraySize::Runtime,
                ..
            } => true,
            Type::Struct(h) => self.module.structs[h]
                .members
                .last()
                .and_then(|m| m.resolved_ty)
                .is_some_and(|t| self.is_runtime_sized(t)),
            _ => false,
        }
    }

    pub(super) fn contains_atomic(&self, ty: Handle<Type>) -> bool {
        match self.module.types[ty] {
            Type::Atomic(_) => true,
            Type::Array { base, .. } => self.contains_atomic(base),
            Type::Struct(h) => self.module.structs[h]
                .members
                .iter()
                .filter_map(|m| m.resolved_ty)
                .any(|t| self.contains_atomic(t)),
            _ => false,
        }
    }

    /// Types a `var` or a value can hold: no pointers, handles or atomics
    /// directly, and fixed-size.
    pub(super) fn is_constructible(&self, ty: Handle<Type>) -> bool {
        match self.module.types[ty] {
            Type::Scalar(_) | Type::Vector { .. } | Type::Matrix { .. } => true,
            Type::Array {
                base,
                size: ArraySize::Constant(_),
            } => self.is_constructible(base),
            Type::Struct(h) => self.module.structs[h]
                .members
                .iter()
                .filter_map(|m| m.resolved_ty)
                .all(|t| self.is_constructible(t)),
            _ => false,
        }
    }

    pub(super) fn dimension_coordinates(&mut self, dimension: TextureDimension, scalar: Scalar) -> Handle<Type> {
        match VectorSize::from_u32(dimension.coordinates()) {
            Some(size) => self.module.insert_type(Type::Vector { size, scalar }),
            None => self.module.scalar_type(scalar),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{check, first_error};
    use super::*;

    #[test]
    fn predeclared_shorthands() {
        assert_eq!(
            predeclared("vec3f"),
            Some(Type::Vector {
                size: VectorSize::Tri,
                scalar: Scalar::F32
            })
        );
        assert_eq!(
            predeclared("mat4x3h"),
            Some(Type::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Tri,
                scalar: Scalar::F16
            })
        );
        assert_eq!(predeclared("mat2x2i"), None);
        assert_eq!(predeclared("vec5f"), None);
        assert_eq!(predeclared("vec3"), None);
        assert_eq!(matrix_shape("mat2x4"), Some((VectorSize::Bi, VectorSize::Quad)));
    }

    #[test]
    fn aliases_and_structs_resolve() {
        let (module, _) = check(
            "struct P { x: f32 }
             alias Ps = array<P, 2>;
             var<private> ps: Ps;",
        )
        .unwrap();
        let (_, v) = module.global_variables.iter().next().unwrap();
        assert_eq!(module.type_name(v.resolved_ty.unwrap()), "array<P, 2>");
    }

    #[test]
    fn type_errors() {
        assert_eq!(first_error("var<private> x: Nope;"), "unresolved type 'Nope'");
        assert_eq!(first_error("const c = 1; var<private> x: c;"), "'c' is not a type");
        assert_eq!(first_error("var<private> x: array<f32, 0>;"), "array count must be positive");
        assert_eq!(first_error("var<private> x: atomic<f32>;"), "atomics must hold i32 or u32");
        assert_eq!(
            first_error("var<private> x: mat2x2<i32>;"),
            "matrix elements must be floating point"
        );
        assert_eq!(
            first_error("fn f(p: ptr<function, i32, read>) {}"),
            "pointers into function cannot specify an access mode"
        );
    }

    #[test]
    fn array_count_from_const() {
        let (module, _) = check("const N = 2u * 2u; var<private> x: array<i32, N>;").unwrap();
        let (_, v) = module.global_variables.iter().next().unwrap();
        assert_eq!(module.type_name(v.resolved_ty.unwrap()), "array<i32, 4>");
    }
}
