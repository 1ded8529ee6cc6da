//! Value constructors: `T(...)` for a concrete type and the inferred forms
//! `vec3(...)`, `mat2x2(...)` and `array(...)`.

use weft_ast::{ArraySize, Callee, ConstantValue, Expression, Handle, Scalar, Type, VectorSize};

use super::types::matrix_shape;
use super::{Check, Checker, const_error, fail};

impl Checker<'_> {
    pub(super) fn construct(
        &mut self,
        h: Handle<Expression>,
        ty: Handle<Type>,
        arguments: &[Handle<Expression>],
    ) -> Check<Handle<Type>> {
        let span = self.span(h);
        if !self.is_constructible(ty) {
            return fail(
                format!("type '{}' is not constructible", self.module.type_name(ty)),
                span,
            );
        }
        self.set_callee(h, Callee::Constructor(ty));
        if arguments.is_empty() {
            if let Some(zero) = self.zero_value(ty) {
                self.module.expressions[h].cache_constant(zero);
            }
            return Ok(ty);
        }
        for &argument in arguments {
            self.value(argument)?;
        }

        let value = match self.module.types[ty].clone() {
            Type::Scalar(scalar) => {
                self.arity(ty, arguments, &[1])?;
                let argument = arguments[0];
                let from = self.value(argument)?;
                if !self.module.types[from].is_scalar() {
                    return self.no_conversion(from, ty, argument);
                }
                match self.constants(arguments) {
                    Some(values) => Some(self.converted(&values[0], scalar, h)?),
                    None => None,
                }
            }
            Type::Vector { size, scalar } => self.vector(h, ty, size, scalar, arguments)?,
            Type::Matrix {
                columns,
                rows,
                scalar,
            } => self.matrix(h, ty, (columns, rows), scalar, arguments)?,
            Type::Array {
                base,
                size: ArraySize::Constant(n),
            } => {
                self.arity(ty, arguments, &[n as usize])?;
                for &argument in arguments {
                    self.convert(argument, base)?;
                }
                self.constants(arguments).map(ConstantValue::Array)
            }
            Type::Struct(s) => {
                let members: Vec<Handle<Type>> = self.module.structs[s]
                    .members
                    .iter()
                    .map(|m| m.resolved_ty.expect("members of checked structs are typed"))
                    .collect();
                self.arity(ty, arguments, &[members.len()])?;
                for (&argument, &member) in arguments.iter().zip(&members) {
                    self.convert(argument, member)?;
                }
                None
            }
            _ => unreachable!("constructible types are checked above"),
        };
        if let Some(value) = value {
            self.module.expressions[h].cache_constant(value);
        }
        Ok(ty)
    }

    fn vector(
        &mut self,
        h: Handle<Expression>,
        ty: Handle<Type>,
        size: VectorSize,
        scalar: Scalar,
        arguments: &[Handle<Expression>],
    ) -> Check<Option<ConstantValue>> {
        let scalar_ty = self.module.scalar_type(scalar);
        if let [argument] = *arguments {
            let from = self.value(argument)?;
            match self.module.types[from] {
                // Splat.
                Type::Scalar(_) => {
                    self.convert(argument, scalar_ty)?;
                    let value = self.constants(arguments).map(|mut values| {
                        ConstantValue::Vector(vec![values.remove(0); size.count() as usize])
                    });
                    return Ok(value);
                }
                // Conversion between vectors of the same size.
                Type::Vector { size: n, .. } if n == size => {
                    return match self.constants(arguments) {
                        Some(values) => Ok(Some(self.converted(&values[0], scalar, h)?)),
                        None => Ok(None),
                    };
                }
                _ => return self.no_conversion(from, ty, argument),
            }
        }

        let mut count = 0;
        for &argument in arguments {
            let from = self.value(argument)?;
            match self.module.types[from] {
                Type::Scalar(_) => {
                    self.convert(argument, scalar_ty)?;
                    count += 1;
                }
                Type::Vector { size: n, .. } => {
                    let target = self.module.insert_type(Type::Vector { size: n, scalar });
                    self.convert(argument, target)?;
                    count += n.count();
                }
                _ => return self.no_conversion(from, ty, argument),
            }
        }
        if count != size.count() {
            return fail(
                format!(
                    "'{}' needs {} components, found {count}",
                    self.module.type_name(ty),
                    size.count()
                ),
                self.span(h),
            );
        }
        Ok(self.constants(arguments).map(|values| {
            let mut flat = Vec::with_capacity(size.count() as usize);
            for value in values {
                match value {
                    ConstantValue::Vector(components) => flat.extend(components),
                    scalar => flat.push(scalar),
                }
            }
            ConstantValue::Vector(flat)
        }))
    }

    fn matrix(
        &mut self,
        h: Handle<Expression>,
        ty: Handle<Type>,
        (columns, rows): (VectorSize, VectorSize),
        scalar: Scalar,
        arguments: &[Handle<Expression>],
    ) -> Check<Option<ConstantValue>> {
        let column_ty = self.module.insert_type(Type::Vector { size: rows, scalar });
        let scalar_ty = self.module.scalar_type(scalar);
        let (c, r) = (columns.count() as usize, rows.count() as usize);

        if let [argument] = *arguments {
            let from = self.value(argument)?;
            let same_shape = matches!(
                self.module.types[from],
                Type::Matrix { columns: fc, rows: fr, .. } if fc == columns && fr == rows
            );
            if !same_shape {
                return self.no_conversion(from, ty, argument);
            }
            return match self.constants(arguments) {
                Some(values) => Ok(Some(self.converted(&values[0], scalar, h)?)),
                None => Ok(None),
            };
        }

        self.arity(ty, arguments, &[c, c * r])?;
        if arguments.len() == c {
            for &argument in arguments {
                self.convert(argument, column_ty)?;
            }
            return Ok(self.constants(arguments).map(ConstantValue::Array));
        }
        for &argument in arguments {
            self.convert(argument, scalar_ty)?;
        }
        Ok(self.constants(arguments).map(|values| {
            ConstantValue::Array(
                values
                    .chunks(r)
                    .map(|column| ConstantValue::Vector(column.to_vec()))
                    .collect(),
            )
        }))
    }

    /// Constructors spelled without their element type, which comes from
    /// the arguments.
    pub(super) fn construct_inferred(
        &mut self,
        h: Handle<Expression>,
        name: &str,
        arguments: &[Handle<Expression>],
    ) -> Check<Handle<Type>> {
        let span = self.span(h);
        let mut types = Vec::with_capacity(arguments.len());
        for &argument in arguments {
            types.push(self.value(argument)?);
        }
        if arguments.is_empty() && name != "vec2" && name != "vec3" && name != "vec4" {
            return fail(format!("cannot infer the element type of '{name}'"), span);
        }

        let ty = if name == "array" {
            let mut element = types[0];
            for &ty in &types[1..] {
                if self.converts(element, ty) {
                    element = ty;
                } else if !self.converts(ty, element) {
                    return fail(
                        format!(
                            "array elements must have one type, found '{}' and '{}'",
                            self.module.type_name(element),
                            self.module.type_name(ty)
                        ),
                        span,
                    );
                }
            }
            Type::Array {
                base: element,
                size: ArraySize::Constant(arguments.len() as u32),
            }
        } else if let Some((columns, rows)) = matrix_shape(name) {
            let scalar = match self.common_scalar(&types, name, h)? {
                s if s.is_abstract() => Scalar::F32,
                s => s,
            };
            Type::Matrix {
                columns,
                rows,
                scalar,
            }
        } else {
            let size = match name {
                "vec2" => VectorSize::Bi,
                "vec3" => VectorSize::Tri,
                _ => VectorSize::Quad,
            };
            let scalar = if arguments.is_empty() {
                Scalar::ABSTRACT_INT
            } else {
                self.common_scalar(&types, name, h)?
            };
            Type::Vector { size, scalar }
        };
        let ty = self.module.insert_type(ty);
        self.construct(h, ty, arguments)
    }

    fn common_scalar(&self, types: &[Handle<Type>], name: &str, h: Handle<Expression>) -> Check<Scalar> {
        let mut common: Option<Scalar> = None;
        for &ty in types {
            let Some(scalar) = self.module.types[ty].scalar() else {
                return fail(
                    format!("'{}' cannot be used to construct '{name}'", self.module.type_name(ty)),
                    self.span(h),
                );
            };
            common = Some(match common {
                None => scalar,
                Some(c) if c == scalar || scalar.automatically_converts_to(c) => c,
                Some(c) if c.automatically_converts_to(scalar) => scalar,
                Some(c) => {
                    return fail(
                        format!(
                            "mismatched element types '{}' and '{}' in '{name}'",
                            c.name(),
                            scalar.name()
                        ),
                        self.span(h),
                    );
                }
            });
        }
        Ok(common.unwrap_or(Scalar::ABSTRACT_INT))
    }

    fn arity(&self, ty: Handle<Type>, arguments: &[Handle<Expression>], expected: &[usize]) -> Check<()> {
        if expected.contains(&arguments.len()) {
            return Ok(());
        }
        let expected: Vec<String> = expected.iter().map(ToString::to_string).collect();
        fail(
            format!(
                "'{}' expects {} argument(s), found {}",
                self.module.type_name(ty),
                expected.join(" or "),
                arguments.len()
            ),
            arguments
                .first()
                .map_or(weft_ast::Span::UNDEFINED, |&a| self.span(a)),
        )
    }

    fn no_conversion<T>(&self, from: Handle<Type>, to: Handle<Type>, argument: Handle<Expression>) -> Check<T> {
        fail(
            format!(
                "cannot convert '{}' to '{}'",
                self.module.type_name(from),
                self.module.type_name(to)
            ),
            self.span(argument),
        )
    }

    /// The values of all arguments, when every one is constant.
    fn constants(&self, arguments: &[Handle<Expression>]) -> Option<Vec<ConstantValue>> {
        arguments
            .iter()
            .map(|&a| self.module.expressions[a].constant_value().cloned())
            .collect()
    }

    fn converted(&self, value: &ConstantValue, scalar: Scalar, h: Handle<Expression>) -> Check<ConstantValue> {
        match value.convert(scalar) {
            Ok(converted) => Ok(converted),
            Err(error) => {
                const_error(error, self.span(h))?;
                Ok(value.clone())
            }
        }
    }

    /// The zero value of a constructible type, if it has one.
    pub(super) fn zero_value(&self, ty: Handle<Type>) -> Option<ConstantValue> {
        match self.module.types[ty] {
            Type::Scalar(s) => ConstantValue::AbstractInt(0).convert(s).ok(),
            Type::Vector { size, scalar } => {
                let zero = ConstantValue::AbstractInt(0).convert(scalar).ok()?;
                Some(ConstantValue::Vector(vec![zero; size.count() as usize]))
            }
            Type::Matrix {
                columns,
                rows,
                scalar,
            } => {
                let zero = ConstantValue::AbstractInt(0).convert(scalar).ok()?;
                let column = ConstantValue::Vector(vec![zero; rows.count() as usize]);
                Some(ConstantValue::Array(vec![column; columns.count() as usize]))
            }
            Type::Array {
                base,
                size: ArraySize::Constant(n),
            } => {
                let zero = self.zero_value(base)?;
                Some(ConstantValue::Array(vec![zero; n as usize]))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{check, first_error};
    use super::*;

    fn constant(source: &str) -> ConstantValue {
        let (module, _) = check(source).unwrap();
        let (_, c) = module.constants.iter().last().unwrap();
        module.expressions[c.initializer.unwrap()]
            .constant_value()
            .cloned()
            .unwrap()
    }

    #[test]
    fn vectors_splat_and_flatten() {
        assert_eq!(
            constant("const v = vec3<f32>(1.0);"),
            ConstantValue::Vector(vec![ConstantValue::F32(1.0); 3])
        );
        assert_eq!(
            constant("const v = vec4(vec2(1u, 2u), 3u, 4u);"),
            ConstantValue::Vector(vec![
                ConstantValue::U32(1),
                ConstantValue::U32(2),
                ConstantValue::U32(3),
                ConstantValue::U32(4),
            ])
        );
        assert_eq!(
            constant("const v = vec2i();"),
            ConstantValue::Vector(vec![ConstantValue::I32(0); 2])
        );
    }

    #[test]
    fn scalar_conversions() {
        assert_eq!(constant("const a = i32(2.9);"), ConstantValue::I32(2));
        assert_eq!(constant("const a = f32(3);"), ConstantValue::F32(3.0));
        assert_eq!(constant("const a = bool(0);"), ConstantValue::Bool(false));
        assert_eq!(first_error("const a = u32(-1);"), "value -1 does not fit in u32");
    }

    #[test]
    fn matrices_are_column_arrays() {
        let columns = constant("const m = mat2x2(1.0, 2.0, 3.0, 4.0);");
        assert_eq!(
            columns,
            ConstantValue::Array(vec![
                ConstantValue::Vector(vec![ConstantValue::F32(1.0), ConstantValue::F32(2.0)]),
                ConstantValue::Vector(vec![ConstantValue::F32(3.0), ConstantValue::F32(4.0)]),
            ])
        );
    }

    #[test]
    fn inferred_arrays() {
        assert_eq!(
            constant("const a = array(1, 2.5);"),
            ConstantValue::Array(vec![
                ConstantValue::AbstractFloat(1.0),
                ConstantValue::AbstractFloat(2.5),
            ])
        );
        assert_eq!(first_error("const a = array();"), "cannot infer the element type of 'array'");
    }

    #[test]
    fn constructor_errors() {
        assert_eq!(
            first_error("const v = vec3<f32>(1.0, 2.0);"),
            "'vec3<f32>' needs 3 components, found 2"
        );
        assert_eq!(
            first_error("struct S { a: u32 } fn f() { let s = S(1u, 2u); }"),
            "'S' expects 1 argument(s), found 2"
        );
        assert_eq!(
            first_error("fn f(v: vec2f) { let a = vec3<f32>(v); }"),
            "cannot convert 'vec2<f32>' to 'vec3<f32>'"
        );
        assert_eq!(
            first_error("fn f() { let a = vec2(1u, 2i); }"),
            "mismatched element types 'u32' and 'i32' in 'vec2'"
        );
    }

    #[test]
    fn struct_constructors_are_not_constant() {
        let (module, _) = check("struct S { a: u32, b: f32 } fn f() { let s = S(1u, 2.0); }").unwrap();
        assert!(module.expressions.iter().all(|(_, e)| {
            !matches!(e.ty.map(|t| &module.types[t]), Some(Type::Struct(_))) || e.constant_value().is_none()
        }));
    }
}
