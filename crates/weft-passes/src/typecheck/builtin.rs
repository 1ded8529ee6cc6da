//! Builtin function signatures.

use weft_ast::{
    AccessMode, AddressSpace, ArraySize, BuiltinFunction, Callee, ConstantValue, Expression,
    Handle, Scalar, Span, TextureDimension, Type, VectorSize,
};

use super::{Check, Checker, const_error, fail};

impl Checker<'_> {
    pub(super) fn builtin(
        &mut self,
        h: Handle<Expression>,
        builtin: BuiltinFunction,
        arguments: &[Handle<Expression>],
    ) -> Check<Option<Handle<Type>>> {
        use BuiltinFunction as B;

        let span = self.span(h);
        let name = builtin.name();
        let arity = |expected: &[usize]| -> Check<()> {
            if expected.contains(&arguments.len()) {
                Ok(())
            } else {
                let expected: Vec<String> = expected.iter().map(ToString::to_string).collect();
                fail(
                    format!(
                        "'{name}' expects {} argument(s), found {}",
                        expected.join(" or "),
                        arguments.len()
                    ),
                    span,
                )
            }
        };

        let result = match builtin {
            B::Abs | B::Min | B::Max | B::Clamp => {
                arity(&[match builtin {
                    B::Abs => 1,
                    B::Clamp => 3,
                    _ => 2,
                }])?;
                let ty = self.common_argument(name, arguments, span)?;
                self.numeric(name, ty, span)?;
                let values: Option<Vec<ConstantValue>> = arguments
                    .iter()
                    .map(|&a| self.module.expressions[a].constant_value().cloned())
                    .collect();
                if let Some(values) = values {
                    match ConstantValue::builtin(name, &values) {
                        Ok(value) => {
                            self.module.expressions[h].cache_constant(value);
                        }
                        Err(error) => const_error(error, span)?,
                    }
                }
                if self.module.expressions[h].is_constant() {
                    Some(ty)
                } else {
                    Some(self.concrete_arguments(arguments, ty)?)
                }
            }
            B::Floor
            | B::Ceil
            | B::Round
            | B::Fract
            | B::Trunc
            | B::Sqrt
            | B::InverseSqrt
            | B::Exp
            | B::Exp2
            | B::Log
            | B::Log2
            | B::Sin
            | B::Cos
            | B::Tan => {
                arity(&[1])?;
                Some(self.float_arguments(name, arguments, span)?)
            }
            B::Pow | B::Step => {
                arity(&[2])?;
                Some(self.float_arguments(name, arguments, span)?)
            }
            B::Mix | B::Smoothstep | B::Fma => {
                arity(&[3])?;
                Some(self.float_arguments(name, arguments, span)?)
            }
            B::Normalize => {
                arity(&[1])?;
                let ty = self.float_arguments(name, arguments, span)?;
                self.vector_of(name, ty, span)?;
                Some(ty)
            }
            B::Length | B::Distance => {
                arity(&[if builtin == B::Length { 1 } else { 2 }])?;
                let ty = self.float_arguments(name, arguments, span)?;
                let scalar = self.numeric(name, ty, span)?;
                Some(self.module.scalar_type(scalar))
            }
            B::Dot => {
                arity(&[2])?;
                let ty = self.common_argument(name, arguments, span)?;
                let ty = self.concrete_arguments(arguments, ty)?;
                let (_, scalar) = self.vector_of(name, ty, span)?;
                if !scalar.is_numeric() {
                    return self.bad_argument(name, ty, span);
                }
                Some(self.module.scalar_type(scalar))
            }
            B::Cross => {
                arity(&[2])?;
                let ty = self.float_arguments(name, arguments, span)?;
                match self.vector_of(name, ty, span)? {
                    (VectorSize::Tri, _) => Some(ty),
                    _ => return self.bad_argument(name, ty, span),
                }
            }
            B::Select => {
                arity(&[3])?;
                let ty = self.common_argument(name, &arguments[..2], span)?;
                let ty = self.concrete_arguments(&arguments[..2], ty)?;
                let condition = self.value(arguments[2])?;
                let bool_ty = self.module.scalar_type(Scalar::BOOL);
                let expected = match self.module.types[ty] {
                    // A vector select takes either one condition or one per component.
                    Type::Vector { size, .. } if condition != bool_ty => {
                        self.module.insert_type(Type::Vector {
                            size,
                            scalar: Scalar::BOOL,
                        })
                    }
                    Type::Scalar(_) | Type::Vector { .. } => bool_ty,
                    _ => return self.bad_argument(name, ty, span),
                };
                self.convert(arguments[2], expected)?;
                Some(ty)
            }
            B::All | B::Any => {
                arity(&[1])?;
                let ty = self.value(arguments[0])?;
                match self.module.types[ty] {
                    Type::Scalar(Scalar::BOOL)
                    | Type::Vector {
                        scalar: Scalar::BOOL,
                        ..
                    } => Some(self.module.scalar_type(Scalar::BOOL)),
                    _ => return self.bad_argument(name, ty, span),
                }
            }
            B::ArrayLength => {
                arity(&[1])?;
                let ty = self.value(arguments[0])?;
                let runtime = match self.module.types[ty] {
                    Type::Pointer {
                        space: AddressSpace::Storage,
                        base,
                        ..
                    } => matches!(
                        self.module.types[base],
                        Type::Array {
                            size: ArraySize::Runtime,
                            ..
                        }
                    ),
                    _ => false,
                };
                if !runtime {
                    return self.bad_argument(name, ty, span);
                }
                Some(self.module.scalar_type(Scalar::U32))
            }
            B::WorkgroupBarrier | B::StorageBarrier => {
                arity(&[0])?;
                None
            }
            B::AtomicLoad => {
                arity(&[1])?;
                Some(self.atomic_pointer(name, arguments[0], span)?)
            }
            B::AtomicStore => {
                arity(&[2])?;
                let value = self.atomic_pointer(name, arguments[0], span)?;
                self.convert(arguments[1], value)?;
                None
            }
            B::AtomicAdd
            | B::AtomicSub
            | B::AtomicMax
            | B::AtomicMin
            | B::AtomicAnd
            | B::AtomicOr
            | B::AtomicXor
            | B::AtomicExchange => {
                arity(&[2])?;
                let value = self.atomic_pointer(name, arguments[0], span)?;
                self.convert(arguments[1], value)?;
                Some(value)
            }
            B::TextureSample => {
                let (dimension, sample) = self.texture(name, arguments.first().copied(), span)?;
                arity(&[if dimension.is_arrayed() { 4 } else { 3 }])?;
                if !sample.is_float() {
                    return fail("textureSample requires a floating-point texture", span);
                }
                let sampler = self.value(arguments[1])?;
                if self.module.types[sampler] != (Type::Sampler { comparison: false }) {
                    return self.bad_argument(name, sampler, span);
                }
                let coordinates = self.dimension_coordinates(dimension, Scalar::F32);
                self.convert(arguments[2], coordinates)?;
                if dimension.is_arrayed() {
                    self.integer_argument(name, arguments[3], span)?;
                }
                let vec4 = Type::Vector {
                    size: VectorSize::Quad,
                    scalar: Scalar::F32,
                };
                Some(self.module.insert_type(vec4))
            }
            B::TextureLoad => {
                let (dimension, sample) = self.texture(name, arguments.first().copied(), span)?;
                if dimension == TextureDimension::Cube {
                    return fail("textureLoad cannot be used with cube textures", span);
                }
                arity(&[if dimension.is_arrayed() { 4 } else { 3 }])?;
                let coordinates = self.value(arguments[1])?;
                let integer_coordinates = match self.module.types[coordinates] {
                    Type::Scalar(s) => dimension.coordinates() == 1 && s.is_integer(),
                    Type::Vector { size, scalar } => {
                        size.count() == dimension.coordinates() && scalar.is_integer()
                    }
                    _ => false,
                };
                if !integer_coordinates {
                    return self.bad_argument(name, coordinates, span);
                }
                self.concretize(arguments[1])?;
                for &argument in &arguments[2..] {
                    self.integer_argument(name, argument, span)?;
                }
                let vec4 = Type::Vector {
                    size: VectorSize::Quad,
                    scalar: sample,
                };
                Some(self.module.insert_type(vec4))
            }
            B::TextureDimensions => {
                let (dimension, _) = self.texture(name, arguments.first().copied(), span)?;
                arity(&[1, 2])?;
                if let Some(&level) = arguments.get(1) {
                    self.integer_argument(name, level, span)?;
                }
                let coordinates = match dimension {
                    TextureDimension::Cube | TextureDimension::D2Array => TextureDimension::D2,
                    other => other,
                };
                Some(self.dimension_coordinates(coordinates, Scalar::U32))
            }
        };
        self.set_callee(h, Callee::Builtin(builtin));
        Ok(result)
    }

    fn bad_argument<T>(&self, name: &str, ty: Handle<Type>, span: Span) -> Check<T> {
        fail(
            format!("'{name}' cannot be applied to '{}'", self.module.type_name(ty)),
            span,
        )
    }

    /// The scalar of a numeric scalar or vector type.
    fn numeric(&self, name: &str, ty: Handle<Type>, span: Span) -> Check<Scalar> {
        match self.module.types[ty] {
            Type::Scalar(s) | Type::Vector { scalar: s, .. } if s.is_numeric() => Ok(s),
            _ => self.bad_argument(name, ty, span),
        }
    }

    fn vector_of(&self, name: &str, ty: Handle<Type>, span: Span) -> Check<(VectorSize, Scalar)> {
        match self.module.types[ty] {
            Type::Vector { size, scalar } => Ok((size, scalar)),
            _ => self.bad_argument(name, ty, span),
        }
    }

    /// Converts every argument to one type, keeping abstract types when all
    /// arguments are abstract.
    fn common_argument(
        &mut self,
        name: &str,
        arguments: &[Handle<Expression>],
        span: Span,
    ) -> Check<Handle<Type>> {
        let mut common = self.value(arguments[0])?;
        for &argument in &arguments[1..] {
            let ty = self.value(argument)?;
            if self.converts(common, ty) {
                common = ty;
            } else if !self.converts(ty, common) {
                return fail(
                    format!(
                        "'{name}' arguments must have one type, found '{}' and '{}'",
                        self.module.type_name(common),
                        self.module.type_name(ty)
                    ),
                    span,
                );
            }
        }
        for &argument in arguments {
            self.convert(argument, common)?;
        }
        Ok(common)
    }

    fn concrete_arguments(&mut self, arguments: &[Handle<Expression>], ty: Handle<Type>) -> Check<Handle<Type>> {
        let Some(scalar) = self.leaf_scalar(ty) else {
            return Ok(ty);
        };
        let concrete = self.with_scalar(ty, scalar.concretize());
        for &argument in arguments {
            self.convert(argument, concrete)?;
        }
        Ok(concrete)
    }

    /// Arguments of float-only builtins, which are never evaluated at
    /// compile time and so always concrete.
    fn float_arguments(&mut self, name: &str, arguments: &[Handle<Expression>], span: Span) -> Check<Handle<Type>> {
        let ty = self.common_argument(name, arguments, span)?;
        let ty = match self.numeric(name, ty, span)? {
            s if s.is_abstract() => {
                let target = self.with_scalar(ty, Scalar::F32);
                for &argument in arguments {
                    self.convert(argument, target)?;
                }
                target
            }
            s if s.is_float() => ty,
            _ => return self.bad_argument(name, ty, span),
        };
        Ok(ty)
    }

    fn integer_argument(&mut self, name: &str, argument: Handle<Expression>, span: Span) -> Check<()> {
        let ty = self.value(argument)?;
        if !matches!(self.module.types[ty], Type::Scalar(s) if s.is_integer()) {
            return self.bad_argument(name, ty, span);
        }
        self.concretize(argument)
    }

    /// The value type behind a `ptr<workgroup|storage, atomic<T>, read_write>`.
    fn atomic_pointer(&mut self, name: &str, argument: Handle<Expression>, span: Span) -> Check<Handle<Type>> {
        let ty = self.value(argument)?;
        let scalar = match self.module.types[ty] {
            Type::Pointer {
                space: AddressSpace::Workgroup | AddressSpace::Storage,
                base,
                access: AccessMode::ReadWrite,
            } => match self.module.types[base] {
                Type::Atomic(scalar) => Some(scalar),
                _ => None,
            },
            _ => None,
        };
        match scalar {
            Some(scalar) => Ok(self.module.scalar_type(scalar)),
            None => fail(
                format!(
                    "'{name}' expects a pointer to an atomic, found '{}'",
                    self.module.type_name(ty)
                ),
                span,
            ),
        }
    }

    fn texture(
        &mut self,
        name: &str,
        argument: Option<Handle<Expression>>,
        span: Span,
    ) -> Check<(TextureDimension, Scalar)> {
        let Some(argument) = argument else {
            return fail(format!("'{name}' expects a texture argument"), span);
        };
        let ty = self.value(argument)?;
        match self.module.types[ty] {
            Type::Texture { dimension, sample } => Ok((dimension, sample)),
            _ => self.bad_argument(name, ty, span),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{check, first_error};

    #[test]
    fn abs_min_max_clamp_fold() {
        let (module, _) = check("const a = clamp(7, 0, 5); const b = max(vec2(1.0, 4.0), vec2(2.0));").unwrap();
        let values: Vec<String> = module
            .constants
            .iter()
            .map(|(_, c)| module.expressions[c.initializer.unwrap()].constant_value().unwrap().to_string())
            .collect();
        assert_eq!(values, ["5", "vec(2.0, 4.0)"]);
    }

    #[test]
    fn float_builtins_concretize() {
        check("fn f(x: f32) -> f32 { return sqrt(x) + pow(2, x) + length(vec3(1.0)); }").unwrap();
        assert_eq!(
            first_error("fn f(x: i32) -> i32 { return sqrt(x); }"),
            "'sqrt' cannot be applied to 'i32'"
        );
        assert_eq!(
            first_error("fn f(v: vec2f) { let c = cross(v, v); }"),
            "'cross' cannot be applied to 'vec2<f32>'"
        );
    }

    #[test]
    fn atomics_need_atomic_pointers() {
        check(
            "var<workgroup> counter: atomic<u32>;
             @compute @workgroup_size(1) fn main() { let old = atomicAdd(&counter, 1u); atomicStore(&counter, 0u); }",
        )
        .unwrap();
        assert_eq!(
            first_error("var<workgroup> n: u32; fn f() { let x = atomicLoad(&n); }"),
            "'atomicLoad' expects a pointer to an atomic, found 'ptr<workgroup, u32>'"
        );
    }

    #[test]
    fn array_length_of_runtime_arrays() {
        check(
            "@group(0) @binding(0) var<storage> data: array<f32>;
             fn f() -> u32 { return arrayLength(&data); }",
        )
        .unwrap();
        assert_eq!(
            first_error("var<private> a: array<f32, 4>; fn f() -> u32 { return arrayLength(&a); }"),
            "'arrayLength' cannot be applied to 'ptr<private, array<f32, 4>>'"
        );
    }

    #[test]
    fn texture_builtins() {
        check(
            "@group(0) @binding(0) var t: texture_2d<f32>;
             @group(0) @binding(1) var s: sampler;
             fn f() -> vec4f {
                 let d = textureDimensions(t);
                 return textureSample(t, s, vec2(0.5)) + textureLoad(t, vec2i(d), 0);
             }",
        )
        .unwrap();
        assert_eq!(
            first_error("@group(0) @binding(0) var t: texture_2d<u32>; fn f() -> vec4u { return textureLoad(t, vec2(0.5, 0.5), 0); }"),
            "'textureLoad' cannot be applied to 'vec2<abstract-float>'"
        );
    }

    #[test]
    fn arity_is_checked() {
        assert_eq!(first_error("const a = min(1);"), "'min' expects 2 argument(s), found 1");
        assert_eq!(
            first_error("fn f() { workgroupBarrier(1); }"),
            "'workgroupBarrier' expects 0 argument(s), found 1"
        );
    }
}
