//! Host-shareable memory layout.
//!
//! Sizes and alignments follow the WGSL alignment rules. Struct layouts are
//! computed once by the type checker and stored on the struct.

use crate::ShaderModule;
use crate::arena::Handle;
use crate::decl::StructLayout;
use crate::types::{ArraySize, Type};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeLayout {
    pub size: u32,
    pub align: u32,
}

/// `value` rounded up to a multiple of `align`, or `None` past `u32::MAX`.
pub fn round_up(align: u32, value: u32) -> Option<u32> {
    value.div_ceil(align).checked_mul(align)
}

/// The layout of `ty`, or `None` when the type is not host-shareable
/// (booleans, pointers, handles and abstract types) or its size does not
/// fit in 32 bits.
///
/// A runtime-sized array reports the size of a single element.
pub fn type_layout(module: &ShaderModule, ty: Handle<Type>) -> Option<TypeLayout> {
    match module.types[ty] {
        Type::Scalar(s) | Type::Atomic(s) => {
            if s.is_abstract() || !s.is_numeric() {
                return None;
            }
            let width = u32::from(s.width);
            Some(TypeLayout {
                size: width,
                align: width,
            })
        }
        Type::Vector { size, scalar } => {
            if scalar.is_abstract() || !scalar.is_numeric() {
                return None;
            }
            let width = u32::from(scalar.width);
            let n = size.count();
            let align = if n == 2 { 2 * width } else { 4 * width };
            Some(TypeLayout {
                size: n * width,
                align,
            })
        }
        Type::Matrix {
            columns,
            rows,
            scalar,
        } => {
            if scalar.is_abstract() {
                return None;
            }
            let width = u32::from(scalar.width);
            let column_align = if rows.count() == 2 { 2 * width } else { 4 * width };
            let column_size = rows.count() * width;
            Some(TypeLayout {
                size: columns.count() * round_up(column_align, column_size)?,
                align: column_align,
            })
        }
        Type::Array { base, size } => {
            let element = type_layout(module, base)?;
            let stride = round_up(element.align, element.size)?;
            let count = match size {
                ArraySize::Constant(n) => n,
                ArraySize::Runtime => 1,
            };
            Some(TypeLayout {
                size: count.checked_mul(stride)?,
                align: element.align,
            })
        }
        Type::Struct(handle) => {
            let layout = module.structs[handle].layout.as_ref()?;
            Some(TypeLayout {
                size: layout.size,
                align: layout.align,
            })
        }
        Type::Pointer { .. }
        | Type::Reference { .. }
        | Type::Sampler { .. }
        | Type::Texture { .. } => None,
    }
}

/// Array element stride.
pub fn array_stride(module: &ShaderModule, element: Handle<Type>) -> Option<u32> {
    type_layout(module, element).and_then(|l| round_up(l.align, l.size))
}

/// Lays out struct members.
///
/// `members` pairs each member's type layout with its explicit `@align` and
/// `@size` values. Returns `None` when the struct is larger than
/// `u32::MAX` bytes.
pub fn struct_layout(members: &[(TypeLayout, Option<u32>, Option<u32>)]) -> Option<StructLayout> {
    let mut offset = 0;
    let mut align = 1;
    let mut offsets = Vec::with_capacity(members.len());
    for &(layout, explicit_align, explicit_size) in members {
        let member_align = explicit_align.unwrap_or(layout.align).max(1);
        let member_size = explicit_size.unwrap_or(layout.size);
        offset = round_up(member_align, offset)?;
        offsets.push(offset);
        offset = offset.checked_add(member_size)?;
        align = align.max(member_align);
    }
    Some(StructLayout {
        size: round_up(align, offset)?,
        align,
        offsets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Configuration;
    use crate::types::{Scalar, VectorSize};

    fn module() -> ShaderModule {
        ShaderModule::new("", Configuration::default())
    }

    #[test]
    fn vec3_aligns_to_16() {
        let mut m = module();
        let v = m.insert_type(Type::Vector {
            size: VectorSize::Tri,
            scalar: Scalar::F32,
        });
        assert_eq!(type_layout(&m, v), Some(TypeLayout { size: 12, align: 16 }));
    }

    #[test]
    fn f16_vectors() {
        let mut m = module();
        let v = m.insert_type(Type::Vector {
            size: VectorSize::Bi,
            scalar: Scalar::F16,
        });
        assert_eq!(type_layout(&m, v), Some(TypeLayout { size: 4, align: 4 }));
    }

    #[test]
    fn matrix_columns_are_padded() {
        let mut m = module();
        let mat = m.insert_type(Type::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Tri,
            scalar: Scalar::F32,
        });
        assert_eq!(type_layout(&m, mat), Some(TypeLayout { size: 64, align: 16 }));
    }

    #[test]
    fn arrays_use_stride() {
        let mut m = module();
        let v = m.insert_type(Type::Vector {
            size: VectorSize::Tri,
            scalar: Scalar::F32,
        });
        let arr = m.insert_type(Type::Array {
            base: v,
            size: ArraySize::Constant(4),
        });
        let rt = m.insert_type(Type::Array {
            base: v,
            size: ArraySize::Runtime,
        });
        assert_eq!(type_layout(&m, arr).map(|l| l.size), Some(64));
        assert_eq!(type_layout(&m, rt).map(|l| l.size), Some(16));
        assert_eq!(array_stride(&m, v), Some(16));
    }

    #[test]
    fn bool_is_not_host_shareable() {
        let mut m = module();
        let b = m.scalar_type(Scalar::BOOL);
        assert_eq!(type_layout(&m, b), None);
    }

    #[test]
    fn struct_members_respect_alignment() {
        let f32_layout = TypeLayout { size: 4, align: 4 };
        let vec3_layout = TypeLayout { size: 12, align: 16 };
        let layout = struct_layout(&[(f32_layout, None, None), (vec3_layout, None, None)]).unwrap();
        assert_eq!(layout.offsets, vec![0, 16]);
        assert_eq!(layout.size, 32);
        assert_eq!(layout.align, 16);
    }

    #[test]
    fn explicit_align_and_size() {
        let f32_layout = TypeLayout { size: 4, align: 4 };
        let layout = struct_layout(&[
            (f32_layout, None, Some(8)),
            (f32_layout, Some(16), None),
        ])
        .unwrap();
        assert_eq!(layout.offsets, vec![0, 16]);
        assert_eq!(layout.size, 32);
    }

    #[test]
    fn oversized_arrays_have_no_layout() {
        let mut m = module();
        let v = m.insert_type(Type::Vector {
            size: VectorSize::Quad,
            scalar: Scalar::F32,
        });
        let big = m.insert_type(Type::Array {
            base: v,
            size: ArraySize::Constant(1_000_000_000),
        });
        assert_eq!(type_layout(&m, big), None);
        assert_eq!(round_up(16, u32::MAX - 3), None);
    }

    #[test]
    fn oversized_structs_have_no_layout() {
        let f32_layout = TypeLayout { size: 4, align: 4 };
        // Member sizes overflow the running offset.
        assert_eq!(
            struct_layout(&[
                (f32_layout, None, Some(2_147_483_644)),
                (f32_layout, None, Some(2_147_483_644)),
                (f32_layout, None, Some(16)),
            ]),
            None
        );
        // Aligning the third member overflows.
        assert_eq!(
            struct_layout(&[
                (f32_layout, None, Some(2_147_483_647)),
                (f32_layout, None, Some(2_147_483_647)),
                (f32_layout, Some(1 << 30), None),
            ]),
            None
        );
    }
}
