use crate::signature::TypeCode;

/// Rounds `ix` up to the next multiple of `alignment`.
pub(crate) fn align(ix: usize, alignment: usize) -> usize {
    debug_assert!(
        alignment.is_power_of_two(),
        "{} is not power of 2, cannot be used as alignment",
        alignment
    );
    let mask = alignment - 1;
    (ix + mask) & !mask
}

/// Wire alignment of a value of the given type.
pub(crate) fn alignment_of(code: TypeCode) -> usize {
    match code {
        TypeCode::Byte => 1,
        TypeCode::Boolean => 4,
        TypeCode::Int16 | TypeCode::UInt16 => 2,
        TypeCode::Int32 | TypeCode::UInt32 => 4,
        TypeCode::Int64 | TypeCode::UInt64 | TypeCode::Double => 8,
        TypeCode::String | TypeCode::ObjectPath => 4,
        TypeCode::Signature => 1,
        TypeCode::Array => 4,
        TypeCode::Struct | TypeCode::DictEntry => 8,
        TypeCode::Variant => 1,
    }
}
