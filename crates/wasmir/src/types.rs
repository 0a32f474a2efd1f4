//! Value, reference and block types.
//!
//! Binary type codes are read as signed LEB128 values: negative codes name
//! numeric and abstract types, non-negative ones are type section indices.

use crate::binary::leb128::{self, LebError};
use std::fmt;
use thiserror::Error;

pub mod code {
    pub const I32: i64 = -0x01;
    pub const I64: i64 = -0x02;
    pub const F32: i64 = -0x03;
    pub const F64: i64 = -0x04;
    pub const V128: i64 = -0x05;
    pub const I8: i64 = -0x08;
    pub const I16: i64 = -0x09;
    pub const NO_EXN: i64 = -0x0c;
    pub const NO_FUNC: i64 = -0x0d;
    pub const NO_EXTERN: i64 = -0x0e;
    pub const NONE: i64 = -0x0f;
    pub const FUNC_REF: i64 = -0x10;
    pub const EXTERN_REF: i64 = -0x11;
    pub const ANY_REF: i64 = -0x12;
    pub const EQ_REF: i64 = -0x13;
    pub const I31_REF: i64 = -0x14;
    pub const STRUCT_REF: i64 = -0x15;
    pub const ARRAY_REF: i64 = -0x16;
    pub const EXN_REF: i64 = -0x17;
    pub const REF: i64 = -0x1c;
    pub const REF_NULL: i64 = -0x1d;
    pub const FUNC: i64 = -0x20;
    pub const STRUCT: i64 = -0x21;
    pub const ARRAY: i64 = -0x22;
    pub const SUB: i64 = -0x30;
    pub const SUB_FINAL: i64 = -0x31;
    pub const REC: i64 = -0x32;
    pub const EMPTY_BLOCK: i64 = -0x40;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TypeDecodeError {
    #[error("{0}")]
    Leb(#[from] LebError),
    #[error("unknown type code {0}")]
    UnknownType(i64),
    #[error("type index {0} out of range")]
    IndexTooLarge(i64),
}

/// The heap a reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapType {
    Func,
    Extern,
    Any,
    Eq,
    I31,
    Struct,
    Array,
    Exn,
    None,
    NoFunc,
    NoExtern,
    NoExn,
    /// A type section index.
    Index(u32),
}

impl HeapType {
    pub fn from_code(value: i64) -> Result<HeapType, TypeDecodeError> {
        let heap = match value {
            code::FUNC_REF => HeapType::Func,
            code::EXTERN_REF => HeapType::Extern,
            code::ANY_REF => HeapType::Any,
            code::EQ_REF => HeapType::Eq,
            code::I31_REF => HeapType::I31,
            code::STRUCT_REF => HeapType::Struct,
            code::ARRAY_REF => HeapType::Array,
            code::EXN_REF => HeapType::Exn,
            code::NONE => HeapType::None,
            code::NO_FUNC => HeapType::NoFunc,
            code::NO_EXTERN => HeapType::NoExtern,
            code::NO_EXN => HeapType::NoExn,
            index if index >= 0 => {
                let index = u32::try_from(index).map_err(|_| TypeDecodeError::IndexTooLarge(index))?;
                HeapType::Index(index)
            }
            other => return Err(TypeDecodeError::UnknownType(other)),
        };
        Ok(heap)
    }

    pub fn code(self) -> i64 {
        match self {
            HeapType::Func => code::FUNC_REF,
            HeapType::Extern => code::EXTERN_REF,
            HeapType::Any => code::ANY_REF,
            HeapType::Eq => code::EQ_REF,
            HeapType::I31 => code::I31_REF,
            HeapType::Struct => code::STRUCT_REF,
            HeapType::Array => code::ARRAY_REF,
            HeapType::Exn => code::EXN_REF,
            HeapType::None => code::NONE,
            HeapType::NoFunc => code::NO_FUNC,
            HeapType::NoExtern => code::NO_EXTERN,
            HeapType::NoExn => code::NO_EXN,
            HeapType::Index(index) => i64::from(index),
        }
    }

    /// Decodes a heap type (an s33) from the start of `data`.
    pub fn decode(data: &[u8]) -> Result<(HeapType, usize), TypeDecodeError> {
        let (value, len) = leb128::read_s33(data)?;
        Ok((HeapType::from_code(value)?, len))
    }

    pub fn encode(self, out: &mut Vec<u8>) {
        leb128::write_i64(out, self.code());
    }

    /// The bottom type of this heap's hierarchy.
    pub fn bottom(self) -> HeapType {
        match self {
            HeapType::Func | HeapType::NoFunc => HeapType::NoFunc,
            HeapType::Extern | HeapType::NoExtern => HeapType::NoExtern,
            HeapType::Exn | HeapType::NoExn => HeapType::NoExn,
            // Concrete indices resolve through the module's type section.
            _ => HeapType::None,
        }
    }
}

impl fmt::Display for HeapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HeapType::Func => "func",
            HeapType::Extern => "extern",
            HeapType::Any => "any",
            HeapType::Eq => "eq",
            HeapType::I31 => "i31",
            HeapType::Struct => "struct",
            HeapType::Array => "array",
            HeapType::Exn => "exn",
            HeapType::None => "none",
            HeapType::NoFunc => "nofunc",
            HeapType::NoExtern => "noextern",
            HeapType::NoExn => "noexn",
            HeapType::Index(index) => return write!(f, "{index}"),
        };
        f.write_str(name)
    }
}

/// A reference type: nullability plus heap type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefType {
    pub nullable: bool,
    pub heap: HeapType,
}

impl RefType {
    pub const FUNCREF: RefType = RefType::nullable(HeapType::Func);
    pub const EXTERNREF: RefType = RefType::nullable(HeapType::Extern);
    pub const EXNREF: RefType = RefType::nullable(HeapType::Exn);

    pub const fn nullable(heap: HeapType) -> Self {
        Self {
            nullable: true,
            heap,
        }
    }

    pub const fn non_null(heap: HeapType) -> Self {
        Self {
            nullable: false,
            heap,
        }
    }

    pub fn as_non_null(self) -> Self {
        Self::non_null(self.heap)
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.nullable, self.heap) {
            (true, HeapType::Index(_)) => write!(f, "(ref null {})", self.heap),
            (true, heap) => write!(f, "{heap}ref"),
            (false, heap) => write!(f, "(ref {heap})"),
        }
    }
}

/// A value, packed or reference type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    I32,
    I64,
    F32,
    F64,
    V128,
    /// Packed storage types, only valid in struct and array fields.
    I8,
    I16,
    Ref(RefType),
}

impl Type {
    pub const FUNCREF: Type = Type::Ref(RefType::FUNCREF);
    pub const EXTERNREF: Type = Type::Ref(RefType::EXTERNREF);
    pub const EXNREF: Type = Type::Ref(RefType::EXNREF);

    /// Decodes a value or storage type from the start of `data`.
    pub fn decode(data: &[u8]) -> Result<(Type, usize), TypeDecodeError> {
        let (value, len) = leb128::read_i32(data)?;
        let ty = match i64::from(value) {
            code::I32 => Type::I32,
            code::I64 => Type::I64,
            code::F32 => Type::F32,
            code::F64 => Type::F64,
            code::V128 => Type::V128,
            code::I8 => Type::I8,
            code::I16 => Type::I16,
            prefix @ (code::REF | code::REF_NULL) => {
                let (heap, heap_len) = HeapType::decode(&data[len..])?;
                let nullable = prefix == code::REF_NULL;
                return Ok((Type::Ref(RefType { nullable, heap }), len + heap_len));
            }
            other => match HeapType::from_code(other) {
                Ok(heap) if other < 0 => Type::Ref(RefType::nullable(heap)),
                _ => return Err(TypeDecodeError::UnknownType(other)),
            },
        };
        Ok((ty, len))
    }

    pub fn encode(self, out: &mut Vec<u8>) {
        let simple = match self {
            Type::I32 => code::I32,
            Type::I64 => code::I64,
            Type::F32 => code::F32,
            Type::F64 => code::F64,
            Type::V128 => code::V128,
            Type::I8 => code::I8,
            Type::I16 => code::I16,
            Type::Ref(RefType {
                nullable: true,
                heap,
            }) if !matches!(heap, HeapType::Index(_)) => heap.code(),
            Type::Ref(RefType { nullable, heap }) => {
                let prefix = if nullable { code::REF_NULL } else { code::REF };
                leb128::write_i64(out, prefix);
                heap.encode(out);
                return;
            }
        };
        leb128::write_i64(out, simple);
    }

    pub fn is_num(self) -> bool {
        matches!(self, Type::I32 | Type::I64 | Type::F32 | Type::F64)
    }

    pub fn is_ref(self) -> bool {
        matches!(self, Type::Ref(_))
    }

    pub fn is_packed(self) -> bool {
        matches!(self, Type::I8 | Type::I16)
    }

    pub fn as_ref_type(self) -> Option<RefType> {
        match self {
            Type::Ref(rt) => Some(rt),
            _ => None,
        }
    }

    /// Nullable references and all non-reference types have a default value.
    pub fn is_defaultable(self) -> bool {
        match self {
            Type::Ref(rt) => rt.nullable,
            _ => true,
        }
    }

    /// The operand-stack type of a storage type.
    pub fn unpacked(self) -> Type {
        match self {
            Type::I8 | Type::I16 => Type::I32,
            other => other,
        }
    }

    /// The type section index this type refers to, if any.
    pub fn type_index(self) -> Option<u32> {
        match self {
            Type::Ref(RefType {
                heap: HeapType::Index(index),
                ..
            }) => Some(index),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::I32 => f.write_str("i32"),
            Type::I64 => f.write_str("i64"),
            Type::F32 => f.write_str("f32"),
            Type::F64 => f.write_str("f64"),
            Type::V128 => f.write_str("v128"),
            Type::I8 => f.write_str("i8"),
            Type::I16 => f.write_str("i16"),
            Type::Ref(rt) => write!(f, "{rt}"),
        }
    }
}

/// The signature of a `block`, `loop`, `if`, `try` or `try_table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Empty,
    Value(Type),
    /// A function type in the type section.
    Index(u32),
}

impl BlockType {
    pub fn decode(data: &[u8]) -> Result<(BlockType, usize), TypeDecodeError> {
        let (value, len) = leb128::read_s33(data)?;
        match value {
            code::EMPTY_BLOCK => Ok((BlockType::Empty, len)),
            index if index >= 0 => {
                let index = u32::try_from(index).map_err(|_| TypeDecodeError::IndexTooLarge(index))?;
                Ok((BlockType::Index(index), len))
            }
            _ => {
                let (ty, len) = Type::decode(data)?;
                Ok((BlockType::Value(ty), len))
            }
        }
    }

    pub fn encode(self, out: &mut Vec<u8>) {
        match self {
            BlockType::Empty => leb128::write_i64(out, code::EMPTY_BLOCK),
            BlockType::Value(ty) => ty.encode(out),
            BlockType::Index(index) => leb128::write_i64(out, i64::from(index)),
        }
    }
}

/// A function signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FuncType {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
}

impl FuncType {
    pub fn new(params: Vec<Type>, results: Vec<Type>) -> Self {
        Self { params, results }
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", TypeList(&self.params), TypeList(&self.results))
    }
}

/// A struct field or array element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldType {
    /// Storage type; may be packed.
    pub ty: Type,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompositeType {
    Func(FuncType),
    Struct(Vec<FieldType>),
    Array(FieldType),
}

impl CompositeType {
    pub fn as_func(&self) -> Option<&FuncType> {
        match self {
            CompositeType::Func(func) => Some(func),
            _ => None,
        }
    }

    /// The abstract heap type every type of this kind is a subtype of.
    pub fn abstract_heap(&self) -> HeapType {
        match self {
            CompositeType::Func(_) => HeapType::Func,
            CompositeType::Struct(_) => HeapType::Struct,
            CompositeType::Array(_) => HeapType::Array,
        }
    }
}

/// A type section entry with its subtyping declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubType {
    pub is_final: bool,
    pub supertype: Option<u32>,
    pub composite: CompositeType,
}

impl SubType {
    /// A final type without supertypes, as declared outside `sub`.
    pub fn plain(composite: CompositeType) -> Self {
        Self {
            is_final: true,
            supertype: None,
            composite,
        }
    }
}

/// Size bounds of a table or memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Limits {
    pub initial: u64,
    pub max: Option<u64>,
    pub shared: bool,
    pub is_64: bool,
}

impl Limits {
    pub const FLAG_HAS_MAX: u8 = 0x01;
    pub const FLAG_SHARED: u8 = 0x02;
    pub const FLAG_64: u8 = 0x04;
    pub const FLAG_PAGE_SIZE: u8 = 0x08;

    pub fn new(initial: u64, max: Option<u64>) -> Self {
        Self {
            initial,
            max,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableType {
    pub elem_type: RefType,
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryType {
    pub limits: Limits,
    pub page_size_log2: u32,
}

impl MemoryType {
    pub const DEFAULT_PAGE_SIZE_LOG2: u32 = 16;

    /// Type of addresses into this memory.
    pub fn address_type(&self) -> Type {
        if self.limits.is_64 {
            Type::I64
        } else {
            Type::I32
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalType {
    pub ty: Type,
    pub mutable: bool,
}

/// Types of a list of values, printed as `[i32, i64]`.
pub struct TypeList<'a>(pub &'a [Type]);

impl fmt::Display for TypeList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, ty) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(ty: Type) -> Type {
        let mut bytes = Vec::new();
        ty.encode(&mut bytes);
        let (decoded, len) = Type::decode(&bytes).unwrap();
        assert_eq!(len, bytes.len());
        decoded
    }

    #[test]
    fn numeric_codes_match_binary_bytes() {
        assert_eq!(Type::decode(&[0x7f]).unwrap(), (Type::I32, 1));
        assert_eq!(Type::decode(&[0x7b]).unwrap(), (Type::V128, 1));
        assert_eq!(Type::decode(&[0x70]).unwrap(), (Type::FUNCREF, 1));
        assert_eq!(Type::decode(&[0x6f]).unwrap(), (Type::EXTERNREF, 1));
    }

    #[test]
    fn every_type_shape_round_trips() {
        let heaps = [
            HeapType::Func,
            HeapType::Extern,
            HeapType::Any,
            HeapType::Eq,
            HeapType::I31,
            HeapType::Struct,
            HeapType::Array,
            HeapType::Exn,
            HeapType::None,
            HeapType::NoFunc,
            HeapType::NoExtern,
            HeapType::NoExn,
            HeapType::Index(0),
            HeapType::Index(300),
        ];
        let mut types = vec![
            Type::I32,
            Type::I64,
            Type::F32,
            Type::F64,
            Type::V128,
            Type::I8,
            Type::I16,
        ];
        for heap in heaps {
            types.push(Type::Ref(RefType::nullable(heap)));
            types.push(Type::Ref(RefType::non_null(heap)));
        }
        for ty in types {
            assert_eq!(round_trip(ty), ty);
        }
    }

    #[test]
    fn indexed_reference_keeps_its_index() {
        let bytes = [0x64, 0xac, 0x02];
        let (ty, len) = Type::decode(&bytes).unwrap();
        assert_eq!(len, 3);
        assert_eq!(ty, Type::Ref(RefType::non_null(HeapType::Index(300))));
        assert_eq!(ty.type_index(), Some(300));
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(
            Type::decode(&[0x60]),
            Err(TypeDecodeError::UnknownType(-0x20))
        );
        assert!(matches!(Type::decode(&[0x05]), Err(TypeDecodeError::UnknownType(5))));
        assert_eq!(
            Type::decode(&[0x80]),
            Err(TypeDecodeError::Leb(LebError::UnexpectedEnd))
        );
    }

    #[test]
    fn block_types_decode() {
        assert_eq!(BlockType::decode(&[0x40]).unwrap(), (BlockType::Empty, 1));
        assert_eq!(
            BlockType::decode(&[0x7e]).unwrap(),
            (BlockType::Value(Type::I64), 1)
        );
        assert_eq!(BlockType::decode(&[0x03]).unwrap(), (BlockType::Index(3), 1));
    }

    #[test]
    fn display_matches_text_format() {
        assert_eq!(Type::FUNCREF.to_string(), "funcref");
        assert_eq!(
            Type::Ref(RefType::non_null(HeapType::Func)).to_string(),
            "(ref func)"
        );
        assert_eq!(
            Type::Ref(RefType::nullable(HeapType::Index(2))).to_string(),
            "(ref null 2)"
        );
        assert_eq!(TypeList(&[Type::I32, Type::I64]).to_string(), "[i32, i64]");
    }
}
