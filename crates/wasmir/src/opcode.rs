//! Opcode table.
//!
//! Every instruction the decoder understands has one row below: its
//! `(prefix, code)` encoding, text name, operand shape, the fixed signature
//! used by the type checker for simple instructions, the natural memory
//! access size for loads and stores, and the proposal that gates it.
//!
//! Lookup from bytes goes through a dense table built at compile time and
//! indexed by `(prefix slot << CODE_BITS) | code`.

use crate::binary::leb128;
use crate::features::{Feature, Features};
use crate::types::Type;
use std::fmt;

/// Operand shape of an opcode, used to pick the decoded instruction form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeKind {
    Unary,
    Binary,
    Compare,
    Convert,
    Ternary,
    Load,
    Store,
    LoadSplat,
    LoadZero,
    LoadLane,
    StoreLane,
    LaneOp,
    AtomicLoad,
    AtomicStore,
    AtomicRmw,
    AtomicCmpxchg,
    AtomicWait,
    AtomicNotify,
    /// Anything with bespoke immediates or typing rules.
    Other,
}

/// Static description of one opcode.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    pub name: &'static str,
    pub prefix: u8,
    pub code: u32,
    pub kind: OpcodeKind,
    pub result: Option<Type>,
    pub params: [Option<Type>; 3],
    /// Natural access size in bytes for memory instructions, 0 otherwise.
    pub memory_size: u32,
    pub feature: Option<Feature>,
}

/// A `(prefix, code)` pair with no entry in the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvalidOpcode {
    pub prefix: u8,
    pub code: u32,
}

impl InvalidOpcode {
    /// The byte sequence that produced this opcode.
    pub fn bytes(&self) -> Vec<u8> {
        encode(self.prefix, self.code)
    }
}

impl fmt::Display for InvalidOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix == 0 {
            write!(f, "0x{:02x}", self.code)
        } else {
            write!(f, "0x{:02x} 0x{:x}", self.prefix, self.code)
        }
    }
}

fn encode(prefix: u8, code: u32) -> Vec<u8> {
    if prefix == 0 {
        return vec![code as u8];
    }
    let mut bytes = vec![prefix];
    leb128::write_u32(&mut bytes, code);
    bytes
}

const CODE_BITS: u32 = 9;
const PREFIX_SLOTS: usize = 5;
const TABLE_SIZE: usize = PREFIX_SLOTS << CODE_BITS;

const fn prefix_slot(prefix: u8) -> Option<usize> {
    match prefix {
        0x00 => Some(0),
        0xfb => Some(1),
        0xfc => Some(2),
        0xfd => Some(3),
        0xfe => Some(4),
        _ => None,
    }
}

const fn table_index(prefix: u8, code: u32) -> Option<usize> {
    if code >= (1 << CODE_BITS) {
        return None;
    }
    match prefix_slot(prefix) {
        Some(slot) => Some((slot << CODE_BITS) | code as usize),
        None => None,
    }
}

const ___: Option<Type> = None;
const I32: Option<Type> = Some(Type::I32);
const I64: Option<Type> = Some(Type::I64);
const F32: Option<Type> = Some(Type::F32);
const F64: Option<Type> = Some(Type::F64);
const V128: Option<Type> = Some(Type::V128);

macro_rules! feature_of {
    (Mvp) => {
        None
    };
    ($feature:ident) => {
        Some(Feature::$feature)
    };
}

macro_rules! define_opcodes {
    ($(
        $name:ident $prefix:literal $code:literal $text:literal $kind:ident
        $result:ident $p1:ident $p2:ident $p3:ident $size:literal $feature:ident;
    )*) => {
        /// A known WebAssembly opcode.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Opcode {
            $( $name, )*
        }

        const ALL: &[Opcode] = &[$( Opcode::$name, )*];

        const INFO: &[OpcodeInfo] = &[$(
            OpcodeInfo {
                name: $text,
                prefix: $prefix,
                code: $code,
                kind: OpcodeKind::$kind,
                result: $result,
                params: [$p1, $p2, $p3],
                memory_size: $size,
                feature: feature_of!($feature),
            },
        )*];
    };
}

define_opcodes! {
    Unreachable                   0x00 0x00  "unreachable"                         Other         ___  ___  ___  ___  0  Mvp;
    Nop                           0x00 0x01  "nop"                                 Other         ___  ___  ___  ___  0  Mvp;
    Block                         0x00 0x02  "block"                               Other         ___  ___  ___  ___  0  Mvp;
    Loop                          0x00 0x03  "loop"                                Other         ___  ___  ___  ___  0  Mvp;
    If                            0x00 0x04  "if"                                  Other         ___  ___  ___  ___  0  Mvp;
    Else                          0x00 0x05  "else"                                Other         ___  ___  ___  ___  0  Mvp;
    Try                           0x00 0x06  "try"                                 Other         ___  ___  ___  ___  0  Exceptions;
    Catch                         0x00 0x07  "catch"                               Other         ___  ___  ___  ___  0  Exceptions;
    Throw                         0x00 0x08  "throw"                               Other         ___  ___  ___  ___  0  Exceptions;
    Rethrow                       0x00 0x09  "rethrow"                             Other         ___  ___  ___  ___  0  Exceptions;
    ThrowRef                      0x00 0x0a  "throw_ref"                           Other         ___  ___  ___  ___  0  Exceptions;
    End                           0x00 0x0b  "end"                                 Other         ___  ___  ___  ___  0  Mvp;
    Br                            0x00 0x0c  "br"                                  Other         ___  ___  ___  ___  0  Mvp;
    BrIf                          0x00 0x0d  "br_if"                               Other         ___  ___  ___  ___  0  Mvp;
    BrTable                       0x00 0x0e  "br_table"                            Other         ___  ___  ___  ___  0  Mvp;
    Return                        0x00 0x0f  "return"                              Other         ___  ___  ___  ___  0  Mvp;
    Call                          0x00 0x10  "call"                                Other         ___  ___  ___  ___  0  Mvp;
    CallIndirect                  0x00 0x11  "call_indirect"                       Other         ___  ___  ___  ___  0  Mvp;
    ReturnCall                    0x00 0x12  "return_call"                         Other         ___  ___  ___  ___  0  TailCall;
    ReturnCallIndirect            0x00 0x13  "return_call_indirect"                Other         ___  ___  ___  ___  0  TailCall;
    CallRef                       0x00 0x14  "call_ref"                            Other         ___  ___  ___  ___  0  FunctionReferences;
    ReturnCallRef                 0x00 0x15  "return_call_ref"                     Other         ___  ___  ___  ___  0  FunctionReferences;
    Delegate                      0x00 0x18  "delegate"                            Other         ___  ___  ___  ___  0  Exceptions;
    CatchAll                      0x00 0x19  "catch_all"                           Other         ___  ___  ___  ___  0  Exceptions;
    Drop                          0x00 0x1a  "drop"                                Other         ___  ___  ___  ___  0  Mvp;
    Select                        0x00 0x1b  "select"                              Other         ___  ___  ___  ___  0  Mvp;
    SelectT                       0x00 0x1c  "select"                              Other         ___  ___  ___  ___  0  ReferenceTypes;
    TryTable                      0x00 0x1f  "try_table"                           Other         ___  ___  ___  ___  0  Exceptions;
    LocalGet                      0x00 0x20  "local.get"                           Other         ___  ___  ___  ___  0  Mvp;
    LocalSet                      0x00 0x21  "local.set"                           Other         ___  ___  ___  ___  0  Mvp;
    LocalTee                      0x00 0x22  "local.tee"                           Other         ___  ___  ___  ___  0  Mvp;
    GlobalGet                     0x00 0x23  "global.get"                          Other         ___  ___  ___  ___  0  Mvp;
    GlobalSet                     0x00 0x24  "global.set"                          Other         ___  ___  ___  ___  0  Mvp;
    TableGet                      0x00 0x25  "table.get"                           Other         ___  ___  ___  ___  0  ReferenceTypes;
    TableSet                      0x00 0x26  "table.set"                           Other         ___  ___  ___  ___  0  ReferenceTypes;
    I32Load                       0x00 0x28  "i32.load"                            Load          I32  I32  ___  ___  4  Mvp;
    I64Load                       0x00 0x29  "i64.load"                            Load          I64  I32  ___  ___  8  Mvp;
    F32Load                       0x00 0x2a  "f32.load"                            Load          F32  I32  ___  ___  4  Mvp;
    F64Load                       0x00 0x2b  "f64.load"                            Load          F64  I32  ___  ___  8  Mvp;
    I32Load8S                     0x00 0x2c  "i32.load8_s"                         Load          I32  I32  ___  ___  1  Mvp;
    I32Load8U                     0x00 0x2d  "i32.load8_u"                         Load          I32  I32  ___  ___  1  Mvp;
    I32Load16S                    0x00 0x2e  "i32.load16_s"                        Load          I32  I32  ___  ___  2  Mvp;
    I32Load16U                    0x00 0x2f  "i32.load16_u"                        Load          I32  I32  ___  ___  2  Mvp;
    I64Load8S                     0x00 0x30  "i64.load8_s"                         Load          I64  I32  ___  ___  1  Mvp;
    I64Load8U                     0x00 0x31  "i64.load8_u"                         Load          I64  I32  ___  ___  1  Mvp;
    I64Load16S                    0x00 0x32  "i64.load16_s"                        Load          I64  I32  ___  ___  2  Mvp;
    I64Load16U                    0x00 0x33  "i64.load16_u"                        Load          I64  I32  ___  ___  2  Mvp;
    I64Load32S                    0x00 0x34  "i64.load32_s"                        Load          I64  I32  ___  ___  4  Mvp;
    I64Load32U                    0x00 0x35  "i64.load32_u"                        Load          I64  I32  ___  ___  4  Mvp;
    I32Store                      0x00 0x36  "i32.store"                           Store         ___  I32  I32  ___  4  Mvp;
    I64Store                      0x00 0x37  "i64.store"                           Store         ___  I32  I64  ___  8  Mvp;
    F32Store                      0x00 0x38  "f32.store"                           Store         ___  I32  F32  ___  4  Mvp;
    F64Store                      0x00 0x39  "f64.store"                           Store         ___  I32  F64  ___  8  Mvp;
    I32Store8                     0x00 0x3a  "i32.store8"                          Store         ___  I32  I32  ___  1  Mvp;
    I32Store16                    0x00 0x3b  "i32.store16"                         Store         ___  I32  I32  ___  2  Mvp;
    I64Store8                     0x00 0x3c  "i64.store8"                          Store         ___  I32  I64  ___  1  Mvp;
    I64Store16                    0x00 0x3d  "i64.store16"                         Store         ___  I32  I64  ___  2  Mvp;
    I64Store32                    0x00 0x3e  "i64.store32"                         Store         ___  I32  I64  ___  4  Mvp;
    MemorySize                    0x00 0x3f  "memory.size"                         Other         I32  ___  ___  ___  0  Mvp;
    MemoryGrow                    0x00 0x40  "memory.grow"                         Other         I32  I32  ___  ___  0  Mvp;
    I32Const                      0x00 0x41  "i32.const"                           Other         I32  ___  ___  ___  0  Mvp;
    I64Const                      0x00 0x42  "i64.const"                           Other         I64  ___  ___  ___  0  Mvp;
    F32Const                      0x00 0x43  "f32.const"                           Other         F32  ___  ___  ___  0  Mvp;
    F64Const                      0x00 0x44  "f64.const"                           Other         F64  ___  ___  ___  0  Mvp;
    I32Eqz                        0x00 0x45  "i32.eqz"                             Convert       I32  I32  ___  ___  0  Mvp;
    I32Eq                         0x00 0x46  "i32.eq"                              Compare       I32  I32  I32  ___  0  Mvp;
    I32Ne                         0x00 0x47  "i32.ne"                              Compare       I32  I32  I32  ___  0  Mvp;
    I32LtS                        0x00 0x48  "i32.lt_s"                            Compare       I32  I32  I32  ___  0  Mvp;
    I32LtU                        0x00 0x49  "i32.lt_u"                            Compare       I32  I32  I32  ___  0  Mvp;
    I32GtS                        0x00 0x4a  "i32.gt_s"                            Compare       I32  I32  I32  ___  0  Mvp;
    I32GtU                        0x00 0x4b  "i32.gt_u"                            Compare       I32  I32  I32  ___  0  Mvp;
    I32LeS                        0x00 0x4c  "i32.le_s"                            Compare       I32  I32  I32  ___  0  Mvp;
    I32LeU                        0x00 0x4d  "i32.le_u"                            Compare       I32  I32  I32  ___  0  Mvp;
    I32GeS                        0x00 0x4e  "i32.ge_s"                            Compare       I32  I32  I32  ___  0  Mvp;
    I32GeU                        0x00 0x4f  "i32.ge_u"                            Compare       I32  I32  I32  ___  0  Mvp;
    I64Eqz                        0x00 0x50  "i64.eqz"                             Convert       I32  I64  ___  ___  0  Mvp;
    I64Eq                         0x00 0x51  "i64.eq"                              Compare       I32  I64  I64  ___  0  Mvp;
    I64Ne                         0x00 0x52  "i64.ne"                              Compare       I32  I64  I64  ___  0  Mvp;
    I64LtS                        0x00 0x53  "i64.lt_s"                            Compare       I32  I64  I64  ___  0  Mvp;
    I64LtU                        0x00 0x54  "i64.lt_u"                            Compare       I32  I64  I64  ___  0  Mvp;
    I64GtS                        0x00 0x55  "i64.gt_s"                            Compare       I32  I64  I64  ___  0  Mvp;
    I64GtU                        0x00 0x56  "i64.gt_u"                            Compare       I32  I64  I64  ___  0  Mvp;
    I64LeS                        0x00 0x57  "i64.le_s"                            Compare       I32  I64  I64  ___  0  Mvp;
    I64LeU                        0x00 0x58  "i64.le_u"                            Compare       I32  I64  I64  ___  0  Mvp;
    I64GeS                        0x00 0x59  "i64.ge_s"                            Compare       I32  I64  I64  ___  0  Mvp;
    I64GeU                        0x00 0x5a  "i64.ge_u"                            Compare       I32  I64  I64  ___  0  Mvp;
    F32Eq                         0x00 0x5b  "f32.eq"                              Compare       I32  F32  F32  ___  0  Mvp;
    F32Ne                         0x00 0x5c  "f32.ne"                              Compare       I32  F32  F32  ___  0  Mvp;
    F32Lt                         0x00 0x5d  "f32.lt"                              Compare       I32  F32  F32  ___  0  Mvp;
    F32Gt                         0x00 0x5e  "f32.gt"                              Compare       I32  F32  F32  ___  0  Mvp;
    F32Le                         0x00 0x5f  "f32.le"                              Compare       I32  F32  F32  ___  0  Mvp;
    F32Ge                         0x00 0x60  "f32.ge"                              Compare       I32  F32  F32  ___  0  Mvp;
    F64Eq                         0x00 0x61  "f64.eq"                              Compare       I32  F64  F64  ___  0  Mvp;
    F64Ne                         0x00 0x62  "f64.ne"                              Compare       I32  F64  F64  ___  0  Mvp;
    F64Lt                         0x00 0x63  "f64.lt"                              Compare       I32  F64  F64  ___  0  Mvp;
    F64Gt                         0x00 0x64  "f64.gt"                              Compare       I32  F64  F64  ___  0  Mvp;
    F64Le                         0x00 0x65  "f64.le"                              Compare       I32  F64  F64  ___  0  Mvp;
    F64Ge                         0x00 0x66  "f64.ge"                              Compare       I32  F64  F64  ___  0  Mvp;
    I32Clz                        0x00 0x67  "i32.clz"                             Unary         I32  I32  ___  ___  0  Mvp;
    I32Ctz                        0x00 0x68  "i32.ctz"                             Unary         I32  I32  ___  ___  0  Mvp;
    I32Popcnt                     0x00 0x69  "i32.popcnt"                          Unary         I32  I32  ___  ___  0  Mvp;
    I32Add                        0x00 0x6a  "i32.add"                             Binary        I32  I32  I32  ___  0  Mvp;
    I32Sub                        0x00 0x6b  "i32.sub"                             Binary        I32  I32  I32  ___  0  Mvp;
    I32Mul                        0x00 0x6c  "i32.mul"                             Binary        I32  I32  I32  ___  0  Mvp;
    I32DivS                       0x00 0x6d  "i32.div_s"                           Binary        I32  I32  I32  ___  0  Mvp;
    I32DivU                       0x00 0x6e  "i32.div_u"                           Binary        I32  I32  I32  ___  0  Mvp;
    I32RemS                       0x00 0x6f  "i32.rem_s"                           Binary        I32  I32  I32  ___  0  Mvp;
    I32RemU                       0x00 0x70  "i32.rem_u"                           Binary        I32  I32  I32  ___  0  Mvp;
    I32And                        0x00 0x71  "i32.and"                             Binary        I32  I32  I32  ___  0  Mvp;
    I32Or                         0x00 0x72  "i32.or"                              Binary        I32  I32  I32  ___  0  Mvp;
    I32Xor                        0x00 0x73  "i32.xor"                             Binary        I32  I32  I32  ___  0  Mvp;
    I32Shl                        0x00 0x74  "i32.shl"                             Binary        I32  I32  I32  ___  0  Mvp;
    I32ShrS                       0x00 0x75  "i32.shr_s"                           Binary        I32  I32  I32  ___  0  Mvp;
    I32ShrU                       0x00 0x76  "i32.shr_u"                           Binary        I32  I32  I32  ___  0  Mvp;
    I32Rotl                       0x00 0x77  "i32.rotl"                            Binary        I32  I32  I32  ___  0  Mvp;
    I32Rotr                       0x00 0x78  "i32.rotr"                            Binary        I32  I32  I32  ___  0  Mvp;
    I64Clz                        0x00 0x79  "i64.clz"                             Unary         I64  I64  ___  ___  0  Mvp;
    I64Ctz                        0x00 0x7a  "i64.ctz"                             Unary         I64  I64  ___  ___  0  Mvp;
    I64Popcnt                     0x00 0x7b  "i64.popcnt"                          Unary         I64  I64  ___  ___  0  Mvp;
    I64Add                        0x00 0x7c  "i64.add"                             Binary        I64  I64  I64  ___  0  Mvp;
    I64Sub                        0x00 0x7d  "i64.sub"                             Binary        I64  I64  I64  ___  0  Mvp;
    I64Mul                        0x00 0x7e  "i64.mul"                             Binary        I64  I64  I64  ___  0  Mvp;
    I64DivS                       0x00 0x7f  "i64.div_s"                           Binary        I64  I64  I64  ___  0  Mvp;
    I64DivU                       0x00 0x80  "i64.div_u"                           Binary        I64  I64  I64  ___  0  Mvp;
    I64RemS                       0x00 0x81  "i64.rem_s"                           Binary        I64  I64  I64  ___  0  Mvp;
    I64RemU                       0x00 0x82  "i64.rem_u"                           Binary        I64  I64  I64  ___  0  Mvp;
    I64And                        0x00 0x83  "i64.and"                             Binary        I64  I64  I64  ___  0  Mvp;
    I64Or                         0x00 0x84  "i64.or"                              Binary        I64  I64  I64  ___  0  Mvp;
    I64Xor                        0x00 0x85  "i64.xor"                             Binary        I64  I64  I64  ___  0  Mvp;
    I64Shl                        0x00 0x86  "i64.shl"                             Binary        I64  I64  I64  ___  0  Mvp;
    I64ShrS                       0x00 0x87  "i64.shr_s"                           Binary        I64  I64  I64  ___  0  Mvp;
    I64ShrU                       0x00 0x88  "i64.shr_u"                           Binary        I64  I64  I64  ___  0  Mvp;
    I64Rotl                       0x00 0x89  "i64.rotl"                            Binary        I64  I64  I64  ___  0  Mvp;
    I64Rotr                       0x00 0x8a  "i64.rotr"                            Binary        I64  I64  I64  ___  0  Mvp;
    F32Abs                        0x00 0x8b  "f32.abs"                             Unary         F32  F32  ___  ___  0  Mvp;
    F32Neg                        0x00 0x8c  "f32.neg"                             Unary         F32  F32  ___  ___  0  Mvp;
    F32Ceil                       0x00 0x8d  "f32.ceil"                            Unary         F32  F32  ___  ___  0  Mvp;
    F32Floor                      0x00 0x8e  "f32.floor"                           Unary         F32  F32  ___  ___  0  Mvp;
    F32Trunc                      0x00 0x8f  "f32.trunc"                           Unary         F32  F32  ___  ___  0  Mvp;
    F32Nearest                    0x00 0x90  "f32.nearest"                         Unary         F32  F32  ___  ___  0  Mvp;
    F32Sqrt                       0x00 0x91  "f32.sqrt"                            Unary         F32  F32  ___  ___  0  Mvp;
    F32Add                        0x00 0x92  "f32.add"                             Binary        F32  F32  F32  ___  0  Mvp;
    F32Sub                        0x00 0x93  "f32.sub"                             Binary        F32  F32  F32  ___  0  Mvp;
    F32Mul                        0x00 0x94  "f32.mul"                             Binary        F32  F32  F32  ___  0  Mvp;
    F32Div                        0x00 0x95  "f32.div"                             Binary        F32  F32  F32  ___  0  Mvp;
    F32Min                        0x00 0x96  "f32.min"                             Binary        F32  F32  F32  ___  0  Mvp;
    F32Max                        0x00 0x97  "f32.max"                             Binary        F32  F32  F32  ___  0  Mvp;
    F32Copysign                   0x00 0x98  "f32.copysign"                        Binary        F32  F32  F32  ___  0  Mvp;
    F64Abs                        0x00 0x99  "f64.abs"                             Unary         F64  F64  ___  ___  0  Mvp;
    F64Neg                        0x00 0x9a  "f64.neg"                             Unary         F64  F64  ___  ___  0  Mvp;
    F64Ceil                       0x00 0x9b  "f64.ceil"                            Unary         F64  F64  ___  ___  0  Mvp;
    F64Floor                      0x00 0x9c  "f64.floor"                           Unary         F64  F64  ___  ___  0  Mvp;
    F64Trunc                      0x00 0x9d  "f64.trunc"                           Unary         F64  F64  ___  ___  0  Mvp;
    F64Nearest                    0x00 0x9e  "f64.nearest"                         Unary         F64  F64  ___  ___  0  Mvp;
    F64Sqrt                       0x00 0x9f  "f64.sqrt"                            Unary         F64  F64  ___  ___  0  Mvp;
    F64Add                        0x00 0xa0  "f64.add"                             Binary        F64  F64  F64  ___  0  Mvp;
    F64Sub                        0x00 0xa1  "f64.sub"                             Binary        F64  F64  F64  ___  0  Mvp;
    F64Mul                        0x00 0xa2  "f64.mul"                             Binary        F64  F64  F64  ___  0  Mvp;
    F64Div                        0x00 0xa3  "f64.div"                             Binary        F64  F64  F64  ___  0  Mvp;
    F64Min                        0x00 0xa4  "f64.min"                             Binary        F64  F64  F64  ___  0  Mvp;
    F64Max                        0x00 0xa5  "f64.max"                             Binary        F64  F64  F64  ___  0  Mvp;
    F64Copysign                   0x00 0xa6  "f64.copysign"                        Binary        F64  F64  F64  ___  0  Mvp;
    I32WrapI64                    0x00 0xa7  "i32.wrap_i64"                        Convert       I32  I64  ___  ___  0  Mvp;
    I32TruncF32S                  0x00 0xa8  "i32.trunc_f32_s"                     Convert       I32  F32  ___  ___  0  Mvp;
    I32TruncF32U                  0x00 0xa9  "i32.trunc_f32_u"                     Convert       I32  F32  ___  ___  0  Mvp;
    I32TruncF64S                  0x00 0xaa  "i32.trunc_f64_s"                     Convert       I32  F64  ___  ___  0  Mvp;
    I32TruncF64U                  0x00 0xab  "i32.trunc_f64_u"                     Convert       I32  F64  ___  ___  0  Mvp;
    I64ExtendI32S                 0x00 0xac  "i64.extend_i32_s"                    Convert       I64  I32  ___  ___  0  Mvp;
    I64ExtendI32U                 0x00 0xad  "i64.extend_i32_u"                    Convert       I64  I32  ___  ___  0  Mvp;
    I64TruncF32S                  0x00 0xae  "i64.trunc_f32_s"                     Convert       I64  F32  ___  ___  0  Mvp;
    I64TruncF32U                  0x00 0xaf  "i64.trunc_f32_u"                     Convert       I64  F32  ___  ___  0  Mvp;
    I64TruncF64S                  0x00 0xb0  "i64.trunc_f64_s"                     Convert       I64  F64  ___  ___  0  Mvp;
    I64TruncF64U                  0x00 0xb1  "i64.trunc_f64_u"                     Convert       I64  F64  ___  ___  0  Mvp;
    F32ConvertI32S                0x00 0xb2  "f32.convert_i32_s"                   Convert       F32  I32  ___  ___  0  Mvp;
    F32ConvertI32U                0x00 0xb3  "f32.convert_i32_u"                   Convert       F32  I32  ___  ___  0  Mvp;
    F32ConvertI64S                0x00 0xb4  "f32.convert_i64_s"                   Convert       F32  I64  ___  ___  0  Mvp;
    F32ConvertI64U                0x00 0xb5  "f32.convert_i64_u"                   Convert       F32  I64  ___  ___  0  Mvp;
    F32DemoteF64                  0x00 0xb6  "f32.demote_f64"                      Convert       F32  F64  ___  ___  0  Mvp;
    F64ConvertI32S                0x00 0xb7  "f64.convert_i32_s"                   Convert       F64  I32  ___  ___  0  Mvp;
    F64ConvertI32U                0x00 0xb8  "f64.convert_i32_u"                   Convert       F64  I32  ___  ___  0  Mvp;
    F64ConvertI64S                0x00 0xb9  "f64.convert_i64_s"                   Convert       F64  I64  ___  ___  0  Mvp;
    F64ConvertI64U                0x00 0xba  "f64.convert_i64_u"                   Convert       F64  I64  ___  ___  0  Mvp;
    F64PromoteF32                 0x00 0xbb  "f64.promote_f32"                     Convert       F64  F32  ___  ___  0  Mvp;
    I32ReinterpretF32             0x00 0xbc  "i32.reinterpret_f32"                 Convert       I32  F32  ___  ___  0  Mvp;
    I64ReinterpretF64             0x00 0xbd  "i64.reinterpret_f64"                 Convert       I64  F64  ___  ___  0  Mvp;
    F32ReinterpretI32             0x00 0xbe  "f32.reinterpret_i32"                 Convert       F32  I32  ___  ___  0  Mvp;
    F64ReinterpretI64             0x00 0xbf  "f64.reinterpret_i64"                 Convert       F64  I64  ___  ___  0  Mvp;
    I32Extend8S                   0x00 0xc0  "i32.extend8_s"                       Unary         I32  I32  ___  ___  0  SignExtension;
    I32Extend16S                  0x00 0xc1  "i32.extend16_s"                      Unary         I32  I32  ___  ___  0  SignExtension;
    I64Extend8S                   0x00 0xc2  "i64.extend8_s"                       Unary         I64  I64  ___  ___  0  SignExtension;
    I64Extend16S                  0x00 0xc3  "i64.extend16_s"                      Unary         I64  I64  ___  ___  0  SignExtension;
    I64Extend32S                  0x00 0xc4  "i64.extend32_s"                      Unary         I64  I64  ___  ___  0  SignExtension;
    RefNull                       0x00 0xd0  "ref.null"                            Other         ___  ___  ___  ___  0  ReferenceTypes;
    RefIsNull                     0x00 0xd1  "ref.is_null"                         Other         ___  ___  ___  ___  0  ReferenceTypes;
    RefFunc                       0x00 0xd2  "ref.func"                            Other         ___  ___  ___  ___  0  ReferenceTypes;
    RefEq                         0x00 0xd3  "ref.eq"                              Other         ___  ___  ___  ___  0  Gc;
    RefAsNonNull                  0x00 0xd4  "ref.as_non_null"                     Other         ___  ___  ___  ___  0  FunctionReferences;
    BrOnNull                      0x00 0xd5  "br_on_null"                          Other         ___  ___  ___  ___  0  FunctionReferences;
    BrOnNonNull                   0x00 0xd6  "br_on_non_null"                      Other         ___  ___  ___  ___  0  FunctionReferences;
    StructNew                     0xfb 0x00  "struct.new"                          Other         ___  ___  ___  ___  0  Gc;
    StructNewDefault              0xfb 0x01  "struct.new_default"                  Other         ___  ___  ___  ___  0  Gc;
    StructGet                     0xfb 0x02  "struct.get"                          Other         ___  ___  ___  ___  0  Gc;
    StructGetS                    0xfb 0x03  "struct.get_s"                        Other         ___  ___  ___  ___  0  Gc;
    StructGetU                    0xfb 0x04  "struct.get_u"                        Other         ___  ___  ___  ___  0  Gc;
    StructSet                     0xfb 0x05  "struct.set"                          Other         ___  ___  ___  ___  0  Gc;
    ArrayNew                      0xfb 0x06  "array.new"                           Other         ___  ___  ___  ___  0  Gc;
    ArrayNewDefault               0xfb 0x07  "array.new_default"                   Other         ___  ___  ___  ___  0  Gc;
    ArrayNewFixed                 0xfb 0x08  "array.new_fixed"                     Other         ___  ___  ___  ___  0  Gc;
    ArrayNewData                  0xfb 0x09  "array.new_data"                      Other         ___  ___  ___  ___  0  Gc;
    ArrayNewElem                  0xfb 0x0a  "array.new_elem"                      Other         ___  ___  ___  ___  0  Gc;
    ArrayGet                      0xfb 0x0b  "array.get"                           Other         ___  ___  ___  ___  0  Gc;
    ArrayGetS                     0xfb 0x0c  "array.get_s"                         Other         ___  ___  ___  ___  0  Gc;
    ArrayGetU                     0xfb 0x0d  "array.get_u"                         Other         ___  ___  ___  ___  0  Gc;
    ArraySet                      0xfb 0x0e  "array.set"                           Other         ___  ___  ___  ___  0  Gc;
    ArrayLen                      0xfb 0x0f  "array.len"                           Other         ___  ___  ___  ___  0  Gc;
    ArrayFill                     0xfb 0x10  "array.fill"                          Other         ___  ___  ___  ___  0  Gc;
    ArrayCopy                     0xfb 0x11  "array.copy"                          Other         ___  ___  ___  ___  0  Gc;
    ArrayInitData                 0xfb 0x12  "array.init_data"                     Other         ___  ___  ___  ___  0  Gc;
    ArrayInitElem                 0xfb 0x13  "array.init_elem"                     Other         ___  ___  ___  ___  0  Gc;
    RefTest                       0xfb 0x14  "ref.test"                            Other         ___  ___  ___  ___  0  Gc;
    RefTestNull                   0xfb 0x15  "ref.test"                            Other         ___  ___  ___  ___  0  Gc;
    RefCast                       0xfb 0x16  "ref.cast"                            Other         ___  ___  ___  ___  0  Gc;
    RefCastNull                   0xfb 0x17  "ref.cast"                            Other         ___  ___  ___  ___  0  Gc;
    BrOnCast                      0xfb 0x18  "br_on_cast"                          Other         ___  ___  ___  ___  0  Gc;
    BrOnCastFail                  0xfb 0x19  "br_on_cast_fail"                     Other         ___  ___  ___  ___  0  Gc;
    AnyConvertExtern              0xfb 0x1a  "any.convert_extern"                  Other         ___  ___  ___  ___  0  Gc;
    ExternConvertAny              0xfb 0x1b  "extern.convert_any"                  Other         ___  ___  ___  ___  0  Gc;
    RefI31                        0xfb 0x1c  "ref.i31"                             Other         ___  ___  ___  ___  0  Gc;
    I31GetS                       0xfb 0x1d  "i31.get_s"                           Other         ___  ___  ___  ___  0  Gc;
    I31GetU                       0xfb 0x1e  "i31.get_u"                           Other         ___  ___  ___  ___  0  Gc;
    I32TruncSatF32S               0xfc 0x00  "i32.trunc_sat_f32_s"                 Convert       I32  F32  ___  ___  0  SatFloatToInt;
    I32TruncSatF32U               0xfc 0x01  "i32.trunc_sat_f32_u"                 Convert       I32  F32  ___  ___  0  SatFloatToInt;
    I32TruncSatF64S               0xfc 0x02  "i32.trunc_sat_f64_s"                 Convert       I32  F64  ___  ___  0  SatFloatToInt;
    I32TruncSatF64U               0xfc 0x03  "i32.trunc_sat_f64_u"                 Convert       I32  F64  ___  ___  0  SatFloatToInt;
    I64TruncSatF32S               0xfc 0x04  "i64.trunc_sat_f32_s"                 Convert       I64  F32  ___  ___  0  SatFloatToInt;
    I64TruncSatF32U               0xfc 0x05  "i64.trunc_sat_f32_u"                 Convert       I64  F32  ___  ___  0  SatFloatToInt;
    I64TruncSatF64S               0xfc 0x06  "i64.trunc_sat_f64_s"                 Convert       I64  F64  ___  ___  0  SatFloatToInt;
    I64TruncSatF64U               0xfc 0x07  "i64.trunc_sat_f64_u"                 Convert       I64  F64  ___  ___  0  SatFloatToInt;
    MemoryInit                    0xfc 0x08  "memory.init"                         Other         ___  ___  ___  ___  0  BulkMemory;
    DataDrop                      0xfc 0x09  "data.drop"                           Other         ___  ___  ___  ___  0  BulkMemory;
    MemoryCopy                    0xfc 0x0a  "memory.copy"                         Other         ___  ___  ___  ___  0  BulkMemory;
    MemoryFill                    0xfc 0x0b  "memory.fill"                         Other         ___  ___  ___  ___  0  BulkMemory;
    TableInit                     0xfc 0x0c  "table.init"                          Other         ___  ___  ___  ___  0  BulkMemory;
    ElemDrop                      0xfc 0x0d  "elem.drop"                           Other         ___  ___  ___  ___  0  BulkMemory;
    TableCopy                     0xfc 0x0e  "table.copy"                          Other         ___  ___  ___  ___  0  BulkMemory;
    TableGrow                     0xfc 0x0f  "table.grow"                          Other         ___  ___  ___  ___  0  ReferenceTypes;
    TableSize                     0xfc 0x10  "table.size"                          Other         ___  ___  ___  ___  0  ReferenceTypes;
    TableFill                     0xfc 0x11  "table.fill"                          Other         ___  ___  ___  ___  0  ReferenceTypes;
    V128Load                      0xfd 0x00  "v128.load"                           Load          V128 I32  ___  ___  16 Simd;
    V128Load8x8S                  0xfd 0x01  "v128.load8x8_s"                      Load          V128 I32  ___  ___  8  Simd;
    V128Load8x8U                  0xfd 0x02  "v128.load8x8_u"                      Load          V128 I32  ___  ___  8  Simd;
    V128Load16x4S                 0xfd 0x03  "v128.load16x4_s"                     Load          V128 I32  ___  ___  8  Simd;
    V128Load16x4U                 0xfd 0x04  "v128.load16x4_u"                     Load          V128 I32  ___  ___  8  Simd;
    V128Load32x2S                 0xfd 0x05  "v128.load32x2_s"                     Load          V128 I32  ___  ___  8  Simd;
    V128Load32x2U                 0xfd 0x06  "v128.load32x2_u"                     Load          V128 I32  ___  ___  8  Simd;
    V128Load8Splat                0xfd 0x07  "v128.load8_splat"                    LoadSplat     V128 I32  ___  ___  1  Simd;
    V128Load16Splat               0xfd 0x08  "v128.load16_splat"                   LoadSplat     V128 I32  ___  ___  2  Simd;
    V128Load32Splat               0xfd 0x09  "v128.load32_splat"                   LoadSplat     V128 I32  ___  ___  4  Simd;
    V128Load64Splat               0xfd 0x0a  "v128.load64_splat"                   LoadSplat     V128 I32  ___  ___  8  Simd;
    V128Store                     0xfd 0x0b  "v128.store"                          Store         ___  I32  V128 ___  16 Simd;
    V128Const                     0xfd 0x0c  "v128.const"                          Other         V128 ___  ___  ___  0  Simd;
    I8x16Shuffle                  0xfd 0x0d  "i8x16.shuffle"                       Other         V128 V128 V128 ___  0  Simd;
    I8x16Swizzle                  0xfd 0x0e  "i8x16.swizzle"                       Binary        V128 V128 V128 ___  0  Simd;
    I8x16Splat                    0xfd 0x0f  "i8x16.splat"                         Unary         V128 I32  ___  ___  0  Simd;
    I16x8Splat                    0xfd 0x10  "i16x8.splat"                         Unary         V128 I32  ___  ___  0  Simd;
    I32x4Splat                    0xfd 0x11  "i32x4.splat"                         Unary         V128 I32  ___  ___  0  Simd;
    I64x2Splat                    0xfd 0x12  "i64x2.splat"                         Unary         V128 I64  ___  ___  0  Simd;
    F32x4Splat                    0xfd 0x13  "f32x4.splat"                         Unary         V128 F32  ___  ___  0  Simd;
    F64x2Splat                    0xfd 0x14  "f64x2.splat"                         Unary         V128 F64  ___  ___  0  Simd;
    I8x16ExtractLaneS             0xfd 0x15  "i8x16.extract_lane_s"                LaneOp        I32  V128 ___  ___  0  Simd;
    I8x16ExtractLaneU             0xfd 0x16  "i8x16.extract_lane_u"                LaneOp        I32  V128 ___  ___  0  Simd;
    I8x16ReplaceLane              0xfd 0x17  "i8x16.replace_lane"                  LaneOp        V128 V128 I32  ___  0  Simd;
    I16x8ExtractLaneS             0xfd 0x18  "i16x8.extract_lane_s"                LaneOp        I32  V128 ___  ___  0  Simd;
    I16x8ExtractLaneU             0xfd 0x19  "i16x8.extract_lane_u"                LaneOp        I32  V128 ___  ___  0  Simd;
    I16x8ReplaceLane              0xfd 0x1a  "i16x8.replace_lane"                  LaneOp        V128 V128 I32  ___  0  Simd;
    I32x4ExtractLane              0xfd 0x1b  "i32x4.extract_lane"                  LaneOp        I32  V128 ___  ___  0  Simd;
    I32x4ReplaceLane              0xfd 0x1c  "i32x4.replace_lane"                  LaneOp        V128 V128 I32  ___  0  Simd;
    I64x2ExtractLane              0xfd 0x1d  "i64x2.extract_lane"                  LaneOp        I64  V128 ___  ___  0  Simd;
    I64x2ReplaceLane              0xfd 0x1e  "i64x2.replace_lane"                  LaneOp        V128 V128 I64  ___  0  Simd;
    F32x4ExtractLane              0xfd 0x1f  "f32x4.extract_lane"                  LaneOp        F32  V128 ___  ___  0  Simd;
    F32x4ReplaceLane              0xfd 0x20  "f32x4.replace_lane"                  LaneOp        V128 V128 F32  ___  0  Simd;
    F64x2ExtractLane              0xfd 0x21  "f64x2.extract_lane"                  LaneOp        F64  V128 ___  ___  0  Simd;
    F64x2ReplaceLane              0xfd 0x22  "f64x2.replace_lane"                  LaneOp        V128 V128 F64  ___  0  Simd;
    I8x16Eq                       0xfd 0x23  "i8x16.eq"                            Compare       V128 V128 V128 ___  0  Simd;
    I8x16Ne                       0xfd 0x24  "i8x16.ne"                            Compare       V128 V128 V128 ___  0  Simd;
    I8x16LtS                      0xfd 0x25  "i8x16.lt_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I8x16LtU                      0xfd 0x26  "i8x16.lt_u"                          Compare       V128 V128 V128 ___  0  Simd;
    I8x16GtS                      0xfd 0x27  "i8x16.gt_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I8x16GtU                      0xfd 0x28  "i8x16.gt_u"                          Compare       V128 V128 V128 ___  0  Simd;
    I8x16LeS                      0xfd 0x29  "i8x16.le_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I8x16LeU                      0xfd 0x2a  "i8x16.le_u"                          Compare       V128 V128 V128 ___  0  Simd;
    I8x16GeS                      0xfd 0x2b  "i8x16.ge_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I8x16GeU                      0xfd 0x2c  "i8x16.ge_u"                          Compare       V128 V128 V128 ___  0  Simd;
    I16x8Eq                       0xfd 0x2d  "i16x8.eq"                            Compare       V128 V128 V128 ___  0  Simd;
    I16x8Ne                       0xfd 0x2e  "i16x8.ne"                            Compare       V128 V128 V128 ___  0  Simd;
    I16x8LtS                      0xfd 0x2f  "i16x8.lt_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I16x8LtU                      0xfd 0x30  "i16x8.lt_u"                          Compare       V128 V128 V128 ___  0  Simd;
    I16x8GtS                      0xfd 0x31  "i16x8.gt_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I16x8GtU                      0xfd 0x32  "i16x8.gt_u"                          Compare       V128 V128 V128 ___  0  Simd;
    I16x8LeS                      0xfd 0x33  "i16x8.le_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I16x8LeU                      0xfd 0x34  "i16x8.le_u"                          Compare       V128 V128 V128 ___  0  Simd;
    I16x8GeS                      0xfd 0x35  "i16x8.ge_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I16x8GeU                      0xfd 0x36  "i16x8.ge_u"                          Compare       V128 V128 V128 ___  0  Simd;
    I32x4Eq                       0xfd 0x37  "i32x4.eq"                            Compare       V128 V128 V128 ___  0  Simd;
    I32x4Ne                       0xfd 0x38  "i32x4.ne"                            Compare       V128 V128 V128 ___  0  Simd;
    I32x4LtS                      0xfd 0x39  "i32x4.lt_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I32x4LtU                      0xfd 0x3a  "i32x4.lt_u"                          Compare       V128 V128 V128 ___  0  Simd;
    I32x4GtS                      0xfd 0x3b  "i32x4.gt_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I32x4GtU                      0xfd 0x3c  "i32x4.gt_u"                          Compare       V128 V128 V128 ___  0  Simd;
    I32x4LeS                      0xfd 0x3d  "i32x4.le_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I32x4LeU                      0xfd 0x3e  "i32x4.le_u"                          Compare       V128 V128 V128 ___  0  Simd;
    I32x4GeS                      0xfd 0x3f  "i32x4.ge_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I32x4GeU                      0xfd 0x40  "i32x4.ge_u"                          Compare       V128 V128 V128 ___  0  Simd;
    F32x4Eq                       0xfd 0x41  "f32x4.eq"                            Compare       V128 V128 V128 ___  0  Simd;
    F32x4Ne                       0xfd 0x42  "f32x4.ne"                            Compare       V128 V128 V128 ___  0  Simd;
    F32x4Lt                       0xfd 0x43  "f32x4.lt"                            Compare       V128 V128 V128 ___  0  Simd;
    F32x4Gt                       0xfd 0x44  "f32x4.gt"                            Compare       V128 V128 V128 ___  0  Simd;
    F32x4Le                       0xfd 0x45  "f32x4.le"                            Compare       V128 V128 V128 ___  0  Simd;
    F32x4Ge                       0xfd 0x46  "f32x4.ge"                            Compare       V128 V128 V128 ___  0  Simd;
    F64x2Eq                       0xfd 0x47  "f64x2.eq"                            Compare       V128 V128 V128 ___  0  Simd;
    F64x2Ne                       0xfd 0x48  "f64x2.ne"                            Compare       V128 V128 V128 ___  0  Simd;
    F64x2Lt                       0xfd 0x49  "f64x2.lt"                            Compare       V128 V128 V128 ___  0  Simd;
    F64x2Gt                       0xfd 0x4a  "f64x2.gt"                            Compare       V128 V128 V128 ___  0  Simd;
    F64x2Le                       0xfd 0x4b  "f64x2.le"                            Compare       V128 V128 V128 ___  0  Simd;
    F64x2Ge                       0xfd 0x4c  "f64x2.ge"                            Compare       V128 V128 V128 ___  0  Simd;
    V128Not                       0xfd 0x4d  "v128.not"                            Unary         V128 V128 ___  ___  0  Simd;
    V128And                       0xfd 0x4e  "v128.and"                            Binary        V128 V128 V128 ___  0  Simd;
    V128Andnot                    0xfd 0x4f  "v128.andnot"                         Binary        V128 V128 V128 ___  0  Simd;
    V128Or                        0xfd 0x50  "v128.or"                             Binary        V128 V128 V128 ___  0  Simd;
    V128Xor                       0xfd 0x51  "v128.xor"                            Binary        V128 V128 V128 ___  0  Simd;
    V128Bitselect                 0xfd 0x52  "v128.bitselect"                      Ternary       V128 V128 V128 V128 0  Simd;
    V128AnyTrue                   0xfd 0x53  "v128.any_true"                       Unary         I32  V128 ___  ___  0  Simd;
    V128Load8Lane                 0xfd 0x54  "v128.load8_lane"                     LoadLane      V128 I32  V128 ___  1  Simd;
    V128Load16Lane                0xfd 0x55  "v128.load16_lane"                    LoadLane      V128 I32  V128 ___  2  Simd;
    V128Load32Lane                0xfd 0x56  "v128.load32_lane"                    LoadLane      V128 I32  V128 ___  4  Simd;
    V128Load64Lane                0xfd 0x57  "v128.load64_lane"                    LoadLane      V128 I32  V128 ___  8  Simd;
    V128Store8Lane                0xfd 0x58  "v128.store8_lane"                    StoreLane     ___  I32  V128 ___  1  Simd;
    V128Store16Lane               0xfd 0x59  "v128.store16_lane"                   StoreLane     ___  I32  V128 ___  2  Simd;
    V128Store32Lane               0xfd 0x5a  "v128.store32_lane"                   StoreLane     ___  I32  V128 ___  4  Simd;
    V128Store64Lane               0xfd 0x5b  "v128.store64_lane"                   StoreLane     ___  I32  V128 ___  8  Simd;
    V128Load32Zero                0xfd 0x5c  "v128.load32_zero"                    LoadZero      V128 I32  ___  ___  4  Simd;
    V128Load64Zero                0xfd 0x5d  "v128.load64_zero"                    LoadZero      V128 I32  ___  ___  8  Simd;
    F32x4DemoteF64x2Zero          0xfd 0x5e  "f32x4.demote_f64x2_zero"             Unary         V128 V128 ___  ___  0  Simd;
    F64x2PromoteLowF32x4          0xfd 0x5f  "f64x2.promote_low_f32x4"             Unary         V128 V128 ___  ___  0  Simd;
    I8x16Abs                      0xfd 0x60  "i8x16.abs"                           Unary         V128 V128 ___  ___  0  Simd;
    I8x16Neg                      0xfd 0x61  "i8x16.neg"                           Unary         V128 V128 ___  ___  0  Simd;
    I8x16Popcnt                   0xfd 0x62  "i8x16.popcnt"                        Unary         V128 V128 ___  ___  0  Simd;
    I8x16AllTrue                  0xfd 0x63  "i8x16.all_true"                      Unary         I32  V128 ___  ___  0  Simd;
    I8x16Bitmask                  0xfd 0x64  "i8x16.bitmask"                       Unary         I32  V128 ___  ___  0  Simd;
    I8x16NarrowI16x8S             0xfd 0x65  "i8x16.narrow_i16x8_s"                Binary        V128 V128 V128 ___  0  Simd;
    I8x16NarrowI16x8U             0xfd 0x66  "i8x16.narrow_i16x8_u"                Binary        V128 V128 V128 ___  0  Simd;
    F32x4Ceil                     0xfd 0x67  "f32x4.ceil"                          Unary         V128 V128 ___  ___  0  Simd;
    F32x4Floor                    0xfd 0x68  "f32x4.floor"                         Unary         V128 V128 ___  ___  0  Simd;
    F32x4Trunc                    0xfd 0x69  "f32x4.trunc"                         Unary         V128 V128 ___  ___  0  Simd;
    F32x4Nearest                  0xfd 0x6a  "f32x4.nearest"                       Unary         V128 V128 ___  ___  0  Simd;
    I8x16Shl                      0xfd 0x6b  "i8x16.shl"                           Binary        V128 V128 I32  ___  0  Simd;
    I8x16ShrS                     0xfd 0x6c  "i8x16.shr_s"                         Binary        V128 V128 I32  ___  0  Simd;
    I8x16ShrU                     0xfd 0x6d  "i8x16.shr_u"                         Binary        V128 V128 I32  ___  0  Simd;
    I8x16Add                      0xfd 0x6e  "i8x16.add"                           Binary        V128 V128 V128 ___  0  Simd;
    I8x16AddSatS                  0xfd 0x6f  "i8x16.add_sat_s"                     Binary        V128 V128 V128 ___  0  Simd;
    I8x16AddSatU                  0xfd 0x70  "i8x16.add_sat_u"                     Binary        V128 V128 V128 ___  0  Simd;
    I8x16Sub                      0xfd 0x71  "i8x16.sub"                           Binary        V128 V128 V128 ___  0  Simd;
    I8x16SubSatS                  0xfd 0x72  "i8x16.sub_sat_s"                     Binary        V128 V128 V128 ___  0  Simd;
    I8x16SubSatU                  0xfd 0x73  "i8x16.sub_sat_u"                     Binary        V128 V128 V128 ___  0  Simd;
    F64x2Ceil                     0xfd 0x74  "f64x2.ceil"                          Unary         V128 V128 ___  ___  0  Simd;
    F64x2Floor                    0xfd 0x75  "f64x2.floor"                         Unary         V128 V128 ___  ___  0  Simd;
    I8x16MinS                     0xfd 0x76  "i8x16.min_s"                         Binary        V128 V128 V128 ___  0  Simd;
    I8x16MinU                     0xfd 0x77  "i8x16.min_u"                         Binary        V128 V128 V128 ___  0  Simd;
    I8x16MaxS                     0xfd 0x78  "i8x16.max_s"                         Binary        V128 V128 V128 ___  0  Simd;
    I8x16MaxU                     0xfd 0x79  "i8x16.max_u"                         Binary        V128 V128 V128 ___  0  Simd;
    F64x2Trunc                    0xfd 0x7a  "f64x2.trunc"                         Unary         V128 V128 ___  ___  0  Simd;
    I8x16AvgrU                    0xfd 0x7b  "i8x16.avgr_u"                        Binary        V128 V128 V128 ___  0  Simd;
    I16x8ExtaddPairwiseI8x16S     0xfd 0x7c  "i16x8.extadd_pairwise_i8x16_s"       Unary         V128 V128 ___  ___  0  Simd;
    I16x8ExtaddPairwiseI8x16U     0xfd 0x7d  "i16x8.extadd_pairwise_i8x16_u"       Unary         V128 V128 ___  ___  0  Simd;
    I32x4ExtaddPairwiseI16x8S     0xfd 0x7e  "i32x4.extadd_pairwise_i16x8_s"       Unary         V128 V128 ___  ___  0  Simd;
    I32x4ExtaddPairwiseI16x8U     0xfd 0x7f  "i32x4.extadd_pairwise_i16x8_u"       Unary         V128 V128 ___  ___  0  Simd;
    I16x8Abs                      0xfd 0x80  "i16x8.abs"                           Unary         V128 V128 ___  ___  0  Simd;
    I16x8Neg                      0xfd 0x81  "i16x8.neg"                           Unary         V128 V128 ___  ___  0  Simd;
    I16x8Q15mulrSatS              0xfd 0x82  "i16x8.q15mulr_sat_s"                 Binary        V128 V128 V128 ___  0  Simd;
    I16x8AllTrue                  0xfd 0x83  "i16x8.all_true"                      Unary         I32  V128 ___  ___  0  Simd;
    I16x8Bitmask                  0xfd 0x84  "i16x8.bitmask"                       Unary         I32  V128 ___  ___  0  Simd;
    I16x8NarrowI32x4S             0xfd 0x85  "i16x8.narrow_i32x4_s"                Binary        V128 V128 V128 ___  0  Simd;
    I16x8NarrowI32x4U             0xfd 0x86  "i16x8.narrow_i32x4_u"                Binary        V128 V128 V128 ___  0  Simd;
    I16x8ExtendLowI8x16S          0xfd 0x87  "i16x8.extend_low_i8x16_s"            Unary         V128 V128 ___  ___  0  Simd;
    I16x8ExtendHighI8x16S         0xfd 0x88  "i16x8.extend_high_i8x16_s"           Unary         V128 V128 ___  ___  0  Simd;
    I16x8ExtendLowI8x16U          0xfd 0x89  "i16x8.extend_low_i8x16_u"            Unary         V128 V128 ___  ___  0  Simd;
    I16x8ExtendHighI8x16U         0xfd 0x8a  "i16x8.extend_high_i8x16_u"           Unary         V128 V128 ___  ___  0  Simd;
    I16x8Shl                      0xfd 0x8b  "i16x8.shl"                           Binary        V128 V128 I32  ___  0  Simd;
    I16x8ShrS                     0xfd 0x8c  "i16x8.shr_s"                         Binary        V128 V128 I32  ___  0  Simd;
    I16x8ShrU                     0xfd 0x8d  "i16x8.shr_u"                         Binary        V128 V128 I32  ___  0  Simd;
    I16x8Add                      0xfd 0x8e  "i16x8.add"                           Binary        V128 V128 V128 ___  0  Simd;
    I16x8AddSatS                  0xfd 0x8f  "i16x8.add_sat_s"                     Binary        V128 V128 V128 ___  0  Simd;
    I16x8AddSatU                  0xfd 0x90  "i16x8.add_sat_u"                     Binary        V128 V128 V128 ___  0  Simd;
    I16x8Sub                      0xfd 0x91  "i16x8.sub"                           Binary        V128 V128 V128 ___  0  Simd;
    I16x8SubSatS                  0xfd 0x92  "i16x8.sub_sat_s"                     Binary        V128 V128 V128 ___  0  Simd;
    I16x8SubSatU                  0xfd 0x93  "i16x8.sub_sat_u"                     Binary        V128 V128 V128 ___  0  Simd;
    F64x2Nearest                  0xfd 0x94  "f64x2.nearest"                       Unary         V128 V128 ___  ___  0  Simd;
    I16x8Mul                      0xfd 0x95  "i16x8.mul"                           Binary        V128 V128 V128 ___  0  Simd;
    I16x8MinS                     0xfd 0x96  "i16x8.min_s"                         Binary        V128 V128 V128 ___  0  Simd;
    I16x8MinU                     0xfd 0x97  "i16x8.min_u"                         Binary        V128 V128 V128 ___  0  Simd;
    I16x8MaxS                     0xfd 0x98  "i16x8.max_s"                         Binary        V128 V128 V128 ___  0  Simd;
    I16x8MaxU                     0xfd 0x99  "i16x8.max_u"                         Binary        V128 V128 V128 ___  0  Simd;
    I16x8AvgrU                    0xfd 0x9b  "i16x8.avgr_u"                        Binary        V128 V128 V128 ___  0  Simd;
    I16x8ExtmulLowI8x16S          0xfd 0x9c  "i16x8.extmul_low_i8x16_s"            Binary        V128 V128 V128 ___  0  Simd;
    I16x8ExtmulHighI8x16S         0xfd 0x9d  "i16x8.extmul_high_i8x16_s"           Binary        V128 V128 V128 ___  0  Simd;
    I16x8ExtmulLowI8x16U          0xfd 0x9e  "i16x8.extmul_low_i8x16_u"            Binary        V128 V128 V128 ___  0  Simd;
    I16x8ExtmulHighI8x16U         0xfd 0x9f  "i16x8.extmul_high_i8x16_u"           Binary        V128 V128 V128 ___  0  Simd;
    I32x4Abs                      0xfd 0xa0  "i32x4.abs"                           Unary         V128 V128 ___  ___  0  Simd;
    I32x4Neg                      0xfd 0xa1  "i32x4.neg"                           Unary         V128 V128 ___  ___  0  Simd;
    I32x4AllTrue                  0xfd 0xa3  "i32x4.all_true"                      Unary         I32  V128 ___  ___  0  Simd;
    I32x4Bitmask                  0xfd 0xa4  "i32x4.bitmask"                       Unary         I32  V128 ___  ___  0  Simd;
    I32x4ExtendLowI16x8S          0xfd 0xa7  "i32x4.extend_low_i16x8_s"            Unary         V128 V128 ___  ___  0  Simd;
    I32x4ExtendHighI16x8S         0xfd 0xa8  "i32x4.extend_high_i16x8_s"           Unary         V128 V128 ___  ___  0  Simd;
    I32x4ExtendLowI16x8U          0xfd 0xa9  "i32x4.extend_low_i16x8_u"            Unary         V128 V128 ___  ___  0  Simd;
    I32x4ExtendHighI16x8U         0xfd 0xaa  "i32x4.extend_high_i16x8_u"           Unary         V128 V128 ___  ___  0  Simd;
    I32x4Shl                      0xfd 0xab  "i32x4.shl"                           Binary        V128 V128 I32  ___  0  Simd;
    I32x4ShrS                     0xfd 0xac  "i32x4.shr_s"                         Binary        V128 V128 I32  ___  0  Simd;
    I32x4ShrU                     0xfd 0xad  "i32x4.shr_u"                         Binary        V128 V128 I32  ___  0  Simd;
    I32x4Add                      0xfd 0xae  "i32x4.add"                           Binary        V128 V128 V128 ___  0  Simd;
    I32x4Sub                      0xfd 0xb1  "i32x4.sub"                           Binary        V128 V128 V128 ___  0  Simd;
    I32x4Mul                      0xfd 0xb5  "i32x4.mul"                           Binary        V128 V128 V128 ___  0  Simd;
    I32x4MinS                     0xfd 0xb6  "i32x4.min_s"                         Binary        V128 V128 V128 ___  0  Simd;
    I32x4MinU                     0xfd 0xb7  "i32x4.min_u"                         Binary        V128 V128 V128 ___  0  Simd;
    I32x4MaxS                     0xfd 0xb8  "i32x4.max_s"                         Binary        V128 V128 V128 ___  0  Simd;
    I32x4MaxU                     0xfd 0xb9  "i32x4.max_u"                         Binary        V128 V128 V128 ___  0  Simd;
    I32x4DotI16x8S                0xfd 0xba  "i32x4.dot_i16x8_s"                   Binary        V128 V128 V128 ___  0  Simd;
    I32x4ExtmulLowI16x8S          0xfd 0xbc  "i32x4.extmul_low_i16x8_s"            Binary        V128 V128 V128 ___  0  Simd;
    I32x4ExtmulHighI16x8S         0xfd 0xbd  "i32x4.extmul_high_i16x8_s"           Binary        V128 V128 V128 ___  0  Simd;
    I32x4ExtmulLowI16x8U          0xfd 0xbe  "i32x4.extmul_low_i16x8_u"            Binary        V128 V128 V128 ___  0  Simd;
    I32x4ExtmulHighI16x8U         0xfd 0xbf  "i32x4.extmul_high_i16x8_u"           Binary        V128 V128 V128 ___  0  Simd;
    I64x2Abs                      0xfd 0xc0  "i64x2.abs"                           Unary         V128 V128 ___  ___  0  Simd;
    I64x2Neg                      0xfd 0xc1  "i64x2.neg"                           Unary         V128 V128 ___  ___  0  Simd;
    I64x2AllTrue                  0xfd 0xc3  "i64x2.all_true"                      Unary         I32  V128 ___  ___  0  Simd;
    I64x2Bitmask                  0xfd 0xc4  "i64x2.bitmask"                       Unary         I32  V128 ___  ___  0  Simd;
    I64x2ExtendLowI32x4S          0xfd 0xc7  "i64x2.extend_low_i32x4_s"            Unary         V128 V128 ___  ___  0  Simd;
    I64x2ExtendHighI32x4S         0xfd 0xc8  "i64x2.extend_high_i32x4_s"           Unary         V128 V128 ___  ___  0  Simd;
    I64x2ExtendLowI32x4U          0xfd 0xc9  "i64x2.extend_low_i32x4_u"            Unary         V128 V128 ___  ___  0  Simd;
    I64x2ExtendHighI32x4U         0xfd 0xca  "i64x2.extend_high_i32x4_u"           Unary         V128 V128 ___  ___  0  Simd;
    I64x2Shl                      0xfd 0xcb  "i64x2.shl"                           Binary        V128 V128 I32  ___  0  Simd;
    I64x2ShrS                     0xfd 0xcc  "i64x2.shr_s"                         Binary        V128 V128 I32  ___  0  Simd;
    I64x2ShrU                     0xfd 0xcd  "i64x2.shr_u"                         Binary        V128 V128 I32  ___  0  Simd;
    I64x2Add                      0xfd 0xce  "i64x2.add"                           Binary        V128 V128 V128 ___  0  Simd;
    I64x2Sub                      0xfd 0xd1  "i64x2.sub"                           Binary        V128 V128 V128 ___  0  Simd;
    I64x2Mul                      0xfd 0xd5  "i64x2.mul"                           Binary        V128 V128 V128 ___  0  Simd;
    I64x2Eq                       0xfd 0xd6  "i64x2.eq"                            Compare       V128 V128 V128 ___  0  Simd;
    I64x2Ne                       0xfd 0xd7  "i64x2.ne"                            Compare       V128 V128 V128 ___  0  Simd;
    I64x2LtS                      0xfd 0xd8  "i64x2.lt_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I64x2GtS                      0xfd 0xd9  "i64x2.gt_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I64x2LeS                      0xfd 0xda  "i64x2.le_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I64x2GeS                      0xfd 0xdb  "i64x2.ge_s"                          Compare       V128 V128 V128 ___  0  Simd;
    I64x2ExtmulLowI32x4S          0xfd 0xdc  "i64x2.extmul_low_i32x4_s"            Binary        V128 V128 V128 ___  0  Simd;
    I64x2ExtmulHighI32x4S         0xfd 0xdd  "i64x2.extmul_high_i32x4_s"           Binary        V128 V128 V128 ___  0  Simd;
    I64x2ExtmulLowI32x4U          0xfd 0xde  "i64x2.extmul_low_i32x4_u"            Binary        V128 V128 V128 ___  0  Simd;
    I64x2ExtmulHighI32x4U         0xfd 0xdf  "i64x2.extmul_high_i32x4_u"           Binary        V128 V128 V128 ___  0  Simd;
    F32x4Abs                      0xfd 0xe0  "f32x4.abs"                           Unary         V128 V128 ___  ___  0  Simd;
    F32x4Neg                      0xfd 0xe1  "f32x4.neg"                           Unary         V128 V128 ___  ___  0  Simd;
    F32x4Sqrt                     0xfd 0xe3  "f32x4.sqrt"                          Unary         V128 V128 ___  ___  0  Simd;
    F32x4Add                      0xfd 0xe4  "f32x4.add"                           Binary        V128 V128 V128 ___  0  Simd;
    F32x4Sub                      0xfd 0xe5  "f32x4.sub"                           Binary        V128 V128 V128 ___  0  Simd;
    F32x4Mul                      0xfd 0xe6  "f32x4.mul"                           Binary        V128 V128 V128 ___  0  Simd;
    F32x4Div                      0xfd 0xe7  "f32x4.div"                           Binary        V128 V128 V128 ___  0  Simd;
    F32x4Min                      0xfd 0xe8  "f32x4.min"                           Binary        V128 V128 V128 ___  0  Simd;
    F32x4Max                      0xfd 0xe9  "f32x4.max"                           Binary        V128 V128 V128 ___  0  Simd;
    F32x4Pmin                     0xfd 0xea  "f32x4.pmin"                          Binary        V128 V128 V128 ___  0  Simd;
    F32x4Pmax                     0xfd 0xeb  "f32x4.pmax"                          Binary        V128 V128 V128 ___  0  Simd;
    F64x2Abs                      0xfd 0xec  "f64x2.abs"                           Unary         V128 V128 ___  ___  0  Simd;
    F64x2Neg                      0xfd 0xed  "f64x2.neg"                           Unary         V128 V128 ___  ___  0  Simd;
    F64x2Sqrt                     0xfd 0xef  "f64x2.sqrt"                          Unary         V128 V128 ___  ___  0  Simd;
    F64x2Add                      0xfd 0xf0  "f64x2.add"                           Binary        V128 V128 V128 ___  0  Simd;
    F64x2Sub                      0xfd 0xf1  "f64x2.sub"                           Binary        V128 V128 V128 ___  0  Simd;
    F64x2Mul                      0xfd 0xf2  "f64x2.mul"                           Binary        V128 V128 V128 ___  0  Simd;
    F64x2Div                      0xfd 0xf3  "f64x2.div"                           Binary        V128 V128 V128 ___  0  Simd;
    F64x2Min                      0xfd 0xf4  "f64x2.min"                           Binary        V128 V128 V128 ___  0  Simd;
    F64x2Max                      0xfd 0xf5  "f64x2.max"                           Binary        V128 V128 V128 ___  0  Simd;
    F64x2Pmin                     0xfd 0xf6  "f64x2.pmin"                          Binary        V128 V128 V128 ___  0  Simd;
    F64x2Pmax                     0xfd 0xf7  "f64x2.pmax"                          Binary        V128 V128 V128 ___  0  Simd;
    I32x4TruncSatF32x4S           0xfd 0xf8  "i32x4.trunc_sat_f32x4_s"             Unary         V128 V128 ___  ___  0  Simd;
    I32x4TruncSatF32x4U           0xfd 0xf9  "i32x4.trunc_sat_f32x4_u"             Unary         V128 V128 ___  ___  0  Simd;
    F32x4ConvertI32x4S            0xfd 0xfa  "f32x4.convert_i32x4_s"               Unary         V128 V128 ___  ___  0  Simd;
    F32x4ConvertI32x4U            0xfd 0xfb  "f32x4.convert_i32x4_u"               Unary         V128 V128 ___  ___  0  Simd;
    I32x4TruncSatF64x2SZero       0xfd 0xfc  "i32x4.trunc_sat_f64x2_s_zero"        Unary         V128 V128 ___  ___  0  Simd;
    I32x4TruncSatF64x2UZero       0xfd 0xfd  "i32x4.trunc_sat_f64x2_u_zero"        Unary         V128 V128 ___  ___  0  Simd;
    F64x2ConvertLowI32x4S         0xfd 0xfe  "f64x2.convert_low_i32x4_s"           Unary         V128 V128 ___  ___  0  Simd;
    F64x2ConvertLowI32x4U         0xfd 0xff  "f64x2.convert_low_i32x4_u"           Unary         V128 V128 ___  ___  0  Simd;
    I8x16RelaxedSwizzle           0xfd 0x100 "i8x16.relaxed_swizzle"               Binary        V128 V128 V128 ___  0  RelaxedSimd;
    I32x4RelaxedTruncF32x4S       0xfd 0x101 "i32x4.relaxed_trunc_f32x4_s"         Unary         V128 V128 ___  ___  0  RelaxedSimd;
    I32x4RelaxedTruncF32x4U       0xfd 0x102 "i32x4.relaxed_trunc_f32x4_u"         Unary         V128 V128 ___  ___  0  RelaxedSimd;
    I32x4RelaxedTruncF64x2SZero   0xfd 0x103 "i32x4.relaxed_trunc_f64x2_s_zero"    Unary         V128 V128 ___  ___  0  RelaxedSimd;
    I32x4RelaxedTruncF64x2UZero   0xfd 0x104 "i32x4.relaxed_trunc_f64x2_u_zero"    Unary         V128 V128 ___  ___  0  RelaxedSimd;
    F32x4RelaxedMadd              0xfd 0x105 "f32x4.relaxed_madd"                  Ternary       V128 V128 V128 V128 0  RelaxedSimd;
    F32x4RelaxedNmadd             0xfd 0x106 "f32x4.relaxed_nmadd"                 Ternary       V128 V128 V128 V128 0  RelaxedSimd;
    F64x2RelaxedMadd              0xfd 0x107 "f64x2.relaxed_madd"                  Ternary       V128 V128 V128 V128 0  RelaxedSimd;
    F64x2RelaxedNmadd             0xfd 0x108 "f64x2.relaxed_nmadd"                 Ternary       V128 V128 V128 V128 0  RelaxedSimd;
    I8x16RelaxedLaneselect        0xfd 0x109 "i8x16.relaxed_laneselect"            Ternary       V128 V128 V128 V128 0  RelaxedSimd;
    I16x8RelaxedLaneselect        0xfd 0x10a "i16x8.relaxed_laneselect"            Ternary       V128 V128 V128 V128 0  RelaxedSimd;
    I32x4RelaxedLaneselect        0xfd 0x10b "i32x4.relaxed_laneselect"            Ternary       V128 V128 V128 V128 0  RelaxedSimd;
    I64x2RelaxedLaneselect        0xfd 0x10c "i64x2.relaxed_laneselect"            Ternary       V128 V128 V128 V128 0  RelaxedSimd;
    F32x4RelaxedMin               0xfd 0x10d "f32x4.relaxed_min"                   Binary        V128 V128 V128 ___  0  RelaxedSimd;
    F32x4RelaxedMax               0xfd 0x10e "f32x4.relaxed_max"                   Binary        V128 V128 V128 ___  0  RelaxedSimd;
    F64x2RelaxedMin               0xfd 0x10f "f64x2.relaxed_min"                   Binary        V128 V128 V128 ___  0  RelaxedSimd;
    F64x2RelaxedMax               0xfd 0x110 "f64x2.relaxed_max"                   Binary        V128 V128 V128 ___  0  RelaxedSimd;
    I16x8RelaxedQ15mulrS          0xfd 0x111 "i16x8.relaxed_q15mulr_s"             Binary        V128 V128 V128 ___  0  RelaxedSimd;
    I16x8RelaxedDotI8x16I7x16S    0xfd 0x112 "i16x8.relaxed_dot_i8x16_i7x16_s"     Binary        V128 V128 V128 ___  0  RelaxedSimd;
    I32x4RelaxedDotI8x16I7x16AddS 0xfd 0x113 "i32x4.relaxed_dot_i8x16_i7x16_add_s" Ternary       V128 V128 V128 V128 0  RelaxedSimd;
    MemoryAtomicNotify            0xfe 0x00  "memory.atomic.notify"                AtomicNotify  I32  I32  I32  ___  4  Threads;
    MemoryAtomicWait32            0xfe 0x01  "memory.atomic.wait32"                AtomicWait    I32  I32  I32  I64  4  Threads;
    MemoryAtomicWait64            0xfe 0x02  "memory.atomic.wait64"                AtomicWait    I32  I32  I64  I64  8  Threads;
    AtomicFence                   0xfe 0x03  "atomic.fence"                        Other         ___  ___  ___  ___  0  Threads;
    I32AtomicLoad                 0xfe 0x10  "i32.atomic.load"                     AtomicLoad    I32  I32  ___  ___  4  Threads;
    I64AtomicLoad                 0xfe 0x11  "i64.atomic.load"                     AtomicLoad    I64  I32  ___  ___  8  Threads;
    I32AtomicLoad8U               0xfe 0x12  "i32.atomic.load8_u"                  AtomicLoad    I32  I32  ___  ___  1  Threads;
    I32AtomicLoad16U              0xfe 0x13  "i32.atomic.load16_u"                 AtomicLoad    I32  I32  ___  ___  2  Threads;
    I64AtomicLoad8U               0xfe 0x14  "i64.atomic.load8_u"                  AtomicLoad    I64  I32  ___  ___  1  Threads;
    I64AtomicLoad16U              0xfe 0x15  "i64.atomic.load16_u"                 AtomicLoad    I64  I32  ___  ___  2  Threads;
    I64AtomicLoad32U              0xfe 0x16  "i64.atomic.load32_u"                 AtomicLoad    I64  I32  ___  ___  4  Threads;
    I32AtomicStore                0xfe 0x17  "i32.atomic.store"                    AtomicStore   ___  I32  I32  ___  4  Threads;
    I64AtomicStore                0xfe 0x18  "i64.atomic.store"                    AtomicStore   ___  I32  I64  ___  8  Threads;
    I32AtomicStore8               0xfe 0x19  "i32.atomic.store8"                   AtomicStore   ___  I32  I32  ___  1  Threads;
    I32AtomicStore16              0xfe 0x1a  "i32.atomic.store16"                  AtomicStore   ___  I32  I32  ___  2  Threads;
    I64AtomicStore8               0xfe 0x1b  "i64.atomic.store8"                   AtomicStore   ___  I32  I64  ___  1  Threads;
    I64AtomicStore16              0xfe 0x1c  "i64.atomic.store16"                  AtomicStore   ___  I32  I64  ___  2  Threads;
    I64AtomicStore32              0xfe 0x1d  "i64.atomic.store32"                  AtomicStore   ___  I32  I64  ___  4  Threads;
    I32AtomicRmwAdd               0xfe 0x1e  "i32.atomic.rmw.add"                  AtomicRmw     I32  I32  I32  ___  4  Threads;
    I64AtomicRmwAdd               0xfe 0x1f  "i64.atomic.rmw.add"                  AtomicRmw     I64  I32  I64  ___  8  Threads;
    I32AtomicRmw8AddU             0xfe 0x20  "i32.atomic.rmw8.add_u"               AtomicRmw     I32  I32  I32  ___  1  Threads;
    I32AtomicRmw16AddU            0xfe 0x21  "i32.atomic.rmw16.add_u"              AtomicRmw     I32  I32  I32  ___  2  Threads;
    I64AtomicRmw8AddU             0xfe 0x22  "i64.atomic.rmw8.add_u"               AtomicRmw     I64  I32  I64  ___  1  Threads;
    I64AtomicRmw16AddU            0xfe 0x23  "i64.atomic.rmw16.add_u"              AtomicRmw     I64  I32  I64  ___  2  Threads;
    I64AtomicRmw32AddU            0xfe 0x24  "i64.atomic.rmw32.add_u"              AtomicRmw     I64  I32  I64  ___  4  Threads;
    I32AtomicRmwSub               0xfe 0x25  "i32.atomic.rmw.sub"                  AtomicRmw     I32  I32  I32  ___  4  Threads;
    I64AtomicRmwSub               0xfe 0x26  "i64.atomic.rmw.sub"                  AtomicRmw     I64  I32  I64  ___  8  Threads;
    I32AtomicRmw8SubU             0xfe 0x27  "i32.atomic.rmw8.sub_u"               AtomicRmw     I32  I32  I32  ___  1  Threads;
    I32AtomicRmw16SubU            0xfe 0x28  "i32.atomic.rmw16.sub_u"              AtomicRmw     I32  I32  I32  ___  2  Threads;
    I64AtomicRmw8SubU             0xfe 0x29  "i64.atomic.rmw8.sub_u"               AtomicRmw     I64  I32  I64  ___  1  Threads;
    I64AtomicRmw16SubU            0xfe 0x2a  "i64.atomic.rmw16.sub_u"              AtomicRmw     I64  I32  I64  ___  2  Threads;
    I64AtomicRmw32SubU            0xfe 0x2b  "i64.atomic.rmw32.sub_u"              AtomicRmw     I64  I32  I64  ___  4  Threads;
    I32AtomicRmwAnd               0xfe 0x2c  "i32.atomic.rmw.and"                  AtomicRmw     I32  I32  I32  ___  4  Threads;
    I64AtomicRmwAnd               0xfe 0x2d  "i64.atomic.rmw.and"                  AtomicRmw     I64  I32  I64  ___  8  Threads;
    I32AtomicRmw8AndU             0xfe 0x2e  "i32.atomic.rmw8.and_u"               AtomicRmw     I32  I32  I32  ___  1  Threads;
    I32AtomicRmw16AndU            0xfe 0x2f  "i32.atomic.rmw16.and_u"              AtomicRmw     I32  I32  I32  ___  2  Threads;
    I64AtomicRmw8AndU             0xfe 0x30  "i64.atomic.rmw8.and_u"               AtomicRmw     I64  I32  I64  ___  1  Threads;
    I64AtomicRmw16AndU            0xfe 0x31  "i64.atomic.rmw16.and_u"              AtomicRmw     I64  I32  I64  ___  2  Threads;
    I64AtomicRmw32AndU            0xfe 0x32  "i64.atomic.rmw32.and_u"              AtomicRmw     I64  I32  I64  ___  4  Threads;
    I32AtomicRmwOr                0xfe 0x33  "i32.atomic.rmw.or"                   AtomicRmw     I32  I32  I32  ___  4  Threads;
    I64AtomicRmwOr                0xfe 0x34  "i64.atomic.rmw.or"                   AtomicRmw     I64  I32  I64  ___  8  Threads;
    I32AtomicRmw8OrU              0xfe 0x35  "i32.atomic.rmw8.or_u"                AtomicRmw     I32  I32  I32  ___  1  Threads;
    I32AtomicRmw16OrU             0xfe 0x36  "i32.atomic.rmw16.or_u"               AtomicRmw     I32  I32  I32  ___  2  Threads;
    I64AtomicRmw8OrU              0xfe 0x37  "i64.atomic.rmw8.or_u"                AtomicRmw     I64  I32  I64  ___  1  Threads;
    I64AtomicRmw16OrU             0xfe 0x38  "i64.atomic.rmw16.or_u"               AtomicRmw     I64  I32  I64  ___  2  Threads;
    I64AtomicRmw32OrU             0xfe 0x39  "i64.atomic.rmw32.or_u"               AtomicRmw     I64  I32  I64  ___  4  Threads;
    I32AtomicRmwXor               0xfe 0x3a  "i32.atomic.rmw.xor"                  AtomicRmw     I32  I32  I32  ___  4  Threads;
    I64AtomicRmwXor               0xfe 0x3b  "i64.atomic.rmw.xor"                  AtomicRmw     I64  I32  I64  ___  8  Threads;
    I32AtomicRmw8XorU             0xfe 0x3c  "i32.atomic.rmw8.xor_u"               AtomicRmw     I32  I32  I32  ___  1  Threads;
    I32AtomicRmw16XorU            0xfe 0x3d  "i32.atomic.rmw16.xor_u"              AtomicRmw     I32  I32  I32  ___  2  Threads;
    I64AtomicRmw8XorU             0xfe 0x3e  "i64.atomic.rmw8.xor_u"               AtomicRmw     I64  I32  I64  ___  1  Threads;
    I64AtomicRmw16XorU            0xfe 0x3f  "i64.atomic.rmw16.xor_u"              AtomicRmw     I64  I32  I64  ___  2  Threads;
    I64AtomicRmw32XorU            0xfe 0x40  "i64.atomic.rmw32.xor_u"              AtomicRmw     I64  I32  I64  ___  4  Threads;
    I32AtomicRmwXchg              0xfe 0x41  "i32.atomic.rmw.xchg"                 AtomicRmw     I32  I32  I32  ___  4  Threads;
    I64AtomicRmwXchg              0xfe 0x42  "i64.atomic.rmw.xchg"                 AtomicRmw     I64  I32  I64  ___  8  Threads;
    I32AtomicRmw8XchgU            0xfe 0x43  "i32.atomic.rmw8.xchg_u"              AtomicRmw     I32  I32  I32  ___  1  Threads;
    I32AtomicRmw16XchgU           0xfe 0x44  "i32.atomic.rmw16.xchg_u"             AtomicRmw     I32  I32  I32  ___  2  Threads;
    I64AtomicRmw8XchgU            0xfe 0x45  "i64.atomic.rmw8.xchg_u"              AtomicRmw     I64  I32  I64  ___  1  Threads;
    I64AtomicRmw16XchgU           0xfe 0x46  "i64.atomic.rmw16.xchg_u"             AtomicRmw     I64  I32  I64  ___  2  Threads;
    I64AtomicRmw32XchgU           0xfe 0x47  "i64.atomic.rmw32.xchg_u"             AtomicRmw     I64  I32  I64  ___  4  Threads;
    I32AtomicRmwCmpxchg           0xfe 0x48  "i32.atomic.rmw.cmpxchg"              AtomicCmpxchg I32  I32  I32  I32  4  Threads;
    I64AtomicRmwCmpxchg           0xfe 0x49  "i64.atomic.rmw.cmpxchg"              AtomicCmpxchg I64  I32  I64  I64  8  Threads;
    I32AtomicRmw8CmpxchgU         0xfe 0x4a  "i32.atomic.rmw8.cmpxchg_u"           AtomicCmpxchg I32  I32  I32  I32  1  Threads;
    I32AtomicRmw16CmpxchgU        0xfe 0x4b  "i32.atomic.rmw16.cmpxchg_u"          AtomicCmpxchg I32  I32  I32  I32  2  Threads;
    I64AtomicRmw8CmpxchgU         0xfe 0x4c  "i64.atomic.rmw8.cmpxchg_u"           AtomicCmpxchg I64  I32  I64  I64  1  Threads;
    I64AtomicRmw16CmpxchgU        0xfe 0x4d  "i64.atomic.rmw16.cmpxchg_u"          AtomicCmpxchg I64  I32  I64  I64  2  Threads;
    I64AtomicRmw32CmpxchgU        0xfe 0x4e  "i64.atomic.rmw32.cmpxchg_u"          AtomicCmpxchg I64  I32  I64  I64  4  Threads;
}

/// Maps table slots to `opcode index + 1`; zero marks an empty slot.
static LOOKUP: [u16; TABLE_SIZE] = build_lookup();

const fn build_lookup() -> [u16; TABLE_SIZE] {
    let mut table = [0u16; TABLE_SIZE];
    let mut i = 0;
    while i < INFO.len() {
        match table_index(INFO[i].prefix, INFO[i].code) {
            Some(slot) => {
                if table[slot] != 0 {
                    panic!("duplicate opcode encoding");
                }
                table[slot] = (i + 1) as u16;
            }
            None => panic!("opcode outside of lookup table"),
        }
        i += 1;
    }
    table
}

impl Opcode {
    /// Resolves a prefix byte (0 for none) and sub-code to an opcode.
    pub fn from_code(prefix: u8, code: u32) -> Result<Opcode, InvalidOpcode> {
        let invalid = InvalidOpcode { prefix, code };
        let slot = table_index(prefix, code).ok_or(invalid)?;
        match LOOKUP[slot] {
            0 => Err(invalid),
            n => Ok(ALL[usize::from(n) - 1]),
        }
    }

    /// Whether `byte` introduces a multi-byte opcode.
    pub fn is_prefix_byte(byte: u8) -> bool {
        byte != 0 && prefix_slot(byte).is_some()
    }

    pub fn all() -> &'static [Opcode] {
        ALL
    }

    pub fn info(self) -> &'static OpcodeInfo {
        &INFO[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn prefix(self) -> u8 {
        self.info().prefix
    }

    pub fn code(self) -> u32 {
        self.info().code
    }

    pub fn has_prefix(self) -> bool {
        self.prefix() != 0
    }

    pub fn kind(self) -> OpcodeKind {
        self.info().kind
    }

    /// The byte sequence encoding this opcode.
    pub fn bytes(self) -> Vec<u8> {
        encode(self.prefix(), self.code())
    }

    pub fn result_type(self) -> Option<Type> {
        self.info().result
    }

    /// Fixed parameter types, in stack order, without trailing empty slots.
    pub fn param_types(self) -> Vec<Type> {
        self.info().params.iter().map_while(|p| *p).collect()
    }

    pub fn memory_size(self) -> u32 {
        self.info().memory_size
    }

    /// Largest alignment exponent a memory access may declare.
    pub fn max_align_log2(self) -> u32 {
        self.memory_size().max(1).trailing_zeros()
    }

    /// Number of lanes addressed by a lane immediate.
    pub fn lane_count(self) -> u8 {
        match self.kind() {
            OpcodeKind::LoadLane | OpcodeKind::StoreLane => (16 / self.memory_size().max(1)) as u8,
            _ => {
                let name = self.name();
                if name.starts_with("i8x16") {
                    16
                } else if name.starts_with("i16x8") {
                    8
                } else if name.starts_with("i32x4") || name.starts_with("f32x4") {
                    4
                } else {
                    2
                }
            }
        }
    }

    pub fn feature(self) -> Option<Feature> {
        self.info().feature
    }

    pub fn is_enabled(self, features: &Features) -> bool {
        match self.feature() {
            None => true,
            // Tail-calling through a reference needs both proposals.
            Some(Feature::FunctionReferences) if self == Opcode::ReturnCallRef => {
                features.function_references && features.tail_call
            }
            Some(feature) => features.is_enabled(feature),
        }
    }

    /// Whether the instruction may appear in a constant expression.
    pub fn is_constant(self, features: &Features) -> bool {
        match self {
            Opcode::I32Const
            | Opcode::I64Const
            | Opcode::F32Const
            | Opcode::F64Const
            | Opcode::V128Const
            | Opcode::GlobalGet
            | Opcode::RefNull
            | Opcode::RefFunc
            | Opcode::End => true,
            Opcode::I32Add
            | Opcode::I32Sub
            | Opcode::I32Mul
            | Opcode::I64Add
            | Opcode::I64Sub
            | Opcode::I64Mul => features.extended_const,
            Opcode::StructNew
            | Opcode::StructNewDefault
            | Opcode::ArrayNew
            | Opcode::ArrayNewDefault
            | Opcode::ArrayNewFixed
            | Opcode::RefI31
            | Opcode::AnyConvertExtern
            | Opcode::ExternConvertAny => features.gc,
            _ => false,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_opcode_round_trips_through_its_code() {
        for &op in Opcode::all() {
            assert_eq!(Opcode::from_code(op.prefix(), op.code()), Ok(op), "{op}");
        }
    }

    #[test]
    fn bytes_reproduce_the_encoding() {
        assert_eq!(Opcode::I32Add.bytes(), vec![0x6a]);
        assert_eq!(Opcode::MemoryCopy.bytes(), vec![0xfc, 0x0a]);
        assert_eq!(Opcode::I8x16RelaxedSwizzle.bytes(), vec![0xfd, 0x80, 0x02]);
        assert_eq!(Opcode::I32AtomicRmwCmpxchg.bytes(), vec![0xfe, 0x48]);
    }

    #[test]
    fn unknown_codes_remember_their_bytes() {
        let invalid = Opcode::from_code(0xfd, 0x1ff).unwrap_err();
        assert_eq!(invalid, InvalidOpcode { prefix: 0xfd, code: 0x1ff });
        assert_eq!(invalid.bytes(), vec![0xfd, 0xff, 0x03]);
        assert_eq!(invalid.to_string(), "0xfd 0x1ff");

        assert!(Opcode::from_code(0x00, 0x16).is_err());
        assert!(Opcode::from_code(0xfc, 0x10_000).is_err());
        assert!(Opcode::from_code(0xfa, 0x00).is_err());
    }

    #[test]
    fn nop_and_unreachable_are_valid() {
        assert_eq!(Opcode::from_code(0, 0), Ok(Opcode::Unreachable));
        assert_eq!(Opcode::from_code(0, 1), Ok(Opcode::Nop));
    }

    #[test]
    fn signatures_come_from_the_table() {
        assert_eq!(Opcode::I64Add.param_types(), vec![Type::I64, Type::I64]);
        assert_eq!(Opcode::I64Add.result_type(), Some(Type::I64));
        assert_eq!(Opcode::I32Store.param_types(), vec![Type::I32, Type::I32]);
        assert_eq!(Opcode::I32Store.result_type(), None);
        assert_eq!(Opcode::I64Load32U.memory_size(), 4);
        assert_eq!(Opcode::I64Load32U.max_align_log2(), 2);
        assert_eq!(Opcode::I16x8ExtractLaneS.lane_count(), 8);
        assert_eq!(Opcode::V128Load64Lane.lane_count(), 2);
    }

    #[test]
    fn features_gate_opcodes() {
        let mvp = Features::mvp();
        assert!(Opcode::I32Add.is_enabled(&mvp));
        assert!(!Opcode::I32Extend8S.is_enabled(&mvp));
        assert!(!Opcode::ReturnCallRef.is_enabled(&Features {
            function_references: true,
            ..Features::mvp()
        }));
        assert!(Opcode::ReturnCallRef.is_enabled(&Features::all()));
    }
}
