//! Instruction stream decoding.
//!
//! Instructions are read with a nesting counter instead of recursion: every
//! block-like operator opens a level, `end` closes one, and the `end` at
//! level zero terminates the function body or constant expression.

use super::event::{Event, EventSink, Operator};
use super::reader::{ExprContext, Reader};
use crate::error::Error;
use crate::ir::{CatchKind, Instr, MemArg, TableCatch, Var, V128};
use crate::opcode::{InvalidOpcode, Opcode, OpcodeKind};
use crate::types::RefType;

impl<'a, S: EventSink<'a>> Reader<'a, '_, S> {
    /// Reads operators up to and including the `end` that closes the
    /// enclosing function body or constant expression.
    pub(super) fn read_instructions(&mut self, context: ExprContext) -> Result<(), Error> {
        let mut depth = 0usize;
        loop {
            if self.pos >= self.end {
                let message = match context {
                    ExprContext::FunctionBody => "function body must end with END opcode",
                    ExprContext::InitExpr => "init expression must end with END opcode",
                };
                return Err(self.malformed(message));
            }
            let offset = self.pos;
            let op = self.read_opcode()?;
            let operator = self.read_operator(op, offset)?;
            let done = match operator {
                Operator::Block(_)
                | Operator::Loop(_)
                | Operator::If(_)
                | Operator::Try(_)
                | Operator::TryTable { .. } => {
                    depth += 1;
                    false
                }
                Operator::End if depth == 0 => true,
                Operator::End | Operator::Delegate(_) => {
                    depth = depth.saturating_sub(1);
                    false
                }
                _ => false,
            };
            self.emit(offset, Event::Operator(operator))?;
            if done {
                return Ok(());
            }
        }
    }

    fn read_opcode(&mut self) -> Result<Opcode, Error> {
        let offset = self.pos;
        let byte = self.read_u8("opcode")?;
        let (prefix, code) = if Opcode::is_prefix_byte(byte) {
            (byte, self.read_u32("opcode")?)
        } else {
            (0, u32::from(byte))
        };
        match Opcode::from_code(prefix, code) {
            Ok(op) if op.is_enabled(&self.options.features) => Ok(op),
            _ => Err(Error::malformed(
                offset,
                format!("unexpected opcode: {}", InvalidOpcode { prefix, code }),
            )),
        }
    }

    fn read_operator(&mut self, op: Opcode, offset: usize) -> Result<Operator, Error> {
        let operator = match op {
            Opcode::Block => Operator::Block(self.read_block_type()?),
            Opcode::Loop => Operator::Loop(self.read_block_type()?),
            Opcode::If => Operator::If(self.read_block_type()?),
            Opcode::Try => Operator::Try(self.read_block_type()?),
            Opcode::Else => Operator::Else,
            Opcode::End => Operator::End,
            Opcode::Catch => Operator::Catch(self.read_var("tag index", offset)?),
            Opcode::CatchAll => Operator::CatchAll,
            Opcode::Delegate => Operator::Delegate(self.read_var("delegate depth", offset)?),
            Opcode::TryTable => {
                let ty = self.read_block_type()?;
                let count = self.read_count("catch count")?;
                let catches = (0..count)
                    .map(|_| self.read_table_catch(offset))
                    .collect::<Result<Vec<_>, _>>()?;
                Operator::TryTable { ty, catches }
            }
            _ => Operator::Instr(self.read_instr(op, offset)?),
        };
        Ok(operator)
    }

    fn read_table_catch(&mut self, offset: usize) -> Result<TableCatch, Error> {
        let kind_offset = self.pos;
        let byte = self.read_u8("catch kind")?;
        let kind = CatchKind::from_u8(byte).ok_or_else(|| {
            Error::malformed(kind_offset, format!("invalid catch kind: {byte}"))
        })?;
        let tag = if kind.has_tag() {
            Some(self.read_var("catch tag", offset)?)
        } else {
            None
        };
        let label = self.read_var("catch depth", offset)?;
        Ok(TableCatch { kind, tag, label })
    }

    fn read_var(&mut self, what: &str, offset: usize) -> Result<Var, Error> {
        Ok(Var::index(self.read_index(what)?, offset))
    }

    /// A memory index: a LEB128 index under multi-memory, otherwise a
    /// reserved zero byte.
    fn read_memory_index(&mut self, op: Opcode, offset: usize) -> Result<Var, Error> {
        if self.options.features.multi_memory {
            return self.read_var("memory index", offset);
        }
        self.read_reserved_zero(op)?;
        Ok(Var::index(0, offset))
    }

    /// A table index: a LEB128 index under reference types, otherwise a
    /// reserved zero byte.
    fn read_table_index(&mut self, op: Opcode, offset: usize) -> Result<Var, Error> {
        if self.options.features.reference_types {
            return self.read_var("table index", offset);
        }
        self.read_reserved_zero(op)?;
        Ok(Var::index(0, offset))
    }

    fn read_reserved_zero(&mut self, op: Opcode) -> Result<(), Error> {
        let byte_offset = self.pos;
        match self.read_u8("reserved value")? {
            0 => Ok(()),
            _ => Err(Error::malformed(
                byte_offset,
                format!("{op} reserved value must be 0"),
            )),
        }
    }

    fn require_data_count(&self, op: Opcode, offset: usize) -> Result<(), Error> {
        if self.data_count.is_none() {
            return Err(Error::malformed(
                offset,
                format!("{op} requires data count section"),
            ));
        }
        Ok(())
    }

    fn read_memarg(&mut self, offset: usize) -> Result<MemArg, Error> {
        let flags_offset = self.pos;
        let mut align_log2 = self.read_u32("alignment")?;
        let mut memory = 0;
        if align_log2 & 0x40 != 0 {
            if !self.options.features.multi_memory {
                return Err(Error::malformed(flags_offset, "malformed memop flags"));
            }
            align_log2 &= !0x40;
            memory = self.read_index("memory index")?;
        }
        let mem_offset = if self.options.features.memory64 {
            self.read_u64("load offset")?
        } else {
            u64::from(self.read_u32("load offset")?)
        };
        Ok(MemArg {
            memory: Var::index(memory, offset),
            align_log2,
            offset: mem_offset,
        })
    }

    fn read_v128(&mut self, what: &str) -> Result<V128, Error> {
        let bytes = self.read_bytes(16, what)?;
        let mut value = [0u8; 16];
        value.copy_from_slice(bytes);
        Ok(V128(value))
    }

    fn read_instr(&mut self, op: Opcode, offset: usize) -> Result<Instr, Error> {
        let instr = match op {
            Opcode::Unreachable => Instr::Unreachable,
            Opcode::Nop => Instr::Nop,
            Opcode::Drop => Instr::Drop,
            Opcode::Select => Instr::Select(None),
            Opcode::SelectT => {
                let count = self.read_count("select result count")?;
                let types = (0..count)
                    .map(|_| self.read_value_type("select result type"))
                    .collect::<Result<Vec<_>, _>>()?;
                Instr::Select(Some(types))
            }

            Opcode::Br => Instr::Br(self.read_var("br depth", offset)?),
            Opcode::BrIf => Instr::BrIf(self.read_var("br_if depth", offset)?),
            Opcode::BrTable => {
                let count = self.read_count("br_table target count")?;
                let targets = (0..count)
                    .map(|_| self.read_var("br_table target depth", offset))
                    .collect::<Result<Vec<_>, _>>()?;
                let default = self.read_var("br_table default target depth", offset)?;
                Instr::BrTable { targets, default }
            }
            Opcode::BrOnNull => Instr::BrOnNull(self.read_var("br_on_null depth", offset)?),
            Opcode::BrOnNonNull => {
                Instr::BrOnNonNull(self.read_var("br_on_non_null depth", offset)?)
            }
            Opcode::BrOnCast | Opcode::BrOnCastFail => {
                let flags_offset = self.pos;
                let flags = self.read_u8("br_on_cast flags")?;
                if flags & !0x3 != 0 {
                    return Err(Error::malformed(
                        flags_offset,
                        format!("invalid br_on_cast flags: {flags:#x}"),
                    ));
                }
                let label = self.read_var("br_on_cast depth", offset)?;
                let from = self.read_heap_type("br_on_cast source type")?;
                let to = self.read_heap_type("br_on_cast target type")?;
                Instr::BrOnCast {
                    op,
                    label,
                    from: RefType {
                        nullable: flags & 0x1 != 0,
                        heap: from,
                    },
                    to: RefType {
                        nullable: flags & 0x2 != 0,
                        heap: to,
                    },
                }
            }
            Opcode::Return => Instr::Return,

            Opcode::Call => Instr::Call(self.read_var("call function index", offset)?),
            Opcode::ReturnCall => {
                Instr::ReturnCall(self.read_var("return_call function index", offset)?)
            }
            Opcode::CallIndirect | Opcode::ReturnCallIndirect => {
                let ty = self.read_var("call_indirect signature index", offset)?;
                let table = self.read_table_index(op, offset)?;
                if op == Opcode::CallIndirect {
                    Instr::CallIndirect { ty, table }
                } else {
                    Instr::ReturnCallIndirect { ty, table }
                }
            }
            Opcode::CallRef => Instr::CallRef(self.read_var("call_ref type index", offset)?),
            Opcode::ReturnCallRef => {
                Instr::ReturnCallRef(self.read_var("return_call_ref type index", offset)?)
            }

            Opcode::Throw => Instr::Throw(self.read_var("throw tag index", offset)?),
            Opcode::Rethrow => Instr::Rethrow(self.read_var("rethrow depth", offset)?),
            Opcode::ThrowRef => Instr::ThrowRef,

            Opcode::LocalGet => Instr::LocalGet(self.read_var("local.get local index", offset)?),
            Opcode::LocalSet => Instr::LocalSet(self.read_var("local.set local index", offset)?),
            Opcode::LocalTee => Instr::LocalTee(self.read_var("local.tee local index", offset)?),
            Opcode::GlobalGet => {
                Instr::GlobalGet(self.read_var("global.get global index", offset)?)
            }
            Opcode::GlobalSet => {
                Instr::GlobalSet(self.read_var("global.set global index", offset)?)
            }

            Opcode::TableGet => Instr::TableGet(self.read_var("table.get table index", offset)?),
            Opcode::TableSet => Instr::TableSet(self.read_var("table.set table index", offset)?),
            Opcode::TableGrow => {
                Instr::TableGrow(self.read_var("table.grow table index", offset)?)
            }
            Opcode::TableSize => {
                Instr::TableSize(self.read_var("table.size table index", offset)?)
            }
            Opcode::TableFill => {
                Instr::TableFill(self.read_var("table.fill table index", offset)?)
            }
            Opcode::TableCopy => {
                let dst = self.read_var("table.copy dst table index", offset)?;
                let src = self.read_var("table.copy src table index", offset)?;
                Instr::TableCopy { dst, src }
            }
            Opcode::TableInit => {
                let segment = self.read_var("table.init segment index", offset)?;
                let table = self.read_var("table.init table index", offset)?;
                Instr::TableInit { segment, table }
            }
            Opcode::ElemDrop => Instr::ElemDrop(self.read_var("elem.drop segment index", offset)?),

            Opcode::MemorySize => Instr::MemorySize(self.read_memory_index(op, offset)?),
            Opcode::MemoryGrow => Instr::MemoryGrow(self.read_memory_index(op, offset)?),
            Opcode::MemoryInit => {
                self.require_data_count(op, offset)?;
                let segment = self.read_var("memory.init segment index", offset)?;
                let memory = self.read_memory_index(op, offset)?;
                Instr::MemoryInit { segment, memory }
            }
            Opcode::DataDrop => {
                self.require_data_count(op, offset)?;
                Instr::DataDrop(self.read_var("data.drop segment index", offset)?)
            }
            Opcode::MemoryCopy => {
                let dst = self.read_memory_index(op, offset)?;
                let src = self.read_memory_index(op, offset)?;
                Instr::MemoryCopy { dst, src }
            }
            Opcode::MemoryFill => Instr::MemoryFill(self.read_memory_index(op, offset)?),

            Opcode::I32Const => Instr::I32Const(self.read_i32("i32.const value")?),
            Opcode::I64Const => Instr::I64Const(self.read_i64("i64.const value")?),
            Opcode::F32Const => Instr::F32Const(self.read_fixed_u32("f32.const value")?),
            Opcode::F64Const => Instr::F64Const(self.read_fixed_u64("f64.const value")?),
            Opcode::V128Const => Instr::V128Const(self.read_v128("v128.const value")?),
            Opcode::I8x16Shuffle => Instr::Shuffle(self.read_v128("i8x16.shuffle lanes")?),

            Opcode::AtomicFence => {
                let byte_offset = self.pos;
                if self.read_u8("atomic.fence consistency model")? != 0 {
                    return Err(Error::malformed(
                        byte_offset,
                        "atomic.fence consistency model must be 0",
                    ));
                }
                Instr::AtomicFence
            }

            Opcode::RefNull => Instr::RefNull(self.read_heap_type("ref.null type")?),
            Opcode::RefIsNull => Instr::RefIsNull,
            Opcode::RefFunc => Instr::RefFunc(self.read_var("ref.func function index", offset)?),
            Opcode::RefEq => Instr::RefEq,
            Opcode::RefAsNonNull => Instr::RefAsNonNull,

            Opcode::StructNew => Instr::StructNew(self.read_var("struct type index", offset)?),
            Opcode::StructNewDefault => {
                Instr::StructNewDefault(self.read_var("struct type index", offset)?)
            }
            Opcode::StructGet | Opcode::StructGetS | Opcode::StructGetU => {
                let ty = self.read_var("struct type index", offset)?;
                let field = self.read_index("struct field index")?;
                Instr::StructGet { op, ty, field }
            }
            Opcode::StructSet => {
                let ty = self.read_var("struct type index", offset)?;
                let field = self.read_index("struct field index")?;
                Instr::StructSet { ty, field }
            }
            Opcode::ArrayNew => Instr::ArrayNew(self.read_var("array type index", offset)?),
            Opcode::ArrayNewDefault => {
                Instr::ArrayNewDefault(self.read_var("array type index", offset)?)
            }
            Opcode::ArrayNewFixed => {
                let ty = self.read_var("array type index", offset)?;
                let count = self.read_u32("array.new_fixed length")?;
                Instr::ArrayNewFixed { ty, count }
            }
            Opcode::ArrayNewData | Opcode::ArrayInitData => {
                self.require_data_count(op, offset)?;
                let ty = self.read_var("array type index", offset)?;
                let data = self.read_var("data segment index", offset)?;
                if op == Opcode::ArrayNewData {
                    Instr::ArrayNewData { ty, data }
                } else {
                    Instr::ArrayInitData { ty, data }
                }
            }
            Opcode::ArrayNewElem | Opcode::ArrayInitElem => {
                let ty = self.read_var("array type index", offset)?;
                let elem = self.read_var("elem segment index", offset)?;
                if op == Opcode::ArrayNewElem {
                    Instr::ArrayNewElem { ty, elem }
                } else {
                    Instr::ArrayInitElem { ty, elem }
                }
            }
            Opcode::ArrayGet | Opcode::ArrayGetS | Opcode::ArrayGetU => {
                let ty = self.read_var("array type index", offset)?;
                Instr::ArrayGet { op, ty }
            }
            Opcode::ArraySet => Instr::ArraySet(self.read_var("array type index", offset)?),
            Opcode::ArrayLen => Instr::ArrayLen,
            Opcode::ArrayFill => Instr::ArrayFill(self.read_var("array type index", offset)?),
            Opcode::ArrayCopy => {
                let dst = self.read_var("array dst type index", offset)?;
                let src = self.read_var("array src type index", offset)?;
                Instr::ArrayCopy { dst, src }
            }
            Opcode::RefTest | Opcode::RefTestNull => Instr::RefTest(RefType {
                nullable: op == Opcode::RefTestNull,
                heap: self.read_heap_type("ref.test type")?,
            }),
            Opcode::RefCast | Opcode::RefCastNull => Instr::RefCast(RefType {
                nullable: op == Opcode::RefCastNull,
                heap: self.read_heap_type("ref.cast type")?,
            }),
            Opcode::RefI31
            | Opcode::I31GetS
            | Opcode::I31GetU
            | Opcode::AnyConvertExtern
            | Opcode::ExternConvertAny => Instr::GcUnary(op),

            _ => match op.kind() {
                OpcodeKind::Load
                | OpcodeKind::LoadSplat
                | OpcodeKind::LoadZero
                | OpcodeKind::AtomicLoad => Instr::Load {
                    op,
                    memarg: self.read_memarg(offset)?,
                },
                OpcodeKind::Store | OpcodeKind::AtomicStore => Instr::Store {
                    op,
                    memarg: self.read_memarg(offset)?,
                },
                OpcodeKind::AtomicRmw
                | OpcodeKind::AtomicCmpxchg
                | OpcodeKind::AtomicWait
                | OpcodeKind::AtomicNotify => Instr::Atomic {
                    op,
                    memarg: self.read_memarg(offset)?,
                },
                OpcodeKind::LoadLane => {
                    let memarg = self.read_memarg(offset)?;
                    let lane = self.read_u8("lane index")?;
                    Instr::LoadLane { op, memarg, lane }
                }
                OpcodeKind::StoreLane => {
                    let memarg = self.read_memarg(offset)?;
                    let lane = self.read_u8("lane index")?;
                    Instr::StoreLane { op, memarg, lane }
                }
                OpcodeKind::LaneOp => Instr::LaneOp {
                    op,
                    lane: self.read_u8("lane index")?,
                },
                OpcodeKind::Unary => Instr::Unary(op),
                OpcodeKind::Binary => Instr::Binary(op),
                OpcodeKind::Compare => Instr::Compare(op),
                OpcodeKind::Convert => Instr::Convert(op),
                OpcodeKind::Ternary => Instr::Ternary(op),
                OpcodeKind::Other => {
                    let invalid = InvalidOpcode {
                        prefix: op.prefix(),
                        code: op.code(),
                    };
                    return Err(Error::malformed(
                        offset,
                        format!("unexpected opcode: {invalid}"),
                    ));
                }
            },
        };
        Ok(instr)
    }
}

#[cfg(test)]
mod tests {
    use crate::binary::leb128;
    use crate::binary::{read_binary, Event, EventLog, Operator, ReadOptions};
    use crate::error::Errors;
    use crate::features::Features;
    use crate::ir::Instr;
    use crate::opcode::Opcode;

    /// A module with one `() -> ()` function whose body is `body`.
    fn module_with_body(locals: &[u8], body: &[u8]) -> Vec<u8> {
        let mut func = locals.to_vec();
        func.extend_from_slice(body);
        let mut code = vec![0x01];
        leb128::write_u32(&mut code, func.len() as u32);
        code.extend(func);

        let mut bytes = b"\0asm\x01\0\0\0".to_vec();
        bytes.extend([0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
        bytes.extend([0x03, 0x02, 0x01, 0x00]);
        bytes.push(0x0a);
        leb128::write_u32(&mut bytes, code.len() as u32);
        bytes.extend(code);
        bytes
    }

    fn operators(bytes: &[u8], features: Features) -> Result<Vec<Operator>, Errors> {
        let mut log = EventLog::new();
        let options = ReadOptions {
            features,
            ..ReadOptions::default()
        };
        read_binary(bytes, &mut log, &options)?;
        Ok(log
            .events
            .into_iter()
            .filter_map(|(_, e)| match e {
                Event::Operator(op) => Some(op),
                _ => None,
            })
            .collect())
    }

    #[test]
    fn nested_blocks_end_at_the_outer_end() {
        let bytes = module_with_body(&[0x00], &[0x02, 0x40, 0x03, 0x40, 0x0b, 0x0b, 0x0b]);
        let ops = operators(&bytes, Features::default()).unwrap();
        assert_eq!(ops.len(), 5);
        assert_eq!(ops.last(), Some(&Operator::End));
    }

    #[test]
    fn every_enabled_opcode_reads_back_from_its_bytes() {
        for &op in Opcode::all() {
            if matches!(
                op,
                Opcode::Block
                    | Opcode::Loop
                    | Opcode::If
                    | Opcode::Try
                    | Opcode::TryTable
                    | Opcode::Else
                    | Opcode::End
                    | Opcode::Catch
                    | Opcode::CatchAll
                    | Opcode::Delegate
            ) {
                continue;
            }
            let body = op.bytes();
            let mut log = EventLog::new();
            let bytes = module_with_body(&[0x00], &body);
            // Immediates are missing, so decoding may fail afterwards; the
            // opcode itself must still be recognised.
            let result = read_binary(&bytes, &mut log, &ReadOptions {
                features: Features::all(),
                ..ReadOptions::default()
            });
            if let Err(errors) = result {
                let message = &errors.first().unwrap().message;
                assert!(!message.starts_with("unexpected opcode"), "{op}: {message}");
            }
        }
    }

    #[test]
    fn unknown_prefixed_opcode() {
        let bytes = module_with_body(&[0x00], &[0xfd, 0xff, 0x03, 0x0b]);
        let errors = operators(&bytes, Features::all()).unwrap_err();
        assert_eq!(errors.first().unwrap().message, "unexpected opcode: 0xfd 0x1ff");
    }

    #[test]
    fn disabled_opcode_is_unexpected() {
        let bytes = module_with_body(&[0x00], &[0x41, 0x00, 0xc0, 0x1a, 0x0b]);
        let errors = operators(&bytes, Features::mvp()).unwrap_err();
        assert_eq!(errors.first().unwrap().message, "unexpected opcode: 0xc0");
        assert!(operators(&bytes, Features::default()).is_ok());
    }

    #[test]
    fn missing_end() {
        let bytes = module_with_body(&[0x00], &[0x01]);
        let errors = operators(&bytes, Features::default()).unwrap_err();
        assert_eq!(
            errors.first().unwrap().message,
            "function body must end with END opcode"
        );
    }

    #[test]
    fn memarg_reads_alignment_and_offset() {
        let bytes = module_with_body(
            &[0x00],
            &[0x41, 0x00, 0x28, 0x02, 0x10, 0x1a, 0x0b],
        );
        let ops = operators(&bytes, Features::default()).unwrap();
        match &ops[1] {
            Operator::Instr(Instr::Load { op, memarg }) => {
                assert_eq!(*op, Opcode::I32Load);
                assert_eq!(memarg.align_log2, 2);
                assert_eq!(memarg.offset, 16);
                assert_eq!(memarg.memory.as_index(), Some(0));
            }
            other => panic!("unexpected operator {other:?}"),
        }
    }

    #[test]
    fn br_table_targets() {
        let bytes = module_with_body(
            &[0x00],
            &[0x02, 0x40, 0x41, 0x00, 0x0e, 0x02, 0x00, 0x00, 0x00, 0x0b, 0x0b],
        );
        let ops = operators(&bytes, Features::default()).unwrap();
        match &ops[2] {
            Operator::Instr(Instr::BrTable { targets, default }) => {
                assert_eq!(targets.len(), 2);
                assert_eq!(default.as_index(), Some(0));
                assert_eq!(targets[1].as_index(), Some(0));
            }
            other => panic!("unexpected operator {other:?}"),
        }
    }

    #[test]
    fn memory_init_needs_data_count() {
        let bytes = module_with_body(
            &[0x00],
            &[0x41, 0x00, 0x41, 0x00, 0x41, 0x00, 0xfc, 0x08, 0x00, 0x00, 0x0b],
        );
        let errors = operators(&bytes, Features::default()).unwrap_err();
        assert_eq!(
            errors.first().unwrap().message,
            "memory.init requires data count section"
        );
    }

    #[test]
    fn reserved_memory_byte_must_be_zero() {
        let bytes = module_with_body(&[0x00], &[0x3f, 0x01, 0x1a, 0x0b]);
        let errors = operators(&bytes, Features::default()).unwrap_err();
        assert_eq!(
            errors.first().unwrap().message,
            "memory.size reserved value must be 0"
        );
    }
}
