//! Instructions and expression lists.
//!
//! Expression lists are singly linked chains of nodes stored in an
//! [`ExprArena`] owned by the module. A list is a small `Copy` handle
//! (head, tail, length); appending is O(1) and never moves existing nodes.
//! Every node belongs to exactly one list.

use super::types::{Location, Var};
use crate::opcode::Opcode;
use crate::types::{BlockType, HeapType, RefType, Type};

/// Memory immediate of loads, stores and atomics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemArg {
    pub memory: Var,
    pub align_log2: u32,
    pub offset: u64,
}

/// A 128-bit SIMD immediate, bytes in little-endian lane order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct V128(pub [u8; 16]);

/// Kind of a `try_table` catch clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatchKind {
    Catch,
    CatchRef,
    CatchAll,
    CatchAllRef,
}

impl CatchKind {
    pub fn from_u8(value: u8) -> Option<CatchKind> {
        let kind = match value {
            0 => CatchKind::Catch,
            1 => CatchKind::CatchRef,
            2 => CatchKind::CatchAll,
            3 => CatchKind::CatchAllRef,
            _ => return None,
        };
        Some(kind)
    }

    pub fn has_tag(self) -> bool {
        matches!(self, CatchKind::Catch | CatchKind::CatchRef)
    }

    pub fn pushes_exnref(self) -> bool {
        matches!(self, CatchKind::CatchRef | CatchKind::CatchAllRef)
    }
}

/// A `try_table` catch clause: where to branch when a tag is caught.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableCatch {
    pub kind: CatchKind,
    pub tag: Option<Var>,
    pub label: Var,
}

/// Every non-structured instruction, grouped by operand shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instr {
    Unreachable,
    Nop,
    Drop,
    /// `select`, optionally with explicit result types.
    Select(Option<Vec<Type>>),

    Br(Var),
    BrIf(Var),
    BrTable { targets: Vec<Var>, default: Var },
    BrOnNull(Var),
    BrOnNonNull(Var),
    BrOnCast {
        op: Opcode,
        label: Var,
        from: RefType,
        to: RefType,
    },
    Return,

    Call(Var),
    CallIndirect { ty: Var, table: Var },
    ReturnCall(Var),
    ReturnCallIndirect { ty: Var, table: Var },
    CallRef(Var),
    ReturnCallRef(Var),

    Throw(Var),
    Rethrow(Var),
    ThrowRef,

    LocalGet(Var),
    LocalSet(Var),
    LocalTee(Var),
    GlobalGet(Var),
    GlobalSet(Var),

    TableGet(Var),
    TableSet(Var),
    TableGrow(Var),
    TableSize(Var),
    TableFill(Var),
    TableCopy { dst: Var, src: Var },
    TableInit { segment: Var, table: Var },
    ElemDrop(Var),

    MemorySize(Var),
    MemoryGrow(Var),
    MemoryInit { segment: Var, memory: Var },
    DataDrop(Var),
    MemoryCopy { dst: Var, src: Var },
    MemoryFill(Var),

    /// Plain, splat, zero-extending and atomic loads.
    Load { op: Opcode, memarg: MemArg },
    /// Plain and atomic stores.
    Store { op: Opcode, memarg: MemArg },
    /// Read-modify-write, compare-exchange, wait and notify.
    Atomic { op: Opcode, memarg: MemArg },
    AtomicFence,
    LoadLane { op: Opcode, memarg: MemArg, lane: u8 },
    StoreLane { op: Opcode, memarg: MemArg, lane: u8 },

    I32Const(i32),
    I64Const(i64),
    /// Raw IEEE-754 bits.
    F32Const(u32),
    F64Const(u64),
    V128Const(V128),

    Unary(Opcode),
    Binary(Opcode),
    Compare(Opcode),
    Convert(Opcode),
    Ternary(Opcode),
    LaneOp { op: Opcode, lane: u8 },
    Shuffle(V128),

    RefNull(HeapType),
    RefIsNull,
    RefFunc(Var),
    RefEq,
    RefAsNonNull,

    StructNew(Var),
    StructNewDefault(Var),
    StructGet { op: Opcode, ty: Var, field: u32 },
    StructSet { ty: Var, field: u32 },
    ArrayNew(Var),
    ArrayNewDefault(Var),
    ArrayNewFixed { ty: Var, count: u32 },
    ArrayNewData { ty: Var, data: Var },
    ArrayNewElem { ty: Var, elem: Var },
    ArrayGet { op: Opcode, ty: Var },
    ArraySet(Var),
    ArrayLen,
    ArrayFill(Var),
    ArrayCopy { dst: Var, src: Var },
    ArrayInitData { ty: Var, data: Var },
    ArrayInitElem { ty: Var, elem: Var },
    RefTest(RefType),
    RefCast(RefType),
    /// `ref.i31`, `i31.get_*`, `any.convert_extern`, `extern.convert_any`.
    GcUnary(Opcode),
}

impl Instr {
    /// The opcode this instruction was decoded from.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instr::Unreachable => Opcode::Unreachable,
            Instr::Nop => Opcode::Nop,
            Instr::Drop => Opcode::Drop,
            Instr::Select(None) => Opcode::Select,
            Instr::Select(Some(_)) => Opcode::SelectT,
            Instr::Br(_) => Opcode::Br,
            Instr::BrIf(_) => Opcode::BrIf,
            Instr::BrTable { .. } => Opcode::BrTable,
            Instr::BrOnNull(_) => Opcode::BrOnNull,
            Instr::BrOnNonNull(_) => Opcode::BrOnNonNull,
            Instr::Return => Opcode::Return,
            Instr::Call(_) => Opcode::Call,
            Instr::CallIndirect { .. } => Opcode::CallIndirect,
            Instr::ReturnCall(_) => Opcode::ReturnCall,
            Instr::ReturnCallIndirect { .. } => Opcode::ReturnCallIndirect,
            Instr::CallRef(_) => Opcode::CallRef,
            Instr::ReturnCallRef(_) => Opcode::ReturnCallRef,
            Instr::Throw(_) => Opcode::Throw,
            Instr::Rethrow(_) => Opcode::Rethrow,
            Instr::ThrowRef => Opcode::ThrowRef,
            Instr::LocalGet(_) => Opcode::LocalGet,
            Instr::LocalSet(_) => Opcode::LocalSet,
            Instr::LocalTee(_) => Opcode::LocalTee,
            Instr::GlobalGet(_) => Opcode::GlobalGet,
            Instr::GlobalSet(_) => Opcode::GlobalSet,
            Instr::TableGet(_) => Opcode::TableGet,
            Instr::TableSet(_) => Opcode::TableSet,
            Instr::TableGrow(_) => Opcode::TableGrow,
            Instr::TableSize(_) => Opcode::TableSize,
            Instr::TableFill(_) => Opcode::TableFill,
            Instr::TableCopy { .. } => Opcode::TableCopy,
            Instr::TableInit { .. } => Opcode::TableInit,
            Instr::ElemDrop(_) => Opcode::ElemDrop,
            Instr::MemorySize(_) => Opcode::MemorySize,
            Instr::MemoryGrow(_) => Opcode::MemoryGrow,
            Instr::MemoryInit { .. } => Opcode::MemoryInit,
            Instr::DataDrop(_) => Opcode::DataDrop,
            Instr::MemoryCopy { .. } => Opcode::MemoryCopy,
            Instr::MemoryFill(_) => Opcode::MemoryFill,
            Instr::AtomicFence => Opcode::AtomicFence,
            Instr::I32Const(_) => Opcode::I32Const,
            Instr::I64Const(_) => Opcode::I64Const,
            Instr::F32Const(_) => Opcode::F32Const,
            Instr::F64Const(_) => Opcode::F64Const,
            Instr::V128Const(_) => Opcode::V128Const,
            Instr::Shuffle(_) => Opcode::I8x16Shuffle,
            Instr::RefNull(_) => Opcode::RefNull,
            Instr::RefIsNull => Opcode::RefIsNull,
            Instr::RefFunc(_) => Opcode::RefFunc,
            Instr::RefEq => Opcode::RefEq,
            Instr::RefAsNonNull => Opcode::RefAsNonNull,
            Instr::StructNew(_) => Opcode::StructNew,
            Instr::StructNewDefault(_) => Opcode::StructNewDefault,
            Instr::StructSet { .. } => Opcode::StructSet,
            Instr::ArrayNew(_) => Opcode::ArrayNew,
            Instr::ArrayNewDefault(_) => Opcode::ArrayNewDefault,
            Instr::ArrayNewFixed { .. } => Opcode::ArrayNewFixed,
            Instr::ArrayNewData { .. } => Opcode::ArrayNewData,
            Instr::ArrayNewElem { .. } => Opcode::ArrayNewElem,
            Instr::ArraySet(_) => Opcode::ArraySet,
            Instr::ArrayLen => Opcode::ArrayLen,
            Instr::ArrayFill(_) => Opcode::ArrayFill,
            Instr::ArrayCopy { .. } => Opcode::ArrayCopy,
            Instr::ArrayInitData { .. } => Opcode::ArrayInitData,
            Instr::ArrayInitElem { .. } => Opcode::ArrayInitElem,
            Instr::RefTest(rt) if rt.nullable => Opcode::RefTestNull,
            Instr::RefTest(_) => Opcode::RefTest,
            Instr::RefCast(rt) if rt.nullable => Opcode::RefCastNull,
            Instr::RefCast(_) => Opcode::RefCast,
            Instr::BrOnCast { op, .. }
            | Instr::Load { op, .. }
            | Instr::Store { op, .. }
            | Instr::Atomic { op, .. }
            | Instr::LoadLane { op, .. }
            | Instr::StoreLane { op, .. }
            | Instr::Unary(op)
            | Instr::Binary(op)
            | Instr::Compare(op)
            | Instr::Convert(op)
            | Instr::Ternary(op)
            | Instr::LaneOp { op, .. }
            | Instr::StructGet { op, .. }
            | Instr::ArrayGet { op, .. }
            | Instr::GcUnary(op) => *op,
        }
    }
}

/// Index of a node in an [`ExprArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(u32);

/// Handle to a chain of nodes in an [`ExprArena`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ExprList {
    head: Option<ExprId>,
    tail: Option<ExprId>,
    len: u32,
}

impl ExprList {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn first(&self) -> Option<ExprId> {
        self.head
    }

    pub fn last(&self) -> Option<ExprId> {
        self.tail
    }
}

/// Body and signature of a structured instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub label: Option<String>,
    pub ty: BlockType,
    pub exprs: ExprList,
    pub end_loc: Location,
}

impl Block {
    pub fn new(ty: BlockType) -> Self {
        Self {
            label: None,
            ty,
            exprs: ExprList::default(),
            end_loc: Location::default(),
        }
    }
}

/// A legacy `catch` or `catch_all` arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchBlock {
    /// `None` for `catch_all`.
    pub tag: Option<Var>,
    pub exprs: ExprList,
    pub loc: Location,
}

/// How a legacy `try` block is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryKind {
    /// `try ... end` without handlers.
    Plain,
    Catch(Vec<CatchBlock>),
    Delegate(Var),
}

/// A node of an expression list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Block(Block),
    Loop(Block),
    If {
        block: Block,
        false_exprs: ExprList,
        else_loc: Option<Location>,
    },
    Try {
        block: Block,
        kind: TryKind,
    },
    TryTable {
        block: Block,
        catches: Vec<TableCatch>,
    },
    /// Producer metadata attached to the instruction that follows it.
    CodeMetadata {
        name: String,
        data: Vec<u8>,
    },
    Instr(Instr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprNode {
    pub expr: Expr,
    pub loc: Location,
    next: Option<ExprId>,
}

/// Storage for every expression node of a module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExprArena {
    nodes: Vec<ExprNode>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends a new node to the end of `list`.
    pub fn push(&mut self, list: &mut ExprList, expr: Expr, loc: Location) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(ExprNode {
            expr,
            loc,
            next: None,
        });
        match list.tail {
            Some(tail) => self.nodes[tail.0 as usize].next = Some(id),
            None => list.head = Some(id),
        }
        list.tail = Some(id);
        list.len += 1;
        id
    }

    pub fn get(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ExprId) -> &mut ExprNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn next(&self, id: ExprId) -> Option<ExprId> {
        self.get(id).next
    }

    /// Iterates over the nodes of `list` in order.
    pub fn iter(&self, list: ExprList) -> ExprIter<'_> {
        ExprIter {
            arena: self,
            next: list.head,
        }
    }
}

pub struct ExprIter<'a> {
    arena: &'a ExprArena,
    next: Option<ExprId>,
}

impl<'a> Iterator for ExprIter<'a> {
    type Item = &'a ExprNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.arena.get(self.next?);
        self.next = node.next;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instr(i: Instr) -> Expr {
        Expr::Instr(i)
    }

    #[test]
    fn push_appends_in_order() {
        let mut arena = ExprArena::new();
        let mut list = ExprList::default();
        arena.push(&mut list, instr(Instr::I32Const(1)), Location::new(10));
        arena.push(&mut list, instr(Instr::I32Const(2)), Location::new(12));
        arena.push(&mut list, instr(Instr::Binary(Opcode::I32Add)), Location::new(14));

        assert_eq!(list.len(), 3);
        let offsets: Vec<_> = arena.iter(list).map(|n| n.loc.offset).collect();
        assert_eq!(offsets, [10, 12, 14]);
    }

    #[test]
    fn lists_sharing_an_arena_stay_separate() {
        let mut arena = ExprArena::new();
        let mut outer = ExprList::default();
        let mut inner = ExprList::default();
        arena.push(&mut outer, instr(Instr::Nop), Location::new(0));
        arena.push(&mut inner, instr(Instr::Drop), Location::new(1));
        arena.push(&mut outer, instr(Instr::Return), Location::new(2));

        let outer_ops: Vec<_> = arena
            .iter(outer)
            .map(|n| match &n.expr {
                Expr::Instr(i) => i.opcode(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(outer_ops, [Opcode::Nop, Opcode::Return]);
        assert_eq!(arena.iter(inner).count(), 1);
    }

    #[test]
    fn opcode_of_typed_variants() {
        assert_eq!(Instr::Select(Some(vec![Type::I32])).opcode(), Opcode::SelectT);
        assert_eq!(
            Instr::RefCast(RefType::nullable(HeapType::Any)).opcode(),
            Opcode::RefCastNull
        );
        assert_eq!(Instr::Binary(Opcode::I64Add).opcode(), Opcode::I64Add);
    }
}
