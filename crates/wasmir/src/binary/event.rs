//! Events announced by the reader and the sinks that consume them.

use super::{
    Comdat, DylinkImport, DylinkMemInfo, ExternalKind, InitFunction, Reloc, SectionId,
    SegmentInfo, Symbol,
};
use crate::error::Error;
use crate::ir::{Instr, TableCatch, Var};
use crate::types::{BlockType, GlobalType, MemoryType, RefType, SubType, TableType, Type};

/// What an import brings into the module, with its index in that space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportDesc {
    Func { func_index: u32, type_index: u32 },
    Table { table_index: u32, ty: TableType },
    Memory { memory_index: u32, ty: MemoryType },
    Global { global_index: u32, ty: GlobalType },
    Tag { tag_index: u32, type_index: u32 },
}

/// Where a constant expression's value goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitExprTarget {
    Global(u32),
    ElemOffset(u32),
    ElemExpr { segment: u32, index: u32 },
    DataOffset(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentMode {
    /// Active in the given table or memory.
    Active(u32),
    Passive,
    /// Element segments only: forward-declares `ref.func` targets.
    Declared,
}

/// Index spaces named by the extended name subsections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    Type,
    Table,
    Memory,
    Global,
    ElemSegment,
    DataSegment,
    Tag,
}

/// An instruction as it appears in the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Block(BlockType),
    Loop(BlockType),
    If(BlockType),
    Else,
    End,
    Try(BlockType),
    Catch(Var),
    CatchAll,
    Delegate(Var),
    TryTable {
        ty: BlockType,
        catches: Vec<TableCatch>,
    },
    Instr(Instr),
}

/// Everything the reader announces, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<'a> {
    BeginModule {
        version: u32,
    },
    EndModule,
    BeginSection {
        id: SectionId,
        size: u32,
    },
    EndSection {
        id: SectionId,
    },

    TypeCount(u32),
    RecGroup {
        first: u32,
        count: u32,
    },
    Type {
        index: u32,
        ty: SubType,
    },

    ImportCount(u32),
    Import {
        index: u32,
        module: &'a str,
        field: &'a str,
        desc: ImportDesc,
    },

    FunctionCount(u32),
    Function {
        index: u32,
        type_index: u32,
    },

    TableCount(u32),
    Table {
        index: u32,
        ty: TableType,
    },

    MemoryCount(u32),
    Memory {
        index: u32,
        ty: MemoryType,
    },

    TagCount(u32),
    Tag {
        index: u32,
        type_index: u32,
    },

    GlobalCount(u32),
    BeginGlobal {
        index: u32,
        ty: GlobalType,
    },
    EndGlobal {
        index: u32,
    },

    /// Starts a constant expression; its operators follow, ending in `end`.
    BeginInitExpr {
        target: InitExprTarget,
    },
    EndInitExpr {
        target: InitExprTarget,
    },

    ExportCount(u32),
    Export {
        index: u32,
        name: &'a str,
        kind: ExternalKind,
        item_index: u32,
    },

    StartFunction(u32),

    ElemSegmentCount(u32),
    /// Opens a segment. For active segments the offset expression follows,
    /// then [`Event::ElemSegmentType`].
    BeginElemSegment {
        index: u32,
        mode: SegmentMode,
    },
    ElemSegmentType {
        index: u32,
        elem_type: RefType,
        count: u32,
    },
    /// An element given as a bare function index.
    ElemFunction {
        segment: u32,
        index: u32,
        func_index: u32,
    },
    EndElemSegment {
        index: u32,
    },

    DataCount(u32),

    FunctionBodyCount(u32),
    BeginFunctionBody {
        index: u32,
        size: u32,
    },
    LocalDeclCount(u32),
    LocalDecl {
        decl_index: u32,
        count: u32,
        ty: Type,
    },
    Operator(Operator),
    /// A body left undecoded under `skip_function_bodies`.
    SkippedFunctionBody {
        index: u32,
        body: &'a [u8],
    },
    EndFunctionBody {
        index: u32,
    },

    DataSegmentCount(u32),
    BeginDataSegment {
        index: u32,
        mode: SegmentMode,
    },
    DataSegmentData {
        index: u32,
        data: &'a [u8],
    },
    EndDataSegment {
        index: u32,
    },

    /// Every custom section, with its payload after the name.
    BeginCustomSection {
        name: &'a str,
        data: &'a [u8],
    },
    EndCustomSection {
        name: &'a str,
    },

    ModuleName(&'a str),
    FunctionName {
        index: u32,
        name: &'a str,
    },
    LocalName {
        func_index: u32,
        local_index: u32,
        name: &'a str,
    },
    LabelName {
        func_index: u32,
        label_index: u32,
        name: &'a str,
    },
    FieldName {
        type_index: u32,
        field_index: u32,
        name: &'a str,
    },
    Name {
        kind: NameKind,
        index: u32,
        name: &'a str,
    },

    RelocCount {
        section_index: u32,
        count: u32,
    },
    Reloc(Reloc),

    LinkingVersion(u32),
    Symbol {
        index: u32,
        symbol: Symbol,
    },
    SegmentInfo(SegmentInfo),
    InitFunction(InitFunction),
    Comdat(Comdat),

    DylinkMemInfo(DylinkMemInfo),
    DylinkNeeded(&'a str),
    DylinkExport {
        name: &'a str,
        flags: u32,
    },
    DylinkImport(DylinkImport),

    TargetFeature {
        prefix: u8,
        name: &'a str,
    },

    /// One `metadata.code.*` annotation; `offset` is relative to the start
    /// of the function body.
    CodeMetadata {
        name: &'a str,
        func_index: u32,
        offset: u32,
        data: &'a [u8],
    },
}

/// Receives events from the reader.
///
/// Returning an error reports it; the reader then decides from the error
/// kind and its options whether to stop or keep going.
pub trait EventSink<'a> {
    fn on_event(&mut self, offset: usize, event: &Event<'a>) -> Result<(), Error>;
}

impl<'a, S: EventSink<'a> + ?Sized> EventSink<'a> for &mut S {
    fn on_event(&mut self, offset: usize, event: &Event<'a>) -> Result<(), Error> {
        (**self).on_event(offset, event)
    }
}

/// Feeds every event to both sinks so their state stays in step. When both
/// fail, the first sink's error is reported.
impl<'a, A: EventSink<'a>, B: EventSink<'a>> EventSink<'a> for (A, B) {
    fn on_event(&mut self, offset: usize, event: &Event<'a>) -> Result<(), Error> {
        let first = self.0.on_event(offset, event);
        let second = self.1.on_event(offset, event);
        first.and(second)
    }
}

/// Records every event with its offset.
#[derive(Debug, Default)]
pub struct EventLog<'a> {
    pub events: Vec<(usize, Event<'a>)>,
}

impl<'a> EventLog<'a> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'a> EventSink<'a> for EventLog<'a> {
    fn on_event(&mut self, offset: usize, event: &Event<'a>) -> Result<(), Error> {
        self.events.push((offset, event.clone()));
        Ok(())
    }
}

/// Traces every event before forwarding it.
pub struct LoggingSink<S> {
    inner: S,
    depth: usize,
}

impl<S> LoggingSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, depth: 0 }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<'a, S: EventSink<'a>> EventSink<'a> for LoggingSink<S> {
    fn on_event(&mut self, offset: usize, event: &Event<'a>) -> Result<(), Error> {
        if let Event::Operator(Operator::End | Operator::Delegate(_)) | Event::EndSection { .. } =
            event
        {
            self.depth = self.depth.saturating_sub(1);
        }
        log::trace!("{offset:07x}: {:indent$}{event:?}", "", indent = self.depth * 2);
        if let Event::BeginSection { .. }
        | Event::BeginFunctionBody { .. }
        | Event::BeginInitExpr { .. }
        | Event::Operator(
            Operator::Block(_)
            | Operator::Loop(_)
            | Operator::If(_)
            | Operator::Try(_)
            | Operator::TryTable { .. },
        ) = event
        {
            self.depth += 1;
        }
        self.inner.on_event(offset, event)
    }
}
