//! Streaming WebAssembly binary reader.
//!
//! The reader walks a module once, front to back, and announces everything
//! it decodes as an [`Event`] to an [`EventSink`]. Consumers such as the IR
//! builder and the validator are sinks; they can be run alone or together.
//!
//! ```text
//!   bytes ──► reader ──► Event ──► IrBuilder ──► Module
//!                           └────► Validator ──► Errors
//! ```
//!
//! | Module     | Responsibility                                 |
//! |------------|------------------------------------------------|
//! | `leb128`   | Variable-length integer codec                  |
//! | `reader`   | Header, section framing, known sections        |
//! | `instr`    | Instruction stream decoding                    |
//! | `custom`   | Name, linking, reloc, dylink and other customs |
//! | `event`    | The event enum and sink plumbing               |

mod custom;
mod event;
mod instr;
pub mod leb128;
mod reader;

pub use event::{
    Event, EventLog, EventSink, ImportDesc, InitExprTarget, LoggingSink, NameKind, Operator,
    SegmentMode,
};
pub use reader::read_binary;

use crate::features::Features;
use std::fmt;

pub const MAGIC: [u8; 4] = *b"\0asm";
pub const VERSION: u32 = 1;

/// Known section ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionId {
    Custom,
    Type,
    Import,
    Function,
    Table,
    Memory,
    Global,
    Export,
    Start,
    Elem,
    Code,
    Data,
    DataCount,
    Tag,
}

impl SectionId {
    pub fn from_u8(id: u8) -> Option<SectionId> {
        let section = match id {
            0 => SectionId::Custom,
            1 => SectionId::Type,
            2 => SectionId::Import,
            3 => SectionId::Function,
            4 => SectionId::Table,
            5 => SectionId::Memory,
            6 => SectionId::Global,
            7 => SectionId::Export,
            8 => SectionId::Start,
            9 => SectionId::Elem,
            10 => SectionId::Code,
            11 => SectionId::Data,
            12 => SectionId::DataCount,
            13 => SectionId::Tag,
            _ => return None,
        };
        Some(section)
    }

    /// Position in the mandatory section order. Custom sections have none.
    pub fn order(self) -> Option<u8> {
        let rank = match self {
            SectionId::Custom => return None,
            SectionId::Type => 1,
            SectionId::Import => 2,
            SectionId::Function => 3,
            SectionId::Table => 4,
            SectionId::Memory => 5,
            SectionId::Tag => 6,
            SectionId::Global => 7,
            SectionId::Export => 8,
            SectionId::Start => 9,
            SectionId::Elem => 10,
            SectionId::DataCount => 11,
            SectionId::Code => 12,
            SectionId::Data => 13,
        };
        Some(rank)
    }

    pub fn name(self) -> &'static str {
        match self {
            SectionId::Custom => "Custom",
            SectionId::Type => "Type",
            SectionId::Import => "Import",
            SectionId::Function => "Function",
            SectionId::Table => "Table",
            SectionId::Memory => "Memory",
            SectionId::Global => "Global",
            SectionId::Export => "Export",
            SectionId::Start => "Start",
            SectionId::Elem => "Elem",
            SectionId::Code => "Code",
            SectionId::Data => "Data",
            SectionId::DataCount => "DataCount",
            SectionId::Tag => "Tag",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of an import or export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalKind {
    Func,
    Table,
    Memory,
    Global,
    Tag,
}

impl ExternalKind {
    pub fn from_u8(kind: u8) -> Option<ExternalKind> {
        let kind = match kind {
            0 => ExternalKind::Func,
            1 => ExternalKind::Table,
            2 => ExternalKind::Memory,
            3 => ExternalKind::Global,
            4 => ExternalKind::Tag,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            ExternalKind::Func => "func",
            ExternalKind::Table => "table",
            ExternalKind::Memory => "memory",
            ExternalKind::Global => "global",
            ExternalKind::Tag => "tag",
        }
    }
}

impl fmt::Display for ExternalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Relocation kinds from the `reloc.*` sections of object files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelocType {
    FuncIndexLeb,
    TableIndexSleb,
    TableIndexI32,
    MemoryAddressLeb,
    MemoryAddressSleb,
    MemoryAddressI32,
    TypeIndexLeb,
    GlobalIndexLeb,
    FunctionOffsetI32,
    SectionOffsetI32,
    TagIndexLeb,
    MemoryAddressRelSleb,
    TableIndexRelSleb,
    GlobalIndexI32,
    MemoryAddressLeb64,
    MemoryAddressSleb64,
    MemoryAddressI64,
    MemoryAddressRelSleb64,
    TableIndexSleb64,
    TableIndexI64,
    TableNumberLeb,
    MemoryAddressTlsSleb,
    FunctionOffsetI64,
    MemoryAddressLocRelI32,
    TableIndexRelSleb64,
    MemoryAddressTlsSleb64,
    FuncIndexI32,
}

impl RelocType {
    pub fn from_u8(value: u8) -> Option<RelocType> {
        use RelocType::*;
        const ALL: [RelocType; 27] = [
            FuncIndexLeb,
            TableIndexSleb,
            TableIndexI32,
            MemoryAddressLeb,
            MemoryAddressSleb,
            MemoryAddressI32,
            TypeIndexLeb,
            GlobalIndexLeb,
            FunctionOffsetI32,
            SectionOffsetI32,
            TagIndexLeb,
            MemoryAddressRelSleb,
            TableIndexRelSleb,
            GlobalIndexI32,
            MemoryAddressLeb64,
            MemoryAddressSleb64,
            MemoryAddressI64,
            MemoryAddressRelSleb64,
            TableIndexSleb64,
            TableIndexI64,
            TableNumberLeb,
            MemoryAddressTlsSleb,
            FunctionOffsetI64,
            MemoryAddressLocRelI32,
            TableIndexRelSleb64,
            MemoryAddressTlsSleb64,
            FuncIndexI32,
        ];
        ALL.get(usize::from(value)).copied()
    }

    /// Whether entries of this kind carry an addend.
    pub fn has_addend(self) -> bool {
        use RelocType::*;
        matches!(
            self,
            MemoryAddressLeb
                | MemoryAddressSleb
                | MemoryAddressI32
                | MemoryAddressRelSleb
                | MemoryAddressLeb64
                | MemoryAddressSleb64
                | MemoryAddressI64
                | MemoryAddressRelSleb64
                | MemoryAddressTlsSleb
                | MemoryAddressLocRelI32
                | MemoryAddressTlsSleb64
                | FunctionOffsetI32
                | FunctionOffsetI64
                | SectionOffsetI32
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reloc {
    pub ty: RelocType,
    pub offset: u32,
    pub index: u32,
    pub addend: i64,
}

/// A `reloc.*` section: the relocations applying to one target section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocSection {
    pub name: String,
    pub section_index: u32,
    pub relocs: Vec<Reloc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Data,
    Global,
    Section,
    Tag,
    Table,
}

impl SymbolKind {
    pub fn from_u8(value: u8) -> Option<SymbolKind> {
        let kind = match value {
            0 => SymbolKind::Function,
            1 => SymbolKind::Data,
            2 => SymbolKind::Global,
            3 => SymbolKind::Section,
            4 => SymbolKind::Tag,
            5 => SymbolKind::Table,
            _ => return None,
        };
        Some(kind)
    }
}

pub mod symbol_flags {
    pub const BINDING_WEAK: u32 = 0x1;
    pub const BINDING_LOCAL: u32 = 0x2;
    pub const VISIBILITY_HIDDEN: u32 = 0x4;
    pub const UNDEFINED: u32 = 0x10;
    pub const EXPORTED: u32 = 0x20;
    pub const EXPLICIT_NAME: u32 = 0x40;
    pub const NO_STRIP: u32 = 0x80;
    pub const TLS: u32 = 0x100;
}

/// Placement of a data symbol inside a data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataSymbolLocation {
    pub segment: u32,
    pub offset: u64,
    pub size: u64,
}

/// One entry of the `linking` symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub flags: u32,
    pub name: Option<String>,
    /// Item index for function, global, tag, table and section symbols.
    pub index: Option<u32>,
    /// Segment placement of a defined data symbol.
    pub data: Option<DataSymbolLocation>,
}

impl Symbol {
    pub fn is_undefined(&self) -> bool {
        self.flags & symbol_flags::UNDEFINED != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    pub name: String,
    pub alignment_log2: u32,
    pub flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InitFunction {
    pub priority: u32,
    pub symbol: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComdatKind {
    Data,
    Function,
    Global,
    Event,
    Table,
    Section,
}

impl ComdatKind {
    pub fn from_u8(value: u8) -> Option<ComdatKind> {
        let kind = match value {
            0 => ComdatKind::Data,
            1 => ComdatKind::Function,
            2 => ComdatKind::Global,
            3 => ComdatKind::Event,
            4 => ComdatKind::Table,
            5 => ComdatKind::Section,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comdat {
    pub name: String,
    pub flags: u32,
    pub entries: Vec<(ComdatKind, u32)>,
}

/// Decoded contents of the `linking` custom section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkingInfo {
    pub version: u32,
    pub symbols: Vec<Symbol>,
    pub segments: Vec<SegmentInfo>,
    pub init_functions: Vec<InitFunction>,
    pub comdats: Vec<Comdat>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DylinkMemInfo {
    pub mem_size: u32,
    pub mem_align: u32,
    pub table_size: u32,
    pub table_align: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DylinkImport {
    pub module: String,
    pub field: String,
    pub flags: u32,
}

/// Decoded contents of a `dylink` or `dylink.0` custom section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DylinkInfo {
    pub mem_info: DylinkMemInfo,
    pub needed: Vec<String>,
    pub exports: Vec<(String, u32)>,
    pub imports: Vec<DylinkImport>,
}

/// A `target_features` entry: `+` used, `-` disallowed, `=` required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFeature {
    pub prefix: u8,
    pub name: String,
}

/// Ceilings applied while building IR from untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub max_nesting_depth: usize,
    pub max_locals: u64,
    pub max_params: usize,
    pub max_results: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_nesting_depth: 16384,
            max_locals: 50000,
            max_params: 1000,
            max_results: 1000,
        }
    }
}

/// Options controlling a read.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub features: Features,
    /// Decode the `name` section instead of treating it as opaque.
    pub read_debug_names: bool,
    pub stop_on_first_error: bool,
    pub fail_on_custom_section_error: bool,
    /// Hand function bodies to the sink undecoded.
    pub skip_function_bodies: bool,
    pub limits: ResourceLimits,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            features: Features::default(),
            read_debug_names: true,
            stop_on_first_error: true,
            fail_on_custom_section_error: true,
            skip_function_bodies: false,
            limits: ResourceLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_section_sorts_between_memory_and_global() {
        let memory = SectionId::Memory.order().unwrap();
        let tag = SectionId::Tag.order().unwrap();
        let global = SectionId::Global.order().unwrap();
        assert!(memory < tag && tag < global);
        assert!(SectionId::DataCount.order() < SectionId::Code.order());
        assert_eq!(SectionId::Custom.order(), None);
    }

    #[test]
    fn section_ids_decode() {
        assert_eq!(SectionId::from_u8(10), Some(SectionId::Code));
        assert_eq!(SectionId::from_u8(13), Some(SectionId::Tag));
        assert_eq!(SectionId::from_u8(14), None);
    }

    #[test]
    fn reloc_addends() {
        assert!(RelocType::from_u8(3).unwrap().has_addend());
        assert!(!RelocType::from_u8(0).unwrap().has_addend());
        assert_eq!(RelocType::from_u8(26), Some(RelocType::FuncIndexI32));
        assert_eq!(RelocType::from_u8(27), None);
    }
}
