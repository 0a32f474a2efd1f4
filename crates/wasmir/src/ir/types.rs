//! Module IR definitions.
//!
//! Entities are stored in insertion order, one vector per index space.
//! Imported entities occupy the first slots of their index space, matching
//! WebAssembly numbering. Cross references are [`Var`]s, never pointers.

use super::binding::BindingHash;
use super::expr::{ExprArena, ExprList};
use crate::binary::{DylinkInfo, ExternalKind, LinkingInfo, RelocSection, TargetFeature};
use crate::types::{CompositeType, FuncType, GlobalType, MemoryType, RefType, SubType, TableType, Type};
use std::fmt;

/// Byte offset into the binary a construct was read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub offset: usize,
}

impl Location {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:07x}", self.offset)
    }
}

/// A reference to an entity: a resolved index or a textual name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Var {
    Index { index: u32, loc: Location },
    Name { name: String, loc: Location },
}

impl Var {
    pub fn index(index: u32, offset: usize) -> Self {
        Var::Index {
            index,
            loc: Location::new(offset),
        }
    }

    pub fn name(name: impl Into<String>, offset: usize) -> Self {
        Var::Name {
            name: name.into(),
            loc: Location::new(offset),
        }
    }

    /// The resolved index, or `None` for a name that was never resolved.
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Var::Index { index, .. } => Some(*index),
            Var::Name { .. } => None,
        }
    }

    pub fn loc(&self) -> Location {
        match self {
            Var::Index { loc, .. } | Var::Name { loc, .. } => *loc,
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Index { index, .. } => write!(f, "{index}"),
            Var::Name { name, .. } => write!(f, "${name}"),
        }
    }
}

/// A type section entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    pub name: Option<String>,
    pub sub: SubType,
    /// Index of the first type in this entry's recursion group.
    pub rec_group: u32,
    /// Field names for struct types, filled from the name section.
    pub field_names: Vec<Option<String>>,
}

impl TypeEntry {
    pub fn func_type(&self) -> Option<&FuncType> {
        self.sub.composite.as_func()
    }
}

/// Local declarations of a function, stored run-length encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalTypes {
    decls: Vec<(Type, u32)>,
    count: u64,
}

impl LocalTypes {
    pub fn push(&mut self, ty: Type, count: u32) {
        if count == 0 {
            return;
        }
        self.count += u64::from(count);
        self.decls.push((ty, count));
    }

    /// Total number of declared locals, excluding parameters.
    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn decls(&self) -> &[(Type, u32)] {
        &self.decls
    }

    /// Type of the `index`th declared local.
    pub fn get(&self, mut index: u64) -> Option<Type> {
        for &(ty, count) in &self.decls {
            if index < u64::from(count) {
                return Some(ty);
            }
            index -= u64::from(count);
        }
        None
    }
}

/// A function, imported or defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Func {
    pub name: Option<String>,
    pub type_index: Var,
    pub sig: FuncType,
    pub locals: LocalTypes,
    /// Names of parameters and locals, by local index.
    pub bindings: BindingHash,
    pub exprs: ExprList,
    pub loc: Location,
    /// Byte length of the body; 0 for imports.
    pub body_size: u32,
    pub imported: bool,
}

impl Func {
    pub fn num_params(&self) -> usize {
        self.sig.params.len()
    }

    /// Type of a parameter or local, by local index.
    pub fn local_type(&self, index: u32) -> Option<Type> {
        let params = self.sig.params.len() as u64;
        let index = u64::from(index);
        if index < params {
            return self.sig.params.get(index as usize).copied();
        }
        self.locals.get(index - params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: Option<String>,
    pub ty: TableType,
    pub imported: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    pub name: Option<String>,
    pub ty: MemoryType,
    pub imported: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub name: Option<String>,
    pub ty: GlobalType,
    pub init: ExprList,
    pub imported: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: Option<String>,
    pub type_index: Var,
    pub sig: FuncType,
    pub imported: bool,
}

/// Index of the imported entity within its own index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportItem {
    Func(u32),
    Table(u32),
    Memory(u32),
    Global(u32),
    Tag(u32),
}

impl ImportItem {
    pub fn kind(self) -> ExternalKind {
        match self {
            ImportItem::Func(_) => ExternalKind::Func,
            ImportItem::Table(_) => ExternalKind::Table,
            ImportItem::Memory(_) => ExternalKind::Memory,
            ImportItem::Global(_) => ExternalKind::Global,
            ImportItem::Tag(_) => ExternalKind::Tag,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    pub field: String,
    pub item: ImportItem,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub kind: ExternalKind,
    pub var: Var,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElemMode {
    Active { table: Var, offset: ExprList },
    Passive,
    Declared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElemSegment {
    pub name: Option<String>,
    pub mode: ElemMode,
    pub elem_type: RefType,
    /// One constant expression per element.
    pub elems: Vec<ExprList>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataMode {
    Active { memory: Var, offset: ExprList },
    Passive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    pub name: Option<String>,
    pub mode: DataMode,
    pub data: Vec<u8>,
    pub loc: Location,
}

/// A custom section as it appeared in the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Custom {
    pub name: String,
    pub data: Vec<u8>,
    pub loc: Location,
}

/// A complete module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub name: Option<String>,
    pub types: Vec<TypeEntry>,
    pub imports: Vec<Import>,
    pub funcs: Vec<Func>,
    pub tables: Vec<Table>,
    pub memories: Vec<Memory>,
    pub globals: Vec<Global>,
    pub tags: Vec<Tag>,
    pub elem_segments: Vec<ElemSegment>,
    pub data_segments: Vec<DataSegment>,
    pub exports: Vec<Export>,
    pub starts: Vec<Var>,
    pub customs: Vec<Custom>,
    pub data_count: Option<u32>,

    pub num_func_imports: u32,
    pub num_table_imports: u32,
    pub num_memory_imports: u32,
    pub num_global_imports: u32,
    pub num_tag_imports: u32,

    pub type_bindings: BindingHash,
    pub func_bindings: BindingHash,
    pub table_bindings: BindingHash,
    pub memory_bindings: BindingHash,
    pub global_bindings: BindingHash,
    pub tag_bindings: BindingHash,
    pub elem_bindings: BindingHash,
    pub data_bindings: BindingHash,
    pub export_bindings: BindingHash,

    pub linking: Option<LinkingInfo>,
    pub relocations: Vec<RelocSection>,
    pub dylink: Option<DylinkInfo>,
    pub target_features: Vec<TargetFeature>,

    /// Storage for every expression list in the module.
    pub exprs: ExprArena,
}

impl Module {
    pub fn func_type(&self, index: u32) -> Option<&FuncType> {
        self.types.get(index as usize)?.func_type()
    }

    pub fn composite_type(&self, index: u32) -> Option<&CompositeType> {
        self.types.get(index as usize).map(|t| &t.sub.composite)
    }

    /// Functions defined in the module, skipping imports.
    pub fn defined_funcs(&self) -> impl Iterator<Item = &Func> {
        self.funcs.iter().skip(self.num_func_imports as usize)
    }

    pub fn export(&self, name: &str) -> Option<&Export> {
        let index = self.export_bindings.find_index(name)?;
        self.exports.get(index as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_types_expand_runs() {
        let mut locals = LocalTypes::default();
        locals.push(Type::I32, 2);
        locals.push(Type::F64, 0);
        locals.push(Type::I64, 3);
        assert_eq!(locals.len(), 5);
        assert_eq!(locals.get(1), Some(Type::I32));
        assert_eq!(locals.get(2), Some(Type::I64));
        assert_eq!(locals.get(5), None);
        assert_eq!(locals.decls().len(), 2);
    }

    #[test]
    fn func_local_type_counts_params_first() {
        let mut locals = LocalTypes::default();
        locals.push(Type::F32, 1);
        let func = Func {
            name: None,
            type_index: Var::index(0, 0),
            sig: FuncType::new(vec![Type::I32, Type::I64], vec![]),
            locals,
            bindings: BindingHash::default(),
            exprs: ExprList::default(),
            loc: Location::default(),
            body_size: 0,
            imported: false,
        };
        assert_eq!(func.local_type(1), Some(Type::I64));
        assert_eq!(func.local_type(2), Some(Type::F32));
        assert_eq!(func.local_type(3), None);
    }

    #[test]
    fn var_display() {
        assert_eq!(Var::index(3, 0).to_string(), "3");
        assert_eq!(Var::name("main", 0).to_string(), "$main");
        assert_eq!(Var::index(3, 9).loc(), Location::new(9));
    }
}
