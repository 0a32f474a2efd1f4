//! Declarations: one handler per module-level event.

use super::core::{IrBuilder, LabelKind};
use crate::binary::{
    DylinkImport, ExternalKind, ImportDesc, InitExprTarget, LinkingInfo, RelocSection,
    SegmentMode, Symbol, SymbolKind, TargetFeature,
};
use crate::error::Error;
use crate::ir::{
    Binding, Custom, DataMode, DataSegment, ElemMode, ElemSegment, Export, Expr, Func, Global,
    Import, ImportItem, Instr, Location, Memory, Table, Tag, TypeEntry, Var,
};
use crate::types::{
    CompositeType, FuncType, GlobalType, MemoryType, RefType, SubType, TableType, Type,
};

impl IrBuilder {
    pub(super) fn on_type(&mut self, offset: usize, index: u32, ty: &SubType) -> Result<(), Error> {
        self.module.types.push(TypeEntry {
            name: None,
            sub: ty.clone(),
            rec_group: self.rec_group,
            field_names: Vec::new(),
        });
        if let CompositeType::Func(func) = &ty.composite {
            if func.params.len() > self.limits.max_params {
                return Err(Error::resource_limit(
                    offset,
                    format!(
                        "type {index} has {} params, maximum is {}",
                        func.params.len(),
                        self.limits.max_params
                    ),
                ));
            }
            if func.results.len() > self.limits.max_results {
                return Err(Error::resource_limit(
                    offset,
                    format!(
                        "type {index} has {} results, maximum is {}",
                        func.results.len(),
                        self.limits.max_results
                    ),
                ));
            }
        }
        Ok(())
    }

    fn signature(&self, type_index: u32) -> FuncType {
        self.module.func_type(type_index).cloned().unwrap_or_default()
    }

    fn new_func(&self, type_index: u32, offset: usize, imported: bool) -> Func {
        Func {
            name: None,
            type_index: Var::index(type_index, offset),
            sig: self.signature(type_index),
            locals: Default::default(),
            bindings: Default::default(),
            exprs: Default::default(),
            loc: Location::new(offset),
            body_size: 0,
            imported,
        }
    }

    fn new_tag(&self, type_index: u32, offset: usize, imported: bool) -> Tag {
        Tag {
            name: None,
            type_index: Var::index(type_index, offset),
            sig: self.signature(type_index),
            imported,
        }
    }

    pub(super) fn on_import(
        &mut self,
        offset: usize,
        module: &str,
        field: &str,
        desc: &ImportDesc,
    ) {
        let item = match *desc {
            ImportDesc::Func {
                func_index,
                type_index,
            } => {
                let func = self.new_func(type_index, offset, true);
                self.module.funcs.push(func);
                self.module.num_func_imports += 1;
                ImportItem::Func(func_index)
            }
            ImportDesc::Table { table_index, ty } => {
                self.push_table(ty, true);
                self.module.num_table_imports += 1;
                ImportItem::Table(table_index)
            }
            ImportDesc::Memory { memory_index, ty } => {
                self.push_memory(ty, true);
                self.module.num_memory_imports += 1;
                ImportItem::Memory(memory_index)
            }
            ImportDesc::Global { global_index, ty } => {
                self.push_global(ty, true);
                self.module.num_global_imports += 1;
                ImportItem::Global(global_index)
            }
            ImportDesc::Tag {
                tag_index,
                type_index,
            } => {
                let tag = self.new_tag(type_index, offset, true);
                self.module.tags.push(tag);
                self.module.num_tag_imports += 1;
                ImportItem::Tag(tag_index)
            }
        };
        self.module.imports.push(Import {
            module: module.to_string(),
            field: field.to_string(),
            item,
            loc: Location::new(offset),
        });
    }

    pub(super) fn on_function(&mut self, offset: usize, type_index: u32) {
        let func = self.new_func(type_index, offset, false);
        self.module.funcs.push(func);
    }

    pub(super) fn push_table(&mut self, ty: TableType, imported: bool) {
        self.module.tables.push(Table {
            name: None,
            ty,
            imported,
        });
    }

    pub(super) fn push_memory(&mut self, ty: MemoryType, imported: bool) {
        self.module.memories.push(Memory {
            name: None,
            ty,
            imported,
        });
    }

    pub(super) fn push_global(&mut self, ty: GlobalType, imported: bool) {
        self.module.globals.push(Global {
            name: None,
            ty,
            init: Default::default(),
            imported,
        });
    }

    pub(super) fn on_tag(&mut self, offset: usize, type_index: u32) {
        let tag = self.new_tag(type_index, offset, false);
        self.module.tags.push(tag);
    }

    pub(super) fn on_begin_init_expr(
        &mut self,
        offset: usize,
        target: InitExprTarget,
    ) -> Result<(), Error> {
        self.push_label(LabelKind::InitExpr(target), None, offset)
    }

    pub(super) fn on_export(
        &mut self,
        offset: usize,
        index: u32,
        name: &str,
        kind: ExternalKind,
        item_index: u32,
    ) {
        let loc = Location::new(offset);
        self.module.exports.push(Export {
            name: name.to_string(),
            kind,
            var: Var::index(item_index, offset),
            loc,
        });
        // Duplicate export names are left for the validator to report.
        let _ = self
            .module
            .export_bindings
            .insert(name.to_string(), Binding { loc, index });
    }

    pub(super) fn on_begin_elem_segment(&mut self, offset: usize, mode: SegmentMode) {
        let mode = match mode {
            SegmentMode::Active(table) => ElemMode::Active {
                table: Var::index(table, offset),
                offset: Default::default(),
            },
            SegmentMode::Passive => ElemMode::Passive,
            SegmentMode::Declared => ElemMode::Declared,
        };
        self.module.elem_segments.push(ElemSegment {
            name: None,
            mode,
            elem_type: RefType::FUNCREF,
            elems: Vec::new(),
            loc: Location::new(offset),
        });
    }

    pub(super) fn on_elem_segment_type(&mut self, segment: u32, elem_type: RefType, count: u32) {
        if let Some(segment) = self.module.elem_segments.get_mut(segment as usize) {
            segment.elem_type = elem_type;
            segment.elems.reserve(count as usize);
        }
    }

    /// A bare function index element, stored as a `ref.func` expression.
    pub(super) fn on_elem_function(&mut self, offset: usize, segment: u32, func_index: u32) {
        let list = self.single_expr_list(
            Expr::Instr(Instr::RefFunc(Var::index(func_index, offset))),
            offset,
        );
        if let Some(segment) = self.module.elem_segments.get_mut(segment as usize) {
            segment.elems.push(list);
        }
    }

    pub(super) fn on_begin_data_segment(&mut self, offset: usize, mode: SegmentMode) {
        let mode = match mode {
            SegmentMode::Active(memory) => DataMode::Active {
                memory: Var::index(memory, offset),
                offset: Default::default(),
            },
            SegmentMode::Passive | SegmentMode::Declared => DataMode::Passive,
        };
        self.module.data_segments.push(DataSegment {
            name: None,
            mode,
            data: Vec::new(),
            loc: Location::new(offset),
        });
    }

    pub(super) fn on_data_segment_data(&mut self, index: u32, data: &[u8]) {
        if let Some(segment) = self.module.data_segments.get_mut(index as usize) {
            segment.data = data.to_vec();
        }
    }

    pub(super) fn on_begin_function_body(
        &mut self,
        offset: usize,
        index: u32,
        size: u32,
    ) -> Result<(), Error> {
        self.current_func = Some(index);
        self.body_start = offset;
        if let Some(func) = self.module.funcs.get_mut(index as usize) {
            func.loc = Location::new(offset);
            func.body_size = size;
        }
        self.push_label(LabelKind::Func(index), None, offset)
    }

    pub(super) fn on_local_decl(
        &mut self,
        offset: usize,
        count: u32,
        ty: Type,
    ) -> Result<(), Error> {
        let Some(func) = self
            .current_func
            .and_then(|index| self.module.funcs.get_mut(index as usize))
        else {
            return Ok(());
        };
        func.locals.push(ty, count);
        if func.locals.len() > self.limits.max_locals {
            return Err(Error::resource_limit(
                offset,
                format!(
                    "local count {} exceeds maximum ({})",
                    func.locals.len(),
                    self.limits.max_locals
                ),
            ));
        }
        Ok(())
    }

    /// An undecoded body leaves its function label open with no `end`.
    pub(super) fn on_skipped_function_body(&mut self, offset: usize) -> Result<(), Error> {
        self.pop_label(offset).map(drop)
    }

    pub(super) fn on_end_function_body(&mut self, offset: usize) -> Result<(), Error> {
        self.current_func = None;
        if !self.labels.is_empty() {
            self.labels.clear();
            return Err(Error::invalid(offset, "function body ended inside a block"));
        }
        Ok(())
    }

    pub(super) fn on_begin_custom_section(&mut self, offset: usize, name: &str, data: &[u8]) {
        self.module.customs.push(Custom {
            name: name.to_string(),
            data: data.to_vec(),
            loc: Location::new(offset),
        });
    }

    pub(super) fn on_reloc_count(&mut self, section_index: u32, count: u32) {
        let name = self
            .module
            .customs
            .last()
            .map(|custom| custom.name.clone())
            .unwrap_or_default();
        self.module.relocations.push(RelocSection {
            name,
            section_index,
            relocs: Vec::with_capacity(count as usize),
        });
    }

    fn linking(&mut self) -> &mut LinkingInfo {
        self.module.linking.get_or_insert_with(LinkingInfo::default)
    }

    pub(super) fn on_linking_version(&mut self, version: u32) {
        self.linking().version = version;
    }

    /// Records the symbol and names the item it defines, unless the name
    /// section already did.
    pub(super) fn on_symbol(&mut self, offset: usize, symbol: &Symbol) {
        self.linking().symbols.push(symbol.clone());
        let (Some(name), Some(index)) = (symbol.name.as_deref(), symbol.index) else {
            return;
        };
        if name.is_empty() {
            return;
        }
        let loc = Location::new(offset);
        let module = &mut self.module;
        let (slot, bindings) = match symbol.kind {
            SymbolKind::Function => (
                module.funcs.get_mut(index as usize).map(|f| &mut f.name),
                &mut module.func_bindings,
            ),
            SymbolKind::Global => (
                module.globals.get_mut(index as usize).map(|g| &mut g.name),
                &mut module.global_bindings,
            ),
            SymbolKind::Tag => (
                module.tags.get_mut(index as usize).map(|t| &mut t.name),
                &mut module.tag_bindings,
            ),
            SymbolKind::Table => (
                module.tables.get_mut(index as usize).map(|t| &mut t.name),
                &mut module.table_bindings,
            ),
            SymbolKind::Data | SymbolKind::Section => return,
        };
        if let Some(slot) = slot.filter(|slot| slot.is_none()) {
            *slot = Some(bindings.bind_unique(name, index, loc));
        }
    }

    pub(super) fn on_dylink_import(&mut self, import: &DylinkImport) {
        self.module
            .dylink
            .get_or_insert_with(Default::default)
            .imports
            .push(import.clone());
    }

    pub(super) fn on_target_feature(&mut self, prefix: u8, name: &str) {
        self.module.target_features.push(TargetFeature {
            prefix,
            name: name.to_string(),
        });
    }
}
