//! Module-level validation state shared by the streaming and IR validators.
//!
//! [`SharedValidator`] owns the index spaces of the module being validated
//! and checks every reference into them before handing typing questions to
//! the [`TypeChecker`]. It also tracks what the checker cannot see: which
//! functions are declared for `ref.func`, export names, constant expression
//! rules, and initialization of non-defaultable locals.

use super::type_checker::{CheckResult, TypeChecker, TypeError};
use crate::binary::{ExternalKind, InitExprTarget, Operator, SegmentMode};
use crate::error::Error;
use crate::features::Features;
use crate::ir::{Instr, LocalTypes, MemArg, TableCatch, Var};
use crate::opcode::{Opcode, OpcodeKind};
use crate::types::{
    BlockType, CompositeType, FieldType, FuncType, GlobalType, HeapType, MemoryType, RefType,
    SubType, TableType, Type,
};
use std::collections::HashSet;

fn invalid(offset: usize) -> impl FnOnce(TypeError) -> Error {
    move |e| Error::invalid(offset, e.0)
}

fn ref_to(type_index: u32, nullable: bool) -> Type {
    Type::Ref(RefType {
        nullable,
        heap: HeapType::Index(type_index),
    })
}

/// Per-function record of which non-defaultable locals are initialized.
///
/// Initialization inside a block does not outlive the block, so every set
/// is logged and rolled back when the block's arm or the block ends.
#[derive(Debug, Default)]
struct LocalInits {
    set: HashSet<u32>,
    log: Vec<u32>,
    /// Log length at the start of each open block.
    marks: Vec<usize>,
}

impl LocalInits {
    fn clear(&mut self) {
        self.set.clear();
        self.log.clear();
        self.marks.clear();
    }

    fn contains(&self, index: u32) -> bool {
        self.set.contains(&index)
    }

    fn insert(&mut self, index: u32) {
        if self.set.insert(index) {
            self.log.push(index);
        }
    }

    fn open(&mut self) {
        self.marks.push(self.log.len());
    }

    fn rollback(&mut self) {
        let mark = self.marks.last().copied().unwrap_or(0);
        for index in self.log.drain(mark..) {
            self.set.remove(&index);
        }
    }

    fn close(&mut self) {
        if self.marks.is_empty() {
            return;
        }
        self.rollback();
        self.marks.pop();
    }
}

/// Index spaces plus module-wide invariants.
#[derive(Debug)]
pub struct SharedValidator {
    features: Features,
    checker: TypeChecker,
    /// One past the last type of the open recursion group.
    rec_group_end: u32,

    /// Type index of every function, imports first.
    funcs: Vec<u32>,
    tables: Vec<TableType>,
    memories: Vec<MemoryType>,
    globals: Vec<GlobalType>,
    num_global_imports: u32,
    /// Type index of every tag.
    tags: Vec<u32>,
    elem_types: Vec<RefType>,
    /// Table of the active elem segment being read.
    elem_table: Option<u32>,
    data_count: Option<u32>,
    has_start: bool,

    /// Functions `ref.func` may name from inside a body.
    declared_funcs: HashSet<u32>,
    export_names: HashSet<String>,

    /// Params followed by declared locals of the current body.
    locals: LocalTypes,
    num_params: u32,
    local_inits: LocalInits,

    /// The constant expression being checked, if any.
    init_expr: Option<InitExprTarget>,
    /// Address type of the table or memory an active segment targets.
    segment_address: Type,
}

impl Default for SharedValidator {
    fn default() -> Self {
        Self::new(Features::default())
    }
}

impl SharedValidator {
    pub fn new(features: Features) -> Self {
        Self {
            features,
            checker: TypeChecker::default(),
            rec_group_end: 0,
            funcs: Vec::new(),
            tables: Vec::new(),
            memories: Vec::new(),
            globals: Vec::new(),
            num_global_imports: 0,
            tags: Vec::new(),
            elem_types: Vec::new(),
            elem_table: None,
            data_count: None,
            has_start: false,
            declared_funcs: HashSet::new(),
            export_names: HashSet::new(),
            locals: LocalTypes::default(),
            num_params: 0,
            local_inits: LocalInits::default(),
            init_expr: None,
            segment_address: Type::I32,
        }
    }

    pub fn checker(&self) -> &TypeChecker {
        &self.checker
    }

    // ---- index helpers ----

    fn index(var: &Var, what: &str, len: usize) -> Result<u32, Error> {
        let offset = var.loc().offset;
        match var.as_index() {
            Some(index) if (index as usize) < len => Ok(index),
            Some(index) => Err(Error::invalid(
                offset,
                format!("{what} variable out of range: {index} (max {len})"),
            )),
            None => Err(Error::invalid(offset, format!("undefined {what} variable \"{var}\""))),
        }
    }

    fn depth(var: &Var) -> Result<u32, Error> {
        var.as_index().ok_or_else(|| {
            Error::invalid(var.loc().offset, format!("undefined label variable \"{var}\""))
        })
    }

    fn type_limit(&self) -> u32 {
        self.rec_group_end.max(self.checker.types().len() as u32)
    }

    fn check_type_index(&self, index: u32, offset: usize) -> Result<(), Error> {
        let limit = self.type_limit();
        if index < limit {
            Ok(())
        } else {
            Err(Error::invalid(
                offset,
                format!("type variable out of range: {index} (max {limit})"),
            ))
        }
    }

    fn check_heap_type(&self, heap: HeapType, offset: usize) -> Result<(), Error> {
        match heap {
            HeapType::Index(index) => self.check_type_index(index, offset),
            _ => Ok(()),
        }
    }

    fn check_storage_type(&self, ty: Type, offset: usize) -> Result<(), Error> {
        match ty {
            Type::Ref(rt) => self.check_heap_type(rt.heap, offset),
            _ => Ok(()),
        }
    }

    /// A type used for a value: any storage type except the packed ones.
    fn check_value_type(&self, ty: Type, offset: usize, what: &str) -> Result<(), Error> {
        if ty.is_packed() {
            return Err(Error::invalid(
                offset,
                format!("{what} may not have packed type {ty}"),
            ));
        }
        self.check_storage_type(ty, offset)
    }

    fn func_type(&self, type_index: u32, offset: usize) -> Result<FuncType, Error> {
        self.check_type_index(type_index, offset)?;
        self.checker
            .func_type(type_index)
            .cloned()
            .ok_or_else(|| Error::invalid(offset, format!("type {type_index} is not a function type")))
    }

    fn func_var(&self, var: &Var) -> Result<u32, Error> {
        Self::index(var, "function", self.funcs.len())
    }

    fn func_sig(&self, func_index: u32, offset: usize) -> Result<FuncType, Error> {
        let type_index = self.funcs[func_index as usize];
        self.func_type(type_index, offset)
    }

    fn table(&self, var: &Var) -> Result<TableType, Error> {
        let index = Self::index(var, "table", self.tables.len())?;
        Ok(self.tables[index as usize])
    }

    fn memory(&self, var: &Var) -> Result<MemoryType, Error> {
        let index = Self::index(var, "memory", self.memories.len())?;
        Ok(self.memories[index as usize])
    }

    fn global(&self, var: &Var) -> Result<(u32, GlobalType), Error> {
        let index = Self::index(var, "global", self.globals.len())?;
        Ok((index, self.globals[index as usize]))
    }

    fn tag_params(&self, var: &Var) -> Result<Vec<Type>, Error> {
        let index = Self::index(var, "tag", self.tags.len())?;
        let sig = self.func_type(self.tags[index as usize], var.loc().offset)?;
        Ok(sig.params)
    }

    fn elem_type(&self, var: &Var) -> Result<RefType, Error> {
        let index = Self::index(var, "elem segment", self.elem_types.len())?;
        Ok(self.elem_types[index as usize])
    }

    fn check_data_index(&self, var: &Var) -> Result<(), Error> {
        let count = self.data_count.unwrap_or(0) as usize;
        Self::index(var, "data segment", count).map(drop)
    }

    fn struct_fields(&self, var: &Var) -> Result<(u32, Vec<FieldType>), Error> {
        let offset = var.loc().offset;
        let index = Self::index(var, "type", self.type_limit() as usize)?;
        match self.checker.struct_fields(index) {
            Some(fields) => Ok((index, fields.to_vec())),
            None => Err(Error::invalid(offset, format!("type {index} is not a struct type"))),
        }
    }

    fn array_field(&self, var: &Var) -> Result<(u32, FieldType), Error> {
        let offset = var.loc().offset;
        let index = Self::index(var, "type", self.type_limit() as usize)?;
        match self.checker.array_field(index) {
            Some(field) => Ok((index, field)),
            None => Err(Error::invalid(offset, format!("type {index} is not an array type"))),
        }
    }

    fn mutable_array_field(&self, var: &Var, desc: &str) -> Result<(u32, FieldType), Error> {
        let (index, field) = self.array_field(var)?;
        if !field.mutable {
            return Err(Error::invalid(
                var.loc().offset,
                format!("{desc}: array type {index} is immutable"),
            ));
        }
        Ok((index, field))
    }

    // ---- types ----

    pub fn on_rec_group(&mut self, first: u32, count: u32) {
        self.rec_group_end = first.saturating_add(count);
    }

    pub fn on_type(&mut self, offset: usize, index: u32, ty: &SubType) -> Result<(), Error> {
        let result = self.check_sub_type(offset, index, ty);
        self.checker.push_type(ty.clone());
        result
    }

    fn check_sub_type(&self, offset: usize, index: u32, ty: &SubType) -> Result<(), Error> {
        match &ty.composite {
            CompositeType::Func(func) => {
                for &param in &func.params {
                    self.check_value_type(param, offset, "function param")?;
                }
                for &result in &func.results {
                    self.check_value_type(result, offset, "function result")?;
                }
                if func.results.len() > 1 && !self.features.multi_value {
                    return Err(Error::invalid(
                        offset,
                        "multiple result values not currently supported.",
                    ));
                }
            }
            CompositeType::Struct(fields) => {
                for field in fields {
                    self.check_storage_type(field.ty, offset)?;
                }
            }
            CompositeType::Array(field) => self.check_storage_type(field.ty, offset)?,
        }
        let Some(supertype) = ty.supertype else {
            return Ok(());
        };
        if supertype >= index {
            return Err(Error::invalid(
                offset,
                format!("supertype {supertype} of type {index} must be declared before it"),
            ));
        }
        let Some(parent) = self.checker.sub_type(supertype) else {
            return Err(Error::invalid(
                offset,
                format!("type variable out of range: {supertype}"),
            ));
        };
        if parent.is_final {
            return Err(Error::invalid(
                offset,
                format!("type {index} cannot subtype final type {supertype}"),
            ));
        }
        if !self.composite_matches(&ty.composite, &parent.composite) {
            return Err(Error::invalid(
                offset,
                format!("type {index} does not match its supertype {supertype}"),
            ));
        }
        Ok(())
    }

    fn composite_matches(&self, sub: &CompositeType, sup: &CompositeType) -> bool {
        let checker = &self.checker;
        match (sub, sup) {
            (CompositeType::Func(sub), CompositeType::Func(sup)) => {
                sub.params.len() == sup.params.len()
                    && sub.results.len() == sup.results.len()
                    && sup
                        .params
                        .iter()
                        .zip(&sub.params)
                        .all(|(&a, &b)| checker.is_subtype(a, b))
                    && sub
                        .results
                        .iter()
                        .zip(&sup.results)
                        .all(|(&a, &b)| checker.is_subtype(a, b))
            }
            (CompositeType::Struct(sub), CompositeType::Struct(sup)) => {
                sub.len() >= sup.len()
                    && sub
                        .iter()
                        .zip(sup)
                        .all(|(&a, &b)| self.field_matches(a, b))
            }
            (CompositeType::Array(sub), CompositeType::Array(sup)) => self.field_matches(*sub, *sup),
            _ => false,
        }
    }

    /// Mutable fields are invariant; immutable ones covariant.
    fn field_matches(&self, sub: FieldType, sup: FieldType) -> bool {
        sub.mutable == sup.mutable
            && if sub.mutable {
                sub.ty == sup.ty
            } else {
                self.checker.is_subtype(sub.ty, sup.ty)
            }
    }

    fn block_signature(&self, ty: BlockType, offset: usize) -> Result<FuncType, Error> {
        match ty {
            BlockType::Empty => Ok(FuncType::default()),
            BlockType::Value(ty) => {
                self.check_value_type(ty, offset, "block result")?;
                Ok(FuncType::new(Vec::new(), vec![ty]))
            }
            BlockType::Index(index) => self.func_type(index, offset),
        }
    }

    // ---- imports and declarations ----

    pub fn on_import_func(&mut self, offset: usize, type_index: u32) -> Result<(), Error> {
        self.on_function(offset, type_index)
    }

    pub fn on_function(&mut self, offset: usize, type_index: u32) -> Result<(), Error> {
        self.funcs.push(type_index);
        self.func_type(type_index, offset).map(drop)
    }

    pub fn on_table(&mut self, offset: usize, ty: TableType) -> Result<(), Error> {
        self.tables.push(ty);
        if self.tables.len() > 1 && !self.features.reference_types {
            return Err(Error::invalid(offset, "only one table allowed"));
        }
        self.check_value_type(Type::Ref(ty.elem_type), offset, "table")?;
        let limits = ty.limits;
        if let Some(max) = limits.max {
            if max < limits.initial {
                return Err(Error::invalid(
                    offset,
                    format!("max elems ({max}) must be >= initial elems ({})", limits.initial),
                ));
            }
        }
        Ok(())
    }

    pub fn on_memory(&mut self, offset: usize, ty: MemoryType) -> Result<(), Error> {
        self.memories.push(ty);
        if self.memories.len() > 1 && !self.features.multi_memory {
            return Err(Error::invalid(offset, "only one memory block allowed"));
        }
        if ty.page_size_log2 != 0 && ty.page_size_log2 != MemoryType::DEFAULT_PAGE_SIZE_LOG2 {
            return Err(Error::invalid(
                offset,
                format!("invalid custom page size: 2^{}", ty.page_size_log2),
            ));
        }
        let address_bits = if ty.limits.is_64 { 64 } else { 32 };
        let max_pages = 1u128 << (address_bits - ty.page_size_log2);
        let limits = ty.limits;
        if u128::from(limits.initial) > max_pages {
            return Err(Error::invalid(
                offset,
                format!("initial pages ({}) must be <= ({max_pages})", limits.initial),
            ));
        }
        match limits.max {
            Some(max) if u128::from(max) > max_pages => Err(Error::invalid(
                offset,
                format!("max pages ({max}) must be <= ({max_pages})"),
            )),
            Some(max) if max < limits.initial => Err(Error::invalid(
                offset,
                format!("max pages ({max}) must be >= initial pages ({})", limits.initial),
            )),
            None if limits.shared => {
                Err(Error::invalid(offset, "shared memories must have max sizes"))
            }
            _ => Ok(()),
        }
    }

    pub fn on_import_global(&mut self, offset: usize, ty: GlobalType) -> Result<(), Error> {
        self.globals.push(ty);
        self.num_global_imports += 1;
        if ty.mutable && !self.features.mutable_globals {
            return Err(Error::invalid(offset, "mutable globals cannot be imported"));
        }
        self.check_value_type(ty.ty, offset, "global")
    }

    pub fn on_tag(&mut self, offset: usize, type_index: u32) -> Result<(), Error> {
        self.tags.push(type_index);
        let sig = self.func_type(type_index, offset)?;
        if !sig.results.is_empty() {
            return Err(Error::invalid(offset, "tag signature must have 0 results"));
        }
        Ok(())
    }

    /// A defined global; its initializer follows.
    pub fn on_global(&mut self, offset: usize, ty: GlobalType) -> Result<(), Error> {
        self.globals.push(ty);
        self.check_value_type(ty.ty, offset, "global")
    }

    // ---- constant expressions ----

    pub fn begin_init_expr(&mut self, offset: usize, target: InitExprTarget) -> Result<(), Error> {
        self.init_expr = Some(target);
        let ty = match target {
            InitExprTarget::Global(index) => self.globals.get(index as usize).map(|g| g.ty),
            InitExprTarget::ElemOffset(_) | InitExprTarget::DataOffset(_) => {
                Some(self.segment_address)
            }
            InitExprTarget::ElemExpr { segment, .. } => self
                .elem_types
                .get(segment as usize)
                .map(|&rt| Type::Ref(rt)),
        };
        let Some(ty) = ty else {
            self.checker.clear();
            return Err(Error::invalid(offset, "initializer expression target out of range"));
        };
        self.checker.begin_init_expr(ty);
        Ok(())
    }

    pub fn end_init_expr(&mut self) {
        self.init_expr = None;
        self.checker.clear();
    }

    fn check_constant(&self, offset: usize, op: Opcode) -> Result<(), Error> {
        if self.init_expr.is_none() || op.is_constant(&self.features) {
            return Ok(());
        }
        Err(Error::invalid(
            offset,
            format!("invalid initializer: instruction not valid in initializer expression: {op}"),
        ))
    }

    /// `global.get` in a constant expression sees only immutable globals;
    /// without GC only imported ones.
    fn check_constant_global(&self, offset: usize, index: u32, ty: GlobalType) -> Result<(), Error> {
        let Some(target) = self.init_expr else {
            return Ok(());
        };
        let visible = match target {
            _ if !self.features.gc => self.num_global_imports,
            InitExprTarget::Global(current) => current,
            _ => self.globals.len() as u32,
        };
        if index >= visible {
            return Err(Error::invalid(
                offset,
                "initializer expression can only reference an imported global",
            ));
        }
        if ty.mutable {
            return Err(Error::invalid(
                offset,
                "initializer expression cannot reference a mutable global",
            ));
        }
        Ok(())
    }

    // ---- exports, start, segments ----

    pub fn on_export(
        &mut self,
        offset: usize,
        name: &str,
        kind: ExternalKind,
        item_index: u32,
    ) -> Result<(), Error> {
        let duplicate = !self.export_names.insert(name.to_string());
        let var = Var::index(item_index, offset);
        match kind {
            ExternalKind::Func => {
                let index = self.func_var(&var)?;
                self.declared_funcs.insert(index);
            }
            ExternalKind::Table => {
                self.table(&var)?;
            }
            ExternalKind::Memory => {
                self.memory(&var)?;
            }
            ExternalKind::Global => {
                let (_, ty) = self.global(&var)?;
                if ty.mutable && !self.features.mutable_globals {
                    return Err(Error::invalid(offset, "mutable globals cannot be exported"));
                }
            }
            ExternalKind::Tag => {
                Self::index(&var, "tag", self.tags.len())?;
            }
        }
        if duplicate {
            return Err(Error::invalid(offset, format!("duplicate export \"{name}\"")));
        }
        Ok(())
    }

    pub fn on_start(&mut self, offset: usize, func_index: u32) -> Result<(), Error> {
        if std::mem::replace(&mut self.has_start, true) {
            return Err(Error::invalid(offset, "only one start function allowed"));
        }
        let index = self.func_var(&Var::index(func_index, offset))?;
        let sig = self.func_sig(index, offset)?;
        if !sig.params.is_empty() {
            return Err(Error::invalid(offset, "start function must be nullary"));
        }
        if !sig.results.is_empty() {
            return Err(Error::invalid(offset, "start function must not return anything"));
        }
        Ok(())
    }

    pub fn begin_elem_segment(&mut self, offset: usize, mode: SegmentMode) -> Result<(), Error> {
        self.elem_types.push(RefType::FUNCREF);
        self.elem_table = None;
        self.segment_address = Type::I32;
        if let SegmentMode::Active(index) = mode {
            let table = self.table(&Var::index(index, offset))?;
            self.elem_table = Some(index);
            self.segment_address = if table.limits.is_64 { Type::I64 } else { Type::I32 };
        }
        Ok(())
    }

    /// The segment's element type is known once its offset is read.
    pub fn on_elem_segment_type(
        &mut self,
        offset: usize,
        segment: u32,
        elem_type: RefType,
    ) -> Result<(), Error> {
        if let Some(slot) = self.elem_types.get_mut(segment as usize) {
            *slot = elem_type;
        }
        self.check_value_type(Type::Ref(elem_type), offset, "elem segment")?;
        if let Some(table) = self.elem_table {
            let table = self.table(&Var::index(table, offset))?;
            if !self.checker.is_ref_subtype(elem_type, table.elem_type) {
                return Err(Error::invalid(
                    offset,
                    format!(
                        "type mismatch in elem segment, expected {} but got {elem_type}",
                        table.elem_type
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn on_elem_function(&mut self, offset: usize, func_index: u32) -> Result<(), Error> {
        let index = self.func_var(&Var::index(func_index, offset))?;
        self.declared_funcs.insert(index);
        Ok(())
    }

    pub fn on_data_count(&mut self, count: u32) {
        self.data_count = Some(count);
    }

    pub fn begin_data_segment(&mut self, offset: usize, mode: SegmentMode) -> Result<(), Error> {
        self.segment_address = Type::I32;
        if let SegmentMode::Active(memory) = mode {
            let memory = self.memory(&Var::index(memory, offset))?;
            self.segment_address = memory.address_type();
        }
        Ok(())
    }

    // ---- function bodies ----

    pub fn begin_function_body(&mut self, offset: usize, func_index: u32) -> Result<(), Error> {
        self.locals = LocalTypes::default();
        self.local_inits.clear();
        self.init_expr = None;
        let sig = match self.funcs.get(func_index as usize) {
            Some(&type_index) => self.func_type(type_index, offset),
            None => Err(Error::invalid(
                offset,
                format!("function variable out of range: {func_index} (max {})", self.funcs.len()),
            )),
        };
        let sig = sig.inspect_err(|_| self.checker.begin_function(&[]))?;
        for &param in &sig.params {
            self.locals.push(param, 1);
        }
        self.num_params = sig.params.len() as u32;
        self.checker.begin_function(&sig.results);
        Ok(())
    }

    pub fn on_local_decl(&mut self, offset: usize, count: u32, ty: Type) -> Result<(), Error> {
        self.locals.push(ty, count);
        self.check_value_type(ty, offset, "local")
    }

    pub fn skip_function_body(&mut self) {
        self.checker.clear();
        self.local_inits.clear();
    }

    pub fn end_function_body(&mut self) {
        self.checker.clear();
        self.local_inits.clear();
    }

    fn local(&self, var: &Var) -> Result<(u32, Type), Error> {
        let offset = var.loc().offset;
        let count = self.locals.len();
        let index = var
            .as_index()
            .ok_or_else(|| Error::invalid(offset, format!("undefined local variable \"{var}\"")))?;
        match self.locals.get(u64::from(index)) {
            Some(ty) => Ok((index, ty)),
            None => Err(Error::invalid(
                offset,
                format!("local variable out of range: {index} (max {count})"),
            )),
        }
    }

    fn is_initialized(&self, index: u32, ty: Type) -> bool {
        ty.is_defaultable() || index < self.num_params || self.local_inits.contains(index)
    }

    // ---- structured operators ----

    /// Opens a structured block. A bad signature is reported but the label
    /// is still pushed, with an empty signature, so the matching `end` stays
    /// paired.
    fn open_block(
        &mut self,
        offset: usize,
        op: Opcode,
        ty: BlockType,
        open: impl FnOnce(&mut TypeChecker, &FuncType) -> CheckResult,
    ) -> Result<(), Error> {
        let constant = self.check_constant(offset, op);
        let (sig, signature) = match self.block_signature(ty, offset) {
            Ok(sig) => (sig, Ok(())),
            Err(e) => (FuncType::default(), Err(e)),
        };
        self.local_inits.open();
        let opened = open(&mut self.checker, &sig).map_err(invalid(offset));
        constant.and(signature).and(opened)
    }

    pub fn on_block(&mut self, offset: usize, ty: BlockType) -> Result<(), Error> {
        self.open_block(offset, Opcode::Block, ty, |c, sig| c.on_block(sig))
    }

    pub fn on_loop(&mut self, offset: usize, ty: BlockType) -> Result<(), Error> {
        self.open_block(offset, Opcode::Loop, ty, |c, sig| c.on_loop(sig))
    }

    pub fn on_if(&mut self, offset: usize, ty: BlockType) -> Result<(), Error> {
        self.open_block(offset, Opcode::If, ty, |c, sig| c.on_if(sig))
    }

    pub fn on_try(&mut self, offset: usize, ty: BlockType) -> Result<(), Error> {
        self.open_block(offset, Opcode::Try, ty, |c, sig| c.on_try(sig))
    }

    pub fn on_try_table(
        &mut self,
        offset: usize,
        ty: BlockType,
        catches: &[TableCatch],
    ) -> Result<(), Error> {
        let mut result = Ok(());
        for catch in catches {
            result = result.and_then(|()| self.check_table_catch(offset, catch));
        }
        let opened = self.open_block(offset, Opcode::TryTable, ty, |c, sig| c.on_try_table(sig));
        result.and(opened)
    }

    fn check_table_catch(&self, offset: usize, catch: &TableCatch) -> Result<(), Error> {
        let mut types = match &catch.tag {
            Some(tag) if catch.kind.has_tag() => self.tag_params(tag)?,
            _ => Vec::new(),
        };
        if catch.kind.pushes_exnref() {
            types.push(Type::Ref(RefType::non_null(HeapType::Exn)));
        }
        let depth = Self::depth(&catch.label)?;
        self.checker
            .check_catch_target(depth, &types, "catch")
            .map_err(invalid(offset))
    }

    pub fn on_else(&mut self, offset: usize) -> Result<(), Error> {
        self.local_inits.rollback();
        self.checker.on_else().map_err(invalid(offset))
    }

    pub fn on_catch(&mut self, offset: usize, tag: &Var) -> Result<(), Error> {
        let (params, tag) = match self.tag_params(tag) {
            Ok(params) => (params, Ok(())),
            Err(e) => (Vec::new(), Err(e)),
        };
        self.local_inits.rollback();
        let switched = self.checker.on_catch(&params).map_err(invalid(offset));
        tag.and(switched)
    }

    pub fn on_catch_all(&mut self, offset: usize) -> Result<(), Error> {
        self.local_inits.rollback();
        self.checker.on_catch_all().map_err(invalid(offset))
    }

    pub fn on_delegate(&mut self, offset: usize, depth: &Var) -> Result<(), Error> {
        let (depth, label) = match Self::depth(depth) {
            Ok(depth) => (depth, Ok(())),
            Err(e) => (0, Err(e)),
        };
        self.local_inits.close();
        let closed = self.checker.on_delegate(depth).map_err(invalid(offset));
        label.and(closed)
    }

    pub fn on_end(&mut self, offset: usize) -> Result<(), Error> {
        self.local_inits.close();
        self.checker.on_end().map_err(invalid(offset))
    }

    // ---- plain instructions ----

    fn simple(&mut self, op: Opcode, offset: usize) -> Result<(), Error> {
        let results: Vec<_> = op.result_type().into_iter().collect();
        self.checker
            .check_signature(&op.param_types(), &results, op.name())
            .map_err(invalid(offset))
    }

    fn check(&self, offset: usize, result: CheckResult) -> Result<(), Error> {
        result.map_err(invalid(offset))
    }

    fn signature(
        &mut self,
        offset: usize,
        params: &[Type],
        results: &[Type],
        desc: &str,
    ) -> Result<(), Error> {
        let result = self.checker.check_signature(params, results, desc);
        self.check(offset, result)
    }

    fn check_memarg(&self, op: Opcode, memarg: &MemArg, offset: usize) -> Result<MemoryType, Error> {
        let memory = self.memory(&memarg.memory)?;
        let natural = op.max_align_log2();
        let atomic = matches!(
            op.kind(),
            OpcodeKind::AtomicLoad
                | OpcodeKind::AtomicStore
                | OpcodeKind::AtomicRmw
                | OpcodeKind::AtomicCmpxchg
                | OpcodeKind::AtomicWait
                | OpcodeKind::AtomicNotify
        );
        if atomic && memarg.align_log2 != natural {
            return Err(Error::invalid(
                offset,
                format!("alignment must be equal to natural alignment ({})", 1u32 << natural),
            ));
        }
        if memarg.align_log2 > natural {
            return Err(Error::invalid(
                offset,
                format!(
                    "alignment must not be larger than natural alignment ({})",
                    1u32 << natural
                ),
            ));
        }
        if !memory.limits.is_64 && memarg.offset > u64::from(u32::MAX) {
            return Err(Error::invalid(offset, "offset must be less than or equal to 0xffffffff"));
        }
        Ok(memory)
    }

    /// Loads, stores and atomics: the table row's first parameter is the
    /// address, typed by the memory.
    fn memory_access(&mut self, op: Opcode, memarg: &MemArg, offset: usize) -> Result<(), Error> {
        let memory = self.check_memarg(op, memarg, offset)?;
        let mut params = op.param_types();
        if let Some(address) = params.first_mut() {
            *address = memory.address_type();
        }
        let results: Vec<_> = op.result_type().into_iter().collect();
        self.signature(offset, &params, &results, op.name())
    }

    fn check_lane(op: Opcode, lane: u8, offset: usize) -> Result<(), Error> {
        let count = op.lane_count();
        if lane >= count {
            return Err(Error::invalid(
                offset,
                format!("lane index must be less than {count} (got {lane})"),
            ));
        }
        Ok(())
    }

    pub fn on_operator(&mut self, offset: usize, op: &Operator) -> Result<(), Error> {
        match op {
            Operator::Block(ty) => self.on_block(offset, *ty),
            Operator::Loop(ty) => self.on_loop(offset, *ty),
            Operator::If(ty) => self.on_if(offset, *ty),
            Operator::Else => self.on_else(offset),
            Operator::End => self.on_end(offset),
            Operator::Try(ty) => self.on_try(offset, *ty),
            Operator::Catch(tag) => self.on_catch(offset, tag),
            Operator::CatchAll => self.on_catch_all(offset),
            Operator::Delegate(depth) => self.on_delegate(offset, depth),
            Operator::TryTable { ty, catches } => self.on_try_table(offset, *ty, catches),
            Operator::Instr(instr) => self.on_instr(offset, instr),
        }
    }

    pub fn on_instr(&mut self, offset: usize, instr: &Instr) -> Result<(), Error> {
        let op = instr.opcode();
        self.check_constant(offset, op)?;
        match instr {
            Instr::Unreachable => self.checker.on_unreachable().map_err(invalid(offset)),
            Instr::Nop | Instr::AtomicFence => Ok(()),
            Instr::Drop => self.checker.on_drop().map_err(invalid(offset)),
            Instr::Select(None) => self.checker.on_select(None).map_err(invalid(offset)),
            Instr::Select(Some(types)) => {
                let [ty] = types.as_slice() else {
                    return Err(Error::invalid(
                        offset,
                        format!("invalid arity in select instruction: {}", types.len()),
                    ));
                };
                self.check_value_type(*ty, offset, "select")?;
                self.checker.on_select(Some(*ty)).map_err(invalid(offset))
            }

            Instr::Br(depth) => {
                let depth = Self::depth(depth)?;
                self.checker.on_br(depth).map_err(invalid(offset))
            }
            Instr::BrIf(depth) => {
                let depth = Self::depth(depth)?;
                self.checker.on_br_if(depth).map_err(invalid(offset))
            }
            Instr::BrTable { targets, default } => {
                let targets = targets
                    .iter()
                    .map(Self::depth)
                    .collect::<Result<Vec<_>, _>>()?;
                let default = Self::depth(default)?;
                self.checker
                    .on_br_table(&targets, default)
                    .map_err(invalid(offset))
            }
            Instr::BrOnNull(depth) => {
                let depth = Self::depth(depth)?;
                self.checker.on_br_on_null(depth).map_err(invalid(offset))
            }
            Instr::BrOnNonNull(depth) => {
                let depth = Self::depth(depth)?;
                self.checker.on_br_on_non_null(depth).map_err(invalid(offset))
            }
            Instr::BrOnCast {
                op,
                label,
                from,
                to,
            } => {
                self.check_heap_type(from.heap, offset)?;
                self.check_heap_type(to.heap, offset)?;
                let depth = Self::depth(label)?;
                self.checker
                    .on_br_on_cast(*op == Opcode::BrOnCastFail, depth, *from, *to)
                    .map_err(invalid(offset))
            }
            Instr::Return => self.checker.on_return().map_err(invalid(offset)),

            Instr::Call(func) => {
                let index = self.func_var(func)?;
                let sig = self.func_sig(index, offset)?;
                self.checker.on_call(&sig, "call").map_err(invalid(offset))
            }
            Instr::ReturnCall(func) => {
                let index = self.func_var(func)?;
                let sig = self.func_sig(index, offset)?;
                self.checker
                    .on_return_call(&sig, "return_call")
                    .map_err(invalid(offset))
            }
            Instr::CallIndirect { ty, table } | Instr::ReturnCallIndirect { ty, table } => {
                let table = self.table(table)?;
                if !self.checker.is_ref_subtype(table.elem_type, RefType::FUNCREF) {
                    return Err(Error::invalid(
                        offset,
                        "type mismatch: call_indirect must reference table of funcref type",
                    ));
                }
                let type_index = Self::index(ty, "type", self.type_limit() as usize)?;
                let sig = self.func_type(type_index, offset)?;
                let address = if table.limits.is_64 { Type::I64 } else { Type::I32 };
                let desc = op.name();
                let popped = self.checker.pop_and_check(&[address], desc);
                self.check(offset, popped)?;
                if matches!(instr, Instr::CallIndirect { .. }) {
                    self.checker.on_call(&sig, desc).map_err(invalid(offset))
                } else {
                    self.checker.on_return_call(&sig, desc).map_err(invalid(offset))
                }
            }
            Instr::CallRef(ty) | Instr::ReturnCallRef(ty) => {
                let type_index = Self::index(ty, "type", self.type_limit() as usize)?;
                let sig = self.func_type(type_index, offset)?;
                let desc = op.name();
                let popped = self.checker.pop_and_check(&[ref_to(type_index, true)], desc);
                self.check(offset, popped)?;
                if matches!(instr, Instr::CallRef(_)) {
                    self.checker.on_call(&sig, desc).map_err(invalid(offset))
                } else {
                    self.checker.on_return_call(&sig, desc).map_err(invalid(offset))
                }
            }

            Instr::Throw(tag) => {
                let params = self.tag_params(tag)?;
                self.checker.on_throw(&params).map_err(invalid(offset))
            }
            Instr::Rethrow(depth) => {
                let depth = Self::depth(depth)?;
                self.checker.on_rethrow(depth).map_err(invalid(offset))
            }
            Instr::ThrowRef => self.checker.on_throw_ref().map_err(invalid(offset)),

            Instr::LocalGet(var) => {
                let (index, ty) = self.local(var)?;
                if !self.is_initialized(index, ty) {
                    return Err(Error::invalid(
                        offset,
                        format!("uninitialized local variable {index}"),
                    ));
                }
                self.checker.push(ty);
                Ok(())
            }
            Instr::LocalSet(var) | Instr::LocalTee(var) => {
                let (index, ty) = self.local(var)?;
                let desc = op.name();
                let popped = self.checker.pop_and_check(&[ty], desc);
                if matches!(instr, Instr::LocalTee(_)) {
                    self.checker.push(ty);
                }
                if !ty.is_defaultable() {
                    self.local_inits.insert(index);
                }
                self.check(offset, popped)
            }
            Instr::GlobalGet(var) => {
                let (index, ty) = self.global(var)?;
                self.check_constant_global(offset, index, ty)?;
                self.checker.push(ty.ty);
                Ok(())
            }
            Instr::GlobalSet(var) => {
                let (index, ty) = self.global(var)?;
                if !ty.mutable {
                    return Err(Error::invalid(
                        offset,
                        format!("can't global.set on immutable global at index {index}."),
                    ));
                }
                self.signature(offset, &[ty.ty], &[], "global.set")
            }

            Instr::TableGet(table) => {
                let table = self.table(table)?;
                let address = address_of_table(&table);
                self.signature(offset, &[address], &[Type::Ref(table.elem_type)], "table.get")
            }
            Instr::TableSet(table) => {
                let table = self.table(table)?;
                let address = address_of_table(&table);
                self.signature(offset, &[address, Type::Ref(table.elem_type)], &[], "table.set")
            }
            Instr::TableGrow(table) => {
                let table = self.table(table)?;
                let address = address_of_table(&table);
                self.signature(
                    offset,
                    &[Type::Ref(table.elem_type), address],
                    &[address],
                    "table.grow",
                )
            }
            Instr::TableSize(table) => {
                let table = self.table(table)?;
                self.checker.push(address_of_table(&table));
                Ok(())
            }
            Instr::TableFill(table) => {
                let table = self.table(table)?;
                let address = address_of_table(&table);
                self.signature(
                    offset,
                    &[address, Type::Ref(table.elem_type), address],
                    &[],
                    "table.fill",
                )
            }
            Instr::TableCopy { dst, src } => {
                let dst = self.table(dst)?;
                let src = self.table(src)?;
                if !self.checker.is_ref_subtype(src.elem_type, dst.elem_type) {
                    return Err(Error::invalid(
                        offset,
                        format!(
                            "type mismatch in table.copy, expected {} but got {}",
                            dst.elem_type, src.elem_type
                        ),
                    ));
                }
                let (dst, src) = (address_of_table(&dst), address_of_table(&src));
                let len = if dst == Type::I64 && src == Type::I64 { Type::I64 } else { Type::I32 };
                self.signature(offset, &[dst, src, len], &[], "table.copy")
            }
            Instr::TableInit { segment, table } => {
                let elem_type = self.elem_type(segment)?;
                let table = self.table(table)?;
                if !self.checker.is_ref_subtype(elem_type, table.elem_type) {
                    return Err(Error::invalid(
                        offset,
                        format!(
                            "type mismatch in table.init, expected {} but got {elem_type}",
                            table.elem_type
                        ),
                    ));
                }
                let address = address_of_table(&table);
                self.signature(offset, &[address, Type::I32, Type::I32], &[], "table.init")
            }
            Instr::ElemDrop(segment) => self.elem_type(segment).map(drop),

            Instr::MemorySize(memory) => {
                let memory = self.memory(memory)?;
                self.checker.push(memory.address_type());
                Ok(())
            }
            Instr::MemoryGrow(memory) => {
                let address = self.memory(memory)?.address_type();
                self.signature(offset, &[address], &[address], "memory.grow")
            }
            Instr::MemoryInit { segment, memory } => {
                self.check_data_index(segment)?;
                let address = self.memory(memory)?.address_type();
                self.signature(offset, &[address, Type::I32, Type::I32], &[], "memory.init")
            }
            Instr::DataDrop(segment) => self.check_data_index(segment),
            Instr::MemoryCopy { dst, src } => {
                let dst = self.memory(dst)?.address_type();
                let src = self.memory(src)?.address_type();
                let len = if dst == Type::I64 && src == Type::I64 { Type::I64 } else { Type::I32 };
                self.signature(offset, &[dst, src, len], &[], "memory.copy")
            }
            Instr::MemoryFill(memory) => {
                let address = self.memory(memory)?.address_type();
                self.signature(offset, &[address, Type::I32, address], &[], "memory.fill")
            }

            Instr::Load { op, memarg }
            | Instr::Store { op, memarg }
            | Instr::Atomic { op, memarg } => self.memory_access(*op, memarg, offset),
            Instr::LoadLane { op, memarg, lane } | Instr::StoreLane { op, memarg, lane } => {
                Self::check_lane(*op, *lane, offset)?;
                self.memory_access(*op, memarg, offset)
            }

            Instr::I32Const(_) => {
                self.checker.push(Type::I32);
                Ok(())
            }
            Instr::I64Const(_) => {
                self.checker.push(Type::I64);
                Ok(())
            }
            Instr::F32Const(_) => {
                self.checker.push(Type::F32);
                Ok(())
            }
            Instr::F64Const(_) => {
                self.checker.push(Type::F64);
                Ok(())
            }
            Instr::V128Const(_) => {
                self.checker.push(Type::V128);
                Ok(())
            }

            Instr::Unary(op)
            | Instr::Binary(op)
            | Instr::Compare(op)
            | Instr::Convert(op)
            | Instr::Ternary(op) => self.simple(*op, offset),
            Instr::LaneOp { op, lane } => {
                Self::check_lane(*op, *lane, offset)?;
                self.simple(*op, offset)
            }
            Instr::Shuffle(lanes) => {
                if let Some(&lane) = lanes.0.iter().find(|&&lane| lane >= 32) {
                    return Err(Error::invalid(
                        offset,
                        format!("lane index must be less than 32 (got {lane})"),
                    ));
                }
                self.simple(Opcode::I8x16Shuffle, offset)
            }

            Instr::RefNull(heap) => {
                self.check_heap_type(*heap, offset)?;
                self.checker.push(Type::Ref(RefType::nullable(*heap)));
                Ok(())
            }
            Instr::RefIsNull => self.checker.on_ref_is_null().map_err(invalid(offset)),
            Instr::RefFunc(func) => {
                let index = self.func_var(func)?;
                if self.init_expr.is_some() {
                    self.declared_funcs.insert(index);
                } else if !self.declared_funcs.contains(&index) {
                    return Err(Error::invalid(
                        offset,
                        format!("function {index} is not declared in any elem sections"),
                    ));
                }
                let ty = if self.features.function_references {
                    ref_to(self.funcs[index as usize], false)
                } else {
                    Type::FUNCREF
                };
                self.checker.push(ty);
                Ok(())
            }
            Instr::RefEq => {
                let eqref = Type::Ref(RefType::nullable(HeapType::Eq));
                self.signature(offset, &[eqref, eqref], &[Type::I32], "ref.eq")
            }
            Instr::RefAsNonNull => self.checker.on_ref_as_non_null().map_err(invalid(offset)),

            Instr::StructNew(ty) => {
                let (index, fields) = self.struct_fields(ty)?;
                let params: Vec<_> = fields.iter().map(|f| f.ty.unpacked()).collect();
                self.signature(offset, &params, &[ref_to(index, false)], "struct.new")
            }
            Instr::StructNewDefault(ty) => {
                let (index, fields) = self.struct_fields(ty)?;
                if let Some(field) = fields.iter().position(|f| !f.ty.is_defaultable()) {
                    return Err(Error::invalid(
                        offset,
                        format!("struct.new_default: field {field} of type {index} is not defaultable"),
                    ));
                }
                self.checker.push(ref_to(index, false));
                Ok(())
            }
            Instr::StructGet { op, ty, field } => {
                let (index, fields) = self.struct_fields(ty)?;
                let field = struct_field(&fields, *field, index, offset)?;
                check_packed_access(*op, Opcode::StructGet, field, offset)?;
                self.signature(
                    offset,
                    &[ref_to(index, true)],
                    &[field.ty.unpacked()],
                    op.name(),
                )
            }
            Instr::StructSet { ty, field } => {
                let (index, fields) = self.struct_fields(ty)?;
                let field_index = *field;
                let field = struct_field(&fields, field_index, index, offset)?;
                if !field.mutable {
                    return Err(Error::invalid(
                        offset,
                        format!("struct.set: field {field_index} of type {index} is immutable"),
                    ));
                }
                self.signature(
                    offset,
                    &[ref_to(index, true), field.ty.unpacked()],
                    &[],
                    "struct.set",
                )
            }
            Instr::ArrayNew(ty) => {
                let (index, field) = self.array_field(ty)?;
                self.signature(
                    offset,
                    &[field.ty.unpacked(), Type::I32],
                    &[ref_to(index, false)],
                    "array.new",
                )
            }
            Instr::ArrayNewDefault(ty) => {
                let (index, field) = self.array_field(ty)?;
                if !field.ty.is_defaultable() {
                    return Err(Error::invalid(
                        offset,
                        format!("array.new_default: element type of {index} is not defaultable"),
                    ));
                }
                self.signature(offset, &[Type::I32], &[ref_to(index, false)], "array.new_default")
            }
            Instr::ArrayNewFixed { ty, count } => {
                let (index, field) = self.array_field(ty)?;
                let elem = field.ty.unpacked();
                // Past the stack height every further pop behaves the same.
                let pops = (*count as usize).min(self.checker.stack().len() + 1);
                for _ in 0..pops {
                    let popped = self.checker.pop_and_check(&[elem], "array.new_fixed");
                    self.check(offset, popped)?;
                }
                self.checker.push(ref_to(index, false));
                Ok(())
            }
            Instr::ArrayNewData { ty, data } => {
                let (index, field) = self.array_field(ty)?;
                check_data_element(field, "array.new_data", offset)?;
                self.check_data_index(data)?;
                self.signature(
                    offset,
                    &[Type::I32, Type::I32],
                    &[ref_to(index, false)],
                    "array.new_data",
                )
            }
            Instr::ArrayNewElem { ty, elem } => {
                let (index, field) = self.array_field(ty)?;
                self.check_elem_element(elem, field, "array.new_elem", offset)?;
                self.signature(
                    offset,
                    &[Type::I32, Type::I32],
                    &[ref_to(index, false)],
                    "array.new_elem",
                )
            }
            Instr::ArrayGet { op, ty } => {
                let (index, field) = self.array_field(ty)?;
                check_packed_access(*op, Opcode::ArrayGet, field, offset)?;
                self.signature(
                    offset,
                    &[ref_to(index, true), Type::I32],
                    &[field.ty.unpacked()],
                    op.name(),
                )
            }
            Instr::ArraySet(ty) => {
                let (index, field) = self.mutable_array_field(ty, "array.set")?;
                self.signature(
                    offset,
                    &[ref_to(index, true), Type::I32, field.ty.unpacked()],
                    &[],
                    "array.set",
                )
            }
            Instr::ArrayLen => {
                let arrayref = Type::Ref(RefType::nullable(HeapType::Array));
                self.signature(offset, &[arrayref], &[Type::I32], "array.len")
            }
            Instr::ArrayFill(ty) => {
                let (index, field) = self.mutable_array_field(ty, "array.fill")?;
                self.signature(
                    offset,
                    &[ref_to(index, true), Type::I32, field.ty.unpacked(), Type::I32],
                    &[],
                    "array.fill",
                )
            }
            Instr::ArrayCopy { dst, src } => {
                let (dst_index, dst_field) = self.mutable_array_field(dst, "array.copy")?;
                let (src_index, src_field) = self.array_field(src)?;
                if !self.checker.is_subtype(src_field.ty, dst_field.ty) {
                    return Err(Error::invalid(
                        offset,
                        format!(
                            "array.copy: element type of {src_index} does not match element type of {dst_index}"
                        ),
                    ));
                }
                self.signature(
                    offset,
                    &[
                        ref_to(dst_index, true),
                        Type::I32,
                        ref_to(src_index, true),
                        Type::I32,
                        Type::I32,
                    ],
                    &[],
                    "array.copy",
                )
            }
            Instr::ArrayInitData { ty, data } => {
                let (index, field) = self.mutable_array_field(ty, "array.init_data")?;
                check_data_element(field, "array.init_data", offset)?;
                self.check_data_index(data)?;
                self.signature(
                    offset,
                    &[ref_to(index, true), Type::I32, Type::I32, Type::I32],
                    &[],
                    "array.init_data",
                )
            }
            Instr::ArrayInitElem { ty, elem } => {
                let (index, field) = self.mutable_array_field(ty, "array.init_elem")?;
                self.check_elem_element(elem, field, "array.init_elem", offset)?;
                self.signature(
                    offset,
                    &[ref_to(index, true), Type::I32, Type::I32, Type::I32],
                    &[],
                    "array.init_elem",
                )
            }
            Instr::RefTest(rt) | Instr::RefCast(rt) => {
                self.check_heap_type(rt.heap, offset)?;
                let top = Type::Ref(RefType::nullable(self.checker.top_heap(rt.heap)));
                let result = if matches!(instr, Instr::RefTest(_)) {
                    Type::I32
                } else {
                    Type::Ref(*rt)
                };
                self.signature(offset, &[top], &[result], op.name())
            }
            Instr::GcUnary(op) => match op {
                Opcode::RefI31 => self.signature(
                    offset,
                    &[Type::I32],
                    &[Type::Ref(RefType::non_null(HeapType::I31))],
                    "ref.i31",
                ),
                Opcode::AnyConvertExtern => self
                    .checker
                    .on_convert_ref(HeapType::Extern, HeapType::Any, op.name())
                    .map_err(invalid(offset)),
                Opcode::ExternConvertAny => self
                    .checker
                    .on_convert_ref(HeapType::Any, HeapType::Extern, op.name())
                    .map_err(invalid(offset)),
                _ => self.signature(
                    offset,
                    &[Type::Ref(RefType::nullable(HeapType::I31))],
                    &[Type::I32],
                    op.name(),
                ),
            },
        }
    }

    fn check_elem_element(
        &self,
        elem: &Var,
        field: FieldType,
        desc: &str,
        offset: usize,
    ) -> Result<(), Error> {
        let elem_type = self.elem_type(elem)?;
        if !self.checker.is_subtype(Type::Ref(elem_type), field.ty) {
            return Err(Error::invalid(
                offset,
                format!("type mismatch in {desc}, expected {} but got {elem_type}", field.ty),
            ));
        }
        Ok(())
    }
}

fn address_of_table(table: &TableType) -> Type {
    if table.limits.is_64 {
        Type::I64
    } else {
        Type::I32
    }
}

fn struct_field(
    fields: &[FieldType],
    field: u32,
    type_index: u32,
    offset: usize,
) -> Result<FieldType, Error> {
    fields.get(field as usize).copied().ok_or_else(|| {
        Error::invalid(
            offset,
            format!(
                "field variable out of range: {field} (type {type_index} has {} fields)",
                fields.len()
            ),
        )
    })
}

/// Packed fields need the sign-extending forms; unpacked ones the plain one.
fn check_packed_access(op: Opcode, plain: Opcode, field: FieldType, offset: usize) -> Result<(), Error> {
    if field.ty.is_packed() == (op == plain) {
        let message = if field.ty.is_packed() {
            format!("{op} cannot read packed field of type {}, use a signed or unsigned form", field.ty)
        } else {
            format!("{op} requires a packed field, got {}", field.ty)
        };
        return Err(Error::invalid(offset, message));
    }
    Ok(())
}

fn check_data_element(field: FieldType, desc: &str, offset: usize) -> Result<(), Error> {
    if field.ty.is_ref() {
        return Err(Error::invalid(
            offset,
            format!("{desc} requires a numeric or vector element type, got {}", field.ty),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Limits;

    fn func_type(params: &[Type], results: &[Type]) -> SubType {
        SubType::plain(CompositeType::Func(FuncType::new(
            params.to_vec(),
            results.to_vec(),
        )))
    }

    /// A validator with one `[] -> []` function, positioned in its body.
    fn in_body(features: Features) -> SharedValidator {
        let mut v = SharedValidator::new(features);
        v.on_rec_group(0, 1);
        v.on_type(0, 0, &func_type(&[], &[])).unwrap();
        v.on_function(0, 0).unwrap();
        v.begin_function_body(0, 0).unwrap();
        v
    }

    #[test]
    fn duplicate_export_names() {
        let mut v = in_body(Features::default());
        v.on_export(10, "f", ExternalKind::Func, 0).unwrap();
        let err = v.on_export(20, "f", ExternalKind::Func, 0).unwrap_err();
        assert_eq!(err.message, "duplicate export \"f\"");
        assert_eq!(err.offset, 20);
    }

    #[test]
    fn export_index_out_of_range() {
        let mut v = in_body(Features::default());
        let err = v.on_export(5, "g", ExternalKind::Global, 0).unwrap_err();
        assert_eq!(err.message, "global variable out of range: 0 (max 0)");
    }

    #[test]
    fn ref_func_requires_declaration() {
        let mut v = in_body(Features::default());
        let err = v.on_instr(3, &Instr::RefFunc(Var::index(0, 3))).unwrap_err();
        assert_eq!(err.message, "function 0 is not declared in any elem sections");

        v.on_elem_function(0, 0).unwrap();
        v.on_instr(3, &Instr::RefFunc(Var::index(0, 3))).unwrap();
    }

    #[test]
    fn non_nullable_local_must_be_set_first() {
        let mut features = Features::default();
        features.set("function-references", true);
        let mut v = in_body(features);
        let local = Type::Ref(RefType::non_null(HeapType::Func));
        v.on_local_decl(1, 1, local).unwrap();

        let err = v.on_instr(4, &Instr::LocalGet(Var::index(0, 4))).unwrap_err();
        assert_eq!(err.message, "uninitialized local variable 0");

        // Initialized inside a block: forgotten at its end.
        v.on_block(5, BlockType::Empty).unwrap();
        v.on_elem_function(0, 0).unwrap();
        v.on_instr(6, &Instr::RefFunc(Var::index(0, 6))).unwrap();
        v.on_instr(7, &Instr::LocalSet(Var::index(0, 7))).unwrap();
        v.on_instr(8, &Instr::LocalGet(Var::index(0, 8))).unwrap();
        v.on_instr(9, &Instr::Drop).unwrap();
        v.on_end(10).unwrap();
        assert!(v.on_instr(11, &Instr::LocalGet(Var::index(0, 11))).is_err());
    }

    #[test]
    fn only_one_memory_without_multi_memory() {
        let mut v = SharedValidator::new(Features::default());
        let memory = MemoryType {
            limits: Limits::new(1, None),
            page_size_log2: MemoryType::DEFAULT_PAGE_SIZE_LOG2,
        };
        v.on_memory(0, memory).unwrap();
        let err = v.on_memory(4, memory).unwrap_err();
        assert_eq!(err.message, "only one memory block allowed");
    }

    #[test]
    fn memory_page_limits() {
        let mut v = SharedValidator::new(Features::default());
        let memory = MemoryType {
            limits: Limits::new(2, Some(1)),
            page_size_log2: MemoryType::DEFAULT_PAGE_SIZE_LOG2,
        };
        let err = v.on_memory(0, memory).unwrap_err();
        assert_eq!(err.message, "max pages (1) must be >= initial pages (2)");

        let mut v = SharedValidator::new(Features::default());
        let memory = MemoryType {
            limits: Limits::new(65537, None),
            page_size_log2: MemoryType::DEFAULT_PAGE_SIZE_LOG2,
        };
        let err = v.on_memory(0, memory).unwrap_err();
        assert_eq!(err.message, "initial pages (65537) must be <= (65536)");
    }

    #[test]
    fn start_function_signature() {
        let mut v = SharedValidator::new(Features::default());
        v.on_type(0, 0, &func_type(&[Type::I32], &[])).unwrap();
        v.on_function(0, 0).unwrap();
        let err = v.on_start(9, 0).unwrap_err();
        assert_eq!(err.message, "start function must be nullary");
    }

    #[test]
    fn init_expr_rejects_non_constant_instructions() {
        let mut v = SharedValidator::new(Features::default());
        v.on_global(0, GlobalType { ty: Type::I32, mutable: false }).unwrap();
        v.begin_init_expr(1, InitExprTarget::Global(0)).unwrap();
        v.on_instr(1, &Instr::I32Const(1)).unwrap();
        v.on_instr(3, &Instr::I32Const(2)).unwrap();
        let err = v.on_instr(5, &Instr::Binary(Opcode::I32Add)).unwrap_err();
        assert_eq!(
            err.message,
            "invalid initializer: instruction not valid in initializer expression: i32.add"
        );
    }

    #[test]
    fn init_expr_global_must_be_imported_and_immutable() {
        let mut v = SharedValidator::new(Features::default());
        v.on_import_global(0, GlobalType { ty: Type::I32, mutable: true }).unwrap();
        v.on_global(1, GlobalType { ty: Type::I32, mutable: false }).unwrap();
        v.begin_init_expr(2, InitExprTarget::Global(1)).unwrap();
        let err = v.on_instr(2, &Instr::GlobalGet(Var::index(0, 2))).unwrap_err();
        assert_eq!(err.message, "initializer expression cannot reference a mutable global");
    }

    #[test]
    fn alignment_larger_than_natural() {
        let mut v = SharedValidator::new(Features::default());
        v.on_memory(
            0,
            MemoryType {
                limits: Limits::new(1, None),
                page_size_log2: MemoryType::DEFAULT_PAGE_SIZE_LOG2,
            },
        )
        .unwrap();
        v.on_type(0, 0, &func_type(&[], &[])).unwrap();
        v.on_function(0, 0).unwrap();
        v.begin_function_body(0, 0).unwrap();
        v.on_instr(1, &Instr::I32Const(0)).unwrap();
        let load = Instr::Load {
            op: Opcode::I32Load,
            memarg: MemArg {
                memory: Var::index(0, 3),
                align_log2: 3,
                offset: 0,
            },
        };
        let err = v.on_instr(3, &load).unwrap_err();
        assert_eq!(err.message, "alignment must not be larger than natural alignment (4)");
    }

    #[test]
    fn subtype_must_match_supertype() {
        let mut v = SharedValidator::new(Features::all());
        let open = |composite| SubType {
            is_final: false,
            supertype: None,
            composite,
        };
        let i32_field = FieldType {
            ty: Type::I32,
            mutable: false,
        };
        v.on_type(0, 0, &open(CompositeType::Struct(vec![i32_field]))).unwrap();
        let child = SubType {
            is_final: true,
            supertype: Some(0),
            composite: CompositeType::Struct(vec![i32_field, i32_field]),
        };
        v.on_type(0, 1, &child).unwrap();
        let bad = SubType {
            is_final: true,
            supertype: Some(1),
            composite: CompositeType::Struct(vec![i32_field, i32_field]),
        };
        let err = v.on_type(0, 2, &bad).unwrap_err();
        assert_eq!(err.message, "type 2 cannot subtype final type 1");
    }

    #[test]
    fn default_validator_addresses_with_i32() {
        let v = SharedValidator::default();
        assert_eq!(v.segment_address, Type::I32);
        assert_eq!(v.features, Features::default());
        assert!(v.elem_table.is_none());
    }

    #[test]
    fn bad_block_type_still_opens_label() {
        let mut v = in_body(Features::default());
        let err = v.on_block(4, BlockType::Index(9)).unwrap_err();
        assert_eq!(err.message, "type variable out of range: 9 (max 1)");
        assert_eq!(v.checker().depth(), 2);
        v.on_end(6).unwrap();
        v.on_end(7).unwrap();
        assert_eq!(v.checker().depth(), 0);
    }

    #[test]
    fn catch_with_unknown_tag_still_switches_arm() {
        let mut features = Features::default();
        features.set("exceptions", true);
        let mut v = in_body(features);
        v.on_try(4, BlockType::Empty).unwrap();
        let err = v.on_catch(6, &Var::index(2, 6)).unwrap_err();
        assert_eq!(err.message, "tag variable out of range: 2 (max 0)");
        v.on_end(8).unwrap();
        v.on_end(9).unwrap();
        assert_eq!(v.checker().depth(), 0);
    }

    #[test]
    fn failed_elem_table_lookup_is_not_remembered() {
        let mut v = SharedValidator::new(Features::default());
        let table = TableType {
            elem_type: RefType::FUNCREF,
            limits: Limits::new(1, None),
        };
        v.on_table(0, table).unwrap();
        assert!(v.begin_elem_segment(2, SegmentMode::Active(3)).is_err());
        assert!(v.elem_table.is_none());
        assert_eq!(v.segment_address, Type::I32);
        v.on_elem_segment_type(4, 0, RefType::FUNCREF).unwrap();
    }
}
