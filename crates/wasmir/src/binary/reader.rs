//! Header, section framing and the known (non-custom) sections.

use super::event::{Event, EventSink, ImportDesc, InitExprTarget, SegmentMode};
use super::leb128::{self, LebResult};
use super::{ExternalKind, ReadOptions, SectionId, MAGIC, VERSION};
use crate::error::{Error, Errors};
use crate::types::{
    code, BlockType, CompositeType, FieldType, FuncType, GlobalType, HeapType, Limits,
    MemoryType, RefType, SubType, TableType, Type, TypeDecodeError,
};

/// Reads a complete module, announcing everything to `sink`.
///
/// Malformed input stops the walk at the first problem. Errors reported by
/// the sink stop it only when [`Error::is_fatal`] says so under `options`;
/// otherwise they are collected and returned together once the walk ends.
pub fn read_binary<'a, S: EventSink<'a>>(
    data: &'a [u8],
    sink: &mut S,
    options: &ReadOptions,
) -> Result<(), Errors> {
    let mut reader = Reader::new(data, sink, options);
    if let Err(error) = reader.read_module() {
        reader.errors.push(error);
    }
    let mut errors = reader.errors;
    log::debug!("read {} bytes, {} error(s)", data.len(), errors.len());
    if errors.is_empty() {
        Ok(())
    } else {
        errors.sort();
        Err(errors)
    }
}

/// Which construct an instruction sequence belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ExprContext {
    FunctionBody,
    InitExpr,
}

/// Decoding state for one walk over a module.
pub(super) struct Reader<'a, 's, S> {
    pub(super) data: &'a [u8],
    pub(super) pos: usize,
    /// End of the innermost length-delimited region being decoded.
    pub(super) end: usize,
    pub(super) sink: &'s mut S,
    pub(super) options: &'s ReadOptions,
    pub(super) errors: Errors,

    last_section_order: u8,
    /// Number of sections seen so far, custom ones included.
    pub(super) section_index: u32,
    pub(super) num_func_imports: u32,
    num_table_imports: u32,
    num_memory_imports: u32,
    num_global_imports: u32,
    num_tag_imports: u32,
    pub(super) num_function_signatures: u32,
    num_function_bodies: Option<u32>,
    pub(super) data_count: Option<u32>,
    data_section_seen: bool,
}

impl<'a, 's, S: EventSink<'a>> Reader<'a, 's, S> {
    fn new(data: &'a [u8], sink: &'s mut S, options: &'s ReadOptions) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len(),
            sink,
            options,
            errors: Errors::new(),
            last_section_order: 0,
            section_index: 0,
            num_func_imports: 0,
            num_table_imports: 0,
            num_memory_imports: 0,
            num_global_imports: 0,
            num_tag_imports: 0,
            num_function_signatures: 0,
            num_function_bodies: None,
            data_count: None,
            data_section_seen: false,
        }
    }

    /// Hands one event to the sink and applies the error policy.
    pub(super) fn emit(&mut self, offset: usize, event: Event<'a>) -> Result<(), Error> {
        match self.sink.on_event(offset, &event) {
            Ok(()) => Ok(()),
            Err(error)
                if error.is_fatal(
                    self.options.stop_on_first_error,
                    self.options.fail_on_custom_section_error,
                ) =>
            {
                Err(error)
            }
            Err(error) => {
                self.errors.push(error);
                Ok(())
            }
        }
    }

    pub(super) fn malformed(&self, message: impl Into<String>) -> Error {
        Error::malformed(self.pos, message)
    }

    // Primitive decoding. Every read is bounded by `self.end`.

    pub(super) fn read_u8(&mut self, what: &str) -> Result<u8, Error> {
        if self.pos >= self.end {
            return Err(self.malformed(format!(
                "unable to read u8: {what}: unexpected end of buffer"
            )));
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    fn leb<T>(
        &mut self,
        what: &str,
        width: &str,
        decode: fn(&[u8]) -> LebResult<T>,
    ) -> Result<T, Error> {
        match decode(&self.data[self.pos..self.end]) {
            Ok((value, len)) => {
                self.pos += len;
                Ok(value)
            }
            Err(error) => Err(self.malformed(format!(
                "unable to read {width} leb128: {what}: {error}"
            ))),
        }
    }

    pub(super) fn read_u32(&mut self, what: &str) -> Result<u32, Error> {
        self.leb(what, "u32", leb128::read_u32)
    }

    pub(super) fn read_u64(&mut self, what: &str) -> Result<u64, Error> {
        self.leb(what, "u64", leb128::read_u64)
    }

    pub(super) fn read_i32(&mut self, what: &str) -> Result<i32, Error> {
        self.leb(what, "i32", leb128::read_i32)
    }

    pub(super) fn read_i64(&mut self, what: &str) -> Result<i64, Error> {
        self.leb(what, "i64", leb128::read_i64)
    }

    pub(super) fn read_bytes(&mut self, len: usize, what: &str) -> Result<&'a [u8], Error> {
        let data: &'a [u8] = self.data;
        match self.pos.checked_add(len) {
            Some(end) if end <= self.end => {
                let bytes = &data[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            _ => Err(self.malformed(format!(
                "unable to read data: {what}: unexpected end of buffer"
            ))),
        }
    }

    pub(super) fn read_fixed_u32(&mut self, what: &str) -> Result<u32, Error> {
        let bytes = self.read_bytes(4, what)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(super) fn read_fixed_u64(&mut self, what: &str) -> Result<u64, Error> {
        let bytes = self.read_bytes(8, what)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    pub(super) fn read_str(&mut self, what: &str) -> Result<&'a str, Error> {
        let len = self.read_u32(what)?;
        let start = self.pos;
        let bytes = self.read_bytes(len as usize, what)?;
        std::str::from_utf8(bytes)
            .map_err(|_| Error::malformed(start, format!("invalid utf-8 encoding: {what}")))
    }

    pub(super) fn read_index(&mut self, what: &str) -> Result<u32, Error> {
        self.read_u32(what)
    }

    /// A length-prefixed vector count that cannot exceed the bytes left.
    pub(super) fn read_count(&mut self, what: &str) -> Result<u32, Error> {
        let offset = self.pos;
        let count = self.read_u32(what)?;
        if count as usize > self.end - self.pos {
            return Err(Error::malformed(
                offset,
                format!("invalid {what}: {count} exceeds the bytes left"),
            ));
        }
        Ok(count)
    }

    // Types.

    fn type_error(&self, what: &str, error: TypeDecodeError) -> Error {
        match error {
            TypeDecodeError::Leb(e) => self.malformed(format!("unable to read {what}: {e}")),
            TypeDecodeError::UnknownType(value) => {
                self.malformed(format!("unexpected {what} {}", fmt_code(value)))
            }
            TypeDecodeError::IndexTooLarge(value) => {
                self.malformed(format!("{what} index {value} too large"))
            }
        }
    }

    fn decode_with<T>(
        &mut self,
        what: &str,
        decode: fn(&[u8]) -> Result<(T, usize), TypeDecodeError>,
    ) -> Result<T, Error> {
        match decode(&self.data[self.pos..self.end]) {
            Ok((value, len)) => {
                self.pos += len;
                Ok(value)
            }
            Err(error) => Err(self.type_error(what, error)),
        }
    }

    /// A value type; packed types are rejected.
    pub(super) fn read_value_type(&mut self, what: &str) -> Result<Type, Error> {
        let offset = self.pos;
        let ty = self.decode_with(what, Type::decode)?;
        if ty.is_packed() {
            return Err(Error::malformed(offset, format!("unexpected {what} {ty}")));
        }
        self.check_type_enabled(ty, offset, what)?;
        Ok(ty)
    }

    fn read_storage_type(&mut self, what: &str) -> Result<Type, Error> {
        let offset = self.pos;
        let ty = self.decode_with(what, Type::decode)?;
        self.check_type_enabled(ty, offset, what)?;
        Ok(ty)
    }

    pub(super) fn read_ref_type(&mut self, what: &str) -> Result<RefType, Error> {
        let offset = self.pos;
        let ty = self.read_value_type(what)?;
        ty.as_ref_type()
            .ok_or_else(|| Error::malformed(offset, format!("unexpected {what} {ty}")))
    }

    pub(super) fn read_heap_type(&mut self, what: &str) -> Result<HeapType, Error> {
        let offset = self.pos;
        let heap = self.decode_with(what, HeapType::decode)?;
        self.check_type_enabled(Type::Ref(RefType::nullable(heap)), offset, what)?;
        Ok(heap)
    }

    pub(super) fn read_block_type(&mut self) -> Result<BlockType, Error> {
        let offset = self.pos;
        let ty = self.decode_with("block type", BlockType::decode)?;
        match ty {
            BlockType::Value(value) if value.is_packed() => {
                return Err(Error::malformed(offset, format!("unexpected block type {value}")));
            }
            BlockType::Value(value) => self.check_type_enabled(value, offset, "block type")?,
            BlockType::Index(_) if !self.options.features.multi_value => {
                return Err(Error::malformed(offset, "unexpected block type index"));
            }
            _ => {}
        }
        Ok(ty)
    }

    /// Rejects types introduced by proposals that are switched off.
    fn check_type_enabled(&self, ty: Type, offset: usize, what: &str) -> Result<(), Error> {
        let features = &self.options.features;
        let enabled = match ty {
            Type::I32 | Type::I64 | Type::F32 | Type::F64 => true,
            Type::V128 => features.simd,
            Type::I8 | Type::I16 => features.gc,
            Type::Ref(rt) => match rt.heap {
                HeapType::Func | HeapType::Extern if rt.nullable => features.reference_types,
                HeapType::Func | HeapType::Extern => features.function_references,
                HeapType::Exn | HeapType::NoExn => features.exceptions,
                HeapType::Index(_) => features.function_references,
                _ => features.gc,
            },
        };
        if enabled {
            Ok(())
        } else {
            Err(Error::malformed(offset, format!("unexpected {what} {ty}")))
        }
    }

    fn read_limits(&mut self, is_memory: bool) -> Result<Limits, Error> {
        let offset = self.pos;
        let features = self.options.features;
        let flags = self.read_u8("limits flags")?;
        let allowed = if is_memory {
            Limits::FLAG_HAS_MAX | Limits::FLAG_SHARED | Limits::FLAG_64 | Limits::FLAG_PAGE_SIZE
        } else {
            Limits::FLAG_HAS_MAX | Limits::FLAG_64
        };
        let shared = flags & Limits::FLAG_SHARED != 0;
        let is_64 = flags & Limits::FLAG_64 != 0;
        if flags & !allowed != 0
            || (shared && !features.threads)
            || (is_64 && !features.memory64)
            || (flags & Limits::FLAG_PAGE_SIZE != 0 && !features.custom_page_sizes)
        {
            return Err(Error::malformed(
                offset,
                format!("malformed limits flags: {flags:#x}"),
            ));
        }
        let read_bound = |this: &mut Self, what: &str| -> Result<u64, Error> {
            if is_64 {
                this.read_u64(what)
            } else {
                this.read_u32(what).map(u64::from)
            }
        };
        let initial = read_bound(self, "limits initial")?;
        let max = if flags & Limits::FLAG_HAS_MAX != 0 {
            Some(read_bound(self, "limits max")?)
        } else {
            None
        };
        Ok(Limits {
            initial,
            max,
            shared,
            is_64,
        })
    }

    fn read_table_type(&mut self) -> Result<TableType, Error> {
        let elem_type = self.read_ref_type("table elem type")?;
        let limits = self.read_limits(false)?;
        Ok(TableType { elem_type, limits })
    }

    fn read_memory_type(&mut self) -> Result<MemoryType, Error> {
        let limits_offset = self.pos;
        let has_page_size = self
            .data
            .get(limits_offset)
            .is_some_and(|flags| flags & Limits::FLAG_PAGE_SIZE != 0);
        let limits = self.read_limits(true)?;
        let page_size_log2 = if has_page_size {
            self.read_u32("memory page size")?
        } else {
            MemoryType::DEFAULT_PAGE_SIZE_LOG2
        };
        Ok(MemoryType {
            limits,
            page_size_log2,
        })
    }

    fn read_mutability(&mut self, what: &str) -> Result<bool, Error> {
        match self.read_u8(what)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::malformed(
                self.pos - 1,
                format!("{what} must be 0 or 1"),
            )),
        }
    }

    fn read_global_type(&mut self) -> Result<GlobalType, Error> {
        let ty = self.read_value_type("global type")?;
        let mutable = self.read_mutability("global mutability")?;
        Ok(GlobalType { ty, mutable })
    }

    fn read_field_type(&mut self) -> Result<FieldType, Error> {
        let ty = self.read_storage_type("field type")?;
        let mutable = self.read_mutability("field mutability")?;
        Ok(FieldType { ty, mutable })
    }

    fn read_composite_type(&mut self, form: i64, offset: usize) -> Result<CompositeType, Error> {
        let gc = self.options.features.gc;
        match form {
            code::FUNC => {
                let num_params = self.read_count("function param count")?;
                let params = (0..num_params)
                    .map(|_| self.read_value_type("function param type"))
                    .collect::<Result<Vec<_>, _>>()?;
                let num_results = self.read_count("function result count")?;
                if num_results > 1 && !self.options.features.multi_value {
                    return Err(self.malformed("result count must be 0 or 1"));
                }
                let results = (0..num_results)
                    .map(|_| self.read_value_type("function result type"))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CompositeType::Func(FuncType::new(params, results)))
            }
            code::STRUCT if gc => {
                let num_fields = self.read_count("struct field count")?;
                let fields = (0..num_fields)
                    .map(|_| self.read_field_type())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CompositeType::Struct(fields))
            }
            code::ARRAY if gc => Ok(CompositeType::Array(self.read_field_type()?)),
            other => Err(Error::malformed(
                offset,
                format!("unexpected type form (got {})", fmt_code(other)),
            )),
        }
    }

    fn read_sub_type(&mut self, form: i64, offset: usize) -> Result<SubType, Error> {
        match form {
            code::SUB | code::SUB_FINAL if self.options.features.gc => {
                let count = self.read_count("supertype count")?;
                if count > 1 {
                    return Err(Error::malformed(offset, "sub type count must be 0 or 1"));
                }
                let supertype = match count {
                    1 => Some(self.read_index("supertype index")?),
                    _ => None,
                };
                let composite_offset = self.pos;
                let composite_form = i64::from(self.read_i32("type form")?);
                let composite = self.read_composite_type(composite_form, composite_offset)?;
                Ok(SubType {
                    is_final: form == code::SUB_FINAL,
                    supertype,
                    composite,
                })
            }
            _ => Ok(SubType::plain(self.read_composite_type(form, offset)?)),
        }
    }

    // Module structure.

    fn read_module(&mut self) -> Result<(), Error> {
        let magic = self.read_bytes(4, "magic")?;
        if magic != MAGIC {
            return Err(Error::malformed(0, "bad magic value"));
        }
        let version = self.read_fixed_u32("version")?;
        if version != VERSION {
            return Err(Error::malformed(
                4,
                format!("bad wasm file version: {version:#x} (expected {VERSION:#x})"),
            ));
        }
        self.emit(0, Event::BeginModule { version })?;

        while self.pos < self.end {
            self.read_section()?;
        }

        if self.num_function_signatures != 0 && self.num_function_bodies.is_none() {
            return Err(self.malformed("function signature count != function body count"));
        }
        if let Some(count) = self.data_count {
            if count != 0 && !self.data_section_seen {
                return Err(self.malformed(
                    "data segment count does not equal count in DataCount section",
                ));
            }
        }
        self.emit(self.pos, Event::EndModule)
    }

    fn read_section(&mut self) -> Result<(), Error> {
        let section_start = self.pos;
        let id_byte = self.read_u8("section code")?;
        let size = self.read_u32("section size")?;
        let payload_start = self.pos;
        let payload_end = match payload_start.checked_add(size as usize) {
            Some(end) if end <= self.end => end,
            _ => return Err(self.malformed("invalid section size: extends past end")),
        };

        let features = &self.options.features;
        let id = match SectionId::from_u8(id_byte) {
            Some(SectionId::Tag) if !features.exceptions => None,
            Some(SectionId::DataCount) if !features.bulk_memory => None,
            id => id,
        }
        .ok_or_else(|| Error::malformed(section_start, format!("invalid section code: {id_byte}")))?;

        if let Some(order) = id.order() {
            if order <= self.last_section_order {
                return Err(Error::malformed(
                    section_start,
                    format!("section {id} out of order"),
                ));
            }
            self.last_section_order = order;
        }

        log::debug!("{id} section at {section_start:#x}, {size} bytes");
        let outer_end = self.end;
        self.end = payload_end;
        self.emit(section_start, Event::BeginSection { id, size })?;

        match id {
            SectionId::Custom => self.read_custom_section(section_start)?,
            SectionId::Type => self.read_type_section()?,
            SectionId::Import => self.read_import_section()?,
            SectionId::Function => self.read_function_section()?,
            SectionId::Table => self.read_table_section()?,
            SectionId::Memory => self.read_memory_section()?,
            SectionId::Tag => self.read_tag_section()?,
            SectionId::Global => self.read_global_section()?,
            SectionId::Export => self.read_export_section()?,
            SectionId::Start => self.read_start_section()?,
            SectionId::Elem => self.read_elem_section()?,
            SectionId::DataCount => self.read_data_count_section()?,
            SectionId::Code => self.read_code_section()?,
            SectionId::Data => self.read_data_section()?,
        }

        if self.pos != payload_end {
            return Err(self.malformed(format!(
                "unfinished section (expected end: {payload_end:#x})"
            )));
        }
        self.emit(payload_end, Event::EndSection { id })?;
        self.end = outer_end;
        self.section_index += 1;
        Ok(())
    }

    fn read_type_section(&mut self) -> Result<(), Error> {
        let count = self.read_count("type count")?;
        self.emit(self.pos, Event::TypeCount(count))?;
        let mut next_index = 0u32;
        for _ in 0..count {
            let offset = self.pos;
            let form = i64::from(self.read_i32("type form")?);
            if form == code::REC && self.options.features.gc {
                let group_size = self.read_count("recursive type count")?;
                self.emit(
                    offset,
                    Event::RecGroup {
                        first: next_index,
                        count: group_size,
                    },
                )?;
                for _ in 0..group_size {
                    let type_offset = self.pos;
                    let form = i64::from(self.read_i32("type form")?);
                    let ty = self.read_sub_type(form, type_offset)?;
                    self.emit(type_offset, Event::Type { index: next_index, ty })?;
                    next_index += 1;
                }
            } else {
                let ty = self.read_sub_type(form, offset)?;
                self.emit(
                    offset,
                    Event::RecGroup {
                        first: next_index,
                        count: 1,
                    },
                )?;
                self.emit(offset, Event::Type { index: next_index, ty })?;
                next_index += 1;
            }
        }
        Ok(())
    }

    fn read_import_section(&mut self) -> Result<(), Error> {
        let count = self.read_count("import count")?;
        self.emit(self.pos, Event::ImportCount(count))?;
        for index in 0..count {
            let offset = self.pos;
            let module = self.read_str("import module name")?;
            let field = self.read_str("import field name")?;
            let kind_offset = self.pos;
            let kind = self.read_u8("import kind")?;
            let desc = match ExternalKind::from_u8(kind) {
                Some(ExternalKind::Func) => {
                    let type_index = self.read_index("import signature index")?;
                    self.num_func_imports += 1;
                    ImportDesc::Func {
                        func_index: self.num_func_imports - 1,
                        type_index,
                    }
                }
                Some(ExternalKind::Table) => {
                    let ty = self.read_table_type()?;
                    self.num_table_imports += 1;
                    ImportDesc::Table {
                        table_index: self.num_table_imports - 1,
                        ty,
                    }
                }
                Some(ExternalKind::Memory) => {
                    let ty = self.read_memory_type()?;
                    self.num_memory_imports += 1;
                    ImportDesc::Memory {
                        memory_index: self.num_memory_imports - 1,
                        ty,
                    }
                }
                Some(ExternalKind::Global) => {
                    let ty = self.read_global_type()?;
                    self.num_global_imports += 1;
                    ImportDesc::Global {
                        global_index: self.num_global_imports - 1,
                        ty,
                    }
                }
                Some(ExternalKind::Tag) if self.options.features.exceptions => {
                    let type_index = self.read_tag_type()?;
                    self.num_tag_imports += 1;
                    ImportDesc::Tag {
                        tag_index: self.num_tag_imports - 1,
                        type_index,
                    }
                }
                _ => {
                    return Err(Error::malformed(
                        kind_offset,
                        format!("malformed import kind: {kind}"),
                    ))
                }
            };
            self.emit(
                offset,
                Event::Import {
                    index,
                    module,
                    field,
                    desc,
                },
            )?;
        }
        Ok(())
    }

    fn read_function_section(&mut self) -> Result<(), Error> {
        let count = self.read_count("function signature count")?;
        self.num_function_signatures = count;
        self.emit(self.pos, Event::FunctionCount(count))?;
        for i in 0..count {
            let offset = self.pos;
            let type_index = self.read_index("function signature index")?;
            self.emit(
                offset,
                Event::Function {
                    index: self.num_func_imports + i,
                    type_index,
                },
            )?;
        }
        Ok(())
    }

    fn read_table_section(&mut self) -> Result<(), Error> {
        let count = self.read_count("table count")?;
        self.emit(self.pos, Event::TableCount(count))?;
        for i in 0..count {
            let offset = self.pos;
            let ty = self.read_table_type()?;
            self.emit(
                offset,
                Event::Table {
                    index: self.num_table_imports + i,
                    ty,
                },
            )?;
        }
        Ok(())
    }

    fn read_memory_section(&mut self) -> Result<(), Error> {
        let count = self.read_count("memory count")?;
        self.emit(self.pos, Event::MemoryCount(count))?;
        for i in 0..count {
            let offset = self.pos;
            let ty = self.read_memory_type()?;
            self.emit(
                offset,
                Event::Memory {
                    index: self.num_memory_imports + i,
                    ty,
                },
            )?;
        }
        Ok(())
    }

    fn read_tag_type(&mut self) -> Result<u32, Error> {
        let attribute = self.read_u8("tag attribute")?;
        if attribute != 0 {
            return Err(Error::malformed(self.pos - 1, "tag attribute must be 0"));
        }
        self.read_index("tag signature index")
    }

    fn read_tag_section(&mut self) -> Result<(), Error> {
        let count = self.read_count("tag count")?;
        self.emit(self.pos, Event::TagCount(count))?;
        for i in 0..count {
            let offset = self.pos;
            let type_index = self.read_tag_type()?;
            self.emit(
                offset,
                Event::Tag {
                    index: self.num_tag_imports + i,
                    type_index,
                },
            )?;
        }
        Ok(())
    }

    fn read_global_section(&mut self) -> Result<(), Error> {
        let count = self.read_count("global count")?;
        self.emit(self.pos, Event::GlobalCount(count))?;
        for i in 0..count {
            let offset = self.pos;
            let index = self.num_global_imports + i;
            let ty = self.read_global_type()?;
            self.emit(offset, Event::BeginGlobal { index, ty })?;
            self.read_init_expr(InitExprTarget::Global(index))?;
            self.emit(self.pos, Event::EndGlobal { index })?;
        }
        Ok(())
    }

    /// A constant expression, announced between `BeginInitExpr` and
    /// `EndInitExpr`. Constness is left to the validator.
    fn read_init_expr(&mut self, target: InitExprTarget) -> Result<(), Error> {
        self.emit(self.pos, Event::BeginInitExpr { target })?;
        self.read_instructions(ExprContext::InitExpr)?;
        self.emit(self.pos, Event::EndInitExpr { target })
    }

    fn read_export_section(&mut self) -> Result<(), Error> {
        let count = self.read_count("export count")?;
        self.emit(self.pos, Event::ExportCount(count))?;
        for index in 0..count {
            let offset = self.pos;
            let name = self.read_str("export item name")?;
            let kind_offset = self.pos;
            let kind_byte = self.read_u8("export kind")?;
            let kind = match ExternalKind::from_u8(kind_byte) {
                Some(ExternalKind::Tag) if !self.options.features.exceptions => None,
                kind => kind,
            }
            .ok_or_else(|| {
                Error::malformed(kind_offset, format!("malformed export kind: {kind_byte}"))
            })?;
            let item_index = self.read_index("export item index")?;
            self.emit(
                offset,
                Event::Export {
                    index,
                    name,
                    kind,
                    item_index,
                },
            )?;
        }
        Ok(())
    }

    fn read_start_section(&mut self) -> Result<(), Error> {
        let offset = self.pos;
        let func_index = self.read_index("start function index")?;
        self.emit(offset, Event::StartFunction(func_index))
    }

    fn read_elem_section(&mut self) -> Result<(), Error> {
        let count = self.read_count("elem segment count")?;
        self.emit(self.pos, Event::ElemSegmentCount(count))?;
        for index in 0..count {
            let offset = self.pos;
            let flags = self.read_u32("elem segment flags")?;
            if flags > 7 || (flags != 0 && !self.options.features.bulk_memory) {
                return Err(Error::malformed(
                    offset,
                    format!("invalid elem segment flags: {flags:#x}"),
                ));
            }
            let passive_or_declared = flags & 0x1 != 0;
            let explicit = flags & 0x2 != 0;
            let uses_exprs = flags & 0x4 != 0;

            let mode = match (passive_or_declared, explicit) {
                (false, false) => SegmentMode::Active(0),
                (false, true) => SegmentMode::Active(self.read_index("elem segment table index")?),
                (true, false) => SegmentMode::Passive,
                (true, true) => SegmentMode::Declared,
            };
            self.emit(offset, Event::BeginElemSegment { index, mode })?;
            if let SegmentMode::Active(_) = mode {
                self.read_init_expr(InitExprTarget::ElemOffset(index))?;
            }

            let type_offset = self.pos;
            let elem_type = match (passive_or_declared || explicit, uses_exprs) {
                (false, _) => RefType::FUNCREF,
                (true, true) => self.read_ref_type("elem expr type")?,
                (true, false) => {
                    let kind = self.read_u8("elem kind")?;
                    if kind != 0 {
                        return Err(Error::malformed(
                            type_offset,
                            format!("elem kind must be 0 (funcref), got {kind}"),
                        ));
                    }
                    RefType::FUNCREF
                }
            };
            let num_elems = self.read_count("elem count")?;
            self.emit(
                type_offset,
                Event::ElemSegmentType {
                    index,
                    elem_type,
                    count: num_elems,
                },
            )?;
            for i in 0..num_elems {
                if uses_exprs {
                    self.read_init_expr(InitExprTarget::ElemExpr {
                        segment: index,
                        index: i,
                    })?;
                } else {
                    let elem_offset = self.pos;
                    let func_index = self.read_index("elem function index")?;
                    self.emit(
                        elem_offset,
                        Event::ElemFunction {
                            segment: index,
                            index: i,
                            func_index,
                        },
                    )?;
                }
            }
            self.emit(self.pos, Event::EndElemSegment { index })?;
        }
        Ok(())
    }

    fn read_data_count_section(&mut self) -> Result<(), Error> {
        let offset = self.pos;
        let count = self.read_u32("data count")?;
        self.data_count = Some(count);
        self.emit(offset, Event::DataCount(count))
    }

    fn read_code_section(&mut self) -> Result<(), Error> {
        let offset = self.pos;
        let count = self.read_count("function body count")?;
        if count != self.num_function_signatures {
            return Err(Error::malformed(
                offset,
                "function signature count != function body count",
            ));
        }
        self.num_function_bodies = Some(count);
        self.emit(offset, Event::FunctionBodyCount(count))?;
        for i in 0..count {
            self.read_function_body(self.num_func_imports + i)?;
        }
        Ok(())
    }

    fn read_function_body(&mut self, index: u32) -> Result<(), Error> {
        let size = self.read_u32("function body size")?;
        let body_start = self.pos;
        let body_end = match body_start.checked_add(size as usize) {
            Some(end) if end <= self.end => end,
            _ => return Err(self.malformed("invalid function body size: extends past end")),
        };
        log::debug!("function {index} body at {body_start:#x}, {size} bytes");

        let outer_end = self.end;
        self.end = body_end;
        self.emit(body_start, Event::BeginFunctionBody { index, size })?;

        let decl_offset = self.pos;
        let num_decls = self.read_count("local declaration count")?;
        self.emit(decl_offset, Event::LocalDeclCount(num_decls))?;
        let mut total_locals = 0u64;
        for decl_index in 0..num_decls {
            let offset = self.pos;
            let count = self.read_u32("local type count")?;
            total_locals += u64::from(count);
            if total_locals > u64::from(u32::MAX) {
                return Err(Error::malformed(offset, "local count exceeds maximum value"));
            }
            let ty = self.read_value_type("local type")?;
            self.emit(
                offset,
                Event::LocalDecl {
                    decl_index,
                    count,
                    ty,
                },
            )?;
        }

        if self.options.skip_function_bodies {
            let body = &self.data[self.pos..body_end];
            self.emit(self.pos, Event::SkippedFunctionBody { index, body })?;
            self.pos = body_end;
        } else {
            self.read_instructions(ExprContext::FunctionBody)?;
            if self.pos != body_end {
                return Err(self.malformed("function body must end with END opcode"));
            }
        }

        self.emit(body_end, Event::EndFunctionBody { index })?;
        self.end = outer_end;
        Ok(())
    }

    fn read_data_section(&mut self) -> Result<(), Error> {
        let offset = self.pos;
        let count = self.read_count("data segment count")?;
        if let Some(expected) = self.data_count {
            if expected != count {
                return Err(Error::malformed(
                    offset,
                    "data segment count does not equal count in DataCount section",
                ));
            }
        }
        self.data_section_seen = true;
        self.emit(offset, Event::DataSegmentCount(count))?;
        for index in 0..count {
            let offset = self.pos;
            let flags = self.read_u32("data segment flags")?;
            let mode = match flags {
                0 => SegmentMode::Active(0),
                1 if self.options.features.bulk_memory => SegmentMode::Passive,
                2 if self.options.features.bulk_memory => {
                    SegmentMode::Active(self.read_index("data segment memory index")?)
                }
                _ => {
                    return Err(Error::malformed(
                        offset,
                        format!("invalid data segment flags: {flags:#x}"),
                    ))
                }
            };
            self.emit(offset, Event::BeginDataSegment { index, mode })?;
            if let SegmentMode::Active(_) = mode {
                self.read_init_expr(InitExprTarget::DataOffset(index))?;
            }
            let data_offset = self.pos;
            let len = self.read_u32("data segment size")?;
            let data = self.read_bytes(len as usize, "data segment data")?;
            self.emit(data_offset, Event::DataSegmentData { index, data })?;
            self.emit(self.pos, Event::EndDataSegment { index })?;
        }
        Ok(())
    }
}

/// Formats a signed type code the way it appears in hex dumps (`-0x21`).
pub(super) fn fmt_code(value: i64) -> String {
    if value < 0 {
        format!("-{:#x}", value.unsigned_abs())
    } else {
        format!("{value:#x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::EventLog;
    use crate::error::ErrorKind;
    use crate::features::Features;

    fn header() -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes
    }

    fn section(id: u8, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![id];
        leb128::write_u32(&mut bytes, payload.len() as u32);
        bytes.extend_from_slice(payload);
        bytes
    }

    fn read(bytes: &[u8]) -> (EventLog<'_>, Result<(), Errors>) {
        read_with(bytes, &ReadOptions::default())
    }

    fn read_with<'a>(bytes: &'a [u8], options: &ReadOptions) -> (EventLog<'a>, Result<(), Errors>) {
        let mut log = EventLog::new();
        let result = read_binary(bytes, &mut log, options);
        (log, result)
    }

    fn first_message(result: Result<(), Errors>) -> String {
        let errors = result.unwrap_err();
        assert_eq!(errors.first().unwrap().kind, ErrorKind::Malformed);
        errors.first().unwrap().message.clone()
    }

    #[test]
    fn empty_module_has_begin_and_end() {
        let bytes = header();
        let (log, result) = read(&bytes);
        assert!(result.is_ok());
        assert_eq!(log.events.len(), 2);
        assert_eq!(log.events[0].1, Event::BeginModule { version: 1 });
        assert_eq!(log.events[1], (8, Event::EndModule));
    }

    #[test]
    fn bad_magic_and_version() {
        let (_, result) = read(b"\0asn\x01\0\0\0");
        assert_eq!(first_message(result), "bad magic value");

        let (_, result) = read(b"\0asm\x02\0\0\0");
        assert!(first_message(result).starts_with("bad wasm file version"));
    }

    #[test]
    fn truncated_header() {
        let (_, result) = read(b"\0as");
        assert!(first_message(result).contains("unexpected end of buffer"));
    }

    #[test]
    fn type_section_announces_signatures() {
        let mut bytes = header();
        bytes.extend(section(1, &[0x01, 0x60, 0x01, 0x7f, 0x01, 0x7e]));
        let (log, result) = read(&bytes);
        assert!(result.is_ok());
        let ty = log
            .events
            .iter()
            .find_map(|(_, e)| match e {
                Event::Type { index: 0, ty } => Some(ty.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            ty.composite,
            CompositeType::Func(FuncType::new(vec![Type::I32], vec![Type::I64]))
        );
    }

    #[test]
    fn sections_out_of_order_are_malformed() {
        let mut bytes = header();
        bytes.extend(section(3, &[0x00]));
        bytes.extend(section(1, &[0x00]));
        let (_, result) = read(&bytes);
        assert_eq!(first_message(result), "section Type out of order");
    }

    #[test]
    fn tag_section_may_follow_memory() {
        let mut bytes = header();
        bytes.extend(section(1, &[0x01, 0x60, 0x00, 0x00]));
        bytes.extend(section(5, &[0x00]));
        bytes.extend(section(13, &[0x01, 0x00, 0x00]));
        bytes.extend(section(6, &[0x00]));
        let options = ReadOptions {
            features: Features::all(),
            ..ReadOptions::default()
        };
        let (_, result) = read_with(&bytes, &options);
        assert!(result.is_ok());

        let (_, result) = read(&bytes);
        assert_eq!(first_message(result), "invalid section code: 13");
    }

    #[test]
    fn section_size_past_end() {
        let mut bytes = header();
        bytes.extend([0x01, 0x05, 0x00]);
        let (_, result) = read(&bytes);
        assert_eq!(first_message(result), "invalid section size: extends past end");
    }

    #[test]
    fn unfinished_section() {
        let mut bytes = header();
        bytes.extend(section(1, &[0x00, 0x00]));
        let (_, result) = read(&bytes);
        assert!(first_message(result).starts_with("unfinished section"));
    }

    #[test]
    fn function_without_body() {
        let mut bytes = header();
        bytes.extend(section(1, &[0x01, 0x60, 0x00, 0x00]));
        bytes.extend(section(3, &[0x01, 0x00]));
        let (_, result) = read(&bytes);
        assert_eq!(
            first_message(result),
            "function signature count != function body count"
        );
    }

    #[test]
    fn skipped_bodies_are_handed_over_raw() {
        let mut bytes = header();
        bytes.extend(section(1, &[0x01, 0x60, 0x00, 0x00]));
        bytes.extend(section(3, &[0x01, 0x00]));
        bytes.extend(section(10, &[0x01, 0x04, 0x00, 0x01, 0x01, 0x0b]));
        let options = ReadOptions {
            skip_function_bodies: true,
            ..ReadOptions::default()
        };
        let (log, result) = read_with(&bytes, &options);
        assert!(result.is_ok());
        assert!(log.events.iter().any(|(_, e)| matches!(
            e,
            Event::SkippedFunctionBody { index: 0, body } if *body == [0x01, 0x01, 0x0b]
        )));
        assert!(!log
            .events
            .iter()
            .any(|(_, e)| matches!(e, Event::Operator(_))));
    }

    #[test]
    fn local_count_overflow() {
        let mut bytes = header();
        bytes.extend(section(1, &[0x01, 0x60, 0x00, 0x00]));
        bytes.extend(section(3, &[0x01, 0x00]));
        let mut body = vec![0x02];
        for _ in 0..2 {
            leb128::write_u32(&mut body, u32::MAX);
            body.push(0x7f);
        }
        body.push(0x0b);
        let mut code = vec![0x01];
        leb128::write_u32(&mut code, body.len() as u32);
        code.extend(body);
        bytes.extend(section(10, &code));
        let (_, result) = read(&bytes);
        assert_eq!(first_message(result), "local count exceeds maximum value");
    }

    #[test]
    fn data_count_mismatch() {
        let mut bytes = header();
        bytes.extend(section(12, &[0x02]));
        bytes.extend(section(11, &[0x01, 0x01, 0x00]));
        let (_, result) = read(&bytes);
        assert_eq!(
            first_message(result),
            "data segment count does not equal count in DataCount section"
        );
    }

    #[test]
    fn disabled_types_are_rejected() {
        let mut bytes = header();
        bytes.extend(section(1, &[0x01, 0x60, 0x01, 0x7b, 0x00]));
        let options = ReadOptions {
            features: Features::mvp(),
            ..ReadOptions::default()
        };
        let (_, result) = read_with(&bytes, &options);
        assert_eq!(first_message(result), "unexpected function param type v128");
    }

    #[test]
    fn fmt_code_is_signed_hex() {
        assert_eq!(fmt_code(-0x21), "-0x21");
        assert_eq!(fmt_code(3), "0x3");
    }
}
