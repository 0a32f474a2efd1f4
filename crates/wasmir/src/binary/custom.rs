//! Custom section decoders.
//!
//! Every custom section is first announced raw. Known names are then
//! decoded into dedicated events. A decoding failure inside a custom section
//! is reported as [`ErrorKind::CustomSection`]; with
//! `fail_on_custom_section_error` off it is logged as a warning and the rest
//! of the section is skipped.

use super::event::{Event, EventSink, NameKind};
use super::reader::Reader;
use super::{
    symbol_flags, Comdat, ComdatKind, DataSymbolLocation, DylinkImport, DylinkMemInfo,
    InitFunction, Reloc, RelocType, SegmentInfo, Symbol, SymbolKind,
};
use crate::error::{Error, ErrorKind};

const NAME_MODULE: u8 = 0;
const NAME_FUNCTION: u8 = 1;
const NAME_LOCAL: u8 = 2;
const NAME_LABEL: u8 = 3;
const NAME_TYPE: u8 = 4;
const NAME_TABLE: u8 = 5;
const NAME_MEMORY: u8 = 6;
const NAME_GLOBAL: u8 = 7;
const NAME_ELEM: u8 = 8;
const NAME_DATA: u8 = 9;
const NAME_FIELD: u8 = 10;
const NAME_TAG: u8 = 11;

const LINKING_VERSION: u32 = 2;
const LINKING_SEGMENT_INFO: u8 = 5;
const LINKING_INIT_FUNCS: u8 = 6;
const LINKING_COMDAT_INFO: u8 = 7;
const LINKING_SYMBOL_TABLE: u8 = 8;

const DYLINK_MEM_INFO: u8 = 1;
const DYLINK_NEEDED: u8 = 2;
const DYLINK_EXPORT_INFO: u8 = 3;
const DYLINK_IMPORT_INFO: u8 = 4;

const CODE_METADATA_PREFIX: &str = "metadata.code.";

impl<'a, S: EventSink<'a>> Reader<'a, '_, S> {
    pub(super) fn read_custom_section(&mut self, section_start: usize) -> Result<(), Error> {
        let section_end = self.end;
        let name = self.read_str("section name")?;
        let data = &self.data[self.pos..section_end];
        self.emit(section_start, Event::BeginCustomSection { name, data })?;

        let result = match name {
            "name" if self.options.read_debug_names => self.read_name_section(),
            "linking" => self.read_linking_section(),
            "dylink" => self.read_dylink_section(),
            "dylink.0" => self.read_dylink0_section(),
            "target_features" => self.read_target_features_section(),
            _ if name.starts_with("reloc.") => self.read_reloc_section(),
            _ if name.starts_with(CODE_METADATA_PREFIX) && self.options.features.code_metadata => {
                self.read_code_metadata_section(&name[CODE_METADATA_PREFIX.len()..])
            }
            _ => {
                self.pos = section_end;
                Ok(())
            }
        }
        .and_then(|()| {
            if self.pos != section_end {
                return Err(self.malformed(format!(
                    "unfinished custom section {name:?}"
                )));
            }
            Ok(())
        });

        if let Err(mut error) = result {
            if error.kind == ErrorKind::Malformed {
                error.kind = ErrorKind::CustomSection;
            }
            if error.is_fatal(
                self.options.stop_on_first_error,
                self.options.fail_on_custom_section_error,
            ) {
                return Err(error);
            }
            log::warn!("ignoring malformed custom section {name:?}: {error}");
            self.end = section_end;
            self.pos = section_end;
        }
        self.emit(section_end, Event::EndCustomSection { name })
    }

    /// Runs `read` over a `(id, size, payload)` subsection and checks that it
    /// consumed exactly `size` bytes.
    fn subsection(
        &mut self,
        what: &str,
        read: impl FnOnce(&mut Self, u8) -> Result<(), Error>,
    ) -> Result<u8, Error> {
        let id = self.read_u8(what)?;
        let size = self.read_u32("subsection size")?;
        let sub_end = match self.pos.checked_add(size as usize) {
            Some(end) if end <= self.end => end,
            _ => return Err(self.malformed("invalid subsection size: extends past end")),
        };
        let outer_end = self.end;
        self.end = sub_end;
        read(self, id)?;
        if self.pos != sub_end {
            return Err(self.malformed(format!("unfinished sub-section (expected end: {sub_end:#x})")));
        }
        self.end = outer_end;
        Ok(id)
    }

    fn skip_to_end(&mut self) {
        self.pos = self.end;
    }

    // name

    fn read_name_section(&mut self) -> Result<(), Error> {
        let mut previous: Option<u8> = None;
        while self.pos < self.end {
            let offset = self.pos;
            let id = self.subsection("name type", |this, id| this.read_name_subsection(id))?;
            if previous.is_some_and(|prev| id <= prev) {
                return Err(Error::malformed(
                    offset,
                    format!("name subsection {id} out of order"),
                ));
            }
            previous = Some(id);
        }
        Ok(())
    }

    fn read_name_subsection(&mut self, id: u8) -> Result<(), Error> {
        match id {
            NAME_MODULE => {
                let offset = self.pos;
                let name = self.read_str("module name")?;
                self.emit(offset, Event::ModuleName(name))
            }
            NAME_FUNCTION => self.read_name_map("function", |this, offset, index, name| {
                let num_funcs = this.num_func_imports + this.num_function_signatures;
                if index >= num_funcs {
                    return Err(Error::malformed(
                        offset,
                        format!("invalid function index: {index}"),
                    ));
                }
                this.emit(offset, Event::FunctionName { index, name })
            }),
            NAME_LOCAL => self.read_indirect_name_map("local", |func_index, local_index, name| {
                Event::LocalName {
                    func_index,
                    local_index,
                    name,
                }
            }),
            NAME_LABEL => self.read_indirect_name_map("label", |func_index, label_index, name| {
                Event::LabelName {
                    func_index,
                    label_index,
                    name,
                }
            }),
            NAME_FIELD => self.read_indirect_name_map("field", |type_index, field_index, name| {
                Event::FieldName {
                    type_index,
                    field_index,
                    name,
                }
            }),
            NAME_TYPE | NAME_TABLE | NAME_MEMORY | NAME_GLOBAL | NAME_ELEM | NAME_DATA
            | NAME_TAG => {
                let kind = match id {
                    NAME_TYPE => NameKind::Type,
                    NAME_TABLE => NameKind::Table,
                    NAME_MEMORY => NameKind::Memory,
                    NAME_GLOBAL => NameKind::Global,
                    NAME_ELEM => NameKind::ElemSegment,
                    NAME_DATA => NameKind::DataSegment,
                    _ => NameKind::Tag,
                };
                self.read_name_map("name", move |this, offset, index, name| {
                    this.emit(offset, Event::Name { kind, index, name })
                })
            }
            _ => {
                self.skip_to_end();
                Ok(())
            }
        }
    }

    /// `vec(index, name)` with strictly increasing indices.
    fn read_name_map(
        &mut self,
        what: &str,
        mut on_entry: impl FnMut(&mut Self, usize, u32, &'a str) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let count = self.read_count("name count")?;
        let mut last: Option<u32> = None;
        for _ in 0..count {
            let offset = self.pos;
            let index = self.read_index("name index")?;
            if last.is_some_and(|prev| index <= prev) {
                return Err(Error::malformed(
                    offset,
                    format!("{what} index out of order: {index}"),
                ));
            }
            last = Some(index);
            let name = self.read_str("name")?;
            on_entry(self, offset, index, name)?;
        }
        Ok(())
    }

    /// `vec(outer index, vec(inner index, name))`.
    fn read_indirect_name_map(
        &mut self,
        what: &str,
        make: impl Fn(u32, u32, &'a str) -> Event<'a>,
    ) -> Result<(), Error> {
        let count = self.read_count("name count")?;
        let mut last: Option<u32> = None;
        for _ in 0..count {
            let offset = self.pos;
            let outer = self.read_index("name index")?;
            if last.is_some_and(|prev| outer <= prev) {
                return Err(Error::malformed(
                    offset,
                    format!("{what} map index out of order: {outer}"),
                ));
            }
            last = Some(outer);
            self.read_name_map(what, |this, offset, inner, name| {
                this.emit(offset, make(outer, inner, name))
            })?;
        }
        Ok(())
    }

    // reloc.*

    fn read_reloc_section(&mut self) -> Result<(), Error> {
        let section_index = self.read_u32("reloc section index")?;
        let count = self.read_count("reloc count")?;
        self.emit(
            self.pos,
            Event::RelocCount {
                section_index,
                count,
            },
        )?;
        for _ in 0..count {
            let offset = self.pos;
            let ty_byte = self.read_u8("reloc type")?;
            let ty = RelocType::from_u8(ty_byte).ok_or_else(|| {
                Error::malformed(offset, format!("unknown reloc type: {ty_byte}"))
            })?;
            let reloc_offset = self.read_u32("reloc offset")?;
            let index = self.read_u32("reloc index")?;
            let addend = if !ty.has_addend() {
                0
            } else if is_64bit_reloc(ty) {
                self.read_i64("reloc addend")?
            } else {
                i64::from(self.read_i32("reloc addend")?)
            };
            self.emit(
                offset,
                Event::Reloc(Reloc {
                    ty,
                    offset: reloc_offset,
                    index,
                    addend,
                }),
            )?;
        }
        Ok(())
    }

    // linking

    fn read_linking_section(&mut self) -> Result<(), Error> {
        let offset = self.pos;
        let version = self.read_u32("linking version")?;
        if version != LINKING_VERSION {
            return Err(Error::malformed(
                offset,
                format!("invalid linking metadata version: {version}"),
            ));
        }
        self.emit(offset, Event::LinkingVersion(version))?;
        while self.pos < self.end {
            self.subsection("linking subsection type", |this, id| match id {
                LINKING_SEGMENT_INFO => this.read_segment_info(),
                LINKING_INIT_FUNCS => this.read_init_functions(),
                LINKING_COMDAT_INFO => this.read_comdats(),
                LINKING_SYMBOL_TABLE => this.read_symbol_table(),
                _ => {
                    this.skip_to_end();
                    Ok(())
                }
            })?;
        }
        Ok(())
    }

    fn read_segment_info(&mut self) -> Result<(), Error> {
        let count = self.read_count("segment count")?;
        for _ in 0..count {
            let offset = self.pos;
            let name = self.read_str("segment name")?.to_string();
            let alignment_log2 = self.read_u32("segment alignment")?;
            let flags = self.read_u32("segment flags")?;
            self.emit(
                offset,
                Event::SegmentInfo(SegmentInfo {
                    name,
                    alignment_log2,
                    flags,
                }),
            )?;
        }
        Ok(())
    }

    fn read_init_functions(&mut self) -> Result<(), Error> {
        let count = self.read_count("init function count")?;
        for _ in 0..count {
            let offset = self.pos;
            let priority = self.read_u32("init function priority")?;
            let symbol = self.read_u32("init function symbol index")?;
            self.emit(
                offset,
                Event::InitFunction(InitFunction { priority, symbol }),
            )?;
        }
        Ok(())
    }

    fn read_comdats(&mut self) -> Result<(), Error> {
        let count = self.read_count("comdat count")?;
        for _ in 0..count {
            let offset = self.pos;
            let name = self.read_str("comdat name")?.to_string();
            let flags = self.read_u32("comdat flags")?;
            let num_entries = self.read_count("comdat entry count")?;
            let mut entries = Vec::with_capacity(num_entries as usize);
            for _ in 0..num_entries {
                let kind_offset = self.pos;
                let kind_byte = self.read_u8("comdat entry kind")?;
                let kind = ComdatKind::from_u8(kind_byte).ok_or_else(|| {
                    Error::malformed(kind_offset, format!("unknown comdat kind: {kind_byte}"))
                })?;
                entries.push((kind, self.read_u32("comdat entry index")?));
            }
            self.emit(
                offset,
                Event::Comdat(Comdat {
                    name,
                    flags,
                    entries,
                }),
            )?;
        }
        Ok(())
    }

    fn read_symbol_table(&mut self) -> Result<(), Error> {
        let count = self.read_count("symbol count")?;
        for index in 0..count {
            let offset = self.pos;
            let kind_byte = self.read_u8("symbol type")?;
            let kind = SymbolKind::from_u8(kind_byte).ok_or_else(|| {
                Error::malformed(offset, format!("invalid symbol type: {kind_byte}"))
            })?;
            let flags = self.read_u32("symbol flags")?;
            let undefined = flags & symbol_flags::UNDEFINED != 0;
            let explicit_name = flags & symbol_flags::EXPLICIT_NAME != 0;
            let symbol = match kind {
                SymbolKind::Function | SymbolKind::Global | SymbolKind::Tag | SymbolKind::Table => {
                    let item = self.read_u32("symbol index")?;
                    let name = if !undefined || explicit_name {
                        Some(self.read_str("symbol name")?.to_string())
                    } else {
                        None
                    };
                    Symbol {
                        kind,
                        flags,
                        name,
                        index: Some(item),
                        data: None,
                    }
                }
                SymbolKind::Data => {
                    let name = Some(self.read_str("data symbol name")?.to_string());
                    let data = if undefined {
                        None
                    } else {
                        Some(DataSymbolLocation {
                            segment: self.read_u32("data symbol segment")?,
                            offset: self.read_u64("data symbol offset")?,
                            size: self.read_u64("data symbol size")?,
                        })
                    };
                    Symbol {
                        kind,
                        flags,
                        name,
                        index: None,
                        data,
                    }
                }
                SymbolKind::Section => Symbol {
                    kind,
                    flags,
                    name: None,
                    index: Some(self.read_u32("section symbol index")?),
                    data: None,
                },
            };
            self.emit(offset, Event::Symbol { index, symbol })?;
        }
        Ok(())
    }

    // dylink

    fn read_dylink_mem_info(&mut self) -> Result<(), Error> {
        let offset = self.pos;
        let mem_info = DylinkMemInfo {
            mem_size: self.read_u32("dylink mem size")?,
            mem_align: self.read_u32("dylink mem align")?,
            table_size: self.read_u32("dylink table size")?,
            table_align: self.read_u32("dylink table align")?,
        };
        self.emit(offset, Event::DylinkMemInfo(mem_info))
    }

    fn read_dylink_needed(&mut self) -> Result<(), Error> {
        let count = self.read_count("dylink needed count")?;
        for _ in 0..count {
            let offset = self.pos;
            let name = self.read_str("dylink needed name")?;
            self.emit(offset, Event::DylinkNeeded(name))?;
        }
        Ok(())
    }

    /// The pre-standard `dylink` section: a fixed layout without
    /// subsections.
    fn read_dylink_section(&mut self) -> Result<(), Error> {
        self.read_dylink_mem_info()?;
        self.read_dylink_needed()
    }

    fn read_dylink0_section(&mut self) -> Result<(), Error> {
        while self.pos < self.end {
            self.subsection("dylink subsection type", |this, id| match id {
                DYLINK_MEM_INFO => this.read_dylink_mem_info(),
                DYLINK_NEEDED => this.read_dylink_needed(),
                DYLINK_EXPORT_INFO => {
                    let count = this.read_count("dylink export count")?;
                    for _ in 0..count {
                        let offset = this.pos;
                        let name = this.read_str("dylink export name")?;
                        let flags = this.read_u32("dylink export flags")?;
                        this.emit(offset, Event::DylinkExport { name, flags })?;
                    }
                    Ok(())
                }
                DYLINK_IMPORT_INFO => {
                    let count = this.read_count("dylink import count")?;
                    for _ in 0..count {
                        let offset = this.pos;
                        let module = this.read_str("dylink import module")?.to_string();
                        let field = this.read_str("dylink import field")?.to_string();
                        let flags = this.read_u32("dylink import flags")?;
                        this.emit(
                            offset,
                            Event::DylinkImport(DylinkImport {
                                module,
                                field,
                                flags,
                            }),
                        )?;
                    }
                    Ok(())
                }
                _ => {
                    this.skip_to_end();
                    Ok(())
                }
            })?;
        }
        Ok(())
    }

    // target_features

    fn read_target_features_section(&mut self) -> Result<(), Error> {
        let count = self.read_count("target feature count")?;
        for _ in 0..count {
            let offset = self.pos;
            let prefix = self.read_u8("target feature prefix")?;
            if !matches!(prefix, b'+' | b'-' | b'=') {
                return Err(Error::malformed(
                    offset,
                    format!("malformed target feature prefix: {prefix:#x}"),
                ));
            }
            let name = self.read_str("target feature name")?;
            self.emit(offset, Event::TargetFeature { prefix, name })?;
        }
        Ok(())
    }

    // metadata.code.*

    fn read_code_metadata_section(&mut self, name: &'a str) -> Result<(), Error> {
        let num_funcs = self.read_count("code metadata function count")?;
        let mut last_func: Option<u32> = None;
        for _ in 0..num_funcs {
            let func_offset = self.pos;
            let func_index = self.read_index("code metadata function index")?;
            if last_func.is_some_and(|prev| func_index <= prev) {
                return Err(Error::malformed(
                    func_offset,
                    format!("code metadata function index out of order: {func_index}"),
                ));
            }
            last_func = Some(func_index);
            let count = self.read_count("code metadata instance count")?;
            let mut last_offset: Option<u32> = None;
            for _ in 0..count {
                let offset = self.pos;
                let code_offset = self.read_u32("code metadata offset")?;
                if last_offset.is_some_and(|prev| code_offset <= prev) {
                    return Err(Error::malformed(
                        offset,
                        format!("code metadata offset out of order: {code_offset}"),
                    ));
                }
                last_offset = Some(code_offset);
                let size = self.read_u32("code metadata data size")?;
                let data = self.read_bytes(size as usize, "code metadata data")?;
                self.emit(
                    offset,
                    Event::CodeMetadata {
                        name,
                        func_index,
                        offset: code_offset,
                        data,
                    },
                )?;
            }
        }
        Ok(())
    }
}

fn is_64bit_reloc(ty: RelocType) -> bool {
    matches!(
        ty,
        RelocType::MemoryAddressLeb64
            | RelocType::MemoryAddressSleb64
            | RelocType::MemoryAddressI64
            | RelocType::MemoryAddressRelSleb64
            | RelocType::MemoryAddressTlsSleb64
            | RelocType::FunctionOffsetI64
    )
}

#[cfg(test)]
mod tests {
    use crate::binary::leb128;
    use crate::binary::{read_binary, Event, EventLog, NameKind, ReadOptions};
    use crate::error::{ErrorKind, Errors};
    use crate::features::Features;

    fn string(out: &mut Vec<u8>, s: &str) {
        leb128::write_u32(out, s.len() as u32);
        out.extend_from_slice(s.as_bytes());
    }

    fn custom(name: &str, payload: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        string(&mut body, name);
        body.extend_from_slice(payload);
        let mut bytes = vec![0x00];
        leb128::write_u32(&mut bytes, body.len() as u32);
        bytes.extend(body);
        bytes
    }

    fn module(sections: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = b"\0asm\x01\0\0\0".to_vec();
        for section in sections {
            bytes.extend_from_slice(section);
        }
        bytes
    }

    fn read_with(bytes: &[u8], options: ReadOptions) -> (EventLog<'_>, Result<(), Errors>) {
        let mut log = EventLog::new();
        let result = read_binary(bytes, &mut log, &options);
        (log, result)
    }

    /// One function `() -> ()` with an empty body.
    fn one_function() -> Vec<Vec<u8>> {
        vec![
            vec![0x01, 0x04, 0x01, 0x60, 0x00, 0x00],
            vec![0x03, 0x02, 0x01, 0x00],
            vec![0x0a, 0x04, 0x01, 0x02, 0x00, 0x0b],
        ]
    }

    #[test]
    fn name_section_announces_module_and_function_names() {
        let mut names = Vec::new();
        let mut sub = Vec::new();
        string(&mut sub, "demo");
        names.push(0x00);
        leb128::write_u32(&mut names, sub.len() as u32);
        names.extend(sub);

        let mut sub = vec![0x01, 0x00];
        string(&mut sub, "main");
        names.push(0x01);
        leb128::write_u32(&mut names, sub.len() as u32);
        names.extend(sub);

        let mut sections = one_function();
        sections.push(custom("name", &names));
        let bytes = module(&sections);
        let (log, result) = read_with(&bytes, ReadOptions::default());
        assert!(result.is_ok(), "{result:?}");
        let events: Vec<_> = log.events.iter().map(|(_, e)| e).collect();
        assert!(events.contains(&&Event::ModuleName("demo")));
        assert!(events.contains(&&Event::FunctionName {
            index: 0,
            name: "main"
        }));
    }

    #[test]
    fn name_for_unknown_function_is_a_custom_section_error() {
        let mut sub = vec![0x01, 0x05];
        string(&mut sub, "ghost");
        let mut names = vec![0x01];
        leb128::write_u32(&mut names, sub.len() as u32);
        names.extend(sub);

        let mut sections = one_function();
        sections.push(custom("name", &names));
        let bytes = module(&sections);

        let (_, result) = read_with(&bytes, ReadOptions::default());
        let errors = result.unwrap_err();
        assert_eq!(errors.first().unwrap().kind, ErrorKind::CustomSection);
        assert_eq!(errors.first().unwrap().message, "invalid function index: 5");

        let lenient = ReadOptions {
            fail_on_custom_section_error: false,
            ..ReadOptions::default()
        };
        let (log, result) = read_with(&bytes, lenient);
        assert!(result.is_ok());
        assert!(matches!(log.events.last(), Some((_, Event::EndModule))));
    }

    #[test]
    fn names_skipped_without_debug_names() {
        let bytes = module(&[custom("name", &[0xff, 0xff])]);
        let options = ReadOptions {
            read_debug_names: false,
            ..ReadOptions::default()
        };
        let (log, result) = read_with(&bytes, options);
        assert!(result.is_ok());
        assert!(log
            .events
            .iter()
            .any(|(_, e)| matches!(e, Event::BeginCustomSection { name: "name", .. })));
    }

    #[test]
    fn extended_names_are_tagged_by_kind() {
        let mut sub = vec![0x01, 0x00];
        string(&mut sub, "counter");
        let mut names = vec![0x07];
        leb128::write_u32(&mut names, sub.len() as u32);
        names.extend(sub);
        let bytes = module(&[custom("name", &names)]);
        let (log, result) = read_with(&bytes, ReadOptions::default());
        assert!(result.is_ok());
        assert!(log.events.iter().any(|(_, e)| *e
            == Event::Name {
                kind: NameKind::Global,
                index: 0,
                name: "counter"
            }));
    }

    #[test]
    fn target_features() {
        let mut payload = vec![0x02, b'+'];
        string(&mut payload, "simd128");
        payload.push(b'-');
        string(&mut payload, "atomics");
        let bytes = module(&[custom("target_features", &payload)]);
        let (log, result) = read_with(&bytes, ReadOptions::default());
        assert!(result.is_ok());
        let features: Vec<_> = log
            .events
            .iter()
            .filter_map(|(_, e)| match e {
                Event::TargetFeature { prefix, name } => Some((*prefix, *name)),
                _ => None,
            })
            .collect();
        assert_eq!(features, [(b'+', "simd128"), (b'-', "atomics")]);
    }

    #[test]
    fn reloc_entries_carry_addends_where_defined() {
        // section 3, two entries: func index leb (no addend), memory addr leb (addend -4).
        let payload = [0x03, 0x02, 0x00, 0x10, 0x01, 0x03, 0x20, 0x02, 0x7c];
        let bytes = module(&[custom("reloc.CODE", &payload)]);
        let (log, result) = read_with(&bytes, ReadOptions::default());
        assert!(result.is_ok(), "{result:?}");
        let addends: Vec<_> = log
            .events
            .iter()
            .filter_map(|(_, e)| match e {
                Event::Reloc(reloc) => Some(reloc.addend),
                _ => None,
            })
            .collect();
        assert_eq!(addends, [0, -4]);
    }

    #[test]
    fn code_metadata_needs_the_feature() {
        let mut payload = vec![0x01, 0x00, 0x01, 0x01, 0x01];
        payload.push(0x2a);
        let mut sections = one_function();
        sections.insert(2, custom("metadata.code.branch_hint", &payload));
        let bytes = module(&sections);

        let (log, _) = read_with(&bytes, ReadOptions::default());
        assert!(!log
            .events
            .iter()
            .any(|(_, e)| matches!(e, Event::CodeMetadata { .. })));

        let options = ReadOptions {
            features: Features {
                code_metadata: true,
                ..Features::default()
            },
            ..ReadOptions::default()
        };
        let (log, result) = read_with(&bytes, options);
        assert!(result.is_ok(), "{result:?}");
        assert!(log.events.iter().any(|(_, e)| *e
            == Event::CodeMetadata {
                name: "branch_hint",
                func_index: 0,
                offset: 1,
                data: &[0x2a],
            }));
    }
}
