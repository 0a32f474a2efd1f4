//! # IR Builder
//!
//! Consumes the reader's event stream and materialises a [`Module`].
//!
//! ## Pipeline overview
//!
//! ```text
//! bytes ──► read_binary ──► Event ──► IrBuilder::on_event
//!                                       ├── [sections]  declarations, segments, customs
//!                                       ├── [translate] operators ─► label stack ─► ExprArena
//!                                       ├── [metadata]  metadata.code.* queue ─► CodeMetadata nodes
//!                                       └── [names]     name section ─► names + bindings
//!                                                         ─► Module
//! ```
//!
//! ## Architecture
//!
//! | Module        | Responsibility                                          |
//! |---------------|---------------------------------------------------------|
//! | [`core`]      | `IrBuilder` state, label stack, closing blocks          |
//! | [`translate`] | Operator → expression node dispatch                     |
//! | [`sections`]  | Types, imports, entities, segments, linking metadata    |
//! | [`names`]     | Debug names and their binding tables                    |
//! | [`metadata`]  | Code metadata FIFO and splicing                         |
//!
//! Every index in the result is a [`crate::ir::Var`] in index form. Names
//! from the `name` section and from `linking` symbols are attached after the
//! entities exist.

pub mod core;
mod metadata;
mod names;
mod sections;
mod translate;

pub use self::core::IrBuilder;

use super::types::{Module, Var};
use crate::binary::{read_binary, DylinkMemInfo, Event, EventSink, ReadOptions};
use crate::error::{Error, Errors};

/// Reads `data` into a [`Module`].
///
/// Any error, fatal or collected, fails the read: a partially built module
/// is never returned.
pub fn read_binary_ir(data: &[u8], options: &ReadOptions) -> Result<Module, Errors> {
    let mut builder = IrBuilder::new(options.limits);
    read_binary(data, &mut builder, options)?;
    Ok(builder.into_module())
}

impl<'a> EventSink<'a> for IrBuilder {
    fn on_event(&mut self, offset: usize, event: &Event<'a>) -> Result<(), Error> {
        match event {
            Event::RecGroup { first, .. } => self.rec_group = *first,
            Event::Type { index, ty } => return self.on_type(offset, *index, ty),
            Event::Import {
                module,
                field,
                desc,
                ..
            } => self.on_import(offset, module, field, desc),
            Event::Function { type_index, .. } => self.on_function(offset, *type_index),
            Event::Table { ty, .. } => self.push_table(*ty, false),
            Event::Memory { ty, .. } => self.push_memory(*ty, false),
            Event::Tag { type_index, .. } => self.on_tag(offset, *type_index),
            Event::BeginGlobal { ty, .. } => self.push_global(*ty, false),
            Event::BeginInitExpr { target } => return self.on_begin_init_expr(offset, *target),
            Event::Export {
                index,
                name,
                kind,
                item_index,
            } => self.on_export(offset, *index, name, *kind, *item_index),
            Event::StartFunction(func_index) => {
                self.module.starts.push(Var::index(*func_index, offset));
            }
            Event::BeginElemSegment { mode, .. } => self.on_begin_elem_segment(offset, *mode),
            Event::ElemSegmentType {
                index,
                elem_type,
                count,
            } => self.on_elem_segment_type(*index, *elem_type, *count),
            Event::ElemFunction {
                segment,
                func_index,
                ..
            } => self.on_elem_function(offset, *segment, *func_index),
            Event::DataCount(count) => self.module.data_count = Some(*count),
            Event::BeginDataSegment { mode, .. } => self.on_begin_data_segment(offset, *mode),
            Event::DataSegmentData { index, data } => self.on_data_segment_data(*index, data),

            Event::BeginFunctionBody { index, size } => {
                return self.on_begin_function_body(offset, *index, *size)
            }
            Event::LocalDecl { count, ty, .. } => return self.on_local_decl(offset, *count, *ty),
            Event::Operator(op) => return self.on_operator(offset, op),
            Event::SkippedFunctionBody { .. } => return self.on_skipped_function_body(offset),
            Event::EndFunctionBody { .. } => return self.on_end_function_body(offset),

            Event::BeginCustomSection { name, data } => {
                self.on_begin_custom_section(offset, name, data)
            }
            Event::ModuleName(name) => self.on_module_name(name),
            Event::FunctionName { index, name } => self.on_function_name(offset, *index, name),
            Event::LocalName {
                func_index,
                local_index,
                name,
            } => self.on_local_name(offset, *func_index, *local_index, name),
            Event::LabelName {
                func_index,
                label_index,
                name,
            } => self.on_label_name(*func_index, *label_index, name),
            Event::FieldName {
                type_index,
                field_index,
                name,
            } => self.on_field_name(*type_index, *field_index, name),
            Event::Name { kind, index, name } => self.on_name(offset, *kind, *index, name),

            Event::RelocCount {
                section_index,
                count,
            } => self.on_reloc_count(*section_index, *count),
            Event::Reloc(reloc) => {
                if let Some(section) = self.module.relocations.last_mut() {
                    section.relocs.push(*reloc);
                }
            }
            Event::LinkingVersion(version) => self.on_linking_version(*version),
            Event::Symbol { symbol, .. } => self.on_symbol(offset, symbol),
            Event::SegmentInfo(info) => self
                .module
                .linking
                .get_or_insert_with(Default::default)
                .segments
                .push(info.clone()),
            Event::InitFunction(init) => self
                .module
                .linking
                .get_or_insert_with(Default::default)
                .init_functions
                .push(*init),
            Event::Comdat(comdat) => self
                .module
                .linking
                .get_or_insert_with(Default::default)
                .comdats
                .push(comdat.clone()),

            Event::DylinkMemInfo(info) => self.dylink_mem_info(*info),
            Event::DylinkNeeded(name) => self
                .module
                .dylink
                .get_or_insert_with(Default::default)
                .needed
                .push(name.to_string()),
            Event::DylinkExport { name, flags } => self
                .module
                .dylink
                .get_or_insert_with(Default::default)
                .exports
                .push((name.to_string(), *flags)),
            Event::DylinkImport(import) => self.on_dylink_import(import),
            Event::TargetFeature { prefix, name } => self.on_target_feature(*prefix, name),
            Event::CodeMetadata {
                name,
                func_index,
                offset: code_offset,
                data,
            } => self.metadata.push(name, *func_index, *code_offset, data),

            Event::BeginModule { .. }
            | Event::EndModule
            | Event::BeginSection { .. }
            | Event::EndSection { .. }
            | Event::TypeCount(_)
            | Event::ImportCount(_)
            | Event::FunctionCount(_)
            | Event::TableCount(_)
            | Event::MemoryCount(_)
            | Event::TagCount(_)
            | Event::GlobalCount(_)
            | Event::EndGlobal { .. }
            | Event::EndInitExpr { .. }
            | Event::ExportCount(_)
            | Event::ElemSegmentCount(_)
            | Event::EndElemSegment { .. }
            | Event::FunctionBodyCount(_)
            | Event::LocalDeclCount(_)
            | Event::DataSegmentCount(_)
            | Event::EndDataSegment { .. }
            | Event::EndCustomSection { .. } => {}
        }
        Ok(())
    }
}

impl IrBuilder {
    fn dylink_mem_info(&mut self, info: DylinkMemInfo) {
        self.module
            .dylink
            .get_or_insert_with(Default::default)
            .mem_info = info;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::features::Features;
    use crate::ir::{DataMode, ElemMode, Expr, ImportItem, Instr};
    use crate::opcode::Opcode;
    use crate::types::Type;

    fn build(wat: &str) -> Module {
        let bytes = wat::parse_str(wat).unwrap();
        read_binary_ir(&bytes, &ReadOptions::default()).unwrap_or_else(|e| panic!("{e}"))
    }

    fn ops(module: &Module, list: crate::ir::ExprList) -> Vec<&Expr> {
        module.exprs.iter(list).map(|n| &n.expr).collect()
    }

    #[test]
    fn minimal_module_is_empty() {
        let module = read_binary_ir(b"\0asm\x01\0\0\0", &ReadOptions::default()).unwrap();
        assert!(module.types.is_empty());
        assert!(module.funcs.is_empty());
        assert!(module.exprs.is_empty());
    }

    #[test]
    fn local_get_function() {
        let module = build(r#"(module (func (param i32) (result i32) local.get 0))"#);
        assert_eq!(module.funcs.len(), 1);
        let func = &module.funcs[0];
        assert_eq!(func.sig.params, [Type::I32]);
        let body = ops(&module, func.exprs);
        assert_eq!(body.len(), 1);
        assert!(matches!(body[0], Expr::Instr(Instr::LocalGet(var)) if var.as_index() == Some(0)));
    }

    #[test]
    fn imports_come_first_in_index_spaces() {
        let module = build(
            r#"(module
                (import "env" "f" (func (param i32)))
                (import "env" "g" (global i32))
                (func (export "run") i32.const 0 call 0)
                (global i32 (i32.const 7)))"#,
        );
        assert_eq!(module.num_func_imports, 1);
        assert_eq!(module.funcs.len(), 2);
        assert!(module.funcs[0].imported);
        assert!(!module.funcs[1].imported);
        assert_eq!(module.imports[1].item, ImportItem::Global(0));
        assert_eq!(module.globals.len(), 2);
        let init = ops(&module, module.globals[1].init);
        assert_eq!(init, [&Expr::Instr(Instr::I32Const(7))]);
        assert_eq!(module.export("run").map(|e| e.var.as_index()), Some(Some(1)));
    }

    #[test]
    fn segments_keep_their_offsets() {
        let module = build(
            r#"(module
                (table 2 funcref)
                (memory 1)
                (func $f)
                (elem (i32.const 1) $f)
                (data (i32.const 8) "hi"))"#,
        );
        let ElemMode::Active { offset, .. } = &module.elem_segments[0].mode else {
            panic!("expected active elem segment");
        };
        assert_eq!(ops(&module, *offset), [&Expr::Instr(Instr::I32Const(1))]);
        assert_eq!(module.elem_segments[0].elems.len(), 1);
        let DataMode::Active { offset, .. } = &module.data_segments[0].mode else {
            panic!("expected active data segment");
        };
        assert_eq!(ops(&module, *offset), [&Expr::Instr(Instr::I32Const(8))]);
        assert_eq!(module.data_segments[0].data, b"hi");
    }

    #[test]
    fn debug_names_are_attached() {
        let module = build(
            r#"(module
                (func $dup (param $x i32))
                (func $dup2)
                (global $g i32 (i32.const 0)))"#,
        );
        assert_eq!(module.funcs[0].name.as_deref(), Some("dup"));
        assert_eq!(module.funcs[0].bindings.find_index("x"), Some(0));
        assert_eq!(module.globals[0].name.as_deref(), Some("g"));
        assert_eq!(module.func_bindings.find_index("dup2"), Some(1));
    }

    #[test]
    fn custom_sections_are_kept_raw() {
        let module = build(r#"(module (@custom "hello" "abc"))"#);
        let custom = module
            .customs
            .iter()
            .find(|c| c.name == "hello")
            .expect("custom section kept");
        assert_eq!(custom.data, b"abc");
    }

    #[test]
    fn nesting_limit_is_a_resource_error() {
        let bytes = wat::parse_str(
            r#"(module (func block block block nop end end end))"#,
        )
        .unwrap();
        let mut options = ReadOptions::default();
        options.limits.max_nesting_depth = 2;
        let errors = read_binary_ir(&bytes, &options).unwrap_err();
        assert_eq!(errors.first().unwrap().kind, ErrorKind::ResourceLimit);
    }

    #[test]
    fn locals_limit_is_a_resource_error() {
        let bytes = wat::parse_str(r#"(module (func (local i32 i32 i32)))"#).unwrap();
        let mut options = ReadOptions::default();
        options.limits.max_locals = 2;
        let errors = read_binary_ir(&bytes, &options).unwrap_err();
        assert_eq!(errors.first().unwrap().kind, ErrorKind::ResourceLimit);
    }

    #[test]
    fn skipped_bodies_leave_empty_lists() {
        let bytes = wat::parse_str(r#"(module (func (local i64) i32.const 1 drop))"#).unwrap();
        let options = ReadOptions {
            skip_function_bodies: true,
            ..ReadOptions::default()
        };
        let module = read_binary_ir(&bytes, &options).unwrap();
        assert!(module.funcs[0].exprs.is_empty());
        assert_eq!(module.funcs[0].locals.len(), 1);
    }

    #[test]
    fn code_metadata_is_spliced_before_its_instruction() {
        // Body: 0x00 (no locals), i32.const 1 @1, drop @3, end @4.
        let mut bytes = b"\0asm\x01\0\0\0".to_vec();
        bytes.extend([0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
        bytes.extend([0x03, 0x02, 0x01, 0x00]);
        let mut custom = vec![0x19];
        custom.extend(b"metadata.code.branch_hint");
        custom.extend([0x01, 0x00, 0x01, 0x03, 0x01, 0x07]);
        bytes.push(0x00);
        bytes.push(custom.len() as u8);
        bytes.extend(custom);
        bytes.extend([0x0a, 0x07, 0x01, 0x05, 0x00, 0x41, 0x01, 0x1a, 0x0b]);

        let options = ReadOptions {
            features: Features {
                code_metadata: true,
                ..Features::default()
            },
            ..ReadOptions::default()
        };
        let module = read_binary_ir(&bytes, &options).unwrap_or_else(|e| panic!("{e}"));
        let body = ops(&module, module.funcs[0].exprs);
        assert_eq!(body.len(), 3);
        assert_eq!(body[0], &Expr::Instr(Instr::I32Const(1)));
        assert_eq!(
            body[1],
            &Expr::CodeMetadata {
                name: "branch_hint".into(),
                data: vec![0x07],
            }
        );
        assert!(matches!(body[2], Expr::Instr(i) if i.opcode() == Opcode::Drop));
    }
}
