//! Semantic validation.
//!
//! Two front ends share one [`SharedValidator`]: [`Validator`] consumes
//! reader events as they stream past, and [`validate_module`] replays an
//! already built [`Module`](crate::ir::Module) in binary order. Both report
//! the same diagnostics at the same offsets.

mod module;
mod shared;
mod type_checker;

pub use module::validate_module;
pub use shared::SharedValidator;
pub use type_checker::{CheckResult, LabelKind, TypeChecker, TypeError};

use crate::binary::{Event, EventSink, ImportDesc};
use crate::error::Error;
use crate::features::Features;

/// Settings for [`validate_module`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    pub features: Features,
    pub stop_on_first_error: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            features: Features::default(),
            stop_on_first_error: true,
        }
    }
}

/// Validates a module while it is being read.
///
/// Errors go back to the reader, whose error policy decides whether reading
/// goes on. Pair it with an [`IrBuilder`](crate::ir::IrBuilder) in a tuple
/// sink to build and validate in one pass.
#[derive(Debug, Default)]
pub struct Validator {
    shared: SharedValidator,
}

impl Validator {
    pub fn new(features: Features) -> Self {
        Self {
            shared: SharedValidator::new(features),
        }
    }

    pub fn shared(&self) -> &SharedValidator {
        &self.shared
    }
}

impl<'a> EventSink<'a> for Validator {
    fn on_event(&mut self, offset: usize, event: &Event<'a>) -> Result<(), Error> {
        let v = &mut self.shared;
        match event {
            Event::RecGroup { first, count } => {
                v.on_rec_group(*first, *count);
                Ok(())
            }
            Event::Type { index, ty } => v.on_type(offset, *index, ty),
            Event::Import { desc, .. } => match *desc {
                ImportDesc::Func { type_index, .. } => v.on_import_func(offset, type_index),
                ImportDesc::Table { ty, .. } => v.on_table(offset, ty),
                ImportDesc::Memory { ty, .. } => v.on_memory(offset, ty),
                ImportDesc::Global { ty, .. } => v.on_import_global(offset, ty),
                ImportDesc::Tag { type_index, .. } => v.on_tag(offset, type_index),
            },
            Event::Function { type_index, .. } => v.on_function(offset, *type_index),
            Event::Table { ty, .. } => v.on_table(offset, *ty),
            Event::Memory { ty, .. } => v.on_memory(offset, *ty),
            Event::Tag { type_index, .. } => v.on_tag(offset, *type_index),
            Event::BeginGlobal { ty, .. } => v.on_global(offset, *ty),
            Event::BeginInitExpr { target } => v.begin_init_expr(offset, *target),
            Event::EndInitExpr { .. } => {
                v.end_init_expr();
                Ok(())
            }
            Event::Export {
                name,
                kind,
                item_index,
                ..
            } => v.on_export(offset, name, *kind, *item_index),
            Event::StartFunction(func_index) => v.on_start(offset, *func_index),
            Event::BeginElemSegment { mode, .. } => v.begin_elem_segment(offset, *mode),
            Event::ElemSegmentType {
                index, elem_type, ..
            } => v.on_elem_segment_type(offset, *index, *elem_type),
            Event::ElemFunction { func_index, .. } => v.on_elem_function(offset, *func_index),
            Event::DataCount(count) => {
                v.on_data_count(*count);
                Ok(())
            }
            Event::BeginDataSegment { mode, .. } => v.begin_data_segment(offset, *mode),
            Event::BeginFunctionBody { index, .. } => v.begin_function_body(offset, *index),
            Event::LocalDecl { count, ty, .. } => v.on_local_decl(offset, *count, *ty),
            Event::Operator(op) => v.on_operator(offset, op),
            Event::SkippedFunctionBody { .. } => {
                v.skip_function_body();
                Ok(())
            }
            Event::EndFunctionBody { .. } => {
                v.end_function_body();
                Ok(())
            }

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
            | Event::ExportCount(_)
            | Event::ElemSegmentCount(_)
            | Event::EndElemSegment { .. }
            | Event::FunctionBodyCount(_)
            | Event::LocalDeclCount(_)
            | Event::DataSegmentCount(_)
            | Event::DataSegmentData { .. }
            | Event::EndDataSegment { .. }
            | Event::BeginCustomSection { .. }
            | Event::EndCustomSection { .. }
            | Event::ModuleName(_)
            | Event::FunctionName { .. }
            | Event::LocalName { .. }
            | Event::LabelName { .. }
            | Event::FieldName { .. }
            | Event::Name { .. }
            | Event::RelocCount { .. }
            | Event::Reloc(_)
            | Event::LinkingVersion(_)
            | Event::Symbol { .. }
            | Event::SegmentInfo(_)
            | Event::InitFunction(_)
            | Event::Comdat(_)
            | Event::DylinkMemInfo(_)
            | Event::DylinkNeeded(_)
            | Event::DylinkExport { .. }
            | Event::DylinkImport(_)
            | Event::TargetFeature { .. }
            | Event::CodeMetadata { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{read_binary, ReadOptions};
    use crate::error::{ErrorKind, Errors};

    fn validate_wat(wat: &str, options: &ReadOptions) -> Result<(), Errors> {
        let bytes = wat::parse_str(wat).unwrap();
        let mut validator = Validator::new(options.features);
        read_binary(&bytes, &mut validator, options)
    }

    fn messages(wat: &str) -> Vec<String> {
        let options = ReadOptions {
            stop_on_first_error: false,
            ..ReadOptions::default()
        };
        match validate_wat(wat, &options) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(|e| e.message.clone()).collect(),
        }
    }

    #[test]
    fn valid_module_passes() {
        let wat = r#"
            (module
              (memory 1)
              (global $g (mut i32) (i32.const 0))
              (func $add (param i32 i32) (result i32)
                local.get 0
                local.get 1
                i32.add)
              (func (export "run") (result i32)
                (block (result i32)
                  i32.const 1
                  i32.const 2
                  call $add
                  br 0)
                global.get $g
                i32.add
                i32.load offset=4)
              (data (i32.const 0) "hi"))
        "#;
        assert!(validate_wat(wat, &ReadOptions::default()).is_ok());
    }

    #[test]
    fn type_mismatch_is_reported() {
        let wat = r#"(module (func (result i32) i64.const 1))"#;
        let messages = messages(wat);
        assert_eq!(messages.len(), 1);
        assert!(
            messages[0].starts_with("type mismatch"),
            "{messages:?}"
        );
    }

    #[test]
    fn all_errors_collected_when_not_stopping() {
        let wat = r#"
            (module
              (func (export "a") (result i32) f32.const 0)
              (func (export "a")))
        "#;
        let messages = messages(wat);
        assert!(messages.iter().any(|m| m.starts_with("type mismatch")));
        assert!(messages.iter().any(|m| m == "duplicate export \"a\""));
    }

    #[test]
    fn first_error_stops_reading() {
        let wat = r#"
            (module
              (func (result i32) f32.const 0)
              (func (result i32) f32.const 0))
        "#;
        let errors = validate_wat(wat, &ReadOptions::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.has_kind(ErrorKind::Invalid));
    }

    #[test]
    fn declared_functions_may_be_referenced() {
        let wat = r#"
            (module
              (table 1 funcref)
              (func $f)
              (elem declare func $f)
              (func (result funcref) ref.func $f))
        "#;
        assert!(messages(wat).is_empty());

        let wat = r#"
            (module
              (func $f)
              (func (result funcref) ref.func $f))
        "#;
        assert_eq!(
            messages(wat),
            vec!["function 0 is not declared in any elem sections".to_string()]
        );
    }

    #[test]
    fn global_initializer_must_be_constant() {
        let wat = r#"
            (module
              (global i32 (i32.add (i32.const 1) (i32.const 2))))
        "#;
        let messages = messages(wat);
        assert!(
            messages[0].contains("instruction not valid in initializer expression: i32.add"),
            "{messages:?}"
        );
    }

    #[test]
    fn extended_const_allows_arithmetic_initializers() {
        let wat = r#"
            (module
              (global i32 (i32.add (i32.const 1) (i32.const 2))))
        "#;
        let mut options = ReadOptions::default();
        options.features.set("extended-const", true);
        assert!(validate_wat(wat, &options).is_ok());
    }

    #[test]
    fn start_function_must_be_nullary() {
        let wat = r#"
            (module
              (func $s (param i32))
              (start $s))
        "#;
        assert_eq!(messages(wat), vec!["start function must be nullary".to_string()]);
    }

    #[test]
    fn immutable_global_set() {
        let wat = r#"
            (module
              (global i32 (i32.const 0))
              (func i32.const 1 global.set 0))
        "#;
        assert_eq!(
            messages(wat),
            vec!["can't global.set on immutable global at index 0.".to_string()]
        );
    }

    #[test]
    fn exception_handling_is_typed() {
        let wat = r#"
            (module
              (tag $e (param i32))
              (func (result i32)
                (block $h (result i32)
                  (try_table (catch $e $h)
                    i32.const 7
                    throw $e)
                  i32.const 0)))
        "#;
        let mut options = ReadOptions::default();
        options.features.set("exceptions", true);
        assert!(validate_wat(wat, &options).is_ok());
    }

    #[test]
    fn gc_struct_access() {
        let wat = r#"
            (module
              (type $p (struct (field $x (mut i32)) (field $y i8)))
              (func (param (ref $p)) (result i32)
                local.get 0
                i32.const 5
                struct.set $p $x
                local.get 0
                struct.get_s $p $y))
        "#;
        let mut options = ReadOptions::default();
        options.features = Features::all();
        assert!(validate_wat(wat, &options).is_ok());

        let wat = r#"
            (module
              (type $p (struct (field i8)))
              (func (param (ref $p))
                local.get 0
                i32.const 1
                struct.set $p 0))
        "#;
        let errors = validate_wat(wat, &options).unwrap_err();
        assert_eq!(
            errors.first().map(|e| e.message.as_str()),
            Some("struct.set: field 0 of type 0 is immutable")
        );
    }

    fn collected(bytes: &[u8], features: Features) -> Vec<String> {
        let options = ReadOptions {
            features,
            stop_on_first_error: false,
            ..ReadOptions::default()
        };
        let mut validator = Validator::new(features);
        match read_binary(bytes, &mut validator, &options) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(|e| e.message.clone()).collect(),
        }
    }

    /// One `[] -> []` type and one function with the given body.
    fn single_function(body: &[u8]) -> Vec<u8> {
        let mut bytes = b"\0asm\x01\0\0\0".to_vec();
        bytes.extend([0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
        bytes.extend([0x03, 0x02, 0x01, 0x00]);
        let size = body.len() as u8;
        bytes.extend([0x0a, size + 2, 0x01, size]);
        bytes.extend(body);
        bytes
    }

    #[test]
    fn bad_block_type_keeps_labels_paired() {
        // block (type 5) end end
        let bytes = single_function(&[0x00, 0x02, 0x05, 0x0b, 0x0b]);
        let messages = collected(&bytes, Features::default());
        assert_eq!(messages, ["type variable out of range: 5 (max 1)"]);

        // block (type 5) end i32.const 0 end: the stray value is still
        // caught by the function's own label.
        let bytes = single_function(&[0x00, 0x02, 0x05, 0x0b, 0x41, 0x00, 0x0b]);
        let messages = collected(&bytes, Features::default());
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert_eq!(messages[0], "type variable out of range: 5 (max 1)");
        assert!(messages[1].starts_with("type mismatch"), "{messages:?}");
    }

    #[test]
    fn bad_loop_and_if_types_keep_labels_paired() {
        // loop (type 7) end i32.const 1 if (type 7) end end
        let bytes = single_function(&[
            0x00, 0x03, 0x07, 0x0b, 0x41, 0x01, 0x04, 0x07, 0x0b, 0x0b,
        ]);
        let messages = collected(&bytes, Features::default());
        assert_eq!(
            messages,
            [
                "type variable out of range: 7 (max 1)",
                "type variable out of range: 7 (max 1)",
            ]
        );
    }

    #[test]
    fn missing_elem_table_reported_once() {
        let wat = r#"(module (func $f) (elem (table 3) (i32.const 0) func $f))"#;
        assert_eq!(messages(wat), ["table variable out of range: 3 (max 0)"]);
    }

    #[test]
    fn missing_data_memory_does_not_inherit_address_type() {
        let wat = r#"
            (module
              (memory i64 1)
              (data (i64.const 0) "a")
              (data (memory 1) (i32.const 0) "b"))
        "#;
        let bytes = wat::parse_str(wat).unwrap();
        let messages = collected(&bytes, Features::all());
        assert_eq!(messages, ["memory variable out of range: 1 (max 1)"]);
    }

    #[test]
    fn branch_out_of_range_does_not_cascade() {
        let wat = r#"(module (func (block (br 3)) i32.const 0))"#;
        let messages = messages(wat);
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert!(messages[0].starts_with("label variable out of range"), "{messages:?}");
        assert!(messages[1].starts_with("type mismatch"), "{messages:?}");
    }
}
