//! Whole-pipeline tests: bytes through the reader, the IR builder and the
//! validator.

use wasmir::binary::{read_binary, Event, EventLog, Operator, ReadOptions, SectionId};
use wasmir::ir::{read_binary_ir, Expr, Instr, Var};
use wasmir::validator::{validate_module, ValidateOptions, Validator};
use wasmir::{read_module, validate, Config, ErrorKind, Errors};

const HEADER: [u8; 8] = *b"\0asm\x01\0\0\0";

/// `(func (param i32) (result i32) local.get 0)`, built by hand.
fn identity_module() -> Vec<u8> {
    let mut bytes = HEADER.to_vec();
    bytes.extend([0x01, 0x06, 0x01, 0x60, 0x01, 0x7f, 0x01, 0x7f]);
    bytes.extend([0x03, 0x02, 0x01, 0x00]);
    bytes.extend([0x0a, 0x06, 0x01, 0x04, 0x00, 0x20, 0x00, 0x0b]);
    bytes
}

fn errors_of(result: anyhow::Result<()>) -> Errors {
    result
        .unwrap_err()
        .downcast::<Errors>()
        .expect("reader errors")
}

#[test]
fn test_minimal_module() {
    let module = read_binary_ir(&HEADER, &ReadOptions::default()).unwrap();
    assert!(module.types.is_empty());
    assert!(module.funcs.is_empty());
    assert!(module.imports.is_empty());
    assert!(module.exports.is_empty());
    assert!(validate(&HEADER, &Config::default()).is_ok());
}

#[test]
fn test_identity_function_events() {
    let bytes = identity_module();
    let mut log = EventLog::new();
    read_binary(&bytes, &mut log, &ReadOptions::default()).unwrap();

    let events: Vec<_> = log.events.iter().map(|(_, e)| e).collect();
    let position = |pred: &dyn Fn(&Event) -> bool| {
        events
            .iter()
            .position(|e| pred(*e))
            .expect("event present")
    };
    let type_section = position(&|e| {
        matches!(
            e,
            Event::BeginSection {
                id: SectionId::Type,
                ..
            }
        )
    });
    let ty = position(&|e| matches!(e, Event::Type { index: 0, .. }));
    let body = position(&|e| matches!(e, Event::BeginFunctionBody { index: 0, .. }));
    let local_get = position(&|e| {
        matches!(
            e,
            Event::Operator(Operator::Instr(Instr::LocalGet(Var::Index { index: 0, .. })))
        )
    });
    let end_body = position(&|e| matches!(e, Event::EndFunctionBody { index: 0 }));
    assert!(type_section < ty);
    assert!(ty < body);
    assert!(body < local_get);
    assert!(local_get < end_body);

    let module = read_module(&bytes, &Config::default()).unwrap();
    assert_eq!(module.funcs.len(), 1);
    let func = &module.funcs[0];
    let exprs: Vec<_> = module.exprs.iter(func.exprs).collect();
    assert_eq!(exprs.len(), 1);
    assert!(matches!(
        &exprs[0].expr,
        Expr::Instr(Instr::LocalGet(Var::Index { index: 0, .. }))
    ));
}

#[test]
fn test_truncated_module_is_malformed() {
    let mut bytes = identity_module();
    bytes.pop();
    let errors = errors_of(validate(&bytes, &Config::default()));
    let error = errors.first().unwrap();
    assert_eq!(error.kind, ErrorKind::Malformed);
    assert_eq!(error.message, "invalid section size: extends past end");

    // Cut inside the code section's size field.
    let bytes = &identity_module()[..21];
    let errors = errors_of(validate(bytes, &Config::default()));
    let error = errors.first().unwrap();
    assert_eq!(error.kind, ErrorKind::Malformed);
    assert!(error.message.contains("unexpected end of buffer"), "{error}");
}

#[test]
fn test_missing_result_fails_at_end() {
    // (func (result i32)) with an empty body.
    let mut bytes = HEADER.to_vec();
    bytes.extend([0x01, 0x05, 0x01, 0x60, 0x00, 0x01, 0x7f]);
    bytes.extend([0x03, 0x02, 0x01, 0x00]);
    bytes.extend([0x0a, 0x04, 0x01, 0x02, 0x00, 0x0b]);
    let end_offset = bytes.len() - 1;

    let errors = errors_of(validate(&bytes, &Config::default()));
    assert_eq!(errors.len(), 1);
    let error = errors.first().unwrap();
    assert_eq!(error.kind, ErrorKind::Invalid);
    assert_eq!(error.offset, end_offset);
    assert!(error.message.starts_with("type mismatch"), "{error}");
}

#[test]
fn test_branch_depth_out_of_range() {
    // (func (block (br 2))): depth 2 names no label. The function's own
    // label is depth 1.
    let mut bytes = HEADER.to_vec();
    bytes.extend([0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
    bytes.extend([0x03, 0x02, 0x01, 0x00]);
    bytes.extend([0x0a, 0x09, 0x01, 0x07, 0x00, 0x02, 0x40, 0x0c, 0x02, 0x0b, 0x0b]);
    let br_offset = bytes.len() - 4;

    let errors = errors_of(validate(&bytes, &Config::default()));
    let error = errors.first().unwrap();
    assert_eq!(error.kind, ErrorKind::Invalid);
    assert_eq!(error.offset, br_offset);
    assert!(
        error.message.starts_with("label variable out of range"),
        "{error}"
    );
}

#[test]
fn test_streaming_and_ir_validation_agree() {
    let wat = r#"
        (module
          (memory 1)
          (func (export "bad") (result i32)
            i32.const 0
            i64.load)
          (func (export "bad")))
    "#;
    let bytes = wat::parse_str(wat).unwrap();
    let mut options = ReadOptions {
        stop_on_first_error: false,
        ..ReadOptions::default()
    };
    let mut validator = Validator::new(options.features);
    let mut streamed = read_binary(&bytes, &mut validator, &options).unwrap_err();
    streamed.sort();

    options.stop_on_first_error = true;
    let module = read_binary_ir(&bytes, &options).unwrap();
    let walked = validate_module(
        &module,
        &ValidateOptions {
            features: options.features,
            stop_on_first_error: false,
        },
    )
    .unwrap_err();

    let messages = |errors: &Errors| -> Vec<String> {
        errors.iter().map(|e| e.message.clone()).collect()
    };
    assert_eq!(messages(&streamed), messages(&walked));
    assert_eq!(streamed.len(), 2);
}

#[test]
fn test_collected_errors_render_with_file_name() {
    let wat = r#"
        (module
          (func (result i32) f32.const 0)
          (func (result i32) f64.const 0))
    "#;
    let bytes = wat::parse_str(wat).unwrap();
    let mut config = Config::default();
    config.read.stop_on_first_error = false;
    let errors = errors_of(validate(&bytes, &config));
    assert_eq!(errors.len(), 2);
    let text = errors.with_file("a.wasm").to_string();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.starts_with("a.wasm:00000")));
    assert!(lines[0].contains(": error: type mismatch"));
}

#[test]
fn test_disabled_proposal_is_rejected() {
    let wat = r#"(module (func (param i32) (result i32) local.get 0 return_call 0))"#;
    let bytes = wat::parse_str(wat).unwrap();
    let errors = errors_of(validate(&bytes, &Config::default()));
    assert!(errors.has_kind(ErrorKind::Malformed));

    let mut config = Config::default();
    config.read.features.set("tail-call", true);
    assert!(validate(&bytes, &config).is_ok());
}

#[test]
fn test_collect_all_recovers_after_bad_block_type() {
    // Two `[] -> []` functions: `block (type 5) end end` and
    // `i32.const 0 end`. Each has exactly one fault.
    let mut bytes = HEADER.to_vec();
    bytes.extend([0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
    bytes.extend([0x03, 0x03, 0x02, 0x00, 0x00]);
    bytes.extend([0x0a, 0x0c, 0x02]);
    bytes.extend([0x05, 0x00, 0x02, 0x05, 0x0b, 0x0b]);
    bytes.extend([0x04, 0x00, 0x41, 0x00, 0x0b]);

    let mut config = Config::default();
    config.read.stop_on_first_error = false;
    let errors = errors_of(validate(&bytes, &config));
    let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages.len(), 2, "{messages:?}");
    assert_eq!(messages[0], "type variable out of range: 5 (max 1)");
    assert!(messages[1].starts_with("type mismatch"), "{messages:?}");
    assert!(!errors.has_kind(ErrorKind::Malformed));
}
