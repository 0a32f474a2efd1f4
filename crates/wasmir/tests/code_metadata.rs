//! `metadata.code.*` annotations end up in front of the instruction they
//! describe.

use wasmir::binary::ReadOptions;
use wasmir::ir::{read_binary_ir, Expr, Instr};
use wasmir::validator::{validate_module, ValidateOptions};

/// One `[] -> []` function with body `nop end`, annotated at the `nop`.
fn annotated_module() -> Vec<u8> {
    let mut bytes = b"\0asm\x01\0\0\0".to_vec();
    bytes.extend([0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
    bytes.extend([0x03, 0x02, 0x01, 0x00]);

    let name = b"metadata.code.test";
    // One function (0) with one entry at body offset 1 carrying [0x2a].
    let payload = [0x01, 0x00, 0x01, 0x01, 0x01, 0x2a];
    let size = 1 + name.len() + payload.len();
    bytes.extend([0x00, size as u8, name.len() as u8]);
    bytes.extend(name);
    bytes.extend(payload);

    bytes.extend([0x0a, 0x05, 0x01, 0x03, 0x00, 0x01, 0x0b]);
    bytes
}

#[test]
fn test_metadata_precedes_annotated_instruction() {
    let mut options = ReadOptions::default();
    options.features.code_metadata = true;
    let module = read_binary_ir(&annotated_module(), &options).unwrap();

    let exprs: Vec<_> = module
        .exprs
        .iter(module.funcs[0].exprs)
        .map(|node| &node.expr)
        .collect();
    assert_eq!(exprs.len(), 2);
    assert_eq!(
        exprs[0],
        &Expr::CodeMetadata {
            name: "test".to_string(),
            data: vec![0x2a],
        }
    );
    assert_eq!(exprs[1], &Expr::Instr(Instr::Nop));

    let validate = ValidateOptions {
        features: options.features,
        ..ValidateOptions::default()
    };
    assert_eq!(validate_module(&module, &validate), Ok(()));
}

#[test]
fn test_metadata_ignored_when_disabled() {
    let module = read_binary_ir(&annotated_module(), &ReadOptions::default()).unwrap();
    let exprs: Vec<_> = module.exprs.iter(module.funcs[0].exprs).collect();
    assert_eq!(exprs.len(), 1);
    assert_eq!(exprs[0].expr, Expr::Instr(Instr::Nop));
    // The raw section is still kept.
    assert!(module
        .customs
        .iter()
        .any(|custom| custom.name == "metadata.code.test"));
}
