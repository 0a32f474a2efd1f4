//! Cross-checks wasmir's verdicts against wasmparser's validator.

use wasmir_tests::{assemble, generated_module, wasmir_accepts, CORPUS};

fn wasmparser_accepts(bytes: &[u8]) -> bool {
    wasmparser::Validator::new().validate_all(bytes).is_ok()
}

#[test]
fn test_corpus_verdicts_match_expectation() {
    for case in CORPUS {
        let bytes = assemble(case).unwrap();
        assert_eq!(
            wasmir_accepts(&bytes),
            case.valid,
            "wasmir verdict for {}",
            case.name
        );
    }
}

#[test]
fn test_corpus_verdicts_match_wasmparser() {
    for case in CORPUS {
        let bytes = assemble(case).unwrap();
        assert_eq!(
            wasmir_accepts(&bytes),
            wasmparser_accepts(&bytes),
            "verdicts differ for {}",
            case.name
        );
    }
}

#[test]
fn test_truncated_modules_rejected_by_both() {
    let bytes = generated_module(2).unwrap();
    for len in [0, 4, 8, 9, bytes.len() / 2, bytes.len() - 1] {
        let prefix = &bytes[..len];
        if len == 8 {
            // A bare header is a complete empty module.
            assert!(wasmir_accepts(prefix));
            assert!(wasmparser_accepts(prefix));
            continue;
        }
        assert!(!wasmir_accepts(prefix), "wasmir accepted {len}-byte prefix");
        assert!(!wasmparser_accepts(prefix), "wasmparser accepted {len}-byte prefix");
    }
}

#[test]
fn test_generated_module_agrees() {
    let bytes = generated_module(16).unwrap();
    assert!(wasmir_accepts(&bytes));
    assert!(wasmparser_accepts(&bytes));
}
