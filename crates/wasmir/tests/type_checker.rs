//! Properties of the abstract stack machine, driven through its public API.

use proptest::prelude::*;
use wasmir::opcode::Opcode;
use wasmir::types::{FuncType, Type};
use wasmir::validator::{CheckResult, TypeChecker};

fn simple(checker: &mut TypeChecker, op: Opcode) -> CheckResult {
    let results: Vec<_> = op.result_type().into_iter().collect();
    checker.check_signature(&op.param_types(), &results, op.name())
}

#[test]
fn test_mismatch_reported_once_at_offending_instruction() {
    let mut checker = TypeChecker::new();
    checker.begin_function(&[]);
    checker.push(Type::I32);
    let err = simple(&mut checker, Opcode::I64Add).unwrap_err();
    assert!(err.0.starts_with("type mismatch in i64.add"), "{err}");
}

#[test]
fn test_well_typed_sequence_leaves_one_i32() {
    let mut checker = TypeChecker::new();
    checker.begin_function(&[Type::I32]);
    checker.push(Type::I32);
    checker.push(Type::I32);
    simple(&mut checker, Opcode::I32Add).unwrap();
    assert_eq!(checker.stack(), &[Some(Type::I32)]);
    checker.on_end().unwrap();
    assert_eq!(checker.depth(), 0);
}

#[test]
fn test_unreachable_is_polymorphic_but_end_checks_arity() {
    let mut checker = TypeChecker::new();
    checker.begin_function(&[Type::I32]);
    checker.on_unreachable().unwrap();
    // Pops from an empty polymorphic stack succeed.
    simple(&mut checker, Opcode::I64Add).unwrap();
    checker.on_drop().unwrap();
    checker.on_drop().unwrap();
    checker.on_end().unwrap();

    let mut checker = TypeChecker::new();
    checker.begin_function(&[Type::I32]);
    checker.on_unreachable().unwrap();
    checker.push(Type::I32);
    checker.push(Type::I32);
    assert!(checker.on_end().is_err());
}

#[test]
fn test_branch_beyond_nesting_is_rejected() {
    let mut checker = TypeChecker::new();
    checker.begin_function(&[]);
    checker.on_block(&FuncType::default()).unwrap();
    checker.on_br(1).unwrap();
    let err = checker.on_br(2).unwrap_err();
    assert!(err.0.starts_with("label variable out of range"), "{err}");
}

#[test]
fn test_unmatched_end_is_an_error() {
    let mut checker = TypeChecker::new();
    checker.begin_function(&[]);
    checker.on_end().unwrap();
    assert!(checker.on_end().is_err());
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Block,
    Loop,
    If,
    End,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Block),
        Just(Step::Loop),
        Just(Step::If),
        Just(Step::End),
    ]
}

proptest! {
    /// Every `end` returns the label stack to its height before the
    /// matching block opened.
    #[test]
    fn label_depth_returns_after_end(steps in prop::collection::vec(step(), 0..64)) {
        let mut checker = TypeChecker::new();
        checker.begin_function(&[]);
        let empty = FuncType::default();
        let mut heights = Vec::new();
        for step in steps {
            match step {
                Step::End if heights.is_empty() => {}
                Step::End => {
                    let before = heights.pop().unwrap();
                    checker.on_end().unwrap();
                    prop_assert_eq!(checker.depth(), before);
                }
                Step::If => {
                    heights.push(checker.depth());
                    checker.push(Type::I32);
                    checker.on_if(&empty).unwrap();
                }
                Step::Block | Step::Loop => {
                    heights.push(checker.depth());
                    if matches!(step, Step::Block) {
                        checker.on_block(&empty).unwrap();
                    } else {
                        checker.on_loop(&empty).unwrap();
                    }
                }
            }
        }
        while let Some(before) = heights.pop() {
            checker.on_end().unwrap();
            prop_assert_eq!(checker.depth(), before);
        }
        prop_assert_eq!(checker.depth(), 1);
        checker.on_end().unwrap();
        prop_assert_eq!(checker.depth(), 0);
    }
}
