//! Shared fixtures for the conformance tests and benchmarks.
//!
//! [`CORPUS`] pairs small WAT modules with the verdict any conforming
//! validator must reach. The modules stay within proposals that are on by
//! default everywhere, so the verdict does not depend on feature flags.

use anyhow::{Context, Result};
use std::fmt::Write;
use wasmir::{validate, Config, Features};

/// A module and whether it is valid.
#[derive(Debug, Clone, Copy)]
pub struct Case {
    pub name: &'static str,
    pub wat: &'static str,
    pub valid: bool,
}

const fn valid(name: &'static str, wat: &'static str) -> Case {
    Case {
        name,
        wat,
        valid: true,
    }
}

const fn invalid(name: &'static str, wat: &'static str) -> Case {
    Case {
        name,
        wat,
        valid: false,
    }
}

pub const CORPUS: &[Case] = &[
    valid("empty", "(module)"),
    valid(
        "add",
        r#"(module (func (export "add") (param i32 i32) (result i32)
             local.get 0 local.get 1 i32.add))"#,
    ),
    valid(
        "countdown",
        r#"(module (func (param $n i32) (result i32)
             (block $done
               (loop $top
                 (br_if $done (i32.eqz (local.get $n)))
                 (local.set $n (i32.sub (local.get $n) (i32.const 1)))
                 (br $top)))
             local.get $n))"#,
    ),
    valid(
        "memory",
        r#"(module (memory 1 2)
             (func (param i32) (result i64)
               (i64.store offset=8 align=8 (local.get 0) (i64.const 42))
               (i64.load offset=8 (local.get 0)))
             (data (i32.const 16) "hello"))"#,
    ),
    valid(
        "indirect",
        r#"(module
             (type $t (func (result i32)))
             (table 2 funcref)
             (func $a (type $t) i32.const 1)
             (func $b (type $t) i32.const 2)
             (elem (i32.const 0) $a $b)
             (func (param i32) (result i32)
               (call_indirect (type $t) (local.get 0))))"#,
    ),
    valid(
        "multi-value",
        r#"(module (func (result i32)
             (block (result i32 i32) (i32.const 1) (i32.const 2))
             i32.add))"#,
    ),
    valid(
        "globals",
        r#"(module
             (global $g (mut i64) (i64.const 0))
             (func (export "bump")
               (global.set $g (i64.add (global.get $g) (i64.const 1)))))"#,
    ),
    valid(
        "declared-ref-func",
        r#"(module
             (func $f)
             (elem declare func $f)
             (func (result funcref) ref.func $f))"#,
    ),
    valid(
        "bulk-memory",
        r#"(module (memory 1)
             (data $d "abc")
             (func
               (memory.init $d (i32.const 0) (i32.const 0) (i32.const 3))
               (data.drop $d)
               (memory.fill (i32.const 0) (i32.const 0) (i32.const 8))
               (memory.copy (i32.const 8) (i32.const 0) (i32.const 8))))"#,
    ),
    valid(
        "simd-lanes",
        r#"(module (func (result i32)
             (i32x4.extract_lane 3 (i32x4.splat (i32.const 7)))))"#,
    ),
    valid(
        "unreachable-tail",
        r#"(module (func (result i32) unreachable i64.add drop))"#,
    ),
    invalid("result-mismatch", "(module (func (result i32) i64.const 0))"),
    invalid("missing-result", "(module (func (result i32)))"),
    invalid("undefined-call", "(module (func call 5))"),
    invalid("branch-out-of-range", "(module (func (block (br 3))))"),
    invalid(
        "duplicate-export",
        r#"(module (func (export "f")) (func (export "f")))"#,
    ),
    invalid(
        "over-aligned-load",
        "(module (memory 1) (func (drop (i32.load align=8 (i32.const 0)))))",
    ),
    invalid(
        "immutable-global-set",
        "(module (global i32 (i32.const 0)) (func (global.set 0 (i32.const 1))))",
    ),
    invalid(
        "start-with-params",
        "(module (func $s (param i32)) (start $s))",
    ),
    invalid(
        "undeclared-ref-func",
        "(module (func $f) (func (result funcref) ref.func $f))",
    ),
    invalid("local-out-of-range", "(module (func (drop (local.get 3))))"),
    invalid(
        "select-mismatch",
        "(module (func (drop (select (i32.const 0) (i64.const 0) (i32.const 1)))))",
    ),
    invalid(
        "load-without-memory",
        "(module (func (drop (i32.load (i32.const 0)))))",
    ),
    invalid(
        "if-without-else-result",
        "(module (func (result i32) (if (result i32) (i32.const 1) (then (i32.const 1)))))",
    ),
    invalid("global-init-type", "(module (global i64 (i32.const 0)))"),
    invalid(
        "lane-out-of-range",
        "(module (func (drop (i32x4.extract_lane 4 (v128.const i32x4 0 0 0 0)))))",
    ),
];

/// Assembles a corpus entry.
pub fn assemble(case: &Case) -> Result<Vec<u8>> {
    wat::parse_str(case.wat).with_context(|| format!("failed to assemble {}", case.name))
}

/// Whether wasmir accepts `bytes` with every proposal enabled.
pub fn wasmir_accepts(bytes: &[u8]) -> bool {
    let mut config = Config::default();
    config.read.features = Features::all();
    validate(bytes, &config).is_ok()
}

/// A module with `funcs` functions of arithmetic loops, for throughput
/// measurements.
pub fn generated_module(funcs: usize) -> Result<Vec<u8>> {
    let mut wat = String::from("(module\n  (memory 1)\n");
    for i in 0..funcs {
        writeln!(
            wat,
            r#"  (func $f{i} (export "f{i}") (param $n i32) (result i32) (local $acc i32)
    (block $done
      (loop $top
        (br_if $done (i32.eqz (local.get $n)))
        (local.set $acc (i32.add (local.get $acc) (i32.mul (local.get $n) (i32.const {i}))))
        (i32.store (i32.const 0) (local.get $acc))
        (local.set $n (i32.sub (local.get $n) (i32.const 1)))
        (br $top)))
    (i32.add (local.get $acc) (i32.load (i32.const 0))))"#
        )?;
    }
    wat.push(')');
    wat::parse_str(&wat).context("failed to assemble generated module")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_names_are_unique() {
        let mut names: Vec<_> = CORPUS.iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CORPUS.len());
    }

    #[test]
    fn generated_module_is_valid() {
        let bytes = generated_module(4).unwrap();
        assert!(wasmir_accepts(&bytes));
    }
}
