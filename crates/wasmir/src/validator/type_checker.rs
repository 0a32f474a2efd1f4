//! Abstract operand stack that proves instruction sequences well-typed.
//!
//! The checker simulates the stack effect of every instruction over types
//! instead of values. Each open block, function body or constant expression
//! is a [`Label`] that remembers its signature and the stack height at entry.
//! Values below that height belong to enclosing blocks and cannot be popped.
//!
//! After an unconditional control transfer (`unreachable`, `br`, `return`,
//! `throw`, ...) the current label is marked unreachable: the stack is cut
//! back to the label's height and popping below it yields values of unknown
//! type that match anything. The matching `end` still enforces arity.

use crate::types::{CompositeType, FieldType, FuncType, HeapType, RefType, SubType, Type, TypeList};
use std::fmt;
use thiserror::Error;

/// A typing failure, positioned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TypeError(pub String);

impl TypeError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type CheckResult<T = ()> = Result<T, TypeError>;

/// Kind of an open label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Func,
    InitExpr,
    Block,
    Loop,
    If,
    Else,
    Try,
    Catch,
    CatchAll,
    TryTable,
}

impl LabelKind {
    /// What a stack mismatch at the end of this label is reported as.
    fn end_description(self) -> &'static str {
        match self {
            LabelKind::Func => "implicit return",
            LabelKind::InitExpr => "initializer expression",
            LabelKind::Block => "block",
            LabelKind::Loop => "loop",
            LabelKind::If => "if true branch",
            LabelKind::Else => "if false branch",
            LabelKind::Try => "try",
            LabelKind::Catch | LabelKind::CatchAll => "try catch",
            LabelKind::TryTable => "try_table",
        }
    }
}

#[derive(Debug, Clone)]
struct Label {
    kind: LabelKind,
    params: Vec<Type>,
    results: Vec<Type>,
    /// Operand stack height when the label was entered.
    height: usize,
    unreachable: bool,
}

impl Label {
    /// Branching to a loop re-enters it; every other label is left.
    fn branch_types(&self) -> &[Type] {
        if self.kind == LabelKind::Loop {
            &self.params
        } else {
            &self.results
        }
    }
}

/// Operand types as shown in diagnostics. `None` is a value of unknown
/// type produced in unreachable code.
struct Operands<'a> {
    values: &'a [Option<Type>],
    polymorphic: bool,
}

impl fmt::Display for Operands<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        if self.polymorphic {
            f.write_str("...")?;
            if !self.values.is_empty() {
                f.write_str(", ")?;
            }
        }
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                Some(ty) => write!(f, "{ty}")?,
                None => f.write_str("any")?,
            }
        }
        f.write_str("]")
    }
}

/// The type checker. Owns the module's type list for subtyping queries.
#[derive(Debug, Default)]
pub struct TypeChecker {
    types: Vec<SubType>,
    stack: Vec<Option<Type>>,
    labels: Vec<Label>,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- types and subtyping ----

    pub fn push_type(&mut self, ty: SubType) {
        self.types.push(ty);
    }

    pub fn types(&self) -> &[SubType] {
        &self.types
    }

    pub fn sub_type(&self, index: u32) -> Option<&SubType> {
        self.types.get(index as usize)
    }

    pub fn composite(&self, index: u32) -> Option<&CompositeType> {
        self.sub_type(index).map(|ty| &ty.composite)
    }

    pub fn func_type(&self, index: u32) -> Option<&FuncType> {
        self.composite(index).and_then(CompositeType::as_func)
    }

    pub fn struct_fields(&self, index: u32) -> Option<&[FieldType]> {
        match self.composite(index)? {
            CompositeType::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn array_field(&self, index: u32) -> Option<FieldType> {
        match self.composite(index)? {
            CompositeType::Array(field) => Some(*field),
            _ => None,
        }
    }

    pub fn is_subtype(&self, sub: Type, sup: Type) -> bool {
        match (sub, sup) {
            (Type::Ref(sub), Type::Ref(sup)) => self.is_ref_subtype(sub, sup),
            _ => sub == sup,
        }
    }

    pub fn is_ref_subtype(&self, sub: RefType, sup: RefType) -> bool {
        (sup.nullable || !sub.nullable) && self.is_heap_subtype(sub.heap, sup.heap)
    }

    pub fn is_heap_subtype(&self, sub: HeapType, sup: HeapType) -> bool {
        if sub == sup {
            return true;
        }
        match (sub, sup) {
            (HeapType::Index(sub), HeapType::Index(sup)) => self.is_index_subtype(sub, sup),
            (HeapType::Index(index), abstract_heap) => match self.composite(index) {
                Some(composite) => self.is_heap_subtype(composite.abstract_heap(), abstract_heap),
                None => false,
            },
            (HeapType::None, sup) => self.top_heap(sup) == HeapType::Any,
            (HeapType::NoFunc, sup) => self.top_heap(sup) == HeapType::Func,
            (HeapType::NoExtern, sup) => self.top_heap(sup) == HeapType::Extern,
            (HeapType::NoExn, sup) => self.top_heap(sup) == HeapType::Exn,
            (HeapType::I31 | HeapType::Struct | HeapType::Array, HeapType::Eq | HeapType::Any) => {
                true
            }
            (HeapType::Eq, HeapType::Any) => true,
            _ => false,
        }
    }

    /// Follows the declared supertype chain of `sub`.
    fn is_index_subtype(&self, sub: u32, sup: u32) -> bool {
        let mut current = sub;
        // A chain can never be longer than the type list.
        for _ in 0..=self.types.len() {
            if current == sup {
                return true;
            }
            match self.sub_type(current).and_then(|ty| ty.supertype) {
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }

    /// The top of the hierarchy `heap` belongs to.
    pub fn top_heap(&self, heap: HeapType) -> HeapType {
        match heap {
            HeapType::Func | HeapType::NoFunc => HeapType::Func,
            HeapType::Extern | HeapType::NoExtern => HeapType::Extern,
            HeapType::Exn | HeapType::NoExn => HeapType::Exn,
            HeapType::Index(index) => match self.composite(index) {
                Some(CompositeType::Func(_)) => HeapType::Func,
                _ => HeapType::Any,
            },
            HeapType::Any
            | HeapType::Eq
            | HeapType::I31
            | HeapType::Struct
            | HeapType::Array
            | HeapType::None => HeapType::Any,
        }
    }

    // ---- operand stack ----

    /// Current label depth; zero outside of any body.
    pub fn depth(&self) -> usize {
        self.labels.len()
    }

    /// The operand stack, bottom first.
    pub fn stack(&self) -> &[Option<Type>] {
        &self.stack
    }

    pub fn is_unreachable(&self) -> bool {
        self.labels.last().is_some_and(|label| label.unreachable)
    }

    fn label(&self) -> CheckResult<&Label> {
        self.labels
            .last()
            .ok_or_else(|| TypeError::new("accessing empty label stack"))
    }

    /// Values the current label may pop.
    fn available(&self) -> usize {
        let height = self.labels.last().map_or(0, |label| label.height);
        self.stack.len().saturating_sub(height)
    }

    pub fn push(&mut self, ty: Type) {
        self.stack.push(Some(ty));
    }

    pub fn push_types(&mut self, types: &[Type]) {
        self.stack.extend(types.iter().copied().map(Some));
    }

    fn drop_values(&mut self, count: usize) {
        let count = count.min(self.available());
        self.stack.truncate(self.stack.len() - count);
    }

    fn mismatch(&self, desc: &str, expected: &[Type], shown: usize) -> TypeError {
        let shown = shown.min(self.available());
        let values = &self.stack[self.stack.len() - shown..];
        TypeError(format!(
            "type mismatch in {desc}, expected {} but got {}",
            TypeList(expected),
            Operands {
                values,
                polymorphic: self.is_unreachable() && shown < expected.len(),
            }
        ))
    }

    /// Checks that the top of the stack matches `expected` without popping.
    pub fn peek_and_check(&self, expected: &[Type], desc: &str) -> CheckResult {
        let label = self.label()?;
        let available = self.available();
        let taken = expected.len().min(available);
        let mut ok = taken == expected.len() || label.unreachable;
        let actual = &self.stack[self.stack.len() - taken..];
        for (&want, have) in expected[expected.len() - taken..].iter().zip(actual) {
            if let Some(have) = *have {
                ok &= self.is_subtype(have, want);
            }
        }
        if ok {
            Ok(())
        } else {
            Err(self.mismatch(desc, expected, expected.len()))
        }
    }

    /// Pops `expected`, last first. The values are popped even on mismatch.
    pub fn pop_and_check(&mut self, expected: &[Type], desc: &str) -> CheckResult {
        let result = self.peek_and_check(expected, desc);
        self.drop_values(expected.len());
        result
    }

    /// Pops one value of any type. `None` is a value of unknown type.
    pub fn pop_any(&mut self, desc: &str) -> CheckResult<Option<Type>> {
        let label = self.label()?;
        if self.available() == 0 {
            if label.unreachable {
                return Ok(None);
            }
            return Err(TypeError(format!(
                "type mismatch in {desc}, expected [any] but got []"
            )));
        }
        Ok(self.stack.pop().flatten())
    }

    /// Pops one reference of any heap type.
    pub fn pop_ref(&mut self, desc: &str) -> CheckResult<Option<RefType>> {
        match self.pop_any(desc)? {
            None => Ok(None),
            Some(Type::Ref(rt)) => Ok(Some(rt)),
            Some(other) => Err(TypeError(format!(
                "type mismatch in {desc}, expected [ref] but got [{other}]"
            ))),
        }
    }

    /// Pops `params` and pushes `results`. The results are pushed even when
    /// the operands mismatch, so checking can continue.
    pub fn check_signature(&mut self, params: &[Type], results: &[Type], desc: &str) -> CheckResult {
        let result = self.pop_and_check(params, desc);
        self.push_types(results);
        result
    }

    /// Requires the stack to hold exactly `expected` above the label height.
    fn check_exact(&self, expected: &[Type], desc: &str) -> CheckResult {
        let available = self.available();
        if available > expected.len() {
            return Err(self.mismatch(desc, expected, available));
        }
        self.peek_and_check(expected, desc)
    }

    fn set_unreachable(&mut self) {
        if let Some(label) = self.labels.last_mut() {
            label.unreachable = true;
            let height = label.height;
            self.stack.truncate(height);
        }
    }

    // ---- labels ----

    fn reset(&mut self) {
        self.stack.clear();
        self.labels.clear();
    }

    fn push_label(&mut self, kind: LabelKind, sig: &FuncType) {
        self.labels.push(Label {
            kind,
            params: sig.params.clone(),
            results: sig.results.clone(),
            height: self.stack.len(),
            unreachable: false,
        });
        self.push_types(&sig.params);
    }

    /// Starts a function body whose locals are already known.
    pub fn begin_function(&mut self, results: &[Type]) {
        self.reset();
        self.push_label(LabelKind::Func, &FuncType::new(Vec::new(), results.to_vec()));
    }

    /// Starts a constant expression producing one `ty`.
    pub fn begin_init_expr(&mut self, ty: Type) {
        self.reset();
        self.push_label(LabelKind::InitExpr, &FuncType::new(Vec::new(), vec![ty]));
    }

    /// Drops any state left by an abandoned body.
    pub fn clear(&mut self) {
        self.reset();
    }

    fn begin_block(&mut self, kind: LabelKind, sig: &FuncType, desc: &str) -> CheckResult {
        let result = self.pop_and_check(&sig.params, desc);
        self.push_label(kind, sig);
        result
    }

    pub fn on_block(&mut self, sig: &FuncType) -> CheckResult {
        self.begin_block(LabelKind::Block, sig, "block")
    }

    pub fn on_loop(&mut self, sig: &FuncType) -> CheckResult {
        self.begin_block(LabelKind::Loop, sig, "loop")
    }

    pub fn on_if(&mut self, sig: &FuncType) -> CheckResult {
        let condition = self.pop_and_check(&[Type::I32], "if");
        condition.and(self.begin_block(LabelKind::If, sig, "if"))
    }

    pub fn on_try(&mut self, sig: &FuncType) -> CheckResult {
        self.begin_block(LabelKind::Try, sig, "try")
    }

    /// Opens a `try_table`. Catch targets are checked beforehand with
    /// [`TypeChecker::check_catch_target`], relative to the enclosing labels.
    pub fn on_try_table(&mut self, sig: &FuncType) -> CheckResult {
        self.begin_block(LabelKind::TryTable, sig, "try_table")
    }

    /// Closes the current arm and reopens the label with its parameters.
    fn switch_arm(&mut self, kind: LabelKind, pushed: &[Type]) -> CheckResult {
        let label = self.label()?;
        let result = self.check_exact(&label.results, label.kind.end_description());
        if let Some(label) = self.labels.last_mut() {
            label.kind = kind;
            label.unreachable = false;
            let height = label.height;
            self.stack.truncate(height);
        }
        self.push_types(pushed);
        result
    }

    pub fn on_else(&mut self) -> CheckResult {
        let label = self.label()?;
        if label.kind != LabelKind::If {
            return Err(TypeError::new("else without matching if"));
        }
        let params = label.params.clone();
        self.switch_arm(LabelKind::Else, &params)
    }

    /// Starts a `catch` arm; `tag_params` are the caught values.
    pub fn on_catch(&mut self, tag_params: &[Type]) -> CheckResult {
        match self.label()?.kind {
            LabelKind::Try | LabelKind::Catch => self.switch_arm(LabelKind::Catch, tag_params),
            LabelKind::CatchAll => Err(TypeError::new("catch after catch_all")),
            _ => Err(TypeError::new("catch without matching try")),
        }
    }

    pub fn on_catch_all(&mut self) -> CheckResult {
        match self.label()?.kind {
            LabelKind::Try | LabelKind::Catch => self.switch_arm(LabelKind::CatchAll, &[]),
            LabelKind::CatchAll => Err(TypeError::new("catch_all after catch_all")),
            _ => Err(TypeError::new("catch_all without matching try")),
        }
    }

    fn pop_label(&mut self) -> CheckResult<Label> {
        let label = self
            .labels
            .pop()
            .ok_or_else(|| TypeError::new("popping empty label stack"))?;
        self.stack.truncate(label.height);
        self.push_types(&label.results);
        Ok(label)
    }

    /// Closes a `try` by delegating to the label `depth` levels outside it.
    pub fn on_delegate(&mut self, depth: u32) -> CheckResult {
        let label = self.label()?;
        if label.kind != LabelKind::Try {
            return Err(TypeError::new("delegate without matching try"));
        }
        let arity = self.check_exact(&label.results, "try");
        let outer = self.labels.len() - 1;
        let target = if (depth as usize) < outer {
            Ok(())
        } else {
            Err(TypeError(format!(
                "label variable out of range: {depth} (max {outer})"
            )))
        };
        self.pop_label()?;
        arity.and(target)
    }

    /// Closes the current label and pushes its results.
    pub fn on_end(&mut self) -> CheckResult {
        let label = self.label()?;
        let mut result = self.check_exact(&label.results, label.kind.end_description());
        if label.kind == LabelKind::If && label.params != label.results {
            result = result.and(Err(TypeError(format!(
                "type mismatch in if false branch, expected {} but got {}",
                TypeList(&label.results),
                TypeList(&label.params)
            ))));
        }
        self.pop_label()?;
        result
    }

    // ---- branches ----

    fn target(&self, depth: u32) -> CheckResult<&Label> {
        let len = self.labels.len();
        (depth as usize)
            .checked_add(1)
            .and_then(|d| len.checked_sub(d))
            .and_then(|i| self.labels.get(i))
            .ok_or_else(|| {
                TypeError(format!(
                    "label variable out of range: {depth} (max {len})"
                ))
            })
    }

    /// Types a branch to the label `depth` levels out must carry.
    pub fn branch_types(&self, depth: u32) -> CheckResult<Vec<Type>> {
        self.target(depth).map(|label| label.branch_types().to_vec())
    }

    pub fn on_br(&mut self, depth: u32) -> CheckResult {
        let result = self
            .branch_types(depth)
            .and_then(|types| self.peek_and_check(&types, "br"));
        self.set_unreachable();
        result
    }

    pub fn on_br_if(&mut self, depth: u32) -> CheckResult {
        self.pop_and_check(&[Type::I32], "br_if")?;
        let types = self.branch_types(depth)?;
        let result = self.pop_and_check(&types, "br_if");
        self.push_types(&types);
        result
    }

    pub fn on_br_table(&mut self, targets: &[u32], default: u32) -> CheckResult {
        let result = self.check_br_table(targets, default);
        self.set_unreachable();
        result
    }

    fn check_br_table(&mut self, targets: &[u32], default: u32) -> CheckResult {
        self.pop_and_check(&[Type::I32], "br_table")?;
        let arity = self.branch_types(default)?.len();
        for &depth in targets.iter().chain(std::iter::once(&default)) {
            let types = self.branch_types(depth)?;
            if types.len() != arity {
                return Err(TypeError(format!(
                    "br_table labels have inconsistent types: expected arity {arity}, got {}",
                    types.len()
                )));
            }
            self.peek_and_check(&types, "br_table")?;
        }
        Ok(())
    }

    fn function_results(&self) -> CheckResult<Vec<Type>> {
        self.labels
            .first()
            .map(|label| label.results.clone())
            .ok_or_else(|| TypeError::new("accessing empty label stack"))
    }

    pub fn on_return(&mut self) -> CheckResult {
        let result = self
            .function_results()
            .and_then(|results| self.peek_and_check(&results, "return"));
        self.set_unreachable();
        result
    }

    pub fn on_unreachable(&mut self) -> CheckResult {
        self.set_unreachable();
        Ok(())
    }

    /// `br_on_null`: branches with the remaining operands when the
    /// reference is null, otherwise leaves it non-null on the stack.
    pub fn on_br_on_null(&mut self, depth: u32) -> CheckResult {
        let rt = self.pop_ref("br_on_null")?;
        let types = self.branch_types(depth)?;
        let result = self.pop_and_check(&types, "br_on_null");
        self.push_types(&types);
        self.push_ref(rt.map(RefType::as_non_null));
        result
    }

    /// `br_on_non_null`: branches with the non-null reference on top.
    pub fn on_br_on_non_null(&mut self, depth: u32) -> CheckResult {
        let rt = self.pop_ref("br_on_non_null")?;
        let types = self.branch_types(depth)?;
        let Some((&last, rest)) = types.split_last() else {
            return Err(TypeError::new(
                "type mismatch in br_on_non_null, target label has no reference result",
            ));
        };
        let mut result = self.pop_and_check(rest, "br_on_non_null");
        if let Some(rt) = rt {
            if !self.is_subtype(Type::Ref(rt.as_non_null()), last) {
                result = result.and(Err(TypeError(format!(
                    "type mismatch in br_on_non_null, expected {last} but got {}",
                    rt.as_non_null()
                ))));
            }
        }
        self.push_types(rest);
        result
    }

    /// `br_on_cast` and `br_on_cast_fail`. The branch carries `to` (or the
    /// source minus `to` when `on_fail`); the other type falls through.
    pub fn on_br_on_cast(
        &mut self,
        on_fail: bool,
        depth: u32,
        from: RefType,
        to: RefType,
    ) -> CheckResult {
        let desc = if on_fail { "br_on_cast_fail" } else { "br_on_cast" };
        if !self.is_ref_subtype(to, from) {
            return Err(TypeError(format!(
                "type mismatch in {desc}, {to} is not a subtype of {from}"
            )));
        }
        self.pop_and_check(&[Type::Ref(from)], desc)?;
        let difference = RefType {
            nullable: from.nullable && !to.nullable,
            heap: from.heap,
        };
        let (branch, fallthrough) = if on_fail {
            (difference, to)
        } else {
            (to, difference)
        };
        let types = self.branch_types(depth)?;
        let Some((&last, rest)) = types.split_last() else {
            return Err(TypeError(format!(
                "type mismatch in {desc}, target label has no reference result"
            )));
        };
        let mut result = self.pop_and_check(rest, desc);
        if !self.is_subtype(Type::Ref(branch), last) {
            result = result.and(Err(TypeError(format!(
                "type mismatch in {desc}, expected {last} but got {branch}"
            ))));
        }
        self.push_types(rest);
        self.push(Type::Ref(fallthrough));
        result
    }

    /// Checks that a `try_table` catch may deliver `types` to the label
    /// `depth` levels outside the `try_table`.
    pub fn check_catch_target(&self, depth: u32, types: &[Type], desc: &str) -> CheckResult {
        let expected = self.branch_types(depth)?;
        let matches = expected.len() == types.len()
            && types
                .iter()
                .zip(&expected)
                .all(|(&have, &want)| self.is_subtype(have, want));
        if matches {
            Ok(())
        } else {
            Err(TypeError(format!(
                "type mismatch in {desc}, expected {} but got {}",
                TypeList(&expected),
                TypeList(types)
            )))
        }
    }

    // ---- calls and exceptions ----

    pub fn on_call(&mut self, sig: &FuncType, desc: &str) -> CheckResult {
        self.check_signature(&sig.params, &sig.results, desc)
    }

    /// A tail call: the callee's results become the caller's results.
    pub fn on_return_call(&mut self, sig: &FuncType, desc: &str) -> CheckResult {
        let mut result = self.pop_and_check(&sig.params, desc);
        let caller = self.function_results()?;
        let compatible = caller.len() == sig.results.len()
            && sig
                .results
                .iter()
                .zip(&caller)
                .all(|(&have, &want)| self.is_subtype(have, want));
        if !compatible {
            result = result.and(Err(TypeError(format!(
                "type mismatch in {desc}, expected {} but got {}",
                TypeList(&caller),
                TypeList(&sig.results)
            ))));
        }
        self.set_unreachable();
        result
    }

    pub fn on_throw(&mut self, params: &[Type]) -> CheckResult {
        let result = self.pop_and_check(params, "throw");
        self.set_unreachable();
        result
    }

    pub fn on_throw_ref(&mut self) -> CheckResult {
        let result = self.pop_and_check(&[Type::EXNREF], "throw_ref");
        self.set_unreachable();
        result
    }

    pub fn on_rethrow(&mut self, depth: u32) -> CheckResult {
        let result = match self.target(depth)?.kind {
            LabelKind::Catch | LabelKind::CatchAll => Ok(()),
            _ => Err(TypeError::new("invalid rethrow label")),
        };
        self.set_unreachable();
        result
    }

    // ---- parametric and reference instructions ----

    pub fn on_drop(&mut self) -> CheckResult {
        self.pop_any("drop").map(drop)
    }

    /// `select` with an optional explicit result type. Without one, both
    /// operands must be the same numeric or vector type.
    pub fn on_select(&mut self, ty: Option<Type>) -> CheckResult {
        self.pop_and_check(&[Type::I32], "select")?;
        if let Some(ty) = ty {
            return self.check_signature(&[ty, ty], &[ty], "select");
        }
        let second = self.pop_any("select")?;
        let first = self.pop_any("select")?;
        let result = match (first, second) {
            (Some(a), Some(b)) if a != b => Err(TypeError(format!(
                "type mismatch in select, expected [{a}, {a}] but got [{a}, {b}]"
            ))),
            (Some(ty), _) | (_, Some(ty)) if ty.is_ref() => Err(TypeError::new(
                "type mismatch in select, untyped select requires numeric or vector operands",
            )),
            _ => Ok(()),
        };
        self.stack.push(first.or(second));
        result
    }

    fn push_ref(&mut self, rt: Option<RefType>) {
        self.stack.push(rt.map(Type::Ref));
    }

    pub fn on_ref_is_null(&mut self) -> CheckResult {
        let result = self.pop_ref("ref.is_null").map(drop);
        self.push(Type::I32);
        result
    }

    pub fn on_ref_as_non_null(&mut self) -> CheckResult {
        let rt = self.pop_ref("ref.as_non_null")?;
        self.push_ref(rt.map(RefType::as_non_null));
        Ok(())
    }

    /// Converts between the `any` and `extern` hierarchies, keeping
    /// nullability.
    pub fn on_convert_ref(&mut self, from: HeapType, to: HeapType, desc: &str) -> CheckResult {
        let rt = self.pop_ref(desc)?;
        let mut result = Ok(());
        if let Some(rt) = rt {
            if !self.is_heap_subtype(rt.heap, from) {
                result = Err(TypeError(format!(
                    "type mismatch in {desc}, expected [{}] but got [{rt}]",
                    RefType::nullable(from)
                )));
            }
        }
        let nullable = rt.map_or(true, |rt| rt.nullable);
        self.push(Type::Ref(RefType { nullable, heap: to }));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;

    fn simple(checker: &mut TypeChecker, op: Opcode) -> CheckResult {
        let results: Vec<_> = op.result_type().into_iter().collect();
        checker.check_signature(&op.param_types(), &results, op.name())
    }

    fn sig(params: &[Type], results: &[Type]) -> FuncType {
        FuncType::new(params.to_vec(), results.to_vec())
    }

    #[test]
    fn mismatch_reports_expected_and_actual() {
        let mut checker = TypeChecker::new();
        checker.begin_function(&[]);
        checker.push(Type::I32);
        let err = simple(&mut checker, Opcode::I64Add).unwrap_err();
        assert_eq!(
            err.to_string(),
            "type mismatch in i64.add, expected [i64, i64] but got [i32]"
        );
    }

    #[test]
    fn well_typed_sequence_leaves_one_value() {
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
    fn unreachable_code_is_polymorphic_but_end_keeps_arity() {
        let mut checker = TypeChecker::new();
        checker.begin_function(&[Type::I32]);
        checker.on_unreachable().unwrap();
        simple(&mut checker, Opcode::I64Add).unwrap();
        checker.on_drop().unwrap();
        checker.on_drop().unwrap();
        // Too many values at `end` is still an error.
        checker.push(Type::I32);
        checker.push(Type::I32);
        let err = checker.on_end().unwrap_err();
        assert!(err.0.starts_with("type mismatch in implicit return"), "{err}");
    }

    #[test]
    fn unreachable_fills_in_missing_results() {
        let mut checker = TypeChecker::new();
        checker.begin_function(&[Type::I32, Type::I64]);
        checker.on_unreachable().unwrap();
        checker.push(Type::I64);
        checker.on_end().unwrap();
    }

    #[test]
    fn branch_depth_out_of_range() {
        let mut checker = TypeChecker::new();
        checker.begin_function(&[]);
        checker.on_block(&sig(&[], &[])).unwrap();
        checker.on_br(1).unwrap();
        let err = checker.on_br(2).unwrap_err();
        assert!(err.0.starts_with("label variable out of range"), "{err}");
    }

    #[test]
    fn loop_branches_carry_params() {
        let mut checker = TypeChecker::new();
        checker.begin_function(&[Type::F32]);
        checker.push(Type::I64);
        checker.on_loop(&sig(&[Type::I64], &[Type::F32])).unwrap();
        // The loop's params are on its stack; branching back needs an i64.
        checker.on_br(0).unwrap();
        checker.on_end().unwrap();
        assert_eq!(checker.stack(), &[Some(Type::F32)]);
    }

    #[test]
    fn end_checks_arity_exactly() {
        let mut checker = TypeChecker::new();
        checker.begin_function(&[Type::I32]);
        let err = checker.on_end().unwrap_err();
        assert_eq!(
            err.to_string(),
            "type mismatch in implicit return, expected [i32] but got []"
        );
    }

    #[test]
    fn if_without_else_must_not_change_types() {
        let mut checker = TypeChecker::new();
        checker.begin_function(&[]);
        checker.push(Type::I32);
        checker.on_if(&sig(&[], &[Type::I32])).unwrap();
        checker.push(Type::I32);
        let err = checker.on_end().unwrap_err();
        assert!(err.0.contains("if false branch"), "{err}");
    }

    #[test]
    fn else_restores_params() {
        let mut checker = TypeChecker::new();
        checker.begin_function(&[]);
        checker.push(Type::I64);
        checker.push(Type::I32);
        checker.on_if(&sig(&[Type::I64], &[Type::I64])).unwrap();
        checker.on_else().unwrap();
        assert_eq!(checker.stack(), &[Some(Type::I64)]);
        checker.on_end().unwrap();
        checker.on_drop().unwrap();
        checker.on_end().unwrap();
    }

    #[test]
    fn br_table_targets_must_agree() {
        let mut checker = TypeChecker::new();
        checker.begin_function(&[]);
        checker.on_block(&sig(&[], &[Type::I32])).unwrap();
        checker.on_block(&sig(&[], &[])).unwrap();
        checker.push(Type::I32);
        checker.push(Type::I32);
        let err = checker.on_br_table(&[1], 0).unwrap_err();
        assert!(err.0.contains("inconsistent"), "{err}");
    }

    #[test]
    fn untyped_select_rejects_mixed_operands() {
        let mut checker = TypeChecker::new();
        checker.begin_function(&[]);
        checker.push(Type::I32);
        checker.push(Type::F32);
        checker.push(Type::I32);
        assert!(checker.on_select(None).is_err());
    }

    #[test]
    fn reference_subtyping() {
        let mut checker = TypeChecker::new();
        checker.push_type(SubType {
            is_final: false,
            supertype: None,
            composite: CompositeType::Struct(vec![]),
        });
        checker.push_type(SubType {
            is_final: true,
            supertype: Some(0),
            composite: CompositeType::Struct(vec![]),
        });
        checker.push_type(SubType::plain(CompositeType::Func(FuncType::default())));

        let r = |nullable, heap| Type::Ref(RefType { nullable, heap });
        assert!(checker.is_subtype(r(false, HeapType::Func), Type::FUNCREF));
        assert!(!checker.is_subtype(Type::FUNCREF, r(false, HeapType::Func)));
        assert!(checker.is_subtype(r(true, HeapType::Index(1)), r(true, HeapType::Index(0))));
        assert!(checker.is_subtype(r(true, HeapType::Index(1)), r(true, HeapType::Eq)));
        assert!(checker.is_subtype(r(true, HeapType::Index(2)), Type::FUNCREF));
        assert!(checker.is_subtype(r(true, HeapType::NoFunc), r(true, HeapType::Index(2))));
        assert!(checker.is_subtype(r(true, HeapType::None), r(true, HeapType::Index(0))));
        assert!(!checker.is_subtype(r(true, HeapType::None), Type::FUNCREF));
        assert!(checker.is_subtype(r(true, HeapType::I31), r(true, HeapType::Any)));
        assert!(!checker.is_subtype(Type::EXTERNREF, r(true, HeapType::Any)));
        assert!(!checker.is_subtype(Type::I32, Type::I64));
    }

    #[test]
    fn try_catch_arms_reset_the_stack() {
        let mut checker = TypeChecker::new();
        checker.begin_function(&[]);
        checker.on_try(&sig(&[], &[Type::I32])).unwrap();
        checker.push(Type::I32);
        checker.on_catch(&[Type::I32]).unwrap();
        assert_eq!(checker.stack(), &[Some(Type::I32)]);
        checker.on_catch_all().unwrap();
        assert!(checker.on_catch(&[]).is_err());
        checker.on_rethrow(0).unwrap();
        checker.on_end().unwrap();
    }

    #[test]
    fn return_call_requires_matching_results() {
        let mut checker = TypeChecker::new();
        checker.begin_function(&[Type::I32]);
        let err = checker
            .on_return_call(&sig(&[], &[Type::I64]), "return_call")
            .unwrap_err();
        assert!(err.0.contains("expected [i32] but got [i64]"), "{err}");
        assert!(checker.is_unreachable());
    }
}
