//! Validation of a module already in IR form.
//!
//! The walk visits declarations in the order the binary format lays them
//! out so that index spaces fill up exactly as they do when validating
//! while reading.

use super::shared::SharedValidator;
use super::ValidateOptions;
use crate::binary::{InitExprTarget, SegmentMode};
use crate::error::{Error, Errors};
use crate::ir::{DataMode, ElemMode, Expr, ExprList, ImportItem, Module, TryKind, Var};

/// Validates `module`, returning every error found sorted by offset.
///
/// With `stop_on_first_error` the walk ends at the first error.
pub fn validate_module(module: &Module, options: &ValidateOptions) -> Result<(), Errors> {
    let mut walker = Walker {
        module,
        validator: SharedValidator::new(options.features),
        errors: Errors::new(),
        stop_on_first_error: options.stop_on_first_error,
    };
    // A stop has already been recorded in `errors`.
    let _ = walker.walk_module();
    let mut errors = walker.errors;
    if errors.is_empty() {
        return Ok(());
    }
    errors.sort();
    Err(errors)
}

/// The walk was cut short by an error.
struct Stopped;

struct Walker<'m> {
    module: &'m Module,
    validator: SharedValidator,
    errors: Errors,
    stop_on_first_error: bool,
}

impl<'m> Walker<'m> {
    fn report(&mut self, result: Result<(), Error>) -> Result<(), Stopped> {
        match result {
            Ok(()) => Ok(()),
            Err(error) => {
                log::debug!("{error}");
                self.errors.push(error);
                if self.stop_on_first_error {
                    Err(Stopped)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn walk_module(&mut self) -> Result<(), Stopped> {
        let module = self.module;
        self.walk_types()?;
        self.walk_imports()?;

        for func in module.funcs.iter().skip(module.num_func_imports as usize) {
            let result = match func.type_index.as_index() {
                Some(type_index) => self.validator.on_function(func.loc.offset, type_index),
                None => Err(unresolved(&func.type_index)),
            };
            self.report(result)?;
        }
        for table in module.tables.iter().skip(module.num_table_imports as usize) {
            let result = self.validator.on_table(0, table.ty);
            self.report(result)?;
        }
        for memory in module.memories.iter().skip(module.num_memory_imports as usize) {
            let result = self.validator.on_memory(0, memory.ty);
            self.report(result)?;
        }
        for tag in module.tags.iter().skip(module.num_tag_imports as usize) {
            let result = match tag.type_index.as_index() {
                Some(type_index) => self.validator.on_tag(tag.type_index.loc().offset, type_index),
                None => Err(unresolved(&tag.type_index)),
            };
            self.report(result)?;
        }
        let num_global_imports = module.num_global_imports as usize;
        for (index, global) in module.globals.iter().enumerate().skip(num_global_imports) {
            let result = self.validator.on_global(0, global.ty);
            self.report(result)?;
            self.walk_init_expr(InitExprTarget::Global(index as u32), global.init, 0)?;
        }

        for export in &module.exports {
            let offset = export.loc.offset;
            let result = match export.var.as_index() {
                Some(index) => self
                    .validator
                    .on_export(offset, &export.name, export.kind, index),
                None => Err(unresolved(&export.var)),
            };
            self.report(result)?;
        }
        for start in &module.starts {
            let result = match start.as_index() {
                Some(index) => self.validator.on_start(start.loc().offset, index),
                None => Err(unresolved(start)),
            };
            self.report(result)?;
        }

        for (index, segment) in module.elem_segments.iter().enumerate() {
            let index = index as u32;
            let offset = segment.loc.offset;
            let (mode, offset_expr) = match &segment.mode {
                ElemMode::Active { table, offset } => match table.as_index() {
                    Some(table) => (SegmentMode::Active(table), Some(*offset)),
                    None => {
                        self.report(Err(unresolved(table)))?;
                        continue;
                    }
                },
                ElemMode::Passive => (SegmentMode::Passive, None),
                ElemMode::Declared => (SegmentMode::Declared, None),
            };
            let result = self.validator.begin_elem_segment(offset, mode);
            self.report(result)?;
            if let Some(list) = offset_expr {
                self.walk_init_expr(InitExprTarget::ElemOffset(index), list, offset)?;
            }
            let result = self
                .validator
                .on_elem_segment_type(offset, index, segment.elem_type);
            self.report(result)?;
            for (elem, list) in segment.elems.iter().enumerate() {
                let target = InitExprTarget::ElemExpr {
                    segment: index,
                    index: elem as u32,
                };
                self.walk_init_expr(target, *list, offset)?;
            }
        }

        if let Some(count) = module.data_count {
            self.validator.on_data_count(count);
        }
        for (index, func) in module
            .funcs
            .iter()
            .enumerate()
            .skip(module.num_func_imports as usize)
        {
            let offset = func.loc.offset;
            let result = self.validator.begin_function_body(offset, index as u32);
            self.report(result)?;
            for &(ty, count) in func.locals.decls() {
                let result = self.validator.on_local_decl(offset, count, ty);
                self.report(result)?;
            }
            self.walk_exprs(func.exprs)?;
            let end = (offset + func.body_size as usize).saturating_sub(1);
            let result = self.validator.on_end(end);
            self.report(result)?;
            self.validator.end_function_body();
        }

        for (index, segment) in module.data_segments.iter().enumerate() {
            let offset = segment.loc.offset;
            let (mode, offset_expr) = match &segment.mode {
                DataMode::Active { memory, offset } => match memory.as_index() {
                    Some(memory) => (SegmentMode::Active(memory), Some(*offset)),
                    None => {
                        self.report(Err(unresolved(memory)))?;
                        continue;
                    }
                },
                DataMode::Passive => (SegmentMode::Passive, None),
            };
            let result = self.validator.begin_data_segment(offset, mode);
            self.report(result)?;
            if let Some(list) = offset_expr {
                self.walk_init_expr(InitExprTarget::DataOffset(index as u32), list, offset)?;
            }
        }
        Ok(())
    }

    fn walk_types(&mut self) -> Result<(), Stopped> {
        let module = self.module;
        let types = &module.types;
        for (index, entry) in types.iter().enumerate() {
            if entry.rec_group as usize == index {
                let count = types[index..]
                    .iter()
                    .take_while(|t| t.rec_group == entry.rec_group)
                    .count();
                self.validator.on_rec_group(entry.rec_group, count as u32);
            }
            let result = self.validator.on_type(0, index as u32, &entry.sub);
            self.report(result)?;
        }
        Ok(())
    }

    fn walk_imports(&mut self) -> Result<(), Stopped> {
        let module = self.module;
        for import in &module.imports {
            let offset = import.loc.offset;
            let result = match import.item {
                ImportItem::Func(index) => {
                    let type_index = &module.funcs[index as usize].type_index;
                    match type_index.as_index() {
                        Some(type_index) => self.validator.on_import_func(offset, type_index),
                        None => Err(unresolved(type_index)),
                    }
                }
                ImportItem::Table(index) => {
                    self.validator.on_table(offset, module.tables[index as usize].ty)
                }
                ImportItem::Memory(index) => {
                    self.validator.on_memory(offset, module.memories[index as usize].ty)
                }
                ImportItem::Global(index) => self
                    .validator
                    .on_import_global(offset, module.globals[index as usize].ty),
                ImportItem::Tag(index) => {
                    let type_index = &module.tags[index as usize].type_index;
                    match type_index.as_index() {
                        Some(type_index) => self.validator.on_tag(offset, type_index),
                        None => Err(unresolved(type_index)),
                    }
                }
            };
            self.report(result)?;
        }
        Ok(())
    }

    /// A constant expression; its `end` is placed after the last
    /// instruction.
    fn walk_init_expr(
        &mut self,
        target: InitExprTarget,
        list: ExprList,
        offset: usize,
    ) -> Result<(), Stopped> {
        let result = self.validator.begin_init_expr(offset, target);
        self.report(result)?;
        self.walk_exprs(list)?;
        let end = self
            .module
            .exprs
            .iter(list)
            .last()
            .map_or(offset, |node| node.loc.offset);
        let result = self.validator.on_end(end);
        self.report(result)?;
        self.validator.end_init_expr();
        Ok(())
    }

    fn walk_exprs(&mut self, list: ExprList) -> Result<(), Stopped> {
        let module = self.module;
        for node in module.exprs.iter(list) {
            let offset = node.loc.offset;
            match &node.expr {
                Expr::Block(block) => {
                    let result = self.validator.on_block(offset, block.ty);
                    self.report(result)?;
                    self.walk_exprs(block.exprs)?;
                    let result = self.validator.on_end(block.end_loc.offset);
                    self.report(result)?;
                }
                Expr::Loop(block) => {
                    let result = self.validator.on_loop(offset, block.ty);
                    self.report(result)?;
                    self.walk_exprs(block.exprs)?;
                    let result = self.validator.on_end(block.end_loc.offset);
                    self.report(result)?;
                }
                Expr::If {
                    block,
                    false_exprs,
                    else_loc,
                } => {
                    let result = self.validator.on_if(offset, block.ty);
                    self.report(result)?;
                    self.walk_exprs(block.exprs)?;
                    if let Some(else_loc) = else_loc {
                        let result = self.validator.on_else(else_loc.offset);
                        self.report(result)?;
                        self.walk_exprs(*false_exprs)?;
                    }
                    let result = self.validator.on_end(block.end_loc.offset);
                    self.report(result)?;
                }
                Expr::Try { block, kind } => {
                    let result = self.validator.on_try(offset, block.ty);
                    self.report(result)?;
                    self.walk_exprs(block.exprs)?;
                    let result = match kind {
                        TryKind::Plain => self.validator.on_end(block.end_loc.offset),
                        TryKind::Catch(catches) => {
                            for catch in catches {
                                let result = match &catch.tag {
                                    Some(tag) => self.validator.on_catch(catch.loc.offset, tag),
                                    None => self.validator.on_catch_all(catch.loc.offset),
                                };
                                self.report(result)?;
                                self.walk_exprs(catch.exprs)?;
                            }
                            self.validator.on_end(block.end_loc.offset)
                        }
                        TryKind::Delegate(depth) => {
                            self.validator.on_delegate(block.end_loc.offset, depth)
                        }
                    };
                    self.report(result)?;
                }
                Expr::TryTable { block, catches } => {
                    let result = self.validator.on_try_table(offset, block.ty, catches);
                    self.report(result)?;
                    self.walk_exprs(block.exprs)?;
                    let result = self.validator.on_end(block.end_loc.offset);
                    self.report(result)?;
                }
                Expr::CodeMetadata { .. } => {}
                Expr::Instr(instr) => {
                    let result = self.validator.on_instr(offset, instr);
                    self.report(result)?;
                }
            }
        }
        Ok(())
    }
}

fn unresolved(var: &Var) -> Error {
    Error::invalid(var.loc().offset, format!("undefined variable \"{var}\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::ReadOptions;
    use crate::features::Features;
    use crate::ir::{read_binary_ir, Instr};

    fn build(wat: &str) -> Module {
        let bytes = wat::parse_str(wat).unwrap();
        read_binary_ir(&bytes, &ReadOptions::default()).unwrap()
    }

    #[test]
    fn built_module_validates() {
        let module = build(
            r#"
            (module
              (table 2 funcref)
              (func $f (param i32) (result i32)
                (if (result i32) (local.get 0)
                  (then i32.const 1)
                  (else i32.const 2)))
              (func (export "g") (result i32)
                (loop $l
                  i32.const 0
                  br_if $l)
                i32.const 3
                call $f)
              (elem (i32.const 0) $f))
        "#,
        );
        assert_eq!(validate_module(&module, &ValidateOptions::default()), Ok(()));
    }

    #[test]
    fn edited_module_reports_sorted_errors() {
        let mut module = build(
            r#"
            (module
              (func (result i32) i32.const 1)
              (func (result i32) i32.const 2))
        "#,
        );
        // Swap both constants for i64 ones.
        let lists: Vec<_> = module.defined_funcs().map(|f| f.exprs).collect();
        for list in lists {
            if let Some(id) = list.first() {
                let node = module.exprs.get_mut(id);
                node.expr = Expr::Instr(Instr::I64Const(0));
            }
        }
        let options = ValidateOptions {
            features: Features::default(),
            stop_on_first_error: false,
        };
        let errors = validate_module(&module, &options).unwrap_err();
        assert_eq!(errors.len(), 2);
        let offsets: Vec<_> = errors.iter().map(|e| e.offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort();
        assert_eq!(offsets, sorted);

        let errors = validate_module(&module, &ValidateOptions::default()).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn unresolved_name_is_an_error() {
        let mut module = build(r#"(module (func) (func call 0))"#);
        let list = module.funcs[1].exprs;
        if let Some(id) = list.first() {
            module.exprs.get_mut(id).expr =
                Expr::Instr(Instr::Call(Var::name("missing", 0)));
        }
        let errors = validate_module(&module, &ValidateOptions::default()).unwrap_err();
        assert!(errors
            .first()
            .is_some_and(|e| e.message.contains("$missing")));
    }
}
