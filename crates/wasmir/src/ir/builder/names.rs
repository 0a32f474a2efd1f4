//! Debug names from the `name` section.
//!
//! Names are attached to entities that already exist; a name that collides
//! with one already bound in the same index space gets a numeric suffix.

use super::core::IrBuilder;
use crate::binary::NameKind;
use crate::ir::{Expr, ExprArena, ExprId, ExprList, Location, TryKind};

impl IrBuilder {
    pub(super) fn on_module_name(&mut self, name: &str) {
        self.module.name = Some(name.to_string());
    }

    pub(super) fn on_function_name(&mut self, offset: usize, index: u32, name: &str) {
        let module = &mut self.module;
        if let Some(func) = module.funcs.get_mut(index as usize) {
            func.name = Some(
                module
                    .func_bindings
                    .bind_unique(name, index, Location::new(offset)),
            );
        }
    }

    pub(super) fn on_local_name(
        &mut self,
        offset: usize,
        func_index: u32,
        local_index: u32,
        name: &str,
    ) {
        let Some(func) = self.module.funcs.get_mut(func_index as usize) else {
            return;
        };
        if func.local_type(local_index).is_none() {
            log::warn!(
                "name for local {local_index} of function {func_index}, which has no such local"
            );
            return;
        }
        func.bindings
            .bind_unique(name, local_index, Location::new(offset));
    }

    /// Labels are numbered by the order their blocks open in the body.
    pub(super) fn on_label_name(&mut self, func_index: u32, label_index: u32, name: &str) {
        let cached = matches!(&self.label_nodes, Some((index, _)) if *index == func_index);
        if !cached {
            let Some(func) = self.module.funcs.get(func_index as usize) else {
                return;
            };
            let mut nodes = Vec::new();
            collect_structured(&self.module.exprs, func.exprs, &mut nodes);
            self.label_nodes = Some((func_index, nodes));
        }
        let Some(id) = self
            .label_nodes
            .as_ref()
            .and_then(|(_, nodes)| nodes.get(label_index as usize).copied())
        else {
            return;
        };
        match &mut self.module.exprs.get_mut(id).expr {
            Expr::Block(block)
            | Expr::Loop(block)
            | Expr::If { block, .. }
            | Expr::Try { block, .. }
            | Expr::TryTable { block, .. } => block.label = Some(name.to_string()),
            Expr::CodeMetadata { .. } | Expr::Instr(_) => {}
        }
    }

    pub(super) fn on_field_name(&mut self, type_index: u32, field_index: u32, name: &str) {
        let Some(entry) = self.module.types.get_mut(type_index as usize) else {
            return;
        };
        let field_index = field_index as usize;
        if entry.field_names.len() <= field_index {
            entry.field_names.resize(field_index + 1, None);
        }
        entry.field_names[field_index] = Some(name.to_string());
    }

    pub(super) fn on_name(&mut self, offset: usize, kind: NameKind, index: u32, name: &str) {
        let loc = Location::new(offset);
        let module = &mut self.module;
        let i = index as usize;
        let (slot, bindings) = match kind {
            NameKind::Type => (
                module.types.get_mut(i).map(|t| &mut t.name),
                &mut module.type_bindings,
            ),
            NameKind::Table => (
                module.tables.get_mut(i).map(|t| &mut t.name),
                &mut module.table_bindings,
            ),
            NameKind::Memory => (
                module.memories.get_mut(i).map(|m| &mut m.name),
                &mut module.memory_bindings,
            ),
            NameKind::Global => (
                module.globals.get_mut(i).map(|g| &mut g.name),
                &mut module.global_bindings,
            ),
            NameKind::ElemSegment => (
                module.elem_segments.get_mut(i).map(|s| &mut s.name),
                &mut module.elem_bindings,
            ),
            NameKind::DataSegment => (
                module.data_segments.get_mut(i).map(|s| &mut s.name),
                &mut module.data_bindings,
            ),
            NameKind::Tag => (
                module.tags.get_mut(i).map(|t| &mut t.name),
                &mut module.tag_bindings,
            ),
        };
        if let Some(slot) = slot {
            *slot = Some(bindings.bind_unique(name, index, loc));
        }
    }
}

/// Structured nodes of `list` in pre-order.
fn collect_structured(arena: &ExprArena, list: ExprList, out: &mut Vec<ExprId>) {
    let mut next = list.first();
    while let Some(id) = next {
        match &arena.get(id).expr {
            Expr::Block(block) | Expr::Loop(block) | Expr::TryTable { block, .. } => {
                out.push(id);
                collect_structured(arena, block.exprs, out);
            }
            Expr::If {
                block, false_exprs, ..
            } => {
                out.push(id);
                collect_structured(arena, block.exprs, out);
                collect_structured(arena, *false_exprs, out);
            }
            Expr::Try { block, kind } => {
                out.push(id);
                collect_structured(arena, block.exprs, out);
                if let TryKind::Catch(catches) = kind {
                    for catch in catches {
                        collect_structured(arena, catch.exprs, out);
                    }
                }
            }
            Expr::CodeMetadata { .. } | Expr::Instr(_) => {}
        }
        next = arena.next(id);
    }
}
