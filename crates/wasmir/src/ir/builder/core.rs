//! Builder state and the label stack.
//!
//! Structured instructions are appended to their parent list as soon as
//! they open, so sibling order is preserved. The label keeps the arena id of
//! that node and the list currently receiving instructions; the list is
//! written back into the node when the label closes or switches arms.

use super::metadata::CodeMetadataQueue;
use crate::binary::{InitExprTarget, ResourceLimits};
use crate::error::Error;
use crate::ir::{
    CatchBlock, DataMode, ElemMode, Expr, ExprId, ExprList, Location, Module, TryKind, Var,
};

/// What an open label closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LabelKind {
    Func(u32),
    InitExpr(InitExprTarget),
    Block,
    Loop,
    If,
    Else,
    Try,
    Catch,
    TryTable,
}

#[derive(Debug, Clone)]
pub(super) struct Label {
    pub(super) kind: LabelKind,
    /// The list new instructions are appended to.
    pub(super) exprs: ExprList,
    /// The structured node this label belongs to. `None` for function
    /// bodies and constant expressions.
    pub(super) node: Option<ExprId>,
}

/// Materialises a [`Module`] from the reader's event stream.
///
/// Feed it to [`crate::binary::read_binary`] directly or as half of a
/// tuple sink, then take the result with [`IrBuilder::into_module`].
#[derive(Debug)]
pub struct IrBuilder {
    pub(super) module: Module,
    pub(super) limits: ResourceLimits,
    pub(super) labels: Vec<Label>,
    pub(super) metadata: CodeMetadataQueue,
    /// Function whose body is being decoded.
    pub(super) current_func: Option<u32>,
    /// Offset of the current body, after its size field.
    pub(super) body_start: usize,
    /// First type index of the open recursion group.
    pub(super) rec_group: u32,
    /// Structured nodes of one function in label-index order, cached for
    /// label names.
    pub(super) label_nodes: Option<(u32, Vec<ExprId>)>,
}

impl IrBuilder {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            module: Module::default(),
            limits,
            labels: Vec::new(),
            metadata: CodeMetadataQueue::default(),
            current_func: None,
            body_start: 0,
            rec_group: 0,
            label_nodes: None,
        }
    }

    /// Number of open labels.
    pub fn depth(&self) -> usize {
        self.labels.len()
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn into_module(self) -> Module {
        if !self.metadata.is_empty() {
            log::debug!("dropping code metadata that matched no instruction");
        }
        self.module
    }

    /// Opens a label. The label is pushed even when the nesting limit is
    /// exceeded so the matching `end` still balances.
    pub(super) fn push_label(
        &mut self,
        kind: LabelKind,
        node: Option<ExprId>,
        offset: usize,
    ) -> Result<(), Error> {
        self.labels.push(Label {
            kind,
            exprs: ExprList::default(),
            node,
        });
        if self.labels.len() > self.limits.max_nesting_depth {
            return Err(Error::resource_limit(
                offset,
                format!(
                    "nesting depth exceeds maximum ({})",
                    self.limits.max_nesting_depth
                ),
            ));
        }
        Ok(())
    }

    pub(super) fn pop_label(&mut self, offset: usize) -> Result<Label, Error> {
        self.labels
            .pop()
            .ok_or_else(|| Error::invalid(offset, "popping empty label stack"))
    }

    pub(super) fn top_label(&mut self, offset: usize) -> Result<&mut Label, Error> {
        self.labels
            .last_mut()
            .ok_or_else(|| Error::invalid(offset, "accessing empty label stack"))
    }

    /// Appends `expr` to the innermost open list.
    pub(super) fn append(&mut self, expr: Expr, offset: usize) -> Result<ExprId, Error> {
        let label = self
            .labels
            .last_mut()
            .ok_or_else(|| Error::invalid(offset, "instruction outside of a function body"))?;
        Ok(self
            .module
            .exprs
            .push(&mut label.exprs, expr, Location::new(offset)))
    }

    /// Appends to a list that is not on the label stack.
    pub(super) fn single_expr_list(&mut self, expr: Expr, offset: usize) -> ExprList {
        let mut list = ExprList::default();
        self.module.exprs.push(&mut list, expr, Location::new(offset));
        list
    }

    /// Switches the innermost `if` to its false arm.
    pub(super) fn on_else(&mut self, offset: usize) -> Result<(), Error> {
        let label = self.top_label(offset)?;
        if label.kind != LabelKind::If {
            return Err(Error::invalid(offset, "else without matching if"));
        }
        let exprs = std::mem::take(&mut label.exprs);
        label.kind = LabelKind::Else;
        let node = label.node;
        if let Some(Expr::If {
            block, else_loc, ..
        }) = node.map(|id| &mut self.module.exprs.get_mut(id).expr)
        {
            block.exprs = exprs;
            *else_loc = Some(Location::new(offset));
        }
        Ok(())
    }

    /// Starts a `catch` or `catch_all` arm of the innermost `try`.
    pub(super) fn on_catch(&mut self, tag: Option<Var>, offset: usize) -> Result<(), Error> {
        let label = self.top_label(offset)?;
        let was_try = match label.kind {
            LabelKind::Try => true,
            LabelKind::Catch => false,
            _ => return Err(Error::invalid(offset, "catch without matching try")),
        };
        let exprs = std::mem::take(&mut label.exprs);
        label.kind = LabelKind::Catch;
        let node = label.node;
        if let Some(Expr::Try { block, kind }) = node.map(|id| &mut self.module.exprs.get_mut(id).expr)
        {
            if was_try {
                block.exprs = exprs;
                *kind = TryKind::Catch(Vec::new());
            } else if let TryKind::Catch(catches) = kind {
                if let Some(last) = catches.last_mut() {
                    last.exprs = exprs;
                }
            }
            if let TryKind::Catch(catches) = kind {
                catches.push(CatchBlock {
                    tag,
                    exprs: ExprList::default(),
                    loc: Location::new(offset),
                });
            }
        }
        Ok(())
    }

    /// Closes the innermost `try` with `delegate`.
    pub(super) fn on_delegate(&mut self, depth: Var, offset: usize) -> Result<(), Error> {
        if self.top_label(offset)?.kind != LabelKind::Try {
            return Err(Error::invalid(offset, "delegate without matching try"));
        }
        let label = self.pop_label(offset)?;
        if let Some(Expr::Try { block, kind }) =
            label.node.map(|id| &mut self.module.exprs.get_mut(id).expr)
        {
            block.exprs = label.exprs;
            block.end_loc = Location::new(offset);
            *kind = TryKind::Delegate(depth);
        }
        Ok(())
    }

    /// Closes the innermost label and stores its list where it belongs.
    pub(super) fn on_end(&mut self, offset: usize) -> Result<(), Error> {
        let label = self.pop_label(offset)?;
        let end_loc = Location::new(offset);
        let exprs = label.exprs;
        match label.kind {
            LabelKind::Func(index) => {
                if let Some(func) = self.module.funcs.get_mut(index as usize) {
                    func.exprs = exprs;
                }
                return Ok(());
            }
            LabelKind::InitExpr(target) => {
                self.store_init_expr(target, exprs);
                return Ok(());
            }
            _ => {}
        }

        let Some(id) = label.node else {
            return Ok(());
        };
        match (label.kind, &mut self.module.exprs.get_mut(id).expr) {
            (LabelKind::Block, Expr::Block(block))
            | (LabelKind::Loop, Expr::Loop(block))
            | (LabelKind::If, Expr::If { block, .. })
            | (LabelKind::Try, Expr::Try { block, .. })
            | (LabelKind::TryTable, Expr::TryTable { block, .. }) => {
                block.exprs = exprs;
                block.end_loc = end_loc;
            }
            (
                LabelKind::Else,
                Expr::If {
                    block, false_exprs, ..
                },
            ) => {
                *false_exprs = exprs;
                block.end_loc = end_loc;
            }
            (
                LabelKind::Catch,
                Expr::Try {
                    block,
                    kind: TryKind::Catch(catches),
                },
            ) => {
                if let Some(last) = catches.last_mut() {
                    last.exprs = exprs;
                }
                block.end_loc = end_loc;
            }
            _ => return Err(Error::invalid(offset, "label does not match its block")),
        }
        Ok(())
    }

    fn store_init_expr(&mut self, target: InitExprTarget, exprs: ExprList) {
        let module = &mut self.module;
        match target {
            InitExprTarget::Global(index) => {
                if let Some(global) = module.globals.get_mut(index as usize) {
                    global.init = exprs;
                }
            }
            InitExprTarget::ElemOffset(index) => {
                if let Some(ElemMode::Active { offset, .. }) = module
                    .elem_segments
                    .get_mut(index as usize)
                    .map(|segment| &mut segment.mode)
                {
                    *offset = exprs;
                }
            }
            InitExprTarget::ElemExpr { segment, .. } => {
                if let Some(segment) = module.elem_segments.get_mut(segment as usize) {
                    segment.elems.push(exprs);
                }
            }
            InitExprTarget::DataOffset(index) => {
                if let Some(DataMode::Active { offset, .. }) = module
                    .data_segments
                    .get_mut(index as usize)
                    .map(|segment| &mut segment.mode)
                {
                    *offset = exprs;
                }
            }
        }
    }
}

impl Default for IrBuilder {
    fn default() -> Self {
        Self::new(ResourceLimits::default())
    }
}
