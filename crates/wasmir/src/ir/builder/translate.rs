//! Operator translation: turns decoded operators into expression nodes.

use super::core::{IrBuilder, LabelKind};
use crate::binary::Operator;
use crate::error::Error;
use crate::ir::{Block, Expr, ExprList, TryKind};

impl IrBuilder {
    pub(super) fn on_operator(&mut self, offset: usize, op: &Operator) -> Result<(), Error> {
        self.splice_code_metadata(offset)?;
        match op {
            Operator::Block(ty) => self.open(LabelKind::Block, Expr::Block(Block::new(*ty)), offset),
            Operator::Loop(ty) => self.open(LabelKind::Loop, Expr::Loop(Block::new(*ty)), offset),
            Operator::If(ty) => self.open(
                LabelKind::If,
                Expr::If {
                    block: Block::new(*ty),
                    false_exprs: ExprList::default(),
                    else_loc: None,
                },
                offset,
            ),
            Operator::Try(ty) => self.open(
                LabelKind::Try,
                Expr::Try {
                    block: Block::new(*ty),
                    kind: TryKind::Plain,
                },
                offset,
            ),
            Operator::TryTable { ty, catches } => self.open(
                LabelKind::TryTable,
                Expr::TryTable {
                    block: Block::new(*ty),
                    catches: catches.clone(),
                },
                offset,
            ),
            Operator::Else => self.on_else(offset),
            Operator::Catch(tag) => self.on_catch(Some(tag.clone()), offset),
            Operator::CatchAll => self.on_catch(None, offset),
            Operator::Delegate(depth) => self.on_delegate(depth.clone(), offset),
            Operator::End => self.on_end(offset),
            Operator::Instr(instr) => self.append(Expr::Instr(instr.clone()), offset).map(drop),
        }
    }

    fn open(&mut self, kind: LabelKind, expr: Expr, offset: usize) -> Result<(), Error> {
        let node = self.append(expr, offset)?;
        self.push_label(kind, Some(node), offset)
    }
}

#[cfg(test)]
mod tests {
    use crate::binary::{Event, EventSink, Operator};
    use crate::error::ErrorKind;
    use crate::ir::{Block, Expr, Instr, IrBuilder, TryKind, Var};
    use crate::types::{BlockType, CompositeType, FuncType, SubType, Type};

    fn builder_with_body() -> IrBuilder {
        let mut builder = IrBuilder::default();
        let events = [
            Event::Type {
                index: 0,
                ty: SubType::plain(CompositeType::Func(FuncType::new(vec![], vec![]))),
            },
            Event::Function {
                index: 0,
                type_index: 0,
            },
            Event::BeginFunctionBody { index: 0, size: 0 },
        ];
        for event in &events {
            builder.on_event(0, event).unwrap();
        }
        builder
    }

    fn op(builder: &mut IrBuilder, offset: usize, op: Operator) {
        builder
            .on_event(offset, &Event::Operator(op))
            .unwrap_or_else(|e| panic!("{e}"));
    }

    #[test]
    fn label_depth_returns_after_end() {
        let mut builder = builder_with_body();
        assert_eq!(builder.depth(), 1);
        op(&mut builder, 1, Operator::Block(BlockType::Empty));
        op(&mut builder, 2, Operator::Loop(BlockType::Empty));
        assert_eq!(builder.depth(), 3);
        op(&mut builder, 3, Operator::End);
        op(&mut builder, 4, Operator::End);
        assert_eq!(builder.depth(), 1);
        op(&mut builder, 5, Operator::End);
        assert_eq!(builder.depth(), 0);

        let module = builder.into_module();
        let body: Vec<_> = module.exprs.iter(module.funcs[0].exprs).collect();
        assert_eq!(body.len(), 1);
        let Expr::Block(Block { exprs, end_loc, .. }) = &body[0].expr else {
            panic!("expected block, got {:?}", body[0].expr);
        };
        assert_eq!(end_loc.offset, 4);
        assert!(matches!(
            module.exprs.iter(*exprs).next().map(|n| &n.expr),
            Some(Expr::Loop(_))
        ));
    }

    #[test]
    fn else_moves_appends_to_false_arm() {
        let mut builder = builder_with_body();
        op(&mut builder, 1, Operator::Instr(Instr::I32Const(1)));
        op(&mut builder, 3, Operator::If(BlockType::Empty));
        op(&mut builder, 5, Operator::Instr(Instr::Nop));
        op(&mut builder, 6, Operator::Else);
        op(&mut builder, 7, Operator::Instr(Instr::Unreachable));
        op(&mut builder, 8, Operator::Instr(Instr::Nop));
        op(&mut builder, 9, Operator::End);
        op(&mut builder, 10, Operator::End);

        let module = builder.into_module();
        let body: Vec<_> = module.exprs.iter(module.funcs[0].exprs).collect();
        assert_eq!(body.len(), 2);
        let Expr::If {
            block,
            false_exprs,
            else_loc,
        } = &body[1].expr
        else {
            panic!("expected if");
        };
        assert_eq!(block.exprs.len(), 1);
        assert_eq!(false_exprs.len(), 2);
        assert_eq!(else_loc.map(|l| l.offset), Some(6));
    }

    #[test]
    fn try_with_catch_arms() {
        let mut builder = builder_with_body();
        op(&mut builder, 1, Operator::Try(BlockType::Value(Type::I32)));
        op(&mut builder, 3, Operator::Instr(Instr::I32Const(0)));
        op(&mut builder, 5, Operator::Catch(Var::index(0, 5)));
        op(&mut builder, 7, Operator::CatchAll);
        op(&mut builder, 8, Operator::Instr(Instr::I32Const(1)));
        op(&mut builder, 10, Operator::End);
        op(&mut builder, 11, Operator::End);

        let module = builder.into_module();
        let node = module.exprs.iter(module.funcs[0].exprs).next().unwrap();
        let Expr::Try {
            block,
            kind: TryKind::Catch(catches),
        } = &node.expr
        else {
            panic!("expected try with catches, got {:?}", node.expr);
        };
        assert_eq!(block.exprs.len(), 1);
        assert_eq!(catches.len(), 2);
        assert_eq!(catches[0].tag, Some(Var::index(0, 5)));
        assert!(catches[0].exprs.is_empty());
        assert_eq!(catches[1].tag, None);
        assert_eq!(catches[1].exprs.len(), 1);
    }

    #[test]
    fn delegate_closes_try() {
        let mut builder = builder_with_body();
        op(&mut builder, 1, Operator::Try(BlockType::Empty));
        op(&mut builder, 3, Operator::Instr(Instr::Nop));
        op(&mut builder, 4, Operator::Delegate(Var::index(0, 4)));
        assert_eq!(builder.depth(), 1);
        op(&mut builder, 6, Operator::End);

        let module = builder.into_module();
        let node = module.exprs.iter(module.funcs[0].exprs).next().unwrap();
        assert!(matches!(
            &node.expr,
            Expr::Try { kind: TryKind::Delegate(_), block } if block.exprs.len() == 1
        ));
    }

    #[test]
    fn unmatched_end_pops_empty_label_stack() {
        let mut builder = IrBuilder::default();
        let err = builder
            .on_event(12, &Event::Operator(Operator::End))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Invalid);
        assert_eq!(err.message, "popping empty label stack");
        assert_eq!(err.offset, 12);
    }

    #[test]
    fn else_outside_if_is_invalid() {
        let mut builder = builder_with_body();
        op(&mut builder, 1, Operator::Block(BlockType::Empty));
        let err = builder
            .on_event(2, &Event::Operator(Operator::Else))
            .unwrap_err();
        assert_eq!(err.message, "else without matching if");
    }
}
