//! Module intermediate representation.
//!
//! [`Module`] owns every entity of a decoded module plus the [`ExprArena`]
//! holding all of its instruction lists. The [`builder`] turns the reader's
//! event stream into a `Module`.

mod binding;
pub mod builder;
mod expr;
mod types;

pub use binding::{Binding, BindingHash};
pub use builder::{read_binary_ir, IrBuilder};
pub use expr::{
    Block, CatchBlock, CatchKind, Expr, ExprArena, ExprId, ExprIter, ExprList, ExprNode, Instr,
    MemArg, TableCatch, TryKind, V128,
};
pub use types::{
    Custom, DataMode, DataSegment, ElemMode, ElemSegment, Export, Func, Global, Import,
    ImportItem, LocalTypes, Location, Memory, Module, Table, Tag, TypeEntry, Var,
};
