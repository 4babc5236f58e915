//! anglish-core: parser and dependency orderer for Anglish contracts.
//!
//! An Anglish contract declares spaces (`@`), agents (`#`), tasks (`$`)
//! and paths (`=`), each followed by a block of `>` prose lines that may
//! embed references to other declarations. Processing has two stages:
//!
//! - [`parse()`] turns text into a [`Contract`] plus positioned
//!   [`Diagnostic`]s. It never fails; malformed input yields a partial tree.
//! - [`order()`] registers every declaration, resolves references and
//!   returns an [`Ordering`] in which each node follows its dependencies.

pub mod ast;
pub mod cursor;
pub mod error;
pub mod order;
pub mod parser;
pub mod scope;

// ── Convenience re-exports ───────────────────────────────────────────

pub use ast::{
    AgentDecl, AgentType, Contract, Decl, Direction, Identifier, Kind, MetaRef, Param, PathDecl,
    PathType, SpaceDecl, SpaceRef, SpaceType, TaskDecl, UseImportType, VibeBlock,
};
pub use error::{Diagnostic, DiagnosticKind};
pub use order::{order, order_with, CycleReport, GraphNode, OrderOptions, Ordering};
pub use parser::{parse, parse_bytes, parse_with, ParseOptions, PathRefMode};
pub use scope::{Node, NodeId};
