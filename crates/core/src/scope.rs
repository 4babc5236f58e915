//! Name registration: assigns every declaration an arena id and builds the
//! contract-wide lookup table.
//!
//! The namespace is flat. Nested agents and tasks are visible by name from
//! anywhere in the contract, not only from their enclosing space.

use crate::ast::*;
use crate::error::{Diagnostic, DiagnosticKind};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Index of a node in the registration arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A borrowed view of one declaration, whatever its kind.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Space(&'a SpaceDecl),
    Agent(&'a AgentDecl),
    Task(&'a TaskDecl),
    Path(&'a PathDecl),
}

impl<'a> Node<'a> {
    pub fn ident(&self) -> &'a Identifier {
        match self {
            Node::Space(s) => &s.ident,
            Node::Agent(a) => &a.ident,
            Node::Task(t) => &t.ident,
            Node::Path(p) => &p.ident,
        }
    }

    pub fn kind(&self) -> Kind {
        self.ident().kind
    }

    pub fn vibe(&self) -> &'a VibeBlock {
        match self {
            Node::Space(s) => &s.vibe,
            Node::Agent(a) => &a.vibe,
            Node::Task(t) => &t.vibe,
            Node::Path(p) => &p.vibe,
        }
    }

    /// Declared parameters. Paths have none.
    pub fn params(&self) -> &'a [Param] {
        match self {
            Node::Space(s) => &s.params,
            Node::Agent(a) => &a.params,
            Node::Task(t) => &t.params,
            Node::Path(_) => &[],
        }
    }

    pub fn line_start(&self) -> u32 {
        match self {
            Node::Space(s) => s.line_start,
            Node::Agent(a) => a.line_start,
            Node::Task(t) => t.line_start,
            Node::Path(p) => p.line_start,
        }
    }

    pub fn line_end(&self) -> u32 {
        match self {
            Node::Space(s) => s.line_end,
            Node::Agent(a) => a.line_end,
            Node::Task(t) => t.line_end,
            Node::Path(p) => p.line_end,
        }
    }
}

/// A registered node and its structural relationships.
#[derive(Debug, Clone)]
pub struct Entry<'a> {
    pub node: Node<'a>,
    /// Enclosing space, for nested agents and tasks.
    pub parent: Option<NodeId>,
    /// Nested agents and tasks, which must precede this space.
    pub children: Vec<NodeId>,
}

/// Identifier → node id. Later registrations shadow earlier ones.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    names: HashMap<Identifier, NodeId>,
}

impl Scope {
    pub fn resolve(&self, ident: &Identifier) -> Option<NodeId> {
        self.names.get(ident).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Output of [`register`]: the arena, the name table and any duplicate
/// identifier diagnostics.
#[derive(Debug, Clone)]
pub struct Registry<'a> {
    pub entries: Vec<Entry<'a>>,
    pub scope: Scope,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> Registry<'a> {
    fn add(&mut self, node: Node<'a>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.entries.len());
        let ident = node.ident();
        if let Some(previous) = self.scope.names.insert(ident.clone(), id) {
            tracing::debug!(%ident, shadowed = %previous, by = %id, "duplicate identifier");
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::DuplicateIdentifier(ident.clone()),
                node.line_start(),
                0,
            ));
        }
        self.entries.push(Entry {
            node,
            parent,
            children: Vec::new(),
        });
        id
    }
}

/// Register every declaration in source order: a space, then its agents,
/// then its tasks. Top-level agents and paths register themselves.
pub fn register(contract: &Contract) -> Registry<'_> {
    let mut reg = Registry {
        entries: Vec::new(),
        scope: Scope::default(),
        diagnostics: Vec::new(),
    };

    for decl in &contract.decls {
        match decl {
            Decl::Space(space) => {
                let sid = reg.add(Node::Space(space), None);
                let mut children = Vec::with_capacity(space.agents.len() + space.tasks.len());
                for agent in &space.agents {
                    children.push(reg.add(Node::Agent(agent), Some(sid)));
                }
                for task in &space.tasks {
                    children.push(reg.add(Node::Task(task), Some(sid)));
                }
                reg.entries[sid.index()].children = children;
            }
            Decl::Agent(agent) => {
                reg.add(Node::Agent(agent), None);
            }
            Decl::Path(path) => {
                reg.add(Node::Path(path), None);
            }
        }
    }

    tracing::debug!(
        nodes = reg.entries.len(),
        names = reg.scope.len(),
        "registered contract"
    );
    reg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn registration_follows_source_order() {
        let (contract, _) = parse("#boss:AF\n@shop\n#clerk:DF\n$sell\n");
        let reg = register(&contract);
        let names: Vec<String> = reg
            .entries
            .iter()
            .map(|e| e.node.ident().to_string())
            .collect();
        assert_eq!(names, vec!["#boss", "@shop", "#clerk", "$sell"]);
        assert_eq!(reg.entries[1].children, vec![NodeId(2), NodeId(3)]);
        assert_eq!(reg.entries[2].parent, Some(NodeId(1)));
        assert_eq!(reg.entries[0].parent, None);
        assert!(reg.diagnostics.is_empty());
    }

    #[test]
    fn same_name_different_kind_does_not_collide() {
        let (contract, _) = parse("#x:AF\n@x\n$x\n");
        let reg = register(&contract);
        assert!(reg.diagnostics.is_empty());
        assert_eq!(reg.scope.len(), 3);
        assert_eq!(reg.scope.resolve(&Identifier::task("x")), Some(NodeId(2)));
    }

    #[test]
    fn later_duplicate_wins_and_earlier_stays_in_the_arena() {
        let (contract, _) = parse("#a:AF\n> first\n#a:DF\n> second\n");
        let reg = register(&contract);
        assert_eq!(reg.entries.len(), 2);
        assert_eq!(reg.scope.resolve(&Identifier::agent("a")), Some(NodeId(1)));
        assert_eq!(reg.diagnostics.len(), 1);
        assert_eq!(
            reg.diagnostics[0].kind,
            DiagnosticKind::DuplicateIdentifier(Identifier::agent("a"))
        );
        assert_eq!(reg.diagnostics[0].line, 3);
    }

    #[test]
    fn node_view_exposes_declaration_fields() {
        let (contract, _) = parse("@s(in=%a, out=%b)\n> hello\n");
        let reg = register(&contract);
        let node = reg.entries[0].node;
        assert_eq!(node.kind(), Kind::Space);
        assert_eq!(node.params().len(), 2);
        assert_eq!(node.vibe().prose, vec!["hello".to_string()]);
        assert_eq!((node.line_start(), node.line_end()), (1, 2));
    }
}
