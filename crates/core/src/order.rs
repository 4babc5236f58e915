//! Dependency graph and topological ordering.
//!
//! A node depends on everything it must come after: a space on its nested
//! agents and tasks, a path on its two spaces, and any node on the
//! declarations its vibe block references. The ordering is a depth-first
//! postorder, so every node appears after all of its dependencies.

use crate::ast::{Contract, Identifier};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::scope::{register, Node, NodeId, Scope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderOptions {
    /// Leave out nodes with unresolved references, and everything that
    /// depends on them.
    #[serde(default)]
    pub strict: bool,
}

/// One node of the dependency graph.
#[derive(Debug, Clone)]
pub struct GraphNode<'a> {
    pub id: NodeId,
    pub node: Node<'a>,
    pub parent: Option<NodeId>,
    pub deps: BTreeSet<NodeId>,
    /// Set when at least one reference could not be resolved.
    pub unresolved: bool,
}

/// The cycle that stopped the sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// The node whose revisit closed the cycle.
    pub node: NodeId,
    pub ident: Identifier,
    /// From `ident` back around to `ident`.
    pub path: Vec<Identifier>,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.path.iter().map(Identifier::to_string).collect();
        f.write_str(&parts.join(" \u{2192} "))
    }
}

/// Result of resolving and sorting a contract. Always usable: on a cycle,
/// `order` holds the nodes finalized before it was found.
#[derive(Debug, Clone)]
pub struct Ordering<'a> {
    pub nodes: Vec<GraphNode<'a>>,
    pub order: Vec<NodeId>,
    pub cycle: Option<CycleReport>,
    /// Nodes left out by strict mode.
    pub excluded: Vec<NodeId>,
    /// Duplicate, undeclared and cycle diagnostics, in that order.
    pub diagnostics: Vec<Diagnostic>,
    scope: Scope,
}

impl<'a> Ordering<'a> {
    pub fn node(&self, id: NodeId) -> &GraphNode<'a> {
        &self.nodes[id.index()]
    }

    /// Nodes in dependency order.
    pub fn ordered(&self) -> impl Iterator<Item = &GraphNode<'a>> + '_ {
        self.order.iter().map(|&id| self.node(id))
    }

    pub fn lookup(&self, ident: &Identifier) -> Option<&GraphNode<'a>> {
        self.scope.resolve(ident).map(|id| self.node(id))
    }

    /// True when every node made it into the order.
    pub fn is_complete(&self) -> bool {
        self.order.len() == self.nodes.len()
    }
}

pub fn order(contract: &Contract) -> Ordering<'_> {
    order_with(contract, &OrderOptions::default())
}

pub fn order_with<'a>(contract: &'a Contract, options: &OrderOptions) -> Ordering<'a> {
    let registry = register(contract);
    let mut diagnostics = registry.diagnostics;
    let scope = registry.scope;

    let mut nodes: Vec<GraphNode<'a>> = Vec::with_capacity(registry.entries.len());
    for (i, entry) in registry.entries.into_iter().enumerate() {
        let id = NodeId(i);
        let mut deps: BTreeSet<NodeId> = entry.children.iter().copied().collect();
        let mut unresolved = false;

        let mut link = |target: Identifier, line: u32, col: u32| match scope.resolve(&target) {
            Some(dep) if dep == id => {}
            Some(dep) => {
                deps.insert(dep);
            }
            None => {
                tracing::debug!(node = %entry.node.ident(), %target, "dropping unresolved edge");
                unresolved = true;
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UndeclaredIdentifier(target),
                    line,
                    col,
                ));
            }
        };

        if let Node::Path(path) = entry.node {
            link(path.source.ident(), path.source.line, path.source.col);
            link(path.dest.ident(), path.dest.line, path.dest.col);
        }
        for r in &entry.node.vibe().meta_refs {
            if let Some(target) = r.target() {
                let (line, col) = r.position();
                link(target, line, col);
            }
        }

        nodes.push(GraphNode {
            id,
            node: entry.node,
            parent: entry.parent,
            deps,
            unresolved,
        });
    }

    let excluded = if options.strict {
        tainted(&nodes)
    } else {
        BTreeSet::new()
    };

    let (order, cycle) = sort(&nodes, &excluded);
    if let Some(c) = &cycle {
        tracing::debug!(cycle = %c, finalized = order.len(), "dependency cycle");
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::DependencyCycle(c.ident.clone()),
            nodes[c.node.index()].node.line_start(),
            0,
        ));
    }

    Ordering {
        nodes,
        order,
        cycle,
        excluded: excluded.into_iter().collect(),
        diagnostics,
        scope,
    }
}

/// Nodes with unresolved references plus everything that transitively
/// depends on one.
fn tainted(nodes: &[GraphNode<'_>]) -> BTreeSet<NodeId> {
    let mut out: BTreeSet<NodeId> = nodes.iter().filter(|n| n.unresolved).map(|n| n.id).collect();
    loop {
        let before = out.len();
        for n in nodes {
            if !out.contains(&n.id) && n.deps.iter().any(|d| out.contains(d)) {
                out.insert(n.id);
            }
        }
        if out.len() == before {
            return out;
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Iterative depth-first postorder, roots in arena order. Stops at the
/// first cycle.
fn sort(nodes: &[GraphNode<'_>], skip: &BTreeSet<NodeId>) -> (Vec<NodeId>, Option<CycleReport>) {
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());

    for root in nodes {
        if marks[root.id.index()] != Mark::Unvisited || skip.contains(&root.id) {
            continue;
        }
        marks[root.id.index()] = Mark::InProgress;
        let mut stack = vec![(root.id, root.deps.iter())];

        loop {
            let next = match stack.last_mut() {
                None => break,
                Some((_, deps)) => deps.next().copied(),
            };
            match next {
                Some(dep) => match marks[dep.index()] {
                    Mark::Done => {}
                    Mark::Unvisited => {
                        marks[dep.index()] = Mark::InProgress;
                        stack.push((dep, nodes[dep.index()].deps.iter()));
                    }
                    Mark::InProgress => {
                        let start = stack.iter().position(|(id, _)| *id == dep).unwrap_or(0);
                        let mut path: Vec<Identifier> = stack[start..]
                            .iter()
                            .map(|(id, _)| nodes[id.index()].node.ident().clone())
                            .collect();
                        let ident = nodes[dep.index()].node.ident().clone();
                        path.push(ident.clone());
                        let report = CycleReport {
                            node: dep,
                            ident,
                            path,
                        };
                        return (order, Some(report));
                    }
                },
                None => {
                    if let Some((id, _)) = stack.pop() {
                        marks[id.index()] = Mark::Done;
                        order.push(id);
                    }
                }
            }
        }
    }

    (order, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn names(ordering: &Ordering<'_>) -> Vec<String> {
        ordering
            .ordered()
            .map(|n| n.node.ident().to_string())
            .collect()
    }

    #[test]
    fn nested_task_precedes_its_space() {
        let (contract, _) = parse("@S\n$T\n");
        let ordering = order(&contract);
        assert_eq!(names(&ordering), vec!["$T", "@S"]);
        assert!(ordering.is_complete());
        assert!(ordering.diagnostics.is_empty());
    }

    #[test]
    fn referenced_declarations_come_first() {
        let src = "@shop\n> uses $use(#boss)\n$sell\n> calls $pack()\n$pack\n#boss:AF\n";
        let (contract, _) = parse(src);
        let ordering = order(&contract);
        assert_eq!(names(&ordering), vec!["#boss", "$pack", "$sell", "@shop"]);
    }

    #[test]
    fn mutual_references_are_a_cycle() {
        let src = "@s\n$c\n$a\n> $b\n$b\n> $a\n";
        let (contract, _) = parse(src);
        let ordering = order(&contract);
        assert_eq!(names(&ordering), vec!["$c"]);
        let cycle = ordering.cycle.as_ref().unwrap();
        assert_eq!(cycle.ident, Identifier::task("a"));
        assert_eq!(cycle.to_string(), "$a \u{2192} $b \u{2192} $a");
        assert!(!ordering.is_complete());

        let last = ordering.diagnostics.last().unwrap();
        assert_eq!(
            last.kind,
            DiagnosticKind::DependencyCycle(Identifier::task("a"))
        );
        assert_eq!((last.line, last.col), (3, 0));
    }

    #[test]
    fn path_follows_both_spaces() {
        let (contract, _) = parse("=p:INVOKE(@a, @b)\n@a\n@b\n");
        let ordering = order(&contract);
        assert_eq!(names(&ordering), vec!["@a", "@b", "=p"]);
    }

    #[test]
    fn discarded_path_never_appears() {
        let (contract, _) = parse("@x\n=P:INVOKE(@x)\n");
        let ordering = order(&contract);
        assert_eq!(names(&ordering), vec!["@x"]);
        assert!(ordering.lookup(&Identifier::path("P")).is_none());
    }

    #[test]
    fn self_reference_is_not_a_cycle() {
        let (contract, _) = parse("#loop:AF\n> then $use(#loop) again\n");
        let ordering = order(&contract);
        assert!(ordering.cycle.is_none());
        assert!(ordering.nodes[0].deps.is_empty());
        assert_eq!(names(&ordering), vec!["#loop"]);
    }

    #[test]
    fn undeclared_reference_drops_only_that_edge() {
        let (contract, _) = parse("#a:AF\n> $ghost() and $use(#b)\n#b:DF\n");
        let ordering = order(&contract);
        assert_eq!(names(&ordering), vec!["#b", "#a"]);
        assert_eq!(ordering.diagnostics.len(), 1);
        let d = &ordering.diagnostics[0];
        assert_eq!(
            d.kind,
            DiagnosticKind::UndeclaredIdentifier(Identifier::task("ghost"))
        );
        assert_eq!((d.line, d.col), (2, 2));
        assert!(ordering.nodes[0].unresolved);
    }

    #[test]
    fn strict_mode_excludes_unresolved_nodes_and_dependents() {
        let src = "@s\n$t\n> $ghost()\n#free:AF\n";
        let (contract, _) = parse(src);
        let ordering = order_with(&contract, &OrderOptions { strict: true });
        assert_eq!(names(&ordering), vec!["#free"]);
        assert_eq!(ordering.excluded, vec![NodeId(0), NodeId(2)]);
        assert!(ordering.cycle.is_none());
    }

    #[test]
    fn path_to_missing_space_is_undeclared() {
        let (contract, _) = parse("@a\n=p:ATTEND(@a, @nowhere)\n");
        let ordering = order(&contract);
        assert_eq!(
            ordering.diagnostics[0].kind,
            DiagnosticKind::UndeclaredIdentifier(Identifier::space("nowhere"))
        );
        assert_eq!(names(&ordering), vec!["@a", "=p"]);
    }

    #[test]
    fn orphaned_duplicate_still_ordered() {
        let (contract, _) = parse("#a:AF\n#a:DF\n");
        let ordering = order(&contract);
        assert_eq!(ordering.order, vec![NodeId(0), NodeId(1)]);
        assert_eq!(
            ordering.diagnostics[0].kind,
            DiagnosticKind::DuplicateIdentifier(Identifier::agent("a"))
        );
    }

    #[test]
    fn data_refs_never_add_edges() {
        let (contract, _) = parse("#a:AF\n> reads %b\n#b:AF\n");
        let ordering = order(&contract);
        assert!(ordering.nodes[0].deps.is_empty());
        assert!(ordering.diagnostics.is_empty());
    }
}
