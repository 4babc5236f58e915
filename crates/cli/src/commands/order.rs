use std::path::Path;
use std::process;

use anglish_core::{order_with, GraphNode, Ordering};

use super::{diagnostics_json, load_contract, print_json, warn_diagnostics, Context};
use crate::OutputFormat;

pub(crate) fn cmd_order(file: &Path, ctx: &Context) {
    let (contract, mut diagnostics) = load_contract(file, ctx);
    let ordering = order_with(&contract, &ctx.settings.order);
    diagnostics.extend(ordering.diagnostics.iter().cloned());

    match ctx.output {
        OutputFormat::Json => {
            let order: Vec<serde_json::Value> = ordering
                .ordered()
                .map(|n| node_json(&ordering, n))
                .collect();
            let excluded: Vec<String> = ordering
                .excluded
                .iter()
                .map(|&id| ordering.node(id).node.ident().to_string())
                .collect();
            print_json(&serde_json::json!({
                "order": order,
                "cycle": ordering.cycle.as_ref().map(|c| c.to_string()),
                "excluded": excluded,
                "diagnostics": diagnostics_json(&diagnostics),
            }));
        }
        OutputFormat::Text => {
            for (i, n) in ordering.ordered().enumerate() {
                let deps = dep_names(&ordering, n);
                if deps.is_empty() {
                    println!("{}. {}", i + 1, n.node.ident());
                } else {
                    println!("{}. {} <- {}", i + 1, n.node.ident(), deps.join(", "));
                }
            }
            if !ordering.excluded.is_empty() && !ctx.quiet {
                let names: Vec<String> = ordering
                    .excluded
                    .iter()
                    .map(|&id| ordering.node(id).node.ident().to_string())
                    .collect();
                println!("excluded: {}", names.join(", "));
            }
            warn_diagnostics(&diagnostics, ctx);
            if let Some(cycle) = &ordering.cycle {
                if !ctx.quiet {
                    eprintln!("cycle: {}", cycle);
                }
            }
        }
    }

    if ordering.cycle.is_some() {
        process::exit(1);
    }
}

fn dep_names(ordering: &Ordering<'_>, n: &GraphNode<'_>) -> Vec<String> {
    n.deps
        .iter()
        .map(|&d| ordering.node(d).node.ident().to_string())
        .collect()
}

fn node_json(ordering: &Ordering<'_>, n: &GraphNode<'_>) -> serde_json::Value {
    serde_json::json!({
        "id": n.id,
        "ident": n.node.ident().to_string(),
        "kind": n.node.kind().as_str(),
        "parent": n.parent.map(|p| ordering.node(p).node.ident().to_string()),
        "deps": dep_names(ordering, n),
        "line_start": n.node.line_start(),
        "line_end": n.node.line_end(),
    })
}
