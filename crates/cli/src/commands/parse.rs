use std::path::Path;

use anglish_core::{AgentDecl, Decl, Param, PathDecl, SpaceDecl, TaskDecl, VibeBlock};

use super::{diagnostics_json, load_contract, print_json, warn_diagnostics, Context};
use crate::OutputFormat;

pub(crate) fn cmd_parse(file: &Path, ctx: &Context) {
    let (contract, diagnostics) = load_contract(file, ctx);

    match ctx.output {
        OutputFormat::Json => {
            let tree = serde_json::to_value(&contract)
                .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }));
            print_json(&serde_json::json!({
                "contract": tree,
                "diagnostics": diagnostics_json(&diagnostics),
            }));
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for decl in &contract.decls {
                match decl {
                    Decl::Space(s) => write_space(&mut out, s),
                    Decl::Agent(a) => write_agent(&mut out, a, 0),
                    Decl::Path(p) => write_path(&mut out, p),
                }
            }
            print!("{}", out);
            warn_diagnostics(&diagnostics, ctx);
        }
    }
}

fn params_suffix(params: &[Param]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let list: Vec<String> = params.iter().map(Param::to_string).collect();
    format!(" ({})", list.join(", "))
}

fn header(out: &mut String, depth: usize, text: String, line_start: u32, line_end: u32) {
    out.push_str(&format!(
        "{}{}  [{}-{}]\n",
        "  ".repeat(depth),
        text,
        line_start,
        line_end
    ));
}

fn write_vibe(out: &mut String, vibe: &VibeBlock, depth: usize) {
    for line in &vibe.prose {
        out.push_str(&format!("{}> {}\n", "  ".repeat(depth + 1), line));
    }
}

fn write_space(out: &mut String, s: &SpaceDecl) {
    let replicable = if s.replicable { ":REPLICABLE" } else { "" };
    let text = format!(
        "{}:{}{}{}",
        s.ident,
        s.space_type.as_str(),
        replicable,
        params_suffix(&s.params)
    );
    header(out, 0, text, s.line_start, s.line_end);
    write_vibe(out, &s.vibe, 0);
    for a in &s.agents {
        write_agent(out, a, 1);
    }
    for t in &s.tasks {
        write_task(out, t, 1);
    }
}

fn write_agent(out: &mut String, a: &AgentDecl, depth: usize) {
    let text = format!(
        "{}:{}{}",
        a.ident,
        a.agent_type.as_str(),
        params_suffix(&a.params)
    );
    header(out, depth, text, a.line_start, a.line_end);
    write_vibe(out, &a.vibe, depth);
}

fn write_task(out: &mut String, t: &TaskDecl, depth: usize) {
    let text = format!("{}{}", t.ident, params_suffix(&t.params));
    header(out, depth, text, t.line_start, t.line_end);
    write_vibe(out, &t.vibe, depth);
}

fn write_path(out: &mut String, p: &PathDecl) {
    let text = format!(
        "{}:{}(@{}, @{})",
        p.ident,
        p.path_type.as_str(),
        p.source.name,
        p.dest.name
    );
    header(out, 0, text, p.line_start, p.line_end);
    write_vibe(out, &p.vibe, 0);
}
