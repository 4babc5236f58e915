use std::path::Path;
use std::process;

use anglish_core::order_with;

use super::{diagnostics_json, load_contract, print_json, Context};
use crate::OutputFormat;

pub(crate) fn cmd_check(file: &Path, ctx: &Context) {
    let (contract, mut diagnostics) = load_contract(file, ctx);
    let ordering = order_with(&contract, &ctx.settings.order);
    diagnostics.extend(ordering.diagnostics.iter().cloned());

    let ok = diagnostics.is_empty();
    match ctx.output {
        OutputFormat::Json => {
            print_json(&serde_json::json!({
                "file": file.display().to_string(),
                "ok": ok,
                "diagnostics": diagnostics_json(&diagnostics),
            }));
        }
        OutputFormat::Text => {
            for d in &diagnostics {
                println!("{}", d.render());
            }
            if ok && !ctx.quiet {
                println!("{}: ok", file.display());
            }
        }
    }

    if !ok {
        process::exit(1);
    }
}
