pub(crate) mod check;
pub(crate) mod order;
pub(crate) mod parse;
pub(crate) mod prompt;

use std::path::Path;
use std::process;

use anglish_core::{parse_bytes, Contract, Diagnostic};

use crate::config::Settings;
use crate::{report_error, OutputFormat};

/// Global flags and resolved settings shared by every subcommand.
pub(crate) struct Context {
    pub output: OutputFormat,
    pub quiet: bool,
    pub settings: Settings,
}

/// Read and parse `file`, exiting on I/O failure. Parse diagnostics are
/// returned, never fatal.
pub(crate) fn load_contract(file: &Path, ctx: &Context) -> (Contract, Vec<Diagnostic>) {
    let bytes = match std::fs::read(file) {
        Ok(b) => b,
        Err(e) => {
            let msg = format!("error reading '{}': {}", file.display(), e);
            report_error(&msg, ctx.output, ctx.quiet);
            process::exit(1);
        }
    };
    tracing::debug!(file = %file.display(), bytes = bytes.len(), "read source");
    parse_bytes(&bytes, &ctx.settings.parse)
}

pub(crate) fn diagnostics_json(diags: &[Diagnostic]) -> serde_json::Value {
    serde_json::Value::Array(diags.iter().map(Diagnostic::to_json_value).collect())
}

/// Text mode: diagnostics on stderr, one per line, unless `--quiet`.
pub(crate) fn warn_diagnostics(diags: &[Diagnostic], ctx: &Context) {
    if ctx.quiet || ctx.output != OutputFormat::Text {
        return;
    }
    for d in diags {
        eprintln!("{}", d.render());
    }
}

pub(crate) fn print_json(value: &serde_json::Value) {
    let pretty =
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}
