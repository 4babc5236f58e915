use std::path::Path;
use std::process;

use anglish_core::order_with;

use super::{diagnostics_json, load_contract, print_json, warn_diagnostics, Context};
use crate::llm::{CompletionProvider, OpenAiClient};
use crate::prompt::{build_requests, render_fields, PromptRequest, SystemPrompts};
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_prompt(file: &Path, node: Option<&str>, dry_run: bool, ctx: &Context) {
    let (contract, mut diagnostics) = load_contract(file, ctx);
    let ordering = order_with(&contract, &ctx.settings.order);
    diagnostics.extend(ordering.diagnostics.iter().cloned());
    warn_diagnostics(&diagnostics, ctx);

    if let Some(cycle) = &ordering.cycle {
        report_error(
            &format!("cannot build prompts, dependency cycle: {}", cycle),
            ctx.output,
            ctx.quiet,
        );
        process::exit(1);
    }

    let requests = build_requests(&ordering, node);
    if let Some(want) = node {
        if requests.is_empty() {
            report_error(&format!("no node named '{}'", want), ctx.output, ctx.quiet);
            process::exit(1);
        }
    }

    let prompts = match SystemPrompts::load(ctx.settings.prompts.dir.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            report_error(&e.to_string(), ctx.output, ctx.quiet);
            process::exit(1);
        }
    };

    if dry_run {
        print_dry_run(&requests, &prompts, &diagnostics, ctx);
        return;
    }

    let client = match OpenAiClient::from_config(&ctx.settings.endpoint) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), ctx.output, ctx.quiet);
            process::exit(1);
        }
    };

    let mut replies = Vec::with_capacity(requests.len());
    for req in &requests {
        tracing::info!(node = %req.ident, model = client.model(), "generating");
        match client.complete(prompts.text(req.system), &req.fields) {
            Ok(text) => {
                if ctx.output == OutputFormat::Text {
                    println!("=== {} ===", req.ident);
                    println!("{}", text.trim_end());
                    println!();
                }
                replies.push(serde_json::json!({
                    "ident": req.ident.to_string(),
                    "reply": text,
                }));
            }
            Err(e) => {
                report_error(
                    &format!("completion for {} failed: {}", req.ident, e),
                    ctx.output,
                    ctx.quiet,
                );
                process::exit(1);
            }
        }
    }

    if ctx.output == OutputFormat::Json {
        print_json(&serde_json::json!({
            "model": client.model(),
            "replies": replies,
            "diagnostics": diagnostics_json(&diagnostics),
        }));
    }
}

fn print_dry_run(
    requests: &[PromptRequest],
    prompts: &SystemPrompts,
    diagnostics: &[anglish_core::Diagnostic],
    ctx: &Context,
) {
    match ctx.output {
        OutputFormat::Json => {
            let reqs: Vec<serde_json::Value> = requests
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "ident": r.ident.to_string(),
                        "system": r.system,
                        "system_prompt": prompts.text(r.system),
                        "fields": r.fields,
                    })
                })
                .collect();
            print_json(&serde_json::json!({
                "requests": reqs,
                "diagnostics": diagnostics_json(diagnostics),
            }));
        }
        OutputFormat::Text => {
            for req in requests {
                println!("=== {} ===", req.ident);
                if !ctx.quiet {
                    println!("[system] {}", prompts.text(req.system));
                }
                println!("{}", render_fields(&req.fields));
                println!();
            }
        }
    }
}
