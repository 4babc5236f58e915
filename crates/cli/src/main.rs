mod commands;
mod config;
mod llm;
mod prompt;

use std::path::PathBuf;
use std::process;

use anglish_core::PathRefMode;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::commands::Context;
use crate::config::Settings;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// How `=name` in vibe prose is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PathRefs {
    /// A data reference, like `%name`
    Data,
    /// A reference to a path declaration, ordered like any other
    Path,
}

impl From<PathRefs> for PathRefMode {
    fn from(p: PathRefs) -> Self {
        match p {
            PathRefs::Data => PathRefMode::Data,
            PathRefs::Path => PathRefMode::Path,
        }
    }
}

/// Anglish contract language toolchain.
#[derive(Parser)]
#[command(name = "anglish", version, about = "Anglish contract language toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Config file (default: ./anglish.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override how `=name` in prose is read
    #[arg(long, global = true, value_enum)]
    path_refs: Option<PathRefs>,

    /// Leave nodes with unresolved references out of the order
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and order a contract, reporting every diagnostic
    Check {
        /// Path to the .anglish source file
        file: PathBuf,
    },

    /// Print the parsed contract
    Parse {
        /// Path to the .anglish source file
        file: PathBuf,
    },

    /// Print declarations in dependency order with their dependencies
    Order {
        /// Path to the .anglish source file
        file: PathBuf,
    },

    /// Build code generation prompts and send them to the completion endpoint
    Prompt {
        /// Path to the .anglish source file
        file: PathBuf,
        /// Only this node (`$name` or bare `name`)
        #[arg(long)]
        node: Option<String>,
        /// Print the prompts instead of sending them
        #[arg(long)]
        dry_run: bool,
        /// Model name (overrides OPENAI_MODEL and the config file)
        #[arg(long)]
        model: Option<String>,
        /// Endpoint base URL (overrides OPENAI_BASE_URL and the config file)
        #[arg(long)]
        base_url: Option<String>,
        /// Directory holding func_space_agent_system.md and ui_space_agent_system.md
        #[arg(long)]
        prompts: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing();
    // A local .env may carry the OPENAI_* variables.
    dotenvy::dotenv().ok();

    let mut settings = match Settings::load(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    if let Some(mode) = cli.path_refs {
        settings.parse.path_refs = mode.into();
    }
    if cli.strict {
        settings.order.strict = true;
    }

    let ctx = Context {
        output: cli.output,
        quiet: cli.quiet,
        settings,
    };

    match cli.command {
        Commands::Check { file } => commands::check::cmd_check(&file, &ctx),
        Commands::Parse { file } => commands::parse::cmd_parse(&file, &ctx),
        Commands::Order { file } => commands::order::cmd_order(&file, &ctx),
        Commands::Prompt {
            file,
            node,
            dry_run,
            model,
            base_url,
            prompts,
        } => {
            let mut ctx = ctx;
            if let Some(m) = model {
                ctx.settings.endpoint.model = Some(m);
            }
            if let Some(u) = base_url {
                ctx.settings.endpoint.base_url = Some(u);
            }
            if let Some(dir) = prompts {
                ctx.settings.prompts.dir = Some(dir);
            }
            commands::prompt::cmd_prompt(&file, node.as_deref(), dry_run, &ctx);
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
