mod commands;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Plant disease diagnosis with certainty factors.
#[derive(Parser)]
#[command(
    name = "verdant",
    version,
    about = "Plant disease diagnosis with certainty factors"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the knowledge base comes from.
#[derive(Args, Debug, Clone)]
pub(crate) struct SourceArgs {
    /// Path to the catalog JSON file
    #[arg(long)]
    pub(crate) catalog: PathBuf,
    /// Path to an engine config TOML file (default: ./verdant.toml if present)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose diseases from observed symptoms
    Diagnose {
        #[command(flatten)]
        source: SourceArgs,
        /// Comma-separated observed symptom ids, e.g. 1,4,7
        #[arg(long, value_delimiter = ',')]
        symptoms: Vec<u32>,
        /// Append the top diagnosis to this JSON-lines history file
        #[arg(long)]
        record: Option<PathBuf>,
        /// User name stored with the history record
        #[arg(long, default_value = "Guest")]
        user: String,
        /// List rules that did not fire
        #[arg(long)]
        show_skipped: bool,
    },

    /// Explain how a disease reached its certainty
    ///
    /// With --trace, replays the trace saved from `diagnose --output json`.
    /// Otherwise re-runs inference over the current catalog.
    Explain {
        /// Path to the catalog JSON file (required without --trace)
        #[arg(long, required_unless_present = "trace")]
        catalog: Option<PathBuf>,
        /// Path to an engine config TOML file (default: ./verdant.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Saved `diagnose --output json` session to replay
        #[arg(long)]
        trace: Option<PathBuf>,
        /// Comma-separated observed symptom ids (ignored with --trace)
        #[arg(long, value_delimiter = ',')]
        symptoms: Vec<u32>,
        /// Disease id to explain
        #[arg(long)]
        disease: u32,
    },

    /// List active treatments for a disease
    Treatments {
        #[command(flatten)]
        source: SourceArgs,
        /// Disease id
        #[arg(long)]
        disease: u32,
    },

    /// List active preventions for a disease
    Preventions {
        #[command(flatten)]
        source: SourceArgs,
        /// Disease id
        #[arg(long)]
        disease: u32,
    },

    /// List knowledge base rules and the rules excluded as malformed
    Rules {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show recorded diagnoses, newest first
    History {
        /// Path to the JSON-lines history file
        #[arg(long)]
        history: PathBuf,
        /// Maximum number of records (0 = all)
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    let output = cli.output;
    let quiet = cli.quiet;
    logging::init_tracing(quiet);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("error: failed to create tokio runtime: {}", e),
                output,
                quiet,
            );
            process::exit(1);
        }
    };

    let result = rt.block_on(async {
        match cli.command {
            Commands::Diagnose {
                source,
                symptoms,
                record,
                user,
                show_skipped,
            } => {
                commands::diagnose::cmd_diagnose(
                    &source,
                    &symptoms,
                    record.as_deref(),
                    &user,
                    show_skipped,
                    output,
                    quiet,
                )
                .await
            }
            Commands::Explain {
                catalog,
                config,
                trace,
                symptoms,
                disease,
            } => {
                let source = catalog.map(|catalog| SourceArgs {
                    catalog,
                    config: config.clone(),
                });
                commands::explain::cmd_explain(
                    source.as_ref(),
                    config.as_deref(),
                    &symptoms,
                    trace.as_deref(),
                    disease,
                    output,
                    quiet,
                )
                .await
            }
            Commands::Treatments { source, disease } => {
                commands::catalog::cmd_treatments(&source, disease, output, quiet).await
            }
            Commands::Preventions { source, disease } => {
                commands::catalog::cmd_preventions(&source, disease, output, quiet).await
            }
            Commands::Rules { source } => {
                commands::catalog::cmd_rules(&source, output, quiet).await
            }
            Commands::History { history, limit } => {
                commands::history::cmd_history(&history, limit, output, quiet).await
            }
        }
    });

    if let Err(msg) = result {
        report_error(&msg, output, quiet);
        process::exit(1);
    }
}

/// Print an error to stderr in the selected output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

/// Pretty-print a JSON value to stdout.
pub(crate) fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!("{}", value),
    }
}
