#![forbid(unsafe_code)]

mod cmd;
mod http;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "raves: epoch-guarded review feed browser",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags, env, and TTY state.
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Fetch and display grouped reviews",
        long_about = "Fetch one or more pages of reviews, reconcile them into a \
                      deduplicated list, and display them grouped by date.",
        after_help = "EXAMPLES:\n    # Latest reviews, grouped by date\n    rv list\n\n    # Search within 4-5 star reviews, three pages deep\n    rv list --keyword sync --stars 4,5 --pages 3\n\n    # Emit machine-readable output\n    rv list --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        about = "Show the match count for a filter",
        after_help = "EXAMPLES:\n    # How many 1-star reviews mention billing?\n    rv summary --keyword billing --stars 1"
    )]
    Summary(cmd::summary::SummaryArgs),

    #[command(about = "Generate shell completions")]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RAVES_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "raves=debug,info"
        } else {
            "raves=info,warn"
        })
    });

    let format = env::var("RAVES_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();

    match cli.command {
        Commands::List(ref args) => cmd::list::run_list(args, output),
        Commands::Summary(ref args) => cmd::summary::run_summary(args, output),
        Commands::Completions(ref args) => {
            cmd::completions::run_completions(args, &mut Cli::command());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_global_format_flag() {
        let cli = Cli::parse_from(["rv", "list", "--format", "json"]);
        assert_eq!(cli.output_mode(), OutputMode::Json);
    }

    #[test]
    fn hidden_json_alias_still_works() {
        let cli = Cli::parse_from(["rv", "summary", "--json"]);
        assert_eq!(cli.output_mode(), OutputMode::Json);
    }

    #[test]
    fn verify_cli_definition() {
        Cli::command().debug_assert();
    }
}
