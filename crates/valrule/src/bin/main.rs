//! valrule command-line interface

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use valrule::cli::{check, details, logging, output, run};

/// Validation rule evaluation tool
#[derive(Parser)]
#[command(name = "valrule")]
#[command(author, version, about = "Evaluate validation rules against aggregate data", long_about = None)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Log format
    #[arg(long, value_enum, default_value_t = logging::LogFormat::Compact, global = true)]
    log_format: logging::LogFormat,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = output::OutputFormat::Pretty, global = true)]
    format: output::OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output
    #[arg(long, value_enum, default_value_t = output::ColorMode::Auto, global = true)]
    color: output::ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a run file and report violations
    Run {
        /// Run file (JSON)
        file: PathBuf,
    },

    /// Show the operand values behind one rule instance
    Details {
        /// Run file (JSON)
        file: PathBuf,

        /// Rule id
        #[arg(long)]
        rule: String,

        /// ISO period, e.g. 202401
        #[arg(long)]
        period: String,

        /// Org unit id
        #[arg(long)]
        org_unit: String,

        /// Attribute option combo (default: the metadata's default combo)
        #[arg(long)]
        attribute_combo: Option<String>,
    },

    /// Parse every rule expression without evaluating data
    Check {
        /// Run file (JSON)
        file: PathBuf,
    },
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run { file } => {
            let config = run::RunConfig {
                file,
                format: cli.format,
                output_file: cli.output,
            };
            run::run(config).await.map(|_| ())
        }

        Commands::Details {
            file,
            rule,
            period,
            org_unit,
            attribute_combo,
        } => {
            let config = details::DetailsConfig {
                file,
                rule,
                period,
                org_unit,
                attribute_combo,
                format: cli.format,
                output_file: cli.output,
            };
            details::details(config).await.map(|_| ())
        }

        Commands::Check { file } => check::check(check::CheckConfig { file }),
    }
}

#[tokio::main]
async fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    output::setup_colors(cli.color);

    let log_config = logging::LogConfig::from_verbosity(cli.verbose)
        .with_format(cli.log_format)
        .with_ansi(cli.color != output::ColorMode::Never && io::stderr().is_terminal());
    if let Err(e) = logging::init_logging(&log_config) {
        eprintln!("{}", output::format_warning(&format!("logging disabled: {e}")));
    }

    if let Err(e) = dispatch(cli).await {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
