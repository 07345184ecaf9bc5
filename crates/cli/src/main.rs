// refaudit - referral reconciliation audit (CLI)

mod audit;
mod exit_codes;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "refaudit")]
#[command(about = "Reconcile referrals against logs, rewards and payments, and flag invalid ones")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the audit and write the referral report
    #[command(after_help = "\
Examples:
  refaudit run
  refaudit run --config audit.toml
  refaudit run --data-dir exports/2024-05 --output-dir reports
  refaudit run --config audit.toml --json > summary.json
  REFAUDIT_LOG=refaudit_recon=debug refaudit run --config audit.toml")]
    Run {
        /// Path to the audit TOML config (defaults apply when omitted)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Directory holding the input CSV files (overrides [input] dir)
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,

        /// Directory the report is written to (overrides [output] dir)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Print the run summary as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write the run summary as JSON to a file
        #[arg(long, value_name = "PATH")]
        summary: Option<PathBuf>,

        /// Only log warnings and errors
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Validate an audit config without running
    #[command(after_help = "\
Examples:
  refaudit validate audit.toml")]
    Validate {
        /// Path to the audit TOML config
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            // Help and version go to stdout and exit 0
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    let result = match cli.command {
        Commands::Run {
            config,
            data_dir,
            output_dir,
            json,
            summary,
            quiet,
        } => {
            logging::init_logging(quiet);
            audit::cmd_run(audit::RunArgs {
                config,
                data_dir,
                output_dir,
                json,
                summary,
            })
        }
        Commands::Validate { config } => {
            logging::init_logging(false);
            audit::cmd_validate(config)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}
