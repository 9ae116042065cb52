use crate::audit::{run_audit, run_normalize, AuditArgs, NormalizeArgs};
use crate::migrate::{run_migrate, MigrateArgs};
use clap::{Parser, Subcommand};
use compass_acquisitions::config::AppConfig;
use compass_acquisitions::error::AppError;
use compass_acquisitions::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "compass-audit",
    about = "Reconcile the acquisitions spreadsheet with the website CMS",
    version
)]
struct Cli {
    /// Log debug detail for this tool (RUST_LOG still takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare the spreadsheet with CMS documents and optionally write fixes
    Audit(AuditArgs),
    /// Print the normalized spreadsheet records as JSON without contacting the CMS
    Normalize(NormalizeArgs),
    /// Copy legacy content collections into the CMS
    Migrate(MigrateArgs),
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    if cli.verbose {
        config.telemetry.log_level = "debug".to_string();
    }
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Audit(args) => run_audit(args, &config),
        Command::Normalize(args) => run_normalize(args),
        Command::Migrate(args) => run_migrate(args, &config),
    }
}
