use clap::Args;
use compass_acquisitions::cms::SanityClient;
use compass_acquisitions::config::AppConfig;
use compass_acquisitions::error::AppError;
use compass_acquisitions::workflows::acquisitions::{
    ApplyOptions, AuditReport, AuditSession, Normalizer, ReconciliationMappings, SourceRecord,
    SpreadsheetReader,
};
use compass_acquisitions::workflows::RunMode;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Args, Debug)]
pub(crate) struct AuditArgs {
    /// Acquisitions spreadsheet (.xlsx, .csv or .json export)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Worksheet to read (defaults to "Acquisitions", then the first sheet)
    #[arg(long)]
    pub(crate) sheet: Option<String>,
    /// TOML file extending the built-in agent, region and title mappings
    #[arg(long)]
    pub(crate) mappings: Option<PathBuf>,
    /// Write patches and new documents to the CMS (default is a dry run)
    #[arg(long, alias = "fix")]
    pub(crate) apply: bool,
    /// Also write prices recovered by the digit-grouping repair
    #[arg(long)]
    pub(crate) accept_repaired_prices: bool,
    /// Also patch documents matched only on leading title tokens
    #[arg(long)]
    pub(crate) accept_token_matches: bool,
}

#[derive(Args, Debug)]
pub(crate) struct NormalizeArgs {
    /// Acquisitions spreadsheet (.xlsx, .csv or .json export)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Worksheet to read (defaults to "Acquisitions", then the first sheet)
    #[arg(long)]
    pub(crate) sheet: Option<String>,
    /// TOML file extending the built-in mappings
    #[arg(long)]
    pub(crate) mappings: Option<PathBuf>,
}

pub(crate) fn run_audit(args: AuditArgs, config: &AppConfig) -> Result<(), AppError> {
    let mode = RunMode::from_flag(args.apply);
    if mode.is_live() {
        config.cms.require_write_token()?;
    }

    let mappings = load_mappings(args.mappings.as_deref())?;
    let rows = read_rows(&args.input, args.sheet.as_deref())?;

    let client = SanityClient::new(config.cms.clone())?;
    let options = ApplyOptions {
        accept_repaired_prices: args.accept_repaired_prices,
        accept_token_matches: args.accept_token_matches,
    };
    let run = AuditSession::new(&client, &mappings).run(&rows, mode, options)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write!(out, "{}", AuditReport::new(&run.outcome, mode))?;
    if let Some(summary) = &run.applied {
        writeln!(out)?;
        writeln!(out, "Applying changes:")?;
        write!(out, "{summary}")?;
        if summary.failed > 0 {
            warn!(failed = summary.failed, "some CMS writes failed");
        }
    }
    Ok(())
}

pub(crate) fn run_normalize(args: NormalizeArgs) -> Result<(), AppError> {
    let mappings = load_mappings(args.mappings.as_deref())?;
    let rows = read_rows(&args.input, args.sheet.as_deref())?;

    let sheet = Normalizer::new(&mappings).normalize_all(&rows);
    for issue in &sheet.issues {
        warn!(row = issue.row, "{issue}");
    }

    let rendered = serde_json::to_string_pretty(&sheet.records)
        .map_err(|err| AppError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{rendered}")?;
    Ok(())
}

fn load_mappings(path: Option<&Path>) -> Result<ReconciliationMappings, AppError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading mapping overrides");
            Ok(ReconciliationMappings::from_path(path)?)
        }
        None => Ok(ReconciliationMappings::default()),
    }
}

fn read_rows(input: &Path, sheet: Option<&str>) -> Result<Vec<SourceRecord>, AppError> {
    let rows = SpreadsheetReader::from_path(input, sheet)?;
    info!(path = %input.display(), rows = rows.len(), "read spreadsheet");
    Ok(rows)
}
