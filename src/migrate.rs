use clap::Args;
use compass_acquisitions::cms::SanityClient;
use compass_acquisitions::config::AppConfig;
use compass_acquisitions::error::AppError;
use compass_acquisitions::workflows::migration::{LegacyApiClient, LegacyMigration};
use compass_acquisitions::workflows::RunMode;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub(crate) struct MigrateArgs {
    /// Fetch and transform every record without writing to the CMS
    #[arg(long)]
    pub(crate) dry_run: bool,
}

pub(crate) fn run_migrate(args: MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    let mode = RunMode::from_flag(!args.dry_run);
    if mode.is_live() {
        config.cms.require_write_token()?;
    }

    let source = LegacyApiClient::new(&config.legacy)?;
    let cms = SanityClient::new(config.cms.clone())?;
    let summary = LegacyMigration::new(&source, &cms).run(mode);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write!(out, "{summary}")?;
    Ok(())
}
