mod audit;
mod cli;
mod migrate;

use compass_acquisitions::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
