use crate::cms::CmsError;
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::acquisitions::{MappingError, SpreadsheetError};
use crate::workflows::migration::MigrationError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Spreadsheet(SpreadsheetError),
    Mapping(MappingError),
    Cms(CmsError),
    Migration(MigrationError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Spreadsheet(err) => write!(f, "spreadsheet error: {}", err),
            AppError::Mapping(err) => write!(f, "mapping error: {}", err),
            AppError::Cms(err) => write!(f, "cms error: {}", err),
            AppError::Migration(err) => write!(f, "migration error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Spreadsheet(err) => Some(err),
            AppError::Mapping(err) => Some(err),
            AppError::Cms(err) => Some(err),
            AppError::Migration(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SpreadsheetError> for AppError {
    fn from(value: SpreadsheetError) -> Self {
        Self::Spreadsheet(value)
    }
}

impl From<MappingError> for AppError {
    fn from(value: MappingError) -> Self {
        Self::Mapping(value)
    }
}

impl From<CmsError> for AppError {
    fn from(value: CmsError) -> Self {
        Self::Cms(value)
    }
}

impl From<MigrationError> for AppError {
    fn from(value: MigrationError) -> Self {
        Self::Migration(value)
    }
}
