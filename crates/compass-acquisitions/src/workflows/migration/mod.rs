//! One-off import of legacy content collections into the CMS.

mod source;
mod transform;

pub use source::{LegacyApiClient, LegacySource};
pub use transform::to_document;

use std::fmt;
use tracing::{info, warn};

use crate::cms::CmsGateway;
use crate::http::HttpError;
use crate::workflows::RunMode;

/// Failures listed individually in the summary; the rest are only counted.
pub const MAX_LISTED_FAILURES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyEntity {
    BlogPost,
    Acquisition,
    TeamMember,
    Testimonial,
    CaseStudy,
}

impl LegacyEntity {
    pub const ALL: [LegacyEntity; 5] = [
        Self::BlogPost,
        Self::Acquisition,
        Self::TeamMember,
        Self::Testimonial,
        Self::CaseStudy,
    ];

    /// Collection name in the legacy entity API.
    pub const fn api_name(self) -> &'static str {
        match self {
            Self::BlogPost => "BlogPost",
            Self::Acquisition => "Acquisition",
            Self::TeamMember => "TeamMember",
            Self::Testimonial => "Testimonial",
            Self::CaseStudy => "CaseStudy",
        }
    }

    /// CMS `_type`, also used as the `_id` prefix.
    pub const fn document_type(self) -> &'static str {
        match self {
            Self::BlogPost => "blogPost",
            Self::Acquisition => "acquisition",
            Self::TeamMember => "teamMember",
            Self::Testimonial => "testimonial",
            Self::CaseStudy => "caseStudy",
        }
    }
}

impl fmt::Display for LegacyEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("could not fetch {entity}: {source}")]
    Fetch {
        entity: LegacyEntity,
        #[source]
        source: HttpError,
    },
    #[error("legacy client unavailable: {0}")]
    Client(#[source] HttpError),
    #[error("{entity} record is not a JSON object")]
    NotAnObject { entity: LegacyEntity },
    #[error("{entity} record has no id")]
    MissingId { entity: LegacyEntity },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCount {
    pub entity: LegacyEntity,
    pub fetched: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFailure {
    pub entity: LegacyEntity,
    pub id: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct MigrationSummary {
    pub mode: RunMode,
    pub entities: Vec<EntityCount>,
    pub skipped: Vec<(LegacyEntity, String)>,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<MigrationFailure>,
}

impl MigrationSummary {
    fn record_failure(&mut self, entity: LegacyEntity, id: String, error: String) {
        warn!(%entity, %id, %error, "document not migrated");
        self.failed += 1;
        self.failures.push(MigrationFailure { entity, id, error });
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for count in &self.entities {
            writeln!(f, "{}: {} records found", count.entity, count.fetched)?;
        }
        for (entity, error) in &self.skipped {
            writeln!(f, "{entity}: skipped ({error})")?;
        }
        writeln!(f, "-----------------------------------------")?;
        let verb = if self.mode.is_live() {
            "imported"
        } else {
            "ready to import (dry run)"
        };
        writeln!(f, "Success: {} documents {verb}", self.succeeded)?;
        if self.failed > 0 {
            writeln!(f, "Failed:  {} documents", self.failed)?;
            for failure in self.failures.iter().take(MAX_LISTED_FAILURES) {
                writeln!(f, "  {} {}: {}", failure.entity, failure.id, failure.error)?;
            }
        }
        Ok(())
    }
}

/// Fetches every legacy collection and upserts the transformed documents.
#[derive(Debug)]
pub struct LegacyMigration<'a> {
    source: &'a dyn LegacySource,
    cms: &'a dyn CmsGateway,
}

impl<'a> LegacyMigration<'a> {
    pub fn new(source: &'a dyn LegacySource, cms: &'a dyn CmsGateway) -> Self {
        Self { source, cms }
    }

    pub fn run(&self, mode: RunMode) -> MigrationSummary {
        let mut summary = MigrationSummary {
            mode,
            ..MigrationSummary::default()
        };

        for entity in LegacyEntity::ALL {
            let records = match self.source.fetch(entity) {
                Ok(records) => records,
                Err(err) => {
                    warn!(%entity, error = %err, "skipping legacy collection");
                    summary.skipped.push((entity, err.to_string()));
                    continue;
                }
            };
            info!(%entity, count = records.len(), "fetched legacy records");
            summary.entities.push(EntityCount {
                entity,
                fetched: records.len(),
            });

            for record in &records {
                let id = record
                    .get("id")
                    .map(|id| id.as_str().map_or_else(|| id.to_string(), str::to_string))
                    .unwrap_or_else(|| "(no id)".to_string());

                let document = match to_document(entity, record) {
                    Ok(document) => document,
                    Err(err) => {
                        summary.record_failure(entity, id, err.to_string());
                        continue;
                    }
                };

                if !mode.is_live() {
                    summary.succeeded += 1;
                    continue;
                }

                match self.cms.create_or_replace(&document) {
                    Ok(_) => summary.succeeded += 1,
                    Err(err) => summary.record_failure(entity, id, err.to_string()),
                }
            }
        }

        summary
    }
}
