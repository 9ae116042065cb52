mod apply;
mod diff;
mod domain;
mod mapping;
mod matcher;
mod normalizer;
mod parser;
mod report;

pub use apply::{ApplyEntry, ApplyOptions, ApplyStatus, ApplySummary, AuditApplier, HoldReason, WriteAction};
pub use diff::{build_create_payload, patch_set, FieldPatch, FieldValue, PatchBuilder, PRICE_TOLERANCE};
pub use domain::{
    AustralianState, CanonicalRecord, LandSize, LandUnit, Lga, MarketVisibility, PropertyType,
    RawCell, RemoteRecord, SourceRecord,
};
pub use mapping::{MappingError, MappingOverrides, ReconciliationMappings, RegionMapping};
pub use matcher::{MatchHit, MatchKind, TitleMatcher};
pub use normalizer::{
    format_price_display, make_slug, normalize_count, normalize_date, normalize_land_size,
    normalize_market_visibility, normalize_price, normalize_property_type, normalize_timeframe,
    normalize_title, DataIssue, DataIssueKind, NormalizedSheet, Normalizer, PriceOutcome,
    MAX_PLAUSIBLE_PRICE, MIN_PLAUSIBLE_PRICE,
};
pub use parser::{SpreadsheetError, SpreadsheetReader, PREFERRED_SHEET};
pub use report::AuditReport;

use std::collections::HashSet;
use tracing::{info, warn};

use crate::cms::{CmsError, CmsGateway};
use crate::workflows::RunMode;

#[derive(Debug, Clone)]
pub struct MatchedRecord {
    pub record: CanonicalRecord,
    pub remote: RemoteRecord,
    pub kind: MatchKind,
    pub patches: Vec<FieldPatch>,
}

#[derive(Debug, Clone)]
pub enum MatchResult {
    Matched(MatchedRecord),
    /// In the sheet, not in the CMS.
    Missing(CanonicalRecord),
    /// In the CMS, not in the sheet. Reported only.
    Orphaned(RemoteRecord),
}

/// CMS documents whose content still needs attention, independent of the
/// sheet comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentGaps {
    pub missing_excerpt: Vec<String>,
    pub missing_image: Vec<String>,
    pub legacy_images: Vec<String>,
}

impl ContentGaps {
    pub fn collect(remotes: &[RemoteRecord], legacy_host: &str) -> Self {
        let mut gaps = Self::default();
        for remote in remotes {
            let title = remote.display_title().to_string();
            if remote.excerpt.as_deref().map_or(true, |text| text.trim().is_empty()) {
                gaps.missing_excerpt.push(title.clone());
            }
            match remote.main_image_url.as_deref().map(str::trim) {
                None | Some("") => gaps.missing_image.push(title),
                Some(url) if !legacy_host.is_empty() && url.contains(legacy_host) => {
                    gaps.legacy_images.push(title)
                }
                Some(_) => {}
            }
        }
        gaps
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuditOutcome {
    pub rows_read: usize,
    pub issues: Vec<DataIssue>,
    pub remote_count: usize,
    pub results: Vec<MatchResult>,
    pub content_gaps: ContentGaps,
}

impl AuditOutcome {
    pub fn matched(&self) -> impl Iterator<Item = &MatchedRecord> {
        self.results.iter().filter_map(|result| match result {
            MatchResult::Matched(matched) => Some(matched),
            _ => None,
        })
    }

    pub fn missing(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.results.iter().filter_map(|result| match result {
            MatchResult::Missing(record) => Some(record),
            _ => None,
        })
    }

    pub fn orphaned(&self) -> impl Iterator<Item = &RemoteRecord> {
        self.results.iter().filter_map(|result| match result {
            MatchResult::Orphaned(remote) => Some(remote),
            _ => None,
        })
    }

    /// Matched records with at least one field patch.
    pub fn updates(&self) -> impl Iterator<Item = &MatchedRecord> {
        self.matched().filter(|matched| !matched.patches.is_empty())
    }

    pub fn needs_review(&self) -> impl Iterator<Item = &MatchedRecord> {
        self.matched().filter(|matched| matched.kind.needs_review())
    }

    /// Sheet records whose price came from the repair heuristic.
    pub fn repaired_prices(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.results
            .iter()
            .filter_map(|result| match result {
                MatchResult::Matched(matched) => Some(&matched.record),
                MatchResult::Missing(record) => Some(record),
                MatchResult::Orphaned(_) => None,
            })
            .filter(|record| record.price.is_repaired())
    }
}

/// Normalize, match and diff; no I/O.
#[derive(Debug, Clone, Copy)]
pub struct AcquisitionAudit<'a> {
    mappings: &'a ReconciliationMappings,
}

impl<'a> AcquisitionAudit<'a> {
    pub fn new(mappings: &'a ReconciliationMappings) -> Self {
        Self { mappings }
    }

    pub fn run(&self, rows: &[SourceRecord], remotes: Vec<RemoteRecord>) -> AuditOutcome {
        let sheet = Normalizer::new(self.mappings).normalize_all(rows);
        for issue in &sheet.issues {
            warn!(row = issue.row, "{issue}");
        }

        let matcher = TitleMatcher::new(&remotes, self.mappings);
        let builder = PatchBuilder::new(self.mappings);
        let mut matched_ids: HashSet<&str> = HashSet::new();
        let mut results = Vec::with_capacity(sheet.records.len());

        for record in sheet.records {
            match matcher.find(&record.title) {
                Some(hit) => {
                    let remote = &remotes[hit.index];
                    matched_ids.insert(remote.id.as_str());
                    let patches = builder.build(&record, remote, hit.kind);
                    results.push(MatchResult::Matched(MatchedRecord {
                        record,
                        remote: remote.clone(),
                        kind: hit.kind,
                        patches,
                    }));
                }
                None => results.push(MatchResult::Missing(record)),
            }
        }

        results.extend(
            remotes
                .iter()
                .filter(|remote| !matched_ids.contains(remote.id.as_str()))
                .cloned()
                .map(MatchResult::Orphaned),
        );

        AuditOutcome {
            rows_read: rows.iter().filter(|row| !row.is_blank()).count(),
            issues: sheet.issues,
            remote_count: remotes.len(),
            content_gaps: ContentGaps::collect(&remotes, self.mappings.legacy_image_host()),
            results,
        }
    }
}

#[derive(Debug)]
pub struct AuditRun {
    pub outcome: AuditOutcome,
    /// Present only for live runs.
    pub applied: Option<ApplySummary>,
}

/// One end-to-end audit against a CMS: a single bulk read, then optional
/// sequential writes.
#[derive(Debug)]
pub struct AuditSession<'a> {
    gateway: &'a dyn CmsGateway,
    mappings: &'a ReconciliationMappings,
}

impl<'a> AuditSession<'a> {
    pub fn new(gateway: &'a dyn CmsGateway, mappings: &'a ReconciliationMappings) -> Self {
        Self { gateway, mappings }
    }

    pub fn run(
        &self,
        rows: &[SourceRecord],
        mode: RunMode,
        options: ApplyOptions,
    ) -> Result<AuditRun, CmsError> {
        let remotes = self.gateway.fetch_acquisitions()?;
        info!(count = remotes.len(), "fetched acquisition documents");

        let outcome = AcquisitionAudit::new(self.mappings).run(rows, remotes);
        info!(
            matched = outcome.matched().count(),
            missing = outcome.missing().count(),
            orphaned = outcome.orphaned().count(),
            "reconciliation complete"
        );

        let applied = match mode {
            RunMode::Live => Some(AuditApplier::new(self.gateway, options).apply(&outcome)),
            RunMode::DryRun => None,
        };

        Ok(AuditRun { outcome, applied })
    }
}
