use serde_json::Value;
use std::fmt;
use tracing::{info, warn};

use super::diff::{build_create_payload, patch_set, FieldPatch, PRICE_FIELDS};
use super::matcher::MatchKind;
use super::{AuditOutcome, MatchedRecord};
use crate::cms::CmsGateway;

/// Opt-ins for writes that are withheld by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    pub accept_repaired_prices: bool,
    pub accept_token_matches: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Patch,
    Create,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    TokenPrefixMatch,
    RepairedPrice,
}

impl HoldReason {
    pub const fn describe(self) -> &'static str {
        match self {
            Self::TokenPrefixMatch => "low-confidence title match (use --accept-token-matches)",
            Self::RepairedPrice => "repaired price (use --accept-repaired-prices)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyStatus {
    /// `held` names fields withheld from an otherwise successful write.
    Applied {
        id: String,
        held: Option<HoldReason>,
    },
    Failed { error: String },
    Held { reason: HoldReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyEntry {
    pub title: String,
    pub action: WriteAction,
    pub status: ApplyStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub succeeded: usize,
    pub failed: usize,
    pub held: usize,
    pub entries: Vec<ApplyEntry>,
}

impl ApplySummary {
    fn record(&mut self, title: &str, action: WriteAction, status: ApplyStatus) {
        match &status {
            ApplyStatus::Applied { .. } => self.succeeded += 1,
            ApplyStatus::Failed { .. } => self.failed += 1,
            ApplyStatus::Held { .. } => self.held += 1,
        }
        self.entries.push(ApplyEntry {
            title: title.to_string(),
            action,
            status,
        });
    }
}

impl fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            let verb = match entry.action {
                WriteAction::Patch => "update",
                WriteAction::Create => "create",
            };
            match &entry.status {
                ApplyStatus::Applied { id, held: None } => {
                    writeln!(f, "  ok    {verb} {} ({id})", entry.title)?
                }
                ApplyStatus::Applied {
                    id,
                    held: Some(reason),
                } => writeln!(
                    f,
                    "  ok    {verb} {} ({id}), price held: {}",
                    entry.title,
                    reason.describe()
                )?,
                ApplyStatus::Failed { error } => {
                    writeln!(f, "  FAIL  {verb} {}: {error}", entry.title)?
                }
                ApplyStatus::Held { reason } => {
                    writeln!(f, "  HELD  {verb} {}: {}", entry.title, reason.describe())?
                }
            }
        }
        writeln!(
            f,
            "Done: {} succeeded, {} failed, {} held for review",
            self.succeeded, self.failed, self.held
        )
    }
}

/// Executes the writes implied by an [`AuditOutcome`], patches first, one
/// call at a time. A failed call is recorded and the batch continues.
#[derive(Debug)]
pub struct AuditApplier<'a> {
    gateway: &'a dyn CmsGateway,
    options: ApplyOptions,
}

impl<'a> AuditApplier<'a> {
    pub fn new(gateway: &'a dyn CmsGateway, options: ApplyOptions) -> Self {
        Self { gateway, options }
    }

    pub fn apply(&self, outcome: &AuditOutcome) -> ApplySummary {
        let mut summary = ApplySummary::default();

        for matched in outcome.updates() {
            self.apply_patch(matched, &mut summary);
        }

        for record in outcome.missing() {
            let title = record.title.as_str();
            let mut document = build_create_payload(record);
            let held = (record.price.is_repaired() && !self.options.accept_repaired_prices)
                .then_some(HoldReason::RepairedPrice);
            if held.is_some() {
                if let Value::Object(fields) = &mut document {
                    for field in PRICE_FIELDS {
                        fields.remove(field);
                    }
                }
            }

            let status = match self.gateway.create(&document) {
                Ok(id) => {
                    info!(%title, %id, "created acquisition");
                    ApplyStatus::Applied { id, held }
                }
                Err(err) => {
                    warn!(%title, error = %err, "failed to create acquisition");
                    ApplyStatus::Failed {
                        error: err.to_string(),
                    }
                }
            };
            summary.record(title, WriteAction::Create, status);
        }

        summary
    }

    fn apply_patch(&self, matched: &MatchedRecord, summary: &mut ApplySummary) {
        let title = matched.remote.display_title();

        if matched.kind == MatchKind::TokenPrefix && !self.options.accept_token_matches {
            summary.record(
                title,
                WriteAction::Patch,
                ApplyStatus::Held {
                    reason: HoldReason::TokenPrefixMatch,
                },
            );
            return;
        }

        let hold_price = matched.record.price.is_repaired() && !self.options.accept_repaired_prices;
        let patches: Vec<&FieldPatch> = matched
            .patches
            .iter()
            .filter(|patch| !(hold_price && patch.is_price()))
            .collect();

        let held = (patches.len() < matched.patches.len()).then_some(HoldReason::RepairedPrice);
        if patches.is_empty() {
            if let Some(reason) = held {
                summary.record(title, WriteAction::Patch, ApplyStatus::Held { reason });
            }
            return;
        }

        let status = match self.gateway.patch(&matched.remote.id, &patch_set(patches)) {
            Ok(()) => {
                info!(%title, id = %matched.remote.id, "updated acquisition");
                ApplyStatus::Applied {
                    id: matched.remote.id.clone(),
                    held,
                }
            }
            Err(err) => {
                warn!(%title, error = %err, "failed to update acquisition");
                ApplyStatus::Failed {
                    error: err.to_string(),
                }
            }
        };
        summary.record(title, WriteAction::Patch, status);
    }
}
