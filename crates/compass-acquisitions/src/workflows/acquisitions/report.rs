use std::fmt::{self, Display, Formatter};

use super::domain::CanonicalRecord;
use super::normalizer::format_price_display;
use super::AuditOutcome;
use crate::workflows::RunMode;

/// Listed individually before the remainder is summarised.
const MAX_LISTED_GAPS: usize = 10;

const RULE: &str = "=======================================================";

/// Console rendering of an audit outcome.
#[derive(Debug, Clone, Copy)]
pub struct AuditReport<'a> {
    outcome: &'a AuditOutcome,
    mode: RunMode,
}

impl<'a> AuditReport<'a> {
    pub fn new(outcome: &'a AuditOutcome, mode: RunMode) -> Self {
        Self { outcome, mode }
    }

    fn banner(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "  ACQUISITIONS AUDIT REPORT")?;
        match self.mode {
            RunMode::DryRun => writeln!(f, "  Mode: DRY RUN (no changes will be written)")?,
            RunMode::Live => writeln!(f, "  Mode: LIVE (changes will be written to the CMS)")?,
        }
        writeln!(f, "{RULE}")
    }

    fn counts(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let outcome = self.outcome;
        writeln!(f)?;
        writeln!(f, "Spreadsheet rows:       {}", outcome.rows_read)?;
        writeln!(f, "CMS documents:          {}", outcome.remote_count)?;
        writeln!(f, "Matched:                {}", outcome.matched().count())?;
        writeln!(f, "Missing from CMS:       {}", outcome.missing().count())?;
        writeln!(f, "Needing updates:        {}", outcome.updates().count())?;
        writeln!(f, "Orphaned (CMS only):    {}", outcome.orphaned().count())
    }

    fn issues(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.outcome.issues.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "Data issues ({}):", self.outcome.issues.len())?;
        for issue in &self.outcome.issues {
            writeln!(f, "  - {issue}")?;
        }
        Ok(())
    }

    fn review(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let review: Vec<_> = self.outcome.needs_review().collect();
        if review.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "Matches needing review ({}):", review.len())?;
        for matched in review {
            writeln!(
                f,
                "  ? [{}] \"{}\" -> \"{}\" ({})",
                matched.kind.label(),
                matched.record.title,
                matched.remote.display_title(),
                matched.remote.id
            )?;
        }
        Ok(())
    }

    fn missing(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let missing: Vec<_> = self.outcome.missing().collect();
        if missing.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "Missing from CMS ({}):", missing.len())?;
        for record in missing {
            write_missing(f, record)?;
        }
        Ok(())
    }

    fn updates(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let updates: Vec<_> = self.outcome.updates().collect();
        if updates.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "Updates needed ({}):", updates.len())?;
        for matched in updates {
            writeln!(f, "  ~ {} ({})", matched.remote.display_title(), matched.remote.id)?;
            for patch in &matched.patches {
                writeln!(f, "      {patch}")?;
            }
        }
        Ok(())
    }

    fn orphans(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let orphans: Vec<_> = self.outcome.orphaned().collect();
        if orphans.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "In CMS but not in spreadsheet ({}):", orphans.len())?;
        for remote in orphans {
            writeln!(f, "  ? {} ({})", remote.display_title(), remote.id)?;
        }
        Ok(())
    }

    fn repaired(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let repaired: Vec<_> = self.outcome.repaired_prices().collect();
        if repaired.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "Repaired prices, best-effort guesses ({}):", repaired.len())?;
        for record in repaired {
            if let super::PriceOutcome::Repaired { value, raw } = &record.price {
                writeln!(
                    f,
                    "  ! Row {}: \"{}\" read as {} from \"{raw}\"",
                    record.row,
                    record.title,
                    format_price_display(*value)
                )?;
            }
        }
        Ok(())
    }

    fn content_gaps(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let gaps = &self.outcome.content_gaps;
        write_gap_list(f, "Documents missing an excerpt", &gaps.missing_excerpt)?;
        write_gap_list(f, "Documents missing an image", &gaps.missing_image)?;
        write_gap_list(f, "Images still on the legacy host", &gaps.legacy_images)
    }
}

fn write_missing(f: &mut Formatter<'_>, record: &CanonicalRecord) -> fmt::Result {
    let or_na = |value: Option<&str>| value.unwrap_or("N/A").to_string();
    let count = |value: Option<u32>| value.map_or_else(|| "-".to_string(), |n| n.to_string());

    writeln!(
        f,
        "  + {} | {} | {}",
        record.title,
        or_na(record.suburb.as_deref()),
        or_na(record.lga.map(|lga| lga.as_str()))
    )?;
    writeln!(
        f,
        "    Price: {} | Agent: {} | Date: {}",
        or_na(record.price_display.as_deref()),
        or_na(record.agent.as_deref()),
        record
            .purchase_date
            .map_or_else(|| "N/A".to_string(), |date| date.format("%Y-%m-%d").to_string())
    )?;
    let land = record.land_size.value.map_or_else(
        || "-".to_string(),
        |value| format!("{value}{}", record.land_size.unit.as_str()),
    );
    writeln!(
        f,
        "    Beds: {} | Baths: {} | Cars: {} | Land: {land}",
        count(record.beds),
        count(record.baths),
        count(record.cars)
    )
}

fn write_gap_list(f: &mut Formatter<'_>, heading: &str, titles: &[String]) -> fmt::Result {
    if titles.is_empty() {
        return Ok(());
    }
    writeln!(f)?;
    writeln!(f, "{heading} ({}):", titles.len())?;
    for title in titles.iter().take(MAX_LISTED_GAPS) {
        writeln!(f, "  - {title}")?;
    }
    if titles.len() > MAX_LISTED_GAPS {
        writeln!(f, "  ... and {} more", titles.len() - MAX_LISTED_GAPS)?;
    }
    Ok(())
}

impl Display for AuditReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.banner(f)?;
        self.issues(f)?;
        self.counts(f)?;
        self.review(f)?;
        self.missing(f)?;
        self.updates(f)?;
        self.orphans(f)?;
        self.repaired(f)?;
        self.content_gaps(f)?;
        writeln!(f)?;
        writeln!(f, "{RULE}")?;
        if self.mode == RunMode::DryRun {
            writeln!(f, "Dry run complete. Use --apply to write these changes.")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::acquisitions::{
        AcquisitionAudit, ReconciliationMappings, RawCell, RemoteRecord, SourceRecord,
    };

    fn outcome() -> AuditOutcome {
        let mappings = ReconciliationMappings::default();
        let rows = vec![
            SourceRecord {
                title: "13 Gibson Street".to_string(),
                purchase_price: RawCell::Number(1_950_000.0),
                ..SourceRecord::default()
            },
            SourceRecord {
                title: "8 New Street".to_string(),
                suburb: "Pottsville".to_string(),
                purchase_price: RawCell::Text("AUD 1,9500,0000".to_string()),
                beds: RawCell::Number(3.0),
                ..SourceRecord::default()
            },
        ];
        let remotes = vec![
            RemoteRecord {
                id: "acquisition-1".to_string(),
                title: Some("13 Gibson Street".to_string()),
                purchase_price: Some(195_000_000.0),
                ..RemoteRecord::default()
            },
            RemoteRecord {
                id: "acquisition-2".to_string(),
                title: Some("99 Orphan Avenue".to_string()),
                excerpt: Some("Sold".to_string()),
                main_image_url: Some("https://base44.app/x.jpg".to_string()),
                ..RemoteRecord::default()
            },
        ];
        AcquisitionAudit::new(&mappings).run(&rows, remotes)
    }

    #[test]
    fn dry_run_report_lists_every_section() {
        let outcome = outcome();
        let rendered = AuditReport::new(&outcome, RunMode::DryRun).to_string();

        assert!(rendered.contains("Mode: DRY RUN"));
        assert!(rendered.contains("Spreadsheet rows:       2"));
        assert!(rendered.contains("Missing from CMS:       1"));
        assert!(rendered.contains("  + 8 New Street | Pottsville | N/A"));
        assert!(rendered.contains("Beds: 3 | Baths: - | Cars: - | Land: -"));
        assert!(rendered.contains("purchase_price: 195000000 -> 1950000"));
        assert!(rendered.contains("  ? 99 Orphan Avenue (acquisition-2)"));
        assert!(rendered.contains("read as $1,950,000 from \"AUD 1,9500,0000\""));
        assert!(rendered.contains("Documents missing an excerpt (1):\n  - 13 Gibson Street"));
        assert!(rendered.contains("Images still on the legacy host (1):\n  - 99 Orphan Avenue"));
        assert!(rendered.contains("Dry run complete."));
    }

    #[test]
    fn live_banner_and_no_dry_run_hint() {
        let outcome = outcome();
        let rendered = AuditReport::new(&outcome, RunMode::Live).to_string();
        assert!(rendered.contains("Mode: LIVE"));
        assert!(!rendered.contains("Dry run complete."));
    }

    #[test]
    fn long_gap_lists_are_truncated() {
        let titles: Vec<String> = (1..=13).map(|n| format!("{n} Long Road")).collect();
        let mut rendered = String::new();
        {
            use std::fmt::Write;
            struct Gaps<'a>(&'a [String]);
            impl Display for Gaps<'_> {
                fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                    write_gap_list(f, "Documents missing an image", self.0)
                }
            }
            write!(rendered, "{}", Gaps(&titles)).expect("write");
        }
        assert!(rendered.contains("  - 10 Long Road"));
        assert!(!rendered.contains("  - 11 Long Road"));
        assert!(rendered.contains("  ... and 3 more"));
    }
}
