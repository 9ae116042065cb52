use std::sync::Mutex;

use compass_acquisitions::cms::{CmsError, CmsGateway};
use compass_acquisitions::workflows::acquisitions::{
    ApplyOptions, ApplyStatus, AuditSession, HoldReason, RawCell, ReconciliationMappings,
    RemoteRecord, SourceRecord, WriteAction,
};
use compass_acquisitions::workflows::RunMode;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
enum Write {
    Create(Value),
    Patch(String, Map<String, Value>),
}

#[derive(Debug)]
struct FakeCms {
    remotes: Vec<RemoteRecord>,
    failing_ids: Vec<String>,
    writes: Mutex<Vec<Write>>,
}

impl FakeCms {
    fn new(remotes: Vec<RemoteRecord>) -> Self {
        Self {
            remotes,
            failing_ids: Vec::new(),
            writes: Mutex::new(Vec::new()),
        }
    }

    fn failing_on(mut self, id: &str) -> Self {
        self.failing_ids.push(id.to_string());
        self
    }

    fn writes(&self) -> Vec<Write> {
        self.writes.lock().expect("write log").clone()
    }
}

impl CmsGateway for FakeCms {
    fn fetch_acquisitions(&self) -> Result<Vec<RemoteRecord>, CmsError> {
        Ok(self.remotes.clone())
    }

    fn create(&self, document: &Value) -> Result<String, CmsError> {
        let mut writes = self.writes.lock().expect("write log");
        writes.push(Write::Create(document.clone()));
        Ok(format!("created-{}", writes.len()))
    }

    fn patch(&self, id: &str, set: &Map<String, Value>) -> Result<(), CmsError> {
        if self.failing_ids.iter().any(|failing| failing == id) {
            return Err(CmsError::Rejected(format!("document {id} is locked")));
        }
        self.writes
            .lock()
            .expect("write log")
            .push(Write::Patch(id.to_string(), set.clone()));
        Ok(())
    }

    fn create_or_replace(&self, document: &Value) -> Result<String, CmsError> {
        self.create(document)
    }
}

fn row(title: &str, price: &str) -> SourceRecord {
    SourceRecord {
        title: title.to_string(),
        purchase_price: RawCell::from_text(price),
        ..SourceRecord::default()
    }
}

fn remote(id: &str, title: &str, price: f64) -> RemoteRecord {
    RemoteRecord {
        id: id.to_string(),
        title: Some(title.to_string()),
        purchase_price: Some(price),
        price_display: Some("$1".to_string()),
        excerpt: Some("Secured off market".to_string()),
        main_image_url: Some("https://cdn.sanity.io/images/photo.jpg".to_string()),
        ..RemoteRecord::default()
    }
}

#[test]
fn dry_run_reports_changes_without_writing() {
    let cms = FakeCms::new(vec![remote("gibson", "13 Gibson Street", 195_000_000.0)]);
    let mappings = ReconciliationMappings::default();
    let rows = vec![row("13 Gibson Street", "1950000"), row("8 New Street", "$850,000")];

    let run = AuditSession::new(&cms, &mappings)
        .run(&rows, RunMode::DryRun, ApplyOptions::default())
        .expect("audit run");

    assert!(run.applied.is_none());
    assert!(cms.writes().is_empty(), "dry run must not write");
    assert_eq!(run.outcome.updates().count(), 1);
    assert_eq!(run.outcome.missing().count(), 1);
}

#[test]
fn live_run_patches_then_creates() {
    let cms = FakeCms::new(vec![remote("gibson", "13 Gibson Street", 195_000_000.0)]);
    let mappings = ReconciliationMappings::default();
    let rows = vec![row("8 New Street", "$850,000"), row("13 Gibson Street", "1950000")];

    let run = AuditSession::new(&cms, &mappings)
        .run(&rows, RunMode::Live, ApplyOptions::default())
        .expect("audit run");
    let summary = run.applied.expect("live summary");

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);

    let writes = cms.writes();
    assert_eq!(writes.len(), 2);
    match &writes[0] {
        Write::Patch(id, set) => {
            assert_eq!(id, "gibson");
            assert_eq!(set.get("purchase_price"), Some(&Value::from(1_950_000)));
            assert_eq!(set.get("price_display"), Some(&Value::from("$1,950,000")));
        }
        other => panic!("expected the patch first, got {other:?}"),
    }
    match &writes[1] {
        Write::Create(document) => {
            assert_eq!(document["_type"], "acquisition");
            assert_eq!(document["title"], "8 New Street");
            assert_eq!(document["slug"]["current"], "8-new-street");
            assert_eq!(document["purchase_price"], 850_000);
        }
        other => panic!("expected a create, got {other:?}"),
    }
}

#[test]
fn failed_patch_does_not_stop_the_batch() {
    let cms = FakeCms::new(vec![
        remote("locked", "13 Gibson Street", 195_000_000.0),
        remote("open", "21 Marine Parade", 1.0),
    ])
    .failing_on("locked");
    let mappings = ReconciliationMappings::default();
    let rows = vec![
        row("13 Gibson Street", "1950000"),
        row("21 Marine Parade", "$2,100,000"),
        row("8 New Street", "$850,000"),
    ];

    let run = AuditSession::new(&cms, &mappings)
        .run(&rows, RunMode::Live, ApplyOptions::default())
        .expect("audit run");
    let summary = run.applied.expect("live summary");

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 2);
    let failed = summary
        .entries
        .iter()
        .find(|entry| matches!(entry.status, ApplyStatus::Failed { .. }))
        .expect("failed entry");
    assert_eq!(failed.title, "13 Gibson Street");
    assert!(summary.to_string().contains("Done: 2 succeeded, 1 failed, 0 held for review"));
    assert!(cms
        .writes()
        .iter()
        .any(|write| matches!(write, Write::Create(doc) if doc["title"] == "8 New Street")));
}

#[test]
fn token_prefix_matches_are_held_unless_accepted() {
    let remotes = vec![remote("gibson", "13 Gibson Street, Kingscliff NSW", 1.0)];
    let mappings = ReconciliationMappings::default();
    let rows = vec![row("13 Gibson Street Kingscliff", "$1,950,000")];

    let cms = FakeCms::new(remotes.clone());
    let summary = AuditSession::new(&cms, &mappings)
        .run(&rows, RunMode::Live, ApplyOptions::default())
        .expect("audit run")
        .applied
        .expect("live summary");
    assert!(cms.writes().is_empty());
    assert_eq!(summary.held, 1);
    assert_eq!(
        summary.entries[0].status,
        ApplyStatus::Held {
            reason: HoldReason::TokenPrefixMatch
        }
    );

    let cms = FakeCms::new(remotes);
    let options = ApplyOptions {
        accept_token_matches: true,
        ..ApplyOptions::default()
    };
    let summary = AuditSession::new(&cms, &mappings)
        .run(&rows, RunMode::Live, options)
        .expect("audit run")
        .applied
        .expect("live summary");
    assert_eq!(summary.succeeded, 1);
    assert_eq!(cms.writes().len(), 1);
}

#[test]
fn repaired_price_is_left_out_of_new_documents() {
    let cms = FakeCms::new(Vec::new());
    let mappings = ReconciliationMappings::default();
    let rows = vec![row("4 Repair Road", "AUD 1,9500,0000")];

    let summary = AuditSession::new(&cms, &mappings)
        .run(&rows, RunMode::Live, ApplyOptions::default())
        .expect("audit run")
        .applied
        .expect("live summary");

    assert_eq!(summary.entries.len(), 1, "one entry per record");
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.held, 0);
    assert_eq!(summary.entries[0].action, WriteAction::Create);
    assert_eq!(
        summary.entries[0].status,
        ApplyStatus::Applied {
            id: "created-1".to_string(),
            held: Some(HoldReason::RepairedPrice),
        }
    );
    let rendered = summary.to_string();
    assert!(rendered.contains("ok    create 4 Repair Road (created-1), price held: repaired price"));
    assert!(rendered.contains("Done: 1 succeeded, 0 failed, 0 held for review"));
    match &cms.writes()[0] {
        Write::Create(document) => {
            assert_eq!(document["title"], "4 Repair Road");
            assert!(document.get("purchase_price").is_none());
            assert!(document.get("price_display").is_none());
        }
        other => panic!("expected a create, got {other:?}"),
    }
}

#[test]
fn repaired_price_is_left_out_of_patches_in_a_single_entry() {
    let mut existing = remote("repair", "4 Repair Road", 1.0);
    existing.beds = Some(2.0);
    let cms = FakeCms::new(vec![existing]);
    let mappings = ReconciliationMappings::default();
    let mut sheet_row = row("4 Repair Road", "AUD 1,9500,0000");
    sheet_row.beds = RawCell::Number(3.0);

    let summary = AuditSession::new(&cms, &mappings)
        .run(&[sheet_row], RunMode::Live, ApplyOptions::default())
        .expect("audit run")
        .applied
        .expect("live summary");

    assert_eq!(summary.entries.len(), 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(
        summary.entries[0].status,
        ApplyStatus::Applied {
            id: "repair".to_string(),
            held: Some(HoldReason::RepairedPrice),
        }
    );
    match &cms.writes()[0] {
        Write::Patch(id, set) => {
            assert_eq!(id, "repair");
            assert_eq!(set.get("beds"), Some(&Value::from(3)));
            assert!(set.get("purchase_price").is_none());
            assert!(set.get("price_display").is_none());
        }
        other => panic!("expected a patch, got {other:?}"),
    }
}

#[test]
fn repaired_price_is_written_when_accepted() {
    let cms = FakeCms::new(Vec::new());
    let mappings = ReconciliationMappings::default();
    let options = ApplyOptions {
        accept_repaired_prices: true,
        ..ApplyOptions::default()
    };

    let summary = AuditSession::new(&cms, &mappings)
        .run(&[row("4 Repair Road", "AUD 1,9500,0000")], RunMode::Live, options)
        .expect("audit run")
        .applied
        .expect("live summary");

    assert_eq!(summary.held, 0);
    match &cms.writes()[0] {
        Write::Create(document) => assert_eq!(document["purchase_price"], 1_950_000),
        other => panic!("expected a create, got {other:?}"),
    }
}
