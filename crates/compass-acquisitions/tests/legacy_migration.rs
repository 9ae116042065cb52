use std::collections::HashMap;
use std::sync::Mutex;

use compass_acquisitions::cms::{CmsError, CmsGateway};
use compass_acquisitions::http::HttpError;
use compass_acquisitions::workflows::acquisitions::RemoteRecord;
use compass_acquisitions::workflows::migration::{
    LegacyEntity, LegacyMigration, LegacySource, MigrationError,
};
use compass_acquisitions::workflows::RunMode;
use serde_json::{json, Map, Value};

#[derive(Debug, Default)]
struct FakeLegacy {
    collections: HashMap<&'static str, Vec<Value>>,
}

impl FakeLegacy {
    fn with(mut self, entity: LegacyEntity, records: Vec<Value>) -> Self {
        self.collections.insert(entity.api_name(), records);
        self
    }
}

impl LegacySource for FakeLegacy {
    fn fetch(&self, entity: LegacyEntity) -> Result<Vec<Value>, MigrationError> {
        self.collections
            .get(entity.api_name())
            .cloned()
            .ok_or_else(|| MigrationError::Fetch {
                entity,
                source: HttpError::Status {
                    url: format!("https://legacy.test/{}", entity.api_name()),
                    status: 404,
                    message: "Entity not found".to_string(),
                },
            })
    }
}

#[derive(Debug, Default)]
struct RecordingCms {
    upserts: Mutex<Vec<Value>>,
}

impl CmsGateway for RecordingCms {
    fn fetch_acquisitions(&self) -> Result<Vec<RemoteRecord>, CmsError> {
        Ok(Vec::new())
    }

    fn create(&self, _document: &Value) -> Result<String, CmsError> {
        Err(CmsError::Rejected("migration only upserts".to_string()))
    }

    fn patch(&self, _id: &str, _set: &Map<String, Value>) -> Result<(), CmsError> {
        Err(CmsError::Rejected("migration only upserts".to_string()))
    }

    fn create_or_replace(&self, document: &Value) -> Result<String, CmsError> {
        let id = document["_id"].as_str().unwrap_or_default().to_string();
        if id.ends_with("-broken") {
            return Err(CmsError::Rejected("invalid document".to_string()));
        }
        self.upserts.lock().expect("upsert log").push(document.clone());
        Ok(id)
    }
}

fn legacy() -> FakeLegacy {
    FakeLegacy::default()
        .with(
            LegacyEntity::BlogPost,
            vec![json!({
                "id": "p1",
                "title": "Buying in Byron Bay",
                "tags": "not-a-list",
                "created_date": "2024-02-01",
                "featured": 1
            })],
        )
        .with(
            LegacyEntity::TeamMember,
            vec![json!({"id": 7, "name": "Lee"}), json!({"name": "No Id"})],
        )
        .with(
            LegacyEntity::Testimonial,
            vec![json!({"id": "broken", "client_name": "Sam"})],
        )
}

#[test]
fn dry_run_transforms_without_writing() {
    let source = legacy();
    let cms = RecordingCms::default();

    let summary = LegacyMigration::new(&source, &cms).run(RunMode::DryRun);

    assert!(cms.upserts.lock().expect("upsert log").is_empty());
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped.len(), 2);
    assert!(summary.to_string().contains("ready to import (dry run)"));
}

#[test]
fn live_run_upserts_with_deterministic_ids() {
    let source = legacy();
    let cms = RecordingCms::default();

    let summary = LegacyMigration::new(&source, &cms).run(RunMode::Live);

    let upserts = cms.upserts.lock().expect("upsert log").clone();
    let ids: Vec<&str> = upserts
        .iter()
        .filter_map(|doc| doc["_id"].as_str())
        .collect();
    assert_eq!(ids, vec!["blogPost-p1", "teamMember-7"]);

    let post = &upserts[0];
    assert_eq!(post["_type"], "blogPost");
    assert_eq!(post["slug"]["current"], "buying-in-byron-bay");
    assert_eq!(post["tags"], json!([]));
    assert_eq!(post["status"], "published");
    assert_eq!(post["published_date"], "2024-02-01");
    assert_eq!(post["featured"], true);

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 2);
    let rendered = summary.to_string();
    assert!(rendered.contains("BlogPost: 1 records found"));
    assert!(rendered.contains("Acquisition: skipped"));
    assert!(rendered.contains("Success: 2 documents imported"));
    assert!(rendered.contains("Testimonial broken: cms rejected the mutation: invalid document"));
}
