//! Maps legacy entity records onto CMS documents.
//!
//! Legacy content is loosely typed, so optional fields follow truthiness:
//! `null`, `false`, `0` and `""` all count as absent.

use serde_json::{json, Map, Value};

use super::{LegacyEntity, MigrationError};
use crate::workflows::acquisitions::make_slug;

const DEFAULT_TEAM_ORDER: i64 = 99;
const DEFAULT_RATING: i64 = 5;
const DEFAULT_STATUS: &str = "published";

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Read-only view over one legacy record.
struct Record<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> Record<'a> {
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key).filter(|value| is_truthy(value))
    }

    fn or_null(&self, key: &str) -> Value {
        self.get(key).cloned().unwrap_or(Value::Null)
    }

    fn raw(&self, key: &str) -> Value {
        self.fields.get(key).cloned().unwrap_or(Value::Null)
    }

    fn number_or(&self, key: &str, fallback: Value) -> Value {
        match self.fields.get(key) {
            Some(value @ Value::Number(_)) => value.clone(),
            _ => fallback,
        }
    }

    fn list(&self, key: &str) -> Value {
        match self.fields.get(key) {
            Some(value @ Value::Array(_)) => value.clone(),
            _ => json!([]),
        }
    }

    fn text_or(&self, key: &str, fallback: &str) -> Value {
        self.get(key).cloned().unwrap_or_else(|| json!(fallback))
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn first_of(&self, keys: &[&str]) -> Value {
        keys.iter()
            .find_map(|key| self.get(key).cloned())
            .unwrap_or(Value::Null)
    }

    fn slug(&self, id: &str) -> Value {
        let current = self
            .get("slug")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                self.get("title")
                    .and_then(Value::as_str)
                    .map(make_slug)
                    .filter(|slug| !slug.is_empty())
            })
            .unwrap_or_else(|| id.to_string());
        json!({ "_type": "slug", "current": current })
    }
}

fn legacy_id(entity: LegacyEntity, fields: &Map<String, Value>) -> Result<String, MigrationError> {
    match fields.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.trim().to_string()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(MigrationError::MissingId { entity }),
    }
}

/// Builds the CMS document for one legacy record. The `_id` is derived from
/// the legacy id so repeated runs replace rather than duplicate.
pub fn to_document(entity: LegacyEntity, record: &Value) -> Result<Value, MigrationError> {
    let fields = record
        .as_object()
        .ok_or(MigrationError::NotAnObject { entity })?;
    let id = legacy_id(entity, fields)?;
    let r = Record { fields };

    let mut doc = Map::new();
    doc.insert("_id".into(), json!(format!("{}-{}", entity.document_type(), id)));
    doc.insert("_type".into(), json!(entity.document_type()));

    let body = match entity {
        LegacyEntity::BlogPost => json!({
            "title": r.raw("title"),
            "slug": r.slug(&id),
            "status": r.text_or("status", DEFAULT_STATUS),
            "category": r.or_null("category"),
            "tags": r.list("tags"),
            "author": r.or_null("author"),
            "featured_image": r.or_null("featured_image"),
            "excerpt": r.or_null("excerpt"),
            "content": r.or_null("content"),
            "published_date": r.first_of(&["published_date", "created_date"]),
            "featured": r.flag("featured"),
            "meta_title": r.or_null("meta_title"),
            "meta_description": r.or_null("meta_description"),
        }),
        LegacyEntity::Acquisition => json!({
            "title": r.raw("title"),
            "slug": r.slug(&id),
            "status": r.text_or("status", DEFAULT_STATUS),
            "suburb": r.or_null("suburb"),
            "state": r.or_null("state"),
            "lga": r.or_null("lga"),
            "property_type": r.or_null("property_type"),
            "beds": r.number_or("beds", Value::Null),
            "baths": r.number_or("baths", Value::Null),
            "cars": r.number_or("cars", Value::Null),
            "land_size": r.or_null("land_size"),
            "land_size_unit": r.or_null("land_size_unit"),
            "purchase_price": r.number_or("purchase_price", Value::Null),
            "price_display": r.or_null("price_display"),
            "purchase_date": r.or_null("purchase_date"),
            "agent": r.or_null("agent"),
            "market_visibility": r.or_null("market_visibility"),
            "timeframe": r.or_null("timeframe"),
            "excerpt": r.or_null("excerpt"),
            "main_image_url": r.or_null("main_image_url"),
            "realestate_link": r.or_null("realestate_link"),
            "tags": r.list("tags"),
            "featured": r.flag("featured"),
        }),
        LegacyEntity::TeamMember => json!({
            "name": r.raw("name"),
            "position": r.or_null("position"),
            "bio": r.or_null("bio"),
            "photo": r.or_null("photo"),
            "email": r.or_null("email"),
            "phone": r.or_null("phone"),
            "credentials": r.list("credentials"),
            "specialties": r.list("specialties"),
            "linkedin_url": r.or_null("linkedin_url"),
            "intro_video_url": r.or_null("intro_video_url"),
            "order": r.number_or("order", json!(DEFAULT_TEAM_ORDER)),
            // Only an explicit `false` deactivates a member.
            "active": r.raw("active") != Value::Bool(false),
        }),
        LegacyEntity::Testimonial => json!({
            "name": r.raw("name"),
            "location": r.or_null("location"),
            "quote": r.raw("quote"),
            "photo_url": r.or_null("photo_url"),
            "rating": r.number_or("rating", json!(DEFAULT_RATING)),
            "status": r.text_or("status", DEFAULT_STATUS),
        }),
        LegacyEntity::CaseStudy => json!({
            "title": r.raw("title"),
            "slug": r.slug(&id),
            "status": r.text_or("status", DEFAULT_STATUS),
            "property_type": r.or_null("property_type"),
            "location": r.or_null("location"),
            "client_type": r.or_null("client_type"),
            "purchase_price": r.number_or("purchase_price", Value::Null),
            "timeframe": r.or_null("timeframe"),
            "excerpt": r.or_null("excerpt"),
            "content": r.or_null("content"),
            "featured_image": r.or_null("featured_image"),
            "client_name": r.or_null("client_name"),
            "client_testimonial": r.or_null("client_testimonial"),
            "challenges_overcome": r.or_null("challenges_overcome"),
            "results_achieved": r.or_null("results_achieved"),
            "featured": r.flag("featured"),
            "published_date": r.first_of(&["published_date", "created_date"]),
            "meta_title": r.or_null("meta_title"),
            "meta_description": r.or_null("meta_description"),
        }),
    };

    if let Value::Object(body) = body {
        doc.extend(body);
    }
    Ok(Value::Object(doc))
}
