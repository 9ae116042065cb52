use serde_json::{json, Map, Value};
use std::fmt;

use super::domain::{format_number, CanonicalRecord, PropertyType, RemoteRecord};
use super::mapping::ReconciliationMappings;
use super::matcher::MatchKind;
use super::normalizer::ENCODING_ARTIFACT;

/// Relative price difference below which the CMS value is left alone.
pub const PRICE_TOLERANCE: f64 = 0.10;

const LAND_SIZE_EPSILON: f64 = 1e-6;

pub const PRICE_FIELDS: [&str; 2] = ["purchase_price", "price_display"];

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
}

impl FieldValue {
    fn text(value: Option<&str>) -> Self {
        match value {
            Some(text) => Self::Text(text.to_string()),
            None => Self::Null,
        }
    }

    fn number(value: Option<f64>) -> Self {
        match value {
            Some(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                Self::Integer(number as i64)
            }
            Some(number) => Self::Decimal(number),
            None => Self::Null,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Text(text) => Value::String(text.clone()),
            Self::Integer(number) => json!(number),
            Self::Decimal(number) => json!(number),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("(empty)"),
            Self::Text(text) => write!(f, "\"{text}\""),
            Self::Integer(number) => write!(f, "{number}"),
            Self::Decimal(number) => f.write_str(&format_number(*number)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPatch {
    pub field: &'static str,
    pub old: FieldValue,
    pub new: FieldValue,
}

impl FieldPatch {
    pub fn is_price(&self) -> bool {
        PRICE_FIELDS.contains(&self.field)
    }
}

impl fmt::Display for FieldPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.field, self.old, self.new)
    }
}

/// The `set` object of a CMS patch mutation.
pub fn patch_set<'a>(patches: impl IntoIterator<Item = &'a FieldPatch>) -> Map<String, Value> {
    patches
        .into_iter()
        .map(|patch| (patch.field.to_string(), patch.new.to_json()))
        .collect()
}

fn same_text(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |text| text.trim().is_empty())
}

/// Title with the encoding artifact removed and non-breaking spaces turned
/// into plain ones.
pub fn repair_title(title: &str) -> String {
    title
        .replace(ENCODING_ARTIFACT, "")
        .replace('\u{00a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Field-by-field comparison of a matched pair.
#[derive(Debug, Clone, Copy)]
pub struct PatchBuilder<'a> {
    mappings: &'a ReconciliationMappings,
}

impl<'a> PatchBuilder<'a> {
    pub fn new(mappings: &'a ReconciliationMappings) -> Self {
        Self { mappings }
    }

    pub fn build(
        &self,
        canonical: &CanonicalRecord,
        remote: &RemoteRecord,
        kind: MatchKind,
    ) -> Vec<FieldPatch> {
        let mut patches = Vec::new();

        self.title(canonical, remote, kind, &mut patches);

        for (field, ours, theirs) in [
            ("cars", canonical.cars, remote.cars),
            ("beds", canonical.beds, remote.beds),
            ("baths", canonical.baths, remote.baths),
        ] {
            if let Some(ours) = ours {
                if theirs != Some(f64::from(ours)) {
                    patches.push(FieldPatch {
                        field,
                        old: FieldValue::number(theirs),
                        new: FieldValue::Integer(i64::from(ours)),
                    });
                }
            }
        }

        let price_patched = self.price(canonical, remote, &mut patches);
        if let Some(display) = canonical.price_display.as_deref() {
            if price_patched || is_blank(remote.price_display.as_deref()) {
                push_text(&mut patches, "price_display", remote.price_display.as_deref(), display);
            }
        }

        if let Some(date) = canonical.purchase_date {
            let date = date.format("%Y-%m-%d").to_string();
            diff_text(&mut patches, "purchase_date", remote.purchase_date.as_deref(), &date);
        }

        if let Some(agent) = canonical.agent.as_deref() {
            let remote_agent = remote
                .agent
                .as_deref()
                .map(|name| self.mappings.canonical_agent(name));
            if !remote_agent.is_some_and(|theirs| same_text(&theirs, agent)) {
                push_text(&mut patches, "agent", remote.agent.as_deref(), agent);
            }
        }

        if let Some(visibility) = canonical.market_visibility {
            diff_text(
                &mut patches,
                "market_visibility",
                remote.market_visibility.as_deref(),
                visibility.as_str(),
            );
        }
        // `Other` is a fallback for unrecognised sheet text, not a fact.
        if let Some(kind) = canonical.property_type.filter(|kind| *kind != PropertyType::Other) {
            diff_text(
                &mut patches,
                "property_type",
                remote.property_type.as_deref(),
                kind.as_str(),
            );
        }

        if let Some(value) = canonical.land_size.value {
            let differs = remote
                .land_size
                .map_or(true, |theirs| (theirs - value).abs() > LAND_SIZE_EPSILON);
            if differs {
                patches.push(FieldPatch {
                    field: "land_size",
                    old: FieldValue::number(remote.land_size),
                    new: FieldValue::number(Some(value)),
                });
            }
            diff_text(
                &mut patches,
                "land_size_unit",
                remote.land_size_unit.as_deref(),
                canonical.land_size.unit.as_str(),
            );
        }

        if let Some(lga) = canonical.lga {
            diff_text(&mut patches, "lga", remote.lga.as_deref(), lga.as_str());
        }
        if let Some(state) = canonical.state {
            diff_text(&mut patches, "state", remote.state.as_deref(), state.as_str());
        }

        if let Some(link) = canonical.realestate_link.as_deref() {
            if is_blank(remote.realestate_link.as_deref()) {
                push_text(&mut patches, "realestate_link", remote.realestate_link.as_deref(), link);
            }
        }
        if let Some(timeframe) = canonical.timeframe.as_deref() {
            if is_blank(remote.timeframe.as_deref()) {
                push_text(&mut patches, "timeframe", remote.timeframe.as_deref(), timeframe);
            }
        }

        if let Some(suburb) = canonical.suburb.as_deref() {
            diff_text(&mut patches, "suburb", remote.suburb.as_deref(), suburb);
        }

        patches
    }

    fn title(
        &self,
        canonical: &CanonicalRecord,
        remote: &RemoteRecord,
        kind: MatchKind,
        patches: &mut Vec<FieldPatch>,
    ) {
        let Some(current) = remote.title.as_deref() else {
            return;
        };

        // Manually pinned rows carry the intended title minus the suburb suffix.
        let replacement = if kind == MatchKind::Manual {
            let title = canonical.title.as_str();
            let clean = match title.rfind(',') {
                Some(comma) if comma > 0 => title[..comma].trim(),
                _ => title,
            };
            Some(repair_title(clean))
        } else if current.contains(ENCODING_ARTIFACT) {
            Some(repair_title(current))
        } else {
            None
        };

        if let Some(replacement) = replacement.filter(|title| !title.is_empty() && title != current)
        {
            push_text(patches, "title", Some(current), &replacement);
        }
    }

    fn price(
        &self,
        canonical: &CanonicalRecord,
        remote: &RemoteRecord,
        patches: &mut Vec<FieldPatch>,
    ) -> bool {
        let Some(price) = canonical.purchase_price() else {
            return false;
        };
        let ours = price as f64;
        let differs = remote
            .purchase_price
            .map_or(true, |theirs| (theirs - ours).abs() / ours > PRICE_TOLERANCE);
        if differs {
            patches.push(FieldPatch {
                field: "purchase_price",
                old: FieldValue::number(remote.purchase_price),
                new: FieldValue::Integer(price as i64),
            });
        }
        differs
    }
}

fn diff_text(patches: &mut Vec<FieldPatch>, field: &'static str, remote: Option<&str>, ours: &str) {
    if !remote.is_some_and(|theirs| same_text(theirs, ours)) {
        push_text(patches, field, remote, ours);
    }
}

fn push_text(patches: &mut Vec<FieldPatch>, field: &'static str, remote: Option<&str>, ours: &str) {
    patches.push(FieldPatch {
        field,
        old: FieldValue::text(remote),
        new: FieldValue::Text(ours.to_string()),
    });
}

/// A new `acquisition` document for a row with no CMS counterpart. Null
/// fields are omitted.
pub fn build_create_payload(canonical: &CanonicalRecord) -> Value {
    let mut doc = Map::new();
    doc.insert("_type".into(), json!("acquisition"));
    doc.insert("title".into(), json!(canonical.title));
    doc.insert(
        "slug".into(),
        json!({ "_type": "slug", "current": canonical.slug }),
    );
    doc.insert("status".into(), json!("published"));

    let mut put = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            doc.insert(key.to_string(), value);
        }
    };
    put("suburb", canonical.suburb.as_ref().map(|v| json!(v)));
    put("state", canonical.state.map(|v| json!(v.as_str())));
    put("lga", canonical.lga.map(|v| json!(v.as_str())));
    put("property_type", canonical.property_type.map(|v| json!(v.as_str())));
    put("agent", canonical.agent.as_ref().map(|v| json!(v)));
    put("purchase_price", canonical.purchase_price().map(|v| json!(v)));
    put("price_display", canonical.price_display.as_ref().map(|v| json!(v)));
    put(
        "purchase_date",
        canonical
            .purchase_date
            .map(|v| json!(v.format("%Y-%m-%d").to_string())),
    );
    put(
        "market_visibility",
        canonical.market_visibility.map(|v| json!(v.as_str())),
    );
    put("timeframe", canonical.timeframe.as_ref().map(|v| json!(v)));
    put("beds", canonical.beds.map(|v| json!(v)));
    put("baths", canonical.baths.map(|v| json!(v)));
    put("cars", canonical.cars.map(|v| json!(v)));
    if let Some(value) = canonical.land_size.value {
        put("land_size", Some(json!(value)));
        put("land_size_unit", Some(json!(canonical.land_size.unit.as_str())));
    }
    put("realestate_link", canonical.realestate_link.as_ref().map(|v| json!(v)));

    doc.insert("featured".into(), json!(false));
    Value::Object(doc)
}
