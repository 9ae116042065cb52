//! Pure conversions from messy spreadsheet cells to canonical values.
//!
//! Nothing here fails: unusable input becomes `None` (or a default) and the
//! [`Normalizer`] turns the interesting cases into [`DataIssue`]s for the
//! report.

use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

use super::domain::{
    format_number, AustralianState, CanonicalRecord, LandSize, LandUnit, MarketVisibility,
    PropertyType, RawCell, SourceRecord,
};
use super::mapping::ReconciliationMappings;

pub const MIN_PLAUSIBLE_PRICE: u64 = 100_000;
pub const MAX_PLAUSIBLE_PRICE: u64 = 50_000_000;

/// Mojibake left behind when a non-breaking space was decoded as Latin-1.
pub const ENCODING_ARTIFACT: char = '\u{00c2}';

/// Largest serial Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: i64 = 2_958_465;
/// 1954-10-03. Smaller numbers in a date column are bare years or typos.
const MIN_PURCHASE_SERIAL: f64 = 20_000.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PriceOutcome {
    Missing,
    Parsed(u64),
    /// Out-of-range input that a pattern-based repair pulled back into range.
    Repaired { value: u64, raw: String },
    /// Out-of-range input that could not be repaired.
    Suspect { raw: String },
}

impl PriceOutcome {
    pub fn value(&self) -> Option<u64> {
        match self {
            Self::Parsed(value) | Self::Repaired { value, .. } => Some(*value),
            Self::Missing | Self::Suspect { .. } => None,
        }
    }

    pub fn is_repaired(&self) -> bool {
        matches!(self, Self::Repaired { .. })
    }
}

fn in_plausible_range(value: u64) -> bool {
    (MIN_PLAUSIBLE_PRICE..=MAX_PLAUSIBLE_PRICE).contains(&value)
}

pub fn normalize_price(raw: &RawCell) -> PriceOutcome {
    match raw {
        RawCell::Empty => PriceOutcome::Missing,
        RawCell::Number(number) => {
            if !number.is_finite() || *number < 0.0 {
                return PriceOutcome::Suspect {
                    raw: number.to_string(),
                };
            }
            let value = number.round() as u64;
            if in_plausible_range(value) {
                return PriceOutcome::Parsed(value);
            }
            let raw = format_number(*number);
            match repair_price(&raw, value) {
                Some(value) => PriceOutcome::Repaired { value, raw },
                None => PriceOutcome::Suspect { raw },
            }
        }
        RawCell::Text(text) => normalize_price_text(text),
    }
}

fn normalize_price_text(text: &str) -> PriceOutcome {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_alphabetic() && !c.is_whitespace() && *c != '$' && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return PriceOutcome::Missing;
    }

    let digits: String = cleaned.chars().take_while(|c| c.is_ascii_digit()).collect();
    let Ok(value) = digits.parse::<u64>() else {
        return PriceOutcome::Suspect {
            raw: text.trim().to_string(),
        };
    };

    if in_plausible_range(value) {
        return PriceOutcome::Parsed(value);
    }

    match repair_price(text, value) {
        Some(value) => PriceOutcome::Repaired {
            value,
            raw: text.trim().to_string(),
        },
        None => PriceOutcome::Suspect {
            raw: text.trim().to_string(),
        },
    }
}

/// Best-effort repair for an out-of-range price. Callers must treat the result
/// as a guess.
fn repair_price(raw: &str, value: u64) -> Option<u64> {
    regroup_thousands(raw)
        .filter(|candidate| in_plausible_range(*candidate))
        .or_else(|| drop_extra_zeros(value))
}

/// Rebuilds a number whose thousands separators were typed in the wrong
/// places, e.g. `1,9500,0000` -> `1,950,000`: a 1-3 digit lead group followed
/// by 3-digit groups, where over-long groups only carry extra zeros.
fn regroup_thousands(raw: &str) -> Option<u64> {
    let integral = raw.split('.').next().unwrap_or_default();
    let numeric: String = integral
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();
    let groups: Vec<&str> = numeric.split(',').filter(|g| !g.is_empty()).collect();
    if groups.len() < 2 {
        return None;
    }

    let lead = groups[0];
    if lead.len() > 3 {
        return None;
    }

    let mut rebuilt = String::from(lead);
    for group in &groups[1..] {
        match group.len() {
            3 => rebuilt.push_str(group),
            len if len > 3 && group[3..].bytes().all(|b| b == b'0') => {
                rebuilt.push_str(&group[..3])
            }
            _ => return None,
        }
    }

    rebuilt.parse().ok()
}

/// Strips trailing zeros one at a time and collects every in-range result.
/// `195000000` yields 19.5m, 1.95m and 195k, so it is ambiguous and not
/// repaired; only a single candidate counts.
fn drop_extra_zeros(mut value: u64) -> Option<u64> {
    let mut candidates = Vec::new();
    while value % 10 == 0 && value / 10 >= MIN_PLAUSIBLE_PRICE {
        value /= 10;
        if in_plausible_range(value) {
            candidates.push(value);
        }
    }
    match candidates.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

pub fn normalize_date(raw: &RawCell) -> Option<NaiveDate> {
    match raw {
        RawCell::Empty => None,
        RawCell::Number(serial) if *serial < MIN_PURCHASE_SERIAL => None,
        RawCell::Number(serial) => excel_serial_to_date(*serial),
        RawCell::Text(text) => {
            let trimmed = text.trim();
            if let Some(prefix) = trimmed.get(..10) {
                if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
                    return Some(date);
                }
            }
            day_month_year(trimmed)
        }
    }
}

fn day_month_year(value: &str) -> Option<NaiveDate> {
    static DMY: OnceLock<Regex> = OnceLock::new();
    let pattern = DMY.get_or_init(|| {
        Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid date pattern")
    });
    let captures = pattern.captures(value)?;
    let day = captures[1].parse().ok()?;
    let month = captures[2].parse().ok()?;
    let year = captures[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Converts a serial from the 1900 date system. Serial 60 is Excel's
/// nonexistent 1900-02-29 and has no calendar date.
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.floor() as i64;
    if !(1..=MAX_EXCEL_SERIAL).contains(&days) || days == 60 {
        return None;
    }

    let epoch = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    epoch.checked_add_signed(Duration::days(days))
}

pub fn normalize_market_visibility(raw: &str) -> Option<MarketVisibility> {
    let value = raw.trim().to_lowercase();
    if value.contains("off") {
        Some(MarketVisibility::OffMarket)
    } else if value.contains("on") || value.contains("auction") {
        Some(MarketVisibility::OnMarket)
    } else {
        None
    }
}

pub fn normalize_land_size(raw: &RawCell) -> LandSize {
    let value = match raw {
        RawCell::Empty => None,
        RawCell::Number(number) => Some(*number),
        RawCell::Text(text) => {
            let cleaned = text.trim().replace(',', "");
            if cleaned.is_empty() || cleaned == "-" {
                None
            } else if let Some((value, unit)) = land_value_with_unit(&cleaned) {
                return positive_land(value, unit);
            } else {
                leading_number(&cleaned)
            }
        }
    };

    match value {
        Some(value) => positive_land(value, LandUnit::Sqm),
        None => LandSize::default(),
    }
}

fn positive_land(value: f64, unit: LandUnit) -> LandSize {
    if value.is_finite() && value > 0.0 {
        LandSize {
            value: Some(value),
            unit,
        }
    } else {
        LandSize::default()
    }
}

fn land_value_with_unit(value: &str) -> Option<(f64, LandUnit)> {
    static LAND: OnceLock<Regex> = OnceLock::new();
    let pattern = LAND.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(hectares?|ha|acres?|ac|sqm|sq\.?\s?m|m2|m²)")
            .expect("valid land size pattern")
    });
    let captures = pattern.captures(value)?;
    let number = captures[1].parse().ok()?;
    let unit_token = captures[2].to_lowercase();
    let unit = if unit_token.starts_with('h') {
        LandUnit::Hectares
    } else if unit_token.starts_with('a') {
        LandUnit::Acres
    } else {
        LandUnit::Sqm
    };
    Some((number, unit))
}

fn leading_number(value: &str) -> Option<f64> {
    let end = value
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(index, _)| index)
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

/// Match key for a property title. Never used as display text.
pub fn normalize_title(raw: &str) -> String {
    let lowered = raw.replace(ENCODING_ARTIFACT, "").to_lowercase();
    let kept: Vec<&str> = lowered
        .split_whitespace()
        .filter(|token| !is_state_or_postcode(token))
        .collect();
    kept.join(" ")
        .trim_end_matches(|c: char| c == '.' || c == ',' || c.is_whitespace())
        .to_string()
}

fn is_state_or_postcode(token: &str) -> bool {
    let core = token.trim_matches(|c| c == ',' || c == '.');
    matches!(core, "nsw" | "qld") || (core.len() == 4 && core.bytes().all(|b| b.is_ascii_digit()))
}

pub fn make_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Bedroom/bathroom/car counts. Zero is treated as "not recorded", matching
/// how the spreadsheet marks land purchases.
pub fn normalize_count(raw: &RawCell) -> Option<u32> {
    let count = match raw {
        RawCell::Empty => None,
        RawCell::Number(number) if number.is_finite() && *number >= 0.0 => {
            Some(number.trunc() as u32)
        }
        RawCell::Number(_) => None,
        RawCell::Text(text) => {
            let digits: String = text.trim().chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        }
    };
    count.filter(|count| *count > 0)
}

pub fn normalize_timeframe(raw: &RawCell) -> Option<String> {
    match raw {
        RawCell::Empty => None,
        RawCell::Number(weeks) if *weeks > 0.0 => Some(format!("{} weeks", format_number(*weeks))),
        RawCell::Number(_) => None,
        RawCell::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else if trimmed.to_lowercase().contains("week") {
                Some(trimmed.to_string())
            } else {
                Some(format!("{trimmed} weeks"))
            }
        }
    }
}

pub fn normalize_property_type(raw: &str) -> Option<PropertyType> {
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return None;
    }

    let kind = if value.contains("townhouse") {
        PropertyType::Townhouse
    } else if value.contains("acreage") || value.contains("rural") {
        PropertyType::Acreage
    } else if value.contains("apartment") || value.contains("penthouse") {
        PropertyType::Apartment
    } else if value.contains("duplex") {
        PropertyType::Duplex
    } else if value.contains("villa") {
        PropertyType::Villa
    } else if value.contains("unit") {
        PropertyType::Unit
    } else if value.contains("land") || value.contains("vacant") {
        PropertyType::Land
    } else if value.contains("house") || value.contains("home") {
        PropertyType::House
    } else {
        PropertyType::Other
    };
    Some(kind)
}

/// `1950000` -> `$1,950,000`.
pub fn format_price_display(price: u64) -> String {
    let digits = price.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("${grouped}")
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataIssueKind {
    MissingTitle,
    SuspectPrice { raw: String },
    RepairedPrice { raw: String, value: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataIssue {
    pub row: usize,
    pub title: Option<String>,
    pub kind: DataIssueKind,
}

impl fmt::Display for DataIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.title.as_deref().unwrap_or("(untitled)");
        match &self.kind {
            DataIssueKind::MissingTitle => write!(f, "Row {}: missing title", self.row),
            DataIssueKind::SuspectPrice { raw } => write!(
                f,
                "Row {}: suspect price \"{}\" for \"{}\", left empty",
                self.row, raw, title
            ),
            DataIssueKind::RepairedPrice { raw, value } => write!(
                f,
                "Row {}: price \"{}\" for \"{}\" repaired to {} (best-effort guess, review before applying)",
                self.row,
                raw,
                title,
                format_price_display(*value)
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct NormalizedSheet {
    pub records: Vec<CanonicalRecord>,
    pub issues: Vec<DataIssue>,
}

/// Applies the per-field normalizers using run-specific mapping tables.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    mappings: &'a ReconciliationMappings,
}

impl<'a> Normalizer<'a> {
    pub fn new(mappings: &'a ReconciliationMappings) -> Self {
        Self { mappings }
    }

    pub fn normalize_all(&self, rows: &[SourceRecord]) -> NormalizedSheet {
        let mut sheet = NormalizedSheet::default();
        for row in rows {
            if row.is_blank() {
                continue;
            }
            match self.canonicalize(row, &mut sheet.issues) {
                Some(record) => sheet.records.push(record),
                None => continue,
            }
        }
        sheet
    }

    pub fn canonicalize(
        &self,
        source: &SourceRecord,
        issues: &mut Vec<DataIssue>,
    ) -> Option<CanonicalRecord> {
        let title = source.title.trim();
        if title.is_empty() {
            issues.push(DataIssue {
                row: source.row,
                title: None,
                kind: DataIssueKind::MissingTitle,
            });
            return None;
        }

        let price = normalize_price(&source.purchase_price);
        match &price {
            PriceOutcome::Suspect { raw } => issues.push(DataIssue {
                row: source.row,
                title: Some(title.to_string()),
                kind: DataIssueKind::SuspectPrice { raw: raw.clone() },
            }),
            PriceOutcome::Repaired { value, raw } => issues.push(DataIssue {
                row: source.row,
                title: Some(title.to_string()),
                kind: DataIssueKind::RepairedPrice {
                    raw: raw.clone(),
                    value: *value,
                },
            }),
            PriceOutcome::Missing | PriceOutcome::Parsed(_) => {}
        }

        let suburb = non_empty(&source.suburb);
        let region = self.mappings.region(&source.region);
        let state = region.map(|region| region.state).or_else(|| {
            suburb
                .as_deref()
                .filter(|suburb| self.mappings.is_qld_suburb(suburb))
                .map(|_| AustralianState::Qld)
        });

        Some(CanonicalRecord {
            row: source.row,
            title: title.to_string(),
            slug: make_slug(title),
            suburb,
            state,
            lga: region.map(|region| region.lga),
            property_type: normalize_property_type(&source.property_type),
            beds: normalize_count(&source.beds),
            baths: normalize_count(&source.baths),
            cars: normalize_count(&source.cars),
            land_size: normalize_land_size(&source.land_size),
            price_display: price.value().map(format_price_display),
            price,
            purchase_date: normalize_date(&source.purchase_date),
            agent: self
                .mappings
                .resolve_agent(&source.agent_website, &source.agent_actual),
            market_visibility: normalize_market_visibility(&source.market),
            timeframe: normalize_timeframe(&source.engagement_weeks),
            realestate_link: non_empty(&source.link),
        })
    }
}
