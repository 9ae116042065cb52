use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use super::normalizer::PriceOutcome;

/// A single spreadsheet cell. Numeric cells keep their type so Excel serial
/// dates and numeric prices survive the import untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl RawCell {
    /// Builds a cell from exported text, treating plain numbers as numeric
    /// cells the way a spreadsheet would.
    pub fn from_text(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }

        let numeric_shape = trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-');
        if numeric_shape {
            if let Ok(number) = trimmed.parse::<f64>() {
                return Self::Number(number);
            }
        }

        Self::Text(trimmed.to_string())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Number(_) => false,
            Self::Text(text) => text.trim().is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Empty => None,
            Self::Number(number) => Some(Cow::Owned(format_number(*number))),
            Self::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then_some(Cow::Borrowed(trimmed))
            }
        }
    }

    pub fn text_or_empty(&self) -> String {
        self.as_text().map(Cow::into_owned).unwrap_or_default()
    }
}

impl fmt::Display for RawCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => Ok(()),
        }
    }
}

/// Formats integral floats without a trailing `.0`.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// One row of the purchased-properties spreadsheet, before normalization.
///
/// The serde aliases accept the compact literal records used for one-off
/// imports (`price`, `date`, `agent`, `land`, `type`, `weeks`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceRecord {
    pub row: usize,
    pub title: String,
    pub suburb: String,
    pub region: String,
    #[serde(alias = "type")]
    pub property_type: String,
    pub beds: RawCell,
    pub baths: RawCell,
    pub cars: RawCell,
    #[serde(alias = "land")]
    pub land_size: RawCell,
    #[serde(alias = "price")]
    pub purchase_price: RawCell,
    #[serde(alias = "date")]
    pub purchase_date: RawCell,
    #[serde(alias = "agent")]
    pub agent_website: String,
    pub agent_actual: String,
    #[serde(alias = "market")]
    pub market: String,
    #[serde(alias = "weeks")]
    pub engagement_weeks: RawCell,
    pub link: String,
}

impl SourceRecord {
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty()
            && self.suburb.trim().is_empty()
            && self.region.trim().is_empty()
            && self.purchase_price.is_empty()
            && self.purchase_date.is_empty()
            && self.agent_website.trim().is_empty()
            && self.agent_actual.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AustralianState {
    #[serde(rename = "NSW")]
    Nsw,
    #[serde(rename = "QLD")]
    Qld,
}

impl AustralianState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nsw => "NSW",
            Self::Qld => "QLD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lga {
    #[serde(rename = "Byron Shire")]
    ByronShire,
    #[serde(rename = "Tweed Shire")]
    TweedShire,
    #[serde(rename = "Ballina Shire")]
    BallinaShire,
    #[serde(rename = "City of Gold Coast")]
    CityOfGoldCoast,
    #[serde(rename = "Other")]
    Other,
}

impl Lga {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ByronShire => "Byron Shire",
            Self::TweedShire => "Tweed Shire",
            Self::BallinaShire => "Ballina Shire",
            Self::CityOfGoldCoast => "City of Gold Coast",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    House,
    Apartment,
    Townhouse,
    Acreage,
    Duplex,
    Unit,
    Land,
    Villa,
    Other,
}

impl PropertyType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::House => "house",
            Self::Apartment => "apartment",
            Self::Townhouse => "townhouse",
            Self::Acreage => "acreage",
            Self::Duplex => "duplex",
            Self::Unit => "unit",
            Self::Land => "land",
            Self::Villa => "villa",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandUnit {
    #[default]
    Sqm,
    Acres,
    Hectares,
}

impl LandUnit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqm => "sqm",
            Self::Acres => "acres",
            Self::Hectares => "hectares",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LandSize {
    pub value: Option<f64>,
    pub unit: LandUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketVisibility {
    OnMarket,
    OffMarket,
}

impl MarketVisibility {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnMarket => "on_market",
            Self::OffMarket => "off_market",
        }
    }
}

/// A normalized, typed acquisition independent of spreadsheet formatting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub row: usize,
    pub title: String,
    pub slug: String,
    pub suburb: Option<String>,
    pub state: Option<AustralianState>,
    pub lga: Option<Lga>,
    pub property_type: Option<PropertyType>,
    pub beds: Option<u32>,
    pub baths: Option<u32>,
    pub cars: Option<u32>,
    pub land_size: LandSize,
    pub price: PriceOutcome,
    pub price_display: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub agent: Option<String>,
    pub market_visibility: Option<MarketVisibility>,
    pub timeframe: Option<String>,
    pub realestate_link: Option<String>,
}

impl CanonicalRecord {
    pub fn purchase_price(&self) -> Option<u64> {
        self.price.value()
    }
}

/// An `acquisition` document as returned by the CMS query. Content in the CMS
/// was entered by hand, so enum-like fields stay free text here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub suburb: Option<String>,
    pub state: Option<String>,
    pub lga: Option<String>,
    pub property_type: Option<String>,
    pub agent: Option<String>,
    pub purchase_price: Option<f64>,
    pub price_display: Option<String>,
    pub purchase_date: Option<String>,
    pub market_visibility: Option<String>,
    pub timeframe: Option<String>,
    pub beds: Option<f64>,
    pub baths: Option<f64>,
    pub cars: Option<f64>,
    pub land_size: Option<f64>,
    pub land_size_unit: Option<String>,
    pub realestate_link: Option<String>,
    pub excerpt: Option<String>,
    pub main_image_url: Option<String>,
    pub status: Option<String>,
    pub featured: Option<bool>,
}

impl RemoteRecord {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }
}
