//! Access to the headless CMS that stores `acquisition` documents.

mod sanity;

pub use sanity::SanityClient;

use serde_json::{Map, Value};
use std::fmt::Debug;

use crate::http::HttpError;
use crate::workflows::acquisitions::RemoteRecord;

/// Fields fetched for every acquisition document.
pub const ACQUISITION_QUERY: &str = r#"*[_type == "acquisition"] {
  _id,
  title,
  "slug": slug.current,
  suburb,
  state,
  lga,
  property_type,
  agent,
  purchase_price,
  price_display,
  purchase_date,
  market_visibility,
  timeframe,
  beds,
  baths,
  cars,
  land_size,
  land_size_unit,
  realestate_link,
  excerpt,
  main_image_url,
  status,
  featured
}"#;

#[derive(Debug, thiserror::Error)]
pub enum CmsError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("a write token is required for CMS mutations")]
    MissingToken,
    #[error("cms rejected the mutation: {0}")]
    Rejected(String),
}

/// Synchronous read/write surface of the CMS.
pub trait CmsGateway: Debug {
    fn fetch_acquisitions(&self) -> Result<Vec<RemoteRecord>, CmsError>;

    /// Creates a document and returns the id the CMS assigned.
    fn create(&self, document: &Value) -> Result<String, CmsError>;

    fn patch(&self, id: &str, set: &Map<String, Value>) -> Result<(), CmsError>;

    /// Upserts a document carrying its own `_id`.
    fn create_or_replace(&self, document: &Value) -> Result<String, CmsError>;
}
