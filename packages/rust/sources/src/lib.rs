//! Publisher connectors for recipefeed.
//!
//! Each connector lists the records a publisher currently exposes and
//! fetches them into [`RawRecord`](recipefeed_shared::RawRecord)s. Parsing
//! is synchronous; only the HTTP calls are async.

pub mod connectors;
pub mod http;
pub mod images;
pub mod jsonld;
pub mod sitemap;

pub use connectors::{
    MyPlateConnector, NutritionGovConnector, SourceConnector, SourceRegistry, TagMap,
};
pub use http::HttpSession;
pub use images::{ImageStore, LocalImageStore};
