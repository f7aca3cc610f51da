pub mod catalog;
pub mod engine;
pub mod error;
pub mod i18n;
pub mod listing;
pub mod live;
pub mod persist;
pub mod query;
pub mod text;

pub use catalog::{Catalog, Record};
pub use engine::{execute, run, Page};
pub use error::{CatalogError, QueryError};
pub use i18n::{Language, Translations};
pub use listing::{Activity, Experience, Field, Kind, Listing, Property};
pub use query::{DurationBucket, Filter, PageRequest, PriceBand, PriceTiers, Query, QuerySpec, SortKey};
