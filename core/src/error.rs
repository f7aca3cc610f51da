//! Typed errors raised where user input or dataset files enter the crate.
//! The query engine itself has no error path.

use thiserror::Error;

use crate::listing::Kind;

/// Rejections while turning raw filter/sort strings into a [`crate::Query`].
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("unknown listing kind: {0}")]
    UnknownKind(String),

    #[error("unknown filter `{name}` for {kind}")]
    UnknownFilter { kind: Kind, name: String },

    #[error("unknown category `{value}` for {kind}")]
    UnknownCategory { kind: Kind, value: String },

    #[error("unknown price tier `{0}`")]
    UnknownPriceTier(String),

    #[error("unknown duration bucket `{0}` (expected short, medium or long)")]
    UnknownDuration(String),

    #[error("unknown sort key `{0}`")]
    UnknownSort(String),

    #[error("sort `{sort}` does not apply to {kind}")]
    SortNotApplicable { kind: Kind, sort: String },

    #[error("invalid price tiers: {0}")]
    InvalidTiers(String),

    #[error("unknown language `{0}`")]
    UnknownLanguage(String),
}

/// Failures while loading a dataset.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("listing `{0}` has no id")]
    MissingId(String),

    #[error("duplicate listing id `{0}`")]
    DuplicateId(String),
}
