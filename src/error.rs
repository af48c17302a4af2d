//! Layered error types.
//!
//! Each seam of the engine (config loading, persistence, venue feeds) gets
//! its own `thiserror` enum; [`Error`] aggregates them for the public API.
//! Per the engine's error-handling contract, almost none of these ever
//! reach a caller: they are logged and absorbed at the point of use. Only
//! startup configuration failures propagate out of `main`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("no venues enabled")]
    NoVenuesEnabled,

    #[error("cross-platform matching requested but both slug and semantic matching are disabled")]
    NoMatchingMethodEnabled,

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("venue {venue} request timed out")]
    Timeout { venue: String },

    #[error("venue {venue} request failed: {source}")]
    Request {
        venue: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("venue {venue} returned malformed data: {reason}")]
    Malformed { venue: String, reason: String },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("opportunity {0} not found")]
    NotFound(uuid::Uuid),

    #[error("invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("invalid link: {0}")]
    InvalidLink(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
