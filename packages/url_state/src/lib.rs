#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shareable links.
//!
//! Every explore view is reproducible from its query string. Scalar
//! arguments are plain form values; the dataset dictionaries and their view
//! configurations travel as Python literals, the notation older links were
//! written in. [`decode`] and [`encode`] convert between query strings and
//! JSON maps, [`UrlSearchArgs`] gives the decoded map its typed shape.

pub mod codec;
pub mod literal;
pub mod search_args;

use thiserror::Error;

pub use codec::{NESTED_KEYS, decode, encode};
pub use literal::LiteralError;
pub use search_args::{DEFAULT_BUCKET, DEFAULT_LINK_CONFIDENCE, UrlSearchArgs};

/// Errors raised while reading a link.
#[derive(Debug, Error)]
pub enum UrlStateError {
    #[error("malformed value for '{key}': {source}")]
    MalformedNested { key: String, source: LiteralError },
    #[error("invalid value for '{key}': '{value}'")]
    InvalidArgument { key: String, value: String },
    #[error("invalid configuration at index {index}: {source}")]
    InvalidConfig {
        index: usize,
        source: serde_json::Error,
    },
    #[error("configuration index {index} out of range for {len} datasets")]
    ConfigIndex { index: usize, len: usize },
}
