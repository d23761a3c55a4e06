//! Axum extractors for the HTTP boundary.

mod query;

pub use query::QueryPairs;
