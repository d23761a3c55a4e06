//! Extract the raw query pairs (e.g. `?fields=reviews,owner.name&page=2`) for a `ResponseContext`.

use crate::config::DispatchConfig;
use crate::context::{ResponseContext, ResultValue};
use crate::fields::parse_fields;
use async_trait::async_trait;
use axum::{
    extract::{rejection::QueryRejection, FromRequestParts, Query},
    http::request::Parts,
};

/// All query parameters in request order; repeated keys are kept.
#[derive(Clone, Debug, Default)]
pub struct QueryPairs(pub Vec<(String, String)>);

impl QueryPairs {
    /// Boundary context over these parameters and the handler's result.
    pub fn context<'a>(&'a self, result: Option<ResultValue<'a>>) -> ResponseContext<'a> {
        ResponseContext::new(&self.0, result)
    }

    /// Normalized fields requested through the configured parameter.
    pub fn requested_fields(&self, config: &DispatchConfig) -> Vec<String> {
        self.context(None)
            .query_value(&config.param_name)
            .map(|raw| parse_fields(&raw))
            .unwrap_or_default()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for QueryPairs
where
    S: Send + Sync,
{
    type Rejection = QueryRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)?;
        Ok(QueryPairs(pairs))
    }
}
