//! Thin GraphQL client for the SkyWalking OAP query protocol.

use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors surfaced by GraphQL query execution.
#[derive(Error, Diagnostic, Debug)]
pub enum QueryError {
    /// The HTTP request never produced a response.
    #[error("failed to reach the GraphQL endpoint: {source}")]
    #[diagnostic(
        code(swmcp::graphql::connection_failed),
        help("Is the OAP server running? Check the --url flag or the SW_URL environment variable.")
    )]
    Connection {
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-2xx status.
    #[error("GraphQL request failed with status {status}: {body}")]
    #[diagnostic(code(swmcp::graphql::http_status))]
    Http { status: u16, body: String },

    /// The backend answered 200 but reported query errors.
    #[error("GraphQL errors: {0}")]
    #[diagnostic(code(swmcp::graphql::backend_errors))]
    GraphQl(String),

    /// The response body was not the expected JSON shape.
    #[error("invalid GraphQL response: {message}")]
    #[diagnostic(code(swmcp::graphql::invalid_response))]
    InvalidResponse { message: String },
}

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    errors: Vec<GraphQlResponseError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponseError {
    #[serde(default)]
    message: String,
}

/// Client bound to a single OAP `/graphql` endpoint.
///
/// Cheap to clone via `Arc`; the underlying connection pool is shared.
pub struct GraphQlClient {
    endpoint: String,
    http: reqwest::Client,
}

impl GraphQlClient {
    pub fn new(endpoint: impl Into<String>) -> QueryResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| QueryError::Connection { source })?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST a query with variables and return the `data` payload.
    ///
    /// Backend-reported errors are joined into a single [`QueryError::GraphQl`].
    pub async fn execute(&self, query: &str, variables: Value) -> QueryResult<Value> {
        debug!(endpoint = %self.endpoint, "executing GraphQL query");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .map_err(|source| QueryError::Connection { source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(QueryError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GraphQlResponse =
            response
                .json()
                .await
                .map_err(|e| QueryError::InvalidResponse {
                    message: e.to_string(),
                })?;

        if !parsed.errors.is_empty() {
            let joined = parsed
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(QueryError::GraphQl(joined));
        }

        Ok(parsed.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_endpoint_verbatim() {
        let client = GraphQlClient::new("http://oap:12800/graphql").unwrap();
        assert_eq!(client.endpoint(), "http://oap:12800/graphql");
    }

    #[test]
    fn graphql_error_display_joins_messages() {
        let err = QueryError::GraphQl("first, second".to_string());
        assert_eq!(err.to_string(), "GraphQL errors: first, second");
    }

    #[test]
    fn http_error_carries_status_and_body() {
        let err = QueryError::Http {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("bad gateway"));
    }
}
