mod client;

pub use client::{GraphQlClient, QueryError, QueryResult};
