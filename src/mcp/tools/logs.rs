//! Log search tool.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::graphql::GraphQlClient;
use crate::query::{DEFAULT_DURATION_MINUTES, DurationRange, Pagination, build_duration};

use super::{tool_error, tool_json};

const LOGS_QUERY: &str = r#"
query queryLogs($condition: LogQueryCondition) {
  result: queryLogs(condition: $condition) {
    logs {
      serviceName
      serviceId
      serviceInstanceName
      serviceInstanceId
      endpointName
      traceId
      timestamp
      contentType
      content
      tags {
        key
        value
      }
    }
  }
}"#;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct LogTag {
    pub key: String,
    pub value: String,
}

/// GraphQL `LogQueryCondition` input. Absent filters are omitted from the
/// wire shape entirely rather than sent as empty strings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQueryCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_trace: Option<TraceScopeCondition>,
    pub query_duration: DurationRange,
    pub paging: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<LogTag>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceScopeCondition {
    pub trace_id: String,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct LogQueryParams {
    #[schemars(description = "Service ID to filter logs")]
    pub service_id: Option<String>,
    #[schemars(description = "Service instance ID to filter logs")]
    pub service_instance_id: Option<String>,
    #[schemars(description = "Endpoint ID to filter logs")]
    pub endpoint_id: Option<String>,
    #[schemars(description = "Only logs attached to this trace ID")]
    pub trace_id: Option<String>,
    #[schemars(
        description = "Log tags to match, e.g. [{\"key\": \"level\", \"value\": \"ERROR\"}]"
    )]
    pub tags: Option<Vec<LogTag>>,
    #[schemars(description = "Window start, e.g. '2025-07-06 10:00:00', '-15m' or 'now'")]
    pub start: Option<String>,
    #[schemars(description = "Window end, same formats as start")]
    pub end: Option<String>,
    #[schemars(description = "Aggregation step: SECOND, MINUTE, HOUR or DAY")]
    pub step: Option<String>,
    #[schemars(description = "Query the cold storage stage")]
    pub cold: Option<bool>,
    #[schemars(description = "Page number, starting at 1")]
    pub page_num: Option<i32>,
    #[schemars(description = "Number of log entries per page (default 15)")]
    pub page_size: Option<i32>,
}

pub async fn query_logs(
    client: &GraphQlClient,
    params: LogQueryParams,
) -> Result<CallToolResult, McpError> {
    let condition = build_log_condition(&params);

    let variables = json!({ "condition": condition });
    let data = match client.execute(LOGS_QUERY, variables).await {
        Ok(data) => data,
        Err(e) => return Ok(tool_error(format!("failed to query logs: {e}"))),
    };

    Ok(tool_json(data.get("result").unwrap_or(&Value::Null)))
}

pub(crate) fn build_log_condition(params: &LogQueryParams) -> LogQueryCondition {
    let non_empty = |value: &Option<String>| value.clone().filter(|s| !s.is_empty());
    LogQueryCondition {
        service_id: non_empty(&params.service_id),
        service_instance_id: non_empty(&params.service_instance_id),
        endpoint_id: non_empty(&params.endpoint_id),
        related_trace: non_empty(&params.trace_id)
            .map(|trace_id| TraceScopeCondition { trace_id }),
        query_duration: build_duration(
            params.start.as_deref().unwrap_or(""),
            params.end.as_deref().unwrap_or(""),
            params.step.as_deref().filter(|s| !s.is_empty()),
            params.cold.unwrap_or(false),
            DEFAULT_DURATION_MINUTES,
        ),
        paging: Pagination::build(
            params.page_num.unwrap_or(0),
            params.page_size.unwrap_or(0),
        ),
        tags: params.tags.clone().filter(|tags| !tags.is_empty()),
    }
}
