//! Event query tool.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::graphql::GraphQlClient;
use crate::query::Pagination;

use super::{resolve_duration, tool_error, tool_json};

const DEFAULT_EVENT_PAGE_SIZE: i32 = 20;

const EVENT_LEVELS: [&str; 3] = ["Normal", "Warning", "Critical"];

const EVENTS_QUERY: &str = r#"
query queryEvents($source: String, $level: EventLevel, $type: String, $duration: Duration!, $paging: Pagination!) {
  events: queryEvents(source: $source, level: $level, type: $type, duration: $duration, paging: $paging) {
    uuid
    event
    message
    level
    startTime
    endTime
    type
    source
    parameters {
      key
      value
    }
  }
}"#;

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct EventQueryParams {
    #[schemars(
        description = "Event source, e.g. 'service:name', 'instance:name' or 'endpoint:name'"
    )]
    pub source: Option<String>,
    #[schemars(description = "Event severity: 'Normal', 'Warning' or 'Critical'")]
    pub level: Option<String>,
    #[schemars(
        description = "Event type to filter, e.g. 'Deployment', 'Scaly', 'Routing', 'CRUD' or 'Exception'"
    )]
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    #[schemars(
        description = "Relative time window, e.g. '-1h' or '-7d'. Overrides start/end when set"
    )]
    pub duration: Option<String>,
    #[schemars(description = "Window start, e.g. '2025-07-06 10:00:00', '-15m' or 'now'")]
    pub start: Option<String>,
    #[schemars(description = "Window end, same formats as start")]
    pub end: Option<String>,
    #[schemars(description = "Number of events per page (default 20)")]
    pub page_size: Option<i32>,
    #[schemars(description = "Page number, starting at 1")]
    pub page_num: Option<i32>,
}

pub async fn query_events(
    client: &GraphQlClient,
    params: EventQueryParams,
) -> Result<CallToolResult, McpError> {
    let variables = match build_event_variables(&params) {
        Ok(variables) => variables,
        Err(message) => return Ok(tool_error(message)),
    };

    let data = match client.execute(EVENTS_QUERY, variables).await {
        Ok(data) => data,
        Err(e) => return Ok(tool_error(format!("failed to query events: {e}"))),
    };

    Ok(tool_json(&data))
}

pub(crate) fn build_event_variables(params: &EventQueryParams) -> Result<Value, String> {
    let duration = resolve_duration(
        params.duration.as_deref(),
        params.start.as_deref(),
        params.end.as_deref(),
        None,
        false,
        0,
    );

    let page_size = match params.page_size.unwrap_or(0) {
        0 => DEFAULT_EVENT_PAGE_SIZE,
        n if n < 0 => return Err("page_size cannot be negative".to_string()),
        n => n,
    };
    let paging = Pagination::build(params.page_num.unwrap_or(0), page_size);

    let mut variables = json!({
        "duration": duration,
        "paging": paging,
    });

    if let Some(source) = params.source.as_deref().filter(|s| !s.is_empty()) {
        variables["source"] = json!(source);
    }
    // Unknown levels are dropped rather than rejected.
    if let Some(level) = params.level.as_deref().filter(|l| !l.is_empty())
        && EVENT_LEVELS.contains(&level)
    {
        variables["level"] = json!(level);
    }
    if let Some(event_type) = params.event_type.as_deref().filter(|t| !t.is_empty()) {
        variables["type"] = json!(event_type);
    }

    Ok(variables)
}
