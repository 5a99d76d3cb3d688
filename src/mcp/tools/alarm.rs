//! Alarm query tool.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::graphql::GraphQlClient;

use super::metrics::Scope;
use super::{resolve_duration, tool_error, tool_json};

const DEFAULT_ALARM_PAGE_SIZE: i32 = 20;

const ALARMS_QUERY: &str = r#"
query queryAlarms($scope: Scope, $keyword: String, $duration: Duration!, $paging: Pagination!) {
  alarms: queryAlarms(scope: $scope, keyword: $keyword, duration: $duration, paging: $paging) {
    id
    keyword
    scope
    startTime
    endTime
    alarmMessage
    tags {
      key
      value
    }
  }
}"#;

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct AlarmQueryParams {
    #[schemars(
        description = "Alarm scope: 'All' (default), 'Service', 'ServiceInstance' or 'Endpoint'"
    )]
    pub scope: Option<String>,
    #[schemars(description = "Keyword to search for in alarm messages")]
    pub keyword: Option<String>,
    #[schemars(
        description = "Relative time window, e.g. '-1h' or '-24h'. Overrides start/end when set"
    )]
    pub duration: Option<String>,
    #[schemars(description = "Window start, e.g. '2025-07-06 10:00:00', '-15m' or 'now'")]
    pub start: Option<String>,
    #[schemars(description = "Window end, same formats as start")]
    pub end: Option<String>,
    #[schemars(description = "Number of alarms per page (default 20)")]
    pub page_size: Option<i32>,
    #[schemars(description = "Page number, starting at 1")]
    pub page_num: Option<i32>,
}

pub async fn query_alarms(
    client: &GraphQlClient,
    params: AlarmQueryParams,
) -> Result<CallToolResult, McpError> {
    let variables = match build_alarm_variables(&params) {
        Ok(variables) => variables,
        Err(message) => return Ok(tool_error(message)),
    };

    let data = match client.execute(ALARMS_QUERY, variables).await {
        Ok(data) => data,
        Err(e) => return Ok(tool_error(format!("failed to query alarms: {e}"))),
    };

    Ok(tool_json(&data))
}

pub(crate) fn build_alarm_variables(params: &AlarmQueryParams) -> Result<Value, String> {
    let duration = resolve_duration(
        params.duration.as_deref(),
        params.start.as_deref(),
        params.end.as_deref(),
        None,
        false,
        0,
    );

    let page_size = match params.page_size.unwrap_or(0) {
        0 => DEFAULT_ALARM_PAGE_SIZE,
        n if n < 0 => return Err("page_size cannot be negative".to_string()),
        n => n,
    };
    let paging = crate::query::Pagination::build(params.page_num.unwrap_or(0), page_size);

    let mut variables = json!({
        "duration": duration,
        "paging": paging,
    });

    // Unknown scopes are dropped rather than rejected.
    if let Some(scope) = params.scope.as_deref().filter(|s| !s.is_empty())
        && let Ok(scope) = scope.parse::<Scope>()
    {
        variables["scope"] = json!(scope);
    }
    if let Some(keyword) = params.keyword.as_deref().filter(|k| !k.is_empty()) {
        variables["keyword"] = json!(keyword);
    }

    Ok(variables)
}
