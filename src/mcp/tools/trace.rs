//! Distributed-trace tools: single-trace lookup (regular and cold stage),
//! filtered trace search, and the full/summary/errors_only response views.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::graphql::GraphQlClient;
use crate::query::{DurationRange, Pagination, parse_duration};

use super::{tool_error, tool_json};

/// Traces default to a larger page than the generic list queries.
pub const DEFAULT_TRACE_PAGE_SIZE: i32 = 20;
const DEFAULT_TRACE_DURATION: &str = "1h";
const BASIC_TRACE_TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

const TRACE_QUERY: &str = r#"
query queryTrace($traceId: ID!) {
  trace: queryTrace(traceId: $traceId) {
    spans {
      traceId
      segmentId
      spanId
      parentSpanId
      refs {
        traceId
        parentSegmentId
        parentSpanId
        type
      }
      serviceCode
      serviceInstanceName
      startTime
      endTime
      endpointName
      type
      peer
      component
      isError
      layer
      tags {
        key
        value
      }
      logs {
        time
        data {
          key
          value
        }
      }
    }
  }
}"#;

const COLD_TRACE_QUERY: &str = r#"
query queryColdTrace($traceId: ID!, $duration: Duration!) {
  trace: queryTraceFromColdStage(traceId: $traceId, duration: $duration) {
    spans {
      traceId
      segmentId
      spanId
      parentSpanId
      refs {
        traceId
        parentSegmentId
        parentSpanId
        type
      }
      serviceCode
      serviceInstanceName
      startTime
      endTime
      endpointName
      type
      peer
      component
      isError
      layer
      tags {
        key
        value
      }
      logs {
        time
        data {
          key
          value
        }
      }
    }
  }
}"#;

const BASIC_TRACES_QUERY: &str = r#"
query queryBasicTraces($condition: TraceQueryCondition) {
  result: queryBasicTraces(condition: $condition) {
    traces {
      segmentId
      endpointNames
      duration
      start
      isError
      traceIds
    }
  }
}"#;

/// Response views shrinking raw trace payloads for LLM consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Full,
    Summary,
    ErrorsOnly,
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(View::Full),
            "summary" => Ok(View::Summary),
            "errors_only" => Ok(View::ErrorsOnly),
            other => Err(format!(
                "invalid view '{other}', available views: full, summary, errors_only"
            )),
        }
    }
}

/// One span of a trace as returned by the OAP. Fields the reshapers need
/// are typed; everything else passes through untouched via `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(default)]
    pub span_id: i64,
    #[serde(default)]
    pub parent_span_id: i64,
    #[serde(default)]
    pub service_code: String,
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default)]
    pub spans: Vec<Span>,
}

/// One row of a trace search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicTrace {
    #[serde(default)]
    pub segment_id: String,
    #[serde(default)]
    pub endpoint_names: Vec<String>,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    #[serde(default)]
    pub trace_ids: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceBrief {
    #[serde(default)]
    pub traces: Vec<BasicTrace>,
}

/// Condensed single-trace view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceSummary {
    pub trace_id: String,
    pub total_spans: usize,
    pub services: Vec<String>,
    pub total_duration_ms: i64,
    pub error_count: usize,
    pub has_errors: bool,
    pub root_endpoint: String,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
}

/// Condensed trace-search view with aggregate statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TracesSummary {
    pub total_traces: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub services: Vec<String>,
    pub endpoints: Vec<String>,
    pub avg_duration_ms: f64,
    pub min_duration_ms: i64,
    pub max_duration_ms: i64,
    pub time_range: TimeRange,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error_traces: Vec<BasicTraceSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slow_traces: Vec<BasicTraceSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BasicTraceSummary {
    pub trace_id: String,
    pub service_name: String,
    pub endpoint_name: String,
    pub start_time_ms: i64,
    pub duration_ms: i64,
    pub is_error: bool,
    pub span_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceState {
    All,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryOrder {
    ByStartTime,
    ByDuration,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SpanTag {
    pub key: String,
    pub value: String,
}

/// GraphQL `TraceQueryCondition` input.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceQueryCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_duration: Option<DurationRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_trace_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_trace_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<SpanTag>>,
    pub trace_state: TraceState,
    pub query_order: QueryOrder,
    pub paging: Pagination,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetTraceParams {
    #[schemars(description = "The unique identifier of the trace to retrieve")]
    pub trace_id: String,
    #[schemars(
        description = "Level of detail: 'full' (complete span data, default), 'summary' (aggregated statistics), or 'errors_only' (error spans only)"
    )]
    pub view: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetColdTraceParams {
    #[schemars(description = "The unique identifier of the trace to retrieve")]
    pub trace_id: String,
    #[schemars(
        description = "Time window the trace lies in, e.g. '-30m' (last 30 minutes) or '7d' (last 7 days). Required for cold-stage lookups"
    )]
    pub duration: String,
    #[schemars(
        description = "Level of detail: 'full' (complete span data, default), 'summary' (aggregated statistics), or 'errors_only' (error spans only)"
    )]
    pub view: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct QueryTracesParams {
    #[schemars(description = "Filter by service ID")]
    pub service_id: Option<String>,
    #[schemars(description = "Filter by service instance ID")]
    pub service_instance_id: Option<String>,
    #[schemars(description = "Filter by a specific trace ID")]
    pub trace_id: Option<String>,
    #[schemars(description = "Filter by endpoint ID")]
    pub endpoint_id: Option<String>,
    #[schemars(
        description = "Relative time window, e.g. '-30m', '-24h' or '7d'. Defaults to the last hour unless trace_id is set"
    )]
    pub duration: Option<String>,
    #[schemars(description = "Minimum trace duration in milliseconds")]
    pub min_trace_duration: Option<i64>,
    #[schemars(description = "Maximum trace duration in milliseconds")]
    pub max_trace_duration: Option<i64>,
    #[schemars(description = "Trace state filter: 'all' (default), 'success' or 'error'")]
    pub trace_state: Option<String>,
    #[schemars(description = "Result ordering: 'start_time' (default) or 'duration'")]
    pub query_order: Option<String>,
    #[schemars(description = "Number of traces per page (default 20)")]
    pub page_size: Option<i32>,
    #[schemars(description = "Page number, starting at 1")]
    pub page_num: Option<i32>,
    #[schemars(
        description = "Level of detail: 'full' (default), 'summary' (aggregate statistics) or 'errors_only' (error traces only)"
    )]
    pub view: Option<String>,
    #[schemars(
        description = "With view='summary', traces slower than this many milliseconds are listed as slow traces. 0 disables the list"
    )]
    pub slow_trace_threshold: Option<i64>,
    #[schemars(description = "Span tags to match, e.g. [{\"key\": \"http.method\", \"value\": \"GET\"}]")]
    pub tags: Option<Vec<SpanTag>>,
    #[schemars(description = "Query the cold storage stage instead of the hot stage")]
    pub cold: Option<bool>,
}

pub async fn get_trace_details(
    client: &GraphQlClient,
    params: GetTraceParams,
) -> Result<CallToolResult, McpError> {
    if params.trace_id.is_empty() {
        return Ok(tool_error("missing required parameter: trace_id"));
    }
    let view = normalize_view(params.view.as_deref());

    let variables = json!({ "traceId": params.trace_id });
    let data = match client.execute(TRACE_QUERY, variables).await {
        Ok(data) => data,
        Err(e) => {
            return Ok(tool_error(format!(
                "failed to query trace '{}': {e}",
                params.trace_id
            )));
        }
    };

    match decode_trace(&data) {
        Ok(trace) => Ok(process_trace_result(&params.trace_id, &trace, &view)),
        Err(message) => Ok(tool_error(message)),
    }
}

pub async fn get_cold_trace_details(
    client: &GraphQlClient,
    params: GetColdTraceParams,
) -> Result<CallToolResult, McpError> {
    if params.trace_id.is_empty() {
        return Ok(tool_error("missing required parameter: trace_id"));
    }
    if params.duration.is_empty() {
        return Ok(tool_error("missing required parameter: duration"));
    }
    let view = normalize_view(params.view.as_deref());

    let duration = parse_duration(&params.duration, true);
    let variables = json!({ "traceId": params.trace_id, "duration": duration });
    let data = match client.execute(COLD_TRACE_QUERY, variables).await {
        Ok(data) => data,
        Err(e) => {
            return Ok(tool_error(format!(
                "failed to query cold trace '{}': {e}",
                params.trace_id
            )));
        }
    };

    match decode_trace(&data) {
        Ok(trace) => Ok(process_trace_result(&params.trace_id, &trace, &view)),
        Err(message) => Ok(tool_error(message)),
    }
}

pub async fn query_traces(
    client: &GraphQlClient,
    params: QueryTracesParams,
) -> Result<CallToolResult, McpError> {
    let view = normalize_view(params.view.as_deref());
    let slow_trace_threshold = params.slow_trace_threshold.unwrap_or(0);

    let condition = match build_trace_condition(&params) {
        Ok(condition) => condition,
        Err(message) => return Ok(tool_error(message)),
    };

    let variables = json!({ "condition": condition });
    let data = match client.execute(BASIC_TRACES_QUERY, variables).await {
        Ok(data) => data,
        Err(e) => return Ok(tool_error(format!("failed to query traces: {e}"))),
    };

    match decode_trace_brief(&data) {
        Ok(brief) => Ok(process_traces_result(&brief, &view, slow_trace_threshold)),
        Err(message) => Ok(tool_error(message)),
    }
}

fn normalize_view(view: Option<&str>) -> String {
    match view {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "full".to_string(),
    }
}

fn decode_trace(data: &Value) -> Result<Trace, String> {
    match data.get("trace") {
        None | Some(Value::Null) => Ok(Trace::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| format!("failed to decode trace data: {e}")),
    }
}

fn decode_trace_brief(data: &Value) -> Result<TraceBrief, String> {
    match data.get("result") {
        None | Some(Value::Null) => Ok(TraceBrief::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| format!("failed to decode trace query result: {e}")),
    }
}

/// Validate filters and assemble the GraphQL condition.
pub(crate) fn build_trace_condition(
    params: &QueryTracesParams,
) -> Result<TraceQueryCondition, String> {
    let service_id = params.service_id.as_deref().unwrap_or("");
    let service_instance_id = params.service_instance_id.as_deref().unwrap_or("");
    let trace_id = params.trace_id.as_deref().unwrap_or("");
    let endpoint_id = params.endpoint_id.as_deref().unwrap_or("");
    let duration = params.duration.as_deref().unwrap_or("");
    let min_duration = params.min_trace_duration.unwrap_or(0);
    let max_duration = params.max_trace_duration.unwrap_or(0);

    if service_id.is_empty()
        && service_instance_id.is_empty()
        && trace_id.is_empty()
        && endpoint_id.is_empty()
        && duration.is_empty()
        && min_duration == 0
        && max_duration == 0
    {
        return Err("at least one filter condition must be provided".to_string());
    }
    if min_duration > 0 && max_duration > 0 && min_duration > max_duration {
        return Err(format!(
            "invalid duration range: min_duration ({min_duration}) > max_duration ({max_duration})"
        ));
    }
    let page_size = params.page_size.unwrap_or(0);
    let page_num = params.page_num.unwrap_or(0);
    if page_size < 0 {
        return Err("page_size cannot be negative".to_string());
    }
    if page_num < 0 {
        return Err("page_num cannot be negative".to_string());
    }

    let cold = params.cold.unwrap_or(false);
    // A plain trace-ID lookup carries no time window unless one was given.
    let query_duration = if !duration.is_empty() {
        Some(parse_duration(duration, cold))
    } else if trace_id.is_empty() {
        Some(parse_duration(DEFAULT_TRACE_DURATION, cold))
    } else {
        None
    };

    let trace_state = match params.trace_state.as_deref().unwrap_or("") {
        "" | "all" => TraceState::All,
        "success" => TraceState::Success,
        "error" => TraceState::Error,
        other => {
            return Err(format!(
                "invalid trace_state '{other}', available states: success, error, all"
            ));
        }
    };

    let query_order = match params.query_order.as_deref().unwrap_or("") {
        "" | "start_time" => QueryOrder::ByStartTime,
        "duration" => QueryOrder::ByDuration,
        other => {
            return Err(format!(
                "invalid query_order '{other}', available orders: start_time, duration"
            ));
        }
    };

    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
    Ok(TraceQueryCondition {
        service_id: non_empty(service_id),
        service_instance_id: non_empty(service_instance_id),
        trace_id: non_empty(trace_id),
        endpoint_id: non_empty(endpoint_id),
        query_duration,
        min_trace_duration: (min_duration > 0).then_some(min_duration),
        max_trace_duration: (max_duration > 0).then_some(max_duration),
        tags: params.tags.clone().filter(|tags| !tags.is_empty()),
        trace_state,
        query_order,
        paging: Pagination::build(
            page_num,
            if page_size == 0 {
                DEFAULT_TRACE_PAGE_SIZE
            } else {
                page_size
            },
        ),
    })
}

/// Apply the requested view to a single trace. The not-found check runs
/// before view validation so a bogus view never masks a missing trace.
pub(crate) fn process_trace_result(trace_id: &str, trace: &Trace, view: &str) -> CallToolResult {
    if trace.spans.is_empty() {
        return tool_error(format!("trace with ID '{trace_id}' not found"));
    }
    match view.parse::<View>() {
        Ok(View::Full) => tool_json(trace),
        Ok(View::Summary) => tool_json(&summarize_trace(trace_id, trace)),
        Ok(View::ErrorsOnly) => tool_json(&error_spans(trace)),
        Err(message) => tool_error(message),
    }
}

/// Apply the requested view to a trace search result.
pub(crate) fn process_traces_result(
    brief: &TraceBrief,
    view: &str,
    slow_trace_threshold: i64,
) -> CallToolResult {
    if brief.traces.is_empty() {
        return tool_error("no traces found matching the query criteria");
    }
    match view.parse::<View>() {
        Ok(View::Full) => tool_json(brief),
        Ok(View::Summary) => tool_json(&summarize_traces(brief, slow_trace_threshold)),
        Ok(View::ErrorsOnly) => tool_json(&error_traces(brief)),
        Err(message) => tool_error(message),
    }
}

pub(crate) fn summarize_trace(trace_id: &str, trace: &Trace) -> TraceSummary {
    let mut summary = TraceSummary {
        trace_id: trace_id.to_string(),
        total_spans: trace.spans.len(),
        ..Default::default()
    };

    let mut services = BTreeSet::new();
    for span in &trace.spans {
        services.insert(span.service_code.clone());
        if span.is_error == Some(true) {
            summary.error_count += 1;
        }
        // Root span heuristic shared with the SkyWalking UI.
        if span.span_id == 0 && span.parent_span_id == -1 {
            if let Some(endpoint) = &span.endpoint_name {
                summary.root_endpoint = endpoint.clone();
            }
            summary.start_time_ms = span.start_time;
            summary.end_time_ms = span.end_time;
            if span.start_time > 0 && span.end_time > 0 {
                summary.total_duration_ms = span.end_time - span.start_time;
            }
        }
    }

    summary.has_errors = summary.error_count > 0;
    summary.services = services.into_iter().collect();
    summary
}

pub(crate) fn error_spans(trace: &Trace) -> Vec<Span> {
    trace
        .spans
        .iter()
        .filter(|span| span.is_error == Some(true))
        .cloned()
        .collect()
}

pub(crate) fn summarize_traces(brief: &TraceBrief, slow_trace_threshold: i64) -> TracesSummary {
    let mut summary = TracesSummary {
        total_traces: brief.traces.len(),
        ..Default::default()
    };

    let mut services = BTreeSet::new();
    let mut endpoints = BTreeSet::new();
    let mut error_traces = Vec::new();
    let mut slow_traces = Vec::new();
    let mut counted = 0usize;
    let mut total_duration = 0i64;
    let mut min_duration = i64::MAX;
    let mut max_duration = i64::MIN;
    let mut min_start = 0i64;
    let mut max_end = 0i64;

    for item in &brief.traces {
        // Unparseable start times keep the trace in the total count but
        // out of the aggregates.
        let Some(start_ms) = parse_basic_trace_start(&item.start) else {
            continue;
        };
        let end_ms = start_ms + item.duration;
        if min_start == 0 || start_ms < min_start {
            min_start = start_ms;
        }
        if end_ms > max_end {
            max_end = end_ms;
        }

        counted += 1;
        total_duration += item.duration;
        min_duration = min_duration.min(item.duration);
        max_duration = max_duration.max(item.duration);

        let is_error = item.is_error == Some(true);
        if is_error {
            summary.error_count += 1;
            error_traces.push(basic_trace_summary(item, start_ms, true));
        } else {
            summary.success_count += 1;
        }
        if slow_trace_threshold > 0 && item.duration > slow_trace_threshold {
            slow_traces.push(basic_trace_summary(item, start_ms, is_error));
        }

        services.insert(item.segment_id.clone());
        for endpoint in &item.endpoint_names {
            if !endpoint.is_empty() {
                endpoints.insert(endpoint.clone());
            }
        }
    }

    if counted > 0 {
        summary.avg_duration_ms = total_duration as f64 / counted as f64;
        summary.min_duration_ms = min_duration;
        summary.max_duration_ms = max_duration;
    }
    summary.time_range = TimeRange {
        start_time_ms: min_start,
        end_time_ms: max_end,
        duration_ms: max_end - min_start,
    };
    summary.services = services.into_iter().collect();
    summary.endpoints = endpoints.into_iter().collect();

    error_traces.sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));
    slow_traces.sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));
    summary.error_traces = error_traces;
    summary.slow_traces = slow_traces;
    summary
}

pub(crate) fn error_traces(brief: &TraceBrief) -> Vec<BasicTraceSummary> {
    let mut errors: Vec<BasicTraceSummary> = brief
        .traces
        .iter()
        .filter(|item| item.is_error == Some(true))
        .filter_map(|item| {
            parse_basic_trace_start(&item.start).map(|start_ms| basic_trace_summary(item, start_ms, true))
        })
        .collect();
    errors.sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));
    errors
}

fn basic_trace_summary(item: &BasicTrace, start_ms: i64, is_error: bool) -> BasicTraceSummary {
    BasicTraceSummary {
        trace_id: item.trace_ids.first().cloned().unwrap_or_default(),
        // The list result exposes no service name; the segment ID is the
        // closest stable identifier.
        service_name: item.segment_id.clone(),
        endpoint_name: item.endpoint_names.join(", "),
        start_time_ms: start_ms,
        duration_ms: item.duration,
        is_error,
        // Span counts are not part of the list result.
        span_count: 0,
    }
}

fn parse_basic_trace_start(start: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(start, BASIC_TRACE_TIME_LAYOUT)
        .ok()
        .map(|t| t.and_utc().timestamp_millis())
}
