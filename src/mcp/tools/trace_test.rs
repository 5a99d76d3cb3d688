use serde_json::{Map, Value, json};

use super::trace::{
    BasicTrace, QueryTracesParams, Span, SpanTag, Trace, TraceBrief, build_trace_condition,
    error_spans, error_traces, process_trace_result, process_traces_result, summarize_trace,
    summarize_traces,
};

/// Pull the text payload out of a tool result, independent of the content
/// model's accessors.
fn result_text(result: &rmcp::model::CallToolResult) -> String {
    let value = serde_json::to_value(result).unwrap();
    value["content"][0]["text"].as_str().unwrap().to_string()
}

fn is_error(result: &rmcp::model::CallToolResult) -> bool {
    result.is_error == Some(true)
}

fn span(span_id: i64, parent_span_id: i64, service: &str, is_error: bool) -> Span {
    Span {
        span_id,
        parent_span_id,
        service_code: service.to_string(),
        start_time: 1_000,
        end_time: 1_200,
        endpoint_name: Some(format!("/{service}")),
        is_error: Some(is_error),
        extra: Map::new(),
    }
}

fn basic_trace(trace_id: &str, start: &str, duration: i64, is_error: bool) -> BasicTrace {
    BasicTrace {
        segment_id: format!("segment-{trace_id}"),
        endpoint_names: vec!["/api/checkout".to_string()],
        duration,
        start: start.to_string(),
        is_error: Some(is_error),
        trace_ids: vec![trace_id.to_string()],
        extra: Map::new(),
    }
}

#[test]
fn missing_trace_is_reported_before_view_validation() {
    let empty = Trace::default();
    for view in ["full", "summary", "errors_only", "bogus"] {
        let result = process_trace_result("abc123", &empty, view);
        assert!(is_error(&result), "view {view}");
        assert_eq!(result_text(&result), "trace with ID 'abc123' not found");
    }
}

#[test]
fn invalid_view_is_rejected_for_existing_traces() {
    let trace = Trace {
        spans: vec![span(0, -1, "gateway", false)],
    };
    let result = process_trace_result("abc123", &trace, "bogus");
    assert!(is_error(&result));
    assert_eq!(
        result_text(&result),
        "invalid view 'bogus', available views: full, summary, errors_only"
    );
}

#[test]
fn full_view_returns_all_spans() {
    let trace = Trace {
        spans: vec![span(0, -1, "gateway", false), span(1, 0, "orders", true)],
    };
    let result = process_trace_result("abc123", &trace, "full");
    assert!(!is_error(&result));
    let value: Value = serde_json::from_str(&result_text(&result)).unwrap();
    assert_eq!(value["spans"].as_array().unwrap().len(), 2);
}

#[test]
fn summary_view_aggregates_spans() {
    let trace = Trace {
        spans: vec![
            span(0, -1, "gateway", false),
            span(1, 0, "orders", true),
            span(2, 1, "orders", true),
        ],
    };
    let summary = summarize_trace("abc123", &trace);
    assert_eq!(summary.trace_id, "abc123");
    assert_eq!(summary.total_spans, 3);
    assert_eq!(summary.error_count, 2);
    assert!(summary.has_errors);
    assert_eq!(summary.services, vec!["gateway", "orders"]);
    assert_eq!(summary.root_endpoint, "/gateway");
    assert_eq!(summary.total_duration_ms, 200);
    assert_eq!(summary.start_time_ms, 1_000);
    assert_eq!(summary.end_time_ms, 1_200);
}

#[test]
fn summary_without_root_span_leaves_timing_empty() {
    let trace = Trace {
        spans: vec![span(3, 2, "orders", false)],
    };
    let summary = summarize_trace("abc123", &trace);
    assert_eq!(summary.root_endpoint, "");
    assert_eq!(summary.total_duration_ms, 0);
}

#[test]
fn errors_only_view_keeps_error_spans() {
    let trace = Trace {
        spans: vec![
            span(0, -1, "gateway", false),
            span(1, 0, "orders", true),
            span(2, 1, "payments", false),
        ],
    };
    let errors = error_spans(&trace);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].service_code, "orders");
}

#[test]
fn empty_search_result_is_an_error() {
    let result = process_traces_result(&TraceBrief::default(), "full", 0);
    assert!(is_error(&result));
    assert_eq!(
        result_text(&result),
        "no traces found matching the query criteria"
    );
}

#[test]
fn traces_summary_aggregates_counts_and_durations() {
    let brief = TraceBrief {
        traces: vec![
            basic_trace("t1", "2025-07-06 10:00:00", 100, false),
            basic_trace("t2", "2025-07-06 10:00:01", 300, true),
            basic_trace("t3", "2025-07-06 10:00:02", 200, false),
        ],
    };
    let summary = summarize_traces(&brief, 0);
    assert_eq!(summary.total_traces, 3);
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.error_count, 1);
    assert_eq!(summary.avg_duration_ms, 200.0);
    assert_eq!(summary.min_duration_ms, 100);
    assert_eq!(summary.max_duration_ms, 300);
    assert_eq!(summary.endpoints, vec!["/api/checkout"]);
    assert_eq!(summary.error_traces.len(), 1);
    assert_eq!(summary.error_traces[0].trace_id, "t2");
    assert!(summary.slow_traces.is_empty());
    // The window spans the earliest start to the latest end.
    assert_eq!(
        summary.time_range.duration_ms,
        summary.time_range.end_time_ms - summary.time_range.start_time_ms
    );
    assert_eq!(summary.time_range.duration_ms, 2_200);
}

#[test]
fn slow_traces_are_listed_above_the_threshold_sorted_by_duration() {
    let brief = TraceBrief {
        traces: vec![
            basic_trace("fast", "2025-07-06 10:00:00", 50, false),
            basic_trace("slow", "2025-07-06 10:00:00", 400, false),
            basic_trace("slower", "2025-07-06 10:00:00", 900, true),
        ],
    };
    let summary = summarize_traces(&brief, 100);
    let ids: Vec<&str> = summary
        .slow_traces
        .iter()
        .map(|t| t.trace_id.as_str())
        .collect();
    assert_eq!(ids, vec!["slower", "slow"]);
    assert!(summary.slow_traces[0].is_error);
}

#[test]
fn unparseable_start_times_stay_out_of_the_aggregates() {
    let brief = TraceBrief {
        traces: vec![
            basic_trace("good", "2025-07-06 10:00:00", 100, false),
            basic_trace("bad", "not a timestamp", 999, false),
        ],
    };
    let summary = summarize_traces(&brief, 0);
    assert_eq!(summary.total_traces, 2);
    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.max_duration_ms, 100);
}

#[test]
fn error_traces_view_filters_and_sorts_descending() {
    let brief = TraceBrief {
        traces: vec![
            basic_trace("ok", "2025-07-06 10:00:00", 100, false),
            basic_trace("e1", "2025-07-06 10:00:00", 200, true),
            basic_trace("e2", "2025-07-06 10:00:00", 700, true),
        ],
    };
    let errors = error_traces(&brief);
    let ids: Vec<&str> = errors.iter().map(|t| t.trace_id.as_str()).collect();
    assert_eq!(ids, vec!["e2", "e1"]);
}

#[test]
fn summarize_traces_is_idempotent() {
    let brief = TraceBrief {
        traces: vec![
            basic_trace("t1", "2025-07-06 10:00:00", 100, false),
            basic_trace("t2", "2025-07-06 10:00:05", 300, true),
        ],
    };
    assert_eq!(summarize_traces(&brief, 150), summarize_traces(&brief, 150));
}

#[test]
fn condition_requires_at_least_one_filter() {
    let err = build_trace_condition(&QueryTracesParams::default()).unwrap_err();
    assert_eq!(err, "at least one filter condition must be provided");
}

#[test]
fn condition_defaults() {
    let params = QueryTracesParams {
        service_id: Some("svc".to_string()),
        ..Default::default()
    };
    let condition = build_trace_condition(&params).unwrap();
    let value = serde_json::to_value(&condition).unwrap();
    assert_eq!(value["serviceId"], json!("svc"));
    assert_eq!(value["traceState"], json!("ALL"));
    assert_eq!(value["queryOrder"], json!("BY_START_TIME"));
    assert_eq!(value["paging"], json!({"pageNum": 1, "pageSize": 20}));
    // The default window is the last hour.
    assert_eq!(value["queryDuration"]["step"], json!("MINUTE"));
    assert!(value.get("tags").is_none());
}

#[test]
fn trace_id_lookup_carries_no_time_window() {
    let params = QueryTracesParams {
        trace_id: Some("abc123".to_string()),
        ..Default::default()
    };
    let condition = build_trace_condition(&params).unwrap();
    assert!(condition.query_duration.is_none());

    let params = QueryTracesParams {
        trace_id: Some("abc123".to_string()),
        duration: Some("-30m".to_string()),
        ..Default::default()
    };
    let condition = build_trace_condition(&params).unwrap();
    assert!(condition.query_duration.is_some());
}

#[test]
fn condition_validation_errors() {
    let params = QueryTracesParams {
        min_trace_duration: Some(500),
        max_trace_duration: Some(100),
        ..Default::default()
    };
    assert_eq!(
        build_trace_condition(&params).unwrap_err(),
        "invalid duration range: min_duration (500) > max_duration (100)"
    );

    let params = QueryTracesParams {
        service_id: Some("svc".to_string()),
        page_size: Some(-1),
        ..Default::default()
    };
    assert_eq!(
        build_trace_condition(&params).unwrap_err(),
        "page_size cannot be negative"
    );

    let params = QueryTracesParams {
        service_id: Some("svc".to_string()),
        trace_state: Some("failed".to_string()),
        ..Default::default()
    };
    assert!(
        build_trace_condition(&params)
            .unwrap_err()
            .starts_with("invalid trace_state 'failed'")
    );

    let params = QueryTracesParams {
        service_id: Some("svc".to_string()),
        query_order: Some("latency".to_string()),
        ..Default::default()
    };
    assert!(
        build_trace_condition(&params)
            .unwrap_err()
            .starts_with("invalid query_order 'latency'")
    );
}

#[test]
fn condition_serializes_tags_and_bounds() {
    let params = QueryTracesParams {
        service_id: Some("svc".to_string()),
        min_trace_duration: Some(10),
        max_trace_duration: Some(5_000),
        trace_state: Some("error".to_string()),
        query_order: Some("duration".to_string()),
        tags: Some(vec![SpanTag {
            key: "http.method".to_string(),
            value: "GET".to_string(),
        }]),
        ..Default::default()
    };
    let condition = build_trace_condition(&params).unwrap();
    let value = serde_json::to_value(&condition).unwrap();
    assert_eq!(value["minTraceDuration"], json!(10));
    assert_eq!(value["maxTraceDuration"], json!(5000));
    assert_eq!(value["traceState"], json!("ERROR"));
    assert_eq!(value["queryOrder"], json!("BY_DURATION"));
    assert_eq!(
        value["tags"],
        json!([{"key": "http.method", "value": "GET"}])
    );
}
