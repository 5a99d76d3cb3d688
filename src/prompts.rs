//! Analysis prompts guiding an LLM through multi-tool SkyWalking workflows.

use rmcp::ErrorData as McpError;
use rmcp::model::{GetPromptResult, Prompt, PromptMessage, PromptMessageRole};
use serde_json::{Map, Value, json};
use std::fmt::Write as _;

const DEFAULT_DURATION: &str = "-1h";
const ALL_METRICS: &str = "all";

/// Tool chains recommended per analysis type, rendered into prompt text.
const ANALYSIS_CHAINS: &[(&str, &[(&str, &str)])] = &[
    (
        "performance_analysis",
        &[
            ("query_single_metrics", "Get basic metrics like CPM, SLA, response time"),
            ("execute_mqe_expression", "Calculate derivatives like SLA percentage, percentiles"),
            ("query_top_n_metrics", "Identify top endpoints by response time or traffic"),
            ("query_traces", "Find error traces for deeper investigation"),
        ],
    ),
    (
        "trace_investigation",
        &[
            ("query_traces", "Search for traces with specific filters"),
            ("get_trace_details", "Analyze individual traces in detail"),
            ("get_cold_trace_details", "Check historical traces if not found in hot storage"),
        ],
    ),
    (
        "log_analysis",
        &[("query_logs", "Search and analyze log entries with filters")],
    ),
    (
        "mqe_query_building",
        &[
            ("list_mqe_metrics", "Discover available metrics"),
            ("get_mqe_metric_type", "Understand metric types and usage"),
            ("execute_mqe_expression", "Test and execute the built expression"),
        ],
    ),
    (
        "metrics_exploration",
        &[
            ("list_mqe_metrics", "Discover available metrics"),
            ("get_mqe_metric_type", "Understand metric types and usage"),
        ],
    ),
];

/// All prompts advertised by the server.
pub fn catalog() -> Vec<Prompt> {
    vec![
        prompt(
            "analyze-performance",
            "Analyze service performance using metrics tools",
            json!([
                {"name": "service_name", "description": "The name of the service to analyze", "required": true},
                {"name": "duration", "description": "Time duration for analysis, e.g. -1h (past hour), -30m, -7d", "required": false},
            ]),
        ),
        prompt(
            "compare-services",
            "Compare performance metrics between multiple services",
            json!([
                {"name": "services", "description": "Comma-separated list of service names to compare", "required": true},
                {"name": "metrics", "description": "Metrics to compare (response_time, sla, cpm, all)", "required": false},
                {"name": "time_range", "description": "Time range for comparison, e.g. -1h, -2h, -1d", "required": false},
            ]),
        ),
        prompt(
            "top-services",
            "Find top N services by various metrics",
            json!([
                {"name": "metric_name", "description": "Metric to rank by (service_cpm, service_resp_time, service_sla)", "required": true},
                {"name": "top_n", "description": "Number of top services to return (default: 10)", "required": false},
                {"name": "order", "description": "Order direction (ASC, DES)", "required": false},
            ]),
        ),
        prompt(
            "investigate-traces",
            "Investigate traces for errors and performance issues",
            json!([
                {"name": "service_id", "description": "The service to investigate", "required": false},
                {"name": "trace_state", "description": "Filter by trace state (success, error, all)", "required": false},
                {"name": "duration", "description": "Time range to search, e.g. -1h, -30m. Default: -1h", "required": false},
            ]),
        ),
        prompt(
            "trace-deep-dive",
            "Deep dive analysis of a specific trace",
            json!([
                {"name": "trace_id", "description": "The trace ID to analyze", "required": true},
                {"name": "view", "description": "Analysis view (full, summary, errors_only)", "required": false},
                {"name": "check_cold_storage", "description": "Check cold storage if not found (true/false)", "required": false},
            ]),
        ),
        prompt(
            "analyze-logs",
            "Analyze service logs for errors and patterns",
            json!([
                {"name": "service_id", "description": "Service to analyze logs", "required": false},
                {"name": "log_level", "description": "Log level to filter (ERROR, WARN, INFO)", "required": false},
                {"name": "duration", "description": "Time range to analyze, e.g. -1h, -6h. Default: -1h", "required": false},
            ]),
        ),
        prompt(
            "build-mqe-query",
            "Help build MQE (Metrics Query Expression) for complex queries",
            json!([
                {"name": "query_type", "description": "Type of query (performance, comparison, trend, alert)", "required": true},
                {"name": "metrics", "description": "Comma-separated list of metrics to query", "required": true},
                {"name": "conditions", "description": "Additional conditions or filters", "required": false},
            ]),
        ),
        prompt(
            "explore-metrics",
            "Explore available metrics and their types",
            json!([
                {"name": "pattern", "description": "Regex pattern to filter metrics", "required": false},
                {"name": "show_examples", "description": "Show usage examples for each metric (true/false)", "required": false},
            ]),
        ),
    ]
}

/// Render a prompt by name with the given arguments.
pub fn render(
    name: &str,
    arguments: Option<&Map<String, Value>>,
) -> Result<GetPromptResult, McpError> {
    let arg = |key: &str, default: &str| -> String {
        arguments
            .and_then(|args| args.get(key))
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    let (description, text) = match name {
        "analyze-performance" => (
            "Performance analysis using SkyWalking tools",
            analyze_performance(&arg("service_name", ""), &arg("duration", DEFAULT_DURATION)),
        ),
        "compare-services" => (
            "Service comparison analysis",
            compare_services(
                &arg("services", ""),
                &arg("metrics", ALL_METRICS),
                &arg("time_range", DEFAULT_DURATION),
            ),
        ),
        "top-services" => (
            "Top services analysis",
            top_services(&arg("metric_name", ""), &arg("top_n", "10"), &arg("order", "DES")),
        ),
        "investigate-traces" => (
            "Trace investigation using query tools",
            investigate_traces(
                &arg("service_id", ""),
                &arg("trace_state", "all"),
                &arg("duration", DEFAULT_DURATION),
            ),
        ),
        "trace-deep-dive" => (
            "Deep dive trace analysis",
            trace_deep_dive(
                &arg("trace_id", ""),
                &arg("view", "summary"),
                &arg("check_cold_storage", "false"),
            ),
        ),
        "analyze-logs" => (
            "Log analysis using query_logs tool",
            analyze_logs(
                &arg("service_id", ""),
                &arg("log_level", "ERROR"),
                &arg("duration", DEFAULT_DURATION),
            ),
        ),
        "build-mqe-query" => (
            "MQE query building assistance",
            build_mqe_query(&arg("query_type", ""), &arg("metrics", ""), &arg("conditions", "")),
        ),
        "explore-metrics" => (
            "Metrics exploration guide",
            explore_metrics(&arg("pattern", ".*"), &arg("show_examples", "false")),
        ),
        other => {
            return Err(McpError::invalid_params(
                format!("unknown prompt: {other}"),
                None,
            ));
        }
    };

    let mut result = GetPromptResult::default();
    result.description = Some(description.to_string());
    result.messages = vec![PromptMessage::new_text(PromptMessageRole::User, text)];
    Ok(result)
}

fn workflow_instructions(analysis_type: &str) -> String {
    let Some((_, chain)) = ANALYSIS_CHAINS.iter().find(|(name, _)| *name == analysis_type) else {
        return "No specific tools defined for this analysis type.".to_string();
    };

    let mut instructions = String::from("**Available Tools:**\n");
    for (tool, _) in *chain {
        let _ = writeln!(instructions, "- {tool}");
    }
    instructions.push_str("\n**Recommended Analysis Workflow:**\n");
    for (i, (tool, purpose)) in chain.iter().enumerate() {
        let _ = writeln!(instructions, "{}. {tool}: {purpose}", i + 1);
    }
    instructions
}

fn analyze_performance(service_name: &str, duration: &str) -> String {
    let tools = workflow_instructions("performance_analysis");
    format!(
        r#"Please analyze the performance of service '{service_name}' over the last {duration}.

{tools}
**Analysis Required:**

**Response Time Analysis**
- Use query_single_metrics with metrics_name="service_resp_time" to get average response time
- Use execute_mqe_expression with expression="service_percentile{{p='50,75,90,95,99'}}" to get percentiles
- Identify trends and anomalies

**Success Rate and SLA**
- Use execute_mqe_expression with expression="service_sla * 100" to get success rate percentage
- Use query_single_metrics with metrics_name="service_apdex" for user satisfaction score
- Track SLA compliance over time

**Traffic Analysis**
- Use query_single_metrics with metrics_name="service_cpm" to get calls per minute
- Identify traffic patterns and peak periods

**Error Analysis**
- Use query_traces with trace_state="error" to find error traces
- Identify most common error types and affected endpoints

**Performance Bottlenecks**
- Use query_top_n_metrics with metrics_name="endpoint_resp_time" and order="DES" to find slowest endpoints
- Use query_top_n_metrics with metrics_name="endpoint_cpm" to find high-traffic endpoints

Please provide actionable insights and specific recommendations based on the data."#
    )
}

fn compare_services(services: &str, metrics: &str, time_range: &str) -> String {
    format!(
        r#"Please compare the following services: {services}

Time Range: {time_range}
Metrics to Compare: {metrics}

Comparison should include:

1. **Performance Comparison**
   - Response time comparison (average and percentiles)
   - Throughput (CPM) comparison
   - Success rate (SLA) comparison

2. **Error Patterns**
   - Error rate comparison
   - Types of errors by service

3. **Dependency Impact**
   - How each service affects others
   - Cascade failure risks

4. **Relative Performance**
   - Which service is the bottleneck
   - Performance ratios and efficiency metrics

Please present the comparison in a clear, tabular format where possible, and highlight significant differences."#
    )
}

fn top_services(metric_name: &str, top_n: &str, order: &str) -> String {
    format!(
        r#"Find top services using query_top_n_metrics tool:

**Tool Configuration:**
- query_top_n_metrics with parameters:
  - metrics_name: "{metric_name}"
  - top_n: {top_n}
  - order: "{order}" (DES for highest, ASC for lowest)
  - duration: "-1h" (or specify custom range)

**Analysis Focus:**

**Service Ranking**
- Get top {top_n} services by {metric_name}
- Compare values against baseline
- Identify outliers or anomalies

**Performance Insights**
- For CPM metrics: Find busiest services
- For response time: Find slowest services
- For SLA: Find services with issues

**Follow-up Analysis**
- Use query_single_metrics for detailed service analysis
- Use query_traces for error investigation
- Use execute_mqe_expression for complex calculations

Provide ranked results with specific recommendations."#
    )
}

fn investigate_traces(service_id: &str, trace_state: &str, duration: &str) -> String {
    let tools = workflow_instructions("trace_investigation");
    format!(
        r#"Investigate traces with filters: service_id="{service_id}", trace_state="{trace_state}", duration="{duration}".

{tools}
**Analysis Steps:**

**Find Problematic Traces**
- First use query_traces with view="summary" to get overview
- Look for patterns in error traces, slow traces, or anomalies
- Note trace IDs that need deeper investigation

**Deep Dive on Specific Traces**
- Use get_trace_details with identified trace_id
- Start with view="summary" for quick insights
- Use view="full" for complete span analysis
- Use view="errors_only" if focusing on errors

**Performance Analysis**
- Look for traces with high duration using min_trace_duration filter
- Identify bottlenecks in span timings and cascading delays

**Historical Investigation**
- If recent data shows no issues, use get_cold_trace_details for older trace data

Provide specific findings and actionable recommendations."#
    )
}

fn trace_deep_dive(trace_id: &str, view: &str, check_cold_storage: &str) -> String {
    format!(
        r#"Perform deep dive analysis of trace {trace_id}:

**Primary Analysis:**
- get_trace_details with trace_id: "{trace_id}" and view: "{view}"
- Start with summary view for quick insights
- Use full view for complete span analysis
- Use errors_only view if trace has errors

**Cold Storage Check:**
- If trace not found in hot storage and check_cold_storage is "{check_cold_storage}"
- Use get_cold_trace_details with same trace_id

**Analysis Depth:**

**Trace Structure Analysis**
- Service call flow and dependencies
- Span duration breakdown and critical path identification

**Performance Investigation**
- Identify bottleneck spans
- Database query performance and external API call latency

**Error Analysis** (if applicable)
- Error location and propagation
- Root cause identification

**Optimization Opportunities**
- Redundant operations, caching possibilities, parallel processing potential

Provide detailed trace analysis with specific optimization recommendations."#
    )
}

fn analyze_logs(service_id: &str, log_level: &str, duration: &str) -> String {
    format!(
        r#"Analyze service logs using the query_logs tool:

**Tool Configuration:**
- query_logs with following parameters:
  - service_id: "{service_id}" (if specified)
  - tags: [{{"key": "level", "value": "{log_level}"}}] for log level filtering
  - duration: "{duration}" for time range
  - cold: true if historical data needed

**Analysis Steps:**

**Log Pattern Analysis**
- Use query_logs to get recent logs for the service
- Look for recurring error patterns and their frequency

**Error Investigation**
- Focus on ERROR level logs first
- Group similar error messages
- Check for correlation with trace IDs

**Troubleshooting Workflow**
- Start with ERROR logs in the specified time range
- Use trace_id from logs to get detailed trace analysis
- Cross-reference with metrics for full picture

Provide specific log analysis findings and recommendations."#
    )
}

fn build_mqe_query(query_type: &str, metrics: &str, conditions: &str) -> String {
    let tools = workflow_instructions("mqe_query_building");
    format!(
        r#"Help me build an MQE (Metrics Query Expression) for the following requirement:

Query Type: {query_type}
Metrics: {metrics}
Additional Conditions: {conditions}

{tools}
**MQE Building Process:**
- Explain the MQE syntax for this use case
- Provide the complete MQE expression
- Show example usage with different parameters
- Explain what each part of the expression does
- Suggest variations for different scenarios

If there are multiple ways to achieve this, please show alternatives with pros and cons."#
    )
}

fn explore_metrics(pattern: &str, show_examples: &str) -> String {
    let tools = workflow_instructions("metrics_exploration");
    format!(
        r#"Explore available metrics with pattern: "{pattern}".

{tools}
**Exploration Workflow:**

**Discover Metrics**
- Use list_mqe_metrics to get all available metrics
- Filter by pattern if specified

**Understand Metric Types**
- For each interesting metric, use get_mqe_metric_type
- REGULAR_VALUE: Direct arithmetic operations
- LABELED_VALUE: Requires label selectors
- SAMPLED_RECORD: Complex record-based metrics

**Usage Examples** (if show_examples is "{show_examples}"):
- REGULAR_VALUE: service_cpm, service_sla * 100
- LABELED_VALUE: service_percentile{{p='50,75,90,95,99'}}
- Complex: avg(service_cpm), top_n(service_resp_time, 10, des)

**Metric Categories:**
- Service metrics: service_sla, service_cpm, service_resp_time
- Instance metrics: service_instance_*
- Endpoint metrics: endpoint_*
- Relation metrics: service_relation_*

Provide a comprehensive guide to available metrics and their usage."#
    )
}

fn prompt(name: &str, description: &str, arguments: Value) -> Prompt {
    // Deserializing from the wire shape keeps this independent of model
    // struct fields we do not set.
    serde_json::from_value(json!({
        "name": name,
        "description": description,
        "arguments": arguments,
    }))
    .expect("static prompt definition matches the MCP prompt shape")
}
