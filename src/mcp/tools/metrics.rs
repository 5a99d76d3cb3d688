//! Metrics tools: single-value reads and top-N rankings.

use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::graphql::GraphQlClient;

use super::{resolve_duration, tool_error, tool_json};

const DEFAULT_TOP_N: i32 = 5;
const DEFAULT_TOP_N_DURATION: &str = "30m";

const READ_METRICS_VALUE_QUERY: &str = r#"
query readMetricsValue($condition: MetricsCondition!, $duration: Duration!) {
  result: readMetricsValue(condition: $condition, duration: $duration)
}"#;

const SORT_METRICS_QUERY: &str = r#"
query sortMetrics($condition: TopNCondition!, $duration: Duration!) {
  result: sortMetrics(condition: $condition, duration: $duration) {
    name
    id
    value
    refId
  }
}"#;

/// Metric scopes defined by the OAP query protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scope {
    All,
    Service,
    ServiceInstance,
    Endpoint,
    Process,
    ServiceRelation,
    ServiceInstanceRelation,
    EndpointRelation,
    ProcessRelation,
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "All" => Ok(Scope::All),
            "Service" => Ok(Scope::Service),
            "ServiceInstance" => Ok(Scope::ServiceInstance),
            "Endpoint" => Ok(Scope::Endpoint),
            "Process" => Ok(Scope::Process),
            "ServiceRelation" => Ok(Scope::ServiceRelation),
            "ServiceInstanceRelation" => Ok(Scope::ServiceInstanceRelation),
            "EndpointRelation" => Ok(Scope::EndpointRelation),
            "ProcessRelation" => Ok(Scope::ProcessRelation),
            other => Err(format!(
                "invalid scope '{other}', available scopes: All, Service, ServiceInstance, \
                 Endpoint, Process, ServiceRelation, ServiceInstanceRelation, EndpointRelation, \
                 ProcessRelation"
            )),
        }
    }
}

/// Infer the scope of a ranking query from the metric name prefix.
pub(crate) fn scope_for_top_n(metrics_name: &str) -> Scope {
    if metrics_name.starts_with("service_instance") {
        Scope::ServiceInstance
    } else if metrics_name.starts_with("endpoint") {
        Scope::Endpoint
    } else {
        Scope::Service
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Order {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DES")]
    Des,
}

/// GraphQL `Entity` input identifying what a metric is measured against.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_instance_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_service_instance_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_endpoint_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_process_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsCondition {
    pub name: String,
    pub entity: Entity,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopNCondition {
    pub name: String,
    pub parent_service: String,
    pub normal: bool,
    pub scope: Scope,
    pub top_n: i32,
    pub order: Order,
}

/// Decode a SkyWalking service ID of the form `<base64(name)>.<flag>` into
/// the service name and its normal flag.
pub(crate) fn parse_service_id(service_id: &str) -> Result<(String, bool), String> {
    let Some((encoded, flag)) = service_id.split_once('.') else {
        return Err(format!(
            "invalid service id, cannot be split into 2 parts: {service_id}"
        ));
    };
    if flag.contains('.') {
        return Err(format!(
            "invalid service id, cannot be split into 2 parts: {service_id}"
        ));
    }
    let decoded = BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| format!("invalid service id '{service_id}': {e}"))?;
    let name = String::from_utf8(decoded)
        .map_err(|e| format!("invalid service id '{service_id}': {e}"))?;
    Ok((name, flag == "1"))
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct SingleMetricsParams {
    #[schemars(
        description = "Metric name, e.g. 'service_cpm', 'service_resp_time', 'service_apdex', 'endpoint_sla'"
    )]
    pub metrics_name: String,
    #[schemars(
        description = "Entity scope: Service (default), ServiceInstance, Endpoint, Process or the *Relation variants"
    )]
    pub scope: Option<String>,
    #[schemars(description = "Service name the metric is measured against")]
    pub service_name: Option<String>,
    #[schemars(description = "Service instance name, for instance-scoped metrics")]
    pub service_instance_name: Option<String>,
    #[schemars(description = "Endpoint name, for endpoint-scoped metrics")]
    pub endpoint_name: Option<String>,
    #[schemars(description = "Process name, for process-scoped metrics")]
    pub process_name: Option<String>,
    #[schemars(description = "Destination service name, for relation scopes")]
    pub dest_service_name: Option<String>,
    #[schemars(description = "Destination service instance name, for relation scopes")]
    pub dest_service_instance_name: Option<String>,
    #[schemars(description = "Destination endpoint name, for relation scopes")]
    pub dest_endpoint_name: Option<String>,
    #[schemars(description = "Destination process name, for relation scopes")]
    pub dest_process_name: Option<String>,
    #[schemars(
        description = "Relative time window, e.g. '-30m' (past 30 minutes) or '-24h'. Overrides start/end when set"
    )]
    pub duration: Option<String>,
    #[schemars(description = "Window start, e.g. '2025-07-06 10:00:00', '-15m' or 'now'")]
    pub start: Option<String>,
    #[schemars(description = "Window end, same formats as start")]
    pub end: Option<String>,
    #[schemars(
        description = "Aggregation step: SECOND, MINUTE, HOUR or DAY. Adaptive when omitted"
    )]
    pub step: Option<String>,
    #[schemars(description = "Query the cold storage stage")]
    pub cold: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct TopNMetricsParams {
    #[schemars(
        description = "Metric name to rank by, e.g. 'service_cpm' or 'endpoint_resp_time'. The scope is inferred from the prefix unless given explicitly"
    )]
    pub metrics_name: String,
    #[schemars(description = "How many entries to return (default 5)")]
    pub top_n: Option<i32>,
    #[schemars(description = "Ranking order: 'DES' (default) or 'ASC'")]
    pub order: Option<String>,
    #[schemars(description = "Entity scope: Service, ServiceInstance, Endpoint or Process")]
    pub scope: Option<String>,
    #[schemars(
        description = "Parent service ID in the '<base64(name)>.<flag>' form. Takes precedence over service_name"
    )]
    pub service_id: Option<String>,
    #[schemars(description = "Restrict the ranking to children of this service")]
    pub service_name: Option<String>,
    #[schemars(
        description = "Relative time window, e.g. '-30m' or '-24h'. Overrides start/end when set"
    )]
    pub duration: Option<String>,
    #[schemars(description = "Window start, e.g. '2025-07-06 10:00:00', '-15m' or 'now'")]
    pub start: Option<String>,
    #[schemars(description = "Window end, same formats as start")]
    pub end: Option<String>,
    #[schemars(
        description = "Aggregation step: SECOND, MINUTE, HOUR or DAY. Adaptive when omitted"
    )]
    pub step: Option<String>,
    #[schemars(description = "Query the cold storage stage")]
    pub cold: Option<bool>,
}

pub async fn query_single_metrics(
    client: &GraphQlClient,
    params: SingleMetricsParams,
) -> Result<CallToolResult, McpError> {
    if params.metrics_name.is_empty() {
        return Ok(tool_error("missing required parameter: metrics_name"));
    }

    let condition = match build_metrics_condition(&params) {
        Ok(condition) => condition,
        Err(message) => return Ok(tool_error(message)),
    };
    let duration = resolve_duration(
        params.duration.as_deref(),
        params.start.as_deref(),
        params.end.as_deref(),
        params.step.as_deref(),
        params.cold.unwrap_or(false),
        0,
    );

    let variables = json!({ "condition": condition, "duration": duration });
    let data = match client.execute(READ_METRICS_VALUE_QUERY, variables).await {
        Ok(data) => data,
        Err(e) => return Ok(tool_error(format!("failed to query metrics: {e}"))),
    };

    let value = data.get("result").and_then(Value::as_i64).unwrap_or(0);
    Ok(tool_json(&json!({ "value": value })))
}

pub async fn query_top_n_metrics(
    client: &GraphQlClient,
    params: TopNMetricsParams,
) -> Result<CallToolResult, McpError> {
    if params.metrics_name.is_empty() {
        return Ok(tool_error("missing required parameter: metrics_name"));
    }

    let condition = match build_top_n_condition(&params) {
        Ok(condition) => condition,
        Err(message) => return Ok(tool_error(message)),
    };

    // Rankings default to a 30-minute window when no time is given at all.
    let has_bounds = params.start.as_deref().is_some_and(|s| !s.is_empty())
        || params.end.as_deref().is_some_and(|s| !s.is_empty());
    let duration = match params.duration.as_deref().filter(|d| !d.is_empty()) {
        Some(d) => Some(d),
        None if !has_bounds => Some(DEFAULT_TOP_N_DURATION),
        None => None,
    };
    let duration = resolve_duration(
        duration,
        params.start.as_deref(),
        params.end.as_deref(),
        params.step.as_deref(),
        params.cold.unwrap_or(false),
        0,
    );

    let variables = json!({ "condition": condition, "duration": duration });
    let data = match client.execute(SORT_METRICS_QUERY, variables).await {
        Ok(data) => data,
        Err(e) => return Ok(tool_error(format!("failed to query metrics: {e}"))),
    };

    Ok(tool_json(data.get("result").unwrap_or(&Value::Null)))
}

pub(crate) fn build_metrics_condition(
    params: &SingleMetricsParams,
) -> Result<MetricsCondition, String> {
    let non_empty = |value: &Option<String>| value.clone().filter(|s| !s.is_empty());
    let scope = match params.scope.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(s.parse::<Scope>()?),
        None => None,
    };
    Ok(MetricsCondition {
        name: params.metrics_name.clone(),
        entity: Entity {
            scope,
            service_name: non_empty(&params.service_name),
            service_instance_name: non_empty(&params.service_instance_name),
            endpoint_name: non_empty(&params.endpoint_name),
            process_name: non_empty(&params.process_name),
            dest_service_name: non_empty(&params.dest_service_name),
            dest_service_instance_name: non_empty(&params.dest_service_instance_name),
            dest_endpoint_name: non_empty(&params.dest_endpoint_name),
            dest_process_name: non_empty(&params.dest_process_name),
        },
    })
}

pub(crate) fn build_top_n_condition(params: &TopNMetricsParams) -> Result<TopNCondition, String> {
    let top_n = match params.top_n {
        None | Some(0) => DEFAULT_TOP_N,
        Some(n) if n < 0 => return Err("top_n must be a positive integer".to_string()),
        Some(n) => n,
    };

    // service_id wins over service_name; a malformed ID degrades to no parent.
    let (parent_service, normal) = match params.service_id.as_deref().filter(|s| !s.is_empty()) {
        Some(id) => parse_service_id(id).unwrap_or_default(),
        None => (
            params.service_name.clone().unwrap_or_default(),
            false,
        ),
    };

    // Unknown order strings are ignored in favor of the default.
    let order = match params.order.as_deref() {
        Some("ASC") => Order::Asc,
        Some("DES") => Order::Des,
        _ => Order::Des,
    };

    let scope = match params.scope.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => s.parse::<Scope>()?,
        None => scope_for_top_n(&params.metrics_name),
    };

    Ok(TopNCondition {
        name: params.metrics_name.clone(),
        parent_service,
        normal,
        scope,
        top_n,
        order,
    })
}
