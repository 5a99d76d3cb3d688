//! MQE (Metrics Query Expression) tools: expression execution, metric
//! discovery and metric type lookup.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::graphql::{GraphQlClient, QueryResult};
use crate::query::DEFAULT_DURATION_MINUTES;

use super::{resolve_duration, tool_error, tool_json};

const DEFAULT_LAYER: &str = "GENERAL";

const EXEC_EXPRESSION_QUERY: &str = r#"
query execExpression($expression: String!, $entity: Entity!, $duration: Duration!, $debug: Boolean, $dumpDBRsp: Boolean) {
  execExpression(expression: $expression, entity: $entity, duration: $duration, debug: $debug, dumpDBRsp: $dumpDBRsp) {
    type
    error
    results {
      metric {
        labels {
          key
          value
        }
      }
      values {
        id
        value
        traceID
        owner {
          scope
          serviceID
          serviceName
          normal
          serviceInstanceID
          serviceInstanceName
          endpointID
          endpointName
        }
      }
    }
    debuggingTrace {
      traceId
      condition
      duration
      spans {
        spanId
        operation
        msg
        startTime
        endTime
        duration
      }
    }
  }
}"#;

const LIST_METRICS_QUERY: &str = r#"
query listMetrics($regex: String) {
  listMetrics(regex: $regex) {
    name
    type
    catalog
  }
}"#;

const TYPE_OF_METRICS_QUERY: &str = r#"
query typeOfMetrics($name: String!) {
  typeOfMetrics(name: $name)
}"#;

const LIST_SERVICES_QUERY: &str = r#"
query getServices($layer: String!) {
  services: listServices(layer: $layer) {
    id
    name
  }
}"#;

const GET_SERVICE_QUERY: &str = r#"
query getService($serviceId: String!) {
  service: getService(serviceId: $serviceId) {
    id
    name
    normal
    layers
  }
}"#;

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct MqeExpressionParams {
    #[schemars(
        description = "MQE expression to execute, e.g. 'service_sla * 100', 'avg(service_cpm)', 'top_n(service_cpm, 10, des)' or \"service_percentile{p='50,75,90,95,99'}\""
    )]
    pub expression: String,
    #[schemars(description = "Service name for entity filtering")]
    pub service_name: Option<String>,
    #[schemars(
        description = "Service layer, e.g. 'GENERAL' (default), 'MESH', 'K8S_SERVICE' or 'DATABASE'"
    )]
    pub layer: Option<String>,
    #[schemars(description = "Service instance name for entity filtering")]
    pub service_instance_name: Option<String>,
    #[schemars(description = "Endpoint name for entity filtering")]
    pub endpoint_name: Option<String>,
    #[schemars(description = "Process name for entity filtering")]
    pub process_name: Option<String>,
    #[schemars(
        description = "Whether the service is normal (has an agent installed). Auto-detected from the backend when omitted"
    )]
    pub normal: Option<bool>,
    #[schemars(description = "Destination service name for relation metrics")]
    pub dest_service_name: Option<String>,
    #[schemars(description = "Destination service layer for relation metrics")]
    pub dest_layer: Option<String>,
    #[schemars(description = "Destination service instance name for relation metrics")]
    pub dest_service_instance_name: Option<String>,
    #[schemars(description = "Destination endpoint name for relation metrics")]
    pub dest_endpoint_name: Option<String>,
    #[schemars(description = "Destination process name for relation metrics")]
    pub dest_process_name: Option<String>,
    #[schemars(description = "Whether the destination service is normal")]
    pub dest_normal: Option<bool>,
    #[schemars(
        description = "Relative time window, e.g. '-1h' or '-30m'. Overrides start/end when set"
    )]
    pub duration: Option<String>,
    #[schemars(description = "Window start, e.g. '2025-07-06 12:00:00', '-1h' or 'now'")]
    pub start: Option<String>,
    #[schemars(description = "Window end, same formats as start")]
    pub end: Option<String>,
    #[schemars(description = "Aggregation step: SECOND, MINUTE, HOUR or DAY")]
    pub step: Option<String>,
    #[schemars(description = "Query the cold storage stage")]
    pub cold: Option<bool>,
    #[schemars(description = "Enable query tracing and debugging")]
    pub debug: Option<bool>,
    #[schemars(description = "Dump the database response for debugging")]
    pub dump_db_rsp: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct MqeMetricsListParams {
    #[schemars(
        description = "Optional regex to filter metric names, e.g. 'service_.*' or '.*_cpm'"
    )]
    pub regex: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct MqeMetricTypeParams {
    #[schemars(
        description = "Metric name to look up, e.g. 'service_sla', 'service_percentile' or 'endpoint_cpm'"
    )]
    pub metric_name: String,
}

pub async fn execute_mqe_expression(
    client: &GraphQlClient,
    params: MqeExpressionParams,
) -> Result<CallToolResult, McpError> {
    if params.expression.is_empty() {
        return Ok(tool_error("expression is required"));
    }

    let entity = build_mqe_entity(client, &params).await;
    let duration = resolve_duration(
        params.duration.as_deref(),
        params.start.as_deref(),
        params.end.as_deref(),
        params.step.as_deref(),
        params.cold.unwrap_or(false),
        DEFAULT_DURATION_MINUTES,
    );

    let variables = json!({
        "expression": params.expression,
        // The entity is always present, even when no filter was given.
        "entity": entity,
        "duration": duration,
        "debug": params.debug.unwrap_or(false),
        "dumpDBRsp": params.dump_db_rsp.unwrap_or(false),
    });

    let data = match client.execute(EXEC_EXPRESSION_QUERY, variables).await {
        Ok(data) => data,
        Err(e) => return Ok(tool_error(format!("failed to execute MQE expression: {e}"))),
    };

    Ok(tool_json(&data))
}

pub async fn list_mqe_metrics(
    client: &GraphQlClient,
    params: MqeMetricsListParams,
) -> Result<CallToolResult, McpError> {
    match list_metrics(client, params.regex.as_deref()).await {
        Ok(data) => Ok(tool_json(&data)),
        Err(e) => Ok(tool_error(format!("failed to list metrics: {e}"))),
    }
}

/// Raw metric listing, shared with the `mqe://metrics/available` resource.
pub async fn list_metrics(client: &GraphQlClient, regex: Option<&str>) -> QueryResult<Value> {
    let variables = match regex.filter(|r| !r.is_empty()) {
        Some(regex) => json!({ "regex": regex }),
        None => json!({}),
    };
    client.execute(LIST_METRICS_QUERY, variables).await
}

pub async fn get_mqe_metric_type(
    client: &GraphQlClient,
    params: MqeMetricTypeParams,
) -> Result<CallToolResult, McpError> {
    if params.metric_name.is_empty() {
        return Ok(tool_error("metric_name must be provided"));
    }

    let variables = json!({ "name": params.metric_name });
    let data = match client.execute(TYPE_OF_METRICS_QUERY, variables).await {
        Ok(data) => data,
        Err(e) => return Ok(tool_error(format!("failed to get metric type: {e}"))),
    };

    Ok(tool_json(&data))
}

/// Assemble the GraphQL `Entity` map. The normal flag is auto-detected from
/// the backend when a service name is given without one.
async fn build_mqe_entity(client: &GraphQlClient, params: &MqeExpressionParams) -> Value {
    let mut entity = entity_fields(params);

    let service_name = params.service_name.as_deref().unwrap_or("");
    if !service_name.is_empty() {
        let normal = match params.normal {
            Some(normal) => normal,
            None => {
                detect_service_normal(client, service_name, params.layer.as_deref().unwrap_or(""))
                    .await
            }
        };
        entity.insert("normal".to_string(), json!(normal));
    } else if let Some(normal) = params.normal {
        entity.insert("normal".to_string(), json!(normal));
    }

    if let Some(dest_normal) = params.dest_normal {
        entity.insert("destNormal".to_string(), json!(dest_normal));
    }

    Value::Object(entity)
}

/// Non-empty name filters, keyed as the GraphQL schema expects.
pub(crate) fn entity_fields(params: &MqeExpressionParams) -> Map<String, Value> {
    let mut entity = Map::new();
    let fields = [
        ("serviceName", &params.service_name),
        ("serviceInstanceName", &params.service_instance_name),
        ("endpointName", &params.endpoint_name),
        ("processName", &params.process_name),
        ("destServiceName", &params.dest_service_name),
        ("destServiceInstanceName", &params.dest_service_instance_name),
        ("destEndpointName", &params.dest_endpoint_name),
        ("destProcessName", &params.dest_process_name),
    ];
    for (key, value) in fields {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            entity.insert(key.to_string(), json!(value));
        }
    }
    entity
}

/// Look up whether a service runs a language agent. Lookup failures fall
/// back to true, which matches the most common deployment.
async fn detect_service_normal(client: &GraphQlClient, service_name: &str, layer: &str) -> bool {
    let layer = if layer.is_empty() { DEFAULT_LAYER } else { layer };
    match service_normal_by_name(client, service_name, layer).await {
        Ok(Some(normal)) => normal,
        Ok(None) => true,
        Err(e) => {
            debug!(service_name, layer, error = %e, "service normal lookup failed");
            true
        }
    }
}

async fn service_normal_by_name(
    client: &GraphQlClient,
    service_name: &str,
    layer: &str,
) -> QueryResult<Option<bool>> {
    let data = client
        .execute(LIST_SERVICES_QUERY, json!({ "layer": layer }))
        .await?;

    let mut service_id = None;
    if let Some(services) = data.get("services").and_then(Value::as_array) {
        for service in services {
            if service.get("name").and_then(Value::as_str) == Some(service_name) {
                service_id = service.get("id").and_then(Value::as_str).map(String::from);
                break;
            }
        }
    }
    let Some(service_id) = service_id else {
        return Ok(None);
    };

    let data = client
        .execute(GET_SERVICE_QUERY, json!({ "serviceId": service_id }))
        .await?;
    Ok(data.pointer("/service/normal").and_then(Value::as_bool))
}
