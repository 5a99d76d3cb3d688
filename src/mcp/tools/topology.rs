//! Topology tools: service, instance and endpoint dependency graphs.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::graphql::GraphQlClient;

use super::{resolve_duration, tool_error, tool_json};

const SERVICE_TOPOLOGY_QUERY: &str = r#"
query getServiceTopology($serviceId: ID!, $duration: Duration!) {
  serviceTopology: getServiceTopology(serviceId: $serviceId, duration: $duration) {
    nodes {
      id
      name
      type
      isReal
    }
    calls {
      id
      source
      target
      isDetectPoint
      type
      component
    }
  }
}"#;

const INSTANCE_TOPOLOGY_QUERY: &str = r#"
query getServiceInstanceTopology($serviceId: ID!, $duration: Duration!) {
  instanceTopology: getServiceInstanceTopology(serviceId: $serviceId, duration: $duration) {
    nodes {
      id
      name
      serviceId
      serviceName
    }
    calls {
      id
      source
      target
      type
      component
    }
  }
}"#;

const ENDPOINT_TOPOLOGY_QUERY: &str = r#"
query getEndpointTopology($serviceId: ID!, $duration: Duration!) {
  endpointTopology: getEndpointTopology(serviceId: $serviceId, duration: $duration) {
    nodes {
      id
      name
      serviceId
      serviceName
    }
    calls {
      id
      source
      target
      type
      component
    }
  }
}"#;

/// The three topology graphs share parameters and flow; only the query
/// document and error wording differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TopologyKind {
    Service,
    Instance,
    Endpoint,
}

impl TopologyKind {
    fn query(self) -> &'static str {
        match self {
            TopologyKind::Service => SERVICE_TOPOLOGY_QUERY,
            TopologyKind::Instance => INSTANCE_TOPOLOGY_QUERY,
            TopologyKind::Endpoint => ENDPOINT_TOPOLOGY_QUERY,
        }
    }

    fn label(self) -> &'static str {
        match self {
            TopologyKind::Service => "Service",
            TopologyKind::Instance => "Instance",
            TopologyKind::Endpoint => "Endpoint",
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct ServiceTopologyParams {
    #[schemars(description = "Service ID to query topology for")]
    pub service_id: Option<String>,
    #[schemars(description = "Service name, as an alternative to service_id")]
    pub service_name: Option<String>,
    #[schemars(
        description = "Relative time window, e.g. '-1h' or '-24h'. Default is the last 30 minutes"
    )]
    pub duration: Option<String>,
    #[schemars(description = "Number of relationship hops to fetch (default 1)")]
    pub depth: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct InstanceTopologyParams {
    #[schemars(description = "Service ID to query instance topology for")]
    pub service_id: Option<String>,
    #[schemars(description = "Service name, as an alternative to service_id")]
    pub service_name: Option<String>,
    #[schemars(
        description = "Relative time window, e.g. '-1h' or '-30m'. Default is the last 30 minutes"
    )]
    pub duration: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct EndpointTopologyParams {
    #[schemars(description = "Service ID to query endpoint topology for")]
    pub service_id: Option<String>,
    #[schemars(description = "Service name, as an alternative to service_id")]
    pub service_name: Option<String>,
    #[schemars(
        description = "Relative time window, e.g. '-1h' or '-24h'. Default is the last 30 minutes"
    )]
    pub duration: Option<String>,
}

pub async fn get_service_topology(
    client: &GraphQlClient,
    params: ServiceTopologyParams,
) -> Result<CallToolResult, McpError> {
    query_topology(
        client,
        TopologyKind::Service,
        params.service_id.as_deref(),
        params.service_name.as_deref(),
        params.duration.as_deref(),
    )
    .await
}

pub async fn get_instance_topology(
    client: &GraphQlClient,
    params: InstanceTopologyParams,
) -> Result<CallToolResult, McpError> {
    query_topology(
        client,
        TopologyKind::Instance,
        params.service_id.as_deref(),
        params.service_name.as_deref(),
        params.duration.as_deref(),
    )
    .await
}

pub async fn get_endpoint_topology(
    client: &GraphQlClient,
    params: EndpointTopologyParams,
) -> Result<CallToolResult, McpError> {
    query_topology(
        client,
        TopologyKind::Endpoint,
        params.service_id.as_deref(),
        params.service_name.as_deref(),
        params.duration.as_deref(),
    )
    .await
}

async fn query_topology(
    client: &GraphQlClient,
    kind: TopologyKind,
    service_id: Option<&str>,
    service_name: Option<&str>,
    duration: Option<&str>,
) -> Result<CallToolResult, McpError> {
    let variables = match build_topology_variables(service_id, service_name, duration) {
        Ok(variables) => variables,
        Err(message) => return Ok(tool_error(message)),
    };

    let data = match client.execute(kind.query(), variables).await {
        Ok(data) => data,
        Err(e) => {
            return Ok(tool_error(format!(
                "failed to query {} topology: {e}",
                kind.label()
            )));
        }
    };

    Ok(tool_json(&data))
}

pub(crate) fn build_topology_variables(
    service_id: Option<&str>,
    service_name: Option<&str>,
    duration: Option<&str>,
) -> Result<Value, String> {
    let service_id = service_id.unwrap_or("");
    let service_name = service_name.unwrap_or("");
    if service_id.is_empty() && service_name.is_empty() {
        return Err("either service_id or service_name must be provided".to_string());
    }
    let service_id = if service_id.is_empty() {
        service_name
    } else {
        service_id
    };

    let duration = resolve_duration(duration, None, None, None, false, 0);
    Ok(json!({ "serviceId": service_id, "duration": duration }))
}
