//! The MCP server: tool registration and protocol handlers.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, GetPromptRequestParam, GetPromptResult, ListPromptsResult,
        ListResourcesResult, PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_handler, tool_router,
};

use crate::graphql::GraphQlClient;
use crate::mcp::tools::{alarm, event, logs, metrics, mqe, topology, trace};
use crate::{prompts, resources};

const SERVER_INSTRUCTIONS: &str = "This server exposes an Apache SkyWalking observability \
backend. Use the trace tools to inspect distributed traces (prefer view='summary' to keep \
responses small), the metrics tools for OAL metrics and rankings, execute_mqe_expression for \
advanced metric queries, and the log/alarm/event/topology tools for the remaining signals. \
Time windows accept relative durations like '-30m' as well as absolute timestamps. Read the \
mqe:// resources for MQE syntax documentation.";

/// MCP server translating tool calls into SkyWalking GraphQL queries.
#[derive(Clone)]
pub struct McpServer {
    client: Arc<GraphQlClient>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl McpServer {
    pub fn new(client: Arc<GraphQlClient>) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Get all spans of a distributed trace by trace ID. Views: 'full' (complete span data, default), 'summary' (span counts, services, duration and error statistics), 'errors_only' (error spans only)."
    )]
    pub async fn get_trace_details(
        &self,
        params: Parameters<trace::GetTraceParams>,
    ) -> Result<CallToolResult, McpError> {
        trace::get_trace_details(&self.client, params.0).await
    }

    #[tool(
        description = "Get a trace from the cold storage stage by trace ID. Requires the time window the trace lies in, e.g. duration='7d'. Supports the same views as get_trace_details."
    )]
    pub async fn get_cold_trace_details(
        &self,
        params: Parameters<trace::GetColdTraceParams>,
    ) -> Result<CallToolResult, McpError> {
        trace::get_cold_trace_details(&self.client, params.0).await
    }

    #[tool(
        description = "Search traces with filters: service, instance, endpoint, trace ID, duration bounds, state (all/success/error), tags and pagination. At least one filter is required. With view='summary' returns aggregate statistics including error and slow traces."
    )]
    pub async fn query_traces(
        &self,
        params: Parameters<trace::QueryTracesParams>,
    ) -> Result<CallToolResult, McpError> {
        trace::query_traces(&self.client, params.0).await
    }

    #[tool(
        description = "Read a single OAL metric value, e.g. service_cpm, service_resp_time, service_sla or service_apdex, for a service, instance or endpoint over a time window."
    )]
    pub async fn query_single_metrics(
        &self,
        params: Parameters<metrics::SingleMetricsParams>,
    ) -> Result<CallToolResult, McpError> {
        metrics::query_single_metrics(&self.client, params.0).await
    }

    #[tool(
        description = "Rank entities by a metric, e.g. the top 5 services by service_cpm. The scope is inferred from the metric name prefix; order is DES by default."
    )]
    pub async fn query_top_n_metrics(
        &self,
        params: Parameters<metrics::TopNMetricsParams>,
    ) -> Result<CallToolResult, McpError> {
        metrics::query_top_n_metrics(&self.client, params.0).await
    }

    #[tool(
        description = "Search logs by service, instance, endpoint, related trace ID, tags and time window, with pagination. Supports the cold storage stage."
    )]
    pub async fn query_logs(
        &self,
        params: Parameters<logs::LogQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        logs::query_logs(&self.client, params.0).await
    }

    #[tool(
        description = "Query alarms by scope (Service, ServiceInstance, Endpoint or All), message keyword and time window, with pagination."
    )]
    pub async fn query_alarms(
        &self,
        params: Parameters<alarm::AlarmQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        alarm::query_alarms(&self.client, params.0).await
    }

    #[tool(
        description = "Query events such as deployments, scaling and exceptions, filtered by source, severity level (Normal/Warning/Critical), type and time window."
    )]
    pub async fn query_events(
        &self,
        params: Parameters<event::EventQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        event::query_events(&self.client, params.0).await
    }

    #[tool(
        description = "Get the service dependency graph (nodes and calls) for a service, identified by service_id or service_name."
    )]
    pub async fn get_service_topology(
        &self,
        params: Parameters<topology::ServiceTopologyParams>,
    ) -> Result<CallToolResult, McpError> {
        topology::get_service_topology(&self.client, params.0).await
    }

    #[tool(
        description = "Get the instance-level dependency graph for a service, identified by service_id or service_name."
    )]
    pub async fn get_instance_topology(
        &self,
        params: Parameters<topology::InstanceTopologyParams>,
    ) -> Result<CallToolResult, McpError> {
        topology::get_instance_topology(&self.client, params.0).await
    }

    #[tool(
        description = "Get the endpoint-level dependency graph for a service, identified by service_id or service_name."
    )]
    pub async fn get_endpoint_topology(
        &self,
        params: Parameters<topology::EndpointTopologyParams>,
    ) -> Result<CallToolResult, McpError> {
        topology::get_endpoint_topology(&self.client, params.0).await
    }

    #[tool(
        description = "Execute an MQE (Metrics Query Expression), e.g. 'service_sla * 100', 'avg(service_cpm)' or 'top_n(service_cpm, 10, des)'. Supports entity filtering, relation metrics, debugging and the cold storage stage. Read the mqe://docs/* resources for the full syntax."
    )]
    pub async fn execute_mqe_expression(
        &self,
        params: Parameters<mqe::MqeExpressionParams>,
    ) -> Result<CallToolResult, McpError> {
        mqe::execute_mqe_expression(&self.client, params.0).await
    }

    #[tool(
        description = "List the metrics available for MQE expressions, with their type and catalog. Accepts an optional regex name filter such as 'service_.*'."
    )]
    pub async fn list_mqe_metrics(
        &self,
        params: Parameters<mqe::MqeMetricsListParams>,
    ) -> Result<CallToolResult, McpError> {
        mqe::list_mqe_metrics(&self.client, params.0).await
    }

    #[tool(
        description = "Get the type of a metric (REGULAR_VALUE, LABELED_VALUE or SAMPLED_RECORD), which determines how it can be used in MQE expressions."
    )]
    pub async fn get_mqe_metric_type(
        &self,
        params: Parameters<mqe::MqeMetricTypeParams>,
    ) -> Result<CallToolResult, McpError> {
        mqe::get_mqe_metric_type(&self.client, params.0).await
    }
}

#[cfg(test)]
impl McpServer {
    pub(crate) fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder()
            .enable_tools()
            .enable_prompts()
            .enable_resources()
            .build();
        info.instructions = Some(SERVER_INSTRUCTIONS.to_string());
        info
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        let mut result = ListPromptsResult::default();
        result.prompts = prompts::catalog();
        Ok(result)
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        prompts::render(&request.name, request.arguments.as_ref())
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut result = ListResourcesResult::default();
        result.resources = resources::catalog();
        Ok(result)
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        resources::read(&self.client, &request.uri).await
    }
}
