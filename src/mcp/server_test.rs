use std::collections::BTreeSet;
use std::sync::Arc;

use rmcp::ServerHandler;

use crate::graphql::GraphQlClient;

use super::McpServer;

fn server() -> McpServer {
    let client = GraphQlClient::new("http://oap:12800/graphql").unwrap();
    McpServer::new(Arc::new(client))
}

#[test]
fn all_tools_are_registered() {
    let names: BTreeSet<String> = server().tool_names().into_iter().collect();
    let expected: BTreeSet<String> = [
        "get_trace_details",
        "get_cold_trace_details",
        "query_traces",
        "query_single_metrics",
        "query_top_n_metrics",
        "query_logs",
        "query_alarms",
        "query_events",
        "get_service_topology",
        "get_instance_topology",
        "get_endpoint_topology",
        "execute_mqe_expression",
        "list_mqe_metrics",
        "get_mqe_metric_type",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(names, expected);
}

#[test]
fn server_info_advertises_tools_prompts_and_resources() {
    let info = server().get_info();
    assert!(info.capabilities.tools.is_some());
    assert!(info.capabilities.prompts.is_some());
    assert!(info.capabilities.resources.is_some());
    assert!(info.instructions.unwrap().contains("SkyWalking"));
}
