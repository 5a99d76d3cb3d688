//! MQE documentation resources, served under the `mqe://` scheme.

use rmcp::ErrorData as McpError;
use rmcp::model::{AnnotateAble, RawResource, ReadResourceResult, Resource, ResourceContents};
use serde_json::json;

use crate::graphql::GraphQlClient;
use crate::mcp::tools::mqe;

const SYNTAX_URI: &str = "mqe://docs/syntax";
const EXAMPLES_URI: &str = "mqe://docs/examples";
const METRICS_URI: &str = "mqe://metrics/available";
const AI_PROMPT_URI: &str = "mqe://docs/ai_prompt";

const SYNTAX_DOC: &str = include_str!("../docs/mqe_detailed_syntax.md");
const EXAMPLES_DOC: &str = include_str!("../docs/mqe_examples.json");
const AI_PROMPT_DOC: &str = include_str!("../docs/mqe_ai_prompt.md");

/// All resources advertised by the server.
pub fn catalog() -> Vec<Resource> {
    vec![
        resource(
            SYNTAX_URI,
            "MQE Detailed Syntax Rules",
            "Comprehensive syntax rules and grammar for MQE expressions",
            "text/markdown",
        ),
        resource(
            EXAMPLES_URI,
            "MQE Examples",
            "Common MQE expression examples with natural language descriptions",
            "application/json",
        ),
        resource(
            METRICS_URI,
            "Available Metrics",
            "List of all available metrics in the current SkyWalking instance",
            "application/json",
        ),
        resource(
            AI_PROMPT_URI,
            "MQE AI Understanding Guide",
            "Guide for AI models to understand natural language queries and convert to MQE",
            "text/markdown",
        ),
    ]
}

/// Read a resource by URI. The metrics listing is fetched live from the
/// backend; everything else is embedded at compile time.
pub async fn read(client: &GraphQlClient, uri: &str) -> Result<ReadResourceResult, McpError> {
    let text = match uri {
        SYNTAX_URI => SYNTAX_DOC.to_string(),
        EXAMPLES_URI => EXAMPLES_DOC.to_string(),
        AI_PROMPT_URI => AI_PROMPT_DOC.to_string(),
        METRICS_URI => {
            let data = mqe::list_metrics(client, None).await.map_err(|e| {
                McpError::internal_error(format!("failed to list metrics: {e}"), None)
            })?;
            serde_json::to_string_pretty(&data).map_err(|e| {
                McpError::internal_error(format!("failed to format metrics data: {e}"), None)
            })?
        }
        other => {
            return Err(McpError::resource_not_found(
                "resource not found",
                Some(json!({ "uri": other })),
            ));
        }
    };

    Ok(ReadResourceResult::new(vec![ResourceContents::text(
        text, uri,
    )]))
}

fn resource(uri: &str, name: &str, description: &str, mime_type: &str) -> Resource {
    let mut raw = RawResource::new(uri, name);
    raw.description = Some(description.to_string());
    raw.mime_type = Some(mime_type.to_string());
    raw.no_annotation()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_all_resources() {
        let uris: Vec<String> = catalog().into_iter().map(|r| r.uri.clone()).collect();
        assert_eq!(
            uris,
            vec![SYNTAX_URI, EXAMPLES_URI, METRICS_URI, AI_PROMPT_URI]
        );
    }

    #[test]
    fn embedded_docs_are_not_empty() {
        assert!(SYNTAX_DOC.contains("MQE"));
        assert!(AI_PROMPT_DOC.contains("MQE"));
        serde_json::from_str::<serde_json::Value>(EXAMPLES_DOC).unwrap();
    }
}
