//! MCP tool implementations, one module per SkyWalking query domain.
//!
//! Each module exposes the parameter structs registered with the tool router
//! plus an async runner taking the shared GraphQL client. Validation problems
//! and backend failures become error-flagged tool results rather than
//! protocol errors, so the calling agent can read and react to them.

pub mod alarm;
pub mod event;
pub mod logs;
pub mod metrics;
pub mod mqe;
pub mod topology;
pub mod trace;

#[cfg(test)]
mod metrics_test;
#[cfg(test)]
mod trace_test;

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use crate::query::{DurationRange, build_duration, parse_duration};

/// Wrap a serializable value as a successful tool result.
pub(crate) fn tool_json<T: Serialize>(value: &T) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => tool_error(format!("failed to marshal result: {e}")),
    }
}

/// Wrap a message as an error-flagged tool result.
pub(crate) fn tool_error(message: impl Into<String>) -> CallToolResult {
    let mut result = CallToolResult::success(vec![Content::text(message.into())]);
    result.is_error = Some(true);
    result
}

/// Resolve the time window for a tool call: an explicit duration expression
/// wins, otherwise fall back to start/end bounds (or the default window).
pub(crate) fn resolve_duration(
    duration: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
    step: Option<&str>,
    cold_stage: bool,
    default_minutes: i64,
) -> DurationRange {
    match duration {
        Some(d) if !d.is_empty() => parse_duration(d, cold_stage),
        _ => build_duration(
            start.unwrap_or(""),
            end.unwrap_or(""),
            step.filter(|s| !s.is_empty()),
            cold_stage,
            default_minutes,
        ),
    }
}
