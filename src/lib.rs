//! MCP server for Apache SkyWalking.
//!
//! Translates MCP tool calls from an AI agent into GraphQL queries against a
//! SkyWalking OAP backend and reshapes the responses for LLM consumption.
//! Covers traces, metrics, logs, alarms, events, topology and MQE expressions,
//! plus a set of analysis prompts and embedded MQE documentation resources.

pub mod config;
pub mod graphql;
pub mod mcp;
pub mod prompts;
pub mod query;
pub mod resources;
