//! Query-building primitives shared across the MCP tools.

mod duration;
mod pagination;

#[cfg(test)]
mod duration_test;

pub use duration::{
    DEFAULT_DURATION_MINUTES, DurationRange, Step, build_duration, format_time_by_step,
    parse_duration,
};
pub use pagination::{DEFAULT_PAGE_NUM, DEFAULT_PAGE_SIZE, Pagination};
