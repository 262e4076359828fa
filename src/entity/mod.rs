//! Entity module - SeaORM entity definitions
//!
//! One module per table, plus the response shapes handed to the API layer

pub mod company;
pub mod global_group;
pub mod group;
pub mod op_log;
pub mod post;

/// Split a comma-separated column into its trimmed, non-empty parts
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join list values into a comma-separated column
pub fn join_list(values: &[String]) -> String {
    values
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}
