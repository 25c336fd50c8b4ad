//! Field binding annotations
//!
//! A typed descriptor annotates each field with a tag string such as
//! `column:created_at;readonly`. Directives are separated by `;`, a
//! directive's name and value by the first `:`. Names are case-insensitive
//! and stored trimmed and upper-cased. Values are kept exactly as written. A
//! directive without a value maps to its own name.

use std::collections::HashMap;

/// Directive naming the source column a field binds to.
pub const COLUMN: &str = "COLUMN";

pub fn parse_tags(tag: &str) -> HashMap<String, String> {
    let mut settings = HashMap::new();

    for directive in tag.split(';') {
        if directive.trim().is_empty() {
            continue;
        }
        match directive.split_once(':') {
            Some((name, value)) => {
                settings.insert(name.trim().to_uppercase(), value.to_string());
            }
            None => {
                let name = directive.trim().to_uppercase();
                settings.insert(name.clone(), name);
            }
        }
    }

    settings
}

/// Source column named by a tag.
///
/// A bare `column` directive carries the sentinel value `COLUMN` and binds
/// nothing.
pub fn column_from_tag(tag: &str) -> Option<String> {
    parse_tags(tag)
        .remove(COLUMN)
        .filter(|column| column != COLUMN && !column.is_empty())
}
