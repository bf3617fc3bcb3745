//! Name Resolution
//!
//! Turns schema keys and titles into identifiers:
//! - sanitization: split on anything that is not a letter or digit, capitalize
//!   each fragment, apply the convention table, join
//! - schema naming: title, caller key, `Root`, JSON key, parent key + `Item`,
//!   then a synthesized `Anonymous<N>`
//!
//! The anonymous counter belongs to one `Namer` (and therefore one generator);
//! it never resets during a pass, so synthesized names never repeat.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::config::NamingConfig;
use crate::graph::{NodeId, SchemaGraph};

static NON_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("static pattern"));

/// Name for a root schema that has no title
pub const ROOT_NAME: &str = "Root";

/// Strip characters that cannot appear in an identifier and apply conventions.
///
/// Runs of delimiters never produce empty fragments. A leading digit gets an
/// underscore prefix.
pub fn to_identifier(raw: &str, conventions: &BTreeMap<String, String>) -> String {
    let mut result = String::with_capacity(raw.len() + 1);
    for (i, fragment) in NON_NAME_CHARS
        .split(raw)
        .filter(|f| !f.is_empty())
        .enumerate()
    {
        if i == 0 && fragment.starts_with(|c: char| c.is_numeric()) {
            result.push('_');
        }
        let capitalized = capitalize_first(fragment);
        match conventions.get(&capitalized) {
            Some(replacement) => result.push_str(replacement),
            None => result.push_str(&capitalized),
        }
    }
    result
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Generates names for schemas within a single resolution pass
#[derive(Debug)]
pub struct Namer {
    conventions: BTreeMap<String, String>,
    anon_count: usize,
}

impl Namer {
    pub fn new(naming: &NamingConfig) -> Self {
        Self {
            conventions: naming.table(),
            anon_count: 0,
        }
    }

    /// Sanitize `raw` with this namer's conventions
    pub fn identifier(&self, raw: &str) -> String {
        to_identifier(raw, &self.conventions)
    }

    /// Name for the schema at `id`, first match wins:
    /// title, `key`, `Root`, JSON key, parent JSON key + `Item`, `Anonymous<N>`.
    pub fn schema_name(&mut self, key: &str, graph: &SchemaGraph, id: NodeId) -> String {
        let node = graph.node(id);
        if !node.title.is_empty() {
            return self.identifier(&node.title);
        }
        if !key.is_empty() {
            return self.identifier(key);
        }
        let Some(parent) = graph.parent(id) else {
            return ROOT_NAME.to_string();
        };
        if !node.json_key.is_empty() {
            return self.identifier(&node.json_key);
        }
        if !parent.json_key.is_empty() {
            return self.identifier(&format!("{}Item", parent.json_key));
        }
        self.anon_count += 1;
        format!("Anonymous{}", self.anon_count)
    }

    /// Anonymous names handed out so far
    pub fn anonymous_count(&self) -> usize {
        self.anon_count
    }
}
