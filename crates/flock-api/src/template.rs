//! `{{ name }}` placeholder substitution shared by email templates and workflows.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Result of rendering one template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Placeholder names with no value, deduplicated, in order of first appearance.
    pub missing: Vec<String>,
}

/// Substitutes known variables. Unknown placeholders stay in the output as written.
pub fn render(template: &str, vars: &HashMap<String, String>) -> Rendered {
    let mut missing: Vec<String> = Vec::new();
    let text = PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            match vars.get(name) {
                Some(value) => value.clone(),
                None => {
                    if !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        })
        .into_owned();
    Rendered { text, missing }
}

/// Placeholder names used by `template`, deduplicated, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Appends the names in `more` not already present in `into`.
pub fn merge_missing(into: &mut Vec<String>, more: Vec<String>) {
    for name in more {
        if !into.contains(&name) {
            into.push(name);
        }
    }
}
