//! Schema scanning
//!
//! Only what resource wiring needs is read from the schema text: model
//! type names and the functions referenced by `@function` directives.

use once_cell::sync::Lazy;
use regex::Regex;

static MODEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"type\s+(\w+)\s*@model\b").expect("model regex is valid"));
static FUNCTION_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@function\(\s*name:\s*"([^"]+)"\s*\)"#).expect("function directive regex is valid")
});

/// Model type names, in schema order
#[must_use]
pub fn model_names(schema: &str) -> Vec<String> {
    MODEL.captures_iter(schema).map(|c| c[1].to_string()).collect()
}

/// Names referenced by `@function(name: "...")`, deduplicated in schema order
#[must_use]
pub fn function_references(schema: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for captures in FUNCTION_DIRECTIVE.captures_iter(schema) {
        let name = captures[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        type Blog @model {
          title: String
        }

        type ImportedModel @model(timestamps: null) {
          description: String
        }

        type Query {
          echo(message: String!): String! @function(name: "echo")
          echoAgain(message: String!): String! @function(name: "echo")
        }
    "#;

    #[test]
    fn finds_models() {
        assert_eq!(model_names(SCHEMA), vec!["Blog", "ImportedModel"]);
    }

    #[test]
    fn finds_function_references_once() {
        assert_eq!(function_references(SCHEMA), vec!["echo"]);
    }
}
