//! Doc-comment adapter for function tools
//!
//! Lets a tool be described the way a JSDoc-annotated function would be:
//!
//! ```text
//! /**
//!  * @description Quote a price for a product
//!  * @param {string} product - The product to quote
//!  * @param {string} tier - Service tier @enum ["basic", "premium"]
//!  */
//! ```
//!
//! together with a signature such as `product, tier = "basic"`. The comment is
//! parsed into the same [`Parameter`] descriptors the declarative API uses.
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;

use super::function::FunctionTool;
use super::schema::{Parameter, ParameterType, SchemaError};

lazy_static! {
    static ref PARAM_RE: Regex = Regex::new(r"^@param\s+\{(\w+)\}\s+(\w+)\s+-\s+(.*)$").unwrap();
    static ref ENUM_RE: Regex = Regex::new(r"@enum\s+(\[.*?\])").unwrap();
}

struct DocParam {
    kind: ParameterType,
    description: String,
    enum_values: Option<Vec<Value>>,
}

impl FunctionTool {
    /// Build a function tool from a documentation comment and a parameter
    /// signature. Every declared parameter must be documented and every
    /// documented parameter must be declared.
    pub fn from_doc<N, F, Fut>(
        name: N,
        signature: &str,
        doc: &str,
        handler: F,
    ) -> Result<Self, SchemaError>
    where
        N: Into<String>,
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let name = name.into();
        let (description, parameters) = parse(&name, signature, doc)?;
        Ok(FunctionTool::new(name, description, handler).with_parameters(parameters))
    }
}

fn parse(function: &str, signature: &str, doc: &str) -> Result<(String, Vec<Parameter>), SchemaError> {
    let lines = doc_lines(doc).ok_or_else(|| SchemaError::MissingDocBlock(function.to_string()))?;

    let description = lines
        .iter()
        .find_map(|line| line.strip_prefix("@description"))
        .map(|rest| rest.trim().to_string())
        .ok_or_else(|| SchemaError::MissingDescription(function.to_string()))?;

    let mut documented: HashMap<String, DocParam> = HashMap::new();
    let mut documented_order = Vec::new();
    for line in lines.iter().filter(|line| line.starts_with("@param")) {
        let caps = PARAM_RE
            .captures(line)
            .ok_or_else(|| SchemaError::InvalidParamFormat {
                function: function.to_string(),
                line: line.clone(),
            })?;
        let (kind, param, text) = (&caps[1], &caps[2], &caps[3]);

        let kind: ParameterType = kind.parse().map_err(|kind| SchemaError::InvalidType {
            function: function.to_string(),
            param: param.to_string(),
            kind,
        })?;

        let (description, enum_values) = match ENUM_RE.captures(text) {
            Some(enum_caps) => {
                let values: Vec<Value> = serde_json::from_str(&enum_caps[1]).map_err(|_| {
                    SchemaError::InvalidEnum {
                        function: function.to_string(),
                        param: param.to_string(),
                    }
                })?;
                (text.replace(&enum_caps[0], "").trim().to_string(), Some(values))
            }
            None => (text.trim().to_string(), None),
        };

        documented_order.push(param.to_string());
        documented.insert(
            param.to_string(),
            DocParam {
                kind,
                description,
                enum_values,
            },
        );
    }

    let declared = parse_signature(signature);

    let mut parameters = Vec::with_capacity(declared.len());
    for (param, default) in &declared {
        let doc_param = documented
            .get(param)
            .ok_or_else(|| SchemaError::Undocumented {
                function: function.to_string(),
                param: param.clone(),
            })?;
        parameters.push(Parameter {
            name: param.clone(),
            kind: doc_param.kind,
            description: doc_param.description.clone(),
            enum_values: doc_param.enum_values.clone(),
            default: default.clone(),
        });
    }

    if let Some(extra) = documented_order
        .iter()
        .find(|param| !declared.iter().any(|(name, _)| name == *param))
    {
        return Err(SchemaError::DocumentedButUndeclared {
            function: function.to_string(),
            param: extra.clone(),
        });
    }

    Ok((description, parameters))
}

/// Extract the cleaned, non-empty lines of the first `/** ... */` block, or of
/// consecutive `///` lines when there is no block.
fn doc_lines(doc: &str) -> Option<Vec<String>> {
    let body = match (doc.find("/**"), doc.find("*/")) {
        (Some(start), Some(end)) if end > start + 2 => doc[start + 3..end].to_string(),
        _ => {
            let slashes: Vec<&str> = doc
                .lines()
                .map(str::trim)
                .filter_map(|line| line.strip_prefix("///"))
                .collect();
            if slashes.is_empty() {
                return None;
            }
            slashes.join("\n")
        }
    };

    Some(
        body.lines()
            .map(|line| line.trim().trim_start_matches(['*', '/']).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect(),
    )
}

/// Split `a, b = 1, c = [1, 2]` into names and parsed defaults
fn parse_signature(signature: &str) -> Vec<(String, Option<Value>)> {
    let signature = signature.trim();
    let signature = signature
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(signature);

    split_top_level(signature)
        .into_iter()
        .map(str::trim)
        .filter(|param| !param.is_empty())
        .map(|param| match param.split_once('=') {
            Some((name, default)) => (name.trim().to_string(), Some(parse_default(default.trim()))),
            None => (param.to_string(), None),
        })
        .collect()
}

fn parse_default(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| {
        Value::String(raw.trim_matches(|c| c == '\'' || c == '"').to_string())
    })
}

fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '{' | '(') => depth += 1,
            (None, ']' | '}' | ')') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::derive_schema;
    use serde_json::json;

    const QUOTE_DOC: &str = r#"
        /**
         * @description Quote a price for a product
         * @param {string} product - The product to quote
         * @param {String} tier - Service tier @enum ["basic", "premium"]
         * @param {number} quantity - How many units
         */
    "#;

    fn from_doc(signature: &str, doc: &str) -> Result<FunctionTool, SchemaError> {
        FunctionTool::from_doc("quote_price", signature, doc, |_| async { Ok(json!("ok")) })
    }

    #[test]
    fn test_well_formed_doc() {
        let tool = from_doc(r#"product, tier = "basic", quantity = 1"#, QUOTE_DOC).unwrap();
        assert_eq!(tool.description, "Quote a price for a product");

        let schema = derive_schema(&tool).unwrap();
        assert_eq!(schema.required(), vec!["product"]);
        assert_eq!(
            schema.property("tier").unwrap(),
            &json!({
                "type": "string",
                "description": "Service tier",
                "enum": ["basic", "premium"]
            })
        );
        assert!(schema.property("quantity").unwrap().get("enum").is_none());
        assert_eq!(tool.parameters[1].default, Some(json!("basic")));
        assert_eq!(tool.parameters[2].default, Some(json!(1)));
    }

    #[test]
    fn test_triple_slash_doc() {
        let doc = "/// @description Echo\n/// @param {string} text - What to echo";
        let tool = from_doc("text", doc).unwrap();
        assert_eq!(tool.parameters.len(), 1);
        assert!(tool.parameters[0].is_required());
    }

    #[test]
    fn test_missing_doc_block() {
        assert_eq!(
            from_doc("product", "no docs here").unwrap_err(),
            SchemaError::MissingDocBlock("quote_price".to_string())
        );
    }

    #[test]
    fn test_missing_description() {
        let doc = "/** @param {string} product - The product */";
        assert_eq!(
            from_doc("product", doc).unwrap_err(),
            SchemaError::MissingDescription("quote_price".to_string())
        );
    }

    #[test]
    fn test_malformed_param() {
        let doc = "/**\n * @description Quote\n * @param product the product\n */";
        assert!(matches!(
            from_doc("product", doc).unwrap_err(),
            SchemaError::InvalidParamFormat { .. }
        ));
    }

    #[test]
    fn test_invalid_type() {
        let doc = "/**\n * @description Quote\n * @param {integer} product - The product\n */";
        match from_doc("product", doc).unwrap_err() {
            SchemaError::InvalidType { param, kind, .. } => {
                assert_eq!(param, "product");
                assert_eq!(kind, "integer");
            }
            other => panic!("Expected InvalidType, got {other:?}"),
        }
    }

    #[test]
    fn test_documented_but_undeclared() {
        match from_doc("product, tier", QUOTE_DOC).unwrap_err() {
            SchemaError::DocumentedButUndeclared { param, .. } => assert_eq!(param, "quantity"),
            other => panic!("Expected DocumentedButUndeclared, got {other:?}"),
        }
    }

    #[test]
    fn test_declared_but_undocumented() {
        match from_doc("product, tier, quantity, discount", QUOTE_DOC).unwrap_err() {
            SchemaError::Undocumented { param, .. } => assert_eq!(param, "discount"),
            other => panic!("Expected Undocumented, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_enum() {
        let doc = "/**\n * @description Quote\n * @param {string} tier - Tier @enum [basic, premium]\n */";
        assert!(matches!(
            from_doc("tier", doc).unwrap_err(),
            SchemaError::InvalidEnum { .. }
        ));
    }

    #[test]
    fn test_parse_signature() {
        let declared = parse_signature("(a, b = 'x', c = [1, 2], d = {\"k\": 1})");
        assert_eq!(
            declared,
            vec![
                ("a".to_string(), None),
                ("b".to_string(), Some(json!("x"))),
                ("c".to_string(), Some(json!([1, 2]))),
                ("d".to_string(), Some(json!({"k": 1}))),
            ]
        );
        assert!(parse_signature("").is_empty());
    }
}
