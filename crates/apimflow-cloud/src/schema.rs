//! Declarative resource schemas
//!
//! A [`Schema`] enumerates the attributes and nested blocks a resource
//! accepts. Raw configuration is checked against it once, at the boundary,
//! by [`Schema::conform`]; everything past that point works with typed
//! configuration.

use crate::error::{CloudError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Value type of a leaf attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int,
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeType::String => write!(f, "string"),
            AttributeType::Int => write!(f, "int"),
        }
    }
}

/// A leaf attribute of a resource or block
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub attr_type: AttributeType,

    /// Must be present in configuration
    pub required: bool,

    /// Set by the backend only; configuration may not set it
    pub computed: bool,

    /// A change cannot be applied in place and needs a new resource
    pub force_new: bool,

    /// Alternative spellings accepted in configuration
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Attribute {
    fn new(attr_type: AttributeType, required: bool, computed: bool) -> Self {
        Self {
            attr_type,
            required,
            computed,
            force_new: false,
            aliases: Vec::new(),
            description: None,
        }
    }

    pub fn required_string() -> Self {
        Self::new(AttributeType::String, true, false)
    }

    pub fn required_int() -> Self {
        Self::new(AttributeType::Int, true, false)
    }

    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, false, true)
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn matches_key(&self, name: &str, key: &str) -> bool {
        name == key || self.aliases.iter().any(|a| a == key)
    }
}

/// A nested block with bounded cardinality
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub attributes: BTreeMap<String, Attribute>,
    pub min_items: usize,
    pub max_items: usize,
}

impl Block {
    /// A block that must appear exactly once
    pub fn exactly_one() -> Self {
        Self {
            attributes: BTreeMap::new(),
            min_items: 1,
            max_items: 1,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    fn cardinality(&self) -> String {
        if self.min_items == self.max_items {
            format!("exactly {}", self.min_items)
        } else {
            format!("between {} and {}", self.min_items, self.max_items)
        }
    }
}

/// Resource schema
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    pub version: u32,
    pub attributes: BTreeMap<String, Attribute>,
    pub blocks: BTreeMap<String, Block>,
}

/// A single validation problem, located by a dotted path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl Schema {
    pub fn v0() -> Self {
        Self {
            version: 0,
            attributes: BTreeMap::new(),
            blocks: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn with_block(mut self, name: impl Into<String>, block: Block) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    /// Collect every problem in `raw` without failing fast
    pub fn validate(&self, raw: &Value) -> Vec<Diagnostic> {
        self.conform_inner(raw).1
    }

    /// Validate `raw` and return it in canonical shape
    ///
    /// Aliases are rewritten to attribute names and blocks with
    /// `max_items == 1` are collapsed from lists to objects.
    pub fn conform(&self, raw: &Value) -> Result<Value> {
        let (value, diagnostics) = self.conform_inner(raw);
        if diagnostics.is_empty() {
            Ok(value)
        } else {
            Err(CloudError::Validation(
                diagnostics
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            ))
        }
    }

    /// Attribute paths marked `force_new` whose values differ between two
    /// conformed configurations
    pub fn replacement_paths(&self, prior: &Value, proposed: &Value) -> Vec<String> {
        let mut paths = Vec::new();

        for (name, attribute) in &self.attributes {
            if attribute.force_new && prior.get(name) != proposed.get(name) {
                paths.push(name.clone());
            }
        }

        for (block_name, block) in &self.blocks {
            for (name, attribute) in &block.attributes {
                if !attribute.force_new {
                    continue;
                }
                let before = prior.get(block_name).and_then(|b| b.get(name));
                let after = proposed.get(block_name).and_then(|b| b.get(name));
                if before != after {
                    paths.push(format!("{}.{}", block_name, name));
                }
            }
        }

        paths
    }

    /// The configurable part of an observed value: computed attributes and
    /// unknown keys are dropped
    pub fn configuration_of(&self, observed: &Value) -> Value {
        let mut out = Map::new();

        for (name, attribute) in &self.attributes {
            if attribute.computed {
                continue;
            }
            if let Some(value) = observed.get(name) {
                out.insert(name.clone(), value.clone());
            }
        }

        for (name, block) in &self.blocks {
            if let Some(Value::Object(fields)) = observed.get(name) {
                let kept: Map<String, Value> = fields
                    .iter()
                    .filter(|(key, _)| {
                        block
                            .attributes
                            .get(key.as_str())
                            .is_some_and(|a| !a.computed)
                    })
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                out.insert(name.clone(), Value::Object(kept));
            }
        }

        Value::Object(out)
    }

    fn conform_inner(&self, raw: &Value) -> (Value, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();

        let Some(object) = raw.as_object() else {
            diagnostics.push(Diagnostic::new("<root>", "configuration must be a mapping"));
            return (Value::Null, diagnostics);
        };

        let mut out = conform_attributes(&self.attributes, object, "", &mut diagnostics);

        for (name, block) in &self.blocks {
            let items: Vec<&Value> = match object.get(name) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items.iter().collect(),
                Some(item @ Value::Object(_)) => vec![item],
                Some(_) => {
                    diagnostics.push(Diagnostic::new(name.as_str(), "expected a block"));
                    continue;
                }
            };

            if items.len() < block.min_items || items.len() > block.max_items {
                diagnostics.push(Diagnostic::new(
                    name.as_str(),
                    format!(
                        "{} block(s) required, found {}",
                        block.cardinality(),
                        items.len()
                    ),
                ));
                continue;
            }

            let mut conformed = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let path = if block.max_items == 1 {
                    name.clone()
                } else {
                    format!("{}.{}", name, index)
                };
                match item.as_object() {
                    Some(fields) => {
                        let fields =
                            conform_attributes(&block.attributes, fields, &path, &mut diagnostics);
                        conformed.push(Value::Object(fields));
                    }
                    None => diagnostics.push(Diagnostic::new(path, "expected a block")),
                }
            }

            if block.max_items == 1 {
                if let Some(single) = conformed.pop() {
                    out.insert(name.clone(), single);
                }
            } else {
                out.insert(name.clone(), Value::Array(conformed));
            }
        }

        for key in object.keys() {
            let known = self.blocks.contains_key(key)
                || self.attributes.iter().any(|(n, a)| a.matches_key(n, key));
            if !known {
                diagnostics.push(Diagnostic::new(key.as_str(), "unknown attribute"));
            }
        }

        (Value::Object(out), diagnostics)
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn conform_attributes(
    attributes: &BTreeMap<String, Attribute>,
    object: &Map<String, Value>,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Map<String, Value> {
    let mut out = Map::new();

    for (name, attribute) in attributes {
        let path = join_path(prefix, name);
        let present: Vec<(&String, &Value)> = object
            .iter()
            .filter(|(key, value)| attribute.matches_key(name, key) && !value.is_null())
            .collect();

        if present.len() > 1 {
            diagnostics.push(Diagnostic::new(
                path,
                "set more than once through its aliases",
            ));
            continue;
        }

        let Some((_, value)) = present.first() else {
            if attribute.required {
                diagnostics.push(Diagnostic::new(path, "required attribute is missing"));
            }
            continue;
        };

        if attribute.computed {
            diagnostics.push(Diagnostic::new(path, "computed attribute cannot be set"));
            continue;
        }

        match attribute.attr_type {
            AttributeType::Int if value.is_u64() && !value.is_i64() => {
                diagnostics.push(Diagnostic::new(path, "integer out of range"));
                continue;
            }
            AttributeType::Int if !value.is_i64() => {
                diagnostics.push(Diagnostic::new(path, "expected int"));
                continue;
            }
            AttributeType::String if !value.is_string() => {
                diagnostics.push(Diagnostic::new(path, "expected string"));
                continue;
            }
            _ => {}
        }

        out.insert(name.clone(), (*value).clone());
    }

    if !prefix.is_empty() {
        for key in object.keys() {
            if !attributes.iter().any(|(n, a)| a.matches_key(n, key)) {
                diagnostics.push(Diagnostic::new(join_path(prefix, key), "unknown attribute"));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("name", Attribute::required_string().force_new())
            .with_attribute("location", Attribute::required_string())
            .with_attribute("id", Attribute::computed_string())
            .with_block(
                "sku",
                Block::exactly_one()
                    .with_attribute("name", Attribute::required_string().with_alias("type"))
                    .with_attribute("capacity", Attribute::required_int()),
            )
    }

    #[test]
    fn test_conform_collapses_single_block_list() {
        let raw = json!({
            "name": "svc1",
            "location": "westus",
            "sku": [{ "type": "Standard", "capacity": 1 }]
        });

        let conformed = schema().conform(&raw).unwrap();
        assert_eq!(conformed["sku"], json!({ "name": "Standard", "capacity": 1 }));
    }

    #[test]
    fn test_missing_block_is_reported() {
        let raw = json!({ "name": "svc1", "location": "westus" });

        let diagnostics = schema().validate(&raw);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].path, "sku");
        assert!(diagnostics[0].message.contains("found 0"));
    }

    #[test]
    fn test_two_blocks_are_rejected() {
        let raw = json!({
            "name": "svc1",
            "location": "westus",
            "sku": [
                { "name": "Standard", "capacity": 1 },
                { "name": "Premium", "capacity": 2 }
            ]
        });

        let err = schema().conform(&raw).unwrap_err();
        assert!(matches!(err, CloudError::Validation(msg) if msg.contains("found 2")));
    }

    #[test]
    fn test_all_problems_are_collected() {
        let raw = json!({
            "location": 3,
            "id": "/x",
            "colour": "blue",
            "sku": { "name": "Standard", "capacity": "one", "tier": 1 }
        });

        let paths: Vec<String> = schema()
            .validate(&raw)
            .into_iter()
            .map(|d| d.path)
            .collect();

        assert!(paths.contains(&"name".to_string()));
        assert!(paths.contains(&"location".to_string()));
        assert!(paths.contains(&"id".to_string()));
        assert!(paths.contains(&"colour".to_string()));
        assert!(paths.contains(&"sku.capacity".to_string()));
        assert!(paths.contains(&"sku.tier".to_string()));
    }

    #[test]
    fn test_alias_and_name_together_conflict() {
        let raw = json!({
            "name": "svc1",
            "location": "westus",
            "sku": { "name": "Standard", "type": "Premium", "capacity": 1 }
        });

        let diagnostics = schema().validate(&raw);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].path, "sku.name");
    }

    #[test]
    fn test_huge_integer_is_out_of_range() {
        let raw = json!({
            "name": "svc1",
            "location": "westus",
            "sku": { "name": "Standard", "capacity": u64::MAX }
        });

        let diagnostics = schema().validate(&raw);
        assert_eq!(diagnostics[0].message, "integer out of range");
    }

    #[test]
    fn test_non_mapping_root() {
        let err = schema().conform(&json!(["svc1"])).unwrap_err();
        assert!(matches!(err, CloudError::Validation(_)));
    }

    #[test]
    fn test_replacement_paths() {
        let s = schema();
        let prior = json!({ "name": "svc1", "location": "westus" });
        let renamed = json!({ "name": "svc2", "location": "westus" });
        let moved = json!({ "name": "svc1", "location": "eastus" });

        assert_eq!(s.replacement_paths(&prior, &renamed), vec!["name".to_string()]);
        assert!(s.replacement_paths(&prior, &moved).is_empty());
    }

    #[test]
    fn test_configuration_of_drops_computed() {
        let observed = json!({
            "id": "/subscriptions/sub/resourceGroups/rg1",
            "name": "svc1",
            "location": "westus",
            "gateway_url": "https://svc1.azure-api.net",
            "sku": { "name": "Standard", "capacity": 1 }
        });

        let config = schema().configuration_of(&observed);

        assert_eq!(
            config,
            json!({
                "name": "svc1",
                "location": "westus",
                "sku": { "name": "Standard", "capacity": 1 }
            })
        );
        assert!(schema().validate(&config).is_empty());
    }
}
