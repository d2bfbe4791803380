//! JSON-Schema subset used by the validator.
//!
//! Supported keywords: `type` (one kind or a list), `enum`, `required`,
//! `properties`, `additionalProperties` (boolean), `minimum`,
//! `exclusiveMinimum`, `maximum`, `exclusiveMaximum`, `minLength`,
//! `maxLength`, `format` (`date-time`), `items`, `minItems`, and `maxItems`.
//! `title` and `description` are kept as annotations, and the document root
//! may carry `$schema`, `$id`, and `$comment`. The root may also name an
//! `integrityField` whose value is checked against the hash of the remaining
//! fields. Any other keyword fails to load rather than being skipped.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{DuelError, Result};
use crate::integrity::INTEGRITY_FIELD;

/// Root-level keywords that carry no validation meaning.
const DOCUMENT_ANNOTATIONS: &[&str] = &["$schema", "$id", "$comment"];

/// JSON value kinds a schema node can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl JsonType {
    /// Keyword spelling, as used in messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

/// Value of the `type` keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    Single(JsonType),
    Union(Vec<JsonType>),
}

impl TypeSpec {
    /// Every kind the value may have.
    pub fn kinds(&self) -> &[JsonType] {
        match self {
            Self::Single(kind) => std::slice::from_ref(kind),
            Self::Union(kinds) => kinds,
        }
    }
}

impl From<JsonType> for TypeSpec {
    fn from(kind: JsonType) -> Self {
        Self::Single(kind)
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.kinds().iter().map(|k| k.as_str()).collect();
        f.write_str(&names.join(" or "))
    }
}

/// One node of a schema tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemaNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TypeSpec>,
    /// `enum`: the value must equal one of these.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaNode>,
    /// `false` rejects object fields not named in `properties`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

impl SchemaNode {
    /// Node requiring `kind`.
    pub fn of(kind: JsonType) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Object node with the given properties, all required.
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, SchemaNode)>,
        K: Into<String>,
    {
        let properties: BTreeMap<String, SchemaNode> =
            properties.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            kind: Some(JsonType::Object.into()),
            required: properties.keys().cloned().collect(),
            properties,
            ..Self::default()
        }
    }

    /// Array node whose elements match `items`.
    pub fn array(items: SchemaNode) -> Self {
        Self {
            kind: Some(JsonType::Array.into()),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    /// Sets `minimum`.
    pub fn min(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    /// Sets `exclusiveMinimum`.
    pub fn min_exclusive(mut self, bound: f64) -> Self {
        self.exclusive_minimum = Some(bound);
        self
    }

    /// Sets `maximum`.
    pub fn max(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    /// Sets `format`.
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    /// Rejects fields not named in `properties`.
    pub fn closed(mut self) -> Self {
        self.additional_properties = Some(false);
        self
    }

    /// Sets `title`.
    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Adds an optional property.
    pub fn optional(mut self, name: &str, node: SchemaNode) -> Self {
        self.properties.insert(name.to_string(), node);
        self
    }
}

/// A complete schema: a root node plus document-level settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Top-level field holding a hash of every other field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_field: Option<String>,
    #[serde(flatten)]
    pub root: SchemaNode,
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut document = serde_json::Map::deserialize(deserializer)?;
        for annotation in DOCUMENT_ANNOTATIONS {
            document.remove(*annotation);
        }
        let integrity_field = match document.remove("integrityField") {
            None => None,
            Some(Value::String(field)) => Some(field),
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "integrityField must be a string, found {other}"
                )));
            }
        };
        let root = SchemaNode::deserialize(Value::Object(document)).map_err(D::Error::custom)?;
        Ok(Self {
            integrity_field,
            root,
        })
    }
}

impl Schema {
    /// Names accepted by [`Schema::builtin`].
    pub const BUILTINS: &[&str] = &["summary_record", "narrative_log"];

    /// Schema of a persisted summary record, with its integrity hash.
    pub fn summary_record() -> Self {
        use JsonType::{Integer, Number, String};
        Self {
            integrity_field: Some(INTEGRITY_FIELD.to_string()),
            root: SchemaNode::object([
                ("seed", SchemaNode::of(Integer).min(0.0)),
                ("simulation_duration_hours", SchemaNode::of(Integer).min_exclusive(0.0)),
                ("strategy_id", SchemaNode::of(String)),
                ("average_grid_draw_kw", SchemaNode::of(Number).min(0.0)),
                ("comfort_violations", SchemaNode::of(Integer).min(0.0)),
                ("timestamp", SchemaNode::of(String).with_format("date-time")),
                (INTEGRITY_FIELD, SchemaNode::of(String)),
            ])
            .titled("summary_record")
            .closed(),
        }
    }

    /// Schema of a narrative debate log.
    ///
    /// `branch`, `seed`, `violations`, `tokens`, and `text` are checked when
    /// present but not required.
    pub fn narrative_log() -> Self {
        use JsonType::{Integer, Number, String};
        let spike = SchemaNode::object([
            ("term", SchemaNode::of(String)),
            ("intensity", SchemaNode::of(Number).min(0.0).max(1.0)),
            ("context", SchemaNode::of(String)),
        ]);
        let root = SchemaNode::object([
            ("timestamp", SchemaNode::of(String).with_format("date-time")),
            ("session_id", SchemaNode::of(String)),
            ("model", SchemaNode::of(String)),
            ("entropy", SchemaNode::of(Number).min(0.0)),
            ("mutual_information", SchemaNode::of(Number).min(0.0)),
            ("spikes", SchemaNode::array(spike)),
        ])
        .optional("branch", SchemaNode::of(String))
        .optional("seed", SchemaNode::of(Integer).min(0.0))
        .optional("violations", SchemaNode::of(Integer).min(0.0))
        .optional("tokens", SchemaNode::of(Integer).min_exclusive(0.0))
        .optional("text", SchemaNode::of(String))
        .titled("narrative_log");
        Self {
            integrity_field: None,
            root,
        }
    }

    /// Built-in schema by name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "summary_record" => Some(Self::summary_record()),
            "narrative_log" => Some(Self::narrative_log()),
            _ => None,
        }
    }

    /// Loads a schema from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a JSON error if it
    /// is not a schema document.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| DuelError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// A built-in name or, failing that, a schema file path.
    ///
    /// # Errors
    ///
    /// See [`Schema::from_file`].
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        match Self::builtin(name_or_path) {
            Some(schema) => Ok(schema),
            None => Self::from_file(Path::new(name_or_path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_schema_requires_every_field() {
        let schema = Schema::summary_record();
        assert_eq!(schema.root.required.len(), 7);
        assert!(schema.root.required.contains(&INTEGRITY_FIELD.to_string()));
        assert_eq!(schema.integrity_field.as_deref(), Some(INTEGRITY_FIELD));
    }

    #[test]
    fn json_uses_schema_keywords() {
        let json = serde_json::to_value(Schema::summary_record()).unwrap();
        assert_eq!(json["type"], "object");
        assert_eq!(json["integrityField"], INTEGRITY_FIELD);
        assert_eq!(json["additionalProperties"], false);
        assert_eq!(
            json["properties"]["simulation_duration_hours"]["exclusiveMinimum"],
            0.0
        );
    }

    #[test]
    fn builtins_round_trip_through_json() {
        for name in Schema::BUILTINS {
            let schema = Schema::builtin(name).unwrap();
            let text = serde_json::to_string(&schema).unwrap();
            let back: Schema = serde_json::from_str(&text).unwrap();
            assert_eq!(back, schema, "{name}");
        }
    }

    #[test]
    fn annotations_load() {
        let text = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "description": "just a number",
            "type": "number",
            "maximum": 3
        }"#;
        let schema: Schema = serde_json::from_str(text).unwrap();
        assert_eq!(schema.root.kind, Some(TypeSpec::Single(JsonType::Number)));
        assert_eq!(schema.root.maximum, Some(3.0));
        assert_eq!(schema.root.description.as_deref(), Some("just a number"));
    }

    #[test]
    fn unsupported_keywords_fail_to_load() {
        for text in [
            r#"{"type": "string", "pattern": "^a$"}"#,
            r#"{"type": "object", "properties": {"x": {"oneOf": []}}}"#,
            r#"{"type": "object", "additionalProperties": {"type": "string"}}"#,
            r#"{"integrityField": 3}"#,
        ] {
            assert!(serde_json::from_str::<Schema>(text).is_err(), "{text}");
        }
    }

    #[test]
    fn type_union_loads() {
        let schema: Schema = serde_json::from_str(r#"{"type": ["number", "null"]}"#).unwrap();
        let kind = schema.root.kind.unwrap();
        assert_eq!(kind.kinds(), &[JsonType::Number, JsonType::Null]);
        assert_eq!(kind.to_string(), "number or null");
    }

    #[test]
    fn unknown_builtin_is_none() {
        assert!(Schema::builtin("weather").is_none());
    }

    #[test]
    fn shipped_schema_files_match_builtins() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("schemas");
        for name in Schema::BUILTINS {
            let from_file = Schema::from_file(&dir.join(format!("{name}.schema.json"))).unwrap();
            assert_eq!(from_file, Schema::builtin(name).unwrap(), "{name}");
        }
    }
}
