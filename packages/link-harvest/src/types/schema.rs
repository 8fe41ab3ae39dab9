//! Field schema built from user column names.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::SchemaError;

/// One user-declared output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Name as the user typed it (trimmed)
    pub name: String,

    /// Normalized key used in engine requests and responses
    pub key: String,
}

impl Field {
    /// Description attached to the field in the engine schema.
    pub fn description(&self) -> String {
        format!("Data for {}", self.name)
    }
}

/// Normalize a column name into an engine key.
///
/// Trims, collapses whitespace runs into a single `_`, lowercases:
/// `"  Net   Revenue "` becomes `"net_revenue"`.
pub fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Keys taken by the bookkeeping columns of every row.
const RESERVED_KEYS: &[&str] = &["link_label", "link_url", "error"];

/// Ordered, validated set of output columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    fields: Vec<Field>,
}

impl FieldSchema {
    /// Build a schema from column names.
    ///
    /// Rejects an empty list, blank names, bookkeeping column names and
    /// names that collide after normalization ("Net Revenue" vs "net revenue").
    pub fn new(names: impl IntoIterator<Item = impl AsRef<str>>) -> Result<Self, SchemaError> {
        let mut fields: Vec<Field> = Vec::new();

        for (position, raw) in names.into_iter().enumerate() {
            let name = raw.as_ref().trim();
            if name.is_empty() {
                return Err(SchemaError::BlankName { position });
            }

            let key = normalize_key(name);
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(SchemaError::Reserved {
                    name: name.to_string(),
                });
            }
            if let Some(existing) = fields.iter().find(|f| f.key == key) {
                return Err(SchemaError::DuplicateKey {
                    key,
                    first: existing.name.clone(),
                    second: name.to_string(),
                });
            }

            fields.push(Field {
                name: name.to_string(),
                key,
            });
        }

        if fields.is_empty() {
            return Err(SchemaError::Empty);
        }

        Ok(Self { fields })
    }

    /// Parse a comma-separated column list (`"Name, Revenue, HQ City"`).
    pub fn parse_list(list: &str) -> Result<Self, SchemaError> {
        Self::new(list.split(',').filter(|s| !s.trim().is_empty()))
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Original column names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for a constructed schema.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by its normalized key.
    pub fn by_key(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Whether one of the declared fields is the page URL itself.
    pub fn declares_url(&self) -> bool {
        self.by_key("url").is_some()
    }

    /// Strict JSON schema for the engine.
    ///
    /// Every key is required at the protocol level but nullable, so the
    /// engine must answer for every column and may say "not on this page".
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(
                field.key.clone(),
                json!({
                    "type": ["string", "null"],
                    "description": field.description(),
                }),
            );
        }

        let required: Vec<Value> = self
            .fields
            .iter()
            .map(|f| Value::String(f.key.clone()))
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}
