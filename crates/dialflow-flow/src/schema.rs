//! User-data schema synthesis.
//!
//! A flow never declares its user-data record directly. The record's shape is
//! the union of every `collect_data` field in the graph, computed once when the
//! flow is compiled. Values live in a JSON map; the schema is kept alongside
//! for validation and introspection.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::model::{DataField, FieldType, Flow};

/// One field of the synthesized user-data record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub description: String,
    pub required: bool,
}

impl From<&DataField> for SchemaField {
    fn from(field: &DataField) -> Self {
        Self {
            name: field.name.clone(),
            field_type: field.field_type,
            description: field.description.clone(),
            required: field.required,
        }
    }
}

/// Static shape of the user-data record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserDataSchema {
    fields: Vec<SchemaField>,
}

impl UserDataSchema {
    /// Walk nodes, edges and `collect_data` in declaration order.
    ///
    /// The first declaration of a field name wins; later duplicates are ignored
    /// even when their type or description differs.
    pub fn synthesize(flow: &Flow) -> Self {
        let all = flow
            .nodes
            .iter()
            .flat_map(|node| node.edges.iter())
            .flat_map(|edge| edge.collect_data.iter());
        Self::from_fields(all)
    }

    /// Build a schema from a sequence of data fields, first-wins.
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = &'a DataField>) -> Self {
        let mut schema = Self::default();
        for field in fields {
            if schema.field(&field.name).is_some() {
                debug!(field = %field.name, "Duplicate data field ignored, first declaration wins");
                continue;
            }
            schema.fields.push(SchemaField::from(field));
        }
        schema
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON Schema describing the full record.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(
                field.name.clone(),
                serde_json::json!({
                    "type": field.field_type.json_type(),
                    "description": field.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check supplied values against the declared types.
    ///
    /// Only the values present are checked; a partially filled record is valid.
    pub fn validate(&self, values: &Map<String, Value>) -> Result<(), Vec<String>> {
        let mut issues = Vec::new();
        for (name, value) in values {
            match self.field(name) {
                None => issues.push(format!("unknown field '{}'", name)),
                Some(field) if !value.is_null() && !field.field_type.accepts(value) => {
                    issues.push(format!(
                        "field '{}' expects {} but got {}",
                        name, field.field_type, value
                    ));
                }
                Some(_) => {}
            }
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

/// Session-scoped record of collected user data.
#[derive(Debug, Clone)]
pub struct UserData {
    schema: Arc<UserDataSchema>,
    values: Map<String, Value>,
}

impl UserData {
    /// Create an empty record bound to `schema`.
    pub fn new(schema: Arc<UserDataSchema>) -> Self {
        Self {
            schema,
            values: Map::new(),
        }
    }

    pub fn schema(&self) -> &UserDataSchema {
        &self.schema
    }

    /// Set a field. Names absent from the schema are rejected and logged.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        if self.schema.field(name).is_none() {
            warn!(field = %name, "Ignoring value for field not declared by the flow");
            return false;
        }
        self.values.insert(name.to_string(), value);
        true
    }

    /// Merge values by field name (last write wins). Returns the names set.
    pub fn merge(&mut self, values: &Map<String, Value>) -> Vec<String> {
        let mut set = Vec::with_capacity(values.len());
        for (name, value) in values {
            if self.set(name, value.clone()) {
                set.push(name.clone());
            }
        }
        set
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_i64())
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Required fields that have not been collected yet.
    pub fn missing_required(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .filter(|f| f.required && !self.is_set(&f.name))
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Flattened view of the fields set so far.
    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone())
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}
