use serde_json::{json, Map, Value};

use dialflow_core::types::ToolDefinition;
use dialflow_flow::Edge;

/// A callable tool derived from one outgoing edge of the current node.
///
/// The tool name is the edge id and its description is the edge condition.
/// Edges that collect data take one argument per declared field; all other
/// edges take no arguments.
#[derive(Debug, Clone)]
pub struct FlowTool {
    edge: Edge,
    input_schema: Value,
}

impl FlowTool {
    pub fn from_edge(edge: &Edge) -> Self {
        Self {
            input_schema: edge_input_schema(edge),
            edge: edge.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.edge.id
    }

    pub fn description(&self) -> &str {
        &self.edge.condition
    }

    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    pub fn edge(&self) -> &Edge {
        &self.edge
    }

    pub fn collects_data(&self) -> bool {
        self.edge.collects_data()
    }

    pub fn target(&self) -> Option<&str> {
        self.edge.target_node_id.as_deref()
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Check call arguments against the tool's parameter schema.
    pub fn check_arguments(&self, args: &Value) -> Result<(), Vec<String>> {
        let validator = jsonschema::validator_for(&self.input_schema)
            .map_err(|e| vec![format!("invalid schema: {}", e)])?;
        let errors: Vec<String> = validator
            .iter_errors(args)
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The declared fields picked out of `args`. Undeclared keys are dropped.
    pub fn collected_values(&self, args: &Value) -> Map<String, Value> {
        let Some(object) = args.as_object() else {
            return Map::new();
        };
        self.edge
            .collect_data
            .iter()
            .filter_map(|f| object.get(&f.name).map(|v| (f.name.clone(), v.clone())))
            .collect()
    }
}

/// Parameter schema for an edge.
///
/// Every declared field is listed as required regardless of its `required`
/// flag, since the model must supply each one when it calls the tool.
pub fn edge_input_schema(edge: &Edge) -> Value {
    if !edge.collects_data() {
        return json!({"type": "object", "properties": {}});
    }

    let mut properties = Map::new();
    let mut required = Vec::with_capacity(edge.collect_data.len());
    for field in &edge.collect_data {
        properties.insert(
            field.name.clone(),
            json!({
                "type": field.field_type.json_type(),
                "description": field.description,
            }),
        );
        required.push(Value::String(field.name.clone()));
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}
