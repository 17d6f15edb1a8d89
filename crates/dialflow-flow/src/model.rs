use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Type of a collected data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
}

impl FieldType {
    /// JSON Schema type keyword for this field type.
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Whether a JSON value is acceptable for this type.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event an action is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// On a node: fired when it becomes current. On an edge: fired when the
    /// edge's target is entered, before the target's own `on_enter` actions.
    OnEnter,
    /// On a node: fired when it is left through one of its edges. On an
    /// edge: fired together with the leaving node's `on_exit` actions.
    OnExit,
    /// Edges only: fired when the edge is invoked, whether or not it moves.
    OnEdge,
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OnEnter => "on_enter",
            Self::OnExit => "on_exit",
            Self::OnEdge => "on_edge",
        };
        f.write_str(s)
    }
}

/// One piece of information to elicit from the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl DataField {
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            description: description.into(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Reusable templated HTTP side effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub method: HttpMethod,
    /// URL template.
    pub url: String,
    /// Header templates.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_template: Option<String>,
    /// Request deadline in seconds.
    #[serde(default = "default_action_timeout")]
    pub timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_response_as: Option<String>,
}

fn default_action_timeout() -> u64 {
    30
}

impl ActionDef {
    pub fn new(id: impl Into<String>, method: HttpMethod, url: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            method,
            url: url.into(),
            headers: HashMap::new(),
            body_template: None,
            timeout: default_action_timeout(),
            store_response_as: None,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, template: impl Into<String>) -> Self {
        self.body_template = Some(template.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = secs;
        self
    }

    pub fn store_as(mut self, key: impl Into<String>) -> Self {
        self.store_response_as = Some(key.into());
        self
    }
}

/// Binds a declared action to a lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionTrigger {
    pub trigger_type: TriggerType,
    pub action_id: String,
}

impl ActionTrigger {
    pub fn on_enter(action_id: impl Into<String>) -> Self {
        Self {
            trigger_type: TriggerType::OnEnter,
            action_id: action_id.into(),
        }
    }

    pub fn on_exit(action_id: impl Into<String>) -> Self {
        Self {
            trigger_type: TriggerType::OnExit,
            action_id: action_id.into(),
        }
    }

    pub fn on_edge(action_id: impl Into<String>) -> Self {
        Self {
            trigger_type: TriggerType::OnEdge,
            action_id: action_id.into(),
        }
    }
}

/// An allowed transition out of a node, exposed to the host as a callable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Natural-language description; becomes the tool description.
    pub condition: String,
    /// Unique across the flow; becomes the tool name.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collect_data: Vec<DataField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionTrigger>,
}

impl Edge {
    /// Create an edge that moves to `target`.
    pub fn to(id: impl Into<String>, condition: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            id: id.into(),
            target_node_id: Some(target.into()),
            collect_data: vec![],
            actions: vec![],
        }
    }

    /// Create an edge with no target.
    pub fn stay(id: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            id: id.into(),
            target_node_id: None,
            collect_data: vec![],
            actions: vec![],
        }
    }

    pub fn collecting(mut self, field: DataField) -> Self {
        self.collect_data.push(field);
        self
    }

    pub fn with_trigger(mut self, trigger: ActionTrigger) -> Self {
        self.actions.push(trigger);
        self
    }

    pub fn collects_data(&self) -> bool {
        !self.collect_data.is_empty()
    }

    /// Action ids bound to the given trigger type, in declaration order.
    pub fn triggered(&self, trigger: TriggerType) -> Vec<String> {
        triggered_ids(&self.actions, trigger)
    }
}

/// A conversational state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    /// Template seeding a generated reply. Wins over `static_text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    /// Template spoken verbatim after rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_text: Option<String>,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub actions: Vec<ActionTrigger>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            instruction: None,
            static_text: None,
            is_final: false,
            edges: vec![],
            actions: vec![],
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn with_static_text(mut self, text: impl Into<String>) -> Self {
        self.static_text = Some(text.into());
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn with_trigger(mut self, trigger: ActionTrigger) -> Self {
        self.actions.push(trigger);
        self
    }

    pub fn final_node(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Action ids bound to the given trigger type, in declaration order.
    pub fn triggered(&self, trigger: TriggerType) -> Vec<String> {
        triggered_ids(&self.actions, trigger)
    }
}

fn triggered_ids(triggers: &[ActionTrigger], trigger: TriggerType) -> Vec<String> {
    triggers
        .iter()
        .filter(|t| t.trigger_type == trigger)
        .map(|t| t.action_id.clone())
        .collect()
}

/// A complete conversation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub system_prompt: String,
    pub initial_node: String,
    pub nodes: Vec<Node>,
    /// Global action catalog.
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default)]
    pub environment_variables: HashMap<String, String>,
}

impl Flow {
    pub fn new(system_prompt: impl Into<String>, initial_node: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            initial_node: initial_node.into(),
            nodes: vec![],
            actions: vec![],
            environment_variables: HashMap::new(),
        }
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_action(mut self, action: ActionDef) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_variables.insert(key.into(), value.into());
        self
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn action(&self, id: &str) -> Option<&ActionDef> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn initial(&self) -> Option<&Node> {
        self.node(&self.initial_node)
    }
}
