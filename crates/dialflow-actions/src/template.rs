//! Fail-soft template rendering via minijinja.
//!
//! Templates see three namespaces: `env` (flow environment variables),
//! `actions` (stored action results keyed by `store_response_as`) and
//! `userdata` (fields collected so far). Unset values render as empty text,
//! and attribute access on them chains instead of failing.

use std::collections::HashMap;

use minijinja::{Environment, UndefinedBehavior};
use serde_json::{Map, Value};
use tracing::warn;

use dialflow_core::error::{DialflowError, Result};
use dialflow_flow::UserData;

pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        Self { env }
    }

    /// Render `template`, reporting syntax and evaluation errors.
    pub fn try_render(&self, template: &str, context: &TemplateContext) -> Result<String> {
        self.env
            .render_str(template, &context.values)
            .map_err(|e| DialflowError::Template(e.to_string()))
    }

    /// Render `template`, falling back to the literal text on any error.
    pub fn render(&self, template: &str, context: &TemplateContext) -> String {
        match self.try_render(template, context) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(error = %e, "Template rendering failed, using literal text");
                template.to_string()
            }
        }
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only values exposed to a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    values: Map<String, Value>,
}

impl TemplateContext {
    /// Assemble the `env`, `actions` and `userdata` namespaces.
    pub fn build(
        userdata: Option<&UserData>,
        environment: &HashMap<String, String>,
        action_results: Value,
    ) -> Self {
        let env: Map<String, Value> = environment
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        let mut values = Map::new();
        values.insert("env".into(), Value::Object(env));
        values.insert("actions".into(), action_results);
        values.insert(
            "userdata".into(),
            userdata
                .map(UserData::to_json)
                .unwrap_or_else(|| Value::Object(Map::new())),
        );
        Self { values }
    }

    /// Add a custom top-level value (overrides a namespace of the same name).
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}
