//! Flow graph model.
//!
//! A flow is a directed graph of [`Node`]s (conversational states) joined by
//! [`Edge`]s (transitions the model may invoke). Edges may collect typed
//! [`DataField`]s; nodes and edges may trigger HTTP [`ActionDef`]s.
//!
//! Flows are plain data. [`CompiledFlow`] validates one and synthesizes the
//! [`UserDataSchema`] shared by every session that runs it.

pub mod compiled;
pub mod lint;
pub mod loader;
pub mod model;
pub mod schema;
pub mod validate;

pub use compiled::CompiledFlow;
pub use lint::{lint, LintFinding, Severity};
pub use model::{
    ActionDef, ActionTrigger, DataField, Edge, FieldType, Flow, HttpMethod, Node, TriggerType,
};
pub use schema::{SchemaField, UserData, UserDataSchema};
