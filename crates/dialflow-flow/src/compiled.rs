use std::sync::Arc;

use dialflow_core::error::Result;

use crate::model::{Flow, Node};
use crate::schema::{UserData, UserDataSchema};

/// A validated flow together with its synthesized user-data schema.
///
/// The schema cannot change after load, so it is computed here once and shared
/// by every controller and session built from this flow.
#[derive(Debug, Clone)]
pub struct CompiledFlow {
    flow: Flow,
    schema: Arc<UserDataSchema>,
}

impl CompiledFlow {
    pub fn new(flow: Flow) -> Result<Self> {
        flow.validate()?;
        let schema = Arc::new(UserDataSchema::synthesize(&flow));
        Ok(Self { flow, schema })
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    pub fn schema(&self) -> &Arc<UserDataSchema> {
        &self.schema
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.flow.node(id)
    }

    /// Fresh, empty user-data record for a new session.
    pub fn new_user_data(&self) -> UserData {
        UserData::new(Arc::clone(&self.schema))
    }
}
