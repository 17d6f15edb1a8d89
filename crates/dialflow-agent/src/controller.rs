use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use dialflow_actions::ActionExecutor;
use dialflow_core::error::{DialflowError, Result};
use dialflow_core::event::EventBus;
use dialflow_core::traits::FlowHost;
use dialflow_core::types::{ChatHistory, FlowEvent, ToolDefinition};
use dialflow_flow::{CompiledFlow, Node, TriggerType, UserData};

use crate::tools::FlowTool;

/// Session-scoped mutable state threaded through every controller call.
///
/// The user-data record is created lazily by the first data-collection tool.
#[derive(Debug, Default)]
pub struct SharedState {
    pub userdata: Option<UserData>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn userdata(&self) -> Option<&UserData> {
        self.userdata.as_ref()
    }
}

/// Result of invoking a tool.
pub enum Invocation {
    /// The edge has no target; the current node stays active.
    Stayed,
    /// Control moved to a new node. The host must swap in this controller
    /// and call [`FlowController::on_enter`] on it.
    Transitioned(Box<FlowController>),
}

/// What happened when a node was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    /// The node spoke and is waiting for the next tool call.
    Continue,
    /// The node was final; speech finished and the host session was ended.
    Ended,
}

/// Controller for one node of a running flow.
///
/// A controller is built per node and thrown away on transition. The chat
/// history and the action executor are handed to the next controller, so
/// stored action results survive for the whole session.
pub struct FlowController {
    flow: Arc<CompiledFlow>,
    node: Node,
    tools: Vec<FlowTool>,
    history: ChatHistory,
    executor: Arc<ActionExecutor>,
    events: Option<Arc<EventBus>>,
}

impl FlowController {
    /// Build a controller for `current_node`, or for the flow's initial node.
    ///
    /// Without an executor a fresh one is created from the flow's action
    /// catalog and environment.
    pub fn new(
        flow: Arc<CompiledFlow>,
        current_node: Option<&str>,
        history: ChatHistory,
        executor: Option<Arc<ActionExecutor>>,
    ) -> Result<Self> {
        let node = match current_node {
            Some(id) => flow
                .node(id)
                .ok_or_else(|| DialflowError::Config(format!("node '{}' not found in flow", id)))?,
            None => flow.flow().initial().ok_or_else(|| {
                DialflowError::Config(format!(
                    "initial node '{}' not found in flow",
                    flow.flow().initial_node
                ))
            })?,
        }
        .clone();

        let tools = node.edges.iter().map(FlowTool::from_edge).collect();
        let executor = executor.unwrap_or_else(|| {
            Arc::new(ActionExecutor::new(
                &flow.flow().actions,
                flow.flow().environment_variables.clone(),
            ))
        });

        debug!(node_id = %node.id, tools = node.edges.len(), "Controller created");

        Ok(Self {
            flow,
            node,
            tools,
            history,
            executor,
            events: None,
        })
    }

    /// Publish flow events on `bus`. Carried over to later controllers.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn node_id(&self) -> &str {
        &self.node.id
    }

    pub fn flow(&self) -> &Arc<CompiledFlow> {
        &self.flow
    }

    /// Standing instructions for the host's language model.
    pub fn system_prompt(&self) -> &str {
        &self.flow.flow().system_prompt
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn executor(&self) -> &Arc<ActionExecutor> {
        &self.executor
    }

    /// Tools exposed on this node, one per outgoing edge.
    pub fn tools(&self) -> &[FlowTool] {
        &self.tools
    }

    pub fn tool(&self, name: &str) -> Option<&FlowTool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(FlowTool::definition).collect()
    }

    /// Handle a tool call from the host.
    ///
    /// Data-collection tools check their arguments (mismatches are logged,
    /// not rejected), merge the declared fields into the user data, then fire
    /// the edge's `on_edge` actions. Plain tools never touch user data.
    pub async fn invoke(
        &self,
        state: &mut SharedState,
        name: &str,
        args: Value,
    ) -> Result<Invocation> {
        let tool = self
            .tool(name)
            .ok_or_else(|| DialflowError::ToolNotFound(name.to_string()))?;

        info!(node_id = %self.node.id, tool = %name, "Tool invoked");

        if tool.collects_data() {
            if let Err(errors) = tool.check_arguments(&args) {
                warn!(
                    edge_id = %name,
                    errors = %errors.join("; "),
                    "Data collection arguments do not match the edge schema"
                );
            }

            let values = tool.collected_values(&args);
            let userdata = state
                .userdata
                .get_or_insert_with(|| self.flow.new_user_data());
            let fields = userdata.merge(&values);
            debug!(edge_id = %name, fields = ?fields, "User data updated");
            self.publish(FlowEvent::DataCollected {
                edge_id: name.to_string(),
                fields,
            });
        }

        let on_edge = tool.edge().triggered(TriggerType::OnEdge);
        self.fire(TriggerType::OnEdge, &on_edge, state.userdata.as_ref())
            .await?;

        match tool.target() {
            Some(target) => self.transition_to(state, name, target).await,
            None => {
                debug!(node_id = %self.node.id, edge_id = %name, "Edge has no target, staying");
                Ok(Invocation::Stayed)
            }
        }
    }

    /// Leave this node for `target` via `edge_id`.
    ///
    /// Fires this node's `on_exit` actions together with the edge's own
    /// `on_exit` actions, then the edge's `on_enter` actions, and waits for
    /// all of them before building the next controller.
    pub async fn transition_to(
        &self,
        state: &mut SharedState,
        edge_id: &str,
        target: &str,
    ) -> Result<Invocation> {
        if self.flow.node(target).is_none() {
            return Err(DialflowError::Config(format!(
                "target node '{}' not found in flow",
                target
            )));
        }

        info!(from = %self.node.id, to = %target, edge_id = %edge_id, "Transitioning");
        self.publish(FlowEvent::NodeExited {
            node_id: self.node.id.clone(),
            edge_id: edge_id.to_string(),
        });

        let edge = self.node.edge(edge_id);
        let mut on_exit = self.node.triggered(TriggerType::OnExit);
        if let Some(edge) = edge {
            on_exit.extend(edge.triggered(TriggerType::OnExit));
        }
        self.fire(TriggerType::OnExit, &on_exit, state.userdata.as_ref())
            .await?;

        // Edge-level on_enter runs ahead of the target's own on_enter.
        if let Some(edge) = edge {
            let on_enter = edge.triggered(TriggerType::OnEnter);
            self.fire(TriggerType::OnEnter, &on_enter, state.userdata.as_ref())
                .await?;
        }

        let mut next = FlowController::new(
            Arc::clone(&self.flow),
            Some(target),
            self.history.clone(),
            Some(Arc::clone(&self.executor)),
        )?;
        if let Some(bus) = &self.events {
            next = next.with_events(Arc::clone(bus));
        }
        Ok(Invocation::Transitioned(Box::new(next)))
    }

    /// Run the node's entry behaviour.
    ///
    /// `on_enter` actions complete before anything is said, so the node's
    /// text can reference their results. `instruction` wins over
    /// `static_text`. On a final node the session is ended only once the
    /// speech has finished playing.
    pub async fn on_enter(
        &self,
        state: &mut SharedState,
        host: &dyn FlowHost,
    ) -> Result<EnterOutcome> {
        info!(node_id = %self.node.id, "Entering node");
        self.publish(FlowEvent::NodeEntered {
            node_id: self.node.id.clone(),
        });

        let on_enter = self.node.triggered(TriggerType::OnEnter);
        self.fire(TriggerType::OnEnter, &on_enter, state.userdata.as_ref())
            .await?;

        let speech = if let Some(instruction) = &self.node.instruction {
            Some(host.generate_reply(self.render(state, instruction)))
        } else {
            self.node
                .static_text
                .as_ref()
                .map(|text| host.say(self.render(state, text)))
        };

        if !self.node.is_final {
            return Ok(EnterOutcome::Continue);
        }

        if let Some(handle) = speech {
            handle.wait().await;
        }
        info!(node_id = %self.node.id, "Final node reached, ending session");
        host.end_session().await?;
        Ok(EnterOutcome::Ended)
    }

    /// Render a template against the session's current data.
    pub fn render(&self, state: &SharedState, template: &str) -> String {
        let context = self.executor.template_context(state.userdata.as_ref());
        self.executor.renderer().render(template, &context)
    }

    async fn fire(
        &self,
        trigger: TriggerType,
        action_ids: &[String],
        userdata: Option<&UserData>,
    ) -> Result<()> {
        if action_ids.is_empty() {
            return Ok(());
        }
        info!(
            node_id = %self.node.id,
            trigger = %trigger,
            count = action_ids.len(),
            "Executing triggered actions"
        );

        let _transport = self.executor.acquire()?;
        for (action_id, record) in self.executor.execute_all(action_ids, userdata).await {
            self.publish(FlowEvent::ActionCompleted {
                action_id,
                status: record.status,
                success: record.success,
            });
        }
        Ok(())
    }

    fn publish(&self, event: FlowEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}
