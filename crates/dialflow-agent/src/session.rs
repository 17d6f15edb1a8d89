use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use dialflow_actions::{ActionExecutor, ActionResultStore, TransportGuard};
use dialflow_core::error::{DialflowError, Result};
use dialflow_core::event::EventBus;
use dialflow_core::traits::FlowHost;
use dialflow_core::types::{ChatHistory, FlowEvent, SessionId, ToolDefinition};
use dialflow_flow::{CompiledFlow, UserData};

use crate::controller::{EnterOutcome, FlowController, Invocation, SharedState};
use crate::tools::FlowTool;

/// Drives one conversation through a flow on behalf of a host.
///
/// Holds the active node controller and the session state, swaps controllers
/// on transition and enters each new node. The HTTP transport stays open from
/// [`start`](Self::start) until the session ends or is dropped.
pub struct FlowSession {
    id: SessionId,
    controller: FlowController,
    state: SharedState,
    host: Arc<dyn FlowHost>,
    events: Arc<EventBus>,
    transport: Option<TransportGuard>,
    started: bool,
    finished: bool,
}

impl FlowSession {
    /// New session at the flow's initial node with a fresh history and executor.
    pub fn new(flow: Arc<CompiledFlow>, host: Arc<dyn FlowHost>) -> Result<Self> {
        Self::with_parts(flow, host, None, ChatHistory::new())
    }

    /// New session reusing a host-owned history and, optionally, a
    /// preconfigured executor.
    pub fn with_parts(
        flow: Arc<CompiledFlow>,
        host: Arc<dyn FlowHost>,
        executor: Option<Arc<ActionExecutor>>,
        history: ChatHistory,
    ) -> Result<Self> {
        let events = Arc::new(EventBus::default());
        let controller =
            FlowController::new(flow, None, history, executor)?.with_events(Arc::clone(&events));
        Ok(Self {
            id: SessionId::new(),
            controller,
            state: SharedState::new(),
            host,
            events,
            transport: None,
            started: false,
            finished: false,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    /// Open the transport and enter the initial node.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            warn!(session_id = %self.id, "Session already started");
            return Ok(());
        }
        self.started = true;
        self.transport = Some(self.controller.executor().acquire()?);

        info!(session_id = %self.id, node_id = %self.controller.node_id(), "Session started");
        self.events.publish(FlowEvent::SessionStarted {
            session_id: self.id.clone(),
            node_id: self.controller.node_id().to_string(),
        });
        self.enter().await
    }

    /// Dispatch a tool call from the host.
    ///
    /// On transition the new node becomes current and is entered before this
    /// returns.
    pub async fn invoke(&mut self, name: &str, args: Value) -> Result<()> {
        if self.finished {
            return Err(DialflowError::SessionEnded);
        }
        if !self.started {
            return Err(DialflowError::SessionNotStarted);
        }

        match self.controller.invoke(&mut self.state, name, args).await? {
            Invocation::Stayed => Ok(()),
            Invocation::Transitioned(next) => {
                self.controller = *next;
                self.enter().await
            }
        }
    }

    async fn enter(&mut self) -> Result<()> {
        let outcome = self
            .controller
            .on_enter(&mut self.state, self.host.as_ref())
            .await?;
        if outcome == EnterOutcome::Ended {
            self.finish();
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.finished = true;
        self.transport = None;
        info!(session_id = %self.id, node_id = %self.controller.node_id(), "Session ended");
        self.events.publish(FlowEvent::SessionEnded {
            session_id: self.id.clone(),
            node_id: self.controller.node_id().to_string(),
        });
    }

    pub fn current_node(&self) -> &str {
        self.controller.node_id()
    }

    pub fn controller(&self) -> &FlowController {
        &self.controller
    }

    /// Tools the host may call right now.
    pub fn tools(&self) -> &[FlowTool] {
        if self.finished {
            return &[];
        }
        self.controller.tools()
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools().iter().map(FlowTool::definition).collect()
    }

    pub fn userdata(&self) -> Option<&UserData> {
        self.state.userdata()
    }

    /// Mutable access for the host, creating an empty record if needed.
    pub fn userdata_mut(&mut self) -> &mut UserData {
        let flow = self.controller.flow();
        self.state
            .userdata
            .get_or_insert_with(|| flow.new_user_data())
    }

    pub fn action_results(&self) -> ActionResultStore {
        self.controller.executor().results()
    }

    pub fn history(&self) -> &ChatHistory {
        self.controller.history()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
