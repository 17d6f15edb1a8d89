//! Runtime side of a flow: per-node controllers and the session driver.
//!
//! A [`FlowController`] exposes the current node's edges as tools and reacts
//! to tool calls. A [`FlowSession`] owns the active controller and swaps in
//! the next one on every transition.

pub mod controller;
pub mod session;
pub mod tools;

pub use controller::{EnterOutcome, FlowController, Invocation, SharedState};
pub use session::FlowSession;
pub use tools::{edge_input_schema, FlowTool};
