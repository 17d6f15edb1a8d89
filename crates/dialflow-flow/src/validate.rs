use std::collections::HashSet;

use dialflow_core::error::{DialflowError, Result};

use crate::model::{ActionTrigger, Flow, TriggerType};

impl Flow {
    /// Check the structural invariants of the graph.
    ///
    /// Every problem found is reported in a single `Load` error so authors can
    /// fix a flow file in one pass.
    pub fn validate(&self) -> Result<()> {
        let issues = self.structural_issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(DialflowError::Load(issues.join("; ")))
        }
    }

    /// List structural problems without failing.
    pub fn structural_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let mut node_ids = HashSet::new();
        for node in &self.nodes {
            if !node_ids.insert(node.id.as_str()) {
                issues.push(format!("duplicate node id '{}'", node.id));
            }
        }

        let mut action_ids = HashSet::new();
        for action in &self.actions {
            if !action_ids.insert(action.id.as_str()) {
                issues.push(format!("duplicate action id '{}'", action.id));
            }
        }

        if !node_ids.contains(self.initial_node.as_str()) {
            issues.push(format!(
                "initial node '{}' not found in flow",
                self.initial_node
            ));
        }

        let mut edge_ids = HashSet::new();
        for node in &self.nodes {
            check_triggers(
                &node.actions,
                &action_ids,
                &[TriggerType::OnEnter, TriggerType::OnExit],
                &format!("node '{}'", node.id),
                &mut issues,
            );

            for edge in &node.edges {
                if !edge_ids.insert(edge.id.as_str()) {
                    issues.push(format!(
                        "duplicate edge id '{}' (on node '{}')",
                        edge.id, node.id
                    ));
                }

                if let Some(target) = &edge.target_node_id {
                    if !node_ids.contains(target.as_str()) {
                        issues.push(format!(
                            "edge '{}' on node '{}' targets unknown node '{}'",
                            edge.id, node.id, target
                        ));
                    }
                }

                check_triggers(
                    &edge.actions,
                    &action_ids,
                    &[TriggerType::OnEnter, TriggerType::OnExit, TriggerType::OnEdge],
                    &format!("edge '{}'", edge.id),
                    &mut issues,
                );
            }
        }

        issues
    }
}

fn check_triggers(
    triggers: &[ActionTrigger],
    action_ids: &HashSet<&str>,
    allowed: &[TriggerType],
    owner: &str,
    issues: &mut Vec<String>,
) {
    for trigger in triggers {
        if !action_ids.contains(trigger.action_id.as_str()) {
            issues.push(format!(
                "{} references unknown action '{}'",
                owner, trigger.action_id
            ));
        }
        if !allowed.contains(&trigger.trigger_type) {
            issues.push(format!(
                "{} uses trigger '{}' which is not valid there",
                owner, trigger.trigger_type
            ));
        }
    }
}
