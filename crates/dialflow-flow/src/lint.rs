//! Non-fatal authoring checks.
//!
//! A flow that passes [`Flow::validate`] can still be awkward to run: nodes no
//! edge ever reaches, dead ends that are not final, tool names a model API will
//! reject. Lint findings are advisory and never block loading.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::OnceLock;

use regex::Regex;

use crate::model::{DataField, Flow};

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LintFinding {
    pub severity: Severity,
    pub check: &'static str,
    pub message: String,
}

impl LintFinding {
    fn warning(check: &'static str, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            check,
            message,
        }
    }

    fn info(check: &'static str, message: String) -> Self {
        Self {
            severity: Severity::Info,
            check,
            message,
        }
    }
}

fn tool_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").expect("valid tool name regex"))
}

/// Run every lint check over a flow.
pub fn lint(flow: &Flow) -> Vec<LintFinding> {
    let mut findings = Vec::new();
    findings.extend(unreachable_nodes(flow));
    findings.extend(dead_ends(flow));
    findings.extend(tool_names(flow));
    findings.extend(unused_actions(flow));
    findings.extend(field_conflicts(flow));
    findings
}

fn unreachable_nodes(flow: &Flow) -> Vec<LintFinding> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    if flow.initial().is_some() {
        queue.push_back(flow.initial_node.as_str());
    }

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(node) = flow.node(id) {
            for target in node.edges.iter().filter_map(|e| e.target_node_id.as_deref()) {
                queue.push_back(target);
            }
        }
    }

    flow.nodes
        .iter()
        .filter(|n| !seen.contains(n.id.as_str()))
        .map(|n| {
            LintFinding::warning(
                "unreachable",
                format!("node '{}' cannot be reached from '{}'", n.id, flow.initial_node),
            )
        })
        .collect()
}

fn dead_ends(flow: &Flow) -> Vec<LintFinding> {
    flow.nodes
        .iter()
        .filter(|n| !n.is_final && n.edges.is_empty())
        .map(|n| {
            LintFinding::warning(
                "dead_end",
                format!("node '{}' has no edges and is not final", n.id),
            )
        })
        .collect()
}

fn tool_names(flow: &Flow) -> Vec<LintFinding> {
    flow.nodes
        .iter()
        .flat_map(|n| n.edges.iter())
        .filter(|e| !tool_name_pattern().is_match(&e.id))
        .map(|e| {
            LintFinding::warning(
                "tool_name",
                format!(
                    "edge id '{}' is not a valid tool name (letters, digits, '_' or '-', max 64)",
                    e.id
                ),
            )
        })
        .collect()
}

fn unused_actions(flow: &Flow) -> Vec<LintFinding> {
    let referenced: HashSet<&str> = flow
        .nodes
        .iter()
        .flat_map(|n| {
            n.actions
                .iter()
                .chain(n.edges.iter().flat_map(|e| e.actions.iter()))
        })
        .map(|t| t.action_id.as_str())
        .collect();

    flow.actions
        .iter()
        .filter(|a| !referenced.contains(a.id.as_str()))
        .map(|a| LintFinding::info("unused_action", format!("action '{}' is never triggered", a.id)))
        .collect()
}

fn field_conflicts(flow: &Flow) -> Vec<LintFinding> {
    let mut first: HashMap<&str, (&str, &DataField)> = HashMap::new();
    let mut findings = Vec::new();

    for edge in flow.nodes.iter().flat_map(|n| n.edges.iter()) {
        for field in &edge.collect_data {
            match first.get(field.name.as_str()) {
                None => {
                    first.insert(field.name.as_str(), (edge.id.as_str(), field));
                }
                Some((first_edge, original)) if *original != field => {
                    findings.push(LintFinding::warning(
                        "field_conflict",
                        format!(
                            "field '{}' on edge '{}' differs from its first declaration on edge '{}'; the first one is used",
                            field.name, edge.id, first_edge
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    fn checks(findings: &[LintFinding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.check).collect()
    }

    #[test]
    fn test_clean_flow() {
        let flow = Flow::new("Clean", "a")
            .with_node(Node::new("a", "A").with_edge(Edge::to("a_to_b", "go", "b")))
            .with_node(Node::new("b", "B").final_node());
        assert!(lint(&flow).is_empty());
    }

    #[test]
    fn test_unreachable_and_dead_end() {
        let flow = Flow::new("Lint", "a")
            .with_node(Node::new("a", "A").with_edge(Edge::to("a_to_b", "go", "b")))
            .with_node(Node::new("b", "B"))
            .with_node(Node::new("orphan", "Orphan").final_node());
        let findings = lint(&flow);
        assert_eq!(checks(&findings), vec!["unreachable", "dead_end"]);
        assert!(findings[0].message.contains("'orphan'"));
        assert!(findings[1].message.contains("'b'"));
    }

    #[test]
    fn test_bad_tool_name() {
        let flow = Flow::new("Lint", "a")
            .with_node(Node::new("a", "A").with_edge(Edge::to("go to b!", "go", "b")))
            .with_node(Node::new("b", "B").final_node());
        assert_eq!(checks(&lint(&flow)), vec!["tool_name"]);
    }

    #[test]
    fn test_unused_action_and_field_conflict() {
        let flow = Flow::new("Lint", "a")
            .with_action(ActionDef::new("ping", HttpMethod::Get, "https://example.com"))
            .with_node(
                Node::new("a", "A").with_edge(
                    Edge::to("a_to_b", "go", "b")
                        .collecting(DataField::new("age", FieldType::Integer, "Age")),
                ),
            )
            .with_node(
                Node::new("b", "B").final_node().with_edge(
                    Edge::stay("b_again", "again")
                        .collecting(DataField::new("age", FieldType::String, "Age")),
                ),
            );
        let findings = lint(&flow);
        assert_eq!(checks(&findings), vec!["unused_action", "field_conflict"]);
        assert_eq!(findings[0].severity, Severity::Info);
    }
}
