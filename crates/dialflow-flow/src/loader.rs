use std::path::Path;

use dialflow_core::error::{DialflowError, Result};

use crate::model::Flow;

impl Flow {
    /// Parse and validate a flow from a YAML string.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let flow: Flow = serde_yaml::from_str(content)
            .map_err(|e| DialflowError::Load(format!("invalid YAML content: {}", e)))?;
        flow.validate()?;
        Ok(flow)
    }

    /// Parse and validate a flow from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let flow: Flow = serde_json::from_str(content)
            .map_err(|e| DialflowError::Load(format!("invalid JSON content: {}", e)))?;
        flow.validate()?;
        Ok(flow)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = read_flow_file(path)?;
        Self::from_yaml_str(&content).map_err(|e| in_file(path, e))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = read_flow_file(path)?;
        Self::from_json_str(&content).map_err(|e| in_file(path, e))
    }

    /// Load a flow, picking the format from the file extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DialflowError::FlowNotFound(path.display().to_string()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            other => Err(DialflowError::Load(format!(
                "unsupported file extension '{}' for {}; supported formats: .yaml, .yml, .json",
                other,
                path.display()
            ))),
        }
    }
}

fn read_flow_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DialflowError::FlowNotFound(path.display().to_string()),
        _ => DialflowError::Io(e),
    })
}

fn in_file(path: &Path, err: DialflowError) -> DialflowError {
    match err {
        DialflowError::Load(msg) => DialflowError::Load(format!("{}: {}", path.display(), msg)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML_FLOW: &str = r#"
system_prompt: "You take restaurant reservations."
initial_node: welcome
nodes:
  - id: welcome
    name: Welcome
    static_text: "Hi! What's your name?"
    edges:
      - id: collect_name
        condition: "Customer provided their name"
        target_node_id: done
        collect_data:
          - name: customer_name
            type: string
            description: "The customer's full name"
            required: true
  - id: done
    name: Done
    static_text: "All set, {{ userdata.customer_name }}!"
    is_final: true
"#;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp file");
        tmp.write_all(content.as_bytes()).expect("write flow");
        tmp
    }

    #[test]
    fn test_yaml_string() {
        let flow = Flow::from_yaml_str(YAML_FLOW).unwrap();
        assert_eq!(flow.initial_node, "welcome");
        assert_eq!(flow.nodes.len(), 2);
        assert!(flow.node("done").unwrap().is_final);
    }

    #[test]
    fn test_json_matches_yaml() {
        let from_yaml = Flow::from_yaml_str(YAML_FLOW).unwrap();
        let json = serde_json::to_string(&from_yaml).unwrap();
        let from_json = Flow::from_json_str(&json).unwrap();
        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn test_malformed_yaml() {
        let err = Flow::from_yaml_str("nodes: [unclosed").unwrap_err();
        assert!(matches!(err, DialflowError::Load(_)));
        assert!(err.to_string().contains("invalid YAML"));
    }

    #[test]
    fn test_schema_mismatch() {
        let err = Flow::from_json_str(r#"{"system_prompt": "x", "nodes": []}"#).unwrap_err();
        assert!(err.to_string().contains("initial_node"));
    }

    #[test]
    fn test_validation_runs_on_load() {
        let yaml = YAML_FLOW.replace("initial_node: welcome", "initial_node: nowhere");
        let err = Flow::from_yaml_str(&yaml).unwrap_err();
        assert!(err.to_string().contains("initial node 'nowhere' not found"));
    }

    #[test]
    fn test_edge_lifecycle_triggers_load() {
        let yaml = r#"
system_prompt: "Log every move."
initial_node: a
actions:
  - id: log
    name: Log
    method: POST
    url: "https://example.com/log"
nodes:
  - id: a
    name: A
    edges:
      - id: go
        condition: "Customer is ready"
        target_node_id: b
        actions:
          - trigger_type: on_exit
            action_id: log
          - trigger_type: on_enter
            action_id: log
  - id: b
    name: B
    is_final: true
"#;
        let flow = Flow::from_yaml_str(yaml).unwrap();
        let edge = flow.node("a").unwrap().edge("go").unwrap();
        assert_eq!(edge.triggered(crate::model::TriggerType::OnExit), vec!["log"]);
        assert_eq!(edge.triggered(crate::model::TriggerType::OnEnter), vec!["log"]);
    }

    #[test]
    fn test_from_file_dispatches_on_extension() {
        let yaml = write_temp(".yaml", YAML_FLOW);
        assert_eq!(Flow::from_file(yaml.path()).unwrap().nodes.len(), 2);

        let flow = Flow::from_yaml_str(YAML_FLOW).unwrap();
        let json = write_temp(".json", &serde_json::to_string_pretty(&flow).unwrap());
        assert_eq!(Flow::from_file(json.path()).unwrap(), flow);
    }

    #[test]
    fn test_from_file_unsupported_extension() {
        let txt = write_temp(".txt", YAML_FLOW);
        let err = Flow::from_file(txt.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported file extension 'txt'"));
    }

    #[test]
    fn test_from_file_missing() {
        let err = Flow::from_file(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, DialflowError::FlowNotFound(_)));
    }

    #[test]
    fn test_file_errors_name_the_path() {
        let bad = write_temp(".yml", "system_prompt: [");
        let err = Flow::from_file(bad.path()).unwrap_err().to_string();
        assert!(err.contains(&bad.path().display().to_string()));
    }
}
