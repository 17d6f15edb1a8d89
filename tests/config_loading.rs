use std::io::Write;
use std::sync::Arc;

use dialflow_actions::ActionExecutor;
use dialflow_core::config::AppConfig;
use dialflow_core::error::DialflowError;
use dialflow_flow::{CompiledFlow, Flow};
use dialflow_test_utils::{write_temp_file, RESERVATION_YAML};

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[flow]
path = "flows/reservation.yaml"

[http]
user_agent = "bella-vista/1.0"
connect_timeout_secs = 3
pool_idle_timeout_secs = 15

[environment]
api_token = "from-config"
region = "eu"

[log]
filter = "dialflow=debug"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.http.user_agent, "bella-vista/1.0");
    assert_eq!(config.http.connect_timeout_secs, 3);
    assert_eq!(config.http.pool_idle_timeout_secs, 15);
    assert_eq!(config.environment.get("region").map(String::as_str), Some("eu"));
    assert_eq!(config.log.filter, "dialflow=debug");
    assert!(config
        .flow_path(tmp.path())
        .unwrap()
        .ends_with("flows/reservation.yaml"));
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("DIALFLOW_TEST_API_TOKEN", "expanded-token");

    let toml_content = r#"
[environment]
api_token = "${DIALFLOW_TEST_API_TOKEN}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(
        config.environment.get("api_token").map(String::as_str),
        Some("expanded-token")
    );

    std::env::remove_var("DIALFLOW_TEST_API_TOKEN");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"").expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert!(config.flow.path.is_none());
    assert_eq!(config.http.connect_timeout_secs, 10);
    assert_eq!(config.log.filter, "dialflow=info,warn");
}

#[test]
fn test_missing_and_malformed_config() {
    let err = AppConfig::load(std::path::Path::new("/no/such/dialflow.toml")).unwrap_err();
    assert!(matches!(err, DialflowError::ConfigNotFound(_)));

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[http\nuser_agent = 1").expect("write toml");
    let err = AppConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(err, DialflowError::AppConfig(_)));
}

#[test]
fn test_flow_from_config_directory() {
    let dir = tempfile::tempdir().expect("create temp dir");
    std::fs::create_dir(dir.path().join("flows")).unwrap();
    std::fs::write(dir.path().join("flows/reservation.yaml"), RESERVATION_YAML).unwrap();

    let config_path = dir.path().join("dialflow.toml");
    std::fs::write(&config_path, "[flow]\npath = \"flows/reservation.yaml\"\n").unwrap();

    let config = AppConfig::load(&config_path).unwrap();
    let flow = Flow::from_file(&config.flow_path(&config_path).unwrap()).unwrap();
    let compiled = CompiledFlow::new(flow).unwrap();

    let names: Vec<&str> = compiled.schema().fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["customer_name", "party_size"]);
}

#[test]
fn test_yaml_and_json_files_load_the_same_flow() {
    let yaml = write_temp_file(".yml", RESERVATION_YAML);
    let from_yaml = Flow::from_file(yaml.path()).unwrap();

    let json = write_temp_file(".json", &serde_json::to_string(&from_yaml).unwrap());
    let from_json = Flow::from_file(json.path()).unwrap();

    assert_eq!(from_yaml, from_json);
}

#[test]
fn test_config_environment_overrides_flow_values() {
    let flow = Flow::from_yaml_str(RESERVATION_YAML)
        .unwrap()
        .with_env("api_token", "from-flow")
        .with_env("region", "us");

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[environment]\napi_token = \"from-config\"\n")
        .expect("write toml");
    let config = AppConfig::load(tmp.path()).unwrap();

    let executor = Arc::new(
        ActionExecutor::new(&flow.actions, flow.environment_variables.clone())
            .with_config(config.http.clone())
            .with_environment_overrides(&config.environment),
    );

    let ctx = executor.template_context(None);
    let rendered = executor
        .renderer()
        .render("{{ env.api_token }}/{{ env.region }}", &ctx);
    assert_eq!(rendered, "from-config/us");
}

#[test]
fn test_bundled_flow_is_clean() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("flows/reservation.yaml");
    let flow = Flow::from_file(&path).expect("bundled flow loads");
    assert!(dialflow_flow::lint(&flow).is_empty());

    let compiled = CompiledFlow::new(flow).unwrap();
    assert_eq!(compiled.schema().len(), 3);
}
