use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialflowError {
    // Flow definition errors
    #[error("Flow file not found: {0}")]
    FlowNotFound(String),

    #[error("Invalid flow definition: {0}")]
    Load(String),

    /// Structural authoring bug surfaced while the conversation is running
    /// (unresolved initial node, transition target, or action id).
    #[error("Flow config error: {0}")]
    Config(String),

    // Dispatch errors
    #[error("Tool not found on current node: {0}")]
    ToolNotFound(String),

    #[error("Session has already ended")]
    SessionEnded,

    #[error("Session has not been started")]
    SessionNotStarted,

    // Template errors
    #[error("Template error: {0}")]
    Template(String),

    // Transport errors
    #[error("HTTP transport error: {0}")]
    Http(String),

    // Host errors
    #[error("Host error: {0}")]
    Host(String),

    // App config errors
    #[error("Config file error: {0}")]
    AppConfig(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DialflowError>;
