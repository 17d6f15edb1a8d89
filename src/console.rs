use std::io::{self, BufRead, Write};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use dialflow_actions::ActionExecutor;
use dialflow_core::error::{DialflowError, Result};
use dialflow_core::traits::{FlowHost, SpeechHandle};
use dialflow_core::types::{ChatHistory, ChatMessage};
use dialflow_flow::CompiledFlow;
use dialflow_agent::FlowSession;

/// Host that prints speech to stdout instead of synthesizing it.
pub struct ConsoleHost {
    history: ChatHistory,
}

impl ConsoleHost {
    pub fn new(history: ChatHistory) -> Self {
        Self { history }
    }
}

impl FlowHost for ConsoleHost {
    fn say(&self, text: String) -> SpeechHandle {
        println!("assistant: {}", text);
        self.history.push(ChatMessage::assistant(text));
        SpeechHandle::completed()
    }

    fn generate_reply(&self, instructions: String) -> SpeechHandle {
        println!("assistant (generated from): {}", instructions);
        self.history.push(ChatMessage::assistant(instructions));
        SpeechHandle::completed()
    }

    fn end_session(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async {
            println!("[session ended]");
            Ok(())
        })
    }
}

/// Split `<edge_id> [json-args]` into a tool name and its arguments.
fn parse_call(input: &str) -> std::result::Result<(&str, Value), String> {
    let (name, rest) = match input.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (input, ""),
    };
    if rest.is_empty() {
        return Ok((name, Value::Object(Default::default())));
    }
    serde_json::from_str(rest)
        .map(|args| (name, args))
        .map_err(|e| format!("arguments must be a JSON object: {}", e))
}

pub async fn run_simulation(
    flow: Arc<CompiledFlow>,
    executor: Arc<ActionExecutor>,
) -> anyhow::Result<()> {
    let history = ChatHistory::new();
    let host = Arc::new(ConsoleHost::new(history.clone()));
    let mut session = FlowSession::with_parts(flow, host, Some(executor), history)?;

    println!("dialflow v{}", env!("CARGO_PKG_VERSION"));
    println!("Session: {}", session.id());
    println!("Type <edge_id> [json-args] to call a tool, /help for commands.\n");

    session.start().await?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    while !session.is_finished() {
        print!("[{}]> ", session.current_node());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break; // EOF
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" | "/q" => break,
            "/help" => {
                println!("  /tools   list tools on the current node");
                println!("  /data    show collected user data");
                println!("  /actions show stored action results");
                println!("  /quit    leave the simulation");
                continue;
            }
            "/tools" => {
                for tool in session.tools() {
                    println!("  {} - {}", tool.name(), tool.description());
                    if tool.collects_data() {
                        println!("      {}", tool.input_schema());
                    }
                }
                continue;
            }
            "/data" => {
                let data = session
                    .userdata()
                    .map(|d| d.to_json())
                    .unwrap_or_else(|| Value::Object(Default::default()));
                println!("{}", serde_json::to_string_pretty(&data)?);
                continue;
            }
            "/actions" => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&session.action_results().to_json())?
                );
                continue;
            }
            _ => {}
        }

        let (name, args) = match parse_call(input) {
            Ok(call) => call,
            Err(e) => {
                eprintln!("error: {}", e);
                continue;
            }
        };

        session.history().push(ChatMessage::tool(input));
        match session.invoke(name, args).await {
            Ok(()) => {}
            Err(DialflowError::ToolNotFound(name)) => {
                eprintln!("error: no tool '{}' on node '{}'", name, session.current_node());
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("Finished at node '{}'.", session.current_node());
    Ok(())
}
