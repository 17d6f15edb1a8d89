//! Shared test utilities for dialflow crates.
//!
//! Provides a [`RecordingHost`] that captures everything a flow asks its host
//! to do, plus fixture flows used across unit and integration tests.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use futures::future::BoxFuture;

use dialflow_core::error::{DialflowError, Result};
use dialflow_core::traits::{FlowHost, SpeechCompleter, SpeechHandle};
use dialflow_flow::{ActionDef, ActionTrigger, DataField, Edge, FieldType, Flow, HttpMethod, Node};

// ---------------------------------------------------------------------------
// RecordingHost
// ---------------------------------------------------------------------------

/// One request a flow made of its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Say(String),
    GenerateReply(String),
    EndSession,
}

/// A [`FlowHost`] that records calls instead of speaking.
///
/// By default speech completes immediately. A host built with
/// [`RecordingHost::holding_speech`] keeps every utterance pending until
/// [`RecordingHost::release_speech`] is called. A host built with
/// [`RecordingHost::failing_teardown`] records `end_session` but reports a
/// host error from it.
#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    hold_speech: bool,
    fail_teardown: bool,
    pending: Mutex<Vec<SpeechCompleter>>,
    ended: AtomicBool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding_speech() -> Self {
        Self {
            hold_speech: true,
            ..Self::default()
        }
    }

    pub fn failing_teardown() -> Self {
        Self {
            fail_teardown: true,
            ..Self::default()
        }
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts passed to `say`.
    pub fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Say(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Instructions passed to `generate_reply`.
    pub fn generated(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::GenerateReply(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Finish every held utterance.
    pub fn release_speech(&self) {
        let completers: Vec<SpeechCompleter> = self.pending.lock().unwrap().drain(..).collect();
        for completer in completers {
            completer.complete();
        }
    }

    fn speak(&self, call: HostCall) -> SpeechHandle {
        self.calls.lock().unwrap().push(call);
        if !self.hold_speech {
            return SpeechHandle::completed();
        }
        let (handle, completer) = SpeechHandle::pair();
        self.pending.lock().unwrap().push(completer);
        handle
    }
}

impl FlowHost for RecordingHost {
    fn say(&self, text: String) -> SpeechHandle {
        self.speak(HostCall::Say(text))
    }

    fn generate_reply(&self, instructions: String) -> SpeechHandle {
        self.speak(HostCall::GenerateReply(instructions))
    }

    fn end_session(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(HostCall::EndSession);
            if self.fail_teardown {
                return Err(DialflowError::Host("room already closed".into()));
            }
            self.ended.store(true, Ordering::SeqCst);
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Fixture flows
// ---------------------------------------------------------------------------

/// Restaurant reservation: welcome -> get_details -> confirm -> {done | get_details}.
///
/// `welcome` also carries `ask_hours`, an edge with no target.
pub fn reservation_flow() -> Flow {
    Flow::new(
        "You are a friendly host at Bella Vista taking table reservations.",
        "welcome",
    )
    .with_node(
        Node::new("welcome", "Welcome")
            .with_static_text("Welcome to Bella Vista! Would you like to book a table?")
            .with_edge(Edge::to(
                "welcome_to_get_details",
                "Customer wants to make a reservation",
                "get_details",
            ))
            .with_edge(Edge::stay("ask_hours", "Customer asks about opening hours")),
    )
    .with_node(
        Node::new("get_details", "Get Details")
            .with_instruction("Ask for the customer's name, the party size and the time.")
            .with_edge(
                Edge::to("collect_details", "Customer gave their booking details", "confirm")
                    .collecting(
                        DataField::new("customer_name", FieldType::String, "Customer's name")
                            .required(),
                    )
                    .collecting(
                        DataField::new("party_size", FieldType::Integer, "Number of guests")
                            .required(),
                    )
                    .collecting(
                        DataField::new("reservation_time", FieldType::String, "Requested time")
                            .required(),
                    ),
            ),
    )
    .with_node(
        Node::new("confirm", "Confirm")
            .with_instruction(
                "Read back the booking for {{ userdata.customer_name }}: party of \
                 {{ userdata.party_size }} at {{ userdata.reservation_time }}. Ask to confirm.",
            )
            .with_edge(Edge::to("confirm_yes", "Customer confirms the booking", "done"))
            .with_edge(Edge::to(
                "confirm_no",
                "Customer wants to change the booking",
                "get_details",
            )),
    )
    .with_node(
        Node::new("done", "Done")
            .with_static_text(
                "Thank you {{ userdata.customer_name }}, see you at {{ userdata.reservation_time }}!",
            )
            .final_node(),
    )
}

/// Profile creation backed by an HTTP action against `base_url`.
///
/// Entering `created` posts the collected profile and stores the response as
/// `profile_creation`; the closing line depends on that result.
pub fn profile_flow(base_url: &str) -> Flow {
    Flow::new("You help customers create a profile.", "collect_info")
        .with_env("api_token", "test_api_token_12345")
        .with_action(
            ActionDef::new(
                "create_profile",
                HttpMethod::Post,
                format!("{}/users/profile", base_url),
            )
            .with_header("Authorization", "Bearer {{ env.api_token }}")
            .with_header("Content-Type", "application/json")
            .with_body(
                r#"{"name": "{{ userdata.name }}", "email": "{{ userdata.email }}", "age": {{ userdata.age }}}"#,
            )
            .with_timeout(5)
            .store_as("profile_creation"),
        )
        .with_node(
            Node::new("collect_info", "Collect Info")
                .with_static_text("What's your name, email and age?")
                .with_edge(
                    Edge::to("submit_profile", "Customer gave name, email and age", "created")
                        .collecting(DataField::new("name", FieldType::String, "Full name").required())
                        .collecting(DataField::new("email", FieldType::String, "Email").required())
                        .collecting(DataField::new("age", FieldType::Integer, "Age").required()),
                ),
        )
        .with_node(
            Node::new("created", "Created")
                .with_trigger(ActionTrigger::on_enter("create_profile"))
                .with_static_text(
                    "{% if actions.profile_creation.success %}Profile {{ actions.profile_creation.data.profile_id }} \
                     created for {{ userdata.name }}.{% else %}Sorry, we could not create your profile.{% endif %}",
                )
                .final_node(),
        )
}

/// Reservation flow in YAML form, as an author would write it.
pub const RESERVATION_YAML: &str = r#"
system_prompt: "You are a friendly host at Bella Vista taking table reservations."
initial_node: welcome
nodes:
  - id: welcome
    name: Welcome
    static_text: "Welcome to Bella Vista! Would you like to book a table?"
    edges:
      - id: welcome_to_get_details
        condition: "Customer wants to make a reservation"
        target_node_id: get_details
  - id: get_details
    name: Get Details
    instruction: "Ask for the customer's name, the party size and the time."
    edges:
      - id: collect_details
        condition: "Customer gave their booking details"
        target_node_id: confirm
        collect_data:
          - name: customer_name
            type: string
            description: "Customer's name"
            required: true
          - name: party_size
            type: integer
            description: "Number of guests"
            required: true
  - id: confirm
    name: Confirm
    instruction: "Confirm the booking for {{ userdata.customer_name }}."
    edges:
      - id: confirm_yes
        condition: "Customer confirms the booking"
        target_node_id: done
      - id: confirm_no
        condition: "Customer wants to change the booking"
        target_node_id: get_details
  - id: done
    name: Done
    static_text: "Thank you {{ userdata.customer_name }}!"
    is_final: true
"#;

/// Write `content` to a temp file with the given suffix (e.g. ".yaml").
pub fn write_temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file
}
