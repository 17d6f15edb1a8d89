use futures::future::BoxFuture;
use tokio::sync::oneshot;

use crate::error::Result;

/// Conversational host: the speech/LLM runtime that drives a flow.
///
/// The core never talks to a model itself. It asks the host to speak literal
/// text or to generate a reply from rendered instructions, and to tear the
/// session down once a final node has been spoken.
pub trait FlowHost: Send + Sync + 'static {
    /// Speak `text` verbatim.
    fn say(&self, text: String) -> SpeechHandle;

    /// Generate a reply seeded with `instructions`.
    fn generate_reply(&self, instructions: String) -> SpeechHandle;

    /// Tear down the hosting session (e.g. close the room).
    fn end_session(&self) -> BoxFuture<'_, Result<()>>;
}

/// Handle to a piece of speech the host has scheduled.
///
/// Resolves once playout has finished. A host that drops its completer
/// without calling [`SpeechCompleter::complete`] is treated as finished too,
/// so waiting never hangs on an abandoned utterance.
#[derive(Debug)]
pub struct SpeechHandle {
    done: Option<oneshot::Receiver<()>>,
}

/// Host-side half of a [`SpeechHandle`].
#[derive(Debug)]
pub struct SpeechCompleter {
    tx: oneshot::Sender<()>,
}

impl SpeechHandle {
    /// Create a pending handle and the completer the host fires on playout end.
    pub fn pair() -> (SpeechHandle, SpeechCompleter) {
        let (tx, rx) = oneshot::channel();
        (SpeechHandle { done: Some(rx) }, SpeechCompleter { tx })
    }

    /// A handle that is already done (nothing to wait for).
    pub fn completed() -> Self {
        Self { done: None }
    }

    /// Wait until playout has completed.
    pub async fn wait(self) {
        if let Some(rx) = self.done {
            let _ = rx.await;
        }
    }
}

impl SpeechCompleter {
    pub fn complete(self) {
        let _ = self.tx.send(());
    }
}
