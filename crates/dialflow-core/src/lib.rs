pub mod config;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{DialflowError, Result};
pub use event::EventBus;
pub use traits::{FlowHost, SpeechCompleter, SpeechHandle};
pub use types::*;
