pub mod client;
pub mod config;
pub mod domains;
pub mod error;
pub mod interfaces;
pub mod services;
pub mod webhook;

pub use crate::client::QimbClient;
pub use crate::config::ClientConfig;
pub use crate::domains::envelope::{Envelope, NodeId};
pub use crate::error::{QimbError, Result};
pub use crate::interfaces::handler::{handler_fn, MessageHandler};
pub use crate::services::dedup::EvictionPolicy;
pub use crate::services::poller::{BatchSummary, PollHandle};
pub use crate::services::push::{PushIngester, PushOutcome};
