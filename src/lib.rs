//! bzx: a file-mailbox bridge between a Rime input method script and an
//! OpenAI-compatible chat endpoint.

pub mod bridge;

pub use bridge::{Dispatcher, Service, ServiceContext};
