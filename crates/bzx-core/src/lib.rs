//! bzx core - envelopes, configuration, and error handling

pub mod config;
pub mod error;
pub mod protocol;

pub use config::{BridgeConfig, LoadedConfig, ModelParams, SegmenterKind};
pub use error::{Error, Result};
pub use protocol::*;
