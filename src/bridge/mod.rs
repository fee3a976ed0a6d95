//! The bridge service: poll the request slot, route to the model, write the
//! response, wake the host.

pub mod context;
pub mod dispatch;
pub mod poll;
pub mod segment;

pub use context::ServiceContext;
pub use dispatch::{Dispatcher, CONTEXT_LABEL};
pub use poll::Service;
pub use segment::{segmenter_for, CharSegmenter, Segmenter, WordSegmenter};
