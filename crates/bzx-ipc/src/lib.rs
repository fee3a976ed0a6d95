//! bzx IPC - file mailbox shared with the host script, plus the wake-up keystroke
//!
//! The host can only touch files, so a request and a response file in the
//! temp directory act as two single-slot mailboxes. The requester is the only
//! writer of the request file and this process the only writer of the
//! response file.

pub mod channel;
pub mod notifier;

pub use channel::{escape, storage_root, unescape, FileChannel, Watermark};
pub use notifier::{notifier_for, KeystrokeNotifier, NoopNotifier, Notifier};
