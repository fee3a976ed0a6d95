//! Wake-up signal for the host
//!
//! The host only re-reads the response file when it sees a key event, so
//! after each response a synthetic `0` keystroke is sent. Best effort:
//! callers log failures and move on.

use bzx_core::{BridgeConfig, Error, Result};
use std::sync::Arc;

/// Key the host script listens for.
pub const NOTIFY_KEY: char = '0';

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self) -> Result<()>;
}

/// Pick the notifier for this platform, or a no-op when disabled.
pub fn notifier_for(config: &BridgeConfig) -> Arc<dyn Notifier> {
    if config.notify {
        Arc::new(KeystrokeNotifier::default())
    } else {
        Arc::new(NoopNotifier)
    }
}

pub struct NoopNotifier;

#[async_trait::async_trait]
impl Notifier for NoopNotifier {
    fn name(&self) -> &str {
        "noop"
    }

    async fn notify(&self) -> Result<()> {
        Ok(())
    }
}

/// Synthetic keystroke: `keybd_event` on Windows, System Events via
/// `osascript` on macOS, `xdotool` elsewhere.
pub struct KeystrokeNotifier {
    key: char,
}

impl Default for KeystrokeNotifier {
    fn default() -> Self {
        Self { key: NOTIFY_KEY }
    }
}

impl KeystrokeNotifier {
    pub fn key(&self) -> char {
        self.key
    }
}

#[async_trait::async_trait]
impl Notifier for KeystrokeNotifier {
    fn name(&self) -> &str {
        platform::NAME
    }

    async fn notify(&self) -> Result<()> {
        platform::send_key(self.key).await
    }
}

#[cfg(windows)]
mod platform {
    use super::*;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        keybd_event, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    };

    pub const NAME: &str = "keybd_event";

    pub async fn send_key(key: char) -> Result<()> {
        if !key.is_ascii_alphanumeric() {
            return Err(Error::notify_failed(NAME, format!("no virtual key for {key:?}")));
        }
        // Digits and letters share their virtual key code with upper-case ASCII.
        let vk = key.to_ascii_uppercase() as u8;
        // SAFETY: keybd_event only posts an input event and takes no pointers.
        unsafe {
            keybd_event(vk, 0, KEYBD_EVENT_FLAGS(0), 0);
            keybd_event(vk, 0, KEYEVENTF_KEYUP, 0);
        }
        Ok(())
    }
}

#[cfg(not(windows))]
mod platform {
    use super::*;
    use tokio::process::Command;

    #[cfg(target_os = "macos")]
    pub const NAME: &str = "osascript";
    #[cfg(not(target_os = "macos"))]
    pub const NAME: &str = "xdotool";

    #[cfg(target_os = "macos")]
    fn args(key: char) -> Vec<String> {
        vec![
            "-e".to_string(),
            format!("tell application \"System Events\" to keystroke \"{key}\""),
        ]
    }

    #[cfg(not(target_os = "macos"))]
    fn args(key: char) -> Vec<String> {
        vec!["key".to_string(), key.to_string()]
    }

    pub async fn send_key(key: char) -> Result<()> {
        let output = Command::new(NAME)
            .args(args(key))
            .output()
            .await
            .map_err(|e| Error::notify_failed(NAME, format!("exec failed: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::notify_failed(
                NAME,
                format!("{}: {}", output.status, stderr.trim()),
            ))
        }
    }

}
