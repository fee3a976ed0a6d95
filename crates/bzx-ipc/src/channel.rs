//! Request/response mailbox files
//!
//! `{name}_req.txt` is written by the host and consumed here.
//! `{name}_resp.txt` is written here and read by the host, with real newlines
//! replaced by the two characters `\n`.
//!
//! New content is detected by comparing a (mtime, length) watermark against
//! the last one seen, so a payload is delivered at most once no matter how
//! often the slot is polled. Consumption is rename-then-read.

use bzx_core::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

const REQUEST_SUFFIX: &str = "_req.txt";
const RESPONSE_SUFFIX: &str = "_resp.txt";

/// Platform temp directory, fixed to match what the host script computes.
pub fn storage_root() -> PathBuf {
    if cfg!(windows) {
        ["TEMP", "TMP"]
            .iter()
            .filter_map(std::env::var_os)
            .find(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("C:\\Temp"))
    } else {
        PathBuf::from("/tmp")
    }
}

/// Single-line encoding of a response: each newline becomes `\n`.
pub fn escape(payload: &str) -> String {
    payload.replace('\n', "\\n")
}

/// Inverse of [`escape`].
pub fn unescape(line: &str) -> String {
    line.replace("\\n", "\n")
}

/// Last observed state of the request file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    modified: SystemTime,
    len: u64,
}

impl Watermark {
    fn of(meta: &fs::Metadata) -> Self {
        Self {
            modified: meta.modified().unwrap_or(UNIX_EPOCH),
            len: meta.len(),
        }
    }

    /// Marker for a slot we just emptied. If the host has already written
    /// into it, there is no marker, so that content still counts as new.
    fn cleared(meta: &fs::Metadata) -> Option<Self> {
        (meta.len() == 0).then(|| Self::of(meta))
    }
}

pub struct FileChannel {
    name: String,
    request_path: PathBuf,
    response_path: PathBuf,
    /// Request claimed by rename, not yet read.
    inflight_path: PathBuf,
    /// Response being written before the rename into place.
    staging_path: PathBuf,
    watermark: Option<Watermark>,
    closed: bool,
}

impl FileChannel {
    /// Open the channel in the platform temp directory.
    pub fn open(name: &str) -> Result<Self> {
        Self::open_in(storage_root(), name)
    }

    /// Open the channel under `root`. Both slots start out empty.
    ///
    /// Fails only if the files cannot be created, which is fatal for the
    /// service.
    pub fn open_in(root: impl AsRef<Path>, name: &str) -> Result<Self> {
        let root = root.as_ref();
        let request_path = root.join(format!("{name}{REQUEST_SUFFIX}"));
        let response_path = root.join(format!("{name}{RESPONSE_SUFFIX}"));
        let channel = Self {
            name: name.to_string(),
            inflight_path: with_extra_ext(&request_path, "inflight"),
            staging_path: with_extra_ext(&response_path, "tmp"),
            request_path,
            response_path,
            watermark: None,
            closed: false,
        };

        for stale in [&channel.inflight_path, &channel.staging_path] {
            let _ = fs::remove_file(stale);
        }
        for path in [&channel.request_path, &channel.response_path] {
            let _ = fs::remove_file(path);
            fs::File::create(path).map_err(|e| Error::storage_root(root, e))?;
            info!("Created channel file: {}", path.display());
        }
        Ok(channel)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn request_path(&self) -> &Path {
        &self.request_path
    }

    pub fn response_path(&self) -> &Path {
        &self.response_path
    }

    /// Non-blocking check for a new request.
    ///
    /// Returns the trimmed payload and leaves the request slot empty, or
    /// `None` when nothing new is there. Whitespace-only content is not a
    /// request. An `Err` is transient; the same payload is retried on the
    /// next call.
    pub fn poll(&mut self) -> Result<Option<String>> {
        if self.inflight_path.exists() {
            debug!("Resuming claimed request: {}", self.inflight_path.display());
            return self.take_inflight();
        }

        let meta = match fs::metadata(&self.request_path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.recreate_request();
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mark = Watermark::of(&meta);
        if self.watermark == Some(mark) {
            return Ok(None);
        }
        if meta.len() == 0 {
            self.watermark = Some(mark);
            return Ok(None);
        }

        fs::rename(&self.request_path, &self.inflight_path)?;
        self.recreate_request();
        self.take_inflight()
    }

    /// Put an empty request file back. If the host got there first, its new
    /// request is left alone and the watermark is reset so it gets picked up.
    fn recreate_request(&mut self) {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.request_path)
        {
            Ok(file) => {
                self.watermark = file.metadata().ok().and_then(|m| Watermark::cleared(&m));
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("Request file re-created by host before clear");
                self.watermark = None;
            }
            Err(e) => {
                warn!("Failed to re-create {}: {}", self.request_path.display(), e);
                self.watermark = None;
            }
        }
    }

    /// Read and delete the claimed request. Content is only handed out once
    /// the file is gone.
    fn take_inflight(&mut self) -> Result<Option<String>> {
        let bytes = match fs::read(&self.inflight_path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        fs::remove_file(&self.inflight_path)?;

        let content = String::from_utf8_lossy(&bytes);
        let content = content.trim();
        if content.is_empty() {
            Ok(None)
        } else {
            Ok(Some(content.to_string()))
        }
    }

    /// Replace the response slot with `payload`, escaped to one line.
    ///
    /// Written to a staging file and renamed into place so the host never
    /// sees a half-written response.
    pub fn respond(&self, payload: &str) -> Result<()> {
        let data = escape(payload);
        fs::write(&self.staging_path, &data)?;
        if let Err(e) = fs::rename(&self.staging_path, &self.response_path) {
            // Host may hold the file open (Windows); overwrite in place.
            debug!("Rename into {} failed ({}), writing directly", self.response_path.display(), e);
            let _ = fs::remove_file(&self.staging_path);
            fs::write(&self.response_path, &data)?;
        }
        Ok(())
    }

    /// Remove all channel files. Idempotent; failures are logged only.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for path in [
            &self.request_path,
            &self.response_path,
            &self.inflight_path,
            &self.staging_path,
        ] {
            match fs::remove_file(path) {
                Ok(()) => info!("Removed channel file: {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

impl Drop for FileChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn with_extra_ext(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}
