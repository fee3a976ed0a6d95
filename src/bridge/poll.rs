use super::context::ServiceContext;
use super::dispatch::Dispatcher;
use bzx_core::{preview, Error, Response, Result};
use bzx_ipc::{storage_root, FileChannel};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct Service {
    ctx: ServiceContext,
    dispatcher: Arc<Dispatcher>,
    root: PathBuf,
}

impl Service {
    pub fn new(ctx: ServiceContext) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(&ctx));
        Self {
            ctx,
            dispatcher,
            root: storage_root(),
        }
    }

    /// Put the channel files somewhere other than the platform temp dir.
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Serve requests until `cancel` fires. Requests are handled one at a
    /// time. Only a channel that cannot be opened is an error; everything
    /// after that is logged and retried.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let config = &self.ctx.config;
        let mut channel = FileChannel::open_in(&self.root, &config.channel_name)?;
        info!(
            "Listening on {} (poll {}ms)",
            channel.request_path().display(),
            config.poll_interval_ms
        );

        // Encoded response not yet on disk; retried before anything else.
        let mut pending: Option<String> = None;
        let mut backoff = false;

        loop {
            if let Some(response) = pending.take() {
                pending = self.deliver(&channel, response).await;
            }
            if cancel.is_cancelled() {
                break;
            }
            if pending.is_some() || std::mem::take(&mut backoff) {
                if idle(&cancel, config.error_backoff()).await {
                    break;
                }
                continue;
            }

            match channel.poll() {
                Ok(Some(raw)) => {
                    debug!("Request: {}", preview(&raw, 80));
                    let (response, panicked) = self.dispatch(raw).await;
                    pending = Some(response);
                    backoff = panicked;
                }
                Ok(None) => {
                    if idle(&cancel, config.poll_interval()).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Channel poll failed: {}", e);
                    if idle(&cancel, config.error_backoff()).await {
                        break;
                    }
                }
            }
        }

        if let Some(response) = pending {
            if self.deliver(&channel, response).await.is_some() {
                error!("Response could not be written before shutdown");
            }
        }
        info!("Service stopping");
        channel.close();
        Ok(())
    }

    /// Write `response` and wake the host. Hands the response back if the
    /// write failed.
    async fn deliver(&self, channel: &FileChannel, response: String) -> Option<String> {
        if let Err(e) = channel.respond(&response) {
            warn!("Failed to write response, will retry: {}", e);
            return Some(response);
        }
        debug!("Response: {}", preview(&response, 80));
        if let Err(e) = self.ctx.notifier.notify().await {
            warn!("{}", e);
        }
        None
    }

    /// Run one request on its own task so a panic is contained. Returns the
    /// encoded response and whether the task died.
    async fn dispatch(&self, raw: String) -> (String, bool) {
        let dispatcher = Arc::clone(&self.dispatcher);
        match tokio::spawn(async move { dispatcher.handle(&raw).await }).await {
            Ok(response) => (response, false),
            Err(e) => {
                error!("{}", Error::Internal(format!("request handler: {e}")));
                (Response::internal_error().encode(), true)
            }
        }
    }
}

/// Sleep for `period`. Returns true if cancelled first.
async fn idle(cancel: &CancellationToken, period: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(period) => false,
    }
}
