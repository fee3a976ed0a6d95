//! Request routing: one decoded request in, one encoded response out

use super::context::ServiceContext;
use super::segment::{CharSegmenter, Segmenter};
use bzx_core::{preview, BridgeConfig, Request, RequestKind, Response};
use bzx_llm::{ChatMessage, ChatProvider, ChatRequest};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Prefix of the history message sent with context-aware corrections.
pub const CONTEXT_LABEL: &str = "用户历史输入：";

const LOG_PREVIEW_CHARS: usize = 50;

pub struct Dispatcher {
    config: Arc<BridgeConfig>,
    provider: Arc<dyn ChatProvider>,
    segmenter: Option<Arc<dyn Segmenter>>,
}

impl Dispatcher {
    pub fn new(ctx: &ServiceContext) -> Self {
        Self {
            config: Arc::clone(&ctx.config),
            provider: Arc::clone(&ctx.provider),
            segmenter: ctx.segmenter.clone(),
        }
    }

    /// Decode `raw`, run it and return the encoded response. Never fails:
    /// a malformed request gets an error response, a failed model call
    /// gets the original text back.
    pub async fn handle(&self, raw: &str) -> String {
        let response = match Request::decode(raw) {
            Ok(request) => self.dispatch(&request).await,
            Err(e) => {
                error!("Request decode failed: {}", e);
                Response::decode_failure(&e)
            }
        };
        response.encode()
    }

    pub async fn dispatch(&self, request: &Request) -> Response {
        let label = request.kind.display_name();
        info!("[{}] Input: {}", label, preview(&request.text, LOG_PREVIEW_CHARS));

        let chat = self.build_chat(request);
        let result = match self.provider.chat(&chat).await {
            Ok(text) => {
                info!("[{}] Output: {}", label, preview(&text, LOG_PREVIEW_CHARS));
                text
            }
            Err(e) => {
                warn!(
                    "[{}] {} call failed, returning input unchanged: {}",
                    label,
                    self.provider.name(),
                    e
                );
                request.text.clone()
            }
        };

        Response::success(request.reqid.clone(), result)
    }

    /// Messages for one request: the type's system prompt, an optional
    /// history message, then the user text.
    pub fn build_chat(&self, request: &Request) -> ChatRequest {
        let system = self.config.system_prompt(&request.kind);
        if matches!(request.kind, RequestKind::Other(_)) {
            debug!("No system prompt for type {:?}", request.kind.as_str());
        }

        if request.kind != RequestKind::Correct {
            return ChatRequest::new(system, request.text.as_str());
        }

        let user = match request.pinyin_hint() {
            Some(pinyin) => {
                debug!("Pinyin hint: {}", pinyin);
                format!("拼音：{}\n待纠正：{}", pinyin, request.text)
            }
            None => request.text.clone(),
        };
        let mut chat = ChatRequest::new(system, user);

        if self.config.context_aware {
            if let Some(context) = request.context_text() {
                let tokens = self.tokenize(context);
                if !tokens.is_empty() {
                    info!("Context: {}", preview(&tokens, LOG_PREVIEW_CHARS));
                    chat = chat.with_extra(ChatMessage::assistant(format!(
                        "{CONTEXT_LABEL}{tokens}"
                    )));
                }
            }
        }
        chat
    }

    /// Space-joined tokens of `context`, per character when no segmenter
    /// is configured.
    pub fn tokenize(&self, context: &str) -> String {
        let tokens = match &self.segmenter {
            Some(segmenter) => segmenter.segment(context),
            None => CharSegmenter.segment(context),
        };
        tokens.join(" ")
    }
}
