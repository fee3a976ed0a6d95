//! Shared service state

use super::segment::{segmenter_for, Segmenter};
use bzx_core::BridgeConfig;
use bzx_ipc::{notifier_for, Notifier};
use bzx_llm::{ChatProvider, OpenAiCompatProvider};
use std::sync::Arc;

/// Everything a request needs, built once at startup.
#[derive(Clone)]
pub struct ServiceContext {
    pub config: Arc<BridgeConfig>,
    pub provider: Arc<dyn ChatProvider>,
    pub segmenter: Option<Arc<dyn Segmenter>>,
    pub notifier: Arc<dyn Notifier>,
}

impl ServiceContext {
    pub fn new(
        config: BridgeConfig,
        provider: Arc<dyn ChatProvider>,
        segmenter: Option<Arc<dyn Segmenter>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            segmenter,
            notifier,
        }
    }

    pub fn from_config(config: BridgeConfig) -> Self {
        let provider = Arc::new(OpenAiCompatProvider::from_config(&config));
        let segmenter = segmenter_for(config.segmenter);
        let notifier = notifier_for(&config);
        Self::new(config, provider, segmenter, notifier)
    }
}
