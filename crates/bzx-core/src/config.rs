//! Bridge configuration
//!
//! Every field has a default, so the service runs with no file at all.
//! Loaded from TOML (or JSON, by extension) at startup.

use crate::protocol::RequestKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CHANNEL_NAME: &str = "bzx_rime";

/// Env var that overrides `api_key`.
pub const API_KEY_ENV: &str = "BZX_API_KEY";

/// Top-level bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// OpenAI-compatible chat completions endpoint.
    pub api_url: String,
    /// Bearer token. Empty means no Authorization header (local backends).
    pub api_key: String,
    pub model: String,
    /// Feed the host's recent input history to `correct` requests.
    pub context_aware: bool,
    pub debug: bool,
    /// Base name of the request/response files.
    pub channel_name: String,
    pub segmenter: SegmenterKind,
    /// Send the wake-up keystroke after each response.
    pub notify: bool,
    pub poll_interval_ms: u64,
    pub error_backoff_ms: u64,
    /// Log directory. Unset means next to the executable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    pub model_params: ModelParams,
    /// System instruction per request type.
    pub system_prompts: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    /// Request timeout in seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmenterKind {
    /// Unicode word boundaries.
    #[default]
    Word,
    /// No segmenter; context is split per character.
    Off,
}

// ============================================================
// Defaults
// ============================================================

const CORRECT_PROMPT: &str = "{\"role\":\"逆向拼音纠错专家\",\"protocol\":\"仅输出修正后汉字,严禁解释多言,长度严格守恒\",\"logic\":\"1.声学还原:兼容平翘舌、前后鼻音、fh模糊音;2.意境采样:文学语境(含山/巅/长风/明月/负/至)史诗感优先,即便原句通顺,若同音字张力更强(如负变扶)则强制替换；如果有上下文内容的话**必须**参考上下文内容的名词进行纠正，例如女性->她，男性->他。\",\"output\":\"直接输出修正后的文本\"}";

const TRANSLATE_PROMPT: &str = "你是翻译专家。用户会给你一段文本，中文翻译成英文，英文翻译成中文。\n\n【输出要求】\n- 只输出翻译结果\n- 禁止任何解释或说明";

const CHAT_PROMPT: &str = "你是内容生成助手。根据用户的需求生成内容。\n\n【输出要求】\n- 只输出生成的内容\n- 禁止任何解释或前缀\n- 严禁附带markdown语法的符号表示\n- 所有回答应当尽可能简洁高效\n- 对于命令的询问应当给出一条命令";

pub fn default_system_prompts() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("correct".to_string(), CORRECT_PROMPT.to_string()),
        ("translate".to_string(), TRANSLATE_PROMPT.to_string()),
        ("chat".to_string(), CHAT_PROMPT.to_string()),
    ])
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.deepseek.com/v1/chat/completions".into(),
            api_key: String::new(),
            model: "deepseek-chat".into(),
            context_aware: false,
            debug: false,
            channel_name: DEFAULT_CHANNEL_NAME.into(),
            segmenter: SegmenterKind::default(),
            notify: true,
            poll_interval_ms: 50,
            error_backoff_ms: 100,
            log_dir: None,
            model_params: ModelParams::default(),
            system_prompts: default_system_prompts(),
        }
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 512,
            top_p: 1.0,
            timeout: 30,
        }
    }
}

// ============================================================
// Loading
// ============================================================

/// Outcome of [`BridgeConfig::load`]. Logging is not up yet when config is
/// read, so diagnostics are carried back to the caller.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: BridgeConfig,
    /// File the config came from, `None` for built-in defaults.
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl BridgeConfig {
    /// Load the first candidate that exists and parses, falling back to defaults.
    pub fn load(candidates: &[PathBuf]) -> LoadedConfig {
        let mut warnings = Vec::new();
        for path in candidates {
            if !path.is_file() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => {
                    return LoadedConfig {
                        config,
                        source: Some(path.clone()),
                        warnings,
                    }
                }
                Err(e) => warnings.push(format!("Failed to read {}: {}", path.display(), e)),
            }
        }
        warnings.push("No config file found, using defaults".to_string());
        LoadedConfig {
            config: Self::default(),
            source: None,
            warnings,
        }
    }

    /// Parse one file. `.json` goes through serde_json, anything else is TOML.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let mut config: Self = if is_json {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content).map_err(|e| crate::Error::ConfigError(e.to_string()))?
        };
        config.merge_default_prompts();
        Ok(config)
    }

    /// Profiles missing from the file keep their built-in instruction.
    fn merge_default_prompts(&mut self) {
        for (kind, prompt) in default_system_prompts() {
            self.system_prompts.entry(kind).or_insert(prompt);
        }
    }

    /// Apply `BZX_API_KEY` if set and non-empty.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.api_key = key;
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// System instruction for a request type. Unknown types get an empty one.
    pub fn system_prompt(&self, kind: &RequestKind) -> &str {
        self.system_prompts
            .get(kind.as_str())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

impl ModelParams {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
