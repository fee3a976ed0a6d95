//! Request/response envelopes exchanged with the host script
//!
//! The host writes one JSON request object into the request slot and reads
//! one JSON response object from the response slot. `reqid` is opaque and is
//! echoed back exactly as received.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// What the host wants done with `text`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestKind {
    #[default]
    Correct,
    Translate,
    Chat,
    /// Any type the bridge has no built-in profile for. Still dispatched.
    Other(String),
}

impl RequestKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Correct => "correct",
            Self::Translate => "translate",
            Self::Chat => "chat",
            Self::Other(s) => s,
        }
    }

    /// Name used in log lines.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Correct => "纠错",
            Self::Translate => "翻译",
            Self::Chat => "对话",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for RequestKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "correct" => Self::Correct,
            "translate" => Self::Translate,
            "chat" => Self::Chat,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for RequestKind {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<RequestKind> for String {
    fn from(kind: RequestKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request envelope written by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: RequestKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinyin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default = "empty_reqid")]
    pub reqid: Value,
}

fn empty_reqid() -> Value {
    Value::String(String::new())
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Request {
    pub fn new(kind: impl Into<RequestKind>, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
            pinyin: None,
            context: None,
            reqid: empty_reqid(),
        }
    }

    pub fn with_pinyin(mut self, pinyin: impl Into<String>) -> Self {
        self.pinyin = Some(pinyin.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_reqid(mut self, reqid: impl Into<Value>) -> Self {
        self.reqid = reqid.into();
        self
    }

    /// Decode a raw request. Anything but a JSON object is rejected.
    pub fn decode(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(<serde_json::Error as serde::de::Error>::custom(
                "expected a JSON object",
            ));
        }
        serde_json::from_value(value)
    }

    /// Non-empty pinyin hint, if any.
    pub fn pinyin_hint(&self) -> Option<&str> {
        self.pinyin.as_deref().filter(|p| !p.is_empty())
    }

    /// Non-empty context, if any.
    pub fn context_text(&self) -> Option<&str> {
        self.context.as_deref().filter(|c| !c.is_empty())
    }
}

/// Response envelope read by the host.
///
/// `result` is always populated for a decodable request. `error` is
/// diagnostic only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reqid: Option<Value>,
    pub result: Option<String>,
    pub error: Option<String>,
}

const FALLBACK_ENCODING: &str = r#"{"result":null,"error":"internal error"}"#;

impl Response {
    pub fn success(reqid: Value, result: impl Into<String>) -> Self {
        Self {
            reqid: Some(reqid),
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn decode_failure(err: &serde_json::Error) -> Self {
        Self {
            reqid: None,
            result: None,
            error: Some(format!("Invalid JSON: {}", err)),
        }
    }

    pub fn internal_error() -> Self {
        Self {
            reqid: None,
            result: None,
            error: Some("internal error".to_string()),
        }
    }

    /// Serialize to a single JSON object. Non-ASCII text is kept as-is.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| FALLBACK_ENCODING.to_string())
    }
}

/// Truncate `s` to `max_chars` characters for log output, appending `...`
/// when anything was cut.
pub fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_from_known_strings() {
        assert_eq!(RequestKind::from("correct"), RequestKind::Correct);
        assert_eq!(RequestKind::from("translate"), RequestKind::Translate);
        assert_eq!(RequestKind::from("chat"), RequestKind::Chat);
        assert_eq!(
            RequestKind::from("summarize"),
            RequestKind::Other("summarize".into())
        );
    }

    #[test]
    fn null_type_means_correct() {
        let req = Request::decode(r#"{"type":null,"text":"x"}"#).unwrap();
        assert_eq!(req.kind, RequestKind::Correct);
    }

    #[test]
    fn null_text_is_empty() {
        let req = Request::decode(r#"{"type":"chat","text":null}"#).unwrap();
        assert_eq!(req.text, "");
    }

    #[test]
    fn array_is_not_a_request() {
        assert!(Request::decode(r#"["correct","ni hao"]"#).is_err());
        assert!(Request::decode(r#""correct""#).is_err());
    }

    #[test]
    fn numeric_reqid_survives() {
        let req = Request::decode(r#"{"text":"a","reqid":17}"#).unwrap();
        assert_eq!(req.reqid, json!(17));
    }

    #[test]
    fn preview_is_char_safe() {
        assert_eq!(preview("你好世界", 2), "你好...");
        assert_eq!(preview("你好", 2), "你好");
        assert_eq!(preview("", 5), "");
    }

    #[test]
    fn encode_keeps_non_ascii() {
        let resp = Response::success(json!("r1"), "你好");
        assert_eq!(resp.encode(), r#"{"reqid":"r1","result":"你好","error":null}"#);
    }
}
