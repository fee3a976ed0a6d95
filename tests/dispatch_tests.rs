//! Dispatcher behavior: prompt assembly, fallbacks, envelope handling

mod support;

use bzx::bridge::{CharSegmenter, WordSegmenter, CONTEXT_LABEL};
use bzx::{Dispatcher, ServiceContext};
use bzx_core::{BridgeConfig, Request};
use bzx_ipc::NoopNotifier;
use bzx_llm::ChatMessage;
use serde_json::{json, Value};
use std::sync::Arc;
use support::{MockBehavior, MockProvider};

fn dispatcher(config: BridgeConfig, provider: &Arc<MockProvider>) -> Dispatcher {
    let ctx = ServiceContext::new(
        config,
        provider.clone(),
        Some(Arc::new(WordSegmenter::new())),
        Arc::new(NoopNotifier),
    );
    Dispatcher::new(&ctx)
}

fn context_aware() -> BridgeConfig {
    BridgeConfig {
        context_aware: true,
        ..BridgeConfig::default()
    }
}

fn parse(encoded: &str) -> Value {
    serde_json::from_str(encoded).unwrap()
}

// ===========================================================================
// Correct
// ===========================================================================

#[tokio::test]
async fn correct_with_pinyin_labels_user_message() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Text("你好".into())));
    let d = dispatcher(BridgeConfig::default(), &provider);

    let out = d
        .handle(r#"{"type":"correct","text":"你号","pinyin":"nihao","reqid":"r1"}"#)
        .await;

    assert_eq!(parse(&out), json!({"reqid":"r1","result":"你好","error":null}));
    let req = provider.last_request();
    assert_eq!(req.user, "拼音：nihao\n待纠正：你号");
    assert_eq!(req.system, BridgeConfig::default().system_prompts["correct"]);
    assert!(req.extra.is_empty());
}

#[tokio::test]
async fn correct_without_pinyin_sends_text_as_is() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Echo));
    let d = dispatcher(BridgeConfig::default(), &provider);

    d.dispatch(&Request::new("correct", "你号").with_pinyin("")).await;
    assert_eq!(provider.last_request().user, "你号");
}

#[tokio::test]
async fn missing_type_defaults_to_correct() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Echo));
    let d = dispatcher(BridgeConfig::default(), &provider);

    d.handle(r#"{"text":"abc"}"#).await;
    assert_eq!(
        provider.last_request().system,
        BridgeConfig::default().system_prompts["correct"]
    );
}

// ===========================================================================
// Context
// ===========================================================================

#[tokio::test]
async fn context_is_segmented_into_assistant_message() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Text("好".into())));
    let d = dispatcher(context_aware(), &provider);

    d.dispatch(&Request::new("correct", "号").with_context("你好世界"))
        .await;

    let req = provider.last_request();
    assert_eq!(
        req.extra,
        vec![ChatMessage::assistant(format!("{CONTEXT_LABEL}你好 世界"))]
    );
    let roles: Vec<_> = req.messages().into_iter().map(|m| m.role).collect();
    assert_eq!(roles, ["system", "assistant", "user"]);
}

#[tokio::test]
async fn context_falls_back_to_characters_without_segmenter() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Echo));
    let ctx = ServiceContext::new(
        context_aware(),
        provider.clone(),
        None,
        Arc::new(NoopNotifier),
    );
    let d = Dispatcher::new(&ctx);

    assert_eq!(d.tokenize("hi 你好"), "h i 你 好");
    d.dispatch(&Request::new("correct", "x").with_context("ab")).await;
    assert_eq!(
        provider.last_request().extra[0].content,
        format!("{CONTEXT_LABEL}a b")
    );
}

#[tokio::test]
async fn context_ignored_when_not_context_aware() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Echo));
    let d = dispatcher(BridgeConfig::default(), &provider);

    d.dispatch(&Request::new("correct", "x").with_context("你好世界"))
        .await;
    assert!(provider.last_request().extra.is_empty());
}

#[tokio::test]
async fn context_ignored_for_other_types() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Echo));
    let d = dispatcher(context_aware(), &provider);

    d.dispatch(
        &Request::new("translate", "hello")
            .with_context("你好世界")
            .with_pinyin("nihao"),
    )
    .await;
    let req = provider.last_request();
    assert!(req.extra.is_empty());
    assert_eq!(req.user, "hello");
}

#[tokio::test]
async fn blank_context_adds_nothing() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Echo));
    let d = dispatcher(context_aware(), &provider);

    d.dispatch(&Request::new("correct", "x").with_context("   "))
        .await;
    assert!(provider.last_request().extra.is_empty());
}

#[test]
fn word_segmenter_groups_what_char_fallback_splits() {
    use bzx::bridge::Segmenter;
    assert_eq!(WordSegmenter::new().segment("你好世界"), ["你好", "世界"]);
    assert_eq!(
        CharSegmenter.segment("你好世界"),
        ["你", "好", "世", "界"]
    );
}

// ===========================================================================
// Types
// ===========================================================================

#[tokio::test]
async fn translate_and_chat_use_their_prompts() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Echo));
    let d = dispatcher(BridgeConfig::default(), &provider);
    let prompts = BridgeConfig::default().system_prompts;

    let out = d.handle(r#"{"type":"translate","text":"hello"}"#).await;
    assert_eq!(parse(&out)["result"], "hello");
    assert_eq!(provider.last_request().system, prompts["translate"]);

    d.handle(r#"{"type":"chat","text":"写一首诗"}"#).await;
    assert_eq!(provider.last_request().system, prompts["chat"]);
}

#[tokio::test]
async fn unknown_type_dispatched_with_empty_prompt() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Text("ok".into())));
    let d = dispatcher(BridgeConfig::default(), &provider);

    let out = d.handle(r#"{"type":"summarize","text":"long text"}"#).await;
    assert_eq!(parse(&out)["result"], "ok");
    let req = provider.last_request();
    assert_eq!(req.system, "");
    assert_eq!(req.user, "long text");
}

#[tokio::test]
async fn configured_prompt_overrides_default() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Echo));
    let mut config = BridgeConfig::default();
    config
        .system_prompts
        .insert("summarize".into(), "Summarize.".into());
    let d = dispatcher(config, &provider);

    d.handle(r#"{"type":"summarize","text":"t"}"#).await;
    assert_eq!(provider.last_request().system, "Summarize.");
}

// ===========================================================================
// Fallbacks and envelopes
// ===========================================================================

#[tokio::test]
async fn provider_failure_returns_original_text() {
    let provider = Arc::new(MockProvider::sequence(vec![
        MockBehavior::Timeout,
        MockBehavior::Error("500 Internal Server Error".into()),
    ]));
    let d = dispatcher(BridgeConfig::default(), &provider);

    let out = d
        .handle(r#"{"type":"correct","text":"你号","reqid":"r2"}"#)
        .await;
    assert_eq!(parse(&out), json!({"reqid":"r2","result":"你号","error":null}));

    let out = d.handle(r#"{"type":"chat","text":"hi"}"#).await;
    assert_eq!(parse(&out)["result"], "hi");
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn reqid_echoed_verbatim() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Text("x".into())));
    let d = dispatcher(BridgeConfig::default(), &provider);

    assert_eq!(parse(&d.handle(r#"{"text":"a","reqid":42}"#).await)["reqid"], 42);
    assert_eq!(parse(&d.handle(r#"{"text":"a"}"#).await)["reqid"], "");
    assert_eq!(
        parse(&d.handle(r#"{"text":"a","reqid":"abc-1"}"#).await)["reqid"],
        "abc-1"
    );
}

#[tokio::test]
async fn invalid_json_is_reported_without_calling_provider() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Echo));
    let d = dispatcher(BridgeConfig::default(), &provider);

    for raw in ["not json", "[1,2]", r#"{"text":"#] {
        let out = parse(&d.handle(raw).await);
        assert_eq!(out["result"], Value::Null);
        assert!(
            out["error"].as_str().unwrap().starts_with("Invalid JSON: "),
            "{raw}: {out}"
        );
        assert!(out.get("reqid").is_none());
    }
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn multiline_result_survives_encoding() {
    let provider = Arc::new(MockProvider::constant(MockBehavior::Text(
        "line one\nline two".into(),
    )));
    let d = dispatcher(BridgeConfig::default(), &provider);

    let out = d.handle(r#"{"type":"chat","text":"两行"}"#).await;
    assert!(!out.contains('\n'));
    assert_eq!(parse(&out)["result"], "line one\nline two");
}
