//! Scripted provider and notifier for exercising the bridge without a network

#![allow(dead_code)]

use bzx_core::Result;
use bzx_ipc::Notifier;
use bzx_llm::{ChatProvider, ChatRequest, LlmError, LlmResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone, Debug)]
pub enum MockBehavior {
    /// Return this text
    Text(String),
    /// Return the user message unchanged
    Echo,
    /// Fail with a request error
    Error(String),
    /// Fail as a timeout would
    Timeout,
    /// Panic inside the call
    Panic,
    /// Sleep, then return the text
    Slow(Duration, String),
}

/// Each call pops the next behavior; once the sequence runs out the default
/// is used. Every request is recorded.
pub struct MockProvider {
    behaviors: Mutex<Vec<MockBehavior>>,
    default_behavior: MockBehavior,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    pub fn constant(behavior: MockBehavior) -> Self {
        Self {
            behaviors: Mutex::new(Vec::new()),
            default_behavior: behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn sequence(mut behaviors: Vec<MockBehavior>) -> Self {
        behaviors.reverse();
        Self {
            behaviors: Mutex::new(behaviors),
            default_behavior: MockBehavior::Text("(mock: sequence exhausted)".into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ChatRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("provider was never called")
    }

    fn next_behavior(&self) -> MockBehavior {
        self.behaviors
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| self.default_behavior.clone())
    }
}

#[async_trait::async_trait]
impl ChatProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, request: &ChatRequest) -> LlmResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.next_behavior() {
            MockBehavior::Text(text) => Ok(text),
            MockBehavior::Echo => Ok(request.user.clone()),
            MockBehavior::Error(msg) => Err(LlmError::RequestFailed(msg)),
            MockBehavior::Timeout => Err(LlmError::Timeout(30)),
            MockBehavior::Panic => panic!("mock provider panic"),
            MockBehavior::Slow(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        }
    }
}

#[derive(Default)]
pub struct CountingNotifier {
    count: AtomicUsize,
}

impl CountingNotifier {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Notifier for CountingNotifier {
    fn name(&self) -> &str {
        "counting"
    }

    async fn notify(&self) -> Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
