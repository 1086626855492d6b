//! Unit tests for ResponseGenerator with a recording mock LlmClient.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prompt::{ChatMessage, MessageRole, SECTION_SEARCH};
use relay_core::HistoryEntry;

use crate::{GenerationError, LlmClient, ResponseGenerator};

enum Reply {
    Text(&'static str),
    Fail,
    Hang,
}

struct MockLlm {
    reply: Reply,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<ChatMessage>>,
}

impl MockLlm {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        })
    }

    fn messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn get_llm_response_with_messages(
        &self,
        messages: Vec<ChatMessage>,
    ) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages;
        match self.reply {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Fail => Err(anyhow::anyhow!("upstream returned 500")),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".to_string())
            }
        }
    }
}

/// **Test: Request carries System → history → current user turn.**
///
/// **Setup:** Two history entries, no search context.
/// **Expected:** Four messages in order; last one is the raw user message.
#[tokio::test]
async fn test_generate_sends_system_history_then_user() {
    let llm = MockLlm::new(Reply::Text("こんにちは！"));
    let generator = ResponseGenerator::new(llm.clone()).with_system_prompt("persona");
    let history = vec![
        HistoryEntry::user("前の質問"),
        HistoryEntry::assistant("前の回答"),
    ];

    let reply = generator
        .generate("こんにちは", &history, None)
        .await
        .unwrap();

    assert_eq!(reply, "こんにちは！");
    let messages = llm.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0], ChatMessage::system("persona"));
    assert_eq!(messages[1], ChatMessage::user("前の質問"));
    assert_eq!(messages[2], ChatMessage::assistant("前の回答"));
    assert_eq!(messages[3], ChatMessage::user("こんにちは"));
}

/// **Test: Search context is attached to the current user turn only.**
#[tokio::test]
async fn test_generate_with_context_augments_current_turn() {
    let llm = MockLlm::new(Reply::Text("晴れです"));
    let generator = ResponseGenerator::new(llm.clone());

    generator
        .generate("今日の天気は？", &[], Some("[1] 天気予報\n晴れ\nURL: https://example.com"))
        .await
        .unwrap();

    let messages = llm.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::System);
    assert!(messages[1].content.starts_with("今日の天気は？"));
    assert!(messages[1].content.contains(SECTION_SEARCH));
    assert!(messages[1].content.contains("URL: https://example.com"));
}

/// **Test: Endpoint failure maps to GenerationError::Endpoint.**
#[tokio::test]
async fn test_generate_endpoint_error() {
    let generator = ResponseGenerator::new(MockLlm::new(Reply::Fail));

    let err = generator.generate("hi", &[], None).await.unwrap_err();

    assert!(matches!(err, GenerationError::Endpoint(ref msg) if msg.contains("500")));
}

/// **Test: Whitespace-only completion is treated as empty.**
#[tokio::test]
async fn test_generate_blank_response_is_empty_error() {
    let generator = ResponseGenerator::new(MockLlm::new(Reply::Text("  \n")));

    let err = generator.generate("hi", &[], None).await.unwrap_err();

    assert!(matches!(err, GenerationError::EmptyResponse));
}

/// **Test: A hanging endpoint is cut off at the deadline.**
///
/// **Setup:** Paused tokio clock, 20s timeout, mock that sleeps an hour.
/// **Expected:** GenerationError::Timeout(20s); the mock was called once.
#[tokio::test(start_paused = true)]
async fn test_generate_times_out() {
    let llm = MockLlm::new(Reply::Hang);
    let generator = ResponseGenerator::new(llm.clone()).with_timeout(Duration::from_secs(20));

    let err = generator.generate("hi", &[], None).await.unwrap_err();

    assert!(matches!(err, GenerationError::Timeout(d) if d == Duration::from_secs(20)));
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}
