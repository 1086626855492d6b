//! # Prompt
//!
//! Assembles the message list sent to the chat-completion endpoint.
//!
//! ## Order
//!
//! - **System**: persona instruction, extended with [`SEARCH_CONTEXT_INSTRUCTION`] when search
//!   results are attached
//! - **History**: stored conversation, oldest first, each entry keeping its role
//! - **Current user turn**: the user's message, followed by a [`SECTION_SEARCH`] block when the
//!   formatted search context is non-empty
//!
//! ## External interactions
//!
//! - **AI models**: Output is sent to OpenAI-compatible chat completion APIs.

use relay_core::{HistoryEntry, Role};

/// Role of a message, one-to-one with OpenAI Chat Completions API `role` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    /// System instruction (API `role: "system"`).
    System,
    /// User message (API `role: "user"`).
    User,
    /// Assistant message (API `role: "assistant"`).
    Assistant,
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

/// A single chat message, one-to-one with one element of OpenAI `messages` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&HistoryEntry> for ChatMessage {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            role: entry.role.into(),
            content: entry.content.clone(),
        }
    }
}

/// Default persona: a seal counsellor that answers politely, says plainly when it does not know,
/// and adds medical/psychological perspective.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "あなたはあざらしGPTです。あざらしとして振る舞いながら、ユーザーをカウンセリングしてください。ユーザーのメッセージに丁寧に答えてください。分からないことや曖昧なことは、わからないとはっきり伝えましょう。医学的･心理学見地からもアドバイスを行ってください。";

/// Appended to the system instruction when the user turn carries search results.
pub const SEARCH_CONTEXT_INSTRUCTION: &str = "ユーザーのメッセージに参考情報（Web検索結果）が付いている場合は、その内容を自然に回答へ取り入れてください。検索したことや参考情報の存在には触れないでください。";

/// Heading of the search block inside the current user turn.
pub const SECTION_SEARCH: &str = "参考情報（Web検索結果）:";

/// System instruction for one request: `base`, plus the search instruction when `with_search`.
pub fn system_instruction(base: &str, with_search: bool) -> String {
    if with_search {
        format!("{}\n\n{}", base, SEARCH_CONTEXT_INSTRUCTION)
    } else {
        base.to_string()
    }
}

/// Current user turn: the message itself, followed by the search block if `search_context` is
/// non-empty.
pub fn augment_user_turn(user_message: &str, search_context: Option<&str>) -> String {
    match search_context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!("{}\n\n{}\n{}", user_message, SECTION_SEARCH, context),
        None => user_message.to_string(),
    }
}

/// Builds the full message list: System → history (oldest first) → current user turn.
///
/// # Arguments
///
/// * `system_message` - Base persona instruction
/// * `history` - Stored conversation, already in chronological order
/// * `user_message` - Current user text
/// * `search_context` - Formatted search results; `None` or blank means no augmentation
pub fn build_chat_messages(
    system_message: &str,
    history: &[HistoryEntry],
    user_message: &str,
    search_context: Option<&str>,
) -> Vec<ChatMessage> {
    let with_search = search_context.is_some_and(|c| !c.trim().is_empty());

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_instruction(
        system_message,
        with_search,
    )));
    messages.extend(history.iter().map(ChatMessage::from));
    messages.push(ChatMessage::user(augment_user_turn(
        user_message,
        search_context,
    )));
    messages
}
