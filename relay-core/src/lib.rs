//! # relay-core
//!
//! Core types shared by the relay crates: conversation [`Role`] and [`HistoryEntry`], the outbound
//! [`ReplyMessage`], the [`ReplyClient`] delivery primitive (with the LINE Messaging API
//! implementation), and tracing initialization. Used by storage, llm-client, webhook and relay-server.

pub mod error;
pub mod logger;
pub mod reply;
pub mod types;

pub use error::{RelayError, Result};
pub use logger::{init_tracing, open_log_file, DEFAULT_LOG_FILTER};
pub use reply::{truncate_reply_text, LineReplyClient, ReplyClient, LINE_MAX_TEXT_CHARS};
pub use types::{HistoryEntry, ReplyMessage, Role};
