//! Chat front end that turns prompts into stickers
//!
//! The platform client and the image generation service stay behind the
//! [`ChatTransport`] and [`GenerationService`] traits. [`StickerBot`] owns the
//! request queue and channel filter, and runs every generated image through
//! the shared [`crate::StickerPipeline`].

pub mod command;
pub mod filter;
pub mod queue;
mod runner;

pub use command::{parse_command, Command, ListKind};
pub use filter::{contains_whole_word, parse_word_list, ChannelFilter, ChannelRules, PromptVerdict};
pub use queue::{EnqueueOutcome, QueuedRequest, RequestQueue};
pub use runner::{JobReport, StickerBot};

use crate::{error::Result, types::StickerAsset};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type ChatId = i64;
pub type UserId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Group chats are subject to channel word filters
    #[must_use]
    pub fn is_group(self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// Where a reply goes: a chat, optionally a forum thread inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplyTarget {
    pub chat_id: ChatId,
    pub thread_id: Option<i32>,
}

impl ReplyTarget {
    #[must_use]
    pub fn chat(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            thread_id: None,
        }
    }

    #[must_use]
    pub fn thread(chat_id: ChatId, thread_id: i32) -> Self {
        Self {
            chat_id,
            thread_id: Some(thread_id),
        }
    }

    #[must_use]
    pub fn is_thread(&self) -> bool {
        self.thread_id.is_some()
    }
}

/// A text message delivered by the platform client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub user_id: UserId,
    /// Forum topic id; only honoured in supergroups
    pub thread_id: Option<i32>,
    pub text: String,
}

impl IncomingMessage {
    #[must_use]
    pub fn private(user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            chat_id: user_id as ChatId,
            chat_kind: ChatKind::Private,
            user_id,
            thread_id: None,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn group(chat_id: ChatId, user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            chat_kind: ChatKind::Group,
            user_id,
            thread_id: None,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn reply_target(&self) -> ReplyTarget {
        match (self.chat_kind, self.thread_id) {
            (ChatKind::Supergroup, Some(thread)) => ReplyTarget::thread(self.chat_id, thread),
            _ => ReplyTarget::chat(self.chat_id),
        }
    }
}

/// Parameters of one generation job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    /// Number of images requested
    pub count: u32,
}

/// One image returned by the generation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    /// Must be fetched before processing
    Url(String),
    Bytes(Vec<u8>),
}

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// # Errors
    /// `Transport` when the platform rejects or drops the message.
    async fn send_message(&self, target: &ReplyTarget, text: &str) -> Result<()>;

    /// # Errors
    /// `Transport` when the upload fails.
    async fn send_sticker(&self, target: &ReplyTarget, sticker: &StickerAsset) -> Result<()>;

    /// Whether `user` administers `chat`; lookup failures should map to `Ok(false)`
    ///
    /// # Errors
    /// Reserved for transport failures the caller should log; treated as "not an admin".
    async fn is_admin(&self, chat: ChatId, user: UserId) -> Result<bool>;
}

/// Hosted image generation
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Submit a job and wait for its images
    ///
    /// Fewer images than requested (possibly zero) means some were withheld
    /// by the service's content filter.
    ///
    /// # Errors
    /// `Generation` when the job cannot be submitted or completed.
    async fn submit_generation_job(&self, params: GenerationParams) -> Result<Vec<GeneratedImage>>;
}
