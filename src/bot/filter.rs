//! Per-channel prompt whitelist/blacklist with JSON persistence

use super::{command::ListKind, ChatId};
use crate::error::{Result, StickerError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Word lists of one chat
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelRules {
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
}

impl ChannelRules {
    fn list(&self, kind: ListKind) -> &[String] {
        match kind {
            ListKind::Whitelist => &self.whitelist,
            ListKind::Blacklist => &self.blacklist,
        }
    }

    fn list_mut(&mut self, kind: ListKind) -> &mut Vec<String> {
        match kind {
            ListKind::Whitelist => &mut self.whitelist,
            ListKind::Blacklist => &mut self.blacklist,
        }
    }
}

/// Outcome of checking a prompt against a chat's rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptVerdict {
    Allowed,
    Blacklisted,
    /// A whitelist exists and none of its words appear
    MissingWhitelist(Vec<String>),
}

/// Split a `/add…list` argument into lowercase words
///
/// # Errors
/// `InvalidConfig` when the argument contains whitespace; lists are comma-separated only.
pub fn parse_word_list(raw: &str) -> Result<Vec<String>> {
    let raw = raw.trim();
    if raw.chars().any(char::is_whitespace) {
        return Err(StickerError::invalid_config(
            "words must be separated by commas only (no spaces)",
        ));
    }
    Ok(raw
        .split(',')
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Case-insensitive whole-word search
#[must_use]
pub fn contains_whole_word(text: &str, word: &str) -> bool {
    let word = word.to_lowercase();
    if word.is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    text.match_indices(&word).any(|(start, matched)| {
        let before_ok = text
            .get(..start)
            .and_then(|s| s.chars().next_back())
            .map_or(true, |c| !is_word_char(c));
        let after_ok = text
            .get(start + matched.len()..)
            .and_then(|s| s.chars().next())
            .map_or(true, |c| !is_word_char(c));
        before_ok && after_ok
    })
}

/// All channels' rules, optionally backed by a JSON file
#[derive(Debug, Default)]
pub struct ChannelFilter {
    path: Option<PathBuf>,
    channels: BTreeMap<String, ChannelRules>,
}

impl ChannelFilter {
    /// In-memory filter that never touches disk
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing file yields an empty filter bound to that path
    ///
    /// # Errors
    /// `Io` when the file exists but cannot be read, `Serialization` on malformed JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let channels = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| StickerError::file_io_error("read channel config", path, &e))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            log::info!("No channel config at {}, starting empty", path.display());
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            channels,
        })
    }

    /// Persist as pretty JSON; no-op for in-memory filters
    ///
    /// # Errors
    /// `Serialization` or `Io`.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(&self.channels)?;
        std::fs::write(path, content)
            .map_err(|e| StickerError::file_io_error("write channel config", path, &e))
    }

    #[must_use]
    pub fn rules(&self, chat: ChatId) -> Option<&ChannelRules> {
        self.channels.get(&chat.to_string())
    }

    #[must_use]
    pub fn words(&self, chat: ChatId, kind: ListKind) -> &[String] {
        self.rules(chat).map(|rules| rules.list(kind)).unwrap_or(&[])
    }

    /// Check a prompt; the blacklist wins over the whitelist
    #[must_use]
    pub fn validate_prompt(&self, chat: ChatId, prompt: &str) -> PromptVerdict {
        let Some(rules) = self.rules(chat) else {
            return PromptVerdict::Allowed;
        };
        if rules.blacklist.iter().any(|w| contains_whole_word(prompt, w)) {
            return PromptVerdict::Blacklisted;
        }
        if !rules.whitelist.is_empty()
            && !rules.whitelist.iter().any(|w| contains_whole_word(prompt, w))
        {
            return PromptVerdict::MissingWhitelist(rules.whitelist.clone());
        }
        PromptVerdict::Allowed
    }

    /// Add words and persist; returns only the words that were new
    ///
    /// # Errors
    /// `InvalidConfig` for a malformed word list; `Io` if persisting fails.
    pub fn add_words(&mut self, chat: ChatId, kind: ListKind, raw: &str) -> Result<Vec<String>> {
        let words = parse_word_list(raw)?;
        let list = self
            .channels
            .entry(chat.to_string())
            .or_default()
            .list_mut(kind);
        let mut added = Vec::new();
        for word in words {
            if !list.contains(&word) {
                list.push(word.clone());
                added.push(word);
            }
        }
        self.save()?;
        Ok(added)
    }

    /// Empty one list and persist
    ///
    /// # Errors
    /// `Io` if persisting fails.
    pub fn clear(&mut self, chat: ChatId, kind: ListKind) -> Result<()> {
        self.channels
            .entry(chat.to_string())
            .or_default()
            .list_mut(kind)
            .clear();
        self.save()
    }
}
