//! Chat command parsing

/// Which per-channel word list a command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Whitelist,
    Blacklist,
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Whitelist => write!(f, "whitelist"),
            Self::Blacklist => write!(f, "blacklist"),
        }
    }
}

/// A recognised chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// `!generate` / `!imagine`; `count` is a trailing `(N)` suffix, already stripped from `prompt`
    Generate { prompt: String, count: Option<u32> },
    /// Re-run the sender's previous prompt
    Repeat,
    AddWords { list: ListKind, words: String },
    ClearWords(ListKind),
    ListWords(ListKind),
    /// "hi" / "hello"; `mentioned` is set when the bot's @handle appears
    Greeting { mentioned: bool },
    /// A `!`-prefixed word the bot does not know
    Unknown(String),
}

const GENERATE_PREFIXES: &[&str] = &["!generate", "!imagine"];

/// Parse a message; `None` for ordinary chat text
///
/// Slash commands may carry an `@botname` suffix (`/help@stickerbot`).
#[must_use]
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let text = text.trim();
    let mut parts = text.splitn(2, char::is_whitespace);
    let head = parts.next()?.to_lowercase();
    let rest = parts.next().unwrap_or("").trim();

    if let Some(slash) = head.strip_prefix('/') {
        let name = slash.split('@').next().unwrap_or(slash);
        return match name {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "addwhitelist" if !rest.is_empty() => Some(Command::AddWords {
                list: ListKind::Whitelist,
                words: rest.to_string(),
            }),
            "addblacklist" if !rest.is_empty() => Some(Command::AddWords {
                list: ListKind::Blacklist,
                words: rest.to_string(),
            }),
            "clearwhitelist" => Some(Command::ClearWords(ListKind::Whitelist)),
            "clearblacklist" => Some(Command::ClearWords(ListKind::Blacklist)),
            "listwhitelist" => Some(Command::ListWords(ListKind::Whitelist)),
            "listblacklist" => Some(Command::ListWords(ListKind::Blacklist)),
            _ => None,
        };
    }

    if head.starts_with('!') {
        if GENERATE_PREFIXES.contains(&head.as_str()) {
            let (prompt, count) = split_count_suffix(rest);
            return Some(Command::Generate {
                prompt: prompt.to_string(),
                count,
            });
        }
        return match head.as_str() {
            "!repeat" => Some(Command::Repeat),
            "!start" => Some(Command::Start),
            "!help" => Some(Command::Help),
            _ => Some(Command::Unknown(head)),
        };
    }

    let first_word = head.trim_matches(|c: char| !c.is_alphanumeric());
    if matches!(first_word, "hi" | "hello" | "hey") {
        let lower = text.to_lowercase();
        let mentioned = bot_username
            .map(|name| lower.contains(&format!("@{}", name.to_lowercase())))
            .unwrap_or(false);
        return Some(Command::Greeting { mentioned });
    }

    None
}

/// Split a trailing `(N)` off a prompt
fn split_count_suffix(prompt: &str) -> (&str, Option<u32>) {
    let trimmed = prompt.trim_end();
    let Some(without_paren) = trimmed.strip_suffix(')') else {
        return (trimmed, None);
    };
    let Some(open) = without_paren.rfind('(') else {
        return (trimmed, None);
    };
    let digits = without_paren.get(open + 1..).unwrap_or("");
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return (trimmed, None);
    }
    match digits.parse::<u32>() {
        Ok(count) => (without_paren.get(..open).unwrap_or("").trim_end(), Some(count)),
        // absurdly long digit runs saturate
        Err(_) => (without_paren.get(..open).unwrap_or("").trim_end(), Some(u32::MAX)),
    }
}
