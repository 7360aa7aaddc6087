use super::{
    command::{parse_command, Command, ListKind},
    filter::{ChannelFilter, PromptVerdict},
    queue::{EnqueueOutcome, QueuedRequest, RequestQueue},
    ChatKind, ChatTransport, GeneratedImage, GenerationParams, GenerationService,
    IncomingMessage, ReplyTarget, UserId,
};
use crate::{
    config::BotConfig,
    error::{Result, StickerError},
    pipeline::StickerPipeline,
    services::ImageFetcher,
    types::StickerAsset,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, error, info, instrument, warn};

const GREETING: &str =
    "Hello, I am a sticker bot! Type /start to get started, or use \"!generate Your prompt...\"!";
const START_TEXT: &str =
    "Good day! What would you like me to create a sticker of? Use \"!generate Your prompt...\"!";
const HELP_TEXT: &str = "\
Available commands:
/help - Show this help message
/start - Basic start message
!generate <prompt> (or !imagine <prompt>) - Generate stickers
!repeat - Generate again with your last prompt

/addwhitelist a,b - Add comma-separated words to this channel's whitelist (admin-only)
/addblacklist a,b - Add comma-separated words to this channel's blacklist (admin-only)
/clearwhitelist - Clear this channel's whitelist (admin-only)
/clearblacklist - Clear this channel's blacklist (admin-only)
/listwhitelist - Show the channel's current whitelist
/listblacklist - Show the channel's current blacklist (admin-only)

Whitelist means the prompt must contain at least one of these words.
Blacklist means the prompt must contain none of those words.";
const NOT_ALLOWED: &str = "You are not allowed to use that command.";
const ALREADY_PENDING: &str =
    "You already have a pending request. Please wait until it's processed. Thank you for your patience!";
const EMPTY_PROMPT: &str = "Please add a prompt, for example: !generate a happy frog";
const NO_LAST_PROMPT: &str = "No last prompt found. Please use `!generate [your prompt]` first.";
const UNKNOWN_COMMAND: &str = "Unknown command. Use `!help` to see available commands.";
const BLACKLISTED: &str = "You can't use blacklisted words in your prompt. Please try again.";
const NO_IMAGES: &str =
    "No images were generated, possibly blocked by the NSFW filter. Please try a safer prompt!";
const CLOSING_NOTE: &str = "Here you go! Right-click / long press to save them!";
const GENERIC_FAILURE: &str = "An error occurred. Please try again later.";

/// Summary of one processed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub user_id: UserId,
    pub requested: u32,
    /// Images the generation service returned
    pub generated: usize,
    /// Stickers sent to the chat
    pub delivered: usize,
    /// Images skipped after a timeout or processing failure
    pub skipped: usize,
    /// Set when the job failed as a whole
    pub error: Option<String>,
}

/// Queue-driven sticker bot
pub struct StickerBot {
    transport: Arc<dyn ChatTransport>,
    generator: Arc<dyn GenerationService>,
    pipeline: Arc<StickerPipeline>,
    fetcher: ImageFetcher,
    config: BotConfig,
    bot_username: Option<String>,
    queue: Mutex<RequestQueue>,
    filter: Mutex<ChannelFilter>,
    last_prompts: Mutex<HashMap<UserId, String>>,
    wake: Notify,
}

impl StickerBot {
    /// # Errors
    /// Invalid bot configuration or HTTP client construction failure.
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        generator: Arc<dyn GenerationService>,
        pipeline: Arc<StickerPipeline>,
        config: BotConfig,
        filter: ChannelFilter,
    ) -> Result<Self> {
        config.validate()?;
        let fetcher = ImageFetcher::new(Duration::from_secs(config.fetch_timeout_secs))?;
        Ok(Self {
            transport,
            generator,
            pipeline,
            fetcher,
            config,
            bot_username: None,
            queue: Mutex::new(RequestQueue::new()),
            filter: Mutex::new(filter),
            last_prompts: Mutex::new(HashMap::new()),
            wake: Notify::new(),
        })
    }

    /// Handle used to recognise @mentions in group greetings
    #[must_use]
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    #[must_use]
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// React to one incoming message; generation requests are only queued here
    ///
    /// # Errors
    /// `Transport` when a reply cannot be sent.
    #[instrument(skip(self, message), fields(chat = message.chat_id, user = message.user_id))]
    pub async fn handle_message(&self, message: &IncomingMessage) -> Result<()> {
        let Some(command) = parse_command(&message.text, self.bot_username.as_deref()) else {
            return Ok(());
        };
        let target = message.reply_target();
        debug!(?command, "Parsed command");

        match command {
            Command::Greeting { mentioned } => {
                if message.chat_kind == ChatKind::Private || mentioned {
                    self.reply(&target, GREETING).await?;
                }
            },
            Command::Start => self.reply(&target, START_TEXT).await?,
            Command::Help => self.reply(&target, HELP_TEXT).await?,
            Command::Unknown(_) => self.reply(&target, UNKNOWN_COMMAND).await?,
            Command::Generate { prompt, count } => {
                self.submit(message, &prompt, count, false).await?;
            },
            Command::Repeat => {
                let last = self.last_prompts.lock().await.get(&message.user_id).cloned();
                match last {
                    Some(prompt) => self.submit(message, &prompt, None, true).await?,
                    None => self.reply(&target, NO_LAST_PROMPT).await?,
                }
            },
            Command::AddWords { list, words } => self.add_words(message, list, &words).await?,
            Command::ClearWords(list) => self.clear_words(message, list).await?,
            Command::ListWords(list) => self.list_words(message, list).await?,
        }
        Ok(())
    }

    async fn submit(
        &self,
        message: &IncomingMessage,
        prompt: &str,
        count: Option<u32>,
        repeat: bool,
    ) -> Result<()> {
        let target = message.reply_target();
        if prompt.is_empty() {
            return self.reply(&target, EMPTY_PROMPT).await;
        }

        if message.chat_kind.is_group() {
            let verdict = self.filter.lock().await.validate_prompt(message.chat_id, prompt);
            match verdict {
                PromptVerdict::Allowed => {},
                PromptVerdict::Blacklisted => return self.reply(&target, BLACKLISTED).await,
                PromptVerdict::MissingWhitelist(words) => {
                    let text = format!(
                        "You must include at least one of the following whitelisted words: {}.",
                        words.join(", ")
                    );
                    return self.reply(&target, &text).await;
                },
            }
        }

        let batch_size = self.batch_size(message, &target, count);
        let request = QueuedRequest::new(message.user_id, target, prompt, batch_size);
        let outcome = self.queue.lock().await.enqueue(request);

        match outcome {
            EnqueueOutcome::AlreadyPending => self.reply(&target, ALREADY_PENDING).await,
            EnqueueOutcome::Accepted { position, busy } => {
                info!(user = message.user_id, prompt, batch_size, position, "Request queued");
                self.last_prompts
                    .lock()
                    .await
                    .insert(message.user_id, prompt.to_string());

                let suffix = if repeat { " [repeat]" } else { "" };
                let text = if busy {
                    format!("Your request is queued. You are number {position} in the queue.")
                } else {
                    format!("Generating stickers for: {prompt}{suffix}")
                };
                // acknowledge before the worker can start delivering
                let acknowledged = self.reply(&target, &text).await;
                self.wake.notify_one();
                acknowledged
            },
        }
    }

    fn batch_size(&self, message: &IncomingMessage, target: &ReplyTarget, count: Option<u32>) -> u32 {
        if target.is_thread() {
            return self.config.thread_batch_size;
        }
        match (message.chat_kind, count) {
            (ChatKind::Private, Some(n)) => n.clamp(1, self.config.max_batch_size),
            _ => self.config.default_batch_size,
        }
    }

    async fn require_admin(&self, message: &IncomingMessage) -> Result<bool> {
        let admin = match self.transport.is_admin(message.chat_id, message.user_id).await {
            Ok(admin) => admin,
            Err(e) => {
                warn!("Admin lookup failed: {}", e);
                false
            },
        };
        if !admin {
            self.reply(&message.reply_target(), NOT_ALLOWED).await?;
        }
        Ok(admin)
    }

    async fn add_words(&self, message: &IncomingMessage, list: ListKind, words: &str) -> Result<()> {
        if message.chat_kind == ChatKind::Private || !self.require_admin(message).await? {
            return Ok(());
        }
        let target = message.reply_target();
        let result = self.filter.lock().await.add_words(message.chat_id, list, words);
        let text = match result {
            Ok(added) if added.is_empty() => {
                "No new words were added (maybe they already exist?).".to_string()
            },
            Ok(added) => format!("Added to {}: {}", list, added.join(", ")),
            Err(StickerError::InvalidConfig(_)) => format!(
                "Please separate your words with commas only (no spaces). Example: /add{list} cat,dog"
            ),
            Err(e) => return Err(e),
        };
        self.reply(&target, &text).await
    }

    async fn clear_words(&self, message: &IncomingMessage, list: ListKind) -> Result<()> {
        if message.chat_kind == ChatKind::Private || !self.require_admin(message).await? {
            return Ok(());
        }
        self.filter.lock().await.clear(message.chat_id, list)?;
        let text = match list {
            ListKind::Whitelist => "Whitelist cleared.",
            ListKind::Blacklist => "Blacklist cleared.",
        };
        self.reply(&message.reply_target(), text).await
    }

    async fn list_words(&self, message: &IncomingMessage, list: ListKind) -> Result<()> {
        if list == ListKind::Blacklist && !self.require_admin(message).await? {
            return Ok(());
        }
        let words = self.filter.lock().await.words(message.chat_id, list).to_vec();
        let text = if words.is_empty() {
            format!("No words are currently {list}ed in this channel.")
        } else {
            format!("Current {} words:\n• {}", list, words.join("\n• "))
        };
        self.reply(&message.reply_target(), &text).await
    }

    /// Process the oldest queued request, if nothing else is in flight
    ///
    /// The user's pending slot is released whatever happens to the job.
    pub async fn run_next_job(&self) -> Option<JobReport> {
        let request = self.queue.lock().await.begin_next()?;
        info!(
            user = request.user_id,
            prompt = %request.prompt,
            waited_ms = (chrono::Utc::now() - request.enqueued_at).num_milliseconds(),
            "Processing request"
        );

        let outcome = self.process_request(&request).await;
        self.queue.lock().await.finish(request.user_id);

        match outcome {
            Ok(report) => {
                info!(
                    user = report.user_id,
                    delivered = report.delivered,
                    skipped = report.skipped,
                    "Request finished"
                );
                Some(report)
            },
            Err(e) => {
                error!(user = request.user_id, "Error processing request: {}", e);
                if let Err(send_err) = self.reply(&request.target, GENERIC_FAILURE).await {
                    warn!("Could not report failure to chat: {}", send_err);
                }
                Some(JobReport {
                    user_id: request.user_id,
                    requested: request.batch_size,
                    generated: 0,
                    delivered: 0,
                    skipped: 0,
                    error: Some(e.to_string()),
                })
            },
        }
    }

    /// Run queued requests until the queue is empty
    pub async fn drain_queue(&self) -> Vec<JobReport> {
        let mut reports = Vec::new();
        while let Some(report) = self.run_next_job().await {
            reports.push(report);
        }
        reports
    }

    async fn has_outstanding_work(&self) -> bool {
        let queue = self.queue.lock().await;
        queue.is_busy() || !queue.is_empty()
    }

    /// Event loop: handle messages as they arrive while a worker drains the queue
    ///
    /// Returns once the message channel closes and queued work is finished.
    pub async fn run(self: Arc<Self>, mut messages: mpsc::Receiver<IncomingMessage>) {
        let worker = {
            let bot = Arc::clone(&self);
            tokio::spawn(async move {
                loop {
                    bot.wake.notified().await;
                    bot.drain_queue().await;
                }
            })
        };

        while let Some(message) = messages.recv().await {
            if let Err(e) = self.handle_message(&message).await {
                warn!(chat = message.chat_id, "Failed to handle message: {}", e);
            }
        }

        while self.has_outstanding_work().await {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        worker.abort();
        info!("Message stream closed, bot stopped");
    }

    async fn process_request(&self, request: &QueuedRequest) -> Result<JobReport> {
        let target = request.target;
        let images = self
            .generator
            .submit_generation_job(GenerationParams {
                prompt: request.prompt.clone(),
                count: request.batch_size,
            })
            .await?;

        let mut report = JobReport {
            user_id: request.user_id,
            requested: request.batch_size,
            generated: images.len(),
            delivered: 0,
            skipped: 0,
            error: None,
        };

        if images.is_empty() {
            self.reply(&target, NO_IMAGES).await?;
            return Ok(report);
        }

        let requested = request.batch_size as usize;
        if images.len() < requested {
            let removed = requested - images.len();
            let text = format!(
                "We generated {} out of {} images. {} image{} removed because {} the NSFW filter. Please try again.",
                images.len(),
                requested,
                removed,
                if removed > 1 { "s were" } else { " was" },
                if removed > 1 { "they triggered" } else { "it triggered" },
            );
            self.reply(&target, &text).await?;
        }

        let deadline = self.pipeline.config().per_image_timeout();
        for (index, image) in images.into_iter().enumerate() {
            let delivered = match tokio::time::timeout(deadline, self.deliver(&target, image)).await {
                Ok(result) => result,
                Err(_) => Err(StickerError::timeout(deadline)),
            };
            match delivered {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Image #{} failed: {}", index + 1, e);
                    report.skipped += 1;
                    let text = format!(
                        "Image #{} took too long or failed to process. Skipping it...",
                        index + 1
                    );
                    self.reply(&target, &text).await?;
                },
            }
        }

        if !target.is_thread() {
            self.reply(&target, CLOSING_NOTE).await?;
        }
        Ok(report)
    }

    async fn deliver(&self, target: &ReplyTarget, image: GeneratedImage) -> Result<()> {
        let bytes = match image {
            GeneratedImage::Bytes(bytes) => bytes,
            GeneratedImage::Url(url) => self.fetcher.fetch(&url).await?,
        };
        let sticker: StickerAsset = self.pipeline.process_async(bytes).await?;
        self.transport.send_sticker(target, &sticker).await
    }

    async fn reply(&self, target: &ReplyTarget, text: &str) -> Result<()> {
        self.transport.send_message(target, text).await
    }
}
