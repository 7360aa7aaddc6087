//! Bot orchestration through the public API
//!
//! In-memory transport and generator doubles drive `StickerBot` the way a
//! chat platform adapter would.

mod common;

use async_trait::async_trait;
use common::{encode_png, subject_on_backdrop};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use stickerbot::{
    bot::{
        ChannelFilter, ChatId, ChatKind, ChatTransport, GeneratedImage, GenerationParams,
        GenerationService, IncomingMessage, ReplyTarget, StickerBot, UserId,
    },
    BotConfig, PipelineConfig, Result, StickerAsset, StickerError, StickerPipeline,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

#[derive(Default)]
struct RecordingTransport {
    messages: Mutex<Vec<(ReplyTarget, String)>>,
    stickers: Mutex<Vec<(ReplyTarget, Vec<u8>)>>,
    admins: HashSet<UserId>,
}

impl RecordingTransport {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }

    fn sticker_count(&self) -> usize {
        self.stickers.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(&self, target: &ReplyTarget, text: &str) -> Result<()> {
        self.messages.lock().unwrap().push((*target, text.to_string()));
        Ok(())
    }

    async fn send_sticker(&self, target: &ReplyTarget, sticker: &StickerAsset) -> Result<()> {
        self.stickers.lock().unwrap().push((*target, sticker.bytes.clone()));
        Ok(())
    }

    async fn is_admin(&self, _chat: ChatId, user: UserId) -> Result<bool> {
        Ok(self.admins.contains(&user))
    }
}

/// Returns one sticker-ready image per requested slot
struct StaticGenerator {
    image: Vec<u8>,
    prompts: Mutex<Vec<String>>,
}

impl StaticGenerator {
    fn new() -> Self {
        Self {
            image: encode_png(&subject_on_backdrop(640, 640, 160, 160, 480, 480)),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl GenerationService for StaticGenerator {
    async fn submit_generation_job(&self, params: GenerationParams) -> Result<Vec<GeneratedImage>> {
        self.prompts.lock().unwrap().push(params.prompt.clone());
        Ok((0..params.count)
            .map(|_| GeneratedImage::Bytes(self.image.clone()))
            .collect())
    }
}

/// Always hands back URLs nobody serves
struct UnreachableUrlGenerator;

#[async_trait]
impl GenerationService for UnreachableUrlGenerator {
    async fn submit_generation_job(&self, params: GenerationParams) -> Result<Vec<GeneratedImage>> {
        Ok((0..params.count)
            .map(|i| GeneratedImage::Url(format!("http://127.0.0.1:9/{i}.png")))
            .collect())
    }
}

struct DownGenerator;

#[async_trait]
impl GenerationService for DownGenerator {
    async fn submit_generation_job(&self, _params: GenerationParams) -> Result<Vec<GeneratedImage>> {
        Err(StickerError::generation("503 from upstream"))
    }
}

fn pipeline() -> Arc<StickerPipeline> {
    Arc::new(StickerPipeline::new(PipelineConfig::default()).unwrap())
}

#[tokio::test]
async fn test_private_request_delivers_valid_stickers() {
    let transport = Arc::new(RecordingTransport::default());
    let generator = Arc::new(StaticGenerator::new());
    let bot = StickerBot::new(
        transport.clone(),
        generator.clone(),
        pipeline(),
        BotConfig::default(),
        ChannelFilter::in_memory(),
    )
    .unwrap();

    bot.handle_message(&IncomingMessage::private(7, "!generate a red square (2)"))
        .await
        .unwrap();
    let report = bot.run_next_job().await.unwrap();

    assert_eq!(report.delivered, 2);
    assert_eq!(generator.prompts.lock().unwrap().as_slice(), ["a red square"]);
    for (target, bytes) in transport.stickers.lock().unwrap().iter() {
        assert_eq!(*target, ReplyTarget::chat(7));
        assert!(bytes.len() <= 512 * 1024);
        let decoded = image::load_from_memory(bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (512, 512));
    }
    assert_eq!(
        transport.messages(),
        vec![
            "Generating stickers for: a red square".to_string(),
            "Here you go! Right-click / long press to save them!".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_unreachable_urls_are_skipped_per_image() {
    let transport = Arc::new(RecordingTransport::default());
    let bot = StickerBot::new(
        transport.clone(),
        Arc::new(UnreachableUrlGenerator),
        pipeline(),
        BotConfig {
            fetch_timeout_secs: 2,
            ..BotConfig::default()
        },
        ChannelFilter::in_memory(),
    )
    .unwrap();

    bot.handle_message(&IncomingMessage::group(-100, 3, "!imagine owls"))
        .await
        .unwrap();
    let report = bot.run_next_job().await.unwrap();

    assert_eq!(report.generated, 3);
    assert_eq!(report.skipped, 3);
    assert_eq!(transport.sticker_count(), 0);
    let skips = transport
        .messages()
        .iter()
        .filter(|m| m.ends_with("took too long or failed to process. Skipping it..."))
        .count();
    assert_eq!(skips, 3);
}

#[tokio::test]
async fn test_generation_outage_is_reported_once() {
    let transport = Arc::new(RecordingTransport::default());
    let bot = StickerBot::new(
        transport.clone(),
        Arc::new(DownGenerator),
        pipeline(),
        BotConfig::default(),
        ChannelFilter::in_memory(),
    )
    .unwrap();

    bot.handle_message(&IncomingMessage::private(1, "!generate x")).await.unwrap();
    let report = bot.run_next_job().await.unwrap();
    assert!(report.error.is_some());
    assert_eq!(
        transport.messages().last().map(String::as_str),
        Some("An error occurred. Please try again later.")
    );

    // the user can ask again right away
    bot.handle_message(&IncomingMessage::private(1, "!generate y")).await.unwrap();
    assert_eq!(
        transport.messages().last().map(String::as_str),
        Some("Generating stickers for: y")
    );
}

#[tokio::test]
async fn test_channel_rules_persist_across_restarts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("channel_config.json");
    let transport = Arc::new(RecordingTransport {
        admins: [1].into_iter().collect(),
        ..RecordingTransport::default()
    });

    {
        let bot = StickerBot::new(
            transport.clone(),
            Arc::new(StaticGenerator::new()),
            pipeline(),
            BotConfig::default(),
            ChannelFilter::load(&path).unwrap(),
        )
        .unwrap();
        bot.handle_message(&IncomingMessage::group(-42, 1, "/addblacklist gore,spam"))
            .await
            .unwrap();
    }
    assert!(path.exists());

    let bot = StickerBot::new(
        transport.clone(),
        Arc::new(StaticGenerator::new()),
        pipeline(),
        BotConfig::default(),
        ChannelFilter::load(&path).unwrap(),
    )
    .unwrap();
    bot.handle_message(&IncomingMessage::group(-42, 2, "!generate Spam sandwich"))
        .await
        .unwrap();
    assert_eq!(
        transport.messages().last().map(String::as_str),
        Some("You can't use blacklisted words in your prompt. Please try again.")
    );

    // other chats are unaffected
    bot.handle_message(&IncomingMessage::group(-43, 2, "!generate spam sandwich"))
        .await
        .unwrap();
    assert_eq!(
        transport.messages().last().map(String::as_str),
        Some("Generating stickers for: spam sandwich")
    );
}

#[tokio::test]
async fn test_event_loop_serves_queue_in_order() {
    let transport = Arc::new(RecordingTransport::default());
    let generator = Arc::new(StaticGenerator::new());
    let bot = Arc::new(
        StickerBot::new(
            transport.clone(),
            generator.clone(),
            pipeline(),
            BotConfig {
                default_batch_size: 1,
                ..BotConfig::default()
            },
            ChannelFilter::in_memory(),
        )
        .unwrap(),
    );

    let (tx, rx) = mpsc::channel(16);
    let runner = tokio::spawn(Arc::clone(&bot).run(rx));
    for (user, prompt) in [(1, "first"), (2, "second"), (3, "third")] {
        tx.send(IncomingMessage {
            chat_id: -5,
            chat_kind: ChatKind::Group,
            user_id: user,
            thread_id: None,
            text: format!("!generate {prompt}"),
        })
        .await
        .unwrap();
    }
    drop(tx);
    runner.await.unwrap();

    assert_eq!(transport.sticker_count(), 3);
    assert_eq!(
        generator.prompts.lock().unwrap().as_slice(),
        ["first", "second", "third"]
    );
}
