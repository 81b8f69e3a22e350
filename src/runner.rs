//! Telegram runtime: wiring and the dispatcher tree.

use crate::bot::client::TelegramApi;
use crate::bot::handlers::{
    handle_channel_post, handle_link_command, handle_private_media, AppContext, Command,
    ReplyTarget,
};
use crate::bot::notify::OwnerNotifier;
use crate::bot::pipeline::LinkPipeline;
use crate::bot::resilient::ResilientClient;
use crate::bot::teloxide_client::{media_item_from, request_from, TeloxideClient};
use crate::bot::MessageCache;
use crate::config::Settings;
use crate::gate::SettingsGate;
use crate::links::BaseUrlLinkGenerator;
use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Run the Telegram runtime until Ctrl+C.
///
/// # Errors
///
/// Returns an error if the bot cannot reach Telegram at startup or the stream base
/// URL is invalid.
pub async fn run_bot(settings: Arc<Settings>) -> Result<()> {
    let bot = Bot::new(settings.telegram_token.clone());
    let cache = init_message_cache(&settings);

    let api = TeloxideClient::connect(bot.clone(), cache.clone())
        .await
        .context("Failed to reach Telegram")?;
    let cancel = CancellationToken::new();
    let client = ResilientClient::new(Arc::new(api) as Arc<dyn TelegramApi>, cancel.clone());

    let ctx = Arc::new(init_context(client, &settings)?);
    let handler = setup_handler();

    info!(bin_channel = settings.bin_channel, "Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx, cache])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    // Abort flood waits of batches still in flight
    cancel.cancel();
    info!("Bot stopped");
    Ok(())
}

fn init_message_cache(settings: &Settings) -> MessageCache {
    info!(
        ttl_secs = settings.message_cache_ttl_secs,
        max_size = settings.message_cache_max_size,
        "Initializing seen-message cache"
    );
    MessageCache::new(
        settings.message_cache_ttl_secs,
        settings.message_cache_max_size,
    )
}

fn init_context(client: ResilientClient, settings: &Settings) -> Result<AppContext> {
    let links = BaseUrlLinkGenerator::new(&settings.stream_base_url)
        .context("Failed to initialize link generator")?;
    let owners = settings.owner_ids();
    if owners.is_empty() {
        info!("No owners configured; operator alerts go to the log only");
    }
    let notifier = OwnerNotifier::new(client.clone(), owners);
    let gate = SettingsGate::new(client.clone(), settings);
    let pipeline = LinkPipeline::new(
        client,
        Arc::new(links),
        Arc::new(notifier),
        settings.bin_channel,
    );
    Ok(AppContext::new(
        pipeline,
        Arc::new(gate),
        settings.bin_channel,
        settings.max_batch_size,
    ))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .inspect_async(remember_media)
                .branch(
                    dptree::filter(|msg: Message| !msg.chat.is_private())
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| {
                        msg.chat.is_private() && media_item_from(&msg).is_some()
                    })
                    .endpoint(handle_private_upload),
                ),
        )
        .branch(
            Update::filter_channel_post()
                .inspect_async(remember_media)
                .endpoint(handle_channel_upload),
        )
}

/// Record every media message so later batches can find it
async fn remember_media(msg: Message, cache: MessageCache) {
    if let Some(item) = media_item_from(&msg) {
        cache.record(item).await;
    }
    if let Some(item) = msg.reply_to_message().and_then(media_item_from) {
        cache.record(item).await;
    }
}

async fn handle_command(
    msg: Message,
    cmd: Command,
    ctx: Arc<AppContext>,
) -> Result<(), teloxide::RequestError> {
    let Command::Link(arg) = cmd;
    let reply = msg.reply_to_message().map(|replied| ReplyTarget {
        message_id: replied.id.0,
        media: media_item_from(replied),
    });

    // Batch tasks are detached; they report through the status message
    if let Err(e) = handle_link_command(&ctx, request_from(&msg), reply, &arg).await {
        error!(chat_id = msg.chat.id.0, error = %e, "Link command error");
    }
    respond(())
}

async fn handle_private_upload(
    msg: Message,
    ctx: Arc<AppContext>,
) -> Result<(), teloxide::RequestError> {
    if let Some(media) = media_item_from(&msg) {
        if let Err(e) = handle_private_media(&ctx, request_from(&msg), media).await {
            error!(chat_id = msg.chat.id.0, error = %e, "Private upload error");
        }
    }
    respond(())
}

async fn handle_channel_upload(
    msg: Message,
    ctx: Arc<AppContext>,
) -> Result<(), teloxide::RequestError> {
    // Only files that can be streamed are taken from channels
    let streamable = msg.document().is_some() || msg.video().is_some() || msg.audio().is_some();
    if streamable {
        if let Some(media) = media_item_from(&msg) {
            handle_channel_post(&ctx, request_from(&msg), media).await;
        }
    }
    respond(())
}
