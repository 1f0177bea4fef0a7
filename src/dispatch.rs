use anyhow::anyhow;
use log::{debug, info, warn};

use crate::{
    bot::Bot,
    message::{Mention, MessageEvent},
    provider::{AnswerProvider, Metadata, ProviderResponse},
    router,
};

/// Handles one incoming message: answers it in-thread when it mentions the
/// bot, and does nothing otherwise.
pub async fn handle_message_event<B: Bot + ?Sized>(bot: &B, msg: MessageEvent) -> anyhow::Result<()> {
    if msg.user.as_deref() == Some(bot.bot_id()) {
        debug!("Ignoring own message {}", msg.ts);
        return Ok(());
    }

    let Some(mention) = router::route(&msg, bot.bot_id()) else {
        debug!("Message {} in {} is not addressed to the bot", msg.ts, msg.channel);
        return Ok(());
    };

    info!(
        "Mentioned in {} (thread {}), asking {}",
        mention.channel,
        mention.thread_id,
        bot.provider().name()
    );

    let text = answer(bot.provider(), &mention).await;

    let resp = bot
        .send_message(&mention.channel, &text, Some(&mention.ts))
        .await?;

    if !resp.ok {
        return Err(anyhow!(
            "chat.postMessage failed - {}",
            resp.error.unwrap_or_default()
        ));
    }

    Ok(())
}

/// Asks the provider about a mention. Provider failures become the reply.
pub async fn answer(provider: &dyn AnswerProvider, mention: &Mention) -> String {
    let metadata = Metadata::from([("thread_id".to_string(), mention.thread_id.clone())]);

    let response = match provider.answer(&mention.query, &metadata).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Answer provider {} failed - {}", provider.name(), e);
            ProviderResponse::failure(e.to_string())
        }
    };

    response.into_reply_text()
}
