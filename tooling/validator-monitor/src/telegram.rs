//! Inbound side of the bot: slash commands and keyboard presses.
//!
//! Messages and button presses are both gated by the chat they come from.
//! Updates from any other chat are dropped without a reply.

use crate::{
    commands::{self, AdminAction, CallerGate, TextCommand},
    probe::HostProbe,
    service::Monitor,
};
use std::sync::Arc;
use teloxide::{
    Bot,
    dispatching::{UpdateFilterExt, UpdateHandler},
    dptree,
    payloads::SendMessageSetters,
    requests::{Requester, ResponseResult},
    types::{CallbackQuery, Message, ParseMode, Update},
    utils::html,
};
use tracing::{debug, info, warn};

/// Everything the handlers need, injected through the dispatcher.
pub struct CommandContext {
    pub gate: CallerGate,
    pub probe: Arc<dyn HostProbe>,
    pub monitor: Arc<Monitor>,
    pub log_lines: usize,
}

pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback))
}

async fn on_message(bot: Bot, msg: Message, ctx: Arc<CommandContext>) -> ResponseResult<()> {
    if !ctx.gate.permits(msg.chat.id) {
        debug!(chat_id = msg.chat.id.0, "ignoring message from unauthorized chat");
        return Ok(());
    }

    let Some(command) = msg.text().and_then(TextCommand::parse) else {
        return Ok(());
    };

    match command {
        TextCommand::Admin => {
            bot.send_message(msg.chat.id, "🛠 Validator administration")
                .reply_markup(commands::admin_keyboard())
                .await?;
        }
        TextCommand::Report => {
            let report = ctx.monitor.compose_status_report().await;
            bot.send_message(msg.chat.id, html::escape(&report))
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }

    Ok(())
}

async fn on_callback(bot: Bot, query: CallbackQuery, ctx: Arc<CommandContext>) -> ResponseResult<()> {
    let origin = query.message.as_ref().map(|message| message.chat().id);
    if !ctx.gate.permits_origin(origin) {
        debug!(user_id = query.from.id.0, chat_id = ?origin, "ignoring callback from unauthorized chat");
        return Ok(());
    }

    bot.answer_callback_query(query.id.clone()).await?;

    let data = query.data.as_deref().unwrap_or_default();
    let reply = match data.parse::<AdminAction>() {
        Ok(action) => {
            info!(%action, "running admin action");
            let result = commands::dispatch(action, ctx.probe.as_ref(), ctx.log_lines).await;
            format!("<pre>{}</pre>", html::escape(&result))
        }
        Err(error) => {
            warn!(error = %error, "rejected admin callback");
            html::escape(&format!("❌ {error}"))
        }
    };

    bot.send_message(ctx.gate.allowed(), reply)
        .parse_mode(ParseMode::Html)
        .await?;

    Ok(())
}
