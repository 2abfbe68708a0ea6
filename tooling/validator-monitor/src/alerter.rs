use teloxide::{
    Bot,
    payloads::SendMessageSetters,
    requests::{Request, Requester},
    types::{ChatId, ParseMode},
    utils::html,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Delivers plain text to the operator.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), TransportError>;
}

#[derive(Clone)]
pub struct TelegramAlerter {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramAlerter {
    pub fn new(bot: Bot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: ChatId(chat_id),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramAlerter {
    async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.bot
            .send_message(self.chat_id, html::escape(text))
            .parse_mode(ParseMode::Html)
            .send()
            .await?;
        Ok(())
    }
}
