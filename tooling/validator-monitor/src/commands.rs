use crate::{models::ServiceKind, probe::HostProbe};
use std::{fmt, str::FromStr};
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup};
use thiserror::Error;

/// Administrative actions reachable from the inline keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminAction {
    RestartNode,
    RestartEngine,
    LogsNode,
    LogsEngine,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl AdminAction {
    pub const ALL: [AdminAction; 4] = [
        AdminAction::RestartNode,
        AdminAction::RestartEngine,
        AdminAction::LogsNode,
        AdminAction::LogsEngine,
    ];

    /// Payload carried by the keyboard button.
    pub fn callback_data(self) -> &'static str {
        match self {
            AdminAction::RestartNode => "restart_node",
            AdminAction::RestartEngine => "restart_engine",
            AdminAction::LogsNode => "logs_node",
            AdminAction::LogsEngine => "logs_engine",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AdminAction::RestartNode => "🔄 Restart Node",
            AdminAction::RestartEngine => "🔄 Restart Engine",
            AdminAction::LogsNode => "📜 Node Logs",
            AdminAction::LogsEngine => "📜 Engine Logs",
        }
    }

    pub fn service(self) -> ServiceKind {
        match self {
            AdminAction::RestartNode | AdminAction::LogsNode => ServiceKind::Node,
            AdminAction::RestartEngine | AdminAction::LogsEngine => ServiceKind::Engine,
        }
    }
}

impl FromStr for AdminAction {
    type Err = UnknownAction;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        AdminAction::ALL
            .into_iter()
            .find(|action| action.callback_data() == data)
            .ok_or_else(|| UnknownAction(data.to_owned()))
    }
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.callback_data())
    }
}

/// Slash commands understood in chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCommand {
    /// `/start` or `/admin`: show the action keyboard.
    Admin,
    /// `/report`: send the full report now.
    Report,
}

impl TextCommand {
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name {
            "start" | "admin" => Some(TextCommand::Admin),
            "report" => Some(TextCommand::Report),
            _ => None,
        }
    }
}

/// The single identity allowed to drive the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerGate {
    allowed: ChatId,
}

impl CallerGate {
    pub fn new(allowed: ChatId) -> Self {
        Self { allowed }
    }

    pub fn allowed(&self) -> ChatId {
        self.allowed
    }

    pub fn permits(&self, caller: ChatId) -> bool {
        caller == self.allowed
    }

    /// Button presses on messages too old for Telegram to return have no
    /// known chat and are refused.
    pub fn permits_origin(&self, origin: Option<ChatId>) -> bool {
        origin.is_some_and(|chat| self.permits(chat))
    }
}

/// 2×2 grid: restarts on the first row, logs on the second.
pub fn admin_keyboard() -> InlineKeyboardMarkup {
    let button = |action: AdminAction| {
        InlineKeyboardButton::callback(action.label(), action.callback_data())
    };

    InlineKeyboardMarkup::new([
        [button(AdminAction::RestartNode), button(AdminAction::RestartEngine)],
        [button(AdminAction::LogsNode), button(AdminAction::LogsEngine)],
    ])
}

/// Runs `action` against the probe and returns the text to reply with.
pub async fn dispatch(action: AdminAction, probe: &dyn HostProbe, log_lines: usize) -> String {
    let service = action.service();
    match action {
        AdminAction::RestartNode | AdminAction::RestartEngine => probe.restart(service).await,
        AdminAction::LogsNode | AdminAction::LogsEngine => {
            let logs = probe.recent_logs(service, log_lines).await;
            format!("📜 Last {log_lines} lines of {service}:\n\n{logs}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_payloads_round_trip() {
        for action in AdminAction::ALL {
            assert_eq!(action.callback_data().parse::<AdminAction>(), Ok(action));
        }
    }

    #[test]
    fn unknown_payload_is_rejected() {
        assert_eq!(
            "rm_rf".parse::<AdminAction>(),
            Err(UnknownAction("rm_rf".to_owned()))
        );
        assert!("".parse::<AdminAction>().is_err());
    }

    #[test]
    fn actions_map_to_allow_listed_services() {
        assert_eq!(AdminAction::RestartNode.service(), ServiceKind::Node);
        assert_eq!(AdminAction::LogsNode.service(), ServiceKind::Node);
        assert_eq!(AdminAction::RestartEngine.service(), ServiceKind::Engine);
        assert_eq!(AdminAction::LogsEngine.service(), ServiceKind::Engine);
    }

    #[test]
    fn parses_slash_commands() {
        assert_eq!(TextCommand::parse("/start"), Some(TextCommand::Admin));
        assert_eq!(TextCommand::parse("/admin@my_bot"), Some(TextCommand::Admin));
        assert_eq!(TextCommand::parse("/report now"), Some(TextCommand::Report));
        assert_eq!(TextCommand::parse("report"), None);
        assert_eq!(TextCommand::parse("/restart"), None);
        assert_eq!(TextCommand::parse(""), None);
    }

    #[test]
    fn gate_only_admits_configured_chat() {
        let gate = CallerGate::new(ChatId(42));
        assert!(gate.permits(ChatId(42)));
        assert!(!gate.permits(ChatId(43)));
    }

    #[test]
    fn group_gate_admits_presses_from_the_group_chat() {
        let gate = CallerGate::new(ChatId(-1001234567890));
        assert!(gate.permits(ChatId(-1001234567890)));
        assert!(gate.permits_origin(Some(ChatId(-1001234567890))));
        assert!(!gate.permits_origin(Some(ChatId(1234567890))));
        assert!(!gate.permits_origin(None));
    }

    #[test]
    fn keyboard_is_two_by_two() {
        let keyboard = admin_keyboard();
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert!(keyboard.inline_keyboard.iter().all(|row| row.len() == 2));
    }
}
