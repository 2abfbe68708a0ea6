use crate::status_client::DEFAULT_GRAPHQL_ENDPOINT;
use clap::Parser;
use std::{path::PathBuf, time::Duration};
use thiserror::Error;
use tracing::Level;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "validator-monitor",
    about = "Watches a validator node and reports changes over Telegram"
)]
pub struct Options {
    #[arg(
        long = "telegram-bot-token",
        value_name = "TOKEN",
        env = "TELEGRAM_BOT_TOKEN",
        hide_env_values = true,
        help = "Bot token used to deliver alerts and receive commands."
    )]
    pub telegram_bot_token: String,
    #[arg(
        long = "chat-id",
        value_name = "CHAT_ID",
        env = "CHAT_ID",
        allow_negative_numbers = true,
        help = "Only chat that receives alerts and may issue commands. Commands and button presses are accepted from this chat id; for a group every member may use them."
    )]
    pub chat_id: i64,
    #[arg(
        long = "validator-id",
        value_name = "SS58_ADDRESS",
        env = "VALIDATOR_ID",
        help = "Validator account to monitor."
    )]
    pub validator_id: String,
    #[arg(
        long = "disk-threshold",
        value_name = "PERCENT",
        env = "DISK_THRESHOLD",
        default_value_t = 5.0,
        help = "Alert when less than this percentage of the disk is free."
    )]
    pub disk_threshold: f64,
    #[arg(
        long = "data-dir",
        value_name = "PATH",
        env = "DATA_DIR",
        default_value = "/",
        help = "Path whose filesystem is checked for free space."
    )]
    pub data_dir: PathBuf,
    #[arg(
        long = "graphql-endpoint",
        value_name = "URL",
        env = "GRAPHQL_ENDPOINT",
        default_value = DEFAULT_GRAPHQL_ENDPOINT
    )]
    pub graphql_endpoint: String,
    #[arg(
        long = "daily-report-hour",
        value_name = "HOUR",
        env = "DAILY_REPORT_HOUR",
        default_value_t = 9,
        help = "Local hour (0-23) at which the daily report is sent."
    )]
    pub daily_report_hour: u32,
    #[arg(
        long = "log-level",
        value_name = "LOG_LEVEL",
        env = "LOG_LEVEL",
        default_value_t = Level::INFO,
        help = "Default log level; RUST_LOG directives take precedence."
    )]
    pub log_level: Level,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validator id must not be empty")]
    EmptyValidatorId,
    #[error("disk threshold must be within 0..=100, got {0}")]
    InvalidDiskThreshold(f64),
    #[error("daily report hour must be within 0..=23, got {0}")]
    InvalidReportHour(u32),
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub chat_id: i64,
    pub validator_id: String,
    pub disk_threshold_percent: f64,
    pub data_dir: PathBuf,
    pub graphql_endpoint: String,
    pub request_timeout: Duration,
    pub daily_report_hour: u32,
    pub health_interval: Duration,
    pub reminder_interval: Duration,
    pub restart_settle_delay: Duration,
    pub log_lines: usize,
}

impl TryFrom<Options> for AppConfig {
    type Error = ConfigError;

    fn try_from(options: Options) -> Result<Self, Self::Error> {
        let validator_id = options.validator_id.trim().to_owned();
        if validator_id.is_empty() {
            return Err(ConfigError::EmptyValidatorId);
        }

        if !(0.0..=100.0).contains(&options.disk_threshold) {
            return Err(ConfigError::InvalidDiskThreshold(options.disk_threshold));
        }

        if options.daily_report_hour > 23 {
            return Err(ConfigError::InvalidReportHour(options.daily_report_hour));
        }

        Ok(Self {
            telegram_bot_token: options.telegram_bot_token,
            chat_id: options.chat_id,
            validator_id,
            disk_threshold_percent: options.disk_threshold,
            data_dir: options.data_dir,
            graphql_endpoint: options.graphql_endpoint,
            request_timeout: Duration::from_secs(30),
            daily_report_hour: options.daily_report_hour,
            health_interval: Duration::from_secs(5 * 60),
            reminder_interval: Duration::from_secs(2 * 60 * 60),
            restart_settle_delay: Duration::from_secs(2),
            log_lines: 50,
        })
    }
}
