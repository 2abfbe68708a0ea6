use clap::Parser;
use std::sync::Arc;
use teloxide::{Bot, dispatching::Dispatcher, dptree, types::ChatId};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, filter::Directive};
use validator_monitor::{
    alerter::TelegramAlerter,
    commands::CallerGate,
    config::{AppConfig, Options},
    engine::ChangeDetector,
    probe::SystemdProbe,
    scheduler::{spawn_daily_task, spawn_interval_task},
    service::{Monitor, MonitorSettings},
    status_client::ValidatorStatusClient,
    telegram::{self, CommandContext},
};

#[tokio::main]
async fn main() {
    let options = Options::parse();
    init_tracing(&options);

    if let Err(error) = run(options).await {
        error!(error = %error, "validator-monitor startup failed");
        std::process::exit(1);
    }
}

fn init_tracing(options: &Options) {
    let filter = EnvFilter::builder()
        .with_default_directive(Directive::from(options.log_level))
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(options: Options) -> Result<(), String> {
    let config = AppConfig::try_from(options).map_err(|error| error.to_string())?;

    let bot = Bot::new(config.telegram_bot_token.clone());
    let alerter = Arc::new(TelegramAlerter::new(bot.clone(), config.chat_id));
    let source = Arc::new(
        ValidatorStatusClient::new(config.graphql_endpoint.clone(), config.request_timeout)
            .map_err(|error| error.to_string())?,
    );
    let probe = Arc::new(SystemdProbe::with_settle_delay(config.restart_settle_delay));

    let monitor = Arc::new(Monitor::new(
        MonitorSettings {
            validator_id: config.validator_id.clone(),
            data_dir: config.data_dir.clone(),
            disk_threshold_percent: config.disk_threshold_percent,
        },
        source,
        probe.clone(),
        alerter,
        ChangeDetector::default().into_shared(),
    ));

    info!(
        validator = %config.validator_id,
        data_dir = %config.data_dir.display(),
        health_seconds = config.health_interval.as_secs(),
        report_hour = config.daily_report_hour,
        "validator-monitor starting"
    );

    monitor.send_daily_report().await;

    let jobs = [
        spawn_daily_task("daily-report", config.daily_report_hour, {
            let monitor = monitor.clone();
            move || {
                let monitor = monitor.clone();
                async move { monitor.send_daily_report().await }
            }
        }),
        spawn_interval_task("periodic-check", config.health_interval, {
            let monitor = monitor.clone();
            move || {
                let monitor = monitor.clone();
                async move { monitor.run_periodic_check().await }
            }
        }),
        spawn_interval_task("reputation-reminder", config.reminder_interval, {
            let monitor = monitor.clone();
            move || {
                let monitor = monitor.clone();
                async move { monitor.run_reputation_reminder().await }
            }
        }),
    ];

    let context = Arc::new(CommandContext {
        gate: CallerGate::new(ChatId(config.chat_id)),
        probe,
        monitor,
        log_lines: config.log_lines,
    });

    info!("validator-monitor started, listening for commands");

    Dispatcher::builder(bot, telegram::schema())
        .dependencies(dptree::deps![context])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    for job in jobs {
        job.abort();
    }
    info!("validator-monitor stopped");

    Ok(())
}
