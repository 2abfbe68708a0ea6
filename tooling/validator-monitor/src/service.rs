use crate::{
    alerter::Notifier,
    engine::SharedDetector,
    models::{DiskInfo, ServiceKind, ValidatorAlert},
    probe::HostProbe,
    status_client::{StatusSource, UpstreamError},
};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

/// What the monitor watches and when it complains.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub validator_id: String,
    pub data_dir: PathBuf,
    pub disk_threshold_percent: f64,
}

/// Ties the probe, the status source and the change detector to the
/// notifier. Every public job logs its own failures and never panics on
/// them, so one bad poll cannot stop the others.
pub struct Monitor {
    settings: MonitorSettings,
    source: Arc<dyn StatusSource>,
    probe: Arc<dyn HostProbe>,
    notifier: Arc<dyn Notifier>,
    detector: SharedDetector,
}

impl Monitor {
    pub fn new(
        settings: MonitorSettings,
        source: Arc<dyn StatusSource>,
        probe: Arc<dyn HostProbe>,
        notifier: Arc<dyn Notifier>,
        detector: SharedDetector,
    ) -> Self {
        Self {
            settings,
            source,
            probe,
            notifier,
            detector,
        }
    }

    pub fn detector(&self) -> &SharedDetector {
        &self.detector
    }

    /// The short-interval job: host health followed by the validator poll.
    pub async fn run_periodic_check(&self) {
        self.check_health().await;
        if let Err(error) = self.check_validator().await {
            warn!(error = %error, "validator poll failed");
        }
    }

    /// Alerts on low disk space and on inactive services. Returns the number
    /// of alerts delivered.
    pub async fn check_health(&self) -> usize {
        let mut sent = 0;

        match self.probe.disk_usage(&self.settings.data_dir).await {
            Ok(disk) if disk.is_low(self.settings.disk_threshold_percent) => {
                let message = format!(
                    "⚠️ ALERT: Low disk space! {:.2}GB free ({:.2}% used) on {}",
                    disk.free_gb, disk.used_percent, disk.mount_point
                );
                if self.deliver(&message).await {
                    sent += 1;
                }
            }
            Ok(_) => {}
            Err(error) => {
                warn!(path = %self.settings.data_dir.display(), error = %error, "disk check failed");
            }
        }

        for service in ServiceKind::ALL {
            if self.probe.service_active(service).await {
                continue;
            }
            let status = self.probe.service_status_text(service, false).await;
            let message = format!("🚨 ALERT: {service} is not active!\n\nStatus:\n{status}");
            if self.deliver(&message).await {
                sent += 1;
            }
        }

        sent
    }

    /// Fetches the validator, runs it through the detector and forwards the
    /// resulting alerts. A failed fetch leaves the detector untouched.
    pub async fn check_validator(&self) -> Result<usize, UpstreamError> {
        let snapshot = self.source.fetch(&self.settings.validator_id).await?;
        let evaluation = self.detector.lock().await.evaluate(snapshot);
        Ok(self.deliver_alerts(&evaluation.alerts).await)
    }

    /// Re-reads live status and nags while reputation is below zero.
    /// Returns whether a reminder went out.
    pub async fn remind_negative_reputation(&self) -> Result<bool, UpstreamError> {
        let snapshot = self.source.fetch(&self.settings.validator_id).await?;
        if snapshot.reputation_points >= 0 {
            return Ok(false);
        }

        let message = format!(
            "🚨 Reputation is still negative! Current: {}",
            snapshot.reputation_points
        );
        Ok(self.deliver(&message).await)
    }

    pub async fn run_reputation_reminder(&self) {
        if let Err(error) = self.remind_negative_reputation().await {
            warn!(error = %error, "reputation reminder poll failed");
        }
    }

    /// Builds the consolidated report: disk, services and validator state.
    /// The fresh snapshot goes through the detector, and the alerts it
    /// produces are delivered on the way. Only the scheduled jobs call this.
    pub async fn compose_daily_report(&self) -> String {
        let host = self.host_sections().await;

        let validator_section = match self.source.fetch(&self.settings.validator_id).await {
            Ok(snapshot) => {
                let evaluation = self.detector.lock().await.evaluate(snapshot);
                self.deliver_alerts(&evaluation.alerts).await;
                evaluation.report
            }
            Err(error) => {
                warn!(error = %error, "validator poll failed while building report");
                let held = self.detector.lock().await.report();
                format!("⚠️ Validator status unavailable: {error}\n\n{held}")
            }
        };

        format!("📊 Daily Chainflip Validator Report\n\n{host}\n\n{validator_section}")
    }

    /// Same layout as the daily report, with the validator section taken
    /// from the last held snapshot. Never fetches and never touches the
    /// detector state, so it is safe to serve from chat commands.
    pub async fn compose_status_report(&self) -> String {
        let host = self.host_sections().await;
        let held = self.detector.lock().await.report();
        format!("📊 Chainflip Validator Status\n\n{host}\n\n{held}")
    }

    async fn host_sections(&self) -> String {
        let disk_section = match self.probe.disk_usage(&self.settings.data_dir).await {
            Ok(disk) => format_disk(&disk),
            Err(error) => {
                warn!(error = %error, "disk check failed while building report");
                format!("💾 Disk Space: unavailable ({error})")
            }
        };

        let mut services_section = String::from("🔧 Services Status:");
        for service in ServiceKind::ALL {
            let state = if self.probe.service_active(service).await {
                "✅ Active"
            } else {
                "❌ Inactive"
            };
            services_section.push_str(&format!("\n{service}: {state}"));
        }

        format!("{disk_section}\n\n{services_section}")
    }

    pub async fn send_daily_report(&self) {
        let report = self.compose_daily_report().await;
        if self.deliver(&report).await {
            info!("daily report sent");
        }
    }

    async fn deliver_alerts(&self, alerts: &[ValidatorAlert]) -> usize {
        let mut sent = 0;
        for alert in alerts {
            info!(alert = ?alert, "validator alert raised");
            if self.deliver(&alert.to_string()).await {
                sent += 1;
            }
        }
        sent
    }

    async fn deliver(&self, text: &str) -> bool {
        match self.notifier.send_text(text).await {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "failed to send telegram message");
                false
            }
        }
    }
}

fn format_disk(disk: &DiskInfo) -> String {
    format!(
        "💾 Disk Space ({}):\nUsed: {:.2}%\nFree: {:.2} GB\nTotal: {:.2} GB",
        disk.mount_point, disk.used_percent, disk.free_gb, disk.total_gb
    )
}
