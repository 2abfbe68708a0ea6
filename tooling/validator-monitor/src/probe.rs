use crate::models::{DiskInfo, ServiceKind};
use std::{path::Path, process::Output, time::Duration};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Largest text we hand to the transport in a single message.
pub const MESSAGE_BYTE_BUDGET: usize = 3800;
pub const TRUNCATION_MARKER: &str = "\n…(truncated)";

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to execute {command}: {source}")]
    Io {
        command: String,
        source: std::io::Error,
    },
    #[error("{command} failed (exit {status:?}): {stderr}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("unexpected output: {0}")]
    UnexpectedOutput(String),
}

/// Local host queries and the administrative actions allowed on it.
#[async_trait::async_trait]
pub trait HostProbe: Send + Sync {
    async fn disk_usage(&self, path: &Path) -> Result<DiskInfo, ProbeError>;

    /// Any failure to query counts as "not active".
    async fn service_active(&self, service: ServiceKind) -> bool;

    /// Best effort; failures come back as text.
    async fn service_status_text(&self, service: ServiceKind, verbose: bool) -> String;

    async fn restart(&self, service: ServiceKind) -> String;

    async fn recent_logs(&self, service: ServiceKind, line_count: usize) -> String;
}

/// Probe backed by `df`, `systemctl` and `journalctl`.
#[derive(Debug, Clone)]
pub struct SystemdProbe {
    settle_delay: Duration,
}

impl Default for SystemdProbe {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
        }
    }
}

impl SystemdProbe {
    pub fn with_settle_delay(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    async fn output(&self, program: &str, args: &[&str]) -> Result<Output, ProbeError> {
        debug!(program, ?args, "running host command");
        Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProbeError::Io {
                command: command_line(program, args),
                source,
            })
    }

    /// Runs a command and returns its stdout, failing on a non-zero exit.
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        let output = self.output(program, args).await?;
        if !output.status.success() {
            return Err(ProbeError::CommandFailed {
                command: command_line(program, args),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait::async_trait]
impl HostProbe for SystemdProbe {
    async fn disk_usage(&self, path: &Path) -> Result<DiskInfo, ProbeError> {
        let path = path.to_string_lossy().into_owned();
        let stdout = self.run("df", &["-P", "-B1", path.as_str()]).await?;
        parse_df_output(&stdout)
    }

    async fn service_active(&self, service: ServiceKind) -> bool {
        match self.run("systemctl", &["is-active", service.unit_name()]).await {
            Ok(stdout) => stdout.trim() == "active",
            Err(error) => {
                debug!(service = %service, error = %error, "service reported as not active");
                false
            }
        }
    }

    async fn service_status_text(&self, service: ServiceKind, verbose: bool) -> String {
        let unit = service.unit_name();
        let mut args = vec!["status", unit, "--no-pager"];
        if verbose {
            args.extend(["--full", "--lines=30"]);
        } else {
            args.push("--lines=5");
        }

        // `systemctl status` exits non-zero for inactive units but still
        // prints the useful part on stdout.
        match self.output("systemctl", &args).await {
            Ok(output) if !output.stdout.is_empty() => {
                cap_message(String::from_utf8_lossy(&output.stdout).trim(), MESSAGE_BYTE_BUDGET)
            }
            Ok(output) => format!(
                "Error getting {unit} status: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(error) => format!("Error getting {unit} status: {error}"),
        }
    }

    async fn restart(&self, service: ServiceKind) -> String {
        let unit = service.unit_name();
        if let Err(error) = self.run("systemctl", &["restart", unit]).await {
            warn!(service = %service, error = %error, "service restart failed");
            return cap_message(&format!("❌ Failed to restart {unit}: {error}"), MESSAGE_BYTE_BUDGET);
        }

        tokio::time::sleep(self.settle_delay).await;

        if self.service_active(service).await {
            format!("✅ {unit} restarted successfully and is active")
        } else {
            warn!(service = %service, "service not active after restart");
            format!("❌ {unit} was restarted but is not active")
        }
    }

    async fn recent_logs(&self, service: ServiceKind, line_count: usize) -> String {
        let unit = service.unit_name();
        let lines = line_count.to_string();
        match self
            .run("journalctl", &["-u", unit, "-n", lines.as_str(), "--no-pager"])
            .await
        {
            Ok(stdout) if stdout.trim().is_empty() => format!("No log entries for {unit}"),
            Ok(stdout) => cap_message(stdout.trim(), MESSAGE_BYTE_BUDGET),
            Err(error) => cap_message(
                &format!("❌ Failed to fetch logs for {unit}: {error}"),
                MESSAGE_BYTE_BUDGET,
            ),
        }
    }
}

/// Parses the POSIX output of `df -P -B1 <path>`.
pub fn parse_df_output(stdout: &str) -> Result<DiskInfo, ProbeError> {
    let line = stdout
        .lines()
        .skip(1)
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| ProbeError::UnexpectedOutput(stdout.trim().to_owned()))?;

    let fields: Vec<&str> = line.split_whitespace().collect();
    let [_filesystem, total, _used, available, _capacity, mount @ ..] = fields.as_slice() else {
        return Err(ProbeError::UnexpectedOutput(line.to_owned()));
    };
    if mount.is_empty() {
        return Err(ProbeError::UnexpectedOutput(line.to_owned()));
    }

    let parse = |raw: &str| {
        raw.parse::<u64>()
            .map_err(|_| ProbeError::UnexpectedOutput(line.to_owned()))
    };
    let total = parse(*total)?;
    let available = parse(*available)?;
    if total == 0 {
        return Err(ProbeError::UnexpectedOutput(line.to_owned()));
    }

    let used = total.saturating_sub(available);
    Ok(DiskInfo {
        used_percent: round2(to_f64(used) / to_f64(total) * 100.0),
        free_gb: round2(to_f64(available) / GIB),
        total_gb: round2(to_f64(total) / GIB),
        mount_point: mount.join(" "),
    })
}

/// Cuts `text` to at most `budget` bytes on a char boundary, marking the cut.
pub fn cap_message(text: &str, budget: usize) -> String {
    if text.len() <= budget {
        return text.to_owned();
    }

    let mut end = budget.saturating_sub(TRUNCATION_MARKER.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut capped = text.get(..end).unwrap_or_default().to_owned();
    capped.push_str(TRUNCATION_MARKER);
    capped
}

fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[allow(clippy::as_conversions)]
fn to_f64(value: u64) -> f64 {
    value as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_posix_df_output() {
        let stdout = "Filesystem     1-blocks        Used   Available Capacity Mounted on\n\
                      /dev/nvme0n1p2 107374182400 96636764160 10737418240      91% /\n";

        let disk = parse_df_output(stdout);
        assert!(disk.is_ok());
        let disk = match disk {
            Ok(disk) => disk,
            Err(_) => return,
        };

        assert_eq!(disk.used_percent, 90.0);
        assert_eq!(disk.free_gb, 10.0);
        assert_eq!(disk.total_gb, 100.0);
        assert_eq!(disk.mount_point, "/");
    }

    #[test]
    fn keeps_mount_points_with_spaces() {
        let stdout = "Filesystem 1-blocks Used Available Capacity Mounted on\n\
                      /dev/sdb1 1073741824 0 1073741824 0% /mnt/chain data\n";

        let disk = parse_df_output(stdout);
        assert!(matches!(disk, Ok(ref disk) if disk.mount_point == "/mnt/chain data"));
    }

    #[test]
    fn rejects_unexpected_df_output() {
        assert!(parse_df_output("").is_err());
        assert!(parse_df_output("Filesystem 1-blocks Used\n/dev/sda1 10 x\n").is_err());
        assert!(parse_df_output("header\n/dev/sda1 0 0 0 0% /\n").is_err());
    }

    #[test]
    fn short_messages_are_left_alone() {
        assert_eq!(cap_message("ok", MESSAGE_BYTE_BUDGET), "ok");
    }

    #[test]
    fn long_messages_are_capped_with_marker() {
        let text = "é".repeat(MESSAGE_BYTE_BUDGET);
        let capped = cap_message(&text, MESSAGE_BYTE_BUDGET);

        assert!(capped.len() <= MESSAGE_BYTE_BUDGET);
        assert!(capped.ends_with(TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn missing_binary_surfaces_io_error() {
        let probe = SystemdProbe::with_settle_delay(Duration::ZERO);
        let output = probe.run("definitely-not-a-real-binary", &[]).await;
        assert!(matches!(output, Err(ProbeError::Io { .. })));
    }
}
