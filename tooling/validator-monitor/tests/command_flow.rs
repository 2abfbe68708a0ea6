use std::{
    path::Path,
    sync::Mutex,
};
use validator_monitor::{
    commands::{AdminAction, dispatch},
    models::{DiskInfo, ServiceKind},
    probe::{HostProbe, ProbeError},
};

/// Records which probe operations were invoked.
#[derive(Default)]
struct RecordingProbe {
    calls: Mutex<Vec<String>>,
}

impl RecordingProbe {
    fn record(&self, call: String) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(call);
        }
    }

    fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait::async_trait]
impl HostProbe for RecordingProbe {
    async fn disk_usage(&self, path: &Path) -> Result<DiskInfo, ProbeError> {
        Err(ProbeError::UnexpectedOutput(path.display().to_string()))
    }

    async fn service_active(&self, _service: ServiceKind) -> bool {
        true
    }

    async fn service_status_text(&self, service: ServiceKind, _verbose: bool) -> String {
        format!("{service} status")
    }

    async fn restart(&self, service: ServiceKind) -> String {
        self.record(format!("restart {service}"));
        format!("❌ Failed to restart {service}: permission denied")
    }

    async fn recent_logs(&self, service: ServiceKind, line_count: usize) -> String {
        self.record(format!("logs {service} {line_count}"));
        "line one\nline two".to_owned()
    }
}

#[tokio::test]
async fn each_action_maps_to_one_probe_call() {
    let probe = RecordingProbe::default();

    for action in AdminAction::ALL {
        let _ = dispatch(action, &probe, 50).await;
    }

    assert_eq!(
        probe.calls(),
        vec![
            "restart chainflip-node".to_owned(),
            "restart chainflip-engine".to_owned(),
            "logs chainflip-node 50".to_owned(),
            "logs chainflip-engine 50".to_owned(),
        ]
    );
}

#[tokio::test]
async fn restart_failure_is_returned_to_the_requester() {
    let probe = RecordingProbe::default();

    let reply = dispatch(AdminAction::RestartEngine, &probe, 50).await;

    assert!(reply.contains("Failed to restart chainflip-engine"));
}

#[tokio::test]
async fn log_reply_names_service_and_line_count() {
    let probe = RecordingProbe::default();

    let reply = dispatch(AdminAction::LogsNode, &probe, 20).await;

    assert!(reply.starts_with("📜 Last 20 lines of chainflip-node"));
    assert!(reply.ends_with("line one\nline two"));
}

#[test]
fn unknown_callback_never_reaches_the_probe() {
    assert!("restart_everything".parse::<AdminAction>().is_err());
}
