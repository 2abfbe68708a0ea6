use crate::{
    balance::{self, format_units},
    models::{StatusFlag, ValidatorAlert, ValidatorSnapshot},
};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const NO_DATA_REPORT: &str = "No validator data available";

/// Engine shared between the scheduled jobs. `evaluate` runs entirely under
/// the lock so a report never observes a half-swapped snapshot.
pub type SharedDetector = Arc<Mutex<ChangeDetector>>;

/// Outcome of feeding one snapshot to the detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub alerts: Vec<ValidatorAlert>,
    pub report: String,
}

/// Holds the last observed snapshot of one validator and turns each new
/// snapshot into alerts by comparing the two.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    reputation_floor: i64,
    balance_drop_percent: u64,
    previous: Option<ValidatorSnapshot>,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self {
            reputation_floor: 2500,
            balance_drop_percent: 1,
            previous: None,
        }
    }
}

impl ChangeDetector {
    /// Starts from a known snapshot instead of an empty state.
    pub fn with_previous(snapshot: ValidatorSnapshot) -> Self {
        Self {
            previous: Some(snapshot),
            ..Self::default()
        }
    }

    pub fn into_shared(self) -> SharedDetector {
        Arc::new(Mutex::new(self))
    }

    pub fn previous(&self) -> Option<&ValidatorSnapshot> {
        self.previous.as_ref()
    }

    /// Compares `snapshot` with the held one and then replaces it. The first
    /// call has nothing to compare against and yields no alerts.
    pub fn evaluate(&mut self, snapshot: ValidatorSnapshot) -> Evaluation {
        let mut alerts = Vec::new();

        if let Some(previous) = self.previous.as_ref() {
            self.evaluate_flags(previous, &snapshot, &mut alerts);
            self.evaluate_reputation(previous, &snapshot, &mut alerts);
            self.evaluate_balance(previous, &snapshot, &mut alerts);
        }

        self.previous = Some(snapshot);

        Evaluation {
            alerts,
            report: self.report(),
        }
    }

    fn evaluate_flags(
        &self,
        previous: &ValidatorSnapshot,
        current: &ValidatorSnapshot,
        alerts: &mut Vec<ValidatorAlert>,
    ) {
        for flag in StatusFlag::ALL {
            let from = previous.flag(flag);
            let to = current.flag(flag);
            if from != to {
                alerts.push(ValidatorAlert::FlagChanged { flag, from, to });
            }
        }
    }

    fn evaluate_reputation(
        &self,
        previous: &ValidatorSnapshot,
        current: &ValidatorSnapshot,
        alerts: &mut Vec<ValidatorAlert>,
    ) {
        let last = previous.reputation_points;
        let now = current.reputation_points;

        if last >= 0 && now < 0 {
            alerts.push(ValidatorAlert::ReputationNegative { current: now });
        }

        if last >= self.reputation_floor && now < self.reputation_floor {
            alerts.push(ValidatorAlert::ReputationBelowFloor {
                floor: self.reputation_floor,
                current: now,
            });
        }
    }

    fn evaluate_balance(
        &self,
        previous: &ValidatorSnapshot,
        current: &ValidatorSnapshot,
        alerts: &mut Vec<ValidatorAlert>,
    ) {
        let drop = balance::decrease_exceeding(
            previous.total_balance(),
            current.total_balance(),
            self.balance_drop_percent,
        );

        if let Some(drop) = drop {
            alerts.push(ValidatorAlert::BalanceDecreased {
                previous: format_units(drop.previous),
                current: format_units(drop.current),
                change: format_units(drop.change),
                percent: drop.percent(),
            });
        }
    }

    /// Renders the held snapshot for the operator.
    pub fn report(&self) -> String {
        let Some(snapshot) = self.previous.as_ref() else {
            return NO_DATA_REPORT.to_owned();
        };

        let short_identity: String = snapshot.identity.chars().take(8).collect();
        let mut report = format!(
            "🏷️ Validator: {} ({short_identity}...)\n\
             📈 APY: {}%\n\
             🏆 Reputation: {}\n\
             💰 Balance: {} FLIP\n\
             Locked: {} FLIP\n\
             Unlocked: {} FLIP\n\
             \n🔐 Status:\n",
            snapshot.alias,
            format_basis_points(snapshot.apy_basis_points),
            snapshot.reputation_points,
            format_units(snapshot.total_balance()),
            format_units(snapshot.locked_balance),
            format_units(snapshot.unlocked_balance),
        );

        for flag in StatusFlag::ALL {
            let mark = if snapshot.flag(flag) { "✅" } else { "❌" };
            report.push_str(&format!("{}: {mark}\n", flag.label()));
        }

        report
    }
}

fn format_basis_points(basis_points: i64) -> String {
    let sign = if basis_points < 0 { "-" } else { "" };
    let magnitude = basis_points.unsigned_abs();
    format!("{sign}{}.{:02}", magnitude / 100, magnitude % 100)
}
