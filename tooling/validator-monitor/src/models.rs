use ethereum_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Point-in-time read of a validator as reported by the status endpoint.
///
/// Field names follow the upstream GraphQL schema so a node deserializes
/// straight into a snapshot. Balances are kept in the chain's smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorSnapshot {
    #[serde(rename = "idSs58")]
    pub identity: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub alias: String,
    #[serde(rename = "apyBp")]
    pub apy_basis_points: i64,
    pub is_current_authority: bool,
    pub is_current_backup: bool,
    pub is_qualified: bool,
    pub is_online: bool,
    pub is_bidding: bool,
    pub is_keyholder: bool,
    pub reputation_points: i64,
    #[serde(serialize_with = "amount_to_decimal", deserialize_with = "amount_from_decimal")]
    pub locked_balance: U256,
    #[serde(serialize_with = "amount_to_decimal", deserialize_with = "amount_from_decimal")]
    pub unlocked_balance: U256,
}

impl ValidatorSnapshot {
    pub fn flag(&self, flag: StatusFlag) -> bool {
        match flag {
            StatusFlag::CurrentAuthority => self.is_current_authority,
            StatusFlag::CurrentBackup => self.is_current_backup,
            StatusFlag::Qualified => self.is_qualified,
            StatusFlag::Online => self.is_online,
            StatusFlag::Bidding => self.is_bidding,
            StatusFlag::Keyholder => self.is_keyholder,
        }
    }

    pub fn total_balance(&self) -> U256 {
        crate::balance::total(self.locked_balance, self.unlocked_balance)
    }
}

/// Boolean status fields of a validator, in the order alerts are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusFlag {
    CurrentAuthority,
    CurrentBackup,
    Qualified,
    Online,
    Bidding,
    Keyholder,
}

impl StatusFlag {
    pub const ALL: [StatusFlag; 6] = [
        StatusFlag::CurrentAuthority,
        StatusFlag::CurrentBackup,
        StatusFlag::Qualified,
        StatusFlag::Online,
        StatusFlag::Bidding,
        StatusFlag::Keyholder,
    ];

    /// Upstream field name, used in alert text.
    pub fn field_name(self) -> &'static str {
        match self {
            StatusFlag::CurrentAuthority => "isCurrentAuthority",
            StatusFlag::CurrentBackup => "isCurrentBackup",
            StatusFlag::Qualified => "isQualified",
            StatusFlag::Online => "isOnline",
            StatusFlag::Bidding => "isBidding",
            StatusFlag::Keyholder => "isKeyholder",
        }
    }

    /// Short label used in the status report.
    pub fn label(self) -> &'static str {
        match self {
            StatusFlag::CurrentAuthority => "Authority",
            StatusFlag::CurrentBackup => "Backup",
            StatusFlag::Qualified => "Qualified",
            StatusFlag::Online => "Online",
            StatusFlag::Bidding => "Bidding",
            StatusFlag::Keyholder => "Keyholder",
        }
    }
}

/// A change worth telling the operator about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorAlert {
    FlagChanged {
        flag: StatusFlag,
        from: bool,
        to: bool,
    },
    ReputationNegative {
        current: i64,
    },
    ReputationBelowFloor {
        floor: i64,
        current: i64,
    },
    /// Amounts are already rendered in display units with two decimals.
    BalanceDecreased {
        previous: String,
        current: String,
        change: String,
        percent: String,
    },
}

impl fmt::Display for ValidatorAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorAlert::FlagChanged { flag, from, to } => {
                write!(f, "⚠️ {} changed from {from} to {to}", flag.field_name())
            }
            ValidatorAlert::ReputationNegative { current } => {
                write!(f, "🚨 Reputation turned negative! Current: {current}")
            }
            ValidatorAlert::ReputationBelowFloor { floor, current } => {
                write!(f, "🚨 Reputation fell below {floor}! Current: {current}")
            }
            ValidatorAlert::BalanceDecreased {
                previous,
                current,
                change,
                percent,
            } => write!(
                f,
                "💸 Balance decreased by {percent}%!\nPrevious: {previous} FLIP\nCurrent: {current} FLIP\nChange: -{change} FLIP"
            ),
        }
    }
}

/// Filesystem usage at the monitored data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub used_percent: f64,
    pub free_gb: f64,
    pub total_gb: f64,
    pub mount_point: String,
}

impl DiskInfo {
    /// True when less than `free_threshold_percent` of the disk remains.
    pub fn is_low(&self, free_threshold_percent: f64) -> bool {
        self.used_percent > 100.0 - free_threshold_percent
    }
}

/// The services administrative actions may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    Node,
    Engine,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 2] = [ServiceKind::Node, ServiceKind::Engine];

    pub fn unit_name(self) -> &'static str {
        match self {
            ServiceKind::Node => "chainflip-node",
            ServiceKind::Engine => "chainflip-engine",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.unit_name())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Integer(u64),
}

fn amount_from_decimal<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    match RawAmount::deserialize(deserializer)? {
        RawAmount::Text(text) => U256::from_dec_str(text.trim())
            .map_err(|error| serde::de::Error::custom(format!("invalid amount {text:?}: {error:?}"))),
        RawAmount::Integer(value) => Ok(U256::from(value)),
    }
}

fn amount_to_decimal<S>(amount: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&amount.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node_json() -> serde_json::Value {
        json!({
            "idSs58": "cFLRQDfEdmnv6d2XfHJNRBQHi4fruPMReLSfvB8WWD2ENbqj7",
            "alias": "my-validator",
            "apyBp": 1234,
            "isCurrentAuthority": true,
            "isCurrentBackup": false,
            "isQualified": true,
            "isOnline": true,
            "isBidding": true,
            "isKeyholder": false,
            "reputationPoints": 2870,
            "lockedBalance": "123456789012345678901",
            "unlockedBalance": "0"
        })
    }

    #[test]
    fn deserializes_upstream_node_with_exact_balances() {
        let result = serde_json::from_value::<ValidatorSnapshot>(node_json());
        assert!(result.is_ok());
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(_) => return,
        };

        assert_eq!(snapshot.alias, "my-validator");
        assert_eq!(snapshot.apy_basis_points, 1234);
        assert_eq!(snapshot.reputation_points, 2870);
        assert_eq!(
            snapshot.locked_balance,
            U256::from_dec_str("123456789012345678901").unwrap_or_default()
        );
        assert!(snapshot.flag(StatusFlag::CurrentAuthority));
        assert!(!snapshot.flag(StatusFlag::Keyholder));
    }

    #[test]
    fn null_alias_becomes_empty() {
        let mut node = node_json();
        node["alias"] = serde_json::Value::Null;

        let snapshot: Result<ValidatorSnapshot, _> = serde_json::from_value(node);
        assert!(matches!(snapshot, Ok(ref s) if s.alias.is_empty()));
    }

    #[test]
    fn missing_field_rejects_partial_snapshot() {
        let mut node = node_json();
        if let Some(object) = node.as_object_mut() {
            object.remove("isOnline");
        }

        let snapshot: Result<ValidatorSnapshot, _> = serde_json::from_value(node);
        assert!(snapshot.is_err());
    }

    #[test]
    fn rejects_non_numeric_balance() {
        let mut node = node_json();
        node["unlockedBalance"] = json!("12.5");

        let snapshot: Result<ValidatorSnapshot, _> = serde_json::from_value(node);
        assert!(snapshot.is_err());
    }

    #[test]
    fn disk_is_low_only_past_threshold() {
        let disk = DiskInfo {
            used_percent: 95.0,
            free_gb: 5.0,
            total_gb: 100.0,
            mount_point: "/".to_owned(),
        };

        assert!(!disk.is_low(5.0));
        assert!(disk.is_low(6.0));
    }

    #[test]
    fn alert_text_names_field_and_values() {
        let alert = ValidatorAlert::FlagChanged {
            flag: StatusFlag::Online,
            from: true,
            to: false,
        };

        assert_eq!(alert.to_string(), "⚠️ isOnline changed from true to false");
    }
}
