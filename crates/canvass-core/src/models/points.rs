//! Points balance, withdrawal history and withdrawal requests.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::de::{lenient_amount, string_or_number};

/// Lifecycle of a withdrawal as reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    #[default]
    Unknown,
}

impl WithdrawalStatus {
    /// Parse a status string case-insensitively. Unrecognized values map to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pending" | "processing" => WithdrawalStatus::Pending,
            "approved" | "paid" | "completed" => WithdrawalStatus::Approved,
            "rejected" | "declined" | "failed" => WithdrawalStatus::Rejected,
            _ => WithdrawalStatus::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for WithdrawalStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(serde_json::Value::String(s)) => WithdrawalStatus::parse(&s),
            _ => WithdrawalStatus::Unknown,
        })
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "Pending"),
            WithdrawalStatus::Approved => write!(f, "Approved"),
            WithdrawalStatus::Rejected => write!(f, "Rejected"),
            WithdrawalStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One entry of the withdrawal history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    /// Cash amount in cedis.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    #[serde(default)]
    pub status: WithdrawalStatus,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Points balance plus withdrawal history. Build from raw JSON with
/// [`crate::points::sanitize_points`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointsData {
    pub balance: f64,
    #[serde(rename = "withdrawalHistory")]
    pub withdrawal_history: Vec<WithdrawalRecord>,
}

/// Reply from `GET /user-balance`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserBalance {
    #[serde(default, alias = "points", deserialize_with = "lenient_amount")]
    pub balance: f64,
}

/// Body of `POST /reward-withdrawals`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawalRequest {
    /// Cash amount in cedis.
    pub amount: f64,
    /// Mobile money number the payout is sent to.
    pub phone_number: String,
    /// Mobile money network, e.g. "MTN".
    pub network: String,
}

/// Reply from `POST /reward-withdrawals`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WithdrawalReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "withdrawal")]
    pub data: Option<WithdrawalRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(WithdrawalStatus::parse("pending"), WithdrawalStatus::Pending);
        assert_eq!(WithdrawalStatus::parse("APPROVED"), WithdrawalStatus::Approved);
        assert_eq!(WithdrawalStatus::parse("rejected"), WithdrawalStatus::Rejected);
        assert_eq!(WithdrawalStatus::parse("on-hold"), WithdrawalStatus::Unknown);
        assert_eq!(WithdrawalStatus::parse(""), WithdrawalStatus::Unknown);
    }

    #[test]
    fn test_record_with_odd_status() {
        let record: WithdrawalRecord =
            serde_json::from_str(r#"{"id": 3, "amount": "12.50", "status": 7, "created_at": "2024-05-01T10:00:00Z"}"#)
                .expect("record should parse");
        assert_eq!(record.id.as_deref(), Some("3"));
        assert_eq!(record.amount, 12.5);
        assert_eq!(record.status, WithdrawalStatus::Unknown);
    }

    #[test]
    fn test_balance_alias() {
        let balance: UserBalance = serde_json::from_str(r#"{"points": "535"}"#).expect("balance should parse");
        assert_eq!(balance.balance, 535.0);
    }
}
