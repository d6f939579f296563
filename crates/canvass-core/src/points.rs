//! Points balance presentation and withdrawal rules.
//!
//! Points convert to cash at a fixed rate of 50 points per cedi. The server
//! owns the balance; the client only converts it for display and refuses
//! withdrawals that obviously exceed it before anything is sent.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError};
use crate::models::{PointsData, WithdrawalReceipt, WithdrawalRecord, WithdrawalRequest};

/// Points per one cedi.
pub const POINTS_PER_CEDI: f64 = 50.0;

/// Currency symbol for Ghana cedis.
pub const CEDI_SYMBOL: &str = "₵";

#[derive(Error, Debug)]
pub enum WithdrawalError {
    /// Rejected locally; nothing was sent.
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl WithdrawalError {
    pub fn user_message(&self) -> String {
        match self {
            WithdrawalError::Invalid(message) => message.clone(),
            WithdrawalError::Api(e) => e.user_message(),
        }
    }
}

/// Cash equivalent of a points balance.
pub fn cash_value(balance: f64) -> f64 {
    balance / POINTS_PER_CEDI
}

/// Largest cash amount that may be requested for a balance.
pub fn max_withdrawal(balance: f64) -> f64 {
    cash_value(balance).max(0.0)
}

/// Format a cash amount as `₵10.70`, rounding halves away from zero.
pub fn format_cedis(amount: f64) -> String {
    let rounded = (amount * 100.0).round() / 100.0;
    // Avoid "-0.00" for tiny negative amounts.
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{}{:.2}", CEDI_SYMBOL, rounded)
}

/// Check a requested cash amount against the balance.
pub fn validate_withdrawal(amount: f64, balance: f64) -> Result<(), WithdrawalError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(WithdrawalError::Invalid("Please enter a valid amount".to_string()));
    }
    let max_amount = max_withdrawal(balance);
    if amount > max_amount {
        return Err(WithdrawalError::Invalid(format!(
            "Maximum withdrawal amount is {}",
            format_cedis(max_amount)
        )));
    }
    Ok(())
}

/// Validate a withdrawal against the known balance, then submit it.
pub async fn request_withdrawal(
    client: &ApiClient,
    balance: f64,
    request: &WithdrawalRequest,
) -> Result<WithdrawalReceipt, WithdrawalError> {
    validate_withdrawal(request.amount, balance)?;
    let receipt = client.submit_withdrawal(request).await?;
    info!(amount = request.amount, "Withdrawal submitted");
    Ok(receipt)
}

/// Turn any `/points` reply into `PointsData`.
///
/// Accepts the payload bare or inside `{"data": ...}`. A missing, null or
/// non-array `withdrawalHistory` (or `withdrawal_history`) becomes an empty
/// list, entries that are not objects are dropped, and the balance is
/// coerced from a number or numeric string.
pub fn sanitize_points(value: &Value) -> PointsData {
    let root = match value.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    };

    let balance = root
        .get("balance")
        .or_else(|| root.get("points"))
        .map(coerce_amount)
        .unwrap_or(0.0);

    let history = root
        .get("withdrawalHistory")
        .or_else(|| root.get("withdrawal_history"));

    let withdrawal_history = match history {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter(|entry| entry.is_object())
            .filter_map(|entry| match serde_json::from_value::<WithdrawalRecord>(entry.clone()) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed withdrawal entry");
                    None
                }
            })
            .collect(),
        Some(other) if !other.is_null() => {
            debug!("withdrawalHistory is not a list, treating as empty");
            Vec::new()
        }
        _ => Vec::new(),
    };

    PointsData {
        balance,
        withdrawal_history,
    }
}

fn coerce_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

impl PointsData {
    pub fn cash_value(&self) -> f64 {
        cash_value(self.balance)
    }

    /// Cash value formatted for display, e.g. `₵10.70`.
    pub fn cash_display(&self) -> String {
        format_cedis(self.cash_value())
    }

    pub fn max_withdrawal(&self) -> f64 {
        max_withdrawal(self.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WithdrawalStatus;
    use serde_json::json;

    #[test]
    fn test_cash_display() {
        let points = sanitize_points(&json!({"balance": 535, "withdrawalHistory": []}));
        assert_eq!(points.cash_display(), "₵10.70");
        assert_eq!(format_cedis(0.0), "₵0.00");
        assert_eq!(format_cedis(cash_value(1000.0)), "₵20.00");
    }

    #[test]
    fn test_cash_display_rounds_halves_up() {
        assert_eq!(format_cedis(cash_value(6.25)), "₵0.13");
        assert_eq!(format_cedis(0.125), "₵0.13");
        assert_eq!(format_cedis(0.124), "₵0.12");
        assert_eq!(format_cedis(-0.001), "₵0.00");
    }

    #[test]
    fn test_validate_withdrawal_limits() {
        assert!(validate_withdrawal(10.0, 535.0).is_ok());
        assert!(validate_withdrawal(10.70, 535.0).is_ok());

        let err = validate_withdrawal(10.71, 535.0).expect_err("over the limit");
        assert_eq!(err.to_string(), "Maximum withdrawal amount is ₵10.70");

        let err = validate_withdrawal(5.0, 0.0).expect_err("empty balance");
        assert_eq!(err.to_string(), "Maximum withdrawal amount is ₵0.00");

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = validate_withdrawal(bad, 535.0).expect_err("invalid amount");
            assert_eq!(err.user_message(), "Please enter a valid amount");
        }
    }

    #[test]
    fn test_sanitize_missing_or_malformed_history() {
        for payload in [
            json!({"balance": 100}),
            json!({"balance": 100, "withdrawalHistory": null}),
            json!({"balance": 100, "withdrawalHistory": "none"}),
            json!({"balance": 100, "withdrawalHistory": {"0": {"amount": 1}}}),
            json!({"balance": 100, "withdrawalHistory": 5}),
        ] {
            let points = sanitize_points(&payload);
            assert_eq!(points.balance, 100.0);
            assert!(points.withdrawal_history.is_empty(), "payload {}", payload);
        }
    }

    #[test]
    fn test_sanitize_garbage_payloads() {
        assert_eq!(sanitize_points(&Value::Null), PointsData::default());
        assert_eq!(sanitize_points(&json!("oops")), PointsData::default());
        assert_eq!(sanitize_points(&json!([1, 2, 3])), PointsData::default());
    }

    #[test]
    fn test_sanitize_coerces_entries() {
        let payload = json!({
            "data": {
                "balance": "1,250",
                "withdrawal_history": [
                    {"id": 1, "amount": "5.00", "status": "approved", "created_at": "2024-03-02T09:00:00Z"},
                    "garbage",
                    null,
                    {"id": "2", "amount": 3, "status": "weird"},
                    {"id": 3, "amount": 2, "status": "PENDING"}
                ]
            }
        });
        let points = sanitize_points(&payload);
        assert_eq!(points.balance, 1250.0);
        assert_eq!(points.withdrawal_history.len(), 3);
        assert_eq!(points.withdrawal_history[0].status, WithdrawalStatus::Approved);
        assert_eq!(points.withdrawal_history[0].amount, 5.0);
        assert_eq!(points.withdrawal_history[1].status, WithdrawalStatus::Unknown);
        assert_eq!(points.withdrawal_history[2].status, WithdrawalStatus::Pending);
    }
}
