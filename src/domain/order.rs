use super::ids::{CatalogItemId, OrderId, UserId};
use super::money::{Amount, Currency};
use crate::error::{InputError, MarketError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchase of one catalog item, delivered to a player's in-game account.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub code: String,
    pub user_id: UserId,
    pub catalog_item_id: CatalogItemId,
    pub recipient_game_uid: String,
    pub total_amount: Amount,
    pub currency: Currency,
    pub idempotency_key: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Marks the order paid. Only reachable through payment validation.
    pub fn mark_paid(&mut self) -> Result<(), MarketError> {
        match self.status {
            OrderStatus::Pending => {
                self.status = OrderStatus::Paid;
                Ok(())
            }
            other => Err(MarketError::conflict(format!(
                "order {} is {other}, expected pending",
                self.code
            ))),
        }
    }

    pub fn deliver(&mut self, now: DateTime<Utc>) -> Result<(), MarketError> {
        match self.status {
            OrderStatus::Paid => {
                self.status = OrderStatus::Delivered;
                self.delivered_at = Some(now);
                Ok(())
            }
            OrderStatus::Delivered => Err(MarketError::conflict(format!(
                "order {} was already delivered",
                self.code
            ))),
            OrderStatus::Pending => Err(MarketError::conflict(format!(
                "order {} has not been paid",
                self.code
            ))),
        }
    }
}

/// Free Fire player ids are 8 to 12 digits.
pub fn validate_recipient_uid(uid: &str) -> Result<(), InputError> {
    let uid = uid.trim();
    if (8..=12).contains(&uid.len()) && uid.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(InputError::Malformed {
            field: "recipient_game_uid",
            reason: "expected 8 to 12 digits".to_string(),
        })
    }
}

pub fn validate_idempotency_key(key: &str) -> Result<(), InputError> {
    if key.is_empty() || key.len() > 64 {
        return Err(InputError::Malformed {
            field: "idempotency_key",
            reason: "expected 1 to 64 characters".to_string(),
        });
    }
    Ok(())
}
