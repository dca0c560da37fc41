use super::ids::{PaymentId, UserId};
use super::money::{Amount, Currency};
use crate::error::{InputError, MarketError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Order,
    EntryFee,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Order => "order",
            PaymentKind::EntryFee => "entry_fee",
        }
    }
}

/// `Initiated -> PendingReview -> {Validated | Rejected}`. Both outcomes are terminal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Initiated,
    PendingReview,
    Validated,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Initiated => "initiated",
            PaymentStatus::PendingReview => "pending_review",
            PaymentStatus::Validated => "validated",
            PaymentStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Validated | PaymentStatus::Rejected)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An out-of-band transfer declared by a user, awaiting proof and admin review.
///
/// `target_id` points at the order for `PaymentKind::Order` and at the tournament for
/// `PaymentKind::EntryFee`. Nothing points back at the payment from the target.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: PaymentId,
    pub kind: PaymentKind,
    pub target_id: Uuid,
    pub user_id: UserId,
    pub amount: Amount,
    pub currency: Currency,
    pub method: String,
    pub country_code: String,
    pub reference: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Payment {
    /// Records that proof was uploaded. Further proofs on a payment under review are
    /// accepted without a status change.
    pub fn mark_proof_received(&mut self) -> Result<(), MarketError> {
        match self.status {
            PaymentStatus::Initiated => {
                self.status = PaymentStatus::PendingReview;
                Ok(())
            }
            PaymentStatus::PendingReview => Ok(()),
            terminal => Err(MarketError::conflict(format!(
                "payment {} is already {terminal}",
                self.reference
            ))),
        }
    }

    pub fn validate(&mut self, now: DateTime<Utc>) -> Result<(), MarketError> {
        if self.status.is_terminal() {
            return Err(MarketError::conflict(format!(
                "payment {} is already {}",
                self.reference, self.status
            )));
        }
        self.status = PaymentStatus::Validated;
        self.validated_at = Some(now);
        Ok(())
    }

    pub fn reject(&mut self, now: DateTime<Utc>, reason: Option<String>) -> Result<(), MarketError> {
        if self.status.is_terminal() {
            return Err(MarketError::conflict(format!(
                "payment {} is already {}",
                self.reference, self.status
            )));
        }
        self.status = PaymentStatus::Rejected;
        self.rejected_at = Some(now);
        self.rejection_reason = reason;
        Ok(())
    }
}

pub struct MethodSpec {
    pub id: &'static str,
    pub name: &'static str,
}

const MTN_MOMO: MethodSpec = MethodSpec {
    id: "mtn_momo",
    name: "MTN Mobile Money",
};
const MOOV_MONEY: MethodSpec = MethodSpec {
    id: "moov_money",
    name: "Moov Money",
};
static REMITTANCE: [MethodSpec; 6] = [
    MethodSpec {
        id: "remitly",
        name: "Remitly",
    },
    MethodSpec {
        id: "worldremit",
        name: "WorldRemit",
    },
    MethodSpec {
        id: "western_union",
        name: "Western Union",
    },
    MethodSpec {
        id: "ria",
        name: "RIA Money Transfer",
    },
    MethodSpec {
        id: "moneygram",
        name: "MoneyGram",
    },
    MethodSpec {
        id: "taptap_send",
        name: "Taptap Send",
    },
];

static MOBILE_MONEY: [MethodSpec; 2] = [MTN_MOMO, MOOV_MONEY];
static MTN_ONLY: [MethodSpec; 1] = [MTN_MOMO];

/// Payment channels offered per country.
pub fn methods_for_country(country: &str) -> Option<&'static [MethodSpec]> {
    match country {
        "BJ" | "CI" | "TG" | "BF" | "ML" | "NE" | "SN" => Some(&MOBILE_MONEY[..]),
        "GW" | "NG" => Some(&MTN_ONLY[..]),
        "FR" => Some(&REMITTANCE[..]),
        _ => None,
    }
}

pub fn ensure_method_allowed(method: &str, country: &str) -> Result<(), InputError> {
    let methods = methods_for_country(country)
        .ok_or_else(|| InputError::UnsupportedCountry(country.to_string()))?;
    if methods.iter().any(|m| m.id == method) {
        Ok(())
    } else {
        Err(InputError::UnsupportedMethod {
            method: method.to_string(),
            country: country.to_string(),
        })
    }
}
