use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketError>;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("unauthenticated")]
    Unauthenticated,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl MarketError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    /// Stable label of the failure class, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidInput(_) => "invalid_input",
            Self::Unavailable(_) => "unavailable",
            Self::Unauthenticated => "unauthenticated",
            Self::Store(StoreError::UniqueViolation(_))
            | Self::Store(StoreError::StaleWrite { .. })
            | Self::Store(StoreError::CapacityReached(_)) => "conflict",
            Self::Store(_) => "storage",
            Self::IoError(_) | Self::JsonError(_) | Self::CsvError(_) => "io",
        }
    }
}

/// Refinements of `MarketError::InvalidInput`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("country {0} is not supported")]
    UnsupportedCountry(String),
    #[error("payment method {method} is not available in {country}")]
    UnsupportedMethod { method: String, country: String },
    #[error("media type {0} is not accepted, use JPEG, PNG, GIF or PDF")]
    UnsupportedMedia(String),
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("payload is empty")]
    EmptyPayload,
    #[error("amount {actual} does not match the expected {expected}")]
    AmountMismatch { expected: Decimal, actual: Decimal },
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("{field}: {reason}")]
    Malformed { field: &'static str, reason: String },
}

/// Unique indexes and row-level constraints enforced by a `Store` at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    PrimaryKey(&'static str),
    OrderCode,
    IdempotencyKey,
    PaymentReference,
    ActiveRegistration,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryKey(entity) => write!(f, "{entity} primary key"),
            Self::OrderCode => f.write_str("order code"),
            Self::IdempotencyKey => f.write_str("order idempotency key"),
            Self::PaymentReference => f.write_str("payment reference"),
            Self::ActiveRegistration => f.write_str("active registration"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(Constraint),
    #[error("{entity} {id} was modified concurrently")]
    StaleWrite { entity: &'static str, id: String },
    #[error("tournament {0} is full")]
    CapacityReached(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(MarketError::not_found("order", "X").kind(), "not_found");
        assert_eq!(MarketError::conflict("dup").kind(), "conflict");
        assert_eq!(
            MarketError::from(InputError::EmptyPayload).kind(),
            "invalid_input"
        );
        assert_eq!(
            MarketError::from(StoreError::UniqueViolation(Constraint::OrderCode)).kind(),
            "conflict"
        );
        assert_eq!(
            MarketError::from(StoreError::Backend("down".into())).kind(),
            "storage"
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = MarketError::not_found("payment", "p1");
        assert_eq!(err.to_string(), "payment p1 not found");
    }
}
