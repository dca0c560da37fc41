use super::ids::{PaymentId, ProofId};
use crate::error::InputError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub const DEFAULT_MAX_PROOF_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum MediaType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "application/pdf")]
    Pdf,
}

impl MediaType {
    pub fn parse(mime: &str) -> Result<Self, InputError> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(MediaType::Jpeg),
            "image/png" => Ok(MediaType::Png),
            "image/gif" => Ok(MediaType::Gif),
            "application/pdf" => Ok(MediaType::Pdf),
            _ => Err(InputError::UnsupportedMedia(mime.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Gif => "image/gif",
            MediaType::Pdf => "application/pdf",
        }
    }
}

/// Hex-encoded SHA-256 of a proof's raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Evidence of an out-of-band transfer. Never modified after creation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentProof {
    pub id: ProofId,
    pub payment_id: PaymentId,
    pub file_url: String,
    pub sha256: ContentHash,
    pub mime: MediaType,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
}

pub fn check_payload(bytes: &[u8], limit: usize) -> Result<(), InputError> {
    if bytes.is_empty() {
        return Err(InputError::EmptyPayload);
    }
    if bytes.len() > limit {
        return Err(InputError::PayloadTooLarge {
            size: bytes.len(),
            limit,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_parsing() {
        assert_eq!(MediaType::parse("image/PNG").unwrap(), MediaType::Png);
        assert_eq!(MediaType::parse("image/jpg").unwrap(), MediaType::Jpeg);
        assert!(matches!(
            MediaType::parse("text/html"),
            Err(InputError::UnsupportedMedia(_))
        ));
    }

    #[test]
    fn test_content_hash_known_vector() {
        assert_eq!(
            ContentHash::of(b"abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_payload_limits() {
        assert_eq!(check_payload(&[], 10), Err(InputError::EmptyPayload));
        assert!(check_payload(&[0u8; 10], 10).is_ok());
        assert_eq!(
            check_payload(&[0u8; 11], 10),
            Err(InputError::PayloadTooLarge {
                size: 11,
                limit: 10
            })
        );
    }
}
