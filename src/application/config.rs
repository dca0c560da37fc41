use crate::domain::proof::DEFAULT_MAX_PROOF_BYTES;
use serde::{Deserialize, Serialize};

/// Tunables of the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Largest accepted payment proof, in bytes.
    pub max_proof_bytes: usize,
    /// How many times a colliding order code or payment reference is reallocated.
    pub allocation_attempts: u32,
    /// Length of generated private tournament access codes.
    pub access_code_len: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            max_proof_bytes: DEFAULT_MAX_PROOF_BYTES,
            allocation_attempts: 5,
            access_code_len: 12,
        }
    }
}
