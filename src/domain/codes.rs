//! Generation of human-readable codes and shared secrets.
//!
//! None of these are assumed unique: callers persist them behind a unique index and
//! allocate again when the store reports a collision.

use super::ids::UserId;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;

const UPPER_ALNUM: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

fn random_upper(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| UPPER_ALNUM[rng.gen_range(0..UPPER_ALNUM.len())] as char)
        .collect()
}

/// `FF` + date + first 8 hex chars of the user id + 4 random chars.
pub fn order_code(user: UserId, now: DateTime<Utc>) -> String {
    let fragment: String = user.0.simple().to_string().chars().take(8).collect();
    format!(
        "FF{}{}{}",
        now.format("%Y%m%d"),
        fragment.to_ascii_uppercase(),
        random_upper(4)
    )
}

pub fn payment_reference(now: DateTime<Utc>) -> String {
    format!("PAY-{}-{}", now.format("%Y%m%d"), random_upper(12))
}

/// URL-safe alphanumeric secret. 12 chars carry about 71 bits of entropy.
pub fn access_code(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
