use super::identity::Role;
use super::ids::{EntryFeeId, PaymentId, RegistrationId, TournamentId, UserId};
use crate::error::{InputError, MarketError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

pub const MAX_PARTICIPANTS: u32 = 1000;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;
const MAX_TEAM_NAME_CHARS: usize = 50;
const MAX_MEMBER_NAME_CHARS: usize = 32;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    BrSolo,
    BrDuo,
    BrSquad,
    ClashSquad,
    LoneWolf,
    RoomHs,
}

/// Moderation status. Serialized with the platform's historical labels.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum TournamentStatus {
    #[serde(rename = "en_examen")]
    UnderReview,
    #[serde(rename = "valide")]
    Approved,
    #[serde(rename = "rejete")]
    Rejected,
}

impl GameMode {
    /// Players per team. Solo modes take no roster.
    pub fn team_size(&self) -> usize {
        match self {
            GameMode::BrSolo | GameMode::RoomHs => 1,
            GameMode::BrDuo | GameMode::LoneWolf => 2,
            GameMode::BrSquad | GameMode::ClashSquad => 4,
        }
    }
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::UnderReview => "en_examen",
            TournamentStatus::Approved => "valide",
            TournamentStatus::Rejected => "rejete",
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a caller may choose when creating a tournament. Status and ownership are
/// always decided by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentDraft {
    pub title: String,
    pub visibility: Visibility,
    pub mode: GameMode,
    pub start_at: DateTime<Utc>,
    #[serde(default)]
    pub entry_fee_id: Option<EntryFeeId>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    /// Announced prize in XOF. Informational only, the ledger never pays it out.
    #[serde(default)]
    pub prize_pool: Decimal,
}

impl TournamentDraft {
    pub fn check(&self) -> Result<(), InputError> {
        let title_len = self.title.trim().chars().count();
        if !(3..=200).contains(&title_len) {
            return Err(InputError::Malformed {
                field: "title",
                reason: "expected 3 to 200 characters".to_string(),
            });
        }
        if let Some(max) = self.max_participants
            && !(1..=MAX_PARTICIPANTS).contains(&max)
        {
            return Err(InputError::Malformed {
                field: "max_participants",
                reason: format!("expected 1 to {MAX_PARTICIPANTS}"),
            });
        }
        if let Some(description) = &self.description
            && description.chars().count() > MAX_DESCRIPTION_CHARS
        {
            return Err(InputError::Malformed {
                field: "description",
                reason: format!("expected at most {MAX_DESCRIPTION_CHARS} characters"),
            });
        }
        if self.prize_pool.is_sign_negative() {
            return Err(InputError::Malformed {
                field: "prize_pool",
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Tournament {
    pub id: TournamentId,
    pub created_by: UserId,
    /// Role of the creator when the tournament was submitted.
    pub created_by_role: Role,
    pub title: String,
    pub visibility: Visibility,
    pub mode: GameMode,
    pub start_at: DateTime<Utc>,
    pub entry_fee_id: Option<EntryFeeId>,
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prize_pool: Decimal,
    pub status: TournamentStatus,
    pub access_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    pub fn review(&mut self, approve: bool) -> Result<(), MarketError> {
        if self.status != TournamentStatus::UnderReview {
            return Err(MarketError::conflict(format!(
                "tournament {} is {}, expected en_examen",
                self.id, self.status
            )));
        }
        self.status = if approve {
            TournamentStatus::Approved
        } else {
            TournamentStatus::Rejected
        };
        Ok(())
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == TournamentStatus::Approved && now < self.start_at
    }

    /// Checks a supplied access code. Public tournaments accept anything.
    pub fn admits(&self, supplied: Option<&str>) -> bool {
        match (self.visibility, self.access_code.as_deref()) {
            (Visibility::Public, _) => true,
            (Visibility::Private, Some(expected)) => {
                supplied.is_some_and(|code| constant_time_eq(code, expected))
            }
            (Visibility::Private, None) => false,
        }
    }

    /// Copy safe to show to `viewer`: the access code only reaches the owner and admins.
    pub fn visible_to(&self, viewer: Option<(UserId, Role)>) -> Tournament {
        let mut copy = self.clone();
        let privileged =
            viewer.is_some_and(|(user, role)| user == self.created_by || role == Role::Admin);
        if !privileged {
            copy.access_code = None;
        }
        copy
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let max_len = a.len().max(b.len());
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);
    (lengths_equal & contents_equal).into()
}

/// Roster declared for team modes. Names are in-game nicknames, the registrant included.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Team {
    pub name: String,
    pub members: Vec<String>,
}

impl Team {
    /// Trims the names and checks the roster against the tournament's mode.
    pub fn normalized(self, mode: GameMode) -> Result<Team, InputError> {
        if mode.team_size() == 1 {
            return Err(InputError::Malformed {
                field: "team",
                reason: "solo modes take no team".to_string(),
            });
        }
        let name = self.name.trim().to_string();
        let name_len = name.chars().count();
        if name_len == 0 || name_len > MAX_TEAM_NAME_CHARS {
            return Err(InputError::Malformed {
                field: "team_name",
                reason: format!("expected 1 to {MAX_TEAM_NAME_CHARS} characters"),
            });
        }
        let members: Vec<String> = self
            .members
            .iter()
            .map(|m| m.trim().to_string())
            .collect();
        if members.is_empty() || members.len() > mode.team_size() {
            return Err(InputError::Malformed {
                field: "team_members",
                reason: format!("expected 1 to {} members", mode.team_size()),
            });
        }
        if members
            .iter()
            .any(|m| m.is_empty() || m.chars().count() > MAX_MEMBER_NAME_CHARS)
        {
            return Err(InputError::Malformed {
                field: "team_members",
                reason: format!("member names are 1 to {MAX_MEMBER_NAME_CHARS} characters"),
            });
        }
        Ok(Team { name, members })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Registered,
    Paid,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Registered => "registered",
            RegistrationStatus::Paid => "paid",
            RegistrationStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        *self != RegistrationStatus::Cancelled
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Registration {
    pub id: RegistrationId,
    pub tournament_id: TournamentId,
    pub user_id: UserId,
    pub status: RegistrationStatus,
    pub payment_id: Option<PaymentId>,
    #[serde(default)]
    pub team: Option<Team>,
    pub created_at: DateTime<Utc>,
}

impl Registration {
    pub fn mark_paid(&mut self, payment: PaymentId) -> Result<(), MarketError> {
        if self.status != RegistrationStatus::Registered {
            return Err(MarketError::conflict(format!(
                "registration {} is {}, expected registered",
                self.id, self.status
            )));
        }
        self.status = RegistrationStatus::Paid;
        self.payment_id = Some(payment);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), MarketError> {
        match self.status {
            RegistrationStatus::Registered => {
                self.status = RegistrationStatus::Cancelled;
                Ok(())
            }
            other => Err(MarketError::conflict(format!(
                "registration {} is {other} and cannot be cancelled",
                self.id
            ))),
        }
    }
}
