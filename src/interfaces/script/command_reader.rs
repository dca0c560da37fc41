use crate::domain::payment::PaymentKind;
use crate::domain::tournament::{GameMode, TournamentStatus, Visibility};
use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::BufRead;
use std::path::PathBuf;

/// One command of a script, issued with the credential in `token`.
///
/// Entities created by the command can be referred to by `label` in later lines.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptLine {
    pub token: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    CreateOrder {
        /// Catalog SKU.
        item: String,
        recipient: String,
        #[serde(default)]
        idempotency_key: Option<String>,
    },
    InitiateCheckout {
        kind: PaymentKind,
        /// Label of the order or tournament being paid for.
        target: String,
        amount: Decimal,
        method: String,
        country: String,
    },
    SubmitProof {
        payment: String,
        /// Resolved against the script's directory when relative.
        file: PathBuf,
        mime: String,
    },
    ValidatePayment {
        payment: String,
    },
    RejectPayment {
        payment: String,
        #[serde(default)]
        reason: Option<String>,
    },
    DeliverOrder {
        /// Label of the order, or its code.
        order: String,
    },
    CreateTournament {
        title: String,
        visibility: Visibility,
        mode: GameMode,
        start_at: DateTime<Utc>,
        /// Entry fee name.
        #[serde(default)]
        entry_fee: Option<String>,
        #[serde(default)]
        max_participants: Option<u32>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        prize_pool: Decimal,
    },
    ApproveTournament {
        tournament: String,
    },
    RejectTournament {
        tournament: String,
    },
    Register {
        tournament: String,
        #[serde(default)]
        access_code: Option<String>,
        /// Supply the code issued when the labelled tournament was created.
        #[serde(default)]
        with_issued_code: bool,
        /// Registers a team roster when present.
        #[serde(default)]
        team_name: Option<String>,
        #[serde(default)]
        team_members: Vec<String>,
    },
    CancelRegistration {
        tournament: String,
    },
    MyOrders,
    PendingPayments,
    ListTournaments {
        #[serde(default)]
        mode: Option<GameMode>,
        #[serde(default)]
        status: Option<TournamentStatus>,
    },
    Stats,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateOrder { .. } => "create_order",
            Command::InitiateCheckout { .. } => "initiate_checkout",
            Command::SubmitProof { .. } => "submit_proof",
            Command::ValidatePayment { .. } => "validate_payment",
            Command::RejectPayment { .. } => "reject_payment",
            Command::DeliverOrder { .. } => "deliver_order",
            Command::CreateTournament { .. } => "create_tournament",
            Command::ApproveTournament { .. } => "approve_tournament",
            Command::RejectTournament { .. } => "reject_tournament",
            Command::Register { .. } => "register",
            Command::CancelRegistration { .. } => "cancel_registration",
            Command::MyOrders => "my_orders",
            Command::PendingPayments => "pending_payments",
            Command::ListTournaments { .. } => "list_tournaments",
            Command::Stats => "stats",
        }
    }
}

/// Reads script commands, one JSON object per line.
///
/// Blank lines and lines starting with `#` are skipped. Each item carries its
/// 1-based line number so reports can point back at the script.
pub struct CommandReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> CommandReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Lazily parses the script. A malformed line yields an error and reading continues.
    pub fn commands(self) -> impl Iterator<Item = (usize, Result<ScriptLine>)> {
        self.source
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let line_no = index + 1;
                match line {
                    Ok(text) => {
                        let text = text.trim();
                        if text.is_empty() || text.starts_with('#') {
                            None
                        } else {
                            Some((line_no, serde_json::from_str(text).map_err(MarketError::from)))
                        }
                    }
                    Err(e) => Some((line_no, Err(MarketError::from(e)))),
                }
            })
    }
}
