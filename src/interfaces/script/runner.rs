use super::command_reader::{Command, ScriptLine};
use super::report_writer::Outcome;
use crate::application::engine::Marketplace;
use crate::application::ledger::CheckoutRequest;
use crate::application::queries::TournamentFilter;
use crate::domain::ids::{CatalogItemId, EntryFeeId, OrderId, PaymentId, TournamentId};
use crate::domain::tournament::{Team, TournamentDraft};
use crate::error::{MarketError, Result};
use crate::interfaces::fixtures::Fixtures;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

/// What a script label points at.
#[derive(Debug, Clone)]
enum Labeled {
    Order { id: OrderId, code: String },
    Payment(PaymentId),
    Tournament {
        id: TournamentId,
        access_code: Option<String>,
    },
}

impl Labeled {
    fn uuid(&self) -> Uuid {
        match self {
            Labeled::Order { id, .. } => id.0,
            Labeled::Payment(id) => id.0,
            Labeled::Tournament { id, .. } => id.0,
        }
    }
}

/// Drives a [`Marketplace`] from script lines, resolving labels, SKUs and fee names.
pub struct ScriptRunner {
    market: Marketplace,
    base_dir: PathBuf,
    skus: HashMap<String, CatalogItemId>,
    fees: HashMap<String, EntryFeeId>,
    labels: HashMap<String, Labeled>,
}

impl ScriptRunner {
    /// `base_dir` anchors relative proof file paths, usually the script's directory.
    pub fn new(market: Marketplace, fixtures: &Fixtures, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            market,
            base_dir: base_dir.into(),
            skus: fixtures
                .catalog
                .iter()
                .map(|item| (item.sku.clone(), item.id))
                .collect(),
            fees: fixtures
                .entry_fees
                .iter()
                .map(|fee| (fee.name.clone(), fee.id))
                .collect(),
            labels: HashMap::new(),
        }
    }

    /// Executes one script line. Failures become report rows, never errors.
    pub async fn run(&mut self, line: usize, script: ScriptLine) -> Outcome {
        let name = script.command.name();
        match self.execute(line, &script).await {
            Ok((outcome, labeled)) => {
                if let Some(label) = script.label
                    && let Some(labeled) = labeled
                {
                    self.labels.insert(label, labeled);
                }
                outcome
            }
            Err(err) => {
                warn!(line, command = name, error = %err, "command failed");
                Outcome::failed(line, name, &err)
            }
        }
    }

    async fn execute(&self, line: usize, script: &ScriptLine) -> Result<(Outcome, Option<Labeled>)> {
        let token = script.token.as_str();
        let name = script.command.name();
        match &script.command {
            Command::CreateOrder {
                item,
                recipient,
                idempotency_key,
            } => {
                let item_id = *self
                    .skus
                    .get(item)
                    .ok_or_else(|| MarketError::not_found("catalog item", item))?;
                let order = self
                    .market
                    .create_order(token, item_id, recipient, idempotency_key.as_deref())
                    .await?;
                let labeled = Labeled::Order {
                    id: order.id,
                    code: order.code.clone(),
                };
                Ok((Outcome::order(line, name, &order), Some(labeled)))
            }
            Command::InitiateCheckout {
                kind,
                target,
                amount,
                method,
                country,
            } => {
                let request = CheckoutRequest {
                    kind: *kind,
                    target_id: self.label(target)?.uuid(),
                    amount: *amount,
                    method: method.clone(),
                    country_code: country.clone(),
                };
                let payment = self.market.initiate_checkout(token, request).await?;
                let labeled = Labeled::Payment(payment.id);
                Ok((Outcome::payment(line, name, &payment), Some(labeled)))
            }
            Command::SubmitProof {
                payment,
                file,
                mime,
            } => {
                let payment_id = self.payment(payment)?;
                let bytes = tokio::fs::read(self.base_dir.join(file)).await?;
                let proof = self
                    .market
                    .submit_proof(token, payment_id, &bytes, mime)
                    .await?;
                Ok((Outcome::proof(line, name, &proof), None))
            }
            Command::ValidatePayment { payment } => {
                let payment = self
                    .market
                    .validate_payment(token, self.payment(payment)?)
                    .await?;
                Ok((Outcome::payment(line, name, &payment), None))
            }
            Command::RejectPayment { payment, reason } => {
                let payment = self
                    .market
                    .reject_payment(token, self.payment(payment)?, reason.clone())
                    .await?;
                Ok((Outcome::payment(line, name, &payment), None))
            }
            Command::DeliverOrder { order } => {
                let code = match self.labels.get(order) {
                    Some(Labeled::Order { code, .. }) => code.as_str(),
                    _ => order.as_str(),
                };
                let order = self.market.deliver_order(token, code).await?;
                Ok((Outcome::order(line, name, &order), None))
            }
            Command::CreateTournament {
                title,
                visibility,
                mode,
                start_at,
                entry_fee,
                max_participants,
                description,
                prize_pool,
            } => {
                let entry_fee_id = match entry_fee {
                    Some(fee) => Some(
                        *self
                            .fees
                            .get(fee)
                            .ok_or_else(|| MarketError::not_found("entry fee", fee))?,
                    ),
                    None => None,
                };
                let draft = TournamentDraft {
                    title: title.clone(),
                    visibility: *visibility,
                    mode: *mode,
                    start_at: *start_at,
                    entry_fee_id,
                    max_participants: *max_participants,
                    description: description.clone(),
                    prize_pool: *prize_pool,
                };
                let tournament = self.market.create_tournament(token, draft).await?;
                let labeled = Labeled::Tournament {
                    id: tournament.id,
                    access_code: tournament.access_code.clone(),
                };
                Ok((Outcome::tournament(line, name, &tournament), Some(labeled)))
            }
            Command::ApproveTournament { tournament } => {
                let (id, _) = self.tournament(tournament)?;
                let tournament = self.market.approve_tournament(token, id).await?;
                Ok((Outcome::tournament(line, name, &tournament), None))
            }
            Command::RejectTournament { tournament } => {
                let (id, _) = self.tournament(tournament)?;
                let tournament = self.market.reject_tournament(token, id).await?;
                Ok((Outcome::tournament(line, name, &tournament), None))
            }
            Command::Register {
                tournament,
                access_code,
                with_issued_code,
                team_name,
                team_members,
            } => {
                let (id, issued) = self.tournament(tournament)?;
                let code = if *with_issued_code {
                    issued
                } else {
                    access_code.as_deref()
                };
                let registration = match team_name {
                    Some(team_name) => {
                        let team = Team {
                            name: team_name.clone(),
                            members: team_members.clone(),
                        };
                        self.market.register_team(token, id, code, team).await?
                    }
                    None => self.market.register(token, id, code).await?,
                };
                Ok((Outcome::registration(line, name, &registration), None))
            }
            Command::CancelRegistration { tournament } => {
                let (id, _) = self.tournament(tournament)?;
                let registration = self.market.cancel_registration(token, id).await?;
                Ok((Outcome::registration(line, name, &registration), None))
            }
            Command::MyOrders => {
                let orders = self.market.my_orders(token, None).await?;
                let codes: Vec<&str> = orders.iter().map(|o| o.code.as_str()).collect();
                let outcome =
                    Outcome::summary(line, name, "order", &orders.len().to_string(), codes.join(" "));
                Ok((outcome, None))
            }
            Command::PendingPayments => {
                let pending = self.market.pending_payments(token).await?;
                let entries: Vec<String> = pending
                    .iter()
                    .map(|p| format!("{}({})", p.payment.reference, p.proof_count))
                    .collect();
                let outcome = Outcome::summary(
                    line,
                    name,
                    "payment",
                    &pending.len().to_string(),
                    entries.join(" "),
                );
                Ok((outcome, None))
            }
            Command::ListTournaments { mode, status } => {
                let filter = TournamentFilter {
                    mode: *mode,
                    status: *status,
                };
                let tournaments = self.market.list_tournaments(filter).await?;
                let entries: Vec<String> = tournaments
                    .iter()
                    .map(|t| format!("{} ({})", t.tournament.title, t.current_participants))
                    .collect();
                let outcome = Outcome::summary(
                    line,
                    name,
                    "tournament",
                    &tournaments.len().to_string(),
                    entries.join("; "),
                );
                Ok((outcome, None))
            }
            Command::Stats => {
                let stats = self.market.stats(token).await?;
                let detail = serde_json::to_string(&stats)?;
                Ok((Outcome::summary(line, name, "stats", "", detail), None))
            }
        }
    }

    fn label(&self, label: &str) -> Result<&Labeled> {
        self.labels
            .get(label)
            .ok_or_else(|| MarketError::not_found("label", label))
    }

    fn payment(&self, label: &str) -> Result<PaymentId> {
        match self.label(label)? {
            Labeled::Payment(id) => Ok(*id),
            _ => Err(MarketError::not_found("payment", label)),
        }
    }

    fn tournament(&self, label: &str) -> Result<(TournamentId, Option<&str>)> {
        match self.label(label)? {
            Labeled::Tournament { id, access_code } => Ok((*id, access_code.as_deref())),
            _ => Err(MarketError::not_found("tournament", label)),
        }
    }
}
