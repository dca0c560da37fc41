//! Commit-time validation shared by the storage backends.
//!
//! A backend exposes its committed state through [`Snapshot`] while holding its commit
//! lock, and [`check`] decides whether a changeset may be applied. Checks run against the
//! state before the commit, so a changeset must touch each row at most once.

use crate::domain::changeset::{Changeset, Expect, Write};
use crate::domain::ids::{
    OrderId, PaymentId, ProofId, RegistrationId, TournamentId, UserId,
};
use crate::domain::order::Order;
use crate::domain::payment::Payment;
use crate::domain::tournament::{Registration, Tournament};
use crate::error::{Constraint, Result, StoreError};

pub trait Snapshot {
    fn order(&self, id: OrderId) -> Result<Option<Order>>;
    fn order_id_by_code(&self, code: &str) -> Result<Option<OrderId>>;
    fn order_id_by_key(&self, user: UserId, key: &str) -> Result<Option<OrderId>>;
    fn payment(&self, id: PaymentId) -> Result<Option<Payment>>;
    fn payment_id_by_reference(&self, reference: &str) -> Result<Option<PaymentId>>;
    fn proof_exists(&self, id: ProofId) -> Result<bool>;
    fn tournament(&self, id: TournamentId) -> Result<Option<Tournament>>;
    fn registration(&self, id: RegistrationId) -> Result<Option<Registration>>;
    fn active_registration_id(
        &self,
        tournament: TournamentId,
        user: UserId,
    ) -> Result<Option<RegistrationId>>;
    fn active_registration_count(&self, tournament: TournamentId) -> Result<u32>;
}

fn stale(entity: &'static str, id: impl ToString) -> StoreError {
    StoreError::StaleWrite {
        entity,
        id: id.to_string(),
    }
}

fn violation(constraint: Constraint) -> StoreError {
    StoreError::UniqueViolation(constraint)
}

pub fn check(view: &impl Snapshot, changes: &Changeset) -> Result<()> {
    for write in changes.writes() {
        match write {
            Write::Order { order, expect } => match expect {
                Expect::Absent => {
                    if view.order(order.id)?.is_some() {
                        return Err(violation(Constraint::PrimaryKey("order")).into());
                    }
                    if view.order_id_by_code(&order.code)?.is_some() {
                        return Err(violation(Constraint::OrderCode).into());
                    }
                    if let Some(key) = &order.idempotency_key
                        && view.order_id_by_key(order.user_id, key)?.is_some()
                    {
                        return Err(violation(Constraint::IdempotencyKey).into());
                    }
                }
                Expect::Status(status) => {
                    let current = view.order(order.id)?;
                    if current.map(|o| o.status) != Some(*status) {
                        return Err(stale("order", &order.code).into());
                    }
                }
            },
            Write::Payment { payment, expect } => match expect {
                Expect::Absent => {
                    if view.payment(payment.id)?.is_some() {
                        return Err(violation(Constraint::PrimaryKey("payment")).into());
                    }
                    if view.payment_id_by_reference(&payment.reference)?.is_some() {
                        return Err(violation(Constraint::PaymentReference).into());
                    }
                }
                Expect::Status(status) => {
                    let current = view.payment(payment.id)?;
                    if current.map(|p| p.status) != Some(*status) {
                        return Err(stale("payment", &payment.reference).into());
                    }
                }
            },
            Write::Proof(proof) => {
                if view.proof_exists(proof.id)? {
                    return Err(violation(Constraint::PrimaryKey("payment proof")).into());
                }
            }
            Write::Tournament { tournament, expect } => match expect {
                Expect::Absent => {
                    if view.tournament(tournament.id)?.is_some() {
                        return Err(violation(Constraint::PrimaryKey("tournament")).into());
                    }
                }
                Expect::Status(status) => {
                    let current = view.tournament(tournament.id)?;
                    if current.map(|t| t.status) != Some(*status) {
                        return Err(stale("tournament", tournament.id).into());
                    }
                }
            },
            Write::Registration {
                registration,
                expect,
                capacity,
            } => match expect {
                Expect::Absent => {
                    if view.registration(registration.id)?.is_some() {
                        return Err(violation(Constraint::PrimaryKey("registration")).into());
                    }
                    if registration.status.is_active() {
                        if view
                            .active_registration_id(registration.tournament_id, registration.user_id)?
                            .is_some()
                        {
                            return Err(violation(Constraint::ActiveRegistration).into());
                        }
                        if let Some(limit) = capacity
                            && view.active_registration_count(registration.tournament_id)? >= *limit
                        {
                            return Err(StoreError::CapacityReached(
                                registration.tournament_id.to_string(),
                            )
                            .into());
                        }
                    }
                }
                Expect::Status(status) => {
                    let current = view.registration(registration.id)?;
                    if current.map(|r| r.status) != Some(*status) {
                        return Err(stale("registration", registration.id).into());
                    }
                }
            },
        }
    }
    Ok(())
}
