//! Read-only views. None of these write to the store.
//!
//! Lookups of a single order or payment answer `NotFound` to callers who may not see
//! it, so codes and ids cannot be probed for existence.

use super::engine::Marketplace;
use crate::domain::ids::{PaymentId, TournamentId};
use crate::domain::order::{Order, OrderStatus};
use crate::domain::payment::{self, Payment};
use crate::domain::proof::PaymentProof;
use crate::domain::tournament::{
    GameMode, Registration, Tournament, TournamentStatus, Visibility,
};
use crate::error::{InputError, MarketError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentMethodInfo {
    pub id: &'static str,
    pub name: &'static str,
}

/// A tournament as shown to a viewer, with its current seat count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TournamentView {
    #[serde(flatten)]
    pub tournament: Tournament,
    pub current_participants: u32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TournamentFilter {
    pub mode: Option<GameMode>,
    pub status: Option<TournamentStatus>,
}

impl Marketplace {
    /// Payment channels offered in `country`.
    pub fn payment_methods(&self, country: &str) -> Result<Vec<PaymentMethodInfo>> {
        let country = country.trim().to_ascii_uppercase();
        let methods = payment::methods_for_country(&country)
            .ok_or(InputError::UnsupportedCountry(country))?;
        Ok(methods
            .iter()
            .map(|m| PaymentMethodInfo {
                id: m.id,
                name: m.name,
            })
            .collect())
    }

    /// The caller's orders, newest first.
    pub async fn my_orders(
        &self,
        credential: &str,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let caller = self.authenticate(credential).await?;
        let mut orders: Vec<Order> = self
            .store
            .orders_for_user(caller.user_id)
            .await?
            .into_iter()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    pub async fn order(&self, credential: &str, code: &str) -> Result<Order> {
        let caller = self.authenticate(credential).await?;
        self.store
            .order_by_code(code)
            .await?
            .filter(|o| caller.can_access(o.user_id))
            .ok_or_else(|| MarketError::not_found("order", code))
    }

    pub async fn payment(&self, credential: &str, id: PaymentId) -> Result<Payment> {
        let caller = self.authenticate(credential).await?;
        self.store
            .payment(id)
            .await?
            .filter(|p| caller.can_access(p.user_id))
            .ok_or_else(|| MarketError::not_found("payment", id))
    }

    /// Proofs attached to a payment, oldest first.
    pub async fn payment_proofs(&self, credential: &str, id: PaymentId) -> Result<Vec<PaymentProof>> {
        let payment = self.payment(credential, id).await?;
        let mut proofs = self.store.proofs_for_payment(payment.id).await?;
        proofs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(proofs)
    }

    /// Public tournaments ordered by start time. Access codes are never included.
    pub async fn list_tournaments(&self, filter: TournamentFilter) -> Result<Vec<TournamentView>> {
        let mut tournaments: Vec<Tournament> = self
            .store
            .all_tournaments()
            .await?
            .into_iter()
            .filter(|t| t.visibility == Visibility::Public)
            .filter(|t| filter.mode.is_none_or(|m| t.mode == m))
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .map(|t| t.visible_to(None))
            .collect();
        tournaments.sort_by(|a, b| a.start_at.cmp(&b.start_at));

        let mut views = Vec::with_capacity(tournaments.len());
        for tournament in tournaments {
            views.push(self.view(tournament).await?);
        }
        Ok(views)
    }

    /// A single tournament. Anonymous callers pass `None`.
    pub async fn tournament(
        &self,
        credential: Option<&str>,
        id: TournamentId,
    ) -> Result<TournamentView> {
        let viewer = match credential {
            Some(credential) => {
                let caller = self.authenticate(credential).await?;
                Some((caller.user_id, caller.role))
            }
            None => None,
        };
        let tournament = self
            .store
            .tournament(id)
            .await?
            .ok_or_else(|| MarketError::not_found("tournament", id))?;
        self.view(tournament.visible_to(viewer)).await
    }

    async fn view(&self, tournament: Tournament) -> Result<TournamentView> {
        let current_participants = self.store.participant_count(tournament.id).await?;
        Ok(TournamentView {
            tournament,
            current_participants,
        })
    }

    /// All registrations of a tournament, for its owner or an admin.
    pub async fn tournament_registrations(
        &self,
        credential: &str,
        id: TournamentId,
    ) -> Result<Vec<Registration>> {
        let caller = self.authenticate(credential).await?;
        let tournament = self
            .store
            .tournament(id)
            .await?
            .ok_or_else(|| MarketError::not_found("tournament", id))?;
        if !caller.can_access(tournament.created_by) {
            return Err(MarketError::forbidden(
                "only the organizer or an admin may list registrations",
            ));
        }
        let mut registrations = self.store.registrations_for_tournament(id).await?;
        registrations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(registrations)
    }
}
