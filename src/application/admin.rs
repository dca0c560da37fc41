use super::engine::Marketplace;
use crate::domain::identity::Principal;
use crate::domain::payment::{Payment, PaymentStatus};
use crate::error::{MarketError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// A payment awaiting a decision, with the number of proofs attached so far.
#[derive(Debug, Clone, Serialize)]
pub struct PendingPayment {
    pub payment: Payment,
    pub proof_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlatformStats {
    pub total_orders: usize,
    pub total_payments: usize,
    pub total_tournaments: usize,
    /// Sum of validated payments, keyed by currency code.
    pub revenue: BTreeMap<String, Decimal>,
    pub pending_payments: usize,
    pub open_tournaments: usize,
}

impl Marketplace {
    /// Authenticates `credential` and insists on the admin role as of right now.
    pub(crate) async fn require_admin(&self, credential: &str) -> Result<Principal> {
        let caller = self.authenticate(credential).await?;
        if !caller.is_admin() {
            return Err(MarketError::forbidden("admin role required"));
        }
        Ok(caller)
    }

    /// Payments still `initiated` or `pending_review`, newest first.
    pub async fn pending_payments(&self, credential: &str) -> Result<Vec<PendingPayment>> {
        self.require_admin(credential).await?;
        let mut payments: Vec<Payment> = self
            .store
            .all_payments()
            .await?
            .into_iter()
            .filter(|p| !p.status.is_terminal())
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut pending = Vec::with_capacity(payments.len());
        for payment in payments {
            let proof_count = self.store.proofs_for_payment(payment.id).await?.len();
            pending.push(PendingPayment {
                payment,
                proof_count,
            });
        }
        Ok(pending)
    }

    pub async fn stats(&self, credential: &str) -> Result<PlatformStats> {
        self.require_admin(credential).await?;
        let orders = self.store.all_orders().await?;
        let payments = self.store.all_payments().await?;
        let tournaments = self.store.all_tournaments().await?;
        let now = self.clock.now();

        let mut stats = PlatformStats {
            total_orders: orders.len(),
            total_payments: payments.len(),
            total_tournaments: tournaments.len(),
            open_tournaments: tournaments.iter().filter(|t| t.is_open(now)).count(),
            ..Default::default()
        };
        for payment in &payments {
            match payment.status {
                PaymentStatus::Validated => {
                    *stats
                        .revenue
                        .entry(payment.currency.to_string())
                        .or_default() += payment.amount.value();
                }
                PaymentStatus::Initiated | PaymentStatus::PendingReview => {
                    stats.pending_payments += 1;
                }
                PaymentStatus::Rejected => {}
            }
        }
        Ok(stats)
    }
}
