use super::engine::{Marketplace, settle};
use crate::domain::changeset::Changeset;
use crate::domain::codes;
use crate::domain::ids::{CatalogItemId, OrderId, PaymentId, TournamentId};
use crate::domain::money::{Amount, Currency};
use crate::domain::order::{self, Order, OrderStatus};
use crate::domain::payment::{self, Payment, PaymentKind, PaymentStatus};
use crate::domain::tournament::RegistrationStatus;
use crate::error::{Constraint, InputError, MarketError, Result, StoreError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Arguments of [`Marketplace::initiate_checkout`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub kind: PaymentKind,
    /// Order id for `PaymentKind::Order`, tournament id for `PaymentKind::EntryFee`.
    pub target_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub country_code: String,
}

impl Marketplace {
    /// Creates a pending order for one catalog item.
    ///
    /// With an idempotency key, a repeated call (or a concurrent one that loses the
    /// race at commit) returns the order already stored for `(caller, key)`.
    pub async fn create_order(
        &self,
        credential: &str,
        item_id: CatalogItemId,
        recipient_game_uid: &str,
        idempotency_key: Option<&str>,
    ) -> Result<Order> {
        let caller = self.authenticate(credential).await?;

        if let Some(key) = idempotency_key {
            order::validate_idempotency_key(key)?;
            if let Some(existing) = self
                .store
                .order_by_idempotency_key(caller.user_id, key)
                .await?
            {
                debug!(code = %existing.code, "idempotent replay of create_order");
                return Ok(existing);
            }
        }

        order::validate_recipient_uid(recipient_game_uid)?;
        let item = self
            .catalog
            .item(item_id)
            .await?
            .ok_or_else(|| MarketError::not_found("catalog item", item_id))?;
        if !item.active {
            return Err(MarketError::Unavailable(format!(
                "catalog item {} is not for sale",
                item.sku
            )));
        }

        let now = self.clock.now();
        for _ in 0..self.config.allocation_attempts {
            let order = Order {
                id: OrderId::new(),
                code: codes::order_code(caller.user_id, now),
                user_id: caller.user_id,
                catalog_item_id: item.id,
                recipient_game_uid: recipient_game_uid.trim().to_string(),
                total_amount: item.price,
                currency: item.currency.clone(),
                idempotency_key: idempotency_key.map(str::to_string),
                status: OrderStatus::Pending,
                created_at: now,
                delivered_at: None,
            };
            match self
                .store
                .commit(Changeset::new().insert_order(order.clone()))
                .await
            {
                Ok(()) => {
                    info!(code = %order.code, user = %caller.user_id, sku = %item.sku, "order created");
                    return Ok(order);
                }
                Err(MarketError::Store(StoreError::UniqueViolation(Constraint::OrderCode))) => {
                    debug!(code = %order.code, "order code collision, allocating again");
                }
                Err(err @ MarketError::Store(StoreError::UniqueViolation(Constraint::IdempotencyKey))) => {
                    if let Some(key) = idempotency_key
                        && let Some(winner) = self
                            .store
                            .order_by_idempotency_key(caller.user_id, key)
                            .await?
                    {
                        debug!(code = %winner.code, "lost idempotency race, returning stored order");
                        return Ok(winner);
                    }
                    return Err(settle(err));
                }
                Err(err) => return Err(settle(err)),
            }
        }
        Err(MarketError::conflict("could not allocate a unique order code"))
    }

    /// Declares an out-of-band transfer for an order or a tournament entry fee.
    pub async fn initiate_checkout(
        &self,
        credential: &str,
        request: CheckoutRequest,
    ) -> Result<Payment> {
        let caller = self.authenticate(credential).await?;
        let country = request.country_code.trim().to_ascii_uppercase();
        payment::ensure_method_allowed(&request.method, &country)?;
        let amount = Amount::new(request.amount)?;

        let (expected, currency): (Amount, Currency) = match request.kind {
            PaymentKind::Order => {
                let order_id = OrderId(request.target_id);
                let order = self
                    .store
                    .order(order_id)
                    .await?
                    .ok_or_else(|| MarketError::not_found("order", order_id))?;
                if order.user_id != caller.user_id {
                    return Err(MarketError::forbidden("order belongs to another user"));
                }
                if order.status != OrderStatus::Pending {
                    return Err(MarketError::conflict(format!(
                        "order {} is {}, expected pending",
                        order.code, order.status
                    )));
                }
                (order.total_amount, order.currency)
            }
            PaymentKind::EntryFee => {
                let tournament_id = TournamentId(request.target_id);
                let tournament = self
                    .store
                    .tournament(tournament_id)
                    .await?
                    .ok_or_else(|| MarketError::not_found("tournament", tournament_id))?;
                if !tournament.is_open(self.clock.now()) {
                    return Err(MarketError::conflict(format!(
                        "tournament {tournament_id} is not open for registration"
                    )));
                }
                let fee_id = tournament.entry_fee_id.ok_or(InputError::Malformed {
                    field: "target_id",
                    reason: "tournament has no entry fee".to_string(),
                })?;
                let fee = self
                    .catalog
                    .entry_fee(fee_id)
                    .await?
                    .ok_or_else(|| MarketError::not_found("entry fee", fee_id))?;
                let registered = self
                    .store
                    .active_registration(tournament_id, caller.user_id)
                    .await?
                    .is_some_and(|r| r.status == RegistrationStatus::Registered);
                if !registered {
                    return Err(MarketError::conflict(format!(
                        "no unpaid registration on tournament {tournament_id}"
                    )));
                }
                (fee.amount, fee.currency)
            }
        };

        if amount != expected {
            return Err(InputError::AmountMismatch {
                expected: expected.value(),
                actual: amount.value(),
            }
            .into());
        }

        let now = self.clock.now();
        for _ in 0..self.config.allocation_attempts {
            let payment = Payment {
                id: PaymentId::new(),
                kind: request.kind,
                target_id: request.target_id,
                user_id: caller.user_id,
                amount,
                currency: currency.clone(),
                method: request.method.clone(),
                country_code: country.clone(),
                reference: codes::payment_reference(now),
                status: PaymentStatus::Initiated,
                created_at: now,
                validated_at: None,
                rejected_at: None,
                rejection_reason: None,
            };
            match self
                .store
                .commit(Changeset::new().insert_payment(payment.clone()))
                .await
            {
                Ok(()) => {
                    info!(
                        reference = %payment.reference,
                        kind = payment.kind.as_str(),
                        target = %payment.target_id,
                        amount = %payment.amount,
                        "checkout initiated"
                    );
                    return Ok(payment);
                }
                Err(MarketError::Store(StoreError::UniqueViolation(
                    Constraint::PaymentReference,
                ))) => {
                    debug!(reference = %payment.reference, "payment reference collision, allocating again");
                }
                Err(err) => return Err(settle(err)),
            }
        }
        Err(MarketError::conflict(
            "could not allocate a unique payment reference",
        ))
    }

    /// Accepts a payment and marks its order or registration paid in the same commit.
    pub async fn validate_payment(&self, credential: &str, payment_id: PaymentId) -> Result<Payment> {
        self.require_admin(credential).await?;
        let mut payment = self
            .store
            .payment(payment_id)
            .await?
            .ok_or_else(|| MarketError::not_found("payment", payment_id))?;
        let from = payment.status;
        payment.validate(self.clock.now())?;

        let changes = match payment.kind {
            PaymentKind::Order => {
                let mut order = self
                    .store
                    .order(OrderId(payment.target_id))
                    .await?
                    .ok_or_else(|| {
                        MarketError::conflict(format!(
                            "order {} of payment {} no longer exists",
                            payment.target_id, payment.reference
                        ))
                    })?;
                order.mark_paid()?;
                Changeset::new().update_order(order, OrderStatus::Pending)
            }
            PaymentKind::EntryFee => {
                let mut registration = self
                    .store
                    .active_registration(TournamentId(payment.target_id), payment.user_id)
                    .await?
                    .ok_or_else(|| {
                        MarketError::conflict(format!(
                            "payment {} has no active registration to settle",
                            payment.reference
                        ))
                    })?;
                registration.mark_paid(payment.id)?;
                Changeset::new().update_registration(registration, RegistrationStatus::Registered)
            }
        };

        self.commit(changes.update_payment(payment.clone(), from))
            .await?;
        info!(reference = %payment.reference, kind = payment.kind.as_str(), "payment validated");
        Ok(payment)
    }

    pub async fn reject_payment(
        &self,
        credential: &str,
        payment_id: PaymentId,
        reason: Option<String>,
    ) -> Result<Payment> {
        self.require_admin(credential).await?;
        let mut payment = self
            .store
            .payment(payment_id)
            .await?
            .ok_or_else(|| MarketError::not_found("payment", payment_id))?;
        let from = payment.status;
        payment.reject(self.clock.now(), reason)?;
        self.commit(Changeset::new().update_payment(payment.clone(), from))
            .await?;
        info!(reference = %payment.reference, "payment rejected");
        Ok(payment)
    }

    /// Records that a paid order's item reached the player.
    pub async fn deliver_order(&self, credential: &str, code: &str) -> Result<Order> {
        self.require_admin(credential).await?;
        let mut order = self
            .store
            .order_by_code(code)
            .await?
            .ok_or_else(|| MarketError::not_found("order", code))?;
        order.deliver(self.clock.now())?;
        self.commit(Changeset::new().update_order(order.clone(), OrderStatus::Paid))
            .await?;
        info!(code = %order.code, "order delivered");
        Ok(order)
    }
}
