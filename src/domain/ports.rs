use super::catalog::{CatalogItem, EntryFee};
use super::changeset::Changeset;
use super::identity::Principal;
use super::ids::{CatalogItemId, EntryFeeId, OrderId, PaymentId, TournamentId, UserId};
use super::order::Order;
use super::payment::Payment;
use super::proof::{ContentHash, PaymentProof};
use super::tournament::{Registration, Tournament};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Transactional persistence for orders, payments, proofs, tournaments and registrations.
///
/// Reads observe committed state only. `commit` checks every precondition and unique
/// index in the changeset and then applies all writes, or fails without applying any.
#[async_trait]
pub trait Store: Send + Sync {
    async fn order(&self, id: OrderId) -> Result<Option<Order>>;
    async fn order_by_code(&self, code: &str) -> Result<Option<Order>>;
    async fn order_by_idempotency_key(&self, user: UserId, key: &str) -> Result<Option<Order>>;
    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>>;
    async fn all_orders(&self) -> Result<Vec<Order>>;

    async fn payment(&self, id: PaymentId) -> Result<Option<Payment>>;
    async fn all_payments(&self) -> Result<Vec<Payment>>;
    async fn proofs_for_payment(&self, id: PaymentId) -> Result<Vec<PaymentProof>>;

    async fn tournament(&self, id: TournamentId) -> Result<Option<Tournament>>;
    async fn all_tournaments(&self) -> Result<Vec<Tournament>>;

    /// The non-cancelled registration of `user` on `tournament`, if any.
    async fn active_registration(
        &self,
        tournament: TournamentId,
        user: UserId,
    ) -> Result<Option<Registration>>;
    async fn registrations_for_tournament(&self, id: TournamentId) -> Result<Vec<Registration>>;
    /// Number of non-cancelled registrations on the tournament.
    async fn participant_count(&self, id: TournamentId) -> Result<u32>;

    async fn commit(&self, changes: Changeset) -> Result<()>;
}

/// Resolves a credential to the caller's current user id and role.
#[async_trait]
pub trait Identity: Send + Sync {
    async fn authenticate(&self, credential: &str) -> Result<Principal>;
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn item(&self, id: CatalogItemId) -> Result<Option<CatalogItem>>;
    async fn entry_fee(&self, id: EntryFeeId) -> Result<Option<EntryFee>>;
}

/// Content-addressed file storage. Putting the same hash twice is a no-op.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, hash: &ContentHash, bytes: &[u8]) -> Result<String>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type StoreBox = Box<dyn Store>;
pub type IdentityBox = Box<dyn Identity>;
pub type CatalogBox = Box<dyn Catalog>;
pub type BlobStoreBox = Box<dyn BlobStore>;
pub type ClockBox = Box<dyn Clock>;
