use super::constraints::{self, Snapshot};
use crate::domain::catalog::{CatalogItem, EntryFee};
use crate::domain::changeset::{Changeset, Write};
use crate::domain::identity::{Principal, Role};
use crate::domain::ids::{
    CatalogItemId, EntryFeeId, OrderId, PaymentId, ProofId, RegistrationId, TournamentId, UserId,
};
use crate::domain::order::Order;
use crate::domain::payment::Payment;
use crate::domain::ports::{BlobStore, Catalog, Identity, Store};
use crate::domain::proof::{ContentHash, PaymentProof};
use crate::domain::tournament::{Registration, Tournament};
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    order_codes: HashMap<String, OrderId>,
    idempotency_keys: HashMap<(UserId, String), OrderId>,
    payments: HashMap<PaymentId, Payment>,
    payment_references: HashMap<String, PaymentId>,
    proofs: HashMap<ProofId, PaymentProof>,
    proofs_by_payment: HashMap<PaymentId, Vec<ProofId>>,
    tournaments: HashMap<TournamentId, Tournament>,
    registrations: HashMap<RegistrationId, Registration>,
    active_registrations: HashMap<(TournamentId, UserId), RegistrationId>,
}

impl Tables {
    fn apply(&mut self, changes: Changeset) {
        for write in changes.into_writes() {
            match write {
                Write::Order { order, .. } => {
                    self.order_codes.insert(order.code.clone(), order.id);
                    if let Some(key) = &order.idempotency_key {
                        self.idempotency_keys
                            .insert((order.user_id, key.clone()), order.id);
                    }
                    self.orders.insert(order.id, order);
                }
                Write::Payment { payment, .. } => {
                    self.payment_references
                        .insert(payment.reference.clone(), payment.id);
                    self.payments.insert(payment.id, payment);
                }
                Write::Proof(proof) => {
                    self.proofs_by_payment
                        .entry(proof.payment_id)
                        .or_default()
                        .push(proof.id);
                    self.proofs.insert(proof.id, proof);
                }
                Write::Tournament { tournament, .. } => {
                    self.tournaments.insert(tournament.id, tournament);
                }
                Write::Registration { registration, .. } => {
                    let slot = (registration.tournament_id, registration.user_id);
                    if registration.status.is_active() {
                        self.active_registrations.insert(slot, registration.id);
                    } else if self.active_registrations.get(&slot) == Some(&registration.id) {
                        self.active_registrations.remove(&slot);
                    }
                    self.registrations.insert(registration.id, registration);
                }
            }
        }
    }
}

impl Snapshot for Tables {
    fn order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.get(&id).cloned())
    }

    fn order_id_by_code(&self, code: &str) -> Result<Option<OrderId>> {
        Ok(self.order_codes.get(code).copied())
    }

    fn order_id_by_key(&self, user: UserId, key: &str) -> Result<Option<OrderId>> {
        Ok(self.idempotency_keys.get(&(user, key.to_string())).copied())
    }

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.payments.get(&id).cloned())
    }

    fn payment_id_by_reference(&self, reference: &str) -> Result<Option<PaymentId>> {
        Ok(self.payment_references.get(reference).copied())
    }

    fn proof_exists(&self, id: ProofId) -> Result<bool> {
        Ok(self.proofs.contains_key(&id))
    }

    fn tournament(&self, id: TournamentId) -> Result<Option<Tournament>> {
        Ok(self.tournaments.get(&id).cloned())
    }

    fn registration(&self, id: RegistrationId) -> Result<Option<Registration>> {
        Ok(self.registrations.get(&id).cloned())
    }

    fn active_registration_id(
        &self,
        tournament: TournamentId,
        user: UserId,
    ) -> Result<Option<RegistrationId>> {
        Ok(self.active_registrations.get(&(tournament, user)).copied())
    }

    fn active_registration_count(&self, tournament: TournamentId) -> Result<u32> {
        let count = self
            .active_registrations
            .keys()
            .filter(|(t, _)| *t == tournament)
            .count();
        Ok(count as u32)
    }
}

/// A thread-safe in-memory implementation of [`Store`].
///
/// All tables live behind one `Arc<RwLock<..>>`. A commit holds the write lock while it
/// validates and applies, which makes every changeset atomic and serializes racing
/// writers. Ideal for tests and single-process runs.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        self.tables.read().await.order(id)
    }

    async fn order_by_code(&self, code: &str) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .order_codes
            .get(code)
            .and_then(|id| tables.orders.get(id))
            .cloned())
    }

    async fn order_by_idempotency_key(&self, user: UserId, key: &str) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .idempotency_keys
            .get(&(user, key.to_string()))
            .and_then(|id| tables.orders.get(id))
            .cloned())
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.user_id == user)
            .cloned()
            .collect())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        Ok(self.tables.read().await.orders.values().cloned().collect())
    }

    async fn payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.tables.read().await.payment(id)
    }

    async fn all_payments(&self) -> Result<Vec<Payment>> {
        Ok(self.tables.read().await.payments.values().cloned().collect())
    }

    async fn proofs_for_payment(&self, id: PaymentId) -> Result<Vec<PaymentProof>> {
        let tables = self.tables.read().await;
        Ok(tables
            .proofs_by_payment
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|proof_id| tables.proofs.get(proof_id))
            .cloned()
            .collect())
    }

    async fn tournament(&self, id: TournamentId) -> Result<Option<Tournament>> {
        self.tables.read().await.tournament(id)
    }

    async fn all_tournaments(&self) -> Result<Vec<Tournament>> {
        Ok(self
            .tables
            .read()
            .await
            .tournaments
            .values()
            .cloned()
            .collect())
    }

    async fn active_registration(
        &self,
        tournament: TournamentId,
        user: UserId,
    ) -> Result<Option<Registration>> {
        let tables = self.tables.read().await;
        Ok(tables
            .active_registrations
            .get(&(tournament, user))
            .and_then(|id| tables.registrations.get(id))
            .cloned())
    }

    async fn registrations_for_tournament(&self, id: TournamentId) -> Result<Vec<Registration>> {
        let tables = self.tables.read().await;
        Ok(tables
            .registrations
            .values()
            .filter(|r| r.tournament_id == id)
            .cloned()
            .collect())
    }

    async fn participant_count(&self, id: TournamentId) -> Result<u32> {
        self.tables.read().await.active_registration_count(id)
    }

    async fn commit(&self, changes: Changeset) -> Result<()> {
        let mut tables = self.tables.write().await;
        constraints::check(&*tables, &changes)?;
        tables.apply(changes);
        Ok(())
    }
}

/// Token-to-principal table standing in for the identity provider.
///
/// Roles can be changed at runtime, which is how tests observe that the engine never
/// trusts a role it looked up earlier.
#[derive(Default, Clone)]
pub struct InMemoryIdentity {
    principals: Arc<RwLock<HashMap<String, Principal>>>,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, token: impl Into<String>, user_id: UserId, role: Role) {
        self.principals
            .write()
            .await
            .insert(token.into(), Principal { user_id, role });
    }

    /// Changes the role of every token issued to `user_id`.
    pub async fn set_role(&self, user_id: UserId, role: Role) {
        let mut principals = self.principals.write().await;
        for principal in principals.values_mut().filter(|p| p.user_id == user_id) {
            principal.role = role;
        }
    }

    pub async fn revoke(&self, token: &str) {
        self.principals.write().await.remove(token);
    }
}

#[async_trait]
impl Identity for InMemoryIdentity {
    async fn authenticate(&self, credential: &str) -> Result<Principal> {
        self.principals
            .read()
            .await
            .get(credential)
            .copied()
            .ok_or(MarketError::Unauthenticated)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCatalog {
    items: Arc<RwLock<HashMap<CatalogItemId, CatalogItem>>>,
    fees: Arc<RwLock<HashMap<EntryFeeId, EntryFee>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_item(&self, item: CatalogItem) {
        self.items.write().await.insert(item.id, item);
    }

    pub async fn put_entry_fee(&self, fee: EntryFee) {
        self.fees.write().await.insert(fee.id, fee);
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn item(&self, id: CatalogItemId) -> Result<Option<CatalogItem>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn entry_fee(&self, id: EntryFeeId) -> Result<Option<EntryFee>> {
        Ok(self.fees.read().await.get(&id).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<HashMap<ContentHash, Arc<Vec<u8>>>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, hash: &ContentHash) -> Option<Arc<Vec<u8>>> {
        self.blobs.read().await.get(hash).cloned()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, hash: &ContentHash, bytes: &[u8]) -> Result<String> {
        self.blobs
            .write()
            .await
            .entry(hash.clone())
            .or_insert_with(|| Arc::new(bytes.to_vec()));
        Ok(format!("mem://payment-proofs/{hash}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::Role;
    use crate::domain::money::{Amount, Currency};
    use crate::domain::order::OrderStatus;
    use crate::domain::tournament::RegistrationStatus;
    use crate::error::{Constraint, StoreError};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(user: UserId, code: &str, key: Option<&str>) -> Order {
        Order {
            id: OrderId::new(),
            code: code.to_string(),
            user_id: user,
            catalog_item_id: CatalogItemId::new(),
            recipient_game_uid: "123456789".to_string(),
            total_amount: Amount::new(dec!(1600)).unwrap(),
            currency: Currency::xof(),
            idempotency_key: key.map(str::to_string),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            delivered_at: None,
        }
    }

    fn registration(tournament: TournamentId, user: UserId) -> Registration {
        Registration {
            id: RegistrationId::new(),
            tournament_id: tournament,
            user_id: user,
            status: RegistrationStatus::Registered,
            payment_id: None,
            team: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_in_memory_store_order_lookups() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let order = order(user, "FF1", Some("k1"));

        store
            .commit(Changeset::new().insert_order(order.clone()))
            .await
            .unwrap();

        assert_eq!(store.order(order.id).await.unwrap(), Some(order.clone()));
        assert_eq!(store.order_by_code("FF1").await.unwrap(), Some(order.clone()));
        assert_eq!(
            store.order_by_idempotency_key(user, "k1").await.unwrap(),
            Some(order.clone())
        );
        assert!(
            store
                .order_by_idempotency_key(UserId::new(), "k1")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(store.orders_for_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unique_indexes_reject_duplicates() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        store
            .commit(Changeset::new().insert_order(order(user, "FF1", Some("k1"))))
            .await
            .unwrap();

        let same_code = store
            .commit(Changeset::new().insert_order(order(user, "FF1", None)))
            .await;
        assert!(matches!(
            same_code,
            Err(MarketError::Store(StoreError::UniqueViolation(
                Constraint::OrderCode
            )))
        ));

        let same_key = store
            .commit(Changeset::new().insert_order(order(user, "FF2", Some("k1"))))
            .await;
        assert!(matches!(
            same_key,
            Err(MarketError::Store(StoreError::UniqueViolation(
                Constraint::IdempotencyKey
            )))
        ));

        // The same key is free for another user.
        store
            .commit(Changeset::new().insert_order(order(UserId::new(), "FF3", Some("k1"))))
            .await
            .unwrap();
        assert_eq!(store.all_orders().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_commit_applies_nothing() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let first = order(user, "FF1", None);
        store
            .commit(Changeset::new().insert_order(first.clone()))
            .await
            .unwrap();

        let mut paid = first.clone();
        paid.status = OrderStatus::Paid;
        let fresh = order(user, "FF9", None);

        // Second write is stale: the order is pending, not paid.
        let result = store
            .commit(
                Changeset::new()
                    .insert_order(fresh.clone())
                    .update_order(paid, OrderStatus::Paid),
            )
            .await;
        assert!(matches!(
            result,
            Err(MarketError::Store(StoreError::StaleWrite { .. }))
        ));
        assert!(store.order(fresh.id).await.unwrap().is_none());
        assert_eq!(
            store.order(first.id).await.unwrap().unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_active_registration_index_and_capacity() {
        let store = InMemoryStore::new();
        let tournament = TournamentId::new();
        let user = UserId::new();

        let first = registration(tournament, user);
        store
            .commit(Changeset::new().insert_registration(first.clone(), Some(2)))
            .await
            .unwrap();

        let duplicate = store
            .commit(Changeset::new().insert_registration(registration(tournament, user), None))
            .await;
        assert!(matches!(
            duplicate,
            Err(MarketError::Store(StoreError::UniqueViolation(
                Constraint::ActiveRegistration
            )))
        ));

        store
            .commit(
                Changeset::new().insert_registration(registration(tournament, UserId::new()), Some(2)),
            )
            .await
            .unwrap();
        let full = store
            .commit(
                Changeset::new().insert_registration(registration(tournament, UserId::new()), Some(2)),
            )
            .await;
        assert!(matches!(
            full,
            Err(MarketError::Store(StoreError::CapacityReached(_)))
        ));

        // Cancelling frees the slot for the same user.
        let mut cancelled = first.clone();
        cancelled.status = RegistrationStatus::Cancelled;
        store
            .commit(Changeset::new().update_registration(cancelled, RegistrationStatus::Registered))
            .await
            .unwrap();
        assert!(
            store
                .active_registration(tournament, user)
                .await
                .unwrap()
                .is_none()
        );
        store
            .commit(Changeset::new().insert_registration(registration(tournament, user), Some(2)))
            .await
            .unwrap();
        assert_eq!(
            store
                .registrations_for_tournament(tournament)
                .await
                .unwrap()
                .len(),
            3
        );
    }

    #[tokio::test]
    async fn test_identity_role_changes_are_visible() {
        let identity = InMemoryIdentity::new();
        let user = UserId::new();
        identity.insert("tok", user, Role::Admin).await;
        assert_eq!(identity.authenticate("tok").await.unwrap().role, Role::Admin);

        identity.set_role(user, Role::User).await;
        assert_eq!(identity.authenticate("tok").await.unwrap().role, Role::User);

        identity.revoke("tok").await;
        assert!(matches!(
            identity.authenticate("tok").await,
            Err(MarketError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_blob_store_is_content_addressed() {
        let blobs = InMemoryBlobStore::new();
        let hash = ContentHash::of(b"receipt");
        let first = blobs.put(&hash, b"receipt").await.unwrap();
        let second = blobs.put(&hash, b"receipt").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(blobs.len().await, 1);
        assert_eq!(blobs.get(&hash).await.unwrap().as_slice(), b"receipt");
    }
}
