use super::constraints::{self, Snapshot};
use crate::domain::changeset::{Changeset, Write};
use crate::domain::ids::{
    OrderId, PaymentId, ProofId, RegistrationId, TournamentId, UserId,
};
use crate::domain::order::Order;
use crate::domain::payment::Payment;
use crate::domain::ports::Store;
use crate::domain::proof::PaymentProof;
use crate::domain::tournament::{Registration, Tournament};
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Column Family for orders, keyed by order id.
pub const CF_ORDERS: &str = "orders";
/// Column Family for payments, keyed by payment id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for proofs, keyed by payment id followed by proof id.
pub const CF_PROOFS: &str = "proofs";
/// Column Family for tournaments, keyed by tournament id.
pub const CF_TOURNAMENTS: &str = "tournaments";
/// Column Family for registrations, keyed by tournament id followed by registration id.
pub const CF_REGISTRATIONS: &str = "registrations";
/// Column Family for secondary indexes, mapping a textual key to a primary id.
pub const CF_INDEXES: &str = "indexes";

const ALL_CFS: [&str; 6] = [
    CF_ORDERS,
    CF_PAYMENTS,
    CF_PROOFS,
    CF_TOURNAMENTS,
    CF_REGISTRATIONS,
    CF_INDEXES,
];

fn code_key(code: &str) -> String {
    format!("order-code:{code}")
}

fn idempotency_key(user: UserId, key: &str) -> String {
    format!("order-key:{user}:{key}")
}

fn reference_key(reference: &str) -> String {
    format!("payment-ref:{reference}")
}

fn proof_key(id: ProofId) -> String {
    format!("proof:{id}")
}

fn active_key(tournament: TournamentId, user: UserId) -> String {
    format!("{}{user}", active_prefix(tournament))
}

fn active_prefix(tournament: TournamentId) -> String {
    format!("active-registration:{tournament}:")
}

fn user_orders_prefix(user: UserId) -> String {
    format!("order-user:{user}:")
}

fn registration_index_key(id: RegistrationId) -> String {
    format!("registration:{id}")
}

fn registration_key(tournament: TournamentId, id: RegistrationId) -> Vec<u8> {
    let mut key = tournament.as_bytes().to_vec();
    key.extend_from_slice(id.as_bytes());
    key
}

/// A persistent store implementation using RocksDB.
///
/// Each entity lives in its own Column Family as JSON. Unique constraints are rows in
/// the `indexes` Column Family. Commits are serialized by an async mutex, validated
/// against the committed state, and written with a single `WriteBatch`, so a changeset
/// lands completely or not at all.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any missing
    /// column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, descriptors).map_err(StoreError::from)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Backend(format!("column family {name} not found")).into())
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &'static str, key: &[u8]) -> Result<Option<T>> {
        let handle = self.cf(cf)?;
        match self.db.get_cf(handle, key).map_err(StoreError::from)? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Corrupt(format!("{cf}: {e}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf: &'static str, prefix: &[u8]) -> Result<Vec<T>> {
        let handle = self.cf(cf)?;
        let mut values = Vec::new();
        let iter = self
            .db
            .iterator_cf(handle, IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item.map_err(StoreError::from)?;
            if !key.starts_with(prefix) {
                break;
            }
            let parsed = serde_json::from_slice(&value)
                .map_err(|e| StoreError::Corrupt(format!("{cf}: {e}")))?;
            values.push(parsed);
        }

        Ok(values)
    }

    /// Ids stored under every index key starting with `prefix`.
    fn index_scan(&self, prefix: &str) -> Result<Vec<Uuid>> {
        let handle = self.cf(CF_INDEXES)?;
        let prefix = prefix.as_bytes();
        let mut ids = Vec::new();
        let iter = self
            .db
            .iterator_cf(handle, IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item.map_err(StoreError::from)?;
            if !key.starts_with(prefix) {
                break;
            }
            let id = Uuid::from_slice(&value).map_err(|e| {
                StoreError::Corrupt(format!("index {}: {e}", String::from_utf8_lossy(&key)))
            })?;
            ids.push(id);
        }

        Ok(ids)
    }

    fn index(&self, key: &str) -> Result<Option<Uuid>> {
        let handle = self.cf(CF_INDEXES)?;
        match self.db.get_cf(handle, key.as_bytes()).map_err(StoreError::from)? {
            Some(bytes) => Uuid::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Corrupt(format!("index {key}: {e}")).into()),
            None => Ok(None),
        }
    }

    fn put_json(
        &self,
        batch: &mut WriteBatch,
        cf: &'static str,
        key: &[u8],
        value: &impl Serialize,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| StoreError::Corrupt(format!("{cf}: {e}")))?;
        batch.put_cf(self.cf(cf)?, key, bytes);
        Ok(())
    }

    fn batch_for(&self, changes: Changeset) -> Result<WriteBatch> {
        let mut batch = WriteBatch::default();
        let indexes = self.cf(CF_INDEXES)?;

        for write in changes.into_writes() {
            match write {
                Write::Order { order, .. } => {
                    self.put_json(&mut batch, CF_ORDERS, order.id.as_bytes(), &order)?;
                    batch.put_cf(indexes, code_key(&order.code), order.id.as_bytes());
                    batch.put_cf(
                        indexes,
                        format!("{}{}", user_orders_prefix(order.user_id), order.id),
                        order.id.as_bytes(),
                    );
                    if let Some(key) = &order.idempotency_key {
                        batch.put_cf(
                            indexes,
                            idempotency_key(order.user_id, key),
                            order.id.as_bytes(),
                        );
                    }
                }
                Write::Payment { payment, .. } => {
                    self.put_json(&mut batch, CF_PAYMENTS, payment.id.as_bytes(), &payment)?;
                    batch.put_cf(
                        indexes,
                        reference_key(&payment.reference),
                        payment.id.as_bytes(),
                    );
                }
                Write::Proof(proof) => {
                    let mut key = proof.payment_id.as_bytes().to_vec();
                    key.extend_from_slice(proof.id.as_bytes());
                    self.put_json(&mut batch, CF_PROOFS, &key, &proof)?;
                    batch.put_cf(indexes, proof_key(proof.id), proof.payment_id.as_bytes());
                }
                Write::Tournament { tournament, .. } => {
                    self.put_json(
                        &mut batch,
                        CF_TOURNAMENTS,
                        tournament.id.as_bytes(),
                        &tournament,
                    )?;
                }
                Write::Registration { registration, .. } => {
                    self.put_json(
                        &mut batch,
                        CF_REGISTRATIONS,
                        &registration_key(registration.tournament_id, registration.id),
                        &registration,
                    )?;
                    batch.put_cf(
                        indexes,
                        registration_index_key(registration.id),
                        registration.tournament_id.as_bytes(),
                    );
                    let slot = active_key(registration.tournament_id, registration.user_id);
                    if registration.status.is_active() {
                        batch.put_cf(indexes, slot, registration.id.as_bytes());
                    } else if self.index(&slot)? == Some(registration.id.0) {
                        batch.delete_cf(indexes, slot);
                    }
                }
            }
        }

        Ok(batch)
    }
}

impl Snapshot for RocksDBStore {
    fn order(&self, id: OrderId) -> Result<Option<Order>> {
        self.get_json(CF_ORDERS, id.as_bytes())
    }

    fn order_id_by_code(&self, code: &str) -> Result<Option<OrderId>> {
        Ok(self.index(&code_key(code))?.map(OrderId))
    }

    fn order_id_by_key(&self, user: UserId, key: &str) -> Result<Option<OrderId>> {
        Ok(self.index(&idempotency_key(user, key))?.map(OrderId))
    }

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.get_json(CF_PAYMENTS, id.as_bytes())
    }

    fn payment_id_by_reference(&self, reference: &str) -> Result<Option<PaymentId>> {
        Ok(self.index(&reference_key(reference))?.map(PaymentId))
    }

    fn proof_exists(&self, id: ProofId) -> Result<bool> {
        Ok(self.index(&proof_key(id))?.is_some())
    }

    fn tournament(&self, id: TournamentId) -> Result<Option<Tournament>> {
        self.get_json(CF_TOURNAMENTS, id.as_bytes())
    }

    fn registration(&self, id: RegistrationId) -> Result<Option<Registration>> {
        match self.index(&registration_index_key(id))? {
            Some(tournament) => {
                self.get_json(CF_REGISTRATIONS, &registration_key(TournamentId(tournament), id))
            }
            None => Ok(None),
        }
    }

    fn active_registration_id(
        &self,
        tournament: TournamentId,
        user: UserId,
    ) -> Result<Option<RegistrationId>> {
        Ok(self.index(&active_key(tournament, user))?.map(RegistrationId))
    }

    fn active_registration_count(&self, tournament: TournamentId) -> Result<u32> {
        Ok(self.index_scan(&active_prefix(tournament))?.len() as u32)
    }
}

#[async_trait]
impl Store for RocksDBStore {
    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        Snapshot::order(self, id)
    }

    async fn order_by_code(&self, code: &str) -> Result<Option<Order>> {
        match self.order_id_by_code(code)? {
            Some(id) => Snapshot::order(self, id),
            None => Ok(None),
        }
    }

    async fn order_by_idempotency_key(&self, user: UserId, key: &str) -> Result<Option<Order>> {
        match self.order_id_by_key(user, key)? {
            Some(id) => Snapshot::order(self, id),
            None => Ok(None),
        }
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>> {
        let mut orders = Vec::new();
        for id in self.index_scan(&user_orders_prefix(user))? {
            if let Some(order) = Snapshot::order(self, OrderId(id))? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        self.scan(CF_ORDERS, &[])
    }

    async fn payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        Snapshot::payment(self, id)
    }

    async fn all_payments(&self) -> Result<Vec<Payment>> {
        self.scan(CF_PAYMENTS, &[])
    }

    async fn proofs_for_payment(&self, id: PaymentId) -> Result<Vec<PaymentProof>> {
        self.scan(CF_PROOFS, id.as_bytes())
    }

    async fn tournament(&self, id: TournamentId) -> Result<Option<Tournament>> {
        Snapshot::tournament(self, id)
    }

    async fn all_tournaments(&self) -> Result<Vec<Tournament>> {
        self.scan(CF_TOURNAMENTS, &[])
    }

    async fn active_registration(
        &self,
        tournament: TournamentId,
        user: UserId,
    ) -> Result<Option<Registration>> {
        match self.active_registration_id(tournament, user)? {
            Some(id) => Snapshot::registration(self, id),
            None => Ok(None),
        }
    }

    async fn registrations_for_tournament(&self, id: TournamentId) -> Result<Vec<Registration>> {
        self.scan(CF_REGISTRATIONS, id.as_bytes())
    }

    async fn participant_count(&self, id: TournamentId) -> Result<u32> {
        Snapshot::active_registration_count(self, id)
    }

    async fn commit(&self, changes: Changeset) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        constraints::check(self, &changes)?;
        let batch = self.batch_for(changes)?;
        self.db.write(batch).map_err(StoreError::from)?;
        Ok(())
    }
}
