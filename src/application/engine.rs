use super::config::MarketConfig;
use crate::domain::changeset::Changeset;
use crate::domain::identity::Principal;
use crate::domain::ports::{BlobStoreBox, CatalogBox, ClockBox, IdentityBox, StoreBox};
use crate::error::{Constraint, MarketError, Result, StoreError};
use crate::infrastructure::clock::SystemClock;
use tracing::warn;

/// The transactional lifecycle engine for orders, payments and tournament registrations.
///
/// `Marketplace` holds no per-request state: every operation authenticates its caller,
/// reads what it needs from the store and finishes with a single atomic commit. Share it
/// across tasks as `Arc<Marketplace>`.
///
/// Operations are grouped by concern in sibling modules: `ledger` (orders and payments),
/// `proof_intake`, `registry` (tournaments), `admin` (the admin gate and review queue)
/// and `queries` (read-only views).
pub struct Marketplace {
    pub(crate) store: StoreBox,
    pub(crate) identity: IdentityBox,
    pub(crate) catalog: CatalogBox,
    pub(crate) blobs: BlobStoreBox,
    pub(crate) clock: ClockBox,
    pub(crate) config: MarketConfig,
}

impl Marketplace {
    /// Creates a new `Marketplace` on the system clock with default configuration.
    ///
    /// # Arguments
    ///
    /// * `store` - Transactional persistence for all lifecycle entities.
    /// * `identity` - Resolves credentials to the caller's current role.
    /// * `catalog` - Read-only source of item prices and entry fees.
    /// * `blobs` - Content-addressed storage for payment proof files.
    pub fn new(
        store: StoreBox,
        identity: IdentityBox,
        catalog: CatalogBox,
        blobs: BlobStoreBox,
    ) -> Self {
        Self {
            store,
            identity,
            catalog,
            blobs,
            clock: Box::new(SystemClock),
            config: MarketConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: ClockBox) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: MarketConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Asks the identity provider who is calling. Never cached.
    pub(crate) async fn authenticate(&self, credential: &str) -> Result<Principal> {
        self.identity.authenticate(credential).await
    }

    pub(crate) async fn commit(&self, changes: Changeset) -> Result<()> {
        self.store.commit(changes).await.map_err(settle)
    }
}

/// Turns storage-level rejections into the `Conflict` a caller sees.
pub(crate) fn settle(err: MarketError) -> MarketError {
    let reason = match &err {
        MarketError::Store(StoreError::UniqueViolation(Constraint::ActiveRegistration)) => {
            Some("already registered for this tournament".to_string())
        }
        MarketError::Store(StoreError::UniqueViolation(constraint)) => {
            Some(format!("{constraint} already exists"))
        }
        MarketError::Store(StoreError::StaleWrite { entity, id }) => {
            Some(format!("{entity} {id} was modified by a concurrent request"))
        }
        MarketError::Store(StoreError::CapacityReached(id)) => {
            Some(format!("tournament {id} is full"))
        }
        _ => None,
    };
    let Some(reason) = reason else {
        return err;
    };
    warn!(error = %err, "commit rejected");
    MarketError::Conflict(reason)
}
