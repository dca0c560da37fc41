#![allow(dead_code)]

use arena_ledger::application::config::MarketConfig;
use arena_ledger::application::engine::Marketplace;
use arena_ledger::domain::catalog::{CatalogItem, EntryFee};
use arena_ledger::domain::identity::Role;
use arena_ledger::domain::ids::{CatalogItemId, EntryFeeId, UserId};
use arena_ledger::domain::money::{Amount, Currency};
use arena_ledger::domain::order::Order;
use arena_ledger::domain::payment::{Payment, PaymentKind};
use arena_ledger::domain::tournament::{GameMode, Tournament, TournamentDraft, Visibility};
use arena_ledger::application::ledger::CheckoutRequest;
use arena_ledger::infrastructure::clock::FixedClock;
use arena_ledger::infrastructure::in_memory::{
    InMemoryBlobStore, InMemoryCatalog, InMemoryIdentity, InMemoryStore,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub const ALICE: &str = "alice-token";
pub const BOB: &str = "bob-token";
pub const OLGA: &str = "olga-token";
pub const ROOT: &str = "root-token";
pub const RECIPIENT: &str = "123456789";

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nreceipt-mtn-momo-2000";

/// A marketplace on in-memory adapters with two players, an organizer and an admin.
///
/// The clock is frozen at 2026-10-19 12:00 UTC until a test advances it.
pub struct Harness {
    pub market: Arc<Marketplace>,
    pub identity: InMemoryIdentity,
    pub blobs: InMemoryBlobStore,
    pub clock: FixedClock,
    pub alice: UserId,
    pub bob: UserId,
    pub olga: UserId,
    pub root: UserId,
    /// `FF-1000`, 1000 XOF, no longer for sale.
    pub retired_item: CatalogItemId,
    /// `FF-2000`, 2000 XOF.
    pub diamonds: CatalogItemId,
    /// `standard`, 500 XOF.
    pub standard_fee: EntryFeeId,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(MarketConfig::default()).await
    }

    pub async fn with_config(config: MarketConfig) -> Self {
        let identity = InMemoryIdentity::new();
        let (alice, bob, olga, root) = (UserId::new(), UserId::new(), UserId::new(), UserId::new());
        identity.insert(ALICE, alice, Role::User).await;
        identity.insert(BOB, bob, Role::User).await;
        identity.insert(OLGA, olga, Role::Organizer).await;
        identity.insert(ROOT, root, Role::Admin).await;

        let catalog = InMemoryCatalog::new();
        let retired_item = CatalogItemId::new();
        catalog
            .put_item(CatalogItem {
                id: retired_item,
                sku: "FF-1000".to_string(),
                title: "1000 Diamonds".to_string(),
                price: Amount::new(dec!(1000)).unwrap(),
                currency: Currency::xof(),
                active: false,
            })
            .await;
        let diamonds = CatalogItemId::new();
        catalog
            .put_item(CatalogItem {
                id: diamonds,
                sku: "FF-2000".to_string(),
                title: "2000 Diamonds".to_string(),
                price: Amount::new(dec!(2000)).unwrap(),
                currency: Currency::xof(),
                active: true,
            })
            .await;
        let standard_fee = EntryFeeId::new();
        catalog
            .put_entry_fee(EntryFee {
                id: standard_fee,
                name: "standard".to_string(),
                amount: Amount::new(dec!(500)).unwrap(),
                currency: Currency::xof(),
            })
            .await;

        let blobs = InMemoryBlobStore::new();
        let clock = FixedClock::new(Self::epoch());
        let market = Marketplace::new(
            Box::new(InMemoryStore::new()),
            Box::new(identity.clone()),
            Box::new(catalog),
            Box::new(blobs.clone()),
        )
        .with_clock(Box::new(clock.clone()))
        .with_config(config);

        Self {
            market: Arc::new(market),
            identity,
            blobs,
            clock,
            alice,
            bob,
            olga,
            root,
            retired_item,
            diamonds,
            standard_fee,
        }
    }

    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    pub fn draft(visibility: Visibility, fee: Option<EntryFeeId>, max: Option<u32>) -> TournamentDraft {
        TournamentDraft {
            title: "Friday Night Cup".to_string(),
            visibility,
            mode: GameMode::BrSquad,
            start_at: Self::epoch() + Duration::days(7),
            entry_fee_id: fee,
            max_participants: max,
            description: None,
            prize_pool: Decimal::ZERO,
        }
    }

    /// A tournament created by the organizer and approved by the admin.
    pub async fn open_tournament(
        &self,
        visibility: Visibility,
        fee: Option<EntryFeeId>,
        max: Option<u32>,
    ) -> Tournament {
        let created = self
            .market
            .create_tournament(OLGA, Self::draft(visibility, fee, max))
            .await
            .unwrap();
        let approved = self
            .market
            .approve_tournament(ROOT, created.id)
            .await
            .unwrap();
        // Approval output is the stored row and still carries the code.
        assert_eq!(approved.access_code, created.access_code);
        approved
    }

    pub async fn diamonds_order(&self, credential: &str) -> Order {
        self.market
            .create_order(credential, self.diamonds, RECIPIENT, None)
            .await
            .unwrap()
    }

    pub async fn checkout_order(&self, credential: &str, order: &Order) -> Payment {
        self.market
            .initiate_checkout(credential, order_checkout(order.id.0, dec!(2000)))
            .await
            .unwrap()
    }
}

pub fn order_checkout(target: uuid::Uuid, amount: Decimal) -> CheckoutRequest {
    CheckoutRequest {
        kind: PaymentKind::Order,
        target_id: target,
        amount,
        method: "mtn_momo".to_string(),
        country_code: "BJ".to_string(),
    }
}

pub fn entry_fee_checkout(target: uuid::Uuid, amount: Decimal) -> CheckoutRequest {
    CheckoutRequest {
        kind: PaymentKind::EntryFee,
        target_id: target,
        amount,
        method: "moov_money".to_string(),
        country_code: "CI".to_string(),
    }
}
