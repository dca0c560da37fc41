mod common;

use arena_ledger::domain::order::OrderStatus;
use arena_ledger::error::{InputError, MarketError};
use common::{ALICE, BOB, Harness, RECIPIENT};

#[tokio::test]
async fn test_repeated_key_returns_same_order() {
    let h = Harness::new().await;
    let first = h
        .market
        .create_order(ALICE, h.diamonds, RECIPIENT, Some("checkout-42"))
        .await
        .unwrap();
    let second = h
        .market
        .create_order(ALICE, h.diamonds, RECIPIENT, Some("checkout-42"))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(h.market.my_orders(ALICE, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_replay_ignores_changed_arguments() {
    let h = Harness::new().await;
    let first = h
        .market
        .create_order(ALICE, h.diamonds, RECIPIENT, Some("k"))
        .await
        .unwrap();
    // Replays short-circuit before validation, even against a retired item.
    let replay = h
        .market
        .create_order(ALICE, h.retired_item, "987654321", Some("k"))
        .await
        .unwrap();
    assert_eq!(replay.id, first.id);
    assert_eq!(replay.recipient_game_uid, RECIPIENT);
}

#[tokio::test]
async fn test_keys_are_scoped_per_user() {
    let h = Harness::new().await;
    let alice = h
        .market
        .create_order(ALICE, h.diamonds, RECIPIENT, Some("same"))
        .await
        .unwrap();
    let bob = h
        .market
        .create_order(BOB, h.diamonds, RECIPIENT, Some("same"))
        .await
        .unwrap();
    assert_ne!(alice.id, bob.id);
    assert_ne!(alice.code, bob.code);
}

#[tokio::test]
async fn test_orders_without_key_are_distinct() {
    let h = Harness::new().await;
    let a = h.diamonds_order(ALICE).await;
    let b = h.diamonds_order(ALICE).await;
    assert_ne!(a.id, b.id);
    assert_ne!(a.code, b.code);
    assert_eq!(a.status, OrderStatus::Pending);
    assert_eq!(h.market.my_orders(ALICE, None).await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_one_key_persist_one_order() {
    let h = Harness::new().await;
    let mut handles = Vec::new();
    for _ in 0..16 {
        let market = h.market.clone();
        let item = h.diamonds;
        handles.push(tokio::spawn(async move {
            market
                .create_order(ALICE, item, RECIPIENT, Some("double-click"))
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(h.market.my_orders(ALICE, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_inactive_item_is_unavailable() {
    let h = Harness::new().await;
    let result = h
        .market
        .create_order(ALICE, h.retired_item, RECIPIENT, None)
        .await;
    assert!(matches!(result, Err(MarketError::Unavailable(_))));
    assert!(h.market.my_orders(ALICE, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_order_input_validation() {
    let h = Harness::new().await;
    assert!(matches!(
        h.market.create_order(ALICE, h.diamonds, "12ab", None).await,
        Err(MarketError::InvalidInput(InputError::Malformed {
            field: "recipient_game_uid",
            ..
        }))
    ));

    let long_key = "k".repeat(65);
    assert!(matches!(
        h.market
            .create_order(ALICE, h.diamonds, RECIPIENT, Some(&long_key))
            .await,
        Err(MarketError::InvalidInput(InputError::Malformed {
            field: "idempotency_key",
            ..
        }))
    ));

    let unknown = arena_ledger::domain::ids::CatalogItemId::new();
    assert!(matches!(
        h.market.create_order(ALICE, unknown, RECIPIENT, None).await,
        Err(MarketError::NotFound { entity: "catalog item", .. })
    ));
}

#[tokio::test]
async fn test_order_copies_catalog_price() {
    let h = Harness::new().await;
    let order = h.diamonds_order(ALICE).await;
    assert_eq!(order.total_amount.to_string(), "2000");
    assert_eq!(order.currency.as_str(), "XOF");
    assert!(order.code.starts_with("FF20261019"));
    assert_eq!(order.user_id, h.alice);
}
