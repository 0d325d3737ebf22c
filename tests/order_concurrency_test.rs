//! Concurrency behavior of the order ledger: the stock check and decrement
//! are atomic per listing, so overlapping orders can never oversell.

use std::sync::Arc;

use agrimandi_api::errors::ServiceError;
use agrimandi_api::ledger::{OrderLedger, PlaceOrder};
use agrimandi_api::models::{Listing, ModerationDecision, PaymentMethod};
use agrimandi_api::pricing::{FeePolicy, SettlementMode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn ledger_with_stock(stock: Decimal) -> (Arc<OrderLedger>, Uuid) {
    let ledger = Arc::new(
        OrderLedger::new(
            FeePolicy::flat(dec!(5)).unwrap(),
            SettlementMode::DeductFromListed,
        )
        .unwrap(),
    );
    let listing = ledger
        .submit_listing(Listing::new(Uuid::new_v4(), "Ravi", "Tomato", dec!(35), stock).unwrap());
    ledger
        .moderate(listing.id, ModerationDecision::Approve)
        .unwrap();
    (ledger, listing.id)
}

fn order(listing_id: Uuid, qty: Decimal) -> PlaceOrder {
    PlaceOrder {
        listing_id,
        buyer_id: Uuid::new_v4(),
        buyer_name: "Asha".to_string(),
        quantity_kg: qty,
        payment_method: PaymentMethod::Upi {
            upi_id: "asha@bank".to_string(),
        },
        delivery_address: "12 Market Road".to_string(),
    }
}

// 20 concurrent 1kg orders against 10kg of stock: exactly 10 succeed.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_orders_never_oversell() {
    let (ledger, listing_id) = ledger_with_stock(dec!(10));

    let mut tasks = vec![];
    for _ in 0..20 {
        let ledger = ledger.clone();
        tasks.push(tokio::spawn(async move {
            ledger.place_order(order(listing_id, dec!(1))).is_ok()
        }));
    }
    let mut success = 0;
    for t in tasks {
        if t.await.unwrap() {
            success += 1;
        }
    }

    assert_eq!(
        success, 10,
        "exactly 10 orders should succeed; got {}",
        success
    );
    let remaining = ledger
        .get_listing(listing_id)
        .unwrap()
        .remaining_quantity_kg;
    assert_eq!(remaining, Decimal::ZERO);
}

// Two concurrent 6kg orders against 10kg: one succeeds, the other fails
// with InsufficientStock, and 4kg remains.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_overlapping_orders_admit_exactly_one() {
    let (ledger, listing_id) = ledger_with_stock(dec!(10));

    let a = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.place_order(order(listing_id, dec!(6))) })
    };
    let b = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.place_order(order(listing_id, dec!(6))) })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of the overlapping orders wins");
    let failure = results
        .iter()
        .find(|r| r.is_err())
        .unwrap()
        .as_ref()
        .unwrap_err();
    assert!(matches!(failure, ServiceError::InsufficientStock(_)));

    let remaining = ledger
        .get_listing(listing_id)
        .unwrap()
        .remaining_quantity_kg;
    assert_eq!(remaining, dec!(4));
}

// Accepted quantities never exceed the original stock for any interleaving.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn accepted_total_bounded_by_initial_stock() {
    let (ledger, listing_id) = ledger_with_stock(dec!(100));

    let mut tasks = vec![];
    for i in 0..40 {
        let ledger = ledger.clone();
        // Mixed sizes so some orders must be rejected.
        let qty = Decimal::from(1 + (i % 7));
        tasks.push(tokio::spawn(async move {
            ledger
                .place_order(order(listing_id, qty))
                .ok()
                .map(|o| o.quantity_kg)
        }));
    }

    let mut accepted = Decimal::ZERO;
    for t in tasks {
        if let Some(qty) = t.await.unwrap() {
            accepted += qty;
        }
    }

    assert!(accepted <= dec!(100));
    let remaining = ledger
        .get_listing(listing_id)
        .unwrap()
        .remaining_quantity_kg;
    assert_eq!(remaining, dec!(100) - accepted);
    assert!(remaining >= Decimal::ZERO);
}
