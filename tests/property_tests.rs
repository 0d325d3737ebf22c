//! Property-based tests for the pricing and ledger invariants.
//!
//! These use proptest to verify the settlement arithmetic and the stock
//! accounting across a wide range of inputs, catching edge cases that the
//! concrete-scenario tests might miss.

use std::sync::Arc;

use agrimandi_api::ledger::{OrderLedger, PlaceOrder};
use agrimandi_api::models::{Listing, ModerationDecision, PaymentMethod};
use agrimandi_api::pricing::{settle, FeePolicy, SettlementMode};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

// Strategies for generating test data

/// Positive prices up to ₹10,000/kg with paise precision.
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000).prop_map(|paise| Decimal::new(paise, 2))
}

/// Order quantities between 0.1kg and 500kg.
fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..5_000).prop_map(|tenths| Decimal::new(tenths, 1))
}

fn mode_strategy() -> impl Strategy<Value = SettlementMode> {
    prop_oneof![
        Just(SettlementMode::DeductFromListed),
        Just(SettlementMode::AddOnTop),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // Flat(5): farmer earns max(0, base - 5) under deduct-from-listed.
    #[test]
    fn flat_five_farmer_earnings(base in price_strategy()) {
        let policy = FeePolicy::flat(dec!(5)).unwrap();
        let s = settle(base, &policy, SettlementMode::DeductFromListed).unwrap();
        let expected = (base - dec!(5)).max(Decimal::ZERO);
        prop_assert_eq!(s.farmer_earnings_per_kg, expected);
        prop_assert_eq!(s.buyer_price_per_kg, base);
    }

    // Percentage(0.15): farmer earns exactly 85% of the listed price.
    #[test]
    fn fifteen_percent_commission(base in price_strategy()) {
        let policy = FeePolicy::percentage(dec!(0.15)).unwrap();
        let s = settle(base, &policy, SettlementMode::DeductFromListed).unwrap();
        prop_assert_eq!(s.farmer_earnings_per_kg, base * dec!(0.85));
    }

    // The settlement identity holds under every policy and mode.
    #[test]
    fn settlement_components_sum(
        base in price_strategy(),
        flat in 0i64..10_000,
        rate in 0i64..=100,
        mode in mode_strategy(),
    ) {
        for policy in [
            FeePolicy::flat(Decimal::new(flat, 2)).unwrap(),
            FeePolicy::percentage(Decimal::new(rate, 2)).unwrap(),
        ] {
            let s = settle(base, &policy, mode).unwrap();
            prop_assert_eq!(
                s.buyer_price_per_kg,
                s.farmer_earnings_per_kg + s.platform_margin_per_kg
            );
            prop_assert!(!s.platform_margin_per_kg.is_sign_negative());
            prop_assert!(!s.farmer_earnings_per_kg.is_sign_negative());
        }
    }

    // Idempotence: the same inputs settle to the same split, every time.
    #[test]
    fn settle_is_deterministic(base in price_strategy(), mode in mode_strategy()) {
        let policy = FeePolicy::percentage(dec!(0.15)).unwrap();
        let first = settle(base, &policy, mode).unwrap();
        let second = settle(base, &policy, mode).unwrap();
        prop_assert_eq!(first, second);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // After any sequence of orders, remaining stock equals the initial
    // quantity minus the accepted total, and never goes negative.
    #[test]
    fn stock_accounting_balances(quantities in prop::collection::vec(quantity_strategy(), 1..20)) {
        let ledger = Arc::new(
            OrderLedger::new(
                FeePolicy::flat(dec!(5)).unwrap(),
                SettlementMode::DeductFromListed,
            )
            .unwrap(),
        );
        let initial = dec!(200);
        let listing = ledger.submit_listing(
            Listing::new(Uuid::new_v4(), "Ravi", "Tomato", dec!(35), initial).unwrap(),
        );
        ledger.moderate(listing.id, ModerationDecision::Approve).unwrap();

        let mut accepted = Decimal::ZERO;
        for qty in quantities {
            let result = ledger.place_order(PlaceOrder {
                listing_id: listing.id,
                buyer_id: Uuid::new_v4(),
                buyer_name: "Asha".to_string(),
                quantity_kg: qty,
                payment_method: PaymentMethod::Cash,
                delivery_address: "12 Market Road".to_string(),
            });
            if result.is_ok() {
                accepted += qty;
            }
        }

        let remaining = ledger.get_listing(listing.id).unwrap().remaining_quantity_kg;
        prop_assert_eq!(remaining, initial - accepted);
        prop_assert!(remaining >= Decimal::ZERO);

        // Revenue matches accepted volume at the buyer price.
        let stats = ledger.compute_stats();
        prop_assert_eq!(stats.total_revenue, accepted * dec!(35));
    }

    // Rejected orders leave no trace in the ledger.
    #[test]
    fn failed_orders_mutate_nothing(excess in 1i64..1000) {
        let ledger = OrderLedger::new(
            FeePolicy::flat(dec!(5)).unwrap(),
            SettlementMode::DeductFromListed,
        )
        .unwrap();
        let listing = ledger.submit_listing(
            Listing::new(Uuid::new_v4(), "Ravi", "Tomato", dec!(35), dec!(10)).unwrap(),
        );
        ledger.moderate(listing.id, ModerationDecision::Approve).unwrap();

        let result = ledger.place_order(PlaceOrder {
            listing_id: listing.id,
            buyer_id: Uuid::new_v4(),
            buyer_name: "Asha".to_string(),
            quantity_kg: dec!(10) + Decimal::from(excess),
            payment_method: PaymentMethod::Cash,
            delivery_address: "12 Market Road".to_string(),
        });
        prop_assert!(result.is_err());
        prop_assert_eq!(
            ledger.get_listing(listing.id).unwrap().remaining_quantity_kg,
            dec!(10)
        );
        prop_assert_eq!(ledger.compute_stats().total_orders, 0);
    }
}
