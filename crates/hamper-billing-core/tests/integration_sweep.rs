//! Billing sweep tests
//!
//! Covers the sweep's contract: idempotency, per-cycle atomicity,
//! drift-free cadence advancement, non-destructive insufficient-funds
//! handling, and per-subscription failure isolation.

mod common;

use common::{date, setup, setup_with_config};

use hamper_billing_core::{
    BillingConfig, EnrollmentOutcome, EnrollmentRequest, FailurePolicy, PaymentMethod,
};
use hamper_types::{AddressId, Frequency, LineItem, ProductId, SubscriptionId, UserId};
use uuid::Uuid;

async fn enroll_one(
    service: &hamper_billing_core::BillingService,
    user: Uuid,
    address: Uuid,
    item: LineItem,
    frequency: Frequency,
    start: chrono::NaiveDate,
) -> SubscriptionId {
    let outcome = service
        .enroll(
            EnrollmentRequest {
                user_id: UserId(user),
                items: vec![item],
                frequency,
                delivery_address_id: AddressId(address),
                start_date: Some(start),
                force_merge: false,
                payment_method: PaymentMethod::Wallet,
            },
            start,
        )
        .await
        .unwrap();

    match outcome {
        EnrollmentOutcome::Enrolled(subs) => subs[0].id,
        EnrollmentOutcome::Conflict(c) => panic!("unexpected conflicts: {c:?}"),
    }
}

#[tokio::test]
async fn test_end_to_end_variant_billing() {
    let (store, service) = setup();
    let user = store.add_user(20_000);
    let address = store.add_address(user);
    let product = store.add_product("Coffee beans", 10_000);
    let today = date(2026, 8, 6);

    let sub_id = enroll_one(
        &service,
        user,
        address,
        LineItem::Variant {
            product_id: ProductId(product),
            quantity: 1,
            weight: "1kg".to_string(),
            price_cents: 12_000,
        },
        Frequency::Weekly,
        today,
    )
    .await;

    let report = service.run_sweep(today).await.unwrap();
    assert_eq!(report.due, 1);
    assert_eq!(report.billed, 1);

    // 120.00 discounted 15% = 102.00; wallet 200.00 - 102.00 = 98.00
    assert_eq!(store.balance(user), 9_800);

    let orders = store.orders_of(sub_id.0);
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].total_cents, 10_200);
    assert_eq!(orders[0].status, "processing");
    assert_eq!(orders[0].payment_status, "paid");
    assert_eq!(orders[0].order_type, "subscription");
    assert_eq!(orders[0].placed_on, today);

    let entries = store.ledger_of(sub_id.0);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].direction, "debit");
    assert_eq!(entries[0].status, "success");
    assert_eq!(entries[0].amount_cents, 10_200);

    let sub = store.subscription(sub_id.0);
    assert_eq!(sub.next_delivery_date, today + chrono::Days::new(7));
    assert_eq!(sub.last_delivery_date, Some(today));
}

#[tokio::test]
async fn test_sweep_is_idempotent_for_the_same_date() {
    let (store, service) = setup();
    let user = store.add_user(50_000);
    let address = store.add_address(user);
    let product = store.add_product("Oat flakes", 4_000);
    let today = date(2026, 8, 6);

    let sub_id = enroll_one(
        &service,
        user,
        address,
        LineItem::Standard {
            product_id: ProductId(product),
            quantity: 1,
        },
        Frequency::Weekly,
        today,
    )
    .await;

    let first = service.run_sweep(today).await.unwrap();
    assert_eq!(first.billed, 1);

    // The successful cycle advanced the due date past today, so a re-run
    // finds nothing due
    let second = service.run_sweep(today).await.unwrap();
    assert_eq!(second.due, 0);
    assert_eq!(second.billed, 0);

    assert_eq!(store.orders_of(sub_id.0).len(), 1);
    assert_eq!(store.ledger_of(sub_id.0).len(), 1);
    assert_eq!(store.balance(user), 50_000 - 3_400);
}

#[tokio::test]
async fn test_crashed_cycle_does_not_double_charge_on_retry() {
    let (store, service) = setup();
    let user = store.add_user(50_000);
    let address = store.add_address(user);
    let product = store.add_product("Oat flakes", 4_000);
    let today = date(2026, 8, 6);

    let sub_id = enroll_one(
        &service,
        user,
        address,
        LineItem::Standard {
            product_id: ProductId(product),
            quantity: 1,
        },
        Frequency::Weekly,
        today,
    )
    .await;

    // First run crashes mid-cycle; the transaction rolls back whole
    store.fail_next_cycle();
    let crashed = service.run_sweep(today).await.unwrap();
    assert_eq!(crashed.failed, 1);
    assert_eq!(crashed.billed, 0);

    assert_eq!(store.balance(user), 50_000);
    assert_eq!(store.orders_of(sub_id.0).len(), 0);
    assert_eq!(store.subscription(sub_id.0).next_delivery_date, today);

    // The retry bills exactly once
    let retried = service.run_sweep(today).await.unwrap();
    assert_eq!(retried.billed, 1);
    assert_eq!(store.orders_of(sub_id.0).len(), 1);
    assert_eq!(store.ledger_of(sub_id.0).len(), 1);
    assert_eq!(store.balance(user), 50_000 - 3_400);
}

#[tokio::test]
async fn test_insufficient_funds_is_non_destructive() {
    let (store, service) = setup();
    let user = store.add_user(5_000);
    let address = store.add_address(user);
    let product = store.add_product("Coffee beans", 10_000);
    let today = date(2026, 8, 6);

    let sub_id = enroll_one(
        &service,
        user,
        address,
        LineItem::Variant {
            product_id: ProductId(product),
            quantity: 1,
            weight: "1kg".to_string(),
            price_cents: 12_000,
        },
        Frequency::Weekly,
        today,
    )
    .await;

    let report = service.run_sweep(today).await.unwrap();
    assert_eq!(report.insufficient_funds, 1);
    assert_eq!(report.billed, 0);

    // Still active, due date unchanged, balance untouched, no order
    let sub = store.subscription(sub_id.0);
    assert_eq!(sub.status, "active");
    assert_eq!(sub.next_delivery_date, today);
    assert_eq!(store.balance(user), 5_000);
    assert_eq!(store.orders_of(sub_id.0).len(), 0);

    // Exactly one failed debit records the attempt
    let entries = store.ledger_of(sub_id.0);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, "failed");
    assert_eq!(entries[0].direction, "debit");
    assert_eq!(entries[0].amount_cents, 10_200);
}

#[tokio::test]
async fn test_underfunded_subscription_bills_after_top_up() {
    let (store, service) = setup();
    let user = store.add_user(1_000);
    let address = store.add_address(user);
    let product = store.add_product("Oat flakes", 4_000);
    let today = date(2026, 8, 6);

    let sub_id = enroll_one(
        &service,
        user,
        address,
        LineItem::Standard {
            product_id: ProductId(product),
            quantity: 1,
        },
        Frequency::Weekly,
        today,
    )
    .await;

    let report = service.run_sweep(today).await.unwrap();
    assert_eq!(report.insufficient_funds, 1);

    service.top_up(UserId(user), 10_000).await.unwrap();

    // Due date never moved, so the same sweep date picks it up again
    let report = service.run_sweep(today).await.unwrap();
    assert_eq!(report.billed, 1);
    assert_eq!(store.orders_of(sub_id.0).len(), 1);
    assert_eq!(store.balance(user), 11_000 - 3_400);
}

#[tokio::test]
async fn test_pause_after_policy_pauses_on_threshold() {
    let (store, service) = setup_with_config(
        BillingConfig::new().with_failure_policy(FailurePolicy::PauseAfter { attempts: 2 }),
    );
    let user = store.add_user(0);
    let address = store.add_address(user);
    let product = store.add_product("Oat flakes", 4_000);
    let today = date(2026, 8, 6);

    let sub_id = enroll_one(
        &service,
        user,
        address,
        LineItem::Standard {
            product_id: ProductId(product),
            quantity: 1,
        },
        Frequency::Daily,
        today,
    )
    .await;

    let first = service.run_sweep(today).await.unwrap();
    assert_eq!(first.insufficient_funds, 1);
    assert_eq!(store.subscription(sub_id.0).status, "active");

    let second = service.run_sweep(today).await.unwrap();
    assert_eq!(second.paused, 1);
    assert_eq!(store.subscription(sub_id.0).status, "paused");
    assert_eq!(store.ledger_of(sub_id.0).len(), 2);

    // Paused subscriptions drop out of the sweep
    let third = service.run_sweep(today).await.unwrap();
    assert_eq!(third.due, 0);
}

#[tokio::test]
async fn test_retry_forever_never_pauses() {
    let (store, service) = setup();
    let user = store.add_user(0);
    let address = store.add_address(user);
    let product = store.add_product("Oat flakes", 4_000);
    let today = date(2026, 8, 6);

    let sub_id = enroll_one(
        &service,
        user,
        address,
        LineItem::Standard {
            product_id: ProductId(product),
            quantity: 1,
        },
        Frequency::Daily,
        today,
    )
    .await;

    for _ in 0..5 {
        let report = service.run_sweep(today).await.unwrap();
        assert_eq!(report.insufficient_funds, 1);
    }

    assert_eq!(store.subscription(sub_id.0).status, "active");
    assert_eq!(store.ledger_of(sub_id.0).len(), 5);
}

#[tokio::test]
async fn test_vanished_product_skips_cycle_without_writes() {
    let (store, service) = setup();
    let user = store.add_user(50_000);
    let address = store.add_address(user);
    let product = store.add_product("Oat flakes", 4_000);
    let today = date(2026, 8, 6);

    let sub_id = enroll_one(
        &service,
        user,
        address,
        LineItem::Standard {
            product_id: ProductId(product),
            quantity: 1,
        },
        Frequency::Weekly,
        today,
    )
    .await;

    store.remove_product(product);

    let report = service.run_sweep(today).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.billed, 0);

    // No order, no ledger write, no date advance
    assert_eq!(store.balance(user), 50_000);
    assert_eq!(store.orders_of(sub_id.0).len(), 0);
    assert_eq!(store.ledger_of(sub_id.0).len(), 0);
    assert_eq!(store.subscription(sub_id.0).next_delivery_date, today);
}

#[tokio::test]
async fn test_vanished_address_skips_cycle() {
    let (store, service) = setup();
    let user = store.add_user(50_000);
    let address = store.add_address(user);
    let product = store.add_product("Oat flakes", 4_000);
    let today = date(2026, 8, 6);

    let sub_id = enroll_one(
        &service,
        user,
        address,
        LineItem::Standard {
            product_id: ProductId(product),
            quantity: 1,
        },
        Frequency::Weekly,
        today,
    )
    .await;

    store.remove_address(address);

    let report = service.run_sweep(today).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(store.orders_of(sub_id.0).len(), 0);
    assert_eq!(store.balance(user), 50_000);
}

#[tokio::test]
async fn test_one_failing_cycle_does_not_abort_others() {
    let (store, service) = setup();
    let today = date(2026, 8, 6);

    let poor = store.add_user(100);
    let poor_address = store.add_address(poor);
    let rich = store.add_user(50_000);
    let rich_address = store.add_address(rich);
    let product = store.add_product("Oat flakes", 4_000);

    enroll_one(
        &service,
        poor,
        poor_address,
        LineItem::Standard {
            product_id: ProductId(product),
            quantity: 1,
        },
        Frequency::Weekly,
        today,
    )
    .await;
    let rich_sub = enroll_one(
        &service,
        rich,
        rich_address,
        LineItem::Standard {
            product_id: ProductId(product),
            quantity: 1,
        },
        Frequency::Weekly,
        today,
    )
    .await;

    let report = service.run_sweep(today).await.unwrap();
    assert_eq!(report.due, 2);
    assert_eq!(report.billed, 1);
    assert_eq!(report.insufficient_funds, 1);

    assert_eq!(store.orders_of(rich_sub.0).len(), 1);
    assert_eq!(store.balance(rich), 50_000 - 3_400);
}

#[tokio::test]
async fn test_overdue_subscription_advances_from_its_own_date() {
    let (store, service) = setup();
    let user = store.add_user(50_000);
    let address = store.add_address(user);
    let product = store.add_product("Oat flakes", 4_000);

    // Due two weeks ago; two ticks were missed
    let overdue_since = date(2026, 7, 23);
    let today = date(2026, 8, 6);

    let sub_id = enroll_one(
        &service,
        user,
        address,
        LineItem::Standard {
            product_id: ProductId(product),
            quantity: 1,
        },
        Frequency::Weekly,
        overdue_since,
    )
    .await;

    // The `<=` due query catches the overdue cycle, and the advance is
    // drift-free: one cadence unit from the stored date, not from today
    let report = service.run_sweep(today).await.unwrap();
    assert_eq!(report.billed, 1);
    assert_eq!(
        store.subscription(sub_id.0).next_delivery_date,
        date(2026, 7, 30)
    );

    // Still behind today, so the next sweep catches up the second cycle
    let report = service.run_sweep(today).await.unwrap();
    assert_eq!(report.billed, 1);
    assert_eq!(
        store.subscription(sub_id.0).next_delivery_date,
        date(2026, 8, 6)
    );
}

#[tokio::test]
async fn test_monthly_cycle_clamps_to_month_end() {
    let (store, service) = setup();
    let user = store.add_user(50_000);
    let address = store.add_address(user);
    let product = store.add_product("Oat flakes", 4_000);
    let jan31 = date(2026, 1, 31);

    let sub_id = enroll_one(
        &service,
        user,
        address,
        LineItem::Standard {
            product_id: ProductId(product),
            quantity: 1,
        },
        Frequency::Monthly,
        jan31,
    )
    .await;

    let report = service.run_sweep(jan31).await.unwrap();
    assert_eq!(report.billed, 1);
    assert_eq!(
        store.subscription(sub_id.0).next_delivery_date,
        date(2026, 2, 28)
    );
}

#[tokio::test]
async fn test_paused_and_cancelled_subscriptions_are_not_swept() {
    let (store, service) = setup();
    let user = store.add_user(50_000);
    let address = store.add_address(user);
    let oats = store.add_product("Oat flakes", 4_000);
    let coffee = store.add_product("Coffee beans", 9_000);
    let today = date(2026, 8, 6);

    let paused = enroll_one(
        &service,
        user,
        address,
        LineItem::Standard {
            product_id: ProductId(oats),
            quantity: 1,
        },
        Frequency::Weekly,
        today,
    )
    .await;
    let cancelled = enroll_one(
        &service,
        user,
        address,
        LineItem::Standard {
            product_id: ProductId(coffee),
            quantity: 1,
        },
        Frequency::Weekly,
        today,
    )
    .await;

    service.pause(UserId(user), paused).await.unwrap();
    service.cancel(UserId(user), cancelled).await.unwrap();

    let report = service.run_sweep(today).await.unwrap();
    assert_eq!(report.due, 0);
    assert_eq!(store.balance(user), 50_000);
}

#[tokio::test]
async fn test_quantity_edit_between_cycles_applies_to_next_cycle() {
    let (store, service) = setup();
    let user = store.add_user(100_000);
    let address = store.add_address(user);
    let product = store.add_product("Oat flakes", 4_000);
    let today = date(2026, 8, 6);

    let sub_id = enroll_one(
        &service,
        user,
        address,
        LineItem::Standard {
            product_id: ProductId(product),
            quantity: 1,
        },
        Frequency::Daily,
        today,
    )
    .await;

    let report = service.run_sweep(today).await.unwrap();
    assert_eq!(report.billed, 1);

    // Merge another unit in between cycles
    let outcome = service
        .enroll(
            EnrollmentRequest {
                user_id: UserId(user),
                items: vec![LineItem::Standard {
                    product_id: ProductId(product),
                    quantity: 2,
                }],
                frequency: Frequency::Daily,
                delivery_address_id: AddressId(address),
                start_date: None,
                force_merge: true,
                payment_method: PaymentMethod::Wallet,
            },
            today,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, EnrollmentOutcome::Enrolled(_)));

    let tomorrow = date(2026, 8, 7);
    let report = service.run_sweep(tomorrow).await.unwrap();
    assert_eq!(report.billed, 1);

    let mut orders = store.orders_of(sub_id.0);
    orders.sort_by_key(|o| o.placed_on);
    assert_eq!(orders.len(), 2);
    // First cycle billed the original quantity, second the merged one
    assert_eq!(orders[0].total_cents, 3_400);
    assert_eq!(orders[1].total_cents, 3 * 3_400);
}
