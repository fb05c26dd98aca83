//! Report jobs run end to end over the in-memory store.

#![allow(clippy::unwrap_used)]

use chrono::Duration;
use shopfront_batch::{
    InMemoryReportStore, JobLauncher, JobParameters, JobRepository, JobStatus, OrderReportJob,
    ReportStore, UserStatisticsJob, ORDER_REPORT_JOB, USER_STATISTICS_JOB,
};
use shopfront_core::environment::Clock;
use shopfront_core::ids::{OrderId, ProductId, UserId};
use shopfront_core::money::Money;
use shopfront_core::order::{Order, OrderItem};
use shopfront_core::providers::{OrderRepository, UserRepository};
use shopfront_core::user::Role;
use shopfront_testing::mocks::{InMemoryOrderRepository, InMemoryUserRepository};
use shopfront_testing::{FixedClock, fixtures, test_clock};
use std::sync::Arc;

struct Harness {
    clock: FixedClock,
    orders: InMemoryOrderRepository,
    users: InMemoryUserRepository,
    store: InMemoryReportStore,
    launcher: JobLauncher,
}

fn harness() -> Harness {
    let clock = test_clock();
    let orders = InMemoryOrderRepository::new();
    let users = InMemoryUserRepository::new();
    let store = InMemoryReportStore::new(Arc::new(orders.clone()), Arc::new(users.clone()));
    let shared: Arc<dyn ReportStore> = Arc::new(store.clone());
    let launcher = JobLauncher::new(JobRepository::new(), Arc::new(clock.clone()))
        .register(Arc::new(OrderReportJob::new(
            Arc::clone(&shared),
            Arc::new(clock.clone()),
        )))
        .register(Arc::new(UserStatisticsJob::new(shared, Arc::new(clock.clone()))));
    Harness {
        clock,
        orders,
        users,
        store,
        launcher,
    }
}

fn order(id: i64, user: i64, quantities: &[u32], clock: &FixedClock) -> Order {
    let items = quantities
        .iter()
        .enumerate()
        .map(|(i, &quantity)| {
            OrderItem::new(
                ProductId::new(i as i64 + 1),
                format!("Product {i}"),
                Money::from_cents(1_000),
                quantity,
            )
            .unwrap()
        })
        .collect();
    Order::new(OrderId::new(id), UserId::new(user), items, None, None, clock.now()).unwrap()
}

#[tokio::test]
async fn order_report_covers_the_last_day_only() {
    let h = harness();
    h.users
        .save(&fixtures::user(1, "ann@example.com", Role::User, h.clock.now()))
        .await
        .unwrap();

    h.orders.save(&order(1, 1, &[1], &h.clock)).await.unwrap();
    h.clock.advance(Duration::hours(30));
    h.orders.save(&order(2, 1, &[2, 3], &h.clock)).await.unwrap();
    h.clock.advance(Duration::hours(1));

    let execution = h
        .launcher
        .run(ORDER_REPORT_JOB, JobParameters::new())
        .await
        .unwrap();

    assert_eq!(execution.status, JobStatus::Completed);
    let reports = h.store.order_reports();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.order_id, OrderId::new(2));
    assert_eq!(report.user_email, "ann@example.com");
    assert_eq!(report.total_items, 5);
    assert_eq!(report.total_amount, Money::from_cents(5_000));
    assert_eq!(report.report_period, "DAILY");
    assert_eq!(report.report_date, h.clock.now());
}

#[tokio::test]
async fn rerunning_order_report_replaces_rows() {
    let h = harness();
    h.users
        .save(&fixtures::user(1, "ann@example.com", Role::User, h.clock.now()))
        .await
        .unwrap();
    for id in 1..=120 {
        h.orders.save(&order(id, 1, &[1], &h.clock)).await.unwrap();
    }
    h.clock.advance(Duration::minutes(5));

    let first = h.launcher.run(ORDER_REPORT_JOB, JobParameters::new()).await.unwrap();
    let second = h.launcher.run(ORDER_REPORT_JOB, JobParameters::new()).await.unwrap();

    let step = first.step.unwrap();
    assert_eq!(step.read_count, 120);
    assert_eq!(step.commit_count, 3);
    assert_eq!(second.status, JobStatus::Completed);
    assert_eq!(h.store.order_reports().len(), 120);
    assert_eq!(h.launcher.repository().recent(ORDER_REPORT_JOB, 5).len(), 2);
}

#[tokio::test]
async fn user_statistics_snapshot_active_users() {
    let h = harness();
    let now = h.clock.now();
    h.users
        .save(&fixtures::user(1, "ann@example.com", Role::Admin, now))
        .await
        .unwrap();
    let mut inactive = fixtures::user(2, "bob@example.com", Role::User, now);
    inactive.deactivate();
    h.users.save(&inactive).await.unwrap();

    let execution = h
        .launcher
        .run(USER_STATISTICS_JOB, JobParameters::new())
        .await
        .unwrap();

    assert_eq!(execution.status, JobStatus::Completed);
    let stats = h.store.user_statistics();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].user_id, UserId::new(1));
    assert_eq!(stats[0].user_role, Role::Admin);
    assert!(stats[0].is_active);
    assert_eq!(stats[0].statistics_date, now.date_naive());
    assert_eq!(stats[0].last_active_date, Some(now));
}
