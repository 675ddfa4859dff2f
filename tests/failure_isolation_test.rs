//! Stage and per-agent failures during recompute.
//!
//! Failures are injected with SQLite triggers that abort writes to one
//! aggregate table, so the mutation itself still commits.

use junket_ledger::{
    db::init_db,
    domain::{
        CustomerId, Decimal, NewTransaction, TransactionKind, TransactionStatus,
        TripId, TripStatus,
    },
    orchestration::{ConsistencyStatus, Orchestrator},
    recompute::Stage,
    Repository,
};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

struct TestLedger {
    orch: Orchestrator,
    repo: Arc<Repository>,
    pool: SqlitePool,
    _temp: TempDir,
}

async fn setup() -> TestLedger {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("test.db").to_string_lossy().to_string();
    let pool = init_db(&db_path).await.unwrap();
    let repo = Arc::new(Repository::new(pool.clone()));
    TestLedger {
        orch: Orchestrator::new(repo.clone(), d("0.014")),
        repo,
        pool,
        _temp: temp,
    }
}

async fn exec(pool: &SqlitePool, sql: &str) {
    sqlx::query(sql).execute(pool).await.unwrap();
}

fn buy_in(trip_id: TripId, customer_id: CustomerId, amount: &str) -> NewTransaction {
    NewTransaction {
        trip_id,
        customer_id,
        agent_id: None,
        amount: d(amount),
        kind: TransactionKind::BuyIn,
        status: TransactionStatus::Completed,
    }
}

#[tokio::test]
async fn test_failed_sharing_stage_leaves_mutation_committed_and_stale() {
    let t = setup().await;
    let trip_id = t
        .orch
        .create_trip("Macau", TripStatus::Active)
        .await
        .unwrap()
        .record
        .id;
    let customer = t.orch.create_customer("Guest", None).await.unwrap();
    t.orch.add_customer_to_trip(trip_id, customer.id).await.unwrap();
    t.orch
        .record_transaction(buy_in(trip_id, customer.id, "100"))
        .await
        .unwrap();

    exec(
        &t.pool,
        "CREATE TRIGGER block_sharing_insert BEFORE INSERT ON trip_sharing \
         BEGIN SELECT RAISE(ABORT, 'sharing locked'); END",
    )
    .await;
    exec(
        &t.pool,
        "CREATE TRIGGER block_sharing_update BEFORE UPDATE ON trip_sharing \
         BEGIN SELECT RAISE(ABORT, 'sharing locked'); END",
    )
    .await;

    let outcome = t
        .orch
        .record_transaction(buy_in(trip_id, customer.id, "400"))
        .await
        .unwrap();
    assert_eq!(outcome.consistency.status, ConsistencyStatus::Stale);
    assert_eq!(outcome.consistency.stage, Some(Stage::Sharing));
    assert!(outcome
        .consistency
        .error
        .as_deref()
        .unwrap()
        .contains("sharing locked"));

    // the fact and the stages before the failure are committed
    assert!(t
        .repo
        .get_transaction(outcome.record.id)
        .await
        .unwrap()
        .is_some());
    let stats = t.repo.get_trip_stats(trip_id).await.unwrap().unwrap();
    assert_eq!(stats.total_buy_in, d("500"));
    let sharing = t.repo.get_trip_sharing(trip_id).await.unwrap().unwrap();
    assert_eq!(sharing.total_win_loss, d("100"));

    exec(&t.pool, "DROP TRIGGER block_sharing_insert").await;
    exec(&t.pool, "DROP TRIGGER block_sharing_update").await;

    let pass = t.orch.recalculate_trip(trip_id).await.unwrap();
    assert_eq!(pass.sharing.total_win_loss, d("500"));
    let sharing = t.repo.get_trip_sharing(trip_id).await.unwrap().unwrap();
    assert_eq!(sharing.net_result, d("500"));
}

#[tokio::test]
async fn test_failed_agent_rollup_does_not_stop_other_agents() {
    let t = setup().await;
    let trip_id = t
        .orch
        .create_trip("Macau", TripStatus::Active)
        .await
        .unwrap()
        .record
        .id;
    let blocked = t.orch.create_agent("Blocked", d("10")).await.unwrap();
    let healthy = t.orch.create_agent("Healthy", d("20")).await.unwrap();
    let c1 = t.orch.create_customer("C1", Some(blocked.id)).await.unwrap();
    let c2 = t.orch.create_customer("C2", Some(healthy.id)).await.unwrap();
    t.orch.add_customer_to_trip(trip_id, c1.id).await.unwrap();
    t.orch.add_customer_to_trip(trip_id, c2.id).await.unwrap();

    let before = t.repo.get_agent(blocked.id).await.unwrap().unwrap().totals;
    assert_eq!(before.total_trips, 1);
    assert!(before.total_profit_share.is_zero());

    exec(
        &t.pool,
        &format!(
            "CREATE TRIGGER block_agent_totals BEFORE UPDATE ON agents WHEN OLD.id = {} \
             BEGIN SELECT RAISE(ABORT, 'agent locked'); END",
            blocked.id
        ),
    )
    .await;

    t.orch
        .record_transaction(buy_in(trip_id, c1.id, "500"))
        .await
        .unwrap();
    let outcome = t
        .orch
        .record_transaction(buy_in(trip_id, c2.id, "1000"))
        .await
        .unwrap();
    assert_eq!(outcome.consistency.status, ConsistencyStatus::Stale);
    assert_eq!(outcome.consistency.stage, Some(Stage::AgentRollup));

    let healthy_totals = t.repo.get_agent(healthy.id).await.unwrap().unwrap().totals;
    assert_eq!(healthy_totals.total_profit_share, d("200"));
    assert_eq!(healthy_totals.total_trips, 1);
    // the blocked agent's trip summary is current, its lifetime totals are not
    let summaries = t.repo.query_agent_trip_summaries(trip_id).await.unwrap();
    let blocked_summary = summaries.iter().find(|s| s.agent_id == blocked.id).unwrap();
    assert_eq!(blocked_summary.agent_profit_share, d("50"));
    let blocked_totals = t.repo.get_agent(blocked.id).await.unwrap().unwrap().totals;
    assert_eq!(blocked_totals, before);

    let pass = t.orch.recalculate_trip(trip_id).await.unwrap();
    assert_eq!(pass.failed_agents, vec![blocked.id]);
    assert!(pass.agent_totals.iter().any(|(id, _)| *id == healthy.id));

    let report = t.orch.complete_trips(&[trip_id]).await;
    assert_eq!(report.succeeded, vec![trip_id.as_i64()]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].entity, format!("agent {}", blocked.id));

    exec(&t.pool, "DROP TRIGGER block_agent_totals").await;
    t.orch.recalculate_trip(trip_id).await.unwrap();
    let blocked_totals = t.repo.get_agent(blocked.id).await.unwrap().unwrap().totals;
    assert_eq!(blocked_totals.total_profit_share, d("50"));
    assert_eq!(blocked_totals.total_trips, 1);
}
