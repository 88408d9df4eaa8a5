//! Multi-statement batches.

use super::temp_store;
use db_relay::db::{Cell, StatementOutcome};
use db_relay::query::{QueryExecutor, StatementRunner};
use pretty_assertions::assert_eq;

async fn values(store: &db_relay::db::Store) -> Vec<Cell> {
    QueryExecutor::new(store)
        .run("select x from t order by x", 5)
        .await
        .unwrap()
        .rows()
        .iter()
        .map(|row| row[0].clone())
        .collect()
}

#[tokio::test]
async fn test_only_non_blank_statements_run_in_order() {
    let (_dir, store) = temp_store().await;
    StatementRunner::new(&store)
        .run(&["create table t (x integer primary key)"], 5)
        .await
        .unwrap();

    let outcome = StatementRunner::new(&store)
        .run(
            &["", "insert into t values(1)", "   ", "insert into t values(2)"],
            5,
        )
        .await
        .unwrap();

    assert_eq!(outcome.skipped, 2);
    assert_eq!(outcome.rows_affected, 2);
    assert_eq!(
        outcome.statements,
        vec![
            StatementOutcome {
                position: 1,
                rows_affected: 1
            },
            StatementOutcome {
                position: 3,
                rows_affected: 1
            },
        ]
    );
    assert_eq!(values(&store).await, vec![Cell::Integer(1), Cell::Integer(2)]);
}

#[tokio::test]
async fn test_first_failure_stops_the_batch() {
    let (_dir, store) = temp_store().await;
    StatementRunner::new(&store)
        .run(
            &["create table t (x integer primary key)", "insert into t values(1)"],
            5,
        )
        .await
        .unwrap();

    let err = StatementRunner::new(&store)
        .run(
            &["", "insert into t values(1)", "   ", "insert into t values(2)"],
            5,
        )
        .await
        .unwrap_err();

    assert_eq!(err.position(), Some(1));
    assert_eq!(err.kind(), "execution");
    assert_eq!(values(&store).await, vec![Cell::Integer(1)]);
}

#[tokio::test]
async fn test_transaction_spans_statements() {
    let (_dir, store) = temp_store().await;

    StatementRunner::new(&store)
        .run(
            &[
                "create table t (x integer)",
                "begin",
                "insert into t values(3)",
                "insert into t values(4)",
                "commit",
            ],
            5,
        )
        .await
        .unwrap();

    assert_eq!(values(&store).await, vec![Cell::Integer(3), Cell::Integer(4)]);
}

#[tokio::test]
async fn test_shared_deadline_times_out() {
    let (_dir, store) = temp_store().await;

    let err = StatementRunner::new(&store)
        .run(
            &[
                "create table t (x integer)",
                "insert into t with recursive n(i) as (select 1 union all select i + 1 from n) select i from n",
            ],
            1,
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.position(), Some(1));
}

#[tokio::test]
async fn test_unfinished_transaction_does_not_outlive_the_batch() {
    let (_dir, store) = temp_store().await;

    StatementRunner::new(&store)
        .run(
            &["create table t (x integer)", "begin", "insert into t values(1)"],
            5,
        )
        .await
        .unwrap();

    StatementRunner::new(&store)
        .run(&["begin", "insert into t values(2)", "commit"], 5)
        .await
        .unwrap();

    assert_eq!(values(&store).await, vec![Cell::Integer(2)]);
}

#[tokio::test]
async fn test_oversized_deadline_is_clamped() {
    let (_dir, store) = temp_store().await;

    let outcome = StatementRunner::new(&store)
        .run(&["select 1"], u64::MAX)
        .await
        .unwrap();

    assert_eq!(outcome.executed(), 1);
}
