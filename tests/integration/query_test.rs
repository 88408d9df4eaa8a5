//! Single-query execution through the executor and the codec.

use super::temp_store;
use db_relay::codec;
use db_relay::db::{Cell, ResultTable};
use db_relay::error::RelayError;
use db_relay::query::{QueryExecutor, StatementRunner};
use pretty_assertions::assert_eq;
use serde_json::json;

async fn seed_tbl1(store: &db_relay::db::Store) {
    StatementRunner::new(store)
        .run(
            &[
                "create table tbl1 (one text, two smallint)",
                "insert into tbl1 values ('hello!', 10)",
                "insert into tbl1 values ('goodbye', 20)",
            ],
            5,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_select_all_wire_format() {
    let (_dir, store) = temp_store().await;
    seed_tbl1(&store).await;

    let table = QueryExecutor::new(&store)
        .run("select * from tbl1", 5)
        .await
        .unwrap();
    let wire = codec::encode(&table).unwrap();

    assert_eq!(wire.columns, vec!["one", "two"]);
    assert_eq!(
        wire.data,
        vec![vec![json!("hello!"), json!(10)], vec![json!("goodbye"), json!(20)]]
    );
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let (_dir, store) = temp_store().await;

    let table = QueryExecutor::new(&store)
        .run("select 1 where 1=0", 5)
        .await
        .unwrap();
    let json = codec::to_json(&table).unwrap();

    assert_eq!(json, r#"{"columns":["1"],"data":[]}"#);
}

#[tokio::test]
async fn test_every_row_matches_column_count() {
    let (_dir, store) = temp_store().await;
    StatementRunner::new(&store)
        .run(
            &[
                "create table wide (a, b, c, d)",
                "insert into wide values (1, 2.5, 'x', x'00ff')",
                "insert into wide values (null, null, null, null)",
                "insert into wide values ('a', 1, 2, 3)",
            ],
            5,
        )
        .await
        .unwrap();

    let table = QueryExecutor::new(&store)
        .run("select * from wide", 5)
        .await
        .unwrap();

    assert_eq!(table.columns().len(), 4);
    assert_eq!(table.rows().len(), 3);
    assert!(table.rows().iter().all(|row| row.len() == 4));
    assert_eq!(
        table.rows()[0],
        vec![
            Cell::Integer(1),
            Cell::Real(2.5),
            Cell::Text("x".to_string()),
            Cell::Blob(vec![0x00, 0xff]),
        ]
    );
}

#[tokio::test]
async fn test_capacity_hint_never_truncates() {
    let (_dir, store) = temp_store().await;

    let table = QueryExecutor::new(&store)
        .with_capacity_hint(2)
        .run(
            "with recursive n(i) as (select 1 union all select i + 1 from n where i < 5) select i from n",
            5,
        )
        .await
        .unwrap();

    assert_eq!(table.rows().len(), 5);
    assert_eq!(table.rows()[4], vec![Cell::Integer(5)]);
}

#[tokio::test]
async fn test_query_result_survives_codec() {
    let (_dir, store) = temp_store().await;

    let table = QueryExecutor::new(&store)
        .run("select null as a, x'deadbeef' as b, 'text' as c, 1.5 as d, 7 as e", 5)
        .await
        .unwrap();
    let decoded = codec::from_json(&codec::to_json(&table).unwrap()).unwrap();

    assert_eq!(decoded, table);
    assert_eq!(
        decoded,
        ResultTable::new(
            vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            vec![vec![
                Cell::Null,
                Cell::Blob(vec![0xde, 0xad, 0xbe, 0xef]),
                Cell::Text("text".into()),
                Cell::Real(1.5),
                Cell::Integer(7),
            ]],
        )
        .unwrap()
    );
}

#[tokio::test]
async fn test_deadline_yields_timeout_not_partial_table() {
    let (_dir, store) = temp_store().await;

    let result = QueryExecutor::new(&store)
        .run(
            "with recursive n(i) as (select 1 union all select i + 1 from n) select count(*) from n",
            1,
        )
        .await;

    match result {
        Err(RelayError::Timeout { seconds, .. }) => assert_eq!(seconds, 1),
        other => panic!("expected timeout, got {other:?}"),
    }

    let table = QueryExecutor::new(&store).run("select 1", 5).await.unwrap();
    assert_eq!(table.rows().len(), 1);
}

#[tokio::test]
async fn test_syntax_error_is_prepare_error() {
    let (_dir, store) = temp_store().await;

    let err = QueryExecutor::new(&store).run("select from", 5).await.unwrap_err();

    assert_eq!(err.kind(), "prepare");
}

#[tokio::test]
async fn test_concurrent_calls_share_one_store() {
    let (_dir, store) = temp_store().await;
    StatementRunner::new(&store)
        .run(&["create table hits (worker integer)"], 5)
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for worker in 0..8i64 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            StatementRunner::new(&store)
                .run(&[format!("insert into hits values ({worker})")], 10)
                .await
                .unwrap();
            QueryExecutor::new(&store)
                .run(&format!("select {worker} as w"), 10)
                .await
                .unwrap()
        }));
    }

    for (worker, task) in tasks.into_iter().enumerate() {
        let table = task.await.unwrap();
        assert_eq!(table.rows(), &[vec![Cell::Integer(worker as i64)]]);
    }

    let table = QueryExecutor::new(&store)
        .run("select count(*) from hits", 5)
        .await
        .unwrap();
    assert_eq!(table.rows(), &[vec![Cell::Integer(8)]]);
}
