//! Behavior every storage engine must share, run against each engine.

use docstore::prelude::*;
use futures::{StreamExt, TryStreamExt, stream};
use std::collections::HashSet;
use tempfile::TempDir;

fn record(value: Value) -> Record {
    into_record(value).unwrap()
}

fn id_of(record: &Record) -> RecordId {
    RecordId::of(record, "_id").unwrap()
}

async fn memory_engine() -> (MemoryEngine, ()) {
    (MemoryEngine::new(), ())
}

async fn file_engine() -> (FileEngine, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let engine = FileEngine::builder()
        .path(dir.path().join("save.json"))
        .build()
        .await
        .unwrap();

    (engine, dir)
}

macro_rules! engine_contract {
    ($module:ident, $setup:ident) => {
        mod $module {
            use super::*;

            #[tokio::test]
            async fn test_generated_ids_are_unique_strings() {
                let (engine, _guard) = $setup().await;
                let mut ids = HashSet::new();

                for _ in 0..10 {
                    let stored = engine.create(Record::new()).await.unwrap();
                    assert!(stored["_id"].is_string());
                    ids.insert(id_of(&stored));
                }

                assert_eq!(ids.len(), 10);
            }

            #[tokio::test]
            async fn test_numeric_id_is_coerced() {
                let (engine, _guard) = $setup().await;

                let stored = engine.create(record(json!({ "_id": 6 }))).await.unwrap();

                assert_eq!(stored["_id"], json!("6"));
            }

            #[tokio::test]
            async fn test_falsy_id_is_absent() {
                let (engine, _guard) = $setup().await;

                for falsy in [json!(null), json!(""), json!(false), json!(0)] {
                    let stored = engine
                        .create(record(json!({ "_id": falsy.clone(), "v": 1 })))
                        .await
                        .unwrap();

                    assert_ne!(stored["_id"], falsy);
                    assert_ne!(stored["_id"], json!("0"));
                    assert_ne!(stored["_id"], json!(""));
                }

                assert_eq!(engine.count(Query::new()).await.unwrap(), 4);
            }

            #[tokio::test]
            async fn test_update_merge_versus_overwrite() {
                let (engine, _guard) = $setup().await;
                engine
                    .create(record(json!({ "_id": "1", "a": 1, "b": 1 })))
                    .await
                    .unwrap();

                let merged = engine
                    .update(record(json!({ "_id": "1", "b": 2 })), UpdateMode::Merge)
                    .await
                    .unwrap();
                assert_eq!(merged, record(json!({ "_id": "1", "a": 1, "b": 2 })));

                let replaced = engine
                    .update(record(json!({ "_id": "1", "b": 2 })), UpdateMode::Overwrite)
                    .await
                    .unwrap();
                assert_eq!(replaced, record(json!({ "_id": "1", "b": 2 })));
            }

            #[tokio::test]
            async fn test_update_unknown_id_is_not_found() {
                let (engine, _guard) = $setup().await;

                let error = engine
                    .update(record(json!({ "_id": "999", "a": 1 })), UpdateMode::Merge)
                    .await
                    .unwrap_err();

                assert!(error.is_not_found());
                assert_eq!(engine.count(Query::new()).await.unwrap(), 0);
            }

            #[tokio::test]
            async fn test_update_without_identity() {
                let (engine, _guard) = $setup().await;

                let error = engine
                    .update(record(json!({ "a": 1 })), UpdateMode::Merge)
                    .await
                    .unwrap_err();

                assert_eq!(error, DocumentStoreError::MissingIdentity("_id".into()));
            }

            #[tokio::test]
            async fn test_find_returns_exactly_the_matches() {
                let (engine, _guard) = $setup().await;
                for n in 0..6 {
                    engine
                        .create(record(json!({ "n": n, "group": n % 3 })))
                        .await
                        .unwrap();
                }
                let query = Query::builder().eq("group", 1).build();

                let all = engine.find(Query::new(), FindOptions::default()).await.unwrap();
                let matched = engine.find(query.clone(), FindOptions::default()).await.unwrap();

                assert_eq!(all.len(), 6);
                assert_eq!(matched.len(), 2);
                assert!(matched.iter().all(|r| r["group"] == json!(1)));
                assert_eq!(engine.count(query).await.unwrap(), 2);
            }

            #[tokio::test]
            async fn test_find_by_nested_path_and_membership() {
                let (engine, _guard) = $setup().await;
                let first = engine
                    .create(record(json!({ "findTest": { "nested": 1 } })))
                    .await
                    .unwrap();
                let second = engine
                    .create(record(json!({ "findTest": { "nested": 2 } })))
                    .await
                    .unwrap();
                engine
                    .create(record(json!({ "findTest": { "nested": 3 } })))
                    .await
                    .unwrap();

                let nested = engine
                    .find(Query::try_from(json!({ "findTest.nested": 1 })).unwrap(), FindOptions::default())
                    .await
                    .unwrap();
                let members = engine
                    .find(
                        Query::try_from(json!({ "findTest.nested": { "$in": [1, 2] } })).unwrap(),
                        FindOptions::default(),
                    )
                    .await
                    .unwrap();

                assert_eq!(nested, vec![first.clone()]);
                assert_eq!(members, vec![first, second]);
            }

            #[tokio::test]
            async fn test_sorting() {
                let (engine, _guard) = $setup().await;
                for a in [3, 1, 2] {
                    engine.create(record(json!({ "a": a }))).await.unwrap();
                }
                let keys = |records: Vec<Record>| {
                    records.into_iter().map(|r| r["a"].clone()).collect::<Vec<_>>()
                };

                let asc = engine
                    .find(Query::new(), FindOptions::try_from(json!({ "sort": "a" })).unwrap())
                    .await
                    .unwrap();
                let desc = engine
                    .find(Query::new(), FindOptions::try_from(json!({ "sort": [["a", "desc"]] })).unwrap())
                    .await
                    .unwrap();

                assert_eq!(keys(asc), vec![json!(1), json!(2), json!(3)]);
                assert_eq!(keys(desc), vec![json!(3), json!(2), json!(1)]);
            }

            #[tokio::test]
            async fn test_returned_copies_are_isolated() {
                let (engine, _guard) = $setup().await;
                let stored = engine.create(record(json!({ "a": 1 }))).await.unwrap();
                let id = id_of(&stored);

                let mut found = engine.find_one(Query::new(), FindOptions::default()).await.unwrap().unwrap();
                found.insert("a".into(), json!(2));
                let mut read = engine.read(id.clone()).await.unwrap().unwrap();
                read.insert("b".into(), json!(3));

                assert_eq!(engine.read(id).await.unwrap(), Some(stored));
            }

            #[tokio::test]
            async fn test_delete_and_delete_many() {
                let (engine, _guard) = $setup().await;
                let doomed = engine.create(record(json!({ "kind": "x" }))).await.unwrap();
                engine.create(record(json!({ "kind": "y" }))).await.unwrap();
                engine.create(record(json!({ "kind": "y" }))).await.unwrap();

                engine.delete(id_of(&doomed)).await.unwrap();
                assert!(engine.delete(id_of(&doomed)).await.unwrap_err().is_not_found());

                let none = engine
                    .delete_many(Query::builder().eq("kind", "x").build())
                    .await
                    .unwrap();
                let both = engine
                    .delete_many(Query::builder().eq("kind", "y").build())
                    .await
                    .unwrap();

                assert_eq!((none, both), (0, 2));
                assert_eq!(engine.count(Query::new()).await.unwrap(), 0);
            }

            #[tokio::test]
            async fn test_find_one_on_empty_store() {
                let (engine, _guard) = $setup().await;

                let found = engine.find_one(Query::new(), FindOptions::default()).await.unwrap();

                assert_eq!(found, None);
                assert_eq!(engine.read("1".into()).await.unwrap(), None);
            }

            #[tokio::test]
            async fn test_write_and_find_streams() {
                let (engine, _guard) = $setup().await;
                engine.create(record(json!({ "_id": "known", "a": 1 }))).await.unwrap();

                let written = write_stream(
                    &engine,
                    stream::iter([
                        record(json!({ "a": 2 })),
                        record(json!({ "_id": "known", "b": 1 })),
                        record(json!({ "_id": "new", "a": 3 })),
                    ]),
                )
                .try_collect::<Vec<_>>()
                .await
                .unwrap();

                assert_eq!(written[1], record(json!({ "_id": "known", "a": 1, "b": 1 })));
                assert_eq!(written[2], record(json!({ "_id": "new", "a": 3 })));

                let streamed = find_stream(&engine, Query::new(), FindOptions::new().sort("a", SortDirection::Desc))
                    .map(|result| result.map(|r| r["a"].clone()))
                    .try_collect::<Vec<_>>()
                    .await
                    .unwrap();

                assert_eq!(streamed, vec![json!(3), json!(2), json!(1)]);
            }
        }
    };
}

engine_contract!(memory, memory_engine);
engine_contract!(file, file_engine);
