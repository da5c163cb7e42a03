use std::collections::HashSet;
use std::io::{Seek, SeekFrom, Write};

use blocklite_core::{Block, Cid, Multihash, RAW_CODEC};
use blocklite_storage::{Blockstore, EnumerationState, Options, SqliteBlockstore, StorageError};
use futures_util::StreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, Executor};
use tempfile::TempDir;
use tokio::sync::watch;

fn never_cancelled() -> watch::Receiver<bool> {
    let (_tx, rx) = watch::channel(false);
    rx
}

fn numbered_blocks(count: u32) -> Vec<Block> {
    (0..count)
        .map(|i| Block::new(format!("payload #{i}").into_bytes()).unwrap())
        .collect()
}

async fn open_with_capacity(dir: &TempDir, capacity: usize) -> SqliteBlockstore {
    let options = Options {
        key_channel_capacity: capacity,
        ..Options::default()
    };
    SqliteBlockstore::open(dir.path().join("blocks.db"), options)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_enumerates_every_key_once() {
    let dir = TempDir::new().unwrap();
    let store = open_with_capacity(&dir, 4).await;

    let blocks = numbered_blocks(3);
    store.put_many(&blocks).await.unwrap();

    let mut keys = store.all_keys(never_cancelled()).await.unwrap();
    let mut seen = Vec::new();
    while let Some(cid) = keys.recv().await {
        seen.push(cid);
    }
    let report = keys.finish().await.unwrap();

    let expected: HashSet<Cid> = blocks.iter().map(|b| *b.cid()).collect();
    let unique: HashSet<Cid> = seen.iter().copied().collect();
    assert_eq!(seen.len(), 3);
    assert_eq!(unique, expected);

    assert!(report.is_complete());
    assert_eq!(report.produced, 3);
    assert_eq!(report.skipped, 0);

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_empty_store_completes_immediately() {
    let dir = TempDir::new().unwrap();
    let store = open_with_capacity(&dir, 1).await;

    let keys = store.all_keys(never_cancelled()).await.unwrap();
    let collected: Vec<Cid> = keys.collect().await;
    assert!(collected.is_empty());

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_keys_use_raw_envelope() {
    let dir = TempDir::new().unwrap();
    let store = open_with_capacity(&dir, 2).await;

    let hash = Multihash::<64>::wrap(0x12, &[3; 32]).unwrap();
    let v0 = Cid::new_v0(hash).unwrap();
    store
        .put(&Block::with_cid(v0, b"dag-pb node".to_vec()))
        .await
        .unwrap();

    let collected: Vec<Cid> = store.all_keys(never_cancelled()).await.unwrap().collect().await;
    assert_eq!(collected, vec![Cid::new_v1(RAW_CODEC, hash)]);
    assert_ne!(collected[0], v0);
    assert!(store.has(&collected[0]).await.unwrap());

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_malformed_keys_are_skipped() {
    let dir = TempDir::new().unwrap();
    let store = open_with_capacity(&dir, 4).await;

    let blocks = numbered_blocks(5);
    store.put_many(&blocks).await.unwrap();

    let mut conn =
        SqliteConnection::connect_with(&SqliteConnectOptions::new().filename(store.path()))
            .await
            .unwrap();
    conn.execute("INSERT INTO blocks (storage_key, payload) VALUES ('not base64!', x'00')")
        .await
        .unwrap();
    conn.execute("INSERT INTO blocks (storage_key, payload) VALUES ('AAAA', x'01')")
        .await
        .unwrap();
    conn.close().await.unwrap();

    let mut keys = store.all_keys(never_cancelled()).await.unwrap();
    let mut seen = HashSet::new();
    while let Some(cid) = keys.recv().await {
        seen.insert(cid);
    }
    let report = keys.finish().await.unwrap();

    let expected: HashSet<Cid> = blocks.iter().map(|b| *b.cid()).collect();
    assert_eq!(seen, expected);
    assert!(report.is_complete());
    assert_eq!(report.skipped, 2);
    assert_eq!(report.produced, 5);

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_non_text_keys_are_skipped() {
    let dir = TempDir::new().unwrap();
    let store = open_with_capacity(&dir, 4).await;

    let blocks = numbered_blocks(5);
    store.put_many(&blocks).await.unwrap();

    let mut conn =
        SqliteConnection::connect_with(&SqliteConnectOptions::new().filename(store.path()))
            .await
            .unwrap();
    conn.execute("INSERT INTO blocks (storage_key, payload) VALUES (CAST(x'01ff' AS TEXT), x'00')")
        .await
        .unwrap();
    conn.execute("INSERT INTO blocks (storage_key, payload) VALUES (x'00', x'01')")
        .await
        .unwrap();
    conn.close().await.unwrap();

    let mut keys = store.all_keys(never_cancelled()).await.unwrap();
    let mut seen = HashSet::new();
    while let Some(cid) = keys.recv().await {
        seen.insert(cid);
    }
    let report = keys.finish().await.unwrap();

    let expected: HashSet<Cid> = blocks.iter().map(|b| *b.cid()).collect();
    assert_eq!(seen, expected);
    assert!(report.is_complete(), "unexpected state: {:?}", report.state);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.produced, 5);

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_cursor_failure_truncates_stream() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blocks.db");
    let total = 400;

    let store = open_with_capacity(&dir, 4).await;
    let blocks: Vec<Block> = (0..total)
        .map(|i| Block::new(format!("{i:0>100}").into_bytes()).unwrap())
        .collect();
    store.put_many(&blocks).await.unwrap();
    store.close().await.unwrap();

    // Every page allocated after the schema belongs to the blocks tree.
    let mut conn = SqliteConnection::connect_with(&SqliteConnectOptions::new().filename(&path))
        .await
        .unwrap();
    let last_schema_page: i64 = sqlx::query_scalar("SELECT MAX(rootpage) FROM sqlite_master")
        .fetch_one(&mut conn)
        .await
        .unwrap();
    let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
        .fetch_one(&mut conn)
        .await
        .unwrap();
    let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
        .fetch_one(&mut conn)
        .await
        .unwrap();
    conn.close().await.unwrap();
    assert!(page_count > last_schema_page + 1);

    let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start((last_schema_page * page_size) as u64))
        .unwrap();
    let garbage = vec![0xFF; ((page_count - last_schema_page) * page_size) as usize];
    file.write_all(&garbage).unwrap();
    file.sync_all().unwrap();
    drop(file);

    let store = open_with_capacity(&dir, 4).await;
    let mut keys = store.all_keys(never_cancelled()).await.unwrap();
    let mut seen = Vec::new();
    while let Some(cid) = keys.recv().await {
        seen.push(cid);
    }
    let report = keys.finish().await.unwrap();

    assert!(
        matches!(report.state, EnumerationState::Failed(StorageError::Enumeration(_))),
        "unexpected state: {:?}",
        report.state
    );
    assert!(!report.is_complete());
    assert_eq!(report.produced, seen.len() as u64);
    assert!(seen.len() < total);

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_cancellation_stops_enumeration() {
    let dir = TempDir::new().unwrap();
    let capacity = 4;
    let store = open_with_capacity(&dir, capacity).await;

    let blocks = numbered_blocks(500);
    store.put_many(&blocks).await.unwrap();

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut keys = store.all_keys(cancel_rx).await.unwrap();

    for _ in 0..10 {
        assert!(keys.recv().await.is_some());
    }
    cancel_tx.send(true).unwrap();

    let mut after_cancel = 0;
    while keys.recv().await.is_some() {
        after_cancel += 1;
    }
    assert!(
        after_cancel <= capacity + 1,
        "received {after_cancel} keys after cancelling"
    );

    let report = keys.finish().await.unwrap();
    assert!(matches!(report.state, EnumerationState::Cancelled));
    assert!(report.produced < 500);

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_cancelled_before_start_yields_nothing() {
    let dir = TempDir::new().unwrap();
    let store = open_with_capacity(&dir, 4).await;
    store.put_many(&numbered_blocks(20)).await.unwrap();

    let (cancel_tx, cancel_rx) = watch::channel(true);
    let keys = store.all_keys(cancel_rx).await.unwrap();
    let collected: Vec<Cid> = keys.collect().await;
    assert!(collected.is_empty());
    drop(cancel_tx);

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_dropping_stream_stops_producer() {
    let dir = TempDir::new().unwrap();
    let store = open_with_capacity(&dir, 1).await;
    store.put_many(&numbered_blocks(100)).await.unwrap();

    let mut keys = store.all_keys(never_cancelled()).await.unwrap();
    assert!(keys.recv().await.is_some());

    let report = keys.finish().await.unwrap();
    assert!(matches!(report.state, EnumerationState::Cancelled));

    // The connection went back to the pool, so close does not hang.
    store.close().await.unwrap();
}
