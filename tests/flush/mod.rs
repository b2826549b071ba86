use crate::{
    helpers::{amount, setup_new_db_dir, staking_parsers},
    mock::{any_of, coin, signed_tx, success, MockHeight, MockTx},
};
use rocksdb::IteratorMode;
use staking_indexer::{
    decode::{msg::MSG_DELEGATE, proto, AddressCodec, Msg},
    event::MessageLog,
    filter::FilterRegistry,
    ingestion::{flush_worker, index_height, HeightData, Processor, SyncError},
    parser::{
        staking::DelegateParser, IndexError, MessageContext, MessageParser, ParseError,
        ParsedMessage, ParserRegistry,
    },
    query::QueryService,
    record::ChainCheckpoint,
    store::{IndexerStore, StoreBatch, StoreError},
};
use std::{
    sync::{mpsc as std_mpsc, Arc},
    thread,
    time::Duration,
};
use tokio::sync::mpsc;

const DELEGATOR: &str = "mtt1delegator";
const VALIDATOR: &str = "mttvaloper1validator";

/// Fails with a storage error when indexing at `fail_at`
struct StoreFailure {
    fail_at: u64,
}

impl MessageParser for StoreFailure {
    fn identifier(&self) -> &str {
        "store-failure"
    }

    fn parse(&self, msg: &Msg, log: &MessageLog) -> Result<ParsedMessage, ParseError> {
        DelegateParser.parse(msg, log)
    }

    fn index(
        &self,
        _batch: &mut StoreBatch<'_>,
        ctx: &MessageContext<'_>,
        _payload: &ParsedMessage,
    ) -> Result<(), IndexError> {
        if ctx.block.height == self.fail_at {
            return Err(StoreError::InvalidArgument("disk full".to_string()).into());
        }
        Ok(())
    }
}

fn height_data(height: u64, parsers: ParserRegistry) -> HeightData {
    let delegate = any_of(
        MSG_DELEGATE,
        &proto::MsgDelegate {
            delegator_address: DELEGATOR.into(),
            validator_address: VALIDATOR.into(),
            amount: coin("10"),
        },
    );
    let fixture = MockHeight::new(
        height,
        vec![MockTx {
            raw: signed_tx(vec![delegate], 1, "25"),
            result: success(vec![]),
        }],
    );
    Processor::new(AddressCodec::new("mtt"), FilterRegistry::default(), parsers)
        .process(fixture.fetched())
        .unwrap()
}

fn failing_parsers(fail_at: u64) -> ParserRegistry {
    let mut parsers = staking_parsers();
    parsers.register_message_parser(MSG_DELEGATE, Arc::new(StoreFailure { fail_at }));
    parsers
}

fn setup(prefix: &str) -> (tempfile::TempDir, Arc<IndexerStore>, QueryService) {
    let store_dir = setup_new_db_dir(prefix).unwrap();
    let store = Arc::new(IndexerStore::new(store_dir.path()).unwrap());
    let queries = QueryService::new(store.clone(), "mtt");
    (store_dir, store, queries)
}

#[tokio::test]
async fn drains_heights_in_order() {
    let (_dir, store, queries) = setup("flush-drain");
    let (sender, receiver) = mpsc::channel(4);
    let worker = tokio::spawn(flush_worker(
        store.clone(),
        ChainCheckpoint::new("mtt", "mock://node"),
        receiver,
    ));

    for height in 1..=3 {
        sender.send(height_data(height, staking_parsers())).await.unwrap();
    }
    drop(sender);
    worker.await.unwrap().unwrap();

    assert_eq!(queries.chain_height().unwrap(), 3);
    assert_eq!(
        queries.delegator_list(DELEGATOR).unwrap().amount_for(VALIDATOR),
        Some(amount(30))
    );
}

#[tokio::test]
async fn halts_on_storage_failure() {
    let (_dir, store, queries) = setup("flush-halt");
    let (sender, receiver) = mpsc::channel(4);
    let worker = tokio::spawn(flush_worker(
        store.clone(),
        ChainCheckpoint::new("mtt", "mock://node"),
        receiver,
    ));

    for height in 1..=3 {
        sender.send(height_data(height, failing_parsers(2))).await.unwrap();
    }
    assert!(matches!(
        worker.await.unwrap(),
        Err(SyncError::Flush(IndexError::Store(_)))
    ));

    // height 2 left no trace and height 3 was never indexed
    assert_eq!(queries.chain_height().unwrap(), 1);
    assert_eq!(queries.validator_history(VALIDATOR, 10, 0, true).unwrap().total, 1);
    assert!(sender.send(height_data(4, staking_parsers())).await.is_err());
}

#[test]
fn failed_height_can_be_indexed_again() {
    let (_dir, store, queries) = setup("flush-retry");
    let checkpoint = ChainCheckpoint::new("mtt", "mock://node");

    let first = index_height(&store, &checkpoint, &height_data(1, staking_parsers())).unwrap();
    assert!(index_height(&store, &first, &height_data(2, failing_parsers(2))).is_err());
    assert_eq!(queries.chain_height().unwrap(), 1);

    let second = index_height(&store, &first, &height_data(2, staking_parsers())).unwrap();
    assert_eq!(second.height, 2);
    assert_eq!(queries.chain_height().unwrap(), 2);
    assert_eq!(
        queries.delegator_list(DELEGATOR).unwrap().amount_for(VALIDATOR),
        Some(amount(20))
    );
    assert_eq!(queries.validator_history(VALIDATOR, 10, 0, true).unwrap().total, 2);
}

/// Every key and value in the store, in key order
fn dump(store: &IndexerStore) -> Vec<(Vec<u8>, Vec<u8>)> {
    store
        .database
        .iterator(IteratorMode::Start)
        .map(|entry| {
            let (key, value) = entry.unwrap();
            (key.to_vec(), value.to_vec())
        })
        .collect()
}

#[test]
fn reprocessed_height_matches_single_pass() {
    let (_once_dir, once, _) = setup("flush-once");
    let (_twice_dir, twice, _) = setup("flush-twice");
    let checkpoint = ChainCheckpoint::new("mtt", "mock://node");

    let first = index_height(&once, &checkpoint, &height_data(1, staking_parsers())).unwrap();
    index_height(&once, &first, &height_data(2, staking_parsers())).unwrap();

    // the first attempt at height 2 dies before its checkpoint is written,
    // so the restart processes it again from the same checkpoint
    let first = index_height(&twice, &checkpoint, &height_data(1, staking_parsers())).unwrap();
    assert!(index_height(&twice, &first, &height_data(2, failing_parsers(2))).is_err());
    let restarted = twice
        .get::<ChainCheckpoint>(&ChainCheckpoint::key_of("mtt"))
        .unwrap()
        .unwrap();
    assert_eq!(restarted, first);
    index_height(&twice, &restarted, &height_data(2, staking_parsers())).unwrap();

    assert_eq!(dump(&once), dump(&twice));
}

#[tokio::test]
async fn commits_do_not_block_the_runtime() {
    let (_dir, store, queries) = setup("flush-blocking");
    let (entered_tx, entered_rx) = std_mpsc::channel();
    let (release_tx, release_rx) = std_mpsc::channel::<()>();

    // another writer holds the store lock until this test lets go
    let holder = {
        let store = store.clone();
        thread::spawn(move || {
            store
                .transaction(|_batch| -> Result<bool, StoreError> {
                    entered_tx.send(()).unwrap();
                    Ok(release_rx.recv_timeout(Duration::from_secs(5)).is_ok())
                })
                .unwrap()
        })
    };
    entered_rx.recv().unwrap();

    let (sender, receiver) = mpsc::channel(4);
    let worker = tokio::spawn(flush_worker(
        store.clone(),
        ChainCheckpoint::new("mtt", "mock://node"),
        receiver,
    ));
    sender.send(height_data(1, staking_parsers())).await.unwrap();

    // single threaded runtime: this only wakes if the worker waits off-thread
    tokio::time::sleep(Duration::from_millis(50)).await;
    let _ = release_tx.send(());
    assert!(holder.join().unwrap(), "the lock holder timed out");

    drop(sender);
    worker.await.unwrap().unwrap();
    assert_eq!(queries.chain_height().unwrap(), 1);
}
