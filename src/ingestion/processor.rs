use super::{HeightData, ProcessError, ProcessedBlockEvent, ProcessedMessage, ProcessedTx};
use crate::{
    block::{block_events, Block, BlockLifecycle},
    decode::{tx_hash, AddressCodec, ChainDecoder},
    event::{normalize_message_logs, split_finalize_block_events, Event, MessageLog},
    filter::{message_should_index, message_type_should_index, BlockEventFilterRegistry, FilterRegistry},
    parser::ParserRegistry,
    rpc::{RpcBlock, RpcBlockResults, TxResult, TxSearchItem},
    signer::{resolve_fees, resolve_signers},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, trace};

/// Raw node data for one height
#[derive(Debug, Clone)]
pub struct FetchedHeight {
    pub block: RpcBlock,
    pub results: RpcBlockResults,
    /// `None` when tx search failed and txs come from the block itself
    pub tx_search: Option<Vec<TxSearchItem>>,
}

/// Turns fetched heights into [HeightData] ready for indexing
pub struct Processor {
    pub decoder: ChainDecoder,
    pub codec: AddressCodec,
    pub filters: FilterRegistry,
    pub parsers: ParserRegistry,
}

struct RawTx {
    hash: String,
    bytes: Vec<u8>,
    result: TxResult,
}

impl Processor {
    pub fn new(codec: AddressCodec, filters: FilterRegistry, parsers: ParserRegistry) -> Self {
        Self {
            decoder: ChainDecoder::default(),
            codec,
            filters,
            parsers,
        }
    }

    pub fn process(&self, fetched: FetchedHeight) -> Result<HeightData, ProcessError> {
        let FetchedHeight {
            block: rpc_block,
            results,
            tx_search,
        } = fetched;
        let header = &rpc_block.block.header;
        let height = header.height;
        let block = Block {
            height,
            chain_id: header.chain_id.clone(),
            proposer: self
                .codec
                .consensus_address_from_hex(&header.proposer_address)?,
            time: header.time,
        };

        let txs = raw_txs(height, &rpc_block, &results, tx_search)?;
        let (begin_block_events, end_block_events) = self.process_block_events(height, results)?;

        let mut processed = Vec::with_capacity(txs.len());
        for tx in txs {
            processed.push(self.process_tx(height, tx)?);
        }
        debug!(
            "Processed height {height}: {} txs, {} begin block events, {} end block events",
            processed.len(),
            begin_block_events.len(),
            end_block_events.len()
        );

        Ok(HeightData {
            block,
            txs: processed,
            begin_block_events,
            end_block_events,
        })
    }

    fn process_block_events(
        &self,
        height: u64,
        results: RpcBlockResults,
    ) -> Result<(Vec<ProcessedBlockEvent>, Vec<ProcessedBlockEvent>), ProcessError> {
        let RpcBlockResults {
            mut begin_block_events,
            mut end_block_events,
            finalize_block_events,
            ..
        } = results;
        let split = split_finalize_block_events(finalize_block_events)
            .map_err(|source| ProcessError::Normalization { height, source })?;
        begin_block_events.extend(split.begin_block);
        end_block_events.extend(split.end_block);

        Ok((
            self.parse_block_events(
                BlockLifecycle::BeginBlock,
                begin_block_events,
                &self.filters.begin_block,
            ),
            self.parse_block_events(
                BlockLifecycle::EndBlock,
                end_block_events,
                &self.filters.end_block,
            ),
        ))
    }

    fn parse_block_events(
        &self,
        lifecycle: BlockLifecycle,
        events: Vec<Event>,
        filters: &BlockEventFilterRegistry,
    ) -> Vec<ProcessedBlockEvent> {
        filters
            .filter(block_events(lifecycle, events))
            .into_iter()
            .map(|event| ProcessedBlockEvent {
                parsed: self.parsers.parse_block_event(&event),
                event,
            })
            .collect()
    }

    fn process_tx(&self, height: u64, tx: RawTx) -> Result<ProcessedTx, ProcessError> {
        let RawTx {
            hash,
            bytes,
            result,
        } = tx;
        let decoded = match self.decoder.decode(&bytes) {
            Ok(decoded) => decoded,
            Err(source) => {
                return Err(ProcessError::UnprocessableTx {
                    height,
                    hash,
                    source,
                })
            }
        };

        let logs = normalize_message_logs(
            result.code,
            &result.log,
            &result.events,
            decoded.messages.len(),
        )
        .map_err(|source| ProcessError::Normalization { height, source })?;

        let signers = match resolve_signers(&decoded.auth_info, &decoded.messages, &self.codec) {
            Ok(signers) => signers,
            Err(source) => return Err(ProcessError::Signer { hash, source }),
        };
        let fees = match resolve_fees(decoded.auth_info.fee.as_ref(), &signers) {
            Ok(fees) => fees,
            Err(source) => return Err(ProcessError::Signer { hash, source }),
        };

        let mut messages = vec![];
        if result.code == 0 {
            for (index, msg) in decoded.messages.iter().enumerate() {
                let type_url = msg.type_url();
                let has_parser = self.parsers.has_message_parser(type_url);
                if !message_type_should_index(
                    type_url,
                    &self.filters.message_type_filters,
                    has_parser,
                ) {
                    trace!("Skipping {type_url} in tx {hash}");
                    continue;
                }

                let log = logs
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| MessageLog::empty(index as u32));
                if !has_parser && !message_should_index(msg, &log, &self.filters.message_filters) {
                    trace!("Message {index} of tx {hash} rejected by message filters");
                    continue;
                }

                messages.push(ProcessedMessage {
                    index,
                    type_url: type_url.to_string(),
                    raw: decoded
                        .raw_messages
                        .get(index)
                        .map(|any| any.value.clone())
                        .unwrap_or_default(),
                    parsed: self.parsers.parse_message(msg, &log),
                    events: log.events,
                });
            }
        } else {
            debug!("Tx {hash} failed with code {}, indexing fees only", result.code);
        }

        Ok(ProcessedTx {
            hash,
            code: result.code,
            memo: decoded.memo,
            signers,
            fees,
            messages,
        })
    }
}

/// Pair every tx of the height with its result, from tx search when it
/// succeeded, otherwise from the block's tx list and the block results
fn raw_txs(
    height: u64,
    block: &RpcBlock,
    results: &RpcBlockResults,
    tx_search: Option<Vec<TxSearchItem>>,
) -> Result<Vec<RawTx>, ProcessError> {
    let decode = |tx: &str| {
        STANDARD
            .decode(tx)
            .map_err(|source| ProcessError::Base64 { height, source })
    };

    if let Some(mut items) = tx_search {
        items.sort_by_key(|item| item.index);
        return items
            .into_iter()
            .map(|item| {
                Ok(RawTx {
                    bytes: decode(&item.tx)?,
                    hash: item.hash,
                    result: item.tx_result,
                })
            })
            .collect();
    }

    let txs = &block.block.data.txs;
    if txs.len() != results.txs_results.len() {
        return Err(ProcessError::TxCountMismatch {
            height,
            txs: txs.len(),
            results: results.txs_results.len(),
        });
    }
    txs.iter()
        .zip(&results.txs_results)
        .map(|(tx, result)| {
            let bytes = decode(tx)?;
            Ok(RawTx {
                hash: tx_hash(&bytes),
                bytes,
                result: result.clone(),
            })
        })
        .collect()
}
