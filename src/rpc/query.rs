use super::{ChainRpc, RpcError, TxSearchItem};
use crate::{amount::Amount, decode::proto};
use prost::Message;
use tracing::debug;

pub const VALIDATORS_PATH: &str = "/cosmos.staking.v1beta1.Query/Validators";
pub const OUTSTANDING_REWARDS_PATH: &str =
    "/cosmos.distribution.v1beta1.Query/ValidatorOutstandingRewards";
pub const POOL_PATH: &str = "/cosmos.staking.v1beta1.Query/Pool";

pub const TX_SEARCH_PAGE_SIZE: u32 = 100;
pub const VALIDATORS_PAGE_SIZE: u64 = 100;

/// Digits after the point in the chain's fixed point decimals
const DEC_PRECISION: usize = 18;

/// Every transaction at `height`, following tx search pages until the
/// reported total is reached
pub async fn txs_by_height<R: ChainRpc + ?Sized>(
    rpc: &R,
    height: u64,
) -> Result<Vec<TxSearchItem>, RpcError> {
    let mut txs = vec![];
    let mut page = 1;
    loop {
        let result = rpc.tx_search(height, page, TX_SEARCH_PAGE_SIZE).await?;
        let fetched = result.txs.len();
        txs.extend(result.txs);
        if fetched == 0 || txs.len() as u64 >= result.total_count {
            break;
        }
        page += 1;
    }
    debug!("Found {} txs at height {height}", txs.len());
    Ok(txs)
}

async fn query<R, Req, Resp>(rpc: &R, path: &str, request: &Req) -> Result<Resp, RpcError>
where
    R: ChainRpc + ?Sized,
    Req: Message,
    Resp: Message + Default,
{
    let bytes = rpc.abci_query(path, request.encode_to_vec()).await?;
    Ok(Resp::decode(bytes.as_slice())?)
}

/// All validators regardless of status, paged by `next_key`
pub async fn all_validators<R: ChainRpc + ?Sized>(
    rpc: &R,
) -> Result<Vec<proto::Validator>, RpcError> {
    let mut validators = vec![];
    let mut next_key = vec![];
    loop {
        let request = proto::QueryValidatorsRequest {
            status: String::new(),
            pagination: Some(proto::PageRequest {
                key: next_key,
                offset: 0,
                limit: VALIDATORS_PAGE_SIZE,
                count_total: true,
            }),
        };
        let response: proto::QueryValidatorsResponse =
            query(rpc, VALIDATORS_PATH, &request).await?;
        let fetched = response.validators.len();
        validators.extend(response.validators);

        let pagination = response.pagination.unwrap_or_default();
        let done = fetched == 0
            || pagination.next_key.is_empty()
            || (pagination.total > 0 && validators.len() as u64 >= pagination.total);
        if done {
            return Ok(validators);
        }
        next_key = pagination.next_key;
    }
}

/// Outstanding rewards of a validator in `denom`, truncated to whole units
pub async fn validator_outstanding_rewards<R: ChainRpc + ?Sized>(
    rpc: &R,
    validator: &str,
    denom: &str,
) -> Result<Amount, RpcError> {
    let request = proto::QueryValidatorOutstandingRewardsRequest {
        validator_address: validator.to_string(),
    };
    let response: proto::QueryValidatorOutstandingRewardsResponse =
        query(rpc, OUTSTANDING_REWARDS_PATH, &request).await?;
    let rewards = response.rewards.unwrap_or_default().rewards;
    match rewards.iter().find(|coin| coin.denom == denom) {
        Some(coin) => truncate_dec(&coin.amount),
        None => Ok(Amount::zero()),
    }
}

pub async fn bonded_tokens<R: ChainRpc + ?Sized>(rpc: &R) -> Result<Amount, RpcError> {
    let response: proto::QueryPoolResponse =
        query(rpc, POOL_PATH, &proto::QueryPoolRequest {}).await?;
    let bonded = response.pool.unwrap_or_default().bonded_tokens;
    Amount::from_dec_str(&bonded).map_err(|_| RpcError::Amount(bonded))
}

/// Integer part of a fixed point decimal, which travels either with a
/// point or as an integer scaled by 10^18
pub fn truncate_dec(amount: &str) -> Result<Amount, RpcError> {
    let invalid = || RpcError::Amount(amount.to_string());
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    let whole = match amount.split_once('.') {
        Some((whole, fraction)) if digits(whole) && digits(fraction) => whole,
        None if digits(amount) => &amount[..amount.len().saturating_sub(DEC_PRECISION)],
        _ => return Err(invalid()),
    };
    if whole.is_empty() {
        return Ok(Amount::zero());
    }
    Amount::from_dec_str(whole).map_err(|_| invalid())
}
