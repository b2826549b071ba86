//! Deterministic signer and fee derivation for a decoded transaction.

use crate::{
    amount::Amount,
    decode::{proto, AddressCodec, DecodeError, Msg, PubKey},
};
use serde_derive::{Deserialize, Serialize};
use std::collections::HashSet;

/// One non-zero fee coin and the account paying it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeItem {
    pub amount: Amount,
    pub denom: String,
    pub payer: String,
}

/// Ordered signer addresses, first occurrence wins.
///
/// Signer-info keys come first (multisig keys expand to their members),
/// then each message's declared signers in message order, then the fee
/// payer when one is set.
pub fn resolve_signers(
    auth_info: &proto::AuthInfo,
    messages: &[Msg],
    codec: &AddressCodec,
) -> Result<Vec<String>, DecodeError> {
    let mut signers = Signers::default();

    for signer_info in &auth_info.signer_infos {
        if let Some(any) = &signer_info.public_key {
            let key = PubKey::from_any(any)?;
            for address in codec.pubkey_addresses(&key)? {
                signers.push(address);
            }
        }
    }

    for msg in messages {
        for address in msg.signers(codec)? {
            signers.push(address);
        }
    }

    if let Some(fee) = &auth_info.fee {
        if !fee.payer.is_empty() {
            signers.push(fee.payer.clone());
        }
    }

    Ok(signers.ordered)
}

/// Fee line items for every coin with a non-zero amount. The explicit
/// fee payer pays when set, otherwise the first signer.
pub fn resolve_fees(
    fee: Option<&proto::Fee>,
    signers: &[String],
) -> Result<Vec<FeeItem>, DecodeError> {
    let Some(fee) = fee else {
        return Ok(vec![]);
    };
    let payer = if fee.payer.is_empty() {
        signers.first().cloned().unwrap_or_default()
    } else {
        fee.payer.clone()
    };

    let mut items = vec![];
    for coin in &fee.amount {
        let amount = Amount::from_dec_str(&coin.amount)
            .map_err(|_| DecodeError::FeeAmount(coin.amount.clone()))?;
        if amount.is_zero() {
            continue;
        }
        items.push(FeeItem {
            amount,
            denom: coin.denom.clone(),
            payer: payer.clone(),
        });
    }
    Ok(items)
}

#[derive(Default)]
struct Signers {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl Signers {
    fn push(&mut self, address: String) {
        if self.seen.insert(address.clone()) {
            self.ordered.push(address);
        }
    }
}
