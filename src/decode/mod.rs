//! Raw transaction decoding.
//!
//! [ChainDecoder] tries a strict decoder that only accepts known message
//! types, then a lenient one that keeps unknown messages as [Msg::Unknown].
//! A transaction neither accepts is unprocessable.

pub mod address;
pub mod msg;
pub mod proto;

use prost::Message;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

pub use address::{AddressCodec, AddressError, PubKey};
pub use msg::Msg;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid tx envelope: {0}")]
    Envelope(#[source] prost::DecodeError),
    #[error("invalid tx body: {0}")]
    Body(#[source] prost::DecodeError),
    #[error("invalid tx auth info: {0}")]
    AuthInfo(#[source] prost::DecodeError),
    #[error("unregistered message type {0}")]
    UnknownMessageType(String),
    #[error("invalid {type_url} message: {source}")]
    Message {
        type_url: String,
        #[source]
        source: prost::DecodeError,
    },
    #[error("unsupported public key type {0}")]
    UnknownPubKeyType(String),
    #[error("invalid {type_url} public key: {source}")]
    PubKey {
        type_url: String,
        #[source]
        source: prost::DecodeError,
    },
    #[error("invalid fee amount {0:?}")]
    FeeAmount(String),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Contents of a transaction envelope
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTx {
    pub raw_messages: Vec<proto::Any>,
    pub messages: Vec<Msg>,
    pub memo: String,
    pub timeout_height: u64,
    pub auth_info: proto::AuthInfo,
    pub signatures: Vec<Vec<u8>>,
}

pub trait TxDecoder: Send + Sync {
    fn decode(&self, raw: &[u8]) -> Result<DecodedTx, DecodeError>;
}

/// Rejects any message whose type is not registered
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictDecoder;

/// Keeps unregistered or undecodable messages as [Msg::Unknown]
#[derive(Debug, Default, Clone, Copy)]
pub struct LenientDecoder;

impl TxDecoder for StrictDecoder {
    fn decode(&self, raw: &[u8]) -> Result<DecodedTx, DecodeError> {
        let (body, auth_info, signatures) = decode_envelope(raw)?;
        let mut messages = Vec::with_capacity(body.messages.len());
        for any in &body.messages {
            match Msg::from_any(any) {
                Ok(Some(msg)) => messages.push(msg),
                Ok(None) => return Err(DecodeError::UnknownMessageType(any.type_url.clone())),
                Err(source) => {
                    return Err(DecodeError::Message {
                        type_url: any.type_url.clone(),
                        source,
                    })
                }
            }
        }
        Ok(DecodedTx::new(body, messages, auth_info, signatures))
    }
}

impl TxDecoder for LenientDecoder {
    fn decode(&self, raw: &[u8]) -> Result<DecodedTx, DecodeError> {
        let (body, auth_info, signatures) = decode_envelope(raw)?;
        let messages = body
            .messages
            .iter()
            .map(|any| match Msg::from_any(any) {
                Ok(Some(msg)) => msg,
                _ => Msg::Unknown(any.clone()),
            })
            .collect();
        Ok(DecodedTx::new(body, messages, auth_info, signatures))
    }
}

impl DecodedTx {
    fn new(
        body: proto::TxBody,
        messages: Vec<Msg>,
        auth_info: proto::AuthInfo,
        signatures: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            raw_messages: body.messages,
            messages,
            memo: body.memo,
            timeout_height: body.timeout_height,
            auth_info,
            signatures,
        }
    }
}

fn decode_envelope(
    raw: &[u8],
) -> Result<(proto::TxBody, proto::AuthInfo, Vec<Vec<u8>>), DecodeError> {
    let envelope = proto::TxRaw::decode(raw).map_err(DecodeError::Envelope)?;
    let body = proto::TxBody::decode(envelope.body_bytes.as_slice()).map_err(DecodeError::Body)?;
    let auth_info = proto::AuthInfo::decode(envelope.auth_info_bytes.as_slice())
        .map_err(DecodeError::AuthInfo)?;
    Ok((body, auth_info, envelope.signatures))
}

/// Primary decoder with a fallback
pub struct ChainDecoder {
    primary: Box<dyn TxDecoder>,
    fallback: Box<dyn TxDecoder>,
}

impl Default for ChainDecoder {
    fn default() -> Self {
        Self::new(Box::new(StrictDecoder), Box::new(LenientDecoder))
    }
}

impl ChainDecoder {
    pub fn new(primary: Box<dyn TxDecoder>, fallback: Box<dyn TxDecoder>) -> Self {
        Self { primary, fallback }
    }

    pub fn decode(&self, raw: &[u8]) -> Result<DecodedTx, DecodeError> {
        match self.primary.decode(raw) {
            Ok(tx) => Ok(tx),
            Err(e) => {
                debug!("Primary decoder rejected tx, using fallback: {e}");
                self.fallback.decode(raw)
            }
        }
    }
}

/// Upper-case hex SHA-256 of the raw tx bytes, as reported by the node
pub fn tx_hash(raw: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(raw))
}

/// Encode a tx envelope; used to build fixtures and to re-hash decoded txs
pub fn encode_tx(body: &proto::TxBody, auth_info: &proto::AuthInfo, signatures: Vec<Vec<u8>>) -> Vec<u8> {
    proto::TxRaw {
        body_bytes: body.encode_to_vec(),
        auth_info_bytes: auth_info.encode_to_vec(),
        signatures,
    }
    .encode_to_vec()
}
