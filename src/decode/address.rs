use super::{proto, DecodeError};
use bech32::{Bech32, Hrp};
use prost::Message;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use thiserror::Error;

pub const SECP256K1_PUBKEY: &str = "/cosmos.crypto.secp256k1.PubKey";
pub const ED25519_PUBKEY: &str = "/cosmos.crypto.ed25519.PubKey";
pub const MULTISIG_PUBKEY: &str = "/cosmos.crypto.multisig.LegacyAminoPubKey";
pub const ETH_SECP256K1_PUBKEYS: [&str; 3] = [
    "/ethermint.crypto.v1.ethsecp256k1.PubKey",
    "/cosmos.evm.crypto.v1.ethsecp256k1.PubKey",
    "/injective.crypto.v1beta1.ethsecp256k1.PubKey",
];

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("invalid bech32 prefix {prefix:?}: {reason}")]
    Prefix { prefix: String, reason: String },
    #[error("bech32 encoding failed: {0}")]
    Encode(String),
    #[error("invalid bech32 address {address:?}: {reason}")]
    Decode { address: String, reason: String },
    #[error("invalid hex address {0:?}")]
    Hex(String),
    #[error("invalid secp256k1 key: {0}")]
    Key(#[from] secp256k1::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PubKey {
    Secp256k1(Vec<u8>),
    EthSecp256k1(Vec<u8>),
    Ed25519(Vec<u8>),
    Multisig { threshold: u32, members: Vec<PubKey> },
}

impl PubKey {
    pub fn from_any(any: &proto::Any) -> Result<Self, DecodeError> {
        let type_url = any.type_url.as_str();
        if type_url == MULTISIG_PUBKEY {
            let multisig = proto::LegacyAminoPubKey::decode(any.value.as_slice())
                .map_err(|source| pubkey_error(type_url, source))?;
            let members = multisig
                .public_keys
                .iter()
                .map(PubKey::from_any)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(PubKey::Multisig {
                threshold: multisig.threshold,
                members,
            });
        }

        let key_bytes = || {
            proto::PubKeyBytes::decode(any.value.as_slice())
                .map(|key| key.key)
                .map_err(|source| pubkey_error(type_url, source))
        };
        match type_url {
            SECP256K1_PUBKEY => Ok(PubKey::Secp256k1(key_bytes()?)),
            ED25519_PUBKEY => Ok(PubKey::Ed25519(key_bytes()?)),
            url if ETH_SECP256K1_PUBKEYS.contains(&url) => Ok(PubKey::EthSecp256k1(key_bytes()?)),
            url => Err(DecodeError::UnknownPubKeyType(url.to_string())),
        }
    }
}

fn pubkey_error(type_url: &str, source: prost::DecodeError) -> DecodeError {
    DecodeError::PubKey {
        type_url: type_url.to_string(),
        source,
    }
}

/// Bech32 address rendering for one chain's prefixes
#[derive(Debug, Clone)]
pub struct AddressCodec {
    account_prefix: String,
}

impl AddressCodec {
    pub fn new(account_prefix: &str) -> Self {
        Self {
            account_prefix: account_prefix.to_string(),
        }
    }

    pub fn account_prefix(&self) -> &str {
        &self.account_prefix
    }

    pub fn validator_prefix(&self) -> String {
        format!("{}valoper", self.account_prefix)
    }

    pub fn consensus_prefix(&self) -> String {
        format!("{}valcons", self.account_prefix)
    }

    pub fn encode(&self, prefix: &str, bytes: &[u8]) -> Result<String, AddressError> {
        let hrp = Hrp::parse(prefix).map_err(|e| AddressError::Prefix {
            prefix: prefix.to_string(),
            reason: e.to_string(),
        })?;
        bech32::encode::<Bech32>(hrp, bytes).map_err(|e| AddressError::Encode(e.to_string()))
    }

    pub fn account_address(&self, bytes: &[u8]) -> Result<String, AddressError> {
        self.encode(&self.account_prefix, bytes)
    }

    /// Account addresses controlled by `key`; a multisig yields its members
    pub fn pubkey_addresses(&self, key: &PubKey) -> Result<Vec<String>, AddressError> {
        match key {
            PubKey::Multisig { members, .. } => {
                let mut addresses = vec![];
                for member in members {
                    addresses.extend(self.pubkey_addresses(member)?);
                }
                Ok(addresses)
            }
            single => Ok(vec![self.account_address(&key_hash(single)?)?]),
        }
    }

    /// Re-encode a validator operator address as its account address
    pub fn operator_to_account(&self, operator: &str) -> Result<String, AddressError> {
        let (_, bytes) = bech32::decode(operator).map_err(|e| AddressError::Decode {
            address: operator.to_string(),
            reason: e.to_string(),
        })?;
        self.account_address(&bytes)
    }

    /// Consensus address of a block proposer given as hex
    pub fn consensus_address_from_hex(&self, proposer: &str) -> Result<String, AddressError> {
        let bytes = hex::decode(proposer).map_err(|_| AddressError::Hex(proposer.to_string()))?;
        self.encode(&self.consensus_prefix(), &bytes)
    }
}

fn key_hash(key: &PubKey) -> Result<Vec<u8>, AddressError> {
    match key {
        PubKey::Secp256k1(bytes) => Ok(Ripemd160::digest(Sha256::digest(bytes)).to_vec()),
        PubKey::Ed25519(bytes) => Ok(Sha256::digest(bytes)[..20].to_vec()),
        PubKey::EthSecp256k1(bytes) => {
            let uncompressed = secp256k1::PublicKey::from_slice(bytes)?.serialize_uncompressed();
            Ok(Keccak256::digest(&uncompressed[1..])[12..].to_vec())
        }
        PubKey::Multisig { .. } => Ok(vec![]),
    }
}
