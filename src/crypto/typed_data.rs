// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! EIP-712 Typed Records
//!
//! Structured signing mode. Each request kind is a typed record hashed under
//! a domain separator that names the protocol, its version, the chain and the
//! verifying contract, so a signature made for one deployment is useless on
//! any other.
//!
//! ## Hashing Formula
//!
//! ```text
//! domainSeparator = keccak256(abi.encode(DOMAIN_TYPEHASH, keccak256(name),
//!                             keccak256(version), chainId, verifyingContract))
//! structHash      = keccak256(abi.encode(TYPEHASH, field...))
//! digest          = keccak256(0x19 || 0x01 || domainSeparator || structHash)
//! ```
//!
//! `string` fields are hashed with keccak256 before encoding, as EIP-712
//! requires.

use ethers::abi::{encode, Token};
use ethers::types::{Address, U256};

use super::signature::keccak256;

pub const DOMAIN_NAME: &str = "EcommercePrivacy";
pub const DOMAIN_VERSION: &str = "1";

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const PLACE_ORDER_TYPE: &str =
    "PlaceOrder(uint256 productId,bytes32 dataHash,uint256 timestamp,uint256 nonce)";
const ADD_PRODUCT_TYPE: &str =
    "AddProduct(string name,uint256 price,bytes32 dataHash,uint256 timestamp,uint256 nonce)";

/// Domain separator fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    /// Protocol domain for one deployment
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            chain_id,
            verifying_contract,
        }
    }

    pub fn separator(&self) -> [u8; 32] {
        keccak256(&encode(&[
            Token::FixedBytes(keccak256(DOMAIN_TYPE.as_bytes()).to_vec()),
            Token::FixedBytes(keccak256(self.name.as_bytes()).to_vec()),
            Token::FixedBytes(keccak256(self.version.as_bytes()).to_vec()),
            Token::Uint(U256::from(self.chain_id)),
            Token::Address(self.verifying_contract),
        ]))
    }
}

/// `PlaceOrder` record signed by a buyer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrderRecord {
    pub product_id: U256,
    pub data_hash: [u8; 32],
    pub timestamp: u64,
    pub nonce: U256,
}

/// `AddProduct` record signed by a seller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddProductRecord {
    pub name: String,
    /// Price in wei
    pub price: U256,
    pub data_hash: [u8; 32],
    pub timestamp: u64,
    pub nonce: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedRecord {
    PlaceOrder(PlaceOrderRecord),
    AddProduct(AddProductRecord),
}

impl TypedRecord {
    pub fn primary_type(&self) -> &'static str {
        match self {
            TypedRecord::PlaceOrder(_) => "PlaceOrder",
            TypedRecord::AddProduct(_) => "AddProduct",
        }
    }

    pub fn struct_hash(&self) -> [u8; 32] {
        let tokens = match self {
            TypedRecord::PlaceOrder(r) => vec![
                Token::FixedBytes(keccak256(PLACE_ORDER_TYPE.as_bytes()).to_vec()),
                Token::Uint(r.product_id),
                Token::FixedBytes(r.data_hash.to_vec()),
                Token::Uint(U256::from(r.timestamp)),
                Token::Uint(r.nonce),
            ],
            TypedRecord::AddProduct(r) => vec![
                Token::FixedBytes(keccak256(ADD_PRODUCT_TYPE.as_bytes()).to_vec()),
                Token::FixedBytes(keccak256(r.name.as_bytes()).to_vec()),
                Token::Uint(r.price),
                Token::FixedBytes(r.data_hash.to_vec()),
                Token::Uint(U256::from(r.timestamp)),
                Token::Uint(r.nonce),
            ],
        };
        keccak256(&encode(&tokens))
    }
}

/// A typed record bound to its domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedMessage {
    pub domain: Eip712Domain,
    pub record: TypedRecord,
}

impl TypedMessage {
    pub fn digest(&self) -> [u8; 32] {
        let mut data = Vec::with_capacity(2 + 32 + 32);
        data.extend_from_slice(&[0x19, 0x01]);
        data.extend_from_slice(&self.domain.separator());
        data.extend_from_slice(&self.record.struct_hash());
        keccak256(&data)
    }
}

/// Commitment to the encrypted payload: keccak256(utf8(encryptedData || iv))
///
/// Computed over the exact wire strings, matching the browser client.
pub fn payload_data_hash(encrypted_data: &str, iv: &str) -> [u8; 32] {
    let mut data = Vec::with_capacity(encrypted_data.len() + iv.len());
    data.extend_from_slice(encrypted_data.as_bytes());
    data.extend_from_slice(iv.as_bytes());
    keccak256(&data)
}
