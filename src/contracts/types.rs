// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::prelude::*;

// EcommercePrivacy contract ABI (relayed calls take the signer explicitly;
// addProductWithMessage takes the EIP-191 hash for canonical-JSON signatures)
abigen!(
    EcommercePrivacy,
    r#"[
        {
            "inputs": [{"internalType": "address", "name": "account", "type": "address"}],
            "name": "nonces",
            "outputs": [{"internalType": "uint256", "name": "", "type": "uint256"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [
                {"internalType": "address", "name": "buyer", "type": "address"},
                {"internalType": "uint256", "name": "productId", "type": "uint256"},
                {"internalType": "bytes32", "name": "dataHash", "type": "bytes32"},
                {"internalType": "uint256", "name": "timestamp", "type": "uint256"},
                {"internalType": "uint256", "name": "nonce", "type": "uint256"},
                {"internalType": "bytes", "name": "signature", "type": "bytes"}
            ],
            "name": "verifySignature",
            "outputs": [{"internalType": "bool", "name": "", "type": "bool"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [
                {"internalType": "address", "name": "seller", "type": "address"},
                {"internalType": "string", "name": "name", "type": "string"},
                {"internalType": "uint256", "name": "price", "type": "uint256"},
                {"internalType": "bytes32", "name": "dataHash", "type": "bytes32"},
                {"internalType": "uint256", "name": "timestamp", "type": "uint256"},
                {"internalType": "uint256", "name": "nonce", "type": "uint256"},
                {"internalType": "bytes", "name": "signature", "type": "bytes"}
            ],
            "name": "verifyProductSignature",
            "outputs": [{"internalType": "bool", "name": "", "type": "bool"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [
                {"internalType": "address", "name": "signer", "type": "address"},
                {"internalType": "bytes32", "name": "messageHash", "type": "bytes32"},
                {"internalType": "bytes", "name": "signature", "type": "bytes"}
            ],
            "name": "verifyMessageSignature",
            "outputs": [{"internalType": "bool", "name": "", "type": "bool"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [
                {"internalType": "address", "name": "buyer", "type": "address"},
                {"internalType": "uint256", "name": "productId", "type": "uint256"},
                {"internalType": "string", "name": "encryptedData", "type": "string"},
                {"internalType": "string", "name": "iv", "type": "string"},
                {"internalType": "bytes", "name": "encryptedKey", "type": "bytes"},
                {"internalType": "bytes32", "name": "dataHash", "type": "bytes32"},
                {"internalType": "uint256", "name": "timestamp", "type": "uint256"},
                {"internalType": "uint256", "name": "nonce", "type": "uint256"},
                {"internalType": "bytes", "name": "signature", "type": "bytes"}
            ],
            "name": "placeOrder",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [
                {"internalType": "address", "name": "seller", "type": "address"},
                {"internalType": "string", "name": "name", "type": "string"},
                {"internalType": "uint256", "name": "price", "type": "uint256"},
                {"internalType": "string", "name": "encryptedDetails", "type": "string"},
                {"internalType": "string", "name": "iv", "type": "string"},
                {"internalType": "bytes", "name": "encryptedKey", "type": "bytes"},
                {"internalType": "bytes32", "name": "dataHash", "type": "bytes32"},
                {"internalType": "uint256", "name": "timestamp", "type": "uint256"},
                {"internalType": "uint256", "name": "nonce", "type": "uint256"},
                {"internalType": "bytes", "name": "signature", "type": "bytes"}
            ],
            "name": "addProduct",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [
                {"internalType": "address", "name": "seller", "type": "address"},
                {"internalType": "string", "name": "name", "type": "string"},
                {"internalType": "uint256", "name": "price", "type": "uint256"},
                {"internalType": "string", "name": "encryptedDetails", "type": "string"},
                {"internalType": "string", "name": "iv", "type": "string"},
                {"internalType": "bytes", "name": "encryptedKey", "type": "bytes"},
                {"internalType": "bytes32", "name": "dataHash", "type": "bytes32"},
                {"internalType": "uint256", "name": "nonce", "type": "uint256"},
                {"internalType": "bytes32", "name": "messageHash", "type": "bytes32"},
                {"internalType": "bytes", "name": "signature", "type": "bytes"}
            ],
            "name": "addProductWithMessage",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [{"internalType": "uint256", "name": "orderId", "type": "uint256"}],
            "name": "orders",
            "outputs": [
                {"internalType": "address", "name": "buyer", "type": "address"},
                {"internalType": "uint256", "name": "productId", "type": "uint256"},
                {"internalType": "string", "name": "encryptedData", "type": "string"},
                {"internalType": "string", "name": "iv", "type": "string"},
                {"internalType": "bytes", "name": "encryptedKey", "type": "bytes"},
                {"internalType": "bytes32", "name": "dataHash", "type": "bytes32"},
                {"internalType": "uint256", "name": "timestamp", "type": "uint256"}
            ],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "anonymous": false,
            "inputs": [
                {"indexed": true, "internalType": "uint256", "name": "productId", "type": "uint256"},
                {"indexed": true, "internalType": "address", "name": "seller", "type": "address"},
                {"indexed": false, "internalType": "string", "name": "name", "type": "string"},
                {"indexed": false, "internalType": "uint256", "name": "price", "type": "uint256"}
            ],
            "name": "ProductAdded",
            "type": "event"
        },
        {
            "anonymous": false,
            "inputs": [
                {"indexed": true, "internalType": "uint256", "name": "orderId", "type": "uint256"},
                {"indexed": true, "internalType": "uint256", "name": "productId", "type": "uint256"},
                {"indexed": true, "internalType": "address", "name": "buyer", "type": "address"},
                {"indexed": false, "internalType": "bytes32", "name": "dataHash", "type": "bytes32"}
            ],
            "name": "OrderPlaced",
            "type": "event"
        }
    ]"#
);
