// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Tests for identity binding: EIP-712 typed records and EIP-191 canonical JSON

use ecommerce_privacy_node::crypto::{
    canonical_json, payload_data_hash, recover_identity, sign, verify_claim, AddProductRecord,
    CanonicalMessage, CryptoError, Eip712Domain, Identity, PlaceOrderRecord, TypedMessage,
    TypedRecord,
};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256, U256};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use serde_json::json;

fn order_message(domain: Eip712Domain) -> CanonicalMessage {
    CanonicalMessage::Typed(TypedMessage {
        domain,
        record: TypedRecord::PlaceOrder(PlaceOrderRecord {
            product_id: U256::from(1u64),
            data_hash: payload_data_hash("aabbcc", "000102030405060708090a0b"),
            timestamp: 1_700_000_000,
            nonce: U256::zero(),
        }),
    })
}

fn sepolia_domain() -> Eip712Domain {
    Eip712Domain::new(11155111, Address::repeat_byte(0x11))
}

#[test]
fn test_sign_recover_roundtrip() {
    let key = SigningKey::random(&mut OsRng);
    let message = order_message(sepolia_domain());

    let signature = sign(&message, &key).unwrap();
    let recovered = recover_identity(&message, &signature).unwrap();

    assert_eq!(recovered, Identity::from_verifying_key(key.verifying_key()));
    assert!(signature[64] == 27 || signature[64] == 28);
}

#[test]
fn test_recovers_wallet_signatures() {
    let key = SigningKey::random(&mut OsRng);
    let wallet = LocalWallet::from_bytes(&key.to_bytes()).unwrap();
    let message = order_message(sepolia_domain());

    let signature = wallet.sign_hash(H256::from(message.digest())).unwrap();
    let recovered = recover_identity(&message, &signature.to_vec()).unwrap();

    assert_eq!(recovered.address(), wallet.address());
}

#[tokio::test]
async fn test_recovers_wallet_personal_message() {
    let wallet = LocalWallet::new(&mut OsRng);
    let body = json!({
        "name": "Desk Lamp",
        "price": "0.25",
        "nonce": "0",
        "signature": "0xdead",
        "publicAddress": "0xbeef",
    });
    let text = canonical_json(&body, &["signature", "publicAddress"]);
    assert_eq!(text, r#"{"name":"Desk Lamp","nonce":"0","price":"0.25"}"#);

    let signature = wallet.sign_message(text.as_bytes()).await.unwrap();
    let claimed = Identity::from(wallet.address());
    let recovered =
        verify_claim(&CanonicalMessage::Json(text), &signature.to_vec(), &claimed).unwrap();

    assert_eq!(recovered, claimed);
}

#[test]
fn test_domain_separation() {
    let key = SigningKey::random(&mut OsRng);
    let signer = Identity::from_verifying_key(key.verifying_key());

    let domain_a = sepolia_domain();
    let other_chain = Eip712Domain::new(1, domain_a.verifying_contract);
    let other_contract = Eip712Domain::new(domain_a.chain_id, Address::repeat_byte(0x22));

    let signature = sign(&order_message(domain_a.clone()), &key).unwrap();
    assert!(verify_claim(&order_message(domain_a), &signature, &signer).is_ok());

    for domain in [other_chain, other_contract] {
        let result = verify_claim(&order_message(domain), &signature, &signer);
        assert!(matches!(result, Err(CryptoError::IdentityMismatch { .. })));
    }
}

#[test]
fn test_record_kinds_do_not_collide() {
    let key = SigningKey::random(&mut OsRng);
    let signer = Identity::from_verifying_key(key.verifying_key());
    let domain = sepolia_domain();
    let data_hash = [9u8; 32];

    let order = CanonicalMessage::Typed(TypedMessage {
        domain: domain.clone(),
        record: TypedRecord::PlaceOrder(PlaceOrderRecord {
            product_id: U256::from(5u64),
            data_hash,
            timestamp: 10,
            nonce: U256::one(),
        }),
    });
    let product = CanonicalMessage::Typed(TypedMessage {
        domain,
        record: TypedRecord::AddProduct(AddProductRecord {
            name: "5".into(),
            price: U256::from(5u64),
            data_hash,
            timestamp: 10,
            nonce: U256::one(),
        }),
    });

    let signature = sign(&order, &key).unwrap();
    assert!(verify_claim(&product, &signature, &signer).is_err());
}

#[test]
fn test_malformed_signatures_rejected() {
    let message = order_message(sepolia_domain());

    assert!(matches!(
        recover_identity(&message, &[0u8; 64]),
        Err(CryptoError::InvalidSignature { .. })
    ));

    let mut bad_v = [1u8; 65];
    bad_v[64] = 5;
    assert!(matches!(
        recover_identity(&message, &bad_v),
        Err(CryptoError::InvalidSignature { .. })
    ));
}
