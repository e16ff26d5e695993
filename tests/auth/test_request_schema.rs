// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Per-route schema checks that run before any cryptography

use ecommerce_privacy_node::auth::{AuthError, ProtectedRequest, RequestDetails, RequestKind};
use ecommerce_privacy_node::client::RequestSealer;
use ecommerce_privacy_node::crypto::{Eip712Domain, PayloadEncoding, ServiceKey};
use ethers::types::{Address, U256};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use serde_json::{json, Value};

fn sealer() -> RequestSealer {
    RequestSealer::new(
        SigningKey::random(&mut OsRng),
        ServiceKey::generate().public_key_uncompressed().to_vec(),
        Eip712Domain::new(31337, Address::repeat_byte(0x5f)),
    )
}

fn sealed(kind: RequestKind) -> Value {
    let sealer = sealer();
    match kind {
        RequestKind::PlaceOrder => sealer
            .seal_order(U256::from(3u64), b"{}", 1_700_000_000, U256::zero())
            .unwrap(),
        RequestKind::AddProduct => sealer
            .seal_product("Desk Lamp", "0.25", b"brass", 1_700_000_000, U256::zero())
            .unwrap(),
    }
}

#[test]
fn test_every_required_field_is_checked() {
    for kind in [RequestKind::PlaceOrder, RequestKind::AddProduct] {
        for field in kind.required_fields() {
            for blank in [None, Some(Value::Null), Some(json!("")), Some(json!("   "))] {
                let mut body = sealed(kind);
                match &blank {
                    None => {
                        body.as_object_mut().unwrap().remove(*field);
                    }
                    Some(value) => body[*field] = value.clone(),
                }

                match ProtectedRequest::from_json(kind, &body) {
                    Err(AuthError::MissingParameter { field: missing }) => {
                        assert_eq!(&missing, field)
                    }
                    other => panic!("{} without {}: {:?}", kind.as_str(), field, other),
                }
            }
        }
    }
}

#[test]
fn test_nonce_zero_is_present() {
    let request = ProtectedRequest::from_json(RequestKind::PlaceOrder, &sealed(RequestKind::PlaceOrder))
        .unwrap();
    assert_eq!(request.nonce, U256::zero());
}

#[test]
fn test_order_field_from_product_route_is_rejected() {
    // A placeOrder body is missing addProduct's fields
    let body = sealed(RequestKind::PlaceOrder);
    assert!(matches!(
        ProtectedRequest::from_json(RequestKind::AddProduct, &body),
        Err(AuthError::MissingParameter { .. })
    ));
}

#[test]
fn test_price_is_parsed_as_ether() {
    let request =
        ProtectedRequest::from_json(RequestKind::AddProduct, &sealed(RequestKind::AddProduct))
            .unwrap();
    match request.details {
        RequestDetails::Product { name, price } => {
            assert_eq!(name, "Desk Lamp");
            assert_eq!(price, U256::from(250_000_000_000_000_000u64));
        }
        other => panic!("unexpected details {:?}", other),
    }
}

#[test]
fn test_malformed_encodings_are_named() {
    let cases = [
        ("iv", json!("not-hex")),
        ("encryptedKey", json!("0xzz")),
        ("signature", json!("0x12345")),
        ("publicAddress", json!("0x1234")),
        ("productId", json!("-4")),
        ("encoding", json!("utf8")),
        ("encryptedData", json!("xyz")),
    ];

    for (field, value) in cases {
        let mut body = sealed(RequestKind::PlaceOrder);
        body[field] = value;
        match ProtectedRequest::from_json(RequestKind::PlaceOrder, &body) {
            Err(AuthError::MalformedEncoding { field: named, .. }) => assert_eq!(named, field),
            other => panic!("{}: expected MalformedEncoding, got {:?}", field, other),
        }
    }
}

#[test]
fn test_product_ciphertext_errors_use_product_field_name() {
    let mut body = sealed(RequestKind::AddProduct);
    body["encryptedDetails"] = json!("not hex at all");

    match ProtectedRequest::from_json(RequestKind::AddProduct, &body) {
        Err(AuthError::MalformedEncoding { field, .. }) => assert_eq!(field, "encryptedDetails"),
        other => panic!("expected MalformedEncoding, got {:?}", other),
    }
}

#[test]
fn test_base64_payload_accepted() {
    let body = sealer()
        .with_encoding(PayloadEncoding::Base64)
        .seal_order(U256::one(), b"{}", 1_700_000_000, U256::zero())
        .unwrap();

    let request = ProtectedRequest::from_json(RequestKind::PlaceOrder, &body).unwrap();
    assert_eq!(request.encoding, PayloadEncoding::Base64);
}

#[test]
fn test_negative_price_rejected() {
    let mut body = sealed(RequestKind::AddProduct);
    body["price"] = json!("-1");
    assert!(matches!(
        ProtectedRequest::from_json(RequestKind::AddProduct, &body),
        Err(AuthError::MalformedEncoding { .. })
    ));
}
