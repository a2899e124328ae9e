//! End to end relays through the coordinator and the HTTP dispatcher.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use ed25519_dalek::{
    Signature,
    Verifier,
    VerifyingKey,
};
use pocket_relay_client::{
    DEFAULT_STATUS_CODE,
    Ed25519Signer,
    Error,
    Node,
    RelayErrorCode,
    RelayInput,
    RelayOptions,
    RelayRequest,
    Relayer,
    ValidationError,
    proof::{
        generate_signable_bytes,
        hash_request,
    },
};
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::{
    Mock,
    MockServer,
    ResponseTemplate,
    matchers::{
        method,
        path,
    },
};

fn relayer(rpc_url: &str) -> Relayer {
    let signer = Ed25519Signer::from_private_key(common::CLIENT_PRIVATE_KEY).unwrap();
    let dispatcher = common::dispatcher(rpc_url, &[], 1);
    Relayer::new(Arc::new(signer), Arc::new(dispatcher))
}

fn request(service_url: &str) -> RelayRequest {
    RelayRequest {
        blockchain: "0021".to_string(),
        data: common::ETH_BLOCK_NUMBER.to_string(),
        method: "POST".to_string(),
        session: Some(common::session(service_url)),
        aat: Some(common::aat()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_relay_sends_verifiable_proof() {
    common::init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/client/relay"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": r#"{"jsonrpc":"2.0","id":1,"result":"0x10d4f"}"#,
            "signature": "a1b2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = relayer("https://unused.example.com")
        .relay(&request(&server.uri()), &RelayOptions::default())
        .await
        .unwrap();

    assert_eq!(response.output.status_code, 200);
    assert_eq!(response.node.public_key, common::SERVICER_PUB_KEY);

    let received = server.received_requests().await.unwrap();
    let input: RelayInput = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(input.proof, response.proof);
    assert_eq!(input.meta.block_height, 41197);
    assert_eq!(input.proof.aat, common::aat());
    assert_eq!(
        input.proof.request_hash,
        hash_request(&input.payload, &input.meta).unwrap()
    );

    let public_key: [u8; 32] = hex::decode(common::CLIENT_PUB_KEY)
        .unwrap()
        .try_into()
        .unwrap();
    let signature: [u8; 64] = hex::decode(&input.proof.signature)
        .unwrap()
        .try_into()
        .unwrap();
    VerifyingKey::from_bytes(&public_key)
        .unwrap()
        .verify(
            &generate_signable_bytes(&input.proof).unwrap(),
            &Signature::from_bytes(&signature),
        )
        .unwrap();
}

#[tokio::test]
async fn test_relay_error_names_the_servicer() {
    common::init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/client/relay"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 25,
                "codespace": "pocketcore",
                "message": "the payload data of the relay request is empty"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let failure = relayer("https://unused.example.com")
        .relay(&request(&server.uri()), &RelayOptions::default())
        .await
        .unwrap_err();

    assert_eq!(failure.output.status_code, 400);
    assert!(failure.error.is_relay_error_code(RelayErrorCode(25)));
    assert_eq!(
        failure.error.relay_error().unwrap().servicer_pub_key,
        common::SERVICER_PUB_KEY
    );
}

#[tokio::test]
async fn test_rpc_url_option_wins_over_service_url() {
    common::init_tracing();
    let node = MockServer::start().await;
    let gateway = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&node)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/client/relay"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": r#"{"result":"0x1"}"#,
            "signature": ""
        })))
        .expect(1)
        .mount(&gateway)
        .await;

    let options = RelayOptions {
        rpc_url: Some(Url::parse(&gateway.uri()).unwrap()),
    };
    let response = relayer("https://unused.example.com")
        .relay(&request(&node.uri()), &options)
        .await
        .unwrap();

    assert_eq!(response.output.status_code, 200);
}

#[tokio::test]
async fn test_node_without_service_url_uses_rpc_url() {
    common::init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/client/relay"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": r#"{"status_code":404}"#,
            "signature": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = relayer(&server.uri())
        .relay(&request(""), &RelayOptions::default())
        .await
        .unwrap();

    assert_eq!(response.output.status_code, 404);
}

#[tokio::test]
async fn test_foreign_node_never_reaches_network() {
    common::init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = RelayRequest {
        node: Some(Node::with_public_key("33cc")),
        ..request(&server.uri())
    };
    let failure = relayer(&server.uri())
        .relay(&request, &RelayOptions::default())
        .await
        .unwrap_err();

    assert_matches!(
        failure.error,
        Error::Validation(ValidationError::NodeNotInSession { public_key }) if public_key == "33cc"
    );
    assert_eq!(failure.output.status_code, DEFAULT_STATUS_CODE);
}
