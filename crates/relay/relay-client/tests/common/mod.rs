#![allow(dead_code)]

use std::time::Duration;

use pocket_relay_client::{
    Aat,
    Dispatcher,
    DispatcherConfig,
    Node,
    RetryPolicy,
    Session,
    SessionHeader,
};

pub const CLIENT_PRIVATE_KEY: &str = "1f8cbde30ef5a9db0a5a9d5eb40536fc9defc318b8581d543808b7504e0902bcb243b27bc9fbe5580457a46370ae5f03a6f6753633e51efdaf2cf534fdc26cc3";
pub const CLIENT_PUB_KEY: &str = "b243b27bc9fbe5580457a46370ae5f03a6f6753633e51efdaf2cf534fdc26cc3";
pub const APP_PUB_KEY: &str = "a7e8ff2e9b7b6ba1d6b7bd2d1fbbe0bb2ca7e6d3d09a3b0e2f0a1b8c0d9e2f31";
pub const SERVICER_PUB_KEY: &str =
    "11aa22bb33cc44dd55ee66ff77889900aabbccddeeff00112233445566778899";

pub const ETH_BLOCK_NUMBER: &str = r#"{"jsonrpc":"2.0","method":"eth_blockNumber","params":[],"id":1}"#;

/// Set `TEST_TRACE` to a level to see the engine's tracing output.
pub fn init_tracing() {
    let Ok(value) = std::env::var("TEST_TRACE") else {
        return;
    };
    let level = match value.as_str() {
        "true" | "debug" | "on" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => return,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .try_init();
}

/// Quick retries so failing paths finish fast.
pub fn fast_policy(retries: u32) -> RetryPolicy {
    RetryPolicy {
        retries,
        timeout: Duration::from_secs(2),
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
        backoff_factor: 2,
        max_jitter: Duration::ZERO,
        max_body_size: 64 * 1024,
    }
}

pub fn dispatcher(rpc_url: &str, dispatchers: &[&str], retries: u32) -> Dispatcher {
    let config = DispatcherConfig::new(rpc_url)
        .unwrap()
        .with_dispatchers(dispatchers)
        .unwrap()
        .with_retry(fast_policy(retries));
    Dispatcher::new(config).unwrap()
}

pub fn aat() -> Aat {
    Aat {
        version: "0.0.1".to_string(),
        app_pub_key: APP_PUB_KEY.to_string(),
        client_pub_key: CLIENT_PUB_KEY.to_string(),
        signature: "5e9a".to_string(),
    }
}

/// Single-node session whose node is served at `service_url`.
pub fn session(service_url: &str) -> Session {
    Session {
        header: Some(SessionHeader {
            app_public_key: APP_PUB_KEY.to_string(),
            chain: "0021".to_string(),
            session_height: 41197,
        }),
        key: "f9a3a1ac3c9c5a4e3c0d1f2e5b6a7c8d".to_string(),
        nodes: vec![Node {
            address: "0b3e1a3f2b5c4d6e7f8091a2b3c4d5e6f7081920".to_string(),
            chains: vec!["0021".to_string()],
            public_key: SERVICER_PUB_KEY.to_string(),
            service_url: service_url.to_string(),
            status: 2,
            tokens: "15000000000".to_string(),
            ..Default::default()
        }],
    }
}

/// Port on localhost with nothing listening.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
