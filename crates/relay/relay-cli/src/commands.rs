use std::sync::Arc;

use color_eyre::{
    Result,
    eyre::WrapErr,
};
use pocket_relay_client::{
    Aat,
    Dispatcher,
    Ed25519Signer,
    Node,
    RelayOptions,
    RelayOutput,
    RelayRequest,
    Relayer,
    RelayerConfig,
};
use serde_json::{
    Value,
    json,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{
    DispatchArgs,
    GlobalArgs,
    RelayArgs,
    SignArgs,
};

pub async fn dispatch(global: &GlobalArgs, args: &DispatchArgs) -> Result<Value> {
    let dispatcher = Dispatcher::new(global.dispatcher_config()?)?;
    let response = dispatcher
        .dispatch_session(&args.app_pub_key, &args.chain, args.session_height)
        .await?;
    info!(
        block_height = response.block_height,
        nodes = response.session.nodes.len(),
        "session dispatched"
    );
    Ok(serde_json::to_value(&response)?)
}

pub async fn relay(
    global: &GlobalArgs,
    args: &RelayArgs,
    cancel: &CancellationToken,
) -> Result<Value> {
    let signer = global.signer()?;
    let aat = read_aat(args)?;
    let dispatcher = Arc::new(Dispatcher::new(global.dispatcher_config()?)?);

    let session = dispatcher
        .dispatch_session(&args.app_pub_key, &args.chain, args.session_height)
        .await
        .wrap_err("failed to dispatch a session")?
        .session;
    info!(nodes = session.nodes.len(), "session dispatched");

    let request = RelayRequest {
        blockchain: args.chain.clone(),
        data: args.data.clone(),
        method: args.method.clone(),
        path: args.path.clone(),
        headers: args.headers.iter().cloned().collect(),
        node: args.node_pub_key.as_deref().map(Node::with_public_key),
        session: Some(session),
        aat: Some(aat),
    };
    let relayer = Relayer::new(Arc::new(signer), dispatcher).with_config(RelayerConfig {
        require_session_header: !args.allow_missing_header,
    });

    match relayer
        .relay_with_cancel(&request, &RelayOptions::default(), cancel)
        .await
    {
        Ok(response) => {
            Ok(json!({
                "servicer": response.node.public_key,
                "output": output_json(&response.output),
                "proof": response.proof,
            }))
        }
        Err(failure) => {
            println!("{}", output_json(&failure.output));
            Err(failure.into())
        }
    }
}

pub fn sign(global: &GlobalArgs, args: &SignArgs) -> Result<Value> {
    let signer = global.signer()?;
    sign_with(&signer, &args.payload)
}

pub fn address(global: &GlobalArgs) -> Result<Value> {
    Ok(key_json(&global.signer()?))
}

fn sign_with(signer: &Ed25519Signer, payload: &str) -> Result<Value> {
    let payload = hex::decode(payload).wrap_err("payload must be hex encoded")?;
    Ok(json!({
        "public_key": signer.public_key(),
        "signature": hex::encode(signer.sign_bytes(&payload)),
    }))
}

fn key_json(signer: &Ed25519Signer) -> Value {
    json!({
        "address": signer.address(),
        "public_key": signer.public_key(),
    })
}

/// The status code is not part of the wire form, so it is added here.
fn output_json(output: &RelayOutput) -> Value {
    json!({
        "status_code": output.status_code,
        "response": output.response,
        "signature": output.signature,
    })
}

fn read_aat(args: &RelayArgs) -> Result<Aat> {
    let raw = std::fs::read(&args.aat_file)
        .wrap_err_with(|| format!("failed to read {}", args.aat_file.display()))?;
    serde_json::from_slice(&raw)
        .wrap_err_with(|| format!("{} is not a valid AAT", args.aat_file.display()))
}
