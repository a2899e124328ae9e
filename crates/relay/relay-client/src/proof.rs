//! Relay proof construction.
//!
//! A servicer re-derives every hash below from the relay it receives, so the
//! record layouts and their field order are part of the network contract.

use pocket_relay_core::{
    Aat,
    RelayMeta,
    RelayPayload,
    RelayProof,
};
use rand::Rng;
use serde::Serialize;
use sha3::{
    Digest,
    Sha3_256,
};

use crate::{
    canonical::to_canonical_vec,
    error::Result,
    signer::Signer,
};

#[derive(Serialize)]
struct AatRecord<'a> {
    version: &'a str,
    app_pub_key: &'a str,
    client_pub_key: &'a str,
    signature: &'a str,
}

#[derive(Serialize)]
struct RequestRecord<'a> {
    payload: &'a RelayPayload,
    meta: &'a RelayMeta,
}

#[derive(Serialize)]
struct SignableRecord<'a> {
    entropy: i64,
    session_block_height: u64,
    servicer_pub_key: &'a str,
    blockchain: &'a str,
    signature: &'a str,
    token: String,
    request_hash: &'a str,
}

fn sha3_256(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha3_256::digest(bytes));
    out
}

/// Hex SHA3-256 of the token with its signature cleared.
pub fn hash_aat(aat: &Aat) -> Result<String> {
    let record = AatRecord {
        version: &aat.version,
        app_pub_key: &aat.app_pub_key,
        client_pub_key: &aat.client_pub_key,
        signature: "",
    };
    Ok(hex::encode(sha3_256(&to_canonical_vec(&record)?)))
}

/// Hex SHA3-256 of the `{payload, meta}` pair.
pub fn hash_request(payload: &RelayPayload, meta: &RelayMeta) -> Result<String> {
    let record = RequestRecord { payload, meta };
    Ok(hex::encode(sha3_256(&to_canonical_vec(&record)?)))
}

/// Digest the proof signature is computed over.
///
/// The proof's own `signature` is replaced by an empty placeholder, so
/// signing never feeds back into its input.
pub fn generate_signable_bytes(proof: &RelayProof) -> Result<Vec<u8>> {
    let record = SignableRecord {
        entropy: proof.entropy,
        session_block_height: proof.session_block_height,
        servicer_pub_key: &proof.servicer_pub_key,
        blockchain: &proof.blockchain,
        signature: "",
        token: hash_aat(&proof.aat)?,
        request_hash: &proof.request_hash,
    };
    Ok(sha3_256(&to_canonical_vec(&record)?).to_vec())
}

/// Signs the signable bytes with `signer`, returning the hex signature.
pub fn sign(signer: &dyn Signer, signable: &[u8]) -> Result<String> {
    Ok(signer.sign(signable)?)
}

/// Non-negative random nonce making each proof unique.
pub fn random_entropy() -> i64 {
    rand::rng().random_range(0..i64::MAX)
}

/// What a proof commits to, besides its entropy.
#[derive(Debug, Clone, Copy)]
pub struct ProofContext<'a> {
    pub payload: &'a RelayPayload,
    pub meta: &'a RelayMeta,
    pub aat: &'a Aat,
    pub servicer_pub_key: &'a str,
    pub blockchain: &'a str,
}

/// Builds and signs a fresh proof with random entropy.
pub fn build_proof(signer: &dyn Signer, context: ProofContext<'_>) -> Result<RelayProof> {
    build_proof_with_entropy(signer, context, random_entropy())
}

pub(crate) fn build_proof_with_entropy(
    signer: &dyn Signer,
    context: ProofContext<'_>,
    entropy: i64,
) -> Result<RelayProof> {
    let mut proof = RelayProof {
        request_hash: hash_request(context.payload, context.meta)?,
        entropy,
        session_block_height: context.meta.block_height,
        servicer_pub_key: context.servicer_pub_key.to_string(),
        blockchain: context.blockchain.to_string(),
        aat: context.aat.clone(),
        signature: String::new(),
    };
    let signable = generate_signable_bytes(&proof)?;
    proof.signature = sign(signer, &signable)?;

    Ok(proof)
}
