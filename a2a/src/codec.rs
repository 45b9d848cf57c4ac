//! Wire codec for [`A2aMessage`].
//!
//! `serde_json`'s derived (de)serialization already gives us "tolerate
//! unknown fields" and "reject envelopes missing source/target/intent" for
//! free (`message.rs` tests cover both). What's left here is the one rule
//! serde can't express: reject a `protocol_version` whose major component
//! doesn't match ours.

use crate::message::{A2aMessage, A2aResponse};
use thiserror::Error;

pub const SUPPORTED_MAJOR_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported protocol version: {0}")]
    VersionMismatch(String),
}

fn major_version(version: &str) -> Option<u32> {
    version.split('.').next()?.parse().ok()
}

fn check_version(version: &str) -> Result<(), CodecError> {
    match major_version(version) {
        Some(major) if major == SUPPORTED_MAJOR_VERSION => Ok(()),
        _ => Err(CodecError::VersionMismatch(version.to_string())),
    }
}

pub fn decode_message(bytes: &[u8]) -> Result<A2aMessage, CodecError> {
    let msg: A2aMessage = serde_json::from_slice(bytes)?;
    check_version(&msg.protocol_version)?;
    Ok(msg)
}

pub fn encode_message(message: &A2aMessage) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode_response(bytes: &[u8]) -> Result<A2aResponse, CodecError> {
    let resp: A2aResponse = serde_json::from_slice(bytes)?;
    check_version(&resp.protocol_version)?;
    Ok(resp)
}

pub fn encode_response(response: &A2aResponse) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(response)?)
}
