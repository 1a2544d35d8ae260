//! Canonical CBOR encoding of certificate messages.
//!
//! RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats
//!
//! A certificate signs these bytes, so the same operation must encode
//! identically everywhere.

use ciborium::value::Value;

use crate::certificate::{Operation, PublicEffect};
use crate::crypto::Principal;
use crate::error::CoreError;

/// Domain separator prepended to every signed certificate message.
pub const CERT_DOMAIN: &[u8] = b"attestvault/certificate/v1";

/// Current message layout version.
pub const MESSAGE_VERSION: u64 = 1;

/// Integer map keys. Keys 0-23 encode as single bytes.
mod keys {
    pub const VERSION: u64 = 0;
    pub const SIGNER: u64 = 1;
    pub const OPERATION: u64 = 2;
    pub const EFFECT: u64 = 3;
    pub const TRANSACTION_NONCE: u64 = 4;

    pub const TAG: u64 = 0;
    pub const ARTIFACT: u64 = 1;
    pub const QUALITY: u64 = 2;
    pub const METHODOLOGY: u64 = 3;
    pub const KEY_ID: u64 = 4;
    pub const VALUE: u64 = 5;
    pub const LABEL: u64 = 6;
    pub const GRANTEE: u64 = 7;
    pub const OWNER: u64 = 8;
    pub const NONCE: u64 = 9;
}

/// The bytes a certificate signature covers: `CERT_DOMAIN || cbor(message)`.
pub fn signed_message(
    signer: &Principal,
    nonce: u64,
    operation: &Operation,
    effect: &PublicEffect,
) -> Result<Vec<u8>, CoreError> {
    let body = canonical_message_bytes(signer, nonce, operation, effect)?;
    let mut msg = Vec::with_capacity(CERT_DOMAIN.len() + body.len());
    msg.extend_from_slice(CERT_DOMAIN);
    msg.extend_from_slice(&body);
    Ok(msg)
}

/// Canonical CBOR of (signer, nonce, operation, effect) without the domain
/// prefix.
pub fn canonical_message_bytes(
    signer: &Principal,
    nonce: u64,
    operation: &Operation,
    effect: &PublicEffect,
) -> Result<Vec<u8>, CoreError> {
    let value = Value::Map(vec![
        entry(keys::VERSION, Value::Integer(MESSAGE_VERSION.into())),
        entry(keys::SIGNER, Value::Bytes(signer.0.to_vec())),
        entry(keys::OPERATION, operation_to_value(operation)),
        entry(keys::EFFECT, effect_to_value(effect)),
        entry(keys::TRANSACTION_NONCE, uint(nonce)),
    ]);
    encode_canonical(&value)
}

/// Canonical CBOR of an operation alone.
pub fn canonical_operation_bytes(operation: &Operation) -> Result<Vec<u8>, CoreError> {
    encode_canonical(&operation_to_value(operation))
}

fn entry(key: u64, value: Value) -> (Value, Value) {
    (Value::Integer(key.into()), value)
}

fn uint(n: u64) -> Value {
    Value::Integer(n.into())
}

fn operation_to_value(operation: &Operation) -> Value {
    let mut entries = vec![entry(keys::TAG, uint(operation.tag().into()))];

    match operation {
        Operation::Attest {
            artifact,
            quality,
            methodology,
        } => {
            entries.push(entry(keys::ARTIFACT, Value::Bytes(artifact.0.to_vec())));
            entries.push(entry(keys::QUALITY, uint(*quality)));
            entries.push(entry(keys::METHODOLOGY, uint((*methodology).into())));
        }
        Operation::Revoke { artifact } => {
            entries.push(entry(keys::ARTIFACT, Value::Bytes(artifact.0.to_vec())));
        }
        Operation::StoreCredential {
            key_id,
            value,
            label,
        }
        | Operation::RotateCredential {
            key_id,
            value,
            label,
        } => {
            entries.push(entry(keys::KEY_ID, Value::Bytes(key_id.0.to_vec())));
            entries.push(entry(keys::VALUE, Value::Text(value.clone())));
            entries.push(entry(keys::LABEL, Value::Text(label.clone())));
        }
        Operation::DeleteCredential { key_id } => {
            entries.push(entry(keys::KEY_ID, Value::Bytes(key_id.0.to_vec())));
        }
        Operation::Grant {
            grantee,
            key_id,
            nonce,
        } => {
            entries.push(entry(keys::GRANTEE, Value::Bytes(grantee.0.to_vec())));
            entries.push(entry(keys::KEY_ID, Value::Bytes(key_id.0.to_vec())));
            entries.push(entry(keys::NONCE, uint(*nonce)));
        }
        Operation::ReadViaDelegation {
            owner,
            key_id,
            nonce,
        } => {
            entries.push(entry(keys::OWNER, Value::Bytes(owner.0.to_vec())));
            entries.push(entry(keys::KEY_ID, Value::Bytes(key_id.0.to_vec())));
            entries.push(entry(keys::NONCE, uint(*nonce)));
        }
    }

    Value::Map(entries)
}

fn effect_to_value(effect: &PublicEffect) -> Value {
    let mut entries = vec![entry(keys::TAG, uint(effect.tag().into()))];

    match effect {
        PublicEffect::None => {}
        PublicEffect::Increment { artifact, quality }
        | PublicEffect::Decrement { artifact, quality } => {
            entries.push(entry(keys::ARTIFACT, Value::Bytes(artifact.0.to_vec())));
            entries.push(entry(keys::QUALITY, uint(*quality)));
        }
    }

    Value::Map(entries)
}

/// Encode a CBOR value to canonical bytes.
pub fn encode_canonical(value: &Value) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr)?,
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => return Err(CoreError::EncodingError("unsupported CBOR value type".into())),
    }
    Ok(())
}

/// Major types 0 and 1.
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned argument with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) -> Result<(), CoreError> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item)?;
    }
    Ok(())
}

/// Keys are sorted by their encoded bytes.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), CoreError> {
    let mut pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}
