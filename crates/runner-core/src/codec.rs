//! Codec — compress/decompress partial accumulators (spec §4.1).
//!
//! Serialization is `bincode`, which is compact but not self-describing
//! on its own, so every blob we hand back to a caller is prefixed with a
//! one-byte tag: `RAW_TAG` for a pass-through (uncompressed) blob,
//! `LZ4_TAG` for an LZ4-framed one. `decompress` treats anything without
//! a recognized tag as already-raw bytes, so raw and compressed blobs can
//! be mixed in the same stream during a partial migration.

use std::io::{Read, Write};

use crate::accumulator::Accumulator;

const RAW_TAG: u8 = 0x00;
const LZ4_TAG: u8 = 0xC0;

/// Compress an already-serialized blob. `level = None` passes the bytes
/// through unchanged (still tagged, so `decompress` round-trips it).
pub fn compress(blob: &[u8], level: Option<u32>) -> Vec<u8> {
    match level {
        None => {
            let mut out = Vec::with_capacity(blob.len() + 1);
            out.push(RAW_TAG);
            out.extend_from_slice(blob);
            out
        }
        Some(level) => {
            let mut out = vec![LZ4_TAG];
            let mut encoder = lz4::EncoderBuilder::new()
                .level(level)
                .build(&mut out)
                .expect("lz4 encoder construction is infallible for in-memory sinks");
            encoder
                .write_all(blob)
                .expect("writing to an in-memory Vec cannot fail");
            let (_, result) = encoder.finish();
            result.expect("lz4 frame finalization is infallible for in-memory sinks");
            out
        }
    }
}

/// Decompress a blob produced by `compress`. A no-op on bytes that don't
/// carry a recognized tag (spec §4.1).
pub fn decompress(bytes: &[u8]) -> Vec<u8> {
    match bytes.split_first() {
        Some((&RAW_TAG, rest)) => rest.to_vec(),
        Some((&LZ4_TAG, rest)) => {
            let mut decoder = match lz4::Decoder::new(rest) {
                Ok(d) => d,
                Err(_) => return bytes.to_vec(),
            };
            let mut out = Vec::new();
            match decoder.read_to_end(&mut out) {
                Ok(_) => out,
                Err(_) => bytes.to_vec(),
            }
        }
        _ => bytes.to_vec(),
    }
}

/// Serialize an accumulator to bytes, no compression tag applied.
pub fn encode<A: Accumulator>(value: &A) -> Vec<u8> {
    bincode::serialize(value).expect("accumulator serialization should not fail")
}

/// Deserialize an accumulator from bytes produced by `encode`.
pub fn decode<A: Accumulator>(bytes: &[u8]) -> A {
    bincode::deserialize(bytes).expect("accumulator deserialization should not fail")
}

/// Serialize then compress in one step — the form executors ship over the wire.
pub fn encode_compressed<A: Accumulator>(value: &A, level: Option<u32>) -> Vec<u8> {
    compress(&encode(value), level)
}

/// Decompress then deserialize — the inverse of `encode_compressed`.
pub fn decode_compressed<A: Accumulator>(bytes: &[u8]) -> A {
    decode(&decompress(bytes))
}

/// The reducer executors hand to a backend: merge two wire-format
/// accumulators without the caller ever holding a decoded `A` (spec
/// §4.5 "`function` may be wrapped by the Codec").
pub fn merge_compressed<A: Accumulator>(a: &[u8], b: &[u8], level: Option<u32>) -> Vec<u8> {
    let merged = decode_compressed::<A>(a).merge(decode_compressed::<A>(b));
    encode_compressed(&merged, level)
}
