// this_file: backends/ttb-core/src/utils.rs

//! Utility functions for host implementations.

use crate::types::Digest;
use sha2::{Digest as _, Sha256};
use std::io::{self, Read};
use std::time::{SystemTime, UNIX_EPOCH};

/// SHA-256 of an in-memory buffer.
pub fn sha256_digest(data: &[u8]) -> Digest {
    Digest::from_bytes(Sha256::digest(data).to_vec())
}

/// SHA-256 of everything `reader` yields.
pub fn sha256_reader<R: Read>(mut reader: R) -> io::Result<Digest> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buf[..n]);
    }
    Ok(Digest::from_bytes(hasher.finalize().to_vec()))
}

/// Seconds since the Unix epoch, negative for earlier times.
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    }
}
