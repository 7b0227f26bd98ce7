// src/hash.rs

//! Bundle checksum verification
//!
//! The control side ships an expected digest alongside the thin bundle;
//! this module recomputes it on the target and decides whether the
//! cached bundle is still the one the caller thinks it deployed.
//!
//! Files are streamed in fixed-size chunks rather than read whole — the
//! bundle can be tens of megabytes and the target host is frequently a
//! small appliance.

use md5::Md5;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::error::Result;

/// Default streaming chunk size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Digest algorithm the control side keyed the expected checksum with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    /// SHA-256, the default on current control sides
    #[default]
    Sha256,
    /// SHA-512
    Sha512,
    /// MD5, still emitted by legacy control-side configurations
    Md5,
}

impl HashAlgorithm {
    /// Get the algorithm name as a string
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Md5 => "md5",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Unknown algorithm name in the rendered configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown hash algorithm: {0}")]
pub struct UnknownAlgorithm(String);

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            "md5" => Ok(Self::Md5),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

enum HasherState {
    Sha256(Sha256),
    Sha512(Sha512),
    Md5(Md5),
}

/// Incremental hasher over any supported algorithm
pub struct Hasher {
    state: HasherState,
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => HasherState::Sha512(Sha512::new()),
            HashAlgorithm::Md5 => HasherState::Md5(Md5::new()),
        };
        Self { state }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Sha256(h) => h.update(data),
            HasherState::Sha512(h) => h.update(data),
            HasherState::Md5(h) => h.update(data),
        }
    }

    /// Finalize and return the digest as a lowercase hex string
    pub fn finalize(self) -> String {
        match self.state {
            HasherState::Sha256(h) => format!("{:x}", h.finalize()),
            HasherState::Sha512(h) => format!("{:x}", h.finalize()),
            HasherState::Md5(h) => format!("{:x}", h.finalize()),
        }
    }
}

/// Compute the digest of a file, streaming it in `chunk_size` reads
pub fn digest_file(path: &Path, algorithm: HashAlgorithm, chunk_size: usize) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; chunk_size];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

/// Is the file at `path` still the payload `expected` describes?
///
/// An absent file is always stale. Comparison is case-insensitive on
/// the hex digits.
pub fn is_fresh(path: &Path, expected: &str, algorithm: HashAlgorithm) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let actual = digest_file(path, algorithm, DEFAULT_CHUNK_SIZE)?;
    Ok(actual == expected.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_sha256_known_value() {
        let file = write_temp(b"hello world");
        let digest = digest_file(file.path(), HashAlgorithm::Sha256, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(
            digest,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_md5_known_value() {
        let file = write_temp(b"hello world");
        let digest = digest_file(file.path(), HashAlgorithm::Md5, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(digest, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn test_small_chunks_match_whole_file() {
        let file = write_temp(&[0xabu8; 10_000]);
        let small = digest_file(file.path(), HashAlgorithm::Sha256, 7).unwrap();
        let large = digest_file(file.path(), HashAlgorithm::Sha256, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(small, large);
    }

    #[test]
    fn test_absent_file_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-bundle.tgz");
        assert!(!is_fresh(&missing, "anything", HashAlgorithm::Sha256).unwrap());
    }

    #[test]
    fn test_freshness_is_case_insensitive() {
        let file = write_temp(b"hello world");
        let upper = "B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9";
        assert!(is_fresh(file.path(), upper, HashAlgorithm::Sha256).unwrap());
    }

    #[test]
    fn test_mismatch_is_stale() {
        let file = write_temp(b"hello world");
        let wrong = "0000000000000000000000000000000000000000000000000000000000000000";
        assert!(!is_fresh(file.path(), wrong, HashAlgorithm::Sha256).unwrap());
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
        assert_eq!("md5".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert!("crc32".parse::<HashAlgorithm>().is_err());
    }
}
