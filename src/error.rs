// src/error.rs

//! Crate-wide error type and the exit-code contract
//!
//! The control side parses this program's exit code, so the numeric
//! values below are part of the wire protocol and must never change:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 10   | no compatible runtime interpreter found |
//! | 11   | thin bundle deploy needed |
//! | 13   | extension-modules deploy needed |
//! | 14   | required transfer tool (scp) not found |
//! | 73   | cannot create target path |
//!
//! Codes 10, 14, and 73 are terminal for the caller; 11 and 13 make it
//! redeploy and re-invoke. Everything else maps to the generic failure
//! code 1.

use std::path::PathBuf;
use thiserror::Error;

/// No compatible runtime interpreter found among the candidates.
pub const EX_INTERPRETER_INVALID: i32 = 10;
/// Thin bundle must be (re)deployed by the control side.
pub const EX_THIN_DEPLOY: i32 = 11;
/// Extension-modules bundle must be (re)deployed by the control side.
pub const EX_MOD_DEPLOY: i32 = 13;
/// The transfer tool the control side relies on is not installed.
pub const EX_SCP_NOT_FOUND: i32 = 14;
/// Target path exists but is not a directory, or cannot be created.
pub const EX_CANTCREAT: i32 = 73;
/// Generic failure for everything outside the reserved codes.
pub const EX_GENERIC: i32 = 1;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("required transfer tool not found: {0}")]
    ScpNotFound(&'static str),

    #[error("target path {} exists but is not a directory", .0.display())]
    TargetNotDirectory(PathBuf),

    #[error("cannot create {}: {source}", .path.display())]
    CantCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "ownership or mode check kept failing on freshly created {} after {attempts} attempts",
        .path.display()
    )]
    ProvisioningSecurity { path: PathBuf, attempts: u32 },

    #[error(
        "unable to set group permissions on {}: {reason}; if sudo_user is set and is not root, \
         be certain the user is in the same group as the login user",
        .path.display()
    )]
    ElevationGroup { path: PathBuf, reason: String },

    #[error("no interpreter compatible with the deployed bundle was found")]
    NoInterpreter,

    #[error("malformed {file} entry: {line:?}")]
    Manifest { file: &'static str, line: String },
}

impl Error {
    /// Map this error onto the exit-code taxonomy the control side parses.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ScpNotFound(_) => EX_SCP_NOT_FOUND,
            Self::TargetNotDirectory(_) | Self::CantCreate { .. } => EX_CANTCREAT,
            Self::NoInterpreter => EX_INTERPRETER_INVALID,
            _ => EX_GENERIC,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
