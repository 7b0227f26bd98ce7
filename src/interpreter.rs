// src/interpreter.rs

//! Runtime interpreter resolution
//!
//! The deployed bundle ships one payload variant per interpreter
//! namespace, and the manifest records the minimum (major, minor)
//! version each variant needs. Candidates are probed in a fixed
//! preference order — the currently running executable first, then the
//! usual interpreter names in descending order of likelihood — and the
//! first candidate that satisfies any manifest entry whose namespace
//! directory actually exists in the bundle wins.
//!
//! A candidate that cannot be spawned, hangs past the probe timeout, or
//! prints something unparsable is skipped, never fatal; only exhausting
//! every candidate is.

use std::env;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, info};
use wait_timeout::ChildExt;

use crate::encoding;
use crate::error::{Error, Result};
use crate::manifest::InterpreterManifest;

/// Named fallbacks tried after the currently running executable
pub const FALLBACK_INTERPRETERS: [&str; 7] = [
    "python3",
    "python27",
    "python2.7",
    "python26",
    "python2.6",
    "python2",
    "python",
];

/// One-liner a candidate runs to report its own version as `major:minor`
const VERSION_PROBE: &str =
    r#"import sys; sys.stdout.write("%s:%s" % (sys.version_info[0], sys.version_info[1]))"#;

/// Upper bound on a single version probe; a wedged candidate must not
/// hang the whole bootstrap
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Selects a compatible runtime executable among candidates
pub struct InterpreterResolver {
    candidates: Vec<String>,
    probe_timeout: Duration,
}

impl InterpreterResolver {
    /// Resolver with the standard candidate order
    pub fn new() -> Self {
        let mut candidates = Vec::with_capacity(FALLBACK_INTERPRETERS.len() + 1);
        if let Ok(exe) = env::current_exe() {
            candidates.push(exe.to_string_lossy().into_owned());
        }
        candidates.extend(FALLBACK_INTERPRETERS.iter().map(|s| (*s).to_string()));
        Self {
            candidates,
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    /// Resolver over an explicit candidate list
    pub fn with_candidates(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    /// Ask a candidate for its version; `None` skips the candidate
    fn probe(&self, candidate: &str) -> Option<(u32, u32)> {
        let mut child = Command::new(candidate)
            .args(["-c", VERSION_PROBE])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .ok()?;

        match child.wait_timeout(self.probe_timeout) {
            Ok(Some(_)) => {}
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
        }

        let output = child.wait_with_output().ok()?;
        let decoded = encoding::decode_output(&output.stdout);
        parse_probe_output(decoded.trim())
    }

    /// Select the first (candidate, namespace) pair where the candidate's
    /// major version matches exactly, its (major, minor) meets the
    /// manifest minimum, and the namespace subdirectory exists in `dest`.
    pub fn resolve(&self, manifest: &InterpreterManifest, dest: &Path) -> Result<String> {
        for candidate in &self.candidates {
            let Some((major, minor)) = self.probe(candidate) else {
                debug!(%candidate, "interpreter probe failed, skipping");
                continue;
            };
            debug!(%candidate, major, minor, "probed interpreter version");

            for entry in manifest.entries() {
                if major == entry.major
                    && (major, minor) >= (entry.major, entry.minor)
                    && dest.join(&entry.namespace).exists()
                {
                    info!(%candidate, namespace = %entry.namespace, "selected interpreter");
                    return Ok(candidate.clone());
                }
            }
        }
        Err(Error::NoInterpreter)
    }
}

impl Default for InterpreterResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_probe_output(s: &str) -> Option<(u32, u32)> {
    let (major, minor) = s.split_once(':')?;
    Some((major.trim().parse().ok()?, minor.trim().parse().ok()?))
}
