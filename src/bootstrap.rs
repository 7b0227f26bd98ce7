// src/bootstrap.rs

//! End-to-end bootstrap decision flow
//!
//! One invocation walks a fixed sequence of freshness gates and either
//! asks the caller to (re)deploy, or runs the payload:
//!
//! ```text
//! CheckBundle → VerifyChecksum → {NeedsDeploy | Unpack}
//!            → VerifyCodeMarker → {NeedsDeploy | CheckExtMods}
//!            → {NeedsExtMods | ResolveInterpreter}
//!            → Execute → exit-code passthrough
//! ```
//!
//! Every needs-deploy outcome primes the cache directory first (wipe,
//! recreate, validate) so the caller can transfer bundles into a
//! freshly provisioned directory without another round trip.
//!
//! Invocations against the same cache directory must be serialized by
//! the caller; nothing here takes a lock.

use std::fs;
use std::io::Write;
use tracing::{debug, error, warn};

use crate::archive;
use crate::config::{Config, TRANSFER_TOOL};
use crate::error::{Error, Result};
use crate::exec::Executor;
use crate::hash;
use crate::interpreter::InterpreterResolver;
use crate::manifest::{self, InterpreterManifest};
use crate::provision::DirectoryProvisioner;
use crate::signal::ProtocolSignaler;

/// Terminal result of one bootstrap pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Thin bundle must be (re)deployed; the directory is primed
    NeedsDeploy,
    /// Extension modules must be deployed
    NeedsExtMods,
    /// Payload ran; carry its exit code through
    Completed(i32),
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NeedsDeploy => crate::error::EX_THIN_DEPLOY,
            Self::NeedsExtMods => crate::error::EX_MOD_DEPLOY,
            Self::Completed(code) => *code,
        }
    }
}

fn needs_deploy<W: Write>(
    provisioner: &DirectoryProvisioner,
    signaler: &ProtocolSignaler<'_>,
    primary: &mut W,
) -> Result<Outcome> {
    provisioner.ensure()?;
    signaler.needs_deploy(primary)?;
    Ok(Outcome::NeedsDeploy)
}

/// Run the full decision flow for one invocation.
///
/// `primary`/`secondary` are the protocol output streams (stdout and
/// stderr in production); diagnostics go through `tracing` instead so
/// they never collide with the framing.
pub fn run<O: Write, E: Write>(config: &Config, primary: &mut O, secondary: &mut E) -> Result<Outcome> {
    let signaler = ProtocolSignaler::new(&config.delimiter, config.tty);
    let provisioner = DirectoryProvisioner::new(&config.target_dir);

    // CheckBundle / VerifyChecksum / Unpack
    let thin_path = config.thin_archive_path();
    if thin_path.is_file() {
        if !hash::is_fresh(&thin_path, &config.checksum, config.hash_algorithm)? {
            warn!(
                archive = %thin_path.display(),
                "bundle checksum does not match the expected value"
            );
            return needs_deploy(&provisioner, &signaler, primary);
        }
        archive::unpack_thin(&thin_path, &config.target_dir)?;
    } else {
        // No bundle on disk: the cached tree must prove it is reusable.
        if which::which(TRANSFER_TOOL).is_err() {
            return Err(Error::ScpNotFound(TRANSFER_TOOL));
        }
        if config.target_dir.exists() && !config.target_dir.is_dir() {
            error!(
                path = %config.target_dir.display(),
                "target path exists but is not a directory"
            );
            return Err(Error::TargetNotDirectory(config.target_dir.clone()));
        }
        if !config.target_dir.exists() {
            return needs_deploy(&provisioner, &signaler, primary);
        }
    }

    // VerifyCodeMarker: an independent freshness signal — the bundle
    // file can be bit-identical while the tree it stands for changed
    // upstream.
    match manifest::read_marker(&config.code_checksum_path())? {
        None => {
            warn!(
                path = %config.code_checksum_path().display(),
                "unable to locate current code checksum"
            );
            return needs_deploy(&provisioner, &signaler, primary);
        }
        Some(current) if current != config.code_checksum => {
            warn!(
                %current,
                expected = %config.code_checksum,
                "current code checksum differs from the expected one"
            );
            return needs_deploy(&provisioner, &signaler, primary);
        }
        Some(_) => {}
    }

    let entry_point = config.entry_point_path();
    if !entry_point.is_file() {
        error!(path = %entry_point.display(), "deployed tree is missing its entry point");
        return needs_deploy(&provisioner, &signaler, primary);
    }

    // The runtime configuration blob is rewritten every run; the caller
    // may have changed it without redeploying anything.
    fs::write(
        config.minion_config_path(),
        format!("{}\n", config.minion_config),
    )?;

    // CheckExtMods
    if let Some(expected_version) = &config.ext_mods {
        let ext_path = config.ext_archive_path();
        if ext_path.exists() {
            archive::unpack_ext_mods(&ext_path, &config.target_dir)?;
        } else {
            match manifest::read_marker(&config.ext_version_path())? {
                Some(current) if &current == expected_version => {}
                current => {
                    debug!(
                        ?current,
                        expected = %expected_version,
                        "extension modules are missing or outdated"
                    );
                    signaler.needs_ext_mods(primary)?;
                    return Ok(Outcome::NeedsExtMods);
                }
            }
        }
    }

    // ResolveInterpreter
    let versions = InterpreterManifest::load(&config.supported_versions_path())?;
    let resolver = InterpreterResolver::new();
    let interpreter = resolver.resolve(&versions, &config.target_dir)?;

    // Execute
    signaler.ready(primary, secondary)?;
    let retcode = Executor::new(config).run(&interpreter, primary)?;
    Ok(Outcome::Completed(retcode))
}
