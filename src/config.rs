// src/config.rs

//! Deployment configuration rendered by the control side
//!
//! The control side templates one invocation of this program per remote
//! session; every field arrives on the command line and nothing is
//! mutated afterward. The well-known file names below are part of the
//! wire contract — the control side transfers bundles to, and reads
//! markers from, exactly these paths under the target directory.

use clap::Parser;
use std::path::PathBuf;

use crate::hash::HashAlgorithm;

/// Thin bundle archive (ephemeral, deleted after a successful unpack)
pub const THIN_ARCHIVE: &str = "salt-thin.tgz";
/// Extension-modules bundle archive (ephemeral)
pub const EXT_ARCHIVE: &str = "salt-ext_mods.tgz";
/// Interpreter manifest, one `namespace:major:minor` line per entry
pub const SUPPORTED_VERSIONS: &str = "supported-versions";
/// Checksum of the last successfully deployed payload tree, single line
pub const CODE_CHECKSUM: &str = "code-checksum";
/// Installed extension-modules version marker, single line
pub const EXT_VERSION: &str = "ext_version";
/// Runtime configuration blob, rewritten every run
pub const MINION_CONFIG: &str = "minion";
/// Payload entry point, must exist after an unpack
pub const ENTRY_POINT: &str = "salt-call";
/// Extension-modules install destination, relative to the target directory
pub const EXT_MODS_CACHE: &str = "running_data/var/cache/salt/minion/extmods";

/// Tool the control side uses to transfer bundles; its absence on the
/// target is fatal before a deploy can even be requested
pub const TRANSFER_TOOL: &str = "scp";

fn parse_octal(s: &str) -> Result<u32, String> {
    let digits = s.strip_prefix("0o").unwrap_or(s);
    u32::from_str_radix(digits, 8).map_err(|e| format!("invalid octal umask {s:?}: {e}"))
}

/// Immutable per-invocation deployment parameters
#[derive(Parser, Debug, Clone)]
#[command(name = "thinshim")]
#[command(version)]
#[command(about = "Agentless bootstrap shim for ephemeral Salt thin bundles", long_about = None)]
pub struct Config {
    /// Cache directory for the thin bundle on this host
    #[arg(long, value_name = "DIR")]
    pub target_dir: PathBuf,

    /// Expected digest of the thin bundle archive
    #[arg(long, value_name = "HEX")]
    pub checksum: String,

    /// Algorithm the expected checksum was computed with
    #[arg(long, value_name = "NAME", default_value = "sha256")]
    pub hash_algorithm: HashAlgorithm,

    /// Checksum of the payload tree the caller expects to find deployed
    #[arg(long, value_name = "HEX")]
    pub code_checksum: String,

    /// Extension-modules version the caller expects; omit when no
    /// extension modules are configured
    #[arg(long, value_name = "VERSION")]
    pub ext_mods: Option<String>,

    /// Out-of-band token framing protocol messages on the output streams
    #[arg(long, value_name = "TOKEN")]
    pub delimiter: String,

    /// Interactive session: capture and re-emit payload output instead
    /// of attaching it to this process's streams
    #[arg(long)]
    pub tty: bool,

    /// Remove the cache directory after the payload completes
    #[arg(long)]
    pub wipe: bool,

    /// Umask to apply for the duration of the payload run (octal)
    #[arg(long, value_name = "OCTAL", value_parser = parse_octal)]
    pub cmd_umask: Option<u32>,

    /// Runtime configuration blob written to `minion` every run
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub minion_config: String,

    /// Arguments forwarded to the payload entry point
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

impl Config {
    pub fn thin_archive_path(&self) -> PathBuf {
        self.target_dir.join(THIN_ARCHIVE)
    }

    pub fn ext_archive_path(&self) -> PathBuf {
        self.target_dir.join(EXT_ARCHIVE)
    }

    pub fn supported_versions_path(&self) -> PathBuf {
        self.target_dir.join(SUPPORTED_VERSIONS)
    }

    pub fn code_checksum_path(&self) -> PathBuf {
        self.target_dir.join(CODE_CHECKSUM)
    }

    pub fn ext_version_path(&self) -> PathBuf {
        self.target_dir.join(EXT_VERSION)
    }

    pub fn minion_config_path(&self) -> PathBuf {
        self.target_dir.join(MINION_CONFIG)
    }

    pub fn entry_point_path(&self) -> PathBuf {
        self.target_dir.join(ENTRY_POINT)
    }
}
