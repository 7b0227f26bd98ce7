// src/provision.rs

//! Cache directory provisioning with ownership/permission validation
//!
//! The cache directory usually lives under a world-writable parent
//! (`/var/tmp`), so creation is treated as security-sensitive: after
//! every create the directory is re-stat'ed, and a wrong owner or wrong
//! mode means someone else slipped a directory in between our remove
//! and our mkdir. That case is retried from scratch a bounded number of
//! times before giving up.
//!
//! When invoked under sudo, the invoking user's group (`SUDO_GID`) is
//! granted read/write/execute so the unelevated identity can reuse the
//! cache on later sessions.

use nix::sys::stat;
use nix::unistd::{Gid, geteuid};
use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::umask::UmaskGuard;

/// Expected permission bits on a freshly provisioned directory
const DIR_MODE: u32 = 0o700;

/// How many times a failed ownership/mode validation is retried before
/// the run is declared compromised
const MAX_ATTEMPTS: u32 = 5;

/// Environment variable carrying the invoking user's group id under sudo
const ELEVATION_GROUP_VAR: &str = "SUDO_GID";

/// Creates and validates the cache directory
pub struct DirectoryProvisioner {
    path: PathBuf,
}

impl DirectoryProvisioner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Wipe and recreate the directory until it passes the ownership and
    /// mode checks, then grant the elevation group if one is configured.
    pub fn ensure(&self) -> Result<()> {
        for attempt in 1..=MAX_ATTEMPTS {
            self.provision()?;
            if self.validate()? {
                self.grant_elevation_group()?;
                debug!(path = %self.path.display(), "cache directory provisioned");
                return Ok(());
            }
            warn!(
                path = %self.path.display(),
                attempt,
                "ownership or mode mismatch on freshly created directory, re-provisioning"
            );
        }
        Err(Error::ProvisioningSecurity {
            path: self.path.clone(),
            attempts: MAX_ATTEMPTS,
        })
    }

    fn provision(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_dir_all(&self.path).map_err(|source| Error::CantCreate {
                path: self.path.clone(),
                source,
            })?;
        }
        let _mask = UmaskGuard::restrictive();
        fs::create_dir_all(&self.path).map_err(|source| Error::CantCreate {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Re-stat the directory; false means a provisioning race/attack
    fn validate(&self) -> Result<bool> {
        let st = stat::stat(&self.path).map_err(std::io::Error::from)?;
        if st.st_uid != geteuid().as_raw() {
            return Ok(false);
        }
        if (st.st_mode as u32) & 0o7777 != DIR_MODE {
            return Ok(false);
        }
        Ok(true)
    }

    /// Grant the sudo-invoking user's group access to the cache so the
    /// unelevated identity can reuse it. Failing to apply a configured
    /// grant is fatal.
    fn grant_elevation_group(&self) -> Result<()> {
        let Some(gid) = env::var(ELEVATION_GROUP_VAR)
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        else {
            return Ok(());
        };

        nix::unistd::chown(&self.path, None, Some(Gid::from_raw(gid))).map_err(|errno| {
            Error::ElevationGroup {
                path: self.path.clone(),
                reason: errno.to_string(),
            }
        })?;

        let metadata = fs::metadata(&self.path)?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(permissions.mode() | 0o070);
        fs::set_permissions(&self.path, permissions).map_err(|err| Error::ElevationGroup {
            path: self.path.clone(),
            reason: err.to_string(),
        })?;
        Ok(())
    }
}
