// src/archive.rs

//! Bundle unpacking and timestamp normalization
//!
//! Bundles arrive as gzip-compressed tarballs and never outlive a
//! successful unpack: the archive file is deleted as soon as its
//! contents are on disk. After a thin unpack every extracted entry's
//! access/modification time is reset to "now" — cache directories often
//! live on ephemeral storage where cleanup sweepers evict files by
//! stale timestamp, and the archive preserves build-time stamps that
//! can be arbitrarily old.

use filetime::FileTime;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::{EXT_MODS_CACHE, EXT_VERSION};
use crate::error::Result;
use crate::umask::UmaskGuard;

fn extract(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let _mask = UmaskGuard::restrictive();
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.unpack(dest)?;
    Ok(())
}

/// Reset every entry under `root` to the current time
fn reset_time(root: &Path) -> Result<()> {
    let now = FileTime::now();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        filetime::set_file_times(entry.path(), now, now)?;
    }
    Ok(())
}

/// Unpack the thin bundle into `dest`, delete the archive, and
/// normalize timestamps.
///
/// A concurrent delete of the archive file is tolerated; the unpack
/// already succeeded and the file was going away regardless.
pub fn unpack_thin(archive_path: &Path, dest: &Path) -> Result<()> {
    debug!(archive = %archive_path.display(), dest = %dest.display(), "unpacking thin bundle");
    extract(archive_path, dest)?;
    match fs::remove_file(archive_path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err.into()),
        _ => {}
    }
    reset_time(dest)?;
    Ok(())
}

/// Unpack the extension-modules bundle into its fixed subpath under
/// `target_dir`, delete the archive, and relocate the bundle's version
/// marker out to `target_dir` as the authoritative installed version.
pub fn unpack_ext_mods(archive_path: &Path, target_dir: &Path) -> Result<()> {
    let modcache = target_dir.join(EXT_MODS_CACHE);
    debug!(archive = %archive_path.display(), dest = %modcache.display(), "unpacking extension modules");
    extract(archive_path, &modcache)?;
    fs::remove_file(archive_path)?;
    fs::rename(modcache.join(EXT_VERSION), target_dir.join(EXT_VERSION))?;
    Ok(())
}
