// tests/common/mod.rs

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use thinshim::{Config, HashAlgorithm};

pub const DELIMITER: &str = "_edbc7885e4f9aac9b83b35999b68d015148dc27c";

/// A Config the way the control side would render it, pointed at a
/// test-owned cache directory.
pub fn base_config(target_dir: &Path) -> Config {
    Config {
        target_dir: target_dir.to_path_buf(),
        checksum: String::new(),
        hash_algorithm: HashAlgorithm::Sha256,
        code_checksum: "currentsum".to_string(),
        ext_mods: None,
        delimiter: DELIMITER.to_string(),
        tty: false,
        wipe: false,
        cmd_umask: None,
        minion_config: "master: localhost".to_string(),
        args: Vec::new(),
    }
}

/// Build a gzip tarball with the given (path, contents) entries.
pub fn make_tgz(path: &Path, entries: &[(&str, &[u8])]) {
    use std::io::Write;

    let file = fs::File::create(path).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(1_000_000);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap().flush().unwrap();
}

/// Lay out an already-deployed cache tree: code marker, entry point,
/// and interpreter manifest.
pub fn deploy_tree(target: &Path, code_checksum: &str, manifest: &str) {
    fs::create_dir_all(target).unwrap();
    fs::write(target.join("code-checksum"), format!("{code_checksum}\n")).unwrap();
    fs::write(target.join("salt-call"), b"#!/bin/sh\nexit 0\n").unwrap();
    fs::write(target.join("supported-versions"), manifest).unwrap();
}

/// Drop an executable script that reports a fixed version (or prints
/// fixed output), whatever arguments it is given.
pub fn stub_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// The reuse path checks for the transfer tool before anything else;
/// skip reuse-path scenarios on hosts that do not carry it.
pub fn have(tool: &str) -> bool {
    which::which(tool).is_ok()
}
