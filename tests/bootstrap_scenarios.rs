// tests/bootstrap_scenarios.rs

//! End-to-end decision-flow scenarios
//!
//! Each scenario drives `bootstrap::run` against a tempdir fixture and
//! asserts both the returned outcome and the exact bytes that appeared
//! on the protocol streams.

mod common;

use common::{DELIMITER, base_config, deploy_tree, have, make_tgz, stub_script};
use std::fs;
use std::os::unix::fs::MetadataExt;
use thinshim::hash::{DEFAULT_CHUNK_SIZE, digest_file};
use thinshim::{Error, HashAlgorithm, Outcome, bootstrap};

fn run_captured(config: &thinshim::Config) -> (thinshim::Result<Outcome>, Vec<u8>, Vec<u8>) {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let result = bootstrap::run(config, &mut out, &mut err);
    (result, out, err)
}

fn deploy_frame() -> Vec<u8> {
    format!("{DELIMITER}\ndeploy\n").into_bytes()
}

#[test]
fn absent_target_dir_signals_deploy_and_primes_directory() {
    if !have("scp") {
        eprintln!("skipping: no scp on this host");
        return;
    }
    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("thin");
    let config = base_config(&target);

    let (result, out, _err) = run_captured(&config);

    assert_eq!(result.unwrap(), Outcome::NeedsDeploy);
    assert_eq!(out, deploy_frame());
    assert!(target.is_dir(), "directory should be primed for the transfer");
    assert_eq!(
        fs::metadata(&target).unwrap().mode() & 0o7777,
        0o700,
        "primed directory must carry the restrictive mode"
    );
}

#[test]
fn occupied_target_path_is_fatal() {
    if !have("scp") {
        eprintln!("skipping: no scp on this host");
        return;
    }
    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("thin");
    fs::write(&target, b"in the way").unwrap();
    let config = base_config(&target);

    let (result, out, _err) = run_captured(&config);

    let err = result.unwrap_err();
    assert!(matches!(err, Error::TargetNotDirectory(_)), "got {err:?}");
    assert_eq!(err.exit_code(), 73);
    assert!(out.is_empty(), "fatal errors must not emit protocol frames");
}

#[test]
fn stale_bundle_checksum_signals_deploy_without_unpack() {
    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("thin");
    fs::create_dir_all(&target).unwrap();
    make_tgz(&target.join("salt-thin.tgz"), &[("salt-call", b"#!/bin/sh\n")]);

    let mut config = base_config(&target);
    config.checksum = "0".repeat(64); // wrong on purpose

    let (result, out, _err) = run_captured(&config);

    assert_eq!(result.unwrap(), Outcome::NeedsDeploy);
    assert_eq!(out, deploy_frame());
    assert!(
        !target.join("salt-call").exists(),
        "a stale bundle must never be unpacked"
    );
}

#[test]
fn fresh_bundle_with_stale_code_marker_signals_deploy() {
    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("thin");
    fs::create_dir_all(&target).unwrap();
    let archive = target.join("salt-thin.tgz");
    make_tgz(
        &archive,
        &[("salt-call", b"#!/bin/sh\n"), ("code-checksum", b"oldsum\n")],
    );

    let mut config = base_config(&target);
    config.checksum = digest_file(&archive, HashAlgorithm::Sha256, DEFAULT_CHUNK_SIZE).unwrap();
    config.code_checksum = "newsum".to_string();

    let (result, out, _err) = run_captured(&config);

    assert_eq!(result.unwrap(), Outcome::NeedsDeploy);
    assert_eq!(out, deploy_frame());
}

#[test]
fn missing_entry_point_signals_deploy_instead_of_crashing() {
    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("thin");
    fs::create_dir_all(&target).unwrap();
    let archive = target.join("salt-thin.tgz");
    // Valid checksum and matching code marker, but no entry point.
    make_tgz(&archive, &[("code-checksum", b"currentsum\n")]);

    let mut config = base_config(&target);
    config.checksum = digest_file(&archive, HashAlgorithm::Sha256, DEFAULT_CHUNK_SIZE).unwrap();

    let (result, out, _err) = run_captured(&config);

    assert_eq!(result.unwrap(), Outcome::NeedsDeploy);
    assert_eq!(out, deploy_frame());
}

#[test]
fn reuse_with_missing_code_marker_signals_deploy() {
    if !have("scp") {
        eprintln!("skipping: no scp on this host");
        return;
    }
    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("thin");
    fs::create_dir_all(&target).unwrap(); // deployed-ish, but no marker
    let config = base_config(&target);

    let (result, out, _err) = run_captured(&config);

    assert_eq!(result.unwrap(), Outcome::NeedsDeploy);
    assert_eq!(out, deploy_frame());
}

#[test]
fn ext_mods_version_mismatch_signals_ext_mods() {
    if !have("scp") {
        eprintln!("skipping: no scp on this host");
        return;
    }
    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("thin");
    deploy_tree(&target, "currentsum", "py99:99:0\n");
    fs::write(target.join("ext_version"), "v1\n").unwrap();

    let mut config = base_config(&target);
    config.ext_mods = Some("v2".to_string());

    let (result, out, _err) = run_captured(&config);

    assert_eq!(result.unwrap(), Outcome::NeedsExtMods);
    assert_eq!(out, format!("{DELIMITER}\next_mods\n").into_bytes());
}

#[test]
fn ext_mods_missing_marker_signals_ext_mods() {
    if !have("scp") {
        eprintln!("skipping: no scp on this host");
        return;
    }
    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("thin");
    deploy_tree(&target, "currentsum", "py99:99:0\n");

    let mut config = base_config(&target);
    config.ext_mods = Some("v2".to_string());

    let (result, _out, _err) = run_captured(&config);
    assert_eq!(result.unwrap(), Outcome::NeedsExtMods);
}

#[test]
fn ext_mods_bundle_is_unpacked_and_marker_relocated() {
    if !have("scp") {
        eprintln!("skipping: no scp on this host");
        return;
    }
    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("thin");
    // Impossible interpreter minimum so the run stops at resolution,
    // proving everything before it succeeded.
    deploy_tree(&target, "currentsum", "py99:99:0\n");
    make_tgz(
        &target.join("salt-ext_mods.tgz"),
        &[("ext_version", b"v2\n"), ("modules/custom.py", b"# mod\n")],
    );

    let mut config = base_config(&target);
    config.ext_mods = Some("v2".to_string());

    let (result, out, _err) = run_captured(&config);

    assert!(matches!(result.unwrap_err(), Error::NoInterpreter));
    assert!(out.is_empty(), "no deploy signal on the happy ext-mods path");
    assert!(!target.join("salt-ext_mods.tgz").exists());
    assert_eq!(
        fs::read_to_string(target.join("ext_version")).unwrap().trim(),
        "v2"
    );
    assert!(
        target
            .join("running_data/var/cache/salt/minion/extmods/modules/custom.py")
            .is_file()
    );
}

#[test]
fn idempotent_reuse_reaches_interpreter_resolution() {
    if !have("scp") {
        eprintln!("skipping: no scp on this host");
        return;
    }
    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("thin");
    deploy_tree(&target, "currentsum", "py99:99:0\n");
    let config = base_config(&target);

    let (result, out, _err) = run_captured(&config);

    // Exit 10 proves every freshness gate passed and the run made it
    // all the way to interpreter resolution with no redeploy request.
    let err = result.unwrap_err();
    assert!(matches!(err, Error::NoInterpreter), "got {err:?}");
    assert_eq!(err.exit_code(), 10);
    assert!(out.is_empty(), "reuse must not emit deploy or ready frames");
    assert!(target.join("salt-call").exists(), "tree must be left untouched");

    // The runtime config blob is rewritten on every run regardless.
    assert_eq!(
        fs::read_to_string(target.join("minion")).unwrap(),
        "master: localhost\n"
    );
}

#[test]
fn full_flow_executes_payload_when_an_interpreter_qualifies() {
    if !have("scp") || !have("python3") {
        eprintln!("skipping: needs scp and python3 on this host");
        return;
    }
    let parent = tempfile::tempdir().unwrap();
    let target = parent.path().join("thin");
    deploy_tree(&target, "currentsum", "py3:3:0\n");
    fs::create_dir_all(target.join("py3")).unwrap();
    // A python entry point so the resolved python3 can actually run it.
    fs::write(
        target.join("salt-call"),
        b"import sys\nsys.stdout.write(\"pong\\n\")\n",
    )
    .unwrap();

    let mut config = base_config(&target);
    config.tty = true;
    config.wipe = true;
    config.args = vec!["test.ping".to_string()];

    let (result, out, _err) = run_captured(&config);

    assert_eq!(result.unwrap(), Outcome::Completed(0));
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, format!("{DELIMITER}\npong\n"));
    assert!(!target.exists(), "wipe must remove the cache directory");
}
