// src/exec.rs

//! Payload execution
//!
//! Builds the final argument vector for the payload entry point and
//! runs it, passing its exit code through unmodified. The fixed flag
//! set pins the payload to local-only operation with metadata-annotated
//! JSON output and quiet logging, rooted at the cache directory, so the
//! caller can parse results off the same channel the signaling uses.

use std::fs;
use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, warn};

use crate::config::Config;
use crate::encoding;
use crate::error::Result;
use crate::umask::UmaskGuard;

/// A final argument carrying this prefix is handed to the entry point
/// as an option, ahead of the argument separator
pub const NO_PARSE_PREFIX: &str = "--no-parse=";

/// Fixed passthrough flags handed to the entry point before any
/// forwarded arguments
const FIXED_FLAGS: [&str; 8] = [
    "--retcode-passthrough",
    "--local",
    "--metadata",
    "--out",
    "json",
    "-l",
    "quiet",
    "-c",
];

fn exit_status_code(status: ExitStatus) -> i32 {
    // Shell convention for signal deaths: 128 + signal number.
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

/// Runs the payload entry point for one invocation
pub struct Executor<'a> {
    config: &'a Config,
}

impl<'a> Executor<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Build the payload argument vector.
    ///
    /// A single forwarded argument is split on whitespace first — some
    /// callers pass one concatenated command line. A trailing
    /// `--no-parse=` argument is an option for the entry point itself,
    /// so it moves ahead of the `--` separator instead of following it.
    pub fn build_argv(&self, interpreter: &str) -> Vec<String> {
        let mut argv = vec![
            interpreter.to_string(),
            self.config.entry_point_path().to_string_lossy().into_owned(),
        ];
        argv.extend(FIXED_FLAGS.iter().map(|s| (*s).to_string()));
        argv.push(self.config.target_dir.to_string_lossy().into_owned());

        let mut forwarded: Vec<String> = if self.config.args.len() == 1 {
            self.config.args[0]
                .split_whitespace()
                .map(str::to_string)
                .collect()
        } else {
            self.config.args.clone()
        };

        if forwarded
            .last()
            .is_some_and(|arg| arg.starts_with(NO_PARSE_PREFIX))
            && let Some(tail) = forwarded.pop()
        {
            argv.push(tail);
        }

        argv.push("--".to_string());
        argv.extend(forwarded);
        argv
    }

    /// Run the payload and return its exit code.
    ///
    /// Interactive sessions capture the child's output and re-emit the
    /// decoded stdout on the primary stream; non-interactive sessions
    /// attach the child to this process's streams. Either way the cache
    /// directory is removed afterward when wipe is configured.
    pub fn run<W: Write>(&self, interpreter: &str, primary: &mut W) -> Result<i32> {
        let argv = self.build_argv(interpreter);
        debug!(?argv, "invoking payload entry point");

        let _mask = self.config.cmd_umask.map(UmaskGuard::from_bits);

        let retcode = if self.config.tty {
            let output = Command::new(&argv[0])
                .args(&argv[1..])
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output()?;
            let decoded = encoding::decode_output(&output.stdout);
            primary.write_all(decoded.as_bytes())?;
            primary.flush()?;
            exit_status_code(output.status)
        } else {
            let status = Command::new(&argv[0]).args(&argv[1..]).status()?;
            exit_status_code(status)
        };

        if self.config.wipe {
            if let Err(err) = fs::remove_dir_all(&self.config.target_dir) {
                // The child's exit code is the contract; a failed wipe
                // must not replace it.
                warn!(
                    path = %self.config.target_dir.display(),
                    %err,
                    "failed to wipe cache directory after payload"
                );
            }
        }

        Ok(retcode)
    }
}
