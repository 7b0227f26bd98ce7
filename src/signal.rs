// src/signal.rs

//! Delimiter-framed protocol signaling
//!
//! The caller multiplexes this program's output with ordinary payload
//! output on the same remote-shell channel. An out-of-band delimiter
//! token frames the few messages the caller actually parses:
//!
//! - `<delimiter>\ndeploy\n` — thin bundle must be (re)transferred
//! - `<delimiter>\next_mods\n` — extension modules must be transferred
//! - `<delimiter>\n` — everything is in place, payload output follows
//!
//! The needs-* messages are terminal (the process exits with the
//! matching reserved code right after); the ready message is not. The
//! ready line also goes to the secondary stream unless the session is
//! interactive, because a non-tty caller reads both channels and needs
//! the frame on each to split signaling from payload noise.

use std::io::{self, Write};

/// Keyword the caller matches to trigger a thin redeploy
pub const DEPLOY_KEYWORD: &str = "deploy";
/// Keyword the caller matches to trigger an ext-mods redeploy
pub const EXT_MODS_KEYWORD: &str = "ext_mods";

/// Emits the delimiter-framed messages that drive the caller's
/// retry/redeploy logic
pub struct ProtocolSignaler<'a> {
    delimiter: &'a str,
    interactive: bool,
}

impl<'a> ProtocolSignaler<'a> {
    pub fn new(delimiter: &'a str, interactive: bool) -> Self {
        Self {
            delimiter,
            interactive,
        }
    }

    /// Signal that the thin bundle must be (re)deployed
    pub fn needs_deploy<W: Write>(&self, primary: &mut W) -> io::Result<()> {
        write!(primary, "{}\n{}\n", self.delimiter, DEPLOY_KEYWORD)?;
        primary.flush()
    }

    /// Signal that the extension-modules bundle must be deployed
    pub fn needs_ext_mods<W: Write>(&self, primary: &mut W) -> io::Result<()> {
        write!(primary, "{}\n{}\n", self.delimiter, EXT_MODS_KEYWORD)?;
        primary.flush()
    }

    /// Signal that the cache is usable and payload output follows
    pub fn ready<O: Write, E: Write>(&self, primary: &mut O, secondary: &mut E) -> io::Result<()> {
        writeln!(primary, "{}", self.delimiter)?;
        primary.flush()?;
        if !self.interactive {
            writeln!(secondary, "{}", self.delimiter)?;
            secondary.flush()?;
        }
        Ok(())
    }
}
