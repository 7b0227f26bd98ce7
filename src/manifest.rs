// src/manifest.rs

//! Typed parsers for the on-disk protocol files
//!
//! Three tiny text formats live under the target directory: the
//! interpreter manifest (`supported-versions`), and the two single-line
//! freshness markers (`code-checksum`, `ext_version`). Markers are
//! always whole-file overwrites on the writing side, so the readers
//! here only ever look at the first line.

use std::fs;
use std::io;
use std::path::Path;

use crate::config::SUPPORTED_VERSIONS;
use crate::error::{Error, Result};

/// One manifest entry: a payload variant and the minimum interpreter
/// version it was built for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// ABI/variant tag; also the name of the payload subdirectory
    pub namespace: String,
    pub major: u32,
    pub minor: u32,
}

/// Ordered interpreter version manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterManifest {
    entries: Vec<ManifestEntry>,
}

impl InterpreterManifest {
    /// Parse `namespace:major:minor` lines, preserving file order.
    /// Blank lines are tolerated; anything else malformed is an error.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(':');
            let entry = (|| {
                let namespace = fields.next()?.trim();
                let major = fields.next()?.trim().parse().ok()?;
                let minor = fields.next()?.trim().parse().ok()?;
                if namespace.is_empty() || fields.next().is_some() {
                    return None;
                }
                Some(ManifestEntry {
                    namespace: namespace.to_string(),
                    major,
                    minor,
                })
            })()
            .ok_or_else(|| Error::Manifest {
                file: SUPPORTED_VERSIONS,
                line: line.to_string(),
            })?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read a single-line marker file. `Ok(None)` means the marker does not
/// exist; any other read failure propagates.
pub fn read_marker(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text.lines().next().unwrap_or("").trim().to_string())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}
