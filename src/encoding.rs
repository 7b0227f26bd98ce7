// src/encoding.rs

//! Best-effort decoding of child-process output
//!
//! Remote hosts report interpreter versions and payload output in
//! whatever encoding their locale dictates. Decoding walks an ordered
//! list of probe strategies and the first one that yields an encoding
//! wins; the final strategy always succeeds, so no decoding failure can
//! escape this module.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::env;
use std::io::IsTerminal;

/// One strategy for discovering the system text encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Encoding declared on the attached input stream, when there is one
    StreamDeclared,
    /// Encoding named by the locale environment (LC_ALL, LC_CTYPE, LANG)
    LocalePreferred,
    /// The process's own default
    ProcessDefault,
    /// Platform convention when the locale says nothing
    PlatformDefault,
    /// Plain ASCII with replacement, the unconditional last resort
    FixedAscii,
}

/// Probe order; `FixedAscii` terminates the chain unconditionally
pub const PROBE_ORDER: [DecodeStrategy; 5] = [
    DecodeStrategy::StreamDeclared,
    DecodeStrategy::LocalePreferred,
    DecodeStrategy::ProcessDefault,
    DecodeStrategy::PlatformDefault,
    DecodeStrategy::FixedAscii,
];

/// Resolve a locale value like `en_US.UTF-8` or `de_DE.ISO-8859-1@euro`
/// to an encoding. `C`, `POSIX`, and unknown codesets resolve to none.
pub fn encoding_for_locale_value(value: &str) -> Option<&'static Encoding> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    // Strip the territory prefix and any @modifier suffix.
    let codeset = value.split('.').nth(1).unwrap_or(value);
    let codeset = codeset.split('@').next().unwrap_or(codeset);
    Encoding::for_label(codeset.trim().as_bytes())
}

fn locale_encoding() -> Option<&'static Encoding> {
    for var in ["LC_ALL", "LC_CTYPE", "LANG"] {
        if let Ok(value) = env::var(var) {
            if value.is_empty() {
                continue;
            }
            if let Some(encoding) = encoding_for_locale_value(&value) {
                return Some(encoding);
            }
        }
    }
    None
}

fn ascii_lossy(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii() {
                b as char
            } else {
                char::REPLACEMENT_CHARACTER
            }
        })
        .collect()
}

impl DecodeStrategy {
    fn encoding(&self) -> Option<&'static Encoding> {
        match self {
            Self::StreamDeclared => {
                // A detached stdin declares nothing; the locale of the
                // attached terminal is what the stream inherits.
                if std::io::stdin().is_terminal() {
                    locale_encoding()
                } else {
                    None
                }
            }
            Self::LocalePreferred => locale_encoding(),
            Self::ProcessDefault => Some(UTF_8),
            Self::PlatformDefault => {
                if cfg!(target_os = "macos") {
                    Some(UTF_8)
                } else if cfg!(windows) {
                    Some(WINDOWS_1252)
                } else {
                    None
                }
            }
            Self::FixedAscii => None,
        }
    }

    /// Attempt to decode with this strategy; `None` means the strategy
    /// could not determine an encoding and the chain moves on
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        if *self == Self::FixedAscii {
            return Some(ascii_lossy(bytes));
        }
        self.encoding()
            .map(|encoding| encoding.decode(bytes).0.into_owned())
    }
}

/// Decode child-process output with the best available system encoding.
/// Never fails; undecodable bytes become replacement characters.
pub fn decode_output(bytes: &[u8]) -> String {
    for strategy in PROBE_ORDER {
        if let Some(decoded) = strategy.decode(bytes) {
            return decoded;
        }
    }
    ascii_lossy(bytes)
}
