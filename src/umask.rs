// src/umask.rs

//! Scoped process-umask manipulation
//!
//! The umask is process-wide state, so every place that needs a
//! temporary creation mask (directory provisioning, bundle extraction,
//! the optional payload umask) takes it through this guard. The
//! previous mask is restored on drop, which includes early returns and
//! `?` propagation out of fatal branches.

use nix::sys::stat::{Mode, umask};

/// Restrictive creation mask applied while provisioning and unpacking:
/// nothing for group or other.
pub const RESTRICTIVE_MASK: u32 = 0o077;

/// RAII guard that swaps the process umask and restores it on drop
pub struct UmaskGuard {
    previous: Mode,
}

impl UmaskGuard {
    /// Set the process umask, remembering the previous value
    pub fn set(mask: Mode) -> Self {
        Self {
            previous: umask(mask),
        }
    }

    /// Set the restrictive provisioning mask
    pub fn restrictive() -> Self {
        Self::set(Mode::from_bits_truncate(RESTRICTIVE_MASK as nix::libc::mode_t))
    }

    /// Set a mask from raw mode bits
    pub fn from_bits(mask: u32) -> Self {
        Self::set(Mode::from_bits_truncate(mask as nix::libc::mode_t))
    }

    /// The mask that was in effect before this guard was created
    pub fn previous(&self) -> Mode {
        self.previous
    }
}

impl Drop for UmaskGuard {
    fn drop(&mut self) {
        umask(self.previous);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Mutex, OnceLock};

    /// The umask is process-global; tests that set or observe it take
    /// this lock so they do not interleave.
    pub(crate) fn lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }
}
