//! Global library settings.
//!
//! [`Settings`] holds the **misuse policy** — what happens when the guard
//! protocol detects a logic defect such as a count underflow.  It is a
//! process-wide singleton accessed via a `std::sync::OnceLock`.
//!
//! Thread safety: the policy is stored in an atomic so that it can be changed
//! from any thread.  Code that changes the policy temporarily should use
//! [`ScopedMisusePolicy`], which restores the previous value on drop.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use crate::errors::Error;

/// How a detected misuse of the guard protocol is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MisusePolicy {
    /// Panic with the error.  Default in debug builds.
    Panic,
    /// Emit a `tracing::error!` event and continue with the count clamped at
    /// zero.  Default in release builds.
    Log,
}

impl MisusePolicy {
    const fn to_raw(self) -> u8 {
        match self {
            MisusePolicy::Panic => 0,
            MisusePolicy::Log => 1,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => MisusePolicy::Panic,
            _ => MisusePolicy::Log,
        }
    }
}

impl Default for MisusePolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            MisusePolicy::Panic
        } else {
            MisusePolicy::Log
        }
    }
}

/// Process-wide settings used by lifeguard.
pub struct Settings {
    misuse_policy: AtomicU8,
}

static INSTANCE: OnceLock<Settings> = OnceLock::new();

impl Settings {
    /// Return a reference to the global singleton.
    pub fn instance() -> &'static Settings {
        INSTANCE.get_or_init(|| Settings {
            misuse_policy: AtomicU8::new(MisusePolicy::default().to_raw()),
        })
    }

    /// Return the policy currently applied to misuse.
    pub fn misuse_policy(&self) -> MisusePolicy {
        MisusePolicy::from_raw(self.misuse_policy.load(Ordering::Acquire))
    }

    /// Replace the misuse policy, returning the previous one.
    pub fn set_misuse_policy(&self, policy: MisusePolicy) -> MisusePolicy {
        MisusePolicy::from_raw(self.misuse_policy.swap(policy.to_raw(), Ordering::AcqRel))
    }

    /// Handle a misuse error according to the current policy.
    pub(crate) fn report_misuse(&self, error: &Error) {
        match self.misuse_policy() {
            MisusePolicy::Panic => panic!("{error}"),
            MisusePolicy::Log => tracing::error!(%error, "lifetime guard misuse"),
        }
    }
}

/// Temporarily override the misuse policy for the current scope.
///
/// # Example
/// ```
/// use lg_core::settings::{MisusePolicy, ScopedMisusePolicy, Settings};
///
/// let before = Settings::instance().misuse_policy();
/// {
///     let _scoped = ScopedMisusePolicy::new(MisusePolicy::Log);
///     assert_eq!(Settings::instance().misuse_policy(), MisusePolicy::Log);
/// }
/// assert_eq!(Settings::instance().misuse_policy(), before);
/// ```
#[must_use = "the previous policy is restored when this value is dropped"]
pub struct ScopedMisusePolicy {
    previous: MisusePolicy,
}

impl ScopedMisusePolicy {
    /// Install `policy` until the returned value is dropped.
    pub fn new(policy: MisusePolicy) -> Self {
        Self {
            previous: Settings::instance().set_misuse_policy(policy),
        }
    }
}

impl Drop for ScopedMisusePolicy {
    fn drop(&mut self) {
        Settings::instance().set_misuse_policy(self.previous);
    }
}
