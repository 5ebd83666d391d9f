//! # lg-core
//!
//! Singleton slots, lifetime guards, settings and error definitions for
//! lifeguard.
//!
//! A process-wide singleton is stored in a per-type [`SingletonSlot`] and
//! kept alive by [`LifetimeGuard`] tokens.  The instance is built lazily by
//! the first [`LifetimeGuard::instance`] call, destroyed as soon as the last
//! token is released, and rebuilt (with a fresh generation) on the next
//! `instance()` call after that.

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ── Public modules ───────────────────────────────────────────────────────────

/// Error types.
pub mod errors;

/// Singleton slots, the slot registry and lifetime guards.
pub mod patterns;

/// Global library settings (misuse policy).
pub mod settings;

// ── Re-exports for convenience ────────────────────────────────────────────────

pub use errors::{Error, Result};
pub use patterns::lifetime_guard::LifetimeGuard;
pub use patterns::slot::{SingletonSlot, SlotStats};
pub use settings::{MisusePolicy, ScopedMisusePolicy, Settings};
