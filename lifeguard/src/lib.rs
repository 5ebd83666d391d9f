//! # lifeguard
//!
//! Reference-counted lifetime guards for lazily constructed, process-wide
//! singletons.
//!
//! This crate is a **façade** that re-exports all public items from the
//! underlying workspace crates. Application code should depend on this
//! crate rather than the individual `lg-*` crates.
//!
//! ## Quick start
//!
//! ```toml
//! [dependencies]
//! lifeguard = "0.1"
//! ```
//!
//! ```rust
//! use lifeguard::prelude::*;
//!
//! #[derive(Default)]
//! struct Config {
//!     verbose: bool,
//! }
//!
//! // Any number of independent guards keep the instance alive.
//! let guard = LifetimeGuard::<Config>::new();
//! let config = LifetimeGuard::<Config>::instance();
//! assert!(!config.verbose);
//! assert_eq!(LifetimeGuard::<Config>::count(), 2);
//! drop(guard);
//! assert_eq!(LifetimeGuard::<Config>::count(), 1);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Singleton slots, lifetime guards, settings and error definitions.
pub use lg_core as core;

pub use lg_core::{
    Error, LifetimeGuard, MisusePolicy, Result, ScopedMisusePolicy, Settings, SingletonSlot,
    SlotStats,
};

/// The items most code needs: guards, slots and the error type.
pub mod prelude {
    pub use lg_core::{Error, LifetimeGuard, Result, SingletonSlot};
}
