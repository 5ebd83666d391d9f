//! Error types for lifeguard.
//!
//! Every failure the lifetime machinery can report is a variant of a single
//! `thiserror`-derived enum.

use thiserror::Error;

/// The top-level error type used throughout lifeguard.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The managed type's initialiser failed while the slot was `EMPTY`.
    ///
    /// The slot is rolled back: it stays empty and its count is unchanged.
    #[error("construction of `{type_name}` failed: {message}")]
    Construction {
        /// Name of the managed type.
        type_name: &'static str,
        /// Rendered error reported by the initialiser.
        message: String,
    },

    /// A guard was released while the slot's count was already zero.
    ///
    /// This is a logic defect (usually the result of `set_count`), not a
    /// recoverable runtime condition.
    #[error("lifetime count of `{type_name}` underflowed")]
    CountUnderflow {
        /// Name of the managed type.
        type_name: &'static str,
    },
}

/// Shorthand `Result` type used throughout lifeguard.
pub type Result<T, E = Error> = std::result::Result<T, E>;
