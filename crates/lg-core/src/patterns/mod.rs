//! Patterns sub-module: singleton slots, their registry, lifetime guards.

pub mod lifetime_guard;
pub mod registry;
pub mod slot;
