//! Lifetime guards for process-wide singletons.
//!
//! A [`LifetimeGuard<T>`] is one vote for keeping the process-wide instance
//! of `T` alive.  It carries nothing but a reference to the type's
//! [`SingletonSlot`]; creating a guard adds a token to the slot's count and
//! dropping it removes one.  When the last token goes away the instance is
//! destroyed, and the next [`instance`][LifetimeGuard::instance] call builds a
//! new one.
//!
//! Holding a guard never constructs the instance.  Only
//! [`instance`][LifetimeGuard::instance] (and its `_with` variants) does, and
//! the first successful call also registers an implicit guard that keeps the
//! instance alive for the rest of the process.
//!
//! # Token semantics
//!
//! | operation                         | count change |
//! |-----------------------------------|--------------|
//! | [`LifetimeGuard::new`] / `default` | +1          |
//! | `clone` (copy construction)       | +1           |
//! | [`LifetimeGuard::moved_from`]     | +1, source stays valid |
//! | `clone_from` (copy assignment)    | 0            |
//! | [`LifetimeGuard::move_assign`]    | 0            |
//! | drop                              | −1           |
//!
//! A plain Rust move relocates the single token and changes nothing.  A plain
//! `a = b` assignment drops the old `a` (−1) and moves `b` into its place.
//!
//! # Example
//! ```
//! use lg_core::patterns::lifetime_guard::LifetimeGuard;
//!
//! #[derive(Default)]
//! struct Registry {
//!     names: Vec<&'static str>,
//! }
//!
//! struct Service {
//!     // Keeps the registry alive for as long as the service exists.
//!     _registry: LifetimeGuard<Registry>,
//! }
//!
//! let service = Service { _registry: LifetimeGuard::new() };
//! assert_eq!(LifetimeGuard::<Registry>::count(), 1);
//!
//! let registry = LifetimeGuard::<Registry>::instance();
//! assert!(registry.names.is_empty());
//! // The service's guard plus the implicit guard of `instance()`.
//! assert_eq!(LifetimeGuard::<Registry>::count(), 2);
//!
//! drop(service);
//! assert_eq!(LifetimeGuard::<Registry>::count(), 1);
//! ```

use std::convert::Infallible;
use std::fmt;

use super::slot::{SingletonSlot, SlotStats};
use crate::errors::{Error, Result};
use crate::settings::Settings;

/// A token that keeps the process-wide instance of `T` alive.
pub struct LifetimeGuard<T: Send + Sync + 'static> {
    slot: &'static SingletonSlot<T>,
}

impl<T: Send + Sync + 'static> LifetimeGuard<T> {
    /// Register one more token with `T`'s slot.
    ///
    /// Does not construct the instance.
    pub fn new() -> Self {
        Self::bound_to(SingletonSlot::<T>::get())
    }

    fn bound_to(slot: &'static SingletonSlot<T>) -> Self {
        slot.acquire();
        Self { slot }
    }

    /// Move-construct a guard from `source`.
    ///
    /// A guard owns nothing exclusive, so there is nothing to steal: the new
    /// guard takes a token of its own and `source` keeps its token, releasing
    /// it when it is dropped.
    pub fn moved_from(source: &mut Self) -> Self {
        Self::bound_to(source.slot)
    }

    /// Move-assign `source` into `self`.
    ///
    /// Both guards already hold a token for the same slot, so the count is
    /// left untouched and `source` stays valid.
    pub fn move_assign(&mut self, source: &mut Self) {
        debug_assert!(std::ptr::eq(self.slot, source.slot));
    }

    /// Return the instance of `T`, default-constructing it if none exists.
    ///
    /// The first call registers the implicit guard; later calls return the
    /// same instance without touching the count.
    ///
    /// The implicit guard is never released, so an instance obtained here is
    /// not dropped when the process exits: `T`'s destructor only runs if the
    /// count is brought to zero while the process is still running.
    pub fn instance() -> &'static T
    where
        T: Default,
    {
        Self::instance_with(T::default)
    }

    /// Return the instance of `T`, constructing it with `init` if none
    /// exists.
    ///
    /// `init` is not called when an instance is already alive.
    pub fn instance_with<F>(init: F) -> &'static T
    where
        F: FnOnce() -> T,
    {
        match SingletonSlot::<T>::get().instance_ref(|| Ok::<T, Infallible>(init())) {
            Ok(instance) => instance,
            Err(never) => match never {},
        }
    }

    /// Return the instance of `T`, constructing it with the fallible `init`
    /// if none exists.
    ///
    /// On failure the slot is left exactly as it was: still empty, with the
    /// same count and no implicit guard registered.
    ///
    /// # Example
    /// ```
    /// use lg_core::errors::Error;
    /// use lg_core::patterns::lifetime_guard::LifetimeGuard;
    ///
    /// struct Device(u32);
    ///
    /// let failed = LifetimeGuard::<Device>::try_instance_with(|| Err("bus offline"));
    /// assert!(matches!(failed, Err(Error::Construction { .. })));
    /// assert_eq!(LifetimeGuard::<Device>::count(), 0);
    ///
    /// let device = LifetimeGuard::<Device>::try_instance_with(|| Ok::<_, String>(Device(4)));
    /// assert_eq!(device.unwrap().0, 4);
    /// assert_eq!(LifetimeGuard::<Device>::count(), 1);
    /// ```
    pub fn try_instance_with<E, F>(init: F) -> Result<&'static T>
    where
        E: fmt::Display,
        F: FnOnce() -> Result<T, E>,
    {
        SingletonSlot::<T>::get()
            .instance_ref(init)
            .map_err(|e| Error::Construction {
                type_name: std::any::type_name::<T>(),
                message: e.to_string(),
            })
    }

    /// Number of live tokens for `T`, the implicit guard included.
    pub fn count() -> u64 {
        SingletonSlot::<T>::get().count()
    }

    /// Snapshot of `T`'s slot.
    pub fn stats() -> SlotStats {
        SingletonSlot::<T>::get().stats()
    }

    /// Overwrite `T`'s count, returning the previous value.
    ///
    /// Intended for tests and diagnostics that need to simulate teardown
    /// without creating or dropping the matching number of guards.
    ///
    /// # Safety
    ///
    /// See [`SingletonSlot::set_count`].
    pub unsafe fn set_count(count: u64) -> u64 {
        // SAFETY: forwarded to the caller.
        unsafe { SingletonSlot::<T>::get().set_count(count) }
    }

    /// The slot this guard votes for.
    pub fn slot(&self) -> &'static SingletonSlot<T> {
        self.slot
    }
}

impl<T: Send + Sync + 'static> Default for LifetimeGuard<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Clone for LifetimeGuard<T> {
    fn clone(&self) -> Self {
        Self::bound_to(self.slot)
    }

    /// Copy assignment: both guards already hold a token, so nothing changes.
    fn clone_from(&mut self, source: &Self) {
        debug_assert!(std::ptr::eq(self.slot, source.slot));
    }
}

impl<T: Send + Sync + 'static> Drop for LifetimeGuard<T> {
    fn drop(&mut self) {
        if let Err(error) = self.slot.release() {
            Settings::instance().report_misuse(&error);
        }
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for LifetimeGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifetimeGuard")
            .field("type", &std::any::type_name::<T>())
            .field("count", &self.slot.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_is_pointer_sized() {
        struct Sized1;
        assert_eq!(
            std::mem::size_of::<LifetimeGuard<Sized1>>(),
            std::mem::size_of::<usize>()
        );
    }

    #[test]
    fn native_move_keeps_count() {
        struct Moved;
        let guard = LifetimeGuard::<Moved>::new();
        let holder = vec![guard];
        assert_eq!(LifetimeGuard::<Moved>::count(), 1);
        drop(holder);
        assert_eq!(LifetimeGuard::<Moved>::count(), 0);
    }

    #[test]
    fn native_assignment_drops_overwritten_guard() {
        struct Assigned;
        let mut a = LifetimeGuard::<Assigned>::new();
        let b = LifetimeGuard::<Assigned>::new();
        assert_eq!(LifetimeGuard::<Assigned>::count(), 2);
        assert!(std::ptr::eq(a.slot(), b.slot()));
        a = b;
        assert_eq!(LifetimeGuard::<Assigned>::count(), 1);
        drop(a);
        assert_eq!(LifetimeGuard::<Assigned>::count(), 0);
    }

    #[test]
    fn guards_of_one_type_share_a_slot() {
        struct Shared;
        let a = LifetimeGuard::<Shared>::new();
        let b = LifetimeGuard::<Shared>::default();
        assert!(std::ptr::eq(a.slot(), b.slot()));
    }

    #[test]
    fn instance_with_ignores_initialiser_once_alive() {
        struct Named(&'static str);
        let first = LifetimeGuard::<Named>::instance_with(|| Named("first"));
        let second = LifetimeGuard::<Named>::instance_with(|| Named("second"));
        assert!(std::ptr::eq(first, second));
        assert_eq!(second.0, "first");
    }

    #[test]
    fn debug_shows_count() {
        struct Shown;
        let guard = LifetimeGuard::<Shown>::new();
        let rendered = format!("{guard:?}");
        assert!(rendered.contains("LifetimeGuard"));
        assert!(rendered.contains("count: 1"));
    }
}
