//! Process-wide storage and reference count for one managed type.
//!
//! A [`SingletonSlot<T>`] owns uninitialised storage for a single `T` and
//! the count of live [`LifetimeGuard<T>`][crate::patterns::lifetime_guard::LifetimeGuard]
//! tokens.  It moves between two states:
//!
//! | state   | instance | count |
//! |---------|----------|-------|
//! | `EMPTY` | absent   | any   |
//! | `LIVE`  | present  | ≥ 1   |
//!
//! (A `LIVE` slot can only be observed with a zero count after the unsafe
//! [`set_count`][SingletonSlot::set_count] escape hatch has been used.)
//!
//! `EMPTY → LIVE` happens only in [`instance_ref`][SingletonSlot::instance_ref];
//! `LIVE → EMPTY` happens when a release takes the count from 1 to 0.  The
//! slot itself is never destroyed, so `EMPTY` can be re-entered any number of
//! times and every rebirth gets a fresh generation number.
//!
//! All count changes and the paired construct/destroy step are serialized by
//! a per-slot mutex.  The count is mirrored in an atomic so that
//! [`count`][SingletonSlot::count] never blocks.

use std::any::type_name;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::{Error, Result};

/// Bookkeeping protected by the slot lock.
#[derive(Debug, Default)]
struct SlotState {
    /// `true` while `storage` holds an initialised `T`.
    live: bool,
    /// Set once the first successful `instance_ref` has taken its token.
    implicit_guard: bool,
    /// Number of instances constructed so far.
    generation: u64,
}

/// A read-only snapshot of a slot's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SlotStats {
    /// Number of live guard tokens, the implicit one included.
    pub count: u64,
    /// `true` if an instance currently exists.
    pub live: bool,
    /// `true` once `instance()` has registered its implicit guard.
    pub implicit_guard: bool,
    /// Number of instances constructed so far; the current instance (if any)
    /// is generation `generation`.
    pub generation: u64,
}

/// Storage plus reference count for the process-wide instance of `T`.
///
/// Obtain the slot for a type with [`SingletonSlot::get`]; there is exactly
/// one per `T` and it lives until the process exits.
pub struct SingletonSlot<T> {
    count: AtomicU64,
    state: Mutex<SlotState>,
    storage: UnsafeCell<MaybeUninit<T>>,
}

// SAFETY: `storage` is written only while `state` is locked and the slot is
// `EMPTY`, and is moved out only while `state` is locked and the slot is
// `LIVE`.  Shared references handed out by `instance_ref` require `T: Sync`,
// and the value may be dropped on whichever thread releases the last guard,
// which requires `T: Send`.
unsafe impl<T: Send + Sync> Sync for SingletonSlot<T> {}

impl<T> SingletonSlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            state: Mutex::new(SlotState::default()),
            storage: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Lock the bookkeeping.
    ///
    /// A panicking initialiser unwinds while the lock is held, but it does so
    /// before anything is committed, so the state behind a poisoned lock is
    /// still consistent.
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current number of live guard tokens.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    /// `true` if an instance currently exists.
    pub fn is_live(&self) -> bool {
        self.lock().live
    }

    /// Number of instances constructed in this slot so far.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Snapshot all bookkeeping under a single lock acquisition.
    pub fn stats(&self) -> SlotStats {
        let state = self.lock();
        SlotStats {
            count: self.count(),
            live: state.live,
            implicit_guard: state.implicit_guard,
            generation: state.generation,
        }
    }

    /// The count one token higher.  Callers must hold the slot lock.
    fn incremented(&self) -> u64 {
        let previous = self.count.load(Ordering::Relaxed);
        let Some(next) = previous.checked_add(1) else {
            // Only reachable after `set_count(u64::MAX)`.
            panic!("lifetime count of `{}` overflowed", type_name::<T>());
        };
        next
    }

    /// Add one guard token.  Never constructs the instance.
    pub(crate) fn acquire(&self) {
        let _state = self.lock();
        let next = self.incremented();
        self.count.store(next, Ordering::Release);
        tracing::trace!(type_name = type_name::<T>(), count = next, "guard acquired");
    }

    /// Remove one guard token, destroying the instance when the last one
    /// goes away.
    ///
    /// The instance is moved out under the lock and dropped after it is
    /// released, so `T`'s destructor may itself create or drop guards.
    pub(crate) fn release(&self) -> Result<()> {
        let retired = {
            let mut state = self.lock();
            let previous = self.count.load(Ordering::Relaxed);
            if previous == 0 {
                return Err(Error::CountUnderflow {
                    type_name: type_name::<T>(),
                });
            }
            let next = previous - 1;
            self.count.store(next, Ordering::Release);
            tracing::trace!(type_name = type_name::<T>(), count = next, "guard released");

            if next == 0 && state.live {
                state.live = false;
                // SAFETY: `live` was set, so the storage is initialised, and
                // clearing it under the lock means nobody reads it again
                // until a new value has been written.
                Some(unsafe { (*self.storage.get()).assume_init_read() })
            } else {
                None
            }
        };

        if let Some(instance) = retired {
            tracing::debug!(type_name = type_name::<T>(), "destroying singleton instance");
            drop(instance);
        }
        Ok(())
    }

    /// Overwrite the count, returning the previous value.
    ///
    /// Neither constructs nor destroys the instance; only subsequent releases
    /// observe the new value.
    ///
    /// # Safety
    ///
    /// Lowering the count below the number of tokens that are really alive
    /// lets a later release destroy the instance while references returned by
    /// [`instance_ref`][Self::instance_ref] are still in use.  The caller must
    /// ensure no such reference (including ones obtained after a rebirth) is
    /// used once the count has reached zero.
    pub unsafe fn set_count(&self, count: u64) -> u64 {
        let _state = self.lock();
        let previous = self.count.swap(count, Ordering::AcqRel);
        tracing::trace!(
            type_name = type_name::<T>(),
            previous,
            count,
            "lifetime count overwritten"
        );
        previous
    }
}

impl<T: Send + Sync + 'static> SingletonSlot<T> {
    /// Return the process-wide slot for `T`.
    pub fn get() -> &'static Self {
        super::registry::slot_for::<T>()
    }

    /// Return the instance, constructing it with `init` if the slot is
    /// `EMPTY`.
    ///
    /// The first successful call also registers the implicit guard, which
    /// stays registered for the rest of the process.  `init` is ignored when
    /// an instance already exists.  If `init` fails (or panics) nothing is
    /// committed: the slot stays `EMPTY` and the count is unchanged.
    pub fn instance_ref<E, F>(&'static self, init: F) -> Result<&'static T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut state = self.lock();

        // Checked before construction so an overflow commits nothing.
        let implicit_count = (!state.implicit_guard).then(|| self.incremented());

        if !state.live {
            let value = init()?;
            // SAFETY: the slot is `EMPTY` and locked, so nobody else can be
            // reading or writing the storage.
            unsafe { (*self.storage.get()).write(value) };
            state.live = true;
            state.generation += 1;
            tracing::debug!(
                type_name = type_name::<T>(),
                generation = state.generation,
                "constructed singleton instance"
            );
        }

        if let Some(next) = implicit_count {
            state.implicit_guard = true;
            self.count.store(next, Ordering::Release);
            tracing::trace!(type_name = type_name::<T>(), count = next, "implicit guard acquired");
        } else if self.count.load(Ordering::Relaxed) == 0 {
            tracing::warn!(
                type_name = type_name::<T>(),
                generation = state.generation,
                "singleton instance is alive without any guard"
            );
        }

        // SAFETY: the slot is `LIVE`.  The storage is only vacated by a
        // release that takes the count to zero, which with the implicit guard
        // registered can only happen after the caller of `set_count` has
        // taken responsibility for outstanding references.
        Ok(unsafe { (*self.storage.get()).assume_init_ref() })
    }
}

impl<T> fmt::Debug for SingletonSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("SingletonSlot")
            .field("type", &type_name::<T>())
            .field("count", &self.count())
            .field("live", &state.live)
            .field("generation", &state.generation)
            .finish()
    }
}
