//! Process-wide lookup of one [`SingletonSlot`] per managed type.
//!
//! Rust has no generic statics, so the per-type slots live in a map keyed by
//! `TypeId`.  A slot is allocated the first time its type is touched and is
//! leaked, giving it a `'static` address for the rest of the process.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use super::slot::SingletonSlot;

type SlotMap = HashMap<TypeId, &'static (dyn Any + Send + Sync)>;

static SLOTS: OnceLock<RwLock<SlotMap>> = OnceLock::new();

fn slots() -> &'static RwLock<SlotMap> {
    SLOTS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Return the slot for `T`, creating it on first use.
pub(crate) fn slot_for<T>() -> &'static SingletonSlot<T>
where
    T: Send + Sync + 'static,
{
    let key = TypeId::of::<T>();

    // The map only ever grows and every entry is fully built before it is
    // inserted, so a poisoned lock still guards a consistent map.
    if let Some(slot) = slots()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return downcast(*slot);
    }

    let mut map = slots().write().unwrap_or_else(PoisonError::into_inner);
    let slot = *map.entry(key).or_insert_with(|| {
        tracing::trace!(type_name = std::any::type_name::<T>(), "allocating singleton slot");
        let leaked: &'static SingletonSlot<T> = Box::leak(Box::new(SingletonSlot::new()));
        leaked as &'static (dyn Any + Send + Sync)
    });
    downcast(slot)
}

/// Number of slots allocated so far, across all types.
pub fn slot_count() -> usize {
    slots()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .len()
}

fn downcast<T>(slot: &'static (dyn Any + Send + Sync)) -> &'static SingletonSlot<T>
where
    T: Send + Sync + 'static,
{
    match slot.downcast_ref::<SingletonSlot<T>>() {
        Some(slot) => slot,
        // Entries are keyed by the TypeId of the slot's own parameter.
        None => unreachable!("slot registry entry has the wrong type"),
    }
}
