// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::runtime::{
    fail::Fail,
    limits::MAX_THREAD_NUM,
    scheduler::{
        tcb::Tcb,
        tid::Tid,
    },
};

//==============================================================================
// Structures
//==============================================================================

/// Thread identifiers table.
///
/// A fixed-capacity slotted registry mapping identifiers to thread control
/// blocks; the source of truth for which threads exist. Identifiers are
/// allocated as the lowest free slot, and a terminated thread's slot becomes
/// immediately reusable. The backing storage is allocated once and never
/// grows, so a block stays at a fixed address from installation until
/// removal; captured machine contexts may point into it meanwhile.
pub struct ThreadTable {
    slots: Vec<Option<Tcb>>,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Thread Tables
impl ThreadTable {
    /// Creates an empty table with every slot free.
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_THREAD_NUM).map(|_| None).collect(),
        }
    }

    /// Picks the smallest free identifier.
    pub fn alloc_id(&self) -> Result<Tid, Fail> {
        for (ix, slot) in self.slots.iter().enumerate() {
            if slot.is_none() {
                return Ok(Tid::from(ix));
            }
        }

        Err(Fail::new(libc::EAGAIN, "maximum number of threads reached"))
    }

    /// Installs a thread control block under its own identifier. The slot
    /// must have been handed out by [Self::alloc_id] and not reused since.
    pub fn install(&mut self, tcb: Tcb) {
        let ix: usize = usize::from(tcb.id());
        debug_assert!(self.slots[ix].is_none());
        self.slots[ix] = Some(tcb);
    }

    /// Looks up a live thread.
    pub fn get(&self, tid: Tid) -> Option<&Tcb> {
        self.slots.get(usize::from(tid)).and_then(|slot| slot.as_ref())
    }

    /// Looks up a live thread for mutation.
    pub fn get_mut(&mut self, tid: Tid) -> Option<&mut Tcb> {
        self.slots.get_mut(usize::from(tid)).and_then(|slot| slot.as_mut())
    }

    /// Checks whether an identifier names a live thread. Identifiers that
    /// were never allocated and identifiers already freed are alike here:
    /// neither exists.
    pub fn contains(&self, tid: Tid) -> bool {
        self.get(tid).is_some()
    }

    /// Removes a thread from the table, freeing its slot and returning the
    /// control block to the caller.
    pub fn remove(&mut self, tid: Tid) -> Option<Tcb> {
        self.slots.get_mut(usize::from(tid)).and_then(|slot| slot.take())
    }

    /// Removes every thread from the table.
    pub fn drain(&mut self) -> impl Iterator<Item = Tcb> + '_ {
        self.slots.iter_mut().filter_map(|slot| slot.take())
    }

    /// Returns the number of live threads.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
