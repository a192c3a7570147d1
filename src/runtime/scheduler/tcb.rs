// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::{
    pal::linux::context::MachineContext,
    runtime::scheduler::{
        stack::ThreadStack,
        state::ThreadState,
        tid::Tid,
    },
};

//==============================================================================
// Structures
//==============================================================================

/// Thread Control Block
///
/// One record per logical thread: identity, priority, execution state,
/// quantum counter, the exclusively owned stack, and the saved machine
/// context. Destroying the block releases the stack.
pub struct Tcb {
    /// Thread identity. Immutable after creation.
    id: Tid,
    /// Index into the priority-quantum table.
    priority: usize,
    /// Execution state.
    state: ThreadState,
    /// Number of quanta in which this thread has been the running one.
    quantums: u64,
    /// Exclusively owned stack.
    stack: ThreadStack,
    /// Saved register snapshot.
    context: MachineContext,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Thread Control Blocks
impl Tcb {
    /// Creates a thread control block. For a spawned thread, `entry` is its
    /// entry function and the context is synthesized so that the first
    /// restore begins executing it on the fresh stack. The main thread is
    /// created without an entry function; its synthesized context is never
    /// restored, because its first real capture overwrites the context from
    /// a live call site.
    pub fn new(id: Tid, entry: Option<extern "C" fn()>, priority: usize) -> Self {
        let mut tcb: Tcb = Self {
            id,
            priority,
            state: ThreadState::Ready,
            quantums: 0,
            stack: ThreadStack::new(),
            context: MachineContext::new(),
        };

        if let Some(entry) = entry {
            let stack_top: *mut u8 = tcb.stack.top();
            tcb.context.synthesize(stack_top, entry);
        }

        tcb
    }

    /// Returns the identity of the target thread.
    pub fn id(&self) -> Tid {
        self.id
    }

    /// Returns the priority of the target thread.
    pub fn priority(&self) -> usize {
        self.priority
    }

    /// Sets the priority of the target thread. Takes effect at its next
    /// dispatch; an in-flight quantum is not reprogrammed.
    pub fn set_priority(&mut self, priority: usize) {
        self.priority = priority;
    }

    /// Returns the execution state of the target thread.
    pub fn state(&self) -> ThreadState {
        self.state
    }

    /// Sets the execution state of the target thread.
    pub fn set_state(&mut self, state: ThreadState) {
        self.state = state;
    }

    /// Returns the number of quanta in which the target thread has run.
    pub fn quantums(&self) -> u64 {
        self.quantums
    }

    /// Credits the target thread with one more quantum.
    pub fn bump_quantums(&mut self) {
        self.quantums += 1;
    }

    /// Returns the saved machine context of the target thread.
    pub fn context_mut(&mut self) -> &mut MachineContext {
        &mut self.context
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
