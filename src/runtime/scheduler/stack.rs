// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::runtime::limits::{
    SIGNAL_FRAME_HEADROOM,
    STACK_SIZE,
};
use ::std::mem;

//==============================================================================
// Constants
//==============================================================================

/// Full size of the backing buffer: the thread's stack budget plus the room
/// the kernel's signal frame and the dispatch routine consume beneath it.
const BUFFER_SIZE: usize = STACK_SIZE + SIGNAL_FRAME_HEADROOM;

//==============================================================================
// Structures
//==============================================================================

/// Backing buffer for a thread stack. Sixteen-byte alignment keeps the
/// synthesized entry frame ABI-aligned: the initial stack pointer lands one
/// machine word below a sixteen-byte boundary, exactly as if the entry
/// function had just been called.
#[repr(align(16))]
struct StackBuffer([u8; BUFFER_SIZE]);

/// A fixed-size stack exclusively owned by one thread control block. The
/// buffer lives on the heap so the stack stays put while its owning record
/// moves through the thread table.
pub struct ThreadStack {
    buffer: Box<StackBuffer>,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Thread Stacks
impl ThreadStack {
    /// Allocates a zeroed stack.
    pub fn new() -> Self {
        Self {
            buffer: Box::new(StackBuffer([0u8; BUFFER_SIZE])),
        }
    }

    /// Returns the initial stack pointer for this stack: its upper address,
    /// aligned down by one machine word.
    pub fn top(&mut self) -> *mut u8 {
        let base: *mut u8 = self.buffer.0.as_mut_ptr();
        unsafe { base.add(BUFFER_SIZE - mem::size_of::<usize>()) }
    }

    /// Returns the size of this stack in bytes, headroom included.
    pub fn len(&self) -> usize {
        BUFFER_SIZE
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
