// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::runtime::{
    limits::MAX_THREAD_NUM,
    scheduler::tid::Tid,
};
use ::std::collections::VecDeque;

//==============================================================================
// Structures
//==============================================================================

/// Ready Queue
///
/// The ordered sequence of threads awaiting CPU time. Strict FIFO: every
/// Ready-entering transition appends at the tail, and dispatch pops the
/// head. The queue holds identifiers only; the thread table owns the control
/// blocks.
pub struct ReadyQueue {
    queue: VecDeque<Tid>,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Ready Queues
impl ReadyQueue {
    /// Creates an empty ready queue. Storage for every possible thread is
    /// reserved up front: the dispatch path pushes to this queue from signal
    /// context and must never allocate there.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::with_capacity(MAX_THREAD_NUM),
        }
    }

    /// Appends a thread at the tail of the queue.
    pub fn push_back(&mut self, tid: Tid) {
        self.queue.push_back(tid);
    }

    /// Pops the thread at the head of the queue.
    pub fn pop_front(&mut self) -> Option<Tid> {
        self.queue.pop_front()
    }

    /// Removes a thread from anywhere in the queue, preserving the relative
    /// order of the remaining entries. Reports whether the thread was
    /// queued.
    pub fn remove(&mut self, tid: Tid) -> bool {
        match self.queue.iter().position(|queued| *queued == tid) {
            Some(ix) => {
                self.queue.remove(ix);
                true
            },
            None => false,
        }
    }

    /// Checks whether a thread is queued.
    pub fn contains(&self, tid: Tid) -> bool {
        self.queue.iter().any(|queued| *queued == tid)
    }

    /// Checks whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of queued threads.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
