// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Structures
//==============================================================================

/// Execution state of a thread.
///
/// `Terminated` is transient: a thread carries it only between
/// self-termination and the deferred reclaim of its stack. Threads
/// terminated from the outside are destroyed outright and their table slot
/// nulled, so lookups distinguish them by absence.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ThreadState {
    /// Awaiting CPU time on the ready queue.
    Ready,
    /// Currently executing. At most one thread is in this state.
    Running,
    /// Parked until an explicit resume.
    Blocked,
    /// Destroyed, awaiting stack reclaim.
    Terminated,
}
