// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Exports
//==============================================================================

pub mod fail;
pub mod limits;
pub mod logging;
pub mod scheduler;

//==============================================================================
// Imports
//==============================================================================

use crate::{
    pal::linux::signal::PreemptionGuard,
    runtime::{
        fail::Fail,
        scheduler::{
            Scheduler,
            Tid,
        },
    },
};
use ::std::ptr::addr_of_mut;

//==============================================================================
// Static Variables
//==============================================================================

/// Process-wide scheduler handle. The signal facility is process-wide, so
/// the handler has to reach the scheduler through a single process-wide
/// name; there is no way around this. Handing out mutable references from a
/// static breaks Rust's ownership model, but it is safe here for the same
/// reason it is single-threaded at all: exactly one logical thread executes
/// at any instant, and every mutation happens with the preemption signal
/// masked, so no two flows of control touch the scheduler at once.
static mut SCHEDULER: Option<Scheduler> = None;

//==============================================================================
// Standalone Functions
//==============================================================================

/// Returns the process-wide scheduler, if the library has been initialized.
fn scheduler() -> Option<&'static mut Scheduler> {
    unsafe { (*addr_of_mut!(SCHEDULER)).as_mut() }
}

/// The preemption entry point: disposition of the virtual-time signal. The
/// kernel delivers the signal with itself masked, so the dispatch path runs
/// as a critical section without taking the guard.
extern "C" fn preempt(_signum: libc::c_int) {
    if let Some(sched) = scheduler() {
        sched.reschedule();
    }
}

/// Runs an operation against the process-wide scheduler with preemption
/// masked, emitting the caller-error diagnostic on failure.
fn with_scheduler<T, F>(op: F) -> Result<T, Fail>
where
    F: FnOnce(&mut Scheduler) -> Result<T, Fail>,
{
    let _guard: PreemptionGuard = PreemptionGuard::block();
    match scheduler() {
        Some(sched) => match op(sched) {
            Ok(value) => Ok(value),
            Err(e) => {
                fail::report_caller_error(&e.cause);
                Err(e)
            },
        },
        None => {
            let cause: &str = "thread library not initialized";
            fail::report_caller_error(cause);
            Err(Fail::new(libc::EPERM, cause))
        },
    }
}

/// Initializes the thread library. `quanta` holds the length of a quantum in
/// microseconds for each priority; every entry must be strictly positive.
/// The calling thread becomes thread 0. Must be called exactly once, before
/// any other operation.
pub fn init(quanta: &[u32]) -> Result<(), Fail> {
    logging::initialize();
    trace!("init(): quanta={:?}", quanta);

    let _guard: PreemptionGuard = PreemptionGuard::block();

    if scheduler().is_some() {
        let cause: &str = "thread library already initialized";
        error!("init(): {}", cause);
        fail::report_caller_error(cause);
        return Err(Fail::new(libc::EEXIST, cause));
    }

    let sched: Scheduler = match Scheduler::new(quanta) {
        Ok(sched) => sched,
        Err(e) => {
            fail::report_caller_error(&e.cause);
            return Err(e);
        },
    };

    unsafe {
        *addr_of_mut!(SCHEDULER) = Some(sched);
    }

    if let Some(sched) = scheduler() {
        if let Err(e) = sched.start(preempt) {
            fail::fatal(&e.cause);
        }
    }

    Ok(())
}

/// Creates a thread executing `entry` at the given priority and returns its
/// identifier. The entry function must never return; it ends its thread
/// with [terminate].
pub fn spawn(entry: extern "C" fn(), priority: usize) -> Result<Tid, Fail> {
    with_scheduler(|sched| sched.spawn(entry, priority))
}

/// Terminates a thread. Terminating the main thread (`Tid::MAIN`) exits the
/// process with status 0; a thread terminating itself does not return.
pub fn terminate(tid: Tid) -> Result<(), Fail> {
    with_scheduler(|sched| sched.terminate(tid))
}

/// Parks a thread until [resume]. A thread blocking itself suspends inside
/// this call.
pub fn block(tid: Tid) -> Result<(), Fail> {
    with_scheduler(|sched| sched.block(tid))
}

/// Moves a blocked thread back to the ready queue.
pub fn resume(tid: Tid) -> Result<(), Fail> {
    with_scheduler(|sched| sched.resume(tid))
}

/// Changes the priority of a thread.
pub fn change_priority(tid: Tid, priority: usize) -> Result<(), Fail> {
    with_scheduler(|sched| sched.change_priority(tid, priority))
}

/// Returns the identifier of the calling thread.
pub fn get_tid() -> Result<Tid, Fail> {
    with_scheduler(|sched| Ok(sched.get_tid()))
}

/// Returns the number of quanta started since initialization, the current
/// one included.
pub fn get_total_quantums() -> Result<u64, Fail> {
    with_scheduler(|sched| Ok(sched.get_total_quantums()))
}

/// Returns the number of quanta in which the given thread has run.
pub fn get_quantums(tid: Tid) -> Result<u64, Fail> {
    with_scheduler(|sched| sched.get_quantums(tid))
}
