// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Implementation of our preemptive user-space thread scheduler.
//!
//! The scheduler owns every piece of thread state: the thread table, the
//! ready queue, the identity of the running thread, and the quantum
//! counters. All scheduling decisions funnel through a single dispatch
//! routine which is entered with preemption masked, either from the
//! virtual-timer signal handler or from an explicit scheduling point
//! (a thread blocking itself or terminating itself).

mod queue;
mod stack;
mod state;
mod table;
mod tcb;
mod tid;

//==============================================================================
// Exports
//==============================================================================

pub use self::{
    queue::ReadyQueue,
    stack::ThreadStack,
    state::ThreadState,
    table::ThreadTable,
    tcb::Tcb,
    tid::Tid,
};

//==============================================================================
// Imports
//==============================================================================

use crate::{
    pal::linux::{
        context::ContextJump,
        signal,
        timer::VirtualTimer,
    },
    runtime::fail::{
        self,
        Fail,
    },
};
use ::std::{
    mem,
    process,
};

//==============================================================================
// Structures
//==============================================================================

/// Thread Scheduler
///
/// The control plane of the thread library: public operations mutate the
/// state held here, and the dispatch routine decides which thread runs next.
pub struct Scheduler {
    /// Quantum length in microseconds, indexed by priority. Immutable after
    /// construction.
    quanta: Vec<u32>,
    /// Registry of live threads.
    table: ThreadTable,
    /// Threads awaiting CPU time, in dispatch order.
    ready: ReadyQueue,
    /// The running thread. Absent only inside the dispatch window after a
    /// self-termination, before the successor is restored.
    running: Option<Tid>,
    /// Quanta started since initialization, the current one included.
    total_quantums: u64,
    /// A self-terminated thread whose stack is still in use. Reclaimed at
    /// the next scheduler entry, once execution has left it.
    zombie: Option<Tcb>,
    /// The virtual-time interval timer driving preemption.
    timer: VirtualTimer,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Thread Schedulers
impl Scheduler {
    /// Creates a scheduler with the given priority-quantum table. The main
    /// thread occupies slot 0 in `Running` state at priority 0, credited
    /// with the quantum it is already consuming.
    pub fn new(quanta: &[u32]) -> Result<Self, Fail> {
        if quanta.is_empty() {
            let cause: &str = "empty quantum table";
            error!("new(): {}", cause);
            return Err(Fail::new(libc::EINVAL, cause));
        }
        if quanta.iter().any(|quantum| *quantum == 0) {
            let cause: &str = "invalid quantum value";
            error!("new(): {}", cause);
            return Err(Fail::new(libc::EINVAL, cause));
        }

        let mut table: ThreadTable = ThreadTable::new();
        let mut main: Tcb = Tcb::new(Tid::MAIN, None, 0);
        main.set_state(ThreadState::Running);
        main.bump_quantums();
        table.install(main);

        Ok(Self {
            quanta: quanta.to_vec(),
            table,
            ready: ReadyQueue::new(),
            running: Some(Tid::MAIN),
            total_quantums: 1,
            zombie: None,
            timer: VirtualTimer::new(),
        })
    }

    /// Installs the preemption handler and arms the timer for the main
    /// thread's quantum. Failures here are host-facility failures; the
    /// caller treats them as fatal.
    pub fn start(&mut self, handler: extern "C" fn(libc::c_int)) -> Result<(), Fail> {
        signal::install_preemption_handler(handler)?;
        self.timer.arm(self.quanta[0])
    }

    /// Creates a thread that will execute `entry` on a fresh stack at the
    /// given priority, and appends it to the ready queue. The entry function
    /// must never return; it ends its thread by terminating it.
    pub fn spawn(&mut self, entry: extern "C" fn(), priority: usize) -> Result<Tid, Fail> {
        trace!("spawn(): priority={:?}", priority);

        if priority >= self.quanta.len() {
            let cause: String = format!("invalid priority (priority={})", priority);
            error!("spawn(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }

        let tid: Tid = match self.table.alloc_id() {
            Ok(tid) => tid,
            Err(e) => {
                error!("spawn(): {}", e.cause);
                return Err(e);
            },
        };

        self.table.install(Tcb::new(tid, Some(entry), priority));
        self.ready.push_back(tid);

        Ok(tid)
    }

    /// Terminates a thread, releasing its resources and freeing its slot.
    /// Terminating the main thread exits the process with status 0;
    /// terminating the calling thread picks a successor and does not return.
    pub fn terminate(&mut self, tid: Tid) -> Result<(), Fail> {
        trace!("terminate(): tid={:?}", tid);

        if tid.is_main() {
            self.shutdown();
        }

        if !self.table.contains(tid) {
            let cause: String = format!("no such thread (tid={})", tid);
            error!("terminate(): {}", cause);
            return Err(Fail::new(libc::ESRCH, &cause));
        }

        if self.running == Some(tid) {
            self.terminate_running(tid);
        }

        self.ready.remove(tid);
        self.table.remove(tid);

        Ok(())
    }

    /// Parks a thread until an explicit resume. Blocking the main thread is
    /// an error; blocking an already-blocked thread is a no-op. A thread
    /// blocking itself suspends inside this call and returns from it when
    /// resumed and dispatched again.
    pub fn block(&mut self, tid: Tid) -> Result<(), Fail> {
        trace!("block(): tid={:?}", tid);

        if tid.is_main() {
            let cause: &str = "cannot block the main thread";
            error!("block(): {}", cause);
            return Err(Fail::new(libc::EPERM, cause));
        }

        let state: ThreadState = match self.table.get(tid) {
            Some(tcb) => tcb.state(),
            None => {
                let cause: String = format!("no such thread (tid={})", tid);
                error!("block(): {}", cause);
                return Err(Fail::new(libc::ESRCH, &cause));
            },
        };

        // Blocking a blocked thread has no effect. A terminated thread is
        // never observable here: its block leaves the table the moment it
        // dies, so the lookup above already rejected it.
        if state == ThreadState::Blocked {
            return Ok(());
        }

        if let Some(tcb) = self.table.get_mut(tid) {
            tcb.set_state(ThreadState::Blocked);
        }

        if state == ThreadState::Running {
            // Park here; a successor runs next. Control re-emerges from
            // this call once the thread is resumed and dispatched.
            self.reschedule();
        } else {
            self.ready.remove(tid);
        }

        Ok(())
    }

    /// Moves a blocked thread back to the tail of the ready queue. Resuming
    /// a thread that is ready or running is a no-op.
    pub fn resume(&mut self, tid: Tid) -> Result<(), Fail> {
        trace!("resume(): tid={:?}", tid);

        match self.table.get_mut(tid) {
            Some(tcb) => {
                if tcb.state() == ThreadState::Blocked {
                    tcb.set_state(ThreadState::Ready);
                    self.ready.push_back(tid);
                }
                Ok(())
            },
            None => {
                let cause: String = format!("no such thread (tid={})", tid);
                error!("resume(): {}", cause);
                Err(Fail::new(libc::ESRCH, &cause))
            },
        }
    }

    /// Changes the priority of a thread. For the running thread the new
    /// priority takes effect at its next dispatch.
    pub fn change_priority(&mut self, tid: Tid, priority: usize) -> Result<(), Fail> {
        trace!("change_priority(): tid={:?} priority={:?}", tid, priority);

        if priority >= self.quanta.len() {
            let cause: String = format!("invalid priority (priority={})", priority);
            error!("change_priority(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }

        match self.table.get_mut(tid) {
            Some(tcb) => {
                tcb.set_priority(priority);
                Ok(())
            },
            None => {
                let cause: String = format!("no such thread (tid={})", tid);
                error!("change_priority(): {}", cause);
                Err(Fail::new(libc::ESRCH, &cause))
            },
        }
    }

    /// Returns the identity of the calling thread.
    pub fn get_tid(&self) -> Tid {
        // The running thread is absent only inside the masked dispatch
        // window, which no public operation can observe.
        self.running.unwrap_or(Tid::MAIN)
    }

    /// Returns the number of quanta started since initialization, the
    /// current one included.
    pub fn get_total_quantums(&self) -> u64 {
        self.total_quantums
    }

    /// Returns the number of quanta in which a thread has run, the current
    /// one included if it is the running thread.
    pub fn get_quantums(&self, tid: Tid) -> Result<u64, Fail> {
        match self.table.get(tid) {
            Some(tcb) => Ok(tcb.quantums()),
            None => {
                let cause: String = format!("no such thread (tid={})", tid);
                error!("get_quantums(): {}", cause);
                Err(Fail::new(libc::ESRCH, &cause))
            },
        }
    }

    /// The scheduling point. Entered with preemption masked, from the signal
    /// handler or from an explicit yield. Saves the outgoing thread's
    /// context and falls through to dispatch; when a later dispatch restores
    /// that context, control re-emerges from the capture and this function
    /// simply returns, letting the thread resume where it left off.
    pub fn reschedule(&mut self) {
        // A thread that terminated itself is reclaimed here: execution has
        // left its stack by the time any other thread reaches the scheduler.
        if let Some(zombie) = self.zombie.take() {
            drop(zombie);
        }

        if let Some(outgoing) = self.running {
            if let Some(tcb) = self.table.get_mut(outgoing) {
                if tcb.context_mut().capture() == ContextJump::Resumed {
                    return;
                }
            }
        }

        self.dispatch()
    }

    /// Selects the next thread and transfers execution to it. The restore at
    /// the bottom abandons the current flow of control; it re-emerges at the
    /// capture point of a later scheduler entry.
    fn dispatch(&mut self) -> ! {
        if let Some(outgoing) = self.running {
            let outgoing_state: ThreadState = match self.table.get(outgoing) {
                Some(tcb) => tcb.state(),
                None => fail::fatal("running thread missing from the thread table"),
            };

            if !self.ready.is_empty() {
                // A timer-preempted thread parks at the tail; a thread that
                // voluntarily blocked itself stays off the queue.
                if outgoing_state == ThreadState::Running {
                    if let Some(tcb) = self.table.get_mut(outgoing) {
                        tcb.set_state(ThreadState::Ready);
                    }
                    self.ready.push_back(outgoing);
                }
                self.running = None;
            } else if outgoing_state != ThreadState::Running {
                fail::fatal("no runnable thread remains");
            }
        }

        let next: Tid = match self.running {
            // Nothing else is ready: the outgoing thread keeps the CPU.
            Some(tid) => tid,
            None => match self.ready.pop_front() {
                Some(tid) => tid,
                None => fail::fatal("no runnable thread remains"),
            },
        };

        self.running = Some(next);
        self.total_quantums += 1;

        let quantum: u32 = {
            let tcb: &mut Tcb = match self.table.get_mut(next) {
                Some(tcb) => tcb,
                None => fail::fatal("ready queue referenced a vacant thread slot"),
            };
            tcb.set_state(ThreadState::Running);
            tcb.bump_quantums();
            self.quanta[tcb.priority()]
        };

        if let Err(e) = self.timer.arm(quantum) {
            fail::fatal(&e.cause);
        }

        match self.table.get_mut(next) {
            Some(tcb) => tcb.context_mut().restore(),
            None => fail::fatal("ready queue referenced a vacant thread slot"),
        }
    }

    /// Terminates the calling thread. Its control block leaves the table at
    /// once (the slot is immediately reusable), but the stack is parked on
    /// the zombie slot: execution stays on it until the successor's context
    /// is restored.
    fn terminate_running(&mut self, tid: Tid) -> ! {
        self.running = None;

        if let Some(mut tcb) = self.table.remove(tid) {
            tcb.set_state(ThreadState::Terminated);
            // A previous occupant's stack is no longer in use; drop it.
            if let Some(previous) = self.zombie.replace(tcb) {
                drop(previous);
            }
        }

        self.dispatch()
    }

    /// Tears the library down and exits the process with status 0. Every
    /// stack is released except the calling thread's own, which execution
    /// still occupies; the OS reclaims it with the process.
    fn shutdown(&mut self) -> ! {
        let _ = self.timer.cancel();
        self.zombie.take();

        if let Some(calling) = self.running.take() {
            if let Some(tcb) = self.table.remove(calling) {
                mem::forget(tcb);
            }
        }
        for tcb in self.table.drain() {
            drop(tcb);
        }

        process::exit(0);
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::{
        Scheduler,
        ThreadState,
        Tid,
    };
    use crate::runtime::limits::MAX_THREAD_NUM;
    use ::anyhow::Result;

    extern "C" fn noop_entry() {}

    // These tests drive the scheduler's bookkeeping directly on a local
    // instance. The timer is never armed and the handler never installed,
    // so no dispatch happens; operations that would context-switch
    // (self-block, self-termination, shutdown) are exercised end to end in
    // tests/threading.rs instead.

    fn fresh(quanta: &[u32]) -> Result<Scheduler> {
        match Scheduler::new(quanta) {
            Ok(sched) => Ok(sched),
            Err(e) => anyhow::bail!("scheduler construction should succeed: {:?}", e),
        }
    }

    /// Tests the state right after initialization.
    #[test]
    fn initial_state() -> Result<()> {
        let sched: Scheduler = fresh(&[1000])?;

        crate::ensure_eq!(sched.get_tid(), Tid::MAIN);
        crate::ensure_eq!(sched.get_total_quantums(), 1);
        crate::ensure_eq!(sched.get_quantums(Tid::MAIN)?, 1);
        crate::ensure_eq!(sched.ready.is_empty(), true);
        Ok(())
    }

    /// Tests that a zero quantum is rejected and an empty table too.
    #[test]
    fn rejects_bad_quanta() -> Result<()> {
        match Scheduler::new(&[]) {
            Err(e) => crate::ensure_eq!(e.errno, libc::EINVAL),
            Ok(_) => anyhow::bail!("empty quantum table should be rejected"),
        }
        match Scheduler::new(&[1000, 0, 2000]) {
            Err(e) => crate::ensure_eq!(e.errno, libc::EINVAL),
            Ok(_) => anyhow::bail!("zero quantum should be rejected"),
        }
        Ok(())
    }

    /// Tests that spawned threads receive sequential identifiers and land
    /// ready at the tail of the queue.
    #[test]
    fn spawn_enqueues_ready_threads() -> Result<()> {
        let mut sched: Scheduler = fresh(&[1000])?;

        let first: Tid = sched.spawn(noop_entry, 0)?;
        let second: Tid = sched.spawn(noop_entry, 0)?;

        crate::ensure_eq!(first, Tid::from(1u32));
        crate::ensure_eq!(second, Tid::from(2u32));
        crate::ensure_eq!(sched.table.get(first).map(|tcb| tcb.state()), Some(ThreadState::Ready));
        crate::ensure_eq!(sched.ready.pop_front(), Some(first));
        crate::ensure_eq!(sched.ready.pop_front(), Some(second));
        Ok(())
    }

    /// Tests that spawning with an out-of-range priority fails.
    #[test]
    fn spawn_rejects_bad_priority() -> Result<()> {
        let mut sched: Scheduler = fresh(&[1000, 2000])?;

        match sched.spawn(noop_entry, 2) {
            Err(e) => crate::ensure_eq!(e.errno, libc::EINVAL),
            Ok(tid) => anyhow::bail!("spawn with bad priority should fail, got {:?}", tid),
        }
        Ok(())
    }

    /// Tests that spawning fails once the table is full, and succeeds again
    /// after a termination.
    #[test]
    fn spawn_fails_at_capacity() -> Result<()> {
        let mut sched: Scheduler = fresh(&[1000])?;

        // The main thread holds one slot already.
        for _ in 1..MAX_THREAD_NUM {
            sched.spawn(noop_entry, 0)?;
        }
        match sched.spawn(noop_entry, 0) {
            Err(e) => crate::ensure_eq!(e.errno, libc::EAGAIN),
            Ok(tid) => anyhow::bail!("spawn at capacity should fail, got {:?}", tid),
        }

        sched.terminate(Tid::from(57u32))?;
        crate::ensure_eq!(sched.spawn(noop_entry, 0)?, Tid::from(57u32));
        Ok(())
    }

    /// Tests that terminating a ready thread removes every trace of it and
    /// frees its slot for reuse.
    #[test]
    fn terminate_ready_thread() -> Result<()> {
        let mut sched: Scheduler = fresh(&[1000])?;

        let first: Tid = sched.spawn(noop_entry, 0)?;
        let second: Tid = sched.spawn(noop_entry, 0)?;
        let quantums_before: u64 = sched.get_total_quantums();

        sched.terminate(first)?;

        crate::ensure_eq!(sched.ready.contains(first), false);
        crate::ensure_eq!(sched.ready.contains(second), true);
        crate::ensure_eq!(sched.table.contains(first), false);
        crate::ensure_eq!(sched.get_total_quantums(), quantums_before);
        match sched.get_quantums(first) {
            Err(e) => crate::ensure_eq!(e.errno, libc::ESRCH),
            Ok(_) => anyhow::bail!("quantum query for a dead thread should fail"),
        }

        // The slot is immediately reusable.
        crate::ensure_eq!(sched.spawn(noop_entry, 0)?, first);
        Ok(())
    }

    /// Tests that terminating an unknown thread fails.
    #[test]
    fn terminate_unknown_thread() -> Result<()> {
        let mut sched: Scheduler = fresh(&[1000])?;

        match sched.terminate(Tid::from(42u32)) {
            Err(e) => crate::ensure_eq!(e.errno, libc::ESRCH),
            Ok(()) => anyhow::bail!("terminating an unknown thread should fail"),
        }
        Ok(())
    }

    /// Tests the block/resume round trip of a ready thread, and that resume
    /// appends at the tail.
    #[test]
    fn block_resume_roundtrip() -> Result<()> {
        let mut sched: Scheduler = fresh(&[1000])?;

        let first: Tid = sched.spawn(noop_entry, 0)?;
        let second: Tid = sched.spawn(noop_entry, 0)?;

        sched.block(first)?;
        crate::ensure_eq!(sched.table.get(first).map(|tcb| tcb.state()), Some(ThreadState::Blocked));
        crate::ensure_eq!(sched.ready.contains(first), false);

        // Blocking a blocked thread has no effect.
        sched.block(first)?;

        sched.resume(first)?;
        crate::ensure_eq!(sched.table.get(first).map(|tcb| tcb.state()), Some(ThreadState::Ready));
        crate::ensure_eq!(sched.ready.pop_front(), Some(second));
        crate::ensure_eq!(sched.ready.pop_front(), Some(first));
        Ok(())
    }

    /// Tests that resuming a ready thread changes nothing.
    #[test]
    fn resume_is_identity_on_ready() -> Result<()> {
        let mut sched: Scheduler = fresh(&[1000])?;

        let first: Tid = sched.spawn(noop_entry, 0)?;
        sched.resume(first)?;

        crate::ensure_eq!(sched.ready.len(), 1);
        Ok(())
    }

    /// Tests that the main thread cannot be blocked and unknown threads
    /// cannot be blocked or resumed.
    #[test]
    fn block_boundaries() -> Result<()> {
        let mut sched: Scheduler = fresh(&[1000])?;

        match sched.block(Tid::MAIN) {
            Err(e) => crate::ensure_eq!(e.errno, libc::EPERM),
            Ok(()) => anyhow::bail!("blocking the main thread should fail"),
        }
        match sched.block(Tid::from(9u32)) {
            Err(e) => crate::ensure_eq!(e.errno, libc::ESRCH),
            Ok(()) => anyhow::bail!("blocking an unknown thread should fail"),
        }
        match sched.resume(Tid::from(9u32)) {
            Err(e) => crate::ensure_eq!(e.errno, libc::ESRCH),
            Ok(()) => anyhow::bail!("resuming an unknown thread should fail"),
        }
        Ok(())
    }

    /// Tests priority changes, including their validation.
    #[test]
    fn change_priority_validation() -> Result<()> {
        let mut sched: Scheduler = fresh(&[1000, 2000])?;

        let first: Tid = sched.spawn(noop_entry, 0)?;
        sched.change_priority(first, 1)?;
        crate::ensure_eq!(sched.table.get(first).map(|tcb| tcb.priority()), Some(1));

        // The running thread's priority may change too; it takes effect at
        // its next dispatch.
        sched.change_priority(Tid::MAIN, 1)?;

        match sched.change_priority(first, 5) {
            Err(e) => crate::ensure_eq!(e.errno, libc::EINVAL),
            Ok(()) => anyhow::bail!("out-of-range priority should be rejected"),
        }
        match sched.change_priority(Tid::from(9u32), 0) {
            Err(e) => crate::ensure_eq!(e.errno, libc::ESRCH),
            Ok(()) => anyhow::bail!("unknown thread should be rejected"),
        }
        Ok(())
    }
}
