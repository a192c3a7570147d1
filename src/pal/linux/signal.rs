// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::runtime::fail::Fail;
use ::std::{
    mem,
    ptr,
};

//==============================================================================
// Constants
//==============================================================================

/// The virtual-time signal that drives preemption.
pub const PREEMPT_SIGNAL: libc::c_int = libc::SIGVTALRM;

//==============================================================================
// Structures
//==============================================================================

/// Critical-section guard: blocks delivery of the preemption signal for its
/// lifetime and restores the prior mask on drop. Every public operation that
/// mutates scheduler state holds one of these. A thread suspended while the
/// guard is live resumes with the signal still blocked, because the capture
/// primitive saves the mask; the guard's drop then restores the prior mask
/// as the operation unwinds.
pub struct PreemptionGuard {
    saved: libc::sigset_t,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Preemption Guards
impl PreemptionGuard {
    /// Blocks the preemption signal, remembering the prior mask.
    pub fn block() -> Self {
        unsafe {
            let mut set: libc::sigset_t = mem::zeroed();
            libc::sigemptyset(&mut set);
            libc::sigaddset(&mut set, PREEMPT_SIGNAL);

            let mut saved: libc::sigset_t = mem::zeroed();
            if libc::sigprocmask(libc::SIG_BLOCK, &set, &mut saved) == -1 {
                crate::runtime::fail::fatal("sigprocmask failed");
            }

            Self { saved }
        }
    }
}

//==============================================================================
// Standalone Functions
//==============================================================================

/// Installs `handler` as the disposition of the preemption signal.
pub fn install_preemption_handler(handler: extern "C" fn(libc::c_int)) -> Result<(), Fail> {
    unsafe {
        let mut sa: libc::sigaction = mem::zeroed();
        sa.sa_sigaction = handler as usize;
        libc::sigemptyset(&mut sa.sa_mask);
        sa.sa_flags = 0;

        // Forward request to underlying POSIX OS.
        if libc::sigaction(PREEMPT_SIGNAL, &sa, ptr::null_mut()) == -1 {
            let errno: libc::c_int = *libc::__errno_location();
            let cause: String = format!("sigaction failed (errno={})", errno);
            return Err(Fail::new(errno, &cause));
        }
    }

    Ok(())
}

//==============================================================================
// Trait Implementations
//==============================================================================

/// Drop Trait Implementation for Preemption Guards
impl Drop for PreemptionGuard {
    fn drop(&mut self) {
        unsafe {
            if libc::sigprocmask(libc::SIG_SETMASK, &self.saved, ptr::null_mut()) == -1 {
                crate::runtime::fail::fatal("sigprocmask failed");
            }
        }
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::{
        PreemptionGuard,
        PREEMPT_SIGNAL,
    };
    use ::anyhow::Result;
    use ::std::{
        mem,
        ptr,
    };

    fn preempt_signal_blocked() -> Result<bool> {
        unsafe {
            let mut current: libc::sigset_t = mem::zeroed();
            if libc::sigprocmask(libc::SIG_BLOCK, ptr::null(), &mut current) == -1 {
                anyhow::bail!("sigprocmask should not fail");
            }
            Ok(libc::sigismember(&current, PREEMPT_SIGNAL) == 1)
        }
    }

    /// Tests that the guard blocks the preemption signal for its lifetime
    /// and restores the prior mask when dropped.
    #[test]
    fn guard_blocks_and_restores() -> Result<()> {
        crate::ensure_eq!(preempt_signal_blocked()?, false);
        {
            let _guard: PreemptionGuard = PreemptionGuard::block();
            crate::ensure_eq!(preempt_signal_blocked()?, true);
        }
        crate::ensure_eq!(preempt_signal_blocked()?, false);
        Ok(())
    }

    /// Tests that nested guards restore the outer guard's mask, not the
    /// unblocked one.
    #[test]
    fn guards_nest() -> Result<()> {
        let _outer: PreemptionGuard = PreemptionGuard::block();
        {
            let _inner: PreemptionGuard = PreemptionGuard::block();
            crate::ensure_eq!(preempt_signal_blocked()?, true);
        }
        crate::ensure_eq!(preempt_signal_blocked()?, true);
        Ok(())
    }
}
