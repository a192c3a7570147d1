// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::runtime::fail::Fail;
use ::std::ptr;

//==============================================================================
// Constants
//==============================================================================

const USECS_PER_SEC: u32 = 1_000_000;

//==============================================================================
// Structures
//==============================================================================

/// Handle on the process's virtual-time interval timer. The timer counts CPU
/// time consumed by this process and delivers the preemption signal when the
/// programmed interval expires. One-shot by construction: each dispatch arms
/// it anew for the incoming thread's quantum.
pub struct VirtualTimer;

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Virtual Timers
impl VirtualTimer {
    pub fn new() -> Self {
        Self
    }

    /// Arms the timer to fire once after `usecs` microseconds of virtual
    /// time. Async-signal-safe: this is called on the dispatch path.
    pub fn arm(&self, usecs: u32) -> Result<(), Fail> {
        let timer: libc::itimerval = libc::itimerval {
            it_interval: libc::timeval {
                tv_sec: 0,
                tv_usec: 0,
            },
            it_value: libc::timeval {
                tv_sec: (usecs / USECS_PER_SEC) as libc::time_t,
                tv_usec: (usecs % USECS_PER_SEC) as libc::suseconds_t,
            },
        };

        // Forward request to underlying POSIX OS.
        unsafe {
            if libc::setitimer(libc::ITIMER_VIRTUAL, &timer, ptr::null_mut()) == -1 {
                let errno: libc::c_int = *libc::__errno_location();
                let cause: String = format!("itimer failed (errno={})", errno);
                return Err(Fail::new(errno, &cause));
            }
        }

        Ok(())
    }

    /// Disarms the timer. Used on the shutdown path, after preemption has
    /// been masked.
    pub fn cancel(&self) -> Result<(), Fail> {
        self.arm(0)
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::VirtualTimer;
    use ::anyhow::Result;

    /// Tests that canceling an armed timer leaves nothing pending.
    #[test]
    fn arm_then_cancel() -> Result<()> {
        let timer: VirtualTimer = VirtualTimer::new();

        // A long interval: it must never actually fire within this test.
        if timer.arm(10_000_000).is_err() {
            anyhow::bail!("arming the virtual timer should succeed");
        }
        if timer.cancel().is_err() {
            anyhow::bail!("canceling the virtual timer should succeed");
        }

        Ok(())
    }
}
