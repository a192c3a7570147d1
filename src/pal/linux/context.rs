// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::pal::arch;
use ::std::mem;

//==============================================================================
// Structures
//==============================================================================

/// Mirror of the host C library's saved jump buffer (`struct __jmp_buf_tag`):
/// the general-purpose register slots, a flag recording whether a signal mask
/// was saved, and the saved mask itself.
#[repr(C)]
struct SigJmpBuf {
    regs: [u64; arch::JMP_BUF_NWORDS],
    mask_was_saved: libc::c_int,
    saved_mask: libc::sigset_t,
}

/// Outcome of a capture: either the original call site falling through, or a
/// later restoration re-emerging at the capture point.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ContextJump {
    FromCapture,
    Resumed,
}

/// A snapshot of the CPU register set (stack pointer and instruction pointer
/// included) sufficient to resume a suspended thread.
pub struct MachineContext {
    buf: SigJmpBuf,
}

//==============================================================================
// External Functions
//==============================================================================

// The real symbols behind the host's `sigsetjmp`/`siglongjmp` macros.
extern "C" {
    fn __sigsetjmp(env: *mut SigJmpBuf, savemask: libc::c_int) -> libc::c_int;
    fn siglongjmp(env: *mut SigJmpBuf, val: libc::c_int) -> !;
}

//==============================================================================
// Constants
//==============================================================================

/// Sentinel passed to the restore primitive; captures re-emerge with it.
const RESUME_SENTINEL: libc::c_int = 1;

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Machine Contexts
impl MachineContext {
    /// Creates an empty machine context. It must be filled by [capture] or
    /// [synthesize] before it may be restored.
    pub fn new() -> Self {
        Self {
            buf: unsafe { mem::zeroed() },
        }
    }

    /// Records the current register state, including the signal mask, into
    /// the target context. Returns [ContextJump::FromCapture] when falling
    /// through from the call site and [ContextJump::Resumed] when a later
    /// [restore] transfers control back here.
    ///
    /// This function must expand into its caller: the recorded stack pointer
    /// refers to the caller's frame, and that frame has to stay live until
    /// the matching restore. Callers may only invoke deeper calls between a
    /// capture and the restore that abandons it.
    #[inline(always)]
    pub fn capture(&mut self) -> ContextJump {
        match unsafe { __sigsetjmp(&mut self.buf, 1) } {
            0 => ContextJump::FromCapture,
            _ => ContextJump::Resumed,
        }
    }

    /// Transfers control to the instruction pointer stored in the target
    /// context, on its stored stack, with its stored signal mask. The prior
    /// capture of this context appears to return [ContextJump::Resumed].
    pub fn restore(&mut self) -> ! {
        unsafe { siglongjmp(&mut self.buf, RESUME_SENTINEL) }
    }

    /// Fills the target context so that its first restore begins executing
    /// `entry` at the top of a fresh stack with an empty signal mask. A
    /// baseline capture supplies valid contents for every other register
    /// slot; the stack-pointer and instruction-pointer slots are then
    /// overwritten with encoded values of our own.
    pub fn synthesize(&mut self, stack_top: *mut u8, entry: extern "C" fn()) {
        unsafe {
            __sigsetjmp(&mut self.buf, 1);
        }
        self.buf.regs[arch::JB_SP] = arch::mangle(stack_top as u64);
        self.buf.regs[arch::JB_PC] = arch::mangle(entry as usize as u64);
        unsafe {
            libc::sigemptyset(&mut self.buf.saved_mask);
        }
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::{
        ContextJump,
        MachineContext,
    };
    use crate::pal::arch;
    use ::anyhow::Result;
    use ::std::sync::atomic::{
        AtomicUsize,
        Ordering,
    };

    extern "C" fn dummy_entry() {}

    /// Tests that a plain capture falls through from its call site.
    #[test]
    fn capture_falls_through() -> Result<()> {
        let mut ctx: MachineContext = MachineContext::new();
        crate::ensure_eq!(ctx.capture(), ContextJump::FromCapture);
        Ok(())
    }

    /// Tests that restoring a captured context re-emerges at the capture
    /// point with the resumed sentinel.
    #[test]
    fn restore_reenters_capture_point() -> Result<()> {
        static HITS: AtomicUsize = AtomicUsize::new(0);
        HITS.store(0, Ordering::SeqCst);

        let mut ctx: MachineContext = MachineContext::new();
        match ctx.capture() {
            ContextJump::FromCapture => {
                HITS.fetch_add(1, Ordering::SeqCst);
                ctx.restore();
            },
            ContextJump::Resumed => HITS.fetch_add(1, Ordering::SeqCst),
        };

        crate::ensure_eq!(HITS.load(Ordering::SeqCst), 2);
        Ok(())
    }

    /// Tests that synthesis plants the encoded stack and entry pointers in
    /// their architecture-defined slots.
    #[test]
    fn synthesize_plants_stack_and_entry() -> Result<()> {
        let mut stack: [u8; 64] = [0u8; 64];
        let top: *mut u8 = unsafe { stack.as_mut_ptr().add(56) };

        let mut ctx: MachineContext = MachineContext::new();
        ctx.synthesize(top, dummy_entry);

        crate::ensure_eq!(ctx.buf.regs[arch::JB_SP], arch::mangle(top as u64));
        crate::ensure_eq!(ctx.buf.regs[arch::JB_PC], arch::mangle(dummy_entry as usize as u64));
        Ok(())
    }
}
