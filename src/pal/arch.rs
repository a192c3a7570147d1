// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Per-Architecture Context Layout
//==============================================================================

// Synthesizing a machine context means writing a stack pointer and an
// instruction pointer directly into a saved jump buffer. Both the buffer
// layout and the pointer encoding are architecture-specific, so they are
// isolated here.

#[cfg(not(target_arch = "x86_64"))]
compile_error!("uthread only supports x86_64");

//==============================================================================
// Imports
//==============================================================================

use ::core::arch::asm;

//==============================================================================
// Constants
//==============================================================================

/// Number of general-purpose slots in the host's saved jump buffer.
#[cfg(target_arch = "x86_64")]
pub const JMP_BUF_NWORDS: usize = 8;

/// Jump-buffer slot holding the saved stack pointer.
#[cfg(target_arch = "x86_64")]
pub const JB_SP: usize = 6;

/// Jump-buffer slot holding the saved instruction pointer.
#[cfg(target_arch = "x86_64")]
pub const JB_PC: usize = 7;

//==============================================================================
// Standalone Functions
//==============================================================================

/// Encodes an address the way the host C library stores pointers in saved
/// jump buffers. On x86_64 glibc this is `PTR_MANGLE`: XOR with the pointer
/// guard held at `%fs:0x30`, then rotate left by 17 bits. The decode applied
/// by the restore primitive is the exact inverse, so values written through
/// this function come back out as the raw addresses they started as.
#[cfg(target_arch = "x86_64")]
pub fn mangle(addr: u64) -> u64 {
    let ret: u64;
    unsafe {
        asm!(
            "xor {addr}, qword ptr fs:[0x30]",
            "rol {addr}, 17",
            addr = inout(reg) addr => ret,
            options(nostack, readonly),
        );
    }
    ret
}
