// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// PAL: Platform Abstraction Layer
//==============================================================================

// This layer hides the host facilities the thread library depends on: the
// machine-context save/restore primitive, the preemption signal plumbing,
// and the virtual-time interval timer. Everything above it is portable;
// everything below it is libc.

#[cfg(not(target_os = "linux"))]
compile_error!("uthread requires a POSIX virtual interval timer and glibc jump buffers");

//==============================================================================
// Exports
//==============================================================================

pub mod arch;

#[cfg(target_os = "linux")]
pub mod linux;
