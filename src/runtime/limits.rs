// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

/// Maximal number of concurrent threads, the main thread included.
pub const MAX_THREAD_NUM: usize = 100;

/// Stack size per thread (in bytes).
pub const STACK_SIZE: usize = 4096;

/// Extra stack room reserved above [STACK_SIZE]. When preemption lands, the
/// kernel pushes the interrupted thread's signal frame, extended CPU state
/// included, onto this same buffer, and the dispatch routine then runs on
/// top of that; the frame alone can exceed 3 KiB on hosts with wide vector
/// state.
pub const SIGNAL_FRAME_HEADROOM: usize = 12288;
