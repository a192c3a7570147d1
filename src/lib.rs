// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! User-space preemptive thread library.
//!
//! This crate multiplexes many logical threads of control onto a single
//! operating-system thread. Each logical thread runs a caller-supplied entry
//! function on its own fixed-size stack; the library preempts the running
//! thread when the virtual-time interval timer fires and dispatches the next
//! ready thread by saving and restoring machine contexts.

#![cfg_attr(feature = "strict", deny(clippy::all))]

mod pal;

pub mod runtime;

#[macro_use]
extern crate log;

pub use crate::runtime::{
    block,
    change_priority,
    fail::Fail,
    get_quantums,
    get_tid,
    get_total_quantums,
    init,
    limits,
    resume,
    scheduler::{
        ThreadState,
        Tid,
    },
    spawn,
    terminate,
};

/// Ensures that two expressions are equal, bailing out of the calling test otherwise.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr) => {{
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    ::anyhow::bail!(
                        "ensure_eq!({}, {}) failed: left={:?} right={:?}",
                        stringify!($left),
                        stringify!($right),
                        left_val,
                        right_val
                    );
                }
            },
        }
    }};
}

/// Ensures that two expressions are not equal, bailing out of the calling test otherwise.
#[macro_export]
macro_rules! ensure_neq {
    ($left:expr, $right:expr) => {{
        match (&$left, &$right) {
            (left_val, right_val) => {
                if *left_val == *right_val {
                    ::anyhow::bail!(
                        "ensure_neq!({}, {}) failed: left={:?} right={:?}",
                        stringify!($left),
                        stringify!($right),
                        left_val,
                        right_val
                    );
                }
            },
        }
    }};
}
