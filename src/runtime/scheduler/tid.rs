// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use ::std::fmt;

//==============================================================================
// Structures
//==============================================================================

/// Thread Identifier
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Copy, Clone)]
pub struct Tid(u32);

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Thread Identifiers
impl Tid {
    /// Identifier of the main thread, the initial caller of `init`.
    pub const MAIN: Tid = Tid(0);

    /// Checks whether the target identifier names the main thread.
    pub fn is_main(&self) -> bool {
        self.0 == 0
    }
}

//==============================================================================
// Trait Implementations
//==============================================================================

impl From<Tid> for u32 {
    /// Converts a [Tid] to a [u32].
    fn from(val: Tid) -> Self {
        val.0
    }
}

impl From<u32> for Tid {
    /// Converts a [u32] to a [Tid].
    fn from(val: u32) -> Self {
        Tid(val)
    }
}

impl From<Tid> for usize {
    /// Converts a [Tid] to a [usize].
    fn from(val: Tid) -> Self {
        val.0 as usize
    }
}

impl From<usize> for Tid {
    /// Converts a [usize] to a [Tid].
    fn from(val: usize) -> Self {
        Tid(val as u32)
    }
}

/// Display Trait Implementation for Thread Identifiers
impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
